//! Actor-based broker and job execution
//!
//! Shared mutable state (the correlation registry and the single-flight
//! flag) lives inside Ractor actors, so every mutation is serialized through
//! an actor mailbox.

pub mod broker;
pub mod executor;
pub mod message;
pub mod registry;

pub use broker::*;
pub use executor::*;
pub use message::*;
pub use registry::*;
