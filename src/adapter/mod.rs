//! Adapters - concrete implementations of the ports

pub mod channel;
pub mod config;
pub mod http;
pub mod session;
