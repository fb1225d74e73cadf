//! Ports - interfaces to the collaborators around the broker

pub mod channel;
pub mod config;
pub mod http;
pub mod job;
pub mod session;
