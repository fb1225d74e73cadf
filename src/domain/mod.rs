//! Domain types shared by actors, ports and adapters

pub mod command;
pub mod config;
pub mod constant;
pub mod error;
pub mod job;
pub mod rpc;
pub mod session;
