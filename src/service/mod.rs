//! Application services built on top of the ports

pub mod auth;
pub mod config;
pub mod plan;
