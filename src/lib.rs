//! # sigbridge
//!
//! A broker for calling into an isolated script-executing context (for
//! example a sandboxed renderer that computes request signatures) from a host
//! process that cannot run that code itself.
//!
//! This crate provides:
//! - An RPC broker that tags each call with a correlation id, sends it over a
//!   one-way channel and resolves the caller when the matching response returns
//! - A single-flight job executor that refuses overlapping jobs
//! - An authentication sync step that persists session credentials before a job
//! - File, child-process and in-memory adapters for the surrounding collaborators

use std::sync::Arc;

pub mod actor;
pub mod adapter;
pub mod bridge;
pub mod domain;
pub mod port;
pub mod service;

pub use actor::RpcClient;
pub use bridge::Bridge;
pub use domain::{
    error::BridgeError,
    job::{JobReport, JobStart, JobTicket},
    rpc::{CallId, RpcRequest, RpcResponse}
};

use crate::{
    adapter::{config::FileConfigStore, http::ReqwestClient, session::FileSessionStore},
    port::{config::ConfigStore, http::HttpClient, session::SessionStore},
    service::config::AppConfig
};

/// Collaborators shared by the bridge
#[derive(Clone)]
pub struct AppContext {
    pub config:       AppConfig,
    pub session:      Arc<dyn SessionStore>,
    pub config_store: Arc<dyn ConfigStore>,
    pub http:         Arc<dyn HttpClient>
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        session: Arc<dyn SessionStore>,
        config_store: Arc<dyn ConfigStore>,
        http: Arc<dyn HttpClient>
    ) -> Self {
        Self { config, session, config_store, http }
    }

    /// Wire the file-backed adapters under `config.config_dir`
    pub async fn init(config: AppConfig) -> Result<Self, BridgeError> {
        config.ensure_dirs_exist()?;

        let session: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(config.session_path.clone()));
        let config_store: Arc<dyn ConfigStore> = Arc::new(FileConfigStore::open(config.config_path.clone()).await?);
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(config_store.clone()));

        Ok(Self::new(config, session, config_store, http))
    }
}
