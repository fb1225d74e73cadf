use async_trait::async_trait;

use crate::domain::{config::PersistedConfig, error::BridgeError};

/// Port for the durable configuration and its in-memory copy
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The configuration currently loaded in memory
    async fn current(&self) -> PersistedConfig;

    /// Persist the whole configuration object to durable storage.
    ///
    /// Does not touch the in-memory copy; call `reload` for that.
    async fn write(&self, config: &PersistedConfig) -> Result<(), BridgeError>;

    /// Re-read durable storage into memory
    async fn reload(&self) -> Result<PersistedConfig, BridgeError>;
}
