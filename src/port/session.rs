use async_trait::async_trait;

use crate::domain::{error::BridgeError, session::Credential};

/// Port onto the live browsing session's credential store
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read every credential pair, in the store's own enumeration order
    async fn read_all_credentials(&self) -> Result<Vec<Credential>, BridgeError>;

    /// Drop all stored credentials
    async fn clear(&self) -> Result<(), BridgeError>;
}
