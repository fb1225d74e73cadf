use async_trait::async_trait;

use crate::domain::{error::BridgeError, rpc::RpcRequest};

/// Outbound half of the isolated context transport.
///
/// Delivery is fire-and-forget: a successful send says nothing about
/// whether the context will ever answer. Answers come back through
/// the bridge's response entry point.
#[async_trait]
pub trait ContextChannel: Send + Sync {
    /// Send one invocation into the isolated context
    async fn send(&self, request: RpcRequest) -> Result<(), BridgeError>;

    /// Transport name for diagnostics
    fn name(&self) -> &'static str;
}
