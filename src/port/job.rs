use async_trait::async_trait;

use crate::{actor::broker::RpcClient, domain::error::BridgeError};

/// Context handed to a job body for one run
#[derive(Clone)]
pub struct JobContext {
    /// Sequence number of this run
    pub run_id: u64,
    /// Client for dispatching calls into the isolated context
    pub rpc:    RpcClient
}

impl JobContext {
    pub fn new(run_id: u64, rpc: RpcClient) -> Self {
        Self { run_id, rpc }
    }
}

/// The business logic run under the single-flight guard.
///
/// Runs after the authentication sync step has completed and may issue any
/// number of calls through `JobContext::rpc`, sequentially or concurrently.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn run(&self, context: JobContext) -> Result<(), BridgeError>;

    fn name(&self) -> &str {
        "job"
    }
}
