//! Typed messages for actor communication

use chrono::{DateTime, Utc};
use ractor::{Message, RpcReplyPort};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::{
    actor::registry::Completion,
    domain::{
        error::BridgeError,
        job::{ExecutorStatus, JobReport, JobStart},
        rpc::{CallId, RpcResponse}
    }
};

/// Messages for the Broker actor (owner of the correlation registry)
#[derive(Debug)]
pub enum BrokerMessage {
    /// Dispatch a call into the isolated context
    Invoke { method: String, args: Vec<Value>, reply: Completion },
    /// A response arrived from the isolated context
    Response(RpcResponse),
    /// The transport could not deliver a queued request
    DispatchFailed { id: CallId, error: BridgeError },
    /// The deadline for a dispatched call has passed
    Expire { id: CallId },
    /// Number of calls still waiting for a response
    PendingCount { reply: RpcReplyPort<usize> }
}

/// Messages for the JobExecutor actor (single-flight guard)
#[derive(Debug)]
pub enum ExecutorMessage {
    /// Start a job if none is running
    StartJob { reply: RpcReplyPort<JobStart> },
    /// A job task ended, on any path
    JobFinished { report: JobReport, notify: oneshot::Sender<JobReport> },
    /// Current running flag and counters
    GetStatus { reply: RpcReplyPort<ExecutorStatus> }
}

/// Health snapshot of a running bridge
#[derive(Debug, Clone)]
pub struct BridgeHealth {
    pub pending_calls:  usize,
    pub job_running:    bool,
    pub jobs_started:   u64,
    pub jobs_failed:    u64,
    pub started_at:     DateTime<Utc>,
    pub uptime_seconds: u64
}

// Implement Message trait for Ractor
impl Message for BrokerMessage {}
impl Message for ExecutorMessage {}

impl From<RpcResponse> for BrokerMessage {
    fn from(response: RpcResponse) -> Self {
        BrokerMessage::Response(response)
    }
}

impl BrokerMessage {
    pub fn invoke(method: impl Into<String>, args: Vec<Value>, reply: Completion) -> Self {
        BrokerMessage::Invoke { method: method.into(), args, reply }
    }
}
