//! Correlation Registry - pending calls keyed by correlation id
//!
//! Owned by the Broker actor's state, so every access already happens
//! inside a single serialized message handler and needs no locking.

use std::{collections::HashMap, time::Instant};

use ractor::RpcReplyPort;
use serde_json::Value;
use tokio::task::AbortHandle;

use crate::domain::{
    error::BridgeError,
    rpc::{CallId, RpcRequest}
};

/// Completion handle resolved exactly once with the context's answer
pub type Completion = RpcReplyPort<Result<Value, BridgeError>>;

/// One outstanding cross-context invocation
#[derive(Debug)]
pub struct PendingCall {
    pub id:            CallId,
    pub method:        String,
    pub args:          Vec<Value>,
    pub completion:    Completion,
    pub dispatched_at: Instant,
    /// Deadline task, cancelled once the call resolves
    timer:             Option<AbortHandle>
}

impl PendingCall {
    pub fn new(request: &RpcRequest, completion: Completion) -> Self {
        Self {
            id: request.id.clone(),
            method: request.method.clone(),
            args: request.args.clone(),
            completion,
            dispatched_at: Instant::now(),
            timer: None
        }
    }

    /// Attach the task that expires this call
    pub fn with_timer(mut self, timer: AbortHandle) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Resolve the waiting caller, consuming the record.
    ///
    /// Returns false when the caller has already gone away.
    pub fn resolve(self, result: Result<Value, BridgeError>) -> bool {
        if let Some(timer) = &self.timer {
            timer.abort();
        }
        self.completion.send(result).is_ok()
    }
}

#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    pending: HashMap<CallId, PendingCall>
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending call; an id that is already pending is a caller bug
    pub fn put(&mut self, call: PendingCall) -> Result<(), (BridgeError, PendingCall)> {
        if self.pending.contains_key(&call.id) {
            return Err((BridgeError::DuplicateCallId(call.id.to_string()), call));
        }
        self.pending.insert(call.id.clone(), call);
        Ok(())
    }

    /// Remove and return the pending call for `id`, if any
    pub fn take(&mut self, id: &CallId) -> Option<PendingCall> {
        self.pending.remove(id)
    }

    pub fn contains(&self, id: &CallId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove every pending call (used on shutdown)
    pub fn drain(&mut self) -> Vec<PendingCall> {
        self.pending.drain().map(|(_, call)| call).collect()
    }
}
