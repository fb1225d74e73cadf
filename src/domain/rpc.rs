//! Wire types exchanged with the isolated execution context

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque correlation id tagging one outstanding call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CallId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Produces ids that are unique for the lifetime of one broker.
///
/// A monotonically increasing counter guarantees uniqueness; the random
/// suffix keeps ids from two broker instances from looking alike in logs.
#[derive(Debug, Default)]
pub struct CallIdGenerator {
    issued: u64
}

impl CallIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> CallId {
        self.issued += 1;
        let suffix = Uuid::new_v4().simple().to_string();
        CallId(format!("call-{}-{}", self.issued, &suffix[..12]))
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }
}

/// Invocation sent into the isolated context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub args:   Vec<Value>,
    pub id:     CallId
}

/// Result emitted by the isolated context for a previously dispatched id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id:    CallId,
    #[serde(default)]
    pub value: Value
}
