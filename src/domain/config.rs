//! Persisted configuration document shared with the HTTP collaborator

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/71.0.3578.98 Safari/537.36";

/// Whole configuration object as written to durable storage.
///
/// Only the `request` section is interpreted here. Any other keys are kept
/// verbatim so that writing the document back never loses them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedConfig {
    #[serde(default)]
    pub request: RequestSection,
    #[serde(flatten)]
    pub extra:   Map<String, Value>
}

/// Settings applied to every outbound HTTP request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSection {
    pub cookie:     String,
    pub user_agent: String,
    pub timeout_ms: u64
}

impl Default for RequestSection {
    fn default() -> Self {
        Self { cookie: String::new(), user_agent: DEFAULT_USER_AGENT.to_string(), timeout_ms: 10_000 }
    }
}
