use serde::{Deserialize, Serialize};

/// One name/value pair from the live browsing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub name:  String,
    pub value: String
}

impl Credential {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Session credentials joined into the persisted request cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub cookie:           String,
    pub credential_count: usize
}

impl AuthSnapshot {
    /// Encode pairs as `name=value;` in the order the session store yielded them
    pub fn encode(credentials: &[Credential]) -> Self {
        let cookie = credentials.iter().map(|c| format!("{}={};", c.name, c.value)).collect::<String>();
        Self { cookie, credential_count: credentials.len() }
    }
}
