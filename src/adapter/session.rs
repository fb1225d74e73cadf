//! Session credential stores
//!
//! - FileSessionStore: a JSON array of `{name, value}` exported from the browser
//! - InMemorySessionStore: for development and testing

use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering}
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    domain::{error::BridgeError, session::Credential},
    port::session::SessionStore
};

/// Credentials kept in a JSON file; a missing file is an empty session
pub struct FileSessionStore {
    path: PathBuf
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn read_all_credentials(&self) -> Result<Vec<Credential>, BridgeError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(BridgeError::Session(format!("Failed to read session {}: {}", self.path.display(), e)));
            }
        };

        serde_json::from_str(&content)
            .map_err(|e| BridgeError::Session(format!("Invalid session file {}: {}", self.path.display(), e)))
    }

    async fn clear(&self) -> Result<(), BridgeError> {
        tokio::fs::write(&self.path, "[]")
            .await
            .map_err(|e| BridgeError::Session(format!("Failed to clear session {}: {}", self.path.display(), e)))
    }
}

/// In-memory credential store with failure injection
#[derive(Default)]
pub struct InMemorySessionStore {
    credentials: RwLock<Vec<Credential>>,
    fail_reads:  AtomicBool,
    reads:       AtomicUsize
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Vec<Credential>) -> Self {
        Self { credentials: RwLock::new(credentials), ..Self::default() }
    }

    pub async fn set_credentials(&self, credentials: Vec<Credential>) {
        *self.credentials.write().await = credentials;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// How many times credentials were read
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn read_all_credentials(&self) -> Result<Vec<Credential>, BridgeError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BridgeError::Session("session store unavailable".to_string()));
        }
        Ok(self.credentials.read().await.clone())
    }

    async fn clear(&self) -> Result<(), BridgeError> {
        self.credentials.write().await.clear();
        Ok(())
    }
}
