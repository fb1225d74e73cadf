//! Configuration stores - durable document plus hot-reloadable in-memory copy

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering}
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    domain::{config::PersistedConfig, error::BridgeError},
    port::config::ConfigStore
};

/// JSON file backed store
pub struct FileConfigStore {
    path:    PathBuf,
    current: RwLock<PersistedConfig>
}

impl FileConfigStore {
    /// Open the store, loading the file if it exists
    pub async fn open(path: PathBuf) -> Result<Self, BridgeError> {
        let current = Self::read(&path).await?;
        Ok(Self { path, current: RwLock::new(current) })
    }

    async fn read(path: &Path) -> Result<PersistedConfig, BridgeError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                BridgeError::Configuration(format!("Failed to parse config {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedConfig::default()),
            Err(e) => Err(BridgeError::FileSystem(format!("Failed to read config {}: {}", path.display(), e)))
        }
    }

    /// Pretty JSON with 4-space indentation
    fn render(config: &PersistedConfig) -> Result<Vec<u8>, BridgeError> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        serde::Serialize::serialize(config, &mut serializer)?;
        Ok(out)
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn current(&self) -> PersistedConfig {
        self.current.read().await.clone()
    }

    async fn write(&self, config: &PersistedConfig) -> Result<(), BridgeError> {
        let content = Self::render(config)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| BridgeError::FileSystem(e.to_string()))?;
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| BridgeError::FileSystem(format!("Failed to write config {}: {}", self.path.display(), e)))
    }

    async fn reload(&self) -> Result<PersistedConfig, BridgeError> {
        let loaded = Self::read(&self.path).await?;
        *self.current.write().await = loaded.clone();
        Ok(loaded)
    }
}

/// In-memory store; "durable" and loaded copies are kept apart so reloads are observable
#[derive(Default)]
pub struct InMemoryConfigStore {
    persisted:   RwLock<PersistedConfig>,
    current:     RwLock<PersistedConfig>,
    fail_writes: AtomicBool,
    writes:      AtomicUsize,
    reloads:     AtomicUsize
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// What the last successful write stored
    pub async fn persisted(&self) -> PersistedConfig {
        self.persisted.read().await.clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn current(&self) -> PersistedConfig {
        self.current.read().await.clone()
    }

    async fn write(&self, config: &PersistedConfig) -> Result<(), BridgeError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BridgeError::FileSystem("config storage is read-only".to_string()));
        }
        *self.persisted.write().await = config.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reload(&self) -> Result<PersistedConfig, BridgeError> {
        let loaded = self.persisted.read().await.clone();
        *self.current.write().await = loaded.clone();
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(loaded)
    }
}
