use std::{fs, path::PathBuf, time::Duration};

use directories::ProjectDirs;
use serde::Serialize;

use crate::domain::error::BridgeError;

/// Default deadline used by the CLI for calls into the isolated context
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Broker runtime settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Resolve a call with `NoResponse` if the context stays silent this long.
    /// `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
    /// Log the full JSON of every dispatched request
    pub log_payloads: bool
}

/// Resolved file layout, as reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathLayout {
    pub config_dir:   PathBuf,
    pub config_path:  PathBuf,
    pub session_path: PathBuf
}

/// Application configuration for storage locations and runtime settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base configuration directory
    pub config_dir:   PathBuf,
    /// Persisted configuration document (request section lives here)
    pub config_path:  PathBuf,
    /// Exported session credentials
    pub session_path: PathBuf,
    /// Broker settings
    pub broker:       BrokerSettings
}

impl AppConfig {
    pub fn init() -> Result<Self, BridgeError> {
        let config = Self::new()?;
        config.ensure_dirs_exist()?;
        Ok(config)
    }

    /// Resolve the platform configuration directory
    fn new() -> Result<Self, BridgeError> {
        let project_dirs = ProjectDirs::from("org", "sigbridge", "sigbridge")
            .ok_or_else(|| BridgeError::Configuration("could not determine a home directory".to_string()))?;

        Ok(Self::in_dir(project_dirs.config_dir().to_path_buf()))
    }

    /// Lay out every file under `config_dir`
    pub fn in_dir(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.json");
        let session_path = config_dir.join("session.json");

        Self { config_dir, config_path, session_path, broker: BrokerSettings::default() }
    }

    pub fn path_layout(&self) -> PathLayout {
        PathLayout {
            config_dir:   self.config_dir.clone(),
            config_path:  self.config_path.clone(),
            session_path: self.session_path.clone()
        }
    }

    pub fn with_broker(mut self, broker: BrokerSettings) -> Self {
        self.broker = broker;
        self
    }

    /// Create the configuration directory if it doesn't exist
    pub fn ensure_dirs_exist(&self) -> Result<(), BridgeError> {
        fs::create_dir_all(&self.config_dir).map_err(|e| {
            BridgeError::FileSystem(format!("Failed to create {}: {}", self.config_dir.display(), e))
        })?;
        Ok(())
    }
}
