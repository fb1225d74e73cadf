use thiserror::Error;

/// Common error types for the bridge
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Configuration related errors
    #[error("{0}")]
    Configuration(String),

    /// File system related errors
    #[error("{0}")]
    FileSystem(String),

    /// Serialization/deserialization errors
    #[error("{0}")]
    Serialization(String),

    /// The isolated context channel refused or lost a message
    #[error("{0}")]
    Channel(String),

    /// Session credential store errors
    #[error("{0}")]
    Session(String),

    /// Network/IO errors from the HTTP collaborator
    #[error("{0}")]
    Network(String),

    /// A dispatched call was not answered before its deadline
    #[error("no response for call {id} within {waited_ms}ms")]
    NoResponse { id: String, waited_ms: u64 },

    /// A correlation id was registered twice
    #[error("call id {0} is already pending")]
    DuplicateCallId(String),

    /// Job body errors
    #[error("{0}")]
    Job(String),

    /// Spawn errors
    #[error("{0}")]
    Spawn(String),

    /// Actor messaging errors
    #[error("{0}")]
    Messaging(String),

    /// The bridge was shut down while the operation was outstanding
    #[error("bridge is shut down")]
    Shutdown,

    /// Generic errors with context
    #[error("{0}")]
    Generic(String)
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::Generic(err.to_string())
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::FileSystem(err.to_string())
    }
}

/// Convert from serde_json::Error
impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

/// Convert from serde_yaml::Error
impl From<serde_yaml::Error> for BridgeError {
    fn from(err: serde_yaml::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

/// Convert from ractor::SpawnErr
impl From<ractor::SpawnErr> for BridgeError {
    fn from(err: ractor::SpawnErr) -> Self {
        BridgeError::Spawn(err.to_string())
    }
}

impl<T> From<ractor::MessagingErr<T>> for BridgeError {
    fn from(err: ractor::MessagingErr<T>) -> Self {
        match err {
            ractor::MessagingErr::ChannelClosed => BridgeError::Shutdown,
            other => BridgeError::Messaging(other.to_string())
        }
    }
}
