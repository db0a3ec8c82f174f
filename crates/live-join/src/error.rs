//! Crate-wide error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the watcher and its collaborators.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Channel {channel_id} is already monitored")]
    AlreadyMonitored { channel_id: String },

    #[error("Channel {channel_id} is not monitored")]
    NotMonitored { channel_id: String },

    /// Registration with the notification source failed. The channel stays
    /// in the monitored set.
    #[error("Failed to register channel {channel_id}: {message}")]
    Registration { channel_id: String, message: String },

    #[error("Notification source error: {0}")]
    Source(String),

    #[error("Chat session error: {0}")]
    ChatSession(String),

    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dispatcher is already running")]
    AlreadyRunning,

    #[error("Watcher has been shut down")]
    ShutDown,

    #[error("IO error while {op} {path}: {source}")]
    IoPath {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn already_monitored(channel_id: impl Into<String>) -> Self {
        Self::AlreadyMonitored {
            channel_id: channel_id.into(),
        }
    }

    pub fn not_monitored(channel_id: impl Into<String>) -> Self {
        Self::NotMonitored {
            channel_id: channel_id.into(),
        }
    }

    pub fn source_error(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn chat_error(msg: impl Into<String>) -> Self {
        Self::ChatSession(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error is a monitor/unmonitor precondition failure
    /// (nothing was changed).
    pub fn is_membership_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyMonitored { .. } | Self::NotMonitored { .. }
        )
    }
}
