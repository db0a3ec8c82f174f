//! Watcher configuration.
//!
//! Configuration is plain TOML; every field has a default so an empty file
//! is valid.
//!
//! ```toml
//! event_buffer = 64
//! command_prefix = "!"
//! dedupe_joins = false
//! state_path = "data/youtubejoin.json"
//! log_filter = "live_join=debug"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::logging::{self, DEFAULT_LOG_FILTER};
use crate::store::StateStore;
use crate::{Error, Result};

/// Default capacity of the live event stream.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Default command prefix.
pub const DEFAULT_COMMAND_PREFIX: &str = "!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Capacity of the live event stream. A full stream makes the
    /// notification source wait.
    pub event_buffer: usize,
    /// Prefix for chat commands, e.g. `!` in `!leave`.
    pub command_prefix: String,
    /// Skip joining a chat id already joined for the same channel.
    pub dedupe_joins: bool,
    /// Where the monitored set is saved between runs.
    pub state_path: Option<PathBuf>,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            dedupe_joins: false,
            state_path: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl WatcherConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| Error::config(format!("invalid watcher config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_path("reading", path, e))?;
        Self::from_toml_str(&content)
    }

    /// Store for the monitored set, if a state path is configured.
    pub fn state_store(&self) -> Option<StateStore> {
        self.state_path.as_ref().map(StateStore::new)
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_buffer == 0 {
            return Err(Error::config("event_buffer must be greater than zero"));
        }
        if self.command_prefix.is_empty() {
            return Err(Error::config("command_prefix must not be empty"));
        }
        if self.command_prefix.chars().any(char::is_whitespace) {
            return Err(Error::config("command_prefix must not contain whitespace"));
        }
        logging::parse_filter(&self.log_filter)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = WatcherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.event_buffer, 64);
        assert_eq!(config.command_prefix, "!");
        assert!(!config.dedupe_joins);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = WatcherConfig::from_toml_str("").unwrap();
        assert_eq!(config, WatcherConfig::default());
    }

    #[test]
    fn test_parse_fields() {
        let config = WatcherConfig::from_toml_str(
            r#"
            event_buffer = 8
            command_prefix = "?"
            dedupe_joins = true
            state_path = "state/youtubejoin.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.event_buffer, 8);
        assert_eq!(config.command_prefix, "?");
        assert!(config.dedupe_joins);
        assert_eq!(
            config.state_path,
            Some(PathBuf::from("state/youtubejoin.json"))
        );
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(
            config.state_store().unwrap().path(),
            Path::new("state/youtubejoin.json")
        );
        assert!(WatcherConfig::default().state_store().is_none());
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            WatcherConfig::from_toml_str("event_buffer = 0"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            WatcherConfig::from_toml_str(r#"command_prefix = """#),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            WatcherConfig::from_toml_str(r#"command_prefix = "! ""#),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            WatcherConfig::from_toml_str("event_buffer = \"many\""),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_log_filter_is_validated() {
        let config = WatcherConfig::from_toml_str(r#"log_filter = "live_join=debug,warn""#).unwrap();
        assert_eq!(config.log_filter, "live_join=debug,warn");

        match WatcherConfig::from_toml_str(r#"log_filter = "live_join=chatty""#) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("live_join=chatty")),
            other => panic!("invalid log_filter accepted: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watcher.toml");
        tokio::fs::write(&path, "dedupe_joins = true\n").await.unwrap();

        let config = WatcherConfig::load(&path).await.unwrap();
        assert!(config.dedupe_joins);

        let missing = WatcherConfig::load(&dir.path().join("missing.toml")).await;
        assert!(matches!(missing, Err(Error::IoPath { .. })));
    }
}
