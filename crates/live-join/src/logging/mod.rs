//! Logging setup with a reloadable filter.
//!
//! The filter comes from `RUST_LOG` when it holds a valid directive,
//! otherwise from [`WatcherConfig::log_filter`]. Timestamps are RFC 3339 in
//! the local timezone.

use chrono::{Local, SecondsFormat};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
};

use crate::config::WatcherConfig;
use crate::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "live_join=info";

/// RFC 3339 local time with millisecond precision.
#[derive(Debug, Clone, Copy, Default)]
struct Rfc3339Local;

impl Rfc3339Local {
    fn timestamp() -> String {
        Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)
    }
}

impl FormatTime for Rfc3339Local {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        w.write_str(&Self::timestamp())
    }
}

pub type FilterHandle = Handle<EnvFilter, Registry>;

/// Handle to the installed subscriber's filter.
pub struct LoggingHandle {
    handle: FilterHandle,
}

impl LoggingHandle {
    /// Current filter directive.
    pub fn get_filter(&self) -> String {
        self.handle
            .with_current(|filter| filter.to_string())
            .unwrap_or_default()
    }

    /// Replace the filter directive, e.g. `live_join=debug`.
    pub fn set_filter(&self, directive: &str) -> Result<()> {
        let filter = parse_filter(directive)?;

        self.handle
            .reload(filter)
            .map_err(|e| Error::Other(format!("Failed to reload filter: {}", e)))?;

        info!(directive = %directive, "Log filter updated");
        Ok(())
    }
}

pub(crate) fn parse_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| Error::config(format!("Invalid filter directive '{}': {}", directive, e)))
}

/// Pick the initial filter.
///
/// A valid `env` directive wins. An empty or invalid one is skipped in
/// favour of `configured`, then [`DEFAULT_LOG_FILTER`]. An invalid
/// `configured` directive is an error.
fn resolve_filter(env: Option<&str>, configured: Option<&str>) -> Result<EnvFilter> {
    if let Some(filter) = env
        .filter(|directive| !directive.trim().is_empty())
        .and_then(|directive| parse_filter(directive).ok())
    {
        return Ok(filter);
    }
    parse_filter(configured.unwrap_or(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber.
///
/// `directive` is used when `RUST_LOG` is unset or invalid; `None` falls back
/// to [`DEFAULT_LOG_FILTER`]. Fails if a global subscriber is already set.
pub fn init_logging(directive: Option<&str>) -> Result<LoggingHandle> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter_layer, handle) = reload::Layer::new(resolve_filter(env.as_deref(), directive)?);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_timer(Rfc3339Local).with_target(true))
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to initialize logging: {}", e)))?;

    Ok(LoggingHandle { handle })
}

/// [`init_logging`] with the configured `log_filter`.
pub fn init_from_config(config: &WatcherConfig) -> Result<LoggingHandle> {
    init_logging(Some(&config.log_filter))
}
