//! Declarative logger settings
//!
//! [`RequestLogSettings`] is the serde-friendly subset of the options: it can
//! be embedded in an application's own config file or, with the `config`
//! feature, read from `REQLOG_*` environment variables.
//!
//! ```rust
//! use reqlog::{RequestLogSettings, RequestLogger, TracingSink};
//!
//! let settings: RequestLogSettings = serde_json::from_str(
//!     r#"{ "log_message": "access", "skip_paths": ["/health"], "level": "debug" }"#,
//! ).unwrap();
//!
//! let logger = RequestLogger::new(TracingSink::new(), settings.into_options().unwrap());
//! assert_eq!(logger.log_message(), "access");
//! ```

use crate::error::{ConfigError, Result};
use crate::options::{with_level, with_log_message, with_skip_paths, LogOption};
use serde::Deserialize;
use tracing::Level;

/// Prefix of the environment variables read by `from_env`
pub const ENV_PREFIX: &str = "REQLOG_";

/// Serializable logger settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RequestLogSettings {
    /// Message attached to every record
    pub log_message: Option<String>,
    /// Paths that are never logged
    pub skip_paths: Vec<String>,
    /// Record severity: trace, debug, info, warn or error
    pub level: Option<String>,
}

impl RequestLogSettings {
    /// Convert into options, in the order message, skip paths, level
    ///
    /// An empty `skip_paths` list produces no option, leaving whatever the
    /// caller configured before intact.
    pub fn into_options(self) -> Result<Vec<LogOption>> {
        let mut options = Vec::with_capacity(3);

        if let Some(message) = self.log_message {
            options.push(with_log_message(message));
        }
        if !self.skip_paths.is_empty() {
            options.push(with_skip_paths(self.skip_paths));
        }
        if let Some(level) = self.level {
            options.push(with_level(parse_level(&level)?));
        }

        Ok(options)
    }

    /// Read settings from `REQLOG_LOG_MESSAGE`, `REQLOG_SKIP_PATHS`
    /// (comma separated) and `REQLOG_LEVEL`
    #[cfg(feature = "config")]
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<Self>()?)
    }
}

/// Load a `.env` file from the current directory or its parents
///
/// Missing files are not an error. Returns whether a file was loaded.
#[cfg(feature = "config")]
pub fn load_dotenv() -> bool {
    dotenvy::dotenv().is_ok()
}

/// Parse a level name, case-insensitively
pub fn parse_level(name: &str) -> Result<Level> {
    name.trim()
        .parse::<Level>()
        .map_err(|_| ConfigError::InvalidLevel(name.to_string()))
}
