//! Request logger configuration
//!
//! A logger starts from defaults and applies a list of [`LogOption`]s in
//! order. Later options win over earlier ones touching the same setting.
//! Once every option has been applied the skip policy is resolved a single
//! time:
//!
//! 1. an explicit predicate from [`with_skip_predicate`] wins,
//! 2. otherwise a non-empty set from [`with_skip_paths`] skips exact path
//!    matches,
//! 3. otherwise nothing is skipped.
//!
//! # Example
//!
//! ```rust
//! use reqlog::{with_log_message, with_skip_paths, RequestLogger, TracingSink};
//!
//! let logger = RequestLogger::new(
//!     TracingSink::new(),
//!     [
//!         with_log_message("access"),
//!         with_skip_paths(["/health", "/favicon.ico"]),
//!     ],
//! );
//! assert_eq!(logger.log_message(), "access");
//! ```

use crate::defaults::{
    default_post_handling_fields, default_pre_handling_fields, never_skip, DEFAULT_LOG_MESSAGE,
};
use crate::error::{ConfigError, Result};
use crate::field::Field;
use crate::sink::LogSink;
use http::{request, response};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Decides whether a request bypasses logging
pub type SkipFn = Arc<dyn Fn(&request::Parts) -> bool + Send + Sync>;

/// Produces the fields captured before the downstream service runs
pub type PreFieldsFn = Arc<dyn Fn(&request::Parts) -> Vec<Field> + Send + Sync>;

/// Appends fields once the response is available
pub type PostFieldsFn = Arc<dyn Fn(&response::Parts, &mut Vec<Field>, Duration) + Send + Sync>;

/// Options before resolution
#[derive(Clone)]
pub(crate) struct Options {
    log_message: Cow<'static, str>,
    skip_paths: Option<HashSet<String>>,
    skip: Option<SkipFn>,
    pre_fields: PreFieldsFn,
    post_fields: PostFieldsFn,
    level: Level,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log_message: Cow::Borrowed(DEFAULT_LOG_MESSAGE),
            skip_paths: None,
            skip: None,
            pre_fields: Arc::new(default_pre_handling_fields),
            post_fields: Arc::new(default_post_handling_fields),
            level: Level::INFO,
        }
    }
}

impl Options {
    fn resolve(self, sink: Arc<dyn LogSink>) -> LoggerConfig {
        let skip: SkipFn = match (self.skip, self.skip_paths) {
            (Some(skip), _) => skip,
            (None, Some(paths)) if !paths.is_empty() => {
                Arc::new(move |parts: &request::Parts| paths.contains(parts.uri.path()))
            }
            _ => Arc::new(never_skip),
        };

        LoggerConfig {
            log_message: self.log_message,
            skip,
            pre_fields: self.pre_fields,
            post_fields: self.post_fields,
            level: self.level,
            sink,
        }
    }
}

/// Resolved, immutable configuration shared by every wrapped service
pub(crate) struct LoggerConfig {
    pub(crate) log_message: Cow<'static, str>,
    pub(crate) skip: SkipFn,
    pub(crate) pre_fields: PreFieldsFn,
    pub(crate) post_fields: PostFieldsFn,
    pub(crate) level: Level,
    pub(crate) sink: Arc<dyn LogSink>,
}

/// A single configuration change applied while building a [`RequestLogger`]
#[derive(Clone)]
pub struct LogOption(OptionKind);

#[derive(Clone)]
enum OptionKind {
    LogMessage(Cow<'static, str>),
    SkipPaths(HashSet<String>),
    SkipPredicate(SkipFn),
    PreFields(PreFieldsFn),
    PostFields(PostFieldsFn),
    Level(Level),
}

impl LogOption {
    fn apply(self, opts: &mut Options) {
        match self.0 {
            OptionKind::LogMessage(msg) => opts.log_message = msg,
            OptionKind::SkipPaths(paths) => opts.skip_paths = Some(paths),
            OptionKind::SkipPredicate(skip) => opts.skip = Some(skip),
            OptionKind::PreFields(f) => opts.pre_fields = f,
            OptionKind::PostFields(f) => opts.post_fields = f,
            OptionKind::Level(level) => opts.level = level,
        }
    }
}

impl fmt::Debug for LogOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            OptionKind::LogMessage(msg) => f.debug_tuple("LogMessage").field(msg).finish(),
            OptionKind::SkipPaths(paths) => f.debug_tuple("SkipPaths").field(paths).finish(),
            OptionKind::SkipPredicate(_) => f.write_str("SkipPredicate(..)"),
            OptionKind::PreFields(_) => f.write_str("PreFields(..)"),
            OptionKind::PostFields(_) => f.write_str("PostFields(..)"),
            OptionKind::Level(level) => f.debug_tuple("Level").field(level).finish(),
        }
    }
}

/// Message attached to every record (default `"request record"`)
pub fn with_log_message(message: impl Into<Cow<'static, str>>) -> LogOption {
    LogOption(OptionKind::LogMessage(message.into()))
}

/// Skip requests whose path is exactly one of `paths`
///
/// Each call builds a fresh set from its own input; a later call replaces
/// an earlier one rather than extending it. Ignored when a skip predicate
/// is also configured.
pub fn with_skip_paths<I, P>(paths: I) -> LogOption
where
    I: IntoIterator<Item = P>,
    P: Into<String>,
{
    LogOption(OptionKind::SkipPaths(
        paths.into_iter().map(Into::into).collect(),
    ))
}

/// Custom skip predicate; takes priority over [`with_skip_paths`]
pub fn with_skip_predicate<F>(skip: F) -> LogOption
where
    F: Fn(&request::Parts) -> bool + Send + Sync + 'static,
{
    LogOption(OptionKind::SkipPredicate(Arc::new(skip)))
}

/// Replace the default pre-handling producer
pub fn with_pre_handling_fields<F>(f: F) -> LogOption
where
    F: Fn(&request::Parts) -> Vec<Field> + Send + Sync + 'static,
{
    LogOption(OptionKind::PreFields(Arc::new(f)))
}

/// Replace the default post-handling producer
pub fn with_post_handling_fields<F>(f: F) -> LogOption
where
    F: Fn(&response::Parts, &mut Vec<Field>, Duration) + Send + Sync + 'static,
{
    LogOption(OptionKind::PostFields(Arc::new(f)))
}

/// Severity of emitted records (default `INFO`)
pub fn with_level(level: Level) -> LogOption {
    LogOption(OptionKind::Level(level))
}

/// Request logging middleware
///
/// Cheap to clone; every clone shares the same configuration. Wrap a
/// service with [`RequestLogger::wrap`] or use it as a `tower::Layer`.
#[derive(Clone)]
pub struct RequestLogger {
    pub(crate) config: Arc<LoggerConfig>,
}

impl RequestLogger {
    /// Create a logger writing to `sink`, configured by `options`
    pub fn new<K, I>(sink: K, options: I) -> Self
    where
        K: LogSink,
        I: IntoIterator<Item = LogOption>,
    {
        let mut opts = Options::default();
        for option in options {
            option.apply(&mut opts);
        }
        Self::from_options(opts, Arc::new(sink))
    }

    /// Create a builder
    pub fn builder() -> RequestLoggerBuilder {
        RequestLoggerBuilder::default()
    }

    fn from_options(opts: Options, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config: Arc::new(opts.resolve(sink)),
        }
    }

    /// Message attached to every record
    pub fn log_message(&self) -> &str {
        &self.config.log_message
    }

    /// Severity of emitted records
    pub fn level(&self) -> Level {
        self.config.level
    }

    /// Whether a request with this head would bypass logging
    pub fn is_skipped(&self, parts: &request::Parts) -> bool {
        (self.config.skip)(parts)
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("log_message", &self.config.log_message)
            .field("level", &self.config.level)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RequestLogger`]
///
/// ```rust
/// use reqlog::{JsonSink, RequestLogger};
///
/// let logger = RequestLogger::builder()
///     .sink(JsonSink::stdout())
///     .log_message("http")
///     .skip_paths(["/metrics"])
///     .build()
///     .expect("sink is set");
/// assert_eq!(logger.log_message(), "http");
/// ```
#[derive(Default)]
pub struct RequestLoggerBuilder {
    sink: Option<Arc<dyn LogSink>>,
    options: Options,
}

impl RequestLoggerBuilder {
    /// Set the sink records are written to
    pub fn sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Set a sink that is already shared
    pub fn shared_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Apply a prepared option
    pub fn option(mut self, option: LogOption) -> Self {
        option.apply(&mut self.options);
        self
    }

    /// Apply several prepared options in order
    pub fn options(mut self, options: impl IntoIterator<Item = LogOption>) -> Self {
        for option in options {
            option.apply(&mut self.options);
        }
        self
    }

    /// See [`with_log_message`]
    pub fn log_message(self, message: impl Into<Cow<'static, str>>) -> Self {
        self.option(with_log_message(message))
    }

    /// See [`with_skip_paths`]
    pub fn skip_paths<I, P>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.option(with_skip_paths(paths))
    }

    /// See [`with_skip_predicate`]
    pub fn skip_predicate<F>(self, skip: F) -> Self
    where
        F: Fn(&request::Parts) -> bool + Send + Sync + 'static,
    {
        self.option(with_skip_predicate(skip))
    }

    /// See [`with_pre_handling_fields`]
    pub fn pre_handling_fields<F>(self, f: F) -> Self
    where
        F: Fn(&request::Parts) -> Vec<Field> + Send + Sync + 'static,
    {
        self.option(with_pre_handling_fields(f))
    }

    /// See [`with_post_handling_fields`]
    pub fn post_handling_fields<F>(self, f: F) -> Self
    where
        F: Fn(&response::Parts, &mut Vec<Field>, Duration) + Send + Sync + 'static,
    {
        self.option(with_post_handling_fields(f))
    }

    /// See [`with_level`]
    pub fn level(self, level: Level) -> Self {
        self.option(with_level(level))
    }

    /// Resolve the configuration
    ///
    /// Fails with [`ConfigError::MissingSink`] when no sink was set.
    pub fn build(self) -> Result<RequestLogger> {
        let sink = self.sink.ok_or(ConfigError::MissingSink)?;
        Ok(RequestLogger::from_options(self.options, sink))
    }
}
