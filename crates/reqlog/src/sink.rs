//! Log sinks: where finished request records go
//!
//! A [`LogSink`] receives one call per logged request with the severity,
//! the configured message and the ordered field set. Sinks never report
//! errors back to the middleware; buffering and write failures are their
//! own concern.
//!
//! Two sinks ship with the crate:
//! - [`TracingSink`] forwards records as `tracing` events, so the host's
//!   subscriber decides filtering and formatting.
//! - [`JsonSink`] writes one JSON object per line to any `io::Write`.

use crate::field::{Field, Logfmt};
use serde::ser::{SerializeMap, Serializer};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::Level;

/// Target used by [`TracingSink`] events
pub const ACCESS_TARGET: &str = "reqlog::access";

/// Structured logging backend
pub trait LogSink: Send + Sync + 'static {
    /// Emit one record
    fn emit(&self, level: Level, message: &str, fields: &[Field]);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(&self, level: Level, message: &str, fields: &[Field]) {
        (**self).emit(level, message, fields)
    }
}

impl<T: LogSink + ?Sized> LogSink for Box<T> {
    fn emit(&self, level: Level, message: &str, fields: &[Field]) {
        (**self).emit(level, message, fields)
    }
}

/// Sink that emits `tracing` events
///
/// Each record becomes one event under the `reqlog::access` target with the
/// configured message and a `fields` value rendered as logfmt:
///
/// ```text
/// INFO reqlog::access: request record fields=ip=127.0.0.1 method=GET uri=/foo status=200 latency=1.2ms
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a new tracing sink
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn emit(&self, level: Level, message: &str, fields: &[Field]) {
        let fields = Logfmt(fields);
        match level {
            Level::TRACE => tracing::trace!(target: ACCESS_TARGET, fields = %fields, "{}", message),
            Level::DEBUG => tracing::debug!(target: ACCESS_TARGET, fields = %fields, "{}", message),
            Level::WARN => tracing::warn!(target: ACCESS_TARGET, fields = %fields, "{}", message),
            Level::ERROR => tracing::error!(target: ACCESS_TARGET, fields = %fields, "{}", message),
            _ => tracing::info!(target: ACCESS_TARGET, fields = %fields, "{}", message),
        }
    }
}

/// Sink that writes JSON lines
///
/// Every record is a single line:
///
/// ```text
/// {"level":"info","ts":1718000000.123,"msg":"request record","ip":"127.0.0.1","method":"GET","uri":"/foo","status":200,"latency":0.0012}
/// ```
///
/// Field order is preserved. Durations are float seconds. Lines are written
/// under a mutex so concurrent requests never interleave within a line.
pub struct JsonSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> JsonSink<W> {
    /// Create a sink writing to `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonSink<std::io::Stderr> {
    /// Sink writing to standard error
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl JsonSink<std::io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> LogSink for JsonSink<W> {
    fn emit(&self, level: Level, message: &str, fields: &[Field]) {
        let line = match encode_line(level, message, fields) {
            Ok(line) => line,
            Err(_) => return,
        };

        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writer.write_all(&line);
    }
}

fn encode_line(level: Level, message: &str, fields: &[Field]) -> serde_json::Result<Vec<u8>> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    let mut buf = Vec::with_capacity(256);
    {
        let mut ser = serde_json::Serializer::new(&mut buf);
        let mut map = ser.serialize_map(Some(fields.len() + 3))?;
        map.serialize_entry("level", &level_name(level))?;
        map.serialize_entry("ts", &ts)?;
        map.serialize_entry("msg", message)?;
        for field in fields {
            map.serialize_entry(field.key(), field.value())?;
        }
        map.end()?;
    }
    buf.push(b'\n');
    Ok(buf)
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::WARN => "warn",
        Level::ERROR => "error",
        _ => "info",
    }
}
