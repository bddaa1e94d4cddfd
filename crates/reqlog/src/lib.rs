//! # reqlog
//!
//! Structured request logging middleware for `tower` and `hyper` services.
//!
//! Wrapping a service with a [`RequestLogger`] emits one structured record
//! per request: client IP, method, URI and user agent captured before the
//! handler runs, then status code and latency once it has responded.
//! Requests can be excluded by path or by a custom predicate, and every
//! field producer can be replaced.
//!
//! Records go to a [`LogSink`]. [`TracingSink`] forwards them to the
//! `tracing` subscriber of the host; [`JsonSink`] writes JSON lines to any
//! writer.
//!
//! ## Features
//!
//! - `config` - `RequestLogSettings::from_env` and `.env` loading
//!
//! ## Example
//!
//! ```rust
//! use reqlog::{with_skip_paths, RequestLogger, TracingSink};
//! use std::convert::Infallible;
//! use tower::{service_fn, ServiceExt};
//!
//! # async fn run() {
//! let logger = RequestLogger::new(TracingSink::new(), [with_skip_paths(["/health"])]);
//!
//! let svc = logger.wrap(service_fn(|_req: http::Request<()>| async {
//!     Ok::<_, Infallible>(http::Response::new("hello"))
//! }));
//!
//! let req = http::Request::builder().uri("/hello").body(()).unwrap();
//! let res = svc.oneshot(req).await.unwrap();
//! assert_eq!(res.status(), 200);
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod context;
mod defaults;
mod error;
mod field;
mod layer;
mod options;
pub mod settings;
pub mod sink;

pub use context::{client_ip, request_uri, user_agent, ClientAddr};
pub use defaults::{
    default_post_handling_fields, default_pre_handling_fields, never_skip, DEFAULT_LOG_MESSAGE,
};
pub use error::{ConfigError, Result};
pub use field::{Field, FieldValue};
pub use layer::{RequestLogService, ResponseFuture};
pub use options::{
    with_level, with_log_message, with_post_handling_fields, with_pre_handling_fields,
    with_skip_paths, with_skip_predicate, LogOption, PostFieldsFn, PreFieldsFn, RequestLogger,
    RequestLoggerBuilder, SkipFn,
};
pub use settings::RequestLogSettings;
pub use sink::{JsonSink, LogSink, TracingSink};

#[cfg(feature = "config")]
pub use settings::load_dotenv;
