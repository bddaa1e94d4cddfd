//! Basic reqlog demo server
//!
//! Serves `/foo`, `/bar` and `/no-log`, logging every request except
//! `/no-log` and `/favicon.ico`.
//!
//! Run with: cargo run -p basic-server
//! Then test: curl http://127.0.0.1:8080/foo
//!
//! Environment:
//! - `REQLOG_DEMO_ADDR` - listen address (default `127.0.0.1:8080`)
//! - `REQLOG_FORMAT=json` - write request records as JSON lines to stdout
//!   instead of through the tracing subscriber
//! - `REQLOG_LOG_MESSAGE`, `REQLOG_SKIP_PATHS`, `REQLOG_LEVEL` - override
//!   the logger settings
//! - `RUST_LOG` - tracing filter (default `info`)

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use reqlog::{
    with_skip_paths, ClientAddr, JsonSink, LogOption, RequestLogSettings, RequestLogger,
    TracingSink,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::{service_fn, ServiceExt};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn router(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let (status, body) = match (req.method(), req.uri().path()) {
        (&Method::GET, "/foo") => (StatusCode::OK, "foo"),
        (&Method::GET, "/bar") => (StatusCode::OK, "bar"),
        (&Method::GET, "/no-log") => (StatusCode::OK, "no-log"),
        _ => (StatusCode::NOT_FOUND, "not found"),
    };

    let mut res = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *res.status_mut() = status;
    Ok(res)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn build_logger() -> Result<RequestLogger, BoxError> {
    let mut options: Vec<LogOption> = vec![with_skip_paths(["/no-log", "/favicon.ico"])];
    options.extend(RequestLogSettings::from_env()?.into_options()?);

    let json = std::env::var("REQLOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let logger = if json {
        RequestLogger::builder()
            .sink(JsonSink::stdout())
            .options(options)
            .build()?
    } else {
        RequestLogger::builder()
            .sink(TracingSink::new())
            .options(options)
            .build()?
    };
    Ok(logger)
}

async fn run() -> Result<(), BoxError> {
    if reqlog::load_dotenv() {
        info!("Loaded .env file");
    }

    let logger = build_logger()?;
    let addr: SocketAddr = std::env::var("REQLOG_DEMO_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;
    let listener = TcpListener::bind(addr).await?;
    let app = logger.wrap(service_fn(router));

    info!(log_message = logger.log_message(), "Server running on http://{}", addr);

    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let app = app.clone();

        tokio::spawn(async move {
            let service = hyper::service::service_fn(move |mut req: Request<Incoming>| {
                req.extensions_mut().insert(ClientAddr(remote_addr));
                app.clone().oneshot(req)
            });

            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                error!("Connection error: {}", err);
            }
        });
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        error!("Server failed to start: {}", err);
        std::process::exit(1);
    }
}
