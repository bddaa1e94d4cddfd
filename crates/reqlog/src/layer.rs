//! Tower integration: the logging decorator
//!
//! [`RequestLogService`] wraps any `tower::Service` over `http` requests and
//! responses. For each request it checks the skip predicate; skipped
//! requests are forwarded untouched. Otherwise the pre-handling fields are
//! captured and a timer started, the inner service runs, and once it yields
//! a response the post-handling fields are appended and one record is
//! emitted to the sink.
//!
//! Only successful completions are logged. When the inner service returns
//! an error, panics, or its future is dropped early, no record is written.

use crate::field::Field;
use crate::options::{LoggerConfig, RequestLogger};
use http::{Request, Response};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

impl RequestLogger {
    /// Wrap `service` so its requests are logged
    pub fn wrap<S>(&self, service: S) -> RequestLogService<S> {
        RequestLogService {
            inner: service,
            config: self.config.clone(),
        }
    }
}

impl<S> Layer<S> for RequestLogger {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        self.wrap(inner)
    }
}

/// Service produced by [`RequestLogger::wrap`]
#[derive(Clone)]
pub struct RequestLogService<S> {
    inner: S,
    config: Arc<LoggerConfig>,
}

impl<S> RequestLogService<S> {
    /// Get a reference to the wrapped service
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consume the wrapper, returning the wrapped service
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLogService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let (parts, body) = req.into_parts();

        let pending = if (self.config.skip)(&parts) {
            None
        } else {
            let fields = (self.config.pre_fields)(&parts);
            Some(Pending {
                fields,
                start: Instant::now(),
                config: self.config.clone(),
            })
        };

        ResponseFuture {
            inner: self.inner.call(Request::from_parts(parts, body)),
            pending,
        }
    }
}

/// State carried from `call` to completion for a logged request
struct Pending {
    fields: Vec<Field>,
    start: Instant,
    config: Arc<LoggerConfig>,
}

impl Pending {
    fn finish<B>(self, response: Response<B>) -> Response<B> {
        let Pending {
            mut fields,
            start,
            config,
        } = self;
        let latency = start.elapsed();

        let (parts, body) = response.into_parts();
        (config.post_fields)(&parts, &mut fields, latency);
        config.sink.emit(config.level, &config.log_message, &fields);

        Response::from_parts(parts, body)
    }
}

pin_project! {
    /// Response future of [`RequestLogService`]
    pub struct ResponseFuture<F> {
        #[pin]
        inner: F,
        pending: Option<Pending>,
    }
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let response = ready!(this.inner.poll(cx))?;

        let response = match this.pending.take() {
            Some(pending) => pending.finish(response),
            None => response,
        };
        Poll::Ready(Ok(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;
    use crate::options::{
        with_level, with_log_message, with_post_handling_fields, with_pre_handling_fields,
        with_skip_paths, with_skip_predicate,
    };
    use crate::sink::LogSink;
    use crate::ClientAddr;
    use futures_util::FutureExt;
    use http::StatusCode;
    use proptest::prelude::*;
    use std::convert::Infallible;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::{service_fn, ServiceBuilder, ServiceExt};
    use tracing::Level;

    #[derive(Debug, Clone)]
    struct Record {
        level: Level,
        message: String,
        fields: Vec<Field>,
    }

    impl Record {
        fn get(&self, key: &str) -> Option<&FieldValue> {
            self.fields.iter().find(|f| f.key() == key).map(|f| f.value())
        }
    }

    /// Sink that keeps records in memory
    #[derive(Clone, Default)]
    struct MemorySink {
        records: Arc<Mutex<Vec<Record>>>,
    }

    impl MemorySink {
        fn records(&self) -> Vec<Record> {
            self.records.lock().unwrap().clone()
        }
    }

    impl LogSink for MemorySink {
        fn emit(&self, level: Level, message: &str, fields: &[Field]) {
            self.records.lock().unwrap().push(Record {
                level,
                message: message.to_string(),
                fields: fields.to_vec(),
            });
        }
    }

    async fn ok_handler(_req: Request<()>) -> Result<Response<&'static str>, Infallible> {
        Ok(Response::new("ok"))
    }

    fn get(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    #[tokio::test]
    async fn test_logs_default_fields() {
        let sink = MemorySink::default();
        let svc = RequestLogger::new(sink.clone(), []).wrap(service_fn(ok_handler));

        let req = Request::builder()
            .method("PUT")
            .uri("/foo?a=1")
            .header("user-agent", "Client-User-Agent")
            .extension(ClientAddr("127.0.0.1:5000".parse().unwrap()))
            .body(())
            .unwrap();
        let res = svc.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(*res.body(), "ok");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.level, Level::INFO);
        assert_eq!(record.message, "request record");

        let keys: Vec<&str> = record.fields.iter().map(|f| f.key()).collect();
        assert_eq!(keys, ["ip", "method", "uri", "agent", "status", "latency"]);
        assert_eq!(record.get("ip").and_then(|v| v.as_str()), Some("127.0.0.1"));
        assert_eq!(record.get("method").and_then(|v| v.as_str()), Some("PUT"));
        assert_eq!(record.get("uri").and_then(|v| v.as_str()), Some("/foo?a=1"));
        assert_eq!(record.get("status").and_then(|v| v.as_i64()), Some(200));
    }

    #[tokio::test]
    async fn test_skip_paths_emit_nothing() {
        let sink = MemorySink::default();
        let logger = RequestLogger::new(sink.clone(), [with_skip_paths(["/no-log"])]);
        let svc = logger.wrap(service_fn(ok_handler));

        svc.clone().oneshot(get("/foo")).await.unwrap();
        let res = svc.clone().oneshot(get("/no-log")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get("uri").and_then(|v| v.as_str()),
            Some("/foo")
        );
    }

    #[tokio::test]
    async fn test_skip_predicate_always_true() {
        let sink = MemorySink::default();
        let logger = RequestLogger::new(sink.clone(), [with_skip_predicate(|_| true)]);
        let svc = logger.wrap(service_fn(ok_handler));

        svc.clone().oneshot(get("/foo")).await.unwrap();
        svc.clone().oneshot(get("/bar")).await.unwrap();

        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_skipped_request_does_not_run_producers() {
        let sink = MemorySink::default();
        let calls = Arc::new(Mutex::new(0usize));
        let pre_calls = calls.clone();
        let logger = RequestLogger::new(
            sink.clone(),
            [
                with_skip_paths(["/quiet"]),
                with_pre_handling_fields(move |_| {
                    *pre_calls.lock().unwrap() += 1;
                    Vec::new()
                }),
            ],
        );

        logger
            .wrap(service_fn(ok_handler))
            .oneshot(get("/quiet"))
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_custom_message_level_and_producers() {
        let sink = MemorySink::default();
        let logger = RequestLogger::new(
            sink.clone(),
            [
                with_log_message("custom"),
                with_level(Level::WARN),
                with_pre_handling_fields(|parts| {
                    vec![Field::string("path", parts.uri.path())]
                }),
                with_post_handling_fields(|parts, fields, _latency| {
                    fields.push(Field::bytes(
                        "content-type",
                        parts
                            .headers
                            .get(http::header::CONTENT_TYPE)
                            .map(|v| v.as_bytes().to_vec())
                            .unwrap_or_default(),
                    ));
                }),
            ],
        );

        let svc = logger.wrap(service_fn(|_req: Request<()>| async {
            Ok::<_, Infallible>(
                Response::builder()
                    .status(StatusCode::CREATED)
                    .header("content-type", "text/plain")
                    .body(())
                    .unwrap(),
            )
        }));
        let res = svc.oneshot(get("/items")).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["content-type"], "text/plain");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "custom");
        assert_eq!(records[0].level, Level::WARN);
        assert_eq!(
            records[0].fields,
            vec![
                Field::string("path", "/items"),
                Field::bytes("content-type", "text/plain".as_bytes().to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_latency_covers_handler_time() {
        let sink = MemorySink::default();
        let svc = RequestLogger::new(sink.clone(), []).wrap(service_fn(|_req: Request<()>| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, Infallible>(Response::new(()))
        }));

        svc.oneshot(get("/slow")).await.unwrap();

        let records = sink.records();
        let latency = records[0]
            .get("latency")
            .and_then(|v| v.as_duration())
            .unwrap();
        assert!(latency >= Duration::from_millis(20), "latency {:?}", latency);
    }

    #[tokio::test]
    async fn test_inner_error_is_not_logged() {
        let sink = MemorySink::default();
        let svc = RequestLogger::new(sink.clone(), []).wrap(service_fn(|_req: Request<()>| async {
            Err::<Response<()>, _>("backend unavailable")
        }));

        let err = svc.oneshot(get("/broken")).await.unwrap_err();
        assert_eq!(err, "backend unavailable");
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_inner_panic_propagates_without_record() {
        let sink = MemorySink::default();
        let svc = RequestLogger::new(sink.clone(), []).wrap(service_fn(|_req: Request<()>| async {
            if true {
                panic!("handler exploded");
            }
            Ok::<_, Infallible>(Response::new(()))
        }));

        let outcome = std::panic::AssertUnwindSafe(svc.oneshot(get("/panic")))
            .catch_unwind()
            .await;
        assert!(outcome.is_err());
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_future_is_not_logged() {
        let sink = MemorySink::default();
        let mut svc = RequestLogger::new(sink.clone(), []).wrap(service_fn(|_req: Request<()>| async {
            std::future::pending::<()>().await;
            Ok::<_, Infallible>(Response::new(()))
        }));

        let fut = ServiceExt::<Request<()>>::ready(&mut svc)
            .await
            .unwrap()
            .call(get("/never"));
        drop(fut);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_works_as_tower_layer() {
        let sink = MemorySink::default();
        let svc = ServiceBuilder::new()
            .layer(RequestLogger::new(sink.clone(), [with_log_message("layered")]))
            .service_fn(ok_handler);

        svc.oneshot(get("/via-layer")).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "layered");
    }

    #[tokio::test]
    async fn test_concurrent_requests_each_logged_once() {
        let sink = MemorySink::default();
        let svc = RequestLogger::new(sink.clone(), []).wrap(service_fn(ok_handler));

        let mut handles = Vec::new();
        for i in 0..32 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.oneshot(get(&format!("/req/{}", i))).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut uris: Vec<String> = sink
            .records()
            .iter()
            .filter_map(|r| r.get("uri").and_then(|v| v.as_str()).map(String::from))
            .collect();
        uris.sort();
        uris.dedup();
        assert_eq!(uris.len(), 32);
    }

    // Skip-path membership decides logging for any request path
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_skip_paths_decide_logging(
            skipped in proptest::collection::hash_set("/[a-z]{1,8}", 0..4),
            path in "/[a-z]{1,8}",
        ) {
            let sink = MemorySink::default();
            let logger = RequestLogger::new(sink.clone(), [with_skip_paths(skipped.clone())]);
            let svc = logger.wrap(service_fn(ok_handler));

            let res = svc
                .oneshot(get(&path))
                .now_or_never()
                .expect("handler is ready immediately");
            prop_assert!(res.is_ok());

            let expected = if skipped.contains(&path) { 0 } else { 1 };
            prop_assert_eq!(sink.records().len(), expected);
        }
    }
}
