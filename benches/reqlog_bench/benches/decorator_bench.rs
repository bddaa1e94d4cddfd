//! Request logging overhead benchmarks
//!
//! Compares a bare service, a skipped request and a logged request, plus
//! the default field producers on their own.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures_util::FutureExt;
use http::{Request, Response};
use reqlog::{
    default_pre_handling_fields, with_skip_paths, ClientAddr, JsonSink, RequestLogger,
};
use std::convert::Infallible;
use tower::{service_fn, Service, ServiceExt};

async fn handler(_req: Request<()>) -> Result<Response<()>, Infallible> {
    Ok(Response::new(()))
}

fn request(path: &str) -> Request<()> {
    Request::builder()
        .uri(path)
        .header("user-agent", "reqlog-bench/1.0")
        .extension(ClientAddr("127.0.0.1:50000".parse().unwrap()))
        .body(())
        .unwrap()
}

/// Drive a service that never suspends
fn drive<S>(svc: &S, req: Request<()>) -> Response<()>
where
    S: Service<Request<()>, Response = Response<()>, Error = Infallible> + Clone,
{
    svc.clone()
        .oneshot(req)
        .now_or_never()
        .expect("service completes immediately")
        .unwrap()
}

fn bench_decorator(c: &mut Criterion) {
    let mut group = c.benchmark_group("decorator");

    let bare = service_fn(handler);
    let logger = RequestLogger::new(JsonSink::new(std::io::sink()), [with_skip_paths(["/skip"])]);
    let logged = logger.wrap(service_fn(handler));

    group.bench_function("bare_service", |b| {
        b.iter(|| drive(&bare, black_box(request("/foo"))))
    });

    group.bench_function("skipped_request", |b| {
        b.iter(|| drive(&logged, black_box(request("/skip"))))
    });

    group.bench_function("logged_request", |b| {
        b.iter(|| drive(&logged, black_box(request("/foo"))))
    });

    group.finish();
}

fn bench_field_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_producers");

    let (parts, _) = request("/items?page=2").into_parts();
    group.bench_function("default_pre_handling", |b| {
        b.iter(|| default_pre_handling_fields(black_box(&parts)))
    });

    group.finish();
}

criterion_group!(benches, bench_decorator, bench_field_producers);
criterion_main!(benches);
