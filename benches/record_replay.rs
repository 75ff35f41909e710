//! Benchmarks for record/replay throughput

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures_util::future::{BoxFuture, FutureExt};
use hyper::Method;
use serde_json::json;
use tempfile::TempDir;

use tapedeck::{Body, Client, ClientConfig, LiveResponse, Request, ResponseType, Rule, Transport};

struct Static;

impl Transport for Static {
    fn send<'a>(
        &'a self,
        _request: &'a Request,
        _response_type: ResponseType,
    ) -> BoxFuture<'a, tapedeck::Result<LiveResponse>> {
        async {
            Ok(LiveResponse {
                status: 200,
                headers: vec![
                    ("Content-Type".to_string(), b"text/plain".to_vec()),
                    ("Date".to_string(), b"Fri, 16 Oct 2026 10:00:00 GMT".to_vec()),
                ],
                body: Body::Text("pong\n".to_string()),
            })
        }
        .boxed()
    }
}

fn client(root: &std::path::Path) -> Client<Static> {
    let rule = Rule::new(root, |req: &Request| req.path().map(|path| json!({"path": path})));
    Client::new(Static, ClientConfig::new().rule(rule))
}

fn bench_record_single_request(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("record_single_request", |b| {
        b.to_async(&rt).iter(|| async {
            let temp_dir = TempDir::new().unwrap();
            let client = client(temp_dir.path());
            let response = client
                .request(Method::GET, "/api/test", ResponseType::Text)
                .await
                .unwrap();
            black_box(response);
        });
    });
}

fn bench_replay_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let client = client(temp_dir.path());

    rt.block_on(async {
        client
            .request(Method::GET, "/api/test", ResponseType::Text)
            .await
            .unwrap();
    });

    c.bench_function("replay_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let response = client
                .request(Method::GET, "/api/test", ResponseType::Text)
                .await
                .unwrap();
            black_box(response);
        });
    });
}

fn bench_bypass(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let client = Client::new(Static, ClientConfig::new());

    c.bench_function("bypass", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(client.get("/api/test").await.unwrap()) });
    });
}

criterion_group!(benches, bench_record_single_request, bench_replay_hit, bench_bypass);
criterion_main!(benches);
