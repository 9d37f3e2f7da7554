use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Path, Query, State},
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use coinlens::{AppState, config::Config, routes};
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Clone, Default)]
struct Upstream {
    hits: Arc<AtomicUsize>,
}

async fn search(State(upstream): State<Upstream>, Query(query): Query<Vec<(String, String)>>) -> Json<Value> {
    upstream.hits.fetch_add(1, Ordering::SeqCst);
    let echoed: Vec<Value> = query.iter().map(|(k, v)| json!([k, v])).collect();
    Json(json!({"coins": [{"id": "bitcoin", "name": "Bitcoin"}], "query": echoed}))
}

async fn coin(State(upstream): State<Upstream>, Path(id): Path<String>) -> Response {
    upstream.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::NOT_FOUND, Json(json!({"error": format!("coin {} not found", id)}))).into_response()
}

async fn generate(State(upstream): State<Upstream>, Path(action): Path<String>, body: String) -> Response {
    upstream.hits.fetch_add(1, Ordering::SeqCst);
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    if body["contents"][0]["parts"][0]["text"] == "fail" {
        return (StatusCode::FORBIDDEN, "x".repeat(2_000)).into_response();
    }
    Json(json!({"action": action, "echo": body})).into_response()
}

/// 在随机端口起一个假上游
async fn spawn_upstream() -> (String, Upstream) {
    let upstream = Upstream::default();
    let app = Router::new()
        .route("/search", get(search))
        .route("/coins/{id}", get(coin))
        .route("/models/{action}", post(generate))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), upstream)
}

fn app(config: Config) -> Router {
    routes::router(AppState::new(config))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap()
}

fn post_req(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_answers_ok() {
    let (status, body) = send(&app(Config::default()), get_req("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn market_proxy_rejects_paths_outside_allow_list() {
    let app = app(Config::default());

    for uri in ["/api/coingecko/../secret", "/api/coingecko/exchanges", "/api/coingecko"] {
        let (status, body) = send_json(&app, get_req(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body, json!({"error": "invalid_path"}));
    }
}

#[tokio::test]
async fn market_proxy_only_accepts_get() {
    let app = app(Config::default());
    let (status, body) = send_json(&app, post_req("/api/coingecko/search", "{}")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "method_not_allowed");
}

#[tokio::test]
async fn market_proxy_limits_each_client() {
    let app = app(Config::default());

    for _ in 0..60 {
        let (status, _) = send(&app, get_req("/api/coingecko/../secret")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, body) = send_json(&app, get_req("/api/coingecko/../secret")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({"error": "rate_limited"}));

    // 其他客户端不受影响
    let other = Request::builder()
        .uri("/api/coingecko/../secret")
        .header("x-forwarded-for", "198.51.100.1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, other).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn market_proxy_relays_upstream_and_caches_success() {
    let (base_url, upstream) = spawn_upstream().await;
    let app = app(Config {
        coingecko_base_url: base_url,
        ..Config::default()
    });

    let (status, body) = send_json(&app, get_req("/api/coingecko/search?query=bit&path=search")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["coins"][0]["id"], "bitcoin");
    assert_eq!(body["query"], json!([["query", "bit"]]));

    let (status, again) = send_json(&app, get_req("/api/coingecko/search?query=bit")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, body);
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_query_names_cannot_poison_cache_for_other_clients() {
    let (base_url, upstream) = spawn_upstream().await;
    let app = app(Config {
        coingecko_base_url: base_url,
        ..Config::default()
    });

    let first = Request::builder()
        .uri("/api/coingecko/search?query=scamcoin&query=bitcoin")
        .header("x-forwarded-for", "10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app, first).await;
    assert_eq!(status, StatusCode::OK);
    // 上游只看到和缓存键一致的参数
    assert_eq!(body["query"], json!([["query", "bitcoin"]]));

    let second = Request::builder()
        .uri("/api/coingecko/search?query=bitcoin")
        .header("x-forwarded-for", "10.0.0.2")
        .body(Body::empty())
        .unwrap();
    let (status, cached) = send_json(&app, second).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cached["query"], json!([["query", "bitcoin"]]));
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn undecodable_path_gets_json_error() {
    let app = app(Config::default());
    let response = app
        .clone()
        .oneshot(get_req("/api/coingecko/coins/%FF"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"error": "invalid_path"}));
}

#[tokio::test]
async fn market_proxy_relays_upstream_errors_verbatim() {
    let (base_url, upstream) = spawn_upstream().await;
    let app = app(Config {
        coingecko_base_url: base_url,
        ..Config::default()
    });

    for _ in 0..2 {
        let (status, body) = send_json(&app, get_req("/api/coingecko/coins/nocoin")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "coin nocoin not found"}));
    }
    // 失败响应不进缓存
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn market_proxy_reports_unreachable_upstream() {
    let app = app(Config {
        coingecko_base_url: "http://127.0.0.1:9".to_string(),
        ..Config::default()
    });
    let (status, body) = send_json(&app, get_req("/api/coingecko/coins/bitcoin")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "proxy_error");
}

#[tokio::test]
async fn gemini_proxy_requires_api_key() {
    let app = app(Config::default());
    let (status, body) = send_json(&app, post_req("/api/gemini", r#"{"prompt":"hello"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "missing_api_key"}));
}

#[tokio::test]
async fn gemini_proxy_validates_body() {
    let app = app(Config {
        gemini_api_key: Some("test-key".to_string()),
        ..Config::default()
    });

    let (status, body) = send_json(&app, post_req("/api/gemini", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_json");

    let (status, body) = send_json(&app, post_req("/api/gemini", r#"{"temperature":1}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_prompt");
}

#[tokio::test]
async fn gemini_proxy_only_accepts_post() {
    let app = app(Config::default());
    let (status, body) = send_json(&app, get_req("/api/gemini")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "method_not_allowed");
}

#[tokio::test]
async fn gemini_proxy_wraps_prompt_and_forwards() {
    let (base_url, upstream) = spawn_upstream().await;
    let app = app(Config {
        gemini_base_url: base_url,
        gemini_api_key: Some("test-key".to_string()),
        ..Config::default()
    });

    let (status, body) = send_json(&app, post_req("/api/gemini", r#"{"prompt":"hello"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "gemini-1.5-flash:generateContent");
    assert_eq!(
        body["echo"],
        json!({"contents": [{"role": "user", "parts": [{"text": "hello"}]}]})
    );
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn gemini_upstream_error_details_are_truncated() {
    let (base_url, _upstream) = spawn_upstream().await;
    let app = app(Config {
        gemini_base_url: base_url,
        gemini_api_key: Some("test-key".to_string()),
        ..Config::default()
    });

    let (status, body) = send_json(&app, post_req("/api/gemini", r#"{"prompt":"fail"}"#)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "gemini_error");
    assert_eq!(body["details"].as_str().map(str::len), Some(500));
}

#[tokio::test]
async fn gemini_proxy_limits_each_client() {
    let app = app(Config::default());
    for _ in 0..30 {
        let (status, _) = send(&app, post_req("/api/gemini", r#"{"prompt":"hi"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
    let (status, body) = send_json(&app, post_req("/api/gemini", r#"{"prompt":"hi"}"#)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
}
