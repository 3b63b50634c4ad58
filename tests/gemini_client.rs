// tests/gemini_client.rs
//
// GeminiClient against an in-process stand-in for the generateContent endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use techinvest_ai::config::{AiConfig, Credential};
use techinvest_ai::error::ErrorKind;
use techinvest_ai::upstream::{prompt, GeminiClient, UpstreamClient};

#[derive(Clone, Default)]
struct Seen {
    last: Arc<Mutex<Option<(String, String, Value)>>>,
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1beta")
}

fn key() -> Credential {
    Credential::from_raw(Some("test-key".into())).unwrap()
}

#[tokio::test]
async fn sends_key_schema_and_search_and_reads_citations() {
    let seen = Seen::default();
    let app = Router::new()
        .route(
            "/v1beta/models/{call}",
            post(
                |State(seen): State<Seen>, Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let key = headers
                        .get("x-goog-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *seen.last.lock().unwrap() = Some((call, key, body));
                    Json(json!({
                        "candidates": [{
                            "content": { "parts": [{ "text": "{\"news\":[{\"index\":1}]}" }] },
                            "groundingMetadata": { "groundingChunks": [
                                { "web": { "uri": "https://a.example", "title": "A" } }
                            ]}
                        }]
                    }))
                },
            ),
        )
        .with_state(seen.clone());
    let base = serve(app).await;

    let cfg = AiConfig::default();
    let client = GeminiClient::new(key(), &base).unwrap();
    let reply = client.generate(&prompt::build_request(&cfg)).await.unwrap();

    assert_eq!(reply.text, "{\"news\":[{\"index\":1}]}");
    assert_eq!(reply.citations.len(), 1);
    assert_eq!(reply.citations[0].uri, "https://a.example");

    let (call, key, body) = seen.last.lock().unwrap().clone().unwrap();
    assert_eq!(call, "gemini-3-flash-preview:generateContent");
    assert_eq!(key, "test-key");
    assert!(body["tools"][0]["googleSearch"].is_object());
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["generationConfig"]["temperature"].as_f64().map(|t| (t * 10.0).round()), Some(7.0));
}

#[tokio::test]
async fn http_429_is_rate_limited() {
    let app = Router::new().route(
        "/v1beta/models/{call}",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": { "code": 429, "status": "RESOURCE_EXHAUSTED" } })),
            )
        }),
    );
    let base = serve(app).await;

    let client = GeminiClient::new(key(), &base).unwrap();
    let err = client
        .generate(&prompt::build_request(&AiConfig::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
}

#[tokio::test]
async fn server_error_is_transport() {
    let app = Router::new().route(
        "/v1beta/models/{call}",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let base = serve(app).await;

    let client = GeminiClient::new(key(), &base).unwrap();
    let err = client
        .generate(&prompt::build_request(&AiConfig::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn empty_candidate_text_is_parse_error() {
    let app = Router::new().route(
        "/v1beta/models/{call}",
        post(|| async { Json(json!({ "candidates": [] })) }),
    );
    let base = serve(app).await;

    let client = GeminiClient::new(key(), &base).unwrap();
    let err = client
        .generate(&prompt::build_request(&AiConfig::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}
