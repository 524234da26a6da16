use std::path::PathBuf;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use parley_api::{build_app, build_router, ApiConfig, ApiState};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "test-parley-key";

fn rules_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/rules.csv")
}

fn app_with(config: ApiConfig) -> Router {
    let rules = parley_rules::load_rules_from(rules_path()).expect("sample rules should load");
    build_router(ApiState::new(rules, config))
}

fn app() -> Router {
    app_with(ApiConfig {
        api_key: API_KEY.to_string(),
        ..ApiConfig::default()
    })
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = json_body(response).await;
    assert!(parsed["rules_loaded"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn match_requires_api_key() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/match")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": "hello" }).to_string()))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn match_returns_intent_and_localized_response() {
    let response = app()
        .oneshot(post_json(
            "/v1/match",
            json!({ "text": "je veux réserver un hôtel", "language": "fr" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = json_body(response).await;
    assert_eq!(parsed["matched"], json!(true));
    assert_eq!(parsed["intent"], json!("book_hotel"));
    assert_eq!(
        parsed["response"],
        json!("Avec plaisir. Pour quelles dates et dans quelle ville ?")
    );
}

#[tokio::test]
async fn unmatched_text_is_reported_as_no_match() {
    let response = app()
        .oneshot(post_json("/v1/match", json!({ "text": "what is the weather" })))
        .await
        .unwrap();

    let parsed = json_body(response).await;
    assert_eq!(parsed["matched"], json!(false));
    assert!(parsed.get("response").is_none());
}

#[tokio::test]
async fn chat_falls_back_and_keeps_session() {
    let app = app();

    let first = app
        .clone()
        .oneshot(post_json("/v1/chat", json!({ "text": "what is the weather" })))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = json_body(first).await;
    assert_eq!(first["source"], json!("fallback"));
    assert!(first["intent"].is_null());

    let session_id = first["session_id"].as_str().unwrap().to_string();
    let second = app
        .oneshot(post_json(
            "/v1/chat",
            json!({ "session_id": session_id, "text": "book a taxi please" }),
        ))
        .await
        .unwrap();
    let second = json_body(second).await;
    assert_eq!(second["session_id"], json!(session_id));
    assert_eq!(second["intent"], json!("book_taxi"));
    assert_eq!(second["follow_up"], json!("taxi_booking"));
}

#[tokio::test]
async fn chat_rejects_empty_text() {
    let response = app()
        .oneshot(post_json("/v1/chat", json!({ "text": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn intents_are_listed_in_rule_order() {
    let request = Request::builder()
        .uri("/v1/intents")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    let parsed = json_body(response).await;
    let intents = parsed.as_array().unwrap();

    assert_eq!(intents[0]["intent"], json!("greeting"));
    let hotel_info = intents
        .iter()
        .find(|item| item["intent"] == json!("hotel_info"))
        .unwrap();
    assert_eq!(hotel_info["languages"], json!(["en"]));
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let app = app_with(ApiConfig {
        api_key: API_KEY.to_string(),
        rate_limit_max: 1,
        ..ApiConfig::default()
    });

    let request = |client: &str| {
        Request::builder()
            .method("POST")
            .uri("/v1/match")
            .header("content-type", "application/json")
            .header("x-api-key", API_KEY)
            .header("x-forwarded-for", client)
            .body(Body::from(json!({ "text": "hi" }).to_string()))
            .unwrap()
    };

    let first = app.clone().oneshot(request("10.0.0.1")).await.unwrap();
    let second = app.clone().oneshot(request("10.0.0.1")).await.unwrap();
    let other = app.oneshot(request("10.0.0.2")).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn build_app_loads_explicit_rule_source() {
    let path = rules_path();
    let app = build_app(Some(path.as_path())).await.expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reports_lookup_and_chat_counters() {
    let app = app();

    app.clone()
        .oneshot(post_json("/v1/match", json!({ "text": "bonjour", "language": "fr" })))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json("/v1/chat", json!({ "text": "what is the weather" })))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let metrics = json_body(response).await["metrics"].clone();

    assert_eq!(metrics["match_lookups_total"], json!(1));
    assert_eq!(metrics["match_hits_total"], json!(1));
    assert_eq!(metrics["chat_turns_total"], json!(1));
    assert_eq!(metrics["fallback_replies_total"], json!(1));
}
