mod common;

use axum::{Router, routing::get};
use axum_test::TestServer;
use serde_json::json;
use snaplink::api::handlers::redirect_handler;
use snaplink::api::routes::api_routes;
use snaplink::state::AppState;

fn app(state: AppState) -> Router {
    Router::new()
        .route("/{code}", get(redirect_handler))
        .nest("/api/v1", api_routes())
        .layer(common::MockConnectInfoLayer)
        .with_state(state)
}

async fn test_server() -> TestServer {
    let pool = common::test_pool().await;
    let state = common::create_test_state(&pool, common::test_clock()).await;
    TestServer::new(app(state)).unwrap()
}

#[tokio::test]
async fn test_shorten_single_url_success() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/shorten")
        .json(&json!({ "url": "https://example.com" }))
        .await;

    assert_eq!(response.status_code(), 201);

    let json = response.json::<serde_json::Value>();
    let code = json["code"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert_eq!(
        json["short_url"],
        format!("{}/{}", common::PUBLIC_URL, code)
    );
}

#[tokio::test]
async fn test_shorten_then_redirect_immediately() {
    let server = test_server().await;

    let json = server
        .post("/api/v1/shorten")
        .json(&json!({ "url": "https://example.com/landing" }))
        .await
        .json::<serde_json::Value>();
    let code = json["code"].as_str().unwrap();

    let response = server.get(&format!("/{code}")).await;

    assert_eq!(response.status_code(), 302);
    assert_eq!(response.header("location"), "https://example.com/landing");
}

#[tokio::test]
async fn test_shorten_with_slug() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/shorten")
        .json(&json!({
            "url": "https://example.com",
            "title": "Example",
            "slug": "my-link_1",
            "expiry_in_secs": 3600
        }))
        .await;

    assert_eq!(response.status_code(), 201);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["code"], "my-link_1");
}

#[tokio::test]
async fn test_shorten_duplicate_slug_conflict() {
    let server = test_server().await;
    let body = json!({ "url": "https://example.com", "slug": "taken" });

    let first = server.post("/api/v1/shorten").json(&body).await;
    assert_eq!(first.status_code(), 201);

    let second = server.post("/api/v1/shorten").json(&body).await;
    assert_eq!(second.status_code(), 409);

    let json = second.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "conflict");
    assert_eq!(json["error"]["details"]["code"], "taken");
}

#[tokio::test]
async fn test_shorten_invalid_url() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/shorten")
        .json(&json!({ "url": "not-a-url" }))
        .await;

    assert_eq!(response.status_code(), 400);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(json["error"]["details"].get("url").is_some());
}

#[tokio::test]
async fn test_shorten_invalid_slug() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/shorten")
        .json(&json!({ "url": "https://example.com", "slug": "has space" }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_bulk_shorten_mixed_results() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/bulk-shorten")
        .json(&json!({
            "urls": [
                { "url": "https://example.com/1" },
                { "url": "invalid-url" },
                { "url": "https://example.com/2", "slug": "bulk" },
                { "url": "https://example.com/3", "slug": "bulk" }
            ]
        }))
        .await;

    response.assert_status_ok();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["summary"]["total"], 4);
    assert_eq!(json["summary"]["successful"], 2);
    assert_eq!(json["summary"]["failed"], 2);

    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);

    assert_eq!(items[0]["url"], "https://example.com/1");
    assert!(items[0]["code"].is_string());
    assert!(items[0]["short_url"].is_string());

    assert_eq!(items[1]["url"], "invalid-url");
    assert_eq!(items[1]["error"]["code"], "validation_error");

    assert_eq!(items[2]["code"], "bulk");

    assert_eq!(items[3]["url"], "https://example.com/3");
    assert_eq!(items[3]["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_bulk_shorten_empty_list() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/bulk-shorten")
        .json(&json!({ "urls": [] }))
        .await;

    assert_eq!(response.status_code(), 400);
}
