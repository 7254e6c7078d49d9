//! Tests for the reqwest-backed transport and client against a real HTTP
//! server (mockito), covering the pieces the in-process mock cannot: header
//! wiring, content-type handling and status mapping on the wire.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::api::client::ApiClient;
use crate::api::transport::ReqwestTransport;
use crate::error::{ConsoleError, ConsoleResult};

fn client_for(server_url: &str, unauthorized_count: Arc<AtomicUsize>) -> ApiClient {
    let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
    ApiClient::new(
        server_url.to_string(),
        Arc::new(transport),
        Arc::new(|| Some("token-123".to_string())),
        Arc::new(move || {
            unauthorized_count.fetch_add(1, Ordering::SeqCst);
        }),
    )
}

#[tokio::test]
async fn bearer_and_content_type_headers_reach_the_wire() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer token-123")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "u-1"}"#)
        .create_async()
        .await;

    let client = client_for(&server.url(), Arc::new(AtomicUsize::new(0)));
    let value: Value = client.get("/users/me").await.unwrap();

    assert_eq!(value["id"], "u-1");
    mock.assert_async().await;
}

#[tokio::test]
async fn request_bodies_are_sent_as_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/send-otp")
        .match_body(mockito::Matcher::Json(json!({"phone": "+15550100"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sent": true}"#)
        .create_async()
        .await;

    let client = client_for(&server.url(), Arc::new(AtomicUsize::new(0)));
    let value: Value = client
        .post("/auth/send-otp", &json!({"phone": "+15550100"}))
        .await
        .unwrap();

    assert_eq!(value["sent"], true);
    mock.assert_async().await;
}

#[tokio::test]
async fn a_401_on_the_wire_invokes_the_handler_once() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/users")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "unauthorized"}"#)
        .create_async()
        .await;

    let count = Arc::new(AtomicUsize::new(0));
    let client = client_for(&server.url(), count.clone());

    let result: ConsoleResult<Value> = client.get("/users").await;
    assert!(matches!(result, Err(ConsoleError::Unauthorized)));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_error_messages_are_preserved() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PATCH", "/users/id/u-1")
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "phone number already in use"}"#)
        .create_async()
        .await;

    let client = client_for(&server.url(), Arc::new(AtomicUsize::new(0)));
    let result: ConsoleResult<Value> = client.patch("/users/id/u-1", &json!({})).await;

    match result {
        Err(ConsoleError::Http { status, message }) => {
            assert_eq!(status, 409);
            assert_eq!(message, "phone number already in use");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_responses_decode_to_an_empty_object() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/users/id/u-1")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("deleted")
        .create_async()
        .await;

    let client = client_for(&server.url(), Arc::new(AtomicUsize::new(0)));
    let value: Value = client.delete("/users/id/u-1").await.unwrap();
    assert_eq!(value, json!({}));
}

#[tokio::test]
async fn connection_failures_surface_as_transport_errors() {
    // Nothing listens on this port
    let client = client_for("http://127.0.0.1:9", Arc::new(AtomicUsize::new(0)));
    let result: ConsoleResult<Value> = client.get("/users").await;
    assert!(matches!(result, Err(ConsoleError::Transport { .. })));
}
