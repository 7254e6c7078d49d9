use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::transport::{HttpMethod, HttpResponse, HttpTransport};
use crate::error::{ConsoleError, ConsoleResult};

/// Supplies the current access token, if one is available.
pub type TokenSource = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Invoked when the server answers 401; wired to logout by the app shell.
pub type UnauthorizedHandler = Arc<dyn Fn() + Send + Sync>;

/// Thin authenticated wrapper over the HTTP transport.
///
/// Injects `Authorization: Bearer <token>` when a token is available and
/// maps the response contract the backend uses: 401 triggers the injected
/// unauthorized handler, other non-2xx statuses carry the server-supplied
/// `message` field when present. The client never retries and never
/// refreshes tokens; the refresh scheduler operates independently.
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    token_source: TokenSource,
    on_unauthorized: UnauthorizedHandler,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        token_source: TokenSource,
        on_unauthorized: UnauthorizedHandler,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            token_source,
            on_unauthorized,
        }
    }

    /// Perform a request against the backend, returning the decoded JSON
    /// body, or an empty JSON object for non-JSON responses.
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> ConsoleResult<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(token) = (self.token_source)() {
            headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        }

        let response = self
            .transport
            .request(method, &url, headers, body.map(|b| b.to_string()))
            .await?;

        if response.status() == 401 {
            warn!(path, "Request rejected as unauthorized");
            (self.on_unauthorized)();
            return Err(ConsoleError::Unauthorized);
        }

        if !response.is_success() {
            let message = extract_error_message(&response);
            debug!(path, status = response.status(), %message, "Request failed");
            return Err(ConsoleError::http(response.status(), message));
        }

        if response.is_json() && !response.body().is_empty() {
            Ok(serde_json::from_str(response.body())?)
        } else {
            Ok(json!({}))
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ConsoleResult<T> {
        let value = self.request(HttpMethod::Get, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ConsoleResult<T> {
        let value = self
            .request(HttpMethod::Post, path, Some(serde_json::to_value(body)?))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ConsoleResult<T> {
        let value = self
            .request(HttpMethod::Put, path, Some(serde_json::to_value(body)?))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ConsoleResult<T> {
        let value = self
            .request(HttpMethod::Patch, path, Some(serde_json::to_value(body)?))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ConsoleResult<T> {
        let value = self.request(HttpMethod::Delete, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Pull the server's `message` field out of an error body, falling back to
/// a generic status-code message.
pub(crate) fn extract_error_message(response: &HttpResponse) -> String {
    serde_json::from_str::<Value>(response.body())
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| format!("HTTP {}", response.status()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::mock::MockTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client_with(
        transport: Arc<MockTransport>,
        token: Option<&str>,
        unauthorized_count: Arc<AtomicUsize>,
    ) -> ApiClient {
        let token = token.map(String::from);
        ApiClient::new(
            "http://arena/v1",
            transport,
            Arc::new(move || token.clone()),
            Arc::new(move || {
                unauthorized_count.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[tokio::test]
    async fn attaches_bearer_token_when_available() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_json(HttpMethod::Get, "/users/me", 200, &json!({"ok": true}));

        let client = client_with(
            transport.clone(),
            Some("tok-123"),
            Arc::new(AtomicUsize::new(0)),
        );
        let _: Value = client.get("/users/me").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].bearer_token(), Some("tok-123"));
    }

    #[tokio::test]
    async fn omits_authorization_without_token() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_json(HttpMethod::Post, "/auth/send-otp", 200, &json!({}));

        let client = client_with(transport.clone(), None, Arc::new(AtomicUsize::new(0)));
        let _: Value = client
            .post("/auth/send-otp", &json!({"phone": "+15550100"}))
            .await
            .unwrap();

        assert!(transport.requests()[0].bearer_token().is_none());
    }

    #[tokio::test]
    async fn unauthorized_invokes_handler_exactly_once() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_json(HttpMethod::Get, "/users", 401, &json!({"message": "nope"}));

        let count = Arc::new(AtomicUsize::new(0));
        let client = client_with(transport, Some("stale"), count.clone());

        let result: ConsoleResult<Value> = client.get("/users").await;
        assert!(matches!(result, Err(ConsoleError::Unauthorized)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_2xx_carries_server_message() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_json(
            HttpMethod::Post,
            "/users",
            422,
            &json!({"message": "nationalId already registered"}),
        );

        let client = client_with(transport, Some("tok"), Arc::new(AtomicUsize::new(0)));
        let result: ConsoleResult<Value> = client.post("/users", &json!({})).await;

        match result {
            Err(ConsoleError::Http { status, message }) => {
                assert_eq!(status, 422);
                assert_eq!(message, "nationalId already registered");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_2xx_without_message_uses_generic_text() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_raw(HttpMethod::Get, "/roles", 500, "boom");

        let client = client_with(transport, Some("tok"), Arc::new(AtomicUsize::new(0)));
        let result: ConsoleResult<Value> = client.get("/roles").await;

        match result {
            Err(ConsoleError::Http { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "HTTP 500");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_success_decodes_as_empty_object() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_raw(HttpMethod::Delete, "/users/id/42", 204, "");

        let client = client_with(transport, Some("tok"), Arc::new(AtomicUsize::new(0)));
        let value: Value = client.delete("/users/id/42").await.unwrap();
        assert_eq!(value, json!({}));
    }
}
