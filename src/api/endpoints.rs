use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::client::extract_error_message;
use crate::api::transport::{HttpMethod, HttpTransport};
use crate::error::{ConsoleError, ConsoleResult};
use crate::session::token::TokenPair;
use crate::users::model::{Gender, User, UserPermissions};

/// Registration payload for the OTP-verified signup flow
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub national_id: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub adult: bool,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Direct client for the authentication endpoints.
///
/// Deliberately separate from [`ApiClient`](crate::api::client::ApiClient):
/// these calls either run before any session exists (OTP, registration),
/// must not inject the bearer token (refresh), or must not trip the
/// unauthorized handler on 401 (a failed refresh degrades to logged-out
/// state instead of forcing navigation).
pub struct AuthApi {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl AuthApi {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    /// Request an OTP dispatch for the given phone number
    pub async fn send_otp(&self, phone: &str) -> ConsoleResult<Value> {
        self.post("/auth/send-otp", &json!({ "phone": phone }), None)
            .await
    }

    /// Exchange a phone/OTP pair for a token pair
    pub async fn verify_otp(
        &self,
        phone: &str,
        code: &str,
        device_id: &str,
    ) -> ConsoleResult<TokenPair> {
        let value = self
            .post(
                "/auth/verify-otp",
                &json!({ "phone": phone, "code": code, "deviceId": device_id }),
                None,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Exchange a refresh token for a fresh token pair
    pub async fn refresh(&self, refresh_token: &str, device_id: &str) -> ConsoleResult<TokenPair> {
        let value = self
            .post(
                "/auth/refresh",
                &json!({ "refreshToken": refresh_token, "deviceId": device_id }),
                None,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Notify the backend that this session is ending
    pub async fn logout(&self, access_token: &str) -> ConsoleResult<()> {
        self.post("/auth/logout", &json!({}), Some(access_token))
            .await?;
        Ok(())
    }

    /// Start a registration, dispatching an OTP to the supplied phone
    pub async fn register(&self, registration: &RegistrationRequest) -> ConsoleResult<Value> {
        self.post("/auth/register", registration, None).await
    }

    /// Complete a registration with the received OTP code
    pub async fn register_verify(
        &self,
        code: &str,
        registration: &RegistrationRequest,
    ) -> ConsoleResult<TokenPair> {
        let value = self
            .post(&format!("/auth/register-verify/{code}"), registration, None)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch the profile belonging to an access token
    pub async fn fetch_profile(&self, access_token: &str) -> ConsoleResult<User> {
        let value = self.get("/users/me", access_token).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch the permissions belonging to an access token
    pub async fn fetch_permissions(&self, access_token: &str) -> ConsoleResult<UserPermissions> {
        let value = self.get("/permissions/me", access_token).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
        bearer: Option<&str>,
    ) -> ConsoleResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let body = serde_json::to_value(body)?.to_string();

        let response = self
            .transport
            .request(HttpMethod::Post, &url, headers(bearer), Some(body))
            .await?;

        if !response.is_success() {
            let message = extract_error_message(&response);
            debug!(path, status = response.status(), %message, "Auth request failed");
            return Err(ConsoleError::http(response.status(), message));
        }

        if response.is_json() && !response.body().is_empty() {
            Ok(serde_json::from_str(response.body())?)
        } else {
            Ok(json!({}))
        }
    }

    async fn get(&self, path: &str, bearer: &str) -> ConsoleResult<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .transport
            .request(HttpMethod::Get, &url, headers(Some(bearer)), None)
            .await?;

        if !response.is_success() {
            let message = extract_error_message(&response);
            debug!(path, status = response.status(), %message, "Auth request failed");
            return Err(ConsoleError::http(response.status(), message));
        }

        Ok(serde_json::from_str(response.body())?)
    }
}

fn headers(bearer: Option<&str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    if let Some(token) = bearer {
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    }
    headers
}
