//! Shared fixtures for the scenario tests

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::api::endpoints::AuthApi;
use crate::api::transport::mock::MockTransport;
use crate::api::transport::HttpMethod;
use crate::session::manager::SessionManager;
use crate::session::store::SessionStore;

pub const BASE_URL: &str = "http://arena/v1";
pub const DEVICE_ID: &str = "desktop-test";

pub fn user_json(id: &str) -> Value {
    json!({
        "id": id,
        "nationalId": "1234567890",
        "phoneNumber": "+15550100",
        "firstName": "Dana",
        "lastName": "Reyes",
        "adult": true,
        "gender": "F",
        "status": "ACTIVE",
        "emailVerified": true,
        "phoneVerified": true,
        "metadata": {},
        "createdAt": "2025-01-05T12:00:00Z",
        "updatedAt": "2025-01-05T12:00:00Z"
    })
}

pub fn permissions_json(user_id: &str, names: &[&str]) -> Value {
    json!({
        "userId": user_id,
        "roles": [{ "id": "role-admin", "name": "Admin", "description": null }],
        "permissions": names
            .iter()
            .map(|n| json!({ "id": format!("perm-{n}"), "name": n, "description": null }))
            .collect::<Vec<_>>(),
        "permissionNames": names,
    })
}

/// Register the happy-path profile and permission responses
pub fn mock_profile_endpoints(transport: &MockTransport) {
    transport.mock_json(HttpMethod::Get, "/users/me", 200, &user_json("u-1"));
    transport.mock_json(
        HttpMethod::Get,
        "/permissions/me",
        200,
        &permissions_json("u-1", &["user.read", "user.create"]),
    );
}

/// Build a session manager over a mock transport and a temp data directory.
///
/// The returned `TempDir` keeps the store alive; drop it and the files go.
pub fn manager_with(transport: Arc<MockTransport>) -> (Arc<SessionManager>, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SessionStore::new(dir.path()).expect("store");
    let auth = AuthApi::new(BASE_URL, transport);
    (Arc::new(SessionManager::new(auth, store, DEVICE_ID)), dir)
}

/// A second store handle onto the same directory, for asserting on what
/// the manager persisted.
pub fn store_probe(dir: &TempDir) -> SessionStore {
    SessionStore::new(dir.path()).expect("store probe")
}

/// Yield to background tasks until `predicate` holds or attempts run out
pub async fn wait_until(mut predicate: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if predicate() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    predicate()
}
