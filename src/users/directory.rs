use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use crate::api::client::ApiClient;
use crate::error::ConsoleResult;
use crate::users::model::{NewUser, Role, User, UserPermissions, UserUpdate};

/// Data layer behind the user-management screens.
///
/// Every method forwards straight to the backend through the authenticated
/// [`ApiClient`]; nothing is cached here. Screens keep their own optimistic
/// copies and reconcile with what these calls return.
pub struct UserDirectory {
    api: Arc<ApiClient>,
}

impl UserDirectory {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Fetch all users
    pub async fn list(&self) -> ConsoleResult<Vec<User>> {
        self.api.get("/users").await
    }

    /// Fetch the profile of the authenticated user
    pub async fn me(&self) -> ConsoleResult<User> {
        self.api.get("/users/me").await
    }

    /// Create a user, then assign each selected role.
    ///
    /// Role assignment happens one call per role after the create; a role
    /// failure surfaces as an error but the user itself already exists.
    pub async fn create(&self, new_user: &NewUser, role_ids: &[String]) -> ConsoleResult<User> {
        let user: User = self.api.post("/users", new_user).await?;
        info!(user_id = %user.id, "User created");

        for role_id in role_ids {
            let _: Value = self
                .api
                .post(
                    &format!("/users/{}/roles", user.id),
                    &json!({ "roleId": role_id }),
                )
                .await?;
        }

        Ok(user)
    }

    /// Update a user's profile fields, then replace its role set wholesale
    pub async fn update(
        &self,
        user_id: &str,
        update: &UserUpdate,
        role_ids: &[String],
    ) -> ConsoleResult<()> {
        let _: Value = self
            .api
            .patch(&format!("/users/id/{user_id}"), update)
            .await?;

        let _: Value = self
            .api
            .put(
                &format!("/users/{user_id}/roles"),
                &json!({ "roleIds": role_ids }),
            )
            .await?;

        info!(user_id, "User updated");
        Ok(())
    }

    /// Delete a user
    pub async fn delete(&self, user_id: &str) -> ConsoleResult<()> {
        let _: Value = self.api.delete(&format!("/users/id/{user_id}")).await?;
        info!(user_id, "User deleted");
        Ok(())
    }

    /// Fetch the assignable roles
    pub async fn roles(&self) -> ConsoleResult<Vec<Role>> {
        self.api.get("/roles").await
    }

    /// Fetch the authenticated user's roles and permissions
    pub async fn my_permissions(&self) -> ConsoleResult<UserPermissions> {
        self.api.get("/permissions/me").await
    }

    /// Fetch another user's roles and permissions
    pub async fn permissions_for(&self, user_id: &str) -> ConsoleResult<UserPermissions> {
        self.api.get(&format!("/permissions/user/{user_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::ApiClient;
    use crate::api::transport::mock::MockTransport;
    use crate::api::transport::HttpMethod;
    use crate::users::model::Gender;

    fn directory(transport: Arc<MockTransport>) -> UserDirectory {
        let api = ApiClient::new(
            "http://arena/v1",
            transport,
            Arc::new(|| Some("tok".to_string())),
            Arc::new(|| {}),
        );
        UserDirectory::new(Arc::new(api))
    }

    fn user_json(id: &str) -> Value {
        json!({
            "id": id,
            "nationalId": "1",
            "phoneNumber": "+15550100",
            "firstName": "Dana",
            "lastName": "Reyes",
            "adult": true,
            "gender": "F",
            "status": "ACTIVE",
            "emailVerified": false,
            "phoneVerified": false,
            "metadata": {},
            "createdAt": "2025-01-05T12:00:00Z",
            "updatedAt": "2025-01-05T12:00:00Z"
        })
    }

    #[tokio::test]
    async fn create_assigns_each_selected_role() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_json(HttpMethod::Post, "/users", 201, &user_json("u-9"));
        transport.mock_json(HttpMethod::Post, "/users/u-9/roles", 200, &json!({}));

        let directory = directory(transport.clone());
        let new_user = NewUser {
            national_id: "1".to_string(),
            phone_number: "+15550100".to_string(),
            email: None,
            first_name: "Dana".to_string(),
            last_name: "Reyes".to_string(),
            birth_date: None,
            address: None,
            adult: true,
            gender: Gender::Female,
            metadata: "{}".to_string(),
        };

        let user = directory
            .create(&new_user, &["role-1".to_string(), "role-2".to_string()])
            .await
            .unwrap();

        assert_eq!(user.id, "u-9");
        assert_eq!(transport.request_count("/users/u-9/roles"), 2);
    }

    #[tokio::test]
    async fn update_patches_profile_and_replaces_roles() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_json(HttpMethod::Patch, "/users/id/u-9", 200, &json!({}));
        transport.mock_json(HttpMethod::Put, "/users/u-9/roles", 200, &json!({}));

        let directory = directory(transport.clone());
        let update = UserUpdate {
            national_id: "1".to_string(),
            phone_number: "+15550100".to_string(),
            email: Some("d@arena.example".to_string()),
            first_name: "Dana".to_string(),
            last_name: "Reyes".to_string(),
            birth_date: None,
            address: None,
            adult: true,
            gender: Gender::Female,
        };

        directory
            .update("u-9", &update, &["role-2".to_string()])
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);

        // Cleared birth date travels as an explicit null
        let patch_body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert!(patch_body.get("birthDate").unwrap().is_null());

        let put_body: Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(put_body["roleIds"], json!(["role-2"]));
    }

    #[tokio::test]
    async fn list_parses_users() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_json(
            HttpMethod::Get,
            "/users",
            200,
            &json!([user_json("u-1"), user_json("u-2")]),
        );

        let directory = directory(transport);
        let users = directory.list().await.unwrap();
        assert_eq!(users.len(), 2);
    }
}
