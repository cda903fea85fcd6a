//! Typed service calls for the tourbook backend.
//!
//! Each method maps one application action onto a pipeline request. None of
//! them handle failures themselves; the pipeline has already shown a notice
//! and, for session failures, sent the user to the login route.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::pipeline::{ApiRequest, RequestPipeline};
use super::ApiError;
use crate::auth::{decode_token, SessionState, UserId};
use crate::models::{Category, Credentials, PasswordChange, Registration, UserInfoUpdate};

/// API client for the tourbook backend.
/// Clone is cheap - the pipeline is shared behind an `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<RequestPipeline>,
}

impl ApiClient {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn session(&self) -> &SessionState {
        self.pipeline.session()
    }

    // ===== User =====

    /// Log in and store the issued token. The token's `exp` claim, when it
    /// has one, becomes the local expiry marker.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let request = ApiRequest::post("/user/login").json(&Credentials { username, password })?;
        let token: String = self.pipeline.fetch(request).await?;

        let expires_at = match decode_token(&token) {
            Ok(claims) => claims.expires_at(),
            Err(e) => {
                debug!(error = %e, "Token payload unreadable, no local expiry");
                None
            }
        };
        self.session().set_token_with_expiry(&token, expires_at);
        info!(username = username, "Login successful");
        Ok(token)
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<Option<Value>, ApiError> {
        let request = ApiRequest::post("/user/register").json(&Registration {
            username,
            password,
            email,
        })?;
        self.pipeline.send(request).await
    }

    /// Fetch the profile of the user the current token belongs to.
    pub async fn get_user_info(&self) -> Result<Value, ApiError> {
        let token = self.session().get_token();
        if token.is_empty() {
            return Err(ApiError::NotLoggedIn);
        }
        let claims = decode_token(&token).map_err(|e| {
            warn!(error = %e, "Failed to decode session token");
            ApiError::from(e)
        })?;
        debug!(user_id = %claims.id, "Decoded user id from token");
        self.pipeline.fetch(ApiRequest::get(format!("/user/{}", claims.id))).await
    }

    pub async fn update_user_info(&self, update: &UserInfoUpdate) -> Result<Option<Value>, ApiError> {
        let request =
            ApiRequest::put(format!("/user/{}", update.user_id())).json(&update.body())?;
        self.pipeline.send(request).await
    }

    pub async fn update_password(&self, change: &PasswordChange) -> Result<Option<Value>, ApiError> {
        let request = ApiRequest::put("/user/password").json(&change.body())?;
        self.pipeline.send(request).await
    }

    pub async fn delete_user(&self, user_id: &UserId) -> Result<Option<Value>, ApiError> {
        self.pipeline
            .send(ApiRequest::delete(format!("/user/{}", user_id)))
            .await
    }

    // ===== Category =====

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let categories: Option<Vec<Category>> = self.pipeline.send(ApiRequest::get("/category")).await?;
        let categories = categories.unwrap_or_default();
        debug!(count = categories.len(), "Fetched categories");
        Ok(categories)
    }

    pub async fn add_category(&self, category: &Category) -> Result<Option<Value>, ApiError> {
        let request = ApiRequest::post("/category").json(category)?;
        self.pipeline.send(request).await
    }

    pub async fn update_category(&self, category: &Category) -> Result<Option<Value>, ApiError> {
        let request = ApiRequest::put("/category").json(category)?;
        self.pipeline.send(request).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<Option<Value>, ApiError> {
        let request = ApiRequest::delete("/category").query("id", id).form_encoded();
        self.pipeline.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::tests::make_token;
    use crate::config::Config;
    use crate::notify::RecordingNotifier;
    use crate::router::RecordingNavigator;
    use crate::storage::{KeyValueStore, MemoryStore, TOKEN_EXPIRES_KEY, TOKEN_KEY};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, store: Arc<MemoryStore>) -> ApiClient {
        let session = SessionState::new(store as Arc<dyn KeyValueStore>);
        let config = Config {
            base_url: base_url.to_string(),
            ..Config::default()
        };
        let pipeline = RequestPipeline::new(
            &config,
            session,
            Arc::new(RecordingNavigator::new()),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();
        ApiClient::new(Arc::new(pipeline))
    }

    fn ok(data: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"code": 200, "data": data}))
    }

    #[tokio::test]
    async fn test_login_stores_token_and_expiry() {
        let server = MockServer::start().await;
        let token = make_token(&json!({"id": 5, "exp": 4_102_444_800i64}));
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .and(body_json(json!({"username": "alice", "password": "pw"})))
            .respond_with(ok(json!(token)))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let api = client(&server.uri(), store.clone());
        let issued = api.login("alice", "pw").await.unwrap();

        assert_eq!(issued, token);
        assert_eq!(api.session().get_token(), token);
        assert_eq!(store.get(TOKEN_KEY), Some(token));
        assert_eq!(
            api.session().expires_at().map(|at| at.timestamp()),
            Some(4_102_444_800)
        );
    }

    #[tokio::test]
    async fn test_login_with_opaque_token_has_no_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .respond_with(ok(json!("opaque-token")))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::with_entries([(TOKEN_EXPIRES_KEY, "2000-01-01")]));
        let api = client(&server.uri(), store.clone());
        api.login("alice", "pw").await.unwrap();
        assert_eq!(api.session().get_token(), "opaque-token");
        assert_eq!(store.get(TOKEN_EXPIRES_KEY), None);
    }

    #[tokio::test]
    async fn test_register_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/register"))
            .and(body_json(json!({"username": "bob", "password": "pw", "email": "b@example.com"})))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri(), Arc::new(MemoryStore::new()));
        assert_eq!(api.register("bob", "pw", "b@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_user_info_uses_id_from_token() {
        let server = MockServer::start().await;
        let token = make_token(&json!({"id": 42}));
        Mock::given(method("GET"))
            .and(path("/user/42"))
            .and(header("Authorization", token.as_str()))
            .respond_with(ok(json!({"id": 42, "name": "Alice"})))
            .mount(&server)
            .await;

        let api = client(&server.uri(), Arc::new(MemoryStore::with_entries([(TOKEN_KEY, token.clone())])));
        let info = api.get_user_info().await.unwrap();
        assert_eq!(info["name"], "Alice");
    }

    #[tokio::test]
    async fn test_get_user_info_without_usable_token() {
        let server = MockServer::start().await;
        let api = client(&server.uri(), Arc::new(MemoryStore::new()));
        assert!(matches!(api.get_user_info().await, Err(ApiError::NotLoggedIn)));

        api.session().set_token("not-a-jwt");
        assert!(matches!(api.get_user_info().await, Err(ApiError::TokenDecode(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_user_info_maps_phone() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/user/12"))
            .and(body_json(json!({
                "email": "a@example.com",
                "phoneNumber": "555-0100",
                "name": "Alice",
                "bio": "Hiker"
            })))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri(), Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "t")])));
        let update = UserInfoUpdate {
            user_id: "12".to_string(),
            email: "a@example.com".to_string(),
            phone: "555-0100".to_string(),
            name: "Alice".to_string(),
            bio: "Hiker".to_string(),
        };
        api.update_user_info(&update).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_password_and_delete_user() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/user/password"))
            .and(body_json(json!({"oldPwd": "a", "newPwd": "b", "rePwd": "b"})))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/user/7"))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri(), Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "t")])));
        api.update_password(&PasswordChange {
            old_password: "a".to_string(),
            new_password: "b".to_string(),
            confirm_password: "b".to_string(),
        })
        .await
        .unwrap();
        api.delete_user(&UserId::Number(7)).await.unwrap();
    }

    #[tokio::test]
    async fn test_category_crud() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category"))
            .respond_with(ok(json!([
                {"id": 1, "categoryName": "Museums"},
                {"id": 2, "categoryName": "Parks"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/category"))
            .and(body_json(json!({"categoryName": "Beaches"})))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/category"))
            .and(body_json(json!({"id": 2, "categoryName": "Gardens"})))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/category"))
            .and(query_param("id", "1"))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri(), Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "t")])));
        let categories = api.list_categories().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1].display_name(), "Parks");

        api.add_category(&Category::new().with_field("categoryName", "Beaches"))
            .await
            .unwrap();
        let renamed = categories[1].clone().with_field("categoryName", "Gardens");
        api.update_category(&renamed).await.unwrap();
        api.delete_category(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_category_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category"))
            .respond_with(ok(Value::Null))
            .mount(&server)
            .await;

        let api = client(&server.uri(), Arc::new(MemoryStore::new()));
        assert!(api.list_categories().await.unwrap().is_empty());
    }
}
