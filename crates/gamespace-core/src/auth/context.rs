use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::User;
use crate::storage::{LocalStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};

/// Session keys written at login and removed at logout
const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Loading,
    Authenticated(User),
    Anonymous,
}

/// Application-wide session state.
///
/// Clones share the same state, so every holder observes a login or logout
/// made through any other clone.
#[derive(Clone)]
pub struct AuthContext {
    api: ApiClient,
    storage: LocalStorage,
    state: Arc<RwLock<AuthState>>,
}

impl AuthContext {
    /// Create a context in the `Loading` state. Call `mount` to restore a
    /// stored session. The context persists into the client's storage.
    pub fn new(api: ApiClient) -> Self {
        let storage = api.storage().clone();
        Self {
            api,
            storage,
            state: Arc::new(RwLock::new(AuthState::Loading)),
        }
    }

    /// Restore the session from storage without contacting the backend.
    /// A stored token and user snapshot yield `Authenticated`; anything else
    /// yields `Anonymous`.
    pub fn mount(&self) -> AuthState {
        let token = self.storage.get_item(ACCESS_TOKEN_KEY);
        let stored_user = self.storage.get_item(USER_DATA_KEY);

        let state = match (token, stored_user) {
            (Some(_), Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    debug!(username = %user.username, "Session restored from storage");
                    AuthState::Authenticated(user)
                }
                Err(e) => {
                    warn!(error = %e, "Stored user data is unreadable, starting anonymous");
                    AuthState::Anonymous
                }
            },
            _ => {
                debug!("No stored session found");
                AuthState::Anonymous
            }
        };

        self.set_state(state.clone());
        state
    }

    /// Log in against the backend and persist the session.
    /// On failure the state and storage are left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let response = self.api.login(username, password).await?;

        let user_data = match serde_json::to_string(&response.user) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize user snapshot");
                return Err(ApiError::InvalidResponse(e.to_string()));
            }
        };

        for (key, value) in [
            (ACCESS_TOKEN_KEY, response.access.as_str()),
            (REFRESH_TOKEN_KEY, response.refresh.as_str()),
            (USER_DATA_KEY, user_data.as_str()),
        ] {
            if let Err(e) = self.storage.set_item(key, value) {
                warn!(key, error = %e, "Failed to persist session");
            }
        }

        self.set_state(AuthState::Authenticated(response.user.clone()));
        info!(username = %response.user.username, "Login successful");
        Ok(response.user)
    }

    /// Forget the session locally. The backend is not contacted.
    ///
    /// The in-memory state is `Anonymous` afterwards even when a key could
    /// not be removed from disk; that failure is returned so callers can
    /// report it and retry.
    pub fn logout(&self) -> anyhow::Result<()> {
        let mut failure = None;
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove_item(key) {
                warn!(key, error = %e, "Failed to remove session key");
                failure.get_or_insert(e);
            }
        }
        self.set_state(AuthState::Anonymous);

        match failure {
            Some(e) => Err(e.context("Session is still stored on disk")),
            None => {
                info!("Logged out");
                Ok(())
            }
        }
    }

    /// Swap the stored refresh token for a new access token.
    /// The user snapshot is unchanged.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let refresh_token = self
            .storage
            .get_item(REFRESH_TOKEN_KEY)
            .ok_or(ApiError::MissingToken("refresh token"))?;

        let response = self.api.refresh(&refresh_token).await?;

        if let Err(e) = self.storage.set_item(ACCESS_TOKEN_KEY, &response.access) {
            warn!(error = %e, "Failed to persist refreshed access token");
        }
        if let Some(ref rotated) = response.refresh {
            if let Err(e) = self.storage.set_item(REFRESH_TOKEN_KEY, rotated) {
                warn!(error = %e, "Failed to persist rotated refresh token");
            }
        }
        debug!(rotated = response.refresh.is_some(), "Access token refreshed");
        Ok(())
    }

    pub fn state(&self) -> AuthState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn user(&self) -> Option<User> {
        match self.state() {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state(), AuthState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), AuthState::Authenticated(_))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn set_state(&self, state: AuthState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::storage::STORAGE_FILE;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context_for(server: &MockServer, storage: LocalStorage) -> AuthContext {
        AuthContext::new(ApiClient::new(server.uri(), storage).expect("client"))
    }

    fn stored_user() -> User {
        User {
            id: 1,
            username: "mario".to_string(),
            role: Role::Gamer,
            email: None,
            avatar_url: None,
        }
    }

    #[test]
    fn test_starts_loading() {
        let api = ApiClient::new("http://127.0.0.1:9/api", LocalStorage::in_memory()).expect("client");
        let ctx = AuthContext::new(api);
        assert!(ctx.is_loading());
        assert_eq!(ctx.user(), None);
    }

    #[tokio::test]
    async fn test_mount_restores_without_network() {
        let server = MockServer::start().await;
        let storage = LocalStorage::in_memory();
        storage.set_item(ACCESS_TOKEN_KEY, "acc").expect("set");
        storage
            .set_item(USER_DATA_KEY, &serde_json::to_string(&stored_user()).expect("json"))
            .expect("set");

        let ctx = context_for(&server, storage);
        assert_eq!(ctx.mount(), AuthState::Authenticated(stored_user()));
        assert!(!ctx.is_loading());
        assert_eq!(ctx.user(), Some(stored_user()));

        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_mount_requires_token_and_user() {
        let server = MockServer::start().await;
        let storage = LocalStorage::in_memory();
        storage
            .set_item(USER_DATA_KEY, &serde_json::to_string(&stored_user()).expect("json"))
            .expect("set");

        let ctx = context_for(&server, storage.clone());
        assert_eq!(ctx.mount(), AuthState::Anonymous);

        storage.remove_item(USER_DATA_KEY).expect("remove");
        storage.set_item(ACCESS_TOKEN_KEY, "acc").expect("set");
        assert_eq!(ctx.mount(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_mount_with_unreadable_user_is_anonymous() {
        let server = MockServer::start().await;
        let storage = LocalStorage::in_memory();
        storage.set_item(ACCESS_TOKEN_KEY, "acc").expect("set");
        storage.set_item(USER_DATA_KEY, "{not json").expect("set");

        let ctx = context_for(&server, storage);
        assert_eq!(ctx.mount(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let server = MockServer::start().await;
        let backend_user = json!({"id": 1, "username": "mario", "role": "GAMER"});
        Mock::given(method("POST"))
            .and(path("/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": "acc", "refresh": "ref", "user": backend_user
            })))
            .mount(&server)
            .await;

        let storage = LocalStorage::in_memory();
        let ctx = context_for(&server, storage.clone());
        ctx.mount();

        let user = ctx.login("mario", "pw").await.expect("login");
        assert_eq!(user, stored_user());
        assert_eq!(ctx.user(), Some(stored_user()));

        assert_eq!(storage.get_item(ACCESS_TOKEN_KEY).as_deref(), Some("acc"));
        assert_eq!(storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("ref"));
        let saved: User = serde_json::from_str(&storage.get_item(USER_DATA_KEY).expect("user_data"))
            .expect("parse");
        assert_eq!(saved, user);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_state_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "No active account found with the given credentials"
            })))
            .mount(&server)
            .await;

        let storage = LocalStorage::in_memory();
        let ctx = context_for(&server, storage.clone());
        ctx.mount();

        let err = ctx.login("mario", "wrong").await.expect_err("should fail");
        assert_eq!(err.to_string(), "No active account found with the given credentials");
        assert_eq!(ctx.state(), AuthState::Anonymous);
        assert!(!storage.contains_key(ACCESS_TOKEN_KEY));
        assert!(!storage.contains_key(USER_DATA_KEY));
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let server = MockServer::start().await;
        let storage = LocalStorage::in_memory();
        storage.set_item(ACCESS_TOKEN_KEY, "acc").expect("set");
        storage.set_item(REFRESH_TOKEN_KEY, "ref").expect("set");
        storage
            .set_item(USER_DATA_KEY, &serde_json::to_string(&stored_user()).expect("json"))
            .expect("set");

        let ctx = context_for(&server, storage.clone());
        ctx.mount();
        assert!(ctx.is_authenticated());

        ctx.logout().expect("logout");
        assert_eq!(ctx.user(), None);
        assert_eq!(ctx.state(), AuthState::Anonymous);
        for key in SESSION_KEYS {
            assert!(!storage.contains_key(key), "{} should be removed", key);
        }

        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_login_through_success_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {
                    "access": "acc", "refresh": "ref",
                    "user": {"id": 1, "username": "mario", "role": "GAMER"}
                }
            })))
            .mount(&server)
            .await;

        let storage = LocalStorage::in_memory();
        let ctx = context_for(&server, storage.clone());
        ctx.mount();

        let user = ctx.login("mario", "pw").await.expect("login");
        assert_eq!(user, stored_user());
        assert_eq!(storage.get_item(ACCESS_TOKEN_KEY).as_deref(), Some("acc"));
        assert_eq!(storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("ref"));
        assert!(storage.contains_key(USER_DATA_KEY));
    }

    #[tokio::test]
    async fn test_logout_reports_unwritable_storage() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join(STORAGE_FILE);

        let storage = LocalStorage::open(&file).expect("open");
        storage.set_item(ACCESS_TOKEN_KEY, "acc").expect("set");
        storage.set_item(REFRESH_TOKEN_KEY, "ref").expect("set");
        storage
            .set_item(USER_DATA_KEY, &serde_json::to_string(&stored_user()).expect("json"))
            .expect("set");

        let ctx = context_for(&server, storage.clone());
        assert!(matches!(ctx.mount(), AuthState::Authenticated(_)));

        // Replace the file with a directory so writes fail
        std::fs::remove_file(&file).expect("remove file");
        std::fs::create_dir(&file).expect("create dir");

        assert!(ctx.logout().is_err());
        assert_eq!(ctx.state(), AuthState::Anonymous);
        assert!(storage.contains_key(ACCESS_TOKEN_KEY));

        // A retry once the disk is writable clears everything, across a restart too
        std::fs::remove_dir(&file).expect("remove dir");
        ctx.logout().expect("retry logout");

        let restarted = LocalStorage::open(&file).expect("reopen");
        for key in SESSION_KEYS {
            assert!(!restarted.contains_key(key), "{} should be removed", key);
        }
        assert_eq!(context_for(&server, restarted).mount(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_refresh_replaces_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": "acc-2", "refresh": "ref-2"
            })))
            .mount(&server)
            .await;

        let storage = LocalStorage::in_memory();
        storage.set_item(ACCESS_TOKEN_KEY, "acc").expect("set");
        storage.set_item(REFRESH_TOKEN_KEY, "ref").expect("set");

        let ctx = context_for(&server, storage.clone());
        ctx.refresh().await.expect("refresh");
        assert_eq!(storage.get_item(ACCESS_TOKEN_KEY).as_deref(), Some("acc-2"));
        assert_eq!(storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("ref-2"));
    }

    #[tokio::test]
    async fn test_refresh_without_token() {
        let server = MockServer::start().await;
        let ctx = context_for(&server, LocalStorage::in_memory());
        let err = ctx.refresh().await.expect_err("should fail");
        assert!(matches!(err, ApiError::MissingToken(_)));
    }
}
