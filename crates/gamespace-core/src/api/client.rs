//! API client for communicating with the GameSpace REST backend.
//!
//! Every request goes through the same pipeline: the stored access token is
//! attached as a bearer header, success bodies are unwrapped from the
//! `{success, data}` envelope, and error bodies are flattened into a single
//! message (see `error_message`).

use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{
    LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest, UserProfile,
};
use crate::storage::{LocalStorage, ACCESS_TOKEN_KEY};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the backend API
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

// The backend must route the trailing-slash form of every path below
const LOGIN_PATH: &str = "/auth/login/";
const REGISTER_PATH: &str = "/auth/register/";
const REFRESH_PATH: &str = "/auth/refresh/";
const PROFILE_PATH: &str = "/users/me/";

/// API client for the GameSpace backend.
/// Clone is cheap - reqwest::Client and LocalStorage are both shared handles.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    storage: LocalStorage,
}

impl ApiClient {
    /// Create a client that reads its bearer token from `storage`
    pub fn new(base_url: impl Into<String>, storage: LocalStorage) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder().default_headers(headers).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            storage,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Headers added to every outgoing request.
    /// The token is read from storage each time, so a login or logout is
    /// picked up by the next request without touching the client.
    fn auth_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.storage.get_item(ACCESS_TOKEN_KEY) {
            match header::HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored access token is not a valid header value, sending without it"),
            }
        }
        headers
    }

    /// Unwrap a `{success, data}` envelope when `success` is truthy.
    /// Other bodies are returned as-is.
    pub fn unwrap_envelope(body: Value) -> Value {
        match body {
            Value::Object(mut map) if map.get("success").is_some_and(is_truthy) => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(path, %status, body = %ApiError::truncate_body(&text), "Request rejected");
            return Err(ApiError::from_response(status, &text));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                warn!(path, error = %e, "Response body is not JSON");
                ApiError::InvalidResponse(e.to_string())
            })?
        };

        serde_json::from_value(Self::unwrap_envelope(body)).map_err(|e| {
            warn!(path, error = %e, "Failed to decode response");
            ApiError::InvalidResponse(e.to_string())
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = request
            .headers(self.auth_headers())
            .send()
            .await
            .map_err(|e| {
                warn!(path, error = %e, "Request failed");
                ApiError::Network(e)
            })?;

        Self::handle_response(response, path).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(method = %Method::GET, path, "Sending request");
        let request = self.client.get(self.url(path));
        self.send(request, path).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(method = %Method::POST, path, "Sending request");
        let request = self.client.post(self.url(path)).json(body);
        self.send(request, path).await
    }

    // ===== Auth Endpoints =====

    /// Exchange credentials for an access/refresh token pair and the user snapshot
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.post(LOGIN_PATH, &LoginRequest { username, password })
            .await
    }

    /// Create an account. The backend's success payload is returned unparsed.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Value, ApiError> {
        self.post(REGISTER_PATH, request).await
    }

    /// Obtain a fresh access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        self.post(
            REFRESH_PATH,
            &RefreshRequest {
                refresh: refresh_token,
            },
        )
        .await
    }

    /// Fetch the profile of the currently authenticated user
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.get(PROFILE_PATH).await
    }
}

/// JSON truthiness: false, null, 0 and "" are falsy, everything else truthy
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ============================================================================
// Tests
// ============================================================================
