use tracing::error;

use crate::auth::AuthContext;

use super::Route;

/// Shown when the backend rejects a login with an empty message
const LOGIN_FAILED: &str = "Login failed";

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Log in through `auth`. The password is cleared once the session is stored.
    pub async fn submit(&mut self, auth: &AuthContext) -> Option<Route> {
        self.error = None;

        match auth.login(&self.username, &self.password).await {
            Ok(_) => {
                self.password.clear();
                Some(Route::Home)
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                let message = e.to_string();
                self.error = Some(if message.is_empty() {
                    LOGIN_FAILED.to_string()
                } else {
                    message
                });
                None
            }
        }
    }
}
