use tracing::{error, info};

use crate::api::ApiClient;
use crate::models::{RegisterRequest, Role};

use super::Route;

/// Shown when the backend rejects a registration with an empty message
const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub error: Option<String>,
}

impl RegisterForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit the form. New accounts always get the `GAMER` role.
    /// Returns the page to show next, or `None` with `error` set.
    pub async fn submit(&mut self, api: &ApiClient) -> Option<Route> {
        self.error = None;

        let request = RegisterRequest {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            role: Role::Gamer,
        };

        match api.register(&request).await {
            Ok(_) => {
                info!(username = %self.username, "Registration successful");
                Some(Route::Login)
            }
            Err(e) => {
                error!(error = %e, "Registration failed");
                let message = e.to_string();
                self.error = Some(if message.is_empty() {
                    REGISTRATION_FAILED.to_string()
                } else {
                    message
                });
                None
            }
        }
    }
}
