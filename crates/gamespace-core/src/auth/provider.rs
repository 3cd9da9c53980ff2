use std::future::Future;

use super::AuthContext;

tokio::task_local! {
    static CURRENT_AUTH: AuthContext;
}

/// Installs an `AuthContext` for everything awaited inside `scope`.
///
/// The context is task-local: futures handed to `tokio::spawn` from inside
/// the scope do not see it and must be wrapped in their own scope.
pub struct AuthProvider;

impl AuthProvider {
    pub async fn scope<F: Future>(context: AuthContext, f: F) -> F::Output {
        CURRENT_AUTH.scope(context, f).await
    }
}

/// The context installed by the enclosing `AuthProvider`.
///
/// # Panics
///
/// Panics when called outside an `AuthProvider` scope. That is a wiring
/// bug, not a runtime condition.
pub fn use_auth() -> AuthContext {
    try_use_auth().unwrap_or_else(|| panic!("use_auth must be used within AuthProvider"))
}

pub fn try_use_auth() -> Option<AuthContext> {
    CURRENT_AUTH.try_with(AuthContext::clone).ok()
}
