//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `AuthContext`: session state backed by `LocalStorage`, with login,
//!   logout and token refresh
//! - `AuthProvider` / `use_auth`: scoped access to the current context
//!
//! Sessions are restored from storage at startup without a server round-trip;
//! no client-side expiry check is performed.

pub mod context;
pub mod provider;

pub use context::{AuthContext, AuthState};
pub use provider::{try_use_auth, use_auth, AuthProvider};
