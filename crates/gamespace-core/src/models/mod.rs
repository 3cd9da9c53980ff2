//! Data models exchanged with the GameSpace backend.
//!
//! - `User`, `Role`: the account snapshot returned at login
//! - `UserProfile`: the public profile served by `/users/me/`
//! - Request/response bodies for the auth endpoints

pub mod auth;
pub mod user;

pub use auth::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest};
pub use user::{Role, User, UserProfile};
