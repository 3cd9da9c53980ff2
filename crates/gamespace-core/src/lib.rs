//! Core library for the GameSpace client.
//!
//! - `api`: HTTP client for the backend, with bearer auth and error normalization
//! - `auth`: session state, login/logout, and scoped access via `use_auth`
//! - `storage`: persistent key-value store for tokens and the user snapshot
//! - `pages`: form state for the login and registration pages
//! - `models`: request/response types
//! - `config`: configuration file and path resolution

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod pages;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use auth::{use_auth, AuthContext, AuthProvider, AuthState};
pub use config::Config;
pub use storage::LocalStorage;
