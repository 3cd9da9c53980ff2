//! REST API client module for the GameSpace backend.
//!
//! This module provides the `ApiClient` for talking to the backend and the
//! `ApiError` type every call returns. Backend errors are normalized into a
//! single readable message before they reach callers.
//!
//! The API uses JWT bearer token authentication; the token is read from
//! `LocalStorage` on every request.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_API_BASE_URL};
pub use error::{error_message, ApiError, GENERIC_ERROR_MESSAGE};
