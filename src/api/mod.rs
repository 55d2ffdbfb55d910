//! REST API client module for the authentication backend.
//!
//! This module provides the `AuthClient` for obtaining access/refresh token
//! pairs from the login endpoint and rotating access tokens through the
//! refresh endpoint. Everything else the backend serves is out of scope.

pub mod client;
pub mod error;

pub use client::{AuthClient, LoginResponse, RefreshResponse};
pub use error::ApiError;
