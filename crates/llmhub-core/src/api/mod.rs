//! REST API client module for the LLM Hub backend.
//!
//! This module provides the `ApiClient` for signing in and fetching the
//! signed-in user's profile. The backend issues bearer tokens from a
//! form-encoded login endpoint and checks them on every request.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginScope, UserProfile, DEFAULT_API_URL};
pub use error::ApiError;
