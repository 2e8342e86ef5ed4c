//! Core library for the LLM Hub admin console.
//!
//! - `session`: token persistence and the inactivity session monitor
//! - `api`: REST client for the LLM Hub backend
//! - `config`: on-disk configuration and environment overrides

pub mod api;
pub mod config;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use session::{SessionController, TimeoutPolicy, TokenStore};
