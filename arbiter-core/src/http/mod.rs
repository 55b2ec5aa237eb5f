//! HTTP client module for provider adapters
//!
//! This module implements the shared HTTP layer, handling:
//! - Connection pooling and client management
//! - Error mapping that preserves HTTP status for retry classification
//! - Request ID generation and correlation

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::map_http_error;
