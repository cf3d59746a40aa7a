//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the recorder endpoints
//! - Status handlers (banner, health, version)
//! - The streaming `/record` handler
//! - CORS and request tracing middleware

pub mod handlers;
pub mod record;
pub mod routes;

pub use routes::create_router;
