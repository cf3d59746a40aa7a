//! HTTP request handlers
//!
//! Static status endpoints. The recording endpoint lives in `record`.

/// Service banner
/// GET /
pub async fn index() -> &'static str {
    "Stream Recorder Service Running"
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("stream-recorder v", env!("CARGO_PKG_VERSION"))
}
