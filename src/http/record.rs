//! Recording endpoint
//!
//! `GET /record?url=<stream>&filename=<name>&format=<mp3|aac|...>`
//!
//! Resolves the output format (probing the stream when none is given),
//! launches ffmpeg and streams its output back as a file download. Status
//! and headers are committed only once the first output bytes exist, so a
//! transcoder that fails up front still gets a 500.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{RecorderError, Result};
use crate::format::{resolve_format, DEFAULT_FILENAME};
use crate::probe::probe_format;
use crate::state::AppState;
use crate::transcode::TranscodeProxy;

/// Query parameters as received
#[derive(Debug, Default, Deserialize)]
pub struct RecordParams {
    pub url: Option<String>,
    pub filename: Option<String>,
    pub format: Option<String>,
}

/// Validated recording request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRequest {
    pub source_url: String,
    pub filename: String,
    pub requested_format: Option<String>,
}

impl RecordingRequest {
    pub fn from_params(params: RecordParams) -> Result<Self> {
        let source_url = params
            .url
            .filter(|u| !u.is_empty())
            .ok_or(RecorderError::MissingUrl)?;
        let filename = params
            .filename
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        Ok(Self {
            source_url,
            filename,
            requested_format: params.format,
        })
    }
}

/// Record a live stream
/// GET /record
pub async fn record(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordParams>,
) -> Result<Response> {
    let request = RecordingRequest::from_params(params)?;
    tracing::info!("Starting recording for: {}", request.source_url);

    let resolved = resolve_format(request.requested_format.as_deref(), || {
        probe_format(&state.http_client, &request.source_url, &state.config.probe)
    })
    .await;
    tracing::info!("Using format: {} ({:?})", resolved.format, resolved.source);

    let mut proxy =
        TranscodeProxy::launch(&state.config.ffmpeg, &request.source_url, &resolved.format)?;
    let first = proxy.first_chunk().await?;
    tracing::debug!(
        "[{}] streaming {} to client",
        proxy.session_id(),
        resolved.content_type()
    );

    let headers = recording_headers(&request.filename, resolved.content_type());
    Ok((headers, Body::from_stream(proxy.into_body(first))).into_response())
}

/// Download headers for a recording
pub fn recording_headers(filename: &str, content_type: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let disposition = format!("attachment; filename=\"{}\"", header_safe_filename(filename));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).unwrap_or(HeaderValue::from_static("attachment")),
    );
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers
}

/// Replace characters that cannot appear inside a quoted header parameter
fn header_safe_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect()
}
