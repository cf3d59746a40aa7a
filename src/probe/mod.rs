//! Stream format probing
//!
//! Fetches the head of a remote playlist and infers the audio codec family
//! from the codec identifiers it announces. Probing never fails the request:
//! every error path resolves to [`ProbeResult::Unknown`].

pub mod signature;

use futures_util::StreamExt;
use reqwest::{header, Client};

use crate::config::ProbeConfig;
use crate::format::OutputFormat;
use signature::{ScanStep, SignatureScanner};

/// Outcome of a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Detected(OutputFormat),
    Unknown,
}

/// Probe `url` for its audio codec family.
pub async fn probe_format(client: &Client, url: &str, config: &ProbeConfig) -> ProbeResult {
    match scan_remote(client, url, config).await {
        Ok(result) => result,
        Err(e) => {
            tracing::debug!("Probe of {} failed: {}", url, e);
            ProbeResult::Unknown
        }
    }
}

async fn scan_remote(
    client: &Client,
    url: &str,
    config: &ProbeConfig,
) -> Result<ProbeResult, reqwest::Error> {
    let response = client
        .get(url)
        .header(header::CONNECTION, "close")
        .timeout(config.timeout())
        .send()
        .await?;
    tracing::debug!("Probe response for {}: {}", url, response.status());

    let mut scanner = SignatureScanner::new(config.max_bytes);
    let mut body = response.bytes_stream();

    // The connection is never reused: returning drops `body`, which aborts
    // an unfinished transfer, and a finished one ends on `Connection: close`.
    while let Some(chunk) = body.next().await {
        match scanner.feed(&chunk?) {
            ScanStep::Matched(format) => return Ok(ProbeResult::Detected(format)),
            ScanStep::Exhausted => {
                tracing::debug!(
                    "Probe gave up on {} after {} bytes",
                    url,
                    scanner.received()
                );
                return Ok(ProbeResult::Unknown);
            }
            ScanStep::Pending => {}
        }
    }

    Ok(ProbeResult::Unknown)
}
