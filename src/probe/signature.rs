//! Codec signature scanning
//!
//! HLS master playlists announce their codecs in `CODECS="..."` attributes,
//! normally within the first few hundred bytes. The scanner accumulates the
//! response text chunk by chunk and stops at the first known signature or
//! once the byte budget is spent.

use crate::format::OutputFormat;

/// RFC 6381 object type for MPEG-1 Layer III audio
pub const MP3_SIGNATURE: &str = "mp4a.40.34";

/// AAC object types: HE-AAC and AAC-LC
pub const AAC_SIGNATURES: [&str; 2] = ["mp4a.40.5", "mp4a.40.2"];

/// Outcome of feeding one chunk to the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStep {
    /// A signature matched
    Matched(OutputFormat),
    /// No match yet, keep reading
    Pending,
    /// Budget exceeded without a match
    Exhausted,
}

/// Match a codec signature in playlist text.
///
/// MP3 is checked first; a text carrying both families resolves to MP3.
pub fn match_signature(text: &str) -> Option<OutputFormat> {
    if text.contains(MP3_SIGNATURE) {
        return Some(OutputFormat::Mp3);
    }
    if AAC_SIGNATURES.iter().any(|sig| text.contains(sig)) {
        return Some(OutputFormat::Adts);
    }
    None
}

/// Incremental, byte-budgeted signature scanner
#[derive(Debug)]
pub struct SignatureScanner {
    text: String,
    received: usize,
    max_bytes: usize,
}

impl SignatureScanner {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            text: String::new(),
            received: 0,
            max_bytes,
        }
    }

    /// Append a chunk and test the accumulated text.
    ///
    /// A signature found in the chunk that crosses the budget still counts.
    pub fn feed(&mut self, chunk: &[u8]) -> ScanStep {
        self.received += chunk.len();
        self.text.push_str(&String::from_utf8_lossy(chunk));

        if let Some(format) = match_signature(&self.text) {
            return ScanStep::Matched(format);
        }
        if self.received > self.max_bytes {
            return ScanStep::Exhausted;
        }
        ScanStep::Pending
    }

    /// Bytes consumed so far
    pub fn received(&self) -> usize {
        self.received
    }
}
