//! Failure reports and whole-file analysis for saves that do not load.

use std::fmt::Write as _;
use std::io::Read;

use flate2::read::DeflateDecoder;
use serde::Serialize;

use crate::chain::{DecodeMethod, Endian, LengthHeader, MethodAttempt};
use crate::document::SaveDocument;
use crate::entropy::{is_likely_encrypted, shannon_entropy};
use crate::error::MethodError;
use crate::transport;

/// Bytes shown in hex previews.
pub const HEX_PREVIEW_LEN: usize = 100;

/// Characters of lossy UTF-8 shown when a payload looks like JSON text.
pub const TEXT_PREVIEW_LEN: usize = 500;

pub fn hex_preview(bytes: &[u8], limit: usize) -> String {
    let mut out = String::with_capacity(limit.min(bytes.len()) * 2);
    for b in bytes.iter().take(limit) {
        write!(&mut out, "{b:02x}").expect("writing to String cannot fail");
    }
    out
}

/// Carried by [`CodecError::DecodeExhausted`](crate::CodecError::DecodeExhausted).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub payload_len: usize,
    pub entropy: f64,
    pub likely_encrypted: bool,
    pub hex_preview: String,
    pub attempts: Vec<MethodAttempt>,
}

impl FailureReport {
    pub fn new(payload: &[u8], attempts: Vec<MethodAttempt>) -> Self {
        let entropy = shannon_entropy(payload);
        Self {
            payload_len: payload.len(),
            entropy,
            likely_encrypted: is_likely_encrypted(entropy),
            hex_preview: hex_preview(payload, HEX_PREVIEW_LEN),
            attempts,
        }
    }

    pub fn attempt(&self, method: DecodeMethod) -> Option<&MethodAttempt> {
        self.attempts.iter().find(|a| a.method == method)
    }

    pub fn skipped(&self) -> impl Iterator<Item = DecodeMethod> + '_ {
        self.attempts.iter().filter(|a| a.skipped).map(|a| a.method)
    }

    /// One line for error messages.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} methods failed on {} bytes, entropy {:.2}",
            self.attempts.len(),
            self.payload_len,
            self.entropy
        );
        if self.likely_encrypted {
            out.push_str(", likely encrypted");
        }
        out
    }
}

/// Outcome of one decoding probe during [`analyze`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Probe {
    pub name: String,
    pub ok: bool,
    pub error: Option<String>,
}

impl Probe {
    fn from_result<T>(name: impl Into<String>, result: &Result<T, MethodError>) -> Self {
        Self {
            name: name.into(),
            ok: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderReading {
    pub le: u32,
    pub be: u32,
    pub le_plausible: bool,
    pub be_plausible: bool,
}

/// Everything known about a save file, gathered without stopping at the
/// first decoder that works.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub raw_size: usize,
    pub raw_preview: String,
    pub base64_decoded: bool,
    pub base64_error: Option<String>,
    pub decoded_size: Option<usize>,
    pub decoded_preview: Option<String>,
    pub probes: Vec<Probe>,
    pub raw_deflate: Option<Probe>,
    pub length_header: Option<HeaderReading>,
    pub text_preview: Option<String>,
    pub entropy: Option<f64>,
    pub likely_encrypted: Option<bool>,
    pub decoded_by: Option<DecodeMethod>,
    pub top_level_keys: Vec<String>,
}

pub fn analyze(raw: &[u8]) -> Analysis {
    let mut analysis = Analysis {
        raw_size: raw.len(),
        raw_preview: hex_preview(raw, HEX_PREVIEW_LEN),
        base64_decoded: false,
        base64_error: None,
        decoded_size: None,
        decoded_preview: None,
        probes: Vec::new(),
        raw_deflate: None,
        length_header: None,
        text_preview: None,
        entropy: None,
        likely_encrypted: None,
        decoded_by: None,
        top_level_keys: Vec::new(),
    };

    let payload = match transport::decode(raw) {
        Ok(payload) => payload,
        Err(e) => {
            analysis.base64_error = Some(e.to_string());
            return analysis;
        }
    };
    analysis.base64_decoded = true;
    analysis.decoded_size = Some(payload.len());
    analysis.decoded_preview = Some(hex_preview(&payload, HEX_PREVIEW_LEN));

    let mut first_success: Option<(DecodeMethod, SaveDocument)> = None;
    for method in DecodeMethod::ALL {
        let result = method.decode(&payload);
        analysis.probes.push(Probe::from_result(method.tag(), &result));
        if first_success.is_none() {
            if let Ok(doc) = result {
                first_success = Some((method, doc));
            }
        }
    }

    let raw_deflate = inflate_raw(&payload).and_then(|bytes| SaveDocument::from_slice(&bytes));
    analysis.raw_deflate = Some(Probe::from_result("raw-deflate", &raw_deflate));

    analysis.length_header = LengthHeader::read(&payload).map(|h| HeaderReading {
        le: h.le,
        be: h.be,
        le_plausible: h.is_plausible(Endian::Little),
        be_plausible: h.is_plausible(Endian::Big),
    });

    let text = String::from_utf8_lossy(&payload);
    let head: String = text.chars().take(TEXT_PREVIEW_LEN).collect();
    if head.contains('{') || head.contains('"') {
        analysis.text_preview = Some(head);
    }

    let entropy = shannon_entropy(&payload);
    analysis.entropy = Some(entropy);
    analysis.likely_encrypted = Some(is_likely_encrypted(entropy));

    if let Some((method, doc)) = first_success {
        analysis.decoded_by = Some(method);
        analysis.top_level_keys = doc.top_level_keys();
    }
    analysis
}

fn inflate_raw(data: &[u8]) -> Result<Vec<u8>, MethodError> {
    let mut out = Vec::new();
    DeflateDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}
