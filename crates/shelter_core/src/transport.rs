//! Base64 wrapping of the on-disk save bytes.
//!
//! Decoding is strict: standard alphabet, canonical `=` padding. ASCII
//! whitespace (line breaks from editors, trailing newlines) is dropped first.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::CodecError;

pub fn decode(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let cleaned: Vec<u8> = bytes
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(cleaned)?)
}

pub fn encode(bytes: &[u8]) -> Vec<u8> {
    STANDARD.encode(bytes).into_bytes()
}
