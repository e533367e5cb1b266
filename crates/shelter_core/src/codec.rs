//! Load/save entry points over raw save-file bytes.
//!
//! Reading accepts every format the decoder chain knows; writing always
//! produces the current AES-CBC format, so re-saving a legacy file upgrades it.

use crate::chain::{self, DecodeMethod, DecodeOutcome};
use crate::crypto;
use crate::document::SaveDocument;
use crate::error::CodecError;
use crate::transport;

/// The only format `save` writes.
pub const SAVE_FORMAT: DecodeMethod = DecodeMethod::AesCbc;

pub fn load(bytes: &[u8]) -> Result<DecodeOutcome, CodecError> {
    let payload = transport::decode(bytes)?;
    chain::decode_payload(&payload)
}

/// Encodes `document` for disk. `loaded_with` is the method that originally
/// decoded it; non-AES inputs are upgraded to [`SAVE_FORMAT`].
pub fn save(document: &SaveDocument, loaded_with: DecodeMethod) -> Result<Vec<u8>, CodecError> {
    if loaded_with != SAVE_FORMAT {
        log::warn!("re-encoding {loaded_with} save as {SAVE_FORMAT}");
    }
    let plaintext = document.to_compact_vec()?;
    Ok(transport::encode(&crypto::encrypt(&plaintext)))
}
