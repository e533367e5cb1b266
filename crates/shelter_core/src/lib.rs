//! Decoding and re-encoding of Fallout Shelter save files.
//!
//! A `.sav` file is base64 text around an AES-256-CBC ciphertext of compact
//! JSON. Older builds wrote plain, zlib or gzip JSON instead; those are still
//! read, but every save is written in the current format.

pub mod backup;
pub mod chain;
pub mod codec;
pub mod core_api;
pub mod crypto;
pub mod diagnostics;
pub mod document;
pub mod entropy;
mod error;
pub mod transport;

pub use chain::{DecodeMethod, DecodeOutcome, MethodAttempt};
pub use diagnostics::{Analysis, FailureReport};
pub use document::SaveDocument;
pub use error::{CodecError, CodecErrorCode, MethodError};
