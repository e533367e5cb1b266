use std::io;
use std::path::PathBuf;
use std::str::Utf8Error;

use crate::diagnostics::FailureReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecErrorCode {
    Transport,
    DecodeExhausted,
    Encoding,
    Io,
}

/// Terminal failure of a load or save call.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("malformed base64 transport: {0}")]
    Transport(#[from] base64::DecodeError),

    #[error("no decoder accepted the payload ({})", .0.summary())]
    DecodeExhausted(Box<FailureReport>),

    #[error("unable to serialize save document: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CodecError {
    pub fn code(&self) -> CodecErrorCode {
        match self {
            Self::Transport(_) => CodecErrorCode::Transport,
            Self::DecodeExhausted(_) => CodecErrorCode::DecodeExhausted,
            Self::Encoding(_) => CodecErrorCode::Encoding,
            Self::Io { .. } => CodecErrorCode::Io,
        }
    }

    /// Diagnostics carried by an exhausted decoder chain.
    pub fn failure_report(&self) -> Option<&FailureReport> {
        match self {
            Self::DecodeExhausted(report) => Some(report.as_ref()),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a single decoder in the chain rejected the payload.
///
/// These are recorded per attempt and never abort a load on their own.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MethodError {
    #[error("ciphertext length {len} is not a positive multiple of the block size")]
    Padding { len: usize },

    #[error("payload too short for a length header ({len} bytes)")]
    TooShort { len: usize },

    #[error("implausible length header (le={le}, be={be}, total={total})")]
    HeaderImplausible { le: u32, be: u32, total: usize },

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("invalid utf-8: {0}")]
    Utf8(#[from] Utf8Error),

    #[error("malformed json: {0}")]
    MalformedJson(String),
}

impl MethodError {
    /// True when the method never ran because its input precondition failed.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::Padding { .. } | Self::TooShort { .. } | Self::HeaderImplausible { .. }
        )
    }
}

impl From<serde_json::Error> for MethodError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedJson(err.to_string())
    }
}

impl From<io::Error> for MethodError {
    fn from(err: io::Error) -> Self {
        Self::Decompress(err.to_string())
    }
}
