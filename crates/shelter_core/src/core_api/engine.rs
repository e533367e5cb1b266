use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::backup;
use crate::chain::{DecodeMethod, DecodeOutcome};
use crate::codec::{self, SAVE_FORMAT};
use crate::diagnostics::{self, Analysis};
use crate::document::SaveDocument;
use crate::error::CodecError;

use super::types::{Capabilities, KeyPath, Summary, WriteOptions};

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

/// A decoded save held by a front end until it is written back.
#[derive(Debug, Clone)]
pub struct Session {
    method: DecodeMethod,
    payload_len: usize,
    document: SaveDocument,
}

impl Engine {
    pub fn new() -> Self {
        Self
    }

    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session, CodecError> {
        codec::load(bytes.as_ref()).map(Session::from_outcome)
    }

    pub fn open_path(&self, path: &Path) -> Result<Session, CodecError> {
        let bytes = fs::read(path).map_err(|e| CodecError::io(path, e))?;
        self.open_bytes(bytes)
    }

    /// Starts a session from a document that did not come from a save file,
    /// e.g. hand-edited JSON about to be encoded.
    pub fn new_session(&self, document: SaveDocument) -> Session {
        Session {
            method: SAVE_FORMAT,
            payload_len: 0,
            document,
        }
    }

    pub fn analyze_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Analysis {
        diagnostics::analyze(bytes.as_ref())
    }
}

impl Session {
    fn from_outcome(outcome: DecodeOutcome) -> Self {
        Self {
            method: outcome.method,
            payload_len: outcome.payload_len,
            document: outcome.document,
        }
    }

    pub fn method(&self) -> DecodeMethod {
        self.method
    }

    pub fn document(&self) -> &SaveDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut SaveDocument {
        &mut self.document
    }

    pub fn into_document(self) -> SaveDocument {
        self.document
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_document(self.method, self.document.as_value().is_object())
    }

    pub fn summary(&self) -> Summary {
        Summary {
            method: self.method,
            payload_len: self.payload_len,
            top_level_keys: self.document.top_level_keys(),
            upgrades_on_save: self.method != SAVE_FORMAT,
        }
    }

    pub fn get(&self, key: &str, path: KeyPath) -> Option<&Value> {
        match path {
            KeyPath::Search => self.document.find_key(key),
            KeyPath::Pointer => self.document.pointer(key),
        }
    }

    /// Replaces an existing value. Returns `false` if nothing is addressed by
    /// `key`; new keys are never created.
    pub fn set(&mut self, key: &str, path: KeyPath, value: Value) -> bool {
        let slot = match path {
            KeyPath::Search => self.document.find_key_mut(key),
            KeyPath::Pointer => self.document.pointer_mut(key),
        };
        match slot {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::save(&self.document, self.method)
    }

    /// Encodes and writes the save. Returns the backup path if an existing
    /// file was backed up first.
    pub fn write_to(
        &self,
        path: &Path,
        options: WriteOptions,
    ) -> Result<Option<PathBuf>, CodecError> {
        let bytes = self.to_bytes()?;
        let backup = if options.backup && path.exists() {
            Some(backup::create_backup(path)?)
        } else {
            None
        };
        fs::write(path, bytes).map_err(|e| CodecError::io(path, e))?;
        Ok(backup)
    }
}
