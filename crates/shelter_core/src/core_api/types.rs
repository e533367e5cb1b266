use serde::{Deserialize, Serialize};

use crate::chain::DecodeMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityIssue {
    /// Loaded from a legacy format; the next save writes AES-CBC instead.
    FormatUpgradeOnSave,
    /// The root is not a JSON object, so there are no top-level keys.
    NonObjectRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Capabilities {
    pub preserves_format: bool,
    pub issues: Vec<CapabilityIssue>,
}

impl Capabilities {
    pub fn for_document(method: DecodeMethod, object_root: bool) -> Self {
        let mut issues = Vec::new();
        if method != crate::codec::SAVE_FORMAT {
            issues.push(CapabilityIssue::FormatUpgradeOnSave);
        }
        if !object_root {
            issues.push(CapabilityIssue::NonObjectRoot);
        }

        Self {
            preserves_format: !issues.contains(&CapabilityIssue::FormatUpgradeOnSave),
            issues,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub method: DecodeMethod,
    pub payload_len: usize,
    pub top_level_keys: Vec<String>,
    pub upgrades_on_save: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Copy an existing target to `<target>.backup_<timestamp>` first.
    pub backup: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { backup: true }
    }
}

/// How a key argument addresses the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPath {
    /// First match of a depth-first search for the key name.
    #[default]
    Search,
    /// RFC 6901 JSON pointer.
    Pointer,
}
