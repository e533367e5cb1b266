use serde_json::Value;

use crate::error::{CodecError, MethodError};

/// A decoded save: any well-formed JSON value, keys kept in file order.
///
/// Game-level meaning of fields is left to callers; the lookups below are
/// shape-agnostic walks over the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDocument {
    root: Value,
}

impl SaveDocument {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Parses UTF-8 JSON text. Invalid UTF-8 and malformed JSON are reported
    /// separately so chain diagnostics can tell them apart.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MethodError> {
        let text = std::str::from_utf8(bytes)?;
        let root = serde_json::from_str(text)?;
        Ok(Self { root })
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Compact serialization with no inserted whitespace.
    pub fn to_compact_vec(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(&self.root).map_err(CodecError::Encoding)
    }

    pub fn to_compact_string(&self) -> Result<String, CodecError> {
        serde_json::to_string(&self.root).map_err(CodecError::Encoding)
    }

    pub fn to_pretty_string(&self) -> Result<String, CodecError> {
        serde_json::to_string_pretty(&self.root).map_err(CodecError::Encoding)
    }

    pub fn top_level_keys(&self) -> Vec<String> {
        match &self.root {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// First value stored under `key` anywhere in the tree.
    ///
    /// An object's own keys are checked before its children; children and
    /// array items are visited in order.
    pub fn find_key(&self, key: &str) -> Option<&Value> {
        find_in(&self.root, key)
    }

    pub fn find_key_mut(&mut self, key: &str) -> Option<&mut Value> {
        find_in_mut(&mut self.root, key)
    }

    /// Replaces the value [`find_key`](Self::find_key) would return.
    /// Returns `false` and leaves the tree untouched when the key is absent.
    pub fn set_key(&mut self, key: &str, value: Value) -> bool {
        match self.find_key_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// RFC 6901 lookup, e.g. `/vault/storage/resources/Nuka`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    pub fn pointer_mut(&mut self, pointer: &str) -> Option<&mut Value> {
        self.root.pointer_mut(pointer)
    }
}

impl From<Value> for SaveDocument {
    fn from(root: Value) -> Self {
        Self::from_value(root)
    }
}

fn find_in<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|child| find_in(child, key))),
        Value::Array(items) => items.iter().find_map(|item| find_in(item, key)),
        _ => None,
    }
}

fn find_in_mut<'a>(value: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => {
            if map.contains_key(key) {
                return map.get_mut(key);
            }
            map.values_mut().find_map(|child| find_in_mut(child, key))
        }
        Value::Array(items) => items.iter_mut().find_map(|item| find_in_mut(item, key)),
        _ => None,
    }
}
