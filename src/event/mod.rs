//! Event decoding without a fixed schema.
//!
//! Payloads are parsed into an order-preserving [`serde_json::Value`] tree
//! and inspected through [`Node`], which looks fields up case-insensitively
//! and ignores anything it is not asked for. Where a shape is fixed, the
//! tree can also be bound to a typed envelope with
//! [`DecodedEvent::decode_envelope`], again tolerant of unknown fields and
//! key casing.
//!
//! Case folding is ASCII-only on both paths, so `Records`, `records` and
//! `RECORDS` all name the same field.

pub mod s3;
pub mod sns;

pub use self::s3::{s3_records, S3ObjectEvent};
pub use self::sns::{SnsEvent, SnsMessage, SnsRecord};

use crate::errors::RuntimeError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Parses raw invocation payloads. Stateless; built once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventDecoder;

impl EventDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw payload.
    pub fn decode(&self, body: &[u8]) -> crate::Result<DecodedEvent> {
        let root: Value = serde_json::from_slice(body)
            .map_err(|e| RuntimeError::Decode(format!("payload is not valid JSON: {}", e)))?;
        Ok(DecodedEvent { root })
    }

    /// Parse JSON text, such as a message embedded in another event.
    pub fn decode_str(&self, text: &str) -> crate::Result<DecodedEvent> {
        self.decode(text.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Decoded event
// ---------------------------------------------------------------------------

/// A parsed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    root: Value,
}

impl DecodedEvent {
    /// Wrap an already-parsed value.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// The top of the tree.
    pub fn root(&self) -> Node<'_> {
        Node { value: &self.root }
    }

    /// Shortcut for `self.root().get(name)`.
    pub fn get(&self, name: &str) -> Option<Node<'_>> {
        self.root().get(name)
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Bind the tree to a typed envelope.
    ///
    /// Every object key is ASCII-lowercased first, so the envelope's fields
    /// must be declared with lowercase names. When two keys differ only by
    /// case, the first one wins. Unknown fields are ignored as long as the
    /// envelope does not deny them.
    pub fn decode_envelope<T: DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_value(lowercase_keys(&self.root))
            .map_err(|e| RuntimeError::Decode(e.to_string()))
    }
}

fn lowercase_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut lowered = Map::with_capacity(map.len());
            for (key, child) in map {
                let key = key.to_ascii_lowercase();
                if !lowered.contains_key(&key) {
                    lowered.insert(key, lowercase_keys(child));
                }
            }
            Value::Object(lowered)
        }
        Value::Array(items) => Value::Array(items.iter().map(lowercase_keys).collect()),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tree navigation
// ---------------------------------------------------------------------------

/// A borrowed position in a decoded tree.
///
/// Lookups through a missing branch yield `None` rather than failing; the
/// `require_*` helpers turn absence into a [`RuntimeError::Decode`] naming
/// the dotted path that was asked for.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    value: &'a Value,
}

impl<'a> Node<'a> {
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Look up an object field. Exact spellings win over case variants.
    pub fn get(&self, name: &str) -> Option<Node<'a>> {
        let map = self.value.as_object()?;
        map.get(name)
            .or_else(|| {
                map.iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, found)| found)
            })
            .map(|value| Node { value })
    }

    /// Follow a path of field names. Any missing step yields `None`.
    pub fn path(&self, path: &[&str]) -> Option<Node<'a>> {
        path.iter().try_fold(*self, |node, name| node.get(name))
    }

    /// Array elements in order; empty for anything that is not an array.
    pub fn items(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.value
            .as_array()
            .into_iter()
            .flatten()
            .map(|value| Node { value })
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.value.as_str()
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.value.as_u64()
    }

    /// Follow a path that must exist and must not be `null`.
    pub fn require(&self, path: &[&str]) -> crate::Result<Node<'a>> {
        self.path(path)
            .filter(|node| !node.is_null())
            .ok_or_else(|| RuntimeError::missing_field(&path.join(".")))
    }

    /// Follow a path to a required string.
    pub fn require_str(&self, path: &[&str]) -> crate::Result<&'a str> {
        self.require(path)?.as_str().ok_or_else(|| {
            RuntimeError::Decode(format!("field `{}` must be a string", path.join(".")))
        })
    }

    /// Follow a path to a required non-negative integer.
    pub fn require_u64(&self, path: &[&str]) -> crate::Result<u64> {
        self.require(path)?.as_u64().ok_or_else(|| {
            RuntimeError::Decode(format!(
                "field `{}` must be a non-negative integer",
                path.join(".")
            ))
        })
    }
}
