//! Nested product attributes.
//!
//! Options, modifiers, metafields, and channels live inside a product or
//! inventory record and are stored as JSON text in a column of their parent's
//! row. Each entry carries a client-generated [`AttributeId`]; none of them has
//! a lifecycle of its own.

use core::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Text stored for an empty attribute column.
///
/// Older rows hold an empty JSON object rather than an empty array, so this is
/// also what gets written back when a list is empty.
pub const EMPTY_PLACEHOLDER: &str = "{}";

/// Locally generated identifier of a nested attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(Uuid);

impl AttributeId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttributeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named option with an ordered list of values, e.g. "Size" → S, M, L.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    #[serde(default)]
    pub id: AttributeId,
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl ProductOption {
    /// Create an option with no values yet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AttributeId::new(),
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Append a value, builder style.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }
}

/// A name/value modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    #[serde(default)]
    pub id: AttributeId,
    pub name: String,
    pub value: String,
}

impl Modifier {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: AttributeId::new(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Arbitrary custom key/value attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metafield {
    #[serde(default)]
    pub id: AttributeId,
    pub key: String,
    pub value: String,
}

impl Metafield {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: AttributeId::new(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Availability of a product through a sales surface (POS, Online, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub id: AttributeId,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Channel {
    #[must_use]
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            id: AttributeId::new(),
            name: name.into(),
            enabled,
        }
    }
}

/// The JSON column an attribute list is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Options,
    Modifiers,
    Metafields,
    Channels,
}

impl AttributeKind {
    /// Column name in the `products` / `inventory` tables.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Options => "options",
            Self::Modifiers => "modifiers",
            Self::Metafields => "metafields",
            Self::Channels => "channels",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Errors decoding or encoding an attribute column.
#[derive(Debug, Clone, Error)]
pub enum AttributeError {
    /// The column text is not valid JSON for the attribute schema.
    #[error("invalid {kind} JSON: {message}")]
    Decode {
        kind: AttributeKind,
        message: String,
    },

    /// The column holds JSON, but not a list.
    #[error("{kind} must be a JSON array")]
    NotAList { kind: AttributeKind },

    /// The list could not be serialized.
    #[error("failed to encode {kind}: {message}")]
    Encode {
        kind: AttributeKind,
        message: String,
    },
}

/// Decode an attribute column into typed entries.
///
/// An absent column, empty text, `null`, and the empty-object placeholder all
/// decode to an empty list.
///
/// # Errors
///
/// Returns `AttributeError::NotAList` for JSON that is neither an array nor one
/// of the empty forms, and `AttributeError::Decode` when the text is not JSON
/// or an entry does not match the schema.
pub fn decode_attributes<T: DeserializeOwned>(
    kind: AttributeKind,
    raw: Option<&str>,
) -> Result<Vec<T>, AttributeError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };

    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| AttributeError::Decode {
            kind,
            message: e.to_string(),
        })?;

    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        serde_json::Value::Array(_) => {
            serde_json::from_value(value).map_err(|e| AttributeError::Decode {
                kind,
                message: e.to_string(),
            })
        }
        _ => Err(AttributeError::NotAList { kind }),
    }
}

/// Encode an attribute list as column text.
///
/// # Errors
///
/// Returns `AttributeError::Encode` if serialization fails.
pub fn encode_attributes<T: Serialize>(
    kind: AttributeKind,
    items: &[T],
) -> Result<String, AttributeError> {
    if items.is_empty() {
        return Ok(EMPTY_PLACEHOLDER.to_string());
    }
    serde_json::to_string(items).map_err(|e| AttributeError::Encode {
        kind,
        message: e.to_string(),
    })
}
