//! Partition key values
//!
//! Only the scalar types DynamoDB allows in a key are modelled. Values are
//! kept in their wire text form so that two requests carrying the same key
//! produce the same canonical bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{TypesError, TypesResult};

/// A key attribute value, tagged the way the wire protocol tags it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    S(String),
    /// Number, in its decimal text form
    N(String),
    /// Binary, base64 text as sent on the wire
    B(String),
}

impl AttributeValue {
    /// Parse a `{"S": "..."}` style JSON value.
    ///
    /// Returns `Ok(None)` for well-formed non-key types (maps, lists, booleans),
    /// which can appear in items but never in a key.
    pub fn from_json(value: &serde_json::Value) -> TypesResult<Option<Self>> {
        let obj = value
            .as_object()
            .ok_or_else(|| TypesError::InvalidAttributeValue(value.to_string()))?;
        let (tag, inner) = match obj.iter().next() {
            Some(entry) if obj.len() == 1 => entry,
            _ => return Err(TypesError::InvalidAttributeValue(value.to_string())),
        };
        let text = || {
            inner
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| TypesError::InvalidAttributeValue(value.to_string()))
        };
        match tag.as_str() {
            "S" => Ok(Some(AttributeValue::S(text()?))),
            "N" => Ok(Some(AttributeValue::N(text()?))),
            "B" => Ok(Some(AttributeValue::B(text()?))),
            _ => Ok(None),
        }
    }

    fn tag(&self) -> u8 {
        match self {
            AttributeValue::S(_) => b'S',
            AttributeValue::N(_) => b'N',
            AttributeValue::B(_) => b'B',
        }
    }

    fn text(&self) -> &str {
        match self {
            AttributeValue::S(v) | AttributeValue::N(v) | AttributeValue::B(v) => v,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_string())
    }
}

/// Key attribute name → value. Ordered by name so iteration is canonical.
pub type KeyValues = BTreeMap<String, AttributeValue>;

/// Role of an attribute in a table's key schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyType {
    /// Partition key
    Hash,
    /// Sort key
    Range,
}

/// One element of a table's key schema, as given at table creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyType,
}

impl KeySchemaElement {
    pub fn hash(name: impl Into<String>) -> Self {
        Self { attribute_name: name.into(), key_type: KeyType::Hash }
    }

    pub fn range(name: impl Into<String>) -> Self {
        Self { attribute_name: name.into(), key_type: KeyType::Range }
    }
}

/// Canonical byte form of `(table, key values)`.
///
/// Every field is length-prefixed so distinct inputs can never collide on
/// concatenation. Attribute order is the `BTreeMap` order, so the caller's
/// ordering does not matter.
pub fn canonical_key(table: &str, keys: &KeyValues) -> Vec<u8> {
    fn put(buf: &mut Vec<u8>, bytes: &[u8]) {
        buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytes);
    }

    let mut buf = Vec::with_capacity(64);
    put(&mut buf, table.as_bytes());
    for (name, value) in keys {
        put(&mut buf, name.as_bytes());
        buf.push(value.tag());
        put(&mut buf, value.text().as_bytes());
    }
    buf
}

/// Pick `names` out of `attrs`; None if any is missing
pub fn project(attrs: &KeyValues, names: &[String]) -> Option<KeyValues> {
    names
        .iter()
        .map(|name| attrs.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}
