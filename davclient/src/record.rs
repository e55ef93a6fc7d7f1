// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Plain data types for decoded resources and the attributes sent to a server.
use std::{borrow::Cow, collections::BTreeMap, fmt};

use percent_encoding::percent_decode_str;
use serde::Serialize;

/// Fields of a resource, keyed by short property key.
pub type Attributes = BTreeMap<String, Value>;

/// The value of a single property or attribute.
///
/// Decoded properties are always either [`Value::Text`] or [`Value::Nested`]. The remaining
/// variants exist for attributes provided by callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// Child elements of a property whose content is markup rather than text.
    Nested(Vec<Element>),
}

impl Value {
    /// Returns this value as XML text content (not yet escaped).
    ///
    /// Returns `None` for nested values, which have no text representation.
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Text(text) => Some(Cow::Borrowed(text)),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            Value::Integer(i) => Some(Cow::Owned(i.to_string())),
            Value::Float(f) => Some(Cow::Owned(f.to_string())),
            Value::Nested(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nested(children) => {
                f.write_str("[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", child.name, child.value)?;
                }
                f.write_str("]")
            }
            other => f.write_str(&other.as_text().unwrap_or_default()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// A child element inside a nested property value.
///
/// `name` is translated the same way as top-level property keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub name: String,
    pub value: Value,
}

/// A single resource decoded from a `multistatus` response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    /// Path of the resource as reported by the server. This value is not URL-encoded.
    pub href: String,
    /// Either the `id` property returned by the server, or the last segment of `href`.
    pub id: String,
    /// Properties with a successful status. Properties that failed are not included.
    pub properties: Attributes,
}

/// Derives a resource identifier from an `href`.
///
/// Drops any query, then returns the last non-empty path segment. Returns `None` if there is
/// none.
///
/// ```
/// # use davclient::record::derive_id;
/// assert_eq!(derive_id("/remote.php/dav/files/user/docs/"), Some("docs"));
/// assert_eq!(derive_id("/remote.php/dav/files/user/report.pdf?download=1"), Some("report.pdf"));
/// assert_eq!(derive_id("/"), None);
/// ```
#[must_use]
pub fn derive_id(href: &str) -> Option<&str> {
    let path = match href.split_once('?') {
        Some((path, _query)) => path,
        None => href,
    };
    path.rsplit('/').find(|segment| !segment.is_empty())
}

/// Derives a resource identifier from a URL-encoded `href`, such as a `Content-Location` header.
///
/// The value is percent-decoded first, so the result matches the id of the same resource in a
/// `multistatus` response. Returns `None` if the decoded value is not UTF-8 or yields no id.
///
/// ```
/// # use davclient::record::derive_encoded_id;
/// assert_eq!(derive_encoded_id("/cal/new%20event.ics").as_deref(), Some("new event.ics"));
/// ```
#[must_use]
pub fn derive_encoded_id(href: &str) -> Option<String> {
    let decoded = percent_decode_str(href.trim()).decode_utf8().ok()?;
    derive_id(&decoded).map(str::to_string)
}
