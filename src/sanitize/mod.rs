//! Argument Sanitization
//!
//! Reduces an arbitrary [`Value`] to a [`Sanitized`] snapshot that owns all of
//! its data, never holds a function and can be serialized. Opaque host objects
//! are described by reflection, bounded by a depth limit because host object
//! graphs may be cyclic.

mod page;

use crate::value::{HostObject, PropertySlot, Value};
use serde::{Deserialize, Serialize};

/// Placeholder published in place of a function.
pub const FUNCTION_PLACEHOLDER: &str = "function()";

/// A sanitized snapshot of one value.
///
/// The serde form is tagged, so `Null` and the string `"null"` stay distinct.
/// Use [`Sanitized::to_page_json`] for the untagged shape pages consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Sanitized {
    Bool(bool),
    Number(f64),
    String(String),
    Null,
    Undefined,
    Function,
    Sequence(Vec<Sanitized>),
    Mapping(Vec<(String, Sanitized)>),
    Error(ErrorDescriptor),
    /// A described host object, tagged with its bare class name
    Opaque(OpaqueDescriptor),
    /// Only the `[object Class]` tag survived, in the bracketed form pages get
    /// from `Object.prototype.toString`
    Collapsed(String),
}

/// What is kept of an error: where it came from, not what it said.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescriptor {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub line_number: Option<u32>,
    pub column_number: Option<u32>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueDescriptor {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub properties: Vec<(String, Sanitized)>,
}

impl Sanitized {
    /// Look up a key of a mapping or an opaque descriptor.
    pub fn get(&self, key: &str) -> Option<&Sanitized> {
        let entries = match self {
            Sanitized::Mapping(entries) => entries,
            Sanitized::Opaque(descriptor) => &descriptor.properties,
            _ => return None,
        };
        entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Nesting depth of opaque descriptors, 0 when there are none.
    pub fn opaque_depth(&self) -> usize {
        match self {
            Sanitized::Sequence(items) => items.iter().map(Sanitized::opaque_depth).max().unwrap_or(0),
            Sanitized::Mapping(entries) => entries
                .iter()
                .map(|(_, v)| v.opaque_depth())
                .max()
                .unwrap_or(0),
            Sanitized::Opaque(descriptor) => {
                1 + descriptor
                    .properties
                    .iter()
                    .map(|(_, v)| v.opaque_depth())
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }
}

impl From<&str> for Sanitized {
    fn from(v: &str) -> Self {
        Sanitized::String(v.to_string())
    }
}

impl From<f64> for Sanitized {
    fn from(v: f64) -> Self {
        Sanitized::Number(v)
    }
}

impl From<i32> for Sanitized {
    fn from(v: i32) -> Self {
        Sanitized::Number(v.into())
    }
}

impl From<bool> for Sanitized {
    fn from(v: bool) -> Self {
        Sanitized::Bool(v)
    }
}

// ============================================================================
// Sanitizer
// ============================================================================

/// Sanitizes values with a fixed depth bound for opaque objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    bound: u32,
}

impl Sanitizer {
    pub fn new(bound: u32) -> Self {
        Self { bound }
    }

    pub fn bound(&self) -> u32 {
        self.bound
    }

    /// Sanitize a top-level value.
    pub fn sanitize(&self, value: &Value) -> Sanitized {
        self.sanitize_at(value, 0)
    }

    /// Sanitize a value found `depth` opaque objects below the top level.
    ///
    /// Only opaque objects increase the depth. Arrays, argument lists and
    /// plain objects are finite trees built by the caller and are walked at
    /// the depth they were found.
    pub fn sanitize_at(&self, value: &Value, depth: u32) -> Sanitized {
        match value {
            Value::Arguments(items) | Value::Array(items) => Sanitized::Sequence(
                items.iter().map(|item| self.sanitize_at(item, depth)).collect(),
            ),
            Value::Bool(b) => Sanitized::Bool(*b),
            Value::Number(n) => Sanitized::Number(*n),
            Value::String(s) => Sanitized::String(s.clone()),
            Value::Null => Sanitized::Null,
            Value::Undefined => Sanitized::Undefined,
            Value::Function(_) => Sanitized::Function,
            Value::Object(object) => Sanitized::Mapping(
                object
                    .iter()
                    .map(|(key, v)| (key.to_string(), self.sanitize_at(v, depth)))
                    .collect(),
            ),
            Value::Error(error) => Sanitized::Error(ErrorDescriptor {
                type_tag: value.class_name().to_string(),
                line_number: error.line_number,
                column_number: error.column_number,
                file_name: error.file_name.clone(),
            }),
            Value::Host(host) => self.describe(value, host, depth),
        }
    }

    fn describe(&self, value: &Value, host: &HostObject, depth: u32) -> Sanitized {
        if depth >= self.bound {
            return Sanitized::Collapsed(value.type_tag());
        }

        let mut properties = Vec::new();
        for key in host.enumerable_keys() {
            let Some(descriptor) = host.find_property(&key) else {
                continue;
            };
            // Non-configurable accessors may have side effects the page relies on.
            if !descriptor.configurable {
                continue;
            }
            let property = match descriptor.slot {
                PropertySlot::Data(data) => data,
                PropertySlot::Accessor { get: Some(get), .. } => match get() {
                    Ok(read) => read,
                    Err(_) => continue,
                },
                PropertySlot::Accessor { get: None, .. } => Value::Undefined,
            };
            if property.is_function() {
                continue;
            }
            properties.push((key, self.sanitize_at(&property, depth + 1)));
        }

        Sanitized::Opaque(OpaqueDescriptor {
            type_tag: host.class().to_string(),
            properties,
        })
    }
}

/// Sanitize `value` with the given depth bound.
pub fn sanitize(value: &Value, bound: u32) -> Sanitized {
    Sanitizer::new(bound).sanitize(value)
}
