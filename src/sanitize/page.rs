//! Page rendering
//!
//! The untagged shape a page sees when it reads the capture back: `null` and
//! `undefined` become the strings `"null"` and `"undefined"`, functions become
//! `"function()"`, and descriptors become plain objects with a `type` key.

use super::{OpaqueDescriptor, Sanitized, FUNCTION_PLACEHOLDER};
use crate::value::{Object, Value};
use serde_json::{Map, Number, Value as Json};

/// Key holding the class of an error or opaque descriptor.
const TYPE_KEY: &str = "type";

impl Sanitized {
    /// Render as the JSON a page script would observe.
    pub fn to_page_json(&self) -> Json {
        match self {
            Sanitized::Bool(b) => Json::Bool(*b),
            Sanitized::Number(n) => number_json(*n),
            Sanitized::String(s) => Json::String(s.clone()),
            Sanitized::Null => Json::String("null".to_string()),
            Sanitized::Undefined => Json::String("undefined".to_string()),
            Sanitized::Function => Json::String(FUNCTION_PLACEHOLDER.to_string()),
            Sanitized::Sequence(items) => Json::Array(items.iter().map(Self::to_page_json).collect()),
            Sanitized::Mapping(entries) => {
                Json::Object(entries.iter().map(|(k, v)| (k.clone(), v.to_page_json())).collect())
            }
            Sanitized::Error(descriptor) => {
                let mut map = Map::new();
                map.insert(TYPE_KEY.to_string(), Json::String(descriptor.type_tag.clone()));
                if let Some(line) = descriptor.line_number {
                    map.insert("lineNumber".to_string(), line.into());
                }
                if let Some(column) = descriptor.column_number {
                    map.insert("columnNumber".to_string(), column.into());
                }
                if let Some(file) = &descriptor.file_name {
                    map.insert("fileName".to_string(), Json::String(file.clone()));
                }
                Json::Object(map)
            }
            Sanitized::Opaque(descriptor) => {
                let mut map = Map::new();
                map.insert(TYPE_KEY.to_string(), Json::String(descriptor.type_tag.clone()));
                for (key, value) in page_properties(descriptor) {
                    map.insert(key.to_string(), value.to_page_json());
                }
                Json::Object(map)
            }
            Sanitized::Collapsed(tag) => Json::String(tag.clone()),
        }
    }

    /// Clone into a page-side [`Value`] with the same shape as
    /// [`Sanitized::to_page_json`].
    pub fn to_page_value(&self) -> Value {
        match self {
            Sanitized::Bool(b) => Value::Bool(*b),
            Sanitized::Number(n) => Value::Number(*n),
            Sanitized::String(s) => Value::String(s.clone()),
            Sanitized::Null => Value::from("null"),
            Sanitized::Undefined => Value::from("undefined"),
            Sanitized::Function => Value::from(FUNCTION_PLACEHOLDER),
            Sanitized::Sequence(items) => Value::Array(items.iter().map(Self::to_page_value).collect()),
            Sanitized::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.to_page_value()))
                    .collect(),
            ),
            Sanitized::Error(descriptor) => {
                let mut object = Object::new().with(TYPE_KEY, descriptor.type_tag.as_str());
                if let Some(line) = descriptor.line_number {
                    object.insert("lineNumber", line);
                }
                if let Some(column) = descriptor.column_number {
                    object.insert("columnNumber", column);
                }
                if let Some(file) = &descriptor.file_name {
                    object.insert("fileName", file.as_str());
                }
                Value::Object(object)
            }
            Sanitized::Opaque(descriptor) => {
                let mut object = Object::new().with(TYPE_KEY, descriptor.type_tag.as_str());
                for (key, value) in page_properties(descriptor) {
                    object.insert(key, value.to_page_value());
                }
                Value::Object(object)
            }
            Sanitized::Collapsed(tag) => Value::String(tag.clone()),
        }
    }
}

/// Properties of an opaque descriptor as a page sees them. The `type` key
/// belongs to the class tag, so a property of that name is left out.
fn page_properties(descriptor: &OpaqueDescriptor) -> impl Iterator<Item = (&str, &Sanitized)> {
    let class = descriptor.type_tag.as_str();
    descriptor.properties.iter().filter_map(move |(key, value)| {
        if key == TYPE_KEY {
            tracing::warn!(class, "property \"type\" hidden by the class tag in page output");
            return None;
        }
        Some((key.as_str(), value))
    })
}

/// Integral numbers render as JSON integers, the way a page serializes them.
/// Non-finite numbers have no JSON form and render as `null`.
pub(crate) fn number_json(n: f64) -> Json {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Json::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(Json::Null, Json::Number)
    }
}
