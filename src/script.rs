//! Call scripts
//!
//! A call script is a JSON array of console calls to replay against a
//! captured console:
//!
//! ```json
//! [
//!   { "member": "log", "args": ["OK", 1, null] },
//!   { "member": "warn", "args": [{ "$undefined": true }],
//!     "caller": "fun", "file": "file:///test/test_script.js", "line": 2, "column": 25 }
//! ]
//! ```
//!
//! Plain JSON maps onto [`Value`] directly. A few single-key objects stand for
//! values JSON cannot express:
//!
//! | marker                                  | value                 |
//! |-----------------------------------------|-----------------------|
//! | `{"$undefined": true}`                  | `undefined`           |
//! | `{"$function": "name"}`                 | a no-op function      |
//! | `{"$arguments": [...]}`                 | an argument list      |
//! | `{"$error": {"name", "message", ...}}`  | an error              |
//! | `{"$host": {"class", "properties"}}`    | an opaque host object |

use crate::capture::{CallRecord, Interceptor};
use crate::config::CaptureConfig;
use crate::console::{console_object, Console};
use crate::error::CaptureError;
use crate::scope::{Installation, Scope};
use crate::value::{ErrorValue, Function, HostObject, PropertyDescriptor, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::cell::RefCell;
use std::panic::Location;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptCall {
    pub member: String,
    #[serde(default)]
    pub args: Vec<Json>,
    #[serde(default)]
    pub caller: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
}

impl ScriptCall {
    /// The caller's stack frame, when the script gives a full location.
    pub fn frame(&self) -> Option<String> {
        let (file, line, column) = (self.file.as_ref()?, self.line?, self.column?);
        Some(format!(
            "{}@{file}:{line}:{column}",
            self.caller.as_deref().unwrap_or_default()
        ))
    }

    pub fn arguments(&self) -> Vec<Value> {
        self.args.iter().map(value_from_json).collect()
    }
}

pub fn parse_script(json: &str) -> Result<Vec<ScriptCall>, CaptureError> {
    Ok(serde_json::from_str(json)?)
}

/// Convert script JSON into a value, honouring the `$` markers.
pub fn value_from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(value_from_json).collect()),
        Json::Object(map) => {
            if map.len() == 1 {
                if let Some((key, inner)) = map.iter().next() {
                    if let Some(value) = marker_value(key, inner) {
                        return value;
                    }
                }
            }
            Value::Object(map.iter().map(|(k, v)| (k.as_str(), value_from_json(v))).collect())
        }
    }
}

fn marker_value(key: &str, inner: &Json) -> Option<Value> {
    match key {
        "$undefined" => Some(Value::Undefined),
        "$function" => {
            let name = inner.as_str().unwrap_or_default();
            Some(Value::Function(Function::new(name, |_| Ok(Value::Undefined))))
        }
        "$arguments" => {
            let items = inner.as_array()?;
            Some(Value::Arguments(items.iter().map(value_from_json).collect()))
        }
        "$error" => {
            let name = inner.get("name").and_then(Json::as_str).unwrap_or("Error");
            let message = inner.get("message").and_then(Json::as_str).unwrap_or_default();
            let mut error = ErrorValue::new(name, message);
            error.file_name = inner.get("fileName").and_then(Json::as_str).map(str::to_string);
            error.line_number = inner.get("lineNumber").and_then(json_u32);
            error.column_number = inner.get("columnNumber").and_then(json_u32);
            Some(Value::Error(error))
        }
        "$host" => {
            let class = inner.get("class").and_then(Json::as_str).unwrap_or("Object");
            let host = HostObject::new(class);
            if let Some(properties) = inner.get("properties").and_then(Json::as_object) {
                for (name, value) in properties {
                    host.define(PropertyDescriptor::data(name.as_str(), value_from_json(value)));
                }
            }
            Some(Value::Host(host))
        }
        _ => None,
    }
}

fn json_u32(json: &Json) -> Option<u32> {
    json.as_u64().and_then(|n| u32::try_from(n).ok())
}

/// Replay `calls` against a captured `console` and return the installation
/// holding the records.
///
/// Calls that throw are logged and skipped.
pub fn replay<C: Console + 'static>(
    config: &CaptureConfig,
    console: Rc<C>,
    calls: &[ScriptCall],
) -> Result<Installation, CaptureError> {
    let global = Scope::new().with(config.target.as_str(), console_object(console));
    let mut page = Scope::new();

    let frame: Rc<RefCell<Option<String>>> = Rc::default();
    let current = frame.clone();
    let interceptor = config.interceptor().with_stack_provider(
        move |callee: &str, _: &'static Location<'static>| -> Option<String> {
            let frame = current.borrow();
            frame.as_ref().map(|frame| format!("{callee}@console-capture\n{frame}"))
        },
    );
    let installation = replay_into(config, &interceptor, &global, &mut page, calls, &frame)?;
    tracing::info!(
        calls = calls.len(),
        records = installation.session().len(),
        "script replayed"
    );
    Ok(installation)
}

fn replay_into(
    config: &CaptureConfig,
    interceptor: &Interceptor,
    global: &Scope,
    page: &mut Scope,
    calls: &[ScriptCall],
    frame: &RefCell<Option<String>>,
) -> Result<Installation, CaptureError> {
    let installation = config.install_with(interceptor, global, page)?;
    let target = Value::Host(installation.published().clone());

    for call in calls {
        *frame.borrow_mut() = call.frame();
        if let Err(thrown) = target.call_method(&call.member, &call.arguments()) {
            tracing::warn!(member = %call.member, %thrown, "scripted call threw");
        }
    }
    Ok(installation)
}

/// Render records as page JSON, or in the tagged form when `tagged` is set.
pub fn render(records: &[CallRecord], tagged: bool) -> Result<Json, CaptureError> {
    if tagged {
        Ok(serde_json::to_value(records)?)
    } else {
        Ok(Json::Array(records.iter().map(CallRecord::to_page_json).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::Sanitized;
    use serde_json::json;

    #[test]
    fn markers_build_special_values() {
        assert_eq!(value_from_json(&json!({"$undefined": true})), Value::Undefined);
        assert!(value_from_json(&json!({"$function": "f"})).is_function());
        assert!(matches!(
            value_from_json(&json!({"$arguments": [1]})),
            Value::Arguments(items) if items.len() == 1
        ));

        let Value::Error(error) =
            value_from_json(&json!({"$error": {"name": "TypeError", "lineNumber": 4}}))
        else {
            panic!("expected an error");
        };
        assert_eq!(error.name, "TypeError");
        assert_eq!(error.line_number, Some(4));

        let host = value_from_json(&json!({"$host": {"class": "Window", "properties": {"a": 1}}}));
        assert_eq!(host.class_name(), "Window");
        assert_eq!(host.get("a").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn ordinary_objects_are_not_markers() {
        let value = value_from_json(&json!({"$undefined": true, "other": 1}));
        assert!(matches!(value, Value::Object(object) if object.len() == 2));
    }

    #[test]
    fn frame_requires_full_location() {
        let calls = parse_script(
            r#"[{"member": "log", "caller": "fun", "file": "a.js", "line": 2, "column": 25},
                {"member": "log", "file": "a.js", "line": 2}]"#,
        )
        .unwrap();
        assert_eq!(calls[0].frame().as_deref(), Some("fun@a.js:2:25"));
        assert_eq!(calls[1].frame(), None);
    }

    struct Silent;

    impl Console for Silent {
        fn log(&self, _args: &[Value]) {}
    }

    #[test]
    fn replay_records_every_successful_call() {
        let calls = parse_script(
            r#"[{"member": "log", "args": ["OK", 1.5, null]},
                {"member": "warn", "args": [], "caller": "", "file": "page.html", "line": 9, "column": 82},
                {"member": "table", "args": []}]"#,
        )
        .unwrap();
        let installation = replay(&CaptureConfig::default(), Rc::new(Silent), &calls).unwrap();

        let records = installation.records();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].arguments,
            vec![Sanitized::from("OK"), Sanitized::from(1.5), Sanitized::Null]
        );
        assert_eq!(records[0].call_site, None);
        let site = records[1].call_site.as_ref().unwrap();
        assert_eq!((site.caller_name.as_str(), site.line_number), ("", 9));

        let page = render(&records, false).unwrap();
        assert_eq!(page[0]["arguments"], json!(["OK", 1.5, "null"]));
        let tagged = render(&records, true).unwrap();
        assert_eq!(tagged[0]["arguments"][2], json!({"kind": "null"}));
    }
}
