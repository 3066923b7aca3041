//! Call Capture
//!
//! Wraps every member of a target object so that each call is forwarded to
//! the original and then appended to a [`CaptureSession`] log as a
//! [`CallRecord`].
//!
//! # Example
//!
//! ```
//! use console_capture::{Function, Interceptor, Object, Value};
//!
//! let console = Object::new()
//!     .with("log", Function::new("log", |_| Ok(Value::Undefined)))
//!     .with("warn", Function::new("warn", |_| Ok(Value::Undefined)));
//!
//! let wrapped = Interceptor::new(1).wrap(&Value::Object(console)).unwrap();
//! wrapped.call("log", &["a".into(), 1.into()]).unwrap();
//!
//! let log = wrapped.get_log();
//! assert_eq!(log.len(), 1);
//! assert_eq!(log[0].callee_name, "log");
//! ```

mod callsite;
mod interceptor;
mod session;

pub use callsite::{CallSite, LocationStack, NoStack, StackProvider};
pub use interceptor::{Interceptor, Wrapped};
pub use session::CaptureSession;

use crate::sanitize::Sanitized;
use crate::value::{Object, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// One intercepted call. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(rename = "callee")]
    pub callee_name: String,
    /// Milliseconds since the Unix epoch when the call was made
    #[serde(rename = "time")]
    pub timestamp: i64,
    pub arguments: Vec<Sanitized>,
    #[serde(flatten)]
    pub call_site: Option<CallSite>,
}

impl CallRecord {
    /// Render the record the way a page reads it back from `capture.get()`.
    /// Call-site keys are absent when no call site was parsed.
    pub fn to_page_json(&self) -> Json {
        let mut map = Map::new();
        map.insert("callee".to_string(), Json::String(self.callee_name.clone()));
        map.insert("time".to_string(), self.timestamp.into());
        map.insert(
            "arguments".to_string(),
            Json::Array(self.arguments.iter().map(Sanitized::to_page_json).collect()),
        );
        if let Some(site) = &self.call_site {
            map.insert("caller".to_string(), Json::String(site.caller_name.clone()));
            map.insert("fileName".to_string(), Json::String(site.file_name.clone()));
            map.insert("lineNumber".to_string(), site.line_number.into());
            map.insert("columnNumber".to_string(), site.column_number.into());
        }
        Json::Object(map)
    }

    /// Clone the record into a page-side object.
    pub fn to_page_value(&self) -> Value {
        let mut object = Object::new()
            .with("callee", self.callee_name.as_str())
            .with("time", self.timestamp)
            .with(
                "arguments",
                Value::Array(self.arguments.iter().map(Sanitized::to_page_value).collect()),
            );
        if let Some(site) = &self.call_site {
            object.insert("caller", site.caller_name.as_str());
            object.insert("fileName", site.file_name.as_str());
            object.insert("lineNumber", site.line_number);
            object.insert("columnNumber", site.column_number);
        }
        Value::Object(object)
    }
}
