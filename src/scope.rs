//! Scopes and Installation
//!
//! A [`Scope`] is a table of global names. Installing a capture looks a
//! target up in one scope, wraps it and publishes the wrapper under the same
//! name into another scope, which is what page scripts call into.
//!
//! The published object looks like this to the page:
//!
//! ```text
//! console
//! ├── log, warn, ...      wrapped members, recording each call
//! ├── original
//! │   └── log, warn, ...  unwrapped forwarders
//! └── capture
//!     ├── get()           array of recorded calls
//!     ├── clear()         drop every record
//!     └── depth           read/write depth bound
//! ```

use crate::capture::{CallRecord, CaptureSession, Interceptor, Wrapped};
use crate::error::CaptureError;
use crate::value::{CallResult, ErrorValue, Function, HostObject, Object, PropertyDescriptor, Value};
use std::rc::Rc;

/// Class of published capture objects.
pub const PUBLISHED_CLASS: &str = "CapturedObject";

/// Member names reserved on the published object.
pub const RESERVED_MEMBERS: [&str; 2] = ["original", "capture"];

/// A table of global bindings.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: Object,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name, value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys()
    }

    /// The installation already published under `name`, if any.
    pub fn installation(&self, name: &str) -> Option<Installation> {
        let Some(Value::Host(published)) = self.get(name) else {
            return None;
        };
        if published.class() != PUBLISHED_CLASS {
            return None;
        }
        let session = published.internal::<CaptureSession>()?.clone();
        Some(Installation {
            name: name.to_string(),
            published: published.clone(),
            session,
        })
    }
}

// ============================================================================
// Installation
// ============================================================================

/// Host-side handle on a published capture.
#[derive(Clone)]
pub struct Installation {
    name: String,
    published: HostObject,
    session: CaptureSession,
}

impl Installation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn published(&self) -> &HostObject {
        &self.published
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Typed records, oldest first.
    pub fn records(&self) -> Vec<CallRecord> {
        self.session.get_log()
    }

    /// What the page sees from `capture.get()`.
    pub fn get_capture(&self) -> CallResult {
        self.capture_api()?.call_method("get", &[])
    }

    /// Run the page's `capture.clear()`.
    pub fn clear_capture(&self) -> Result<(), Value> {
        self.capture_api()?.call_method("clear", &[]).map(|_| ())
    }

    /// Assign `capture.depth` the way a page would.
    pub fn set_depth(&self, depth: impl Into<Value>) -> Result<(), Value> {
        match self.capture_api()? {
            Value::Host(api) => api.set("depth", depth.into()),
            _ => Err(Value::Error(ErrorValue::type_error("capture is not an object"))),
        }
    }

    fn capture_api(&self) -> CallResult {
        self.published.get("capture")
    }
}

/// Capture `target_name` from `global` into `page` with a default interceptor.
pub fn capture(global: &Scope, page: &mut Scope, target_name: &str) -> Result<Installation, CaptureError> {
    install(global, page, target_name, &Interceptor::default(), None)
}

/// Wrap `target_name` from `global` and publish it into `page`.
///
/// When `members` is `None` every own enumerable member is wrapped. If `page`
/// already holds a capture under that name it is returned unchanged.
pub fn install(
    global: &Scope,
    page: &mut Scope,
    target_name: &str,
    interceptor: &Interceptor,
    members: Option<&[&str]>,
) -> Result<Installation, CaptureError> {
    if let Some(existing) = page.installation(target_name) {
        tracing::warn!(target_name, "capture already installed");
        return Ok(existing);
    }

    let target = global
        .get(target_name)
        .ok_or_else(|| CaptureError::MissingTarget(target_name.to_string()))?;
    if !matches!(target, Value::Object(_) | Value::Host(_)) {
        return Err(CaptureError::NotAnObject(target_name.to_string()));
    }

    let wrapped = match members {
        Some(names) => interceptor.intercept(target, names)?,
        None => interceptor.wrap(target)?,
    };
    let published = publish(&wrapped);
    page.set(target_name, published.clone());

    tracing::debug!(
        target_name,
        members = wrapped.members().len(),
        depth = wrapped.depth(),
        "capture installed"
    );
    Ok(Installation {
        name: target_name.to_string(),
        published,
        session: wrapped.session().clone(),
    })
}

fn publish(wrapped: &Wrapped) -> HostObject {
    let session = wrapped.session().clone();
    let published = HostObject::with_internal(PUBLISHED_CLASS, Rc::new(session.clone()));

    for (name, member) in wrapped.members().iter() {
        if RESERVED_MEMBERS.contains(&name) {
            tracing::warn!(member = name, "member shadowed by the capture API");
        }
        published.define(PropertyDescriptor::data(name, member.clone()));
    }
    published.define(PropertyDescriptor::data("original", wrapped.originals().clone()));
    published.define(PropertyDescriptor::data("capture", capture_api(&session)));
    published
}

fn capture_api(session: &CaptureSession) -> HostObject {
    let api = HostObject::new("Object");

    let log = session.clone();
    api.define(PropertyDescriptor::data(
        "get",
        Function::new("get", move |_| {
            let records = log.get_log();
            Ok(Value::Array(records.iter().map(CallRecord::to_page_value).collect()))
        }),
    ));

    let log = session.clone();
    api.define(PropertyDescriptor::data(
        "clear",
        Function::new("clear", move |_| {
            log.clear_log();
            Ok(Value::Undefined)
        }),
    ));

    let read = session.clone();
    let write = session.clone();
    api.define(PropertyDescriptor::accessor(
        "depth",
        Some(Rc::new(move || -> CallResult { Ok(Value::from(read.depth())) })),
        Some(Rc::new(move |depth: &Value| -> Result<(), Value> {
            write.set_depth(depth.clone()).map_err(|e| e.to_thrown())
        })),
    ));

    api
}
