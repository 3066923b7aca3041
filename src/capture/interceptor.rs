//! Member wrapping

use super::{CallRecord, CaptureSession, LocationStack, StackProvider};
use crate::error::CaptureError;
use crate::value::{CallResult, ErrorValue, Function, Object, PropertySlot, Value};
use std::panic::Location;
use std::rc::Rc;

/// Wraps target objects, recording their calls into one session.
#[derive(Clone)]
pub struct Interceptor {
    session: CaptureSession,
    stack: Rc<dyn StackProvider>,
}

impl Interceptor {
    /// An interceptor with a fresh session using `depth` as its initial
    /// sanitization bound.
    pub fn new(depth: u32) -> Self {
        Self::with_session(CaptureSession::new(depth))
    }

    pub fn with_session(session: CaptureSession) -> Self {
        Self {
            session,
            stack: Rc::new(LocationStack),
        }
    }

    /// Replace the source of call-site stack traces.
    pub fn with_stack_provider(mut self, provider: impl StackProvider + 'static) -> Self {
        self.stack = Rc::new(provider);
        self
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Wrap every own enumerable member of `target`.
    pub fn wrap(&self, target: &Value) -> Result<Wrapped, CaptureError> {
        let members = own_members(target)?;
        let names: Vec<&str> = members.keys().collect();
        self.wrap_members(&members, &names)
    }

    /// Wrap the named members of `target`. Every name must exist and refer to
    /// a function.
    pub fn intercept(&self, target: &Value, member_names: &[&str]) -> Result<Wrapped, CaptureError> {
        let members = own_members(target)?;
        self.wrap_members(&members, member_names)
    }

    fn wrap_members(&self, target: &Object, member_names: &[&str]) -> Result<Wrapped, CaptureError> {
        let mut members = Object::new();
        let mut originals = Object::new();

        for &name in member_names {
            let original = match target.get(name) {
                Some(Value::Function(f)) => f.clone(),
                Some(_) => return Err(CaptureError::NotCallable(name.to_string())),
                None => return Err(CaptureError::MissingMember(name.to_string())),
            };
            members.insert(name, self.wrap_member(name, original.clone()));
            originals.insert(name, forwarder(name, original));
        }

        tracing::debug!(members = member_names.len(), "target wrapped");
        Ok(Wrapped {
            members,
            originals,
            session: self.session.clone(),
        })
    }

    fn wrap_member(&self, name: &str, original: Function) -> Function {
        let callee = name.to_string();
        let session = self.session.clone();
        let stack = self.stack.clone();
        Function::with_invocation(name, move |invocation| {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let output = original.call_at(invocation.args, invocation.location)?;
            let trace = stack.stack(&callee, invocation.location);
            session.record(&callee, timestamp, invocation.args, trace.as_deref());
            Ok(output)
        })
    }
}

impl Default for Interceptor {
    fn default() -> Self {
        Self::with_session(CaptureSession::default())
    }
}

/// Forward to `original` without recording.
fn forwarder(name: &str, original: Function) -> Function {
    Function::with_invocation(name, move |invocation| {
        original.call_at(invocation.args, invocation.location)
    })
}

/// The own enumerable members of a plain or host object. Accessor members are
/// read through their getters.
fn own_members(target: &Value) -> Result<Object, CaptureError> {
    match target {
        Value::Object(object) => Ok(object.clone()),
        Value::Host(host) => {
            let mut members = Object::new();
            for name in host.own_property_names() {
                let Some(descriptor) = host.own_property(&name) else {
                    continue;
                };
                if !descriptor.enumerable {
                    continue;
                }
                let value = match descriptor.slot {
                    PropertySlot::Data(value) => value,
                    PropertySlot::Accessor { .. } => host
                        .get(&name)
                        .map_err(|_| CaptureError::NotCallable(name.clone()))?,
                };
                members.insert(name, value);
            }
            Ok(members)
        }
        other => Err(CaptureError::NotAnObject(other.type_tag())),
    }
}

// ============================================================================
// Wrapped target
// ============================================================================

/// A wrapped target: the recording members, the unwrapped originals and the
/// session they record into.
#[derive(Clone)]
pub struct Wrapped {
    members: Object,
    originals: Object,
    session: CaptureSession,
}

impl Wrapped {
    /// Call a wrapped member. The original's result and thrown value are
    /// passed through; only successful calls are recorded.
    #[track_caller]
    pub fn call(&self, member: &str, args: &[Value]) -> CallResult {
        let location = Location::caller();
        match self.member(member) {
            Some(function) => function.call_at(args, location),
            None => Err(Value::Error(ErrorValue::type_error(format!(
                "{member} is not a function"
            )))),
        }
    }

    /// The recording wrapper for `member`.
    pub fn member(&self, member: &str) -> Option<Function> {
        self.members.get(member).and_then(Value::as_function).cloned()
    }

    /// A function forwarding to the pre-wrap implementation of `member`.
    pub fn get_original(&self, member: &str) -> Option<Function> {
        self.originals.get(member).and_then(Value::as_function).cloned()
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys()
    }

    pub fn members(&self) -> &Object {
        &self.members
    }

    pub fn originals(&self) -> &Object {
        &self.originals
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn get_log(&self) -> Vec<CallRecord> {
        self.session.get_log()
    }

    pub fn clear_log(&self) {
        self.session.clear_log()
    }

    pub fn depth(&self) -> u32 {
        self.session.depth()
    }

    pub fn set_depth(&self, depth: impl Into<Value>) -> Result<(), CaptureError> {
        self.session.set_depth(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::NoStack;
    use crate::sanitize::Sanitized;
    use crate::value::{HostObject, PropertyDescriptor};
    use std::cell::RefCell;

    fn recording_target(calls: Rc<RefCell<Vec<String>>>) -> Object {
        let log_calls = calls.clone();
        let warn_calls = calls;
        Object::new()
            .with(
                "log",
                Function::new("log", move |args| {
                    log_calls.borrow_mut().push(format!("log {}", args.len()));
                    Ok(Value::Undefined)
                }),
            )
            .with(
                "warn",
                Function::new("warn", move |_| {
                    warn_calls.borrow_mut().push("warn".to_string());
                    Ok(Value::from("warned"))
                }),
            )
    }

    #[test]
    fn wrapped_call_forwards_and_records() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let wrapped = Interceptor::new(1)
            .wrap(&Value::Object(recording_target(calls.clone())))
            .unwrap();

        let before = chrono::Utc::now().timestamp_millis();
        wrapped.call("log", &["a".into(), 1.into()]).unwrap();
        let after = chrono::Utc::now().timestamp_millis();

        assert_eq!(*calls.borrow(), ["log 2"]);
        let log = wrapped.get_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].callee_name, "log");
        assert_eq!(log[0].arguments, vec![Sanitized::from("a"), Sanitized::from(1)]);
        assert!(before <= log[0].timestamp && log[0].timestamp <= after);
    }

    #[test]
    fn return_value_is_propagated() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let wrapped = Interceptor::new(1)
            .wrap(&Value::Object(recording_target(calls)))
            .unwrap();
        assert_eq!(wrapped.call("warn", &[]).unwrap(), Value::from("warned"));
    }

    #[test]
    fn original_bypasses_the_log() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let wrapped = Interceptor::new(1)
            .wrap(&Value::Object(recording_target(calls.clone())))
            .unwrap();

        wrapped.get_original("log").unwrap().call(&["a".into()]).unwrap();
        assert_eq!(*calls.borrow(), ["log 1"]);
        assert!(wrapped.get_log().is_empty());
    }

    #[test]
    fn thrown_original_is_propagated_and_not_recorded() {
        let target = Object::new().with(
            "error",
            Function::new("error", |_| Err(Value::from("thrown"))),
        );
        let wrapped = Interceptor::new(1).wrap(&Value::Object(target)).unwrap();
        assert_eq!(wrapped.call("error", &[]), Err(Value::from("thrown")));
        assert!(wrapped.get_log().is_empty());
    }

    #[test]
    fn non_callable_member_is_rejected() {
        let target = Object::new()
            .with("log", Function::new("log", |_| Ok(Value::Undefined)))
            .with("level", 3);
        let result = Interceptor::new(1).wrap(&Value::Object(target));
        assert!(matches!(result, Err(CaptureError::NotCallable(name)) if name == "level"));
    }

    #[test]
    fn intercept_selects_members() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let target = Value::Object(recording_target(calls));
        let wrapped = Interceptor::new(1).intercept(&target, &["warn"]).unwrap();
        assert_eq!(wrapped.member_names().collect::<Vec<_>>(), ["warn"]);
        assert!(wrapped.member("log").is_none());

        let missing = Interceptor::new(1).intercept(&target, &["table"]);
        assert!(matches!(missing, Err(CaptureError::MissingMember(_))));
    }

    #[test]
    fn host_targets_use_own_enumerable_members() {
        let console = HostObject::new("Console");
        console.define(PropertyDescriptor::data(
            "log",
            Function::new("log", |_| Ok(Value::Undefined)),
        ));
        console.define(
            PropertyDescriptor::data("hidden", Function::new("hidden", |_| Ok(Value::Undefined)))
                .non_enumerable(),
        );
        let wrapped = Interceptor::new(1).wrap(&Value::Host(console)).unwrap();
        assert_eq!(wrapped.member_names().collect::<Vec<_>>(), ["log"]);

        assert!(matches!(
            Interceptor::new(1).wrap(&Value::Null),
            Err(CaptureError::NotAnObject(_))
        ));
    }

    #[test]
    fn call_site_comes_from_stack_provider() {
        let target = Object::new().with("log", Function::new("log", |_| Ok(Value::Undefined)));
        let wrapped = Interceptor::new(1)
            .with_stack_provider(|callee: &str, _: &'static Location<'static>| {
                Some(format!("{callee}@capture.js:1:1\nfun@file:///page.html:10:21"))
            })
            .wrap(&Value::Object(target.clone()))
            .unwrap();
        wrapped.call("log", &[]).unwrap();
        let site = wrapped.get_log()[0].call_site.clone().unwrap();
        assert_eq!(site.caller_name, "fun");
        assert_eq!(site.line_number, 10);
        assert_eq!(site.column_number, 21);

        let silent = Interceptor::new(1)
            .with_stack_provider(NoStack)
            .wrap(&Value::Object(target))
            .unwrap();
        silent.call("log", &[]).unwrap();
        assert_eq!(silent.get_log()[0].call_site, None);
    }

    #[test]
    fn default_stack_reports_rust_caller() {
        let target = Object::new().with("log", Function::new("log", |_| Ok(Value::Undefined)));
        let wrapped = Interceptor::new(1).wrap(&Value::Object(target)).unwrap();
        let line = line!() + 1;
        wrapped.call("log", &[]).unwrap();
        let site = wrapped.get_log()[0].call_site.clone().unwrap();
        assert_eq!(site.line_number, line);
        assert!(site.file_name.ends_with("interceptor.rs"));
    }

    #[test]
    fn depth_change_applies_to_later_calls_only() {
        let host = HostObject::new("Window");
        host.define(PropertyDescriptor::data("name", "main"));
        let target = Object::new().with("log", Function::new("log", |_| Ok(Value::Undefined)));
        let wrapped = Interceptor::new(1).wrap(&Value::Object(target)).unwrap();

        wrapped.call("log", &[host.clone().into()]).unwrap();
        wrapped.set_depth(0).unwrap();
        wrapped.call("log", &[host.into()]).unwrap();

        let log = wrapped.get_log();
        assert!(matches!(log[0].arguments[0], Sanitized::Opaque(_)));
        assert_eq!(
            log[1].arguments[0],
            Sanitized::Collapsed("[object Window]".to_string())
        );
    }
}
