//! Host values
//!
//! The dynamic values a page script can hand to a console method. This is the
//! input side of capture: anything representable here can be passed to a
//! wrapped member and must be reduced to a [`Sanitized`](crate::Sanitized)
//! snapshot before it is stored.

mod host;

pub use host::{Getter, HostObject, PropertyDescriptor, PropertySlot, Setter};

use std::fmt;
use std::panic::Location;
use std::rc::Rc;

/// Outcome of calling a function: the returned value or the thrown one.
pub type CallResult = Result<Value, Value>;

// ============================================================================
// Functions
// ============================================================================

/// Arguments and call location handed to a function body.
pub struct Invocation<'a> {
    pub args: &'a [Value],
    pub location: &'static Location<'static>,
}

type Body = dyn Fn(&Invocation<'_>) -> CallResult;

/// A callable value.
///
/// Cloning is cheap and clones share the same body, so a function keeps its
/// identity when it is copied into another scope.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    body: Rc<Body>,
}

impl Function {
    /// Create a function from a body that only needs its arguments.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + 'static,
    {
        Self::with_invocation(name, move |invocation| body(invocation.args))
    }

    /// Create a function whose body also sees where it was called from.
    pub fn with_invocation<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> CallResult + 'static,
    {
        let name: String = name.into();
        Self {
            name: Rc::from(name),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the function, recording the caller's location.
    #[track_caller]
    pub fn call(&self, args: &[Value]) -> CallResult {
        self.call_at(args, Location::caller())
    }

    /// Call the function on behalf of a caller at `location`.
    pub fn call_at(&self, args: &[Value], location: &'static Location<'static>) -> CallResult {
        (self.body)(&Invocation { args, location })
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// ============================================================================
// Plain objects and errors
// ============================================================================

/// A plain key/value object. Keys keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Object::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace `key`. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

/// An error value together with the location it was raised at.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    /// Constructor name, e.g. `TypeError`
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
    pub file_name: Option<String>,
    pub line_number: Option<u32>,
    pub column_number: Option<u32>,
}

impl ErrorValue {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            file_name: None,
            line_number: None,
            column_number: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new("RangeError", message)
    }

    /// Attach the position the error was raised at.
    pub fn at(mut self, file_name: impl Into<String>, line: u32, column: u32) -> Self {
        self.file_name = Some(file_name.into());
        self.line_number = Some(line);
        self.column_number = Some(column);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

// ============================================================================
// Value
// ============================================================================

/// Any value a caller can pass to a captured member.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// The argument list of a call, distinct from an array built by the caller
    Arguments(Vec<Value>),
    Object(Object),
    Error(ErrorValue),
    Function(Function),
    /// Anything else the host provides: DOM nodes, windows, events...
    Host(HostObject),
}

impl Value {
    /// The class part of the `[object Class]` tag.
    pub fn class_name(&self) -> &str {
        match self {
            Value::Undefined => "Undefined",
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Arguments(_) => "Arguments",
            Value::Object(_) => "Object",
            Value::Error(_) => "Error",
            Value::Function(_) => "Function",
            Value::Host(host) => host.class(),
        }
    }

    /// The `[object Class]` tag used for values that cannot be described.
    pub fn type_tag(&self) -> String {
        format!("[object {}]", self.class_name())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Read a property. Only objects carry properties; everything else reads
    /// as `undefined`.
    pub fn get(&self, key: &str) -> CallResult {
        match self {
            Value::Object(object) => Ok(object.get(key).cloned().unwrap_or(Value::Undefined)),
            Value::Host(host) => host.get(key),
            _ => Ok(Value::Undefined),
        }
    }

    /// Look up `name` and call it with `args`.
    #[track_caller]
    pub fn call_method(&self, name: &str, args: &[Value]) -> CallResult {
        let location = Location::caller();
        match self.get(name)? {
            Value::Function(function) => function.call_at(args, location),
            _ => Err(Value::Error(ErrorValue::type_error(format!(
                "{name} is not a function"
            )))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::Array(items) | Value::Arguments(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(object) => {
                f.write_str("{")?;
                for (i, (key, value)) in object.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {key}: {value}")?;
                }
                if object.is_empty() {
                    f.write_str("}")
                } else {
                    f.write_str(" }")
                }
            }
            Value::Error(error) => write!(f, "{error}"),
            Value::Function(function) => write!(f, "function {}()", function.name()),
            Value::Host(_) => f.write_str(&self.type_tag()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<ErrorValue> for Value {
    fn from(v: ErrorValue) -> Self {
        Value::Error(v)
    }
}

impl From<Function> for Value {
    fn from(v: Function) -> Self {
        Value::Function(v)
    }
}

impl From<HostObject> for Value {
    fn from(v: HostObject) -> Self {
        Value::Host(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
