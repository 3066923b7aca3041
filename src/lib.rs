//! Console Capture: record every call made to a console-like object
//!
//! Wraps the members of a target object so that each call is forwarded to the
//! wrapped member and recorded, with sanitized arguments and the
//! call site, into an in-memory log that can be read back and cleared.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  scope     - install: look up, wrap, publish  │
//! │  console   - typed Console decorator          │
//! │  script    - JSON call scripts for the CLI    │
//! ├──────────────────────────────────────────────┤
//! │  capture   - Interceptor, session, records    │
//! │  sanitize  - Value -> Sanitized snapshots     │
//! ├──────────────────────────────────────────────┤
//! │  value     - host values, objects, functions  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Sanitization
//!
//! Arguments are reduced to [`Sanitized`] snapshots: primitives pass through,
//! functions become a placeholder, errors keep only their position, and
//! opaque host objects are described by reflection down to a configurable
//! depth, after which they collapse to their `[object Class]` tag.

pub mod capture;
pub mod config;
pub mod console;
pub mod error;
pub mod sanitize;
pub mod scope;
pub mod script;
pub mod value;

pub use capture::{CallRecord, CallSite, CaptureSession, Interceptor, Wrapped};
pub use config::CaptureConfig;
pub use console::{CapturedConsole, Console, TracingConsole};
pub use error::CaptureError;
pub use sanitize::{sanitize, Sanitized, Sanitizer};
pub use scope::{capture, install, Installation, Scope};
pub use value::{ErrorValue, Function, HostObject, Object, PropertyDescriptor, Value};
