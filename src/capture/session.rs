//! Capture session state: the call log and the sanitization depth.

use super::{CallRecord, CallSite};
use crate::error::CaptureError;
use crate::sanitize::Sanitizer;
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct SessionState {
    log: RefCell<Vec<CallRecord>>,
    depth: Cell<u32>,
}

/// The log and depth setting shared by every wrapper of one interceptor.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct CaptureSession {
    state: Rc<SessionState>,
}

impl CaptureSession {
    pub fn new(depth: u32) -> Self {
        Self {
            state: Rc::new(SessionState {
                log: RefCell::new(Vec::new()),
                depth: Cell::new(depth),
            }),
        }
    }

    pub fn depth(&self) -> u32 {
        self.state.depth.get()
    }

    /// Set the depth bound used for calls recorded from now on.
    ///
    /// The depth must be a number with an integral value. Anything else is an
    /// [`CaptureError::InvalidArgument`]; a negative or unrepresentable
    /// integer is [`CaptureError::OutOfRange`]. On error the current depth is
    /// kept.
    pub fn set_depth(&self, depth: impl Into<Value>) -> Result<(), CaptureError> {
        let depth = validate_depth(&depth.into())?;
        self.state.depth.set(depth);
        tracing::debug!(depth, "capture depth changed");
        Ok(())
    }

    /// A copy of every record so far, oldest first.
    pub fn get_log(&self) -> Vec<CallRecord> {
        self.state.log.borrow().clone()
    }

    /// Drop every record at once.
    pub fn clear_log(&self) {
        let cleared = self.state.log.replace(Vec::new());
        tracing::debug!(records = cleared.len(), "capture log cleared");
    }

    pub fn len(&self) -> usize {
        self.state.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.log.borrow().is_empty()
    }

    pub fn sanitizer(&self) -> Sanitizer {
        Sanitizer::new(self.depth())
    }

    /// Build a record for a call and append it.
    ///
    /// Arguments are sanitized before the log is borrowed, since sanitizing
    /// may run getters that log through the same session.
    pub fn record(
        &self,
        callee: &str,
        timestamp: i64,
        args: &[Value],
        stack: Option<&str>,
    ) -> CallRecord {
        let sanitizer = self.sanitizer();
        let arguments = args.iter().map(|arg| sanitizer.sanitize(arg)).collect();

        let call_site = stack.and_then(CallSite::from_stack);
        if call_site.is_none() {
            tracing::debug!(callee, "no call site available");
        }

        let record = CallRecord {
            callee_name: callee.to_string(),
            timestamp,
            arguments,
            call_site,
        };
        self.state.log.borrow_mut().push(record.clone());
        tracing::trace!(callee, records = self.len(), "call captured");
        record
    }

    /// Whether both handles share one log.
    pub fn ptr_eq(&self, other: &CaptureSession) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DEPTH)
    }
}

fn validate_depth(depth: &Value) -> Result<u32, CaptureError> {
    let Some(n) = depth.as_number() else {
        return Err(CaptureError::InvalidArgument(format!(
            "depth must be an integer, got {}",
            depth.class_name()
        )));
    };
    if !n.is_finite() || n.fract() != 0.0 {
        return Err(CaptureError::InvalidArgument(format!(
            "depth must be an integer, got {n}"
        )));
    }
    if n < 0.0 || n > f64::from(u32::MAX) {
        return Err(CaptureError::OutOfRange(n));
    }
    Ok(n as u32)
}
