//! Call-site metadata
//!
//! A call site is read from the second line of a synthetic stack trace, the
//! first line being the wrapper itself. Frames have the form
//! `caller@file:line:column`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

/// Where an intercepted call came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSite {
    /// Name of the calling function, empty for top-level code
    #[serde(rename = "caller")]
    pub caller_name: String,
    pub file_name: String,
    pub line_number: u32,
    pub column_number: u32,
}

impl CallSite {
    /// Parse a single `caller@file:line:column` frame.
    ///
    /// The caller runs up to the first `@`. The file name takes everything up
    /// to the last two `:`-separated fields, which must both be decimal.
    pub fn parse(frame: &str) -> Option<Self> {
        let (caller, location) = frame.split_once('@')?;
        let mut fields = location.rsplitn(3, ':');
        let column = parse_decimal(fields.next()?)?;
        let line = parse_decimal(fields.next()?)?;
        let file = fields.next()?;
        Some(Self {
            caller_name: caller.to_string(),
            file_name: file.to_string(),
            line_number: line,
            column_number: column,
        })
    }

    /// Parse the caller's frame out of a whole stack trace.
    pub fn from_stack(stack: &str) -> Option<Self> {
        stack.lines().nth(1).and_then(Self::parse)
    }
}

fn parse_decimal(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}:{}",
            self.caller_name, self.file_name, self.line_number, self.column_number
        )
    }
}

// ============================================================================
// Stack providers
// ============================================================================

/// Produces the synthetic stack trace for an intercepted call.
///
/// Line 0 describes the wrapper and line 1 the caller. Returning `None`, or a
/// trace whose second line does not parse, records the call without a call
/// site.
pub trait StackProvider {
    fn stack(&self, callee: &str, location: &'static Location<'static>) -> Option<String>;
}

impl<F> StackProvider for F
where
    F: Fn(&str, &'static Location<'static>) -> Option<String>,
{
    fn stack(&self, callee: &str, location: &'static Location<'static>) -> Option<String> {
        self(callee, location)
    }
}

/// Builds the trace from the Rust source location of the call. Rust does not
/// expose the calling function's name, so the caller is always empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationStack;

impl StackProvider for LocationStack {
    fn stack(&self, callee: &str, location: &'static Location<'static>) -> Option<String> {
        Some(format!(
            "{callee}@{}:{}:{}\n@{}:{}:{}",
            file!(),
            line!(),
            column!(),
            location.file(),
            location.line(),
            location.column()
        ))
    }
}

/// Never provides a trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStack;

impl StackProvider for NoStack {
    fn stack(&self, _callee: &str, _location: &'static Location<'static>) -> Option<String> {
        None
    }
}
