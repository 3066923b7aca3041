//! Console Targets
//!
//! A typed alternative to wrapping a dynamic object: code that logs through
//! the [`Console`] trait can be handed a [`CapturedConsole`] instead of the
//! real console, and every call is recorded without touching call sites.
//!
//! ```
//! use console_capture::{CapturedConsole, Console, Interceptor, TracingConsole};
//! use std::rc::Rc;
//!
//! let console = CapturedConsole::new(&Interceptor::new(1), Rc::new(TracingConsole)).unwrap();
//! console.warn(&["disk almost full".into()]);
//! assert_eq!(console.wrapped().get_log()[0].callee_name, "warn");
//! ```

use crate::capture::{Interceptor, Wrapped};
use crate::error::CaptureError;
use crate::value::{Function, Object, Value};
use std::rc::Rc;

/// Members of the standard console, in publication order.
pub const CONSOLE_MEMBERS: [&str; 5] = ["log", "info", "warn", "error", "debug"];

pub trait Console {
    fn log(&self, args: &[Value]);

    fn info(&self, args: &[Value]) {
        self.log(args)
    }

    fn warn(&self, args: &[Value]) {
        self.log(args)
    }

    fn error(&self, args: &[Value]) {
        self.log(args)
    }

    fn debug(&self, args: &[Value]) {
        self.log(args)
    }
}

fn dispatch<C: Console + ?Sized>(console: &C, member: &str, args: &[Value]) {
    match member {
        "info" => console.info(args),
        "warn" => console.warn(args),
        "error" => console.error(args),
        "debug" => console.debug(args),
        _ => console.log(args),
    }
}

/// Expose a [`Console`] as a target object with one function per member.
pub fn console_object<C: Console + 'static>(console: Rc<C>) -> Object {
    let mut object = Object::new();
    for member in CONSOLE_MEMBERS {
        let console = console.clone();
        object.insert(
            member,
            Function::new(member, move |args| {
                dispatch(&*console, member, args);
                Ok(Value::Undefined)
            }),
        );
    }
    object
}

fn join(args: &[Value]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Emits console calls as `tracing` events with the `console` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn log(&self, args: &[Value]) {
        tracing::info!(target: "console", "{}", join(args));
    }

    fn warn(&self, args: &[Value]) {
        tracing::warn!(target: "console", "{}", join(args));
    }

    fn error(&self, args: &[Value]) {
        tracing::error!(target: "console", "{}", join(args));
    }

    fn debug(&self, args: &[Value]) {
        tracing::debug!(target: "console", "{}", join(args));
    }
}

/// Records every call made to an inner [`Console`].
pub struct CapturedConsole {
    wrapped: Wrapped,
}

impl CapturedConsole {
    pub fn new<C: Console + 'static>(
        interceptor: &Interceptor,
        console: Rc<C>,
    ) -> Result<Self, CaptureError> {
        let wrapped = interceptor.wrap(&Value::Object(console_object(console)))?;
        Ok(Self { wrapped })
    }

    pub fn wrapped(&self) -> &Wrapped {
        &self.wrapped
    }

    #[track_caller]
    fn forward(&self, member: &str, args: &[Value]) {
        if let Err(thrown) = self.wrapped.call(member, args) {
            tracing::warn!(member, %thrown, "console member threw");
        }
    }
}

impl Console for CapturedConsole {
    #[track_caller]
    fn log(&self, args: &[Value]) {
        self.forward("log", args)
    }

    #[track_caller]
    fn info(&self, args: &[Value]) {
        self.forward("info", args)
    }

    #[track_caller]
    fn warn(&self, args: &[Value]) {
        self.forward("warn", args)
    }

    #[track_caller]
    fn error(&self, args: &[Value]) {
        self.forward("error", args)
    }

    #[track_caller]
    fn debug(&self, args: &[Value]) {
        self.forward("debug", args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::Sanitized;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Collecting {
        lines: RefCell<Vec<String>>,
    }

    impl Console for Collecting {
        fn log(&self, args: &[Value]) {
            self.lines.borrow_mut().push(format!("log {}", join(args)));
        }

        fn error(&self, args: &[Value]) {
            self.lines.borrow_mut().push(format!("error {}", join(args)));
        }
    }

    #[test]
    fn console_object_has_every_member() {
        let object = console_object(Rc::new(TracingConsole));
        assert_eq!(object.keys().collect::<Vec<_>>(), CONSOLE_MEMBERS);
    }

    #[test]
    fn captured_console_forwards_and_records() {
        let inner = Rc::new(Collecting::default());
        let console = CapturedConsole::new(&Interceptor::new(1), inner.clone()).unwrap();

        console.info(&["ready".into()]);
        console.error(&["error1".into(), "error2".into()]);

        assert_eq!(*inner.lines.borrow(), ["log ready", "error error1 error2"]);
        let log = console.wrapped().get_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].callee_name, "info");
        assert_eq!(
            log[1].arguments,
            vec![Sanitized::from("error1"), Sanitized::from("error2")]
        );
    }

    #[test]
    fn call_site_points_at_trait_call() {
        let console = CapturedConsole::new(&Interceptor::new(1), Rc::new(Collecting::default())).unwrap();
        let line = line!() + 1;
        console.log(&[]);
        let site = console.wrapped().get_log()[0].call_site.clone().unwrap();
        assert_eq!(site.line_number, line);
    }
}
