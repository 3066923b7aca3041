//! Integration tests for installing a capture into a page scope

use console_capture::console::{console_object, Console};
use console_capture::script::{parse_script, render, replay};
use console_capture::{capture, CaptureConfig, CaptureError, HostObject, PropertyDescriptor, Scope, Value};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct Recording {
    lines: RefCell<Vec<String>>,
}

impl Console for Recording {
    fn log(&self, args: &[Value]) {
        let line: Vec<String> = args.iter().map(ToString::to_string).collect();
        self.lines.borrow_mut().push(line.join(" "));
    }
}

fn page_with_console() -> (Rc<Recording>, Scope, Scope) {
    let console = Rc::new(Recording::default());
    let global = Scope::new().with("console", console_object(console.clone()));
    (console, global, Scope::new())
}

#[test]
fn test_page_calls_are_forwarded_and_captured() {
    let (console, global, mut page) = page_with_console();
    let installation = capture(&global, &mut page, "console").unwrap();

    let published = page.get("console").unwrap().clone();
    published.call_method("log", &["OK".into()]).unwrap();
    published
        .call_method("error", &["error1".into(), "error2".into()])
        .unwrap();

    assert_eq!(*console.lines.borrow(), ["OK", "error1 error2"]);

    let Value::Array(entries) = installation.get_capture().unwrap() else {
        panic!("capture.get() must return an array");
    };
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].get("callee").unwrap(), Value::from("error"));
    assert!(matches!(entries[1].get("time").unwrap(), Value::Number(_)));
}

#[test]
fn test_capture_depth_is_visible_to_the_page() {
    let (_, global, mut page) = page_with_console();
    let installation = capture(&global, &mut page, "console").unwrap();
    let api = page.get("console").unwrap().get("capture").unwrap();

    assert_eq!(api.get("depth").unwrap(), Value::from(1));

    let window = HostObject::new("Window");
    window.define(PropertyDescriptor::data("parent", window.clone()));
    let published = page.get("console").unwrap().clone();

    published.call_method("log", &[Value::Host(window.clone())]).unwrap();
    installation.set_depth(0).unwrap();
    published.call_method("log", &[Value::Host(window)]).unwrap();

    let records = installation.records();
    assert_eq!(
        records[0].to_page_json()["arguments"],
        json!([{"type": "Window", "parent": "[object Window]"}])
    );
    assert_eq!(records[1].to_page_json()["arguments"], json!(["[object Window]"]));
}

#[test]
fn test_reinstall_keeps_existing_log() {
    let (_, global, mut page) = page_with_console();
    let first = capture(&global, &mut page, "console").unwrap();
    page.get("console").unwrap().call_method("log", &[]).unwrap();

    let second = capture(&global, &mut page, "console").unwrap();
    assert_eq!(second.records().len(), 1);
    assert!(first.published().ptr_eq(second.published()));
    assert!(first.session().ptr_eq(second.session()));
}

#[test]
fn test_install_reports_missing_target() {
    let global = Scope::new();
    let mut page = Scope::new();
    let config = CaptureConfig::from_json(r#"{"target": "logger"}"#).unwrap();
    assert!(matches!(
        config.install(&global, &mut page),
        Err(CaptureError::MissingTarget(name)) if name == "logger"
    ));
}

#[test]
fn test_script_replay_renders_page_json() {
    let calls = parse_script(
        r#"[
            {"member": "log", "args": ["OK", 2, null, {"$undefined": true}]},
            {"member": "info", "args": [{"$function": "f"}, {"$error": {"name": "TypeError", "lineNumber": 3}}],
             "caller": "fun", "file": "file:///test/test_script.js", "line": 2, "column": 25}
        ]"#,
    )
    .unwrap();
    let installation = replay(&CaptureConfig::default(), Rc::new(Recording::default()), &calls).unwrap();

    let mut output = render(&installation.records(), false).unwrap();
    for record in output.as_array_mut().unwrap() {
        record.as_object_mut().unwrap().remove("time");
    }
    assert_eq!(
        output,
        json!([
            {"callee": "log", "arguments": ["OK", 2, "null", "undefined"]},
            {
                "callee": "info",
                "arguments": ["function()", {"type": "Error", "lineNumber": 3}],
                "caller": "fun",
                "fileName": "file:///test/test_script.js",
                "lineNumber": 2,
                "columnNumber": 25
            }
        ])
    );
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("console-capture-{}.json", std::process::id()));
    std::fs::write(&path, r#"{"depth": 4, "members": ["warn"]}"#).unwrap();

    let config = CaptureConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.depth, 4);
    assert_eq!(config.target, "console");

    let (console, global, mut page) = page_with_console();
    let installation = config.install(&global, &mut page).unwrap();
    let published = page.get("console").unwrap().clone();
    published.call_method("warn", &["w".into()]).unwrap();
    assert!(published.call_method("log", &["l".into()]).is_err());

    assert_eq!(*console.lines.borrow(), ["w"]);
    assert_eq!(installation.records().len(), 1);
}
