//! Error taxonomy: parse errors, runtime classification, strict mode, stacks.

use krait::{CollectConsole, Engine, EngineError, ErrorKind, HostValue};

#[test]
fn parse_error_carries_position() {
    let err = Engine::new().evaluate("let = 5;").unwrap_err();
    let EngineError::Parse(e) = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert_eq!(e.line, 1);
    assert!(e.column > 0);
    assert!(e.message.contains("expected"));
}

#[test]
fn parse_error_line_is_one_based_and_tracks_newlines() {
    let err = Engine::new().evaluate("let a = 1;\nlet b = ;\n").unwrap_err();
    let EngineError::Parse(e) = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert_eq!(e.line, 2);
}

#[test]
fn runtime_error_kinds_classify() {
    let cases = [
        ("undefinedVariable", ErrorKind::ReferenceError),
        ("null.property", ErrorKind::TypeError),
        ("(1)()", ErrorKind::TypeError),
        ("new Array(-1)", ErrorKind::RangeError),
    ];
    for (src, kind) in cases {
        let err = Engine::new().evaluate(src).unwrap_err();
        let EngineError::Runtime(e) = err else {
            panic!("expected a runtime error for {src}, got {err:?}");
        };
        assert_eq!(e.kind, kind, "kind mismatch for {src}");
    }
}

#[test]
fn thrown_non_error_values_are_preserved_for_catch() {
    let r = Engine::new()
        .evaluate("try { throw 'plain string'; } catch (e) { typeof e + ':' + e }")
        .unwrap();
    assert_eq!(r, HostValue::String("string:plain string".to_owned()));
}

#[test]
fn thrown_non_error_surfaces_with_string_form() {
    let err = Engine::new().evaluate("throw 'loose';").unwrap_err();
    let EngineError::Runtime(e) = err else {
        panic!("expected a runtime error, got {err:?}");
    };
    assert_eq!(e.kind, ErrorKind::Error);
    assert_eq!(e.message, "loose");
}

#[test]
fn error_objects_carry_name_message_stack() {
    let r = Engine::new()
        .evaluate("function inner() { throw new TypeError('bad thing'); } try { inner(); } catch (e) { [e.name, e.message, typeof e.stack] }")
        .unwrap();
    assert_eq!(
        r,
        HostValue::Array(vec![
            HostValue::String("TypeError".to_owned()),
            HostValue::String("bad thing".to_owned()),
            HostValue::String("string".to_owned()),
        ])
    );
}

#[test]
fn stack_frames_name_the_function_and_path() {
    let mut engine = Engine::new();
    engine.set_script_path("app.js");
    let err = engine
        .evaluate("function boomer() { missing; }\nboomer();")
        .unwrap_err();
    let EngineError::Runtime(e) = err else {
        panic!("expected a runtime error, got {err:?}");
    };
    assert_eq!(e.kind, ErrorKind::ReferenceError);
    assert!(!e.script_stack.is_empty());
    assert_eq!(e.script_stack[0].function, "boomer");
    assert_eq!(e.script_stack[0].path, "app.js");
}

#[test]
fn strict_mode_rejects_undeclared_assignment() {
    let err = Engine::new().evaluate("'use strict';\nundeclared = 1;").unwrap_err();
    let EngineError::Runtime(e) = err else {
        panic!("expected a runtime error, got {err:?}");
    };
    assert_eq!(e.kind, ErrorKind::ReferenceError);
}

#[test]
fn sloppy_mode_creates_a_global() {
    let mut engine = Engine::new();
    let r = engine.evaluate("function f() { sloppy = 5; } f(); sloppy").unwrap();
    assert_eq!(r, HostValue::Int(5));
}

#[test]
fn strict_mode_inherits_into_nested_functions() {
    let err = Engine::new()
        .evaluate("'use strict';\nfunction outer() { function inner() { oops = 1; } inner(); }\nouter();")
        .unwrap_err();
    let EngineError::Runtime(e) = err else {
        panic!("expected a runtime error, got {err:?}");
    };
    assert_eq!(e.kind, ErrorKind::ReferenceError);
}

#[test]
fn deep_recursion_is_a_catchable_range_error() {
    let r = Engine::new()
        .evaluate("function f() { return f(); } try { f(); } catch (e) { e.name }")
        .unwrap();
    assert_eq!(r, HostValue::String("RangeError".to_owned()));
}

#[test]
fn custom_error_subclasses_work() {
    let src = "
        class AppError extends Error {
          constructor(code) { super('app failed'); this.code = code; }
        }
        try { throw new AppError(7); } catch (e) { [e instanceof AppError, e instanceof Error, e.message, e.code] }
    ";
    let r = Engine::new().evaluate(src).unwrap();
    assert_eq!(
        r,
        HostValue::Array(vec![
            HostValue::Bool(true),
            HostValue::Bool(true),
            HostValue::String("app failed".to_owned()),
            HostValue::Int(7),
        ])
    );
}

#[test]
fn console_capture_via_collect_writer() {
    let collector = CollectConsole::new();
    let mut engine = Engine::new();
    engine.set_console(Box::new(collector.clone()));
    engine.evaluate("console.log('hello', 1, [2, 3]);").unwrap();
    engine.evaluate("console.error('bad');").unwrap();
    let lines = collector.text();
    assert_eq!(lines[0], "hello 1 [ 2, 3 ]");
    assert_eq!(lines[1], "bad");
}

#[test]
fn finally_throw_supersedes_pending_throw() {
    let r = Engine::new()
        .evaluate("try { (function(){ try { throw 'original'; } finally { throw 'replacement'; } })(); } catch (e) { e }")
        .unwrap();
    assert_eq!(r, HostValue::String("replacement".to_owned()));
}
