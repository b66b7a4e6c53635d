//! Module loading, live bindings, circularity, dynamic import.

use std::collections::HashMap;

use krait::{Engine, EngineError, HostValue};

fn engine_with_modules(modules: &[(&str, &str)]) -> Engine {
    let table: HashMap<String, String> = modules
        .iter()
        .map(|(path, source)| ((*path).to_owned(), (*source).to_owned()))
        .collect();
    let mut engine = Engine::new();
    engine.set_module_loader(move |path| table.get(path).cloned());
    engine
}

#[test]
fn live_bindings_observe_reassignment() {
    // S5.
    let mut engine = engine_with_modules(&[(
        "counter.js",
        "export let n = 0; export function inc(){ n = n + 1; }",
    )]);
    let r = engine
        .run("import {n, inc} from 'counter.js'; inc(); inc(); n;")
        .unwrap();
    assert_eq!(r, HostValue::Int(2));
}

#[test]
fn binding_identity_across_reads() {
    let mut engine = engine_with_modules(&[(
        "state.js",
        "export let x = 'first'; export function set(v){ x = v; }",
    )]);
    let r = engine
        .run("import {x, set} from 'state.js'; let before = x; set('second'); before + ',' + x")
        .unwrap();
    assert_eq!(r, HostValue::String("first,second".to_owned()));
}

#[test]
fn default_and_named_imports() {
    let mut engine = engine_with_modules(&[(
        "lib.js",
        "export default function times2(v){ return v * 2; } export const base = 21;",
    )]);
    let r = engine.run("import times2, {base} from 'lib.js'; times2(base)").unwrap();
    assert_eq!(r, HostValue::Int(42));
}

#[test]
fn namespace_imports() {
    let mut engine = engine_with_modules(&[("m.js", "export const a = 1; export const b = 2;")]);
    let r = engine.run("import * as m from 'm.js'; m.a + m.b").unwrap();
    assert_eq!(r, HostValue::Int(3));
}

#[test]
fn reexports_resolve_through_the_chain() {
    let mut engine = engine_with_modules(&[
        ("base.js", "export const value = 'deep';"),
        ("middle.js", "export {value} from 'base.js';"),
    ]);
    let r = engine.run("import {value} from 'middle.js'; value").unwrap();
    assert_eq!(r, HostValue::String("deep".to_owned()));
}

#[test]
fn modules_evaluate_once() {
    let mut engine = engine_with_modules(&[
        ("shared.js", "export let evals = 0; evals += 1;"),
        ("a.js", "import {evals} from 'shared.js'; export const fromA = evals;"),
        ("b.js", "import {evals} from 'shared.js'; export const fromB = evals;"),
    ]);
    let r = engine
        .run("import {fromA} from 'a.js'; import {fromB} from 'b.js'; import {evals} from 'shared.js'; evals")
        .unwrap();
    assert_eq!(r, HostValue::Int(1));
}

#[test]
fn circular_imports_link() {
    let mut engine = engine_with_modules(&[
        (
            "even.js",
            "import {isOdd} from 'odd.js'; export function isEven(n){ return n === 0 ? true : isOdd(n - 1); }",
        ),
        (
            "odd.js",
            "import {isEven} from 'even.js'; export function isOdd(n){ return n === 0 ? false : isEven(n - 1); }",
        ),
    ]);
    let r = engine.run("import {isEven} from 'even.js'; isEven(10)").unwrap();
    assert_eq!(r, HostValue::Bool(true));
}

#[test]
fn missing_module_is_reported() {
    let mut engine = engine_with_modules(&[]);
    let err = engine.run("import {x} from 'ghost.js';").unwrap_err();
    assert_eq!(err, EngineError::ModuleNotFound { path: "ghost.js".to_owned() });
}

#[test]
fn absent_loader_fails_with_reference_error() {
    let mut engine = Engine::new();
    let err = engine.run("import {x} from 'any.js';").unwrap_err();
    let EngineError::Runtime(e) = err else {
        panic!("expected a runtime error, got {err:?}");
    };
    assert_eq!(e.kind, krait::ErrorKind::ReferenceError);
}

#[test]
fn dynamic_import_resolves_namespace() {
    let mut engine = engine_with_modules(&[("dyn.js", "export const marker = 'loaded';")]);
    let src = "
        let out;
        import('dyn.js').then(ns => { out = ns.marker; });
    ";
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("out").unwrap(), HostValue::String("loaded".to_owned()));
}

#[test]
fn dynamic_import_rejects_on_missing_module() {
    let mut engine = engine_with_modules(&[]);
    let src = "
        let out;
        import('ghost.js').then(() => { out = 'resolved'; }, () => { out = 'rejected'; });
    ";
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("out").unwrap(), HostValue::String("rejected".to_owned()));
}

#[test]
fn import_bindings_are_read_only() {
    let mut engine = engine_with_modules(&[("ro.js", "export let v = 1;")]);
    let err = engine.run("import {v} from 'ro.js'; v = 2;").unwrap_err();
    let EngineError::Runtime(e) = err else {
        panic!("expected a runtime error, got {err:?}");
    };
    assert_eq!(e.kind, krait::ErrorKind::TypeError);
}
