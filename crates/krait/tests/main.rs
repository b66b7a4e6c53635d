use krait::{Engine, HostValue};

/// Engines are reusable across evaluations without borrow issues.
#[test]
fn repeat_eval() {
    let mut engine = Engine::new();
    let r = engine.evaluate("1 + 2").unwrap();
    assert_eq!(r, HostValue::Int(3));
    let r = engine.evaluate("1 + 2").unwrap();
    assert_eq!(r, HostValue::Int(3));
}

#[test]
fn arithmetic_determinism() {
    let mut engine = Engine::new();
    let r = engine.evaluate("(function(){ return (1+2)*3; })();").unwrap();
    assert_eq!(r, HostValue::Int(9));
}

#[test]
fn string_results() {
    let mut engine = Engine::new();
    let r = engine.evaluate("'foo' + 'bar'").unwrap();
    assert_eq!(r, HostValue::String("foobar".to_owned()));
}

#[test]
fn completion_value_is_last_expression() {
    let mut engine = Engine::new();
    let r = engine.evaluate("let a = 5; a * 2; 'done';").unwrap();
    assert_eq!(r, HostValue::String("done".to_owned()));
    let r = engine.evaluate("let b = 1;").unwrap();
    assert_eq!(r, HostValue::Undefined);
}

#[test]
fn globals_round_trip() {
    let mut engine = Engine::new();
    engine.set_global("answer", HostValue::Int(42));
    let r = engine.evaluate("answer").unwrap();
    assert_eq!(r, HostValue::Int(42));
}

#[test]
fn host_function_plain() {
    let mut engine = Engine::new();
    engine.set_global_function("host_add", |args| {
        let a = args.first().and_then(HostValue::as_f64).unwrap_or(0.0);
        let b = args.get(1).and_then(HostValue::as_f64).unwrap_or(0.0);
        Ok(HostValue::Float(a + b))
    });
    let r = engine.evaluate("host_add(40, 2)").unwrap();
    assert_eq!(r, HostValue::Int(42));
}

#[test]
fn host_function_with_this() {
    let mut engine = Engine::new();
    engine.set_global_function_with_this("whoami", |this, _args| {
        let name = match this {
            HostValue::Object(pairs) => pairs
                .iter()
                .find(|(k, _)| k == "name")
                .map(|(_, v)| v.clone())
                .unwrap_or(HostValue::Undefined),
            _ => HostValue::Undefined,
        };
        Ok(name)
    });
    let r = engine
        .evaluate("let o = {name: 'krait', f: whoami}; o.f();")
        .unwrap();
    assert_eq!(r, HostValue::String("krait".to_owned()));
}

#[test]
fn host_function_error_becomes_script_error() {
    let mut engine = Engine::new();
    engine.set_global_function("boom", |_| Err("host exploded".to_owned()));
    let r = engine
        .evaluate("try { boom(); } catch (e) { e.message }")
        .unwrap();
    assert_eq!(r, HostValue::String("host exploded".to_owned()));
}

#[test]
fn arrays_and_objects_cross_boundary() {
    let mut engine = Engine::new();
    let r = engine.evaluate("[1, 'two', [3]]").unwrap();
    assert_eq!(
        r,
        HostValue::Array(vec![
            HostValue::Int(1),
            HostValue::String("two".to_owned()),
            HostValue::Array(vec![HostValue::Int(3)]),
        ])
    );
    let r = engine.evaluate("({a: 1, b: {c: true}})").unwrap();
    assert_eq!(
        r,
        HostValue::Object(vec![
            ("a".to_owned(), HostValue::Int(1)),
            (
                "b".to_owned(),
                HostValue::Object(vec![("c".to_owned(), HostValue::Bool(true))])
            ),
        ])
    );
}

#[test]
fn bytes_become_uint8array() {
    let mut engine = Engine::new();
    engine.set_global("payload", HostValue::Bytes(vec![1, 2, 3]));
    let r = engine.evaluate("payload.length").unwrap();
    assert_eq!(r, HostValue::Int(3));
    let r = engine.evaluate("payload[1]").unwrap();
    assert_eq!(r, HostValue::Int(2));
}
