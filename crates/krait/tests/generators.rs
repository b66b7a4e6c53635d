//! Generator semantics: pause/resume, delegation, try/finally unwinding.

use krait::{Engine, HostValue};

fn eval(src: &str) -> HostValue {
    Engine::new().evaluate(src).unwrap()
}

#[test]
fn basic_yield_sequence() {
    assert_eq!(
        eval("function* g() { yield 1; yield 2; return 3; } let it = g(); [it.next().value, it.next().value, it.next().value, it.next().done]"),
        HostValue::Array(vec![
            HostValue::Int(1),
            HostValue::Int(2),
            HostValue::Int(3),
            HostValue::Bool(true),
        ])
    );
}

#[test]
fn next_delivers_values_into_yield_sites() {
    let src = "
        function* adder() {
          let total = 0;
          while (true) {
            let n = yield total;
            if (n === undefined) break;
            total += n;
          }
          return total;
        }
        let it = adder();
        it.next();
        it.next(5);
        it.next(7);
        it.next().value
    ";
    assert_eq!(eval(src), HostValue::Int(12));
}

#[test]
fn generator_try_finally_with_return() {
    // S3: finally yields, then the pending return completes the generator.
    let src = "
        function* g(){ try { yield 1; yield 2; } finally { yield 3; } }
        const it = g();
        [it.next().value, it.next().value, it.return(9).value, it.next().value, it.next().done]
    ";
    assert_eq!(
        eval(src),
        HostValue::Array(vec![
            HostValue::Int(1),
            HostValue::Int(2),
            HostValue::Int(3),
            HostValue::Int(9),
            HostValue::Bool(true),
        ])
    );
}

#[test]
fn finally_always_runs_before_completion() {
    let src = "
        let log = [];
        function* g() {
          try { yield 'a'; } finally { log.push('cleanup'); }
        }
        let it = g();
        it.next();
        it.return('stop');
        log.length
    ";
    assert_eq!(eval(src), HostValue::Int(1));
}

#[test]
fn throw_lands_in_generator_catch() {
    let src = "
        function* g() {
          try { yield 1; } catch (e) { yield 'caught:' + e; }
          yield 'after';
        }
        let it = g();
        it.next();
        [it.throw('boom').value, it.next().value]
    ";
    assert_eq!(
        eval(src),
        HostValue::Array(vec![
            HostValue::String("caught:boom".to_owned()),
            HostValue::String("after".to_owned()),
        ])
    );
}

#[test]
fn uncaught_throw_escapes_to_caller() {
    let src = "
        function* g() { yield 1; }
        let it = g();
        it.next();
        try { it.throw('oops'); } catch (e) { 'escaped:' + e }
    ";
    assert_eq!(eval(src), HostValue::String("escaped:oops".to_owned()));
}

#[test]
fn delegated_yield_flattens_in_order() {
    // Deterministic for-of + yield*: values delegated through yield* equal
    // the flattened sequence, with the delegate's return value delivered to
    // the outer generator.
    let src = "
        function* inner() { yield 1; yield 2; return 10; }
        function* outer() { let r = yield* inner(); yield r; }
        let out = [];
        for (const v of outer()) out.push(v);
        out
    ";
    assert_eq!(
        eval(src),
        HostValue::Array(vec![HostValue::Int(1), HostValue::Int(2), HostValue::Int(10)])
    );
}

#[test]
fn delegate_receives_forwarded_next_arguments() {
    let src = "
        function* inner() { let got = yield 'i'; yield got; }
        function* outer() { yield* inner(); }
        let it = outer();
        it.next();
        it.next('forwarded').value
    ";
    assert_eq!(eval(src), HostValue::String("forwarded".to_owned()));
}

#[test]
fn delegate_without_throw_raises_type_error() {
    let src = "
        let closed = false;
        let fake = {
          [Symbol.iterator]() {
            return {
              next() { return {value: 1, done: false}; },
              return() { closed = true; return {done: true}; }
            };
          }
        };
        function* g() { yield* fake; }
        let it = g();
        it.next();
        let kind = null;
        try { it.throw('x'); } catch (e) { kind = e.name; }
        [kind, closed]
    ";
    assert_eq!(
        eval(src),
        HostValue::Array(vec![HostValue::String("TypeError".to_owned()), HostValue::Bool(true)])
    );
}

#[test]
fn generators_iterate_with_for_of_and_spread() {
    assert_eq!(
        eval("function* g() { for (const x of [1, 2, 3]) yield x * 2; } [...g()]"),
        HostValue::Array(vec![HostValue::Int(2), HostValue::Int(4), HostValue::Int(6)])
    );
}

#[test]
fn loop_probe_rewrite_drives_while_condition() {
    let src = "
        function* g() {
          let budget = 3;
          while (yield budget) { budget -= 1; }
          return 'spent';
        }
        let it = g();
        let first = it.next().value;
        it.next(true);
        it.next(true);
        [first, it.next(false).value, it.next().done]
    ";
    assert_eq!(
        eval(src),
        HostValue::Array(vec![
            HostValue::Int(3),
            HostValue::String("spent".to_owned()),
            HostValue::Bool(true),
        ])
    );
}

#[test]
fn break_inside_generator_loop_closes_iterator() {
    let src = "
        let closed = false;
        let iterable = {
          [Symbol.iterator]() {
            return {
              next() { return {value: 1, done: false}; },
              return() { closed = true; return {done: true}; }
            };
          }
        };
        function* g() {
          for (const v of iterable) { yield v; break; }
          yield 'after';
        }
        let it = g();
        it.next();
        it.next();
        closed
    ";
    assert_eq!(eval(src), HostValue::Bool(true));
}

#[test]
fn completed_generator_keeps_returning_done() {
    let src = "
        function* g() { yield 1; }
        let it = g();
        it.next();
        it.next();
        let r = it.next();
        [r.value === undefined, r.done]
    ";
    assert_eq!(eval(src), HostValue::Array(vec![HostValue::Bool(true), HostValue::Bool(true)]));
}

#[test]
fn multiple_suspensions_in_one_expression_are_not_supported() {
    let err = Engine::new()
        .evaluate("function* g() { use((yield 1) + (yield 2)); } g();")
        .unwrap_err();
    let krait::EngineError::NotSupported { feature } = err else {
        panic!("expected NotSupported, got {err:?}");
    };
    assert!(feature.contains("multiple suspensions"));
}

#[test]
fn not_supported_only_affects_the_offending_function() {
    let mut engine = Engine::new();
    let err = engine.evaluate("function* bad() { use((yield 1) + (yield 2)); } bad();").unwrap_err();
    assert!(matches!(err, krait::EngineError::NotSupported { .. }));
    // Sibling functions still work.
    let ok = engine.evaluate("function* good() { yield 5; } good().next().value").unwrap();
    assert_eq!(ok, HostValue::Int(5));
}
