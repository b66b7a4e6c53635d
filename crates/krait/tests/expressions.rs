//! Operator semantics, coercion, destructuring, closures, classes.

use krait::{Engine, HostValue};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> HostValue {
    Engine::new().evaluate(src).unwrap()
}

#[test]
fn equality_tables() {
    assert_eq!(eval("1 == '1'"), HostValue::Bool(true));
    assert_eq!(eval("1 === '1'"), HostValue::Bool(false));
    assert_eq!(eval("null == undefined"), HostValue::Bool(true));
    assert_eq!(eval("null === undefined"), HostValue::Bool(false));
    assert_eq!(eval("NaN === NaN"), HostValue::Bool(false));
    assert_eq!(eval("0 == false"), HostValue::Bool(true));
    assert_eq!(eval("'' == false"), HostValue::Bool(true));
    assert_eq!(eval("({}) == ({})"), HostValue::Bool(false));
    assert_eq!(eval("let o = {}; o == o"), HostValue::Bool(true));
}

#[test]
fn addition_is_string_biased() {
    assert_eq!(eval("1 + '2'"), HostValue::String("12".to_owned()));
    assert_eq!(eval("'' + null"), HostValue::String("null".to_owned()));
    assert_eq!(eval("1 + 2 + '3'"), HostValue::String("33".to_owned()));
    assert_eq!(eval("'3' + 1 + 2"), HostValue::String("312".to_owned()));
    assert_eq!(eval("true + 1"), HostValue::Int(2));
}

#[test]
fn bitwise_is_int32() {
    assert_eq!(eval("(0xffffffff | 0)"), HostValue::Int(-1));
    assert_eq!(eval("(-1) >>> 0"), HostValue::Int(4_294_967_295));
    assert_eq!(eval("5 & 3"), HostValue::Int(1));
    assert_eq!(eval("1 << 31"), HostValue::Int(-2_147_483_648));
}

#[test]
fn exponent_and_remainder() {
    assert_eq!(eval("2 ** 10"), HostValue::Int(1024));
    assert_eq!(eval("2 ** 3 ** 2"), HostValue::Int(512));
    assert_eq!(eval("-7 % 3"), HostValue::Int(-1));
}

#[test]
fn short_circuit_operators() {
    assert_eq!(eval("null ?? 'fallback'"), HostValue::String("fallback".to_owned()));
    assert_eq!(eval("0 ?? 'fallback'"), HostValue::Int(0));
    assert_eq!(eval("0 || 'fallback'"), HostValue::String("fallback".to_owned()));
    assert_eq!(eval("let calls = 0; function f(){ calls++; return 1; } true || f(); calls"), HostValue::Int(0));
}

#[test]
fn optional_chaining_short_circuits() {
    assert_eq!(eval("let o = null; o?.a.b.c"), HostValue::Undefined);
    assert_eq!(eval("let o = {a: {b: 1}}; o?.a?.b"), HostValue::Int(1));
    assert_eq!(eval("let o = {}; o.missing?.()"), HostValue::Undefined);
    assert_eq!(eval("let o = {f(){ return 7; }}; o.f?.()"), HostValue::Int(7));
}

#[test]
fn typeof_results() {
    assert_eq!(eval("typeof undefined"), HostValue::String("undefined".to_owned()));
    assert_eq!(eval("typeof null"), HostValue::String("object".to_owned()));
    assert_eq!(eval("typeof 1"), HostValue::String("number".to_owned()));
    assert_eq!(eval("typeof 'x'"), HostValue::String("string".to_owned()));
    assert_eq!(eval("typeof (() => 1)"), HostValue::String("function".to_owned()));
    assert_eq!(eval("typeof notDeclaredAnywhere"), HostValue::String("undefined".to_owned()));
    assert_eq!(eval("typeof 1n"), HostValue::String("bigint".to_owned()));
}

#[test]
fn destructuring_completeness() {
    // let {a, ...rest} = {a:1,b:2,c:3}
    assert_eq!(
        eval("let {a, ...rest} = {a:1,b:2,c:3}; a===1 && rest.b===2 && rest.c===3 && !('a' in rest)"),
        HostValue::Bool(true)
    );
}

#[test]
fn destructuring_defaults_and_nesting() {
    assert_eq!(eval("let [x = 10, [y] = [20]] = [undefined]; x + y"), HostValue::Int(30));
    assert_eq!(eval("let {p: {q = 5} = {}} = {}; q"), HostValue::Int(5));
    assert_eq!(eval("let [first, ...others] = [1, 2, 3]; others.length"), HostValue::Int(2));
    assert_eq!(eval("function f({a, b = a + 1}) { return b; } f({a: 2})"), HostValue::Int(3));
}

#[test]
fn closures_capture_let_per_iteration() {
    // S4.
    assert_eq!(
        eval("let fns = [];\nfor (let i = 0; i < 3; i++) fns.push(() => i);\nfns.map(f => f());"),
        HostValue::Array(vec![HostValue::Int(0), HostValue::Int(1), HostValue::Int(2)])
    );
}

#[test]
fn closures_share_captured_state() {
    assert_eq!(
        eval("function counter() { let n = 0; return { inc(){ n++; }, get(){ return n; } }; } let c = counter(); c.inc(); c.inc(); c.get()"),
        HostValue::Int(2)
    );
}

#[test]
fn var_hoisting_and_tdz() {
    assert_eq!(eval("function f() { return typeof x; var x = 1; } f()"), HostValue::String("undefined".to_owned()));
    let err = Engine::new().evaluate("{ let probe = before; let before = 1; }").unwrap_err();
    let krait::EngineError::Runtime(e) = err else {
        panic!("expected a runtime error");
    };
    assert_eq!(e.kind, krait::ErrorKind::ReferenceError);
}

#[test]
fn const_rejects_reassignment() {
    let err = Engine::new().evaluate("const k = 1; k = 2;").unwrap_err();
    let krait::EngineError::Runtime(e) = err else {
        panic!("expected a runtime error");
    };
    assert_eq!(e.kind, krait::ErrorKind::TypeError);
}

#[test]
fn template_literals() {
    assert_eq!(eval("let x = 6; `${x} * 7 = ${x * 7}`"), HostValue::String("6 * 7 = 42".to_owned()));
    assert_eq!(
        eval("function tag(strings, v) { return strings[0] + '|' + strings.raw[1] + '|' + v; } tag`a${1}b\\n`"),
        HostValue::String("a|b\\n|1".to_owned())
    );
}

#[test]
fn spread_forms() {
    assert_eq!(eval("let a = [2, 3]; [1, ...a, 4].length"), HostValue::Int(4));
    assert_eq!(eval("function sum(...ns) { return ns.reduce((a, b) => a + b, 0); } sum(...[1, 2, 3], 4)"), HostValue::Int(10));
    assert_eq!(eval("let base = {a: 1}; let merged = {...base, b: 2}; merged.a + merged.b"), HostValue::Int(3));
}

#[test]
fn getters_and_setters() {
    assert_eq!(
        eval("let store = 0; let o = { get v() { return store; }, set v(x) { store = x * 2; } }; o.v = 21; o.v"),
        HostValue::Int(42)
    );
}

#[test]
fn prototype_chain_setter_runs() {
    assert_eq!(
        eval(
            "let hits = [];\nlet proto = { set p(v) { hits.push(v); } };\nlet o = Object.create(proto);\no.p = 1;\nhits.length"
        ),
        HostValue::Int(1)
    );
}

#[test]
fn classes_with_inheritance() {
    let src = "
        class Animal {
          constructor(name) { this.name = name; }
          speak() { return this.name + ' makes a sound'; }
          static kind() { return 'animal'; }
        }
        class Dog extends Animal {
          constructor(name) { super(name); this.legs = 4; }
          speak() { return super.speak() + ': woof'; }
        }
        let d = new Dog('rex');
        [d.speak(), d.legs, d instanceof Dog, d instanceof Animal, Animal.kind()]
    ";
    assert_eq!(
        eval(src),
        HostValue::Array(vec![
            HostValue::String("rex makes a sound: woof".to_owned()),
            HostValue::Int(4),
            HostValue::Bool(true),
            HostValue::Bool(true),
            HostValue::String("animal".to_owned()),
        ])
    );
}

#[test]
fn class_fields_and_private_names() {
    let src = "
        class Counter {
          count = 0;
          #secret = 7;
          bump() { this.count += 1; return this; }
          reveal() { return this.#secret; }
        }
        let c = new Counter();
        c.bump().bump();
        [c.count, c.reveal()]
    ";
    assert_eq!(eval(src), HostValue::Array(vec![HostValue::Int(2), HostValue::Int(7)]));
}

#[test]
fn labeled_breaks() {
    let src = "
        let found = null;
        outer: for (let i = 0; i < 3; i++) {
          for (let j = 0; j < 3; j++) {
            if (i * 3 + j === 4) { found = [i, j]; break outer; }
          }
        }
        found
    ";
    assert_eq!(eval(src), HostValue::Array(vec![HostValue::Int(1), HostValue::Int(1)]));
}

#[test]
fn switch_fallthrough_and_default() {
    let src = "
        function describe(x) {
          let out = [];
          switch (x) {
            case 1: out.push('one');
            case 2: out.push('two'); break;
            default: out.push('other');
          }
          return out.join(',');
        }
        [describe(1), describe(2), describe(9)]
    ";
    assert_eq!(
        eval(src),
        HostValue::Array(vec![
            HostValue::String("one,two".to_owned()),
            HostValue::String("two".to_owned()),
            HostValue::String("other".to_owned()),
        ])
    );
}

#[test]
fn try_finally_replaces_completion() {
    assert_eq!(
        eval("function f() { try { throw 'x'; } finally { return 'finally wins'; } } f()"),
        HostValue::String("finally wins".to_owned())
    );
    assert_eq!(
        eval("let log = []; function g() { try { return 'r'; } finally { log.push('f'); } } [g(), log[0]]"),
        HostValue::Array(vec![HostValue::String("r".to_owned()), HostValue::String("f".to_owned())])
    );
}

#[test]
fn catch_receives_thrown_value_verbatim() {
    assert_eq!(eval("try { throw 42; } catch (e) { e }"), HostValue::Int(42));
    assert_eq!(eval("try { throw {code: 7}; } catch ({code}) { code }"), HostValue::Int(7));
}

#[test]
fn for_in_walks_enumerable_keys() {
    assert_eq!(
        eval("let seen = []; for (const k in {x: 1, y: 2}) seen.push(k); seen.join(',')"),
        HostValue::String("x,y".to_owned())
    );
}

#[test]
fn for_of_uses_iterator_protocol() {
    let src = "
        let calls = [];
        let iterable = {
          [Symbol.iterator]() {
            let i = 0;
            return { next() { calls.push('next'); return i < 2 ? {value: i++, done: false} : {value: undefined, done: true}; } };
          }
        };
        let out = [];
        for (const v of iterable) out.push(v);
        [out.join(','), calls.length]
    ";
    assert_eq!(
        eval(src),
        HostValue::Array(vec![HostValue::String("0,1".to_owned()), HostValue::Int(3)])
    );
}

#[test]
fn iterator_return_called_on_break() {
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
        for (const v of iterable) break;
        closed
    ";
    assert_eq!(eval(src), HostValue::Bool(true));
}

#[test]
fn number_string_round_trip() {
    assert_eq!(eval("Number(String(123.456)) === 123.456"), HostValue::Bool(true));
    assert_eq!(eval("Number(String(-0.5)) === -0.5"), HostValue::Bool(true));
    assert_eq!(eval("BigInt(String(12345678901234567890n)) === 12345678901234567890n"), HostValue::Bool(true));
}

#[test]
fn bigint_arithmetic_never_mixes() {
    assert_eq!(eval("2n ** 64n > 0n"), HostValue::Bool(true));
    assert_eq!(eval("(10n / 3n)"), HostValue::BigInt(num_bigint_value(3)));
    let err = Engine::new().evaluate("1n + 1").unwrap_err();
    let krait::EngineError::Runtime(e) = err else {
        panic!("expected a runtime error");
    };
    assert_eq!(e.kind, krait::ErrorKind::TypeError);
}

fn num_bigint_value(v: i64) -> num_bigint::BigInt {
    num_bigint::BigInt::from(v)
}
