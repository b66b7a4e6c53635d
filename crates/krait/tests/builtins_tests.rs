//! Standard library coverage.

use krait::{Engine, HostValue};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> HostValue {
    Engine::new().evaluate(src).unwrap()
}

#[test]
fn math_functions() {
    assert_eq!(eval("Math.floor(2.7)"), HostValue::Int(2));
    assert_eq!(eval("Math.ceil(2.1)"), HostValue::Int(3));
    assert_eq!(eval("Math.round(2.5)"), HostValue::Int(3));
    assert_eq!(eval("Math.round(-2.5)"), HostValue::Int(-2));
    assert_eq!(eval("Math.max(1, 9, 3)"), HostValue::Int(9));
    assert_eq!(eval("Math.min()"), HostValue::Float(f64::INFINITY));
    assert_eq!(eval("Math.hypot(3, 4)"), HostValue::Int(5));
    assert_eq!(eval("Math.sign(-3)"), HostValue::Int(-1));
    assert_eq!(eval("Math.abs(Math.fround(1.5) - 1.5) < 1e-9"), HostValue::Bool(true));
    assert_eq!(eval("Math.sqrt(Math.PI) > 1.77"), HostValue::Bool(true));
    assert_eq!(eval("Math.imul(3, 4)"), HostValue::Int(12));
    assert_eq!(eval("Math.clz32(1)"), HostValue::Int(31));
    assert_eq!(eval("Math.sinh(0)"), HostValue::Int(0));
}

#[test]
fn math_random_is_in_unit_range() {
    assert_eq!(eval("let r = Math.random(); r >= 0 && r < 1"), HostValue::Bool(true));
}

#[test]
fn json_round_trip() {
    assert_eq!(
        eval("JSON.stringify(JSON.parse('{\"a\":[1,2,{\"b\":null}],\"c\":\"x\"}'))"),
        HostValue::String("{\"a\":[1,2,{\"b\":null}],\"c\":\"x\"}".to_owned())
    );
    assert_eq!(
        eval("let x = {n: 1.5, s: 'hi', b: true, z: null, arr: [1]}; JSON.parse(JSON.stringify(x)).n"),
        HostValue::Float(1.5)
    );
}

#[test]
fn json_stringify_details() {
    assert_eq!(eval("JSON.stringify(undefined)"), HostValue::Undefined);
    assert_eq!(eval("JSON.stringify({u: undefined, f: () => 1})"), HostValue::String("{}".to_owned()));
    assert_eq!(eval("JSON.stringify([undefined])"), HostValue::String("[null]".to_owned()));
    assert_eq!(eval("JSON.stringify(NaN)"), HostValue::String("null".to_owned()));
    assert_eq!(
        eval("JSON.stringify({a: 1}, null, 2)"),
        HostValue::String("{\n  \"a\": 1\n}".to_owned())
    );
    let err = Engine::new().evaluate("let o = {}; o.self = o; JSON.stringify(o)").unwrap_err();
    let krait::EngineError::Runtime(e) = err else {
        panic!("expected a runtime error");
    };
    assert_eq!(e.kind, krait::ErrorKind::TypeError);
}

#[test]
fn array_methods() {
    assert_eq!(eval("[3, 1, 2].sort().join(',')"), HostValue::String("1,2,3".to_owned()));
    assert_eq!(eval("[3, 1, 2].sort((a, b) => b - a).join(',')"), HostValue::String("3,2,1".to_owned()));
    assert_eq!(eval("[1, 2, 3, 4].filter(x => x % 2 === 0).join(',')"), HostValue::String("2,4".to_owned()));
    assert_eq!(eval("[1, 2, 3].reduce((a, b) => a + b)"), HostValue::Int(6));
    assert_eq!(eval("[[1, 2], [3, [4]]].flat(2).join(',')"), HostValue::String("1,2,3,4".to_owned()));
    assert_eq!(eval("[1, 2, 3].includes(2)"), HostValue::Bool(true));
    assert_eq!(eval("[NaN].includes(NaN)"), HostValue::Bool(true));
    assert_eq!(eval("[NaN].indexOf(NaN)"), HostValue::Int(-1));
    assert_eq!(eval("[1, 2, 3].at(-1)"), HostValue::Int(3));
    assert_eq!(eval("let a = [1, 2, 3]; let b = a.with(1, 9); a.join('') + '|' + b.join('')"), HostValue::String("123|193".to_owned()));
    assert_eq!(eval("let a = [3, 1]; let b = a.toSorted(); a.join('') + '|' + b.join('')"), HostValue::String("31|13".to_owned()));
    assert_eq!(eval("[1, 2, 3].toReversed().join('')"), HostValue::String("321".to_owned()));
    assert_eq!(eval("[1, 2, 3, 4].toSpliced(1, 2, 'x').join(',')"), HostValue::String("1,x,4".to_owned()));
    assert_eq!(eval("Array.from('abc').join('-')"), HostValue::String("a-b-c".to_owned()));
    assert_eq!(eval("Array.from([1, 2], x => x * 10).join(',')"), HostValue::String("10,20".to_owned()));
    assert_eq!(eval("Array.of(7, 8).length"), HostValue::Int(2));
    assert_eq!(eval("let s = [1,2,3,4].splice(1, 2); s.join(',')"), HostValue::String("2,3".to_owned()));
    assert_eq!(eval("[...[1, 2].entries()].map(e => e.join(':')).join(',')"), HostValue::String("0:1,1:2".to_owned()));
}

#[test]
fn array_length_truncates() {
    assert_eq!(eval("let a = [1, 2, 3]; a.length = 1; a.join(',')"), HostValue::String("1".to_owned()));
    assert_eq!(eval("let a = []; a[3] = 'x'; a.length"), HostValue::Int(4));
}

#[test]
fn string_methods() {
    assert_eq!(eval("'Hello'.toUpperCase()"), HostValue::String("HELLO".to_owned()));
    assert_eq!(eval("'  pad  '.trim()"), HostValue::String("pad".to_owned()));
    assert_eq!(eval("'abc'.padStart(5, '0')"), HostValue::String("00abc".to_owned()));
    assert_eq!(eval("'ab'.repeat(3)"), HostValue::String("ababab".to_owned()));
    assert_eq!(eval("'a,b,,c'.split(',').length"), HostValue::Int(4));
    assert_eq!(eval("'hello'.split('').join('|')"), HostValue::String("h|e|l|l|o".to_owned()));
    assert_eq!(eval("'hello world'.replace('o', '0')"), HostValue::String("hell0 world".to_owned()));
    assert_eq!(eval("'hello world'.replaceAll('o', '0')"), HostValue::String("hell0 w0rld".to_owned()));
    assert_eq!(eval("'abcdef'.slice(1, -1)"), HostValue::String("bcde".to_owned()));
    assert_eq!(eval("'abc'.at(-1)"), HostValue::String("c".to_owned()));
    assert_eq!(eval("'abc'.charCodeAt(0)"), HostValue::Int(97));
    assert_eq!(eval("String.fromCharCode(104, 105)"), HostValue::String("hi".to_owned()));
    assert_eq!(eval("'abc'.includes('bc')"), HostValue::Bool(true));
    assert_eq!(eval("'abc'.indexOf('c')"), HostValue::Int(2));
    assert_eq!(eval("[...'ab'].join('/')"), HostValue::String("a/b".to_owned()));
    assert_eq!(eval("'x'.concat('y', 'z')"), HostValue::String("xyz".to_owned()));
}

#[test]
fn regexp_matching() {
    assert_eq!(eval("/a+b/.test('caaab')"), HostValue::Bool(true));
    assert_eq!(eval("/^a+b$/.test('caaab')"), HostValue::Bool(false));
    assert_eq!(eval("let m = /(\\d+)-(\\d+)/.exec('id 12-34'); m[1] + ':' + m[2]"), HostValue::String("12:34".to_owned()));
    assert_eq!(eval("/(\\d+)/.exec('a 42 b').index"), HostValue::Int(2));
    assert_eq!(eval("'a1b2c3'.match(/\\d/g).join('')"), HostValue::String("123".to_owned()));
    assert_eq!(eval("'2024-01-02'.split(/-/).join('/')"), HostValue::String("2024/01/02".to_owned()));
    assert_eq!(eval("'aaa'.replace(/a/g, 'b')"), HostValue::String("bbb".to_owned()));
    assert_eq!(eval("'john smith'.replace(/(\\w+) (\\w+)/, '$2 $1')"), HostValue::String("smith john".to_owned()));
    assert_eq!(eval("'AbC'.search(/b/i)"), HostValue::Int(1));
    assert_eq!(eval("new RegExp('x+', 'i').test('XX')"), HostValue::Bool(true));
    assert_eq!(eval("let re = /a/g; re.exec('aa'); re.lastIndex"), HostValue::Int(1));
}

#[test]
fn map_and_set() {
    assert_eq!(
        eval("let m = new Map([[1, 'one']]); m.set('k', 'v'); [m.get(1), m.get('k'), m.size, m.has(2)].join(',')"),
        HostValue::String("one,v,2,false".to_owned())
    );
    assert_eq!(eval("let m = new Map(); m.set(NaN, 'n'); m.get(NaN)"), HostValue::String("n".to_owned()));
    assert_eq!(
        eval("let s = new Set([1, 2, 2, 3]); s.add(1); [s.size, s.has(2)].join(',')"),
        HostValue::String("3,true".to_owned())
    );
    assert_eq!(
        eval("let m = new Map([['a', 1], ['b', 2]]); [...m.keys()].join(',')"),
        HostValue::String("a,b".to_owned())
    );
    assert_eq!(
        eval("let out = []; for (const [k, v] of new Map([['x', 1]])) out.push(k, v); out.join(',')"),
        HostValue::String("x,1".to_owned())
    );
    assert_eq!(
        eval("let o = {}; let wm = new WeakMap(); wm.set(o, 'val'); wm.get(o)"),
        HostValue::String("val".to_owned())
    );
    let err = Engine::new().evaluate("new WeakSet().add(1)").unwrap_err();
    assert!(matches!(err, krait::EngineError::Runtime(_)));
}

#[test]
fn object_statics() {
    assert_eq!(eval("Object.keys({a: 1, b: 2}).join(',')"), HostValue::String("a,b".to_owned()));
    assert_eq!(eval("Object.values({a: 1, b: 2}).join(',')"), HostValue::String("1,2".to_owned()));
    assert_eq!(
        eval("Object.entries({a: 1}).map(e => e.join('=')).join(',')"),
        HostValue::String("a=1".to_owned())
    );
    assert_eq!(eval("Object.assign({}, {a: 1}, {b: 2}).b"), HostValue::Int(2));
    assert_eq!(eval("let o = Object.freeze({a: 1}); o.a = 9; o.a"), HostValue::Int(1));
    assert_eq!(eval("Object.isFrozen(Object.freeze({}))"), HostValue::Bool(true));
    assert_eq!(eval("Object.getPrototypeOf([]) === Array.prototype"), HostValue::Bool(true));
    assert_eq!(eval("Object.fromEntries([['k', 'v']]).k"), HostValue::String("v".to_owned()));
    assert_eq!(eval("Object.is(NaN, NaN)"), HostValue::Bool(true));
    assert_eq!(eval("Object.is(0, -0)"), HostValue::Bool(false));
    assert_eq!(
        eval("let o = {}; Object.defineProperty(o, 'x', {value: 1, enumerable: false}); [o.x, Object.keys(o).length].join(',')"),
        HostValue::String("1,0".to_owned())
    );
    assert_eq!(
        eval("let o = {get g() { return 9; }}; Object.getOwnPropertyDescriptor(o, 'g').get !== undefined"),
        HostValue::Bool(true)
    );
}

#[test]
fn object_to_string_tags() {
    assert_eq!(eval("Object.prototype.toString.call([])"), HostValue::String("[object Array]".to_owned()));
    assert_eq!(eval("Object.prototype.toString.call(null)"), HostValue::String("[object Null]".to_owned()));
    assert_eq!(eval("({}).toString()"), HostValue::String("[object Object]".to_owned()));
}

#[test]
fn number_builtins() {
    assert_eq!(eval("Number.isInteger(5)"), HostValue::Bool(true));
    assert_eq!(eval("Number.isInteger(5.5)"), HostValue::Bool(false));
    assert_eq!(eval("Number.isNaN(NaN)"), HostValue::Bool(true));
    assert_eq!(eval("Number.isNaN('x')"), HostValue::Bool(false));
    assert_eq!(eval("(255).toString(16)"), HostValue::String("ff".to_owned()));
    assert_eq!(eval("(3.14159).toFixed(2)"), HostValue::String("3.14".to_owned()));
    assert_eq!(eval("Number.MAX_SAFE_INTEGER"), HostValue::Int(9_007_199_254_740_991));
    assert_eq!(eval("Number('12.5')"), HostValue::Float(12.5));
    assert_eq!(eval("parseInt('42px')"), HostValue::Int(42));
    assert_eq!(eval("parseFloat('3.5rem')"), HostValue::Float(3.5));
    assert_eq!(eval("isNaN('abc')"), HostValue::Bool(true));
    assert_eq!(eval("isFinite('10')"), HostValue::Bool(true));
}

#[test]
fn function_call_apply_bind() {
    assert_eq!(
        eval("function who() { return this.name; } who.call({name: 'a'}) + who.apply({name: 'b'})"),
        HostValue::String("ab".to_owned())
    );
    assert_eq!(
        eval("function add(a, b) { return a + b; } let add5 = add.bind(null, 5); add5(3)"),
        HostValue::Int(8)
    );
    assert_eq!(
        eval("function who() { return this.tag; } let bound = who.bind({tag: 'fixed'}); bound.call({tag: 'other'})"),
        HostValue::String("fixed".to_owned())
    );
}

#[test]
fn symbols_and_registry() {
    assert_eq!(eval("typeof Symbol('x')"), HostValue::String("symbol".to_owned()));
    assert_eq!(eval("Symbol('a') === Symbol('a')"), HostValue::Bool(false));
    assert_eq!(eval("Symbol.for('k') === Symbol.for('k')"), HostValue::Bool(true));
    assert_eq!(eval("Symbol.keyFor(Symbol.for('reg'))"), HostValue::String("reg".to_owned()));
    assert_eq!(
        eval("let s = Symbol('id'); let o = {[s]: 7}; o[s]"),
        HostValue::Int(7)
    );
}

#[test]
fn date_builtin() {
    assert_eq!(
        eval("new Date(0).toISOString()"),
        HostValue::String("1970-01-01T00:00:00.000Z".to_owned())
    );
    assert_eq!(eval("new Date('2024-03-05T06:07:08Z').getFullYear()"), HostValue::Int(2024));
    assert_eq!(eval("new Date(2020, 0, 2).getMonth()"), HostValue::Int(0));
    assert_eq!(eval("new Date(86400000).getTime()"), HostValue::Int(86_400_000));
    assert_eq!(eval("Date.parse('1970-01-02T00:00:00Z')"), HostValue::Int(86_400_000));
    assert_eq!(eval("typeof Date.now()"), HostValue::String("number".to_owned()));
    assert_eq!(
        eval("JSON.stringify({t: new Date(0)})"),
        HostValue::String("{\"t\":\"1970-01-01T00:00:00.000Z\"}".to_owned())
    );
}

#[test]
fn typed_arrays_share_buffers() {
    assert_eq!(
        eval("let buf = new ArrayBuffer(8); let a = new Uint8Array(buf); let b = new Uint32Array(buf); a[0] = 255; b[0]"),
        HostValue::Int(255)
    );
    assert_eq!(eval("new Int8Array([1, -1, 200])[2]"), HostValue::Int(-56));
    assert_eq!(eval("new Float64Array(2).length"), HostValue::Int(2));
    assert_eq!(eval("let t = new Uint16Array(4); t.fill(7); t[3]"), HostValue::Int(7));
    assert_eq!(eval("new Uint8Array([1, 2, 3, 4]).subarray(1, 3).length"), HostValue::Int(2));
    assert_eq!(
        eval("let dv = new DataView(new ArrayBuffer(8)); dv.setInt32(0, -5); dv.getInt32(0)"),
        HostValue::Int(-5)
    );
    assert_eq!(eval("new ArrayBuffer(16).byteLength"), HostValue::Int(16));
    assert_eq!(eval("ArrayBuffer.isView(new Uint8Array(1))"), HostValue::Bool(true));
}

#[test]
fn iterators_over_builtin_collections() {
    assert_eq!(eval("[...[10, 20].keys()].join(',')"), HostValue::String("0,1".to_owned()));
    assert_eq!(eval("[...new Set(['a', 'b'])].join('')"), HostValue::String("ab".to_owned()));
    assert_eq!(eval("[...new Uint8Array([5, 6])].join(',')"), HostValue::String("5,6".to_owned()));
}

#[test]
fn error_to_string() {
    assert_eq!(
        eval("new TypeError('msg').toString()"),
        HostValue::String("TypeError: msg".to_owned())
    );
    assert_eq!(eval("new Error().toString()"), HostValue::String("Error".to_owned()));
}
