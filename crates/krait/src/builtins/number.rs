//! `Number`, `Boolean`, and `BigInt` builtins.

use num_bigint::BigInt;

use crate::{
    builtins::{Builtin, CtorFn, define_method, install_ctor},
    error::RunResult,
    eval::{Interp, ops::js_number_to_string},
    heap::HeapData,
    types::{PropKey, Property},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumberFn {
    IsInteger,
    IsFinite,
    IsNaN,
    IsSafeInteger,
    ToFixed,
    ToPrecision,
    ToString,
    ValueOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BooleanFn {
    ToString,
    ValueOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BigIntFn {
    ToString,
    ValueOf,
}

fn this_number(interp: &mut Interp, this: Value, what: &str) -> RunResult<f64> {
    match this {
        Value::Number(n) => Ok(n),
        _ => Err(interp.throw_type_error(format!("{what} requires a number receiver"))),
    }
}

pub(crate) fn call_number(interp: &mut Interp, f: NumberFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        NumberFn::IsInteger => {
            let v = args.first().copied().unwrap_or(Value::Undefined);
            Ok(Value::Bool(matches!(v, Value::Number(n) if n.is_finite() && n.fract() == 0.0)))
        }
        NumberFn::IsFinite => {
            let v = args.first().copied().unwrap_or(Value::Undefined);
            Ok(Value::Bool(matches!(v, Value::Number(n) if n.is_finite())))
        }
        NumberFn::IsNaN => {
            let v = args.first().copied().unwrap_or(Value::Undefined);
            Ok(Value::Bool(matches!(v, Value::Number(n) if n.is_nan())))
        }
        NumberFn::IsSafeInteger => {
            let v = args.first().copied().unwrap_or(Value::Undefined);
            Ok(Value::Bool(
                matches!(v, Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_991.0),
            ))
        }
        NumberFn::ToFixed => {
            let n = this_number(interp, this, "Number.prototype.toFixed")?;
            let digits = match args.first() {
                Some(d) => interp.to_number(*d)? as usize,
                None => 0,
            };
            if digits > 100 {
                return Err(interp.throw_range_error("toFixed() digits argument must be between 0 and 100"));
            }
            Ok(interp.alloc_string(format!("{n:.digits$}")))
        }
        NumberFn::ToPrecision => {
            let n = this_number(interp, this, "Number.prototype.toPrecision")?;
            match args.first().copied() {
                None | Some(Value::Undefined) => Ok(interp.alloc_string(js_number_to_string(n))),
                Some(p) => {
                    let precision = interp.to_number(p)? as usize;
                    if !(1..=100).contains(&precision) {
                        return Err(interp.throw_range_error("toPrecision() argument must be between 1 and 100"));
                    }
                    Ok(interp.alloc_string(format!("{:.*}", precision.saturating_sub(1), n)))
                }
            }
        }
        NumberFn::ToString => {
            let n = this_number(interp, this, "Number.prototype.toString")?;
            let radix = match args.first().copied() {
                None | Some(Value::Undefined) => 10,
                Some(r) => interp.to_number(r)? as u32,
            };
            if radix == 10 {
                return Ok(interp.alloc_string(js_number_to_string(n)));
            }
            if !(2..=36).contains(&radix) {
                return Err(interp.throw_range_error("toString() radix must be between 2 and 36"));
            }
            Ok(interp.alloc_string(number_to_radix_string(n, radix)))
        }
        NumberFn::ValueOf => {
            let n = this_number(interp, this, "Number.prototype.valueOf")?;
            Ok(Value::Number(n))
        }
    }
}

/// Integer-focused radix conversion; fractional digits are emitted to a
/// bounded precision.
fn number_to_radix_string(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let negative = n < 0.0;
    let mut int_part = n.abs().trunc();
    let mut frac_part = n.abs().fract();
    let digits = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut int_digits = Vec::new();
    if int_part == 0.0 {
        int_digits.push(b'0');
    }
    while int_part >= 1.0 {
        let d = (int_part % f64::from(radix)) as usize;
        int_digits.push(digits[d]);
        int_part = (int_part / f64::from(radix)).trunc();
    }
    int_digits.reverse();
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(std::str::from_utf8(&int_digits).expect("ascii digits"));
    if frac_part > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac_part *= f64::from(radix);
            let d = frac_part.trunc() as usize;
            out.push(char::from(digits[d.min(35)]));
            frac_part -= frac_part.trunc();
            if frac_part == 0.0 {
                break;
            }
        }
    }
    out
}

pub(crate) fn call_boolean(interp: &mut Interp, f: BooleanFn, this: Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Bool(b) = this else {
        return Err(interp.throw_type_error("Boolean.prototype method requires a boolean receiver"));
    };
    match f {
        BooleanFn::ToString => Ok(Value::Str(interp.interns.intern(if b { "true" } else { "false" }))),
        BooleanFn::ValueOf => Ok(Value::Bool(b)),
    }
}

pub(crate) fn call_bigint(interp: &mut Interp, f: BigIntFn, this: Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Ref(id) = this else {
        return Err(interp.throw_type_error("BigInt.prototype method requires a BigInt receiver"));
    };
    let HeapData::BigInt(b) = interp.heap.get(id) else {
        return Err(interp.throw_type_error("BigInt.prototype method requires a BigInt receiver"));
    };
    let b = b.clone();
    match f {
        BigIntFn::ToString => Ok(interp.alloc_string(b.to_string())),
        BigIntFn::ValueOf => Ok(this),
    }
}

/// `BigInt(value)` conversion.
pub(crate) fn make_bigint(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let v = args.first().copied().unwrap_or(Value::Undefined);
    match v {
        Value::Number(n) => {
            if !n.is_finite() || n.fract() != 0.0 {
                return Err(interp.throw_range_error("cannot convert a non-integer to a BigInt"));
            }
            Ok(interp.alloc_bigint_value(BigInt::from(n as i128)))
        }
        Value::Bool(b) => Ok(interp.alloc_bigint_value(BigInt::from(i32::from(b)))),
        Value::Ref(id) if matches!(interp.heap.get(id), HeapData::BigInt(_)) => Ok(v),
        _ => {
            if let Some(s) = interp.string_content(v) {
                match s.trim().parse::<BigInt>() {
                    Ok(b) => Ok(interp.alloc_bigint_value(b)),
                    Err(_) => Err(interp.throw_error(
                        crate::error::ErrorKind::SyntaxError,
                        format!("cannot convert '{s}' to a BigInt"),
                    )),
                }
            } else {
                Err(interp.throw_type_error("cannot convert value to a BigInt"))
            }
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    // Number.
    let proto = interp.realm.number_proto;
    define_method(interp, proto, "toFixed", Builtin::NumberB(NumberFn::ToFixed), 1);
    define_method(interp, proto, "toPrecision", Builtin::NumberB(NumberFn::ToPrecision), 1);
    define_method(interp, proto, "toString", Builtin::NumberB(NumberFn::ToString), 1);
    define_method(interp, proto, "valueOf", Builtin::NumberB(NumberFn::ValueOf), 0);
    let ctor = install_ctor(interp, "Number", CtorFn::Number, proto, 1);
    define_method(interp, ctor, "isInteger", Builtin::NumberB(NumberFn::IsInteger), 1);
    define_method(interp, ctor, "isFinite", Builtin::NumberB(NumberFn::IsFinite), 1);
    define_method(interp, ctor, "isNaN", Builtin::NumberB(NumberFn::IsNaN), 1);
    define_method(interp, ctor, "isSafeInteger", Builtin::NumberB(NumberFn::IsSafeInteger), 1);
    define_method(interp, ctor, "parseFloat", Builtin::Global(super::global::GlobalFn::ParseFloat), 1);
    define_method(interp, ctor, "parseInt", Builtin::Global(super::global::GlobalFn::ParseInt), 2);
    let constants: &[(&str, f64)] = &[
        ("MAX_SAFE_INTEGER", 9_007_199_254_740_991.0),
        ("MIN_SAFE_INTEGER", -9_007_199_254_740_991.0),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", f64::MIN_POSITIVE),
        ("EPSILON", f64::EPSILON),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ];
    for (name, value) in constants {
        let key = PropKey::Str(interp.interns.intern(name));
        interp
            .heap
            .object_mut(ctor)
            .define(key, Property::constant(Value::Number(*value)));
    }

    // Boolean.
    let proto = interp.realm.boolean_proto;
    define_method(interp, proto, "toString", Builtin::BooleanB(BooleanFn::ToString), 0);
    define_method(interp, proto, "valueOf", Builtin::BooleanB(BooleanFn::ValueOf), 0);
    install_ctor(interp, "Boolean", CtorFn::Boolean, proto, 1);

    // BigInt.
    let proto = interp.realm.bigint_proto;
    define_method(interp, proto, "toString", Builtin::BigIntB(BigIntFn::ToString), 0);
    define_method(interp, proto, "valueOf", Builtin::BigIntB(BigIntFn::ValueOf), 0);
    install_ctor(interp, "BigInt", CtorFn::BigInt, proto, 1);
}
