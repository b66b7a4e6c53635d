//! `String` statics and `String.prototype`.
//!
//! Methods operate on `this` coerced to a string; indexing is by code point
//! (`chars()`), which trades exact UTF-16 index arithmetic for simplicity.

use crate::{
    builtins::{Builtin, CtorFn, define_method, define_symbol_method, install_ctor},
    error::RunResult,
    eval::Interp,
    types::{ClassTag, JsObject, NativeIter, NativeIterKind, ObjectPayload, PropKey},
    value::{SymbolId, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringFn {
    FromCharCode,
    FromCodePoint,
    Raw,
    CharAt,
    CharCodeAt,
    CodePointAt,
    Concat,
    Includes,
    StartsWith,
    EndsWith,
    IndexOf,
    LastIndexOf,
    Slice,
    Substring,
    ToUpperCase,
    ToLowerCase,
    Trim,
    TrimStart,
    TrimEnd,
    PadStart,
    PadEnd,
    Repeat,
    Split,
    Replace,
    ReplaceAll,
    Match,
    Search,
    At,
    ToString,
    ValueOf,
    Iterator,
}

fn this_string(interp: &mut Interp, this: Value) -> RunResult<String> {
    if let Some(s) = interp.string_content(this) {
        return Ok(s);
    }
    interp.to_string_value(this)
}

/// Normalizes a possibly negative relative index against `len`.
fn relative_index(index: f64, len: usize) -> usize {
    if index < 0.0 {
        let from_end = len as f64 + index;
        if from_end < 0.0 { 0 } else { from_end as usize }
    } else {
        (index as usize).min(len)
    }
}

pub(crate) fn call(interp: &mut Interp, f: StringFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let arg0 = args.first().copied().unwrap_or(Value::Undefined);
    match f {
        StringFn::FromCharCode => {
            let mut out = String::with_capacity(args.len());
            for arg in args {
                let code = interp.to_number(*arg)?;
                let code = crate::types::buffer::to_uint32(code) & 0xffff;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            Ok(interp.alloc_string(out))
        }
        StringFn::FromCodePoint => {
            let mut out = String::with_capacity(args.len());
            for arg in args {
                let code = interp.to_number(*arg)?;
                if code.fract() != 0.0 || !(0.0..=1_114_111.0).contains(&code) {
                    return Err(interp.throw_range_error("invalid code point"));
                }
                out.push(char::from_u32(code as u32).unwrap_or('\u{fffd}'));
            }
            Ok(interp.alloc_string(out))
        }
        StringFn::Raw => {
            let raw_key = PropKey::Str(interp.interns.intern("raw"));
            let raw = interp.get_property(arg0, raw_key)?;
            let segments = interp.iterate_collect(raw)?;
            let mut out = String::new();
            for (i, segment) in segments.iter().enumerate() {
                out.push_str(&interp.to_string_value(*segment)?);
                if let Some(substitution) = args.get(i + 1) {
                    if i + 1 < segments.len() {
                        out.push_str(&interp.to_string_value(*substitution)?);
                    }
                }
            }
            Ok(interp.alloc_string(out))
        }
        StringFn::CharAt => {
            let s = this_string(interp, this)?;
            let index = interp.to_integer_or_infinity(arg0)?;
            let c = if index < 0.0 { None } else { s.chars().nth(index as usize) };
            Ok(interp.alloc_string(c.map(|c| c.to_string()).unwrap_or_default()))
        }
        StringFn::CharCodeAt | StringFn::CodePointAt => {
            let s = this_string(interp, this)?;
            let index = interp.to_integer_or_infinity(arg0)?;
            let c = if index < 0.0 { None } else { s.chars().nth(index as usize) };
            match c {
                Some(c) => Ok(Value::Number(f64::from(c as u32))),
                None => Ok(if f == StringFn::CharCodeAt {
                    Value::Number(f64::NAN)
                } else {
                    Value::Undefined
                }),
            }
        }
        StringFn::Concat => {
            let mut s = this_string(interp, this)?;
            for arg in args {
                s.push_str(&interp.to_string_value(*arg)?);
            }
            Ok(interp.alloc_string(s))
        }
        StringFn::Includes => {
            let s = this_string(interp, this)?;
            let needle = interp.to_string_value(arg0)?;
            Ok(Value::Bool(s.contains(&needle)))
        }
        StringFn::StartsWith => {
            let s = this_string(interp, this)?;
            let needle = interp.to_string_value(arg0)?;
            let offset = match args.get(1) {
                Some(v) => interp.to_integer_or_infinity(*v)?.max(0.0) as usize,
                None => 0,
            };
            let tail: String = s.chars().skip(offset).collect();
            Ok(Value::Bool(tail.starts_with(&needle)))
        }
        StringFn::EndsWith => {
            let s = this_string(interp, this)?;
            let needle = interp.to_string_value(arg0)?;
            let end = match args.get(1) {
                Some(v) => relative_index(interp.to_integer_or_infinity(*v)?, s.chars().count()),
                None => s.chars().count(),
            };
            let head: String = s.chars().take(end).collect();
            Ok(Value::Bool(head.ends_with(&needle)))
        }
        StringFn::IndexOf => {
            let s = this_string(interp, this)?;
            let needle = interp.to_string_value(arg0)?;
            match s.find(&needle) {
                Some(byte_pos) => Ok(Value::Number(s[..byte_pos].chars().count() as f64)),
                None => Ok(Value::Number(-1.0)),
            }
        }
        StringFn::LastIndexOf => {
            let s = this_string(interp, this)?;
            let needle = interp.to_string_value(arg0)?;
            match s.rfind(&needle) {
                Some(byte_pos) => Ok(Value::Number(s[..byte_pos].chars().count() as f64)),
                None => Ok(Value::Number(-1.0)),
            }
        }
        StringFn::Slice => {
            let s = this_string(interp, this)?;
            let len = s.chars().count();
            let start = match args.first() {
                Some(v) => relative_index(interp.to_integer_or_infinity(*v)?, len),
                None => 0,
            };
            let end = match args.get(1).copied() {
                None | Some(Value::Undefined) => len,
                Some(v) => relative_index(interp.to_integer_or_infinity(v)?, len),
            };
            let out: String = s.chars().skip(start).take(end.saturating_sub(start)).collect();
            Ok(interp.alloc_string(out))
        }
        StringFn::Substring => {
            let s = this_string(interp, this)?;
            let len = s.chars().count();
            let mut start = match args.first() {
                Some(v) => (interp.to_integer_or_infinity(*v)?.max(0.0) as usize).min(len),
                None => 0,
            };
            let mut end = match args.get(1).copied() {
                None | Some(Value::Undefined) => len,
                Some(v) => (interp.to_integer_or_infinity(v)?.max(0.0) as usize).min(len),
            };
            if start > end {
                std::mem::swap(&mut start, &mut end);
            }
            let out: String = s.chars().skip(start).take(end - start).collect();
            Ok(interp.alloc_string(out))
        }
        StringFn::ToUpperCase => {
            let s = this_string(interp, this)?;
            Ok(interp.alloc_string(s.to_uppercase()))
        }
        StringFn::ToLowerCase => {
            let s = this_string(interp, this)?;
            Ok(interp.alloc_string(s.to_lowercase()))
        }
        StringFn::Trim => {
            let s = this_string(interp, this)?;
            Ok(interp.alloc_string(s.trim().to_owned()))
        }
        StringFn::TrimStart => {
            let s = this_string(interp, this)?;
            Ok(interp.alloc_string(s.trim_start().to_owned()))
        }
        StringFn::TrimEnd => {
            let s = this_string(interp, this)?;
            Ok(interp.alloc_string(s.trim_end().to_owned()))
        }
        StringFn::PadStart | StringFn::PadEnd => {
            let s = this_string(interp, this)?;
            let target = interp.to_integer_or_infinity(arg0)?.max(0.0) as usize;
            let pad = match args.get(1).copied() {
                None | Some(Value::Undefined) => " ".to_owned(),
                Some(v) => interp.to_string_value(v)?,
            };
            let len = s.chars().count();
            if target <= len || pad.is_empty() {
                return Ok(interp.alloc_string(s));
            }
            let fill: String = pad.chars().cycle().take(target - len).collect();
            let out = if f == StringFn::PadStart {
                format!("{fill}{s}")
            } else {
                format!("{s}{fill}")
            };
            Ok(interp.alloc_string(out))
        }
        StringFn::Repeat => {
            let s = this_string(interp, this)?;
            let count = interp.to_integer_or_infinity(arg0)?;
            if count < 0.0 || !count.is_finite() {
                return Err(interp.throw_range_error("invalid repeat count"));
            }
            Ok(interp.alloc_string(s.repeat(count as usize)))
        }
        StringFn::Split => {
            let s = this_string(interp, this)?;
            let limit = match args.get(1).copied() {
                None | Some(Value::Undefined) => usize::MAX,
                Some(v) => interp.to_number(v)? as usize,
            };
            // Regex separators delegate to the regex engine.
            if let Value::Ref(id) = arg0 {
                if interp.heap.is_regexp(id) {
                    return super::regexp::split_with_regexp(interp, id, &s, limit);
                }
            }
            let parts: Vec<Value> = match arg0 {
                Value::Undefined => vec![interp.alloc_string(s)],
                _ => {
                    let sep = interp.to_string_value(arg0)?;
                    if sep.is_empty() {
                        s.chars()
                            .take(limit)
                            .map(|c| interp.alloc_string(c.to_string()))
                            .collect()
                    } else {
                        s.split(&sep as &str)
                            .take(limit)
                            .map(|part| interp.alloc_string(part.to_owned()))
                            .collect()
                    }
                }
            };
            Ok(interp.new_array(parts))
        }
        StringFn::Replace | StringFn::ReplaceAll => {
            let s = this_string(interp, this)?;
            let all = f == StringFn::ReplaceAll;
            if let Value::Ref(id) = arg0 {
                if interp.heap.is_regexp(id) {
                    let replacement = args.get(1).copied().unwrap_or(Value::Undefined);
                    return super::regexp::replace_with_regexp(interp, id, &s, replacement, all);
                }
            }
            let pattern = interp.to_string_value(arg0)?;
            let replacement_val = args.get(1).copied().unwrap_or(Value::Undefined);
            if interp.is_callable(replacement_val) {
                let mut out = String::new();
                let mut rest = s.as_str();
                loop {
                    match rest.find(&pattern) {
                        Some(pos) if !pattern.is_empty() => {
                            out.push_str(&rest[..pos]);
                            let matched = interp.alloc_string(pattern.clone());
                            let index = Value::Number(out.chars().count() as f64);
                            let whole = interp.alloc_string(s.clone());
                            let result =
                                interp.call_value(replacement_val, Value::Undefined, &[matched, index, whole])?;
                            out.push_str(&interp.to_string_value(result)?);
                            rest = &rest[pos + pattern.len()..];
                            if !all {
                                break;
                            }
                        }
                        _ => break,
                    }
                }
                out.push_str(rest);
                return Ok(interp.alloc_string(out));
            }
            let replacement = interp.to_string_value(replacement_val)?;
            let out = if all {
                s.replace(&pattern as &str, &replacement)
            } else {
                s.replacen(&pattern as &str, &replacement, 1)
            };
            Ok(interp.alloc_string(out))
        }
        StringFn::Match => {
            let Value::Ref(id) = arg0 else {
                return Err(interp.throw_type_error("String.prototype.match expects a RegExp"));
            };
            if !interp.heap.is_regexp(id) {
                return Err(interp.throw_type_error("String.prototype.match expects a RegExp"));
            }
            let s = this_string(interp, this)?;
            super::regexp::match_with_regexp(interp, id, &s)
        }
        StringFn::Search => {
            let Value::Ref(id) = arg0 else {
                return Err(interp.throw_type_error("String.prototype.search expects a RegExp"));
            };
            let s = this_string(interp, this)?;
            super::regexp::search_with_regexp(interp, id, &s)
        }
        StringFn::At => {
            let s = this_string(interp, this)?;
            let len = s.chars().count();
            let index = interp.to_integer_or_infinity(arg0)?;
            let index = if index < 0.0 { len as f64 + index } else { index };
            if index < 0.0 || index >= len as f64 {
                return Ok(Value::Undefined);
            }
            let c = s.chars().nth(index as usize).expect("bounds checked");
            Ok(interp.alloc_string(c.to_string()))
        }
        StringFn::ToString | StringFn::ValueOf => {
            let s = this_string(interp, this)?;
            Ok(interp.alloc_string(s))
        }
        StringFn::Iterator => {
            let s = this_string(interp, this)?;
            let target = interp.alloc_string(s);
            let proto = interp.realm.iterator_proto;
            let obj = JsObject::with_payload(
                ClassTag::Iterator,
                Some(proto),
                ObjectPayload::NativeIter(NativeIter::new(NativeIterKind::StringChars, target)),
            );
            Ok(Value::Ref(interp.heap.alloc_object(obj)))
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.string_proto;
    let methods: &[(&str, StringFn, usize)] = &[
        ("charAt", StringFn::CharAt, 1),
        ("charCodeAt", StringFn::CharCodeAt, 1),
        ("codePointAt", StringFn::CodePointAt, 1),
        ("concat", StringFn::Concat, 1),
        ("includes", StringFn::Includes, 1),
        ("startsWith", StringFn::StartsWith, 1),
        ("endsWith", StringFn::EndsWith, 1),
        ("indexOf", StringFn::IndexOf, 1),
        ("lastIndexOf", StringFn::LastIndexOf, 1),
        ("slice", StringFn::Slice, 2),
        ("substring", StringFn::Substring, 2),
        ("toUpperCase", StringFn::ToUpperCase, 0),
        ("toLowerCase", StringFn::ToLowerCase, 0),
        ("trim", StringFn::Trim, 0),
        ("trimStart", StringFn::TrimStart, 0),
        ("trimEnd", StringFn::TrimEnd, 0),
        ("padStart", StringFn::PadStart, 2),
        ("padEnd", StringFn::PadEnd, 2),
        ("repeat", StringFn::Repeat, 1),
        ("split", StringFn::Split, 2),
        ("replace", StringFn::Replace, 2),
        ("replaceAll", StringFn::ReplaceAll, 2),
        ("match", StringFn::Match, 1),
        ("search", StringFn::Search, 1),
        ("at", StringFn::At, 1),
        ("toString", StringFn::ToString, 0),
        ("valueOf", StringFn::ValueOf, 0),
    ];
    for (name, f, length) in methods {
        define_method(interp, proto, name, Builtin::StringB(*f), *length);
    }
    define_symbol_method(
        interp,
        proto,
        SymbolId::ITERATOR,
        "[Symbol.iterator]",
        Builtin::StringB(StringFn::Iterator),
    );

    let ctor = install_ctor(interp, "String", CtorFn::String, proto, 1);
    define_method(interp, ctor, "fromCharCode", Builtin::StringB(StringFn::FromCharCode), 1);
    define_method(interp, ctor, "fromCodePoint", Builtin::StringB(StringFn::FromCodePoint), 1);
    define_method(interp, ctor, "raw", Builtin::StringB(StringFn::Raw), 1);
}
