//! `RegExp` methods and the String methods that drive them.
//!
//! Matching is byte-offset based through `fancy-regex`; `lastIndex` therefore
//! tracks byte offsets, which agrees with UTF-16 semantics for ASCII and
//! keeps the global-flag protocol (test/exec advancing lastIndex) intact.

use fancy_regex::Regex;

use crate::{
    builtins::{Builtin, CtorFn, define_method, install_ctor},
    error::RunResult,
    eval::Interp,
    heap::HeapId,
    types::{ObjectPayload, PropKey, Property},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegExpFn {
    Test,
    Exec,
    ToString,
}

pub(crate) fn construct_regexp(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let source_arg = args.first().copied().unwrap_or(Value::Undefined);
    // `new RegExp(existing)` copies source and flags.
    if let Value::Ref(id) = source_arg {
        if interp.heap.is_regexp(id) {
            let (source, flags) = regexp_parts(interp, id);
            let flags = match args.get(1).copied() {
                None | Some(Value::Undefined) => flags,
                Some(f) => interp.to_string_value(f)?,
            };
            return interp.new_regexp(&source, &flags);
        }
    }
    let source = match source_arg {
        Value::Undefined => String::new(),
        v => interp.to_string_value(v)?,
    };
    let flags = match args.get(1).copied() {
        None | Some(Value::Undefined) => String::new(),
        Some(f) => interp.to_string_value(f)?,
    };
    interp.new_regexp(&source, &flags)
}

fn regexp_parts(interp: &Interp, id: HeapId) -> (String, String) {
    match &interp.heap.object(id).payload {
        ObjectPayload::RegExp(re) => (re.source.clone(), re.flags.clone()),
        _ => (String::new(), String::new()),
    }
}

fn this_regexp(interp: &mut Interp, this: Value) -> RunResult<HeapId> {
    if let Value::Ref(id) = this {
        if interp.heap.is_regexp(id) {
            return Ok(id);
        }
    }
    Err(interp.throw_type_error("method requires a RegExp receiver"))
}

/// Clones the compiled regex and the sticky/global flags out of the payload.
fn regex_of(interp: &Interp, id: HeapId) -> (Regex, bool, bool) {
    match &interp.heap.object(id).payload {
        ObjectPayload::RegExp(re) => (re.regex.clone(), re.global, re.sticky),
        _ => unreachable!("checked by caller"),
    }
}

fn last_index(interp: &mut Interp, id: HeapId) -> RunResult<usize> {
    let key = PropKey::Str(interp.interns.intern("lastIndex"));
    let v = interp.get_property(Value::Ref(id), key)?;
    let n = interp.to_number(v)?;
    Ok(if n.is_finite() && n >= 0.0 { n as usize } else { 0 })
}

fn set_last_index(interp: &mut Interp, id: HeapId, value: usize) {
    let key = PropKey::Str(interp.interns.intern("lastIndex"));
    interp
        .heap
        .object_mut(id)
        .define(key, Property::method(Value::Number(value as f64)));
}

pub(crate) fn call(interp: &mut Interp, f: RegExpFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let id = this_regexp(interp, this)?;
    match f {
        RegExpFn::ToString => {
            let (source, flags) = regexp_parts(interp, id);
            Ok(interp.alloc_string(format!("/{source}/{flags}")))
        }
        RegExpFn::Test => {
            let text = match args.first() {
                Some(v) => interp.to_string_value(*v)?,
                None => "undefined".to_owned(),
            };
            let result = exec_impl(interp, id, &text)?;
            Ok(Value::Bool(result != Value::Null))
        }
        RegExpFn::Exec => {
            let text = match args.first() {
                Some(v) => interp.to_string_value(*v)?,
                None => "undefined".to_owned(),
            };
            exec_impl(interp, id, &text)
        }
    }
}

/// `exec` result: a match array with `index`/`input`, or null; advances
/// `lastIndex` for global/sticky regexes.
fn exec_impl(interp: &mut Interp, id: HeapId, text: &str) -> RunResult<Value> {
    let (regex, global, sticky) = regex_of(interp, id);
    let start = if global || sticky { last_index(interp, id)? } else { 0 };
    if start > text.len() {
        if global || sticky {
            set_last_index(interp, id, 0);
        }
        return Ok(Value::Null);
    }
    let found = regex
        .captures_from_pos(text, start)
        .map_err(|e| interp.throw_error(crate::error::ErrorKind::SyntaxError, format!("regex error: {e}")))?;
    let Some(captures) = found else {
        if global || sticky {
            set_last_index(interp, id, 0);
        }
        return Ok(Value::Null);
    };
    let whole = captures.get(0).expect("group 0 always present");
    if sticky && whole.start() != start {
        set_last_index(interp, id, 0);
        return Ok(Value::Null);
    }
    if global || sticky {
        set_last_index(interp, id, whole.end().max(whole.start() + 1));
    }
    let mut groups = Vec::with_capacity(captures.len());
    for i in 0..captures.len() {
        groups.push(match captures.get(i) {
            Some(m) => interp.alloc_string(m.as_str().to_owned()),
            None => Value::Undefined,
        });
    }
    let array = interp.new_array(groups);
    let Value::Ref(array_id) = array else { unreachable!() };
    let index_key = PropKey::Str(interp.interns.intern("index"));
    let input_key = PropKey::Str(interp.interns.intern("input"));
    let index_chars = text[..whole.start()].chars().count();
    interp
        .heap
        .object_mut(array_id)
        .define(index_key, Property::data(Value::Number(index_chars as f64)));
    let input = interp.alloc_string(text.to_owned());
    interp.heap.object_mut(array_id).define(input_key, Property::data(input));
    Ok(array)
}

/// `String.prototype.match` support.
pub(crate) fn match_with_regexp(interp: &mut Interp, id: HeapId, text: &str) -> RunResult<Value> {
    let (regex, global, _) = regex_of(interp, id);
    if !global {
        return exec_impl(interp, id, text);
    }
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Ok(Some(m)) = regex.find_from_pos(text, pos) {
        out.push(interp.alloc_string(m.as_str().to_owned()));
        pos = if m.end() > m.start() { m.end() } else { m.end() + 1 };
        if pos > text.len() {
            break;
        }
    }
    set_last_index(interp, id, 0);
    if out.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(interp.new_array(out))
    }
}

/// `String.prototype.search` support.
pub(crate) fn search_with_regexp(interp: &mut Interp, id: HeapId, text: &str) -> RunResult<Value> {
    let regexp_id = if interp.heap.is_regexp(id) {
        id
    } else {
        return Err(interp.throw_type_error("String.prototype.search expects a RegExp"));
    };
    let (regex, _, _) = regex_of(interp, regexp_id);
    match regex.find(text) {
        Ok(Some(m)) => Ok(Value::Number(text[..m.start()].chars().count() as f64)),
        _ => Ok(Value::Number(-1.0)),
    }
}

/// `String.prototype.split` with a RegExp separator.
pub(crate) fn split_with_regexp(interp: &mut Interp, id: HeapId, text: &str, limit: usize) -> RunResult<Value> {
    let (regex, _, _) = regex_of(interp, id);
    let mut parts = Vec::new();
    let mut last = 0usize;
    let mut pos = 0usize;
    while parts.len() < limit {
        match regex.find_from_pos(text, pos) {
            Ok(Some(m)) if m.end() <= text.len() => {
                if m.end() == m.start() {
                    // Zero-width match: advance to avoid an infinite loop.
                    pos = m.end() + 1;
                    if pos > text.len() {
                        break;
                    }
                    continue;
                }
                parts.push(interp.alloc_string(text[last..m.start()].to_owned()));
                last = m.end();
                pos = m.end();
            }
            _ => break,
        }
    }
    if parts.len() < limit {
        parts.push(interp.alloc_string(text[last..].to_owned()));
    }
    Ok(interp.new_array(parts))
}

/// `String.prototype.replace`/`replaceAll` with a RegExp pattern.
pub(crate) fn replace_with_regexp(
    interp: &mut Interp,
    id: HeapId,
    text: &str,
    replacement: Value,
    force_all: bool,
) -> RunResult<Value> {
    let (regex, global, _) = regex_of(interp, id);
    let all = global || force_all;
    let mut out = String::new();
    let mut last = 0usize;
    let mut pos = 0usize;
    loop {
        let found = regex
            .captures_from_pos(text, pos)
            .map_err(|e| interp.throw_error(crate::error::ErrorKind::SyntaxError, format!("regex error: {e}")))?;
        let Some(captures) = found else { break };
        let whole = captures.get(0).expect("group 0 always present");
        out.push_str(&text[last..whole.start()]);
        if interp.is_callable(replacement) {
            let mut call_args = Vec::with_capacity(captures.len() + 2);
            for i in 0..captures.len() {
                call_args.push(match captures.get(i) {
                    Some(m) => interp.alloc_string(m.as_str().to_owned()),
                    None => Value::Undefined,
                });
            }
            call_args.push(Value::Number(text[..whole.start()].chars().count() as f64));
            call_args.push(interp.alloc_string(text.to_owned()));
            let replaced = interp.call_value(replacement, Value::Undefined, &call_args)?;
            out.push_str(&interp.to_string_value(replaced)?);
        } else {
            let template = interp.to_string_value(replacement)?;
            out.push_str(&expand_replacement(&template, &captures, text));
        }
        last = whole.end();
        pos = if whole.end() > whole.start() { whole.end() } else { whole.end() + 1 };
        if !all || pos > text.len() {
            break;
        }
    }
    out.push_str(&text[last..]);
    Ok(interp.alloc_string(out))
}

/// `$&`, `$1`..`$9`, `$$` expansion in replacement templates.
fn expand_replacement(template: &str, captures: &fancy_regex::Captures<'_>, text: &str) -> String {
    let whole = captures.get(0).expect("group 0 always present");
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                out.push('$');
                chars.next();
            }
            Some('&') => {
                out.push_str(whole.as_str());
                chars.next();
            }
            Some('`') => {
                out.push_str(&text[..whole.start()]);
                chars.next();
            }
            Some('\'') => {
                out.push_str(&text[whole.end()..]);
                chars.next();
            }
            Some(d) if d.is_ascii_digit() => {
                let index = d.to_digit(10).expect("digit") as usize;
                chars.next();
                if let Some(m) = captures.get(index) {
                    out.push_str(m.as_str());
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.regexp_proto;
    define_method(interp, proto, "test", Builtin::RegExpB(RegExpFn::Test), 1);
    define_method(interp, proto, "exec", Builtin::RegExpB(RegExpFn::Exec), 1);
    define_method(interp, proto, "toString", Builtin::RegExpB(RegExpFn::ToString), 0);
    install_ctor(interp, "RegExp", CtorFn::RegExp, proto, 2);
}
