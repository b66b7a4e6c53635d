//! `JSON.parse` and `JSON.stringify`.
//!
//! Parsing goes through `serde_json` (with `preserve_order`, so object key
//! order survives); stringification is hand-written over engine values to
//! get JavaScript number formatting, cycle detection, and `toJSON` right.

use serde_json::Value as JsonValue;

use crate::{
    builtins::install_namespace,
    error::{ErrorKind, RunResult},
    eval::Interp,
    heap::{HeapData, HeapId},
    types::{ClassTag, ObjectPayload, PropKey, PropValue, Property},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonFn {
    Parse,
    Stringify,
}

pub(crate) fn call(interp: &mut Interp, f: JsonFn, args: &[Value]) -> RunResult<Value> {
    match f {
        JsonFn::Parse => {
            let text = match args.first() {
                Some(v) => interp.to_string_value(*v)?,
                None => return Err(interp.throw_error(ErrorKind::SyntaxError, "unexpected end of JSON input")),
            };
            let parsed: JsonValue = serde_json::from_str(&text)
                .map_err(|e| interp.throw_error(ErrorKind::SyntaxError, format!("invalid JSON: {e}")))?;
            Ok(json_to_value(interp, &parsed))
        }
        JsonFn::Stringify => {
            let value = args.first().copied().unwrap_or(Value::Undefined);
            let indent = match args.get(2) {
                Some(v) => {
                    if let Some(n) = v.as_number() {
                        " ".repeat((n.max(0.0) as usize).min(10))
                    } else {
                        interp.string_content(*v).unwrap_or_default()
                    }
                }
                None => String::new(),
            };
            let mut seen = Vec::new();
            let mut out = String::new();
            let wrote = stringify(interp, value, &indent, 0, &mut seen, &mut out)?;
            if wrote {
                Ok(interp.alloc_string(out))
            } else {
                Ok(Value::Undefined)
            }
        }
    }
}

fn json_to_value(interp: &mut Interp, json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => interp.alloc_string(s.clone()),
        JsonValue::Array(items) => {
            let elements: Vec<Value> = items.iter().map(|item| json_to_value(interp, item)).collect();
            interp.new_array(elements)
        }
        JsonValue::Object(map) => {
            let id = interp.new_object();
            for (key, value) in map {
                let v = json_to_value(interp, value);
                let k = interp.prop_key_from_str(key);
                interp.heap.object_mut(id).define(k, Property::data(v));
            }
            Value::Ref(id)
        }
    }
}

/// Serializes one value; returns false for undefined/function/symbol (which
/// are omitted entirely at the top level and in objects).
fn stringify(
    interp: &mut Interp,
    value: Value,
    indent: &str,
    depth: usize,
    seen: &mut Vec<HeapId>,
    out: &mut String,
) -> RunResult<bool> {
    // toJSON (Dates serialize as ISO strings through this).
    let value = apply_to_json(interp, value)?;
    match value {
        Value::Undefined | Value::Symbol(_) => Ok(false),
        Value::Null => {
            out.push_str("null");
            Ok(true)
        }
        Value::Bool(b) => {
            out.push_str(if b { "true" } else { "false" });
            Ok(true)
        }
        Value::Number(n) => {
            if n.is_finite() {
                out.push_str(&crate::eval::ops::js_number_to_string(n));
            } else {
                out.push_str("null");
            }
            Ok(true)
        }
        Value::Str(id) => {
            let s = interp.interns.get(id).to_owned();
            push_json_string(out, &s);
            Ok(true)
        }
        Value::Ref(id) => match interp.heap.get(id) {
            HeapData::Str(s) => {
                let s = s.clone();
                push_json_string(out, &s);
                Ok(true)
            }
            HeapData::BigInt(_) => Err(interp.throw_type_error("BigInt values cannot be serialized in JSON")),
            HeapData::Object(obj) => {
                if obj.is_callable() {
                    return Ok(false);
                }
                if seen.contains(&id) {
                    return Err(interp.throw_type_error("converting circular structure to JSON"));
                }
                seen.push(id);
                let result = stringify_object(interp, id, indent, depth, seen, out);
                seen.pop();
                result
            }
        },
    }
}

fn stringify_object(
    interp: &mut Interp,
    id: HeapId,
    indent: &str,
    depth: usize,
    seen: &mut Vec<HeapId>,
    out: &mut String,
) -> RunResult<bool> {
    let (open_gap, close_gap, item_sep) = gaps(indent, depth);
    if let Some(elements) = interp.heap.object(id).elements().cloned() {
        out.push('[');
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&open_gap);
            if !stringify(interp, *element, indent, depth + 1, seen, out)? {
                out.push_str("null");
            }
        }
        if !elements.is_empty() {
            out.push_str(&close_gap);
        }
        out.push(']');
        return Ok(true);
    }

    out.push('{');
    let keys = interp.own_enumerable_string_keys(id);
    let mut wrote_any = false;
    for key in keys {
        // Accessors serialize their result; data props their value.
        let is_accessor = interp
            .heap
            .object(id)
            .get_own(key)
            .is_some_and(|p| matches!(p.value, PropValue::Accessor { .. }));
        let v = if is_accessor {
            interp.get_property(Value::Ref(id), key)?
        } else {
            match interp.heap.object(id).get_own(key).map(|p| p.value) {
                Some(PropValue::Data(v)) => v,
                _ => interp.get_property(Value::Ref(id), key)?,
            }
        };
        let mut piece = String::new();
        if !stringify(interp, v, indent, depth + 1, seen, &mut piece)? {
            continue;
        }
        if wrote_any {
            out.push(',');
        }
        out.push_str(&open_gap);
        let key_text = interp.key_display(key);
        push_json_string(out, &key_text);
        out.push(':');
        if !indent.is_empty() {
            out.push(' ');
        }
        out.push_str(&piece);
        wrote_any = true;
    }
    if wrote_any {
        out.push_str(&close_gap);
    }
    out.push('}');
    let _ = item_sep;
    Ok(true)
}

fn gaps(indent: &str, depth: usize) -> (String, String, String) {
    if indent.is_empty() {
        (String::new(), String::new(), ",".to_owned())
    } else {
        let inner = format!("\n{}", indent.repeat(depth + 1));
        let outer = format!("\n{}", indent.repeat(depth));
        (inner.clone(), outer, format!(",{inner}"))
    }
}

fn apply_to_json(interp: &mut Interp, value: Value) -> RunResult<Value> {
    if let Value::Ref(id) = value {
        if matches!(interp.heap.get(id), HeapData::Object(_)) {
            let is_date = interp.heap.object(id).tag == ClassTag::Date;
            if is_date {
                if let ObjectPayload::Date(ms) = &interp.heap.object(id).payload {
                    let iso = crate::builtins::date::to_iso_string(*ms);
                    return match iso {
                        Some(s) => Ok(interp.alloc_string(s)),
                        None => Ok(Value::Null),
                    };
                }
            }
            let to_json = PropKey::Str(interp.interns.intern("toJSON"));
            let method = interp.get_property(value, to_json)?;
            if interp.is_callable(method) {
                return interp.call_value(method, value, &[]);
            }
        }
    }
    Ok(value)
}

fn push_json_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

pub(crate) fn install(interp: &mut Interp) {
    let json = install_namespace(interp, "JSON");
    crate::builtins::define_method(interp, json, "parse", crate::builtins::Builtin::Json(JsonFn::Parse), 2);
    crate::builtins::define_method(interp, json, "stringify", crate::builtins::Builtin::Json(JsonFn::Stringify), 3);
}
