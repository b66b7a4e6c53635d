//! `console` and value display formatting.

use crate::{
    builtins::{Builtin, define_method, install_namespace},
    error::RunResult,
    eval::Interp,
    heap::HeapData,
    io::ConsoleStream,
    types::{ClassTag, ObjectPayload, PropKey, PropValue},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConsoleFn {
    Log,
    Warn,
    Error,
}

pub(crate) fn call(interp: &mut Interp, f: ConsoleFn, args: &[Value]) -> RunResult<Value> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(display_value(interp, *arg, 0)?);
    }
    let line = parts.join(" ");
    let stream = match f {
        ConsoleFn::Log => ConsoleStream::Log,
        ConsoleFn::Warn => ConsoleStream::Warn,
        ConsoleFn::Error => ConsoleStream::Error,
    };
    interp.console.write_line(stream, &line);
    Ok(Value::Undefined)
}

const MAX_DISPLAY_DEPTH: usize = 4;

/// Renders a value the way embedders expect console output to look: bare
/// strings at the top level, quoted inside containers, recursive objects and
/// arrays up to a depth cap.
pub(crate) fn display_value(interp: &mut Interp, value: Value, depth: usize) -> RunResult<String> {
    Ok(match value {
        Value::Undefined => "undefined".to_owned(),
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => crate::eval::ops::js_number_to_string(n),
        Value::Str(id) => {
            let s = interp.interns.get(id);
            if depth == 0 { s.to_owned() } else { format!("'{s}'") }
        }
        Value::Symbol(id) => {
            let description = interp.symbols.descriptions[id.index()].clone().unwrap_or_default();
            format!("Symbol({description})")
        }
        Value::Ref(id) => match interp.heap.get(id) {
            HeapData::Str(s) => {
                if depth == 0 {
                    s.clone()
                } else {
                    format!("'{s}'")
                }
            }
            HeapData::BigInt(b) => format!("{b}n"),
            HeapData::Object(_) => display_object(interp, id, depth)?,
        },
    })
}

fn display_object(interp: &mut Interp, id: crate::heap::HeapId, depth: usize) -> RunResult<String> {
    if depth >= MAX_DISPLAY_DEPTH {
        return Ok("[Object]".to_owned());
    }
    let tag = interp.heap.object(id).tag;
    match tag {
        ClassTag::Array | ClassTag::Arguments => {
            let elements = interp.heap.object(id).elements().cloned().unwrap_or_default();
            let mut parts = Vec::with_capacity(elements.len());
            for element in elements {
                parts.push(display_value(interp, element, depth + 1)?);
            }
            Ok(format!("[ {} ]", parts.join(", ")).replace("[  ]", "[]"))
        }
        ClassTag::Function => {
            let name_key = PropKey::Str(interp.interns.intern("name"));
            let name = interp.get_property(Value::Ref(id), name_key)?;
            let name = interp.string_content(name).unwrap_or_default();
            if name.is_empty() {
                Ok("[Function (anonymous)]".to_owned())
            } else {
                Ok(format!("[Function: {name}]"))
            }
        }
        ClassTag::Error => {
            let stack_key = PropKey::Str(interp.interns.intern("stack"));
            let stack = interp.get_property(Value::Ref(id), stack_key)?;
            if let Some(s) = interp.string_content(stack) {
                return Ok(s);
            }
            Ok("[Error]".to_owned())
        }
        ClassTag::RegExp => {
            let obj = interp.heap.object(id);
            if let ObjectPayload::RegExp(re) = &obj.payload {
                return Ok(format!("/{}/{}", re.source, re.flags));
            }
            Ok("[RegExp]".to_owned())
        }
        ClassTag::Promise => Ok("Promise { <state> }".to_owned()),
        ClassTag::Map => {
            let len = match &interp.heap.object(id).payload {
                ObjectPayload::Map(m) => m.entries.len(),
                _ => 0,
            };
            Ok(format!("Map({len})"))
        }
        ClassTag::Set => {
            let len = match &interp.heap.object(id).payload {
                ObjectPayload::Set(s) => s.entries.len(),
                _ => 0,
            };
            Ok(format!("Set({len})"))
        }
        _ => {
            // Plain-ish object: own enumerable string properties.
            let keys = interp.own_enumerable_string_keys(id);
            let mut parts = Vec::with_capacity(keys.len());
            for key in keys {
                // Skip accessors in display to avoid side effects.
                let is_accessor = interp
                    .heap
                    .object(id)
                    .get_own(key)
                    .is_some_and(|p| matches!(p.value, PropValue::Accessor { .. }));
                let rendered = if is_accessor {
                    "[Getter/Setter]".to_owned()
                } else {
                    let v = interp.get_property(Value::Ref(id), key)?;
                    display_value(interp, v, depth + 1)?
                };
                parts.push(format!("{}: {}", interp.key_display(key), rendered));
            }
            if parts.is_empty() {
                Ok("{}".to_owned())
            } else {
                Ok(format!("{{ {} }}", parts.join(", ")))
            }
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let console = install_namespace(interp, "console");
    define_method(interp, console, "log", Builtin::Console(ConsoleFn::Log), 0);
    define_method(interp, console, "warn", Builtin::Console(ConsoleFn::Warn), 0);
    define_method(interp, console, "error", Builtin::Console(ConsoleFn::Error), 0);
}
