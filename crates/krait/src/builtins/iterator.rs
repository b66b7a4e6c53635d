//! Builtin iterator objects and `%IteratorPrototype%`.

use crate::{
    builtins::{Builtin, define_method, define_symbol_method},
    error::RunResult,
    eval::Interp,
    r#gen::machine::make_iter_result,
    heap::HeapData,
    types::{NativeIterKind, ObjectPayload, PropKey},
    value::{SymbolId, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IterFn {
    Next,
    /// `[Symbol.iterator]() { return this; }`
    SelfIter,
}

pub(crate) fn call(interp: &mut Interp, f: IterFn, this: Value, _args: &[Value]) -> RunResult<Value> {
    match f {
        IterFn::SelfIter => Ok(this),
        IterFn::Next => {
            let Value::Ref(id) = this else {
                return Err(interp.throw_type_error("iterator next called on a non-iterator"));
            };
            let iter = match interp.heap.get(id) {
                HeapData::Object(obj) => match &obj.payload {
                    ObjectPayload::NativeIter(iter) => *iter,
                    _ => return Err(interp.throw_type_error("iterator next called on a non-iterator")),
                },
                _ => return Err(interp.throw_type_error("iterator next called on a non-iterator")),
            };
            if iter.done {
                return Ok(make_iter_result(interp, Value::Undefined, true));
            }
            let (item, done) = step(interp, iter.kind, iter.target, iter.index)?;
            // Write back the advanced cursor.
            if let HeapData::Object(obj) = interp.heap.get_mut(id) {
                if let ObjectPayload::NativeIter(state) = &mut obj.payload {
                    state.index += 1;
                    state.done = done;
                }
            }
            Ok(make_iter_result(interp, item, done))
        }
    }
}

/// One step of a builtin iterator; returns `(value, done)`.
fn step(interp: &mut Interp, kind: NativeIterKind, target: Value, index: usize) -> RunResult<(Value, bool)> {
    match kind {
        NativeIterKind::ArrayValues | NativeIterKind::ArrayKeys | NativeIterKind::ArrayEntries => {
            // Generic index walk: works for arrays, arguments, typed arrays.
            let length_key = PropKey::Str(interp.interns.intern("length"));
            let length = interp.get_property(target, length_key)?;
            let length = interp.to_number(length)?;
            if (index as f64) >= length {
                return Ok((Value::Undefined, true));
            }
            let index_u32 = u32::try_from(index).unwrap_or(u32::MAX);
            let element = interp.get_property(target, PropKey::Index(index_u32))?;
            let item = match kind {
                NativeIterKind::ArrayValues => element,
                NativeIterKind::ArrayKeys => Value::Number(index as f64),
                _ => interp.new_array(vec![Value::Number(index as f64), element]),
            };
            Ok((item, false))
        }
        NativeIterKind::StringChars => {
            let Some(content) = interp.string_content(target) else {
                return Ok((Value::Undefined, true));
            };
            match content.chars().nth(index) {
                Some(c) => Ok((interp.alloc_string(c.to_string()), false)),
                None => Ok((Value::Undefined, true)),
            }
        }
        NativeIterKind::MapEntries | NativeIterKind::MapKeys | NativeIterKind::MapValues => {
            let Value::Ref(id) = target else {
                return Ok((Value::Undefined, true));
            };
            let entry = match &interp.heap.object(id).payload {
                ObjectPayload::Map(map) | ObjectPayload::WeakMap(map) => {
                    map.entries.get_index(index).map(|(_, (k, v))| (*k, *v))
                }
                _ => None,
            };
            match entry {
                None => Ok((Value::Undefined, true)),
                Some((k, v)) => {
                    let item = match kind {
                        NativeIterKind::MapKeys => k,
                        NativeIterKind::MapValues => v,
                        _ => interp.new_array(vec![k, v]),
                    };
                    Ok((item, false))
                }
            }
        }
        NativeIterKind::SetValues | NativeIterKind::SetEntries => {
            let Value::Ref(id) = target else {
                return Ok((Value::Undefined, true));
            };
            let item = match &interp.heap.object(id).payload {
                ObjectPayload::Set(set) | ObjectPayload::WeakSet(set) => {
                    set.entries.get_index(index).map(|(_, v)| *v)
                }
                _ => None,
            };
            match item {
                None => Ok((Value::Undefined, true)),
                Some(v) => {
                    let item = if kind == NativeIterKind::SetEntries {
                        interp.new_array(vec![v, v])
                    } else {
                        v
                    };
                    Ok((item, false))
                }
            }
        }
        NativeIterKind::RegExpStringIterator => Ok((Value::Undefined, true)),
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.iterator_proto;
    define_method(interp, proto, "next", Builtin::IterB(IterFn::Next), 0);
    define_symbol_method(interp, proto, SymbolId::ITERATOR, "[Symbol.iterator]", Builtin::IterB(IterFn::SelfIter));
}
