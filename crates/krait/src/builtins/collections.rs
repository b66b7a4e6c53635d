//! `Map`, `Set`, and their weak variants.
//!
//! Weak collections share the strong storage: without a tracing collector
//! there is nothing to reclaim, so weakness degenerates to object-keyed
//! storage with the same observational API.

use crate::{
    builtins::{Builtin, CtorFn, define_method, define_symbol_method, install_ctor},
    error::RunResult,
    eval::Interp,
    heap::{HeapData, HeapId},
    types::{ClassTag, JsMap, JsObject, JsSet, MapKey, NativeIter, NativeIterKind, ObjectPayload, PropKey},
    value::{SymbolId, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MapFn {
    Get,
    Set,
    Has,
    Delete,
    Clear,
    ForEach,
    Keys,
    Values,
    Entries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetFn {
    Add,
    Has,
    Delete,
    Clear,
    ForEach,
    Values,
    Entries,
}

pub(crate) fn construct_map(interp: &mut Interp, args: &[Value], weak: bool, is_new: bool) -> RunResult<Value> {
    if !is_new {
        return Err(interp.throw_type_error("Map constructor requires 'new'"));
    }
    let (tag, proto) = if weak {
        (ClassTag::WeakMap, interp.realm.weakmap_proto)
    } else {
        (ClassTag::Map, interp.realm.map_proto)
    };
    let payload = if weak {
        ObjectPayload::WeakMap(JsMap::new())
    } else {
        ObjectPayload::Map(JsMap::new())
    };
    let id = interp.heap.alloc_object(JsObject::with_payload(tag, Some(proto), payload));
    if let Some(iterable) = args.first().copied() {
        if !iterable.is_nullish() {
            let entries = interp.iterate_collect(iterable)?;
            for entry in entries {
                let k = interp.get_property(entry, PropKey::Index(0))?;
                let v = interp.get_property(entry, PropKey::Index(1))?;
                map_insert(interp, id, k, v, weak)?;
            }
        }
    }
    Ok(Value::Ref(id))
}

pub(crate) fn construct_set(interp: &mut Interp, args: &[Value], weak: bool, is_new: bool) -> RunResult<Value> {
    if !is_new {
        return Err(interp.throw_type_error("Set constructor requires 'new'"));
    }
    let (tag, proto) = if weak {
        (ClassTag::WeakSet, interp.realm.weakset_proto)
    } else {
        (ClassTag::Set, interp.realm.set_proto)
    };
    let payload = if weak {
        ObjectPayload::WeakSet(JsSet::new())
    } else {
        ObjectPayload::Set(JsSet::new())
    };
    let id = interp.heap.alloc_object(JsObject::with_payload(tag, Some(proto), payload));
    if let Some(iterable) = args.first().copied() {
        if !iterable.is_nullish() {
            let items = interp.iterate_collect(iterable)?;
            for item in items {
                set_insert(interp, id, item, weak)?;
            }
        }
    }
    Ok(Value::Ref(id))
}

fn weak_key_check(interp: &mut Interp, key: Value, weak: bool) -> RunResult<()> {
    if weak && !key.is_object(&interp.heap) {
        return Err(interp.throw_type_error("weak collection key must be an object"));
    }
    Ok(())
}

fn map_insert(interp: &mut Interp, id: HeapId, key: Value, value: Value, weak: bool) -> RunResult<()> {
    weak_key_check(interp, key, weak)?;
    let canonical = MapKey::from_value(key, &interp.heap, &interp.interns);
    match &mut interp.heap.object_mut(id).payload {
        ObjectPayload::Map(map) | ObjectPayload::WeakMap(map) => {
            map.entries.insert(canonical, (key, value));
            Ok(())
        }
        _ => Err(interp.throw_type_error("receiver is not a Map")),
    }
}

fn set_insert(interp: &mut Interp, id: HeapId, value: Value, weak: bool) -> RunResult<()> {
    weak_key_check(interp, value, weak)?;
    let canonical = MapKey::from_value(value, &interp.heap, &interp.interns);
    match &mut interp.heap.object_mut(id).payload {
        ObjectPayload::Set(set) | ObjectPayload::WeakSet(set) => {
            set.entries.insert(canonical, value);
            Ok(())
        }
        _ => Err(interp.throw_type_error("receiver is not a Set")),
    }
}

fn this_map(interp: &mut Interp, this: Value) -> RunResult<(HeapId, bool)> {
    if let Value::Ref(id) = this {
        if let HeapData::Object(obj) = interp.heap.get(id) {
            match obj.payload {
                ObjectPayload::Map(_) => return Ok((id, false)),
                ObjectPayload::WeakMap(_) => return Ok((id, true)),
                _ => {}
            }
        }
    }
    Err(interp.throw_type_error("method requires a Map receiver"))
}

fn this_set(interp: &mut Interp, this: Value) -> RunResult<(HeapId, bool)> {
    if let Value::Ref(id) = this {
        if let HeapData::Object(obj) = interp.heap.get(id) {
            match obj.payload {
                ObjectPayload::Set(_) => return Ok((id, false)),
                ObjectPayload::WeakSet(_) => return Ok((id, true)),
                _ => {}
            }
        }
    }
    Err(interp.throw_type_error("method requires a Set receiver"))
}

pub(crate) fn call_map(interp: &mut Interp, f: MapFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let (id, weak) = this_map(interp, this)?;
    let key = args.first().copied().unwrap_or(Value::Undefined);
    let canonical = MapKey::from_value(key, &interp.heap, &interp.interns);
    match f {
        MapFn::Get => {
            let result = match &interp.heap.object(id).payload {
                ObjectPayload::Map(map) | ObjectPayload::WeakMap(map) => {
                    map.entries.get(&canonical).map(|(_, v)| *v)
                }
                _ => None,
            };
            Ok(result.unwrap_or(Value::Undefined))
        }
        MapFn::Set => {
            let value = args.get(1).copied().unwrap_or(Value::Undefined);
            map_insert(interp, id, key, value, weak)?;
            Ok(this)
        }
        MapFn::Has => {
            let has = match &interp.heap.object(id).payload {
                ObjectPayload::Map(map) | ObjectPayload::WeakMap(map) => map.entries.contains_key(&canonical),
                _ => false,
            };
            Ok(Value::Bool(has))
        }
        MapFn::Delete => {
            let removed = match &mut interp.heap.object_mut(id).payload {
                ObjectPayload::Map(map) | ObjectPayload::WeakMap(map) => {
                    map.entries.shift_remove(&canonical).is_some()
                }
                _ => false,
            };
            Ok(Value::Bool(removed))
        }
        MapFn::Clear => {
            if let ObjectPayload::Map(map) | ObjectPayload::WeakMap(map) = &mut interp.heap.object_mut(id).payload {
                map.entries.clear();
            }
            Ok(Value::Undefined)
        }
        MapFn::ForEach => {
            let callback = key;
            if !interp.is_callable(callback) {
                return Err(interp.throw_type_error("Map.prototype.forEach requires a callback function"));
            }
            let this_arg = args.get(1).copied().unwrap_or(Value::Undefined);
            let entries: Vec<(Value, Value)> = match &interp.heap.object(id).payload {
                ObjectPayload::Map(map) | ObjectPayload::WeakMap(map) => map.entries.values().copied().collect(),
                _ => Vec::new(),
            };
            for (k, v) in entries {
                interp.call_value(callback, this_arg, &[v, k, this])?;
            }
            Ok(Value::Undefined)
        }
        MapFn::Keys | MapFn::Values | MapFn::Entries => {
            let kind = match f {
                MapFn::Keys => NativeIterKind::MapKeys,
                MapFn::Values => NativeIterKind::MapValues,
                _ => NativeIterKind::MapEntries,
            };
            let proto = interp.realm.iterator_proto;
            let obj = JsObject::with_payload(
                ClassTag::Iterator,
                Some(proto),
                ObjectPayload::NativeIter(NativeIter::new(kind, this)),
            );
            Ok(Value::Ref(interp.heap.alloc_object(obj)))
        }
    }
}

pub(crate) fn call_set(interp: &mut Interp, f: SetFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let (id, weak) = this_set(interp, this)?;
    let value = args.first().copied().unwrap_or(Value::Undefined);
    let canonical = MapKey::from_value(value, &interp.heap, &interp.interns);
    match f {
        SetFn::Add => {
            set_insert(interp, id, value, weak)?;
            Ok(this)
        }
        SetFn::Has => {
            let has = match &interp.heap.object(id).payload {
                ObjectPayload::Set(set) | ObjectPayload::WeakSet(set) => set.entries.contains_key(&canonical),
                _ => false,
            };
            Ok(Value::Bool(has))
        }
        SetFn::Delete => {
            let removed = match &mut interp.heap.object_mut(id).payload {
                ObjectPayload::Set(set) | ObjectPayload::WeakSet(set) => {
                    set.entries.shift_remove(&canonical).is_some()
                }
                _ => false,
            };
            Ok(Value::Bool(removed))
        }
        SetFn::Clear => {
            if let ObjectPayload::Set(set) | ObjectPayload::WeakSet(set) = &mut interp.heap.object_mut(id).payload {
                set.entries.clear();
            }
            Ok(Value::Undefined)
        }
        SetFn::ForEach => {
            let callback = value;
            if !interp.is_callable(callback) {
                return Err(interp.throw_type_error("Set.prototype.forEach requires a callback function"));
            }
            let this_arg = args.get(1).copied().unwrap_or(Value::Undefined);
            let items: Vec<Value> = match &interp.heap.object(id).payload {
                ObjectPayload::Set(set) | ObjectPayload::WeakSet(set) => set.entries.values().copied().collect(),
                _ => Vec::new(),
            };
            for item in items {
                interp.call_value(callback, this_arg, &[item, item, this])?;
            }
            Ok(Value::Undefined)
        }
        SetFn::Values | SetFn::Entries => {
            let kind = if f == SetFn::Values {
                NativeIterKind::SetValues
            } else {
                NativeIterKind::SetEntries
            };
            let proto = interp.realm.iterator_proto;
            let obj = JsObject::with_payload(
                ClassTag::Iterator,
                Some(proto),
                ObjectPayload::NativeIter(NativeIter::new(kind, this)),
            );
            Ok(Value::Ref(interp.heap.alloc_object(obj)))
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    // Map.
    let proto = interp.realm.map_proto;
    define_method(interp, proto, "get", Builtin::MapB(MapFn::Get), 1);
    define_method(interp, proto, "set", Builtin::MapB(MapFn::Set), 2);
    define_method(interp, proto, "has", Builtin::MapB(MapFn::Has), 1);
    define_method(interp, proto, "delete", Builtin::MapB(MapFn::Delete), 1);
    define_method(interp, proto, "clear", Builtin::MapB(MapFn::Clear), 0);
    define_method(interp, proto, "forEach", Builtin::MapB(MapFn::ForEach), 1);
    define_method(interp, proto, "keys", Builtin::MapB(MapFn::Keys), 0);
    define_method(interp, proto, "values", Builtin::MapB(MapFn::Values), 0);
    define_method(interp, proto, "entries", Builtin::MapB(MapFn::Entries), 0);
    define_symbol_method(interp, proto, SymbolId::ITERATOR, "[Symbol.iterator]", Builtin::MapB(MapFn::Entries));
    install_ctor(interp, "Map", CtorFn::Map, proto, 0);

    // Set.
    let proto = interp.realm.set_proto;
    define_method(interp, proto, "add", Builtin::SetB(SetFn::Add), 1);
    define_method(interp, proto, "has", Builtin::SetB(SetFn::Has), 1);
    define_method(interp, proto, "delete", Builtin::SetB(SetFn::Delete), 1);
    define_method(interp, proto, "clear", Builtin::SetB(SetFn::Clear), 0);
    define_method(interp, proto, "forEach", Builtin::SetB(SetFn::ForEach), 1);
    define_method(interp, proto, "values", Builtin::SetB(SetFn::Values), 0);
    define_method(interp, proto, "keys", Builtin::SetB(SetFn::Values), 0);
    define_method(interp, proto, "entries", Builtin::SetB(SetFn::Entries), 0);
    define_symbol_method(interp, proto, SymbolId::ITERATOR, "[Symbol.iterator]", Builtin::SetB(SetFn::Values));
    install_ctor(interp, "Set", CtorFn::Set, proto, 0);

    // Weak variants: subset of methods, no iteration.
    let proto = interp.realm.weakmap_proto;
    define_method(interp, proto, "get", Builtin::MapB(MapFn::Get), 1);
    define_method(interp, proto, "set", Builtin::MapB(MapFn::Set), 2);
    define_method(interp, proto, "has", Builtin::MapB(MapFn::Has), 1);
    define_method(interp, proto, "delete", Builtin::MapB(MapFn::Delete), 1);
    install_ctor(interp, "WeakMap", CtorFn::WeakMap, proto, 0);

    let proto = interp.realm.weakset_proto;
    define_method(interp, proto, "add", Builtin::SetB(SetFn::Add), 1);
    define_method(interp, proto, "has", Builtin::SetB(SetFn::Has), 1);
    define_method(interp, proto, "delete", Builtin::SetB(SetFn::Delete), 1);
    install_ctor(interp, "WeakSet", CtorFn::WeakSet, proto, 0);
}
