//! `Object` statics and `Object.prototype`.

use crate::{
    builtins::{Builtin, CtorFn, define_method, install_ctor},
    error::RunResult,
    eval::Interp,
    heap::{HeapData, HeapId},
    types::{ClassTag, JsObject, PropKey, PropValue, Property},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObjectFn {
    Keys,
    Values,
    Entries,
    Assign,
    Freeze,
    IsFrozen,
    Seal,
    IsSealed,
    Create,
    GetPrototypeOf,
    SetPrototypeOf,
    DefineProperty,
    GetOwnPropertyDescriptor,
    GetOwnPropertyNames,
    FromEntries,
    Is,
    ProtoToString,
    ProtoHasOwnProperty,
    ProtoValueOf,
    ProtoIsPrototypeOf,
    ProtoPropertyIsEnumerable,
}

pub(crate) fn construct_object(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    match args.first().copied() {
        None | Some(Value::Undefined | Value::Null) => Ok(Value::Ref(interp.new_object())),
        Some(v) if v.is_object(&interp.heap) => Ok(v),
        Some(v) => {
            // Primitives box into a plain object snapshot of their methods;
            // full wrapper objects are not modeled.
            let _ = v;
            Ok(Value::Ref(interp.new_object()))
        }
    }
}

fn require_object(interp: &mut Interp, value: Value, what: &str) -> RunResult<HeapId> {
    if let Value::Ref(id) = value {
        if matches!(interp.heap.get(id), HeapData::Object(_)) {
            return Ok(id);
        }
    }
    Err(interp.throw_type_error(format!("{what} called on a non-object")))
}

pub(crate) fn call(interp: &mut Interp, f: ObjectFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let arg0 = args.first().copied().unwrap_or(Value::Undefined);
    match f {
        ObjectFn::Keys => {
            let id = require_object(interp, arg0, "Object.keys")?;
            let keys = interp.own_enumerable_string_keys(id);
            let values: Vec<Value> = keys.into_iter().map(|k| interp.key_to_value(k)).collect();
            Ok(interp.new_array(values))
        }
        ObjectFn::Values => {
            let id = require_object(interp, arg0, "Object.values")?;
            let keys = interp.own_enumerable_string_keys(id);
            let mut values = Vec::with_capacity(keys.len());
            for key in keys {
                values.push(interp.get_property(arg0, key)?);
            }
            Ok(interp.new_array(values))
        }
        ObjectFn::Entries => {
            let id = require_object(interp, arg0, "Object.entries")?;
            let keys = interp.own_enumerable_string_keys(id);
            let mut entries = Vec::with_capacity(keys.len());
            for key in keys {
                let k = interp.key_to_value(key);
                let v = interp.get_property(arg0, key)?;
                entries.push(interp.new_array(vec![k, v]));
            }
            Ok(interp.new_array(entries))
        }
        ObjectFn::Assign => {
            let target = require_object(interp, arg0, "Object.assign")?;
            for source in args.get(1..).unwrap_or(&[]) {
                interp.copy_data_properties(target, *source)?;
            }
            Ok(arg0)
        }
        ObjectFn::Freeze => {
            if let Value::Ref(id) = arg0 {
                if matches!(interp.heap.get(id), HeapData::Object(_)) {
                    let obj = interp.heap.object_mut(id);
                    obj.extensible = false;
                    let keys: Vec<PropKey> = obj.props_iter().map(|(k, _)| *k).collect();
                    for key in keys {
                        if let Some(prop) = interp.heap.object_mut(id).get_own_mut(key) {
                            prop.writable = false;
                            prop.configurable = false;
                        }
                    }
                }
            }
            Ok(arg0)
        }
        ObjectFn::IsFrozen => {
            let Value::Ref(id) = arg0 else { return Ok(Value::Bool(true)) };
            if !matches!(interp.heap.get(id), HeapData::Object(_)) {
                return Ok(Value::Bool(true));
            }
            let obj = interp.heap.object(id);
            let frozen = !obj.extensible
                && obj.props_iter().all(|(_, p)| !p.configurable && (!p.writable || matches!(p.value, PropValue::Accessor { .. })));
            Ok(Value::Bool(frozen))
        }
        ObjectFn::Seal => {
            if let Value::Ref(id) = arg0 {
                if matches!(interp.heap.get(id), HeapData::Object(_)) {
                    let obj = interp.heap.object_mut(id);
                    obj.extensible = false;
                    let keys: Vec<PropKey> = obj.props_iter().map(|(k, _)| *k).collect();
                    for key in keys {
                        if let Some(prop) = interp.heap.object_mut(id).get_own_mut(key) {
                            prop.configurable = false;
                        }
                    }
                }
            }
            Ok(arg0)
        }
        ObjectFn::IsSealed => {
            let Value::Ref(id) = arg0 else { return Ok(Value::Bool(true)) };
            if !matches!(interp.heap.get(id), HeapData::Object(_)) {
                return Ok(Value::Bool(true));
            }
            let obj = interp.heap.object(id);
            let sealed = !obj.extensible && obj.props_iter().all(|(_, p)| !p.configurable);
            Ok(Value::Bool(sealed))
        }
        ObjectFn::Create => {
            let proto = match arg0 {
                Value::Null => None,
                Value::Ref(id) if matches!(interp.heap.get(id), HeapData::Object(_)) => Some(id),
                _ => return Err(interp.throw_type_error("Object prototype may only be an Object or null")),
            };
            let obj = JsObject::new(ClassTag::Object, proto);
            let id = interp.heap.alloc_object(obj);
            if let Some(descriptors) = args.get(1).copied() {
                if descriptors.is_object(&interp.heap) {
                    apply_descriptors(interp, id, descriptors)?;
                }
            }
            Ok(Value::Ref(id))
        }
        ObjectFn::GetPrototypeOf => {
            let id = require_object(interp, arg0, "Object.getPrototypeOf")?;
            Ok(match interp.heap.object(id).proto {
                Some(proto) => Value::Ref(proto),
                None => Value::Null,
            })
        }
        ObjectFn::SetPrototypeOf => {
            let id = require_object(interp, arg0, "Object.setPrototypeOf")?;
            let proto = match args.get(1).copied().unwrap_or(Value::Undefined) {
                Value::Null => None,
                Value::Ref(p) if matches!(interp.heap.get(p), HeapData::Object(_)) => Some(p),
                _ => return Err(interp.throw_type_error("Object prototype may only be an Object or null")),
            };
            // Reject prototype cycles.
            if let Some(mut cursor) = proto {
                loop {
                    if cursor == id {
                        return Err(interp.throw_type_error("cyclic prototype chain"));
                    }
                    match interp.heap.object(cursor).proto {
                        Some(parent) => cursor = parent,
                        None => break,
                    }
                }
            }
            interp.heap.object_mut(id).proto = proto;
            Ok(arg0)
        }
        ObjectFn::DefineProperty => {
            let id = require_object(interp, arg0, "Object.defineProperty")?;
            let key_val = args.get(1).copied().unwrap_or(Value::Undefined);
            let key = interp.to_property_key(key_val)?;
            let descriptor = args.get(2).copied().unwrap_or(Value::Undefined);
            let prop = parse_descriptor(interp, descriptor)?;
            interp.define_own_property(id, key, prop)?;
            Ok(arg0)
        }
        ObjectFn::GetOwnPropertyDescriptor => {
            let id = require_object(interp, arg0, "Object.getOwnPropertyDescriptor")?;
            let key_val = args.get(1).copied().unwrap_or(Value::Undefined);
            let key = interp.to_property_key(key_val)?;
            let Some(prop) = interp.heap.object(id).get_own(key).copied() else {
                // Array elements report as plain data properties.
                if let PropKey::Index(i) = key {
                    if let Some(elements) = interp.heap.object(id).elements() {
                        if let Some(v) = elements.get(i as usize).copied() {
                            return descriptor_object(interp, Property::data(v));
                        }
                    }
                }
                return Ok(Value::Undefined);
            };
            descriptor_object(interp, prop)
        }
        ObjectFn::GetOwnPropertyNames => {
            let id = require_object(interp, arg0, "Object.getOwnPropertyNames")?;
            let keys = interp.heap.object(id).own_keys();
            let values: Vec<Value> = keys
                .into_iter()
                .filter(|k| !matches!(k, PropKey::Symbol(_)))
                .map(|k| interp.key_to_value(k))
                .collect();
            Ok(interp.new_array(values))
        }
        ObjectFn::FromEntries => {
            let entries = interp.iterate_collect(arg0)?;
            let id = interp.new_object();
            for entry in entries {
                let k = interp.get_property(entry, PropKey::Index(0))?;
                let v = interp.get_property(entry, PropKey::Index(1))?;
                let key = interp.to_property_key(k)?;
                interp.define_own_property(id, key, Property::data(v))?;
            }
            Ok(Value::Ref(id))
        }
        ObjectFn::Is => {
            let b = args.get(1).copied().unwrap_or(Value::Undefined);
            Ok(Value::Bool(interp.same_value(arg0, b)))
        }
        ObjectFn::ProtoToString => {
            let name = match this {
                Value::Undefined => "Undefined",
                Value::Null => "Null",
                Value::Bool(_) => "Boolean",
                Value::Number(_) => "Number",
                Value::Str(_) => "String",
                Value::Symbol(_) => "Symbol",
                Value::Ref(id) => match interp.heap.get(id) {
                    HeapData::Str(_) => "String",
                    HeapData::BigInt(_) => "BigInt",
                    HeapData::Object(obj) => {
                        if obj.is_callable() {
                            "Function"
                        } else {
                            obj.tag.name()
                        }
                    }
                },
            };
            Ok(interp.alloc_string(format!("[object {name}]")))
        }
        ObjectFn::ProtoHasOwnProperty => {
            let key = interp.to_property_key(arg0)?;
            let Value::Ref(id) = this else { return Ok(Value::Bool(false)) };
            if !matches!(interp.heap.get(id), HeapData::Object(_)) {
                return Ok(Value::Bool(false));
            }
            let obj = interp.heap.object(id);
            let has = obj.has_own(key)
                || matches!(key, PropKey::Index(i) if obj.elements().is_some_and(|e| (i as usize) < e.len()));
            Ok(Value::Bool(has))
        }
        ObjectFn::ProtoValueOf => Ok(this),
        ObjectFn::ProtoIsPrototypeOf => {
            let Value::Ref(candidate) = arg0 else { return Ok(Value::Bool(false)) };
            let Value::Ref(this_id) = this else { return Ok(Value::Bool(false)) };
            if !matches!(interp.heap.get(candidate), HeapData::Object(_)) {
                return Ok(Value::Bool(false));
            }
            let mut cursor = interp.heap.object(candidate).proto;
            while let Some(id) = cursor {
                if id == this_id {
                    return Ok(Value::Bool(true));
                }
                cursor = interp.heap.object(id).proto;
            }
            Ok(Value::Bool(false))
        }
        ObjectFn::ProtoPropertyIsEnumerable => {
            let key = interp.to_property_key(arg0)?;
            let Value::Ref(id) = this else { return Ok(Value::Bool(false)) };
            if !matches!(interp.heap.get(id), HeapData::Object(_)) {
                return Ok(Value::Bool(false));
            }
            let obj = interp.heap.object(id);
            if let PropKey::Index(i) = key {
                if obj.elements().is_some_and(|e| (i as usize) < e.len()) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(obj.get_own(key).is_some_and(|p| p.enumerable)))
        }
    }
}

/// Reads a property descriptor object into a [`Property`].
fn parse_descriptor(interp: &mut Interp, descriptor: Value) -> RunResult<Property> {
    if !descriptor.is_object(&interp.heap) {
        return Err(interp.throw_type_error("property descriptor must be an object"));
    }
    let get_key = PropKey::Str(interp.interns.intern("get"));
    let set_key = PropKey::Str(interp.interns.intern("set"));
    let value_key = PropKey::Str(interp.interns.intern("value"));
    let writable_key = PropKey::Str(interp.interns.intern("writable"));
    let enumerable_key = PropKey::Str(interp.interns.intern("enumerable"));
    let configurable_key = PropKey::Str(interp.interns.intern("configurable"));

    let get = interp.get_property(descriptor, get_key)?;
    let set = interp.get_property(descriptor, set_key)?;
    let has_accessor = interp.is_callable(get) || interp.is_callable(set);

    let value = if has_accessor {
        PropValue::Accessor {
            get: interp.is_callable(get).then_some(get),
            set: interp.is_callable(set).then_some(set),
        }
    } else {
        PropValue::Data(interp.get_property(descriptor, value_key)?)
    };
    let writable = interp.get_property(descriptor, writable_key)?;
    let enumerable = interp.get_property(descriptor, enumerable_key)?;
    let configurable = interp.get_property(descriptor, configurable_key)?;
    Ok(Property {
        value,
        writable: interp.to_boolean(writable),
        enumerable: interp.to_boolean(enumerable),
        configurable: interp.to_boolean(configurable),
    })
}

/// Builds the descriptor object for `getOwnPropertyDescriptor`.
fn descriptor_object(interp: &mut Interp, prop: Property) -> RunResult<Value> {
    let id = interp.new_object();
    let enumerable_key = PropKey::Str(interp.interns.intern("enumerable"));
    let configurable_key = PropKey::Str(interp.interns.intern("configurable"));
    interp
        .heap
        .object_mut(id)
        .define(enumerable_key, Property::data(Value::Bool(prop.enumerable)));
    interp
        .heap
        .object_mut(id)
        .define(configurable_key, Property::data(Value::Bool(prop.configurable)));
    match prop.value {
        PropValue::Data(v) => {
            let value_key = PropKey::Str(interp.interns.intern("value"));
            let writable_key = PropKey::Str(interp.interns.intern("writable"));
            interp.heap.object_mut(id).define(value_key, Property::data(v));
            interp
                .heap
                .object_mut(id)
                .define(writable_key, Property::data(Value::Bool(prop.writable)));
        }
        PropValue::Accessor { get, set } => {
            let get_key = PropKey::Str(interp.interns.intern("get"));
            let set_key = PropKey::Str(interp.interns.intern("set"));
            interp
                .heap
                .object_mut(id)
                .define(get_key, Property::data(get.unwrap_or(Value::Undefined)));
            interp
                .heap
                .object_mut(id)
                .define(set_key, Property::data(set.unwrap_or(Value::Undefined)));
        }
    }
    Ok(Value::Ref(id))
}

fn apply_descriptors(interp: &mut Interp, target: HeapId, descriptors: Value) -> RunResult<()> {
    let Value::Ref(src) = descriptors else { return Ok(()) };
    let keys = interp.own_enumerable_string_keys(src);
    for key in keys {
        let descriptor = interp.get_property(descriptors, key)?;
        let prop = parse_descriptor(interp, descriptor)?;
        interp.define_own_property(target, key, prop)?;
    }
    Ok(())
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.object_proto;
    define_method(interp, proto, "toString", Builtin::ObjectB(ObjectFn::ProtoToString), 0);
    define_method(interp, proto, "hasOwnProperty", Builtin::ObjectB(ObjectFn::ProtoHasOwnProperty), 1);
    define_method(interp, proto, "valueOf", Builtin::ObjectB(ObjectFn::ProtoValueOf), 0);
    define_method(interp, proto, "isPrototypeOf", Builtin::ObjectB(ObjectFn::ProtoIsPrototypeOf), 1);
    define_method(
        interp,
        proto,
        "propertyIsEnumerable",
        Builtin::ObjectB(ObjectFn::ProtoPropertyIsEnumerable),
        1,
    );

    let ctor = install_ctor(interp, "Object", CtorFn::Object, proto, 1);
    define_method(interp, ctor, "keys", Builtin::ObjectB(ObjectFn::Keys), 1);
    define_method(interp, ctor, "values", Builtin::ObjectB(ObjectFn::Values), 1);
    define_method(interp, ctor, "entries", Builtin::ObjectB(ObjectFn::Entries), 1);
    define_method(interp, ctor, "assign", Builtin::ObjectB(ObjectFn::Assign), 2);
    define_method(interp, ctor, "freeze", Builtin::ObjectB(ObjectFn::Freeze), 1);
    define_method(interp, ctor, "isFrozen", Builtin::ObjectB(ObjectFn::IsFrozen), 1);
    define_method(interp, ctor, "seal", Builtin::ObjectB(ObjectFn::Seal), 1);
    define_method(interp, ctor, "isSealed", Builtin::ObjectB(ObjectFn::IsSealed), 1);
    define_method(interp, ctor, "create", Builtin::ObjectB(ObjectFn::Create), 2);
    define_method(interp, ctor, "getPrototypeOf", Builtin::ObjectB(ObjectFn::GetPrototypeOf), 1);
    define_method(interp, ctor, "setPrototypeOf", Builtin::ObjectB(ObjectFn::SetPrototypeOf), 2);
    define_method(interp, ctor, "defineProperty", Builtin::ObjectB(ObjectFn::DefineProperty), 3);
    define_method(
        interp,
        ctor,
        "getOwnPropertyDescriptor",
        Builtin::ObjectB(ObjectFn::GetOwnPropertyDescriptor),
        2,
    );
    define_method(
        interp,
        ctor,
        "getOwnPropertyNames",
        Builtin::ObjectB(ObjectFn::GetOwnPropertyNames),
        1,
    );
    define_method(interp, ctor, "fromEntries", Builtin::ObjectB(ObjectFn::FromEntries), 1);
    define_method(interp, ctor, "is", Builtin::ObjectB(ObjectFn::Is), 2);
}
