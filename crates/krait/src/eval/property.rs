//! Property access.
//!
//! Resolution walks the prototype chain; accessors run on get and set, and a
//! setter found on an ancestor still executes (a write never shadows it with
//! a data property). Payload-backed properties (array `length` and indices,
//! typed-array elements, map/set `size`, module namespaces, string length)
//! are virtual: they are intercepted before the property map.

use crate::{
    error::RunResult,
    eval::Interp,
    heap::{HeapData, HeapId},
    types::{ClassTag, ObjectPayload, PropKey, PropValue, Property},
    value::Value,
};

impl Interp {
    // === keys ===

    /// Canonicalizes a string to a property key: numeric strings in the
    /// array-index range become `Index` keys.
    pub fn prop_key_from_str(&mut self, s: &str) -> PropKey {
        if let Ok(index) = s.parse::<u32>() {
            if index != u32::MAX && index.to_string() == s {
                return PropKey::Index(index);
            }
        }
        PropKey::Str(self.interns.intern(s))
    }

    /// ToPropertyKey.
    pub fn to_property_key(&mut self, value: Value) -> RunResult<PropKey> {
        match value {
            Value::Symbol(id) => Ok(PropKey::Symbol(id)),
            Value::Number(n) => {
                if n.fract() == 0.0 && n >= 0.0 && n < f64::from(u32::MAX) {
                    return Ok(PropKey::Index(n as u32));
                }
                let s = super::ops::js_number_to_string(n);
                Ok(self.prop_key_from_str(&s))
            }
            _ => {
                let prim = self.to_primitive(value, super::ops::PrimitiveHint::String)?;
                if let Value::Symbol(id) = prim {
                    return Ok(PropKey::Symbol(id));
                }
                let s = self.to_string_value(prim)?;
                Ok(self.prop_key_from_str(&s))
            }
        }
    }

    /// A printable form of a key for error messages.
    pub fn key_display(&self, key: PropKey) -> String {
        match key {
            PropKey::Str(id) => self.interns.get(id).to_owned(),
            PropKey::Index(i) => i.to_string(),
            PropKey::Symbol(id) => {
                let description = self.symbols.descriptions[id.index()].as_deref().unwrap_or("");
                format!("Symbol({description})")
            }
        }
    }

    // === get ===

    pub fn get_property(&mut self, base: Value, key: PropKey) -> RunResult<Value> {
        match base {
            Value::Undefined | Value::Null => {
                let key = self.key_display(key);
                let kind = if base == Value::Null { "null" } else { "undefined" };
                Err(self.throw_type_error(format!("Cannot read properties of {kind} (reading '{key}')")))
            }
            Value::Bool(_) => self.get_from_proto_chain(base, self.realm.boolean_proto, key),
            Value::Number(_) => self.get_from_proto_chain(base, self.realm.number_proto, key),
            Value::Symbol(_) => self.get_from_proto_chain(base, self.realm.symbol_proto, key),
            Value::Str(id) => {
                let content = self.interns.get(id).to_owned();
                self.get_string_property(base, &content, key)
            }
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Str(s) => {
                    let content = s.clone();
                    self.get_string_property(base, &content, key)
                }
                HeapData::BigInt(_) => self.get_from_proto_chain(base, self.realm.bigint_proto, key),
                HeapData::Object(_) => self.get_object_property(base, id, key),
            },
        }
    }

    fn get_string_property(&mut self, base: Value, content: &str, key: PropKey) -> RunResult<Value> {
        match key {
            PropKey::Str(id) if self.interns.get(id) == "length" => {
                Ok(Value::Number(content.chars().count() as f64))
            }
            PropKey::Index(i) => match content.chars().nth(i as usize) {
                Some(c) => Ok(self.alloc_string(c.to_string())),
                None => Ok(Value::Undefined),
            },
            _ => self.get_from_proto_chain(base, self.realm.string_proto, key),
        }
    }

    /// Property lookup for primitive bases: starts directly at the wrapper
    /// prototype, with the primitive itself as `this` for accessors.
    fn get_from_proto_chain(&mut self, base: Value, proto: HeapId, key: PropKey) -> RunResult<Value> {
        let mut cursor = proto;
        loop {
            let obj = self.heap.object(cursor);
            if let Some(prop) = obj.get_own(key) {
                return match prop.value {
                    PropValue::Data(v) => Ok(v),
                    PropValue::Accessor { get, .. } => match get {
                        Some(getter) => self.call_value(getter, base, &[]),
                        None => Ok(Value::Undefined),
                    },
                };
            }
            match obj.proto {
                Some(parent) => cursor = parent,
                None => return Ok(Value::Undefined),
            }
        }
    }

    fn get_object_property(&mut self, base: Value, id: HeapId, key: PropKey) -> RunResult<Value> {
        // Payload-backed virtual properties first.
        if let Some(virtual_value) = self.get_virtual_property(id, key)? {
            return Ok(virtual_value);
        }
        let mut cursor = id;
        loop {
            let obj = self.heap.object(cursor);
            if let Some(prop) = obj.get_own(key) {
                return match prop.value {
                    PropValue::Data(v) => Ok(v),
                    PropValue::Accessor { get, .. } => match get {
                        Some(getter) => self.call_value(getter, base, &[]),
                        None => Ok(Value::Undefined),
                    },
                };
            }
            match obj.proto {
                Some(parent) => cursor = parent,
                None => return Ok(Value::Undefined),
            }
        }
    }

    /// Payload-intercepted reads. Returns `Ok(None)` to fall through to the
    /// ordinary property map.
    fn get_virtual_property(&mut self, id: HeapId, key: PropKey) -> RunResult<Option<Value>> {
        // Inspect under an immutable borrow, then act: some hits need
        // allocation or another lookup.
        enum Plan {
            Miss,
            Hit(Value),
            AllocString(String),
            Namespace(crate::modules::ModuleId),
        }
        let length_key = matches!(key, PropKey::Str(s) if self.interns.get(s) == "length");
        let size_key = matches!(key, PropKey::Str(s) if self.interns.get(s) == "size");
        let byte_length_key = matches!(key, PropKey::Str(s) if self.interns.get(s) == "byteLength");
        let plan = {
            let obj = self.heap.object(id);
            match &obj.payload {
                ObjectPayload::Array(elements) => {
                    if length_key {
                        Plan::Hit(Value::Number(elements.len() as f64))
                    } else if let PropKey::Index(i) = key {
                        match elements.get(i as usize) {
                            Some(v) => Plan::Hit(*v),
                            // Sparse writes land in the property map.
                            None => Plan::Miss,
                        }
                    } else {
                        Plan::Miss
                    }
                }
                ObjectPayload::TypedArray(view) => {
                    if length_key {
                        Plan::Hit(Value::Number(view.length as f64))
                    } else if byte_length_key {
                        Plan::Hit(Value::Number((view.length * view.kind.element_size()) as f64))
                    } else if let PropKey::Index(i) = key {
                        let i = i as usize;
                        if i >= view.length {
                            Plan::Hit(Value::Undefined)
                        } else {
                            let value = match self.heap.get(view.buffer) {
                                HeapData::Object(buffer_obj) => match &buffer_obj.payload {
                                    ObjectPayload::ArrayBuffer(bytes) => {
                                        let offset = view.byte_offset + i * view.kind.element_size();
                                        Value::Number(view.kind.read(bytes, offset))
                                    }
                                    _ => Value::Undefined,
                                },
                                _ => Value::Undefined,
                            };
                            Plan::Hit(value)
                        }
                    } else {
                        Plan::Miss
                    }
                }
                ObjectPayload::ArrayBuffer(bytes) => {
                    if byte_length_key {
                        Plan::Hit(Value::Number(bytes.len() as f64))
                    } else {
                        Plan::Miss
                    }
                }
                ObjectPayload::DataView(view) => {
                    if byte_length_key {
                        Plan::Hit(Value::Number(view.byte_length as f64))
                    } else {
                        Plan::Miss
                    }
                }
                ObjectPayload::Map(map) | ObjectPayload::WeakMap(map) => {
                    if size_key {
                        Plan::Hit(Value::Number(map.entries.len() as f64))
                    } else {
                        Plan::Miss
                    }
                }
                ObjectPayload::Set(set) | ObjectPayload::WeakSet(set) => {
                    if size_key {
                        Plan::Hit(Value::Number(set.entries.len() as f64))
                    } else {
                        Plan::Miss
                    }
                }
                ObjectPayload::Namespace(module) => Plan::Namespace(*module),
                ObjectPayload::RegExp(re) => {
                    if let PropKey::Str(s) = key {
                        match self.interns.get(s) {
                            "source" => Plan::AllocString(re.source.clone()),
                            "flags" => Plan::AllocString(re.flags.clone()),
                            "global" => Plan::Hit(Value::Bool(re.global)),
                            "ignoreCase" => Plan::Hit(Value::Bool(re.ignore_case)),
                            "multiline" => Plan::Hit(Value::Bool(re.multiline)),
                            "sticky" => Plan::Hit(Value::Bool(re.sticky)),
                            "dotAll" => Plan::Hit(Value::Bool(re.dot_all)),
                            "unicode" => Plan::Hit(Value::Bool(re.unicode)),
                            _ => Plan::Miss,
                        }
                    } else {
                        Plan::Miss
                    }
                }
                _ => Plan::Miss,
            }
        };
        match plan {
            Plan::Miss => Ok(None),
            Plan::Hit(v) => Ok(Some(v)),
            Plan::AllocString(s) => Ok(Some(self.alloc_string(s))),
            Plan::Namespace(module) => crate::modules::namespace_get(self, module, key).map(Some),
        }
    }

    // === set ===

    pub fn set_property(&mut self, base: Value, key: PropKey, value: Value) -> RunResult<()> {
        let Value::Ref(id) = base else {
            if base.is_nullish() {
                let key = self.key_display(key);
                return Err(self.throw_type_error(format!("Cannot set properties of {base:?} (setting '{key}')")));
            }
            // Writes to primitive bases are silently dropped.
            return Ok(());
        };
        if !matches!(self.heap.get(id), HeapData::Object(_)) {
            return Ok(());
        }

        // Payload-backed writes.
        if self.set_virtual_property(id, key, value)? {
            return Ok(());
        }

        // A setter anywhere on the chain runs instead of creating a data
        // property.
        let mut cursor = id;
        loop {
            let obj = self.heap.object(cursor);
            if let Some(prop) = obj.get_own(key) {
                match prop.value {
                    PropValue::Accessor { set, .. } => {
                        return match set {
                            Some(setter) => {
                                self.call_value(setter, base, &[value])?;
                                Ok(())
                            }
                            None => Ok(()),
                        };
                    }
                    PropValue::Data(_) => {
                        if cursor == id {
                            if prop.writable {
                                self.heap.object_mut(id).set_data(key, value);
                            }
                            return Ok(());
                        }
                        // Inherited data property: shadow with an own one.
                        break;
                    }
                }
            }
            match obj.proto {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        let obj = self.heap.object_mut(id);
        if obj.extensible || obj.has_own(key) {
            obj.set_data(key, value);
        }
        Ok(())
    }

    /// Payload-intercepted writes; true when handled.
    fn set_virtual_property(&mut self, id: HeapId, key: PropKey, value: Value) -> RunResult<bool> {
        enum Plan {
            Miss,
            ArrayLength,
            ArrayIndex(usize, usize),
            Typed(crate::types::TypedArrayData, usize),
            NamespaceWrite,
        }
        let length_key = matches!(key, PropKey::Str(s) if self.interns.get(s) == "length");
        let plan = match &self.heap.object(id).payload {
            ObjectPayload::Array(elements) => {
                if length_key {
                    Plan::ArrayLength
                } else if let PropKey::Index(i) = key {
                    Plan::ArrayIndex(i as usize, elements.len())
                } else {
                    Plan::Miss
                }
            }
            ObjectPayload::TypedArray(view) => {
                if let PropKey::Index(i) = key {
                    Plan::Typed(*view, i as usize)
                } else {
                    Plan::Miss
                }
            }
            ObjectPayload::Namespace(_) => Plan::NamespaceWrite,
            _ => Plan::Miss,
        };
        match plan {
            Plan::Miss => Ok(false),
            Plan::ArrayLength => {
                let new_len = self.value_to_uint32(value)? as usize;
                let elements = self.heap.object_mut(id).elements_mut().expect("array payload");
                elements.resize(new_len, Value::Undefined);
                Ok(true)
            }
            Plan::ArrayIndex(i, len) => {
                let elements = self.heap.object_mut(id).elements_mut().expect("array payload");
                if i < len {
                    elements[i] = value;
                } else {
                    elements.resize(i, Value::Undefined);
                    elements.push(value);
                }
                Ok(true)
            }
            Plan::Typed(view, i) => {
                let n = self.to_number(value)?;
                if i < view.length {
                    let offset = view.byte_offset + i * view.kind.element_size();
                    if let HeapData::Object(buffer_obj) = self.heap.get_mut(view.buffer) {
                        if let ObjectPayload::ArrayBuffer(bytes) = &mut buffer_obj.payload {
                            view.kind.write(bytes, offset, n);
                        }
                    }
                }
                Ok(true)
            }
            Plan::NamespaceWrite => {
                let key = self.key_display(key);
                Err(self.throw_type_error(format!("cannot assign to read-only property '{key}' of a module namespace")))
            }
        }
    }

    // === has / delete ===

    /// `in` operator / HasProperty: walks the prototype chain without
    /// running accessors.
    pub fn has_property(&self, base: Value, key: PropKey) -> bool {
        let Value::Ref(id) = base else {
            return false;
        };
        if !matches!(self.heap.get(id), HeapData::Object(_)) {
            return false;
        }
        if let Some(true) = self.has_virtual(id, key) {
            return true;
        }
        let mut cursor = id;
        loop {
            let obj = self.heap.object(cursor);
            if obj.has_own(key) {
                return true;
            }
            match obj.proto {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
    }

    fn has_virtual(&self, id: HeapId, key: PropKey) -> Option<bool> {
        let obj = self.heap.object(id);
        match (&obj.payload, key) {
            (ObjectPayload::Array(elements), PropKey::Index(i)) => Some((i as usize) < elements.len()),
            (ObjectPayload::TypedArray(view), PropKey::Index(i)) => Some((i as usize) < view.length),
            _ => None,
        }
    }

    pub fn delete_property(&mut self, base: Value, key: PropKey) -> RunResult<bool> {
        let Value::Ref(id) = base else {
            return Ok(true);
        };
        if !matches!(self.heap.get(id), HeapData::Object(_)) {
            return Ok(true);
        }
        if let PropKey::Index(i) = key {
            if let Some(elements) = self.heap.object_mut(id).elements_mut() {
                let i = i as usize;
                if i < elements.len() {
                    elements[i] = Value::Undefined;
                    return Ok(true);
                }
            }
        }
        let obj = self.heap.object_mut(id);
        if let Some(prop) = obj.get_own(key) {
            if !prop.configurable {
                return Ok(false);
            }
        }
        Ok(obj.delete(key) || true)
    }

    // === enumeration ===

    /// Own enumerable string keys (`Object.keys` order).
    pub fn own_enumerable_string_keys(&self, id: HeapId) -> Vec<PropKey> {
        let obj = self.heap.object(id);
        obj.own_keys()
            .into_iter()
            .filter(|key| match key {
                PropKey::Symbol(_) => false,
                PropKey::Index(_) => true,
                _ => obj.get_own(*key).is_none_or(|p| p.enumerable),
            })
            .filter(|key| match key {
                PropKey::Index(i) => {
                    obj.elements().is_some_and(|e| (*i as usize) < e.len()) || obj.has_own(*key)
                }
                _ => obj.has_own(*key) || matches!(obj.payload, ObjectPayload::Array(_)),
            })
            .collect()
    }

    /// Keys for `for-in`: own enumerable string keys plus inherited ones,
    /// outer-ward, each name visited once.
    pub fn for_in_keys(&mut self, base: Value) -> Vec<PropKey> {
        let Value::Ref(id) = base else {
            return Vec::new();
        };
        if !matches!(self.heap.get(id), HeapData::Object(_)) {
            return Vec::new();
        }
        let mut seen = ahash::AHashSet::new();
        let mut out = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            for key in self.own_enumerable_string_keys(current) {
                if seen.insert(key) {
                    out.push(key);
                }
            }
            cursor = self.heap.object(current).proto;
        }
        out
    }

    /// A key as a value (string or symbol), for for-in loops and
    /// `Object.keys`.
    pub fn key_to_value(&mut self, key: PropKey) -> Value {
        match key {
            PropKey::Str(id) => Value::Str(id),
            PropKey::Index(i) => {
                let s = i.to_string();
                self.alloc_string(s)
            }
            PropKey::Symbol(id) => Value::Symbol(id),
        }
    }

    /// Defines an own property wholesale (`Object.defineProperty` path).
    pub fn define_own_property(&mut self, id: HeapId, key: PropKey, prop: Property) -> RunResult<()> {
        // Array index definitions materialize into the element store.
        if let (PropKey::Index(i), PropValue::Data(v)) = (key, prop.value) {
            if let Some(elements) = self.heap.object_mut(id).elements_mut() {
                let i = i as usize;
                if i < elements.len() {
                    elements[i] = v;
                } else {
                    elements.resize(i, Value::Undefined);
                    elements.push(v);
                }
                return Ok(());
            }
        }
        self.heap.object_mut(id).define(key, prop);
        Ok(())
    }
}
