//! Host-facing values and host-registered functions.
//!
//! [`HostValue`] is the owned, heap-independent value type exchanged with the
//! embedding application: it can be built freely, passed into globals, and
//! returned from evaluation. Host functions receive their arguments as
//! `HostValue`s and their errors are wrapped as JavaScript `Error`s inside
//! the script.

use num_bigint::BigInt;

use crate::{
    error::RunResult,
    eval::Interp,
    heap::HeapData,
    intern::HostFnId,
    types::{ClassTag, JsObject, ObjectPayload, PropKey, Property, PropValue, TypedArrayData, TypedKind},
    value::Value,
};

/// A value crossing the host boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    /// Integral numbers surface as `Int`; the engine stores all numbers as
    /// f64 either way.
    Int(i64),
    Float(f64),
    BigInt(BigInt),
    String(String),
    /// Becomes a `Uint8Array` inside the engine.
    Bytes(Vec<u8>),
    Array(Vec<HostValue>),
    /// Insertion-ordered key/value pairs; becomes a plain object.
    Object(Vec<(String, HostValue)>),
}

impl HostValue {
    /// Numeric view across `Int` and `Float`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// A registered host function.
pub(crate) enum HostFn {
    Plain(Box<dyn FnMut(Vec<HostValue>) -> Result<HostValue, String>>),
    WithThis(Box<dyn FnMut(HostValue, Vec<HostValue>) -> Result<HostValue, String>>),
}

impl std::fmt::Debug for HostFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("HostFn::Plain"),
            Self::WithThis(_) => f.write_str("HostFn::WithThis"),
        }
    }
}

/// Invokes a host function from script.
pub(crate) fn call_host_fn(interp: &mut Interp, id: HostFnId, this: Value, args: &[Value]) -> RunResult<Value> {
    let host_args: Vec<HostValue> = args.iter().map(|arg| to_host_value(interp, *arg, 0)).collect();
    let host_this = to_host_value(interp, this, 0);
    let result = match &mut interp.host_fns[id.index()] {
        HostFn::Plain(f) => f(host_args),
        HostFn::WithThis(f) => f(host_this, host_args),
    };
    match result {
        Ok(value) => Ok(from_host_value(interp, value)),
        Err(message) => Err(interp.throw_error(crate::error::ErrorKind::Error, message)),
    }
}

const MAX_CONVERT_DEPTH: usize = 16;

/// Engine value to host value. Functions and exotic objects convert to
/// `Undefined`; cycles cut off at a depth cap.
pub(crate) fn to_host_value(interp: &Interp, value: Value, depth: usize) -> HostValue {
    if depth > MAX_CONVERT_DEPTH {
        return HostValue::Undefined;
    }
    match value {
        Value::Undefined | Value::Symbol(_) => HostValue::Undefined,
        Value::Null => HostValue::Null,
        Value::Bool(b) => HostValue::Bool(b),
        Value::Number(n) => {
            if n.is_finite() && n.fract() == 0.0 && n.abs() <= i64::MAX as f64 {
                HostValue::Int(n as i64)
            } else {
                HostValue::Float(n)
            }
        }
        Value::Str(id) => HostValue::String(interp.interns.get(id).to_owned()),
        Value::Ref(id) => match interp.heap.get(id) {
            HeapData::Str(s) => HostValue::String(s.clone()),
            HeapData::BigInt(b) => HostValue::BigInt(b.clone()),
            HeapData::Object(obj) => match &obj.payload {
                ObjectPayload::Array(elements) => {
                    HostValue::Array(elements.iter().map(|e| to_host_value(interp, *e, depth + 1)).collect())
                }
                ObjectPayload::TypedArray(view) if view.kind == TypedKind::Uint8 => {
                    let bytes = match &interp.heap.object(view.buffer).payload {
                        ObjectPayload::ArrayBuffer(bytes) => {
                            bytes[view.byte_offset..view.byte_offset + view.length].to_vec()
                        }
                        _ => Vec::new(),
                    };
                    HostValue::Bytes(bytes)
                }
                _ if obj.is_callable() => HostValue::Undefined,
                _ => {
                    let mut pairs = Vec::new();
                    for (key, prop) in obj.props_iter() {
                        if !prop.enumerable {
                            continue;
                        }
                        let PropValue::Data(v) = prop.value else { continue };
                        let key_text = match key {
                            PropKey::Str(s) => interp.interns.get(*s).to_owned(),
                            PropKey::Index(i) => i.to_string(),
                            PropKey::Symbol(_) => continue,
                        };
                        pairs.push((key_text, to_host_value(interp, v, depth + 1)));
                    }
                    HostValue::Object(pairs)
                }
            },
        },
    }
}

/// Host value to engine value.
pub(crate) fn from_host_value(interp: &mut Interp, value: HostValue) -> Value {
    match value {
        HostValue::Undefined => Value::Undefined,
        HostValue::Null => Value::Null,
        HostValue::Bool(b) => Value::Bool(b),
        HostValue::Int(i) => Value::Number(i as f64),
        HostValue::Float(f) => Value::Number(f),
        HostValue::BigInt(b) => interp.alloc_bigint_value(b),
        HostValue::String(s) => interp.alloc_string(s),
        HostValue::Bytes(bytes) => {
            let length = bytes.len();
            let buffer_proto = interp.realm.arraybuffer_proto;
            let buffer = interp.heap.alloc_object(JsObject::with_payload(
                ClassTag::ArrayBuffer,
                Some(buffer_proto),
                ObjectPayload::ArrayBuffer(bytes),
            ));
            let proto = interp.realm.typedarray_proto;
            let obj = JsObject::with_payload(
                ClassTag::TypedArray,
                Some(proto),
                ObjectPayload::TypedArray(TypedArrayData {
                    buffer,
                    kind: TypedKind::Uint8,
                    byte_offset: 0,
                    length,
                }),
            );
            Value::Ref(interp.heap.alloc_object(obj))
        }
        HostValue::Array(items) => {
            let elements: Vec<Value> = items.into_iter().map(|item| from_host_value(interp, item)).collect();
            interp.new_array(elements)
        }
        HostValue::Object(pairs) => {
            let id = interp.new_object();
            for (key, value) in pairs {
                let v = from_host_value(interp, value);
                let k = interp.prop_key_from_str(&key);
                interp.heap.object_mut(id).define(k, Property::data(v));
            }
            Value::Ref(id)
        }
    }
}
