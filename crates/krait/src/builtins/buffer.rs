//! `ArrayBuffer`, typed arrays, and `DataView`.

use crate::{
    builtins::{Builtin, CtorFn, define_method, install_ctor},
    error::RunResult,
    eval::Interp,
    heap::{HeapData, HeapId},
    types::{ClassTag, DataViewData, JsObject, ObjectPayload, TypedArrayData, TypedKind},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BufferFn {
    ArrayBufferSlice,
    ArrayBufferIsView,
    TypedSet,
    TypedSubarray,
    TypedFill,
    DataViewGet(TypedKind),
    DataViewSet(TypedKind),
}

pub(crate) fn construct_array_buffer(interp: &mut Interp, args: &[Value], is_new: bool) -> RunResult<Value> {
    if !is_new {
        return Err(interp.throw_type_error("ArrayBuffer constructor requires 'new'"));
    }
    let length = match args.first() {
        Some(v) => interp.to_number(*v)?,
        None => 0.0,
    };
    if length < 0.0 || length.fract() != 0.0 || length > 2_147_483_647.0 {
        return Err(interp.throw_range_error("invalid ArrayBuffer length"));
    }
    let proto = interp.realm.arraybuffer_proto;
    let obj = JsObject::with_payload(
        ClassTag::ArrayBuffer,
        Some(proto),
        ObjectPayload::ArrayBuffer(vec![0u8; length as usize]),
    );
    Ok(Value::Ref(interp.heap.alloc_object(obj)))
}

fn buffer_len(interp: &Interp, buffer: HeapId) -> usize {
    match &interp.heap.object(buffer).payload {
        ObjectPayload::ArrayBuffer(bytes) => bytes.len(),
        _ => 0,
    }
}

fn as_array_buffer(interp: &mut Interp, value: Value) -> RunResult<HeapId> {
    if let Value::Ref(id) = value {
        if let HeapData::Object(obj) = interp.heap.get(id) {
            if matches!(obj.payload, ObjectPayload::ArrayBuffer(_)) {
                return Ok(id);
            }
        }
    }
    Err(interp.throw_type_error("expected an ArrayBuffer"))
}

pub(crate) fn construct_typed_array(
    interp: &mut Interp,
    kind: TypedKind,
    args: &[Value],
    is_new: bool,
) -> RunResult<Value> {
    if !is_new {
        return Err(interp.throw_type_error(format!("{} constructor requires 'new'", kind.name())));
    }
    let element_size = kind.element_size();
    let (buffer, byte_offset, length) = match args.first().copied() {
        None => {
            let buffer = alloc_buffer(interp, 0);
            (buffer, 0, 0)
        }
        Some(Value::Number(n)) => {
            if n < 0.0 || n.fract() != 0.0 {
                return Err(interp.throw_range_error("invalid typed array length"));
            }
            let length = n as usize;
            let buffer = alloc_buffer(interp, length * element_size);
            (buffer, 0, length)
        }
        Some(arg) => {
            if let Value::Ref(id) = arg {
                if matches!(interp.heap.get(id), HeapData::Object(obj) if matches!(obj.payload, ObjectPayload::ArrayBuffer(_)))
                {
                    let byte_offset = match args.get(1) {
                        Some(v) => interp.to_number(*v)? as usize,
                        None => 0,
                    };
                    let total = buffer_len(interp, id);
                    if byte_offset > total || byte_offset % element_size != 0 {
                        return Err(interp.throw_range_error("invalid typed array offset"));
                    }
                    let length = match args.get(2) {
                        Some(v) => interp.to_number(*v)? as usize,
                        None => (total - byte_offset) / element_size,
                    };
                    if byte_offset + length * element_size > total {
                        return Err(interp.throw_range_error("typed array extends past buffer end"));
                    }
                    (id, byte_offset, length)
                } else {
                    // Array-like or iterable source.
                    let items = interp.iterate_collect(arg)?;
                    let buffer = alloc_buffer(interp, items.len() * element_size);
                    let view = TypedArrayData {
                        buffer,
                        kind,
                        byte_offset: 0,
                        length: items.len(),
                    };
                    let value = alloc_view(interp, view);
                    for (i, item) in items.into_iter().enumerate() {
                        let n = interp.to_number(item)?;
                        write_element(interp, view, i, n);
                    }
                    return Ok(value);
                }
            } else {
                let n = interp.to_number(arg)?;
                let length = n.max(0.0) as usize;
                let buffer = alloc_buffer(interp, length * element_size);
                (buffer, 0, length)
            }
        }
    };
    Ok(alloc_view(
        interp,
        TypedArrayData {
            buffer,
            kind,
            byte_offset,
            length,
        },
    ))
}

fn alloc_buffer(interp: &mut Interp, len: usize) -> HeapId {
    let proto = interp.realm.arraybuffer_proto;
    interp.heap.alloc_object(JsObject::with_payload(
        ClassTag::ArrayBuffer,
        Some(proto),
        ObjectPayload::ArrayBuffer(vec![0u8; len]),
    ))
}

fn alloc_view(interp: &mut Interp, view: TypedArrayData) -> Value {
    let proto = interp.realm.typedarray_proto;
    let obj = JsObject::with_payload(ClassTag::TypedArray, Some(proto), ObjectPayload::TypedArray(view));
    let id = interp.heap.alloc_object(obj);
    let buffer_key = crate::types::PropKey::Str(interp.interns.intern("buffer"));
    interp
        .heap
        .object_mut(id)
        .define(buffer_key, crate::types::Property::method(Value::Ref(view.buffer)));
    Value::Ref(id)
}

fn write_element(interp: &mut Interp, view: TypedArrayData, index: usize, value: f64) {
    if index >= view.length {
        return;
    }
    let offset = view.byte_offset + index * view.kind.element_size();
    if let HeapData::Object(obj) = interp.heap.get_mut(view.buffer) {
        if let ObjectPayload::ArrayBuffer(bytes) = &mut obj.payload {
            view.kind.write(bytes, offset, value);
        }
    }
}

fn this_typed(interp: &mut Interp, this: Value) -> RunResult<TypedArrayData> {
    if let Value::Ref(id) = this {
        if let HeapData::Object(obj) = interp.heap.get(id) {
            if let ObjectPayload::TypedArray(view) = obj.payload {
                return Ok(view);
            }
        }
    }
    Err(interp.throw_type_error("method requires a typed array receiver"))
}

fn this_data_view(interp: &mut Interp, this: Value) -> RunResult<DataViewData> {
    if let Value::Ref(id) = this {
        if let HeapData::Object(obj) = interp.heap.get(id) {
            if let ObjectPayload::DataView(view) = obj.payload {
                return Ok(view);
            }
        }
    }
    Err(interp.throw_type_error("method requires a DataView receiver"))
}

pub(crate) fn construct_data_view(interp: &mut Interp, args: &[Value], is_new: bool) -> RunResult<Value> {
    if !is_new {
        return Err(interp.throw_type_error("DataView constructor requires 'new'"));
    }
    let buffer_arg = args.first().copied().unwrap_or(Value::Undefined);
    let buffer = as_array_buffer(interp, buffer_arg)?;
    let total = buffer_len(interp, buffer);
    let byte_offset = match args.get(1) {
        Some(v) => interp.to_number(*v)? as usize,
        None => 0,
    };
    let byte_length = match args.get(2) {
        Some(v) => interp.to_number(*v)? as usize,
        None => total.saturating_sub(byte_offset),
    };
    if byte_offset + byte_length > total {
        return Err(interp.throw_range_error("DataView extends past buffer end"));
    }
    let proto = interp.realm.dataview_proto;
    let obj = JsObject::with_payload(
        ClassTag::DataView,
        Some(proto),
        ObjectPayload::DataView(DataViewData {
            buffer,
            byte_offset,
            byte_length,
        }),
    );
    Ok(Value::Ref(interp.heap.alloc_object(obj)))
}

pub(crate) fn call(interp: &mut Interp, f: BufferFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        BufferFn::ArrayBufferIsView => {
            let v = args.first().copied().unwrap_or(Value::Undefined);
            let is_view = matches!(v, Value::Ref(id)
                if matches!(interp.heap.get(id), HeapData::Object(obj)
                    if matches!(obj.payload, ObjectPayload::TypedArray(_) | ObjectPayload::DataView(_))));
            Ok(Value::Bool(is_view))
        }
        BufferFn::ArrayBufferSlice => {
            let buffer = as_array_buffer(interp, this)?;
            let bytes = match &interp.heap.object(buffer).payload {
                ObjectPayload::ArrayBuffer(bytes) => bytes.clone(),
                _ => Vec::new(),
            };
            let len = bytes.len();
            let rel = |interp: &mut Interp, v: Option<Value>, default: usize| -> RunResult<usize> {
                match v {
                    None | Some(Value::Undefined) => Ok(default),
                    Some(v) => {
                        let n = interp.to_integer_or_infinity(v)?;
                        Ok(if n < 0.0 {
                            (len as f64 + n).max(0.0) as usize
                        } else {
                            (n as usize).min(len)
                        })
                    }
                }
            };
            let start = rel(interp, args.first().copied(), 0)?;
            let end = rel(interp, args.get(1).copied(), len)?.max(start);
            let proto = interp.realm.arraybuffer_proto;
            let obj = JsObject::with_payload(
                ClassTag::ArrayBuffer,
                Some(proto),
                ObjectPayload::ArrayBuffer(bytes[start..end].to_vec()),
            );
            Ok(Value::Ref(interp.heap.alloc_object(obj)))
        }
        BufferFn::TypedSet => {
            let view = this_typed(interp, this)?;
            let source = args.first().copied().unwrap_or(Value::Undefined);
            let offset = match args.get(1) {
                Some(v) => interp.to_number(*v)? as usize,
                None => 0,
            };
            let items = interp.iterate_collect(source)?;
            for (i, item) in items.into_iter().enumerate() {
                let n = interp.to_number(item)?;
                write_element(interp, view, offset + i, n);
            }
            Ok(Value::Undefined)
        }
        BufferFn::TypedSubarray => {
            let view = this_typed(interp, this)?;
            let len = view.length;
            let rel = |interp: &mut Interp, v: Option<Value>, default: usize| -> RunResult<usize> {
                match v {
                    None | Some(Value::Undefined) => Ok(default),
                    Some(v) => {
                        let n = interp.to_integer_or_infinity(v)?;
                        Ok(if n < 0.0 {
                            (len as f64 + n).max(0.0) as usize
                        } else {
                            (n as usize).min(len)
                        })
                    }
                }
            };
            let start = rel(interp, args.first().copied(), 0)?;
            let end = rel(interp, args.get(1).copied(), len)?.max(start);
            Ok(alloc_view(
                interp,
                TypedArrayData {
                    buffer: view.buffer,
                    kind: view.kind,
                    byte_offset: view.byte_offset + start * view.kind.element_size(),
                    length: end - start,
                },
            ))
        }
        BufferFn::TypedFill => {
            let view = this_typed(interp, this)?;
            let value = match args.first() {
                Some(v) => interp.to_number(*v)?,
                None => 0.0,
            };
            for i in 0..view.length {
                write_element(interp, view, i, value);
            }
            Ok(this)
        }
        BufferFn::DataViewGet(kind) => {
            let view = this_data_view(interp, this)?;
            let offset = match args.first() {
                Some(v) => interp.to_number(*v)? as usize,
                None => 0,
            };
            if offset + kind.element_size() > view.byte_length {
                return Err(interp.throw_range_error("offset is outside the bounds of the DataView"));
            }
            let value = match &interp.heap.object(view.buffer).payload {
                ObjectPayload::ArrayBuffer(bytes) => kind.read(bytes, view.byte_offset + offset),
                _ => f64::NAN,
            };
            Ok(Value::Number(value))
        }
        BufferFn::DataViewSet(kind) => {
            let view = this_data_view(interp, this)?;
            let offset = match args.first() {
                Some(v) => interp.to_number(*v)? as usize,
                None => 0,
            };
            let value = match args.get(1) {
                Some(v) => interp.to_number(*v)?,
                None => f64::NAN,
            };
            if offset + kind.element_size() > view.byte_length {
                return Err(interp.throw_range_error("offset is outside the bounds of the DataView"));
            }
            if let HeapData::Object(obj) = interp.heap.get_mut(view.buffer) {
                if let ObjectPayload::ArrayBuffer(bytes) = &mut obj.payload {
                    kind.write(bytes, view.byte_offset + offset, value);
                }
            }
            Ok(Value::Undefined)
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.arraybuffer_proto;
    define_method(interp, proto, "slice", Builtin::BufferB(BufferFn::ArrayBufferSlice), 2);
    let ctor = install_ctor(interp, "ArrayBuffer", CtorFn::ArrayBuffer, proto, 1);
    define_method(interp, ctor, "isView", Builtin::BufferB(BufferFn::ArrayBufferIsView), 1);

    let proto = interp.realm.typedarray_proto;
    define_method(interp, proto, "set", Builtin::BufferB(BufferFn::TypedSet), 2);
    define_method(interp, proto, "subarray", Builtin::BufferB(BufferFn::TypedSubarray), 2);
    define_method(interp, proto, "fill", Builtin::BufferB(BufferFn::TypedFill), 1);
    // Typed arrays iterate through the generic index-walking iterator.
    crate::builtins::define_symbol_method(
        interp,
        proto,
        crate::value::SymbolId::ITERATOR,
        "[Symbol.iterator]",
        Builtin::ArrayB(crate::builtins::array::ArrayFn::Values),
    );
    let kinds = [
        ("Int8Array", TypedKind::Int8),
        ("Uint8Array", TypedKind::Uint8),
        ("Uint8ClampedArray", TypedKind::Uint8Clamped),
        ("Int16Array", TypedKind::Int16),
        ("Uint16Array", TypedKind::Uint16),
        ("Int32Array", TypedKind::Int32),
        ("Uint32Array", TypedKind::Uint32),
        ("Float32Array", TypedKind::Float32),
        ("Float64Array", TypedKind::Float64),
    ];
    for (name, kind) in kinds {
        install_ctor(interp, name, CtorFn::TypedArray(kind), proto, 3);
    }

    let proto = interp.realm.dataview_proto;
    let getters = [
        ("getInt8", TypedKind::Int8),
        ("getUint8", TypedKind::Uint8),
        ("getInt16", TypedKind::Int16),
        ("getUint16", TypedKind::Uint16),
        ("getInt32", TypedKind::Int32),
        ("getUint32", TypedKind::Uint32),
        ("getFloat32", TypedKind::Float32),
        ("getFloat64", TypedKind::Float64),
    ];
    for (name, kind) in getters {
        define_method(interp, proto, name, Builtin::BufferB(BufferFn::DataViewGet(kind)), 1);
    }
    let setters = [
        ("setInt8", TypedKind::Int8),
        ("setUint8", TypedKind::Uint8),
        ("setInt16", TypedKind::Int16),
        ("setUint16", TypedKind::Uint16),
        ("setInt32", TypedKind::Int32),
        ("setUint32", TypedKind::Uint32),
        ("setFloat32", TypedKind::Float32),
        ("setFloat64", TypedKind::Float64),
    ];
    for (name, kind) in setters {
        define_method(interp, proto, name, Builtin::BufferB(BufferFn::DataViewSet(kind)), 2);
    }
    install_ctor(interp, "DataView", CtorFn::DataView, proto, 3);
}
