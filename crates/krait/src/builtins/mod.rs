//! The standard library.
//!
//! Builtins are identified by a flat `Copy` enum; the function objects on
//! prototypes and the global object carry a `Native(Builtin)` payload and
//! dispatch through [`call_builtin`]. Constructors go through
//! [`construct_builtin`]. Functions that must capture engine state (promise
//! capabilities) use `NativeClosure` instead and live in `promise`.

pub(crate) mod array;
pub(crate) mod buffer;
pub(crate) mod collections;
pub(crate) mod console;
pub(crate) mod date;
pub(crate) mod error;
pub(crate) mod function;
pub(crate) mod global;
pub(crate) mod iterator;
pub(crate) mod js_generator;
pub(crate) mod json;
pub(crate) mod math;
pub(crate) mod number;
pub(crate) mod object;
pub(crate) mod promise;
pub(crate) mod regexp;
pub(crate) mod string;
pub(crate) mod symbol;

use crate::{
    error::{ErrorKind, RunResult},
    eval::{Interp, Realm},
    heap::{Heap, HeapId},
    types::{ClassTag, JsObject, PropKey, Property, TypedKind},
    value::Value,
};

/// Every native function reachable from script, grouped by area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Console(console::ConsoleFn),
    Global(global::GlobalFn),
    ObjectB(object::ObjectFn),
    ArrayB(array::ArrayFn),
    StringB(string::StringFn),
    NumberB(number::NumberFn),
    BooleanB(number::BooleanFn),
    Math(math::MathFn),
    Json(json::JsonFn),
    FunctionB(function::FunctionFn),
    PromiseB(promise::PromiseFn),
    MapB(collections::MapFn),
    SetB(collections::SetFn),
    DateB(date::DateFn),
    RegExpB(regexp::RegExpFn),
    SymbolB(symbol::SymbolFn),
    BigIntB(number::BigIntFn),
    BufferB(buffer::BufferFn),
    IterB(iterator::IterFn),
    GenB(js_generator::GenFn),
    ErrorB(error::ErrorFn),
    Ctor(CtorFn),
}

/// Constructor functions installed as globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CtorFn {
    Object,
    Array,
    Boolean,
    Number,
    String,
    Symbol,
    BigInt,
    Error(ErrorKind),
    Promise,
    Map,
    Set,
    WeakMap,
    WeakSet,
    Date,
    RegExp,
    ArrayBuffer,
    DataView,
    TypedArray(TypedKind),
}

/// Calls a builtin with an explicit `this`.
pub(crate) fn call_builtin(interp: &mut Interp, builtin: Builtin, this: Value, args: &[Value]) -> RunResult<Value> {
    match builtin {
        Builtin::Console(f) => console::call(interp, f, args),
        Builtin::Global(f) => global::call(interp, f, args),
        Builtin::ObjectB(f) => object::call(interp, f, this, args),
        Builtin::ArrayB(f) => array::call(interp, f, this, args),
        Builtin::StringB(f) => string::call(interp, f, this, args),
        Builtin::NumberB(f) => number::call_number(interp, f, this, args),
        Builtin::BooleanB(f) => number::call_boolean(interp, f, this, args),
        Builtin::Math(f) => math::call(interp, f, args),
        Builtin::Json(f) => json::call(interp, f, args),
        Builtin::FunctionB(f) => function::call(interp, f, this, args),
        Builtin::PromiseB(f) => promise::call_promise_fn(interp, f, this, args),
        Builtin::MapB(f) => collections::call_map(interp, f, this, args),
        Builtin::SetB(f) => collections::call_set(interp, f, this, args),
        Builtin::DateB(f) => date::call(interp, f, this, args),
        Builtin::RegExpB(f) => regexp::call(interp, f, this, args),
        Builtin::SymbolB(f) => symbol::call(interp, f, this, args),
        Builtin::BigIntB(f) => number::call_bigint(interp, f, this, args),
        Builtin::BufferB(f) => buffer::call(interp, f, this, args),
        Builtin::IterB(f) => iterator::call(interp, f, this, args),
        Builtin::GenB(f) => js_generator::call(interp, f, this, args),
        Builtin::ErrorB(f) => error::call(interp, f, this, args),
        Builtin::Ctor(f) => construct_ctor(interp, f, args, false),
    }
}

/// `new` on a builtin.
pub(crate) fn construct_builtin(interp: &mut Interp, builtin: Builtin, args: &[Value]) -> RunResult<Value> {
    match builtin {
        Builtin::Ctor(f) => construct_ctor(interp, f, args, true),
        _ => Err(interp.throw_type_error("builtin is not a constructor")),
    }
}

fn construct_ctor(interp: &mut Interp, ctor: CtorFn, args: &[Value], is_new: bool) -> RunResult<Value> {
    match ctor {
        CtorFn::Object => object::construct_object(interp, args),
        CtorFn::Array => array::construct_array(interp, args),
        CtorFn::Boolean => {
            let v = args.first().copied().unwrap_or(Value::Undefined);
            Ok(Value::Bool(interp.to_boolean(v)))
        }
        CtorFn::Number => {
            let v = args.first().copied().unwrap_or(Value::Number(0.0));
            Ok(Value::Number(interp.to_number(v)?))
        }
        CtorFn::String => {
            let v = args.first().copied();
            match v {
                None => Ok(Value::Str(crate::intern::StringId::EMPTY)),
                Some(v) => {
                    let s = interp.to_string_value(v)?;
                    Ok(interp.alloc_string(s))
                }
            }
        }
        CtorFn::Symbol => {
            if is_new {
                return Err(interp.throw_type_error("Symbol is not a constructor"));
            }
            symbol::make_symbol(interp, args)
        }
        CtorFn::BigInt => {
            if is_new {
                return Err(interp.throw_type_error("BigInt is not a constructor"));
            }
            number::make_bigint(interp, args)
        }
        CtorFn::Error(kind) => error::construct_error(interp, kind, args),
        CtorFn::Promise => {
            if !is_new {
                return Err(interp.throw_type_error("Promise constructor requires 'new'"));
            }
            promise::construct_promise(interp, args)
        }
        CtorFn::Map => collections::construct_map(interp, args, false, is_new),
        CtorFn::Set => collections::construct_set(interp, args, false, is_new),
        CtorFn::WeakMap => collections::construct_map(interp, args, true, is_new),
        CtorFn::WeakSet => collections::construct_set(interp, args, true, is_new),
        CtorFn::Date => date::construct_date(interp, args, is_new),
        CtorFn::RegExp => regexp::construct_regexp(interp, args),
        CtorFn::ArrayBuffer => buffer::construct_array_buffer(interp, args, is_new),
        CtorFn::DataView => buffer::construct_data_view(interp, args, is_new),
        CtorFn::TypedArray(kind) => buffer::construct_typed_array(interp, kind, args, is_new),
    }
}

// === realm construction ===

/// Allocates the prototype objects and the global object. Properties are
/// installed afterwards by [`install_globals`].
pub(crate) fn create_realm(heap: &mut Heap) -> Realm {
    let object_proto = heap.alloc_object(JsObject::new(ClassTag::Object, None));
    let mut alloc = |proto: HeapId| heap.alloc_object(JsObject::new(ClassTag::Object, Some(proto)));
    let function_proto = alloc(object_proto);
    let array_proto = alloc(object_proto);
    let string_proto = alloc(object_proto);
    let number_proto = alloc(object_proto);
    let boolean_proto = alloc(object_proto);
    let bigint_proto = alloc(object_proto);
    let symbol_proto = alloc(object_proto);
    let error_proto = alloc(object_proto);
    let type_error_proto = alloc(error_proto);
    let range_error_proto = alloc(error_proto);
    let reference_error_proto = alloc(error_proto);
    let syntax_error_proto = alloc(error_proto);
    let iterator_proto = alloc(object_proto);
    let generator_proto = alloc(iterator_proto);
    let async_generator_proto = alloc(object_proto);
    let promise_proto = alloc(object_proto);
    let map_proto = alloc(object_proto);
    let set_proto = alloc(object_proto);
    let weakmap_proto = alloc(object_proto);
    let weakset_proto = alloc(object_proto);
    let date_proto = alloc(object_proto);
    let regexp_proto = alloc(object_proto);
    let arraybuffer_proto = alloc(object_proto);
    let typedarray_proto = alloc(object_proto);
    let dataview_proto = alloc(object_proto);
    let global_obj = alloc(object_proto);
    Realm {
        global_obj,
        object_proto,
        function_proto,
        array_proto,
        string_proto,
        number_proto,
        boolean_proto,
        bigint_proto,
        symbol_proto,
        error_protos: [
            error_proto,
            type_error_proto,
            range_error_proto,
            reference_error_proto,
            syntax_error_proto,
        ],
        iterator_proto,
        generator_proto,
        async_generator_proto,
        promise_proto,
        map_proto,
        set_proto,
        weakmap_proto,
        weakset_proto,
        date_proto,
        regexp_proto,
        arraybuffer_proto,
        typedarray_proto,
        dataview_proto,
    }
}

/// Populates prototypes, constructors, and the global object.
pub(crate) fn install_globals(interp: &mut Interp) {
    object::install(interp);
    function::install(interp);
    array::install(interp);
    string::install(interp);
    number::install(interp);
    math::install(interp);
    json::install(interp);
    console::install(interp);
    global::install(interp);
    iterator::install(interp);
    js_generator::install(interp);
    install_promise(interp);
    collections::install(interp);
    date::install(interp);
    regexp::install(interp);
    symbol::install(interp);
    error::install(interp);
    buffer::install(interp);

    // globalThis refers to the global object itself.
    let global = interp.realm.global_obj;
    let key = PropKey::Str(interp.interns.intern("globalThis"));
    interp.heap.object_mut(global).define(key, Property::method(Value::Ref(global)));
    let nan_key = PropKey::Str(interp.interns.intern("NaN"));
    interp
        .heap
        .object_mut(global)
        .define(nan_key, Property::constant(Value::Number(f64::NAN)));
    let inf_key = PropKey::Str(interp.interns.intern("Infinity"));
    interp
        .heap
        .object_mut(global)
        .define(inf_key, Property::constant(Value::Number(f64::INFINITY)));
    let undef_key = PropKey::Str(interp.interns.intern("undefined"));
    interp
        .heap
        .object_mut(global)
        .define(undef_key, Property::constant(Value::Undefined));

    // Top-level `this` is the global object.
    interp.scopes.get_mut(crate::scope::ScopeId::GLOBAL).this_val = Some(Value::Ref(global));
}

fn install_promise(interp: &mut Interp) {
    let proto = interp.realm.promise_proto;
    define_method(interp, proto, "then", Builtin::PromiseB(promise::PromiseFn::Then), 2);
    define_method(interp, proto, "catch", Builtin::PromiseB(promise::PromiseFn::Catch), 1);
    define_method(interp, proto, "finally", Builtin::PromiseB(promise::PromiseFn::Finally), 1);
    let ctor = install_ctor(interp, "Promise", CtorFn::Promise, proto, 1);
    define_method(interp, ctor, "resolve", Builtin::PromiseB(promise::PromiseFn::Resolve), 1);
    define_method(interp, ctor, "reject", Builtin::PromiseB(promise::PromiseFn::Reject), 1);
    define_method(interp, ctor, "all", Builtin::PromiseB(promise::PromiseFn::All), 1);
    define_method(interp, ctor, "race", Builtin::PromiseB(promise::PromiseFn::Race), 1);
}

// === wiring helpers ===

/// Allocates a native function object.
pub(crate) fn native_fn(interp: &mut Interp, builtin: Builtin, name: &str, length: usize) -> Value {
    let proto = interp.realm.function_proto;
    let mut obj = JsObject::with_payload(ClassTag::Function, Some(proto), crate::types::ObjectPayload::Native(builtin));
    let name_key = PropKey::Str(interp.interns.intern("name"));
    let name_val = Value::Str(interp.interns.intern(name));
    obj.define(name_key, Property::method(name_val));
    let length_key = PropKey::Str(interp.interns.intern("length"));
    obj.define(length_key, Property::method(Value::Number(length as f64)));
    Value::Ref(interp.heap.alloc_object(obj))
}

/// Defines a non-enumerable method on `target`.
pub(crate) fn define_method(interp: &mut Interp, target: HeapId, name: &str, builtin: Builtin, length: usize) {
    let f = native_fn(interp, builtin, name, length);
    let key = PropKey::Str(interp.interns.intern(name));
    interp.heap.object_mut(target).define(key, Property::method(f));
}

/// Defines a method keyed by a well-known symbol.
pub(crate) fn define_symbol_method(
    interp: &mut Interp,
    target: HeapId,
    symbol: crate::value::SymbolId,
    name: &str,
    builtin: Builtin,
) {
    let f = native_fn(interp, builtin, name, 0);
    interp
        .heap
        .object_mut(target)
        .define(PropKey::Symbol(symbol), Property::method(f));
}

/// Creates a constructor function object, links `prototype`/`constructor`,
/// and installs it as a global. Returns the constructor's heap id for
/// attaching statics.
pub(crate) fn install_ctor(interp: &mut Interp, name: &str, ctor: CtorFn, proto: HeapId, length: usize) -> HeapId {
    let f = native_fn(interp, Builtin::Ctor(ctor), name, length);
    let Value::Ref(ctor_id) = f else { unreachable!() };
    let proto_key = PropKey::Str(interp.interns.intern("prototype"));
    interp
        .heap
        .object_mut(ctor_id)
        .define(proto_key, Property::constant(Value::Ref(proto)));
    let ctor_key = PropKey::Str(interp.interns.intern("constructor"));
    interp.heap.object_mut(proto).define(ctor_key, Property::method(f));
    let global = interp.realm.global_obj;
    let name_key = PropKey::Str(interp.interns.intern(name));
    interp.heap.object_mut(global).define(name_key, Property::method(f));
    ctor_id
}

/// Installs a namespace-style global object (`Math`, `JSON`, `console`).
pub(crate) fn install_namespace(interp: &mut Interp, name: &str) -> HeapId {
    let proto = interp.realm.object_proto;
    let id = interp.heap.alloc_object(JsObject::new(ClassTag::Object, Some(proto)));
    let global = interp.realm.global_obj;
    let key = PropKey::Str(interp.interns.intern(name));
    interp.heap.object_mut(global).define(key, Property::method(Value::Ref(id)));
    id
}
