//! `Function.prototype`: call, apply, bind, toString.

use crate::{
    builtins::{Builtin, define_method},
    error::RunResult,
    eval::Interp,
    types::{BoundData, ClassTag, JsObject, ObjectPayload, PropKey, Property},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionFn {
    Call,
    Apply,
    Bind,
    ToString,
}

pub(crate) fn call(interp: &mut Interp, f: FunctionFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        FunctionFn::Call => {
            if !interp.is_callable(this) {
                return Err(interp.throw_type_error("Function.prototype.call called on a non-function"));
            }
            let call_this = args.first().copied().unwrap_or(Value::Undefined);
            let rest = args.get(1..).unwrap_or(&[]);
            interp.call_value(this, call_this, rest)
        }
        FunctionFn::Apply => {
            if !interp.is_callable(this) {
                return Err(interp.throw_type_error("Function.prototype.apply called on a non-function"));
            }
            let call_this = args.first().copied().unwrap_or(Value::Undefined);
            let arg_list = match args.get(1).copied() {
                None | Some(Value::Undefined | Value::Null) => Vec::new(),
                Some(list) => interp.iterate_collect(list)?,
            };
            interp.call_value(this, call_this, &arg_list)
        }
        FunctionFn::Bind => {
            if !interp.is_callable(this) {
                return Err(interp.throw_type_error("Function.prototype.bind called on a non-function"));
            }
            let bound_this = args.first().copied().unwrap_or(Value::Undefined);
            let bound_args = args.get(1..).unwrap_or(&[]).to_vec();
            let proto = interp.realm.function_proto;
            let obj = JsObject::with_payload(
                ClassTag::Function,
                Some(proto),
                ObjectPayload::Bound(Box::new(BoundData {
                    target: this,
                    this_value: bound_this,
                    bound_args,
                })),
            );
            let id = interp.heap.alloc_object(obj);
            // `bound <name>`.
            let name_key = PropKey::Str(interp.interns.intern("name"));
            let target_name = interp.get_property(this, name_key)?;
            let target_name = interp.string_content(target_name).unwrap_or_default();
            let bound_name = interp.alloc_string(format!("bound {target_name}"));
            interp.heap.object_mut(id).define(name_key, Property::method(bound_name));
            Ok(Value::Ref(id))
        }
        FunctionFn::ToString => {
            let name_key = PropKey::Str(interp.interns.intern("name"));
            let name = interp.get_property(this, name_key)?;
            let name = interp.string_content(name).unwrap_or_default();
            Ok(interp.alloc_string(format!("function {name}() {{ [native or script code] }}")))
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.function_proto;
    define_method(interp, proto, "call", Builtin::FunctionB(FunctionFn::Call), 1);
    define_method(interp, proto, "apply", Builtin::FunctionB(FunctionFn::Apply), 2);
    define_method(interp, proto, "bind", Builtin::FunctionB(FunctionFn::Bind), 1);
    define_method(interp, proto, "toString", Builtin::FunctionB(FunctionFn::ToString), 0);
}
