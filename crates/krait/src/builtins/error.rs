//! `Error` constructors and `Error.prototype`.

use crate::{
    builtins::{Builtin, CtorFn, define_method, install_ctor},
    error::{ErrorKind, RunResult},
    eval::Interp,
    intern::StringId,
    types::{PropKey, Property},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorFn {
    ToString,
}

/// `new Error(message)` and subclasses; also reachable without `new`.
pub(crate) fn construct_error(interp: &mut Interp, kind: ErrorKind, args: &[Value]) -> RunResult<Value> {
    let message = match args.first().copied() {
        None | Some(Value::Undefined) => String::new(),
        Some(v) => interp.to_string_value(v)?,
    };
    let value = interp.make_error(kind, message);
    // An options object with `cause` attaches it.
    if let Some(options) = args.get(1).copied() {
        if options.is_object(&interp.heap) {
            let cause_key = PropKey::Str(interp.interns.intern("cause"));
            if interp.has_property(options, cause_key) {
                let cause = interp.get_property(options, cause_key)?;
                if let Value::Ref(id) = value {
                    interp.heap.object_mut(id).define(cause_key, Property::method(cause));
                }
            }
        }
    }
    Ok(value)
}

pub(crate) fn call(interp: &mut Interp, f: ErrorFn, this: Value, _args: &[Value]) -> RunResult<Value> {
    match f {
        ErrorFn::ToString => {
            let name_key = PropKey::Str(interp.interns.intern("name"));
            let msg_key = PropKey::Str(interp.interns.intern("message"));
            let name = interp.get_property(this, name_key)?;
            let name = interp.string_content(name).unwrap_or_else(|| "Error".to_owned());
            let message = interp.get_property(this, msg_key)?;
            let message = interp.string_content(message).unwrap_or_default();
            if message.is_empty() {
                Ok(interp.alloc_string(name))
            } else {
                Ok(interp.alloc_string(format!("{name}: {message}")))
            }
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let base_proto = interp.realm.error_protos[0];
    define_method(interp, base_proto, "toString", Builtin::ErrorB(ErrorFn::ToString), 0);
    let kinds = [
        (ErrorKind::Error, "Error"),
        (ErrorKind::TypeError, "TypeError"),
        (ErrorKind::RangeError, "RangeError"),
        (ErrorKind::ReferenceError, "ReferenceError"),
        (ErrorKind::SyntaxError, "SyntaxError"),
    ];
    for (kind, name) in kinds {
        let proto = interp.realm.error_proto(kind);
        let name_key = PropKey::Str(interp.interns.intern("name"));
        let name_val = Value::Str(interp.interns.intern(name));
        interp.heap.object_mut(proto).define(name_key, Property::method(name_val));
        let msg_key = PropKey::Str(interp.interns.intern("message"));
        interp
            .heap
            .object_mut(proto)
            .define(msg_key, Property::method(Value::Str(StringId::EMPTY)));
        install_ctor(interp, name, CtorFn::Error(kind), proto, 1);
    }
}
