//! `Symbol`: descriptions, the global registry, and well-known symbols.

use crate::{
    builtins::{Builtin, CtorFn, define_method, install_ctor},
    error::RunResult,
    eval::Interp,
    types::{PropKey, Property},
    value::{SymbolId, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SymbolFn {
    For,
    KeyFor,
    ToString,
}

/// `Symbol(description)`.
pub(crate) fn make_symbol(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let description = match args.first().copied() {
        None | Some(Value::Undefined) => None,
        Some(v) => Some(interp.to_string_value(v)?),
    };
    Ok(Value::Symbol(interp.symbols.alloc(description)))
}

pub(crate) fn call(interp: &mut Interp, f: SymbolFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        SymbolFn::For => {
            let key = match args.first() {
                Some(v) => interp.to_string_value(*v)?,
                None => "undefined".to_owned(),
            };
            if let Some(&existing) = interp.symbols.registry.get(&key) {
                return Ok(Value::Symbol(existing));
            }
            let id = interp.symbols.alloc(Some(key.clone()));
            interp.symbols.registry.insert(key, id);
            Ok(Value::Symbol(id))
        }
        SymbolFn::KeyFor => {
            let Some(Value::Symbol(id)) = args.first().copied() else {
                return Err(interp.throw_type_error("Symbol.keyFor expects a symbol"));
            };
            let found = interp
                .symbols
                .registry
                .iter()
                .find_map(|(key, &sym)| (sym == id).then(|| key.clone()));
            Ok(match found {
                Some(key) => interp.alloc_string(key),
                None => Value::Undefined,
            })
        }
        SymbolFn::ToString => {
            let Value::Symbol(id) = this else {
                return Err(interp.throw_type_error("Symbol.prototype.toString requires a symbol receiver"));
            };
            let description = interp.symbols.descriptions[id.index()].clone().unwrap_or_default();
            Ok(interp.alloc_string(format!("Symbol({description})")))
        }
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.symbol_proto;
    define_method(interp, proto, "toString", Builtin::SymbolB(SymbolFn::ToString), 0);
    let ctor = install_ctor(interp, "Symbol", CtorFn::Symbol, proto, 0);
    define_method(interp, ctor, "for", Builtin::SymbolB(SymbolFn::For), 1);
    define_method(interp, ctor, "keyFor", Builtin::SymbolB(SymbolFn::KeyFor), 1);
    let iterator_key = PropKey::Str(interp.interns.intern("iterator"));
    interp
        .heap
        .object_mut(ctor)
        .define(iterator_key, Property::constant(Value::Symbol(SymbolId::ITERATOR)));
    let async_iterator_key = PropKey::Str(interp.interns.intern("asyncIterator"));
    interp
        .heap
        .object_mut(ctor)
        .define(async_iterator_key, Property::constant(Value::Symbol(SymbolId::ASYNC_ITERATOR)));
}
