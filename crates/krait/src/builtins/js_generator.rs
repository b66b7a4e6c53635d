//! `Generator.prototype` and `AsyncGenerator.prototype`.
//!
//! Sync generator methods run the state machine directly and wrap the
//! outcome in an iterator result; async generator methods return promises
//! that the machine settles when it reaches the next suspension.

use crate::{
    builtins::{Builtin, define_method, define_symbol_method},
    error::RunResult,
    eval::Interp,
    r#gen::machine::{self, ResumeInput, StepOutcome, make_iter_result},
    heap::{HeapData, HeapId},
    types::{GenKind, ObjectPayload},
    value::{SymbolId, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GenFn {
    Next,
    Throw,
    Return,
    AsyncNext,
    AsyncThrow,
    AsyncReturn,
    /// `[Symbol.iterator]` / `[Symbol.asyncIterator]`: returns `this`.
    SelfIter,
}

fn this_generator(interp: &mut Interp, this: Value) -> RunResult<(HeapId, GenKind)> {
    if let Value::Ref(id) = this {
        if let HeapData::Object(obj) = interp.heap.get(id) {
            if let ObjectPayload::Generator(data) = &obj.payload {
                return Ok((id, data.kind));
            }
            if matches!(obj.payload, ObjectPayload::GeneratorRunning) {
                return Err(interp.throw_type_error("generator is already running"));
            }
        }
    }
    Err(interp.throw_type_error("method requires a generator receiver"))
}

pub(crate) fn call(interp: &mut Interp, f: GenFn, this: Value, args: &[Value]) -> RunResult<Value> {
    if f == GenFn::SelfIter {
        return Ok(this);
    }
    let (gen_id, kind) = this_generator(interp, this)?;
    let arg = args.first().copied().unwrap_or(Value::Undefined);
    match f {
        GenFn::Next | GenFn::Throw | GenFn::Return => {
            if kind != GenKind::Sync {
                return Err(interp.throw_type_error("sync generator method on an async generator"));
            }
            let input = match f {
                GenFn::Next => ResumeInput::Next(arg),
                GenFn::Throw => ResumeInput::Throw(arg),
                _ => ResumeInput::Return(arg),
            };
            match machine::resume(interp, gen_id, input)? {
                StepOutcome::Yielded(v) => Ok(make_iter_result(interp, v, false)),
                StepOutcome::Done(v) => Ok(make_iter_result(interp, v, true)),
                StepOutcome::Awaiting => {
                    Err(interp.throw_type_error("sync generator attempted to await"))
                }
            }
        }
        GenFn::AsyncNext | GenFn::AsyncThrow | GenFn::AsyncReturn => {
            let promise = crate::builtins::promise::new_promise(interp);
            if let HeapData::Object(obj) = interp.heap.get_mut(gen_id) {
                if let ObjectPayload::Generator(data) = &mut obj.payload {
                    data.promise = Some(promise);
                }
            }
            let input = match f {
                GenFn::AsyncNext => ResumeInput::Next(arg),
                GenFn::AsyncThrow => ResumeInput::Throw(arg),
                _ => ResumeInput::Return(arg),
            };
            machine::drive(interp, gen_id, input)?;
            Ok(Value::Ref(promise))
        }
        GenFn::SelfIter => unreachable!("handled above"),
    }
}

pub(crate) fn install(interp: &mut Interp) {
    let proto = interp.realm.generator_proto;
    define_method(interp, proto, "next", Builtin::GenB(GenFn::Next), 1);
    define_method(interp, proto, "throw", Builtin::GenB(GenFn::Throw), 1);
    define_method(interp, proto, "return", Builtin::GenB(GenFn::Return), 1);
    define_symbol_method(interp, proto, SymbolId::ITERATOR, "[Symbol.iterator]", Builtin::GenB(GenFn::SelfIter));

    let proto = interp.realm.async_generator_proto;
    define_method(interp, proto, "next", Builtin::GenB(GenFn::AsyncNext), 1);
    define_method(interp, proto, "throw", Builtin::GenB(GenFn::AsyncThrow), 1);
    define_method(interp, proto, "return", Builtin::GenB(GenFn::AsyncReturn), 1);
    define_symbol_method(
        interp,
        proto,
        SymbolId::ASYNC_ITERATOR,
        "[Symbol.asyncIterator]",
        Builtin::GenB(GenFn::SelfIter),
    );
}
