//! Promise internals and the `Promise` builtin surface.
//!
//! Settlement is idempotent; reactions run as microtasks in FIFO order; a
//! promise resolving to another promise adopts the inner promise's state
//! through an internal reaction pair (this is what makes `await` chains
//! work). Rejections with no handler attached are remembered so the run loop
//! can report them once it goes idle.

use crate::{
    error::{RunError, RunResult},
    eval::Interp,
    event_loop::Job,
    r#gen::machine,
    heap::{HeapData, HeapId},
    types::{
        ClassTag, JsObject, NativeClosure, ObjectPayload, PromiseData, PromiseReaction, PromiseState, PropKey,
        Property, ReactionKind, ReactionTarget,
    },
    value::Value,
};

/// `Promise` functions reachable from script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromiseFn {
    Resolve,
    Reject,
    All,
    Race,
    Then,
    Catch,
    Finally,
}

// === allocation and settlement ===

pub(crate) fn new_promise(interp: &mut Interp) -> HeapId {
    let proto = interp.realm.promise_proto;
    let obj = JsObject::with_payload(ClassTag::Promise, Some(proto), ObjectPayload::Promise(PromiseData::new()));
    interp.heap.alloc_object(obj)
}

fn promise_data_mut<'a>(interp: &'a mut Interp, id: HeapId) -> Option<&'a mut PromiseData> {
    match &mut interp.heap.object_mut(id).payload {
        ObjectPayload::Promise(data) => Some(data),
        _ => None,
    }
}

/// True when the value is one of this engine's promise objects.
pub(crate) fn as_promise(interp: &Interp, value: Value) -> Option<HeapId> {
    let Value::Ref(id) = value else { return None };
    match interp.heap.get(id) {
        HeapData::Object(obj) if matches!(obj.payload, ObjectPayload::Promise(_)) => Some(id),
        _ => None,
    }
}

/// Coerces any value to a promise (the `await` entry point).
pub(crate) fn value_to_promise(interp: &mut Interp, value: Value) -> RunResult<HeapId> {
    if let Some(id) = as_promise(interp, value) {
        return Ok(id);
    }
    let promise = new_promise(interp);
    resolve_promise(interp, promise, value)?;
    Ok(promise)
}

/// Resolves `promise` with `value`, adopting promise/thenable resolutions.
pub(crate) fn resolve_promise(interp: &mut Interp, promise: HeapId, value: Value) -> RunResult<()> {
    if value == Value::Ref(promise) {
        let error = interp.make_error(crate::error::ErrorKind::TypeError, "chaining cycle detected".to_owned());
        reject_promise(interp, promise, error);
        return Ok(());
    }
    // Adopt the state of an inner promise.
    if let Some(inner) = as_promise(interp, value) {
        add_reaction(
            interp,
            inner,
            PromiseReaction {
                kind: ReactionKind::Fulfill,
                handler: None,
                target: ReactionTarget::Derived(promise),
                passthrough: false,
            },
        );
        add_reaction(
            interp,
            inner,
            PromiseReaction {
                kind: ReactionKind::Reject,
                handler: None,
                target: ReactionTarget::Derived(promise),
                passthrough: false,
            },
        );
        return Ok(());
    }
    // A thenable adopts through its own `then`.
    if value.is_object(&interp.heap) {
        let then_key = PropKey::Str(interp.interns.intern("then"));
        let then = interp.get_property(value, then_key)?;
        if interp.is_callable(then) {
            let resolve_fn = settle_function(interp, promise, false);
            let reject_fn = settle_function(interp, promise, true);
            match interp.call_value(then, value, &[resolve_fn, reject_fn]) {
                Ok(_) => {}
                Err(RunError::Throw(e)) => reject_promise(interp, promise, e),
                Err(other) => return Err(other),
            }
            return Ok(());
        }
    }
    settle(interp, promise, PromiseState::Fulfilled(value));
    Ok(())
}

pub(crate) fn reject_promise(interp: &mut Interp, promise: HeapId, reason: Value) {
    settle(interp, promise, PromiseState::Rejected(reason));
}

fn settle(interp: &mut Interp, promise: HeapId, state: PromiseState) {
    let (reactions, newly_rejected) = {
        let Some(data) = promise_data_mut(interp, promise) else {
            return;
        };
        if data.state != PromiseState::Pending {
            return;
        }
        data.state = state;
        let newly_rejected = matches!(state, PromiseState::Rejected(_)) && !data.handled;
        (std::mem::take(&mut data.reactions), newly_rejected)
    };
    let value = match state {
        PromiseState::Fulfilled(v) | PromiseState::Rejected(v) => v,
        PromiseState::Pending => unreachable!(),
    };
    let settled_kind = if matches!(state, PromiseState::Fulfilled(_)) {
        ReactionKind::Fulfill
    } else {
        ReactionKind::Reject
    };
    for reaction in reactions {
        if reaction.kind == settled_kind {
            interp.event_loop.enqueue_micro(Job::Reaction { reaction, value });
        }
    }
    if newly_rejected {
        interp.event_loop.pending_rejections.push(promise);
    }
}

/// Adds a reaction, firing immediately (as a microtask) when the promise has
/// already settled.
pub(crate) fn add_reaction(interp: &mut Interp, promise: HeapId, reaction: PromiseReaction) {
    let fire_now = {
        let Some(data) = promise_data_mut(interp, promise) else {
            return;
        };
        if reaction.kind == ReactionKind::Reject {
            data.handled = true;
        }
        match data.state {
            PromiseState::Pending => {
                data.reactions.push(reaction);
                None
            }
            PromiseState::Fulfilled(v) => (reaction.kind == ReactionKind::Fulfill).then_some(v),
            PromiseState::Rejected(v) => (reaction.kind == ReactionKind::Reject).then_some(v),
        }
    };
    if let Some(value) = fire_now {
        interp.event_loop.enqueue_micro(Job::Reaction { reaction, value });
    }
}

/// Registers the internal reactions that resume a suspended await.
pub(crate) fn add_resume_reactions(interp: &mut Interp, promise: HeapId, r#gen: HeapId) {
    add_reaction(
        interp,
        promise,
        PromiseReaction {
            kind: ReactionKind::Fulfill,
            handler: None,
            target: ReactionTarget::Resume(r#gen),
            passthrough: false,
        },
    );
    add_reaction(
        interp,
        promise,
        PromiseReaction {
            kind: ReactionKind::Reject,
            handler: None,
            target: ReactionTarget::Resume(r#gen),
            passthrough: false,
        },
    );
}

/// Runs one queued reaction; called by the event loop drain.
pub(crate) fn run_reaction(interp: &mut Interp, reaction: PromiseReaction, value: Value) -> RunResult<()> {
    match reaction.target {
        ReactionTarget::Resume(r#gen) => {
            let input = match reaction.kind {
                ReactionKind::Fulfill => machine::ResumeInput::Next(value),
                ReactionKind::Reject => machine::ResumeInput::Throw(value),
            };
            machine::drive(interp, r#gen, input)
        }
        ReactionTarget::Derived(derived) => {
            if reaction.passthrough {
                // `finally`: run the handler with no arguments, then settle
                // the derived promise with the original outcome.
                if let Some(handler) = reaction.handler {
                    match interp.call_value(handler, Value::Undefined, &[]) {
                        Ok(_) => {}
                        Err(RunError::Throw(e)) => {
                            reject_promise(interp, derived, e);
                            return Ok(());
                        }
                        Err(other) => return Err(other),
                    }
                }
                match reaction.kind {
                    ReactionKind::Fulfill => resolve_promise(interp, derived, value)?,
                    ReactionKind::Reject => reject_promise(interp, derived, value),
                }
                return Ok(());
            }
            match reaction.handler {
                Some(handler) => match interp.call_value(handler, Value::Undefined, &[value]) {
                    Ok(result) => resolve_promise(interp, derived, result)?,
                    Err(RunError::Throw(e)) => reject_promise(interp, derived, e),
                    Err(other) => return Err(other),
                },
                None => match reaction.kind {
                    ReactionKind::Fulfill => resolve_promise(interp, derived, value)?,
                    ReactionKind::Reject => reject_promise(interp, derived, value),
                },
            }
            Ok(())
        }
        ReactionTarget::None => {
            if let Some(handler) = reaction.handler {
                match interp.call_value(handler, Value::Undefined, &[value]) {
                    Ok(_) => {}
                    Err(RunError::Throw(_)) => {}
                    Err(other) => return Err(other),
                }
            }
            Ok(())
        }
    }
}

/// Allocates a `resolve` or `reject` capability function for `promise`.
pub(crate) fn settle_function(interp: &mut Interp, promise: HeapId, reject: bool) -> Value {
    let proto = interp.realm.function_proto;
    let obj = JsObject::with_payload(
        ClassTag::Function,
        Some(proto),
        ObjectPayload::NativeClosure(NativeClosure::PromiseSettle { promise, reject }),
    );
    Value::Ref(interp.heap.alloc_object(obj))
}

/// Dispatch for capability closures.
pub(crate) fn call_native_closure(interp: &mut Interp, closure: NativeClosure, args: &[Value]) -> RunResult<Value> {
    match closure {
        NativeClosure::PromiseSettle { promise, reject } => {
            let value = args.first().copied().unwrap_or(Value::Undefined);
            if reject {
                reject_promise(interp, promise, value);
            } else {
                resolve_promise(interp, promise, value)?;
            }
            Ok(Value::Undefined)
        }
        NativeClosure::PromiseAllElement { state, index } => {
            let value = args.first().copied().unwrap_or(Value::Undefined);
            finish_all_element(interp, state, index, value)?;
            Ok(Value::Undefined)
        }
    }
}

// === Promise.all bookkeeping ===

fn finish_all_element(interp: &mut Interp, state: HeapId, index: u32, value: Value) -> RunResult<()> {
    let results_key = PropKey::Str(interp.interns.intern("results"));
    let remaining_key = PropKey::Str(interp.interns.intern("remaining"));
    let promise_key = PropKey::Str(interp.interns.intern("promise"));

    let results = interp.get_property(Value::Ref(state), results_key)?;
    interp.set_property(results, PropKey::Index(index), value)?;

    let remaining = interp.get_property(Value::Ref(state), remaining_key)?;
    let remaining = remaining.as_number().unwrap_or(0.0) - 1.0;
    interp.set_property(Value::Ref(state), remaining_key, Value::Number(remaining))?;

    if remaining <= 0.0 {
        let promise = interp.get_property(Value::Ref(state), promise_key)?;
        if let Some(promise) = as_promise(interp, promise) {
            resolve_promise(interp, promise, results)?;
        }
    }
    Ok(())
}

// === script-visible functions ===

pub(crate) fn call_promise_fn(interp: &mut Interp, f: PromiseFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        PromiseFn::Resolve => {
            let value = args.first().copied().unwrap_or(Value::Undefined);
            if let Some(existing) = as_promise(interp, value) {
                return Ok(Value::Ref(existing));
            }
            let promise = new_promise(interp);
            resolve_promise(interp, promise, value)?;
            Ok(Value::Ref(promise))
        }
        PromiseFn::Reject => {
            let reason = args.first().copied().unwrap_or(Value::Undefined);
            let promise = new_promise(interp);
            reject_promise(interp, promise, reason);
            Ok(Value::Ref(promise))
        }
        PromiseFn::All => {
            let iterable = args.first().copied().unwrap_or(Value::Undefined);
            let items = interp.iterate_collect(iterable)?;
            let result = new_promise(interp);
            if items.is_empty() {
                let empty = interp.new_array(Vec::new());
                resolve_promise(interp, result, empty)?;
                return Ok(Value::Ref(result));
            }
            // Shared combinator state.
            let state = interp.new_object();
            let results = interp.new_array(vec![Value::Undefined; items.len()]);
            let results_key = PropKey::Str(interp.interns.intern("results"));
            let remaining_key = PropKey::Str(interp.interns.intern("remaining"));
            let promise_key = PropKey::Str(interp.interns.intern("promise"));
            interp.heap.object_mut(state).define(results_key, Property::data(results));
            interp
                .heap
                .object_mut(state)
                .define(remaining_key, Property::data(Value::Number(items.len() as f64)));
            interp
                .heap
                .object_mut(state)
                .define(promise_key, Property::data(Value::Ref(result)));
            for (i, item) in items.into_iter().enumerate() {
                let item_promise = value_to_promise(interp, item)?;
                let proto = interp.realm.function_proto;
                let handler_obj = JsObject::with_payload(
                    ClassTag::Function,
                    Some(proto),
                    ObjectPayload::NativeClosure(NativeClosure::PromiseAllElement {
                        state,
                        index: u32::try_from(i).expect("element count fits u32"),
                    }),
                );
                let handler = Value::Ref(interp.heap.alloc_object(handler_obj));
                add_reaction(
                    interp,
                    item_promise,
                    PromiseReaction {
                        kind: ReactionKind::Fulfill,
                        handler: Some(handler),
                        target: ReactionTarget::None,
                        passthrough: false,
                    },
                );
                add_reaction(
                    interp,
                    item_promise,
                    PromiseReaction {
                        kind: ReactionKind::Reject,
                        handler: None,
                        target: ReactionTarget::Derived(result),
                        passthrough: false,
                    },
                );
            }
            Ok(Value::Ref(result))
        }
        PromiseFn::Race => {
            let iterable = args.first().copied().unwrap_or(Value::Undefined);
            let items = interp.iterate_collect(iterable)?;
            let result = new_promise(interp);
            for item in items {
                let item_promise = value_to_promise(interp, item)?;
                add_reaction(
                    interp,
                    item_promise,
                    PromiseReaction {
                        kind: ReactionKind::Fulfill,
                        handler: None,
                        target: ReactionTarget::Derived(result),
                        passthrough: false,
                    },
                );
                add_reaction(
                    interp,
                    item_promise,
                    PromiseReaction {
                        kind: ReactionKind::Reject,
                        handler: None,
                        target: ReactionTarget::Derived(result),
                        passthrough: false,
                    },
                );
            }
            Ok(Value::Ref(result))
        }
        PromiseFn::Then => then_impl(interp, this, args.first().copied(), args.get(1).copied()),
        PromiseFn::Catch => then_impl(interp, this, None, args.first().copied()),
        PromiseFn::Finally => {
            let Some(promise) = as_promise(interp, this) else {
                return Err(interp.throw_type_error("Promise.prototype.finally called on a non-promise"));
            };
            let handler = args.first().copied().filter(|v| interp.is_callable(*v));
            let derived = new_promise(interp);
            for kind in [ReactionKind::Fulfill, ReactionKind::Reject] {
                add_reaction(
                    interp,
                    promise,
                    PromiseReaction {
                        kind,
                        handler,
                        target: ReactionTarget::Derived(derived),
                        passthrough: true,
                    },
                );
            }
            Ok(Value::Ref(derived))
        }
    }
}

/// `Promise.prototype.then`.
pub(crate) fn then_impl(
    interp: &mut Interp,
    this: Value,
    on_fulfilled: Option<Value>,
    on_rejected: Option<Value>,
) -> RunResult<Value> {
    let Some(promise) = as_promise(interp, this) else {
        return Err(interp.throw_type_error("Promise.prototype.then called on a non-promise"));
    };
    let derived = new_promise(interp);
    let on_fulfilled = on_fulfilled.filter(|v| interp.is_callable(*v));
    let on_rejected = on_rejected.filter(|v| interp.is_callable(*v));
    add_reaction(
        interp,
        promise,
        PromiseReaction {
            kind: ReactionKind::Fulfill,
            handler: on_fulfilled,
            target: ReactionTarget::Derived(derived),
            passthrough: false,
        },
    );
    add_reaction(
        interp,
        promise,
        PromiseReaction {
            kind: ReactionKind::Reject,
            handler: on_rejected,
            target: ReactionTarget::Derived(derived),
            passthrough: false,
        },
    );
    Ok(Value::Ref(derived))
}

/// The `new Promise(executor)` constructor.
pub(crate) fn construct_promise(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let executor = args.first().copied().unwrap_or(Value::Undefined);
    if !interp.is_callable(executor) {
        return Err(interp.throw_type_error("Promise executor is not a function"));
    }
    let promise = new_promise(interp);
    let resolve_fn = settle_function(interp, promise, false);
    let reject_fn = settle_function(interp, promise, true);
    match interp.call_value(executor, Value::Undefined, &[resolve_fn, reject_fn]) {
        Ok(_) => {}
        Err(RunError::Throw(e)) => reject_promise(interp, promise, e),
        Err(other) => return Err(other),
    }
    Ok(Value::Ref(promise))
}
