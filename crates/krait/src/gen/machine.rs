//! The generator state-machine interpreter.
//!
//! Runs one resumption at a time: within one `.next/.throw/.return` call (or
//! one scheduler wake-up after an await settles) the machine executes
//! instructions until the next suspension or completion. Abrupt events route
//! through the try stack as pending completions, so `finally` blocks always
//! run and may supersede the outgoing completion; `yield*` keeps a delegate
//! driver on the iterator stack and forwards the caller's signals to it.
//!
//! While the machine runs an instance, the instance's heap slot holds a
//! placeholder payload; reentrant resumption is therefore a TypeError, which
//! is also what the single-threaded model requires.

use std::rc::Rc;

use crate::{
    error::{RunError, RunResult},
    eval::{BindTarget, Completion, Interp},
    r#gen::ir::{Instr, IrCode},
    heap::HeapId,
    intern::StringId,
    scope::{BindingKind, ScopeKind},
    types::{
        ClassTag, DriverKind, GenKind, GenState, GeneratorData, IterDriver, JsObject, LoopFrame, ObjectPayload,
        PendingCompletion, PropKey, Property, TryFrame,
    },
    value::Value,
};

/// What a resumption delivers into the suspended instance.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ResumeInput {
    Next(Value),
    Throw(Value),
    Return(Value),
}

/// How a resumption ended.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StepOutcome {
    /// Hit a `yield`; the instance is suspended again.
    Yielded(Value),
    /// Ran to completion with this value.
    Done(Value),
    /// Hit an `await`; the scheduler will resume the instance.
    Awaiting,
}

/// An abrupt completion being routed through the stacks.
#[derive(Debug, Clone, Copy)]
enum Abrupt {
    Throw(Value),
    Return(Value),
    Break(Option<StringId>),
    Continue(Option<StringId>),
}

/// Resumes a generator instance. An uncaught script throw comes back as
/// `Err(RunError::Throw)` with the instance already marked errored.
pub(crate) fn resume(interp: &mut Interp, gen_id: HeapId, input: ResumeInput) -> RunResult<StepOutcome> {
    // Take the instance out of the heap so evaluation can borrow freely.
    let placeholder = JsObject::with_payload(ClassTag::Generator, None, ObjectPayload::GeneratorRunning);
    let mut shell = interp.heap.replace_object(gen_id, placeholder);
    let payload = std::mem::take(&mut shell.payload);
    let mut data = match payload {
        ObjectPayload::Generator(data) => *data,
        other => {
            shell.payload = other;
            let _ = interp.heap.replace_object(gen_id, shell);
            return Err(interp.throw_type_error("generator is already running"));
        }
    };

    let saved_slots = std::mem::take(&mut interp.resume_slots);
    let result = run(interp, gen_id, &mut data, input);
    interp.resume_slots = saved_slots;

    // Engine-level failures must not leave the instance marked executing.
    if result.is_err() && data.state == GenState::Executing {
        data.state = GenState::Errored;
    }
    shell.payload = ObjectPayload::Generator(Box::new(data));
    let _ = interp.heap.replace_object(gen_id, shell);
    result
}

fn run(interp: &mut Interp, gen_id: HeapId, data: &mut GeneratorData, input: ResumeInput) -> RunResult<StepOutcome> {
    match data.state {
        GenState::Executing => {
            return Err(interp.throw_type_error("generator is already running"));
        }
        GenState::Completed | GenState::Closed | GenState::Errored => {
            return match input {
                ResumeInput::Next(_) => Ok(StepOutcome::Done(Value::Undefined)),
                ResumeInput::Throw(e) => Err(RunError::Throw(e)),
                ResumeInput::Return(v) => Ok(StepOutcome::Done(v)),
            };
        }
        GenState::SuspendedYield | GenState::SuspendedAwait => {}
    }
    let ir = Rc::clone(&data.ir);
    data.state = GenState::Executing;

    if data.started {
        // Deliver the input at the suspension instruction.
        let instr = ir.instrs[data.pc];
        match instr {
            Instr::Yield { slot, resume_pc } | Instr::Await { slot, resume_pc } => match input {
                ResumeInput::Next(v) => {
                    data.set_slot(slot, v);
                    data.acc = v;
                    data.pc = resume_pc;
                }
                ResumeInput::Throw(e) => {
                    if let Some(outcome) = route_abrupt(interp, data, Abrupt::Throw(e))? {
                        return Ok(outcome);
                    }
                }
                ResumeInput::Return(v) => {
                    if let Some(outcome) = route_abrupt(interp, data, Abrupt::Return(v))? {
                        data.state = GenState::Closed;
                        return Ok(outcome);
                    }
                }
            },
            Instr::YieldStar { slot, resume_pc } => {
                if let Some(outcome) = delegate_resume(interp, data, input, slot, resume_pc)? {
                    return Ok(outcome);
                }
            }
            other => {
                return Err(RunError::NotSupported(format!(
                    "generator resumed at a non-suspension instruction {other:?}"
                )));
            }
        }
    } else {
        data.started = true;
        match input {
            ResumeInput::Next(_) => {
                if let Err(e) = interp.hoist_declarations(&ir.hoist, data.env, true) {
                    complete_cleanup(interp, data, GenState::Errored);
                    return Err(e);
                }
            }
            ResumeInput::Throw(e) => {
                complete_cleanup(interp, data, GenState::Completed);
                return Err(RunError::Throw(e));
            }
            ResumeInput::Return(v) => {
                complete_cleanup(interp, data, GenState::Closed);
                return Ok(StepOutcome::Done(v));
            }
        }
    }

    exec_loop(interp, gen_id, data, &ir)
}

macro_rules! guard {
    ($interp:expr, $data:expr, $e:expr) => {
        match $e {
            Ok(v) => v,
            Err(RunError::Throw(thrown)) => {
                if let Some(outcome) = route_abrupt($interp, $data, Abrupt::Throw(thrown))? {
                    return Ok(outcome);
                }
                continue;
            }
            Err(other) => return Err(other),
        }
    };
}

#[expect(clippy::too_many_lines, reason = "one arm per instruction")]
fn exec_loop(
    interp: &mut Interp,
    gen_id: HeapId,
    data: &mut GeneratorData,
    ir: &Rc<IrCode>,
) -> RunResult<StepOutcome> {
    loop {
        let instr = ir.instrs[data.pc];
        data.pc += 1;
        match instr {
            Instr::EvalExpr(id) => {
                interp.resume_slots = data.slots.clone();
                let value = guard!(interp, data, interp.eval_expr(ir.expr(id), data.env));
                data.acc = value;
            }
            Instr::EvalStmt(id) => {
                interp.resume_slots = data.slots.clone();
                let completion = guard!(interp, data, interp.eval_stmt(ir.stmt(id), data.env));
                match completion {
                    Completion::Normal(v) => data.acc = v,
                    Completion::Return(v) => {
                        if let Some(outcome) = route_abrupt(interp, data, Abrupt::Return(v))? {
                            return Ok(outcome);
                        }
                    }
                    Completion::Break(label) => {
                        if let Some(outcome) = route_abrupt(interp, data, Abrupt::Break(label))? {
                            return Ok(outcome);
                        }
                    }
                    Completion::Continue(label) => {
                        if let Some(outcome) = route_abrupt(interp, data, Abrupt::Continue(label))? {
                            return Ok(outcome);
                        }
                    }
                }
            }
            Instr::LoadUndefined => data.acc = Value::Undefined,
            Instr::LoadSlot(slot) => data.acc = data.slot(slot),
            Instr::StoreSlot(slot) => data.set_slot(slot, data.acc),
            Instr::Jump(target) => data.pc = target,
            Instr::JumpIfFalse(target) => {
                if !interp.to_boolean(data.acc) {
                    data.pc = target;
                }
            }
            Instr::JumpIfAbrupt(target) => {
                if data.try_stack.last().is_some_and(|f| f.pending.is_some()) {
                    data.pc = target;
                }
            }
            Instr::PushTry { catch_pc, finally_pc } => {
                data.try_stack.push(TryFrame {
                    catch_pc,
                    finally_pc,
                    pending: None,
                    env: data.env,
                    loop_depth: data.loop_stack.len(),
                    iter_depth: data.iter_stack.len(),
                });
            }
            Instr::PopTry => {
                data.try_stack.pop();
            }
            Instr::Throw => {
                let thrown = data.acc;
                if let Some(outcome) = route_abrupt(interp, data, Abrupt::Throw(thrown))? {
                    return Ok(outcome);
                }
            }
            Instr::Rethrow => {
                let Some(frame) = data.try_stack.pop() else {
                    return Err(RunError::NotSupported("finally end without a try frame".to_owned()));
                };
                match frame.pending {
                    None => {}
                    Some(PendingCompletion::Normal { resume_pc }) => data.pc = resume_pc,
                    Some(PendingCompletion::Return(v)) => {
                        if let Some(outcome) = route_abrupt(interp, data, Abrupt::Return(v))? {
                            return Ok(outcome);
                        }
                    }
                    Some(PendingCompletion::Throw(v)) => {
                        if let Some(outcome) = route_abrupt(interp, data, Abrupt::Throw(v))? {
                            return Ok(outcome);
                        }
                    }
                    Some(PendingCompletion::Break(label)) => {
                        if let Some(outcome) = route_abrupt(interp, data, Abrupt::Break(label))? {
                            return Ok(outcome);
                        }
                    }
                    Some(PendingCompletion::Continue(label)) => {
                        if let Some(outcome) = route_abrupt(interp, data, Abrupt::Continue(label))? {
                            return Ok(outcome);
                        }
                    }
                }
            }
            Instr::PushLoopScope {
                continue_pc,
                break_pc,
                label,
                allows_continue,
            } => {
                data.loop_stack.push(LoopFrame {
                    continue_pc,
                    break_pc,
                    label,
                    try_depth: data.try_stack.len(),
                    iter_depth: data.iter_stack.len(),
                    env: data.env,
                    owns_iterator: false,
                    allows_continue,
                });
            }
            Instr::PopLoopScope => {
                data.loop_stack.pop();
            }
            Instr::EnterScope => {
                data.env = interp.scopes.push(data.env, ScopeKind::Block);
            }
            Instr::ExitScope => {
                data.env = interp.scopes.get(data.env).parent.expect("block scope has a parent");
            }
            Instr::BindCatch(pattern) => {
                let value = data.acc;
                guard!(
                    interp,
                    data,
                    interp.bind_pattern(ir.pattern(pattern), value, data.env, BindTarget::Declare(BindingKind::Let))
                );
            }
            Instr::BindForTarget(head) => {
                let value = data.acc;
                guard!(interp, data, interp.bind_for_head(ir.head(head), value, data.env));
            }
            Instr::IteratorOpen { is_async } => {
                let value = data.acc;
                let (iterator, next_method) = guard!(
                    interp,
                    data,
                    if is_async {
                        interp.get_async_iterator(value)
                    } else {
                        interp.get_iterator(value)
                    }
                );
                data.iter_stack.push(IterDriver {
                    iterator,
                    next_method,
                    kind: if is_async { DriverKind::ForAwait } else { DriverKind::ForOf },
                });
                // The loop frame just below owns this driver.
                let depth = data.iter_stack.len() - 1;
                if let Some(frame) = data.loop_stack.last_mut() {
                    if frame.iter_depth == depth {
                        frame.owns_iterator = true;
                    }
                }
            }
            Instr::IteratorNext => {
                let driver = *data.iter_stack.last().expect("iterator driver");
                let result = guard!(interp, data, interp.call_value(driver.next_method, driver.iterator, &[]));
                data.acc = result;
            }
            Instr::IteratorDone { exit_pc } => {
                let result = data.acc;
                let (done, value) = guard!(interp, data, interp.iterator_result_parts(result));
                data.acc = value;
                if done {
                    data.pc = exit_pc;
                }
            }
            Instr::IteratorReturn => {
                if let Some(driver) = data.iter_stack.pop() {
                    let _ = interp.iterator_close(driver.iterator);
                }
            }
            Instr::IteratorThrow => {
                let thrown = data.acc;
                if let Some(outcome) = route_abrupt(interp, data, Abrupt::Throw(thrown))? {
                    return Ok(outcome);
                }
            }
            Instr::PopIter => {
                data.iter_stack.pop();
            }
            Instr::ForInKeys => {
                let base = data.acc;
                let values = if base.is_nullish() {
                    Vec::new()
                } else {
                    let keys = interp.for_in_keys(base);
                    keys.into_iter().map(|k| interp.key_to_value(k)).collect()
                };
                data.acc = interp.new_array(values);
            }
            Instr::Yield { .. } => {
                data.pc -= 1;
                data.state = GenState::SuspendedYield;
                return Ok(StepOutcome::Yielded(data.acc));
            }
            Instr::YieldStar { slot, resume_pc } => {
                data.pc -= 1;
                let iterable = data.acc;
                let (iterator, next_method) = guard!(interp, data, interp.get_iterator(iterable));
                data.iter_stack.push(IterDriver {
                    iterator,
                    next_method,
                    kind: DriverKind::Delegate,
                });
                if let Some(outcome) =
                    delegate_resume(interp, data, ResumeInput::Next(Value::Undefined), slot, resume_pc)?
                {
                    return Ok(outcome);
                }
            }
            Instr::Await { slot, resume_pc } => {
                let _ = (slot, resume_pc);
                data.pc -= 1;
                let awaited = data.acc;
                let promise = crate::builtins::promise::value_to_promise(interp, awaited)?;
                crate::builtins::promise::add_resume_reactions(interp, promise, gen_id);
                data.state = GenState::SuspendedAwait;
                return Ok(StepOutcome::Awaiting);
            }
            Instr::BreakLoop(label) => {
                if let Some(outcome) = route_abrupt(interp, data, Abrupt::Break(label))? {
                    return Ok(outcome);
                }
            }
            Instr::ContinueLoop(label) => {
                if let Some(outcome) = route_abrupt(interp, data, Abrupt::Continue(label))? {
                    return Ok(outcome);
                }
            }
            Instr::Return => {
                let value = data.acc;
                if let Some(outcome) = route_abrupt(interp, data, Abrupt::Return(value))? {
                    return Ok(outcome);
                }
            }
            Instr::End => {
                complete_cleanup(interp, data, GenState::Completed);
                return Ok(StepOutcome::Done(Value::Undefined));
            }
            Instr::EnterFinally { finally_pc, resume_pc } => {
                let Some(frame) = data.try_stack.last_mut() else {
                    return Err(RunError::NotSupported("finally entry without a try frame".to_owned()));
                };
                frame.pending = Some(PendingCompletion::Normal { resume_pc });
                frame.finally_pc = None;
                data.env = frame.env;
                data.pc = finally_pc;
            }
        }
    }
}

/// Routes an abrupt completion through the try and loop stacks. `Ok(None)`
/// means execution continues at the routed pc; `Ok(Some(_))` ends this
/// resumption; `Err` is an uncaught throw (instance marked errored).
fn route_abrupt(interp: &mut Interp, data: &mut GeneratorData, abrupt: Abrupt) -> RunResult<Option<StepOutcome>> {
    match abrupt {
        Abrupt::Throw(thrown) => loop {
            let Some(frame) = data.try_stack.last_mut() else {
                complete_cleanup(interp, data, GenState::Errored);
                return Err(RunError::Throw(thrown));
            };
            if let Some(catch_pc) = frame.catch_pc {
                frame.catch_pc = None;
                let snapshot = *frame;
                if snapshot.finally_pc.is_none() {
                    data.try_stack.pop();
                }
                unwind_to(interp, data, snapshot);
                data.acc = thrown;
                data.pc = catch_pc;
                return Ok(None);
            }
            if let Some(finally_pc) = frame.finally_pc.take() {
                frame.pending = Some(PendingCompletion::Throw(thrown));
                let snapshot = *frame;
                unwind_to(interp, data, snapshot);
                data.pc = finally_pc;
                return Ok(None);
            }
            data.try_stack.pop();
        },
        Abrupt::Return(value) => loop {
            let Some(frame) = data.try_stack.last_mut() else {
                complete_cleanup(interp, data, GenState::Completed);
                return Ok(Some(StepOutcome::Done(value)));
            };
            if let Some(finally_pc) = frame.finally_pc.take() {
                frame.pending = Some(PendingCompletion::Return(value));
                let snapshot = *frame;
                unwind_to(interp, data, snapshot);
                data.pc = finally_pc;
                return Ok(None);
            }
            data.try_stack.pop();
        },
        Abrupt::Break(label) | Abrupt::Continue(label) => {
            let is_break = matches!(abrupt, Abrupt::Break(_));
            let Some(index) = data.loop_stack.iter().rposition(|frame| match label {
                Some(l) => frame.label == Some(l),
                None => is_break || frame.allows_continue,
            }) else {
                return Err(RunError::NotSupported("unmatched break/continue in generator".to_owned()));
            };
            let target = data.loop_stack[index];

            // A finally between here and the loop runs first; the break or
            // continue becomes its pending completion.
            if let Some(finally_index) = (target.try_depth..data.try_stack.len())
                .rev()
                .find(|&i| data.try_stack[i].finally_pc.is_some())
            {
                data.try_stack.truncate(finally_index + 1);
                let frame = &mut data.try_stack[finally_index];
                let finally_pc = frame.finally_pc.take().expect("checked");
                frame.pending = Some(if is_break {
                    PendingCompletion::Break(label)
                } else {
                    PendingCompletion::Continue(label)
                });
                let snapshot = *frame;
                unwind_to(interp, data, snapshot);
                data.pc = finally_pc;
                return Ok(None);
            }

            data.try_stack.truncate(target.try_depth);
            let keep_iters = target.iter_depth + usize::from(!is_break && target.owns_iterator);
            close_iters_to(interp, data, keep_iters);
            data.loop_stack.truncate(if is_break { index } else { index + 1 });
            data.env = target.env;
            data.pc = if is_break { target.break_pc } else { target.continue_pc };
            Ok(None)
        }
    }
}

fn unwind_to(interp: &mut Interp, data: &mut GeneratorData, frame: TryFrame) {
    data.env = frame.env;
    data.loop_stack.truncate(frame.loop_depth);
    close_iters_to(interp, data, frame.iter_depth);
}

/// Pops iterator drivers above `depth`, closing for-of drivers. Close
/// failures during unwinding are swallowed; the original completion wins.
fn close_iters_to(interp: &mut Interp, data: &mut GeneratorData, depth: usize) {
    while data.iter_stack.len() > depth {
        let driver = data.iter_stack.pop().expect("checked length");
        if driver.kind != DriverKind::Delegate {
            let _ = interp.iterator_close(driver.iterator);
        }
    }
}

fn complete_cleanup(interp: &mut Interp, data: &mut GeneratorData, state: GenState) {
    close_iters_to(interp, data, 0);
    data.try_stack.clear();
    data.loop_stack.clear();
    data.state = state;
}

/// Forwards a resumption to the active `yield*` delegate.
fn delegate_resume(
    interp: &mut Interp,
    data: &mut GeneratorData,
    input: ResumeInput,
    slot: crate::ast::ResumeSlotId,
    resume_pc: usize,
) -> RunResult<Option<StepOutcome>> {
    let driver = *data.iter_stack.last().expect("delegate driver");
    let result = match input {
        ResumeInput::Next(v) => {
            match interp.call_value(driver.next_method, driver.iterator, &[v]) {
                Ok(r) => r,
                Err(RunError::Throw(t)) => {
                    data.iter_stack.pop();
                    return route_abrupt(interp, data, Abrupt::Throw(t));
                }
                Err(other) => return Err(other),
            }
        }
        ResumeInput::Throw(e) => {
            let throw_key = PropKey::Str(interp.interns.intern("throw"));
            let throw_method = match interp.get_property(driver.iterator, throw_key) {
                Ok(m) => m,
                Err(RunError::Throw(t)) => {
                    data.iter_stack.pop();
                    return route_abrupt(interp, data, Abrupt::Throw(t));
                }
                Err(other) => return Err(other),
            };
            if interp.is_callable(throw_method) {
                match interp.call_value(throw_method, driver.iterator, &[e]) {
                    Ok(r) => r,
                    Err(RunError::Throw(t)) => {
                        data.iter_stack.pop();
                        return route_abrupt(interp, data, Abrupt::Throw(t));
                    }
                    Err(other) => return Err(other),
                }
            } else {
                // Close the delegate, then TypeError at the delegation site.
                data.iter_stack.pop();
                let _ = interp.iterator_close(driver.iterator);
                let error = interp.throw_type_error("iterator delegate has no 'throw' method");
                let RunError::Throw(error_value) = error else {
                    return Err(error);
                };
                return route_abrupt(interp, data, Abrupt::Throw(error_value));
            }
        }
        ResumeInput::Return(v) => {
            let return_key = PropKey::Str(interp.interns.intern("return"));
            let return_method = match interp.get_property(driver.iterator, return_key) {
                Ok(m) => m,
                Err(RunError::Throw(t)) => {
                    data.iter_stack.pop();
                    return route_abrupt(interp, data, Abrupt::Throw(t));
                }
                Err(other) => return Err(other),
            };
            if !interp.is_callable(return_method) {
                data.iter_stack.pop();
                return route_abrupt(interp, data, Abrupt::Return(v));
            }
            match interp.call_value(return_method, driver.iterator, &[v]) {
                Ok(r) => r,
                Err(RunError::Throw(t)) => {
                    data.iter_stack.pop();
                    return route_abrupt(interp, data, Abrupt::Throw(t));
                }
                Err(other) => return Err(other),
            }
        }
    };

    let (done, value) = match interp.iterator_result_parts(result) {
        Ok(parts) => parts,
        Err(RunError::Throw(t)) => {
            data.iter_stack.pop();
            return route_abrupt(interp, data, Abrupt::Throw(t));
        }
        Err(other) => return Err(other),
    };
    if done {
        data.iter_stack.pop();
        if matches!(input, ResumeInput::Return(_)) {
            return route_abrupt(interp, data, Abrupt::Return(value));
        }
        data.set_slot(slot, value);
        data.acc = value;
        data.pc = resume_pc;
        Ok(None)
    } else {
        data.state = GenState::SuspendedYield;
        Ok(Some(StepOutcome::Yielded(value)))
    }
}

/// Builds an iterator result object `{value, done}`.
pub(crate) fn make_iter_result(interp: &mut Interp, value: Value, done: bool) -> Value {
    let id = interp.new_object();
    let value_key = PropKey::Str(interp.interns.intern("value"));
    let done_key = PropKey::Str(interp.interns.intern("done"));
    interp.heap.object_mut(id).define(value_key, Property::data(value));
    interp.heap.object_mut(id).define(done_key, Property::data(Value::Bool(done)));
    Value::Ref(id)
}

/// Drives an async function or async generator one step and settles its
/// promises; used at call time and from the event loop.
pub(crate) fn drive(interp: &mut Interp, gen_id: HeapId, input: ResumeInput) -> RunResult<()> {
    let kind = match &interp.heap.object(gen_id).payload {
        ObjectPayload::Generator(data) => data.kind,
        _ => return Ok(()),
    };
    let result = resume(interp, gen_id, input);
    let promise = match &interp.heap.object(gen_id).payload {
        ObjectPayload::Generator(data) => data.promise,
        _ => None,
    };
    match kind {
        GenKind::Async => {
            let Some(promise) = promise else { return Ok(()) };
            match result {
                Ok(StepOutcome::Done(v)) => crate::builtins::promise::resolve_promise(interp, promise, v)?,
                Ok(StepOutcome::Awaiting | StepOutcome::Yielded(_)) => {}
                Err(RunError::Throw(e)) => crate::builtins::promise::reject_promise(interp, promise, e),
                Err(other) => return Err(other),
            }
        }
        GenKind::AsyncGen => {
            let Some(promise) = promise else { return Ok(()) };
            match result {
                Ok(StepOutcome::Yielded(v)) => {
                    clear_pending_promise(interp, gen_id);
                    let result = make_iter_result(interp, v, false);
                    crate::builtins::promise::resolve_promise(interp, promise, result)?;
                }
                Ok(StepOutcome::Done(v)) => {
                    clear_pending_promise(interp, gen_id);
                    let result = make_iter_result(interp, v, true);
                    crate::builtins::promise::resolve_promise(interp, promise, result)?;
                }
                Ok(StepOutcome::Awaiting) => {}
                Err(RunError::Throw(e)) => {
                    clear_pending_promise(interp, gen_id);
                    crate::builtins::promise::reject_promise(interp, promise, e);
                }
                Err(other) => return Err(other),
            }
        }
        GenKind::Sync => {
            // Sync generators are driven by their next/throw/return methods,
            // not the scheduler.
            if let Err(e) = result {
                return Err(e);
            }
        }
    }
    Ok(())
}

fn clear_pending_promise(interp: &mut Interp, gen_id: HeapId) {
    if let ObjectPayload::Generator(data) = &mut interp.heap.object_mut(gen_id).payload {
        data.promise = None;
    }
}
