//! Iteration protocol and loop statements.
//!
//! `for-of`, spread, and destructuring all go through `@@iterator`; abrupt
//! loop exits call `return()` on the iterator when present. Arrays and
//! `arguments` take a fast path over their element store when their iterator
//! has not been replaced.

use crate::{
    ast::{DeclKind, ForHead, ForInit, Stmt, StmtLoc},
    error::{RunError, RunResult},
    eval::{BindTarget, Completion, Interp},
    heap::HeapData,
    intern::StringId,
    scope::{BindingKind, ScopeId, ScopeKind},
    types::{ObjectPayload, PropKey},
    value::{SymbolId, Value},
};

impl Interp {
    // === iteration protocol ===

    /// GetIterator: looks up `@@iterator` and calls it.
    pub fn get_iterator(&mut self, value: Value) -> RunResult<(Value, Value)> {
        let method = self.get_property(value, PropKey::Symbol(SymbolId::ITERATOR))?;
        if !self.is_callable(method) {
            let type_name = value.type_of(&self.heap);
            return Err(self.throw_type_error(format!("{type_name} is not iterable")));
        }
        let iterator = self.call_value(method, value, &[])?;
        if !iterator.is_object(&self.heap) {
            return Err(self.throw_type_error("iterator result is not an object"));
        }
        let next_key = PropKey::Str(self.interns.intern("next"));
        let next_method = self.get_property(iterator, next_key)?;
        Ok((iterator, next_method))
    }

    /// GetIterator for `for-await-of`: prefers `@@asyncIterator`, falling
    /// back to the sync iterator (whose results the caller awaits).
    pub fn get_async_iterator(&mut self, value: Value) -> RunResult<(Value, Value)> {
        let method = self.get_property(value, PropKey::Symbol(SymbolId::ASYNC_ITERATOR))?;
        if self.is_callable(method) {
            let iterator = self.call_value(method, value, &[])?;
            let next_key = PropKey::Str(self.interns.intern("next"));
            let next_method = self.get_property(iterator, next_key)?;
            return Ok((iterator, next_method));
        }
        self.get_iterator(value)
    }

    /// One `next()` step. Returns `(done, value)`.
    pub fn iterator_step(&mut self, iterator: Value, next_method: Value, arg: Option<Value>) -> RunResult<(bool, Value)> {
        let args: &[Value] = match &arg {
            Some(v) => std::slice::from_ref(v),
            None => &[],
        };
        let result = self.call_value(next_method, iterator, args)?;
        self.iterator_result_parts(result)
    }

    /// Splits an iterator result object into `(done, value)`.
    pub fn iterator_result_parts(&mut self, result: Value) -> RunResult<(bool, Value)> {
        if !result.is_object(&self.heap) {
            return Err(self.throw_type_error("iterator result is not an object"));
        }
        let done_key = PropKey::Str(self.interns.intern("done"));
        let value_key = PropKey::Str(self.interns.intern("value"));
        let done = self.get_property(result, done_key)?;
        let done = self.to_boolean(done);
        let value = self.get_property(result, value_key)?;
        Ok((done, value))
    }

    /// IteratorClose: calls `return()` if present, for abrupt exits.
    pub fn iterator_close(&mut self, iterator: Value) -> RunResult<()> {
        let return_key = PropKey::Str(self.interns.intern("return"));
        let return_method = self.get_property(iterator, return_key)?;
        if self.is_callable(return_method) {
            self.call_value(return_method, iterator, &[])?;
        }
        Ok(())
    }

    /// Collects an iterable to completion (spread, `Array.from`, rest).
    pub fn iterate_collect(&mut self, value: Value) -> RunResult<Vec<Value>> {
        // Fast path: arrays and arguments objects over their element store.
        if let Value::Ref(id) = value {
            if let HeapData::Object(obj) = self.heap.get(id) {
                if let ObjectPayload::Array(elements) = &obj.payload {
                    return Ok(elements.clone());
                }
            }
        }
        let (iterator, next_method) = self.get_iterator(value)?;
        let mut out = Vec::new();
        loop {
            let (done, v) = self.iterator_step(iterator, next_method, None)?;
            if done {
                return Ok(out);
            }
            out.push(v);
        }
    }

    // === loops ===

    /// Evaluates any loop statement, with an optional label for targeted
    /// break/continue.
    pub fn eval_loop(&mut self, stmt: &StmtLoc, scope: ScopeId, label: Option<StringId>) -> RunResult<Completion> {
        match &stmt.stmt {
            Stmt::While { test, body } => {
                loop {
                    let t = self.eval_expr(test, scope)?;
                    if !self.to_boolean(t) {
                        break;
                    }
                    match self.loop_body(body, scope, label)? {
                        LoopFlow::Continue => {}
                        LoopFlow::Break => break,
                        LoopFlow::Propagate(c) => return Ok(c),
                    }
                }
                Ok(Completion::Normal(Value::Undefined))
            }
            Stmt::DoWhile { body, test } => {
                loop {
                    match self.loop_body(body, scope, label)? {
                        LoopFlow::Continue => {}
                        LoopFlow::Break => break,
                        LoopFlow::Propagate(c) => return Ok(c),
                    }
                    let t = self.eval_expr(test, scope)?;
                    if !self.to_boolean(t) {
                        break;
                    }
                }
                Ok(Completion::Normal(Value::Undefined))
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.eval_for(init.as_ref(), test.as_ref(), update.as_ref(), body, scope, label),
            Stmt::ForOf {
                head,
                iterable,
                body,
                is_await,
            } => {
                if *is_await {
                    return Err(RunError::NotSupported(
                        "for-await-of outside an async function".to_owned(),
                    ));
                }
                self.eval_for_of(head, iterable, body, scope, label)
            }
            Stmt::ForIn { head, object, body } => self.eval_for_in(head, object, body, scope, label),
            _ => unreachable!("eval_loop called on a non-loop"),
        }
    }

    fn loop_body(&mut self, body: &StmtLoc, scope: ScopeId, label: Option<StringId>) -> RunResult<LoopFlow> {
        match self.eval_stmt(body, scope)? {
            Completion::Normal(_) => Ok(LoopFlow::Continue),
            Completion::Continue(None) => Ok(LoopFlow::Continue),
            Completion::Continue(Some(l)) if Some(l) == label => Ok(LoopFlow::Continue),
            Completion::Break(None) => Ok(LoopFlow::Break),
            Completion::Break(Some(l)) if Some(l) == label => Ok(LoopFlow::Break),
            other => Ok(LoopFlow::Propagate(other)),
        }
    }

    fn eval_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&crate::ast::ExprLoc>,
        update: Option<&crate::ast::ExprLoc>,
        body: &StmtLoc,
        scope: ScopeId,
        label: Option<StringId>,
    ) -> RunResult<Completion> {
        let loop_scope = self.scopes.push(scope, ScopeKind::Block);
        let mut lexical_names: Vec<StringId> = Vec::new();
        match init {
            Some(ForInit::Expr(e)) => {
                self.eval_expr(e, loop_scope)?;
            }
            Some(ForInit::VarDecl { kind, declarators }) => {
                for decl in declarators {
                    let value = match &decl.init {
                        Some(init) => Some(self.eval_expr(init, loop_scope)?),
                        None => None,
                    };
                    match kind {
                        DeclKind::Var => {
                            let function_scope = self.scopes.function_scope(scope);
                            let mut names = Vec::new();
                            decl.target.each_bound_name(&mut |n| names.push(n));
                            for name in &names {
                                self.scopes.declare(function_scope, *name, BindingKind::Var, None);
                            }
                            if let Some(value) = value {
                                self.bind_pattern(&decl.target, value, loop_scope, BindTarget::VarAssign)?;
                            }
                        }
                        DeclKind::Let | DeclKind::Const => {
                            let kind = if *kind == DeclKind::Let {
                                BindingKind::Let
                            } else {
                                BindingKind::Const
                            };
                            decl.target.each_bound_name(&mut |n| lexical_names.push(n));
                            self.bind_pattern(&decl.target, value.unwrap_or(Value::Undefined), loop_scope, BindTarget::Declare(kind))?;
                        }
                    }
                }
            }
            None => {}
        }

        // Per-iteration copies of `let` bindings so closures created in the
        // body capture that iteration's values.
        let mut iter_scope = loop_scope;
        loop {
            if let Some(test) = test {
                let t = self.eval_expr(test, iter_scope)?;
                if !self.to_boolean(t) {
                    break;
                }
            }
            match self.loop_body(body, iter_scope, label)? {
                LoopFlow::Continue => {}
                LoopFlow::Break => break,
                LoopFlow::Propagate(c) => return Ok(c),
            }
            // Copy the `let` bindings before the update runs, so closures
            // made in the body keep this iteration's values.
            if !lexical_names.is_empty() {
                let next_scope = self.scopes.push(scope, ScopeKind::Block);
                for name in &lexical_names {
                    if let crate::scope::ReadOutcome::Found(v) = self.scopes.read(iter_scope, *name) {
                        self.scopes.declare(next_scope, *name, BindingKind::Let, Some(v));
                    }
                }
                iter_scope = next_scope;
            }
            if let Some(update) = update {
                self.eval_expr(update, iter_scope)?;
            }
        }
        Ok(Completion::Normal(Value::Undefined))
    }

    pub fn bind_for_head(&mut self, head: &ForHead, value: Value, scope: ScopeId) -> RunResult<()> {
        match head {
            ForHead::Decl { kind, target } => {
                let bind = match kind {
                    DeclKind::Var => BindTarget::VarAssign,
                    DeclKind::Let => BindTarget::Declare(BindingKind::Let),
                    DeclKind::Const => BindTarget::Declare(BindingKind::Const),
                };
                if *kind == DeclKind::Var {
                    let function_scope = self.scopes.function_scope(scope);
                    let mut names = Vec::new();
                    target.each_bound_name(&mut |n| names.push(n));
                    for name in &names {
                        self.scopes.declare(function_scope, *name, BindingKind::Var, None);
                    }
                }
                self.bind_pattern(target, value, scope, bind)
            }
            ForHead::Pattern(pattern) => self.bind_pattern(pattern, value, scope, BindTarget::Assign),
        }
    }

    fn eval_for_of(
        &mut self,
        head: &ForHead,
        iterable: &crate::ast::ExprLoc,
        body: &StmtLoc,
        scope: ScopeId,
        label: Option<StringId>,
    ) -> RunResult<Completion> {
        let value = self.eval_expr(iterable, scope)?;
        let (iterator, next_method) = self.get_iterator(value)?;
        loop {
            let (done, v) = self.iterator_step(iterator, next_method, None)?;
            if done {
                return Ok(Completion::Normal(Value::Undefined));
            }
            let iter_scope = self.scopes.push(scope, ScopeKind::Block);
            if let Err(e) = self.bind_for_head(head, v, iter_scope) {
                self.iterator_close(iterator)?;
                return Err(e);
            }
            match self.eval_stmt(body, iter_scope) {
                Ok(Completion::Normal(_)) | Ok(Completion::Continue(None)) => {}
                Ok(Completion::Continue(Some(l))) if Some(l) == label => {}
                Ok(Completion::Break(None)) => {
                    self.iterator_close(iterator)?;
                    return Ok(Completion::Normal(Value::Undefined));
                }
                Ok(Completion::Break(Some(l))) if Some(l) == label => {
                    self.iterator_close(iterator)?;
                    return Ok(Completion::Normal(Value::Undefined));
                }
                Ok(other) => {
                    self.iterator_close(iterator)?;
                    return Ok(other);
                }
                Err(e) => {
                    // Abrupt completion still closes the iterator, but the
                    // original throw wins over a close failure.
                    let _ = self.iterator_close(iterator);
                    return Err(e);
                }
            }
        }
    }

    fn eval_for_in(
        &mut self,
        head: &ForHead,
        object: &crate::ast::ExprLoc,
        body: &StmtLoc,
        scope: ScopeId,
        label: Option<StringId>,
    ) -> RunResult<Completion> {
        let value = self.eval_expr(object, scope)?;
        if value.is_nullish() {
            return Ok(Completion::Normal(Value::Undefined));
        }
        let keys = self.for_in_keys(value);
        for key in keys {
            let key_value = self.key_to_value(key);
            let iter_scope = self.scopes.push(scope, ScopeKind::Block);
            self.bind_for_head(head, key_value, iter_scope)?;
            match self.loop_body(body, iter_scope, label)? {
                LoopFlow::Continue => {}
                LoopFlow::Break => break,
                LoopFlow::Propagate(c) => return Ok(c),
            }
        }
        Ok(Completion::Normal(Value::Undefined))
    }
}

enum LoopFlow {
    Continue,
    Break,
    Propagate(Completion),
}
