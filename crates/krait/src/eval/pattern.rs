//! Destructuring.
//!
//! Array patterns consume an iterator element by element; object patterns
//! read properties by key and track consumed keys so a rest binding receives
//! the complement. Defaults fill in only for `undefined`.

use crate::{
    ast::{ArrayPatternElem, Pattern, PropName},
    error::RunResult,
    eval::{BindTarget, Interp},
    scope::ScopeId,
    types::{PropKey, Property},
    value::Value,
};

impl Interp {
    /// Binds `value` against `pattern` in `scope` according to `target`.
    pub fn bind_pattern(&mut self, pattern: &Pattern, value: Value, scope: ScopeId, target: BindTarget) -> RunResult<()> {
        match pattern {
            Pattern::Ident(name) => {
                match target {
                    BindTarget::Declare(kind) => {
                        self.scopes.declare(scope, *name, kind, Some(value));
                    }
                    BindTarget::Initialize => {
                        self.scopes.initialize(scope, *name, value);
                    }
                    BindTarget::VarAssign | BindTarget::Assign => {
                        self.write_ident(*name, value, scope)?;
                    }
                }
                Ok(())
            }
            Pattern::Array(elements) => self.bind_array_pattern(elements, value, scope, target),
            Pattern::Object { props, rest } => self.bind_object_pattern(props, rest.as_deref(), value, scope, target),
        }
    }

    fn bind_array_pattern(
        &mut self,
        elements: &[ArrayPatternElem],
        value: Value,
        scope: ScopeId,
        target: BindTarget,
    ) -> RunResult<()> {
        let (iterator, next_method) = self.get_iterator(value)?;
        let mut exhausted = false;
        for element in elements {
            match element {
                ArrayPatternElem::Hole => {
                    if !exhausted {
                        let (done, _) = self.iterator_step(iterator, next_method, None)?;
                        exhausted = done;
                    }
                }
                ArrayPatternElem::Elem { pattern, default } => {
                    let mut v = if exhausted {
                        Value::Undefined
                    } else {
                        let (done, v) = self.iterator_step(iterator, next_method, None)?;
                        exhausted = done;
                        if done { Value::Undefined } else { v }
                    };
                    if v == Value::Undefined {
                        if let Some(default) = default {
                            v = self.eval_expr(default, scope)?;
                        }
                    }
                    self.bind_pattern(pattern, v, scope, target)?;
                }
                ArrayPatternElem::Rest(pattern) => {
                    let mut rest = Vec::new();
                    while !exhausted {
                        let (done, v) = self.iterator_step(iterator, next_method, None)?;
                        exhausted = done;
                        if !done {
                            rest.push(v);
                        }
                    }
                    let rest = self.new_array(rest);
                    self.bind_pattern(pattern, rest, scope, target)?;
                }
            }
        }
        if !exhausted {
            self.iterator_close(iterator)?;
        }
        Ok(())
    }

    fn bind_object_pattern(
        &mut self,
        props: &[crate::ast::ObjectPatternProp],
        rest: Option<&Pattern>,
        value: Value,
        scope: ScopeId,
        target: BindTarget,
    ) -> RunResult<()> {
        if value.is_nullish() {
            return Err(self.throw_type_error("cannot destructure a nullish value"));
        }
        let mut consumed: Vec<PropKey> = Vec::with_capacity(props.len());
        for prop in props {
            let key = self.pattern_prop_key(&prop.key, scope)?;
            consumed.push(key);
            let mut v = self.get_property(value, key)?;
            if v == Value::Undefined {
                if let Some(default) = &prop.default {
                    v = self.eval_expr(default, scope)?;
                }
            }
            self.bind_pattern(&prop.pattern, v, scope, target)?;
        }
        if let Some(rest_pattern) = rest {
            let rest_obj = self.new_object();
            if let Value::Ref(src) = value {
                if matches!(self.heap.get(src), crate::heap::HeapData::Object(_)) {
                    let keys = self.own_enumerable_string_keys(src);
                    for key in keys {
                        if consumed.contains(&key) {
                            continue;
                        }
                        let v = self.get_property(value, key)?;
                        self.define_own_property(rest_obj, key, Property::data(v))?;
                    }
                }
            }
            self.bind_pattern(rest_pattern, Value::Ref(rest_obj), scope, target)?;
        }
        Ok(())
    }

    fn pattern_prop_key(&mut self, key: &PropName, scope: ScopeId) -> RunResult<PropKey> {
        self.eval_prop_name(key, scope)
    }
}
