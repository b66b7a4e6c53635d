//! Expression evaluation.

use crate::{
    ast::{
        Argument, ArrayElement, AssignOp, AssignTarget, BinaryOp, Expr, ExprLoc, Literal, LogicalOp, MemberKey,
        ObjectProp, PropName, UnaryOp,
    },
    error::RunResult,
    eval::{BindTarget, Interp, ops::Numeric},
    heap::HeapData,
    scope::ScopeId,
    types::{ClassTag, JsObject, ObjectPayload, PropKey, PropValue, Property, RegExpData},
    value::Value,
};

impl Interp {
    pub fn eval_expr(&mut self, expr: &ExprLoc, scope: ScopeId) -> RunResult<Value> {
        match &expr.expr {
            Expr::Literal(lit) => self.eval_literal(lit),
            Expr::Ident(name) => self.read_ident(*name, scope),
            Expr::This => Ok(self.scopes.this_value(scope).unwrap_or(Value::Undefined)),
            Expr::ResumeSlot(slot) => Ok(self
                .resume_slots
                .get(slot.0 as usize)
                .copied()
                .unwrap_or(Value::Undefined)),
            Expr::Array(elements) => {
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        ArrayElement::Hole => out.push(Value::Undefined),
                        ArrayElement::Item(e) => {
                            let v = self.eval_expr(e, scope)?;
                            out.push(v);
                        }
                        ArrayElement::Spread(e) => {
                            let v = self.eval_expr(e, scope)?;
                            let items = self.iterate_collect(v)?;
                            out.extend(items);
                        }
                    }
                }
                Ok(self.new_array(out))
            }
            Expr::Object(props) => self.eval_object_literal(props, scope),
            Expr::Function(func) => self.instantiate_function(*func, scope),
            Expr::Class(class) => crate::eval::call::eval_class(self, class, scope),
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(self.interns.get(*quasi));
                    if let Some(e) = exprs.get(i) {
                        let v = self.eval_expr(e, scope)?;
                        out.push_str(&self.to_string_value(v)?);
                    }
                }
                Ok(self.alloc_string(out))
            }
            Expr::TaggedTemplate {
                tag,
                quasis,
                raws,
                exprs,
            } => {
                let (tag_this, tag_fn) = self.eval_callee(tag, scope)?;
                let cooked: Vec<Value> = quasis.iter().map(|q| Value::Str(*q)).collect();
                let raw: Vec<Value> = raws.iter().map(|r| Value::Str(*r)).collect();
                let strings = self.new_array(cooked);
                let raw_arr = self.new_array(raw);
                let raw_key = PropKey::Str(self.interns.intern("raw"));
                if let Value::Ref(id) = strings {
                    self.heap.object_mut(id).set_data(raw_key, raw_arr);
                }
                let mut args = vec![strings];
                for e in exprs {
                    args.push(self.eval_expr(e, scope)?);
                }
                self.call_value(tag_fn, tag_this, &args)
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::TypeOf => {
                    // typeof of an unresolved identifier is "undefined".
                    if let Expr::Ident(name) = &operand.expr {
                        if matches!(self.scopes.read(scope, *name), crate::scope::ReadOutcome::NotFound) {
                            let global = self.realm.global_obj;
                            if !self.heap.object(global).has_own(PropKey::Str(*name)) {
                                return Ok(Value::Str(self.interns.intern("undefined")));
                            }
                        }
                    }
                    let v = self.eval_expr(operand, scope)?;
                    self.unary_op(UnaryOp::TypeOf, v)
                }
                UnaryOp::Delete => self.eval_delete(operand, scope),
                _ => {
                    let v = self.eval_expr(operand, scope)?;
                    self.unary_op(*op, v)
                }
            },
            Expr::Update {
                prefix,
                increment,
                target,
            } => self.eval_update(*prefix, *increment, target, scope),
            Expr::Binary { op, left, right } => {
                let a = self.eval_expr(left, scope)?;
                let b = self.eval_expr(right, scope)?;
                self.binary_op(*op, a, b)
            }
            Expr::Logical { op, left, right } => {
                let a = self.eval_expr(left, scope)?;
                let take_right = match op {
                    LogicalOp::And => self.to_boolean(a),
                    LogicalOp::Or => !self.to_boolean(a),
                    LogicalOp::Nullish => a.is_nullish(),
                };
                if take_right {
                    self.eval_expr(right, scope)
                } else {
                    Ok(a)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let t = self.eval_expr(test, scope)?;
                if self.to_boolean(t) {
                    self.eval_expr(consequent, scope)
                } else {
                    self.eval_expr(alternate, scope)
                }
            }
            Expr::Assign { op, target, value } => self.eval_assign(*op, target, value, scope),
            Expr::Member { object, key, .. } => {
                let base = self.eval_expr(object, scope)?;
                let key = self.eval_member_key(key, scope)?;
                self.get_property(base, key)
            }
            Expr::Call { callee, args, .. } => {
                let (this, func) = self.eval_callee(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                if !self.is_callable(func) {
                    let desc = self.describe_callee(callee);
                    return Err(self.throw_type_error(format!("{desc} is not a function")));
                }
                self.call_value(func, this, &args)
            }
            Expr::New { callee, args } => {
                let func = self.eval_expr(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                self.construct(func, &args)
            }
            Expr::Chain(inner) => Ok(self.eval_chain(inner, scope)?.unwrap_or(Value::Undefined)),
            Expr::DynamicImport(specifier) => {
                let v = self.eval_expr(specifier, scope)?;
                let path = self.to_string_value(v)?;
                crate::modules::dynamic_import(self, &path)
            }
            Expr::Sequence(parts) => {
                let mut last = Value::Undefined;
                for part in parts {
                    last = self.eval_expr(part, scope)?;
                }
                Ok(last)
            }
            Expr::Yield { .. } | Expr::Await(_) => Err(crate::error::RunError::NotSupported(
                "suspension outside a lowered function body".to_owned(),
            )),
            Expr::SuperMember(key) => {
                let (this, value) = self.eval_super_member(key, scope)?;
                let _ = this;
                Ok(value)
            }
            Expr::SuperCall(args) => {
                let args = self.eval_args(args, scope)?;
                crate::eval::call::eval_super_call(self, &args, scope)
            }
        }
    }

    fn eval_literal(&mut self, lit: &Literal) -> RunResult<Value> {
        Ok(match lit {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::Str(s) => Value::Str(*s),
            Literal::BigInt(b) => self.alloc_bigint_value((**b).clone()),
            Literal::Regex { pattern, flags } => {
                let source = self.interns.get(*pattern).to_owned();
                let flags = self.interns.get(*flags).to_owned();
                return self.new_regexp(&source, &flags);
            }
        })
    }

    pub fn new_regexp(&mut self, source: &str, flags: &str) -> RunResult<Value> {
        let data = match RegExpData::compile(source, flags) {
            Ok(data) => data,
            Err(message) => return Err(self.throw_error(crate::error::ErrorKind::SyntaxError, message)),
        };
        let proto = self.realm.regexp_proto;
        let mut obj = JsObject::with_payload(ClassTag::RegExp, Some(proto), ObjectPayload::RegExp(Box::new(data)));
        let last_index = PropKey::Str(self.interns.intern("lastIndex"));
        obj.define(last_index, Property::method(Value::Number(0.0)));
        Ok(Value::Ref(self.heap.alloc_object(obj)))
    }

    fn eval_object_literal(&mut self, props: &[ObjectProp], scope: ScopeId) -> RunResult<Value> {
        let id = self.new_object();
        for prop in props {
            match prop {
                ObjectProp::KeyValue { key, value } => {
                    let key = self.eval_prop_name(key, scope)?;
                    let v = self.eval_expr(value, scope)?;
                    if let PropKey::Str(name) = key {
                        if let Expr::Function(func) = &value.expr {
                            if self.funcs[func.index()].name.is_none() {
                                self.set_function_name(v, name);
                            }
                        }
                    }
                    self.define_own_property(id, key, Property::data(v))?;
                }
                ObjectProp::Shorthand(name) => {
                    let v = self.read_ident(*name, scope)?;
                    self.heap.object_mut(id).define(PropKey::Str(*name), Property::data(v));
                }
                ObjectProp::Method { key, func } => {
                    let key = self.eval_prop_name(key, scope)?;
                    let method = self.instantiate_method(*func, scope, id)?;
                    if let PropKey::Str(name) = key {
                        self.set_function_name(method, name);
                    }
                    self.heap.object_mut(id).define(key, Property::data(method));
                }
                ObjectProp::Getter { key, func } => {
                    let key = self.eval_prop_name(key, scope)?;
                    let getter = self.instantiate_method(*func, scope, id)?;
                    self.merge_accessor(id, key, Some(getter), None);
                }
                ObjectProp::Setter { key, func } => {
                    let key = self.eval_prop_name(key, scope)?;
                    let setter = self.instantiate_method(*func, scope, id)?;
                    self.merge_accessor(id, key, None, Some(setter));
                }
                ObjectProp::Spread(e) => {
                    let source = self.eval_expr(e, scope)?;
                    self.copy_data_properties(id, source)?;
                }
            }
        }
        Ok(Value::Ref(id))
    }

    /// Merges a getter or setter into an existing accessor pair.
    pub fn merge_accessor(&mut self, id: crate::heap::HeapId, key: PropKey, get: Option<Value>, set: Option<Value>) {
        let obj = self.heap.object_mut(id);
        let (prev_get, prev_set) = match obj.get_own(key).map(|p| p.value) {
            Some(PropValue::Accessor { get, set }) => (get, set),
            _ => (None, None),
        };
        let mut prop = Property::accessor(get.or(prev_get), set.or(prev_set));
        prop.enumerable = true;
        obj.define(key, prop);
    }

    /// `{...source}` / `Object.assign` copying: own enumerable properties,
    /// getters run.
    pub fn copy_data_properties(&mut self, target: crate::heap::HeapId, source: Value) -> RunResult<()> {
        if source.is_nullish() {
            return Ok(());
        }
        if let Value::Ref(src_id) = source {
            if matches!(self.heap.get(src_id), HeapData::Object(_)) {
                let keys = self.own_enumerable_string_keys(src_id);
                for key in keys {
                    let v = self.get_property(source, key)?;
                    self.define_own_property(target, key, Property::data(v))?;
                }
                return Ok(());
            }
        }
        // Primitives: strings spread their characters as index properties;
        // other primitives contribute nothing.
        if let Some(content) = self.string_content(source) {
            for (i, c) in content.chars().enumerate() {
                let v = self.alloc_string(c.to_string());
                self.define_own_property(target, PropKey::Index(i as u32), Property::data(v))?;
            }
        }
        Ok(())
    }

    pub fn eval_prop_name(&mut self, key: &PropName, scope: ScopeId) -> RunResult<PropKey> {
        match key {
            PropName::Ident(name) => Ok(PropKey::Str(*name)),
            PropName::Str(s) => {
                let text = self.interns.get(*s).to_owned();
                Ok(self.prop_key_from_str(&text))
            }
            PropName::Num(n) => {
                let v = Value::Number(*n);
                self.to_property_key(v)
            }
            PropName::Private(name) => {
                let text = format!("#{}", self.interns.get(*name));
                Ok(PropKey::Str(self.interns.intern_owned(text)))
            }
            PropName::Computed(e) => {
                let v = self.eval_expr(e, scope)?;
                self.to_property_key(v)
            }
        }
    }

    pub fn eval_member_key(&mut self, key: &MemberKey, scope: ScopeId) -> RunResult<PropKey> {
        match key {
            MemberKey::Ident(name) => Ok(PropKey::Str(*name)),
            MemberKey::Private(name) => {
                let text = format!("#{}", self.interns.get(*name));
                Ok(PropKey::Str(self.interns.intern_owned(text)))
            }
            MemberKey::Computed(e) => {
                let v = self.eval_expr(e, scope)?;
                self.to_property_key(v)
            }
        }
    }

    // === calls ===

    /// Evaluates a callee expression, producing the `this` for the call.
    fn eval_callee(&mut self, callee: &ExprLoc, scope: ScopeId) -> RunResult<(Value, Value)> {
        match &callee.expr {
            Expr::Member { object, key, .. } => {
                let base = self.eval_expr(object, scope)?;
                let key = self.eval_member_key(key, scope)?;
                let func = self.get_property(base, key)?;
                Ok((base, func))
            }
            Expr::SuperMember(key) => self.eval_super_member(key, scope),
            _ => {
                let func = self.eval_expr(callee, scope)?;
                Ok((Value::Undefined, func))
            }
        }
    }

    /// `super.key` produces (this, method) pairs for gets and calls.
    fn eval_super_member(&mut self, key: &MemberKey, scope: ScopeId) -> RunResult<(Value, Value)> {
        let Some(home) = self.scopes.home_object(scope) else {
            return Err(self.throw_error(
                crate::error::ErrorKind::SyntaxError,
                "'super' is only valid inside methods",
            ));
        };
        let this = self.scopes.this_value(scope).unwrap_or(Value::Undefined);
        let key = self.eval_member_key(key, scope)?;
        let Some(parent) = self.heap.object(home).proto else {
            return Ok((this, Value::Undefined));
        };
        let value = self.get_property(Value::Ref(parent), key)?;
        Ok((this, value))
    }

    fn describe_callee(&self, callee: &ExprLoc) -> String {
        match &callee.expr {
            Expr::Ident(name) => self.interns.get(*name).to_owned(),
            Expr::Member {
                key: MemberKey::Ident(name),
                ..
            } => format!("member '{}'", self.interns.get(*name)),
            _ => "expression".to_owned(),
        }
    }

    pub fn eval_args(&mut self, args: &[Argument], scope: ScopeId) -> RunResult<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Argument::Expr(e) => out.push(self.eval_expr(e, scope)?),
                Argument::Spread(e) => {
                    let v = self.eval_expr(e, scope)?;
                    out.extend(self.iterate_collect(v)?);
                }
            }
        }
        Ok(out)
    }

    // === optional chains ===

    /// Evaluates inside an optional chain; `None` means a `?.` short-circuit
    /// fired and the whole chain is `undefined`.
    fn eval_chain(&mut self, expr: &ExprLoc, scope: ScopeId) -> RunResult<Option<Value>> {
        match &expr.expr {
            Expr::Member { object, key, optional } => {
                let Some(base) = self.eval_chain(object, scope)? else {
                    return Ok(None);
                };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                let key = self.eval_member_key(key, scope)?;
                Ok(Some(self.get_property(base, key)?))
            }
            Expr::Call { callee, args, optional } => {
                let (this, func) = match &callee.expr {
                    Expr::Member {
                        object,
                        key,
                        optional: member_optional,
                    } => {
                        let Some(base) = self.eval_chain(object, scope)? else {
                            return Ok(None);
                        };
                        if *member_optional && base.is_nullish() {
                            return Ok(None);
                        }
                        let key = self.eval_member_key(key, scope)?;
                        (base, self.get_property(base, key)?)
                    }
                    _ => {
                        let Some(func) = self.eval_chain(callee, scope)? else {
                            return Ok(None);
                        };
                        (Value::Undefined, func)
                    }
                };
                if *optional && func.is_nullish() {
                    return Ok(None);
                }
                if !self.is_callable(func) {
                    let desc = self.describe_callee(callee);
                    return Err(self.throw_type_error(format!("{desc} is not a function")));
                }
                let args = self.eval_args(args, scope)?;
                Ok(Some(self.call_value(func, this, &args)?))
            }
            _ => Ok(Some(self.eval_expr(expr, scope)?)),
        }
    }

    // === assignment ===

    fn eval_assign(
        &mut self,
        op: AssignOp,
        target: &AssignTarget,
        value: &ExprLoc,
        scope: ScopeId,
    ) -> RunResult<Value> {
        if op == AssignOp::Assign {
            let v = self.eval_expr(value, scope)?;
            match target {
                AssignTarget::Ident(name) => {
                    if let Expr::Function(func) = &value.expr {
                        if self.funcs[func.index()].name.is_none() {
                            self.set_function_name(v, *name);
                        }
                    }
                    self.write_ident(*name, v, scope)?;
                }
                AssignTarget::Member { object, key } => {
                    let base = self.eval_expr(object, scope)?;
                    let key = self.eval_member_key(key, scope)?;
                    self.set_property(base, key, v)?;
                }
                AssignTarget::Pattern(pattern) => {
                    self.bind_pattern(pattern, v, scope, BindTarget::Assign)?;
                }
            }
            return Ok(v);
        }

        // Logical assignments short-circuit before evaluating the RHS.
        if matches!(op, AssignOp::And | AssignOp::Or | AssignOp::Nullish) {
            let current = self.read_assign_target(target, scope)?;
            let should_assign = match op {
                AssignOp::And => self.to_boolean(current),
                AssignOp::Or => !self.to_boolean(current),
                AssignOp::Nullish => current.is_nullish(),
                _ => unreachable!(),
            };
            if !should_assign {
                return Ok(current);
            }
            let v = self.eval_expr(value, scope)?;
            self.write_assign_target(target, v, scope)?;
            return Ok(v);
        }

        let current = self.read_assign_target(target, scope)?;
        let rhs = self.eval_expr(value, scope)?;
        let binary = match op {
            AssignOp::Add => BinaryOp::Add,
            AssignOp::Sub => BinaryOp::Sub,
            AssignOp::Mul => BinaryOp::Mul,
            AssignOp::Div => BinaryOp::Div,
            AssignOp::Rem => BinaryOp::Rem,
            AssignOp::Exp => BinaryOp::Exp,
            AssignOp::BitAnd => BinaryOp::BitAnd,
            AssignOp::BitOr => BinaryOp::BitOr,
            AssignOp::BitXor => BinaryOp::BitXor,
            AssignOp::Shl => BinaryOp::Shl,
            AssignOp::Shr => BinaryOp::Shr,
            AssignOp::UShr => BinaryOp::UShr,
            _ => unreachable!("plain and logical assignment handled above"),
        };
        let result = self.binary_op(binary, current, rhs)?;
        self.write_assign_target(target, result, scope)?;
        Ok(result)
    }

    fn read_assign_target(&mut self, target: &AssignTarget, scope: ScopeId) -> RunResult<Value> {
        match target {
            AssignTarget::Ident(name) => self.read_ident(*name, scope),
            AssignTarget::Member { object, key } => {
                let base = self.eval_expr(object, scope)?;
                let key = self.eval_member_key(key, scope)?;
                self.get_property(base, key)
            }
            AssignTarget::Pattern(_) => Err(self.throw_type_error("invalid compound assignment target")),
        }
    }

    fn write_assign_target(&mut self, target: &AssignTarget, value: Value, scope: ScopeId) -> RunResult<()> {
        match target {
            AssignTarget::Ident(name) => self.write_ident(*name, value, scope),
            AssignTarget::Member { object, key } => {
                let base = self.eval_expr(object, scope)?;
                let key = self.eval_member_key(key, scope)?;
                self.set_property(base, key, value)
            }
            AssignTarget::Pattern(_) => Err(self.throw_type_error("invalid compound assignment target")),
        }
    }

    fn eval_update(&mut self, prefix: bool, increment: bool, target: &ExprLoc, scope: ScopeId) -> RunResult<Value> {
        let old = match &target.expr {
            Expr::Ident(name) => self.read_ident(*name, scope)?,
            Expr::Member { object, key, .. } => {
                let base = self.eval_expr(object, scope)?;
                let key = self.eval_member_key(key, scope)?;
                self.get_property(base, key)?
            }
            _ => return Err(self.throw_type_error("invalid increment/decrement target")),
        };
        let (old_numeric, new_value) = match self.to_numeric(old)? {
            Numeric::Num(n) => {
                let delta = if increment { 1.0 } else { -1.0 };
                (Value::Number(n), Value::Number(n + delta))
            }
            Numeric::Big(b) => {
                let one = num_bigint::BigInt::from(1);
                let new = if increment { &b + one } else { &b - one };
                let old_v = self.alloc_bigint_value(b);
                (old_v, self.alloc_bigint_value(new))
            }
        };
        match &target.expr {
            Expr::Ident(name) => self.write_ident(*name, new_value, scope)?,
            Expr::Member { object, key, .. } => {
                let base = self.eval_expr(object, scope)?;
                let key = self.eval_member_key(key, scope)?;
                self.set_property(base, key, new_value)?;
            }
            _ => unreachable!("checked above"),
        }
        Ok(if prefix { new_value } else { old_numeric })
    }

    fn eval_delete(&mut self, operand: &ExprLoc, scope: ScopeId) -> RunResult<Value> {
        match &operand.expr {
            Expr::Member { object, key, .. } => {
                let base = self.eval_expr(object, scope)?;
                let key = self.eval_member_key(key, scope)?;
                let deleted = self.delete_property(base, key)?;
                Ok(Value::Bool(deleted))
            }
            Expr::Ident(name) => {
                // Deleting a global object property is permitted in sloppy
                // mode; bindings are not deletable.
                let global = self.realm.global_obj;
                let key = PropKey::Str(*name);
                if self.heap.object(global).has_own(key) && !self.scopes.has_own(crate::scope::ScopeId::GLOBAL, *name) {
                    let deleted = self.heap.object_mut(global).delete(key);
                    return Ok(Value::Bool(deleted));
                }
                Ok(Value::Bool(false))
            }
            _ => {
                self.eval_expr(operand, scope)?;
                Ok(Value::Bool(true))
            }
        }
    }
}
