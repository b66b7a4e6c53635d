//! Call semantics: closures, bound functions, constructors, classes, and the
//! hand-off into the generator machine for suspendable functions.

use std::rc::Rc;

use crate::{
    ast::{ClassDef, ClassMember, FunctionBody, FunctionDef, MethodKind},
    error::{ErrorKind, RunError, RunResult},
    eval::{BindTarget, Completion, CtorCtx, FrameInfo, Interp},
    r#gen::machine,
    heap::HeapId,
    intern::FunctionId,
    scope::{BindingKind, ScopeId, ScopeKind},
    types::{
        ClassInfo, ClassTag, ClosureData, FieldInit, FieldKey, GenKind, GeneratorData, JsObject, ObjectPayload,
        PropKey, Property,
    },
    value::Value,
};

/// Script call depth guard: deep recursion must become a catchable
/// RangeError before the native stack runs out. Each script call costs a
/// handful of evaluator frames, so this stays well under a 2 MiB thread
/// stack.
const MAX_CALL_DEPTH: usize = 250;

impl Interp {
    /// Invokes any callable value.
    pub fn call_value(&mut self, callee: Value, this: Value, args: &[Value]) -> RunResult<Value> {
        let Value::Ref(id) = callee else {
            return Err(self.throw_type_error("value is not a function"));
        };
        let payload_kind = {
            let crate::heap::HeapData::Object(obj) = self.heap.get(id) else {
                return Err(self.throw_type_error("value is not a function"));
            };
            match &obj.payload {
                ObjectPayload::Function(_) => 0u8,
                ObjectPayload::Bound(_) => 1,
                ObjectPayload::Native(_) => 2,
                ObjectPayload::HostFn(_) => 3,
                ObjectPayload::NativeClosure(_) => 4,
                _ => return Err(self.throw_type_error("value is not a function")),
            }
        };
        match payload_kind {
            0 => invoke_function_object(self, id, this, args, None),
            1 => {
                let (target, bound_this, mut all_args) = {
                    let ObjectPayload::Bound(b) = &self.heap.object(id).payload else {
                        unreachable!()
                    };
                    (b.target, b.this_value, b.bound_args.clone())
                };
                all_args.extend_from_slice(args);
                self.call_value(target, bound_this, &all_args)
            }
            2 => {
                let ObjectPayload::Native(builtin) = &self.heap.object(id).payload else {
                    unreachable!()
                };
                let builtin = *builtin;
                crate::builtins::call_builtin(self, builtin, this, args)
            }
            3 => {
                let ObjectPayload::HostFn(host_id) = &self.heap.object(id).payload else {
                    unreachable!()
                };
                let host_id = *host_id;
                crate::host::call_host_fn(self, host_id, this, args)
            }
            _ => {
                let ObjectPayload::NativeClosure(closure) = &self.heap.object(id).payload else {
                    unreachable!()
                };
                let closure = *closure;
                crate::builtins::promise::call_native_closure(self, closure, args)
            }
        }
    }

    /// `new callee(...args)`.
    pub fn construct(&mut self, callee: Value, args: &[Value]) -> RunResult<Value> {
        enum CtorKind {
            Native(crate::builtins::Builtin),
            Bound(Value, Vec<Value>),
            Script(Option<FunctionId>),
            NotConstructor,
        }
        let Value::Ref(id) = callee else {
            return Err(self.throw_type_error("value is not a constructor"));
        };
        let kind = match self.heap.get(id) {
            crate::heap::HeapData::Object(obj) => match &obj.payload {
                ObjectPayload::Native(builtin) => CtorKind::Native(*builtin),
                ObjectPayload::Bound(b) => CtorKind::Bound(b.target, b.bound_args.clone()),
                ObjectPayload::Function(closure) => CtorKind::Script(closure.func),
                _ => CtorKind::NotConstructor,
            },
            _ => CtorKind::NotConstructor,
        };
        match kind {
            CtorKind::Native(builtin) => crate::builtins::construct_builtin(self, builtin, args),
            CtorKind::Bound(target, mut all_args) => {
                all_args.extend_from_slice(args);
                self.construct(target, &all_args)
            }
            CtorKind::Script(func) => {
                if let Some(func) = func {
                    let def = &self.funcs[func.index()];
                    if def.is_arrow || def.is_generator || def.is_async {
                        return Err(self.throw_type_error("value is not a constructor"));
                    }
                }
                // Create `this` from the callee's prototype property.
                let proto_key = PropKey::Str(self.interns.intern("prototype"));
                let proto_val = self.get_property(callee, proto_key)?;
                let proto = match proto_val {
                    Value::Ref(p) if matches!(self.heap.get(p), crate::heap::HeapData::Object(_)) => p,
                    _ => self.realm.object_proto,
                };
                let this = Value::Ref(self.heap.alloc_object(JsObject::new(ClassTag::Object, Some(proto))));
                let result = invoke_function_object(self, id, this, args, Some(this))?;
                if result.is_object(&self.heap) {
                    Ok(result)
                } else {
                    Ok(this)
                }
            }
            CtorKind::NotConstructor => Err(self.throw_type_error("value is not a constructor")),
        }
    }
}

/// Calls the script function object `func_obj`. `construct_this` is set for
/// `new` and enables the constructor protocol (ctor stack, field inits).
pub(crate) fn invoke_function_object(
    interp: &mut Interp,
    func_obj: HeapId,
    this: Value,
    args: &[Value],
    construct_this: Option<Value>,
) -> RunResult<Value> {
    if interp.call_stack.len() >= MAX_CALL_DEPTH {
        return Err(interp.throw_range_error("maximum call stack size exceeded"));
    }
    let (func_id, env, home, is_class) = {
        let ObjectPayload::Function(c) = &interp.heap.object(func_obj).payload else {
            return Err(interp.throw_type_error("value is not a function"));
        };
        (c.func, c.env, c.home_object, c.class.is_some())
    };

    if is_class && construct_this.is_none() {
        return Err(interp.throw_type_error("class constructor cannot be invoked without 'new'"));
    }

    // Constructor protocol bookkeeping.
    if let Some(this) = construct_this {
        if is_class {
            interp.ctor_stack.push(CtorCtx { ctor: func_obj, this });
            let has_parent = class_parent(interp, func_obj).is_some();
            let result = (|| {
                if let Some(func_id) = func_id {
                    if has_parent {
                        // Derived constructor: fields run when super() does.
                        invoke_definition(interp, func_id, env, home, this, args)
                    } else {
                        run_field_inits(interp, func_obj, this)?;
                        invoke_definition(interp, func_id, env, home, this, args)
                    }
                } else {
                    // Synthesized default constructor.
                    if has_parent {
                        eval_super_call(interp, args, interp_scope_placeholder())?;
                    } else {
                        run_field_inits(interp, func_obj, this)?;
                    }
                    Ok(Value::Undefined)
                }
            })();
            interp.ctor_stack.pop();
            return result;
        }
    }

    let Some(func_id) = func_id else {
        return Ok(Value::Undefined);
    };
    invoke_definition(interp, func_id, env, home, this, args)
}

/// The placeholder scope for default-constructor super dispatch; the ctor
/// stack, not the scope, carries the needed context there.
fn interp_scope_placeholder() -> ScopeId {
    ScopeId::GLOBAL
}

fn class_parent(interp: &Interp, ctor: HeapId) -> Option<Value> {
    match &interp.heap.object(ctor).payload {
        ObjectPayload::Function(c) => c.class.as_ref().and_then(|class| class.parent),
        _ => None,
    }
}

/// Runs a function definition body in a fresh function scope.
fn invoke_definition(
    interp: &mut Interp,
    func_id: FunctionId,
    env: ScopeId,
    home: Option<HeapId>,
    this: Value,
    args: &[Value],
) -> RunResult<Value> {
    let def = Rc::clone(&interp.funcs[func_id.index()]);
    if def.is_generator || def.is_async {
        return create_suspendable(interp, &def, func_id, env, home, this, args);
    }
    let scope = prepare_function_scope(interp, &def, env, home, this, args)?;
    interp.call_stack.push(FrameInfo {
        name: def.name,
        range: def.range,
    });
    let result = run_function_body(interp, &def, scope);
    interp.call_stack.pop();
    result
}

/// Creates the function scope: strictness, `this`, `arguments`, parameters.
pub(crate) fn prepare_function_scope(
    interp: &mut Interp,
    def: &FunctionDef,
    env: ScopeId,
    home: Option<HeapId>,
    this: Value,
    args: &[Value],
) -> RunResult<ScopeId> {
    let scope = interp.scopes.push(env, ScopeKind::Function);
    if def.is_strict {
        interp.scopes.set_strict(scope);
    }
    if !def.is_arrow {
        let this_val = if interp.scopes.is_strict(scope) || !this.is_nullish() {
            this
        } else {
            Value::Ref(interp.realm.global_obj)
        };
        interp.scopes.get_mut(scope).this_val = Some(this_val);
        interp.scopes.get_mut(scope).home_object = home;

        // `arguments` object (array-like, not a real array).
        let arguments_name = interp.interns.intern("arguments");
        let proto = interp.realm.object_proto;
        let arguments_obj = JsObject::with_payload(
            ClassTag::Arguments,
            Some(proto),
            ObjectPayload::Array(args.to_vec()),
        );
        let arguments_val = Value::Ref(interp.heap.alloc_object(arguments_obj));
        interp
            .scopes
            .declare(scope, arguments_name, BindingKind::Var, Some(arguments_val));
    }
    bind_parameters(interp, def, scope, args)?;
    Ok(scope)
}

fn bind_parameters(interp: &mut Interp, def: &FunctionDef, scope: ScopeId, args: &[Value]) -> RunResult<()> {
    let mut index = 0usize;
    for param in &def.params {
        if param.rest {
            let rest: Vec<Value> = args.get(index..).unwrap_or(&[]).to_vec();
            let rest = interp.new_array(rest);
            interp.bind_pattern(&param.pattern, rest, scope, BindTarget::Declare(BindingKind::Param))?;
            break;
        }
        let mut value = args.get(index).copied().unwrap_or(Value::Undefined);
        index += 1;
        if value == Value::Undefined {
            if let Some(default) = &param.default {
                value = interp.eval_expr(default, scope)?;
            }
        }
        interp.bind_pattern(&param.pattern, value, scope, BindTarget::Declare(BindingKind::Param))?;
    }
    Ok(())
}

fn run_function_body(interp: &mut Interp, def: &FunctionDef, scope: ScopeId) -> RunResult<Value> {
    match &def.body {
        FunctionBody::Expr(expr) => interp.eval_expr(expr, scope),
        FunctionBody::Block(body) => {
            interp.hoist_declarations(body, scope, true)?;
            for stmt in body {
                match interp.eval_stmt(stmt, scope)? {
                    Completion::Normal(_) => {}
                    Completion::Return(v) => return Ok(v),
                    Completion::Break(_) | Completion::Continue(_) => {
                        return Err(interp.throw_error(ErrorKind::SyntaxError, "illegal break/continue"));
                    }
                }
            }
            Ok(Value::Undefined)
        }
    }
}

// === suspendable functions (generators, async) ===

/// First invocation of a generator/async function: lower, build IR (cached),
/// create the instance, and for async functions start driving immediately.
fn create_suspendable(
    interp: &mut Interp,
    def: &Rc<FunctionDef>,
    func_id: FunctionId,
    env: ScopeId,
    home: Option<HeapId>,
    this: Value,
    args: &[Value],
) -> RunResult<Value> {
    let ir = interp.get_or_build_ir(func_id)?;
    let scope = prepare_function_scope(interp, def, env, home, this, args)?;
    let kind = match (def.is_generator, def.is_async) {
        (true, false) => GenKind::Sync,
        (false, true) => GenKind::Async,
        (true, true) => GenKind::AsyncGen,
        (false, false) => unreachable!("checked by caller"),
    };
    let data = GeneratorData::new(func_id, ir, kind, scope);
    match kind {
        GenKind::Sync => {
            let proto = interp.realm.generator_proto;
            let obj = JsObject::with_payload(ClassTag::Generator, Some(proto), ObjectPayload::Generator(Box::new(data)));
            Ok(Value::Ref(interp.heap.alloc_object(obj)))
        }
        GenKind::AsyncGen => {
            let proto = interp.realm.async_generator_proto;
            let obj = JsObject::with_payload(
                ClassTag::AsyncGenerator,
                Some(proto),
                ObjectPayload::Generator(Box::new(data)),
            );
            Ok(Value::Ref(interp.heap.alloc_object(obj)))
        }
        GenKind::Async => {
            let promise = crate::builtins::promise::new_promise(interp);
            let mut data = data;
            data.promise = Some(promise);
            let proto = interp.realm.generator_proto;
            let obj = JsObject::with_payload(ClassTag::Generator, Some(proto), ObjectPayload::Generator(Box::new(data)));
            let gen_id = interp.heap.alloc_object(obj);
            // Run synchronously up to the first await (or completion).
            machine::drive(interp, gen_id, machine::ResumeInput::Next(Value::Undefined))?;
            Ok(Value::Ref(promise))
        }
    }
}

impl Interp {
    /// Lowers and compiles a suspendable function's body, caching the IR.
    pub fn get_or_build_ir(&mut self, func_id: FunctionId) -> RunResult<Rc<crate::r#gen::ir::IrCode>> {
        if let Some(ir) = self.ir_cache.get(&func_id) {
            return Ok(Rc::clone(ir));
        }
        let def = Rc::clone(&self.funcs[func_id.index()]);
        let lowered = crate::lower::lower_function(&def, &mut self.interns).map_err(RunError::NotSupported)?;
        let ir = crate::r#gen::builder::build_ir(&lowered, &def, &mut self.interns).map_err(RunError::NotSupported)?;
        let ir = Rc::new(ir);
        self.ir_cache.insert(func_id, Rc::clone(&ir));
        Ok(ir)
    }
}

// === function instantiation ===

pub(crate) fn instantiate_function(interp: &mut Interp, func: FunctionId, scope: ScopeId) -> RunResult<Value> {
    instantiate_with_home(interp, func, scope, None)
}

impl Interp {
    /// Instantiates a method with its `[[HomeObject]]` set.
    pub fn instantiate_method(&mut self, func: FunctionId, scope: ScopeId, home: HeapId) -> RunResult<Value> {
        instantiate_with_home(self, func, scope, Some(home))
    }
}

fn instantiate_with_home(
    interp: &mut Interp,
    func: FunctionId,
    scope: ScopeId,
    home: Option<HeapId>,
) -> RunResult<Value> {
    let def = Rc::clone(&interp.funcs[func.index()]);
    let mut closure = ClosureData::new(func, scope);
    closure.home_object = home;
    let proto = interp.realm.function_proto;
    let mut obj = JsObject::with_payload(ClassTag::Function, Some(proto), ObjectPayload::Function(closure));

    let name_key = PropKey::Str(interp.interns.intern("name"));
    let length_key = PropKey::Str(interp.interns.intern("length"));
    if let Some(name) = def.name {
        obj.define(name_key, Property::method(Value::Str(name)));
    }
    let arity = def.params.iter().filter(|p| !p.rest && p.default.is_none()).count();
    obj.define(length_key, Property::method(Value::Number(arity as f64)));

    let fn_id = interp.heap.alloc_object(obj);

    // Ordinary functions and generators get a `prototype` object.
    if !def.is_arrow && !def.is_method {
        let proto_proto = if def.is_generator {
            interp.realm.generator_proto
        } else {
            interp.realm.object_proto
        };
        let mut proto_obj = JsObject::new(ClassTag::Object, Some(proto_proto));
        if !def.is_generator {
            let ctor_key = PropKey::Str(interp.interns.intern("constructor"));
            proto_obj.define(ctor_key, Property::method(Value::Ref(fn_id)));
        }
        let proto_id = interp.heap.alloc_object(proto_obj);
        let proto_key = PropKey::Str(interp.interns.intern("prototype"));
        interp
            .heap
            .object_mut(fn_id)
            .define(proto_key, Property::method(Value::Ref(proto_id)));
    }
    Ok(Value::Ref(fn_id))
}

// === classes ===

pub(crate) fn eval_class(interp: &mut Interp, class: &ClassDef, scope: ScopeId) -> RunResult<Value> {
    // Class bodies are strict, and the class name is visible inside.
    let class_scope = interp.scopes.push(scope, ScopeKind::Block);
    interp.scopes.set_strict(class_scope);
    if let Some(name) = class.name {
        interp.scopes.declare(class_scope, name, BindingKind::Const, None);
    }

    let parent = match &class.parent {
        Some(parent_expr) => {
            let parent = interp.eval_expr(parent_expr, class_scope)?;
            if parent != Value::Null && !interp.is_callable(parent) {
                return Err(interp.throw_type_error("class extends value is not a constructor"));
            }
            Some(parent)
        }
        None => None,
    };

    // The prototype object chains to the parent's prototype.
    let proto_parent = match parent {
        Some(Value::Null) | None => Some(interp.realm.object_proto),
        Some(parent_val) => {
            let proto_key = PropKey::Str(interp.interns.intern("prototype"));
            match interp.get_property(parent_val, proto_key)? {
                Value::Ref(p) => Some(p),
                _ => Some(interp.realm.object_proto),
            }
        }
    };
    let proto_obj = interp.heap.alloc_object(JsObject::new(ClassTag::Object, proto_parent));

    // Split members.
    let mut ctor_func = None;
    let mut fields: Vec<FieldInit> = Vec::new();
    for member in &class.members {
        match member {
            ClassMember::Method {
                kind: MethodKind::Constructor,
                func,
                ..
            } => ctor_func = Some(*func),
            ClassMember::Field {
                key,
                is_static: false,
                value,
            } => {
                let key = match key {
                    crate::ast::PropName::Computed(e) => {
                        let v = interp.eval_expr(e, class_scope)?;
                        FieldKey::Value(v)
                    }
                    other => FieldKey::Name(other.clone()),
                };
                fields.push(FieldInit {
                    key,
                    init: value.clone(),
                });
            }
            _ => {}
        }
    }

    let mut closure = ClosureData {
        func: ctor_func,
        env: class_scope,
        home_object: Some(proto_obj),
        class: None,
    };
    closure.class = Some(Box::new(ClassInfo {
        name: class.name,
        parent: match parent {
            Some(Value::Null) => None,
            other => other,
        },
        fields: Rc::new(fields),
        env: class_scope,
    }));

    let fn_proto = match parent {
        Some(parent_val) if parent_val != Value::Null => match parent_val {
            Value::Ref(p) => Some(p),
            _ => Some(interp.realm.function_proto),
        },
        _ => Some(interp.realm.function_proto),
    };
    let mut ctor_obj = JsObject::with_payload(ClassTag::Function, fn_proto, ObjectPayload::Function(closure));
    let proto_key = PropKey::Str(interp.interns.intern("prototype"));
    ctor_obj.define(proto_key, Property::constant(Value::Ref(proto_obj)));
    if let Some(name) = class.name {
        let name_key = PropKey::Str(interp.interns.intern("name"));
        ctor_obj.define(name_key, Property::method(Value::Str(name)));
    }
    let ctor_id = interp.heap.alloc_object(ctor_obj);
    let ctor_key = PropKey::Str(interp.interns.intern("constructor"));
    interp
        .heap
        .object_mut(proto_obj)
        .define(ctor_key, Property::method(Value::Ref(ctor_id)));

    // Install methods and static members.
    for member in &class.members {
        match member {
            ClassMember::Method {
                kind: MethodKind::Constructor,
                ..
            } => {}
            ClassMember::Method {
                kind,
                key,
                is_static,
                func,
            } => {
                let target = if *is_static { ctor_id } else { proto_obj };
                let key = interp.eval_prop_name(key, class_scope)?;
                let method = interp.instantiate_method(*func, class_scope, target)?;
                if let PropKey::Str(name) = key {
                    interp.set_function_name(method, name);
                }
                match kind {
                    MethodKind::Getter => interp.merge_accessor(target, key, Some(method), None),
                    MethodKind::Setter => interp.merge_accessor(target, key, None, Some(method)),
                    _ => interp.heap.object_mut(target).define(key, Property::method(method)),
                }
            }
            ClassMember::Field {
                key,
                is_static: true,
                value,
            } => {
                let key = interp.eval_prop_name(key, class_scope)?;
                let v = match value {
                    Some(value) => {
                        let field_scope = interp.scopes.push(class_scope, ScopeKind::Function);
                        interp.scopes.get_mut(field_scope).this_val = Some(Value::Ref(ctor_id));
                        interp.eval_expr(value, field_scope)?
                    }
                    None => Value::Undefined,
                };
                interp.heap.object_mut(ctor_id).define(key, Property::data(v));
            }
            ClassMember::Field { is_static: false, .. } => {}
        }
    }

    if let Some(name) = class.name {
        interp.scopes.initialize(class_scope, name, Value::Ref(ctor_id));
    }
    Ok(Value::Ref(ctor_id))
}

/// Runs the instance field initializers of the class whose constructor is
/// `ctor` against `this`.
pub(crate) fn run_field_inits(interp: &mut Interp, ctor: HeapId, this: Value) -> RunResult<()> {
    let (fields, env, home) = {
        let ObjectPayload::Function(c) = &interp.heap.object(ctor).payload else {
            return Ok(());
        };
        let Some(class) = &c.class else {
            return Ok(());
        };
        (Rc::clone(&class.fields), class.env, c.home_object)
    };
    for field in fields.iter() {
        let key = match &field.key {
            FieldKey::Value(v) => interp.to_property_key(*v)?,
            FieldKey::Name(name) => interp.eval_prop_name(name, env)?,
        };
        let value = match &field.init {
            Some(init) => {
                let field_scope = interp.scopes.push(env, ScopeKind::Function);
                interp.scopes.get_mut(field_scope).this_val = Some(this);
                interp.scopes.get_mut(field_scope).home_object = home;
                interp.eval_expr(init, field_scope)?
            }
            None => Value::Undefined,
        };
        if let Value::Ref(id) = this {
            interp.heap.object_mut(id).define(key, Property::data(value));
        }
    }
    Ok(())
}

/// `super(...)` inside a derived constructor.
pub(crate) fn eval_super_call(interp: &mut Interp, args: &[Value], _scope: ScopeId) -> RunResult<Value> {
    let Some(ctx) = interp.ctor_stack.last().copied() else {
        return Err(interp.throw_error(
            ErrorKind::SyntaxError,
            "'super' call is only valid inside a derived constructor",
        ));
    };
    let Some(parent) = class_parent(interp, ctx.ctor) else {
        return Err(interp.throw_error(ErrorKind::SyntaxError, "'super' call in a class with no parent"));
    };

    // Run the parent constructor against the existing `this`.
    construct_onto(interp, parent, ctx.this, args)?;
    // Then this class's own fields.
    run_field_inits(interp, ctx.ctor, ctx.this)?;
    Ok(Value::Undefined)
}

/// Runs a parent constructor with an already-created `this` (the `super()`
/// path, where the most-derived class allocated the instance).
fn construct_onto(interp: &mut Interp, parent: Value, this: Value, args: &[Value]) -> RunResult<Value> {
    let Value::Ref(parent_id) = parent else {
        return Err(interp.throw_type_error("parent class is not a constructor"));
    };
    let is_script_function = matches!(
        &interp.heap.object(parent_id).payload,
        ObjectPayload::Function(_)
    );
    if is_script_function {
        return invoke_function_object(interp, parent_id, this, args, Some(this));
    }
    // Native parent (e.g. `class X extends Error`): construct it and copy
    // the resulting own properties onto `this`.
    let constructed = interp.construct(parent, args)?;
    if let (Value::Ref(src), Value::Ref(dst)) = (constructed, this) {
        let props: Vec<(PropKey, Property)> = interp
            .heap
            .object(src)
            .props_iter()
            .map(|(k, p)| (*k, *p))
            .collect();
        for (key, prop) in props {
            interp.heap.object_mut(dst).define(key, prop);
        }
    }
    Ok(Value::Undefined)
}
