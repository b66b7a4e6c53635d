//! The tree-walking evaluator.
//!
//! Interprets every non-suspending construct. Control flow uses typed
//! completion records ([`Completion`]), never Rust unwinding: `return`,
//! `break`, and `continue` travel up through statement evaluation as values,
//! while `throw` rides the `Err` side of [`RunResult`] so `?` propagates it.
//!
//! Suspending constructs never reach this module: bodies that contain
//! `yield`/`await` are lowered and driven by the generator machine, which
//! calls back in here for every non-suspending piece.

pub(crate) mod call;
pub(crate) mod expr;
pub(crate) mod iter;
pub(crate) mod ops;
pub(crate) mod pattern;
pub(crate) mod property;

use std::rc::Rc;

use ahash::AHashMap;

use crate::{
    ast::{CodeRange, DeclKind, Expr, ForHead, ForInit, FunctionDef, Pattern, Program, Stmt, StmtLoc},
    error::{ErrorKind, RunError, RunResult, StackFrame},
    event_loop::EventLoop,
    r#gen::ir::IrCode,
    heap::{Heap, HeapId},
    host::HostFn,
    intern::{FunctionId, Interns, StringId},
    io::ConsoleWriter,
    modules::ModuleMap,
    scope::{BindingKind, ReadOutcome, ScopeId, ScopeKind, Scopes, WriteOutcome},
    types::{ClassTag, JsObject, PropKey, Property},
    value::{SymbolId, Value},
};

/// Per-engine symbol table: descriptions plus the `Symbol.for` registry.
#[derive(Debug)]
pub(crate) struct SymbolTable {
    pub descriptions: Vec<Option<String>>,
    pub registry: AHashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        // Slots 0/1 are the well-known iterator symbols.
        Self {
            descriptions: vec![Some("Symbol.iterator".to_owned()), Some("Symbol.asyncIterator".to_owned())],
            registry: AHashMap::new(),
        }
    }

    pub fn alloc(&mut self, description: Option<String>) -> SymbolId {
        let id = SymbolId(u32::try_from(self.descriptions.len()).expect("symbol table overflow"));
        self.descriptions.push(description);
        id
    }
}

/// Well-known prototype and global-object handles, created once per engine.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Realm {
    pub global_obj: HeapId,
    pub object_proto: HeapId,
    pub function_proto: HeapId,
    pub array_proto: HeapId,
    pub string_proto: HeapId,
    pub number_proto: HeapId,
    pub boolean_proto: HeapId,
    pub bigint_proto: HeapId,
    pub symbol_proto: HeapId,
    pub error_protos: [HeapId; 5],
    pub iterator_proto: HeapId,
    pub generator_proto: HeapId,
    pub async_generator_proto: HeapId,
    pub promise_proto: HeapId,
    pub map_proto: HeapId,
    pub set_proto: HeapId,
    pub weakmap_proto: HeapId,
    pub weakset_proto: HeapId,
    pub date_proto: HeapId,
    pub regexp_proto: HeapId,
    pub arraybuffer_proto: HeapId,
    pub typedarray_proto: HeapId,
    pub dataview_proto: HeapId,
}

impl Realm {
    pub fn error_proto(&self, kind: ErrorKind) -> HeapId {
        match kind {
            ErrorKind::Error => self.error_protos[0],
            ErrorKind::TypeError => self.error_protos[1],
            ErrorKind::RangeError => self.error_protos[2],
            ErrorKind::ReferenceError => self.error_protos[3],
            ErrorKind::SyntaxError => self.error_protos[4],
        }
    }
}

/// One frame of the script call stack, kept for error stack capture.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameInfo {
    pub name: Option<StringId>,
    pub range: CodeRange,
}

/// A constructor activation, giving `super(...)` its target.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CtorCtx {
    /// The constructor function object being run.
    pub ctor: HeapId,
    pub this: Value,
}

/// How a statement completed.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Completion {
    Normal(Value),
    Return(Value),
    Break(Option<StringId>),
    Continue(Option<StringId>),
}

impl Completion {
    /// The value of a normal completion, or `undefined`.
    pub fn value(self) -> Value {
        match self {
            Self::Normal(v) | Self::Return(v) => v,
            _ => Value::Undefined,
        }
    }
}

/// The interpreter: heap, scopes, realm, queues, and every cross-cutting
/// table, threaded as one `&mut` through evaluation.
pub(crate) struct Interp {
    pub heap: Heap,
    pub interns: Interns,
    pub scopes: Scopes,
    pub funcs: Vec<Rc<FunctionDef>>,
    pub symbols: SymbolTable,
    pub realm: Realm,
    pub event_loop: EventLoop,
    pub modules: ModuleMap,
    pub host_fns: Vec<HostFn>,
    pub module_resolver: Option<Box<dyn FnMut(&str) -> Option<String>>>,
    pub console: Box<dyn ConsoleWriter>,
    /// Snapshot of the active generator's resume slots for `Expr::ResumeSlot`.
    pub resume_slots: Vec<Value>,
    pub call_stack: Vec<FrameInfo>,
    pub ctor_stack: Vec<CtorCtx>,
    pub ir_cache: AHashMap<FunctionId, Rc<IrCode>>,
    pub script_path: String,
    pub unhandled_hook: Option<Box<dyn FnMut(crate::host::HostValue)>>,
}

impl Interp {
    // === error helpers ===

    /// Allocates an `Error` object of `kind` and returns it as a throwable.
    pub fn throw_error(&mut self, kind: ErrorKind, message: impl Into<String>) -> RunError {
        let value = self.make_error(kind, message.into());
        RunError::Throw(value)
    }

    pub fn throw_type_error(&mut self, message: impl Into<String>) -> RunError {
        self.throw_error(ErrorKind::TypeError, message)
    }

    pub fn throw_range_error(&mut self, message: impl Into<String>) -> RunError {
        self.throw_error(ErrorKind::RangeError, message)
    }

    pub fn throw_reference_error(&mut self, message: impl Into<String>) -> RunError {
        self.throw_error(ErrorKind::ReferenceError, message)
    }

    /// Builds an error object with `name`, `message`, and a `stack` string
    /// captured from the current script call stack.
    pub fn make_error(&mut self, kind: ErrorKind, message: String) -> Value {
        let proto = self.realm.error_proto(kind);
        let mut obj = JsObject::new(ClassTag::Error, Some(proto));
        let name_key = PropKey::Str(self.interns.intern("name"));
        let msg_key = PropKey::Str(self.interns.intern("message"));
        let stack_key = PropKey::Str(self.interns.intern("stack"));
        let kind_name: &'static str = kind.into();
        let name_val = Value::Str(self.interns.intern(kind_name));
        let stack = self.capture_stack_string(kind_name, &message);
        let msg_val = if message.is_empty() {
            Value::Str(StringId::EMPTY)
        } else {
            let id = self.heap.alloc_str(message);
            Value::Ref(id)
        };
        let stack_val = Value::Ref(self.heap.alloc_str(stack));
        obj.define(name_key, Property::method(name_val));
        obj.define(msg_key, Property::method(msg_val));
        obj.define(stack_key, Property::method(stack_val));
        Value::Ref(self.heap.alloc_object(obj))
    }

    /// The `stack` string: header line plus one `at` line per frame.
    fn capture_stack_string(&self, kind_name: &str, message: &str) -> String {
        let mut out = if message.is_empty() {
            kind_name.to_owned()
        } else {
            format!("{kind_name}: {message}")
        };
        for frame in self.call_stack.iter().rev() {
            let name = frame
                .name
                .map_or("<anonymous>", |id| self.interns.get(id));
            out.push_str(&format!(
                "\n    at {} ({}:{}:{})",
                name, self.script_path, frame.range.line, frame.range.col
            ));
        }
        out
    }

    /// The script stack as structured frames (for the host error type).
    pub fn capture_stack_frames(&self) -> Vec<StackFrame> {
        self.call_stack
            .iter()
            .rev()
            .map(|frame| StackFrame {
                function: frame
                    .name
                    .map_or_else(|| "<anonymous>".to_owned(), |id| self.interns.get(id).to_owned()),
                path: self.script_path.clone(),
                line: frame.range.line,
                col: frame.range.col,
            })
            .collect()
    }

    // === strings ===

    /// Allocates a string value, interning nothing.
    pub fn alloc_string(&mut self, s: String) -> Value {
        if s.is_empty() {
            return Value::Str(StringId::EMPTY);
        }
        if s.len() == 1 && s.as_bytes()[0] < 128 {
            return Value::Str(StringId::from_ascii(s.as_bytes()[0]));
        }
        Value::Ref(self.heap.alloc_str(s))
    }

    /// The content of a string value, cloned out of the heap.
    pub fn string_content(&self, value: Value) -> Option<String> {
        value.as_str(&self.heap, &self.interns).map(str::to_owned)
    }

    // === program evaluation ===

    /// Runs a top-level program in `scope`; returns the completion value of
    /// the last expression statement.
    pub fn eval_program(&mut self, program: &Program, scope: ScopeId) -> RunResult<Value> {
        if program.is_strict {
            self.scopes.set_strict(scope);
        }
        if program.is_module {
            crate::modules::link_top_level_imports(self, &program.body, scope)?;
        }
        self.hoist_declarations(&program.body, scope, true)?;
        let mut last = Value::Undefined;
        for stmt in &program.body {
            match self.eval_stmt(stmt, scope)? {
                Completion::Normal(v) => {
                    if matches!(stmt.stmt, Stmt::Expr(_)) {
                        last = v;
                    }
                }
                // Top-level return/break/continue: tolerated as termination.
                other => return Ok(other.value()),
            }
        }
        Ok(last)
    }

    // === declaration hoisting ===

    /// Installs bindings for declarations in a statement list.
    ///
    /// `var` and function declarations go to the nearest function scope
    /// (initialized; functions eagerly); `let`/`const`/`class` go to `scope`
    /// uninitialized (their TDZ ends at the declaration statement).
    pub fn hoist_declarations(&mut self, stmts: &[StmtLoc], scope: ScopeId, is_function_body: bool) -> RunResult<()> {
        let function_scope = self.scopes.function_scope(scope);
        for stmt in stmts {
            self.hoist_stmt(stmt, scope, function_scope)?;
        }
        let _ = is_function_body;
        Ok(())
    }

    fn hoist_stmt(&mut self, stmt: &StmtLoc, scope: ScopeId, function_scope: ScopeId) -> RunResult<()> {
        match &stmt.stmt {
            Stmt::VarDecl { kind, declarators } => {
                for decl in declarators {
                    let mut names = Vec::new();
                    decl.target.each_bound_name(&mut |name| names.push(name));
                    for name in names {
                        self.hoist_binding(*kind, name, scope, function_scope, stmt.range)?;
                    }
                }
            }
            Stmt::FunctionDecl { name, func } => {
                let closure = self.instantiate_function(*func, scope)?;
                let target = scope_for_function_decl(scope, function_scope);
                self.scopes.declare(target, *name, BindingKind::Function, Some(closure));
            }
            Stmt::ClassDecl(class) => {
                if let Some(name) = class.name {
                    self.scopes.declare(scope, name, BindingKind::Let, None);
                }
            }
            // Hoisting does not descend into blocks for `var` in this
            // implementation's statement walk; nested blocks hoist their own
            // lexicals on entry, and nested `var`s here:
            Stmt::Block(body) => {
                for inner in body {
                    self.hoist_var_only(inner, function_scope)?;
                }
            }
            Stmt::If {
                consequent, alternate, ..
            } => {
                self.hoist_var_only(consequent, function_scope)?;
                if let Some(alternate) = alternate {
                    self.hoist_var_only(alternate, function_scope)?;
                }
            }
            Stmt::For { init, body, .. } => {
                if let Some(ForInit::VarDecl {
                    kind: DeclKind::Var,
                    declarators,
                }) = init
                {
                    for decl in declarators {
                        let mut names = Vec::new();
                        decl.target.each_bound_name(&mut |name| names.push(name));
                        for name in names {
                            self.scopes.declare(function_scope, name, BindingKind::Var, None);
                        }
                    }
                }
                self.hoist_var_only(body, function_scope)?;
            }
            Stmt::ForIn { head, body, .. } | Stmt::ForOf { head, body, .. } => {
                if let ForHead::Decl {
                    kind: DeclKind::Var,
                    target,
                } = head
                {
                    let mut names = Vec::new();
                    target.each_bound_name(&mut |name| names.push(name));
                    for name in names {
                        self.scopes.declare(function_scope, name, BindingKind::Var, None);
                    }
                }
                self.hoist_var_only(body, function_scope)?;
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Labeled { body, .. } => {
                self.hoist_var_only(body, function_scope)?;
            }
            Stmt::Switch { cases, .. } => {
                for case in cases {
                    for inner in &case.body {
                        self.hoist_var_only(inner, function_scope)?;
                    }
                }
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                for inner in block {
                    self.hoist_var_only(inner, function_scope)?;
                }
                if let Some(handler) = handler {
                    for inner in &handler.body {
                        self.hoist_var_only(inner, function_scope)?;
                    }
                }
                if let Some(finalizer) = finalizer {
                    for inner in finalizer {
                        self.hoist_var_only(inner, function_scope)?;
                    }
                }
            }
            Stmt::ExportDecl(inner) => self.hoist_stmt(inner, scope, function_scope)?,
            _ => {}
        }
        Ok(())
    }

    fn hoist_binding(
        &mut self,
        kind: DeclKind,
        name: StringId,
        scope: ScopeId,
        function_scope: ScopeId,
        range: CodeRange,
    ) -> RunResult<()> {
        match kind {
            DeclKind::Var => {
                self.scopes.declare(function_scope, name, BindingKind::Var, None);
            }
            DeclKind::Let | DeclKind::Const => {
                let binding_kind = if kind == DeclKind::Let {
                    BindingKind::Let
                } else {
                    BindingKind::Const
                };
                if self.scopes.has_own(scope, name) {
                    // An uninitialized stub is the module loader's
                    // pre-declaration of an exported name; adopt it.
                    if let ReadOutcome::Found(_) = self.scopes.read_own(scope, name) {
                        let text = self.interns.get(name).to_owned();
                        let _ = range;
                        return Err(self.throw_error(
                            ErrorKind::SyntaxError,
                            format!("identifier '{text}' has already been declared"),
                        ));
                    }
                } else {
                    self.scopes.declare(scope, name, binding_kind, None);
                }
            }
        }
        Ok(())
    }

    /// Hoists only `var`/function declarations (used when descending into
    /// nested statements whose lexical scope is their own).
    fn hoist_var_only(&mut self, stmt: &StmtLoc, function_scope: ScopeId) -> RunResult<()> {
        match &stmt.stmt {
            Stmt::VarDecl {
                kind: DeclKind::Var,
                declarators,
            } => {
                for decl in declarators {
                    let mut names = Vec::new();
                    decl.target.each_bound_name(&mut |name| names.push(name));
                    for name in names {
                        self.scopes.declare(function_scope, name, BindingKind::Var, None);
                    }
                }
                Ok(())
            }
            _ => self.hoist_stmt_shallow(stmt, function_scope),
        }
    }

    fn hoist_stmt_shallow(&mut self, stmt: &StmtLoc, function_scope: ScopeId) -> RunResult<()> {
        match &stmt.stmt {
            Stmt::Block(_)
            | Stmt::If { .. }
            | Stmt::For { .. }
            | Stmt::ForIn { .. }
            | Stmt::ForOf { .. }
            | Stmt::While { .. }
            | Stmt::DoWhile { .. }
            | Stmt::Labeled { .. }
            | Stmt::Switch { .. }
            | Stmt::Try { .. } => self.hoist_stmt(stmt, function_scope, function_scope),
            _ => Ok(()),
        }
    }

    // === statement evaluation ===

    pub fn eval_stmt(&mut self, stmt: &StmtLoc, scope: ScopeId) -> RunResult<Completion> {
        match &stmt.stmt {
            Stmt::Expr(expr) => {
                let value = self.eval_expr(expr, scope)?;
                Ok(Completion::Normal(value))
            }
            Stmt::Empty => Ok(Completion::Normal(Value::Undefined)),
            Stmt::VarDecl { kind, declarators } => {
                for decl in declarators {
                    let value = match &decl.init {
                        Some(init) => Some(self.eval_named_init(init, &decl.target, scope)?),
                        None => None,
                    };
                    match kind {
                        DeclKind::Var => {
                            if let Some(value) = value {
                                self.bind_pattern(&decl.target, value, scope, BindTarget::VarAssign)?;
                            }
                        }
                        DeclKind::Let | DeclKind::Const => {
                            let value = value.unwrap_or(Value::Undefined);
                            self.bind_pattern(&decl.target, value, scope, BindTarget::Initialize)?;
                        }
                    }
                }
                Ok(Completion::Normal(Value::Undefined))
            }
            Stmt::FunctionDecl { .. } => Ok(Completion::Normal(Value::Undefined)),
            Stmt::ClassDecl(class) => {
                let value = self.eval_class(class, scope)?;
                if let Some(name) = class.name {
                    self.scopes.initialize(scope, name, value);
                }
                Ok(Completion::Normal(Value::Undefined))
            }
            Stmt::Return(arg) => {
                let value = match arg {
                    Some(arg) => self.eval_expr(arg, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Stmt::Throw(arg) => {
                let value = self.eval_expr(arg, scope)?;
                Err(RunError::Throw(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                let test = self.eval_expr(test, scope)?;
                if self.to_boolean(test) {
                    self.eval_stmt(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.eval_stmt(alternate, scope)
                } else {
                    Ok(Completion::Normal(Value::Undefined))
                }
            }
            Stmt::Block(body) => self.eval_block(body, scope),
            Stmt::While { .. }
            | Stmt::DoWhile { .. }
            | Stmt::For { .. }
            | Stmt::ForIn { .. }
            | Stmt::ForOf { .. } => self.eval_loop(stmt, scope, None),
            Stmt::Labeled { label, body } => {
                let completion = match &body.stmt {
                    Stmt::While { .. }
                    | Stmt::DoWhile { .. }
                    | Stmt::For { .. }
                    | Stmt::ForIn { .. }
                    | Stmt::ForOf { .. } => self.eval_loop(body, scope, Some(*label))?,
                    _ => self.eval_stmt(body, scope)?,
                };
                match completion {
                    Completion::Break(Some(l)) if l == *label => Ok(Completion::Normal(Value::Undefined)),
                    other => Ok(other),
                }
            }
            Stmt::Break(label) => Ok(Completion::Break(*label)),
            Stmt::Continue(label) => Ok(Completion::Continue(*label)),
            Stmt::Switch { discriminant, cases } => self.eval_switch(discriminant, cases, scope),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.eval_try(block, handler.as_ref(), finalizer.as_deref(), scope),
            Stmt::Suspend(_) => Err(RunError::NotSupported(
                "suspension reached the tree-walking evaluator".to_owned(),
            )),
            Stmt::Import { .. } => Ok(Completion::Normal(Value::Undefined)),
            Stmt::ExportNamed { .. } | Stmt::ExportAll { .. } => Ok(Completion::Normal(Value::Undefined)),
            Stmt::ExportDecl(inner) => self.eval_stmt(inner, scope),
            Stmt::ExportDefault(expr) => {
                let value = self.eval_expr(expr, scope)?;
                let name = self.interns.intern("*default*");
                self.scopes.declare(
                    self.scopes.function_scope(scope),
                    name,
                    BindingKind::Const,
                    Some(value),
                );
                Ok(Completion::Normal(Value::Undefined))
            }
        }
    }

    fn eval_block(&mut self, body: &[StmtLoc], scope: ScopeId) -> RunResult<Completion> {
        let block_scope = self.scopes.push(scope, ScopeKind::Block);
        self.hoist_declarations(body, block_scope, false)?;
        for stmt in body {
            match self.eval_stmt(stmt, block_scope)? {
                Completion::Normal(_) => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal(Value::Undefined))
    }

    fn eval_switch(
        &mut self,
        discriminant: &crate::ast::ExprLoc,
        cases: &[crate::ast::SwitchCase],
        scope: ScopeId,
    ) -> RunResult<Completion> {
        let value = self.eval_expr(discriminant, scope)?;
        let switch_scope = self.scopes.push(scope, ScopeKind::Block);
        for case in cases {
            self.hoist_declarations(&case.body, switch_scope, false)?;
        }
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let test = self.eval_expr(test, switch_scope)?;
                if self.strict_equals(value, test) {
                    start = Some(i);
                    break;
                }
            }
        }
        if start.is_none() {
            start = cases.iter().position(|case| case.test.is_none());
        }
        let Some(start) = start else {
            return Ok(Completion::Normal(Value::Undefined));
        };
        for case in &cases[start..] {
            for stmt in &case.body {
                match self.eval_stmt(stmt, switch_scope)? {
                    Completion::Normal(_) => {}
                    Completion::Break(None) => return Ok(Completion::Normal(Value::Undefined)),
                    other => return Ok(other),
                }
            }
        }
        Ok(Completion::Normal(Value::Undefined))
    }

    fn eval_try(
        &mut self,
        block: &[StmtLoc],
        handler: Option<&crate::ast::CatchClause>,
        finalizer: Option<&[StmtLoc]>,
        scope: ScopeId,
    ) -> RunResult<Completion> {
        let mut outcome = self.eval_block(block, scope);

        if let (Err(err), Some(handler)) = (&outcome, handler) {
            if let Some(thrown) = err.thrown() {
                let catch_scope = self.scopes.push(scope, ScopeKind::Block);
                if let Some(param) = &handler.param {
                    self.bind_pattern(param, thrown, catch_scope, BindTarget::Declare(BindingKind::Let))?;
                }
                self.hoist_declarations(&handler.body, catch_scope, false)?;
                outcome = (|| {
                    for stmt in &handler.body {
                        match self.eval_stmt(stmt, catch_scope)? {
                            Completion::Normal(_) => {}
                            other => return Ok(other),
                        }
                    }
                    Ok(Completion::Normal(Value::Undefined))
                })();
            }
        }

        if let Some(finalizer) = finalizer {
            let finally_outcome = self.eval_block(finalizer, scope);
            match finally_outcome {
                // A finally that completes abruptly supersedes the pending
                // completion (including a pending throw).
                Ok(Completion::Normal(_)) => {}
                other => return other,
            }
        }
        outcome
    }

    // === small shared helpers (defined on Interp for ergonomic access) ===

    /// Creates a plain object with `Object.prototype`.
    pub fn new_object(&mut self) -> HeapId {
        let proto = self.realm.object_proto;
        self.heap.alloc_object(JsObject::new(ClassTag::Object, Some(proto)))
    }

    /// Creates an array object from elements.
    pub fn new_array(&mut self, elements: Vec<Value>) -> Value {
        let proto = self.realm.array_proto;
        let obj = JsObject::with_payload(ClassTag::Array, Some(proto), crate::types::ObjectPayload::Array(elements));
        Value::Ref(self.heap.alloc_object(obj))
    }

    /// Instantiates a function expression/declaration into a closure object.
    pub fn instantiate_function(&mut self, func: FunctionId, scope: ScopeId) -> RunResult<Value> {
        call::instantiate_function(self, func, scope)
    }

    fn eval_class(&mut self, class: &crate::ast::ClassDef, scope: ScopeId) -> RunResult<Value> {
        call::eval_class(self, class, scope)
    }

    fn eval_named_init(
        &mut self,
        init: &crate::ast::ExprLoc,
        target: &Pattern,
        scope: ScopeId,
    ) -> RunResult<Value> {
        // `const f = function() {}` names the function after the binding.
        let value = self.eval_expr(init, scope)?;
        if let (Pattern::Ident(name), Expr::Function(func)) = (target, &init.expr) {
            let def = &self.funcs[func.index()];
            if def.name.is_none() {
                self.set_function_name(value, *name);
            }
        }
        Ok(value)
    }

    /// Best-effort `name` property for anonymous functions bound to names.
    pub fn set_function_name(&mut self, value: Value, name: StringId) {
        if let Value::Ref(id) = value {
            let key = PropKey::Str(self.interns.intern("name"));
            if let crate::heap::HeapData::Object(obj) = self.heap.get_mut(id) {
                if obj.is_callable() && !obj.has_own(key) {
                    obj.define(key, Property::method(Value::Str(name)));
                }
            }
        }
    }

    // === identifier access ===

    pub fn read_ident(&mut self, name: StringId, scope: ScopeId) -> RunResult<Value> {
        match self.scopes.read(scope, name) {
            ReadOutcome::Found(v) => Ok(v),
            ReadOutcome::Tdz => {
                let text = self.interns.get(name).to_owned();
                Err(self.throw_reference_error(format!("cannot access '{text}' before initialization")))
            }
            ReadOutcome::NotFound => {
                // Fall back to global object properties.
                let key = PropKey::Str(name);
                let global = self.realm.global_obj;
                if self.heap.object(global).has_own(key) {
                    return self.get_property(Value::Ref(global), key);
                }
                let text = self.interns.get(name).to_owned();
                Err(self.throw_reference_error(format!("{text} is not defined")))
            }
        }
    }

    pub fn write_ident(&mut self, name: StringId, value: Value, scope: ScopeId) -> RunResult<()> {
        match self.scopes.write(scope, name, value) {
            WriteOutcome::Done => Ok(()),
            WriteOutcome::Tdz => {
                let text = self.interns.get(name).to_owned();
                Err(self.throw_reference_error(format!("cannot access '{text}' before initialization")))
            }
            WriteOutcome::ConstViolation => {
                let text = self.interns.get(name).to_owned();
                Err(self.throw_type_error(format!("assignment to constant variable '{text}'")))
            }
            WriteOutcome::NotFound => {
                let key = PropKey::Str(name);
                let global = self.realm.global_obj;
                if self.scopes.is_strict(scope) && !self.heap.object(global).has_own(key) {
                    let text = self.interns.get(name).to_owned();
                    return Err(self.throw_reference_error(format!("{text} is not defined")));
                }
                self.set_property(Value::Ref(global), key, value)
            }
        }
    }
}

/// Where `var` function declarations land given a block context. Function
/// declarations at block level bind in the block itself (simplified sloppy
/// semantics).
fn scope_for_function_decl(scope: ScopeId, _function_scope: ScopeId) -> ScopeId {
    scope
}

/// How [`Interp::bind_pattern`] installs names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindTarget {
    /// Declare fresh bindings of this kind in the target scope.
    Declare(BindingKind),
    /// Initialize already-hoisted lexical bindings.
    Initialize,
    /// Assign through the scope chain (`var` declarators, for-head reuse).
    VarAssign,
    /// Plain assignment (destructuring assignment expressions).
    Assign,
}
