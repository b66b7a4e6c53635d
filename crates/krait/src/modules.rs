//! Module loading, linking, and namespaces.
//!
//! The host supplies a synchronous `path -> source` resolver; records are
//! cached by exact path. Linking is depth-first: a module's record enters the
//! cache before its dependencies load, so circular imports resolve to the
//! partially-linked record and read through live bindings. Exported names are
//! pre-declared (uninitialized) in the module scope before evaluation, which
//! is what gives cross-module reads their temporal dead zone.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    ast::{Stmt, StmtLoc},
    error::{ErrorKind, RunError, RunResult},
    eval::{Completion, Interp},
    heap::HeapId,
    intern::StringId,
    scope::{BindingKind, ReadOutcome, ScopeId, ScopeKind},
    types::{ClassTag, JsObject, ObjectPayload, PropKey},
    value::Value,
};

/// Handle to a module record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ModuleId(u32);

impl ModuleId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleState {
    /// Cached, dependencies resolving, body not yet evaluated.
    Linking,
    Evaluated,
}

/// Where an exported name resolves.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ExportEntry {
    /// A binding in this module's own scope.
    Local(StringId),
    /// Re-exported from another module.
    Reexport { module: ModuleId, name: StringId },
}

#[derive(Debug)]
pub(crate) struct ModuleRecord {
    pub path: String,
    pub scope: ScopeId,
    pub exports: IndexMap<StringId, ExportEntry>,
    pub namespace: Option<HeapId>,
    state: ModuleState,
    /// Body kept between linking and evaluation.
    body: Vec<StmtLoc>,
}

/// Path-keyed module cache.
#[derive(Debug, Default)]
pub(crate) struct ModuleMap {
    records: Vec<ModuleRecord>,
    by_path: AHashMap<String, ModuleId>,
}

impl ModuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ModuleId) -> &ModuleRecord {
        &self.records[id.index()]
    }

    fn get_mut(&mut self, id: ModuleId) -> &mut ModuleRecord {
        &mut self.records[id.index()]
    }
}

/// Loads, links, and evaluates the module at `path` (cached).
pub(crate) fn load_module(interp: &mut Interp, path: &str) -> RunResult<ModuleId> {
    if let Some(&id) = interp.modules.by_path.get(path) {
        return Ok(id);
    }

    let Some(mut resolver) = interp.module_resolver.take() else {
        return Err(interp.throw_reference_error(format!("no module loader registered (importing '{path}')")));
    };
    let source = resolver(path);
    interp.module_resolver = Some(resolver);
    let Some(source) = source else {
        return Err(RunError::ModuleNotFound(path.to_owned()));
    };

    let func_start = interp.funcs.len();
    let mut program =
        crate::parse::parse_program(&source, &mut interp.interns, &mut interp.funcs).map_err(RunError::Parse)?;
    crate::fold::fold_program(&mut program, &mut interp.funcs[func_start..], &mut interp.interns);

    // Modules are always strict.
    let scope = interp.scopes.push(ScopeId::GLOBAL, ScopeKind::Module);
    interp.scopes.set_strict(scope);

    let id = ModuleId(u32::try_from(interp.modules.records.len()).expect("module table overflow"));
    interp.modules.records.push(ModuleRecord {
        path: path.to_owned(),
        scope,
        exports: IndexMap::new(),
        namespace: None,
        state: ModuleState::Linking,
        body: program.body,
    });
    interp.modules.by_path.insert(path.to_owned(), id);

    link_and_evaluate(interp, id)?;
    Ok(id)
}

fn link_and_evaluate(interp: &mut Interp, id: ModuleId) -> RunResult<()> {
    let body = std::mem::take(&mut interp.modules.get_mut(id).body);
    let scope = interp.modules.get(id).scope;

    // Collect exports first so cyclic importers can resolve names.
    collect_exports(interp, id, &body)?;
    predeclare_local_exports(interp, id);

    // Depth-first dependency linking.
    for stmt in &body {
        if let Stmt::Import { specifiers, source } = &stmt.stmt {
            let dep_path = interp.interns.get(*source).to_owned();
            let dep = load_module(interp, &dep_path)?;
            declare_import_bindings(interp, scope, dep, specifiers)?;
        }
        if let Stmt::ExportNamed {
            source: Some(source), ..
        }
        | Stmt::ExportAll { source } = &stmt.stmt
        {
            let dep_path = interp.interns.get(*source).to_owned();
            load_module(interp, &dep_path)?;
        }
    }

    // Evaluate top-to-bottom, once.
    interp.hoist_declarations(&body, scope, true)?;
    for stmt in &body {
        match interp.eval_stmt(stmt, scope)? {
            Completion::Normal(_) => {}
            _ => break,
        }
    }
    interp.modules.get_mut(id).state = ModuleState::Evaluated;
    Ok(())
}

/// Registers export entries from the module body (no evaluation).
fn collect_exports(interp: &mut Interp, id: ModuleId, body: &[StmtLoc]) -> RunResult<()> {
    for stmt in body {
        match &stmt.stmt {
            Stmt::ExportDecl(inner) => {
                let mut names = Vec::new();
                exported_decl_names(&inner.stmt, &mut names);
                for name in names {
                    interp.modules.get_mut(id).exports.insert(name, ExportEntry::Local(name));
                }
            }
            Stmt::ExportNamed { specifiers, source } => match source {
                None => {
                    for spec in specifiers {
                        interp
                            .modules
                            .get_mut(id)
                            .exports
                            .insert(spec.exported, ExportEntry::Local(spec.local));
                    }
                }
                Some(source) => {
                    let dep_path = interp.interns.get(*source).to_owned();
                    let dep = load_module(interp, &dep_path)?;
                    for spec in specifiers {
                        interp.modules.get_mut(id).exports.insert(
                            spec.exported,
                            ExportEntry::Reexport {
                                module: dep,
                                name: spec.local,
                            },
                        );
                    }
                }
            },
            Stmt::ExportDefault(_) => {
                let default_name = interp.interns.intern("default");
                let local = interp.interns.intern("*default*");
                interp
                    .modules
                    .get_mut(id)
                    .exports
                    .insert(default_name, ExportEntry::Local(local));
            }
            Stmt::ExportAll { source } => {
                let dep_path = interp.interns.get(*source).to_owned();
                let dep = load_module(interp, &dep_path)?;
                let default_name = interp.interns.intern("default");
                let dep_exports: Vec<StringId> = interp.modules.get(dep).exports.keys().copied().collect();
                for name in dep_exports {
                    if name == default_name {
                        continue;
                    }
                    interp
                        .modules
                        .get_mut(id)
                        .exports
                        .insert(name, ExportEntry::Reexport { module: dep, name });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn exported_decl_names(stmt: &Stmt, out: &mut Vec<StringId>) {
    match stmt {
        Stmt::VarDecl { declarators, .. } => {
            for decl in declarators {
                decl.target.each_bound_name(&mut |name| out.push(name));
            }
        }
        Stmt::FunctionDecl { name, .. } => out.push(*name),
        Stmt::ClassDecl(class) => {
            if let Some(name) = class.name {
                out.push(name);
            }
        }
        _ => {}
    }
}

/// Pre-declares locally-exported names as uninitialized `let` bindings so
/// cyclic importers observe a TDZ rather than a missing binding.
fn predeclare_local_exports(interp: &mut Interp, id: ModuleId) {
    let scope = interp.modules.get(id).scope;
    let locals: Vec<StringId> = interp
        .modules
        .get(id)
        .exports
        .values()
        .filter_map(|entry| match entry {
            ExportEntry::Local(name) => Some(*name),
            ExportEntry::Reexport { .. } => None,
        })
        .collect();
    for name in locals {
        if !interp.scopes.has_own(scope, name) {
            interp.scopes.declare(scope, name, BindingKind::Let, None);
        }
    }
}

/// Resolves an exported name to its defining scope and binding, following
/// re-export chains.
fn resolve_export(interp: &Interp, module: ModuleId, name: StringId, depth: usize) -> Option<(ScopeId, StringId)> {
    if depth > 64 {
        return None;
    }
    let record = interp.modules.get(module);
    match record.exports.get(&name)? {
        ExportEntry::Local(local) => Some((record.scope, *local)),
        ExportEntry::Reexport { module, name } => resolve_export(interp, *module, *name, depth + 1),
    }
}

fn declare_import_bindings(
    interp: &mut Interp,
    scope: ScopeId,
    dep: ModuleId,
    specifiers: &[crate::ast::ImportSpecifier],
) -> RunResult<()> {
    for spec in specifiers {
        match spec {
            crate::ast::ImportSpecifier::Default(local) => {
                let default_name = interp.interns.intern("default");
                bind_import(interp, scope, *local, dep, default_name)?;
            }
            crate::ast::ImportSpecifier::Named { imported, local } => {
                bind_import(interp, scope, *local, dep, *imported)?;
            }
            crate::ast::ImportSpecifier::Namespace(local) => {
                let ns = get_or_create_namespace(interp, dep);
                interp.scopes.declare(scope, *local, BindingKind::Const, Some(Value::Ref(ns)));
            }
        }
    }
    Ok(())
}

fn bind_import(
    interp: &mut Interp,
    scope: ScopeId,
    local: StringId,
    dep: ModuleId,
    imported: StringId,
) -> RunResult<()> {
    let Some((target_scope, target_name)) = resolve_export(interp, dep, imported, 0) else {
        let name = interp.interns.get(imported).to_owned();
        let path = interp.modules.get(dep).path.clone();
        return Err(interp.throw_error(
            ErrorKind::SyntaxError,
            format!("module '{path}' does not export '{name}'"),
        ));
    };
    interp.scopes.declare_alias(scope, local, target_scope, target_name);
    Ok(())
}

/// The (lazily created) namespace object for a module.
pub(crate) fn get_or_create_namespace(interp: &mut Interp, id: ModuleId) -> HeapId {
    if let Some(ns) = interp.modules.get(id).namespace {
        return ns;
    }
    let obj = JsObject::with_payload(ClassTag::Namespace, None, ObjectPayload::Namespace(id));
    let ns = interp.heap.alloc_object(obj);
    interp.modules.get_mut(id).namespace = Some(ns);
    ns
}

/// Property read on a namespace object: resolves through the exports table
/// and the live binding behind it.
pub(crate) fn namespace_get(interp: &mut Interp, id: ModuleId, key: PropKey) -> RunResult<Value> {
    let PropKey::Str(name) = key else {
        return Ok(Value::Undefined);
    };
    let Some((scope, binding)) = resolve_export(interp, id, name, 0) else {
        return Ok(Value::Undefined);
    };
    match interp.scopes.read_own(scope, binding) {
        ReadOutcome::Found(v) => Ok(v),
        ReadOutcome::Tdz | ReadOutcome::NotFound => {
            let text = interp.interns.get(name).to_owned();
            Err(interp.throw_reference_error(format!("cannot access '{text}' before initialization")))
        }
    }
}

/// `import(path)`: a promise of the namespace object, rejecting on load or
/// evaluation errors.
pub(crate) fn dynamic_import(interp: &mut Interp, path: &str) -> RunResult<Value> {
    let promise = crate::builtins::promise::new_promise(interp);
    match load_module(interp, path) {
        Ok(id) => {
            let ns = get_or_create_namespace(interp, id);
            crate::builtins::promise::resolve_promise(interp, promise, Value::Ref(ns))?;
        }
        Err(RunError::Throw(reason)) => {
            crate::builtins::promise::reject_promise(interp, promise, reason);
        }
        Err(RunError::ModuleNotFound(path)) => {
            let reason = interp.make_error(ErrorKind::Error, format!("module not found: {path}"));
            crate::builtins::promise::reject_promise(interp, promise, reason);
        }
        Err(RunError::Parse(e)) => {
            let reason = interp.make_error(ErrorKind::SyntaxError, e.message.clone());
            crate::builtins::promise::reject_promise(interp, promise, reason);
        }
        Err(other) => return Err(other),
    }
    Ok(Value::Ref(promise))
}

/// Links `import` statements of a top-level module program before its body
/// evaluates (imports hoist).
pub(crate) fn link_top_level_imports(interp: &mut Interp, body: &[StmtLoc], scope: ScopeId) -> RunResult<()> {
    for stmt in body {
        if let Stmt::Import { specifiers, source } = &stmt.stmt {
            let dep_path = interp.interns.get(*source).to_owned();
            let dep = load_module(interp, &dep_path)?;
            declare_import_bindings(interp, scope, dep, specifiers)?;
        }
    }
    Ok(())
}
