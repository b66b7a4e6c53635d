//! Environments: the scope chain.
//!
//! Scopes are records in an arena, linked to their parent by id, the same
//! handle discipline the heap uses. Each scope maps identifiers to binding
//! records carrying a kind, an initialized flag (the temporal dead zone for
//! `let`/`const`), and either a direct value or an alias into another
//! module's scope (live import bindings).
//!
//! Function scopes host hoisted `var` and function declarations and the
//! `this` binding; block scopes host `let`/`const`. Strict mode is inherited
//! down the chain.

use ahash::AHashMap;

use crate::{heap::HeapId, intern::StringId, value::Value};

/// Handle to a scope record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScopeId(u32);

impl ScopeId {
    /// The global scope is always the first record.
    pub const GLOBAL: Self = Self(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Global,
    /// A module's top-level scope.
    Module,
    Function,
    Block,
}

/// Binding kind; drives redeclaration and assignment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingKind {
    Var,
    Let,
    Const,
    Param,
    Function,
}

/// Storage of a binding: a direct value, or an alias to a binding in another
/// scope (import bindings stay live through the alias).
#[derive(Debug, Clone, Copy)]
pub(crate) enum BindingSlot {
    Value(Value),
    Alias { scope: ScopeId, name: StringId },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Binding {
    pub kind: BindingKind,
    pub initialized: bool,
    pub slot: BindingSlot,
}

/// One scope record.
#[derive(Debug)]
pub(crate) struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub strict: bool,
    bindings: AHashMap<StringId, Binding>,
    /// `this` for function scopes that bind it (arrows do not).
    pub this_val: Option<Value>,
    /// `[[HomeObject]]` for methods; enables `super` lookups.
    pub home_object: Option<HeapId>,
}

/// Outcome of a scope-chain read.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ReadOutcome {
    Found(Value),
    /// The binding exists but is in its temporal dead zone.
    Tdz,
    NotFound,
}

/// Outcome of a scope-chain write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    Done,
    Tdz,
    ConstViolation,
    NotFound,
}

/// Outcome of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclareOutcome {
    Done,
    AlreadyDeclared,
}

/// The scope arena.
#[derive(Debug)]
pub(crate) struct Scopes {
    records: Vec<Scope>,
}

impl Scopes {
    /// Creates the arena with the global scope at id 0.
    pub fn new() -> Self {
        Self {
            records: vec![Scope {
                parent: None,
                kind: ScopeKind::Global,
                strict: false,
                bindings: AHashMap::new(),
                this_val: None,
                home_object: None,
            }],
        }
    }

    pub fn push(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let strict = self.get(parent).strict;
        let id = ScopeId(u32::try_from(self.records.len()).expect("scope arena overflow"));
        self.records.push(Scope {
            parent: Some(parent),
            kind,
            strict,
            bindings: AHashMap::new(),
            this_val: None,
            home_object: None,
        });
        id
    }

    #[inline]
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.records[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.records[id.index()]
    }

    /// Marks a scope strict (from a `"use strict"` directive).
    pub fn set_strict(&mut self, id: ScopeId) {
        self.get_mut(id).strict = true;
    }

    /// Whether code in `id` runs in strict mode.
    pub fn is_strict(&self, id: ScopeId) -> bool {
        self.get(id).strict
    }

    /// Declares a binding in `scope`. Lexical bindings start uninitialized
    /// (TDZ); `var`, params, and functions start initialized.
    pub fn declare(&mut self, scope: ScopeId, name: StringId, kind: BindingKind, value: Option<Value>) -> DeclareOutcome {
        let record = self.get_mut(scope);
        if let Some(existing) = record.bindings.get(&name) {
            // An uninitialized lexical binding is a hoisting/pre-declaration
            // stub; the real declaration takes it over.
            let redeclarable = !existing.initialized
                || (matches!(existing.kind, BindingKind::Var | BindingKind::Function | BindingKind::Param)
                    && matches!(kind, BindingKind::Var | BindingKind::Function | BindingKind::Param));
            if !redeclarable {
                return DeclareOutcome::AlreadyDeclared;
            }
        }
        let initialized = match kind {
            BindingKind::Let | BindingKind::Const => value.is_some(),
            _ => true,
        };
        record.bindings.insert(
            name,
            Binding {
                kind,
                initialized,
                slot: BindingSlot::Value(value.unwrap_or(Value::Undefined)),
            },
        );
        DeclareOutcome::Done
    }

    /// Declares an alias binding (an import). Reads and writes resolve
    /// through the target scope, so the importer observes reassignments.
    pub fn declare_alias(&mut self, scope: ScopeId, name: StringId, target_scope: ScopeId, target_name: StringId) {
        self.get_mut(scope).bindings.insert(
            name,
            Binding {
                kind: BindingKind::Const,
                initialized: true,
                slot: BindingSlot::Alias {
                    scope: target_scope,
                    name: target_name,
                },
            },
        );
    }

    /// Initializes a declared lexical binding, ending its TDZ.
    pub fn initialize(&mut self, scope: ScopeId, name: StringId, value: Value) {
        if let Some(binding) = self.get_mut(scope).bindings.get_mut(&name) {
            binding.initialized = true;
            binding.slot = BindingSlot::Value(value);
        }
    }

    /// True if `scope` itself (not the chain) declares `name`.
    pub fn has_own(&self, scope: ScopeId, name: StringId) -> bool {
        self.get(scope).bindings.contains_key(&name)
    }

    /// Reads `name` in the binding of exactly `scope` (no chain walk).
    pub fn read_own(&self, scope: ScopeId, name: StringId) -> ReadOutcome {
        match self.get(scope).bindings.get(&name) {
            None => ReadOutcome::NotFound,
            Some(binding) => self.read_binding(*binding),
        }
    }

    fn read_binding(&self, binding: Binding) -> ReadOutcome {
        if !binding.initialized {
            return ReadOutcome::Tdz;
        }
        match binding.slot {
            BindingSlot::Value(v) => ReadOutcome::Found(v),
            BindingSlot::Alias { scope, name } => match self.get(scope).bindings.get(&name) {
                Some(target) => self.read_binding(*target),
                None => ReadOutcome::NotFound,
            },
        }
    }

    /// Reads `name`, walking the chain outward; stops at the first scope that
    /// declares the name.
    pub fn read(&self, scope: ScopeId, name: StringId) -> ReadOutcome {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if let Some(binding) = self.get(id).bindings.get(&name) {
                return self.read_binding(*binding);
            }
            cursor = self.get(id).parent;
        }
        ReadOutcome::NotFound
    }

    /// Writes `name`, walking the chain outward.
    pub fn write(&mut self, scope: ScopeId, name: StringId, value: Value) -> WriteOutcome {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if let Some(binding) = self.get(id).bindings.get(&name) {
                let binding = *binding;
                if !binding.initialized {
                    return WriteOutcome::Tdz;
                }
                if binding.kind == BindingKind::Const {
                    return WriteOutcome::ConstViolation;
                }
                match binding.slot {
                    BindingSlot::Value(_) => {
                        self.get_mut(id).bindings.get_mut(&name).expect("binding present").slot =
                            BindingSlot::Value(value);
                        return WriteOutcome::Done;
                    }
                    BindingSlot::Alias { scope, name } => {
                        // Imported bindings are read-only views.
                        let _ = (scope, name);
                        return WriteOutcome::ConstViolation;
                    }
                }
            }
            cursor = self.get(id).parent;
        }
        WriteOutcome::NotFound
    }

    /// The nearest function-or-global scope that binds `this`.
    pub fn this_value(&self, scope: ScopeId) -> Option<Value> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let record = self.get(id);
            if let Some(this_val) = record.this_val {
                return Some(this_val);
            }
            cursor = record.parent;
        }
        None
    }

    /// The nearest `[[HomeObject]]` for `super` resolution.
    pub fn home_object(&self, scope: ScopeId) -> Option<HeapId> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let record = self.get(id);
            if let Some(home) = record.home_object {
                return Some(home);
            }
            cursor = record.parent;
        }
        None
    }

    /// The nearest enclosing function scope (for `var` hoisting).
    pub fn function_scope(&self, scope: ScopeId) -> ScopeId {
        let mut cursor = scope;
        loop {
            let record = self.get(cursor);
            match record.kind {
                ScopeKind::Function | ScopeKind::Global | ScopeKind::Module => return cursor,
                ScopeKind::Block => cursor = record.parent.expect("block scope has a parent"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interns;

    #[test]
    fn chain_lookup_and_shadowing() {
        let mut interns = Interns::new();
        let x = interns.intern("x");
        let mut scopes = Scopes::new();
        scopes.declare(ScopeId::GLOBAL, x, BindingKind::Var, Some(Value::Number(1.0)));
        let inner = scopes.push(ScopeId::GLOBAL, ScopeKind::Block);
        assert!(matches!(scopes.read(inner, x), ReadOutcome::Found(Value::Number(n)) if n == 1.0));
        scopes.declare(inner, x, BindingKind::Let, Some(Value::Number(2.0)));
        assert!(matches!(scopes.read(inner, x), ReadOutcome::Found(Value::Number(n)) if n == 2.0));
        assert!(matches!(scopes.read(ScopeId::GLOBAL, x), ReadOutcome::Found(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn tdz_and_const() {
        let mut interns = Interns::new();
        let x = interns.intern("x");
        let mut scopes = Scopes::new();
        let block = scopes.push(ScopeId::GLOBAL, ScopeKind::Block);
        scopes.declare(block, x, BindingKind::Const, None);
        assert!(matches!(scopes.read(block, x), ReadOutcome::Tdz));
        scopes.initialize(block, x, Value::Bool(true));
        assert!(matches!(scopes.read(block, x), ReadOutcome::Found(Value::Bool(true))));
        assert_eq!(scopes.write(block, x, Value::Null), WriteOutcome::ConstViolation);
    }

    #[test]
    fn alias_reads_are_live() {
        let mut interns = Interns::new();
        let n = interns.intern("n");
        let m = interns.intern("m");
        let mut scopes = Scopes::new();
        let module = scopes.push(ScopeId::GLOBAL, ScopeKind::Module);
        let importer = scopes.push(ScopeId::GLOBAL, ScopeKind::Module);
        scopes.declare(module, n, BindingKind::Let, Some(Value::Number(0.0)));
        scopes.declare_alias(importer, m, module, n);
        assert!(matches!(scopes.read(importer, m), ReadOutcome::Found(Value::Number(v)) if v == 0.0));
        scopes.write(module, n, Value::Number(2.0));
        assert!(matches!(scopes.read(importer, m), ReadOutcome::Found(Value::Number(v)) if v == 2.0));
        assert_eq!(scopes.write(importer, m, Value::Null), WriteOutcome::ConstViolation);
    }
}
