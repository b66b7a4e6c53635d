//! Function payloads: closures, bound functions, class metadata.

use std::rc::Rc;

use crate::{
    ast::{ExprLoc, PropName},
    heap::HeapId,
    intern::{FunctionId, StringId},
    scope::ScopeId,
    value::Value,
};

/// A script function: a function-table entry plus its captured environment.
///
/// Arrows do not bind `this`; their function scope leaves `this` unset so the
/// lookup walks into the defining chain.
#[derive(Debug)]
pub(crate) struct ClosureData {
    /// The parsed definition; `None` for a synthesized default constructor.
    pub func: Option<FunctionId>,
    /// The scope the function closed over.
    pub env: ScopeId,
    /// `[[HomeObject]]` for methods; enables `super`.
    pub home_object: Option<HeapId>,
    /// Present when this function is a class constructor.
    pub class: Option<Box<ClassInfo>>,
}

impl ClosureData {
    pub fn new(func: FunctionId, env: ScopeId) -> Self {
        Self {
            func: Some(func),
            env,
            home_object: None,
            class: None,
        }
    }
}

/// Class metadata carried by a constructor function.
#[derive(Debug)]
pub(crate) struct ClassInfo {
    pub name: Option<StringId>,
    /// The parent constructor value (`extends` clause), if any.
    pub parent: Option<Value>,
    /// Instance field initializers, run at construction after `super()`.
    pub fields: Rc<Vec<FieldInit>>,
    /// Scope in which field initializers evaluate (the class body's scope).
    pub env: ScopeId,
}

/// One instance field.
#[derive(Debug, Clone)]
pub(crate) struct FieldInit {
    /// Computed keys are evaluated once at class definition time, so this is
    /// already a concrete key expression result carried as a `PropName` for
    /// string/private keys or a pre-computed value.
    pub key: FieldKey,
    pub init: Option<ExprLoc>,
}

/// A field key resolved at class definition time.
#[derive(Debug, Clone)]
pub(crate) enum FieldKey {
    Name(PropName),
    /// Result of a computed key expression.
    Value(Value),
}

/// `Function.prototype.bind` result.
#[derive(Debug)]
pub(crate) struct BoundData {
    pub target: Value,
    pub this_value: Value,
    pub bound_args: Vec<Value>,
}

/// A native function that captures engine state (promise capabilities and
/// combinator elements). Builtins without captures use the flat
/// [`Builtin`](crate::builtins::Builtin) enum instead.
#[derive(Debug, Clone, Copy)]
pub(crate) enum NativeClosure {
    /// The `resolve`/`reject` function handed to a promise executor.
    PromiseSettle { promise: HeapId, reject: bool },
    /// One element handler of `Promise.all`.
    PromiseAllElement { state: HeapId, index: u32 },
}
