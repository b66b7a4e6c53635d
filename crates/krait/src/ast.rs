//! Typed AST produced by the parser.
//!
//! Expressions and statements are two disjoint sum types, immutable after
//! parsing. Every node carries a [`CodeRange`]; lowered nodes keep the range
//! of the source they were rewritten from, so error positions survive the
//! yield/await transformation.
//!
//! Function bodies are not nested inside expression nodes. The parser moves
//! each function into the engine-wide function table and leaves a
//! [`crate::intern::FunctionId`] behind, which keeps the AST `Clone` cheap and
//! gives generator lowering a stable place to cache rewritten bodies.

use num_bigint::BigInt;

use crate::intern::{FunctionId, StringId};

/// Byte range plus 1-based line/column of a node's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodeRange {
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub col: u32,
}

impl CodeRange {
    pub(crate) fn new(start: u32, end: u32, line: u32, col: u32) -> Self {
        Self { start, end, line, col }
    }

    /// Extends this range to cover `other`.
    #[must_use]
    pub(crate) fn to(self, other: Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
            col: self.col,
        }
    }
}

/// Index of a resume slot introduced by the yield/await lowering.
///
/// Each suspension site in a lowered function body gets exactly one slot; the
/// generator instance stores the value delivered on resume under this index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResumeSlotId(pub u16);

/// A primitive literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    Str(StringId),
    BigInt(Box<BigInt>),
    /// A regex literal, stored as raw pattern and flag text.
    Regex { pattern: StringId, flags: StringId },
}

/// An expression together with its source range.
#[derive(Debug, Clone)]
pub struct ExprLoc {
    pub expr: Expr,
    pub range: CodeRange,
}

impl ExprLoc {
    pub(crate) fn new(expr: Expr, range: CodeRange) -> Self {
        Self { expr, range }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

/// Binary operators (excluding logical short-circuit forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    In,
    InstanceOf,
}

/// Short-circuiting operators, kept apart from [`BinaryOp`] because their
/// right operand must not be evaluated eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// Assignment operators. Compound forms read the target first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    /// `&&=`, assigning only when the target is truthy.
    And,
    /// `||=`, assigning only when the target is falsy.
    Or,
    /// `??=`, assigning only when the target is nullish.
    Nullish,
}

/// A property name in an object literal, class member, or member pattern.
#[derive(Debug, Clone)]
pub enum PropName {
    Ident(StringId),
    Str(StringId),
    Num(f64),
    /// A `#name` private member key.
    Private(StringId),
    Computed(Box<ExprLoc>),
}

/// One element of an array literal.
#[derive(Debug, Clone)]
pub enum ArrayElement {
    /// An elision (`[1, , 3]`).
    Hole,
    Item(ExprLoc),
    Spread(ExprLoc),
}

/// One property of an object literal.
#[derive(Debug, Clone)]
pub enum ObjectProp {
    KeyValue { key: PropName, value: ExprLoc },
    Shorthand(StringId),
    Method { key: PropName, func: FunctionId },
    Getter { key: PropName, func: FunctionId },
    Setter { key: PropName, func: FunctionId },
    Spread(ExprLoc),
}

/// A call or `new` argument.
#[derive(Debug, Clone)]
pub enum Argument {
    Expr(ExprLoc),
    Spread(ExprLoc),
}

/// A member access key: `obj.name`, `obj.#name`, or `obj[expr]`.
#[derive(Debug, Clone)]
pub enum MemberKey {
    Ident(StringId),
    Private(StringId),
    Computed(Box<ExprLoc>),
}

/// Kind of a class method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Constructor,
    Method,
    Getter,
    Setter,
}

/// One member of a class body.
#[derive(Debug, Clone)]
pub enum ClassMember {
    Method {
        kind: MethodKind,
        key: PropName,
        is_static: bool,
        func: FunctionId,
    },
    Field {
        key: PropName,
        is_static: bool,
        value: Option<ExprLoc>,
    },
}

/// A class declaration or expression body.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Option<StringId>,
    pub parent: Option<ExprLoc>,
    pub members: Vec<ClassMember>,
    pub range: CodeRange,
}

/// Expressions.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Ident(StringId),
    This,
    /// Read of a resume slot; introduced only by the yield/await lowering.
    ResumeSlot(ResumeSlotId),
    Array(Vec<ArrayElement>),
    Object(Vec<ObjectProp>),
    /// A function or arrow expression; the body lives in the function table.
    Function(FunctionId),
    Class(Box<ClassDef>),
    Template {
        /// Cooked string segments; always `exprs.len() + 1` of them.
        quasis: Vec<StringId>,
        exprs: Vec<ExprLoc>,
    },
    TaggedTemplate {
        tag: Box<ExprLoc>,
        quasis: Vec<StringId>,
        raws: Vec<StringId>,
        exprs: Vec<ExprLoc>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<ExprLoc>,
    },
    /// `++x`, `x--`, etc.
    Update {
        prefix: bool,
        increment: bool,
        target: Box<ExprLoc>,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExprLoc>,
        right: Box<ExprLoc>,
    },
    Logical {
        op: LogicalOp,
        left: Box<ExprLoc>,
        right: Box<ExprLoc>,
    },
    Conditional {
        test: Box<ExprLoc>,
        consequent: Box<ExprLoc>,
        alternate: Box<ExprLoc>,
    },
    Assign {
        op: AssignOp,
        target: Box<AssignTarget>,
        value: Box<ExprLoc>,
    },
    Member {
        object: Box<ExprLoc>,
        key: MemberKey,
        /// True for `?.` access; short-circuits inside the enclosing chain.
        optional: bool,
    },
    Call {
        callee: Box<ExprLoc>,
        args: Vec<Argument>,
        /// True for `?.()` calls.
        optional: bool,
    },
    New {
        callee: Box<ExprLoc>,
        args: Vec<Argument>,
    },
    /// Wraps the outermost link of an optional chain; a nullish short-circuit
    /// inside resolves the whole chain to `undefined`.
    Chain(Box<ExprLoc>),
    /// `import(specifier)`; resolves to a promise of the module namespace.
    DynamicImport(Box<ExprLoc>),
    Sequence(Vec<ExprLoc>),
    Yield {
        argument: Option<Box<ExprLoc>>,
        delegate: bool,
    },
    Await(Box<ExprLoc>),
    /// `super.key` / `super[expr]` inside a method.
    SuperMember(MemberKey),
    /// `super(...)` inside a derived constructor.
    SuperCall(Vec<Argument>),
}

/// The target of an assignment expression.
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Ident(StringId),
    Member {
        object: ExprLoc,
        key: MemberKey,
    },
    /// Destructuring assignment (`[a, b] = xs`, `({x} = o)`).
    Pattern(Pattern),
}

/// One element of an array destructuring pattern.
#[derive(Debug, Clone)]
pub enum ArrayPatternElem {
    Hole,
    Elem {
        pattern: Box<Pattern>,
        default: Option<ExprLoc>,
    },
    Rest(Box<Pattern>),
}

/// One property of an object destructuring pattern.
#[derive(Debug, Clone)]
pub struct ObjectPatternProp {
    pub key: PropName,
    pub pattern: Box<Pattern>,
    pub default: Option<ExprLoc>,
}

/// A binding or assignment pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    Ident(StringId),
    Array(Vec<ArrayPatternElem>),
    Object {
        props: Vec<ObjectPatternProp>,
        rest: Option<Box<Pattern>>,
    },
}

impl Pattern {
    /// Visits every identifier bound by this pattern.
    pub fn each_bound_name(&self, f: &mut impl FnMut(StringId)) {
        match self {
            Self::Ident(name) => f(*name),
            Self::Array(elems) => {
                for elem in elems {
                    match elem {
                        ArrayPatternElem::Hole => {}
                        ArrayPatternElem::Elem { pattern, .. } | ArrayPatternElem::Rest(pattern) => {
                            pattern.each_bound_name(f);
                        }
                    }
                }
            }
            Self::Object { props, rest } => {
                for prop in props {
                    prop.pattern.each_bound_name(f);
                }
                if let Some(rest) = rest {
                    rest.each_bound_name(f);
                }
            }
        }
    }
}

/// Declaration kind for variable statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

/// One `name = init` declarator in a variable statement.
#[derive(Debug, Clone)]
pub struct Declarator {
    pub target: Pattern,
    pub init: Option<ExprLoc>,
}

/// Head of a `for-in` / `for-of` statement.
#[derive(Debug, Clone)]
pub enum ForHead {
    Decl { kind: DeclKind, target: Pattern },
    /// Assignment to an existing binding (`for (x of xs)`).
    Pattern(Pattern),
}

/// Init clause of a classic `for` statement.
#[derive(Debug, Clone)]
pub enum ForInit {
    VarDecl { kind: DeclKind, declarators: Vec<Declarator> },
    Expr(ExprLoc),
}

/// A `case`/`default` clause of a switch statement.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub test: Option<ExprLoc>,
    pub body: Vec<StmtLoc>,
}

/// A `catch` clause; the binding is optional (ES2019).
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<StmtLoc>,
}

/// One specifier of an `import` declaration.
#[derive(Debug, Clone)]
pub enum ImportSpecifier {
    Default(StringId),
    Named { imported: StringId, local: StringId },
    Namespace(StringId),
}

/// One specifier of a named `export` declaration.
#[derive(Debug, Clone)]
pub struct ExportSpecifier {
    pub local: StringId,
    pub exported: StringId,
}

/// A statement together with its source range.
#[derive(Debug, Clone)]
pub struct StmtLoc {
    pub stmt: Stmt,
    pub range: CodeRange,
}

impl StmtLoc {
    pub(crate) fn new(stmt: Stmt, range: CodeRange) -> Self {
        Self { stmt, range }
    }
}

/// Which suspension a lowered site performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendKind {
    Yield,
    YieldStar,
    Await,
}

/// A suspension site in lowered form: evaluate the argument, suspend, and on
/// resume store the delivered value in the resume slot.
///
/// Only the yield/await lowering produces this statement; the parser never
/// does, and the tree-walking evaluator treats it as unreachable.
#[derive(Debug, Clone)]
pub struct SuspendSite {
    pub kind: SuspendKind,
    pub argument: Option<ExprLoc>,
    pub slot: ResumeSlotId,
    pub range: CodeRange,
}

/// Statements.
#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(ExprLoc),
    /// A lowered suspension site.
    Suspend(SuspendSite),
    VarDecl {
        kind: DeclKind,
        declarators: Vec<Declarator>,
    },
    FunctionDecl {
        name: StringId,
        func: FunctionId,
    },
    ClassDecl(Box<ClassDef>),
    Return(Option<ExprLoc>),
    If {
        test: ExprLoc,
        consequent: Box<StmtLoc>,
        alternate: Option<Box<StmtLoc>>,
    },
    Block(Vec<StmtLoc>),
    For {
        init: Option<ForInit>,
        test: Option<ExprLoc>,
        update: Option<ExprLoc>,
        body: Box<StmtLoc>,
    },
    ForIn {
        head: ForHead,
        object: ExprLoc,
        body: Box<StmtLoc>,
    },
    ForOf {
        head: ForHead,
        iterable: ExprLoc,
        body: Box<StmtLoc>,
        is_await: bool,
    },
    While {
        test: ExprLoc,
        body: Box<StmtLoc>,
    },
    DoWhile {
        body: Box<StmtLoc>,
        test: ExprLoc,
    },
    Switch {
        discriminant: ExprLoc,
        cases: Vec<SwitchCase>,
    },
    Break(Option<StringId>),
    Continue(Option<StringId>),
    Labeled {
        label: StringId,
        body: Box<StmtLoc>,
    },
    Throw(ExprLoc),
    Try {
        block: Vec<StmtLoc>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<StmtLoc>>,
    },
    Empty,
    Import {
        specifiers: Vec<ImportSpecifier>,
        source: StringId,
    },
    ExportNamed {
        specifiers: Vec<ExportSpecifier>,
        source: Option<StringId>,
    },
    /// `export <declaration>`; the inner statement is also evaluated.
    ExportDecl(Box<StmtLoc>),
    ExportDefault(ExprLoc),
    ExportAll {
        source: StringId,
    },
}

/// Body of a function: a statement list, or a bare expression for arrows.
#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Vec<StmtLoc>),
    Expr(Box<ExprLoc>),
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<ExprLoc>,
    pub rest: bool,
}

/// A parsed function definition, stored in the engine's function table.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: Option<StringId>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub is_async: bool,
    pub is_generator: bool,
    /// Set when the body (or an enclosing scope) carries a `"use strict"`
    /// directive.
    pub is_strict: bool,
    /// True for class methods and object-literal methods; enables `super`.
    pub is_method: bool,
    /// True for a derived-class constructor; enables `super(...)`.
    pub is_derived_constructor: bool,
    pub range: CodeRange,
}

/// A parsed top-level program.
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<StmtLoc>,
    pub is_strict: bool,
    /// True when the source uses import/export and must evaluate as a module.
    pub is_module: bool,
}
