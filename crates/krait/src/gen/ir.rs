//! Generator IR.
//!
//! A lowered function body compiles into a flat instruction list with
//! resolved jump targets. Expressions, statements, patterns, and for-heads
//! referenced by instructions live in per-function pools (the same shape as
//! a constant pool), so instructions stay `Copy` and the machine never clones
//! AST.
//!
//! Suspension instructions (`Yield`, `YieldStar`, `Await`) each carry the
//! resume slot written on resumption and the pc execution continues from.

use crate::{
    ast::{ExprLoc, ForHead, Pattern, ResumeSlotId, StmtLoc},
    intern::StringId,
};

/// Index into [`IrCode::exprs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExprId(pub u32);

/// Index into [`IrCode::stmts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StmtId(pub u32);

/// Index into [`IrCode::patterns`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PatternId(pub u32);

/// Index into [`IrCode::heads`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeadId(pub u32);

/// One IR instruction. Jump operands are absolute instruction indices.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Instr {
    /// Evaluate an expression; the result lands in the accumulator.
    EvalExpr(ExprId),
    /// Execute a whole (suspension-free) statement through the tree-walking
    /// evaluator; abrupt completions route through the machine.
    EvalStmt(StmtId),
    /// acc = undefined.
    LoadUndefined,
    /// acc = slots[slot].
    LoadSlot(ResumeSlotId),
    /// slots[slot] = acc.
    StoreSlot(ResumeSlotId),
    Jump(usize),
    /// Jump when `ToBoolean(acc)` is false.
    JumpIfFalse(usize),
    /// Jump when an abrupt completion is pending replay.
    JumpIfAbrupt(usize),
    PushTry {
        catch_pc: Option<usize>,
        finally_pc: Option<usize>,
    },
    PopTry,
    /// Throw the accumulator.
    Throw,
    /// End of a `finally` block: replay the pending completion (rethrow,
    /// return, jump, or fall through).
    Rethrow,
    PushLoopScope {
        continue_pc: usize,
        break_pc: usize,
        label: Option<StringId>,
        /// Switch frames accept `break` but not `continue`.
        allows_continue: bool,
    },
    PopLoopScope,
    /// Enter a fresh block scope.
    EnterScope,
    ExitScope,
    /// Bind a `catch` parameter (pattern) from the accumulator in a fresh
    /// scope pushed by a preceding `EnterScope`.
    BindCatch(PatternId),
    /// Bind a for-of/for-in head from the accumulator.
    BindForTarget(HeadId),
    /// Open an iterator from the accumulator and push a driver.
    IteratorOpen {
        is_async: bool,
    },
    /// Call `next()` on the top driver; acc = the raw result object.
    IteratorNext,
    /// Inspect acc as an iterator result: when done, acc = value and jump;
    /// otherwise acc = value and fall through.
    IteratorDone {
        exit_pc: usize,
    },
    /// Close the top driver (calls `return()` if present) and pop it.
    IteratorReturn,
    /// Forward a throw to the top delegate driver.
    IteratorThrow,
    /// Pop the top driver without closing (normal exhaustion).
    PopIter,
    /// Replace acc with an array of the enumerable property keys of acc.
    ForInKeys,
    /// Suspend yielding acc; on `.next(v)` the slot receives v and execution
    /// resumes at `resume_pc`.
    Yield {
        slot: ResumeSlotId,
        resume_pc: usize,
    },
    /// Begin delegation to the iterable in acc.
    YieldStar {
        slot: ResumeSlotId,
        resume_pc: usize,
    },
    /// Suspend until the promise of acc settles.
    Await {
        slot: ResumeSlotId,
        resume_pc: usize,
    },
    /// Route a `break`/`continue` through the loop and try stacks.
    BreakLoop(Option<StringId>),
    ContinueLoop(Option<StringId>),
    /// Route a return of acc through the try stack.
    Return,
    /// Mark the normal end of a `try` region that has a `finally`: stash a
    /// jump-to-`resume_pc` pending completion and enter the finally block.
    EnterFinally {
        finally_pc: usize,
        resume_pc: usize,
    },
    /// End of the body: complete with `undefined`.
    End,
}

/// The compiled form of one lowered function body.
#[derive(Debug)]
pub(crate) struct IrCode {
    pub instrs: Vec<Instr>,
    pub exprs: Vec<ExprLoc>,
    pub stmts: Vec<StmtLoc>,
    pub patterns: Vec<Pattern>,
    pub heads: Vec<ForHead>,
    /// Resume slots: lowering's sites plus builder-internal temporaries.
    pub slot_count: u16,
    pub name: Option<StringId>,
    /// The lowered body, kept for declaration hoisting at first resume.
    pub hoist: Vec<StmtLoc>,
}

impl IrCode {
    pub fn expr(&self, id: ExprId) -> &ExprLoc {
        &self.exprs[id.0 as usize]
    }

    pub fn stmt(&self, id: StmtId) -> &StmtLoc {
        &self.stmts[id.0 as usize]
    }

    pub fn pattern(&self, id: PatternId) -> &Pattern {
        &self.patterns[id.0 as usize]
    }

    pub fn head(&self, id: HeadId) -> &ForHead {
        &self.heads[id.0 as usize]
    }
}
