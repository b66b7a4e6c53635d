//! Generator IR builder.
//!
//! Walks a lowered function body and emits the instruction list. Statements
//! with no suspension inside compile to a single `EvalStmt`; everything else
//! compiles structurally, so a suspension is always a top-level instruction.
//!
//! Forward jumps are emitted with a placeholder operand and patched once the
//! target is known; the same applies to the pc operands of `PushTry`,
//! `PushLoopScope`, and `EnterFinally`.

use crate::{
    ast::{
        BinaryOp, Expr, ExprLoc, ForHead, ForInit, FunctionDef, Pattern, ResumeSlotId, Stmt, StmtLoc, SuspendKind,
        SuspendSite,
    },
    r#gen::ir::{ExprId, HeadId, Instr, IrCode, PatternId, StmtId},
    intern::{Interns, StringId},
    lower::LoweredBody,
};

/// Placeholder operand for unpatched jumps.
const UNPATCHED: usize = usize::MAX;

/// Compiles a lowered body into IR. `Err` carries a NotSupported feature
/// name.
pub(crate) fn build_ir(lowered: &LoweredBody, def: &FunctionDef, _interns: &mut Interns) -> Result<IrCode, String> {
    let mut builder = IrBuilder {
        instrs: Vec::new(),
        exprs: Vec::new(),
        stmts: Vec::new(),
        patterns: Vec::new(),
        heads: Vec::new(),
        next_slot: lowered.slot_count,
    };
    for stmt in &lowered.body {
        builder.compile_stmt(stmt, None)?;
    }
    builder.emit(Instr::End);
    builder.verify()?;
    Ok(IrCode {
        instrs: builder.instrs,
        exprs: builder.exprs,
        stmts: builder.stmts,
        patterns: builder.patterns,
        heads: builder.heads,
        slot_count: builder.next_slot,
        name: def.name,
        hoist: lowered.body.clone(),
    })
}

struct IrBuilder {
    instrs: Vec<Instr>,
    exprs: Vec<ExprLoc>,
    stmts: Vec<StmtLoc>,
    patterns: Vec<Pattern>,
    heads: Vec<ForHead>,
    next_slot: u16,
}

/// A forward-jump site awaiting a target.
#[derive(Debug, Clone, Copy)]
struct JumpSite(usize);

impl IrBuilder {
    fn pc(&self) -> usize {
        self.instrs.len()
    }

    fn emit(&mut self, instr: Instr) -> usize {
        self.instrs.push(instr);
        self.instrs.len() - 1
    }

    fn alloc_slot(&mut self) -> ResumeSlotId {
        let slot = ResumeSlotId(self.next_slot);
        self.next_slot += 1;
        slot
    }

    fn pool_expr(&mut self, expr: &ExprLoc) -> ExprId {
        self.exprs.push(expr.clone());
        ExprId(u32::try_from(self.exprs.len() - 1).expect("expr pool overflow"))
    }

    fn pool_stmt(&mut self, stmt: &StmtLoc) -> StmtId {
        self.stmts.push(stmt.clone());
        StmtId(u32::try_from(self.stmts.len() - 1).expect("stmt pool overflow"))
    }

    fn pool_pattern(&mut self, pattern: &Pattern) -> PatternId {
        self.patterns.push(pattern.clone());
        PatternId(u32::try_from(self.patterns.len() - 1).expect("pattern pool overflow"))
    }

    fn pool_head(&mut self, head: &ForHead) -> HeadId {
        self.heads.push(head.clone());
        HeadId(u32::try_from(self.heads.len() - 1).expect("head pool overflow"))
    }

    fn emit_jump(&mut self) -> JumpSite {
        JumpSite(self.emit(Instr::Jump(UNPATCHED)))
    }

    fn emit_jump_if_false(&mut self) -> JumpSite {
        JumpSite(self.emit(Instr::JumpIfFalse(UNPATCHED)))
    }

    /// Patches a forward jump (or a pc operand of a structured instruction)
    /// to the current pc.
    fn patch(&mut self, site: JumpSite) {
        let target = self.pc();
        self.patch_to(site, target);
    }

    fn patch_to(&mut self, site: JumpSite, target: usize) {
        match &mut self.instrs[site.0] {
            Instr::Jump(t) | Instr::JumpIfFalse(t) | Instr::JumpIfAbrupt(t) | Instr::IteratorDone { exit_pc: t } => {
                *t = target;
            }
            other => panic!("patch target is not a jump: {other:?}"),
        }
    }

    /// Verifies that nothing is left unpatched.
    fn verify(&self) -> Result<(), String> {
        for instr in &self.instrs {
            let bad = match instr {
                Instr::Jump(t) | Instr::JumpIfFalse(t) | Instr::JumpIfAbrupt(t) | Instr::IteratorDone { exit_pc: t } => {
                    *t == UNPATCHED
                }
                Instr::PushTry { catch_pc, finally_pc } => {
                    catch_pc.is_some_and(|t| t == UNPATCHED) || finally_pc.is_some_and(|t| t == UNPATCHED)
                }
                Instr::PushLoopScope {
                    continue_pc, break_pc, ..
                } => *continue_pc == UNPATCHED || *break_pc == UNPATCHED,
                Instr::EnterFinally { finally_pc, resume_pc } => *finally_pc == UNPATCHED || *resume_pc == UNPATCHED,
                _ => false,
            };
            if bad {
                return Err("internal: unpatched jump in generator code".to_owned());
            }
        }
        Ok(())
    }

    // === statement compilation ===

    fn compile_stmt(&mut self, stmt: &StmtLoc, label: Option<StringId>) -> Result<(), String> {
        if !contains_suspend(stmt) {
            // Labels on suspension-free statements ride along inside.
            let id = self.pool_stmt(stmt);
            self.emit(Instr::EvalStmt(id));
            return Ok(());
        }
        match &stmt.stmt {
            Stmt::Suspend(site) => self.compile_suspend(site),
            Stmt::Block(body) => {
                self.emit(Instr::EnterScope);
                for inner in body {
                    self.compile_stmt(inner, None)?;
                }
                self.emit(Instr::ExitScope);
                Ok(())
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                let test_id = self.pool_expr(test);
                self.emit(Instr::EvalExpr(test_id));
                let to_else = self.emit_jump_if_false();
                self.compile_stmt(consequent, None)?;
                match alternate {
                    Some(alternate) => {
                        let to_end = self.emit_jump();
                        self.patch(to_else);
                        self.compile_stmt(alternate, None)?;
                        self.patch(to_end);
                    }
                    None => self.patch(to_else),
                }
                Ok(())
            }
            Stmt::While { test, body } => self.compile_while(test, body, label),
            Stmt::DoWhile { body, test } => self.compile_do_while(body, test, label),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.compile_for(init.as_ref(), test.as_ref(), update.as_ref(), body, label),
            Stmt::ForOf {
                head,
                iterable,
                body,
                is_await,
            } => self.compile_for_of(head, iterable, body, *is_await, label),
            Stmt::ForIn { head, object, body } => self.compile_for_in(head, object, body, label),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.compile_try(block, handler.as_ref(), finalizer.as_deref()),
            Stmt::Switch { discriminant, cases } => self.compile_switch(discriminant, cases, label),
            Stmt::Labeled { label, body } => self.compile_stmt(body, Some(*label)),
            Stmt::Return(arg) => {
                match arg {
                    Some(arg) => {
                        let id = self.pool_expr(arg);
                        self.emit(Instr::EvalExpr(id));
                    }
                    None => {
                        self.emit(Instr::LoadUndefined);
                    }
                }
                self.emit(Instr::Return);
                Ok(())
            }
            Stmt::Break(target) => {
                self.emit(Instr::BreakLoop(*target));
                Ok(())
            }
            Stmt::Continue(target) => {
                self.emit(Instr::ContinueLoop(*target));
                Ok(())
            }
            Stmt::Throw(arg) => {
                let id = self.pool_expr(arg);
                self.emit(Instr::EvalExpr(id));
                self.emit(Instr::Throw);
                Ok(())
            }
            other => Err(format!("generator statement {other:?}")),
        }
    }

    fn compile_suspend(&mut self, site: &SuspendSite) -> Result<(), String> {
        match &site.argument {
            Some(arg) => {
                let id = self.pool_expr(arg);
                self.emit(Instr::EvalExpr(id));
            }
            None => {
                self.emit(Instr::LoadUndefined);
            }
        }
        let resume_pc = self.pc() + 1;
        match site.kind {
            SuspendKind::Yield => self.emit(Instr::Yield {
                slot: site.slot,
                resume_pc,
            }),
            SuspendKind::YieldStar => self.emit(Instr::YieldStar {
                slot: site.slot,
                resume_pc,
            }),
            SuspendKind::Await => self.emit(Instr::Await {
                slot: site.slot,
                resume_pc,
            }),
        };
        Ok(())
    }

    fn push_loop(&mut self, label: Option<StringId>) -> usize {
        self.emit(Instr::PushLoopScope {
            continue_pc: UNPATCHED,
            break_pc: UNPATCHED,
            label,
            allows_continue: true,
        })
    }

    fn patch_loop(&mut self, index: usize, continue_pc: usize, break_pc: usize) {
        if let Instr::PushLoopScope {
            continue_pc: c,
            break_pc: b,
            ..
        } = &mut self.instrs[index]
        {
            *c = continue_pc;
            *b = break_pc;
        }
    }

    fn compile_while(&mut self, test: &ExprLoc, body: &StmtLoc, label: Option<StringId>) -> Result<(), String> {
        let frame = self.push_loop(label);
        let test_pc = self.pc();
        let test_id = self.pool_expr(test);
        self.emit(Instr::EvalExpr(test_id));
        let to_end = self.emit_jump_if_false();
        self.compile_stmt(body, None)?;
        let back = self.emit_jump();
        self.patch_to(back, test_pc);
        self.patch(to_end);
        self.emit(Instr::PopLoopScope);
        let break_pc = self.pc();
        self.patch_loop(frame, test_pc, break_pc);
        Ok(())
    }

    fn compile_do_while(&mut self, body: &StmtLoc, test: &ExprLoc, label: Option<StringId>) -> Result<(), String> {
        let frame = self.push_loop(label);
        let body_pc = self.pc();
        self.compile_stmt(body, None)?;
        let test_pc = self.pc();
        let test_id = self.pool_expr(test);
        self.emit(Instr::EvalExpr(test_id));
        let to_end = self.emit_jump_if_false();
        let back = self.emit_jump();
        self.patch_to(back, body_pc);
        self.patch(to_end);
        self.emit(Instr::PopLoopScope);
        let break_pc = self.pc();
        self.patch_loop(frame, test_pc, break_pc);
        Ok(())
    }

    fn compile_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&ExprLoc>,
        update: Option<&ExprLoc>,
        body: &StmtLoc,
        label: Option<StringId>,
    ) -> Result<(), String> {
        self.emit(Instr::EnterScope);
        match init {
            Some(ForInit::Expr(e)) => {
                let id = self.pool_expr(e);
                self.emit(Instr::EvalExpr(id));
            }
            Some(ForInit::VarDecl { kind, declarators }) => {
                let stmt = StmtLoc::new(
                    Stmt::VarDecl {
                        kind: *kind,
                        declarators: declarators.to_vec(),
                    },
                    body.range,
                );
                let id = self.pool_stmt(&stmt);
                self.emit(Instr::EvalStmt(id));
            }
            None => {}
        }
        let frame = self.push_loop(label);
        let test_pc = self.pc();
        let to_end = match test {
            Some(test) => {
                let id = self.pool_expr(test);
                self.emit(Instr::EvalExpr(id));
                Some(self.emit_jump_if_false())
            }
            None => None,
        };
        self.compile_stmt(body, None)?;
        let update_pc = self.pc();
        if let Some(update) = update {
            let id = self.pool_expr(update);
            self.emit(Instr::EvalExpr(id));
        }
        let back = self.emit_jump();
        self.patch_to(back, test_pc);
        if let Some(to_end) = to_end {
            self.patch(to_end);
        }
        self.emit(Instr::PopLoopScope);
        let break_pc = self.pc();
        self.emit(Instr::ExitScope);
        self.patch_loop(frame, update_pc, break_pc);
        Ok(())
    }

    fn compile_for_of(
        &mut self,
        head: &ForHead,
        iterable: &ExprLoc,
        body: &StmtLoc,
        is_await: bool,
        label: Option<StringId>,
    ) -> Result<(), String> {
        let iterable_id = self.pool_expr(iterable);
        self.emit(Instr::EvalExpr(iterable_id));
        let frame = self.emit(Instr::PushLoopScope {
            continue_pc: UNPATCHED,
            break_pc: UNPATCHED,
            label,
            allows_continue: true,
        });
        self.emit(Instr::IteratorOpen { is_async: is_await });
        let next_pc = self.pc();
        self.emit(Instr::IteratorNext);
        if is_await {
            // Unwrap the promise of the result object before inspecting it.
            let slot = self.alloc_slot();
            let resume_pc = self.pc() + 1;
            self.emit(Instr::Await { slot, resume_pc });
        }
        let done = JumpSite(self.emit(Instr::IteratorDone { exit_pc: UNPATCHED }));
        if is_await {
            // Sync iterators over promises: the element itself awaits too.
            let slot = self.alloc_slot();
            let resume_pc = self.pc() + 1;
            self.emit(Instr::Await { slot, resume_pc });
        }
        self.emit(Instr::EnterScope);
        let head_id = self.pool_head(head);
        self.emit(Instr::BindForTarget(head_id));
        self.compile_stmt(body, None)?;
        self.emit(Instr::ExitScope);
        let back = self.emit_jump();
        self.patch_to(back, next_pc);
        self.patch(done);
        self.emit(Instr::PopIter);
        self.emit(Instr::PopLoopScope);
        let break_pc = self.pc();
        self.patch_loop(frame, next_pc, break_pc);
        Ok(())
    }

    fn compile_for_in(
        &mut self,
        head: &ForHead,
        object: &ExprLoc,
        body: &StmtLoc,
        label: Option<StringId>,
    ) -> Result<(), String> {
        let object_id = self.pool_expr(object);
        self.emit(Instr::EvalExpr(object_id));
        self.emit(Instr::ForInKeys);
        let frame = self.emit(Instr::PushLoopScope {
            continue_pc: UNPATCHED,
            break_pc: UNPATCHED,
            label,
            allows_continue: true,
        });
        self.emit(Instr::IteratorOpen { is_async: false });
        let next_pc = self.pc();
        self.emit(Instr::IteratorNext);
        let done = JumpSite(self.emit(Instr::IteratorDone { exit_pc: UNPATCHED }));
        self.emit(Instr::EnterScope);
        let head_id = self.pool_head(head);
        self.emit(Instr::BindForTarget(head_id));
        self.compile_stmt(body, None)?;
        self.emit(Instr::ExitScope);
        let back = self.emit_jump();
        self.patch_to(back, next_pc);
        self.patch(done);
        self.emit(Instr::PopIter);
        self.emit(Instr::PopLoopScope);
        let break_pc = self.pc();
        self.patch_loop(frame, next_pc, break_pc);
        Ok(())
    }

    fn compile_try(
        &mut self,
        block: &[StmtLoc],
        handler: Option<&crate::ast::CatchClause>,
        finalizer: Option<&[StmtLoc]>,
    ) -> Result<(), String> {
        let try_index = self.emit(Instr::PushTry {
            catch_pc: handler.map(|_| UNPATCHED),
            finally_pc: finalizer.map(|_| UNPATCHED),
        });
        self.emit(Instr::EnterScope);
        for stmt in block {
            self.compile_stmt(stmt, None)?;
        }
        self.emit(Instr::ExitScope);

        let mut finally_entries: Vec<usize> = Vec::new();
        let mut to_after: Vec<JumpSite> = Vec::new();
        if finalizer.is_some() {
            finally_entries.push(self.emit(Instr::EnterFinally {
                finally_pc: UNPATCHED,
                resume_pc: UNPATCHED,
            }));
        } else {
            self.emit(Instr::PopTry);
            to_after.push(self.emit_jump());
        }

        let catch_pc = if let Some(handler) = handler {
            let catch_pc = self.pc();
            self.emit(Instr::EnterScope);
            if let Some(param) = &handler.param {
                let id = self.pool_pattern(param);
                self.emit(Instr::BindCatch(id));
            }
            for stmt in &handler.body {
                self.compile_stmt(stmt, None)?;
            }
            self.emit(Instr::ExitScope);
            if finalizer.is_some() {
                finally_entries.push(self.emit(Instr::EnterFinally {
                    finally_pc: UNPATCHED,
                    resume_pc: UNPATCHED,
                }));
            } else {
                to_after.push(self.emit_jump());
            }
            Some(catch_pc)
        } else {
            None
        };

        let finally_pc = if let Some(finalizer) = finalizer {
            let finally_pc = self.pc();
            self.emit(Instr::EnterScope);
            for stmt in finalizer {
                self.compile_stmt(stmt, None)?;
            }
            self.emit(Instr::ExitScope);
            self.emit(Instr::Rethrow);
            Some(finally_pc)
        } else {
            None
        };

        let after_pc = self.pc();
        for site in to_after {
            self.patch_to(site, after_pc);
        }
        for entry in finally_entries {
            if let Instr::EnterFinally { finally_pc: f, resume_pc: r } = &mut self.instrs[entry] {
                *f = finally_pc.expect("finalizer present");
                *r = after_pc;
            }
        }
        if let Instr::PushTry {
            catch_pc: c,
            finally_pc: f,
        } = &mut self.instrs[try_index]
        {
            if let Some(slot) = c {
                *slot = catch_pc.expect("handler present");
            }
            if let Some(slot) = f {
                *slot = finally_pc.expect("finalizer present");
            }
        }
        Ok(())
    }

    fn compile_switch(
        &mut self,
        discriminant: &ExprLoc,
        cases: &[crate::ast::SwitchCase],
        label: Option<StringId>,
    ) -> Result<(), String> {
        let id = self.pool_expr(discriminant);
        self.emit(Instr::EvalExpr(id));
        let tmp = self.alloc_slot();
        self.emit(Instr::StoreSlot(tmp));
        let frame = self.emit(Instr::PushLoopScope {
            continue_pc: UNPATCHED,
            break_pc: UNPATCHED,
            label,
            allows_continue: false,
        });
        self.emit(Instr::EnterScope);

        // Dispatch: compare each test against the stashed discriminant.
        let mut body_jumps: Vec<(usize, JumpSite)> = Vec::new();
        for (i, case) in cases.iter().enumerate() {
            let Some(test) = &case.test else { continue };
            let compare = ExprLoc::new(
                Expr::Binary {
                    op: BinaryOp::StrictEq,
                    left: Box::new(ExprLoc::new(Expr::ResumeSlot(tmp), test.range)),
                    right: Box::new(test.clone()),
                },
                test.range,
            );
            let compare_id = self.pool_expr(&compare);
            self.emit(Instr::EvalExpr(compare_id));
            let skip = self.emit_jump_if_false();
            body_jumps.push((i, self.emit_jump()));
            self.patch(skip);
        }
        let default_jump = cases.iter().position(|c| c.test.is_none()).map(|i| (i, self.emit_jump()));
        let no_match = self.emit_jump();

        // Bodies, in order, with fallthrough.
        let mut body_pcs: Vec<usize> = Vec::with_capacity(cases.len());
        for case in cases {
            body_pcs.push(self.pc());
            for stmt in &case.body {
                self.compile_stmt(stmt, None)?;
            }
        }
        for (i, site) in body_jumps {
            self.patch_to(site, body_pcs[i]);
        }
        if let Some((i, site)) = default_jump {
            self.patch_to(site, body_pcs[i]);
        }
        self.patch(no_match);
        self.emit(Instr::ExitScope);
        self.emit(Instr::PopLoopScope);
        let break_pc = self.pc();
        self.patch_loop(frame, break_pc, break_pc);
        Ok(())
    }
}

/// True when the statement (or any nested statement, excluding nested
/// function bodies) contains a lowered suspension site.
pub(crate) fn contains_suspend(stmt: &StmtLoc) -> bool {
    match &stmt.stmt {
        Stmt::Suspend(_) => true,
        Stmt::Block(body) => body.iter().any(contains_suspend),
        Stmt::If {
            consequent, alternate, ..
        } => contains_suspend(consequent) || alternate.as_deref().is_some_and(contains_suspend),
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Labeled { body, .. } => contains_suspend(body),
        Stmt::For { body, .. } | Stmt::ForIn { body, .. } => contains_suspend(body),
        // for-await-of always suspends (the implicit await per element).
        Stmt::ForOf { body, is_await, .. } => *is_await || contains_suspend(body),
        Stmt::Switch { cases, .. } => cases.iter().any(|c| c.body.iter().any(contains_suspend)),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            block.iter().any(contains_suspend)
                || handler.as_ref().is_some_and(|h| h.body.iter().any(contains_suspend))
                || finalizer.as_ref().is_some_and(|f| f.iter().any(contains_suspend))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{intern::Interns, lower::lower_function, parse::parse_program};

    fn build_first(src: &str) -> IrCode {
        let mut interns = Interns::new();
        let mut funcs = Vec::new();
        parse_program(src, &mut interns, &mut funcs).expect("parse");
        let lowered = lower_function(&funcs[0], &mut interns).expect("lower");
        build_ir(&lowered, &funcs[0], &mut interns).expect("build")
    }

    #[test]
    fn yield_emits_suspension_with_resume() {
        let ir = build_first("function* g() { yield 1; }");
        let yields: Vec<_> = ir
            .instrs
            .iter()
            .filter(|i| matches!(i, Instr::Yield { .. }))
            .collect();
        assert_eq!(yields.len(), 1);
        assert!(matches!(ir.instrs.last(), Some(Instr::End)));
    }

    #[test]
    fn one_instruction_per_site() {
        let ir = build_first("async function f() { await a(); await b(); }");
        let awaits = ir.instrs.iter().filter(|i| matches!(i, Instr::Await { .. })).count();
        assert_eq!(awaits, 2);
        assert_eq!(ir.slot_count, 2);
    }

    #[test]
    fn try_finally_structure_is_balanced() {
        let ir = build_first("function* g() { try { yield 1; } finally { log(); } }");
        let pushes = ir.instrs.iter().filter(|i| matches!(i, Instr::PushTry { .. })).count();
        let finallys = ir
            .instrs
            .iter()
            .filter(|i| matches!(i, Instr::EnterFinally { .. }))
            .count();
        let rethrows = ir.instrs.iter().filter(|i| matches!(i, Instr::Rethrow)).count();
        assert_eq!(pushes, 1);
        assert_eq!(finallys, 1);
        assert_eq!(rethrows, 1);
    }

    #[test]
    fn loops_push_and_pop_scopes() {
        let ir = build_first("function* g() { for (const x of xs) { yield x; } }");
        let pushes = ir
            .instrs
            .iter()
            .filter(|i| matches!(i, Instr::PushLoopScope { .. }))
            .count();
        let pops = ir.instrs.iter().filter(|i| matches!(i, Instr::PopLoopScope)).count();
        assert_eq!(pushes, pops);
        assert!(ir.instrs.iter().any(|i| matches!(i, Instr::IteratorOpen { .. })));
    }

    #[test]
    fn suspension_free_statements_stay_whole() {
        let ir = build_first("function* g() { let a = 1; let b = 2; yield a + b; complexCall(a, b); }");
        let eval_stmts = ir.instrs.iter().filter(|i| matches!(i, Instr::EvalStmt(_))).count();
        assert!(eval_stmts >= 3);
    }
}
