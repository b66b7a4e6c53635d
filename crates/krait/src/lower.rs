//! Yield/await lowering.
//!
//! Applied only to function bodies that contain `yield`, `yield*`, or
//! `await`. The output is an equivalent statement list in which every
//! suspension is an explicit [`Stmt::Suspend`] site paired with a resume
//! slot; the expressions that follow read the delivered value through
//! [`Expr::ResumeSlot`]. This makes IR construction total: the builder never
//! meets a suspension in the middle of an expression.
//!
//! The policy is deliberately conservative. One suspension per statement
//! expression; loop conditions with exactly one suspension get the probe
//! rewrite; everything else is rejected with a NotSupported error naming the
//! construct, and the function stays unusable until rewritten.

use crate::{
    analyze::{AnalyzeOpts, analyze_expr, analyze_stmt, try_rewrite_single_suspension},
    ast::{
        CodeRange, DeclKind, Declarator, Expr, ExprLoc, ForInit, FunctionBody, FunctionDef, Literal, Pattern,
        ResumeSlotId, Stmt, StmtLoc, SuspendSite, SwitchCase, UnaryOp,
    },
    intern::Interns,
};

/// A lowered function body.
#[derive(Debug)]
pub(crate) struct LoweredBody {
    pub body: Vec<StmtLoc>,
    pub slot_count: u16,
}

/// Lowers `def`'s body. `Err` carries the NotSupported feature name.
pub(crate) fn lower_function(def: &FunctionDef, interns: &mut Interns) -> Result<LoweredBody, String> {
    for param in &def.params {
        if let Some(default) = &param.default {
            if analyze_expr(default, AnalyzeOpts::default()).total() > 0 {
                return Err("suspension in parameter default".to_owned());
            }
        }
    }
    let mut lowerer = Lowerer {
        interns,
        next_slot: 0,
        synth_counter: 0,
    };
    let body = match &def.body {
        FunctionBody::Block(body) => lowerer.lower_stmts(body)?,
        FunctionBody::Expr(expr) => {
            // Arrow expression body behaves as `return expr;`.
            let stmt = StmtLoc::new(Stmt::Return(Some((**expr).clone())), expr.range);
            lowerer.lower_stmts(std::slice::from_ref(&stmt))?
        }
    };
    Ok(LoweredBody {
        body,
        slot_count: lowerer.next_slot,
    })
}

struct Lowerer<'i> {
    interns: &'i mut Interns,
    next_slot: u16,
    synth_counter: u32,
}

impl Lowerer<'_> {
    fn alloc_slot(&mut self) -> ResumeSlotId {
        let slot = ResumeSlotId(self.next_slot);
        self.next_slot += 1;
        slot
    }

    fn synth_name(&mut self, prefix: &str) -> crate::intern::StringId {
        let name = format!("__{prefix}_{}", self.synth_counter);
        self.synth_counter += 1;
        self.interns.intern_owned(name)
    }

    fn lower_stmts(&mut self, stmts: &[StmtLoc]) -> Result<Vec<StmtLoc>, String> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            self.lower_stmt(stmt, &mut out)?;
        }
        Ok(out)
    }

    /// Lifts the single suspension out of `expr` (if any), pushing the
    /// suspend statement onto `out` and returning the rewritten expression.
    fn lift(&mut self, expr: &ExprLoc, out: &mut Vec<StmtLoc>) -> Result<ExprLoc, String> {
        let counts = analyze_expr(expr, AnalyzeOpts::default());
        if counts.total() == 0 {
            return Ok(expr.clone());
        }
        if counts.yield_operand_contains_yield {
            return Err("yield operand containing yield".to_owned());
        }
        if counts.total() > 1 {
            return Err("multiple suspensions in one expression".to_owned());
        }
        let slot = self.alloc_slot();
        let Some((rewritten, site)) = try_rewrite_single_suspension(expr, slot) else {
            return Err("suspension in a conditionally-evaluated position".to_owned());
        };
        // The suspension argument may not itself suspend (checked by the
        // rewriter), but it may still need its own recursive treatment for
        // nested awaits in yields; the rewriter already refused those.
        out.push(StmtLoc::new(
            Stmt::Suspend(SuspendSite {
                kind: site.kind,
                argument: site.argument,
                slot,
                range: expr.range,
            }),
            expr.range,
        ));
        Ok(rewritten)
    }

    fn lower_stmt(&mut self, stmt: &StmtLoc, out: &mut Vec<StmtLoc>) -> Result<(), String> {
        let range = stmt.range;
        match &stmt.stmt {
            Stmt::Expr(expr) => {
                // A bare suspension statement needs no slot read afterwards.
                if let Expr::Yield { argument, delegate } = &expr.expr {
                    let argument = match argument {
                        Some(arg) => {
                            if analyze_expr(arg, AnalyzeOpts::default()).total() > 0 {
                                return Err("suspension inside a yielded operand".to_owned());
                            }
                            Some((**arg).clone())
                        }
                        None => None,
                    };
                    let slot = self.alloc_slot();
                    out.push(StmtLoc::new(
                        Stmt::Suspend(SuspendSite {
                            kind: if *delegate {
                                crate::ast::SuspendKind::YieldStar
                            } else {
                                crate::ast::SuspendKind::Yield
                            },
                            argument,
                            slot,
                            range,
                        }),
                        range,
                    ));
                    return Ok(());
                }
                if let Expr::Await(operand) = &expr.expr {
                    if analyze_expr(operand, AnalyzeOpts::default()).total() > 0 {
                        return Err("suspension inside an awaited operand".to_owned());
                    }
                    let slot = self.alloc_slot();
                    out.push(StmtLoc::new(
                        Stmt::Suspend(SuspendSite {
                            kind: crate::ast::SuspendKind::Await,
                            argument: Some((**operand).clone()),
                            slot,
                            range,
                        }),
                        range,
                    ));
                    return Ok(());
                }
                let rewritten = self.lift(expr, out)?;
                out.push(StmtLoc::new(Stmt::Expr(rewritten), range));
                Ok(())
            }
            Stmt::VarDecl { kind, declarators } => {
                let any_suspends = declarators
                    .iter()
                    .any(|d| d.init.as_ref().is_some_and(|i| analyze_expr(i, AnalyzeOpts::default()).total() > 0));
                if !any_suspends {
                    out.push(stmt.clone());
                    return Ok(());
                }
                // Split so each declarator can have its own preceding
                // suspension.
                for decl in declarators {
                    let init = match &decl.init {
                        Some(init) => Some(self.lift(init, out)?),
                        None => None,
                    };
                    out.push(StmtLoc::new(
                        Stmt::VarDecl {
                            kind: *kind,
                            declarators: vec![Declarator {
                                target: decl.target.clone(),
                                init,
                            }],
                        },
                        range,
                    ));
                }
                Ok(())
            }
            Stmt::Return(arg) => {
                let arg = match arg {
                    Some(arg) => Some(self.lift(arg, out)?),
                    None => None,
                };
                out.push(StmtLoc::new(Stmt::Return(arg), range));
                Ok(())
            }
            Stmt::Throw(arg) => {
                let arg = self.lift(arg, out)?;
                out.push(StmtLoc::new(Stmt::Throw(arg), range));
                Ok(())
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                let test = self.lift(test, out)?;
                let consequent = Box::new(self.lower_boxed(consequent)?);
                let alternate = match alternate {
                    Some(alternate) => Some(Box::new(self.lower_boxed(alternate)?)),
                    None => None,
                };
                out.push(StmtLoc::new(
                    Stmt::If {
                        test,
                        consequent,
                        alternate,
                    },
                    range,
                ));
                Ok(())
            }
            Stmt::Block(body) => {
                let body = self.lower_stmts(body)?;
                out.push(StmtLoc::new(Stmt::Block(body), range));
                Ok(())
            }
            Stmt::While { test, body } => {
                let test_counts = analyze_expr(test, AnalyzeOpts::default());
                let body = self.lower_boxed(body)?;
                if test_counts.total() == 0 {
                    out.push(StmtLoc::new(
                        Stmt::While {
                            test: test.clone(),
                            body: Box::new(body),
                        },
                        range,
                    ));
                    return Ok(());
                }
                // Probe rewrite: while (true) { <suspend>; if (!cond') break; body }
                let probe = self.build_probe(test, body, range)?;
                out.push(probe);
                Ok(())
            }
            Stmt::DoWhile { body, test } => {
                let test_counts = analyze_expr(test, AnalyzeOpts::default());
                let body = self.lower_boxed(body)?;
                if test_counts.total() == 0 {
                    out.push(StmtLoc::new(
                        Stmt::DoWhile {
                            body: Box::new(body),
                            test: test.clone(),
                        },
                        range,
                    ));
                    return Ok(());
                }
                // do { body } while (<probed>) becomes
                // while (true) { body; <suspend>; if (!cond') break; }
                let mut loop_body = vec![body];
                let cond = self.lift(test, &mut loop_body)?;
                loop_body.push(StmtLoc::new(
                    Stmt::If {
                        test: ExprLoc::new(
                            Expr::Unary {
                                op: UnaryOp::Not,
                                operand: Box::new(cond),
                            },
                            range,
                        ),
                        consequent: Box::new(StmtLoc::new(Stmt::Break(None), range)),
                        alternate: None,
                    },
                    range,
                ));
                out.push(StmtLoc::new(
                    Stmt::While {
                        test: ExprLoc::new(Expr::Literal(Literal::Bool(true)), range),
                        body: Box::new(StmtLoc::new(Stmt::Block(loop_body), range)),
                    },
                    range,
                ));
                Ok(())
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let test_suspends = test
                    .as_ref()
                    .is_some_and(|t| analyze_expr(t, AnalyzeOpts::default()).total() > 0);
                let update_suspends = update
                    .as_ref()
                    .is_some_and(|u| analyze_expr(u, AnalyzeOpts::default()).total() > 0);
                if update_suspends {
                    return Err("suspension in for-loop update".to_owned());
                }
                let init_lowered = match init {
                    Some(ForInit::Expr(e)) => {
                        let e = self.lift(e, out)?;
                        Some(ForInit::Expr(e))
                    }
                    Some(ForInit::VarDecl { kind, declarators }) => {
                        let mut lowered = Vec::with_capacity(declarators.len());
                        for decl in declarators {
                            let init = match &decl.init {
                                Some(i) => Some(self.lift(i, out)?),
                                None => None,
                            };
                            lowered.push(Declarator {
                                target: decl.target.clone(),
                                init,
                            });
                        }
                        Some(ForInit::VarDecl {
                            kind: *kind,
                            declarators: lowered,
                        })
                    }
                    None => None,
                };
                let body_lowered = self.lower_boxed(body)?;
                if !test_suspends {
                    out.push(StmtLoc::new(
                        Stmt::For {
                            init: init_lowered,
                            test: test.clone(),
                            update: update.clone(),
                            body: Box::new(body_lowered),
                        },
                        range,
                    ));
                    return Ok(());
                }
                // for (init; <probed>; update) body becomes
                //   init;
                //   let __fresh = true;
                //   while (true) {
                //     if (!__fresh) update; __fresh = false;
                //     <suspend>; if (!cond') break;
                //     body
                //   }
                // The flag keeps `continue` running the update.
                if let Some(init) = init_lowered {
                    match init {
                        ForInit::Expr(e) => out.push(StmtLoc::new(Stmt::Expr(e), range)),
                        ForInit::VarDecl { kind, declarators } => {
                            out.push(StmtLoc::new(Stmt::VarDecl { kind, declarators }, range));
                        }
                    }
                }
                let fresh = self.synth_name("fresh");
                out.push(StmtLoc::new(
                    Stmt::VarDecl {
                        kind: DeclKind::Let,
                        declarators: vec![Declarator {
                            target: Pattern::Ident(fresh),
                            init: Some(ExprLoc::new(Expr::Literal(Literal::Bool(true)), range)),
                        }],
                    },
                    range,
                ));
                let mut loop_body = Vec::new();
                if let Some(update) = update {
                    loop_body.push(StmtLoc::new(
                        Stmt::If {
                            test: ExprLoc::new(
                                Expr::Unary {
                                    op: UnaryOp::Not,
                                    operand: Box::new(ExprLoc::new(Expr::Ident(fresh), range)),
                                },
                                range,
                            ),
                            consequent: Box::new(StmtLoc::new(Stmt::Expr(update.clone()), range)),
                            alternate: None,
                        },
                        range,
                    ));
                }
                loop_body.push(StmtLoc::new(
                    Stmt::Expr(ExprLoc::new(
                        Expr::Assign {
                            op: crate::ast::AssignOp::Assign,
                            target: Box::new(crate::ast::AssignTarget::Ident(fresh)),
                            value: Box::new(ExprLoc::new(Expr::Literal(Literal::Bool(false)), range)),
                        },
                        range,
                    )),
                    range,
                ));
                let test = test.as_ref().expect("suspending test present");
                let cond = self.lift(test, &mut loop_body)?;
                loop_body.push(StmtLoc::new(
                    Stmt::If {
                        test: ExprLoc::new(
                            Expr::Unary {
                                op: UnaryOp::Not,
                                operand: Box::new(cond),
                            },
                            range,
                        ),
                        consequent: Box::new(StmtLoc::new(Stmt::Break(None), range)),
                        alternate: None,
                    },
                    range,
                ));
                loop_body.push(body_lowered);
                out.push(StmtLoc::new(
                    Stmt::While {
                        test: ExprLoc::new(Expr::Literal(Literal::Bool(true)), range),
                        body: Box::new(StmtLoc::new(Stmt::Block(loop_body), range)),
                    },
                    range,
                ));
                Ok(())
            }
            Stmt::ForIn { head, object, body } => {
                let object = self.lift(object, out)?;
                let body = self.lower_boxed(body)?;
                out.push(StmtLoc::new(
                    Stmt::ForIn {
                        head: head.clone(),
                        object,
                        body: Box::new(body),
                    },
                    range,
                ));
                Ok(())
            }
            Stmt::ForOf {
                head,
                iterable,
                body,
                is_await,
            } => {
                let iterable = self.lift(iterable, out)?;
                let body = self.lower_boxed(body)?;
                out.push(StmtLoc::new(
                    Stmt::ForOf {
                        head: head.clone(),
                        iterable,
                        body: Box::new(body),
                        is_await: *is_await,
                    },
                    range,
                ));
                Ok(())
            }
            Stmt::Switch { discriminant, cases } => {
                let discriminant = self.lift(discriminant, out)?;
                let mut lowered_cases = Vec::with_capacity(cases.len());
                for case in cases {
                    if let Some(test) = &case.test {
                        if analyze_expr(test, AnalyzeOpts::default()).total() > 0 {
                            return Err("suspension in switch case test".to_owned());
                        }
                    }
                    lowered_cases.push(SwitchCase {
                        test: case.test.clone(),
                        body: self.lower_stmts(&case.body)?,
                    });
                }
                out.push(StmtLoc::new(
                    Stmt::Switch {
                        discriminant,
                        cases: lowered_cases,
                    },
                    range,
                ));
                Ok(())
            }
            Stmt::Labeled { label, body } => {
                let body = self.lower_boxed(body)?;
                out.push(StmtLoc::new(
                    Stmt::Labeled {
                        label: *label,
                        body: Box::new(body),
                    },
                    range,
                ));
                Ok(())
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                let block = self.lower_stmts(block)?;
                let handler = match handler {
                    Some(h) => Some(crate::ast::CatchClause {
                        param: h.param.clone(),
                        body: self.lower_stmts(&h.body)?,
                    }),
                    None => None,
                };
                let finalizer = match finalizer {
                    Some(f) => Some(self.lower_stmts(f)?),
                    None => None,
                };
                out.push(StmtLoc::new(
                    Stmt::Try {
                        block,
                        handler,
                        finalizer,
                    },
                    range,
                ));
                Ok(())
            }
            // No suspensions possible inside these (nested function bodies
            // lower on their own); statements pass through unchanged.
            Stmt::FunctionDecl { .. }
            | Stmt::ClassDecl(_)
            | Stmt::Break(_)
            | Stmt::Continue(_)
            | Stmt::Empty
            | Stmt::Suspend(_) => {
                out.push(stmt.clone());
                Ok(())
            }
            Stmt::Import { .. }
            | Stmt::ExportNamed { .. }
            | Stmt::ExportDecl(_)
            | Stmt::ExportDefault(_)
            | Stmt::ExportAll { .. } => Err("module declaration inside a function body".to_owned()),
        }
    }

    fn lower_boxed(&mut self, stmt: &StmtLoc) -> Result<StmtLoc, String> {
        let mut out = Vec::with_capacity(1);
        self.lower_stmt(stmt, &mut out)?;
        if out.len() == 1 {
            Ok(out.pop().expect("one statement"))
        } else {
            let range = stmt.range;
            Ok(StmtLoc::new(Stmt::Block(out), range))
        }
    }

    /// `while (true) { <suspend>; let c = cond'; if (!c) break; body }`
    fn build_probe(&mut self, test: &ExprLoc, body: StmtLoc, range: CodeRange) -> Result<StmtLoc, String> {
        let mut loop_body = Vec::new();
        let cond = self.lift(test, &mut loop_body)?;
        loop_body.push(StmtLoc::new(
            Stmt::If {
                test: ExprLoc::new(
                    Expr::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(cond),
                    },
                    range,
                ),
                consequent: Box::new(StmtLoc::new(Stmt::Break(None), range)),
                alternate: None,
            },
            range,
        ));
        loop_body.push(body);
        Ok(StmtLoc::new(
            Stmt::While {
                test: ExprLoc::new(Expr::Literal(Literal::Bool(true)), range),
                body: Box::new(StmtLoc::new(Stmt::Block(loop_body), range)),
            },
            range,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analyze::analyze_stmt as analyze, intern::Interns, parse::parse_program};

    fn lower_first_function(src: &str) -> Result<LoweredBody, String> {
        let mut interns = Interns::new();
        let mut funcs = Vec::new();
        parse_program(src, &mut interns, &mut funcs).expect("parse");
        lower_function(&funcs[0], &mut interns)
    }

    #[test]
    fn statement_form() {
        let lowered = lower_first_function("function* g() { let x = yield 1; use(x); }").unwrap();
        assert_eq!(lowered.slot_count, 1);
        assert!(matches!(lowered.body[0].stmt, Stmt::Suspend(_)));
        assert!(matches!(lowered.body[1].stmt, Stmt::VarDecl { .. }));
    }

    #[test]
    fn loop_probe_form() {
        let lowered = lower_first_function("async function f() { while (await more()) { step(); } }").unwrap();
        assert_eq!(lowered.slot_count, 1);
        let Stmt::While { test, body } = &lowered.body[0].stmt else {
            panic!("expected while");
        };
        assert!(matches!(test.expr, Expr::Literal(Literal::Bool(true))));
        let Stmt::Block(inner) = &body.stmt else {
            panic!("expected block body");
        };
        assert!(matches!(inner[0].stmt, Stmt::Suspend(_)));
    }

    #[test]
    fn multiple_suspensions_rejected() {
        let err = lower_first_function("function* g() { use((yield 1) + (yield 2)); }").unwrap_err();
        assert!(err.contains("multiple suspensions"));
    }

    #[test]
    fn switch_case_test_rejected() {
        let err = lower_first_function("function* g() { switch (x) { case yield 1: break; } }").unwrap_err();
        assert!(err.contains("switch case test"));
    }

    #[test]
    fn lowered_body_has_no_inline_suspensions() {
        let lowered =
            lower_first_function("async function f() { const a = await one(); if (a) { return await two(); } }")
                .unwrap();
        for stmt in &lowered.body {
            let counts = analyze(stmt, AnalyzeOpts::default());
            // All remaining suspensions are explicit Suspend statements.
            if counts.total() > 0 {
                assert!(suspends_only_via_suspend(stmt));
            }
        }
    }

    fn suspends_only_via_suspend(stmt: &StmtLoc) -> bool {
        match &stmt.stmt {
            Stmt::Suspend(_) => true,
            Stmt::If { consequent, alternate, .. } => {
                suspends_only_via_suspend(consequent)
                    && alternate.as_ref().is_none_or(|a| suspends_only_via_suspend(a))
            }
            Stmt::Block(body) => body
                .iter()
                .all(|s| analyze(s, AnalyzeOpts::default()).total() == 0 || suspends_only_via_suspend(s)),
            _ => false,
        }
    }
}
