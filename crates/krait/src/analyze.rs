//! AST shape analysis for the yield/await lowering.
//!
//! Counts suspension sites and locates the single site the lowering knows how
//! to rewrite. Nested function bodies are excluded by default: their
//! `yield`/`await` belong to their own lowering. (Bodies live in the function
//! table, so exclusion is the natural behavior; passing the table enables the
//! opt-in nested walk.)

use std::rc::Rc;

use crate::{
    ast::{
        Argument, ArrayElement, AssignTarget, Expr, ExprLoc, ForHead, ForInit, FunctionBody, FunctionDef, MemberKey,
        ObjectProp, PropName, ResumeSlotId, Stmt, StmtLoc, SuspendKind,
    },
    intern::FunctionId,
};

/// Suspension counts for an expression or statement subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ShapeCounts {
    pub yield_count: u32,
    pub delegated_yield_count: u32,
    pub await_count: u32,
    /// A `yield` whose operand itself contains a `yield`; never lowerable.
    pub yield_operand_contains_yield: bool,
}

impl ShapeCounts {
    /// Total suspension sites.
    pub fn total(self) -> u32 {
        self.yield_count + self.delegated_yield_count + self.await_count
    }

    fn add(&mut self, other: Self) {
        self.yield_count += other.yield_count;
        self.delegated_yield_count += other.delegated_yield_count;
        self.await_count += other.await_count;
        self.yield_operand_contains_yield |= other.yield_operand_contains_yield;
    }
}

/// Options for [`analyze_expr`]/[`analyze_stmt`].
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AnalyzeOpts<'f> {
    /// When set, suspensions inside nested function bodies are counted too,
    /// resolved through the given function table.
    pub include_nested_functions: Option<&'f [Rc<FunctionDef>]>,
}

pub(crate) fn analyze_expr(expr: &ExprLoc, opts: AnalyzeOpts<'_>) -> ShapeCounts {
    let mut counts = ShapeCounts::default();
    walk_expr(expr, opts, &mut counts);
    counts
}

pub(crate) fn analyze_stmt(stmt: &StmtLoc, opts: AnalyzeOpts<'_>) -> ShapeCounts {
    let mut counts = ShapeCounts::default();
    walk_stmt(stmt, opts, &mut counts);
    counts
}

fn walk_function(func: FunctionId, opts: AnalyzeOpts<'_>, out: &mut ShapeCounts) {
    let Some(funcs) = opts.include_nested_functions else {
        return;
    };
    let def = &funcs[func.index()];
    match &def.body {
        FunctionBody::Expr(expr) => walk_expr(expr, opts, out),
        FunctionBody::Block(body) => {
            for stmt in body {
                walk_stmt(stmt, opts, out);
            }
        }
    }
}

fn walk_stmt(stmt: &StmtLoc, opts: AnalyzeOpts<'_>, out: &mut ShapeCounts) {
    match &stmt.stmt {
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::ExportDefault(e) => walk_expr(e, opts, out),
        Stmt::Suspend(site) => {
            match site.kind {
                SuspendKind::Yield => out.yield_count += 1,
                SuspendKind::YieldStar => out.delegated_yield_count += 1,
                SuspendKind::Await => out.await_count += 1,
            }
            if let Some(arg) = &site.argument {
                walk_expr(arg, opts, out);
            }
        }
        Stmt::VarDecl { declarators, .. } => {
            for decl in declarators {
                if let Some(init) = &decl.init {
                    walk_expr(init, opts, out);
                }
            }
        }
        Stmt::FunctionDecl { func, .. } => walk_function(*func, opts, out),
        Stmt::ClassDecl(class) => {
            if let Some(parent) = &class.parent {
                walk_expr(parent, opts, out);
            }
        }
        Stmt::Return(arg) => {
            if let Some(arg) = arg {
                walk_expr(arg, opts, out);
            }
        }
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            walk_expr(test, opts, out);
            walk_stmt(consequent, opts, out);
            if let Some(alternate) = alternate {
                walk_stmt(alternate, opts, out);
            }
        }
        Stmt::Block(body) => {
            for stmt in body {
                walk_stmt(stmt, opts, out);
            }
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Expr(e)) => walk_expr(e, opts, out),
                Some(ForInit::VarDecl { declarators, .. }) => {
                    for decl in declarators {
                        if let Some(init) = &decl.init {
                            walk_expr(init, opts, out);
                        }
                    }
                }
                None => {}
            }
            if let Some(test) = test {
                walk_expr(test, opts, out);
            }
            if let Some(update) = update {
                walk_expr(update, opts, out);
            }
            walk_stmt(body, opts, out);
        }
        Stmt::ForIn { head, object, body } => {
            walk_for_head(head, opts, out);
            walk_expr(object, opts, out);
            walk_stmt(body, opts, out);
        }
        Stmt::ForOf {
            head, iterable, body, ..
        } => {
            walk_for_head(head, opts, out);
            walk_expr(iterable, opts, out);
            walk_stmt(body, opts, out);
        }
        Stmt::While { test, body } => {
            walk_expr(test, opts, out);
            walk_stmt(body, opts, out);
        }
        Stmt::DoWhile { body, test } => {
            walk_stmt(body, opts, out);
            walk_expr(test, opts, out);
        }
        Stmt::Switch { discriminant, cases } => {
            walk_expr(discriminant, opts, out);
            for case in cases {
                if let Some(test) = &case.test {
                    walk_expr(test, opts, out);
                }
                for stmt in &case.body {
                    walk_stmt(stmt, opts, out);
                }
            }
        }
        Stmt::Labeled { body, .. } => walk_stmt(body, opts, out),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            for stmt in block {
                walk_stmt(stmt, opts, out);
            }
            if let Some(handler) = handler {
                for stmt in &handler.body {
                    walk_stmt(stmt, opts, out);
                }
            }
            if let Some(finalizer) = finalizer {
                for stmt in finalizer {
                    walk_stmt(stmt, opts, out);
                }
            }
        }
        Stmt::ExportDecl(inner) => walk_stmt(inner, opts, out),
        Stmt::Break(_)
        | Stmt::Continue(_)
        | Stmt::Empty
        | Stmt::Import { .. }
        | Stmt::ExportNamed { .. }
        | Stmt::ExportAll { .. } => {}
    }
}

fn walk_for_head(head: &ForHead, _opts: AnalyzeOpts<'_>, _out: &mut ShapeCounts) {
    // Patterns carry defaults, but suspension there is rejected by the
    // lowering before this matters.
    let _ = head;
}

fn walk_expr(expr: &ExprLoc, opts: AnalyzeOpts<'_>, out: &mut ShapeCounts) {
    match &expr.expr {
        Expr::Yield { argument, delegate } => {
            if *delegate {
                out.delegated_yield_count += 1;
            } else {
                out.yield_count += 1;
            }
            if let Some(argument) = argument {
                let mut inner = ShapeCounts::default();
                walk_expr(argument, opts, &mut inner);
                if inner.yield_count + inner.delegated_yield_count > 0 {
                    out.yield_operand_contains_yield = true;
                }
                out.add(inner);
            }
        }
        Expr::Await(operand) => {
            out.await_count += 1;
            walk_expr(operand, opts, out);
        }
        Expr::Literal(_) | Expr::Ident(_) | Expr::This | Expr::ResumeSlot(_) => {}
        Expr::Array(elements) => {
            for element in elements {
                match element {
                    ArrayElement::Hole => {}
                    ArrayElement::Item(e) | ArrayElement::Spread(e) => walk_expr(e, opts, out),
                }
            }
        }
        Expr::Object(props) => {
            for prop in props {
                match prop {
                    ObjectProp::KeyValue { key, value } => {
                        walk_prop_name(key, opts, out);
                        walk_expr(value, opts, out);
                    }
                    ObjectProp::Method { key, func } | ObjectProp::Getter { key, func } | ObjectProp::Setter { key, func } => {
                        walk_prop_name(key, opts, out);
                        walk_function(*func, opts, out);
                    }
                    ObjectProp::Shorthand(_) => {}
                    ObjectProp::Spread(e) => walk_expr(e, opts, out),
                }
            }
        }
        Expr::Function(func) => walk_function(*func, opts, out),
        Expr::Class(class) => {
            if let Some(parent) = &class.parent {
                walk_expr(parent, opts, out);
            }
        }
        Expr::Template { exprs, .. } => {
            for e in exprs {
                walk_expr(e, opts, out);
            }
        }
        Expr::TaggedTemplate { tag, exprs, .. } => {
            walk_expr(tag, opts, out);
            for e in exprs {
                walk_expr(e, opts, out);
            }
        }
        Expr::Unary { operand, .. } => walk_expr(operand, opts, out),
        Expr::Update { target, .. } => walk_expr(target, opts, out),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            walk_expr(left, opts, out);
            walk_expr(right, opts, out);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            walk_expr(test, opts, out);
            walk_expr(consequent, opts, out);
            walk_expr(alternate, opts, out);
        }
        Expr::Assign { target, value, .. } => {
            match &**target {
                AssignTarget::Member { object, key } => {
                    walk_expr(object, opts, out);
                    if let MemberKey::Computed(key) = key {
                        walk_expr(key, opts, out);
                    }
                }
                AssignTarget::Ident(_) | AssignTarget::Pattern(_) => {}
            }
            walk_expr(value, opts, out);
        }
        Expr::Member { object, key, .. } => {
            walk_expr(object, opts, out);
            if let MemberKey::Computed(key) = key {
                walk_expr(key, opts, out);
            }
        }
        Expr::Call { callee, args, .. } => {
            walk_expr(callee, opts, out);
            walk_args(args, opts, out);
        }
        Expr::New { callee, args } => {
            walk_expr(callee, opts, out);
            walk_args(args, opts, out);
        }
        Expr::Chain(inner) | Expr::DynamicImport(inner) => walk_expr(inner, opts, out),
        Expr::Sequence(parts) => {
            for part in parts {
                walk_expr(part, opts, out);
            }
        }
        Expr::SuperMember(key) => {
            if let MemberKey::Computed(key) = key {
                walk_expr(key, opts, out);
            }
        }
        Expr::SuperCall(args) => walk_args(args, opts, out),
    }
}

fn walk_args(args: &[Argument], opts: AnalyzeOpts<'_>, out: &mut ShapeCounts) {
    for arg in args {
        match arg {
            Argument::Expr(e) | Argument::Spread(e) => walk_expr(e, opts, out),
        }
    }
}

fn walk_prop_name(key: &PropName, opts: AnalyzeOpts<'_>, out: &mut ShapeCounts) {
    if let PropName::Computed(e) = key {
        walk_expr(e, opts, out);
    }
}

/// A suspension extracted by [`try_rewrite_single_suspension`].
#[derive(Debug, Clone)]
pub(crate) struct ExtractedSite {
    pub kind: SuspendKind,
    pub argument: Option<ExprLoc>,
}

/// Positions in which lifting a suspension out of its expression would change
/// whether it executes: the right side of short-circuit operators and the
/// branches of a ternary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Always,
    Conditional,
}

/// Rewrites the unique suspension in `expr` to a read of `slot`, returning
/// the rewritten expression and the extracted site.
///
/// Returns `None` when the expression has no suspension, more than one, a
/// suspension in a conditionally-executed position, or a `yield` operand
/// containing another `yield`; the caller reports these as NotSupported.
pub(crate) fn try_rewrite_single_suspension(expr: &ExprLoc, slot: ResumeSlotId) -> Option<(ExprLoc, ExtractedSite)> {
    let counts = analyze_expr(expr, AnalyzeOpts::default());
    if counts.total() != 1 || counts.yield_operand_contains_yield {
        return None;
    }
    let mut extracted = None;
    let rewritten = rewrite_expr(expr, slot, Position::Always, &mut extracted)?;
    let site = extracted?;
    Some((rewritten, site))
}

fn rewrite_expr(
    expr: &ExprLoc,
    slot: ResumeSlotId,
    position: Position,
    extracted: &mut Option<ExtractedSite>,
) -> Option<ExprLoc> {
    let range = expr.range;
    let rewritten = match &expr.expr {
        Expr::Yield { argument, delegate } => {
            if position == Position::Conditional {
                return None;
            }
            *extracted = Some(ExtractedSite {
                kind: if *delegate { SuspendKind::YieldStar } else { SuspendKind::Yield },
                argument: argument.as_deref().cloned(),
            });
            Expr::ResumeSlot(slot)
        }
        Expr::Await(operand) => {
            if position == Position::Conditional {
                return None;
            }
            if analyze_expr(operand, AnalyzeOpts::default()).total() > 0 {
                return None;
            }
            *extracted = Some(ExtractedSite {
                kind: SuspendKind::Await,
                argument: Some((**operand).clone()),
            });
            Expr::ResumeSlot(slot)
        }
        Expr::Literal(_) | Expr::Ident(_) | Expr::This | Expr::ResumeSlot(_) | Expr::Function(_) => expr.expr.clone(),
        Expr::Array(elements) => {
            let mut out = Vec::with_capacity(elements.len());
            for element in elements {
                out.push(match element {
                    ArrayElement::Hole => ArrayElement::Hole,
                    ArrayElement::Item(e) => ArrayElement::Item(rewrite_expr(e, slot, position, extracted)?),
                    ArrayElement::Spread(e) => ArrayElement::Spread(rewrite_expr(e, slot, position, extracted)?),
                });
            }
            Expr::Array(out)
        }
        Expr::Object(props) => {
            let mut out = Vec::with_capacity(props.len());
            for prop in props {
                out.push(match prop {
                    ObjectProp::KeyValue { key, value } => ObjectProp::KeyValue {
                        key: key.clone(),
                        value: rewrite_expr(value, slot, position, extracted)?,
                    },
                    ObjectProp::Spread(e) => ObjectProp::Spread(rewrite_expr(e, slot, position, extracted)?),
                    other => other.clone(),
                });
            }
            Expr::Object(out)
        }
        Expr::Template { quasis, exprs } => Expr::Template {
            quasis: quasis.clone(),
            exprs: rewrite_vec(exprs, slot, position, extracted)?,
        },
        Expr::TaggedTemplate {
            tag,
            quasis,
            raws,
            exprs,
        } => Expr::TaggedTemplate {
            tag: Box::new(rewrite_expr(tag, slot, position, extracted)?),
            quasis: quasis.clone(),
            raws: raws.clone(),
            exprs: rewrite_vec(exprs, slot, position, extracted)?,
        },
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(rewrite_expr(operand, slot, position, extracted)?),
        },
        Expr::Update { prefix, increment, target } => Expr::Update {
            prefix: *prefix,
            increment: *increment,
            target: Box::new(rewrite_expr(target, slot, position, extracted)?),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(rewrite_expr(left, slot, position, extracted)?),
            right: Box::new(rewrite_expr(right, slot, position, extracted)?),
        },
        Expr::Logical { op, left, right } => Expr::Logical {
            op: *op,
            left: Box::new(rewrite_expr(left, slot, position, extracted)?),
            right: Box::new(rewrite_expr(right, slot, Position::Conditional, extracted)?),
        },
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => Expr::Conditional {
            test: Box::new(rewrite_expr(test, slot, position, extracted)?),
            consequent: Box::new(rewrite_expr(consequent, slot, Position::Conditional, extracted)?),
            alternate: Box::new(rewrite_expr(alternate, slot, Position::Conditional, extracted)?),
        },
        Expr::Assign { op, target, value } => {
            let target = match &**target {
                AssignTarget::Member { object, key } => AssignTarget::Member {
                    object: rewrite_expr(object, slot, position, extracted)?,
                    key: rewrite_member_key(key, slot, position, extracted)?,
                },
                other => other.clone(),
            };
            Expr::Assign {
                op: *op,
                target: Box::new(target),
                value: Box::new(rewrite_expr(value, slot, position, extracted)?),
            }
        }
        Expr::Member { object, key, optional } => Expr::Member {
            object: Box::new(rewrite_expr(object, slot, position, extracted)?),
            key: rewrite_member_key(key, slot, position, extracted)?,
            optional: *optional,
        },
        Expr::Call { callee, args, optional } => Expr::Call {
            callee: Box::new(rewrite_expr(callee, slot, position, extracted)?),
            args: rewrite_args(args, slot, position, extracted)?,
            optional: *optional,
        },
        Expr::New { callee, args } => Expr::New {
            callee: Box::new(rewrite_expr(callee, slot, position, extracted)?),
            args: rewrite_args(args, slot, position, extracted)?,
        },
        Expr::Chain(inner) => Expr::Chain(Box::new(rewrite_expr(inner, slot, position, extracted)?)),
        Expr::DynamicImport(inner) => Expr::DynamicImport(Box::new(rewrite_expr(inner, slot, position, extracted)?)),
        Expr::Sequence(parts) => Expr::Sequence(rewrite_vec(parts, slot, position, extracted)?),
        Expr::Class(_) => expr.expr.clone(),
        Expr::SuperMember(key) => Expr::SuperMember(rewrite_member_key(key, slot, position, extracted)?),
        Expr::SuperCall(args) => Expr::SuperCall(rewrite_args(args, slot, position, extracted)?),
    };
    Some(ExprLoc::new(rewritten, range))
}

fn rewrite_vec(
    exprs: &[ExprLoc],
    slot: ResumeSlotId,
    position: Position,
    extracted: &mut Option<ExtractedSite>,
) -> Option<Vec<ExprLoc>> {
    exprs.iter().map(|e| rewrite_expr(e, slot, position, extracted)).collect()
}

fn rewrite_args(
    args: &[Argument],
    slot: ResumeSlotId,
    position: Position,
    extracted: &mut Option<ExtractedSite>,
) -> Option<Vec<Argument>> {
    args.iter()
        .map(|arg| {
            Some(match arg {
                Argument::Expr(e) => Argument::Expr(rewrite_expr(e, slot, position, extracted)?),
                Argument::Spread(e) => Argument::Spread(rewrite_expr(e, slot, position, extracted)?),
            })
        })
        .collect()
}

fn rewrite_member_key(
    key: &MemberKey,
    slot: ResumeSlotId,
    position: Position,
    extracted: &mut Option<ExtractedSite>,
) -> Option<MemberKey> {
    Some(match key {
        MemberKey::Computed(e) => MemberKey::Computed(Box::new(rewrite_expr(e, slot, position, extracted)?)),
        other => other.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{intern::Interns, parse::parse_program};

    fn first_expr(src: &str) -> (ExprLoc, Vec<Rc<FunctionDef>>) {
        let mut interns = Interns::new();
        let mut funcs = Vec::new();
        let program = parse_program(src, &mut interns, &mut funcs).expect("parse");
        // Reach into the generator body's first statement.
        let FunctionBody::Block(body) = &funcs[0].body else {
            panic!("expected block body");
        };
        let Stmt::Expr(expr) = &body[0].stmt else {
            panic!("expected expression statement");
        };
        (expr.clone(), funcs.clone())
    }

    #[test]
    fn counts_exclude_nested_functions() {
        let (expr, funcs) = first_expr("function* g() { f(yield 1, () => other); }");
        let counts = analyze_expr(&expr, AnalyzeOpts::default());
        assert_eq!(counts.yield_count, 1);
        assert_eq!(counts.await_count, 0);
        let _ = funcs;
    }

    #[test]
    fn rewrite_replaces_site() {
        let (expr, _) = first_expr("function* g() { use(1 + (yield probe())); }");
        let (rewritten, site) = try_rewrite_single_suspension(&expr, ResumeSlotId(0)).expect("rewritable");
        assert_eq!(site.kind, SuspendKind::Yield);
        assert!(site.argument.is_some());
        let counts = analyze_expr(&rewritten, AnalyzeOpts::default());
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn two_sites_refuse_rewrite() {
        let (expr, _) = first_expr("function* g() { use((yield 1) + (yield 2)); }");
        assert!(try_rewrite_single_suspension(&expr, ResumeSlotId(0)).is_none());
    }

    #[test]
    fn conditional_position_refuses_rewrite() {
        let (expr, _) = first_expr("function* g() { use(flag && (yield 1)); }");
        assert!(try_rewrite_single_suspension(&expr, ResumeSlotId(0)).is_none());
    }
}
