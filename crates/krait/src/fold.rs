//! Constant folding.
//!
//! A pure AST-to-AST pass that collapses arithmetic, logical, and
//! string-concatenation subtrees whose operands are primitive literals, plus
//! `typeof` of a literal and ternaries with a literal test. Folding never
//! crosses anything with an observable side effect, and the folded node keeps
//! the original node's source range.

use std::rc::Rc;

use crate::{
    ast::{
        Argument, ArrayElement, BinaryOp, Expr, ExprLoc, ForInit, FunctionBody, FunctionDef, Literal, LogicalOp,
        ObjectProp, Program, Stmt, StmtLoc, UnaryOp,
    },
    intern::Interns,
};

/// Folds a parsed program in place, including all function bodies.
pub(crate) fn fold_program(program: &mut Program, funcs: &mut [Rc<FunctionDef>], interns: &mut Interns) {
    for stmt in &mut program.body {
        fold_stmt(stmt, interns);
    }
    for func in funcs.iter_mut() {
        let func = Rc::get_mut(func).expect("definitions are unshared until first call");
        match &mut func.body {
            FunctionBody::Block(body) => {
                for stmt in body {
                    fold_stmt(stmt, interns);
                }
            }
            FunctionBody::Expr(expr) => fold_expr(expr, interns),
        }
    }
}

fn fold_stmt(stmt: &mut StmtLoc, interns: &mut Interns) {
    match &mut stmt.stmt {
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::ExportDefault(e) => fold_expr(e, interns),
        Stmt::VarDecl { declarators, .. } => {
            for decl in declarators {
                if let Some(init) = &mut decl.init {
                    fold_expr(init, interns);
                }
            }
        }
        Stmt::Return(Some(e)) => fold_expr(e, interns),
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            fold_expr(test, interns);
            fold_stmt(consequent, interns);
            if let Some(alternate) = alternate {
                fold_stmt(alternate, interns);
            }
        }
        Stmt::Block(body) => {
            for stmt in body {
                fold_stmt(stmt, interns);
            }
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Expr(e)) => fold_expr(e, interns),
                Some(ForInit::VarDecl { declarators, .. }) => {
                    for decl in declarators {
                        if let Some(init) = &mut decl.init {
                            fold_expr(init, interns);
                        }
                    }
                }
                None => {}
            }
            if let Some(test) = test {
                fold_expr(test, interns);
            }
            if let Some(update) = update {
                fold_expr(update, interns);
            }
            fold_stmt(body, interns);
        }
        Stmt::ForIn { object: e, body, .. } => {
            fold_expr(e, interns);
            fold_stmt(body, interns);
        }
        Stmt::ForOf { iterable: e, body, .. } => {
            fold_expr(e, interns);
            fold_stmt(body, interns);
        }
        Stmt::While { test, body } => {
            fold_expr(test, interns);
            fold_stmt(body, interns);
        }
        Stmt::DoWhile { body, test } => {
            fold_stmt(body, interns);
            fold_expr(test, interns);
        }
        Stmt::Switch { discriminant, cases } => {
            fold_expr(discriminant, interns);
            for case in cases {
                if let Some(test) = &mut case.test {
                    fold_expr(test, interns);
                }
                for stmt in &mut case.body {
                    fold_stmt(stmt, interns);
                }
            }
        }
        Stmt::Labeled { body, .. } => fold_stmt(body, interns),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            for stmt in block {
                fold_stmt(stmt, interns);
            }
            if let Some(handler) = handler {
                for stmt in &mut handler.body {
                    fold_stmt(stmt, interns);
                }
            }
            if let Some(finalizer) = finalizer {
                for stmt in finalizer {
                    fold_stmt(stmt, interns);
                }
            }
        }
        Stmt::ExportDecl(inner) => fold_stmt(inner, interns),
        _ => {}
    }
}

fn fold_expr(expr: &mut ExprLoc, interns: &mut Interns) {
    // Fold children first, then try to collapse this node.
    match &mut expr.expr {
        Expr::Array(elements) => {
            for element in elements {
                match element {
                    ArrayElement::Hole => {}
                    ArrayElement::Item(e) | ArrayElement::Spread(e) => fold_expr(e, interns),
                }
            }
        }
        Expr::Object(props) => {
            for prop in props {
                match prop {
                    ObjectProp::KeyValue { value, .. } => fold_expr(value, interns),
                    ObjectProp::Spread(e) => fold_expr(e, interns),
                    _ => {}
                }
            }
        }
        Expr::Template { exprs, .. } => {
            for e in exprs {
                fold_expr(e, interns);
            }
        }
        Expr::TaggedTemplate { tag, exprs, .. } => {
            fold_expr(tag, interns);
            for e in exprs {
                fold_expr(e, interns);
            }
        }
        Expr::Unary { operand, .. } => fold_expr(operand, interns),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            fold_expr(left, interns);
            fold_expr(right, interns);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            fold_expr(test, interns);
            fold_expr(consequent, interns);
            fold_expr(alternate, interns);
        }
        Expr::Assign { value, .. } => fold_expr(value, interns),
        Expr::Member { object, .. } => fold_expr(object, interns),
        Expr::Call { callee, args, .. } => {
            fold_expr(callee, interns);
            fold_args(args, interns);
        }
        Expr::New { callee, args } => {
            fold_expr(callee, interns);
            fold_args(args, interns);
        }
        Expr::Chain(inner) | Expr::DynamicImport(inner) | Expr::Await(inner) => fold_expr(inner, interns),
        Expr::Sequence(parts) => {
            for part in parts {
                fold_expr(part, interns);
            }
        }
        Expr::Yield { argument, .. } => {
            if let Some(argument) = argument {
                fold_expr(argument, interns);
            }
        }
        _ => {}
    }

    if let Some(folded) = try_fold(&expr.expr, interns) {
        expr.expr = Expr::Literal(folded);
    }
}

fn fold_args(args: &mut [Argument], interns: &mut Interns) {
    for arg in args {
        match arg {
            Argument::Expr(e) | Argument::Spread(e) => fold_expr(e, interns),
        }
    }
}

fn literal_of(expr: &Expr) -> Option<&Literal> {
    match expr {
        Expr::Literal(lit) => Some(lit),
        _ => None,
    }
}

fn truthy(lit: &Literal, interns: &Interns) -> Option<bool> {
    Some(match lit {
        Literal::Null => false,
        Literal::Bool(b) => *b,
        Literal::Number(n) => *n != 0.0 && !n.is_nan(),
        Literal::Str(s) => !interns.get(*s).is_empty(),
        Literal::BigInt(b) => !num_traits::Zero::is_zero(&**b),
        Literal::Regex { .. } => return None,
    })
}

fn try_fold(expr: &Expr, interns: &mut Interns) -> Option<Literal> {
    match expr {
        Expr::Unary { op, operand } => {
            let lit = literal_of(&operand.expr)?;
            match (op, lit) {
                (UnaryOp::Neg, Literal::Number(n)) => Some(Literal::Number(-n)),
                (UnaryOp::Plus, Literal::Number(n)) => Some(Literal::Number(*n)),
                (UnaryOp::Not, lit) => truthy(lit, interns).map(|b| Literal::Bool(!b)),
                (UnaryOp::TypeOf, lit) => {
                    let name = match lit {
                        Literal::Null => "object",
                        Literal::Bool(_) => "boolean",
                        Literal::Number(_) => "number",
                        Literal::Str(_) => "string",
                        Literal::BigInt(_) => "bigint",
                        Literal::Regex { .. } => return None,
                    };
                    Some(Literal::Str(interns.intern(name)))
                }
                (UnaryOp::Void, _) => None,
                _ => None,
            }
        }
        Expr::Binary { op, left, right } => {
            let left = literal_of(&left.expr)?;
            let right = literal_of(&right.expr)?;
            match (left, right) {
                (Literal::Number(a), Literal::Number(b)) => {
                    let (a, b) = (*a, *b);
                    let n = match op {
                        BinaryOp::Add => a + b,
                        BinaryOp::Sub => a - b,
                        BinaryOp::Mul => a * b,
                        BinaryOp::Div => a / b,
                        BinaryOp::Rem => a % b,
                        BinaryOp::Exp => a.powf(b),
                        _ => return None,
                    };
                    Some(Literal::Number(n))
                }
                (Literal::Str(a), Literal::Str(b)) if *op == BinaryOp::Add => {
                    let mut s = interns.get(*a).to_owned();
                    s.push_str(interns.get(*b));
                    Some(Literal::Str(interns.intern_owned(s)))
                }
                _ => None,
            }
        }
        Expr::Logical { op, left, right } => {
            let left_lit = literal_of(&left.expr)?;
            let take_left = match op {
                LogicalOp::And => !truthy(left_lit, interns)?,
                LogicalOp::Or => truthy(left_lit, interns)?,
                LogicalOp::Nullish => !matches!(left_lit, Literal::Null),
            };
            if take_left {
                Some(left_lit.clone())
            } else {
                literal_of(&right.expr).cloned()
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let test = literal_of(&test.expr)?;
            let branch = if truthy(test, interns)? { consequent } else { alternate };
            literal_of(&branch.expr).cloned()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_program;

    fn folded_first(src: &str) -> Expr {
        let mut interns = Interns::new();
        let mut funcs = Vec::new();
        let mut program = parse_program(src, &mut interns, &mut funcs).expect("parse");
        fold_program(&mut program, &mut funcs, &mut interns);
        let Stmt::Expr(expr) = &program.body[0].stmt else {
            panic!("expected expression statement");
        };
        expr.expr.clone()
    }

    #[test]
    fn arithmetic_folds() {
        assert!(matches!(folded_first("(1 + 2) * 3;"), Expr::Literal(Literal::Number(n)) if n == 9.0));
        assert!(matches!(folded_first("2 ** 10;"), Expr::Literal(Literal::Number(n)) if n == 1024.0));
    }

    #[test]
    fn string_concat_folds() {
        let mut interns = Interns::new();
        let mut funcs = Vec::new();
        let mut program = parse_program("'foo' + 'bar';", &mut interns, &mut funcs).unwrap();
        fold_program(&mut program, &mut funcs, &mut interns);
        let Stmt::Expr(expr) = &program.body[0].stmt else { panic!() };
        let Expr::Literal(Literal::Str(s)) = &expr.expr else {
            panic!("expected folded string");
        };
        assert_eq!(interns.get(*s), "foobar");
    }

    #[test]
    fn ternary_with_literal_test_folds() {
        assert!(matches!(folded_first("true ? 1 : 2;"), Expr::Literal(Literal::Number(n)) if n == 1.0));
    }

    #[test]
    fn calls_never_fold() {
        assert!(matches!(folded_first("f(1 + 2);"), Expr::Call { .. }));
    }

    #[test]
    fn typeof_literal_folds() {
        let mut interns = Interns::new();
        let mut funcs = Vec::new();
        let mut program = parse_program("typeof 1;", &mut interns, &mut funcs).unwrap();
        fold_program(&mut program, &mut funcs, &mut interns);
        let Stmt::Expr(expr) = &program.body[0].stmt else { panic!() };
        let Expr::Literal(Literal::Str(s)) = &expr.expr else {
            panic!("expected folded string");
        };
        assert_eq!(interns.get(*s), "number");
    }
}
