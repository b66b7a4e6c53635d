//! Parser: token stream to typed AST.
//!
//! Statements are parsed by recursive descent; expressions by precedence
//! climbing with explicit binding powers, which keeps ES2015's operator table
//! (right-associative `**`, the `??` mixing restriction, ternary
//! right-associativity) in one place.
//!
//! Function bodies are appended to the engine-wide function table as they are
//! parsed; the AST refers to them by [`FunctionId`].
//!
//! Automatic semicolon insertion follows the three classic rules: a statement
//! may end at a line break when the next token cannot continue it, at `}` or
//! EOF, and restricted productions (`return`, `throw`, `break`, `continue`,
//! postfix `++`/`--`) never span a line break.

use std::rc::Rc;

use crate::{
    ast::{
        Argument, ArrayElement, ArrayPatternElem, AssignOp, AssignTarget, BinaryOp, CatchClause, ClassDef, ClassMember,
        CodeRange, DeclKind, Declarator, ExportSpecifier, Expr, ExprLoc, ForHead, ForInit, FunctionBody, FunctionDef,
        ImportSpecifier, Literal, LogicalOp, MemberKey, MethodKind, ObjectPatternProp, ObjectProp, Param, Pattern,
        Program, PropName, Stmt, StmtLoc, SwitchCase, UnaryOp,
    },
    error::ParseError,
    intern::{FunctionId, Interns, StringId},
    lexer::{Keyword, Lexer, Punct, Token, TokenKind},
};

/// Contextual keyword ids, interned once at parser construction.
struct ContextualIds {
    of: StringId,
    from: StringId,
    as_: StringId,
    get: StringId,
    set: StringId,
    static_: StringId,
    async_: StringId,
    constructor: StringId,
    use_strict: StringId,
}

/// Maximum nesting depth for expressions and statements, preventing stack
/// overflow from shapes like `((((x))))`.
const MAX_NESTING_DEPTH: u16 = 200;

/// Parser state.
pub struct Parser<'src, 'int, 'f> {
    lexer: Lexer<'src, 'int>,
    current: Token,
    funcs: &'f mut Vec<Rc<FunctionDef>>,
    ids: ContextualIds,
    strict: bool,
    in_generator: bool,
    in_async: bool,
    in_method: bool,
    in_derived_constructor: bool,
    is_module: bool,
    depth: u16,
}

type PResult<T> = Result<T, ParseError>;

/// Parses a complete program or module, appending function definitions to
/// `funcs`.
pub fn parse_program(
    source: &str,
    interns: &mut Interns,
    funcs: &mut Vec<Rc<FunctionDef>>,
) -> Result<Program, ParseError> {
    let ids = ContextualIds {
        of: interns.intern("of"),
        from: interns.intern("from"),
        as_: interns.intern("as"),
        get: interns.intern("get"),
        set: interns.intern("set"),
        static_: interns.intern("static"),
        async_: interns.intern("async"),
        constructor: interns.intern("constructor"),
        use_strict: interns.intern("use strict"),
    };
    let mut lexer = Lexer::new(source, interns);
    let current = lexer.next_token()?;
    let mut parser = Parser {
        lexer,
        current,
        funcs,
        ids,
        strict: false,
        in_generator: false,
        in_async: false,
        in_method: false,
        in_derived_constructor: false,
        is_module: false,
        depth: 0,
    };
    parser.parse_program_body()
}

impl Parser<'_, '_, '_> {
    // === token plumbing ===

    fn bump(&mut self) -> PResult<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, p: Punct, what: &str) -> PResult<Token> {
        if self.current.is(p) {
            self.bump()
        } else {
            Err(self.unexpected(what))
        }
    }

    fn eat(&mut self, p: Punct) -> PResult<bool> {
        if self.current.is(p) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match &self.current.kind {
            TokenKind::Eof => "end of input".to_owned(),
            TokenKind::Ident(_) => "identifier".to_owned(),
            other => format!("{other:?}"),
        };
        ParseError {
            position: self.current.range.start,
            line: self.current.range.line,
            column: self.current.range.col,
            message: format!("expected {expected}, found {found}"),
        }
    }

    fn error_at(&self, range: CodeRange, message: impl Into<String>) -> ParseError {
        ParseError {
            position: range.start,
            line: range.line,
            column: range.col,
            message: message.into(),
        }
    }

    /// Consumes a statement terminator per the ASI rules.
    fn eat_semi(&mut self) -> PResult<()> {
        if self.current.is(Punct::Semi) {
            self.bump()?;
            return Ok(());
        }
        if self.current.is(Punct::RBrace) || self.current.kind == TokenKind::Eof || self.current.newline_before {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    fn is_contextual(&self, id: StringId) -> bool {
        matches!(self.current.kind, TokenKind::Ident(name) if name == id)
    }

    fn eat_contextual(&mut self, id: StringId) -> PResult<bool> {
        if self.is_contextual(id) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // === program ===

    fn parse_program_body(&mut self) -> PResult<Program> {
        self.strict = self.parse_directives()?;
        let mut body = Vec::new();
        while self.current.kind != TokenKind::Eof {
            let stmt = self.parse_statement()?;
            if matches!(
                stmt.stmt,
                Stmt::Import { .. } | Stmt::ExportNamed { .. } | Stmt::ExportDecl(_) | Stmt::ExportDefault(_) | Stmt::ExportAll { .. }
            ) {
                self.is_module = true;
            }
            body.push(stmt);
        }
        Ok(Program {
            body,
            is_strict: self.strict,
            is_module: self.is_module,
        })
    }

    /// Scans a directive prologue; returns true if `"use strict"` appears.
    /// The directives stay in the token stream as ordinary expression
    /// statements, so nothing is consumed here beyond peeking the current
    /// token; instead we recognize the directive lazily: a leading string
    /// literal statement whose value is `use strict`.
    fn parse_directives(&mut self) -> PResult<bool> {
        // Only the first statement can enable strict mode for our purposes;
        // nested directives after other statements are treated as plain
        // expression statements.
        if let TokenKind::Str(s) = self.current.kind {
            if s == self.ids.use_strict {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // === statements ===

    fn parse_statement(&mut self) -> PResult<StmtLoc> {
        self.enter_nesting()?;
        let result = self.parse_statement_depth_checked();
        self.depth -= 1;
        result
    }

    fn parse_statement_depth_checked(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        match &self.current.kind {
            TokenKind::Punct(Punct::LBrace) => {
                self.bump()?;
                let body = self.parse_block_body()?;
                Ok(StmtLoc::new(Stmt::Block(body), start))
            }
            TokenKind::Punct(Punct::Semi) => {
                self.bump()?;
                Ok(StmtLoc::new(Stmt::Empty, start))
            }
            TokenKind::Keyword(Keyword::Var) => self.parse_var_statement(DeclKind::Var),
            TokenKind::Keyword(Keyword::Let) => self.parse_var_statement(DeclKind::Let),
            TokenKind::Keyword(Keyword::Const) => self.parse_var_statement(DeclKind::Const),
            TokenKind::Keyword(Keyword::Function) => {
                self.bump()?;
                let is_generator = self.eat(Punct::Star)?;
                let (name, func) = self.parse_function_rest(false, is_generator, true)?;
                let name = name.ok_or_else(|| self.error_at(start, "function declaration requires a name"))?;
                Ok(StmtLoc::new(Stmt::FunctionDecl { name, func }, start))
            }
            TokenKind::Keyword(Keyword::Class) => {
                let class = self.parse_class()?;
                Ok(StmtLoc::new(Stmt::ClassDecl(Box::new(class)), start))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Return) => {
                self.bump()?;
                let argument = if self.current.is(Punct::Semi)
                    || self.current.is(Punct::RBrace)
                    || self.current.kind == TokenKind::Eof
                    || self.current.newline_before
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.eat_semi()?;
                Ok(StmtLoc::new(Stmt::Return(argument), start))
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.bump()?;
                let label = self.parse_opt_label()?;
                self.eat_semi()?;
                Ok(StmtLoc::new(Stmt::Break(label), start))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump()?;
                let label = self.parse_opt_label()?;
                self.eat_semi()?;
                Ok(StmtLoc::new(Stmt::Continue(label), start))
            }
            TokenKind::Keyword(Keyword::Throw) => {
                self.bump()?;
                if self.current.newline_before {
                    return Err(self.error_at(start, "newline not allowed after 'throw'"));
                }
                let argument = self.parse_expression()?;
                self.eat_semi()?;
                Ok(StmtLoc::new(Stmt::Throw(argument), start))
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            TokenKind::Keyword(Keyword::Export) => self.parse_export(),
            TokenKind::Ident(name) => {
                let name = *name;
                // `async function` declaration.
                if name == self.ids.async_ {
                    let state = self.lexer.state();
                    let saved = self.current.clone();
                    self.bump()?;
                    if self.current.is_kw(Keyword::Function) && !self.current.newline_before {
                        self.bump()?;
                        let is_generator = self.eat(Punct::Star)?;
                        let (fname, func) = self.parse_function_rest(true, is_generator, true)?;
                        let fname = fname.ok_or_else(|| self.error_at(start, "function declaration requires a name"))?;
                        return Ok(StmtLoc::new(Stmt::FunctionDecl { name: fname, func }, start));
                    }
                    self.lexer.restore(state);
                    self.current = saved;
                }
                // Labeled statement: `ident :`.
                let state = self.lexer.state();
                let saved = self.current.clone();
                self.bump()?;
                if self.current.is(Punct::Colon) {
                    self.bump()?;
                    let body = self.parse_statement()?;
                    return Ok(StmtLoc::new(
                        Stmt::Labeled {
                            label: name,
                            body: Box::new(body),
                        },
                        start,
                    ));
                }
                self.lexer.restore(state);
                self.current = saved;
                self.parse_expression_statement()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_opt_label(&mut self) -> PResult<Option<StringId>> {
        if self.current.newline_before {
            return Ok(None);
        }
        if let TokenKind::Ident(name) = self.current.kind {
            self.bump()?;
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    fn parse_expression_statement(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        let expr = self.parse_expression()?;
        self.eat_semi()?;
        Ok(StmtLoc::new(Stmt::Expr(expr), start))
    }

    fn parse_block_body(&mut self) -> PResult<Vec<StmtLoc>> {
        let mut body = Vec::new();
        while !self.current.is(Punct::RBrace) {
            if self.current.kind == TokenKind::Eof {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.bump()?;
        Ok(body)
    }

    fn parse_var_statement(&mut self, kind: DeclKind) -> PResult<StmtLoc> {
        let start = self.current.range;
        self.bump()?;
        let declarators = self.parse_declarator_list(kind)?;
        self.eat_semi()?;
        Ok(StmtLoc::new(Stmt::VarDecl { kind, declarators }, start))
    }

    fn parse_declarator_list(&mut self, kind: DeclKind) -> PResult<Vec<Declarator>> {
        let mut declarators = Vec::new();
        loop {
            let target = self.parse_binding_pattern()?;
            let init = if self.eat(Punct::Assign)? {
                Some(self.parse_assignment_expr()?)
            } else {
                if kind == DeclKind::Const {
                    return Err(self.unexpected("initializer for const declaration"));
                }
                if !matches!(target, Pattern::Ident(_)) {
                    return Err(self.unexpected("initializer for destructuring declaration"));
                }
                None
            };
            declarators.push(Declarator { target, init });
            if !self.eat(Punct::Comma)? {
                break;
            }
        }
        Ok(declarators)
    }

    fn parse_if(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        self.bump()?;
        self.expect(Punct::LParen, "'('")?;
        let test = self.parse_expression()?;
        self.expect(Punct::RParen, "')'")?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.current.is_kw(Keyword::Else) {
            self.bump()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtLoc::new(
            Stmt::If {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    fn parse_while(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        self.bump()?;
        self.expect(Punct::LParen, "'('")?;
        let test = self.parse_expression()?;
        self.expect(Punct::RParen, "')'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtLoc::new(Stmt::While { test, body }, start))
    }

    fn parse_do_while(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        self.bump()?;
        let body = Box::new(self.parse_statement()?);
        if !self.current.is_kw(Keyword::While) {
            return Err(self.unexpected("'while'"));
        }
        self.bump()?;
        self.expect(Punct::LParen, "'('")?;
        let test = self.parse_expression()?;
        self.expect(Punct::RParen, "')'")?;
        // do-while accepts ASI even without a newline.
        let _ = self.eat(Punct::Semi)?;
        Ok(StmtLoc::new(Stmt::DoWhile { body, test }, start))
    }

    fn parse_for(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        self.bump()?;
        let is_await = self.current.is_kw(Keyword::Await) && {
            self.bump()?;
            true
        };
        self.expect(Punct::LParen, "'('")?;

        // Declaration head.
        let decl_kind = match self.current.kind {
            TokenKind::Keyword(Keyword::Var) => Some(DeclKind::Var),
            TokenKind::Keyword(Keyword::Let) => Some(DeclKind::Let),
            TokenKind::Keyword(Keyword::Const) => Some(DeclKind::Const),
            _ => None,
        };
        if let Some(kind) = decl_kind {
            self.bump()?;
            let target = self.parse_binding_pattern()?;
            if self.is_contextual(self.ids.of) {
                self.bump()?;
                let iterable = self.parse_assignment_expr()?;
                self.expect(Punct::RParen, "')'")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(StmtLoc::new(
                    Stmt::ForOf {
                        head: ForHead::Decl { kind, target },
                        iterable,
                        body,
                        is_await,
                    },
                    start,
                ));
            }
            if self.current.is_kw(Keyword::In) {
                self.bump()?;
                let object = self.parse_expression()?;
                self.expect(Punct::RParen, "')'")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(StmtLoc::new(
                    Stmt::ForIn {
                        head: ForHead::Decl { kind, target },
                        object,
                        body,
                    },
                    start,
                ));
            }
            if is_await {
                return Err(self.error_at(start, "'for await' requires 'of'"));
            }
            // Classic for with declaration init.
            let mut declarators = Vec::new();
            let init = if self.eat(Punct::Assign)? {
                Some(self.parse_assignment_expr_no_in()?)
            } else {
                None
            };
            declarators.push(Declarator { target, init });
            while self.eat(Punct::Comma)? {
                let target = self.parse_binding_pattern()?;
                let init = if self.eat(Punct::Assign)? {
                    Some(self.parse_assignment_expr_no_in()?)
                } else {
                    None
                };
                declarators.push(Declarator { target, init });
            }
            self.expect(Punct::Semi, "';'")?;
            return self.parse_for_tail(start, Some(ForInit::VarDecl { kind, declarators }));
        }

        if self.current.is(Punct::Semi) {
            if is_await {
                return Err(self.error_at(start, "'for await' requires 'of'"));
            }
            self.bump()?;
            return self.parse_for_tail(start, None);
        }

        // Expression head: may turn out to be for-in / for-of.
        let first = self.parse_expr_no_in()?;
        if self.is_contextual(self.ids.of) {
            self.bump()?;
            let pattern = self.expr_to_pattern(&first)?;
            let iterable = self.parse_assignment_expr()?;
            self.expect(Punct::RParen, "')'")?;
            let body = Box::new(self.parse_statement()?);
            return Ok(StmtLoc::new(
                Stmt::ForOf {
                    head: ForHead::Pattern(pattern),
                    iterable,
                    body,
                    is_await,
                },
                start,
            ));
        }
        if self.current.is_kw(Keyword::In) {
            self.bump()?;
            let pattern = self.expr_to_pattern(&first)?;
            let object = self.parse_expression()?;
            self.expect(Punct::RParen, "')'")?;
            let body = Box::new(self.parse_statement()?);
            return Ok(StmtLoc::new(
                Stmt::ForIn {
                    head: ForHead::Pattern(pattern),
                    object,
                    body,
                },
                start,
            ));
        }
        if is_await {
            return Err(self.error_at(start, "'for await' requires 'of'"));
        }
        self.expect(Punct::Semi, "';'")?;
        self.parse_for_tail(start, Some(ForInit::Expr(first)))
    }

    fn parse_for_tail(&mut self, start: CodeRange, init: Option<ForInit>) -> PResult<StmtLoc> {
        let test = if self.current.is(Punct::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Punct::Semi, "';'")?;
        let update = if self.current.is(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Punct::RParen, "')'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtLoc::new(
            Stmt::For {
                init,
                test,
                update,
                body,
            },
            start,
        ))
    }

    fn parse_switch(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        self.bump()?;
        self.expect(Punct::LParen, "'('")?;
        let discriminant = self.parse_expression()?;
        self.expect(Punct::RParen, "')'")?;
        self.expect(Punct::LBrace, "'{'")?;
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.current.is(Punct::RBrace) {
            let test = if self.current.is_kw(Keyword::Case) {
                self.bump()?;
                let test = self.parse_expression()?;
                Some(test)
            } else if self.current.is_kw(Keyword::Default) {
                if seen_default {
                    return Err(self.unexpected("at most one 'default' clause"));
                }
                seen_default = true;
                self.bump()?;
                None
            } else {
                return Err(self.unexpected("'case' or 'default'"));
            };
            self.expect(Punct::Colon, "':'")?;
            let mut body = Vec::new();
            while !self.current.is(Punct::RBrace)
                && !self.current.is_kw(Keyword::Case)
                && !self.current.is_kw(Keyword::Default)
            {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.bump()?;
        Ok(StmtLoc::new(Stmt::Switch { discriminant, cases }, start))
    }

    fn parse_try(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        self.bump()?;
        self.expect(Punct::LBrace, "'{'")?;
        let block = self.parse_block_body()?;
        let handler = if self.current.is_kw(Keyword::Catch) {
            self.bump()?;
            let param = if self.eat(Punct::LParen)? {
                let pattern = self.parse_binding_pattern()?;
                self.expect(Punct::RParen, "')'")?;
                Some(pattern)
            } else {
                None
            };
            self.expect(Punct::LBrace, "'{'")?;
            let body = self.parse_block_body()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.current.is_kw(Keyword::Finally) {
            self.bump()?;
            self.expect(Punct::LBrace, "'{'")?;
            Some(self.parse_block_body()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_at(start, "'try' requires 'catch' or 'finally'"));
        }
        Ok(StmtLoc::new(
            Stmt::Try {
                block,
                handler,
                finalizer,
            },
            start,
        ))
    }

    // === modules ===

    fn parse_import(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        self.bump()?;
        // `import(...)`: dynamic import in expression-statement position.
        if self.current.is(Punct::LParen) {
            self.bump()?;
            let specifier = self.parse_assignment_expr()?;
            self.expect(Punct::RParen, "')'")?;
            let mut expr = ExprLoc::new(Expr::DynamicImport(Box::new(specifier)), start);
            expr = self.parse_postfix_chain(expr)?;
            let expr = self.parse_expression_from(expr)?;
            self.eat_semi()?;
            return Ok(StmtLoc::new(Stmt::Expr(expr), start));
        }

        let mut specifiers = Vec::new();
        // `import 'module'`: bare side-effect import.
        if let TokenKind::Str(source) = self.current.kind {
            self.bump()?;
            self.eat_semi()?;
            return Ok(StmtLoc::new(Stmt::Import { specifiers, source }, start));
        }

        // Default binding.
        if let TokenKind::Ident(local) = self.current.kind {
            self.bump()?;
            specifiers.push(ImportSpecifier::Default(local));
            if self.eat(Punct::Comma)? {
                self.parse_import_clause_rest(&mut specifiers)?;
            }
        } else {
            self.parse_import_clause_rest(&mut specifiers)?;
        }

        if !self.eat_contextual(self.ids.from)? {
            return Err(self.unexpected("'from'"));
        }
        let TokenKind::Str(source) = self.current.kind else {
            return Err(self.unexpected("module specifier string"));
        };
        self.bump()?;
        self.eat_semi()?;
        Ok(StmtLoc::new(Stmt::Import { specifiers, source }, start))
    }

    fn parse_import_clause_rest(&mut self, specifiers: &mut Vec<ImportSpecifier>) -> PResult<()> {
        if self.eat(Punct::Star)? {
            if !self.eat_contextual(self.ids.as_)? {
                return Err(self.unexpected("'as'"));
            }
            let TokenKind::Ident(local) = self.current.kind else {
                return Err(self.unexpected("identifier"));
            };
            self.bump()?;
            specifiers.push(ImportSpecifier::Namespace(local));
            return Ok(());
        }
        self.expect(Punct::LBrace, "'{'")?;
        while !self.current.is(Punct::RBrace) {
            let imported = self.parse_module_export_name()?;
            let local = if self.eat_contextual(self.ids.as_)? {
                let TokenKind::Ident(local) = self.current.kind else {
                    return Err(self.unexpected("identifier"));
                };
                self.bump()?;
                local
            } else {
                imported
            };
            specifiers.push(ImportSpecifier::Named { imported, local });
            if !self.eat(Punct::Comma)? {
                break;
            }
        }
        self.expect(Punct::RBrace, "'}'")?;
        Ok(())
    }

    fn parse_module_export_name(&mut self) -> PResult<StringId> {
        match self.current.kind {
            TokenKind::Ident(name) | TokenKind::Str(name) => {
                self.bump()?;
                Ok(name)
            }
            TokenKind::Keyword(Keyword::Default) => {
                self.bump()?;
                // `default` as an export name is spelled like an identifier.
                Err(self.error_at(self.current.range, "'default' must be imported via a default binding"))
            }
            _ => Err(self.unexpected("export name")),
        }
    }

    fn parse_export(&mut self) -> PResult<StmtLoc> {
        let start = self.current.range;
        self.bump()?;
        if self.eat(Punct::Star)? {
            if !self.eat_contextual(self.ids.from)? {
                return Err(self.unexpected("'from'"));
            }
            let TokenKind::Str(source) = self.current.kind else {
                return Err(self.unexpected("module specifier string"));
            };
            self.bump()?;
            self.eat_semi()?;
            return Ok(StmtLoc::new(Stmt::ExportAll { source }, start));
        }
        if self.current.is_kw(Keyword::Default) {
            self.bump()?;
            let expr = if self.current.is_kw(Keyword::Function) || self.current.is_kw(Keyword::Class) {
                // `export default function f() {}` evaluates as an expression
                // whose binding (if named) is also installed.
                self.parse_assignment_expr()?
            } else {
                let expr = self.parse_assignment_expr()?;
                self.eat_semi()?;
                expr
            };
            return Ok(StmtLoc::new(Stmt::ExportDefault(expr), start));
        }
        if self.current.is(Punct::LBrace) {
            self.bump()?;
            let mut specifiers = Vec::new();
            while !self.current.is(Punct::RBrace) {
                let local = self.parse_module_export_name()?;
                let exported = if self.eat_contextual(self.ids.as_)? {
                    self.parse_module_export_name()?
                } else {
                    local
                };
                specifiers.push(ExportSpecifier { local, exported });
                if !self.eat(Punct::Comma)? {
                    break;
                }
            }
            self.expect(Punct::RBrace, "'}'")?;
            let source = if self.eat_contextual(self.ids.from)? {
                let TokenKind::Str(source) = self.current.kind else {
                    return Err(self.unexpected("module specifier string"));
                };
                self.bump()?;
                Some(source)
            } else {
                None
            };
            self.eat_semi()?;
            return Ok(StmtLoc::new(Stmt::ExportNamed { specifiers, source }, start));
        }
        // `export <declaration>`
        let decl = self.parse_statement()?;
        match &decl.stmt {
            Stmt::VarDecl { .. } | Stmt::FunctionDecl { .. } | Stmt::ClassDecl(_) => {}
            _ => return Err(self.error_at(start, "expected declaration after 'export'")),
        }
        Ok(StmtLoc::new(Stmt::ExportDecl(Box::new(decl)), start))
    }

    // === functions and classes ===

    /// Parses the remainder of a function after `function` (and `*`): an
    /// optional name, parameter list, and body.
    fn parse_function_rest(&mut self, is_async: bool, is_generator: bool, _is_decl: bool) -> PResult<(Option<StringId>, FunctionId)> {
        let start = self.current.range;
        let name = if let TokenKind::Ident(name) = self.current.kind {
            self.bump()?;
            Some(name)
        } else {
            None
        };
        let params = self.parse_params()?;
        let func = self.parse_function_body(FnCtx {
            name,
            params,
            is_async,
            is_generator,
            is_arrow: false,
            is_method: false,
            is_derived_constructor: false,
            range: start,
        })?;
        Ok((name, func))
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.expect(Punct::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.current.is(Punct::RParen) {
            if self.eat(Punct::DotDotDot)? {
                let pattern = self.parse_binding_pattern()?;
                params.push(Param {
                    pattern,
                    default: None,
                    rest: true,
                });
                break;
            }
            let pattern = self.parse_binding_pattern()?;
            let default = if self.eat(Punct::Assign)? {
                Some(self.parse_assignment_expr()?)
            } else {
                None
            };
            params.push(Param {
                pattern,
                default,
                rest: false,
            });
            if !self.eat(Punct::Comma)? {
                break;
            }
        }
        self.expect(Punct::RParen, "')'")?;
        Ok(params)
    }

    /// Parses a `{ ... }` function body and registers the definition.
    fn parse_function_body(&mut self, ctx: FnCtx) -> PResult<FunctionId> {
        self.expect(Punct::LBrace, "'{'")?;
        let outer_strict = self.strict;
        let outer_generator = self.in_generator;
        let outer_async = self.in_async;
        let outer_method = self.in_method;
        let outer_derived = self.in_derived_constructor;
        if let TokenKind::Str(s) = self.current.kind {
            if s == self.ids.use_strict {
                self.strict = true;
            }
        }
        self.in_generator = ctx.is_generator;
        self.in_async = ctx.is_async;
        self.in_method = ctx.is_method;
        self.in_derived_constructor = ctx.is_derived_constructor;
        let body = self.parse_block_body();
        let is_strict = self.strict;
        self.strict = outer_strict;
        self.in_generator = outer_generator;
        self.in_async = outer_async;
        self.in_method = outer_method;
        self.in_derived_constructor = outer_derived;
        let body = body?;
        let id = FunctionId::new(self.funcs.len());
        self.funcs.push(Rc::new(FunctionDef {
            name: ctx.name,
            params: ctx.params,
            body: FunctionBody::Block(body),
            is_arrow: ctx.is_arrow,
            is_async: ctx.is_async,
            is_generator: ctx.is_generator,
            is_strict,
            is_method: ctx.is_method,
            is_derived_constructor: ctx.is_derived_constructor,
            range: ctx.range,
        }));
        Ok(id)
    }

    fn parse_class(&mut self) -> PResult<ClassDef> {
        let range = self.current.range;
        self.bump()?;
        let name = if let TokenKind::Ident(name) = self.current.kind {
            self.bump()?;
            Some(name)
        } else {
            None
        };
        let parent = if self.current.is_kw(Keyword::Extends) {
            self.bump()?;
            Some(self.parse_unary_with_postfix()?)
        } else {
            None
        };
        let is_derived = parent.is_some();
        self.expect(Punct::LBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.current.is(Punct::RBrace) {
            if self.eat(Punct::Semi)? {
                continue;
            }
            members.push(self.parse_class_member(is_derived)?);
        }
        self.bump()?;
        Ok(ClassDef {
            name,
            parent,
            members,
            range,
        })
    }

    fn parse_class_member(&mut self, is_derived: bool) -> PResult<ClassMember> {
        let mut is_static = false;
        if self.is_contextual(self.ids.static_) {
            let state = self.lexer.state();
            let saved = self.current.clone();
            self.bump()?;
            if self.current.is(Punct::LParen) || self.current.is(Punct::Assign) || self.current.is(Punct::Semi) {
                // `static` used as a member name.
                self.lexer.restore(state);
                self.current = saved;
            } else {
                is_static = true;
            }
        }

        let mut is_async = false;
        let mut is_generator = false;
        let mut kind = MethodKind::Method;

        if self.is_contextual(self.ids.async_) {
            let state = self.lexer.state();
            let saved = self.current.clone();
            self.bump()?;
            if self.current.is(Punct::LParen) || self.current.is(Punct::Assign) {
                self.lexer.restore(state);
                self.current = saved;
            } else {
                is_async = true;
            }
        }
        if self.eat(Punct::Star)? {
            is_generator = true;
        }
        if !is_async && !is_generator && (self.is_contextual(self.ids.get) || self.is_contextual(self.ids.set)) {
            let is_get = self.is_contextual(self.ids.get);
            let state = self.lexer.state();
            let saved = self.current.clone();
            self.bump()?;
            if self.current.is(Punct::LParen) || self.current.is(Punct::Assign) || self.current.is(Punct::Semi) {
                self.lexer.restore(state);
                self.current = saved;
            } else {
                kind = if is_get { MethodKind::Getter } else { MethodKind::Setter };
            }
        }

        let key = self.parse_prop_name()?;

        if self.current.is(Punct::LParen) {
            let is_constructor = kind == MethodKind::Method
                && !is_static
                && !is_async
                && !is_generator
                && matches!(&key, PropName::Ident(id) if *id == self.ids.constructor);
            let params = self.parse_params()?;
            let name = prop_name_id(&key);
            let func = self.parse_function_body(FnCtx {
                name,
                params,
                is_async,
                is_generator,
                is_arrow: false,
                is_method: true,
                is_derived_constructor: is_constructor && is_derived,
                range: self.current.range,
            })?;
            let kind = if is_constructor { MethodKind::Constructor } else { kind };
            return Ok(ClassMember::Method {
                kind,
                key,
                is_static,
                func,
            });
        }

        // Field.
        let value = if self.eat(Punct::Assign)? {
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };
        self.eat_semi()?;
        Ok(ClassMember::Field { key, is_static, value })
    }

    fn parse_prop_name(&mut self) -> PResult<PropName> {
        match self.current.kind.clone() {
            TokenKind::Ident(name) => {
                self.bump()?;
                Ok(PropName::Ident(name))
            }
            TokenKind::Keyword(kw) => {
                // Keywords are valid property names.
                self.bump()?;
                Ok(PropName::Ident(self.keyword_name(kw)))
            }
            TokenKind::Str(s) => {
                self.bump()?;
                Ok(PropName::Str(s))
            }
            TokenKind::Num(n) => {
                self.bump()?;
                Ok(PropName::Num(n))
            }
            TokenKind::PrivateName(name) => {
                self.bump()?;
                Ok(PropName::Private(name))
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.bump()?;
                let expr = self.parse_assignment_expr()?;
                self.expect(Punct::RBracket, "']'")?;
                Ok(PropName::Computed(Box::new(expr)))
            }
            _ => Err(self.unexpected("property name")),
        }
    }

    fn keyword_name(&mut self, kw: Keyword) -> StringId {
        let text = match kw {
            Keyword::Var => "var",
            Keyword::Let => "let",
            Keyword::Const => "const",
            Keyword::Function => "function",
            Keyword::Return => "return",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::While => "while",
            Keyword::Do => "do",
            Keyword::Switch => "switch",
            Keyword::Case => "case",
            Keyword::Default => "default",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::New => "new",
            Keyword::Delete => "delete",
            Keyword::Typeof => "typeof",
            Keyword::Instanceof => "instanceof",
            Keyword::In => "in",
            Keyword::Void => "void",
            Keyword::This => "this",
            Keyword::Null => "null",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Catch => "catch",
            Keyword::Finally => "finally",
            Keyword::Class => "class",
            Keyword::Extends => "extends",
            Keyword::Super => "super",
            Keyword::Import => "import",
            Keyword::Export => "export",
            Keyword::Yield => "yield",
            Keyword::Await => "await",
        };
        self.lexer_interns().intern(text)
    }

    fn lexer_interns(&mut self) -> &mut Interns {
        // The lexer owns the &mut Interns; route contextual interning
        // through it.
        self.lexer.interns_mut()
    }

    // === patterns ===

    fn parse_binding_pattern(&mut self) -> PResult<Pattern> {
        match self.current.kind {
            TokenKind::Ident(name) => {
                self.bump()?;
                Ok(Pattern::Ident(name))
            }
            TokenKind::Keyword(Keyword::Yield) if !self.in_generator => {
                self.bump()?;
                let name = self.lexer_interns().intern("yield");
                Ok(Pattern::Ident(name))
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.bump()?;
                let mut elems = Vec::new();
                while !self.current.is(Punct::RBracket) {
                    if self.current.is(Punct::Comma) {
                        self.bump()?;
                        elems.push(ArrayPatternElem::Hole);
                        continue;
                    }
                    if self.eat(Punct::DotDotDot)? {
                        let pattern = self.parse_binding_pattern()?;
                        elems.push(ArrayPatternElem::Rest(Box::new(pattern)));
                        break;
                    }
                    let pattern = self.parse_binding_pattern()?;
                    let default = if self.eat(Punct::Assign)? {
                        Some(self.parse_assignment_expr()?)
                    } else {
                        None
                    };
                    elems.push(ArrayPatternElem::Elem {
                        pattern: Box::new(pattern),
                        default,
                    });
                    if !self.eat(Punct::Comma)? {
                        break;
                    }
                }
                self.expect(Punct::RBracket, "']'")?;
                Ok(Pattern::Array(elems))
            }
            TokenKind::Punct(Punct::LBrace) => {
                self.bump()?;
                let mut props = Vec::new();
                let mut rest = None;
                while !self.current.is(Punct::RBrace) {
                    if self.eat(Punct::DotDotDot)? {
                        let pattern = self.parse_binding_pattern()?;
                        rest = Some(Box::new(pattern));
                        break;
                    }
                    let key = self.parse_prop_name()?;
                    let (pattern, shorthand_name) = if self.eat(Punct::Colon)? {
                        (self.parse_binding_pattern()?, None)
                    } else {
                        match &key {
                            PropName::Ident(name) => (Pattern::Ident(*name), Some(*name)),
                            _ => return Err(self.unexpected("':'")),
                        }
                    };
                    let _ = shorthand_name;
                    let default = if self.eat(Punct::Assign)? {
                        Some(self.parse_assignment_expr()?)
                    } else {
                        None
                    };
                    props.push(ObjectPatternProp {
                        key,
                        pattern: Box::new(pattern),
                        default,
                    });
                    if !self.eat(Punct::Comma)? {
                        break;
                    }
                }
                self.expect(Punct::RBrace, "'}'")?;
                Ok(Pattern::Object { props, rest })
            }
            _ => Err(self.unexpected("binding pattern")),
        }
    }

    /// Reinterprets a parsed expression as an assignment pattern
    /// (`[a, b] = xs`, `({x = 1} = o)`).
    fn expr_to_pattern(&mut self, expr: &ExprLoc) -> PResult<Pattern> {
        match &expr.expr {
            Expr::Ident(name) => Ok(Pattern::Ident(*name)),
            Expr::Array(elems) => {
                let mut out = Vec::new();
                for (i, elem) in elems.iter().enumerate() {
                    match elem {
                        ArrayElement::Hole => out.push(ArrayPatternElem::Hole),
                        ArrayElement::Item(item) => {
                            if let Expr::Assign {
                                op: AssignOp::Assign,
                                target,
                                value,
                            } = &item.expr
                            {
                                let pattern = self.target_to_pattern(target, item.range)?;
                                out.push(ArrayPatternElem::Elem {
                                    pattern: Box::new(pattern),
                                    default: Some((**value).clone()),
                                });
                            } else {
                                let pattern = self.expr_to_pattern(item)?;
                                out.push(ArrayPatternElem::Elem {
                                    pattern: Box::new(pattern),
                                    default: None,
                                });
                            }
                        }
                        ArrayElement::Spread(spread) => {
                            if i + 1 != elems.len() {
                                return Err(self.error_at(expr.range, "rest element must be last"));
                            }
                            let pattern = self.expr_to_pattern(spread)?;
                            out.push(ArrayPatternElem::Rest(Box::new(pattern)));
                        }
                    }
                }
                Ok(Pattern::Array(out))
            }
            Expr::Object(props) => {
                let mut out = Vec::new();
                let mut rest = None;
                for (i, prop) in props.iter().enumerate() {
                    match prop {
                        ObjectProp::KeyValue { key, value } => {
                            if let Expr::Assign {
                                op: AssignOp::Assign,
                                target,
                                value: default,
                            } = &value.expr
                            {
                                let pattern = self.target_to_pattern(target, value.range)?;
                                out.push(ObjectPatternProp {
                                    key: key.clone(),
                                    pattern: Box::new(pattern),
                                    default: Some((**default).clone()),
                                });
                            } else {
                                let pattern = self.expr_to_pattern(value)?;
                                out.push(ObjectPatternProp {
                                    key: key.clone(),
                                    pattern: Box::new(pattern),
                                    default: None,
                                });
                            }
                        }
                        ObjectProp::Shorthand(name) => out.push(ObjectPatternProp {
                            key: PropName::Ident(*name),
                            pattern: Box::new(Pattern::Ident(*name)),
                            default: None,
                        }),
                        ObjectProp::Spread(spread) => {
                            if i + 1 != props.len() {
                                return Err(self.error_at(expr.range, "rest element must be last"));
                            }
                            rest = Some(Box::new(self.expr_to_pattern(spread)?));
                        }
                        _ => return Err(self.error_at(expr.range, "invalid destructuring target")),
                    }
                }
                Ok(Pattern::Object { props: out, rest })
            }
            _ => Err(self.error_at(expr.range, "invalid destructuring target")),
        }
    }

    fn target_to_pattern(&mut self, target: &AssignTarget, range: CodeRange) -> PResult<Pattern> {
        match target {
            AssignTarget::Ident(name) => Ok(Pattern::Ident(*name)),
            AssignTarget::Pattern(p) => Ok(p.clone()),
            AssignTarget::Member { .. } => Err(self.error_at(range, "invalid destructuring target")),
        }
    }

    // === expressions ===

    /// Parses a full expression including the comma operator.
    pub(crate) fn parse_expression(&mut self) -> PResult<ExprLoc> {
        let first = self.parse_assignment_expr()?;
        self.parse_expression_from(first)
    }

    fn parse_expression_from(&mut self, first: ExprLoc) -> PResult<ExprLoc> {
        if !self.current.is(Punct::Comma) {
            return Ok(first);
        }
        let start = first.range;
        let mut parts = vec![first];
        while self.eat(Punct::Comma)? {
            parts.push(self.parse_assignment_expr()?);
        }
        Ok(ExprLoc::new(Expr::Sequence(parts), start))
    }

    fn parse_expr_no_in(&mut self) -> PResult<ExprLoc> {
        let first = self.parse_assign_inner(true)?;
        self.parse_expression_from(first)
    }

    fn parse_assignment_expr_no_in(&mut self) -> PResult<ExprLoc> {
        self.parse_assign_inner(true)
    }

    pub(crate) fn parse_assignment_expr(&mut self) -> PResult<ExprLoc> {
        self.parse_assign_inner(false)
    }

    fn enter_nesting(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error_at(self.current.range, "expression nesting too deep"));
        }
        Ok(())
    }

    fn parse_assign_inner(&mut self, no_in: bool) -> PResult<ExprLoc> {
        self.enter_nesting()?;
        let result = self.parse_assign_depth_checked(no_in);
        self.depth -= 1;
        result
    }

    fn parse_assign_depth_checked(&mut self, no_in: bool) -> PResult<ExprLoc> {
        let start = self.current.range;

        // yield expression.
        if self.current.is_kw(Keyword::Yield) && self.in_generator {
            self.bump()?;
            let delegate = self.eat(Punct::Star)?;
            let argument = if delegate {
                Some(Box::new(self.parse_assign_inner(no_in)?))
            } else if self.current.is(Punct::Semi)
                || self.current.is(Punct::RParen)
                || self.current.is(Punct::RBracket)
                || self.current.is(Punct::RBrace)
                || self.current.is(Punct::Comma)
                || self.current.is(Punct::Colon)
                || self.current.kind == TokenKind::Eof
                || self.current.newline_before
            {
                None
            } else {
                Some(Box::new(self.parse_assign_inner(no_in)?))
            };
            return Ok(ExprLoc::new(Expr::Yield { argument, delegate }, start));
        }

        // Arrow functions need a speculative parse for `(params) =>`.
        if let Some(arrow) = self.try_parse_arrow(false)? {
            return Ok(arrow);
        }
        if self.is_contextual(self.ids.async_) {
            if let Some(arrow) = self.try_parse_async_arrow()? {
                return Ok(arrow);
            }
        }

        let lhs = self.parse_conditional(no_in)?;

        let op = match self.current.kind {
            TokenKind::Punct(Punct::Assign) => Some(AssignOp::Assign),
            TokenKind::Punct(Punct::PlusEq) => Some(AssignOp::Add),
            TokenKind::Punct(Punct::MinusEq) => Some(AssignOp::Sub),
            TokenKind::Punct(Punct::StarEq) => Some(AssignOp::Mul),
            TokenKind::Punct(Punct::SlashEq) => Some(AssignOp::Div),
            TokenKind::Punct(Punct::PercentEq) => Some(AssignOp::Rem),
            TokenKind::Punct(Punct::StarStarEq) => Some(AssignOp::Exp),
            TokenKind::Punct(Punct::AmpEq) => Some(AssignOp::BitAnd),
            TokenKind::Punct(Punct::PipeEq) => Some(AssignOp::BitOr),
            TokenKind::Punct(Punct::CaretEq) => Some(AssignOp::BitXor),
            TokenKind::Punct(Punct::LtLtEq) => Some(AssignOp::Shl),
            TokenKind::Punct(Punct::GtGtEq) => Some(AssignOp::Shr),
            TokenKind::Punct(Punct::GtGtGtEq) => Some(AssignOp::UShr),
            TokenKind::Punct(Punct::AmpAmpEq) => Some(AssignOp::And),
            TokenKind::Punct(Punct::PipePipeEq) => Some(AssignOp::Or),
            TokenKind::Punct(Punct::QuestionQuestionEq) => Some(AssignOp::Nullish),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(lhs);
        };
        self.bump()?;
        let target = self.expr_to_assign_target(&lhs, op)?;
        let value = self.parse_assign_inner(no_in)?;
        Ok(ExprLoc::new(
            Expr::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            start,
        ))
    }

    fn expr_to_assign_target(&mut self, lhs: &ExprLoc, op: AssignOp) -> PResult<AssignTarget> {
        match &lhs.expr {
            Expr::Ident(name) => Ok(AssignTarget::Ident(*name)),
            Expr::Member { object, key, optional } => {
                if *optional {
                    return Err(self.error_at(lhs.range, "optional chain cannot be an assignment target"));
                }
                Ok(AssignTarget::Member {
                    object: (**object).clone(),
                    key: key.clone(),
                })
            }
            Expr::Array(_) | Expr::Object(_) if op == AssignOp::Assign => {
                Ok(AssignTarget::Pattern(self.expr_to_pattern(lhs)?))
            }
            _ => Err(self.error_at(lhs.range, "invalid assignment target")),
        }
    }

    fn parse_conditional(&mut self, no_in: bool) -> PResult<ExprLoc> {
        let start = self.current.range;
        let test = self.parse_binary(0, no_in)?;
        if !self.current.is(Punct::Question) {
            return Ok(test);
        }
        self.bump()?;
        let consequent = self.parse_assign_inner(false)?;
        self.expect(Punct::Colon, "':'")?;
        let alternate = self.parse_assign_inner(no_in)?;
        Ok(ExprLoc::new(
            Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            start,
        ))
    }

    /// Binding power of the operator at `current`, or None.
    fn binary_op(&self, no_in: bool) -> Option<(BinOpKind, u8)> {
        let op = match self.current.kind {
            TokenKind::Punct(Punct::QuestionQuestion) => (BinOpKind::Logical(LogicalOp::Nullish), 1),
            TokenKind::Punct(Punct::PipePipe) => (BinOpKind::Logical(LogicalOp::Or), 2),
            TokenKind::Punct(Punct::AmpAmp) => (BinOpKind::Logical(LogicalOp::And), 3),
            TokenKind::Punct(Punct::Pipe) => (BinOpKind::Binary(BinaryOp::BitOr), 4),
            TokenKind::Punct(Punct::Caret) => (BinOpKind::Binary(BinaryOp::BitXor), 5),
            TokenKind::Punct(Punct::Amp) => (BinOpKind::Binary(BinaryOp::BitAnd), 6),
            TokenKind::Punct(Punct::EqEq) => (BinOpKind::Binary(BinaryOp::Eq), 7),
            TokenKind::Punct(Punct::BangEq) => (BinOpKind::Binary(BinaryOp::Ne), 7),
            TokenKind::Punct(Punct::EqEqEq) => (BinOpKind::Binary(BinaryOp::StrictEq), 7),
            TokenKind::Punct(Punct::BangEqEq) => (BinOpKind::Binary(BinaryOp::StrictNe), 7),
            TokenKind::Punct(Punct::Lt) => (BinOpKind::Binary(BinaryOp::Lt), 8),
            TokenKind::Punct(Punct::Gt) => (BinOpKind::Binary(BinaryOp::Gt), 8),
            TokenKind::Punct(Punct::LtEq) => (BinOpKind::Binary(BinaryOp::Le), 8),
            TokenKind::Punct(Punct::GtEq) => (BinOpKind::Binary(BinaryOp::Ge), 8),
            TokenKind::Keyword(Keyword::Instanceof) => (BinOpKind::Binary(BinaryOp::InstanceOf), 8),
            TokenKind::Keyword(Keyword::In) if !no_in => (BinOpKind::Binary(BinaryOp::In), 8),
            TokenKind::Punct(Punct::LtLt) => (BinOpKind::Binary(BinaryOp::Shl), 9),
            TokenKind::Punct(Punct::GtGt) => (BinOpKind::Binary(BinaryOp::Shr), 9),
            TokenKind::Punct(Punct::GtGtGt) => (BinOpKind::Binary(BinaryOp::UShr), 9),
            TokenKind::Punct(Punct::Plus) => (BinOpKind::Binary(BinaryOp::Add), 10),
            TokenKind::Punct(Punct::Minus) => (BinOpKind::Binary(BinaryOp::Sub), 10),
            TokenKind::Punct(Punct::Star) => (BinOpKind::Binary(BinaryOp::Mul), 11),
            TokenKind::Punct(Punct::Slash) => (BinOpKind::Binary(BinaryOp::Div), 11),
            TokenKind::Punct(Punct::Percent) => (BinOpKind::Binary(BinaryOp::Rem), 11),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_bp: u8, no_in: bool) -> PResult<ExprLoc> {
        let start = self.current.range;
        let mut lhs = self.parse_exponent(no_in)?;
        let mut lhs_kind: Option<BinOpKind> = None;
        while let Some((op, bp)) = self.binary_op(no_in) {
            if bp < min_bp {
                break;
            }
            // `??` refuses to combine with unparenthesized `||` / `&&`.
            if let (Some(prev), BinOpKind::Logical(LogicalOp::Nullish)) = (lhs_kind, op) {
                if matches!(prev, BinOpKind::Logical(LogicalOp::Or | LogicalOp::And)) {
                    return Err(self.error_at(start, "cannot mix '??' with '||' or '&&' without parentheses"));
                }
            }
            if let (Some(BinOpKind::Logical(LogicalOp::Nullish)), BinOpKind::Logical(LogicalOp::Or | LogicalOp::And)) =
                (lhs_kind, op)
            {
                return Err(self.error_at(start, "cannot mix '??' with '||' or '&&' without parentheses"));
            }
            self.bump()?;
            let rhs = self.parse_binary(bp + 1, no_in)?;
            lhs = ExprLoc::new(
                match op {
                    BinOpKind::Binary(op) => Expr::Binary {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    },
                    BinOpKind::Logical(op) => Expr::Logical {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    },
                },
                start,
            );
            lhs_kind = Some(op);
        }
        Ok(lhs)
    }

    /// `**` binds tighter than `*` and is right-associative.
    fn parse_exponent(&mut self, no_in: bool) -> PResult<ExprLoc> {
        let start = self.current.range;
        let base = self.parse_unary(no_in)?;
        if self.current.is(Punct::StarStar) {
            self.bump()?;
            let exponent = self.parse_exponent(no_in)?;
            return Ok(ExprLoc::new(
                Expr::Binary {
                    op: BinaryOp::Exp,
                    left: Box::new(base),
                    right: Box::new(exponent),
                },
                start,
            ));
        }
        Ok(base)
    }

    fn parse_unary(&mut self, no_in: bool) -> PResult<ExprLoc> {
        let start = self.current.range;
        let op = match self.current.kind {
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Neg),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(Punct::Bang) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            TokenKind::Keyword(Keyword::Typeof) => Some(UnaryOp::TypeOf),
            TokenKind::Keyword(Keyword::Void) => Some(UnaryOp::Void),
            TokenKind::Keyword(Keyword::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let operand = self.parse_unary(no_in)?;
            return Ok(ExprLoc::new(
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                },
                start,
            ));
        }
        if self.current.is_kw(Keyword::Await) {
            if !self.in_async {
                return Err(self.error_at(start, "'await' is only valid in async functions"));
            }
            self.bump()?;
            let operand = self.parse_unary(no_in)?;
            return Ok(ExprLoc::new(Expr::Await(Box::new(operand)), start));
        }
        if self.current.is(Punct::PlusPlus) || self.current.is(Punct::MinusMinus) {
            let increment = self.current.is(Punct::PlusPlus);
            self.bump()?;
            let target = self.parse_unary(no_in)?;
            self.check_update_target(&target)?;
            return Ok(ExprLoc::new(
                Expr::Update {
                    prefix: true,
                    increment,
                    target: Box::new(target),
                },
                start,
            ));
        }
        self.parse_unary_with_postfix()
    }

    fn check_update_target(&self, target: &ExprLoc) -> PResult<()> {
        match &target.expr {
            Expr::Ident(_) | Expr::Member { .. } => Ok(()),
            _ => Err(self.error_at(target.range, "invalid increment/decrement target")),
        }
    }

    fn parse_unary_with_postfix(&mut self) -> PResult<ExprLoc> {
        let start = self.current.range;
        let primary = self.parse_primary()?;
        let mut expr = self.parse_postfix_chain(primary)?;
        // Postfix update; restricted production across newlines.
        if (self.current.is(Punct::PlusPlus) || self.current.is(Punct::MinusMinus)) && !self.current.newline_before {
            let increment = self.current.is(Punct::PlusPlus);
            self.bump()?;
            self.check_update_target(&expr)?;
            expr = ExprLoc::new(
                Expr::Update {
                    prefix: false,
                    increment,
                    target: Box::new(expr),
                },
                start,
            );
        }
        Ok(expr)
    }

    /// Member access, calls, tagged templates. Wraps the result in
    /// [`Expr::Chain`] when any link used `?.`.
    fn parse_postfix_chain(&mut self, mut expr: ExprLoc) -> PResult<ExprLoc> {
        let start = expr.range;
        let mut has_optional = false;
        loop {
            match self.current.kind.clone() {
                TokenKind::Punct(Punct::Dot) => {
                    self.bump()?;
                    let key = self.parse_member_ident()?;
                    expr = ExprLoc::new(
                        Expr::Member {
                            object: Box::new(expr),
                            key,
                            optional: false,
                        },
                        start,
                    );
                }
                TokenKind::Punct(Punct::QuestionDot) => {
                    self.bump()?;
                    has_optional = true;
                    if self.current.is(Punct::LParen) {
                        let args = self.parse_arguments()?;
                        expr = ExprLoc::new(
                            Expr::Call {
                                callee: Box::new(expr),
                                args,
                                optional: true,
                            },
                            start,
                        );
                    } else if self.current.is(Punct::LBracket) {
                        self.bump()?;
                        let key = self.parse_expression()?;
                        self.expect(Punct::RBracket, "']'")?;
                        expr = ExprLoc::new(
                            Expr::Member {
                                object: Box::new(expr),
                                key: MemberKey::Computed(Box::new(key)),
                                optional: true,
                            },
                            start,
                        );
                    } else {
                        let key = self.parse_member_ident()?;
                        expr = ExprLoc::new(
                            Expr::Member {
                                object: Box::new(expr),
                                key,
                                optional: true,
                            },
                            start,
                        );
                    }
                }
                TokenKind::Punct(Punct::LBracket) => {
                    self.bump()?;
                    let key = self.parse_expression()?;
                    self.expect(Punct::RBracket, "']'")?;
                    expr = ExprLoc::new(
                        Expr::Member {
                            object: Box::new(expr),
                            key: MemberKey::Computed(Box::new(key)),
                            optional: false,
                        },
                        start,
                    );
                }
                TokenKind::Punct(Punct::LParen) => {
                    let args = self.parse_arguments()?;
                    expr = ExprLoc::new(
                        Expr::Call {
                            callee: Box::new(expr),
                            args,
                            optional: false,
                        },
                        start,
                    );
                }
                TokenKind::TemplateFull { cooked, raw } => {
                    self.bump()?;
                    expr = ExprLoc::new(
                        Expr::TaggedTemplate {
                            tag: Box::new(expr),
                            quasis: vec![cooked],
                            raws: vec![raw],
                            exprs: Vec::new(),
                        },
                        start,
                    );
                }
                TokenKind::TemplateHead { cooked, raw } => {
                    self.bump()?;
                    let (quasis, raws, exprs) = self.parse_template_parts(cooked, raw)?;
                    expr = ExprLoc::new(
                        Expr::TaggedTemplate {
                            tag: Box::new(expr),
                            quasis,
                            raws,
                            exprs,
                        },
                        start,
                    );
                }
                _ => break,
            }
        }
        if has_optional {
            expr = ExprLoc::new(Expr::Chain(Box::new(expr)), start);
        }
        Ok(expr)
    }

    fn parse_member_ident(&mut self) -> PResult<MemberKey> {
        match self.current.kind.clone() {
            TokenKind::Ident(name) => {
                self.bump()?;
                Ok(MemberKey::Ident(name))
            }
            TokenKind::PrivateName(name) => {
                self.bump()?;
                Ok(MemberKey::Private(name))
            }
            TokenKind::Keyword(kw) => {
                self.bump()?;
                Ok(MemberKey::Ident(self.keyword_name(kw)))
            }
            _ => Err(self.unexpected("property name")),
        }
    }

    fn parse_arguments(&mut self) -> PResult<Vec<Argument>> {
        self.expect(Punct::LParen, "'('")?;
        let mut args = Vec::new();
        while !self.current.is(Punct::RParen) {
            if self.eat(Punct::DotDotDot)? {
                args.push(Argument::Spread(self.parse_assignment_expr()?));
            } else {
                args.push(Argument::Expr(self.parse_assignment_expr()?));
            }
            if !self.eat(Punct::Comma)? {
                break;
            }
        }
        self.expect(Punct::RParen, "')'")?;
        Ok(args)
    }

    fn parse_template_parts(
        &mut self,
        head_cooked: StringId,
        head_raw: StringId,
    ) -> PResult<(Vec<StringId>, Vec<StringId>, Vec<ExprLoc>)> {
        let mut quasis = vec![head_cooked];
        let mut raws = vec![head_raw];
        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_expression()?);
            if !self.current.is(Punct::RBrace) {
                return Err(self.unexpected("'}'"));
            }
            let brace_start = self.current.range.start;
            let tok = self.lexer.template_continue(brace_start)?;
            self.current = self.lexer.next_token()?;
            match tok.kind {
                TokenKind::TemplateMiddle { cooked, raw } => {
                    quasis.push(cooked);
                    raws.push(raw);
                }
                TokenKind::TemplateTail { cooked, raw } => {
                    quasis.push(cooked);
                    raws.push(raw);
                    return Ok((quasis, raws, exprs));
                }
                _ => unreachable!("template_continue yields template tokens"),
            }
        }
    }

    // === arrows ===

    /// Attempts `(params) => body` or `ident => body` from the current
    /// position. Returns None (with state restored) if this is not an arrow.
    fn try_parse_arrow(&mut self, is_async: bool) -> PResult<Option<ExprLoc>> {
        let start = self.current.range;
        match self.current.kind.clone() {
            TokenKind::Ident(name) => {
                if name == self.ids.async_ && !is_async {
                    // Handled by try_parse_async_arrow.
                    return Ok(None);
                }
                let state = self.lexer.state();
                let saved = self.current.clone();
                self.bump()?;
                if self.current.is(Punct::Arrow) && !self.current.newline_before {
                    self.bump()?;
                    let params = vec![Param {
                        pattern: Pattern::Ident(name),
                        default: None,
                        rest: false,
                    }];
                    let func = self.parse_arrow_body(params, is_async, start)?;
                    return Ok(Some(ExprLoc::new(Expr::Function(func), start)));
                }
                self.lexer.restore(state);
                self.current = saved;
                Ok(None)
            }
            TokenKind::Punct(Punct::LParen) => {
                let state = self.lexer.state();
                let saved = self.current.clone();
                match self.try_arrow_params() {
                    Ok(Some(params)) => {
                        let func = self.parse_arrow_body(params, is_async, start)?;
                        Ok(Some(ExprLoc::new(Expr::Function(func), start)))
                    }
                    Ok(None) | Err(_) => {
                        self.lexer.restore(state);
                        self.current = saved;
                        Ok(None)
                    }
                }
            }
            _ => Ok(None),
        }
    }

    fn try_parse_async_arrow(&mut self) -> PResult<Option<ExprLoc>> {
        let state = self.lexer.state();
        let saved = self.current.clone();
        self.bump()?;
        if self.current.newline_before {
            self.lexer.restore(state);
            self.current = saved;
            return Ok(None);
        }
        match self.try_parse_arrow(true) {
            Ok(Some(arrow)) => Ok(Some(arrow)),
            Ok(None) => {
                self.lexer.restore(state);
                self.current = saved;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Speculatively parses `(a, {b} = x, ...rest)` followed by `=>`.
    fn try_arrow_params(&mut self) -> PResult<Option<Vec<Param>>> {
        self.expect(Punct::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.current.is(Punct::RParen) {
            if self.eat(Punct::DotDotDot)? {
                let pattern = self.parse_binding_pattern()?;
                params.push(Param {
                    pattern,
                    default: None,
                    rest: true,
                });
                break;
            }
            let pattern = self.parse_binding_pattern()?;
            let default = if self.eat(Punct::Assign)? {
                Some(self.parse_assignment_expr()?)
            } else {
                None
            };
            params.push(Param {
                pattern,
                default,
                rest: false,
            });
            if !self.eat(Punct::Comma)? {
                break;
            }
        }
        if !self.current.is(Punct::RParen) {
            return Ok(None);
        }
        self.bump()?;
        if !self.current.is(Punct::Arrow) || self.current.newline_before {
            return Ok(None);
        }
        self.bump()?;
        Ok(Some(params))
    }

    fn parse_arrow_body(&mut self, params: Vec<Param>, is_async: bool, range: CodeRange) -> PResult<FunctionId> {
        if self.current.is(Punct::LBrace) {
            return self.parse_function_body(FnCtx {
                name: None,
                params,
                is_async,
                is_generator: false,
                is_arrow: true,
                is_method: false,
                is_derived_constructor: false,
                range,
            });
        }
        let outer_async = self.in_async;
        let outer_generator = self.in_generator;
        self.in_async = is_async;
        self.in_generator = false;
        let body = self.parse_assignment_expr();
        self.in_async = outer_async;
        self.in_generator = outer_generator;
        let body = body?;
        let id = FunctionId::new(self.funcs.len());
        self.funcs.push(Rc::new(FunctionDef {
            name: None,
            params,
            body: FunctionBody::Expr(Box::new(body)),
            is_arrow: true,
            is_async,
            is_generator: false,
            is_strict: self.strict,
            is_method: false,
            is_derived_constructor: false,
            range,
        }));
        Ok(id)
    }

    // === primary expressions ===

    fn parse_primary(&mut self) -> PResult<ExprLoc> {
        let start = self.current.range;
        match self.current.kind.clone() {
            TokenKind::Num(n) => {
                self.bump()?;
                Ok(ExprLoc::new(Expr::Literal(Literal::Number(n)), start))
            }
            TokenKind::BigInt(b) => {
                self.bump()?;
                Ok(ExprLoc::new(Expr::Literal(Literal::BigInt(b)), start))
            }
            TokenKind::Str(s) => {
                self.bump()?;
                Ok(ExprLoc::new(Expr::Literal(Literal::Str(s)), start))
            }
            TokenKind::Regex { pattern, flags } => {
                self.bump()?;
                Ok(ExprLoc::new(Expr::Literal(Literal::Regex { pattern, flags }), start))
            }
            TokenKind::TemplateFull { cooked, .. } => {
                self.bump()?;
                Ok(ExprLoc::new(
                    Expr::Template {
                        quasis: vec![cooked],
                        exprs: Vec::new(),
                    },
                    start,
                ))
            }
            TokenKind::TemplateHead { cooked, raw } => {
                self.bump()?;
                let (quasis, _raws, exprs) = self.parse_template_parts(cooked, raw)?;
                Ok(ExprLoc::new(Expr::Template { quasis, exprs }, start))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.bump()?;
                Ok(ExprLoc::new(Expr::Literal(Literal::Null), start))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump()?;
                Ok(ExprLoc::new(Expr::Literal(Literal::Bool(true)), start))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump()?;
                Ok(ExprLoc::new(Expr::Literal(Literal::Bool(false)), start))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.bump()?;
                Ok(ExprLoc::new(Expr::This, start))
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.bump()?;
                if self.current.is(Punct::LParen) {
                    let args = self.parse_arguments()?;
                    return Ok(ExprLoc::new(Expr::SuperCall(args), start));
                }
                if self.eat(Punct::Dot)? {
                    let key = self.parse_member_ident()?;
                    return Ok(ExprLoc::new(Expr::SuperMember(key), start));
                }
                if self.eat(Punct::LBracket)? {
                    let key = self.parse_expression()?;
                    self.expect(Punct::RBracket, "']'")?;
                    return Ok(ExprLoc::new(Expr::SuperMember(MemberKey::Computed(Box::new(key))), start));
                }
                Err(self.error_at(start, "'super' must be followed by a call or member access"))
            }
            TokenKind::Keyword(Keyword::New) => {
                self.bump()?;
                // `new callee(args)`: member accesses bind before the call.
                let callee = self.parse_new_callee()?;
                let args = if self.current.is(Punct::LParen) {
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                Ok(ExprLoc::new(
                    Expr::New {
                        callee: Box::new(callee),
                        args,
                    },
                    start,
                ))
            }
            TokenKind::Keyword(Keyword::Function) => {
                self.bump()?;
                let is_generator = self.eat(Punct::Star)?;
                let (_, func) = self.parse_function_rest(false, is_generator, false)?;
                Ok(ExprLoc::new(Expr::Function(func), start))
            }
            TokenKind::Keyword(Keyword::Class) => {
                let class = self.parse_class()?;
                Ok(ExprLoc::new(Expr::Class(Box::new(class)), start))
            }
            TokenKind::Keyword(Keyword::Import) => {
                self.bump()?;
                self.expect(Punct::LParen, "'('")?;
                let specifier = self.parse_assignment_expr()?;
                self.expect(Punct::RParen, "')'")?;
                Ok(ExprLoc::new(Expr::DynamicImport(Box::new(specifier)), start))
            }
            TokenKind::Ident(name) => {
                if name == self.ids.async_ {
                    let state = self.lexer.state();
                    let saved = self.current.clone();
                    self.bump()?;
                    if self.current.is_kw(Keyword::Function) && !self.current.newline_before {
                        self.bump()?;
                        let is_generator = self.eat(Punct::Star)?;
                        let (_, func) = self.parse_function_rest(true, is_generator, false)?;
                        return Ok(ExprLoc::new(Expr::Function(func), start));
                    }
                    self.lexer.restore(state);
                    self.current = saved;
                }
                self.bump()?;
                Ok(ExprLoc::new(Expr::Ident(name), start))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.bump()?;
                let expr = self.parse_expression()?;
                self.expect(Punct::RParen, "')'")?;
                Ok(ExprLoc::new(expr.expr, start))
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.bump()?;
                let mut elements = Vec::new();
                while !self.current.is(Punct::RBracket) {
                    if self.current.is(Punct::Comma) {
                        self.bump()?;
                        elements.push(ArrayElement::Hole);
                        continue;
                    }
                    if self.eat(Punct::DotDotDot)? {
                        elements.push(ArrayElement::Spread(self.parse_assignment_expr()?));
                    } else {
                        elements.push(ArrayElement::Item(self.parse_assignment_expr()?));
                    }
                    if !self.eat(Punct::Comma)? {
                        break;
                    }
                }
                self.expect(Punct::RBracket, "']'")?;
                Ok(ExprLoc::new(Expr::Array(elements), start))
            }
            TokenKind::Punct(Punct::LBrace) => self.parse_object_literal(),
            TokenKind::Keyword(Keyword::Yield) if !self.in_generator => {
                // `yield` as an identifier in non-generator sloppy code.
                self.bump()?;
                let name = self.lexer_interns().intern("yield");
                Ok(ExprLoc::new(Expr::Ident(name), start))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_new_callee(&mut self) -> PResult<ExprLoc> {
        let start = self.current.range;
        let mut expr = self.parse_primary()?;
        loop {
            match self.current.kind {
                TokenKind::Punct(Punct::Dot) => {
                    self.bump()?;
                    let key = self.parse_member_ident()?;
                    expr = ExprLoc::new(
                        Expr::Member {
                            object: Box::new(expr),
                            key,
                            optional: false,
                        },
                        start,
                    );
                }
                TokenKind::Punct(Punct::LBracket) => {
                    self.bump()?;
                    let key = self.parse_expression()?;
                    self.expect(Punct::RBracket, "']'")?;
                    expr = ExprLoc::new(
                        Expr::Member {
                            object: Box::new(expr),
                            key: MemberKey::Computed(Box::new(key)),
                            optional: false,
                        },
                        start,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_object_literal(&mut self) -> PResult<ExprLoc> {
        let start = self.current.range;
        self.expect(Punct::LBrace, "'{'")?;
        let mut props = Vec::new();
        while !self.current.is(Punct::RBrace) {
            if self.eat(Punct::DotDotDot)? {
                props.push(ObjectProp::Spread(self.parse_assignment_expr()?));
                if !self.eat(Punct::Comma)? {
                    break;
                }
                continue;
            }

            // get/set/async/* prefixes.
            let mut is_async = false;
            let mut is_generator = false;
            let mut accessor: Option<MethodKind> = None;
            if self.is_contextual(self.ids.get) || self.is_contextual(self.ids.set) {
                let is_get = self.is_contextual(self.ids.get);
                let state = self.lexer.state();
                let saved = self.current.clone();
                self.bump()?;
                if self.current.is(Punct::Colon)
                    || self.current.is(Punct::Comma)
                    || self.current.is(Punct::RBrace)
                    || self.current.is(Punct::LParen)
                    || self.current.is(Punct::Assign)
                {
                    self.lexer.restore(state);
                    self.current = saved;
                } else {
                    accessor = Some(if is_get { MethodKind::Getter } else { MethodKind::Setter });
                }
            } else if self.is_contextual(self.ids.async_) {
                let state = self.lexer.state();
                let saved = self.current.clone();
                self.bump()?;
                if self.current.is(Punct::Colon)
                    || self.current.is(Punct::Comma)
                    || self.current.is(Punct::RBrace)
                    || self.current.is(Punct::LParen)
                    || self.current.is(Punct::Assign)
                {
                    self.lexer.restore(state);
                    self.current = saved;
                } else {
                    is_async = true;
                }
            }
            if self.eat(Punct::Star)? {
                is_generator = true;
            }

            let key = self.parse_prop_name()?;

            if let Some(kind) = accessor {
                let params = self.parse_params()?;
                let func = self.parse_function_body(FnCtx {
                    name: prop_name_id(&key),
                    params,
                    is_async: false,
                    is_generator: false,
                    is_arrow: false,
                    is_method: true,
                    is_derived_constructor: false,
                    range: start,
                })?;
                props.push(if kind == MethodKind::Getter {
                    ObjectProp::Getter { key, func }
                } else {
                    ObjectProp::Setter { key, func }
                });
            } else if self.current.is(Punct::LParen) {
                let params = self.parse_params()?;
                let func = self.parse_function_body(FnCtx {
                    name: prop_name_id(&key),
                    params,
                    is_async,
                    is_generator,
                    is_arrow: false,
                    is_method: true,
                    is_derived_constructor: false,
                    range: start,
                })?;
                props.push(ObjectProp::Method { key, func });
            } else if self.eat(Punct::Colon)? {
                let value = self.parse_assignment_expr()?;
                props.push(ObjectProp::KeyValue { key, value });
            } else {
                match key {
                    PropName::Ident(name) => {
                        // Shorthand, possibly with a cover-grammar default
                        // (`{x = 1}` inside a destructuring assignment).
                        if self.eat(Punct::Assign)? {
                            let default = self.parse_assignment_expr()?;
                            props.push(ObjectProp::KeyValue {
                                key: PropName::Ident(name),
                                value: ExprLoc::new(
                                    Expr::Assign {
                                        op: AssignOp::Assign,
                                        target: Box::new(AssignTarget::Ident(name)),
                                        value: Box::new(default),
                                    },
                                    start,
                                ),
                            });
                        } else {
                            props.push(ObjectProp::Shorthand(name));
                        }
                    }
                    _ => return Err(self.unexpected("':'")),
                }
            }

            if !self.eat(Punct::Comma)? {
                break;
            }
        }
        self.expect(Punct::RBrace, "'}'")?;
        Ok(ExprLoc::new(Expr::Object(props), start))
    }
}

/// Parameters for registering a function definition.
struct FnCtx {
    name: Option<StringId>,
    params: Vec<Param>,
    is_async: bool,
    is_generator: bool,
    is_arrow: bool,
    is_method: bool,
    is_derived_constructor: bool,
    range: CodeRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOpKind {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn prop_name_id(key: &PropName) -> Option<StringId> {
    match key {
        PropName::Ident(id) | PropName::Str(id) | PropName::Private(id) => Some(*id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        let mut interns = Interns::new();
        let mut funcs = Vec::new();
        parse_program(src, &mut interns, &mut funcs).expect("parse error")
    }

    fn parse_err(src: &str) -> ParseError {
        let mut interns = Interns::new();
        let mut funcs = Vec::new();
        parse_program(src, &mut interns, &mut funcs).expect_err("expected parse error")
    }

    #[test]
    fn precedence_exponent_right_assoc() {
        let program = parse_ok("1 + 2 ** 3 ** 2;");
        let Stmt::Expr(expr) = &program.body[0].stmt else {
            panic!("expected expression");
        };
        // 1 + (2 ** (3 ** 2))
        let Expr::Binary { op: BinaryOp::Add, right, .. } = &expr.expr else {
            panic!("expected add at top");
        };
        let Expr::Binary { op: BinaryOp::Exp, right: inner, .. } = &right.expr else {
            panic!("expected ** under +");
        };
        assert!(matches!(&inner.expr, Expr::Binary { op: BinaryOp::Exp, .. }));
    }

    #[test]
    fn nullish_mixing_requires_parens() {
        parse_err("a || b ?? c;");
        parse_ok("(a || b) ?? c;");
    }

    #[test]
    fn arrow_forms() {
        parse_ok("let f = x => x + 1;");
        parse_ok("let g = (a, b = 2, ...rest) => { return a; };");
        parse_ok("let h = async (x) => await x;");
        parse_ok("let i = () => 1;");
    }

    #[test]
    fn destructuring_declarations() {
        parse_ok("let {a, b: {c}, ...rest} = obj;");
        parse_ok("const [x, , [y] = [2], ...zs] = arr;");
    }

    #[test]
    fn asi_return() {
        let program = parse_ok("function f() { return\n1; }");
        let _ = program;
    }

    #[test]
    fn labeled_loop() {
        parse_ok("outer: for (let i = 0; i < 3; i++) { continue outer; }");
    }

    #[test]
    fn class_members() {
        parse_ok(
            "class A extends B { #secret = 1; static count = 0; constructor(x) { super(x); } get v() { return 1; } set v(x) {} static make() { return new A(1); } *iter() { yield 1; } }",
        );
    }

    #[test]
    fn optional_chain() {
        parse_ok("a?.b?.[c]?.(d);");
    }

    #[test]
    fn module_forms() {
        let program = parse_ok("import d, {a as b} from 'm'; import * as ns from 'n'; export {x as y}; export default 1; export const k = 2; export * from 'o';");
        assert!(program.is_module);
    }

    #[test]
    fn for_variants() {
        parse_ok("for (;;) break;");
        parse_ok("for (let i = 0, j = 1; i < j; i++, j--) ;");
        parse_ok("for (const x of xs) ;");
        parse_ok("for (const k in o) ;");
        parse_ok("async function f() { for await (const x of xs) ; }");
    }

    #[test]
    fn generator_yield() {
        parse_ok("function* g() { yield; yield 1; yield* inner(); let x = yield 2; }");
    }

    #[test]
    fn template_literals() {
        parse_ok("let s = `a${1 + 2}b${x}c`; let t = tag`raw${v}`;");
    }

    #[test]
    fn try_forms() {
        parse_ok("try { f(); } catch { g(); } finally { h(); }");
        parse_ok("try { f(); } catch ({message}) { g(message); }");
        parse_err("try { f(); }");
    }
}
