//! Lexer: source text to token stream.
//!
//! The lexer is pull-based and non-backtracking. The one ambiguity in the
//! JavaScript grammar at the token level, `/` as division versus the start of
//! a regex literal, is resolved with the previous-significant-token heuristic:
//! division is only possible after an identifier, a literal, `)`, or `]`.
//!
//! Template literals are scanned as a head segment plus parser-driven
//! continuations: after the expression inside `${...}`, the parser calls
//! [`Lexer::template_continue`] with the position of the `}` token and the
//! lexer rescans from there in template mode.
//!
//! Tokens carry byte offsets, 1-based line/column, and a `newline_before`
//! flag used by the parser's automatic-semicolon-insertion rules.

use num_bigint::BigInt;
use num_traits::Num;

use crate::{
    ast::CodeRange,
    error::ParseError,
    intern::{Interns, StringId},
};

/// Reserved words. Contextual keywords (`of`, `from`, `as`, `static`, `get`,
/// `set`, `async`) lex as identifiers and are recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    New,
    Delete,
    Typeof,
    Instanceof,
    In,
    Void,
    This,
    Null,
    True,
    False,
    Throw,
    Try,
    Catch,
    Finally,
    Class,
    Extends,
    Super,
    Import,
    Export,
    Yield,
    Await,
}

fn keyword_for(word: &str) -> Option<Keyword> {
    Some(match word {
        "var" => Keyword::Var,
        "let" => Keyword::Let,
        "const" => Keyword::Const,
        "function" => Keyword::Function,
        "return" => Keyword::Return,
        "if" => Keyword::If,
        "else" => Keyword::Else,
        "for" => Keyword::For,
        "while" => Keyword::While,
        "do" => Keyword::Do,
        "switch" => Keyword::Switch,
        "case" => Keyword::Case,
        "default" => Keyword::Default,
        "break" => Keyword::Break,
        "continue" => Keyword::Continue,
        "new" => Keyword::New,
        "delete" => Keyword::Delete,
        "typeof" => Keyword::Typeof,
        "instanceof" => Keyword::Instanceof,
        "in" => Keyword::In,
        "void" => Keyword::Void,
        "this" => Keyword::This,
        "null" => Keyword::Null,
        "true" => Keyword::True,
        "false" => Keyword::False,
        "throw" => Keyword::Throw,
        "try" => Keyword::Try,
        "catch" => Keyword::Catch,
        "finally" => Keyword::Finally,
        "class" => Keyword::Class,
        "extends" => Keyword::Extends,
        "super" => Keyword::Super,
        "import" => Keyword::Import,
        "export" => Keyword::Export,
        "yield" => Keyword::Yield,
        "await" => Keyword::Await,
        _ => return None,
    })
}

/// Punctuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    DotDotDot,
    Arrow,
    Colon,
    Question,
    QuestionDot,
    QuestionQuestion,
    QuestionQuestionEq,
    Assign,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    StarStarEq,
    SlashEq,
    PercentEq,
    Amp,
    AmpAmp,
    AmpEq,
    AmpAmpEq,
    Pipe,
    PipePipe,
    PipeEq,
    PipePipeEq,
    Caret,
    CaretEq,
    Tilde,
    Bang,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    LtLt,
    GtGt,
    GtGtGt,
    LtLtEq,
    GtGtEq,
    GtGtGtEq,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(StringId),
    Keyword(Keyword),
    Num(f64),
    BigInt(Box<BigInt>),
    Str(StringId),
    /// A template literal with no substitutions.
    TemplateFull { cooked: StringId, raw: StringId },
    /// The segment up to the first `${`.
    TemplateHead { cooked: StringId, raw: StringId },
    /// A segment between two substitutions.
    TemplateMiddle { cooked: StringId, raw: StringId },
    /// The segment after the last substitution, through the closing backtick.
    TemplateTail { cooked: StringId, raw: StringId },
    Regex { pattern: StringId, flags: StringId },
    /// A `#name` private identifier.
    PrivateName(StringId),
    Punct(Punct),
    Eof,
}

/// A lexed token with position information.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub range: CodeRange,
    /// True when at least one line terminator separates this token from the
    /// previous one. Drives automatic semicolon insertion.
    pub newline_before: bool,
}

impl Token {
    /// True when this token is exactly the given punctuator.
    #[must_use]
    pub fn is(&self, p: Punct) -> bool {
        matches!(self.kind, TokenKind::Punct(q) if q == p)
    }

    /// True when this token is exactly the given keyword.
    #[must_use]
    pub fn is_kw(&self, k: Keyword) -> bool {
        matches!(self.kind, TokenKind::Keyword(q) if q == k)
    }
}

/// Whether the previous significant token permits a division sign here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlashMode {
    /// `/` starts a regex literal.
    Regex,
    /// `/` is division.
    Division,
}

/// Resumable lexer position, used by the parser to back out of a
/// speculative arrow-parameter parse.
#[derive(Debug, Clone, Copy)]
pub struct LexerState {
    pos: usize,
    line: u32,
    line_start: usize,
    slash_mode: SlashMode,
}

/// The lexer. Borrows the source text and the engine's interner.
pub struct Lexer<'src, 'int> {
    src: &'src str,
    bytes: &'src [u8],
    interns: &'int mut Interns,
    pos: usize,
    line: u32,
    line_start: usize,
    slash_mode: SlashMode,
}

impl<'src, 'int> Lexer<'src, 'int> {
    /// Creates a lexer over `src`. A leading BOM is skipped.
    pub fn new(src: &'src str, interns: &'int mut Interns) -> Self {
        let mut pos = 0;
        if src.starts_with('\u{feff}') {
            pos = '\u{feff}'.len_utf8();
        }
        Self {
            src,
            bytes: src.as_bytes(),
            interns,
            pos,
            line: 1,
            line_start: 0,
            slash_mode: SlashMode::Regex,
        }
    }

    /// Access to the interner, for the parser's contextual-keyword needs.
    pub fn interns_mut(&mut self) -> &mut Interns {
        self.interns
    }

    /// Captures the current position for later [`Lexer::restore`].
    #[must_use]
    pub fn state(&self) -> LexerState {
        LexerState {
            pos: self.pos,
            line: self.line,
            line_start: self.line_start,
            slash_mode: self.slash_mode,
        }
    }

    /// Rewinds to a previously captured state.
    pub fn restore(&mut self, state: LexerState) {
        self.pos = state.pos;
        self.line = state.line;
        self.line_start = state.line_start;
        self.slash_mode = state.slash_mode;
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.src[pos..].chars().next()
    }

    fn range_from(&self, start: usize, start_line: u32, start_col: u32) -> CodeRange {
        CodeRange::new(
            u32::try_from(start).unwrap_or(u32::MAX),
            u32::try_from(self.pos).unwrap_or(u32::MAX),
            start_line,
            start_col,
        )
    }

    fn col_at(&self, pos: usize) -> u32 {
        u32::try_from(pos - self.line_start).unwrap_or(u32::MAX) + 1
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> ParseError {
        ParseError {
            position: u32::try_from(pos).unwrap_or(u32::MAX),
            line: self.line,
            column: self.col_at(pos.min(self.pos.max(self.line_start))),
            message: message.into(),
        }
    }

    fn newline(&mut self, pos_after: usize) {
        self.line += 1;
        self.line_start = pos_after;
    }

    /// Skips whitespace and comments; returns true if a line terminator was
    /// crossed.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut saw_newline = false;
        loop {
            match self.peek_byte() {
                Some(b' ' | b'\t' | 0x0b | 0x0c) => self.pos += 1,
                Some(b'\n') => {
                    self.pos += 1;
                    self.newline(self.pos);
                    saw_newline = true;
                }
                Some(b'\r') => {
                    self.pos += 1;
                    if self.peek_byte() == Some(b'\n') {
                        self.pos += 1;
                    }
                    self.newline(self.pos);
                    saw_newline = true;
                }
                Some(b'/') if self.byte_at(1) == Some(b'/') => {
                    self.pos += 2;
                    while let Some(b) = self.peek_byte() {
                        if b == b'\n' || b == b'\r' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.byte_at(1) == Some(b'*') => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match self.peek_byte() {
                            None => return Err(self.error(start, "unterminated block comment")),
                            Some(b'*') if self.byte_at(1) == Some(b'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(b'\n') => {
                                self.pos += 1;
                                self.newline(self.pos);
                                saw_newline = true;
                            }
                            Some(b'\r') => {
                                self.pos += 1;
                                if self.peek_byte() == Some(b'\n') {
                                    self.pos += 1;
                                }
                                self.newline(self.pos);
                                saw_newline = true;
                            }
                            Some(b) if b < 0x80 => self.pos += 1,
                            Some(_) => {
                                let c = self.char_at(self.pos).expect("valid utf-8");
                                if c == '\u{2028}' || c == '\u{2029}' {
                                    saw_newline = true;
                                }
                                self.pos += c.len_utf8();
                            }
                        }
                    }
                }
                Some(b) if b >= 0x80 => {
                    let c = self.char_at(self.pos).expect("valid utf-8");
                    if c == '\u{2028}' || c == '\u{2029}' {
                        self.pos += c.len_utf8();
                        self.newline(self.pos);
                        saw_newline = true;
                    } else if c == '\u{a0}' || c.is_whitespace() {
                        self.pos += c.len_utf8();
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(saw_newline)
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        let newline_before = self.skip_trivia()?;
        let start = self.pos;
        let start_line = self.line;
        let start_col = self.col_at(start);

        let Some(b) = self.peek_byte() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                range: self.range_from(start, start_line, start_col),
                newline_before,
            });
        };

        let kind = match b {
            b'0'..=b'9' => self.lex_number(start)?,
            b'"' | b'\'' => self.lex_string(b)?,
            b'`' => self.lex_template(true)?,
            b'#' => {
                self.pos += 1;
                let name_start = self.pos;
                let word = self.lex_ident_text(name_start)?;
                if word.is_empty() {
                    return Err(self.error(start, "expected identifier after '#'"));
                }
                TokenKind::PrivateName(self.interns.intern(&word))
            }
            b'.' if matches!(self.byte_at(1), Some(b'0'..=b'9')) => self.lex_number(start)?,
            b'/' if self.slash_mode == SlashMode::Regex => self.lex_regex()?,
            _ if is_ident_start_byte(b) || b >= 0x80 => {
                let word = self.lex_ident_text(start)?;
                if word.is_empty() {
                    let c = self.char_at(self.pos).unwrap_or('\0');
                    return Err(self.error(start, format!("unexpected character '{c}'")));
                }
                match keyword_for(&word) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Ident(self.interns.intern(&word)),
                }
            }
            _ => self.lex_punct()?,
        };

        self.slash_mode = match &kind {
            TokenKind::Ident(_)
            | TokenKind::Num(_)
            | TokenKind::BigInt(_)
            | TokenKind::Str(_)
            | TokenKind::Regex { .. }
            | TokenKind::TemplateFull { .. }
            | TokenKind::TemplateTail { .. }
            | TokenKind::PrivateName(_)
            | TokenKind::Keyword(Keyword::This | Keyword::Null | Keyword::True | Keyword::False | Keyword::Super)
            | TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::PlusPlus | Punct::MinusMinus) => {
                SlashMode::Division
            }
            _ => SlashMode::Regex,
        };

        Ok(Token {
            kind,
            range: self.range_from(start, start_line, start_col),
            newline_before,
        })
    }

    /// Rescans from the `}` that closed a template substitution, producing a
    /// `TemplateMiddle` or `TemplateTail` token. `brace_start` must be the
    /// byte offset of that `}`.
    pub fn template_continue(&mut self, brace_start: u32) -> Result<Token, ParseError> {
        self.pos = brace_start as usize;
        debug_assert_eq!(self.peek_byte(), Some(b'}'));
        let start = self.pos;
        let start_line = self.line;
        let start_col = self.col_at(start);
        self.pos += 1;
        let kind = self.lex_template(false)?;
        self.slash_mode = match kind {
            TokenKind::TemplateTail { .. } => SlashMode::Division,
            _ => SlashMode::Regex,
        };
        Ok(Token {
            kind,
            range: self.range_from(start, start_line, start_col),
            newline_before: false,
        })
    }

    fn lex_ident_text(&mut self, start: usize) -> Result<String, ParseError> {
        while let Some(b) = self.peek_byte() {
            if is_ident_part_byte(b) {
                self.pos += 1;
            } else if b >= 0x80 {
                let c = self.char_at(self.pos).expect("valid utf-8");
                if c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}' {
                    self.pos += c.len_utf8();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(self.src[start..self.pos].to_owned())
    }

    fn lex_number(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let radix_digits = |b: u8, radix: u32| char::from(b).is_digit(radix) || b == b'_';
        if self.peek_byte() == Some(b'0') {
            match self.byte_at(1) {
                Some(b'x' | b'X') => return self.lex_radix_number(start, 16, |b| radix_digits(b, 16)),
                Some(b'o' | b'O') => return self.lex_radix_number(start, 8, |b| radix_digits(b, 8)),
                Some(b'b' | b'B') => return self.lex_radix_number(start, 2, |b| radix_digits(b, 2)),
                _ => {}
            }
        }
        let mut saw_dot = false;
        let mut saw_exp = false;
        while let Some(b) = self.peek_byte() {
            match b {
                b'0'..=b'9' | b'_' => self.pos += 1,
                b'.' if !saw_dot && !saw_exp => {
                    saw_dot = true;
                    self.pos += 1;
                }
                b'e' | b'E' if !saw_exp => {
                    saw_exp = true;
                    self.pos += 1;
                    if matches!(self.peek_byte(), Some(b'+' | b'-')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let text: String = self.src[start..self.pos].chars().filter(|&c| c != '_').collect();
        if self.peek_byte() == Some(b'n') {
            if saw_dot || saw_exp {
                return Err(self.error(start, "invalid BigInt literal"));
            }
            self.pos += 1;
            let value = BigInt::from_str_radix(&text, 10).map_err(|_| self.error(start, "invalid BigInt literal"))?;
            return Ok(TokenKind::BigInt(Box::new(value)));
        }
        let value: f64 = text.parse().map_err(|_| self.error(start, "invalid number literal"))?;
        Ok(TokenKind::Num(value))
    }

    fn lex_radix_number(&mut self, start: usize, radix: u32, is_digit: impl Fn(u8) -> bool) -> Result<TokenKind, ParseError> {
        self.pos += 2;
        let digits_start = self.pos;
        while let Some(b) = self.peek_byte() {
            if is_digit(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == digits_start {
            return Err(self.error(start, "missing digits in number literal"));
        }
        let text: String = self.src[digits_start..self.pos].chars().filter(|&c| c != '_').collect();
        if self.peek_byte() == Some(b'n') {
            self.pos += 1;
            let value = BigInt::from_str_radix(&text, radix).map_err(|_| self.error(start, "invalid BigInt literal"))?;
            return Ok(TokenKind::BigInt(Box::new(value)));
        }
        let value = u128::from_str_radix(&text, radix).map_or_else(
            |_| {
                // Too large for u128: accumulate as float.
                let mut acc = 0f64;
                for c in text.chars() {
                    acc = acc * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0));
                }
                acc
            },
            |v| v as f64,
        );
        Ok(TokenKind::Num(value))
    }

    fn lex_string(&mut self, quote: u8) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek_byte() {
                None => return Err(self.error(start, "unterminated string literal")),
                Some(b'\n' | b'\r') => return Err(self.error(start, "unterminated string literal")),
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.lex_escape(&mut out, start)?;
                }
                Some(b) if b < 0x80 => {
                    out.push(char::from(b));
                    self.pos += 1;
                }
                Some(_) => {
                    let c = self.char_at(self.pos).expect("valid utf-8");
                    out.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        Ok(TokenKind::Str(self.interns.intern_owned(out)))
    }

    fn lex_escape(&mut self, out: &mut String, literal_start: usize) -> Result<(), ParseError> {
        let Some(b) = self.peek_byte() else {
            return Err(self.error(literal_start, "unterminated string literal"));
        };
        match b {
            b'n' => {
                out.push('\n');
                self.pos += 1;
            }
            b't' => {
                out.push('\t');
                self.pos += 1;
            }
            b'r' => {
                out.push('\r');
                self.pos += 1;
            }
            b'b' => {
                out.push('\u{8}');
                self.pos += 1;
            }
            b'f' => {
                out.push('\u{c}');
                self.pos += 1;
            }
            b'v' => {
                out.push('\u{b}');
                self.pos += 1;
            }
            b'0' if !matches!(self.byte_at(1), Some(b'0'..=b'9')) => {
                out.push('\0');
                self.pos += 1;
            }
            b'x' => {
                self.pos += 1;
                let hi = self.hex_digit(literal_start)?;
                let lo = self.hex_digit(literal_start)?;
                out.push(char::from(hi * 16 + lo));
            }
            b'u' => {
                self.pos += 1;
                let cp = if self.peek_byte() == Some(b'{') {
                    self.pos += 1;
                    let mut cp: u32 = 0;
                    let mut any = false;
                    while let Some(d) = self.peek_byte() {
                        if d == b'}' {
                            break;
                        }
                        let digit = char::from(d)
                            .to_digit(16)
                            .ok_or_else(|| self.error(literal_start, "invalid unicode escape"))?;
                        cp = cp * 16 + digit;
                        any = true;
                        self.pos += 1;
                        if cp > 0x0010_ffff {
                            return Err(self.error(literal_start, "unicode escape out of range"));
                        }
                    }
                    if !any || self.peek_byte() != Some(b'}') {
                        return Err(self.error(literal_start, "invalid unicode escape"));
                    }
                    self.pos += 1;
                    cp
                } else {
                    let mut cp: u32 = 0;
                    for _ in 0..4 {
                        cp = cp * 16 + u32::from(self.hex_digit(literal_start)?);
                    }
                    cp
                };
                out.push(char::from_u32(cp).unwrap_or('\u{fffd}'));
            }
            b'\n' => {
                self.pos += 1;
                self.newline(self.pos);
            }
            b'\r' => {
                self.pos += 1;
                if self.peek_byte() == Some(b'\n') {
                    self.pos += 1;
                }
                self.newline(self.pos);
            }
            _ if b < 0x80 => {
                out.push(char::from(b));
                self.pos += 1;
            }
            _ => {
                let c = self.char_at(self.pos).expect("valid utf-8");
                out.push(c);
                self.pos += c.len_utf8();
            }
        }
        Ok(())
    }

    fn hex_digit(&mut self, literal_start: usize) -> Result<u8, ParseError> {
        let d = self
            .peek_byte()
            .and_then(|b| char::from(b).to_digit(16))
            .ok_or_else(|| self.error(literal_start, "invalid hex escape"))?;
        self.pos += 1;
        Ok(u8::try_from(d).expect("hex digit fits u8"))
    }

    /// Scans one template segment. `is_start` distinguishes the opening
    /// backtick (emits Full/Head) from a continuation (emits Middle/Tail).
    fn lex_template(&mut self, is_start: bool) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        if is_start {
            debug_assert_eq!(self.peek_byte(), Some(b'`'));
            self.pos += 1;
        }
        let raw_start = self.pos;
        let mut cooked = String::new();
        loop {
            match self.peek_byte() {
                None => return Err(self.error(start, "unterminated template literal")),
                Some(b'`') => {
                    let raw = self.src[raw_start..self.pos].to_owned();
                    self.pos += 1;
                    let cooked = self.interns.intern_owned(cooked);
                    let raw = self.interns.intern_owned(raw);
                    return Ok(if is_start {
                        TokenKind::TemplateFull { cooked, raw }
                    } else {
                        TokenKind::TemplateTail { cooked, raw }
                    });
                }
                Some(b'$') if self.byte_at(1) == Some(b'{') => {
                    let raw = self.src[raw_start..self.pos].to_owned();
                    self.pos += 2;
                    let cooked = self.interns.intern_owned(cooked);
                    let raw = self.interns.intern_owned(raw);
                    return Ok(if is_start {
                        TokenKind::TemplateHead { cooked, raw }
                    } else {
                        TokenKind::TemplateMiddle { cooked, raw }
                    });
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.lex_escape(&mut cooked, start)?;
                }
                Some(b'\r') => {
                    // Template values normalize CRLF/CR to LF.
                    self.pos += 1;
                    if self.peek_byte() == Some(b'\n') {
                        self.pos += 1;
                    }
                    self.newline(self.pos);
                    cooked.push('\n');
                }
                Some(b'\n') => {
                    self.pos += 1;
                    self.newline(self.pos);
                    cooked.push('\n');
                }
                Some(b) if b < 0x80 => {
                    cooked.push(char::from(b));
                    self.pos += 1;
                }
                Some(_) => {
                    let c = self.char_at(self.pos).expect("valid utf-8");
                    cooked.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
    }

    fn lex_regex(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        debug_assert_eq!(self.peek_byte(), Some(b'/'));
        self.pos += 1;
        let body_start = self.pos;
        let mut in_class = false;
        loop {
            match self.peek_byte() {
                None | Some(b'\n' | b'\r') => return Err(self.error(start, "unterminated regex literal")),
                Some(b'\\') => {
                    self.pos += 1;
                    if matches!(self.peek_byte(), None | Some(b'\n' | b'\r')) {
                        return Err(self.error(start, "unterminated regex literal"));
                    }
                    let c = self.char_at(self.pos).expect("valid utf-8");
                    self.pos += c.len_utf8();
                }
                Some(b'[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some(b'/') if !in_class => break,
                Some(b) if b < 0x80 => self.pos += 1,
                Some(_) => {
                    let c = self.char_at(self.pos).expect("valid utf-8");
                    self.pos += c.len_utf8();
                }
            }
        }
        let pattern = self.src[body_start..self.pos].to_owned();
        self.pos += 1;
        let flags_start = self.pos;
        while let Some(b) = self.peek_byte() {
            if is_ident_part_byte(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let flags = self.src[flags_start..self.pos].to_owned();
        Ok(TokenKind::Regex {
            pattern: self.interns.intern_owned(pattern),
            flags: self.interns.intern_owned(flags),
        })
    }

    fn lex_punct(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let b = self.peek_byte().expect("caller checked");
        let two = self.byte_at(1);
        let three = self.byte_at(2);
        let four = self.byte_at(3);
        let (punct, len) = match (b, two, three, four) {
            (b'>', Some(b'>'), Some(b'>'), Some(b'=')) => (Punct::GtGtGtEq, 4),
            (b'>', Some(b'>'), Some(b'>'), _) => (Punct::GtGtGt, 3),
            (b'>', Some(b'>'), Some(b'='), _) => (Punct::GtGtEq, 3),
            (b'<', Some(b'<'), Some(b'='), _) => (Punct::LtLtEq, 3),
            (b'*', Some(b'*'), Some(b'='), _) => (Punct::StarStarEq, 3),
            (b'=', Some(b'='), Some(b'='), _) => (Punct::EqEqEq, 3),
            (b'!', Some(b'='), Some(b'='), _) => (Punct::BangEqEq, 3),
            (b'&', Some(b'&'), Some(b'='), _) => (Punct::AmpAmpEq, 3),
            (b'|', Some(b'|'), Some(b'='), _) => (Punct::PipePipeEq, 3),
            (b'?', Some(b'?'), Some(b'='), _) => (Punct::QuestionQuestionEq, 3),
            (b'.', Some(b'.'), Some(b'.'), _) => (Punct::DotDotDot, 3),
            (b'=', Some(b'>'), _, _) => (Punct::Arrow, 2),
            (b'=', Some(b'='), _, _) => (Punct::EqEq, 2),
            (b'!', Some(b'='), _, _) => (Punct::BangEq, 2),
            (b'<', Some(b'='), _, _) => (Punct::LtEq, 2),
            (b'>', Some(b'='), _, _) => (Punct::GtEq, 2),
            (b'<', Some(b'<'), _, _) => (Punct::LtLt, 2),
            (b'>', Some(b'>'), _, _) => (Punct::GtGt, 2),
            (b'+', Some(b'+'), _, _) => (Punct::PlusPlus, 2),
            (b'-', Some(b'-'), _, _) => (Punct::MinusMinus, 2),
            (b'+', Some(b'='), _, _) => (Punct::PlusEq, 2),
            (b'-', Some(b'='), _, _) => (Punct::MinusEq, 2),
            (b'*', Some(b'*'), _, _) => (Punct::StarStar, 2),
            (b'*', Some(b'='), _, _) => (Punct::StarEq, 2),
            (b'/', Some(b'='), _, _) => (Punct::SlashEq, 2),
            (b'%', Some(b'='), _, _) => (Punct::PercentEq, 2),
            (b'&', Some(b'&'), _, _) => (Punct::AmpAmp, 2),
            (b'|', Some(b'|'), _, _) => (Punct::PipePipe, 2),
            (b'&', Some(b'='), _, _) => (Punct::AmpEq, 2),
            (b'|', Some(b'='), _, _) => (Punct::PipeEq, 2),
            (b'^', Some(b'='), _, _) => (Punct::CaretEq, 2),
            (b'?', Some(b'?'), _, _) => (Punct::QuestionQuestion, 2),
            (b'?', Some(b'.'), next, _) if !matches!(next, Some(b'0'..=b'9')) => (Punct::QuestionDot, 2),
            (b'(', ..) => (Punct::LParen, 1),
            (b')', ..) => (Punct::RParen, 1),
            (b'{', ..) => (Punct::LBrace, 1),
            (b'}', ..) => (Punct::RBrace, 1),
            (b'[', ..) => (Punct::LBracket, 1),
            (b']', ..) => (Punct::RBracket, 1),
            (b';', ..) => (Punct::Semi, 1),
            (b',', ..) => (Punct::Comma, 1),
            (b'.', ..) => (Punct::Dot, 1),
            (b':', ..) => (Punct::Colon, 1),
            (b'?', ..) => (Punct::Question, 1),
            (b'=', ..) => (Punct::Assign, 1),
            (b'+', ..) => (Punct::Plus, 1),
            (b'-', ..) => (Punct::Minus, 1),
            (b'*', ..) => (Punct::Star, 1),
            (b'/', ..) => (Punct::Slash, 1),
            (b'%', ..) => (Punct::Percent, 1),
            (b'&', ..) => (Punct::Amp, 1),
            (b'|', ..) => (Punct::Pipe, 1),
            (b'^', ..) => (Punct::Caret, 1),
            (b'~', ..) => (Punct::Tilde, 1),
            (b'!', ..) => (Punct::Bang, 1),
            (b'<', ..) => (Punct::Lt, 1),
            (b'>', ..) => (Punct::Gt, 1),
            _ => return Err(self.error(start, format!("unexpected character '{}'", char::from(b)))),
        };
        self.pos += len;
        Ok(TokenKind::Punct(punct))
    }
}

fn is_ident_start_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_part_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> Vec<TokenKind> {
        let mut interns = Interns::new();
        let mut lexer = Lexer::new(src, &mut interns);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().expect("lex error");
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn numbers() {
        let toks = lex_all("1 2.5 .5 0x10 0b101 1e3 1_000");
        assert_eq!(
            toks,
            vec![
                TokenKind::Num(1.0),
                TokenKind::Num(2.5),
                TokenKind::Num(0.5),
                TokenKind::Num(16.0),
                TokenKind::Num(5.0),
                TokenKind::Num(1000.0),
                TokenKind::Num(1000.0),
            ]
        );
    }

    #[test]
    fn bigint_literal() {
        let toks = lex_all("42n");
        assert_eq!(toks, vec![TokenKind::BigInt(Box::new(BigInt::from(42)))]);
    }

    #[test]
    fn regex_vs_division() {
        // After `a`, slash is division; after `=`, it is a regex.
        let toks = lex_all("a / b");
        assert!(matches!(toks[1], TokenKind::Punct(Punct::Slash)));
        let toks = lex_all("x = /ab[/]c/g");
        assert!(matches!(toks[2], TokenKind::Regex { .. }));
    }

    #[test]
    fn newline_tracking() {
        let mut interns = Interns::new();
        let mut lexer = Lexer::new("a\nb", &mut interns);
        let a = lexer.next_token().unwrap();
        let b = lexer.next_token().unwrap();
        assert!(!a.newline_before);
        assert!(b.newline_before);
        assert_eq!(b.range.line, 2);
        assert_eq!(b.range.col, 1);
    }

    #[test]
    fn string_escapes() {
        let mut interns = Interns::new();
        let mut lexer = Lexer::new(r#"'a\nA\x42\u{1F600}'"#, &mut interns);
        let tok = lexer.next_token().unwrap();
        let TokenKind::Str(id) = tok.kind else {
            panic!("expected string");
        };
        assert_eq!(interns.get(id), "a\nAB\u{1F600}");
    }

    #[test]
    fn template_head_and_continue() {
        let mut interns = Interns::new();
        let mut lexer = Lexer::new("`a${x}b`", &mut interns);
        let head = lexer.next_token().unwrap();
        assert!(matches!(head.kind, TokenKind::TemplateHead { .. }));
        let x = lexer.next_token().unwrap();
        assert!(matches!(x.kind, TokenKind::Ident(_)));
        let close = lexer.next_token().unwrap();
        assert!(close.is(Punct::RBrace));
        let tail = lexer.template_continue(close.range.start).unwrap();
        assert!(matches!(tail.kind, TokenKind::TemplateTail { .. }));
    }

    #[test]
    fn optional_chain_vs_ternary_number() {
        // `a?.5:0` must lex `?` then `.5`, not `?.`.
        let toks = lex_all("a?.5:0");
        assert!(matches!(toks[1], TokenKind::Punct(Punct::Question)));
        assert_eq!(toks[2], TokenKind::Num(0.5));
    }
}
