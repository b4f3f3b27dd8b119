//! Recursive descent parser for the Ruby subset.

use rbsgen_ast::*;
use rbsgen_lexer::{Lexer, Token, TokenKind};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::error::ParseError;

/// Operator precedence levels for binary operators, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Range,      // .. ...
    OrOr,       // ||
    AndAnd,     // &&
    Equality,   // == != === =~ <=>
    Comparison, // < > <= >=
    Shift,      // <<
    Term,       // + -
    Factor,     // * / %
    Pow,        // **
}

impl Precedence {
    fn next(self) -> Self {
        match self {
            Precedence::Range => Precedence::OrOr,
            Precedence::OrOr => Precedence::AndAnd,
            Precedence::AndAnd => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Shift,
            Precedence::Shift => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor | Precedence::Pow => Precedence::Pow,
        }
    }
}

fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, Precedence)> {
    let op = match kind {
        TokenKind::DotDot => (BinaryOp::Range, Precedence::Range),
        TokenKind::Ellipsis => (BinaryOp::ExclusiveRange, Precedence::Range),
        TokenKind::OrOr => (BinaryOp::Or, Precedence::OrOr),
        TokenKind::AndAnd => (BinaryOp::And, Precedence::AndAnd),
        TokenKind::EqEq => (BinaryOp::Eq, Precedence::Equality),
        TokenKind::EqEqEq => (BinaryOp::CaseEq, Precedence::Equality),
        TokenKind::Ne => (BinaryOp::Ne, Precedence::Equality),
        TokenKind::Match => (BinaryOp::Match, Precedence::Equality),
        TokenKind::Spaceship => (BinaryOp::Cmp, Precedence::Equality),
        TokenKind::Lt => (BinaryOp::Lt, Precedence::Comparison),
        TokenKind::Gt => (BinaryOp::Gt, Precedence::Comparison),
        TokenKind::Le => (BinaryOp::Le, Precedence::Comparison),
        TokenKind::Ge => (BinaryOp::Ge, Precedence::Comparison),
        TokenKind::Shl => (BinaryOp::Shl, Precedence::Shift),
        TokenKind::Plus => (BinaryOp::Add, Precedence::Term),
        TokenKind::Minus => (BinaryOp::Sub, Precedence::Term),
        TokenKind::Star => (BinaryOp::Mul, Precedence::Factor),
        TokenKind::Slash => (BinaryOp::Div, Precedence::Factor),
        TokenKind::Percent => (BinaryOp::Mod, Precedence::Factor),
        TokenKind::StarStar => (BinaryOp::Pow, Precedence::Pow),
        _ => return None,
    };
    Some(op)
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Eq => Some(AssignOp::Assign),
        TokenKind::PlusEq => Some(AssignOp::AddAssign),
        TokenKind::MinusEq => Some(AssignOp::SubAssign),
        TokenKind::OrEq => Some(AssignOp::OrAssign),
        TokenKind::AndEq => Some(AssignOp::AndAssign),
        _ => None,
    }
}

/// Which tokens close the statement sequence being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyEnd {
    /// End of file
    Eof,
    /// `end`
    End,
    /// `elsif`, `else` or `end`
    Branch,
    /// `when`, `else` or `end`
    When,
    /// `rescue`, `else`, `ensure` or `end`
    Rescue,
    /// `}`
    RBrace,
    /// `)`
    RParen,
}

impl BodyEnd {
    fn matches(self, kind: &TokenKind) -> bool {
        match self {
            BodyEnd::Eof => false,
            BodyEnd::End => matches!(kind, TokenKind::End),
            BodyEnd::Branch => matches!(kind, TokenKind::Elsif | TokenKind::Else | TokenKind::End),
            BodyEnd::When => matches!(kind, TokenKind::When | TokenKind::Else | TokenKind::End),
            BodyEnd::Rescue => matches!(
                kind,
                TokenKind::Rescue | TokenKind::Else | TokenKind::Ensure | TokenKind::End
            ),
            BodyEnd::RBrace => matches!(kind, TokenKind::RBrace),
            BodyEnd::RParen => matches!(kind, TokenKind::RParen),
        }
    }
}

/// Local variables visible in a scope. Blocks see their parent's locals;
/// `def`, `class` and `module` bodies start fresh.
struct Scope {
    locals: FxHashSet<SmolStr>,
    inherits: bool,
}

/// Nested expression frames allowed before the rest of a file is skipped.
const MAX_DEPTH: usize = 128;

/// Parser for Ruby source code.
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    current: Token,
    next: Token,
    previous: Token,
    errors: Vec<ParseError>,
    scopes: Vec<Scope>,
    /// Whether a `do` may attach to the call being parsed. Cleared while
    /// parsing command arguments and loop conditions so that `do` binds to
    /// the outermost call.
    allow_do_block: bool,
    /// Number of tokens consumed so far, used to guarantee progress.
    position: usize,
    /// Current expression nesting, bounded by `MAX_DEPTH`.
    depth: usize,
    /// Set once nesting overflowed; later errors are cascades and dropped.
    too_deep: bool,
}

impl<'source> Parser<'source> {
    /// Create a new parser for the given source.
    pub fn new(source: &'source str) -> Self {
        let mut lexer = Lexer::new(source);
        let mut errors = Vec::new();

        let current = Self::next_token(&mut lexer, &mut errors);
        let next = Self::next_token(&mut lexer, &mut errors);

        Self {
            lexer,
            current,
            next,
            previous: Token::new(TokenKind::Eof, 0..0),
            errors,
            scopes: vec![Scope {
                locals: FxHashSet::default(),
                inherits: false,
            }],
            allow_do_block: true,
            position: 0,
            depth: 0,
            too_deep: false,
        }
    }

    /// Get the collected errors.
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    fn next_token(lexer: &mut Lexer, errors: &mut Vec<ParseError>) -> Token {
        loop {
            match lexer.next() {
                Some(Ok(token)) => return token,
                Some(Err(err)) => errors.push(ParseError::Lex(err)),
                None => {
                    let end = lexer.source().len();
                    return Token::new(TokenKind::Eof, end..end);
                }
            }
        }
    }

    fn advance(&mut self) {
        let upcoming = Self::next_token(&mut self.lexer, &mut self.errors);
        let current = std::mem::replace(&mut self.next, upcoming);
        self.previous = std::mem::replace(&mut self.current, current);
        self.position += 1;
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current.kind, TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_terminators(&mut self) {
        while matches!(
            self.current.kind,
            TokenKind::Newline | TokenKind::Semicolon
        ) {
            self.advance();
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn check_next(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.next.kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else if self.at_end() {
            self.error(ParseError::UnexpectedEof {
                expected: expected.to_string(),
                span: self.current.span.clone(),
            });
            false
        } else {
            self.error(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current.kind.clone(),
                span: self.current.span.clone(),
            });
            false
        }
    }

    fn error(&mut self, err: ParseError) {
        if !self.too_deep {
            self.errors.push(err);
        }
    }

    /// Run `parse` one nesting level deeper. Past `MAX_DEPTH` the remaining
    /// input is skipped and an error node is returned instead.
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Expr) -> Expr {
        if self.depth >= MAX_DEPTH {
            return self.abandon_nesting();
        }
        self.depth += 1;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    fn abandon_nesting(&mut self) -> Expr {
        let span = self.current_span();
        self.error(ParseError::TooDeep {
            span: self.current.span.clone(),
        });
        self.too_deep = true;
        while !self.at_end() {
            self.advance();
        }
        Spanned::new(ExprKind::Error, span)
    }

    /// Whitespace separates the previous token from the current one.
    fn space_before_current(&self) -> bool {
        self.previous.span.end < self.current.span.start
    }

    /// The current and next tokens touch (`to:`, `*args`).
    fn next_is_adjacent(&self) -> bool {
        self.current.span.end == self.next.span.start
    }

    fn span(&self, start: usize) -> Span {
        let end = self.previous.span.end.max(start);
        Span::new(start as u32, end as u32)
    }

    fn current_span(&self) -> Span {
        Span::from_range(&self.current.span)
    }

    fn with_do_blocks<T>(&mut self, allowed: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.allow_do_block, allowed);
        let result = f(self);
        self.allow_do_block = saved;
        result
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    fn push_scope(&mut self, inherits: bool) {
        self.scopes.push(Scope {
            locals: FxHashSet::default(),
            inherits,
        });
    }

    fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn declare(&mut self, name: &SmolStr) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.locals.insert(name.clone());
        }
    }

    fn declare_params(&mut self, params: &[Param]) {
        for param in params {
            if let Some(name) = &param.name {
                self.declare(name);
            }
        }
    }

    fn is_local(&self, name: &str) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.locals.contains(name) {
                return true;
            }
            if !scope.inherits {
                return false;
            }
        }
        false
    }

    // ========================================================================
    // Bodies and statements
    // ========================================================================

    /// Parse a complete source file.
    pub fn parse_source_file(&mut self) -> SourceFile {
        let body = self.parse_body(BodyEnd::Eof);
        let end = self.lexer.source().len() as u32;

        SourceFile {
            body,
            span: Span::new(0, end),
        }
    }

    fn parse_body(&mut self, until: BodyEnd) -> Body {
        let start = self.current.span.start;
        let mut statements = Vec::new();

        loop {
            self.skip_terminators();
            if self.at_end() || until.matches(&self.current.kind) {
                break;
            }

            let before = self.position;
            statements.push(self.parse_statement());

            if !self.current.kind.is_terminator() && !until.matches(&self.current.kind) {
                self.error(ParseError::UnexpectedToken {
                    expected: "end of statement".to_string(),
                    found: self.current.kind.clone(),
                    span: self.current.span.clone(),
                });
                // Error recovery: skip to the next statement
                while !self.current.kind.is_terminator() && !until.matches(&self.current.kind) {
                    self.advance();
                }
            }

            if self.position == before {
                self.advance();
            }
        }

        Body {
            statements,
            span: self.span(start),
        }
    }

    /// A body that may carry `rescue`/`else`/`ensure` clauses, as in `def`,
    /// `begin` and `do` blocks. The closing `end` is left for the caller.
    fn parse_body_with_rescue(&mut self) -> Body {
        let start = self.current.span.start;
        let body = self.parse_body(BodyEnd::Rescue);

        if !matches!(
            self.current.kind,
            TokenKind::Rescue | TokenKind::Else | TokenKind::Ensure
        ) {
            return body;
        }

        let begin = self.parse_rescue_clauses(body);
        let span = self.span(start);
        Body {
            statements: vec![Spanned::new(ExprKind::Begin(begin), span)],
            span,
        }
    }

    fn parse_rescue_clauses(&mut self, body: Body) -> BeginExpr {
        let mut rescues = Vec::new();

        while self.eat(&TokenKind::Rescue) {
            let mut exceptions = Vec::new();
            while !self.current.kind.is_terminator()
                && !self.check(&TokenKind::FatArrow)
                && !self.check(&TokenKind::Then)
            {
                exceptions.push(self.parse_expr());
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }

            let mut binding = None;
            if self.eat(&TokenKind::FatArrow) {
                if let TokenKind::Ident(name) = self.current.kind.clone() {
                    self.advance();
                    self.declare(&name);
                    binding = Some(name);
                } else {
                    self.error(ParseError::ExpectedName {
                        span: self.current.span.clone(),
                    });
                }
            }
            self.eat(&TokenKind::Then);

            let body = self.parse_body(BodyEnd::Rescue);
            rescues.push(RescueClause {
                exceptions,
                binding,
                body,
            });
        }

        let else_branch = if self.eat(&TokenKind::Else) {
            Some(self.parse_body(BodyEnd::Rescue))
        } else {
            None
        };

        let ensure = if self.eat(&TokenKind::Ensure) {
            Some(self.parse_body(BodyEnd::End))
        } else {
            None
        };

        BeginExpr {
            body,
            rescues,
            else_branch,
            ensure,
        }
    }

    fn parse_statement(&mut self) -> Expr {
        let start = self.current.span.start;
        let mut expr = self.parse_not_expr();

        // Multiple assignment: `a, b = 1, 2`
        if self.check(&TokenKind::Comma) && is_assignable(&expr) {
            let mut targets = vec![self.assign_target(expr)];
            while self.eat(&TokenKind::Comma) {
                let target = self.parse_unary();
                targets.push(self.assign_target(target));
            }
            let target_span = self.span(start);

            self.consume(TokenKind::Eq, "'=' in multiple assignment");
            self.skip_newlines();

            let value_start = self.current.span.start;
            let mut values = vec![self.parse_expr()];
            while self.eat(&TokenKind::Comma) {
                self.skip_newlines();
                values.push(self.parse_expr());
            }
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Spanned::new(ExprKind::Array(values), self.span(value_start))
            };

            expr = Spanned::new(
                ExprKind::Assign(AssignExpr {
                    target: Box::new(Spanned::new(ExprKind::Array(targets), target_span)),
                    op: AssignOp::Assign,
                    value: Box::new(value),
                }),
                self.span(start),
            );
        }

        // Statement modifiers: `foo if bar`, `x rescue nil`
        loop {
            let modifier_start = self.current.span.start;
            match self.current.kind {
                TokenKind::If | TokenKind::Unless => {
                    let negated = self.check(&TokenKind::Unless);
                    self.advance();
                    let condition = self.parse_not_expr();
                    let then_branch = Body {
                        span: expr.span,
                        statements: vec![expr],
                    };
                    expr = Spanned::new(
                        ExprKind::If(IfExpr {
                            condition: Box::new(condition),
                            then_branch,
                            else_branch: None,
                            negated,
                        }),
                        self.span(start),
                    );
                }
                TokenKind::While | TokenKind::Until => {
                    let negated = self.check(&TokenKind::Until);
                    self.advance();
                    let condition = self.parse_not_expr();
                    let body = Body {
                        span: expr.span,
                        statements: vec![expr],
                    };
                    expr = Spanned::new(
                        ExprKind::While(WhileExpr {
                            condition: Box::new(condition),
                            body,
                            negated,
                        }),
                        self.span(start),
                    );
                }
                TokenKind::Rescue => {
                    self.advance();
                    let fallback = self.parse_not_expr();
                    let body = Body {
                        span: expr.span,
                        statements: vec![expr],
                    };
                    let rescue_body = Body {
                        span: self.span(modifier_start),
                        statements: vec![fallback],
                    };
                    expr = Spanned::new(
                        ExprKind::Begin(BeginExpr {
                            body,
                            rescues: vec![RescueClause {
                                exceptions: Vec::new(),
                                binding: None,
                                body: rescue_body,
                            }],
                            else_branch: None,
                            ensure: None,
                        }),
                        self.span(start),
                    );
                }
                _ => break,
            }
        }

        expr
    }

    /// `not`, `and`, `or`: the loosest-binding operators.
    fn parse_not_expr(&mut self) -> Expr {
        let start = self.current.span.start;
        let mut left = self.parse_not_operand();

        loop {
            let op = match self.current.kind {
                TokenKind::And => BinaryOp::And,
                TokenKind::Or => BinaryOp::Or,
                _ => break,
            };
            let op_span = self.current_span();
            self.advance();
            self.skip_newlines();

            let right = self.parse_not_operand();
            left = Spanned::new(
                ExprKind::Binary(BinaryExpr {
                    left: Box::new(left),
                    op: Spanned::new(op, op_span),
                    right: Box::new(right),
                }),
                self.span(start),
            );
        }

        left
    }

    fn parse_not_operand(&mut self) -> Expr {
        let start = self.current.span.start;
        if self.check(&TokenKind::Not) {
            let op_span = self.current_span();
            self.advance();
            let operand = self.nested(Self::parse_not_operand);
            return Spanned::new(
                ExprKind::Unary(UnaryExpr {
                    op: Spanned::new(UnaryOp::Not, op_span),
                    operand: Box::new(operand),
                }),
                self.span(start),
            );
        }
        self.parse_expr()
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Assignment, ternary and binary operators.
    fn parse_expr(&mut self) -> Expr {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Expr {
        let start = self.current.span.start;
        let lhs = self.parse_binary(Precedence::Range);

        if let Some(op) = assign_op(&self.current.kind) {
            if is_assignable(&lhs) {
                self.advance();
                self.skip_newlines();
                let target = self.assign_target(lhs);
                let value = self.parse_expr();
                return Spanned::new(
                    ExprKind::Assign(AssignExpr {
                        target: Box::new(target),
                        op,
                        value: Box::new(value),
                    }),
                    self.span(start),
                );
            }
        }

        if self.check(&TokenKind::Question) {
            self.advance();
            self.skip_newlines();
            let then_expr = self.parse_expr();
            self.skip_newlines();
            self.consume(TokenKind::Colon, "':' in ternary");
            self.skip_newlines();
            let else_expr = self.parse_expr();

            return Spanned::new(
                ExprKind::If(IfExpr {
                    condition: Box::new(lhs),
                    then_branch: Body {
                        span: then_expr.span,
                        statements: vec![then_expr],
                    },
                    else_branch: Some(Body {
                        span: else_expr.span,
                        statements: vec![else_expr],
                    }),
                    negated: false,
                }),
                self.span(start),
            );
        }

        lhs
    }

    fn parse_binary(&mut self, min_prec: Precedence) -> Expr {
        self.nested(|parser| parser.parse_binary_chain(min_prec))
    }

    fn parse_binary_chain(&mut self, min_prec: Precedence) -> Expr {
        let start = self.current.span.start;
        let mut left = self.parse_unary();

        while let Some((op, prec)) = binary_op(&self.current.kind) {
            if prec < min_prec {
                break;
            }
            let op_span = self.current_span();
            self.advance();
            self.skip_newlines();

            // `**` is right associative
            let next_min = if op == BinaryOp::Pow { prec } else { prec.next() };
            let right = self.parse_binary(next_min);

            left = Spanned::new(
                ExprKind::Binary(BinaryExpr {
                    left: Box::new(left),
                    op: Spanned::new(op, op_span),
                    right: Box::new(right),
                }),
                self.span(start),
            );
        }

        left
    }

    fn parse_unary(&mut self) -> Expr {
        self.nested(Self::parse_prefix)
    }

    fn parse_prefix(&mut self) -> Expr {
        let start = self.current.span.start;
        let op_span = self.current_span();

        match self.current.kind {
            TokenKind::Bang | TokenKind::Not => {
                self.advance();
                let operand = self.parse_unary();
                Spanned::new(
                    ExprKind::Unary(UnaryExpr {
                        op: Spanned::new(UnaryOp::Not, op_span),
                        operand: Box::new(operand),
                    }),
                    self.span(start),
                )
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary();
                let kind = match operand.node {
                    ExprKind::Literal(Literal::Int(n)) => ExprKind::Literal(Literal::Int(-n)),
                    ExprKind::Literal(Literal::Float(n)) => ExprKind::Literal(Literal::Float(-n)),
                    other => ExprKind::Unary(UnaryExpr {
                        op: Spanned::new(UnaryOp::Neg, op_span),
                        operand: Box::new(Spanned::new(other, operand.span)),
                    }),
                };
                Spanned::new(kind, self.span(start))
            }
            TokenKind::Star => {
                self.advance();
                let inner = self.parse_unary();
                Spanned::new(ExprKind::Splat(Box::new(inner)), self.span(start))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Expr {
        let start = self.current.span.start;
        let mut expr = self.parse_primary();

        loop {
            // Leading-dot chains continue across lines
            if self.check(&TokenKind::Newline)
                && (self.check_next(&TokenKind::Dot) || self.check_next(&TokenKind::SafeNav))
            {
                self.advance();
            }

            match self.current.kind {
                TokenKind::Dot | TokenKind::SafeNav => {
                    let safe_navigation = self.check(&TokenKind::SafeNav);
                    self.advance();
                    self.skip_newlines();

                    let Some(name) = self.parse_method_name() else {
                        self.error(ParseError::ExpectedName {
                            span: self.current.span.clone(),
                        });
                        break;
                    };
                    expr = self.parse_call_tail(Some(Box::new(expr)), name, safe_navigation, start);
                }
                TokenKind::ColonColon => {
                    self.advance();
                    let name_span = self.current_span();
                    match self.current.kind.clone() {
                        TokenKind::Const(name) if !self.check_next(&TokenKind::LParen) => {
                            self.advance();
                            let kind = match expr.node {
                                ExprKind::Const(mut path) => {
                                    path.segments.push(name);
                                    ExprKind::Const(path)
                                }
                                other => {
                                    let receiver = Spanned::new(other, expr.span);
                                    ExprKind::Call(CallExpr {
                                        receiver: Some(Box::new(receiver)),
                                        name: Spanned::new(name, name_span),
                                        args: Arguments::default(),
                                        block: None,
                                        safe_navigation: false,
                                    })
                                }
                            };
                            expr = Spanned::new(kind, self.span(start));
                        }
                        TokenKind::Const(name) | TokenKind::Ident(name) => {
                            self.advance();
                            let name = Spanned::new(name, name_span);
                            expr = self.parse_call_tail(Some(Box::new(expr)), name, false, start);
                        }
                        _ => {
                            self.error(ParseError::ExpectedName {
                                span: self.current.span.clone(),
                            });
                            break;
                        }
                    }
                }
                TokenKind::LBracket if !self.space_before_current() => {
                    let name_span = self.current_span();
                    self.advance();
                    let args = self.parse_paren_args(TokenKind::RBracket, "']'");
                    expr = Spanned::new(
                        ExprKind::Call(CallExpr {
                            receiver: Some(Box::new(expr)),
                            name: Spanned::new(SmolStr::from("[]"), name_span),
                            args,
                            block: None,
                            safe_navigation: false,
                        }),
                        self.span(start),
                    );
                }
                _ => break,
            }
        }

        expr
    }

    fn parse_primary(&mut self) -> Expr {
        let start = self.current.span.start;

        match self.current.kind.clone() {
            TokenKind::Nil => self.literal(ExprKind::Nil),
            TokenKind::True => self.literal(ExprKind::True),
            TokenKind::False => self.literal(ExprKind::False),
            TokenKind::SelfKw => self.literal(ExprKind::SelfRef),
            TokenKind::Int(n) => self.literal(ExprKind::Literal(Literal::Int(n))),
            TokenKind::Float(n) => self.literal(ExprKind::Literal(Literal::Float(n))),
            TokenKind::Str(lit) => self.literal(ExprKind::Literal(Literal::Str {
                value: lit.value,
                interpolated: lit.interpolated,
            })),
            TokenKind::Symbol(name) => {
                self.advance();
                // Setter symbols: `:name=`
                let name = if self.check(&TokenKind::Eq) && !self.space_before_current() {
                    self.advance();
                    SmolStr::from(format!("{}=", name))
                } else {
                    name
                };
                Spanned::new(ExprKind::Literal(Literal::Symbol(name)), self.span(start))
            }
            TokenKind::SymbolArray(words) => {
                let span = self.current_span();
                self.advance();
                let items = words
                    .into_iter()
                    .map(|w| Spanned::new(ExprKind::Literal(Literal::Symbol(w)), span))
                    .collect();
                Spanned::new(ExprKind::Array(items), span)
            }
            TokenKind::WordArray(words) => {
                let span = self.current_span();
                self.advance();
                let items = words
                    .into_iter()
                    .map(|w| {
                        Spanned::new(
                            ExprKind::Literal(Literal::Str {
                                value: w,
                                interpolated: false,
                            }),
                            span,
                        )
                    })
                    .collect();
                Spanned::new(ExprKind::Array(items), span)
            }
            TokenKind::InstanceVar(name) => self.variable(VariableKind::Instance, name),
            TokenKind::ClassVar(name) => self.variable(VariableKind::Class, name),
            TokenKind::GlobalVar(name) => self.variable(VariableKind::Global, name),

            TokenKind::Ident(name) => {
                let name_span = self.current_span();
                self.advance();
                let paren_call = self.check(&TokenKind::LParen) && !self.space_before_current();
                if self.is_local(&name) && !paren_call {
                    return Spanned::new(ExprKind::Ident(name), name_span);
                }
                self.parse_call_tail(None, Spanned::new(name, name_span), false, start)
            }

            TokenKind::Const(name) => {
                let name_span = self.current_span();
                self.advance();
                // `Integer("1")`
                if self.check(&TokenKind::LParen) && !self.space_before_current() {
                    return self.parse_call_tail(None, Spanned::new(name, name_span), false, start);
                }
                let mut segments = vec![name];
                self.parse_const_segments(&mut segments);
                Spanned::new(
                    ExprKind::Const(ConstPath {
                        absolute: false,
                        segments,
                    }),
                    self.span(start),
                )
            }

            TokenKind::ColonColon => {
                self.advance();
                match self.current.kind.clone() {
                    TokenKind::Const(name) => {
                        self.advance();
                        let mut segments = vec![name];
                        self.parse_const_segments(&mut segments);
                        Spanned::new(
                            ExprKind::Const(ConstPath {
                                absolute: true,
                                segments,
                            }),
                            self.span(start),
                        )
                    }
                    _ => {
                        self.error(ParseError::ExpectedName {
                            span: self.current.span.clone(),
                        });
                        Spanned::new(ExprKind::Error, self.span(start))
                    }
                }
            }

            TokenKind::LBracket => {
                self.advance();
                let args = self.parse_paren_args(TokenKind::RBracket, "']'");
                Spanned::new(ExprKind::Array(args.positional), self.span(start))
            }

            TokenKind::LBrace => {
                self.advance();
                let entries = self.parse_hash_entries();
                Spanned::new(ExprKind::Hash(entries), self.span(start))
            }

            TokenKind::LParen => {
                self.advance();
                let body = self.with_do_blocks(true, |p| p.parse_body(BodyEnd::RParen));
                self.consume(TokenKind::RParen, "')'");
                Spanned::new(ExprKind::Paren(body), self.span(start))
            }

            TokenKind::Arrow => {
                self.advance();
                let lambda = self.parse_lambda(start);
                Spanned::new(ExprKind::Lambda(lambda), self.span(start))
            }

            TokenKind::Class => self.parse_class(),
            TokenKind::Module => self.parse_module(),
            TokenKind::Def => self.parse_def(),
            TokenKind::If => self.parse_if(false),
            TokenKind::Unless => self.parse_if(true),
            TokenKind::While => self.parse_while(false),
            TokenKind::Until => self.parse_while(true),
            TokenKind::Case => self.parse_case(),

            TokenKind::Begin => {
                self.advance();
                let body = self.parse_body(BodyEnd::Rescue);
                let begin = self.parse_rescue_clauses(body);
                self.consume(TokenKind::End, "'end' to close begin");
                Spanned::new(ExprKind::Begin(begin), self.span(start))
            }

            TokenKind::Return => {
                self.advance();
                let value = if self.at_value_end() {
                    None
                } else {
                    Some(Box::new(self.parse_expr()))
                };
                Spanned::new(ExprKind::Return(value), self.span(start))
            }

            TokenKind::Yield => {
                self.advance();
                let args = if self.check(&TokenKind::LParen) && !self.space_before_current() {
                    self.advance();
                    self.parse_paren_args(TokenKind::RParen, "')'")
                } else if self.can_start_command_arg() {
                    self.parse_command_args()
                } else {
                    Arguments::default()
                };
                Spanned::new(ExprKind::Yield(args.positional), self.span(start))
            }

            TokenKind::Eof
            | TokenKind::End
            | TokenKind::RBrace
            | TokenKind::RParen
            | TokenKind::RBracket => {
                // Leave closers for the enclosing construct
                self.error(ParseError::ExpectedExpr {
                    span: self.current.span.clone(),
                });
                Spanned::new(ExprKind::Error, self.current_span())
            }

            _ => {
                self.error(ParseError::ExpectedExpr {
                    span: self.current.span.clone(),
                });
                self.advance();
                Spanned::new(ExprKind::Error, self.span(start))
            }
        }
    }

    fn literal(&mut self, kind: ExprKind) -> Expr {
        let span = self.current_span();
        self.advance();
        Spanned::new(kind, span)
    }

    fn variable(&mut self, kind: VariableKind, name: SmolStr) -> Expr {
        self.literal(ExprKind::Variable(Variable { kind, name }))
    }

    fn parse_const_segments(&mut self, segments: &mut Vec<SmolStr>) {
        while self.check(&TokenKind::ColonColon) {
            let TokenKind::Const(name) = self.next.kind.clone() else {
                break;
            };
            self.advance();
            self.advance();
            segments.push(name);
        }
    }

    /// A method name after `.` or in `def`.
    fn parse_method_name(&mut self) -> Option<Spanned<SmolStr>> {
        let span = self.current_span();
        let name = match &self.current.kind {
            TokenKind::Ident(name) | TokenKind::Const(name) => name.clone(),
            kind => SmolStr::from(kind.keyword_text()?),
        };
        self.advance();
        Some(Spanned::new(name, span))
    }

    /// Arguments and block following a method name.
    fn parse_call_tail(
        &mut self,
        receiver: Option<Box<Expr>>,
        name: Spanned<SmolStr>,
        safe_navigation: bool,
        start: usize,
    ) -> Expr {
        let args = if self.check(&TokenKind::LParen) && !self.space_before_current() {
            self.advance();
            self.parse_paren_args(TokenKind::RParen, "')'")
        } else if self.can_start_command_arg() {
            self.parse_command_args()
        } else {
            Arguments::default()
        };

        let block = if self.check(&TokenKind::LBrace) {
            Some(self.parse_brace_block())
        } else if self.check(&TokenKind::Do) && self.allow_do_block {
            Some(self.parse_do_block())
        } else {
            None
        };

        Spanned::new(
            ExprKind::Call(CallExpr {
                receiver,
                name,
                args,
                block,
                safe_navigation,
            }),
            self.span(start),
        )
    }

    /// Whether the current token begins the first argument of a call written
    /// without parentheses (`delegate :a, to: :b`).
    fn can_start_command_arg(&self) -> bool {
        if !self.space_before_current() {
            return false;
        }
        match &self.current.kind {
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::Symbol(_)
            | TokenKind::SymbolArray(_)
            | TokenKind::WordArray(_)
            | TokenKind::Const(_)
            | TokenKind::Ident(_)
            | TokenKind::InstanceVar(_)
            | TokenKind::ClassVar(_)
            | TokenKind::GlobalVar(_)
            | TokenKind::Nil
            | TokenKind::True
            | TokenKind::False
            | TokenKind::SelfKw
            | TokenKind::LBracket
            | TokenKind::Arrow
            | TokenKind::Def
            | TokenKind::Case => true,
            TokenKind::ColonColon => matches!(self.next.kind, TokenKind::Const(_)),
            TokenKind::Star
            | TokenKind::StarStar
            | TokenKind::Amp
            | TokenKind::Minus
            | TokenKind::Bang => self.next_is_adjacent(),
            // Keyword used as a label: `before_save :x, if: :y`
            kind if kind.is_keyword() => {
                self.check_next(&TokenKind::Colon) && self.next_is_adjacent()
            }
            _ => false,
        }
    }

    /// Whether nothing that could be a value follows (`return` alone).
    fn at_value_end(&self) -> bool {
        self.current.kind.is_terminator()
            || matches!(
                self.current.kind,
                TokenKind::If
                    | TokenKind::Unless
                    | TokenKind::While
                    | TokenKind::Until
                    | TokenKind::Rescue
                    | TokenKind::End
                    | TokenKind::RBrace
                    | TokenKind::RParen
            )
    }

    fn parse_command_args(&mut self) -> Arguments {
        self.with_do_blocks(false, |p| p.parse_arg_list(false, None))
    }

    /// Arguments up to and including `closer`; the opening token has already
    /// been consumed.
    fn parse_paren_args(&mut self, closer: TokenKind, expected: &str) -> Arguments {
        let args = self.with_do_blocks(true, |p| p.parse_arg_list(true, Some(&closer)));
        self.skip_newlines();
        self.consume(closer, expected);
        args
    }

    fn parse_arg_list(&mut self, parenthesized: bool, closer: Option<&TokenKind>) -> Arguments {
        let mut args = Arguments {
            parenthesized,
            ..Arguments::default()
        };
        // Trailing `key: value` pairs become one hash argument
        let mut hash: Option<(usize, usize, Vec<HashEntry>)> = None;

        loop {
            if parenthesized {
                self.skip_newlines();
            }
            if self.at_end() || closer.is_some_and(|c| self.check(c)) {
                break;
            }

            let entry_start = self.current.span.start;
            if self.eat(&TokenKind::Amp) {
                let value = self.parse_unary();
                args.block_arg = Some(Box::new(value));
            } else if let Some(entry) = self.parse_hash_entry(closer) {
                let index = args.positional.len();
                hash.get_or_insert_with(|| (index, entry_start, Vec::new()))
                    .2
                    .push(entry);
            } else {
                let value = self.parse_expr();
                if self.eat(&TokenKind::FatArrow) {
                    self.skip_newlines();
                    let index = args.positional.len();
                    let entry = HashEntry::Pair {
                        key: value,
                        value: self.parse_expr(),
                    };
                    hash.get_or_insert_with(|| (index, entry_start, Vec::new()))
                        .2
                        .push(entry);
                } else {
                    args.positional.push(value);
                }
            }

            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }

        if let Some((index, hash_start, entries)) = hash {
            let expr = Spanned::new(ExprKind::Hash(entries), self.span(hash_start));
            args.positional.insert(index, expr);
        }

        args
    }

    /// `key: value`, `"key": value` or `**splat`. Rocket pairs are handled by
    /// the caller since their key is an arbitrary expression.
    fn parse_hash_entry(&mut self, closer: Option<&TokenKind>) -> Option<HashEntry> {
        if self.eat(&TokenKind::StarStar) {
            return Some(HashEntry::DoubleSplat(self.parse_expr()));
        }

        let label = self.parse_label()?;
        if closer.is_some() {
            self.skip_newlines();
        }

        // Shorthand `foo(x:)` takes the value from `x`
        let omitted = self.check(&TokenKind::Comma)
            || self.current.kind.is_terminator()
            || closer.is_some_and(|c| self.check(c));
        let value = if omitted {
            let kind = if self.is_local(&label.node) {
                ExprKind::Ident(label.node.clone())
            } else {
                ExprKind::Call(CallExpr {
                    receiver: None,
                    name: label.clone(),
                    args: Arguments::default(),
                    block: None,
                    safe_navigation: false,
                })
            };
            Spanned::new(kind, label.span)
        } else {
            self.parse_expr()
        };

        let key = label.map(|name| ExprKind::Literal(Literal::Symbol(name)));
        Some(HashEntry::Pair { key, value })
    }

    /// A label: `name:`, `"name":` or a keyword such as `if:`.
    fn parse_label(&mut self) -> Option<Spanned<SmolStr>> {
        if !(self.check_next(&TokenKind::Colon) && self.next_is_adjacent()) {
            return None;
        }
        let name = match &self.current.kind {
            TokenKind::Ident(name) | TokenKind::Const(name) => name.clone(),
            TokenKind::Str(lit) => lit.value.clone(),
            kind => SmolStr::from(kind.keyword_text()?),
        };
        let span = Span::new(self.current.span.start as u32, self.next.span.end as u32);
        self.advance();
        self.advance();
        Some(Spanned::new(name, span))
    }

    fn parse_hash_entries(&mut self) -> Vec<HashEntry> {
        let closer = TokenKind::RBrace;
        let entries = self.with_do_blocks(true, |p| {
            let mut entries = Vec::new();
            loop {
                p.skip_newlines();
                if p.at_end() || p.check(&closer) {
                    break;
                }

                if let Some(entry) = p.parse_hash_entry(Some(&closer)) {
                    entries.push(entry);
                } else {
                    let key = p.parse_expr();
                    p.skip_newlines();
                    p.consume(TokenKind::FatArrow, "'=>' in hash literal");
                    p.skip_newlines();
                    let value = p.parse_expr();
                    entries.push(HashEntry::Pair { key, value });
                }

                p.skip_newlines();
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            entries
        });
        self.skip_newlines();
        self.consume(closer, "'}'");
        entries
    }

    // ========================================================================
    // Blocks and lambdas
    // ========================================================================

    fn parse_brace_block(&mut self) -> BlockExpr {
        let start = self.current.span.start;
        self.advance(); // consume {

        self.push_scope(true);
        let params = self.parse_block_params();
        let body = self.with_do_blocks(true, |p| p.parse_body(BodyEnd::RBrace));
        self.consume(TokenKind::RBrace, "'}' to close block");
        self.pop_scope();

        BlockExpr {
            params,
            body,
            span: self.span(start),
        }
    }

    fn parse_do_block(&mut self) -> BlockExpr {
        let start = self.current.span.start;
        self.advance(); // consume do

        self.push_scope(true);
        let params = self.parse_block_params();
        let body = self.with_do_blocks(true, |p| p.parse_body_with_rescue());
        self.consume(TokenKind::End, "'end' to close block");
        self.pop_scope();

        BlockExpr {
            params,
            body,
            span: self.span(start),
        }
    }

    fn parse_block_params(&mut self) -> Vec<Param> {
        if self.eat(&TokenKind::OrOr) {
            return Vec::new();
        }
        if !self.eat(&TokenKind::Pipe) {
            return Vec::new();
        }
        let params = self.parse_param_list(Some(TokenKind::Pipe));
        self.consume(TokenKind::Pipe, "'|' to close block parameters");
        self.declare_params(&params);
        params
    }

    fn parse_lambda(&mut self, start: usize) -> BlockExpr {
        self.push_scope(true);

        let params = if self.eat(&TokenKind::LParen) {
            let params = self.parse_param_list(Some(TokenKind::RParen));
            self.consume(TokenKind::RParen, "')'");
            params
        } else if matches!(self.current.kind, TokenKind::Ident(_)) {
            self.parse_param_list(None)
        } else {
            Vec::new()
        };
        self.declare_params(&params);

        let body = if self.eat(&TokenKind::LBrace) {
            let body = self.with_do_blocks(true, |p| p.parse_body(BodyEnd::RBrace));
            self.consume(TokenKind::RBrace, "'}' to close lambda");
            body
        } else if self.eat(&TokenKind::Do) {
            let body = self.with_do_blocks(true, |p| p.parse_body_with_rescue());
            self.consume(TokenKind::End, "'end' to close lambda");
            body
        } else {
            self.error(ParseError::UnexpectedToken {
                expected: "lambda body".to_string(),
                found: self.current.kind.clone(),
                span: self.current.span.clone(),
            });
            Body::empty(self.current_span())
        };

        self.pop_scope();
        BlockExpr {
            params,
            body,
            span: self.span(start),
        }
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    fn parse_const_path(&mut self) -> Option<Spanned<ConstPath>> {
        let start = self.current.span.start;
        let absolute = self.eat(&TokenKind::ColonColon);

        let TokenKind::Const(first) = self.current.kind.clone() else {
            self.error(ParseError::ExpectedName {
                span: self.current.span.clone(),
            });
            return None;
        };
        self.advance();

        let mut segments = vec![first];
        self.parse_const_segments(&mut segments);
        Some(Spanned::new(
            ConstPath { absolute, segments },
            self.span(start),
        ))
    }

    fn parse_class(&mut self) -> Expr {
        let start = self.current.span.start;
        self.advance(); // consume class

        // `class << self`
        if self.eat(&TokenKind::Shl) {
            let target = self.parse_expr();
            self.push_scope(false);
            let body = self.parse_body(BodyEnd::End);
            self.pop_scope();
            self.consume(TokenKind::End, "'end' to close singleton class");
            return Spanned::new(
                ExprKind::SingletonClass(SingletonClassDef {
                    target: Box::new(target),
                    body,
                }),
                self.span(start),
            );
        }

        let Some(name) = self.parse_const_path() else {
            return self.skip_definition(start);
        };

        let superclass = if self.eat(&TokenKind::Lt) {
            Some(Box::new(self.parse_expr()))
        } else {
            None
        };

        self.push_scope(false);
        let body = self.parse_body_with_rescue();
        self.pop_scope();
        self.consume(TokenKind::End, "'end' to close class");

        Spanned::new(
            ExprKind::Class(ClassDef {
                name,
                superclass,
                body,
            }),
            self.span(start),
        )
    }

    fn parse_module(&mut self) -> Expr {
        let start = self.current.span.start;
        self.advance(); // consume module

        let Some(name) = self.parse_const_path() else {
            return self.skip_definition(start);
        };

        self.push_scope(false);
        let body = self.parse_body(BodyEnd::End);
        self.pop_scope();
        self.consume(TokenKind::End, "'end' to close module");

        Spanned::new(ExprKind::Module(ModuleDef { name, body }), self.span(start))
    }

    /// Recover from a definition with an unparseable header by skipping its
    /// body, so that its `end` does not close the enclosing namespace.
    fn skip_definition(&mut self, start: usize) -> Expr {
        self.push_scope(false);
        self.parse_body(BodyEnd::End);
        self.pop_scope();
        self.consume(TokenKind::End, "'end'");
        Spanned::new(ExprKind::Error, self.span(start))
    }

    fn parse_def(&mut self) -> Expr {
        let start = self.current.span.start;
        self.advance(); // consume def

        // Singleton receiver: `def self.foo`, `def Foo.bar`
        let receiver = if self.check_next(&TokenKind::Dot)
            && matches!(
                self.current.kind,
                TokenKind::SelfKw | TokenKind::Const(_) | TokenKind::Ident(_)
            ) {
            let receiver_span = self.current_span();
            let kind = match self.current.kind.clone() {
                TokenKind::Const(name) => ExprKind::Const(ConstPath {
                    absolute: false,
                    segments: vec![name],
                }),
                TokenKind::Ident(name) => ExprKind::Ident(name),
                _ => ExprKind::SelfRef,
            };
            self.advance();
            self.advance();
            Some(Box::new(Spanned::new(kind, receiver_span)))
        } else {
            None
        };

        let Some(name) = self.parse_def_name() else {
            self.error(ParseError::ExpectedName {
                span: self.current.span.clone(),
            });
            return self.skip_definition(start);
        };

        self.push_scope(false);

        let params = if self.check(&TokenKind::LParen) {
            self.advance();
            let params = self.parse_param_list(Some(TokenKind::RParen));
            self.consume(TokenKind::RParen, "')'");
            params
        } else if self.current.kind.is_terminator() || self.check(&TokenKind::Eq) {
            Vec::new()
        } else {
            self.parse_param_list(None)
        };
        self.declare_params(&params);

        // Endless method: `def foo = expr`
        let body = if self.eat(&TokenKind::Eq) {
            self.skip_newlines();
            let body_start = self.current.span.start;
            let expr = self.parse_statement();
            Body {
                statements: vec![expr],
                span: self.span(body_start),
            }
        } else {
            let body = self.parse_body_with_rescue();
            self.consume(TokenKind::End, "'end' to close method");
            body
        };

        self.pop_scope();

        Spanned::new(
            ExprKind::Def(MethodDef {
                receiver,
                name,
                params,
                body,
            }),
            self.span(start),
        )
    }

    fn parse_def_name(&mut self) -> Option<Spanned<SmolStr>> {
        let start = self.current.span.start;

        let name: SmolStr = match &self.current.kind {
            TokenKind::Ident(name) | TokenKind::Const(name) => name.clone(),
            TokenKind::LBracket => {
                self.advance();
                if !self.check(&TokenKind::RBracket) {
                    return None;
                }
                SmolStr::from("[]")
            }
            kind => {
                let text = kind.keyword_text().or_else(|| operator_method_name(kind))?;
                SmolStr::from(text)
            }
        };
        self.advance();

        // Setter: `def name=(value)`, `def []=(k, v)`
        let name = if self.check(&TokenKind::Eq)
            && !self.space_before_current()
            && (self.check_next(&TokenKind::LParen) || !self.next_is_adjacent())
            && !matches!(self.next.kind, TokenKind::Newline)
        {
            self.advance();
            SmolStr::from(format!("{}=", name))
        } else {
            name
        };

        Some(Spanned::new(name, self.span(start)))
    }

    /// Parameters up to (not including) `closer`, or to the end of the line.
    fn parse_param_list(&mut self, closer: Option<TokenKind>) -> Vec<Param> {
        let mut params = Vec::new();

        loop {
            if closer.is_some() {
                self.skip_newlines();
            }
            if self.at_end()
                || closer.as_ref().is_some_and(|c| self.check(c))
                || (closer.is_none() && self.current.kind.is_terminator())
            {
                break;
            }

            let start = self.current.span.start;
            let (name, kind, default) = match self.current.kind.clone() {
                TokenKind::Star => {
                    self.advance();
                    (self.param_name(), ParamKind::Rest, None)
                }
                TokenKind::StarStar => {
                    self.advance();
                    (self.param_name(), ParamKind::KeywordRest, None)
                }
                TokenKind::Amp => {
                    self.advance();
                    (self.param_name(), ParamKind::Block, None)
                }
                TokenKind::Ellipsis => {
                    self.advance();
                    (None, ParamKind::Rest, None)
                }
                TokenKind::Ident(name)
                    if self.check_next(&TokenKind::Colon) && self.next_is_adjacent() =>
                {
                    self.advance();
                    self.advance();
                    let default = if self.check(&TokenKind::Comma)
                        || self.current.kind.is_terminator()
                        || closer.as_ref().is_some_and(|c| self.check(c))
                    {
                        None
                    } else {
                        Some(self.parse_binary(Precedence::OrOr))
                    };
                    (Some(name), ParamKind::Keyword, default)
                }
                TokenKind::Ident(name) => {
                    self.advance();
                    if self.eat(&TokenKind::Eq) {
                        let default = self.parse_binary(Precedence::OrOr);
                        (Some(name), ParamKind::Optional, Some(default))
                    } else {
                        (Some(name), ParamKind::Required, None)
                    }
                }
                TokenKind::LParen => {
                    // Destructuring: `|(a, b), c|`
                    self.advance();
                    let inner = self.parse_param_list(Some(TokenKind::RParen));
                    self.consume(TokenKind::RParen, "')'");
                    self.declare_params(&inner);
                    (None, ParamKind::Required, None)
                }
                _ => {
                    self.error(ParseError::UnexpectedToken {
                        expected: "parameter".to_string(),
                        found: self.current.kind.clone(),
                        span: self.current.span.clone(),
                    });
                    break;
                }
            };

            params.push(Param {
                name,
                kind,
                default,
                span: self.span(start),
            });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        params
    }

    fn param_name(&mut self) -> Option<SmolStr> {
        if let TokenKind::Ident(name) = self.current.kind.clone() {
            self.advance();
            Some(name)
        } else {
            None
        }
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn parse_if(&mut self, negated: bool) -> Expr {
        let start = self.current.span.start;
        self.advance(); // consume if / unless

        let if_expr = self.parse_conditional(negated);
        self.consume(TokenKind::End, "'end' to close conditional");
        Spanned::new(ExprKind::If(if_expr), self.span(start))
    }

    /// Condition and branches after `if`/`unless`/`elsif`. The shared
    /// closing `end` is consumed by [`Parser::parse_if`].
    fn parse_conditional(&mut self, negated: bool) -> IfExpr {
        let condition = self.parse_not_expr();
        self.eat(&TokenKind::Then);

        let then_branch = self.parse_body(BodyEnd::Branch);

        let else_branch = match self.current.kind {
            TokenKind::Elsif => {
                let elsif_start = self.current.span.start;
                self.advance();
                let nested = self.parse_conditional(false);
                let span = self.span(elsif_start);
                Some(Body {
                    statements: vec![Spanned::new(ExprKind::If(nested), span)],
                    span,
                })
            }
            TokenKind::Else => {
                self.advance();
                Some(self.parse_body(BodyEnd::End))
            }
            _ => None,
        };

        IfExpr {
            condition: Box::new(condition),
            then_branch,
            else_branch,
            negated,
        }
    }

    fn parse_while(&mut self, negated: bool) -> Expr {
        let start = self.current.span.start;
        self.advance(); // consume while / until

        let condition = self.with_do_blocks(false, |p| p.parse_not_expr());
        self.eat(&TokenKind::Do);

        let body = self.parse_body(BodyEnd::End);
        self.consume(TokenKind::End, "'end' to close loop");

        Spanned::new(
            ExprKind::While(WhileExpr {
                condition: Box::new(condition),
                body,
                negated,
            }),
            self.span(start),
        )
    }

    fn parse_case(&mut self) -> Expr {
        let start = self.current.span.start;
        self.advance(); // consume case

        let subject = if self.current.kind.is_terminator() {
            None
        } else {
            Some(Box::new(self.parse_not_expr()))
        };
        self.skip_terminators();

        let mut whens = Vec::new();
        while self.eat(&TokenKind::When) {
            let mut patterns = vec![self.parse_expr()];
            while self.eat(&TokenKind::Comma) {
                self.skip_newlines();
                patterns.push(self.parse_expr());
            }
            self.eat(&TokenKind::Then);
            let body = self.parse_body(BodyEnd::When);
            whens.push(WhenClause { patterns, body });
        }

        if whens.is_empty() {
            self.error(ParseError::Unsupported {
                construct: "case without when",
                span: self.current.span.clone(),
            });
        }

        let else_branch = if self.eat(&TokenKind::Else) {
            Some(self.parse_body(BodyEnd::End))
        } else {
            None
        };
        self.consume(TokenKind::End, "'end' to close case");

        Spanned::new(
            ExprKind::Case(CaseExpr {
                subject,
                whens,
                else_branch,
            }),
            self.span(start),
        )
    }

    fn assign_target(&mut self, target: Expr) -> Expr {
        let span = target.span;
        match target.node {
            ExprKind::Call(call)
                if call.receiver.is_none() && call.args.is_empty() && !call.args.parenthesized =>
            {
                self.declare(&call.name.node);
                Spanned::new(ExprKind::Ident(call.name.node), span)
            }
            other => Spanned::new(other, span),
        }
    }
}

fn is_assignable(expr: &Expr) -> bool {
    match &expr.node {
        ExprKind::Ident(_) | ExprKind::Variable(_) | ExprKind::Const(_) | ExprKind::Splat(_) => {
            true
        }
        ExprKind::Call(call) => {
            call.block.is_none()
                && (call.args.is_empty() && !call.args.parenthesized
                    || call.name.node == "[]")
        }
        _ => false,
    }
}

fn operator_method_name(kind: &TokenKind) -> Option<&'static str> {
    let name = match kind {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::StarStar => "**",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::EqEq => "==",
        TokenKind::EqEqEq => "===",
        TokenKind::Ne => "!=",
        TokenKind::Match => "=~",
        TokenKind::Lt => "<",
        TokenKind::Gt => ">",
        TokenKind::Le => "<=",
        TokenKind::Ge => ">=",
        TokenKind::Spaceship => "<=>",
        TokenKind::Shl => "<<",
        TokenKind::Bang => "!",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SourceFile {
        let mut parser = Parser::new(source);
        let ast = parser.parse_source_file();
        let errors = parser.into_errors();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        ast
    }

    fn only_statement(body: &Body) -> &ExprKind {
        assert_eq!(body.statements.len(), 1, "{:#?}", body.statements);
        &body.statements[0].node
    }

    fn symbol(expr: &Expr) -> &str {
        match &expr.node {
            ExprKind::Literal(Literal::Symbol(s)) => s.as_str(),
            other => panic!("expected symbol, found {:?}", other),
        }
    }

    #[test]
    fn test_class_definition() {
        let ast = parse("class Foo::Bar < Base\nend");
        match only_statement(&ast.body) {
            ExprKind::Class(class) => {
                assert_eq!(class.name.to_string(), "Foo::Bar");
                assert!(class.superclass.is_some());
                assert!(class.body.statements.is_empty());
            }
            other => panic!("expected class, found {:?}", other),
        }
    }

    #[test]
    fn test_command_call_with_trailing_hash() {
        let ast = parse("delegate :foo, :bar, to: :baz, prefix: true");
        match only_statement(&ast.body) {
            ExprKind::Call(call) => {
                assert!(call.receiver.is_none());
                assert_eq!(call.name.node, "delegate");
                assert_eq!(call.args.positional.len(), 3);
                assert_eq!(call.args.raw_len(), 4);
                assert_eq!(symbol(&call.args.positional[0]), "foo");
                assert_eq!(symbol(&call.args.positional[1]), "bar");
                match &call.args.positional[2].node {
                    ExprKind::Hash(entries) => {
                        assert_eq!(entries.len(), 2);
                        match &entries[0] {
                            HashEntry::Pair { key, value } => {
                                assert_eq!(symbol(key), "to");
                                assert_eq!(symbol(value), "baz");
                            }
                            other => panic!("expected pair, found {:?}", other),
                        }
                    }
                    other => panic!("expected hash, found {:?}", other),
                }
            }
            other => panic!("expected call, found {:?}", other),
        }
    }

    #[test]
    fn test_rocket_pairs_and_parentheses() {
        let ast = parse("delegate(:foo, :to => :bar)");
        match only_statement(&ast.body) {
            ExprKind::Call(call) => {
                assert!(call.args.parenthesized);
                assert_eq!(call.args.positional.len(), 2);
                assert!(matches!(call.args.positional[1].node, ExprKind::Hash(_)));
            }
            other => panic!("expected call, found {:?}", other),
        }
    }

    #[test]
    fn test_multiline_arguments() {
        let ast = parse("class_attribute :foo,\n  instance_writer: false,\n  default: {}\n");
        match only_statement(&ast.body) {
            ExprKind::Call(call) => assert_eq!(call.args.positional.len(), 2),
            other => panic!("expected call, found {:?}", other),
        }
    }

    #[test]
    fn test_bare_visibility_is_a_call() {
        let ast = parse("class Foo\n  private\n  def bar; end\nend");
        let ExprKind::Class(class) = only_statement(&ast.body) else {
            panic!("expected class");
        };
        assert_eq!(class.body.statements.len(), 2);
        match &class.body.statements[0].node {
            ExprKind::Call(call) => {
                assert_eq!(call.name.node, "private");
                assert!(call.is_bare());
            }
            other => panic!("expected call, found {:?}", other),
        }
        assert!(matches!(class.body.statements[1].node, ExprKind::Def(_)));
    }

    #[test]
    fn test_local_variable_is_not_a_call() {
        let ast = parse("x = 1\nx");
        assert!(matches!(ast.body.statements[1].node, ExprKind::Ident(_)));
    }

    #[test]
    fn test_do_block_binds_to_outer_call() {
        let ast = parse("included do\n  delegate :a, to: :b\nend");
        match only_statement(&ast.body) {
            ExprKind::Call(call) => {
                assert_eq!(call.name.node, "included");
                let block = call.block.as_ref().expect("block");
                assert_eq!(block.body.statements.len(), 1);
            }
            other => panic!("expected call, found {:?}", other),
        }

        let ast = parse("describe Foo do\nend");
        match only_statement(&ast.body) {
            ExprKind::Call(call) => {
                assert_eq!(call.args.positional.len(), 1);
                assert!(call.block.is_some());
            }
            other => panic!("expected call, found {:?}", other),
        }
    }

    #[test]
    fn test_method_definitions() {
        let ast = parse(
            "def self.build(a, b = 1, *rest, key:, opt: 2, **kw, &blk)\n  a\nend\ndef name=(v)\nend\ndef ==(o) = true",
        );
        assert_eq!(ast.body.statements.len(), 3);
        match &ast.body.statements[0].node {
            ExprKind::Def(def) => {
                assert!(def.receiver.is_some());
                assert_eq!(def.name.node, "build");
                let kinds: Vec<_> = def.params.iter().map(|p| p.kind).collect();
                assert_eq!(
                    kinds,
                    vec![
                        ParamKind::Required,
                        ParamKind::Optional,
                        ParamKind::Rest,
                        ParamKind::Keyword,
                        ParamKind::Keyword,
                        ParamKind::KeywordRest,
                        ParamKind::Block,
                    ]
                );
            }
            other => panic!("expected def, found {:?}", other),
        }
        match &ast.body.statements[1].node {
            ExprKind::Def(def) => assert_eq!(def.name.node, "name="),
            other => panic!("expected def, found {:?}", other),
        }
        match &ast.body.statements[2].node {
            ExprKind::Def(def) => assert_eq!(def.name.node, "=="),
            other => panic!("expected def, found {:?}", other),
        }
    }

    #[test]
    fn test_modifiers_and_chains() {
        let ast = parse("scope :active, -> { where(active: true) }\nfoo.bar&.baz(1) if ready?\n");
        assert_eq!(ast.body.statements.len(), 2);
        match &ast.body.statements[1].node {
            ExprKind::If(if_expr) => {
                assert!(!if_expr.negated);
                assert!(matches!(
                    if_expr.then_branch.statements[0].node,
                    ExprKind::Call(CallExpr {
                        safe_navigation: true,
                        ..
                    })
                ));
            }
            other => panic!("expected if, found {:?}", other),
        }
    }

    #[test]
    fn test_control_flow() {
        let ast = parse(
            "if a\n  b\nelsif c\n  d\nelse\n  e\nend\ncase x\nwhen 1, 2 then :low\nelse :high\nend\nbegin\n  go\nrescue Foo => e\n  e\nensure\n  done\nend\n",
        );
        assert_eq!(ast.body.statements.len(), 3);
        assert!(matches!(ast.body.statements[0].node, ExprKind::If(_)));
        match &ast.body.statements[1].node {
            ExprKind::Case(case) => {
                assert_eq!(case.whens.len(), 1);
                assert_eq!(case.whens[0].patterns.len(), 2);
            }
            other => panic!("expected case, found {:?}", other),
        }
        match &ast.body.statements[2].node {
            ExprKind::Begin(begin) => {
                assert_eq!(begin.rescues.len(), 1);
                assert!(begin.ensure.is_some());
            }
            other => panic!("expected begin, found {:?}", other),
        }
    }

    #[test]
    fn test_absolute_and_nested_constants() {
        let ast = parse("module ::Outer::Inner\nend\nFoo::Bar::Baz.new");
        match &ast.body.statements[0].node {
            ExprKind::Module(module) => {
                assert!(module.name.absolute);
                assert_eq!(module.name.segments.len(), 2);
            }
            other => panic!("expected module, found {:?}", other),
        }
        match &ast.body.statements[1].node {
            ExprKind::Call(call) => match &call.receiver.as_deref().map(|r| &r.node) {
                Some(ExprKind::Const(path)) => assert_eq!(path.to_string(), "Foo::Bar::Baz"),
                other => panic!("expected const receiver, found {:?}", other),
            },
            other => panic!("expected call, found {:?}", other),
        }
    }

    #[test]
    fn test_error_recovery_keeps_later_statements() {
        let mut parser = Parser::new("class Foo\n  foo(]\n  delegate :a, to: :b\nend\n");
        let ast = parser.parse_source_file();
        assert!(!parser.into_errors().is_empty());

        let ExprKind::Class(class) = &ast.body.statements[0].node else {
            panic!("expected class");
        };
        assert!(class.body.statements.iter().any(|stmt| matches!(
            &stmt.node,
            ExprKind::Call(call) if call.name.node == "delegate"
        )));
    }

    fn nesting_errors(source: &str) -> Vec<ParseError> {
        let mut parser = Parser::new(source);
        parser.parse_source_file();
        parser.into_errors()
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let sources = [
            "[".repeat(5000),
            format!("{}x", "!".repeat(5000)),
            format!("{}1", "1 ** ".repeat(5000)),
            format!("x = {}", "(".repeat(5000)),
            format!("{}x", "not ".repeat(5000)),
        ];
        for source in &sources {
            let errors = nesting_errors(source);
            assert_eq!(errors.len(), 1, "{:?}", errors);
            assert!(matches!(errors[0], ParseError::TooDeep { .. }));
        }
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let source = format!("x = {}1{}", "[".repeat(20), "]".repeat(20));
        let ast = parse(&source);
        assert_eq!(ast.body.statements.len(), 1);

        let source = format!("{}x", "!".repeat(30));
        parse(&source);
    }
}
