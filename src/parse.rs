use std::fmt::Display;

use miette::{NamedSource, SourceSpan};

use crate::{
    CalcError, Lexer,
    lex::{Token, TokenKind},
};

/// Bound on nested prefix operators and brackets.
const MAX_DEPTH: usize = 100;
/// Bound on tree height, so evaluating, printing and dropping stay within the stack.
const MAX_HEIGHT: usize = 1000;

/// Parses `calc '<equation>'` prompts and keeps the `ans` register between them.
#[derive(Debug, Default)]
pub struct Parser {
    lexer: Lexer,
    stream: TokenStream,
    /// Offset of the closing quote, where "ran out of tokens" errors point.
    end: usize,
    /// Active `parse_within` frames.
    depth: usize,
    last_answer: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Value {
        value: f64,
        token: Option<Token>,
    },
    Unary {
        op: Op,
        operand: Box<Expr>,
        token: Option<Token>,
    },
    Binary {
        op: Op,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        token: Option<Token>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
}

impl Op {
    pub fn from_kind(kind: TokenKind) -> Option<Op> {
        match kind {
            TokenKind::Plus => Some(Op::Plus),
            TokenKind::Minus => Some(Op::Minus),
            TokenKind::Asterisk => Some(Op::Star),
            TokenKind::Slash => Some(Op::Slash),
            TokenKind::Circumflex => Some(Op::Caret),
            _ => None,
        }
    }
}

impl Expr {
    pub fn value(value: f64) -> Self {
        Expr::Value { value, token: None }
    }

    pub fn unary(op: Op, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
            token: None,
        }
    }

    pub fn binary(op: Op, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            Expr::Value { token, .. } | Expr::Unary { token, .. } | Expr::Binary { token, .. } => {
                token.as_ref()
            }
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Plus => write!(f, "+"),
            Op::Minus => write!(f, "-"),
            Op::Star => write!(f, "*"),
            Op::Slash => write!(f, "/"),
            Op::Caret => write!(f, "^"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Value { value, .. } => write!(f, "{value}"),
            Expr::Unary { op, operand, .. } => write!(f, "({op} {operand})"),
            Expr::Binary { op, lhs, rhs, .. } => write!(f, "({op} {lhs} {rhs})"),
        }
    }
}

/// The tokens found between the quotes of a prompt, consumed front to back.
#[derive(Debug, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        TokenStream { tokens, cursor: 0 }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    pub fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    pub fn reset(&mut self) {
        self.tokens.clear();
        self.cursor = 0;
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Parser {
    pub fn new() -> Self {
        Parser::default()
    }

    pub fn with_lexer(lexer: Lexer) -> Self {
        Parser {
            lexer,
            ..Parser::default()
        }
    }

    /// Resets the per-prompt state and hands `text` to the lexer. `ans` survives.
    pub fn input(&mut self, text: &str) {
        self.stream.reset();
        self.end = text.len();
        self.depth = 0;
        self.lexer.input(text);
    }

    /// Parses and evaluates a prompt, storing the result as the new `ans`.
    pub fn evaluate(&mut self, text: &str) -> Result<f64, CalcError> {
        let expr = self.parse(text)?;
        let answer = expr
            .evaluate()
            .map_err(|e| CalcError::ZeroDivision {
                src: self.named_source(),
                span: e.span,
            })?;
        log::debug!("{expr} = {answer}");
        self.last_answer = answer;
        Ok(answer)
    }

    pub fn parse(&mut self, text: &str) -> Result<Expr, CalcError> {
        self.input(text);
        self.parse_prompt()?;
        let expr = self.parse_equation(0)?;
        if let Some(token) = self.stream.peek() {
            return Err(self.equation_error(token.span(), "unexpected token after equation"));
        }
        log::debug!("parsed {expr}");
        Ok(expr)
    }

    pub fn last_answer(&self) -> f64 {
        self.last_answer
    }

    pub fn clear_last_answer(&mut self) {
        self.last_answer = 0.0;
    }

    /// Tokens collected from between the quotes by the last [`Parser::parse_prompt`].
    pub fn tokens(&self) -> &[Token] {
        self.stream.as_slice()
    }

    /// Validates the `calc '...'` envelope and collects the inner tokens.
    pub fn parse_prompt(&mut self) -> Result<(), CalcError> {
        let calc = self.lexer.next_token();
        if calc.kind != TokenKind::Calc {
            return Err(CalcError::Prompt {
                src: self.named_source(),
                span: calc.span(),
            });
        }

        let opening = self.lexer.next_token();
        match opening.kind {
            TokenKind::SingleQuote => {}
            TokenKind::Eof => {
                return Err(CalcError::Prompt {
                    src: self.named_source(),
                    span: calc.span(),
                });
            }
            _ => {
                return Err(CalcError::OpeningQuote {
                    src: self.named_source(),
                    span: opening.span(),
                });
            }
        }

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::SingleQuote => {
                    self.end = token.offset;
                    break;
                }
                TokenKind::Eof => {
                    return Err(CalcError::ClosingQuote {
                        src: self.named_source(),
                        span: opening.span(),
                    });
                }
                _ => self.stream.push(token),
            }
        }

        let trailing = self.lexer.next_token();
        if trailing.kind != TokenKind::Eof {
            let span = trailing.span();
            return Err(self.equation_error(span, "unexpected input after closing quote"));
        }
        log::debug!("collected {} equation tokens", self.stream.len());

        if let Some(span) = unbalanced_bracket(self.stream.as_slice()) {
            return Err(self.equation_error(span, "unbalanced brackets"));
        }
        Ok(())
    }

    /// Precedence climbing over the collected tokens.
    pub fn parse_equation(&mut self, min_bp: u8) -> Result<Expr, CalcError> {
        self.parse_within(min_bp).map(|(expr, _)| expr)
    }

    /// Like [`Parser::parse_equation`], also returning the height of the tree.
    fn parse_within(&mut self, min_bp: u8) -> Result<(Expr, usize), CalcError> {
        if self.depth >= MAX_DEPTH {
            let span = self.stream.peek().map_or(self.end_span(), Token::span);
            return Err(self.equation_error(span, "equation nested too deeply"));
        }
        self.depth += 1;
        let parsed = self.parse_nested(min_bp);
        self.depth -= 1;
        parsed
    }

    fn parse_nested(&mut self, min_bp: u8) -> Result<(Expr, usize), CalcError> {
        let Some(lhs) = self.stream.advance().cloned() else {
            return Err(self.equation_error(self.end_span(), "missing operand"));
        };

        let (mut lhs, mut height) = match lhs.kind {
            TokenKind::Int | TokenKind::Float => {
                let value = lhs
                    .literal()
                    .parse::<f64>()
                    .map_err(|_| self.equation_error(lhs.span(), "invalid number"))?;
                let value = Expr::Value {
                    value,
                    token: Some(lhs),
                };
                (value, 1)
            }
            TokenKind::Ans => {
                let value = Expr::Value {
                    value: self.last_answer,
                    token: Some(lhs),
                };
                (value, 1)
            }
            TokenKind::LParen | TokenKind::LSqBrack | TokenKind::LCurBrack => {
                let terminator = lhs.kind.closing_bracket();
                let inner = self.parse_within(0)?;
                match self.stream.advance() {
                    Some(token) if Some(token.kind) == terminator => {}
                    Some(token) => {
                        let span = token.span();
                        return Err(self.equation_error(span, "mismatched closing bracket"));
                    }
                    None => {
                        return Err(self.equation_error(lhs.span(), "bracket is never closed"));
                    }
                }
                inner
            }
            kind => {
                let Some(op) = Op::from_kind(kind) else {
                    return Err(self.equation_error(lhs.span(), "expected a number"));
                };
                let Some(((), r_bp)) = prefix_binding_power(op) else {
                    return Err(self.equation_error(lhs.span(), "not a prefix operator"));
                };
                let (operand, operand_height) = self.parse_within(r_bp)?;
                let unary = Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    token: Some(lhs),
                };
                (unary, operand_height + 1)
            }
        };

        loop {
            let Some(token) = self.stream.peek() else {
                break;
            };
            if token.kind.is_closing_bracket() {
                break;
            }
            let Some(op) = Op::from_kind(token.kind) else {
                let span = token.span();
                return Err(self.equation_error(span, "missing operator"));
            };

            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }

            let token = self.stream.advance().cloned();
            let (rhs, rhs_height) = self.parse_within(r_bp)?;
            height = height.max(rhs_height) + 1;
            if height > MAX_HEIGHT {
                let span = token.as_ref().map_or(self.end_span(), Token::span);
                return Err(self.equation_error(span, "equation nested too deeply"));
            }
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                token,
            };
        }

        Ok((lhs, height))
    }

    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new("<prompt>", self.lexer.source().to_string())
    }

    fn end_span(&self) -> SourceSpan {
        SourceSpan::from(self.end..self.end)
    }

    fn equation_error(&self, span: SourceSpan, reason: &'static str) -> CalcError {
        CalcError::Equation {
            src: self.named_source(),
            span,
            reason,
        }
    }
}

/// Finds the first bracket that breaks nesting: a closer with no matching
/// opener, an empty pair like `()`, or an opener that is never closed.
fn unbalanced_bracket(tokens: &[Token]) -> Option<SourceSpan> {
    let mut openers: Vec<&Token> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        if token.kind.is_opening_bracket() {
            openers.push(token);
            continue;
        }
        let Some(opener) = token.kind.opening_bracket() else {
            continue;
        };

        let previous = i.checked_sub(1).and_then(|p| tokens.get(p));
        if previous.is_some_and(|p| p.kind == opener) {
            return Some(token.span());
        }
        match openers.pop() {
            Some(top) if top.kind == opener => {}
            _ => return Some(token.span()),
        }
    }

    openers.last().map(|token| token.span())
}

fn prefix_binding_power(op: Op) -> Option<((), u8)> {
    match op {
        Op::Plus | Op::Minus => Some(((), 5)),
        _ => None,
    }
}

// ^ shares the left-associative spacing of the other operators
fn infix_binding_power(op: Op) -> (u8, u8) {
    match op {
        Op::Plus | Op::Minus => (1, 2),
        Op::Star | Op::Slash => (3, 4),
        Op::Caret => (6, 7),
    }
}
