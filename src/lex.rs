use std::fmt::Display;

use bytes::Bytes;
use miette::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    literal: Bytes,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Calc,
    Ans,
    SingleQuote,
    LParen,
    RParen,
    LSqBrack,
    RSqBrack,
    LCurBrack,
    RCurBrack,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Circumflex,
    Int,
    Float,
    Unknown,
    Eof,
}

impl TokenKind {
    /// The closer expected for an opening bracket.
    pub fn closing_bracket(self) -> Option<TokenKind> {
        match self {
            TokenKind::LParen => Some(TokenKind::RParen),
            TokenKind::LSqBrack => Some(TokenKind::RSqBrack),
            TokenKind::LCurBrack => Some(TokenKind::RCurBrack),
            _ => None,
        }
    }

    /// The opener a closing bracket pairs with.
    pub fn opening_bracket(self) -> Option<TokenKind> {
        match self {
            TokenKind::RParen => Some(TokenKind::LParen),
            TokenKind::RSqBrack => Some(TokenKind::LSqBrack),
            TokenKind::RCurBrack => Some(TokenKind::LCurBrack),
            _ => None,
        }
    }

    pub fn is_opening_bracket(self) -> bool {
        self.closing_bracket().is_some()
    }

    pub fn is_closing_bracket(self) -> bool {
        self.opening_bracket().is_some()
    }
}

impl Token {
    fn eof(offset: usize) -> Self {
        Token {
            kind: TokenKind::Eof,
            literal: Bytes::from_static(b"EOF"),
            offset,
        }
    }

    pub fn literal(&self) -> &str {
        // literals are sliced on char boundaries of a `&str`
        std::str::from_utf8(&self.literal).unwrap_or_default()
    }

    pub fn span(&self) -> SourceSpan {
        match self.kind {
            TokenKind::Eof => SourceSpan::from(self.offset..self.offset),
            _ => SourceSpan::from(self.offset..self.offset + self.literal.len()),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal();
        match self.kind {
            TokenKind::Calc => write!(f, "CALC {lit} null"),
            TokenKind::Ans => write!(f, "ANS {lit} null"),
            TokenKind::SingleQuote => write!(f, "SINGLEQUOTE {lit} null"),
            TokenKind::LParen => write!(f, "LPAREN {lit} null"),
            TokenKind::RParen => write!(f, "RPAREN {lit} null"),
            TokenKind::LSqBrack => write!(f, "LSQBRACK {lit} null"),
            TokenKind::RSqBrack => write!(f, "RSQBRACK {lit} null"),
            TokenKind::LCurBrack => write!(f, "LCURBRACK {lit} null"),
            TokenKind::RCurBrack => write!(f, "RCURBRACK {lit} null"),
            TokenKind::Plus => write!(f, "PLUS {lit} null"),
            TokenKind::Minus => write!(f, "MINUS {lit} null"),
            TokenKind::Asterisk => write!(f, "ASTERISK {lit} null"),
            TokenKind::Slash => write!(f, "SLASH {lit} null"),
            TokenKind::Circumflex => write!(f, "CIRCUMFLEX {lit} null"),
            TokenKind::Int | TokenKind::Float => {
                let kind = if self.kind == TokenKind::Int {
                    "INT"
                } else {
                    "FLOAT"
                };
                match lit.parse::<f64>() {
                    Ok(n) => write!(f, "{kind} {lit} {n}"),
                    Err(_) => write!(f, "{kind} {lit} null"),
                }
            }
            TokenKind::Unknown => write!(f, "UNKNOWN {lit} null"),
            TokenKind::Eof => write!(f, "EOF {lit} null"),
        }
    }
}

/// Lazily splits a prompt into [`Token`]s.
///
/// A single lexer is meant to be reused: [`Lexer::input`] swaps the buffer and
/// rewinds the cursor without reallocating the lexer itself.
#[derive(Debug, Default)]
pub struct Lexer {
    whole: Bytes,
    pub byte: usize,
}

impl Lexer {
    pub fn new() -> Self {
        Lexer::default()
    }

    pub fn input(&mut self, data: &str) {
        self.whole = Bytes::copy_from_slice(data.as_bytes());
        self.byte = 0;
    }

    /// The prompt currently being scanned.
    pub fn source(&self) -> &str {
        std::str::from_utf8(&self.whole).unwrap_or_default()
    }

    /// Returns the next token, or an `Eof` token for every call past the end.
    pub fn next_token(&mut self) -> Token {
        let skipped = self.whole[self.byte..]
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
            .count();
        self.byte += skipped;

        let start = self.byte;
        let Some(&c) = self.whole.get(start) else {
            return Token::eof(self.whole.len());
        };

        enum Start {
            Number,
            Word,
            Other,
        }

        let mut process = |kind: TokenKind, len: usize| {
            self.byte = start + len;
            let token = Token {
                kind,
                literal: self.whole.slice(start..start + len),
                offset: start,
            };
            log::trace!("scanned {:?} {:?} at {}", token.kind, token.literal(), start);
            token
        };

        let started = match c {
            b'\'' => return process(TokenKind::SingleQuote, 1),
            b'(' => return process(TokenKind::LParen, 1),
            b')' => return process(TokenKind::RParen, 1),
            b'[' => return process(TokenKind::LSqBrack, 1),
            b']' => return process(TokenKind::RSqBrack, 1),
            b'{' => return process(TokenKind::LCurBrack, 1),
            b'}' => return process(TokenKind::RCurBrack, 1),
            b'+' => return process(TokenKind::Plus, 1),
            b'-' => return process(TokenKind::Minus, 1),
            b'*' => return process(TokenKind::Asterisk, 1),
            b'/' => return process(TokenKind::Slash, 1),
            b'^' => return process(TokenKind::Circumflex, 1),
            b'0'..=b'9' => Start::Number,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => Start::Word,
            _ => Start::Other,
        };

        let rest = &self.whole[start..];
        let (kind, len) = match started {
            Start::Number => {
                let mut len = 1;
                let mut separators = 0;
                let mut dangling = false;
                while let Some(&b) = rest.get(len) {
                    match b {
                        b'0'..=b'9' => len += 1,
                        b'.' => {
                            separators += 1;
                            len += 1;
                            if !rest.get(len).is_some_and(u8::is_ascii_digit) {
                                dangling = true;
                            }
                        }
                        _ => break,
                    }
                }
                let kind = match separators {
                    _ if dangling => TokenKind::Unknown,
                    0 => TokenKind::Int,
                    1 => TokenKind::Float,
                    _ => TokenKind::Unknown,
                };
                (kind, len)
            }
            Start::Word => {
                let len = rest
                    .iter()
                    .position(|b| !matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'_'))
                    .unwrap_or(rest.len());
                let kind = match &rest[..len] {
                    b"calc" => TokenKind::Calc,
                    b"ans" => TokenKind::Ans,
                    _ => TokenKind::Unknown,
                };
                (kind, len)
            }
            Start::Other => {
                // keep multi-byte characters whole; a char is at most 4 bytes
                let window = &rest[..rest.len().min(4)];
                let leading = match std::str::from_utf8(window) {
                    Ok(s) => s,
                    Err(e) => std::str::from_utf8(&window[..e.valid_up_to()]).unwrap_or_default(),
                };
                let len = leading.chars().next().map_or(1, char::len_utf8);
                (TokenKind::Unknown, len)
            }
        };

        process(kind, len)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> Vec<(TokenKind, String)> {
        let mut lexer = Lexer::new();
        lexer.input(input);
        lexer
            .map(|token| (token.kind, token.literal().to_string()))
            .collect()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        scan(input).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn empty_input_is_eof() {
        let mut lexer = Lexer::new();
        lexer.input("");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Eof);
        assert_eq!(token.literal(), "EOF");
    }

    #[test]
    fn eof_is_idempotent() {
        let mut lexer = Lexer::new();
        lexer.input("1");
        assert_eq!(lexer.next_token().kind, TokenKind::Int);
        for _ in 0..3 {
            let token = lexer.next_token();
            assert_eq!(token.kind, TokenKind::Eof);
            assert_eq!(token.offset, 1);
        }
    }

    #[test]
    fn single_character_tokens() {
        assert_eq!(
            kinds("'()[]{}+-*/^"),
            vec![
                TokenKind::SingleQuote,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LSqBrack,
                TokenKind::RSqBrack,
                TokenKind::LCurBrack,
                TokenKind::RCurBrack,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Asterisk,
                TokenKind::Slash,
                TokenKind::Circumflex,
            ]
        );
    }

    #[test]
    fn whitespace_is_skipped() {
        assert_eq!(
            kinds("    - \n+\r-*/\t'"),
            vec![
                TokenKind::Minus,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Asterisk,
                TokenKind::Slash,
                TokenKind::SingleQuote,
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            scan("368000 12345 2.25"),
            vec![
                (TokenKind::Int, "368000".to_string()),
                (TokenKind::Int, "12345".to_string()),
                (TokenKind::Float, "2.25".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_numbers_keep_their_literal() {
        assert_eq!(
            scan("1. 1..2 1.2.3 4"),
            vec![
                (TokenKind::Unknown, "1.".to_string()),
                (TokenKind::Unknown, "1..2".to_string()),
                (TokenKind::Unknown, "1.2.3".to_string()),
                (TokenKind::Int, "4".to_string()),
            ]
        );
    }

    #[test]
    fn words() {
        assert_eq!(
            scan("calc ans hello_World calcx"),
            vec![
                (TokenKind::Calc, "calc".to_string()),
                (TokenKind::Ans, "ans".to_string()),
                (TokenKind::Unknown, "hello_World".to_string()),
                (TokenKind::Unknown, "calcx".to_string()),
            ]
        );
    }

    #[test]
    fn word_stops_at_digit() {
        assert_eq!(
            scan("ans2"),
            vec![
                (TokenKind::Ans, "ans".to_string()),
                (TokenKind::Int, "2".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_characters() {
        assert_eq!(
            scan("5 % é"),
            vec![
                (TokenKind::Int, "5".to_string()),
                (TokenKind::Unknown, "%".to_string()),
                (TokenKind::Unknown, "é".to_string()),
            ]
        );
    }

    #[test]
    fn mixed_width_unknown_characters() {
        assert_eq!(
            scan("é€𝄞%é"),
            vec![
                (TokenKind::Unknown, "é".to_string()),
                (TokenKind::Unknown, "€".to_string()),
                (TokenKind::Unknown, "𝄞".to_string()),
                (TokenKind::Unknown, "%".to_string()),
                (TokenKind::Unknown, "é".to_string()),
            ]
        );
    }

    #[test]
    fn long_runs_of_unknown_characters() {
        let input = "%€".repeat(100_000);
        let mut lexer = Lexer::new();
        lexer.input(&input);
        let mut count = 0;
        let mut end = 0;
        for token in lexer {
            assert_eq!(token.kind, TokenKind::Unknown);
            count += 1;
            end = token.offset + token.literal().len();
        }
        assert_eq!(count, 200_000);
        assert_eq!(end, input.len());
    }

    #[test]
    fn full_prompt() {
        assert_eq!(
            kinds("calc '5 + 5'"),
            vec![
                TokenKind::Calc,
                TokenKind::SingleQuote,
                TokenKind::Int,
                TokenKind::Plus,
                TokenKind::Int,
                TokenKind::SingleQuote,
            ]
        );
    }

    #[test]
    fn input_resets_cursor() {
        let mut lexer = Lexer::new();
        lexer.input("Hello, world!");
        lexer.next_token();
        lexer.input("Goodbye");
        assert_eq!(lexer.source(), "Goodbye");
        let token = lexer.next_token();
        assert_eq!(token.literal(), "Goodbye");
        assert_eq!(token.offset, 0);
    }

    #[test]
    fn spans_and_display() {
        let mut lexer = Lexer::new();
        lexer.input("  2.5 +");
        let number = lexer.next_token();
        assert_eq!(number.span(), SourceSpan::from(2..5));
        assert_eq!(number.to_string(), "FLOAT 2.5 2.5");
        assert_eq!(lexer.next_token().to_string(), "PLUS + null");
        let eof = lexer.next_token();
        assert_eq!(eof.span(), SourceSpan::from(7..7));
        assert_eq!(eof.to_string(), "EOF EOF null");
    }
}
