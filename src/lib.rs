//! Evaluates calculator prompts of the form `calc '<equation>'`.
//!
//! A [`Lexer`] turns the prompt into tokens, the [`Parser`] checks the
//! envelope and builds an [`Expr`] by precedence climbing, and
//! [`Expr::evaluate`] reduces the tree to a number.
//!
//! ```
//! let mut parser = lexical_calc::Parser::new();
//! assert_eq!(parser.evaluate("calc '2 + 3 * 5'").unwrap(), 17.0);
//! assert_eq!(parser.evaluate("calc '-ans'").unwrap(), -17.0);
//! ```

pub mod error;
pub mod eval;
pub mod lex;
pub mod parse;

pub use error::CalcError;
pub use lex::{Lexer, Token, TokenKind};
pub use parse::{Expr, Op, Parser, TokenStream};
