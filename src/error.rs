use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Everything that can go wrong while evaluating a `calc '...'` prompt.
#[derive(Error, Debug, Diagnostic)]
pub enum CalcError {
    #[error("incorrect prompt")]
    #[diagnostic(
        code(calc::prompt),
        help("prompts look like `calc '<equation>'`")
    )]
    Prompt {
        #[source_code]
        src: NamedSource<String>,

        #[label("expected `calc '<equation>'`")]
        span: SourceSpan,
    },

    #[error("missing prompt opening quote")]
    #[diagnostic(
        code(calc::opening_quote),
        help("wrap the equation in single quotes: `calc '1 + 1'`")
    )]
    OpeningQuote {
        #[source_code]
        src: NamedSource<String>,

        #[label("expected `'` here")]
        span: SourceSpan,
    },

    #[error("missing prompt closing quote")]
    #[diagnostic(
        code(calc::closing_quote),
        help("add a trailing `'` to terminate the equation")
    )]
    ClosingQuote {
        #[source_code]
        src: NamedSource<String>,

        #[label("this quote is never closed")]
        span: SourceSpan,
    },

    #[error("incorrect equation format: {reason}")]
    #[diagnostic(
        code(calc::equation),
        help("equations use numbers, `ans`, `+ - * / ^` and balanced `()`, `[]`, `{{}}`")
    )]
    Equation {
        #[source_code]
        src: NamedSource<String>,

        #[label("here")]
        span: SourceSpan,

        reason: &'static str,
    },

    #[error("division by zero")]
    #[diagnostic(code(calc::zero_division))]
    ZeroDivision {
        #[source_code]
        src: NamedSource<String>,

        #[label("the right operand of this division is zero")]
        span: Option<SourceSpan>,
    },
}

impl CalcError {
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            CalcError::Prompt { span, .. }
            | CalcError::OpeningQuote { span, .. }
            | CalcError::ClosingQuote { span, .. }
            | CalcError::Equation { span, .. } => Some(*span),
            CalcError::ZeroDivision { span, .. } => *span,
        }
    }
}
