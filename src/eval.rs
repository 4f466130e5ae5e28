use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::parse::{Expr, Op};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[error("division by zero")]
pub struct ZeroDivision {
    #[label("this division")]
    pub span: Option<SourceSpan>,
}

impl Expr {
    /// Computes the value of the tree. Both operands are evaluated before the
    /// operator is applied.
    pub fn evaluate(&self) -> Result<f64, ZeroDivision> {
        Ok(match self {
            Expr::Value { value, .. } => *value,
            Expr::Unary { op, operand, .. } => apply(*op, 0.0, operand.evaluate()?, None)?,
            Expr::Binary {
                op,
                lhs,
                rhs,
                token,
            } => {
                let lhs = lhs.evaluate()?;
                let rhs = rhs.evaluate()?;
                apply(*op, lhs, rhs, token.as_ref().map(|token| token.span()))?
            }
        })
    }
}

fn apply(op: Op, lhs: f64, rhs: f64, span: Option<SourceSpan>) -> Result<f64, ZeroDivision> {
    Ok(match op {
        Op::Plus => lhs + rhs,
        Op::Minus => lhs - rhs,
        Op::Star => lhs * rhs,
        Op::Slash => {
            if rhs == 0.0 {
                return Err(ZeroDivision { span });
            }
            lhs / rhs
        }
        Op::Caret => lhs.powf(rhs),
    })
}
