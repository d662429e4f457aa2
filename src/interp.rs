//! Evaluación directa del árbol sintáctico.
//!
//! La división trunca hacia cero, igual que `sdiv` e `idiv` en el
//! código generado.

use thiserror::Error;

use crate::parse::{BinOp, Expr};

#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EvalError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow in `{0}`")]
    Overflow(BinOp),
}

/// Evalúa una expresión en orden posterior, izquierda antes que derecha.
pub fn evaluate(expr: &Expr) -> Result<i64, EvalError> {
    let (op, lhs, rhs) = match expr {
        Expr::Integer(integer) => return Ok(*integer),
        Expr::Binary { op, lhs, rhs } => (*op, evaluate(lhs)?, evaluate(rhs)?),
    };

    let result = match op {
        BinOp::Add => lhs.checked_add(rhs),
        BinOp::Sub => lhs.checked_sub(rhs),
        BinOp::Mul => lhs.checked_mul(rhs),
        BinOp::Div if rhs == 0 => return Err(EvalError::DivisionByZero),
        BinOp::Div => lhs.checked_div(rhs),
    };

    result.ok_or(EvalError::Overflow(op))
}
