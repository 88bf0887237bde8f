use crate::environment::Bindings;
use crate::error::EvaluationError;
use crate::value::Value;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
}

impl CompareOp {
    fn holds(self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => lhs == rhs,
        }
    }
}

/// Parsed expression tree.
///
/// The only leaves are numeric literals and identifiers resolved through
/// [`Bindings`]; nothing else is reachable while evaluating.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Decimal),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `a + b - c` or `a * b / c`, applied left to right. Operators of one
    /// precedence level share a flat list, so tree depth does not grow with
    /// the length of a chain.
    Chain {
        first: Box<Expr>,
        rest: Vec<(BinaryOp, Expr)>,
    },
    /// `a < b <= c` holds when every adjacent pair holds.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CompareOp, Expr)>,
    },
}

impl Expr {
    pub fn eval<B: Bindings + ?Sized>(&self, bindings: &B) -> Result<Value, EvaluationError> {
        match self {
            Expr::Number(n) => Ok(Value::Decimal(*n)),
            Expr::Ident(name) => bindings
                .lookup(name)
                .ok_or_else(|| EvaluationError::UnknownIdentifier(name.clone())),
            Expr::Unary { op, operand } => {
                let value = operand.eval(bindings)?.as_decimal();
                Ok(Value::Decimal(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Minus => -value,
                }))
            }
            Expr::Chain { first, rest } => {
                let mut acc = first.eval(bindings)?.as_decimal();
                for (op, operand) in rest {
                    let rhs = operand.eval(bindings)?.as_decimal();
                    acc = apply(*op, acc, rhs)?;
                }
                Ok(Value::Decimal(acc))
            }
            Expr::Compare { first, rest } => {
                let mut lhs = first.eval(bindings)?.as_decimal();
                for (op, operand) in rest {
                    let rhs = operand.eval(bindings)?.as_decimal();
                    if !op.holds(lhs, rhs) {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
        }
    }
}

fn apply(op: BinaryOp, lhs: Decimal, rhs: Decimal) -> Result<Decimal, EvaluationError> {
    match op {
        BinaryOp::Add => lhs.checked_add(rhs).ok_or(EvaluationError::Overflow),
        BinaryOp::Sub => lhs.checked_sub(rhs).ok_or(EvaluationError::Overflow),
        BinaryOp::Mul => lhs.checked_mul(rhs).ok_or(EvaluationError::Overflow),
        BinaryOp::Div => {
            if rhs.is_zero() {
                return Err(EvaluationError::DivisionByZero);
            }
            lhs.checked_div(rhs).ok_or(EvaluationError::Overflow)
        }
        BinaryOp::Rem => {
            if rhs.is_zero() {
                return Err(EvaluationError::DivisionByZero);
            }
            let rem = lhs.checked_rem(rhs).ok_or(EvaluationError::Overflow)?;
            // floored modulo: the result takes the sign of the divisor
            if !rem.is_zero() && rem.is_sign_negative() != rhs.is_sign_negative() {
                rem.checked_add(rhs).ok_or(EvaluationError::Overflow)
            } else {
                Ok(rem)
            }
        }
    }
}
