//! Arithmetic expressions over the four basic operators.
//!
//! The engine decomposes a compound expression such as `(9-4)*3+9` into the ordered
//! atomic steps a solver performs (`9-4=5`, `5*3=15`, `15+9=24`), which is what the trace
//! graph needs to materialize intermediate states.

mod eval;
mod lexer;
mod number;
mod operation;

pub use crate::eval::{evaluate, evaluate_str, sub_operations, Evaluation, SubOperation};
pub use crate::lexer::{literal_operands, tokenize, Operator, Token};
pub use crate::number::{Number, ParseNumberError};
pub use crate::operation::{split_operation, Operation};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("invalid character {ch:?} at offset {offset}")]
    Tokenize { ch: char, offset: usize },

    #[error("unknown token {0:?}")]
    UnknownToken(String),

    #[error("mismatched parentheses")]
    MismatchedParentheses,

    #[error("{}", empty_operand_message(.0))]
    EmptyOperand(Option<Operator>),

    #[error("operands must be separated by an operator")]
    MissingOperator,

    #[error("division by zero ({left}/0)")]
    DivisionByZero { left: Number },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("operation {0:?} does not contain '='")]
    MissingEquals(String),

    #[error("result {0:?} is not a valid number")]
    InvalidResult(String),
}

fn empty_operand_message(operator: &Option<Operator>) -> String {
    match operator {
        Some(op) => format!("operator '{op}' is missing an operand"),
        None => "expression has no operands".to_string(),
    }
}
