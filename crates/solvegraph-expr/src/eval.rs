use std::fmt;

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

use crate::lexer::{tokenize, Operator, Token};
use crate::number::Number;
use crate::ExprError;

/// One atomic binary step `[left, operator, right, result]` of a decomposed expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubOperation {
    pub left: Number,
    pub operator: Operator,
    pub right: Number,
    pub result: Number,
}

impl SubOperation {
    pub fn new(left: Number, operator: Operator, right: Number, result: Number) -> Self {
        Self {
            left,
            operator,
            right,
            result,
        }
    }

    /// `left<op>right` without a result.
    pub fn expression(&self) -> String {
        format!("{}{}{}", self.left, self.operator, self.right)
    }

    /// `left<op>right=<result_text>`, the edge label format.
    pub fn to_operation_string(&self, result_text: &str) -> String {
        format!("{}={result_text}", self.expression())
    }
}

impl fmt::Display for SubOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.left, self.operator, self.right, self.result
        )
    }
}

impl Serialize for SubOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.left)?;
        tuple.serialize_element(&self.operator.symbol().to_string())?;
        tuple.serialize_element(&self.right)?;
        tuple.serialize_element(&self.result)?;
        tuple.end()
    }
}

impl<'de> serde::Deserialize<'de> for SubOperation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (left, symbol, right, result): (Number, String, Number, Number) =
            serde::Deserialize::deserialize(deserializer)?;
        let mut chars = symbol.chars();
        let operator = match (chars.next(), chars.next()) {
            (Some(c), None) => Operator::from_symbol(c),
            _ => None,
        }
        .ok_or_else(|| serde::de::Error::custom(format!("unknown operator {symbol:?}")))?;
        Ok(SubOperation::new(left, operator, right, result))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub value: Number,
    /// Sub-operations in the order they were applied (not token order).
    pub sub_operations: Vec<SubOperation>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
    Operator(Operator),
    LParen,
}

struct Evaluator {
    operands: Vec<Number>,
    operators: Vec<Pending>,
    sub_operations: Vec<SubOperation>,
}

impl Evaluator {
    fn apply(&mut self, operator: Operator) -> Result<(), ExprError> {
        let (Some(right), Some(left)) = (self.operands.pop(), self.operands.pop()) else {
            return Err(ExprError::EmptyOperand(Some(operator)));
        };
        let result = operator.apply(left, right)?;
        self.sub_operations
            .push(SubOperation::new(left, operator, right, result));
        self.operands.push(result);
        Ok(())
    }

    /// Apply stacked operators down to the nearest `(` (left in place).
    fn apply_pending(&mut self) -> Result<(), ExprError> {
        while let Some(&Pending::Operator(op)) = self.operators.last() {
            self.operators.pop();
            self.apply(op)?;
        }
        Ok(())
    }

    fn push_operator(&mut self, operator: Operator) -> Result<(), ExprError> {
        while let Some(&Pending::Operator(top)) = self.operators.last() {
            if top.precedence() < operator.precedence() {
                break;
            }
            self.operators.pop();
            self.apply(top)?;
        }
        self.operators.push(Pending::Operator(operator));
        Ok(())
    }
}

/// Evaluate a token stream with a two-stack (operand/operator) evaluator.
pub fn evaluate(tokens: &[Token]) -> Result<Evaluation, ExprError> {
    let mut ev = Evaluator {
        operands: Vec::new(),
        operators: Vec::new(),
        sub_operations: Vec::new(),
    };
    // Whether the previous token completed an operand (a literal or a closing paren).
    let mut after_operand = false;

    for token in tokens {
        match token {
            Token::Literal(text) => {
                if after_operand {
                    return Err(ExprError::MissingOperator);
                }
                let value = Number::parse_literal(text)
                    .ok_or_else(|| ExprError::UnknownToken(text.clone()))?;
                ev.operands.push(value);
                after_operand = true;
            }
            Token::Operator(op) => {
                ev.push_operator(*op)?;
                after_operand = false;
            }
            Token::LParen => {
                if after_operand {
                    return Err(ExprError::MissingOperator);
                }
                ev.operators.push(Pending::LParen);
            }
            Token::RParen => {
                ev.apply_pending()?;
                if ev.operators.pop() != Some(Pending::LParen) {
                    return Err(ExprError::MismatchedParentheses);
                }
                after_operand = true;
            }
        }
    }

    while let Some(pending) = ev.operators.pop() {
        match pending {
            Pending::Operator(op) => ev.apply(op)?,
            Pending::LParen => return Err(ExprError::MismatchedParentheses),
        }
    }

    match ev.operands.as_slice() {
        [value] => Ok(Evaluation {
            value: *value,
            sub_operations: ev.sub_operations,
        }),
        [] => Err(ExprError::EmptyOperand(None)),
        _ => Err(ExprError::MissingOperator),
    }
}

/// Tokenize and evaluate `expr`.
pub fn evaluate_str(expr: &str) -> Result<Evaluation, ExprError> {
    evaluate(&tokenize(expr)?)
}

/// The ordered sub-operation trace of `expr`.
pub fn sub_operations(expr: &str) -> Result<Vec<SubOperation>, ExprError> {
    evaluate_str(expr).map(|ev| ev.sub_operations)
}
