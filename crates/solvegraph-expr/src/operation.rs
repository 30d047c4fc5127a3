use crate::eval::{evaluate, Evaluation};
use crate::lexer::{literal_operands, tokenize, Token};
use crate::number::Number;
use crate::ExprError;

/// A parsed `"<expr>=<result>"` operation string.
///
/// The string is split on its last `=`, so an operation with more than one `=` carries the
/// extra `=` in its expression and fails to tokenize.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub expression: String,
    pub tokens: Vec<Token>,
    /// The result as written, trimmed (`"1.5"`, `"24"`).
    pub stated_text: String,
    pub stated_result: Number,
}

impl Operation {
    pub fn parse(text: &str) -> Result<Self, ExprError> {
        let (expression, stated_text) = split_operation(text)?;
        let tokens = tokenize(expression)?;
        let stated_text = stated_text.trim();
        let stated_result = Number::parse_literal(stated_text)
            .ok_or_else(|| ExprError::InvalidResult(stated_text.to_string()))?;
        Ok(Self {
            expression: expression.to_string(),
            tokens,
            stated_text: stated_text.to_string(),
            stated_result,
        })
    }

    pub fn evaluate(&self) -> Result<Evaluation, ExprError> {
        evaluate(&self.tokens)
    }

    /// Numeric operands of the left-hand side in source order.
    pub fn operands(&self) -> Vec<Number> {
        literal_operands(&self.tokens)
    }
}

/// Split `"<expr>=<result>"` on the last `=`.
pub fn split_operation(text: &str) -> Result<(&str, &str), ExprError> {
    let idx = text
        .rfind('=')
        .ok_or_else(|| ExprError::MissingEquals(text.to_string()))?;
    Ok((&text[..idx], &text[idx + 1..]))
}
