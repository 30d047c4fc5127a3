use std::fmt;

use crate::number::Number;
use crate::ExprError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Subtract),
            '*' => Some(Operator::Multiply),
            '/' => Some(Operator::Divide),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }

    /// Binding power; higher binds tighter. All four operators are left associative.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Subtract => 1,
            Operator::Multiply | Operator::Divide => 2,
        }
    }

    pub fn apply(self, left: Number, right: Number) -> Result<Number, ExprError> {
        let (l, r) = (left.value(), right.value());
        let value = match self {
            Operator::Add => l + r,
            Operator::Subtract => l - r,
            Operator::Multiply => l * r,
            Operator::Divide => {
                if r == 0.0 {
                    return Err(ExprError::DivisionByZero { left });
                }
                l / r
            }
        };
        if !value.is_finite() {
            return Err(ExprError::Overflow);
        }
        Ok(Number::new(value))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// A numeric literal, possibly carrying a fused sign. The raw text is kept so that a
    /// malformed literal (`1.2.3`, a bare `-`) is reported by the evaluator.
    Literal(String),
    Operator(Operator),
    LParen,
    RParen,
}

impl Token {
    /// The literal's value, if this is a well-formed numeric literal.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Token::Literal(text) => Number::parse_literal(text),
            _ => None,
        }
    }

    fn allows_sign_after(&self) -> bool {
        matches!(self, Token::Operator(_) | Token::LParen)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(text) => f.write_str(text),
            Token::Operator(op) => write!(f, "{op}"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            tokens: Vec::new(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn consume_while<F>(&mut self, buf: &mut String, mut predicate: F)
    where
        F: FnMut(char) -> bool,
    {
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            buf.push(ch);
            self.chars.next();
        }
    }

    fn sign_position(&self) -> bool {
        self.tokens.last().map_or(true, Token::allows_sign_after)
    }

    fn run(mut self) -> Result<Vec<Token>, ExprError> {
        while let Some(&(offset, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
                continue;
            }
            let token = match ch {
                '+' | '-' if self.sign_position() => {
                    self.chars.next();
                    let mut literal = String::from(ch);
                    self.consume_while(&mut literal, is_literal_char);
                    Token::Literal(literal)
                }
                c if is_literal_char(c) => {
                    let mut literal = String::new();
                    self.consume_while(&mut literal, is_literal_char);
                    Token::Literal(literal)
                }
                '(' => {
                    self.chars.next();
                    Token::LParen
                }
                ')' => {
                    self.chars.next();
                    Token::RParen
                }
                c => match Operator::from_symbol(c) {
                    Some(op) => {
                        self.chars.next();
                        Token::Operator(op)
                    }
                    None => return Err(ExprError::Tokenize { ch: c, offset }),
                },
            };
            self.tokens.push(token);
        }
        Ok(self.tokens)
    }
}

fn is_literal_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

/// Split an arithmetic expression into literals, operators and parentheses.
///
/// A `+`/`-` at the start of the expression, or directly after an operator or `(`, is a
/// sign and is fused into the literal that follows it (`5*-3` lexes as `5`, `*`, `-3`).
pub fn tokenize(expr: &str) -> Result<Vec<Token>, ExprError> {
    Lexer::new(expr).run()
}

/// Values of every well-formed literal in `tokens`, in source order.
pub fn literal_operands(tokens: &[Token]) -> Vec<Number> {
    tokens.iter().filter_map(Token::as_number).collect()
}
