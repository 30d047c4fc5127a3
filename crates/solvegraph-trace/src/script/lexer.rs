use solvegraph_expr::Number;

use super::{ScriptError, ScriptErrorKind};

#[derive(Clone, Debug, PartialEq)]
pub(super) enum Tok {
    Ident(String),
    Number(Number),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Assign,
    Dot,
    Newline,
    Eof,
}

impl Tok {
    pub(super) fn describe(&self) -> String {
        match self {
            Tok::Ident(name) => format!("name `{name}`"),
            Tok::Number(n) => format!("number {n}"),
            Tok::Str(_) => "string literal".to_string(),
            Tok::LParen => "`(`".to_string(),
            Tok::RParen => "`)`".to_string(),
            Tok::LBracket => "`[`".to_string(),
            Tok::RBracket => "`]`".to_string(),
            Tok::Comma => "`,`".to_string(),
            Tok::Assign => "`=`".to_string(),
            Tok::Dot => "`.`".to_string(),
            Tok::Newline => "end of line".to_string(),
            Tok::Eof => "end of script".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct Spanned {
    pub tok: Tok,
    pub line: usize,
}

pub(super) struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    /// Bracket nesting; newlines inside brackets join lines.
    depth: usize,
}

impl<'a> Lexer<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            depth: 0,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if ch == Some('\n') {
            self.line += 1;
        }
        ch
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn error(&self, kind: ScriptErrorKind) -> ScriptError {
        ScriptError {
            line: self.line,
            kind,
        }
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
            self.bump();
        }
    }

    /// Tokenize the whole script. Consecutive line breaks collapse into one `Newline`.
    pub(super) fn run(mut self) -> Result<Vec<Spanned>, ScriptError> {
        let mut out: Vec<Spanned> = Vec::new();
        loop {
            let line = self.line;
            let Some(ch) = self.peek() else {
                out.push(Spanned {
                    tok: Tok::Newline,
                    line,
                });
                out.push(Spanned { tok: Tok::Eof, line });
                break;
            };

            let tok = match ch {
                '\n' => {
                    self.bump();
                    if self.depth > 0
                        || matches!(out.last(), None | Some(Spanned { tok: Tok::Newline, .. }))
                    {
                        continue;
                    }
                    Tok::Newline
                }
                c if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                '#' => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                    continue;
                }
                '\\' => {
                    // Explicit line continuation.
                    self.bump();
                    if self.peek() == Some('\r') {
                        self.bump();
                    }
                    if self.bump() != Some('\n') {
                        return Err(self.error(ScriptErrorKind::UnexpectedChar('\\')));
                    }
                    continue;
                }
                '(' | '[' => {
                    self.bump();
                    self.depth += 1;
                    if ch == '(' {
                        Tok::LParen
                    } else {
                        Tok::LBracket
                    }
                }
                ')' | ']' => {
                    self.bump();
                    self.depth = self.depth.saturating_sub(1);
                    if ch == ')' {
                        Tok::RParen
                    } else {
                        Tok::RBracket
                    }
                }
                ',' => {
                    self.bump();
                    Tok::Comma
                }
                '=' => {
                    self.bump();
                    Tok::Assign
                }
                '.' if !self.next_is_digit_after_dot() => {
                    self.bump();
                    Tok::Dot
                }
                '"' | '\'' => self.string(ch)?,
                c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number()?,
                c if c.is_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    self.consume_while(&mut ident, |c| c.is_alphanumeric() || c == '_');
                    Tok::Ident(ident)
                }
                other => return Err(self.error(ScriptErrorKind::UnexpectedChar(other))),
            };
            out.push(Spanned { tok, line });
        }
        Ok(out)
    }

    fn next_is_digit_after_dot(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        matches!(ahead.next(), Some(c) if c.is_ascii_digit())
    }

    fn number(&mut self) -> Result<Tok, ScriptError> {
        let mut text = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek() {
            text.push(sign);
            self.bump();
            while matches!(self.peek(), Some(' ' | '\t')) {
                self.bump();
            }
        }
        self.consume_while(&mut text, |c| c.is_ascii_digit() || c == '.');
        // Python spellings such as `24.` and `.5` are accepted here even though operation
        // strings reject them.
        let normalized = if text.ends_with('.') {
            format!("{text}0")
        } else {
            text.clone()
        };
        let normalized = match normalized.strip_prefix('.') {
            Some(rest) => format!("0.{rest}"),
            None => normalized
                .replacen("-.", "-0.", 1)
                .replacen("+.", "+0.", 1),
        };
        Number::parse_literal(&normalized)
            .map(Tok::Number)
            .ok_or_else(|| self.error(ScriptErrorKind::InvalidNumber(text)))
    }

    fn string(&mut self, quote: char) -> Result<Tok, ScriptError> {
        let start_line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(ScriptError {
                        line: start_line,
                        kind: ScriptErrorKind::UnterminatedString,
                    })
                }
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\n') => {}
                    Some(c) => out.push(c),
                    None => {
                        return Err(ScriptError {
                            line: start_line,
                            kind: ScriptErrorKind::UnterminatedString,
                        })
                    }
                },
                Some(c) if c == quote => break,
                Some(c) => out.push(c),
            }
        }
        Ok(Tok::Str(out))
    }
}
