use std::collections::HashMap;
use std::fmt;

use solvegraph_expr::Number;

use super::lexer::{Lexer, Spanned, Tok};
use super::{ScriptError, ScriptErrorKind};
use crate::builder::GraphBuilder;
use crate::settings::TraceSettings;
use crate::state::State;

#[derive(Clone, Debug, PartialEq)]
enum Value {
    Number(Number),
    Str(String),
    Bool(bool),
    None,
    Seq(Vec<Value>),
    State(State),
    Graph,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "number {n}"),
            Value::Str(s) => write!(f, "string {s:?}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::None => f.write_str("None"),
            Value::Seq(items) => write!(f, "sequence of {} item(s)", items.len()),
            Value::State(state) => write!(f, "state {state}"),
            Value::Graph => f.write_str("GraphBuilder"),
        }
    }
}

/// Positional and keyword arguments of one call, in source order.
#[derive(Default)]
struct Args {
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

struct Cursor {
    toks: Vec<Spanned>,
    pos: usize,
}

impl Cursor {
    fn new(toks: Vec<Spanned>) -> Self {
        Self { toks, pos: 0 }
    }

    // The lexer always terminates the stream with `Eof`, which is never consumed.
    fn index(&self, offset: usize) -> usize {
        (self.pos + offset).min(self.toks.len() - 1)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        &self.toks[self.index(offset)].tok
    }

    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn line(&self) -> usize {
        self.toks[self.index(0)].line
    }

    fn bump(&mut self) -> Tok {
        let tok = self.toks[self.index(0)].tok.clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        tok
    }

    fn syntax(&self, expected: &str) -> ScriptError {
        ScriptError {
            line: self.line(),
            kind: ScriptErrorKind::Syntax {
                expected: expected.to_string(),
                found: self.peek().describe(),
            },
        }
    }

    fn expect(&mut self, tok: Tok) -> Result<(), ScriptError> {
        if *self.peek() == tok {
            self.bump();
            Ok(())
        } else {
            Err(self.syntax(&tok.describe()))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ScriptError> {
        match self.peek() {
            Tok::Ident(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.syntax("a name")),
        }
    }
}

/// Executes trace scripts against a single [`GraphBuilder`].
///
/// Variables persist across [`run`](Self::run) calls, so a script can be fed in pieces.
#[derive(Debug)]
pub struct Interpreter {
    settings: TraceSettings,
    vars: HashMap<String, Value>,
    graph: Option<GraphBuilder>,
    line: usize,
}

impl Interpreter {
    pub fn new(settings: &TraceSettings) -> Self {
        Self {
            settings: settings.clone(),
            vars: HashMap::new(),
            graph: None,
            line: 0,
        }
    }

    /// Run every statement in `source`. Statements before a failing one stay applied.
    pub fn run(&mut self, source: &str) -> Result<(), ScriptError> {
        let mut cursor = Cursor::new(Lexer::new(source).run()?);
        loop {
            match cursor.peek() {
                Tok::Eof => break,
                Tok::Newline => {
                    cursor.bump();
                }
                _ => self.statement(&mut cursor)?,
            }
        }
        Ok(())
    }

    pub fn graph(&self) -> Option<&GraphBuilder> {
        self.graph.as_ref()
    }

    pub fn into_graph(self) -> Result<GraphBuilder, ScriptError> {
        self.graph.ok_or(ScriptError {
            line: self.line,
            kind: ScriptErrorKind::NoGraph,
        })
    }

    fn error(&self, kind: ScriptErrorKind) -> ScriptError {
        ScriptError {
            line: self.line,
            kind,
        }
    }

    fn statement(&mut self, cursor: &mut Cursor) -> Result<(), ScriptError> {
        self.line = cursor.line();
        let target = match (cursor.peek(), cursor.peek_at(1)) {
            (Tok::Ident(name), Tok::Assign) => {
                let name = name.clone();
                cursor.bump();
                cursor.bump();
                Some(name)
            }
            _ => None,
        };
        let value = self.expr(cursor)?;
        cursor.expect(Tok::Newline)?;
        if let Some(name) = target {
            self.vars.insert(name, value);
        }
        Ok(())
    }

    fn expr(&mut self, cursor: &mut Cursor) -> Result<Value, ScriptError> {
        match cursor.peek().clone() {
            Tok::Number(n) => {
                cursor.bump();
                Ok(Value::Number(n))
            }
            Tok::Str(s) => {
                cursor.bump();
                Ok(Value::Str(s))
            }
            Tok::LParen => {
                cursor.bump();
                self.sequence(cursor, Tok::RParen, true)
            }
            Tok::LBracket => {
                cursor.bump();
                self.sequence(cursor, Tok::RBracket, false)
            }
            Tok::Ident(name) => {
                cursor.bump();
                match name.as_str() {
                    "True" => return Ok(Value::Bool(true)),
                    "False" => return Ok(Value::Bool(false)),
                    "None" => return Ok(Value::None),
                    _ => {}
                }
                match cursor.peek() {
                    Tok::Dot => {
                        cursor.bump();
                        let method = cursor.expect_ident()?;
                        cursor.expect(Tok::LParen)?;
                        let args = self.args(cursor)?;
                        self.call_method(&name, &method, args)
                    }
                    Tok::LParen => {
                        cursor.bump();
                        let args = self.args(cursor)?;
                        self.call_function(&name, args)
                    }
                    _ => self
                        .vars
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| self.error(ScriptErrorKind::UndefinedVariable(name))),
                }
            }
            _ => Err(cursor.syntax("an expression")),
        }
    }

    /// Tuple or list display after its opening bracket. `(x)` without a comma is just `x`.
    fn sequence(
        &mut self,
        cursor: &mut Cursor,
        close: Tok,
        is_tuple: bool,
    ) -> Result<Value, ScriptError> {
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            if *cursor.peek() == close {
                cursor.bump();
                break;
            }
            items.push(self.expr(cursor)?);
            if *cursor.peek() == Tok::Comma {
                cursor.bump();
                saw_comma = true;
            } else {
                cursor.expect(close.clone())?;
                break;
            }
        }
        if is_tuple && items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Seq(items))
    }

    fn args(&mut self, cursor: &mut Cursor) -> Result<Args, ScriptError> {
        let mut args = Args::default();
        loop {
            if *cursor.peek() == Tok::RParen {
                cursor.bump();
                break;
            }
            let keyword = match (cursor.peek(), cursor.peek_at(1)) {
                (Tok::Ident(name), Tok::Assign) => Some(name.clone()),
                _ => None,
            };
            match keyword {
                Some(name) => {
                    cursor.bump();
                    cursor.bump();
                    let name = if name == "comments" {
                        "comment".to_string()
                    } else {
                        name
                    };
                    let value = self.expr(cursor)?;
                    args.keyword.push((name, value));
                }
                None if !args.keyword.is_empty() => {
                    return Err(cursor.syntax("a keyword argument"));
                }
                None => {
                    let value = self.expr(cursor)?;
                    args.positional.push(value);
                }
            }
            if *cursor.peek() == Tok::Comma {
                cursor.bump();
            } else {
                cursor.expect(Tok::RParen)?;
                break;
            }
        }
        Ok(args)
    }

    /// Match `args` against `params` the way Python binds a call.
    fn bind(
        &self,
        call: &'static str,
        params: &[&'static str],
        args: Args,
    ) -> Result<Vec<Option<Value>>, ScriptError> {
        if args.positional.len() > params.len() {
            return Err(self.error(ScriptErrorKind::TooManyArguments {
                call,
                max: params.len(),
            }));
        }
        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        for (slot, value) in slots.iter_mut().zip(args.positional) {
            *slot = Some(value);
        }
        for (name, value) in args.keyword {
            let Some(idx) = params.iter().position(|p| *p == name) else {
                return Err(self.error(ScriptErrorKind::UnexpectedArgument { call, name }));
            };
            if slots[idx].is_some() {
                return Err(self.error(ScriptErrorKind::DuplicateArgument { call, name }));
            }
            slots[idx] = Some(value);
        }
        Ok(slots)
    }

    fn required(
        &self,
        call: &'static str,
        name: &'static str,
        slot: Option<Value>,
    ) -> Result<Value, ScriptError> {
        slot.ok_or_else(|| self.error(ScriptErrorKind::MissingArgument { call, name }))
    }

    fn to_state(&self, value: Value) -> Result<State, ScriptError> {
        match value {
            Value::State(state) => Ok(state),
            Value::Seq(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Number(n) => Ok(n),
                    other => Err(self.type_error("a number", &other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(State::new),
            other => Err(self.type_error("a tuple of numbers", &other)),
        }
    }

    fn to_str(&self, value: Value) -> Result<String, ScriptError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(self.type_error("a string", &other)),
        }
    }

    fn to_comment(&self, value: Option<Value>) -> Result<Option<String>, ScriptError> {
        match value {
            None | Some(Value::None) => Ok(None),
            Some(value) => self.to_str(value).map(Some),
        }
    }

    fn to_bool(&self, value: Option<Value>) -> Result<bool, ScriptError> {
        match value {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(b),
            Some(other) => Err(self.type_error("True or False", &other)),
        }
    }

    fn type_error(&self, expected: &'static str, found: &Value) -> ScriptError {
        self.error(ScriptErrorKind::Type {
            expected,
            found: found.to_string(),
        })
    }

    fn call_function(&mut self, name: &str, args: Args) -> Result<Value, ScriptError> {
        if name != "GraphBuilder" {
            return Err(self.error(ScriptErrorKind::UnknownFunction(name.to_string())));
        }
        if self.graph.is_some() {
            return Err(self.error(ScriptErrorKind::GraphAlreadyCreated));
        }

        const CALL: &str = "GraphBuilder";
        let mut slots = self.bind(CALL, &["start_state", "target"], args)?.into_iter();
        let start = self.required(CALL, "start_state", slots.next().flatten())?;
        let start = self.to_state(start)?;
        let target = match slots.next().flatten() {
            Some(value) => self.to_state(value)?,
            None => self.settings.target.clone(),
        };

        log::debug!("script line {}: start at {start}, target {target}", self.line);
        self.graph = Some(GraphBuilder::start_with_policy(
            start,
            target,
            self.settings.policy,
        ));
        Ok(Value::Graph)
    }

    fn call_method(
        &mut self,
        receiver: &str,
        method: &str,
        args: Args,
    ) -> Result<Value, ScriptError> {
        match self.vars.get(receiver) {
            Some(Value::Graph) => {}
            Some(_) => return Err(self.error(ScriptErrorKind::NotAGraph(receiver.to_string()))),
            None => {
                return Err(self.error(ScriptErrorKind::UndefinedVariable(
                    receiver.to_string(),
                )))
            }
        }

        match method {
            "explore_operation" => {
                const CALL: &str = "explore_operation";
                let params = [
                    "curr_state",
                    "operation",
                    "resulting_state",
                    "result_calc_error",
                    "comment",
                ];
                let mut slots = self.bind(CALL, &params, args)?.into_iter();
                let curr = self.required(CALL, "curr_state", slots.next().flatten())?;
                let curr = self.to_state(curr)?;
                let operation = self.required(CALL, "operation", slots.next().flatten())?;
                let operation = self.to_str(operation)?;
                let resulting = self.required(CALL, "resulting_state", slots.next().flatten())?;
                let resulting = self.to_state(resulting)?;
                let result_calc_error = self.to_bool(slots.next().flatten())?;
                let comment = self.to_comment(slots.next().flatten())?;

                let state = self.graph_mut()?.explore_operation(
                    curr,
                    &operation,
                    resulting,
                    result_calc_error,
                    comment.as_deref(),
                );
                state.map(Value::State).map_err(|err| self.error(err.into()))
            }
            "move_to_node" => {
                let mut slots = self.bind("move_to_node", &["new_state"], args)?.into_iter();
                let state = self.required("move_to_node", "new_state", slots.next().flatten())?;
                let state = self.to_state(state)?;
                let moved = self.graph_mut()?.move_to_node(state);
                moved.map(Value::State).map_err(|err| self.error(err.into()))
            }
            "set_subgoal" => {
                const CALL: &str = "set_subgoal";
                let params = ["subgoal_state", "state_after_subgoal", "comment"];
                let mut slots = self.bind(CALL, &params, args)?.into_iter();
                let subgoal = self.required(CALL, "subgoal_state", slots.next().flatten())?;
                let subgoal = self.to_state(subgoal)?;
                let after = match slots.next().flatten() {
                    Some(value) => Some(self.to_state(value)?),
                    None => None,
                };
                let comment = self.to_comment(slots.next().flatten())?;

                let graph = self.graph_mut()?;
                match after {
                    Some(after) => graph.set_subgoal(subgoal, after, comment.as_deref()),
                    None => graph.set_subgoal_toward_target(subgoal, comment.as_deref()),
                };
                Ok(Value::None)
            }
            other => Err(self.error(ScriptErrorKind::UnknownMethod(other.to_string()))),
        }
    }

    fn graph_mut(&mut self) -> Result<&mut GraphBuilder, ScriptError> {
        let line = self.line;
        self.graph.as_mut().ok_or(ScriptError {
            line,
            kind: ScriptErrorKind::NoGraph,
        })
    }
}
