use std::path::Path;

use anyhow::{Context, Result};
use solvegraph_check::ActionDiagnostics;
use solvegraph_trace::script::{preprocess, Interpreter};
use solvegraph_trace::{replay, Action, GraphBuilder, TraceSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSource {
    /// JSON array of tagged actions.
    ActionLog,
    Script,
}

impl TraceSource {
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => TraceSource::ActionLog,
            _ => TraceSource::Script,
        }
    }
}

/// A trace read from disk.
///
/// When the log or script could not be executed to the end, `graph` is `None` and
/// `failure` describes the action that was rejected. `actions` still holds everything that
/// was recorded, so the validator can look at it.
#[derive(Debug)]
pub struct LoadedTrace {
    pub source: TraceSource,
    pub actions: Vec<Action>,
    pub graph: Option<GraphBuilder>,
    pub failure: Option<ActionDiagnostics>,
}

impl LoadedTrace {
    /// The built graph, or the execution failure as an error.
    pub fn into_graph(self) -> Result<GraphBuilder> {
        match (self.graph, self.failure) {
            (Some(graph), _) => Ok(graph),
            (None, Some(failure)) => {
                let message = failure
                    .problems
                    .first()
                    .map(|problem| problem.to_string())
                    .unwrap_or_default();
                anyhow::bail!("{}: {message}", failure.action)
            }
            (None, None) => anyhow::bail!("trace produced no graph"),
        }
    }
}

/// Read `path` and build the trace it describes.
///
/// I/O and JSON syntax errors are returned as errors; a log or script that is readable but
/// fails partway is reported through [`LoadedTrace::failure`].
pub fn load_trace(path: &Path, settings: &TraceSettings) -> Result<LoadedTrace> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read trace {}", path.display()))?;
    let source = TraceSource::detect(path);
    log::debug!("loading {} as {source:?}", path.display());

    match source {
        TraceSource::ActionLog => {
            let actions: Vec<Action> = serde_json::from_str(&text)
                .with_context(|| format!("parse action log {}", path.display()))?;
            Ok(from_action_log(actions, settings))
        }
        TraceSource::Script => Ok(from_script(&text, settings)),
    }
}

fn from_action_log(actions: Vec<Action>, settings: &TraceSettings) -> LoadedTrace {
    match replay(&actions, settings.policy) {
        Ok(graph) => LoadedTrace {
            source: TraceSource::ActionLog,
            actions,
            graph: Some(graph),
            failure: None,
        },
        Err(err) => {
            let action = actions
                .get(err.index)
                .map(ToString::to_string)
                .unwrap_or_else(|| err.name.to_string());
            let failure = ActionDiagnostics::execution_failure(err.index, action, err.source.to_string());
            LoadedTrace {
                source: TraceSource::ActionLog,
                actions,
                graph: None,
                failure: Some(failure),
            }
        }
    }
}

fn from_script(text: &str, settings: &TraceSettings) -> LoadedTrace {
    let mut interpreter = Interpreter::new(settings);
    let ran = interpreter.run(&preprocess(text));
    let actions = interpreter
        .graph()
        .map(|graph| graph.actions().to_vec())
        .unwrap_or_default();

    match ran.and_then(|()| interpreter.into_graph()) {
        Ok(graph) => LoadedTrace {
            source: TraceSource::Script,
            actions,
            graph: Some(graph),
            failure: None,
        },
        Err(err) => {
            // The rejected statement never reached the log, so it sits just past the end.
            let failure = ActionDiagnostics::execution_failure(
                actions.len(),
                format!("script line {}", err.line),
                err.kind.to_string(),
            );
            LoadedTrace {
                source: TraceSource::Script,
                actions,
                graph: None,
                failure: Some(failure),
            }
        }
    }
}
