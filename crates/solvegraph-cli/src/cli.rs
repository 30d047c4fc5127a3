use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use solvegraph_check::{check_actions, render_problems, ActionDiagnostics};
use solvegraph_expr::Number;
use solvegraph_trace::compare::{aligned_edit_distance, edge_iou, normalized_edit_distance};
use solvegraph_trace::metrics::GraphMetrics;
use solvegraph_trace::{State, TraceSettings};
use tracing_subscriber::EnvFilter;

use crate::input::load_trace;

/// Environment variable holding the log filter, e.g. `SOLVEGRAPH_LOG=debug`.
pub const LOG_ENV: &str = "SOLVEGRAPH_LOG";

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Build, validate and compare problem-solving trace graphs.
///
/// Inputs ending in `.json` are action logs; any other file is read as a trace script.
#[derive(Parser)]
#[command(name = "solvegraph", about = "Build, validate and compare problem-solving trace graphs.")]
pub struct Args {
    /// Trace settings as JSON (`{"target": [24], "policy": {"decimals": 2, "tolerance": 0.01}}`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Target state for scripts, e.g. `24` or `3,8`. Overrides the config file.
    #[arg(long, value_name = "NUMBERS", value_parser = parse_state, global = true)]
    target: Option<State>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a trace and report every problem the validator finds. Exits with 1 if any.
    Check { input: PathBuf },
    /// Print the graph built from a trace as JSON.
    Graph { input: PathBuf },
    /// Structural metrics for one or more traces.
    Metrics {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Similarity between two traces of the same problem.
    Compare { a: PathBuf, b: PathBuf },
}

#[derive(Debug, Serialize)]
struct JsonCheckReport<'a> {
    input: &'a str,
    actions: usize,
    problems: usize,
    diagnostics: &'a [ActionDiagnostics],
}

#[derive(Debug, Serialize)]
struct JsonMetrics {
    input: String,
    #[serde(flatten)]
    metrics: GraphMetrics,
}

#[derive(Debug, Serialize)]
struct JsonComparison<'a> {
    a: &'a str,
    b: &'a str,
    edge_iou: f64,
    aligned_edit_distance: usize,
    normalized_edit_distance: f64,
}

pub fn run() -> Result<()> {
    init_logging();
    let args = Args::parse();
    run_with_args(args)
}

pub fn run_with_args(args: Args) -> Result<()> {
    let settings = load_settings(args.config.as_deref(), args.target.clone())?;
    log::debug!("target {} with {:?}", settings.target, settings.policy);

    match &args.command {
        Command::Check { input } => check(input, &settings, &args.format),
        Command::Graph { input } => graph(input, &settings, &args.format),
        Command::Metrics { inputs } => metrics(inputs, &settings, &args.format),
        Command::Compare { a, b } => compare(a, b, &settings, &args.format),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // Also routes `log` records from the library crates.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn load_settings(config: Option<&Path>, target: Option<State>) -> Result<TraceSettings> {
    let settings = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            TraceSettings::from_json_str(&text)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => TraceSettings::default(),
    };
    Ok(match target {
        Some(target) => settings.with_target(target),
        None => settings,
    })
}

/// Parse `24`, `3,8` or `(3, 8)` into a state.
fn parse_state(input: &str) -> Result<State, String> {
    let inner = input
        .trim()
        .trim_start_matches(['(', '['])
        .trim_end_matches([')', ']']);
    let numbers = inner
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| Number::parse_literal(part).ok_or_else(|| format!("invalid number '{part}'")))
        .collect::<Result<Vec<_>, _>>()?;
    if numbers.is_empty() {
        return Err("a state needs at least one number".to_string());
    }
    Ok(State::new(numbers))
}

fn write_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut handle, value)?;
    } else {
        serde_json::to_writer(&mut handle, value)?;
    }
    handle.write_all(b"\n")?;
    Ok(())
}

fn check(input: &Path, settings: &TraceSettings, format: &OutputFormat) -> Result<()> {
    let loaded = load_trace(input, settings)?;

    let mut diagnostics = check_actions(&loaded.actions, settings.policy);
    if let Some(failure) = loaded.failure {
        diagnostics.push(failure);
        diagnostics.sort_by_key(|diagnostic| diagnostic.index);
    }
    let problems: usize = diagnostics.iter().map(|d| d.problems.len()).sum();

    match format {
        OutputFormat::Text => {
            println!("Trace check");
            println!("  input: {}", input.display());
            println!("  actions: {}", loaded.actions.len());
            println!();

            if diagnostics.is_empty() {
                println!("No problems.");
                return Ok(());
            }

            println!(
                "Summary: problems={problems} actions={}",
                diagnostics.len()
            );
            println!();
            println!("{}", render_problems(&diagnostics));
        }
        OutputFormat::Json => {
            let input = input.to_string_lossy();
            write_json(
                &JsonCheckReport {
                    input: &input,
                    actions: loaded.actions.len(),
                    problems,
                    diagnostics: &diagnostics,
                },
                false,
            )?;
        }
    }

    if !diagnostics.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn graph(input: &Path, settings: &TraceSettings, format: &OutputFormat) -> Result<()> {
    let graph = load_trace(input, settings)?
        .into_graph()
        .with_context(|| format!("build {}", input.display()))?;
    write_json(&graph.snapshot(), matches!(format, OutputFormat::Text))
}

fn metrics(inputs: &[PathBuf], settings: &TraceSettings, format: &OutputFormat) -> Result<()> {
    let mut rows = Vec::with_capacity(inputs.len());
    for input in inputs {
        let graph = load_trace(input, settings)?
            .into_graph()
            .with_context(|| format!("build {}", input.display()))?;
        rows.push(JsonMetrics {
            input: input.to_string_lossy().into_owned(),
            metrics: GraphMetrics::compute(&graph),
        });
    }

    match format {
        OutputFormat::Text => {
            for row in &rows {
                let m = &row.metrics;
                println!("{}", row.input);
                println!("  reached goal: {}", m.reached_goal);
                println!("  nodes: {}  edges: {}  subgoals: {}", m.n_nodes, m.n_edges, m.n_subgoals);
                println!(
                    "  mean branching factor: {:.3}  mean degree: {:.3}",
                    m.mean_branching_factor, m.mean_degree
                );
            }
            Ok(())
        }
        OutputFormat::Json => write_json(&rows, false),
    }
}

fn compare(a: &Path, b: &Path, settings: &TraceSettings, format: &OutputFormat) -> Result<()> {
    let graph_a = load_trace(a, settings)?
        .into_graph()
        .with_context(|| format!("build {}", a.display()))?;
    let graph_b = load_trace(b, settings)?
        .into_graph()
        .with_context(|| format!("build {}", b.display()))?;

    let (a, b) = (a.to_string_lossy(), b.to_string_lossy());
    let report = JsonComparison {
        a: &a,
        b: &b,
        edge_iou: edge_iou(&graph_a, &graph_b),
        aligned_edit_distance: aligned_edit_distance(&graph_a, &graph_b),
        normalized_edit_distance: normalized_edit_distance(&graph_a, &graph_b),
    };

    match format {
        OutputFormat::Text => {
            println!("Trace comparison");
            println!("  a: {}", report.a);
            println!("  b: {}", report.b);
            println!();
            println!("edge IoU: {:.3}", report.edge_iou);
            println!("aligned edit distance: {}", report.aligned_edit_distance);
            println!(
                "normalized edit distance: {:.3}",
                report.normalized_edit_distance
            );
            Ok(())
        }
        OutputFormat::Json => write_json(&report, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_target_states() {
        assert_eq!(parse_state("24").unwrap(), State::from([24]));
        assert_eq!(parse_state("8,3").unwrap(), State::from([3, 8]));
        assert_eq!(parse_state("(3, 8)").unwrap(), State::from([3, 8]));
        assert_eq!(parse_state("[0.5]").unwrap(), State::new([0.5]));
        assert!(parse_state("").is_err());
        assert!(parse_state("3,x").unwrap_err().contains("'x'"));
    }

    #[test]
    fn target_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"target": [10], "policy": {"decimals": 3}}"#).unwrap();

        let settings = load_settings(Some(&path), None).unwrap();
        assert_eq!(settings.target, State::from([10]));
        assert_eq!(settings.policy.decimals, 3);

        let settings = load_settings(Some(&path), Some(State::from([36]))).unwrap();
        assert_eq!(settings.target, State::from([36]));
        assert_eq!(settings.policy.decimals, 3);

        let err = load_settings(Some(&dir.path().join("missing.json")), None).unwrap_err();
        assert!(err.to_string().contains("read config"), "{err}");
    }
}
