//! Command-line host for the trace graph crates.
//!
//! Traces come from two kinds of input files: JSON action logs (as written by
//! `serde_json` from [`solvegraph_trace::Action`]) and trace scripts. Everything else lives
//! in [`cli`].

pub mod cli;
mod input;

pub use crate::input::{load_trace, LoadedTrace, TraceSource};
