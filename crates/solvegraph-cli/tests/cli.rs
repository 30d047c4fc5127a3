use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;

const SOLVED: &str = r#"
start_state = (1, 2, 3, 4)
graph = GraphBuilder(start_state)
new_state = graph.explore_operation(start_state, operation="1+2=3", resulting_state=(3, 3, 4))
curr_state = graph.move_to_node(new_state)
new_state = graph.explore_operation(curr_state, operation="3+3=6", resulting_state=(4, 6))
curr_state = graph.move_to_node(new_state)
new_state = graph.explore_operation(curr_state, operation="6*4=24", resulting_state=(24,))
"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

fn solvegraph(args: &[&str], inputs: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_solvegraph"))
        .args(args)
        .args(inputs)
        .output()
        .expect("run solvegraph")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err})\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        )
    })
}

#[test]
fn check_accepts_a_consistent_script() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write(tmp.path(), "solved.py", SOLVED);

    let output = solvegraph(&["check"], &[&script]);
    assert!(
        output.status.success(),
        "expected exit 0\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("actions: 6"), "{stdout}");
    assert!(stdout.contains("No problems."), "{stdout}");
}

#[test]
fn check_reports_wrong_resulting_states() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write(
        tmp.path(),
        "wrong.py",
        "graph = GraphBuilder((1, 2, 3, 4))\n\
         graph.explore_operation((1, 2, 3, 4), \"1+2=5\", (3, 4, 5))\n",
    );

    let output = solvegraph(&["check"], &[&script]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Summary: problems=1 actions=1"), "{stdout}");
    assert!(
        stdout.contains("PROBLEM TYPE: Resulting state calculation error."),
        "{stdout}"
    );
    assert!(stdout.contains("The correct resulting_state is (3, 3, 4)"), "{stdout}");
}

#[test]
fn check_routes_execution_failures_into_diagnostics() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write(
        tmp.path(),
        "broken.py",
        "graph = GraphBuilder((1, 2, 3, 4))\n\
         s = graph.explore_operation((1, 2, 3, 4), \"1+2=3\", (3, 3, 4))\n\
         graph.move_to_node((9, 9))\n",
    );

    let output = solvegraph(&["check", "--format", "json"], &[&script]);
    assert_eq!(output.status.code(), Some(1));

    let report = stdout_json(&output);
    assert_eq!(report["actions"], 2);
    assert_eq!(report["problems"], 1);
    let diagnostic = &report["diagnostics"][0];
    assert_eq!(diagnostic["index"], 2);
    assert_eq!(diagnostic["action"], "script line 3");
    assert_eq!(diagnostic["problems"][0]["kind"], "execution");
    assert_eq!(
        diagnostic["problems"][0]["message"],
        "state (9, 9) is not in the graph"
    );
}

#[test]
fn graph_replays_action_logs() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let log = write(
        tmp.path(),
        "trace.json",
        r#"[
            {"type": "start", "state": [1, 2, 3, 4], "target": [24]},
            {"type": "explore_operation", "curr_state": [1, 2, 3, 4], "operation": "1+2=3",
             "resulting_state": [3, 3, 4]}
        ]"#,
    );

    let output = solvegraph(&["graph", "--format", "json"], &[&log]);
    assert!(output.status.success());
    let snapshot = stdout_json(&output);
    assert_eq!(snapshot["start_state"], serde_json::json!([1, 2, 3, 4]));
    assert_eq!(snapshot["nodes"].as_array().map(Vec::len), Some(3));
    assert_eq!(snapshot["edges"].as_array().map(Vec::len), Some(1));
    assert_eq!(snapshot["edges"][0]["operation"], "1+2=3");
    assert_eq!(snapshot["edges"][0]["is_correct"], true);
}

#[test]
fn metrics_for_several_inputs() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let solved = write(tmp.path(), "solved.py", SOLVED);
    let started = write(tmp.path(), "started.py", "graph = GraphBuilder((1, 2, 3, 4))\n");

    let output = solvegraph(&["metrics", "--format", "json"], &[&solved, &started]);
    assert!(output.status.success());
    let rows = stdout_json(&output);
    assert_eq!(rows[0]["reached_goal"], true);
    assert_eq!(rows[0]["n_nodes"], 4);
    assert_eq!(rows[0]["n_edges"], 3);
    assert_eq!(rows[1]["reached_goal"], false);
    assert_eq!(rows[1]["n_nodes"], 2);
    assert_eq!(rows[1]["n_edges"], 0);
}

#[test]
fn target_flag_changes_the_goal() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write(
        tmp.path(),
        "ten.py",
        "graph = GraphBuilder((2, 5))\n\
         graph.explore_operation((2, 5), \"2*5=10\", (10,))\n",
    );

    let output = solvegraph(&["metrics", "--format", "json", "--target", "10"], &[&script]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)[0]["reached_goal"], true);

    let output = solvegraph(&["metrics", "--format", "json"], &[&script]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)[0]["reached_goal"], false);
}

#[test]
fn compare_identical_traces() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let a = write(tmp.path(), "a.py", SOLVED);
    let b = write(tmp.path(), "b.py", SOLVED);

    let output = solvegraph(&["compare", "--format", "json"], &[&a, &b]);
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["edge_iou"], 1.0);
    assert_eq!(report["aligned_edit_distance"], 0);
    assert_eq!(report["normalized_edit_distance"], 0.0);
}

#[test]
fn missing_inputs_are_errors() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let missing = tmp.path().join("missing.py");

    let output = solvegraph(&["graph"], &[&missing]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.py"), "{stderr}");
}
