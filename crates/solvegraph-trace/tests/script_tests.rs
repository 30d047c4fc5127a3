use pretty_assertions::assert_eq;
use solvegraph_trace::script::{run_script, Interpreter, ScriptErrorKind};
use solvegraph_trace::{GraphBuilder, State, TraceError, TraceSettings};

fn s<const N: usize>(values: [i32; N]) -> State {
    State::from(values)
}

fn run(src: &str) -> GraphBuilder {
    run_script(src, &TraceSettings::default()).unwrap()
}

fn run_err(src: &str) -> (usize, ScriptErrorKind) {
    let err = run_script(src, &TraceSettings::default()).unwrap_err();
    (err.line, err.kind)
}

#[test]
fn script_matches_direct_builder_calls() {
    let src = r#"<think>
maybe 6 * 4 works
</think>
```python
start_state = (1, 2, 3, 4)
graph = GraphBuilder(start_state)
graph.set_subgoal((6, 4), state_after_subgoal=(24,), comments="four times six")

# "one plus two is three"
new_state = graph.explore_operation(start_state, operation="1+2=3",
    resulting_state=(3, 3, 4), comment='one plus two')
curr_state = graph.move_to_node(new_state)
new_state = graph.explore_operation(curr_state, "3*4=12", [3, 12], False)
curr_state = graph.move_to_node(start_state)
graph.explore_operation(
    curr_state=curr_state,
    operation="1+2=4",
    resulting_state=(3, 4, 4),
    result_calc_error=True,
    comment=None,
)
```
"#;
    let scripted = run(src);

    let mut direct = GraphBuilder::start([1, 2, 3, 4], [24]);
    direct.set_subgoal([6, 4], [24], Some("four times six"));
    let new_state = direct
        .explore_operation([1, 2, 3, 4], "1+2=3", [3, 3, 4], false, Some("one plus two"))
        .unwrap();
    let curr_state = direct.move_to_node(new_state).unwrap();
    direct
        .explore_operation(curr_state, "3*4=12", [3, 12], false, None)
        .unwrap();
    let curr_state = direct.move_to_node([1, 2, 3, 4]).unwrap();
    direct
        .explore_operation(curr_state, "1+2=4", [3, 4, 4], true, None)
        .unwrap();

    assert_eq!(scripted, direct);
}

#[test]
fn target_can_be_passed_to_the_constructor() {
    let graph = run("graph = GraphBuilder([1, 2], target=(3,))\n");
    assert_eq!(graph.target_state(), &s([3]));

    let graph = run("graph = GraphBuilder((5, 5), (10,))");
    assert_eq!(graph.target_state(), &s([10]));

    let settings = TraceSettings::default().with_target(s([12]));
    let graph = run_script("g = GraphBuilder((6, 6))", &settings).unwrap();
    assert_eq!(graph.target_state(), &s([12]));
}

#[test]
fn subgoal_defaults_to_the_target() {
    let graph = run("graph = GraphBuilder((1, 2, 3, 4))\ngraph.set_subgoal((4, 6))\n");
    assert!(graph.edge(&s([24]), &s([4, 6])).unwrap().is_subgoal());
}

#[test]
fn decimals_and_negatives_are_numbers() {
    let graph = run(
        "graph = GraphBuilder((1, 3.5))\n\
         graph.explore_operation((1, 3.5), \"1-3.5=-2.5\", (-2.5,))\n",
    );
    assert!(graph.node(&State::new([-2.5])).is_some());
}

#[test]
fn errors_carry_line_numbers() {
    let (line, kind) = run_err("graph = GraphBuilder((1, 2))\nimport os\n");
    assert_eq!(line, 2);
    assert_eq!(kind, ScriptErrorKind::UndefinedVariable("import".to_string()));

    let (line, kind) = run_err("graph = GraphBuilder((1, 2))\n\ngraph.plot()\n");
    assert_eq!(line, 3);
    assert_eq!(kind, ScriptErrorKind::UnknownMethod("plot".to_string()));

    let (line, kind) = run_err("g = GraphBuilder((1, 2))\nh = GraphBuilder((1, 2))\n");
    assert_eq!(line, 2);
    assert_eq!(kind, ScriptErrorKind::GraphAlreadyCreated);

    let (line, kind) = run_err("print((1, 2))\n");
    assert_eq!(line, 1);
    assert_eq!(kind, ScriptErrorKind::UnknownFunction("print".to_string()));

    let (line, kind) = run_err("x = 1 + 2\n");
    assert_eq!(line, 1);
    assert!(matches!(kind, ScriptErrorKind::Syntax { .. }));
}

#[test]
fn builder_failures_surface_as_trace_errors() {
    let (line, kind) = run_err(
        "graph = GraphBuilder((1, 2))\n\
         graph.move_to_node((9, 9))\n",
    );
    assert_eq!(line, 2);
    assert_eq!(kind, ScriptErrorKind::Trace(TraceError::UnknownState(s([9, 9]))));

    let (line, kind) = run_err(
        "graph = GraphBuilder((1, 2))\n\
         graph.explore_operation((1, 2), \"1+2\", (3,))\n",
    );
    assert_eq!(line, 2);
    assert!(matches!(kind, ScriptErrorKind::Trace(TraceError::Expr(_))));
}

#[test]
fn arguments_are_bound_like_python() {
    let (_, kind) = run_err(
        "graph = GraphBuilder((1, 2))\n\
         graph.explore_operation((1, 2), \"1+2=3\")\n",
    );
    assert_eq!(
        kind,
        ScriptErrorKind::MissingArgument {
            call: "explore_operation",
            name: "resulting_state",
        }
    );

    let (_, kind) = run_err(
        "graph = GraphBuilder((1, 2))\n\
         graph.explore_operation((1, 2), \"1+2=3\", (3,), note=\"x\")\n",
    );
    assert_eq!(
        kind,
        ScriptErrorKind::UnexpectedArgument {
            call: "explore_operation",
            name: "note".to_string(),
        }
    );

    let (_, kind) = run_err(
        "graph = GraphBuilder((1, 2))\n\
         graph.move_to_node((1, 2), new_state=(1, 2))\n",
    );
    assert_eq!(
        kind,
        ScriptErrorKind::DuplicateArgument {
            call: "move_to_node",
            name: "new_state".to_string(),
        }
    );

    let (_, kind) = run_err(
        "graph = GraphBuilder((1, 2))\n\
         graph.explore_operation((1, 2), 12, (3,))\n",
    );
    assert!(matches!(kind, ScriptErrorKind::Type { expected: "a string", .. }));
}

#[test]
fn methods_need_a_graph_receiver() {
    let (_, kind) = run_err("x = (1, 2)\nx.move_to_node((1, 2))\n");
    assert_eq!(kind, ScriptErrorKind::NotAGraph("x".to_string()));

    let (_, kind) = run_err("graph.move_to_node((1, 2))\n");
    assert_eq!(kind, ScriptErrorKind::UndefinedVariable("graph".to_string()));

    let (line, kind) = run_err("x = (1, 2)\n");
    assert_eq!(line, 1);
    assert_eq!(kind, ScriptErrorKind::NoGraph);
}

#[test]
fn interpreter_keeps_variables_between_runs() {
    let mut interpreter = Interpreter::new(&TraceSettings::default());
    interpreter
        .run("graph = GraphBuilder((2, 12))\ncurr_state = (2, 12)\n")
        .unwrap();
    interpreter
        .run("new_state = graph.explore_operation(curr_state, \"2*12=24\", (24,))\n")
        .unwrap();
    let graph = interpreter.into_graph().unwrap();
    assert!(graph.edge(&s([2, 12]), &s([24])).unwrap().is_correct());
}
