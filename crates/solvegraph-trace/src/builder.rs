use std::collections::{BTreeMap, BTreeSet, VecDeque};

use solvegraph_expr::{ExprError, Operation, SubOperation};

use crate::action::Action;
use crate::graph::{Edge, EdgeKind, GraphSnapshot, Node};
use crate::settings::{NumericPolicy, TraceSettings};
use crate::state::State;
use crate::TraceError;

/// Incrementally builds the graph of states a solver visited.
///
/// The graph is only mutated through the four primitive actions (`start`,
/// [`explore_operation`](Self::explore_operation), [`move_to_node`](Self::move_to_node),
/// [`set_subgoal`](Self::set_subgoal)) and [`unite_with`](Self::unite_with). Every call is
/// all-or-nothing: a call that returns an error leaves the builder untouched.
///
/// Two counters drive the timestamps: the node-visitation timestep is stamped onto nodes
/// when the solver arrives at them, the op timestep onto edges when an operation (or
/// subgoal) is recorded. Both start at 1; the start node is visited at timestep 0.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphBuilder {
    start_state: State,
    target_state: State,
    policy: NumericPolicy,
    nodes: BTreeMap<State, Node>,
    edges: BTreeMap<(State, State), Edge>,
    actions: Vec<Action>,
    node_visitation_timestep: usize,
    op_timestep: usize,
}

/// One edge of a planned `explore_operation`, computed before anything is committed.
struct PlannedStep {
    source: State,
    destination: State,
    operation: String,
    is_correct: bool,
}

impl GraphBuilder {
    pub fn start(state: impl Into<State>, target: impl Into<State>) -> Self {
        Self::start_with_policy(state, target, NumericPolicy::default())
    }

    pub fn with_settings(state: impl Into<State>, settings: &TraceSettings) -> Self {
        Self::start_with_policy(state, settings.target.clone(), settings.policy)
    }

    pub fn start_with_policy(
        state: impl Into<State>,
        target: impl Into<State>,
        policy: NumericPolicy,
    ) -> Self {
        let start_state = state.into();
        let target_state = target.into();

        let mut nodes = BTreeMap::new();
        nodes.insert(start_state.clone(), Node::new(start_state.clone(), vec![0]));
        nodes
            .entry(target_state.clone())
            .or_insert_with(|| Node::new(target_state.clone(), Vec::new()));

        Self {
            actions: vec![Action::Start {
                state: start_state.clone(),
                target: target_state.clone(),
            }],
            start_state,
            target_state,
            policy,
            nodes,
            edges: BTreeMap::new(),
            node_visitation_timestep: 1,
            op_timestep: 1,
        }
    }

    /// Record the solver applying `operation` (`"<expr>=<result>"`) to `curr_state`.
    ///
    /// A compound expression is decomposed into atomic steps; every step but the last
    /// materializes an intermediate state, and the last step connects to the supplied
    /// `resulting_state`. The final edge is correct when the computed result is within the
    /// policy tolerance of the stated one and `result_calc_error` is not set.
    ///
    /// ```
    /// use solvegraph_trace::{GraphBuilder, State};
    ///
    /// let mut graph = GraphBuilder::start([3, 4, 9, 9], [24]);
    /// let next = graph
    ///     .explore_operation([3, 4, 9, 9], "9-3=6", [4, 6, 9], false, Some("nine minus three"))
    ///     .unwrap();
    /// assert_eq!(next, State::from([4, 6, 9]));
    /// assert!(graph.edge(&State::from([3, 4, 9, 9]), &next).unwrap().is_correct());
    /// ```
    pub fn explore_operation(
        &mut self,
        curr_state: impl Into<State>,
        operation: &str,
        resulting_state: impl Into<State>,
        result_calc_error: bool,
        comment: Option<&str>,
    ) -> Result<State, TraceError> {
        let curr_state = curr_state.into();
        let resulting_state = resulting_state.into();

        let rejected = |err: &ExprError| log::warn!("rejected operation {operation:?}: {err}");
        let parsed = Operation::parse(operation).inspect_err(rejected)?;
        let evaluation = parsed.evaluate().inspect_err(rejected)?;
        let Some((last, intermediate)) = evaluation.sub_operations.split_last() else {
            log::warn!("rejected operation {operation:?}: no operator");
            return Err(TraceError::NoOperation(operation.to_string()));
        };

        let mut steps = Vec::with_capacity(evaluation.sub_operations.len());
        let mut current = curr_state.clone();
        for sub in intermediate {
            let next = self.intermediate_state(&current, sub);
            steps.push(PlannedStep {
                source: current,
                destination: next.clone(),
                operation: sub.to_operation_string(&sub.result.to_string()),
                is_correct: true,
            });
            current = next;
        }
        let is_correct = !result_calc_error
            && last
                .result
                .is_close(parsed.stated_result, self.policy.tolerance);
        steps.push(PlannedStep {
            source: current,
            destination: resulting_state.clone(),
            operation: last.to_operation_string(&parsed.stated_text),
            is_correct,
        });

        log::debug!(
            "explore_operation {operation:?} from {curr_state}: {} step(s), final step correct={is_correct}",
            steps.len()
        );

        let comment = comment.map(str::to_string);
        for step in steps {
            self.commit_step(step, comment.clone());
        }

        self.actions.push(Action::ExploreOperation {
            curr_state,
            operation: operation.to_string(),
            resulting_state: resulting_state.clone(),
            result_calc_error,
            comment,
            sub_operations: evaluation.sub_operations,
        });
        Ok(resulting_state)
    }

    /// `current` minus the two operands of `sub`, plus its (rounded) result.
    fn intermediate_state(&self, current: &State, sub: &SubOperation) -> State {
        let decimals = self.policy.decimals;
        current
            .without(&[sub.left, sub.right], decimals)
            .with(sub.result.round_to(decimals))
    }

    fn commit_step(&mut self, step: PlannedStep, comment: Option<String>) {
        let visit = self.node_visitation_timestep;
        let op = self.op_timestep;

        // Operating from a state does not visit it, but both endpoints must be nodes.
        self.nodes
            .entry(step.source.clone())
            .or_insert_with(|| Node::new(step.source.clone(), Vec::new()));
        self.nodes
            .entry(step.destination.clone())
            .and_modify(|node| node.visitation_timesteps.push(visit))
            .or_insert_with(|| Node::new(step.destination.clone(), vec![visit]));

        match self
            .edges
            .get_mut(&(step.source.clone(), step.destination.clone()))
        {
            Some(edge) => {
                edge.op_timesteps.push(op);
                edge.comments.push(comment);
            }
            None => {
                self.edges.insert(
                    (step.source.clone(), step.destination.clone()),
                    Edge {
                        source: step.source,
                        destination: step.destination,
                        kind: EdgeKind::Operation {
                            operation: step.operation,
                            is_correct: step.is_correct,
                        },
                        op_timesteps: vec![op],
                        comments: vec![comment],
                    },
                );
            }
        }

        self.op_timestep += 1;
        self.node_visitation_timestep += 1;
    }

    /// Record the solver moving (back) to an existing state.
    ///
    /// A new visitation timestep is only stamped when the solver was not already at this
    /// state at the immediately preceding timestep, so moving to the state an operation just
    /// produced does not count twice.
    pub fn move_to_node(&mut self, new_state: impl Into<State>) -> Result<State, TraceError> {
        let new_state = new_state.into();
        let counter = self.node_visitation_timestep;
        let node = self
            .nodes
            .get_mut(&new_state)
            .ok_or_else(|| TraceError::UnknownState(new_state.clone()))?;

        let just_here = node
            .visitation_timesteps
            .last()
            .is_some_and(|&last| last + 1 == counter);
        if just_here {
            log::debug!("move_to_node {new_state}: already there at timestep {counter}");
        } else {
            node.visitation_timesteps.push(counter);
            self.node_visitation_timestep += 1;
        }

        self.actions.push(Action::MoveToNode {
            new_state: new_state.clone(),
        });
        Ok(new_state)
    }

    /// Record a subgoal as a backward edge `state_after_subgoal -> subgoal_state`.
    ///
    /// Missing nodes are created unvisited; only a newly created subgoal node is flagged as
    /// initialized by a subgoal. Advances the op timestep but not the visitation timestep.
    pub fn set_subgoal(
        &mut self,
        subgoal_state: impl Into<State>,
        state_after_subgoal: impl Into<State>,
        comment: Option<&str>,
    ) -> State {
        let subgoal_state = subgoal_state.into();
        let state_after_subgoal = state_after_subgoal.into();
        let comment = comment.map(str::to_string);

        self.nodes
            .entry(subgoal_state.clone())
            .or_insert_with(|| Node {
                initialized_as_subgoal: true,
                ..Node::new(subgoal_state.clone(), Vec::new())
            });
        self.nodes
            .entry(state_after_subgoal.clone())
            .or_insert_with(|| Node::new(state_after_subgoal.clone(), Vec::new()));

        let op = self.op_timestep;
        let key = (state_after_subgoal.clone(), subgoal_state.clone());
        match self.edges.get_mut(&key) {
            Some(edge) => {
                edge.op_timesteps.push(op);
                edge.comments.push(comment.clone());
            }
            None => {
                self.edges.insert(
                    key,
                    Edge {
                        source: state_after_subgoal.clone(),
                        destination: subgoal_state.clone(),
                        kind: EdgeKind::Subgoal,
                        op_timesteps: vec![op],
                        comments: vec![comment.clone()],
                    },
                );
            }
        }
        self.op_timestep += 1;

        self.actions.push(Action::SetSubgoal {
            subgoal_state: subgoal_state.clone(),
            state_after_subgoal,
            comment,
        });
        subgoal_state
    }

    /// [`set_subgoal`](Self::set_subgoal) working backward from the target.
    pub fn set_subgoal_toward_target(
        &mut self,
        subgoal_state: impl Into<State>,
        comment: Option<&str>,
    ) -> State {
        let target = self.target_state.clone();
        self.set_subgoal(subgoal_state, target, comment)
    }

    /// Merge `other` (a partial trace over the same start state) into this graph.
    ///
    /// Nodes and edges only in `other` are copied in; shared ones get `other`'s timesteps
    /// and comments appended after their own. Counters advance to the larger of the two and
    /// `other`'s actions are appended to the log.
    pub fn unite_with(&mut self, other: &GraphBuilder) -> Result<(), TraceError> {
        if self.start_state != other.start_state {
            return Err(TraceError::StartStateMismatch {
                left: self.start_state.clone(),
                right: other.start_state.clone(),
            });
        }

        for (state, node) in &other.nodes {
            match self.nodes.get_mut(state) {
                Some(existing) => existing
                    .visitation_timesteps
                    .extend_from_slice(&node.visitation_timesteps),
                None => {
                    self.nodes.insert(state.clone(), node.clone());
                }
            }
        }
        for (key, edge) in &other.edges {
            match self.edges.get_mut(key) {
                Some(existing) => {
                    existing.op_timesteps.extend_from_slice(&edge.op_timesteps);
                    existing.comments.extend(edge.comments.iter().cloned());
                }
                None => {
                    self.edges.insert(key.clone(), edge.clone());
                }
            }
        }

        self.node_visitation_timestep = self
            .node_visitation_timestep
            .max(other.node_visitation_timestep);
        self.op_timestep = self.op_timestep.max(other.op_timestep);
        self.actions.extend(other.actions.iter().cloned());

        log::debug!(
            "united graphs over {}: {} nodes, {} edges",
            self.start_state,
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }

    pub fn start_state(&self) -> &State {
        &self.start_state
    }

    pub fn target_state(&self) -> &State {
        &self.target_state
    }

    pub fn policy(&self) -> NumericPolicy {
        self.policy
    }

    pub fn node(&self, state: &State) -> Option<&Node> {
        self.nodes.get(state)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, source: &State, destination: &State) -> Option<&Edge> {
        self.edges.get(&(source.clone(), destination.clone()))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn node_visitation_timestep(&self) -> usize {
        self.node_visitation_timestep
    }

    pub fn op_timestep(&self) -> usize {
        self.op_timestep
    }

    pub fn successors<'a>(&'a self, state: &'a State) -> impl Iterator<Item = &'a State> + 'a {
        self.edges
            .values()
            .filter(move |edge| &edge.source == state)
            .map(|edge| &edge.destination)
    }

    pub fn out_degree(&self, state: &State) -> usize {
        self.successors(state).count()
    }

    pub fn in_degree(&self, state: &State) -> usize {
        self.edges
            .values()
            .filter(|edge| &edge.destination == state)
            .count()
    }

    /// Whether `to` can be reached from `from` along edges of any kind.
    pub fn has_path(&self, from: &State, to: &State) -> bool {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return false;
        }
        let mut seen: BTreeSet<&State> = BTreeSet::new();
        let mut queue: VecDeque<&State> = VecDeque::new();
        seen.insert(from);
        queue.push_back(from);
        while let Some(state) = queue.pop_front() {
            if state == to {
                return true;
            }
            for next in self.successors(state) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    pub fn snapshot(&self) -> GraphSnapshot<'_> {
        GraphSnapshot {
            start_state: &self.start_state,
            target_state: &self.target_state,
            node_visitation_timestep: self.node_visitation_timestep,
            op_timestep: self.op_timestep,
            nodes: self.nodes.values().collect(),
            edges: self.edges.values().collect(),
            actions: &self.actions,
        }
    }
}

/// Merge two partial traces over the same start state into a new graph.
pub fn unite(a: &GraphBuilder, b: &GraphBuilder) -> Result<GraphBuilder, TraceError> {
    let mut merged = a.clone();
    merged.unite_with(b)?;
    Ok(merged)
}
