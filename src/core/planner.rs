//! Goal-oriented A* planner.
//!
//! Nodes are [`RepoState`] values, edges are action applications via their
//! pure `predict` transformers. The heuristic is clamped per dimension so
//! it never overestimates the cheapest single step reducing that dimension,
//! keeping A* admissible whatever the operator configures.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::actions::{ActionKind, ActionRegistry, Dimension};

use super::config::Config;
use super::error::{Error, NoPlanReason, Result};
use super::models::{GoalSpec, Plan, RepoState, TestStatus};

/// Tolerance when deciding whether a revisit strictly improves g.
const G_EPSILON: f64 = 1e-9;

/// Heuristic coefficients after the admissibility clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub epsilon: f64,
    pub zeta: f64,
}

impl HeuristicWeights {
    /// Clamp configured coefficients to the cheapest single-step cost that
    /// reduces each dimension. Returns the weights plus a note per clamp.
    pub fn admissible(config: &Config, registry: &ActionRegistry) -> (Self, Vec<String>) {
        let mut notes = Vec::new();
        let mut clamp = |name: &str, configured: f64, dimension: Dimension| -> f64 {
            let cap = registry.min_cost_reducing(dimension).unwrap_or(0.0);
            let value = configured.max(0.0);
            if value > cap {
                notes.push(format!(
                    "clamped {name} from {value:.2} to {cap:.2} to keep the heuristic admissible"
                ));
                cap
            } else {
                value
            }
        };

        let weights = Self {
            alpha: clamp("alpha", config.planner.alpha, Dimension::Conflicts),
            beta: clamp("beta", config.planner.beta, Dimension::Divergence),
            gamma: clamp("gamma", config.planner.gamma, Dimension::InFlight),
            delta: clamp("delta", config.planner.delta, Dimension::Staleness),
            epsilon: clamp("epsilon", config.planner.epsilon, Dimension::Tests),
            zeta: clamp("zeta", config.planner.zeta, Dimension::Push),
        };
        (weights, notes)
    }

    /// Heuristic estimate of remaining cost from a state.
    pub fn score(&self, state: &RepoState, goal: &GoalSpec) -> f64 {
        let conflicts = state.conflicts.len() as f64;
        let divergence = f64::from(state.diverged_local + state.diverged_remote);
        let in_flight = if state.in_flight() { 1.0 } else { 0.0 };
        let staleness = state.staleness_score.max(0.0);
        let tests_pending =
            if goal.tests_must_pass && state.tests_last_result != TestStatus::Passed {
                1.0
            } else {
                0.0
            };
        let push_pending =
            if goal.push_required() && state.has_unpushed_commits { 1.0 } else { 0.0 };

        self.alpha * conflicts
            + self.beta * divergence
            + self.gamma * in_flight
            + self.delta * staleness
            + self.epsilon * tests_pending
            + self.zeta * push_pending
    }
}

struct Node {
    state: RepoState,
    g: f64,
    depth: u32,
    parent: Option<usize>,
    action: Option<usize>,
}

struct OpenEntry {
    f: f64,
    h: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // BinaryHeap is a max-heap; invert so the smallest f pops first, ties
    // broken by smaller h, then insertion order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A* planner over the action registry.
pub struct Planner<'a> {
    config: &'a Config,
    registry: &'a ActionRegistry,
}

impl<'a> Planner<'a> {
    /// Create a planner over a frozen config and registry.
    pub fn new(config: &'a Config, registry: &'a ActionRegistry) -> Self {
        Self { config, registry }
    }

    /// Search for the cheapest plan from `start` to the goal.
    ///
    /// Deterministic: identical inputs return byte-identical plans.
    pub fn plan(&self, start: &RepoState, goal: &GoalSpec) -> Result<Plan> {
        let (weights, clamp_notes) = HeuristicWeights::admissible(self.config, self.registry);
        let goal_note = format!(
            "goal mode={:?} tests_must_pass={} push_with_lease={}",
            goal.mode,
            goal.tests_must_pass,
            goal.push_required()
        );

        if goal.is_satisfied(start) {
            let mut plan = Plan::empty();
            plan.notes.push(goal_note);
            plan.notes.push("goal already satisfied; nothing to do".to_string());
            return Ok(plan);
        }

        let mut nodes = vec![Node {
            state: start.clone(),
            g: 0.0,
            depth: 0,
            parent: None,
            action: None,
        }];
        let mut open = BinaryHeap::new();
        let mut best_g: HashMap<String, f64> = HashMap::new();
        let mut seq = 0u64;
        let start_h = weights.score(start, goal);
        open.push(OpenEntry { f: start_h, h: start_h, seq, node: 0 });
        best_g.insert(start.digest(), 0.0);

        let mut expansions = 0u32;
        let mut length_pruned = false;
        let goal_node = loop {
            let Some(entry) = open.pop() else {
                let reason = if length_pruned {
                    NoPlanReason::ExhaustedLength
                } else {
                    NoPlanReason::Unreachable
                };
                return Err(Error::NoPlan(reason));
            };

            let (g, depth, state_digest);
            {
                let node = &nodes[entry.node];
                g = node.g;
                depth = node.depth;
                state_digest = node.state.digest();
            }
            // A cheaper route to this state was found after this entry was
            // queued; the entry is stale.
            if best_g.get(&state_digest).is_some_and(|&best| g > best + G_EPSILON) {
                continue;
            }

            if goal.is_satisfied(&nodes[entry.node].state) {
                break entry.node;
            }

            expansions += 1;
            if expansions > self.config.planner.max_expansions {
                return Err(Error::NoPlan(NoPlanReason::ExhaustedExpansions));
            }
            if depth >= self.config.planner.max_plan_length {
                length_pruned = true;
                continue;
            }

            let current_state = nodes[entry.node].state.clone();
            for (action_idx, action) in self.registry.actions().iter().enumerate() {
                if !action.applicable(&current_state, self.config) {
                    continue;
                }
                let next = action.predict(&current_state, self.config);
                let edge_cost = action.cost(&current_state, self.config);
                let g_next = g + edge_cost;
                let digest = next.digest();
                if best_g.get(&digest).is_some_and(|&best| g_next + G_EPSILON >= best) {
                    continue;
                }
                best_g.insert(digest, g_next);
                let h_next = weights.score(&next, goal);
                seq += 1;
                nodes.push(Node {
                    state: next,
                    g: g_next,
                    depth: depth + 1,
                    parent: Some(entry.node),
                    action: Some(action_idx),
                });
                open.push(OpenEntry {
                    f: g_next + h_next,
                    h: h_next,
                    seq,
                    node: nodes.len() - 1,
                });
            }
        };

        Ok(self.reconstruct(goal_node, &nodes, goal, &weights, clamp_notes, start))
    }

    /// Walk parents back to the start, then build the plan with notes and
    /// the safety/freshness preamble.
    fn reconstruct(
        &self,
        goal_node: usize,
        nodes: &[Node],
        goal: &GoalSpec,
        weights: &HeuristicWeights,
        clamp_notes: Vec<String>,
        start: &RepoState,
    ) -> Plan {
        let mut chain = Vec::new();
        let mut cursor = goal_node;
        while let Some(parent) = nodes[cursor].parent {
            chain.push(cursor);
            cursor = parent;
        }
        chain.reverse();

        let mut plan = Plan::empty();
        plan.notes.push(format!(
            "goal mode={:?} tests_must_pass={} push_with_lease={}",
            goal.mode,
            goal.tests_must_pass,
            goal.push_required()
        ));
        plan.notes.extend(clamp_notes);
        plan.notes.push(format!("h(start)={:.2}", weights.score(start, goal)));

        // Safety preamble: record a backup ref before any history rewrite.
        // Fetching needs no preamble: the staleness term steers the search
        // into FetchAll whenever tracking data is stale enough to matter.
        let rewrites_history = chain.iter().any(|&idx| {
            matches!(
                self.registry.actions()[nodes[idx].action.expect("path node has an action")],
                ActionKind::RebaseOntoUpstream { .. } | ActionKind::PushWithLease
            )
        });
        if rewrites_history {
            let backup = ActionKind::BackupRef;
            plan.estimated_cost += backup.cost(start, self.config);
            plan.actions.push(backup.to_spec(start, self.config));
            plan.notes.push(
                "preamble: BackupRef recorded so the rewrite can be undone".to_string(),
            );
        }

        for (step, &idx) in chain.iter().enumerate() {
            let node = &nodes[idx];
            let parent_idx = node.parent.expect("path node has a parent");
            let parent = &nodes[parent_idx];
            let action_idx = node.action.expect("path node has an action");
            let action = &self.registry.actions()[action_idx];

            let spec = action.to_spec(&parent.state, self.config);
            plan.estimated_cost += spec.cost;
            plan.notes.push(format!(
                "step {}: {} ({}); {}; cumulative cost {:.2}",
                step + 1,
                action.name(),
                action.rationale(),
                describe_progress(&parent.state, &node.state, weights, goal),
                node.g,
            ));
            if let Some(alternative) =
                self.best_alternative(parent, action_idx, goal, weights)
            {
                plan.notes.push(format!("step {}: rejected {alternative}", step + 1));
            }
            plan.actions.push(spec);
        }

        plan
    }

    /// Cheapest applicable alternative to the chosen action at a node.
    fn best_alternative(
        &self,
        parent: &Node,
        chosen: usize,
        goal: &GoalSpec,
        weights: &HeuristicWeights,
    ) -> Option<String> {
        let mut best: Option<(f64, &ActionKind)> = None;
        for (idx, action) in self.registry.actions().iter().enumerate() {
            if idx == chosen || !action.applicable(&parent.state, self.config) {
                continue;
            }
            let next = action.predict(&parent.state, self.config);
            if next == parent.state {
                continue;
            }
            let f = parent.g
                + action.cost(&parent.state, self.config)
                + weights.score(&next, goal);
            if best.map_or(true, |(best_f, _)| f < best_f) {
                best = Some((f, action));
            }
        }
        best.map(|(f, action)| format!("{} (f={f:.2})", action.name()))
    }
}

/// One line on which heuristic dimensions an edge moved.
fn describe_progress(
    before: &RepoState,
    after: &RepoState,
    weights: &HeuristicWeights,
    goal: &GoalSpec,
) -> String {
    let mut moved = Vec::new();
    if before.conflicts.len() != after.conflicts.len() {
        moved.push(format!("conflicts {}->{}", before.conflicts.len(), after.conflicts.len()));
    }
    if before.diverged_remote != after.diverged_remote {
        moved.push(format!("behind {}->{}", before.diverged_remote, after.diverged_remote));
    }
    if before.in_flight() != after.in_flight() {
        moved.push(format!("in-flight {}->{}", before.in_flight(), after.in_flight()));
    }
    if before.has_unpushed_commits != after.has_unpushed_commits {
        moved.push(format!(
            "unpushed {}->{}",
            before.has_unpushed_commits, after.has_unpushed_commits
        ));
    }
    if before.tests_last_result != after.tests_last_result {
        moved.push(format!(
            "tests {}->{}",
            before.tests_last_result.as_str(),
            after.tests_last_result.as_str()
        ));
    }
    if moved.is_empty() {
        format!("h {:.2}->{:.2}", weights.score(before, goal), weights.score(after, goal))
    } else {
        moved.join(", ")
    }
}
