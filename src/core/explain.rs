//! Plan explanation for operators.

use serde::{Deserialize, Serialize};

use super::models::Plan;

/// Human-readable explanation for one action within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExplanation {
    /// Action name
    pub action: String,

    /// Why the action was selected
    pub reason: String,

    /// Alternatives an operator might consider instead
    pub alternatives: Vec<String>,

    /// Cost charged for this action
    pub cost: f64,

    /// Running total up to and including this action
    pub cumulative_cost: f64,
}

/// Alternatives an operator could weigh against each known action.
fn alternatives_for(action: &str) -> Vec<String> {
    let options: &[&str] = match action {
        "BackupRef" => &[
            "Skip the backup and rely on reflog entries for recovery.",
            "Create a lightweight branch instead of an update-ref entry.",
        ],
        "EnsureClean" => &[
            "Abort and ask the operator to clean the tree manually.",
            "Work in a temporary worktree rather than stashing.",
        ],
        "FetchAll" => &["Act on the cached tracking state without fetching."],
        "RebaseOntoUpstream" => &[
            "Merge the upstream instead of rebasing.",
            "Leave the branch diverged and only resolve conflicts.",
        ],
        "AutoTrivialResolve" => &[
            "Resolve each conflict manually to confirm every change.",
            "Run a domain-specific merge driver for known file types.",
        ],
        "ApplyPathStrategy" => &[
            "Escalate to manual resolution in an editor.",
            "Invoke a custom merge driver tuned for the file type.",
        ],
        "UseMergeDriver" => &["Fall back to an ours/theirs rule for the path."],
        "RebaseContinue" => &["Abort the rebase and return control to the operator."],
        "RebaseAbort" => &["Keep the rebase open and resolve the remaining conflicts by hand."],
        "RunTests" => &["Push without re-running the suite and rely on CI."],
        "PushWithLease" => &["Leave the branch local and let the operator push."],
        _ => &[],
    };
    options.iter().map(ToString::to_string).collect()
}

/// Explain each action in plan order, with cumulative cost.
pub fn explain_plan(plan: &Plan) -> Vec<ActionExplanation> {
    let mut cumulative = 0.0;
    plan.actions
        .iter()
        .map(|spec| {
            cumulative += spec.cost;
            ActionExplanation {
                action: spec.name.clone(),
                reason: spec
                    .rationale
                    .clone()
                    .unwrap_or_else(|| "No rationale recorded.".to_string()),
                alternatives: alternatives_for(&spec.name),
                cost: spec.cost,
                cumulative_cost: cumulative,
            }
        })
        .collect()
}

/// Render explanations as indented text for the CLI.
pub fn render_explanations(explanations: &[ActionExplanation]) -> String {
    let mut out = String::new();
    for (index, explanation) in explanations.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} (cost {:.2}, cumulative {:.2})\n   {}\n",
            index + 1,
            explanation.action,
            explanation.cost,
            explanation.cumulative_cost,
            explanation.reason,
        ));
        for alternative in &explanation.alternatives {
            out.push_str(&format!("   - alternative: {alternative}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActionSpec;

    fn plan() -> Plan {
        Plan {
            actions: vec![
                ActionSpec::new("BackupRef", 0.2).with_rationale("Record a backup."),
                ActionSpec::new("RebaseOntoUpstream", 1.0),
            ],
            estimated_cost: 1.2,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_explanations_mirror_plan_order() {
        let explanations = explain_plan(&plan());
        assert_eq!(explanations.len(), 2);
        assert_eq!(explanations[0].action, "BackupRef");
        assert_eq!(explanations[0].reason, "Record a backup.");
        assert_eq!(explanations[1].reason, "No rationale recorded.");
    }

    #[test]
    fn test_cumulative_cost_accumulates() {
        let explanations = explain_plan(&plan());
        assert_eq!(explanations[0].cumulative_cost, 0.2);
        assert_eq!(explanations[1].cumulative_cost, 1.2);
    }

    #[test]
    fn test_known_actions_have_alternatives() {
        let explanations = explain_plan(&plan());
        assert!(!explanations[0].alternatives.is_empty());
        assert!(!explanations[1].alternatives.is_empty());
    }

    #[test]
    fn test_render_is_numbered() {
        let rendered = render_explanations(&explain_plan(&plan()));
        assert!(rendered.starts_with("1. BackupRef"));
        assert!(rendered.contains("2. RebaseOntoUpstream"));
        assert!(rendered.contains("alternative:"));
    }
}
