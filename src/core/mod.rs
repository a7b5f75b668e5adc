//! Core types and subsystems: the data model, configuration, planner,
//! executor, and plan explanation.

mod config;
mod error;
mod explain;
mod executor;
mod models;
mod planner;

pub use config::{
    Config, ConflictStyle, PlannerConfig, Resolution, SafetyConfig, StrategyConfig, StrategyRule,
};
pub use error::{Error, NoPlanReason, Result};
pub use executor::{ExecutionReport, Executor, RecordLevel, StepRecord, TerminalStatus};
pub use explain::{explain_plan, render_explanations, ActionExplanation};
pub use models::{
    ActionSpec, ConflictDetail, ConflictType, GoalMode, GoalSpec, Plan, RepoRef, RepoState,
    RiskLevel, TestStatus,
};
pub use planner::{HeuristicWeights, Planner};
