//! # Goapgit
//!
//! Goal-oriented git assistant: observe a working repository, search for
//! the shortest safe sequence of atomic git operations that reaches a
//! declared goal state, and execute it one action at a time with
//! replan-on-drift.
//!
//! ## How it works
//!
//! - The **observer** decodes `git status --porcelain=v2`, conflict
//!   markers, and non-destructive merge previews into an immutable
//!   [`core::RepoState`] snapshot.
//! - The **planner** runs A* over action predictions with an
//!   admissibility-clamped heuristic and returns an explained
//!   [`core::Plan`].
//! - The **executor** dispatches one action at a time through a safe git
//!   subprocess facade, re-observes, and replans when the repository
//!   drifts from the prediction.
//!
//! ## Quick start
//!
//! ```bash
//! # Show what would happen (dry-run is the default)
//! goapgit plan --explain
//!
//! # Drive the repository to the configured goal
//! goapgit run --apply
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)]

pub mod actions;
pub mod core;
pub mod diagnose;
pub mod git;

pub use crate::core::{Config, ExecutionReport, Executor, GoalSpec, Plan, Planner, RepoState};
pub use crate::git::{GitFacade, RepoObserver};
