//! Goapgit - goal-oriented git assistant.
//!
//! Observes a repository, plans the shortest safe route to the configured
//! goal state, and executes it one git operation at a time.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use goapgit::actions::ActionRegistry;
use goapgit::core::{explain_plan, render_explanations, Config, Error, Executor, Planner};
use goapgit::diagnose::{generate_diagnosis, report_to_json};
use goapgit::git::{GitFacade, RepoObserver};

/// Goal-oriented git assistant
#[derive(Parser)]
#[command(name = "goapgit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Repository to operate on (defaults to the current directory)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Explicit configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the observed repository state as JSON
    Observe {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Compute and print the plan for the configured goal
    Plan {
        /// Include per-action explanations and alternatives
        #[arg(long)]
        explain: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drive the repository toward the configured goal
    Run {
        /// Force dry-run regardless of configuration
        #[arg(long, conflicts_with = "apply")]
        dry_run: bool,

        /// Execute mutating commands (clears the dry-run default)
        #[arg(long)]
        apply: bool,
    },

    /// Inspect git configuration and repository size
    Diagnose {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "goapgit", &mut io::stdout());
        return Ok(());
    }

    let repo = match &cli.repo {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let mut config = Config::load(&repo, cli.config.as_deref())?;

    match cli.command {
        Commands::Observe { pretty } => {
            let facade = observation_facade(&repo, &config);
            check_environment(&facade);
            let observer = RepoObserver::new(&facade, &config);
            let state = match observer.observe() {
                Ok(state) => state,
                Err(error) => fail(&error),
            };
            let json = if pretty {
                serde_json::to_string_pretty(&state)?
            } else {
                serde_json::to_string(&state)?
            };
            println!("{json}");
        }

        Commands::Plan { explain, json } => {
            let facade = observation_facade(&repo, &config);
            check_environment(&facade);
            let observer = RepoObserver::new(&facade, &config);
            let outcome = observer.observe().and_then(|state| {
                let registry = ActionRegistry::for_observation(&facade, &state)?;
                Planner::new(&config, &registry).plan(&state, &config.goal)
            });
            let plan = match outcome {
                Ok(plan) => plan,
                Err(error) => fail(&error),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                if plan.is_empty() {
                    println!("Nothing to do: the goal already holds.");
                }
                for (index, action) in plan.actions.iter().enumerate() {
                    println!("{}. {} (cost {:.2})", index + 1, action.name, action.cost);
                }
                println!("Estimated cost: {:.2}", plan.estimated_cost);
                for note in &plan.notes {
                    println!("note: {note}");
                }
                if explain {
                    print!("{}", render_explanations(&explain_plan(&plan)));
                }
            }
        }

        Commands::Run { dry_run, apply } => {
            if dry_run {
                config.safety.dry_run = true;
            } else if apply {
                config.safety.dry_run = false;
            }

            let facade = GitFacade::new(&repo, config.safety.dry_run)
                .with_timeouts(config.observe_timeout(), config.mutate_timeout());
            check_environment(&facade);

            let mut executor = Executor::new(&facade, &config);
            let cancel = executor.cancel_handle();
            if let Err(error) = ctrlc::set_handler(move || {
                cancel.store(true, std::sync::atomic::Ordering::SeqCst);
            }) {
                tracing::warn!(%error, "could not install interrupt handler");
            }

            match executor.execute() {
                Ok(report) => {
                    println!(
                        "terminal status: {:?} after {} step record(s), {} replan(s)",
                        report.status,
                        report.steps.len(),
                        report.replan_count
                    );
                    std::process::exit(report.status.exit_code());
                }
                Err(error) => fail(&error),
            }
        }

        Commands::Diagnose { pretty } => {
            let facade = observation_facade(&repo, &config);
            check_environment(&facade);
            let report = match generate_diagnosis(&facade) {
                Ok(report) => report,
                Err(error) => fail(&error),
            };
            println!("{}", report_to_json(&report, pretty)?);
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Observations never mutate, so dry-run is irrelevant; pass it through
/// anyway so suppressed commands would be journaled uniformly.
fn observation_facade(repo: &PathBuf, config: &Config) -> GitFacade {
    GitFacade::new(repo, config.safety.dry_run)
        .with_timeouts(config.observe_timeout(), config.mutate_timeout())
}

fn check_environment(facade: &GitFacade) {
    if let Err(error) = facade.verify_environment() {
        fail(&error);
    }
}

fn fail(error: &Error) -> ! {
    eprintln!("error: {error}");
    std::process::exit(error.exit_code());
}

fn init_logging(verbose: bool, json_logs: bool) {
    let default_level = if verbose { "goapgit=debug" } else { "goapgit=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .init();
    }
}
