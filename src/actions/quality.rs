//! Quality hooks: running the test suite and summarising rewrites.

use std::process::{Command, Stdio};
use std::time::Duration;

use crate::core::{Config, Error, Result};
use crate::git::facade::wait_with_timeout;
use crate::git::GitFacade;

/// Run the configured test command, bounded by the configured runtime.
pub fn run_tests(config: &Config) -> Result<String> {
    let command = config.safety.test_command.trim();
    if command.is_empty() {
        return Err(Error::Policy {
            rule: "RunTests requires safety.test_command to be set".to_string(),
        });
    }

    if config.safety.dry_run {
        tracing::info!(command, "dry-run: test run skipped");
        return Ok(format!("dry-run: skipped test command '{command}'"));
    }

    tracing::info!(command, "running test suite");
    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let timeout = Duration::from_secs(config.safety.max_test_runtime_sec);
    let (exit_code, _stdout, stderr) = wait_with_timeout(child, timeout)?;
    if exit_code != 0 {
        return Err(Error::External { code: exit_code, stderr });
    }
    Ok(format!("test command '{command}' passed"))
}

/// Summarise how a rewrite changed the branch, via `git range-diff`.
pub fn explain_range_diff(
    facade: &GitFacade,
    before: &str,
    after: &str,
) -> Result<String> {
    let range_before = format!("{before}...{after}");
    let output = facade.run_unchecked(&["range-diff", &range_before])?;
    if !output.success() {
        return Err(Error::External { code: output.exit_code, stderr: output.stderr });
    }
    let summary = output.stdout.trim().to_string();
    tracing::info!(before, after, "computed range diff");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_tests_requires_command() {
        let config = Config::default();
        let error = run_tests(&config).unwrap_err();
        assert!(matches!(error, Error::Policy { .. }));
    }

    #[test]
    fn test_run_tests_dry_run_skips() {
        let mut config = Config::default();
        config.safety.test_command = "false".to_string();
        let message = run_tests(&config).unwrap();
        assert!(message.contains("skipped"));
    }

    #[test]
    fn test_run_tests_executes_command() {
        let mut config = Config::default();
        config.safety.dry_run = false;
        config.safety.test_command = "true".to_string();
        assert!(run_tests(&config).is_ok());

        config.safety.test_command = "false".to_string();
        let error = run_tests(&config).unwrap_err();
        assert!(matches!(error, Error::External { .. }));
    }
}
