use std::fmt;

use crate::config::AppConfig;
use crate::runner::{ExecutionOutcome, ExecutionRequest, ProcessRunner, Runner};

/// Which of the two tools an attempt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Primary,
    Secondary,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attempt::Primary => write!(f, "primary"),
            Attempt::Secondary => write!(f, "secondary"),
        }
    }
}

/// Final result of running a task through the fallback policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceResult {
    pub succeeded: bool,
    /// Exit status for the host process: 0 on success, 1 otherwise.
    pub final_exit_code: u8,
    /// The attempt that succeeded, if any.
    pub succeeded_with: Option<Attempt>,
    pub primary: ExecutionOutcome,
    /// `None` when the primary succeeded and the secondary never ran.
    pub secondary: Option<ExecutionOutcome>,
}

impl SequenceResult {
    fn primary_succeeded(primary: ExecutionOutcome) -> Self {
        Self {
            succeeded: true,
            final_exit_code: 0,
            succeeded_with: Some(Attempt::Primary),
            primary,
            secondary: None,
        }
    }

    fn after_fallback(primary: ExecutionOutcome, secondary: ExecutionOutcome) -> Self {
        let succeeded = secondary.is_success();
        Self {
            succeeded,
            final_exit_code: if succeeded { 0 } else { 1 },
            succeeded_with: succeeded.then_some(Attempt::Secondary),
            primary,
            secondary: Some(secondary),
        }
    }
}

/// Runs a task with the primary tool, then with the secondary tool only if
/// the primary attempt failed. At most one attempt per tool, never
/// concurrently.
pub struct FallbackSequencer<R = ProcessRunner> {
    runner: R,
}

impl<R: Runner> FallbackSequencer<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub async fn execute(&self, task: &str, config: &AppConfig) -> SequenceResult {
        let verbose = config.verbose;

        if verbose {
            tracing::info!(
                command = %config.primary_command,
                "Trying {} first",
                config.primary_command
            );
        }

        let primary = self
            .attempt(Attempt::Primary, &config.primary_command, task, config)
            .await;

        if primary.is_success() {
            if verbose {
                tracing::info!(
                    command = %config.primary_command,
                    "{} succeeded",
                    config.primary_command
                );
            }
            return SequenceResult::primary_succeeded(primary);
        }

        if verbose {
            tracing::info!(
                primary = %config.primary_command,
                secondary = %config.secondary_command,
                reason = %primary,
                "{} failed, falling back to {}",
                config.primary_command,
                config.secondary_command
            );
        }

        let secondary = self
            .attempt(Attempt::Secondary, &config.secondary_command, task, config)
            .await;

        if verbose {
            if secondary.is_success() {
                tracing::info!(
                    command = %config.secondary_command,
                    "{} succeeded",
                    config.secondary_command
                );
            } else {
                tracing::info!(
                    reason = %secondary,
                    "Both {} and {} failed",
                    config.primary_command,
                    config.secondary_command
                );
            }
        }

        SequenceResult::after_fallback(primary, secondary)
    }

    async fn attempt(
        &self,
        attempt: Attempt,
        command: &str,
        task: &str,
        config: &AppConfig,
    ) -> ExecutionOutcome {
        let request = ExecutionRequest::new(command, task, config.timeout())
            .verbose(config.verbose)
            .invocation(config.invocation());

        let outcome = self.runner.run(&request).await;

        tracing::debug!(%attempt, command, outcome = %outcome, "Attempt finished");

        outcome
    }
}
