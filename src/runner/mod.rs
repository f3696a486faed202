pub mod command;
pub mod terminate;
pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;

pub use types::{ExecutionOutcome, ExecutionRequest, FailureReason, Invocation};

/// Runs one attempt of one tool.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, request: &ExecutionRequest) -> ExecutionOutcome;
}

/// Runs tools as real child processes with a wall-clock timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    /// Launch the child and race its exit against the timeout.
    ///
    /// Whichever settles first decides the outcome; the losing branch is
    /// dropped by `select!`, so the outcome is produced exactly once.
    async fn run(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        let timeout_ms = millis(request.timeout);

        tracing::debug!(
            command = %request.command,
            invocation = ?request.invocation,
            timeout_ms,
            "Launching tool"
        );

        let started = Instant::now();

        let mut child = match command::build(request).spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = format!("{}: {e}", request.command);
                if request.verbose {
                    tracing::warn!(command = %request.command, error = %e, "Error: {message}");
                }
                return ExecutionOutcome::Failure(FailureReason::LaunchError(message));
            }
        };

        tokio::select! {
            status = child.wait() => {
                let elapsed_ms = millis(started.elapsed());
                match status {
                    Ok(status) => {
                        let outcome = command::classify(status, request.invocation);
                        tracing::debug!(
                            command = %request.command,
                            exit_code = ?status.code(),
                            elapsed_ms,
                            outcome = %outcome,
                            "Tool exited"
                        );
                        if request.verbose {
                            if let ExecutionOutcome::Failure(FailureReason::LaunchError(message)) = &outcome {
                                tracing::warn!(command = %request.command, "Error: {message}");
                            }
                        }
                        outcome
                    }
                    Err(e) => {
                        if request.verbose {
                            tracing::warn!(command = %request.command, error = %e, "Error: {e}");
                        }
                        ExecutionOutcome::Failure(FailureReason::LaunchError(e.to_string()))
                    }
                }
            }
            _ = tokio::time::sleep(request.timeout) => {
                if request.verbose {
                    tracing::info!(
                        command = %request.command,
                        timeout_ms,
                        "Timeout after {timeout_ms}ms"
                    );
                }
                terminate::terminate(&mut child);
                ExecutionOutcome::Failure(FailureReason::TimedOut)
            }
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn request(command: &str, argument: &str) -> ExecutionRequest {
        ExecutionRequest::new(command, argument, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_run_success() {
        let outcome = ProcessRunner::new().run(&request("true", "fix bug")).await;
        assert_eq!(outcome, ExecutionOutcome::Success);
    }

    #[tokio::test]
    async fn test_run_non_zero_exit() {
        let outcome = ProcessRunner::new().run(&request("false", "fix bug")).await;
        assert_eq!(outcome, ExecutionOutcome::Failure(FailureReason::NonZeroExit(1)));
    }

    #[tokio::test]
    async fn test_run_reports_exit_code() {
        let outcome = ProcessRunner::new()
            .run(&request("sh -c 'exit 3' sh", "fix bug"))
            .await;
        assert_eq!(outcome, ExecutionOutcome::Failure(FailureReason::NonZeroExit(3)));
    }

    #[tokio::test]
    async fn test_run_passes_task_as_single_argument() {
        // The task must arrive untouched by the shell: one argument, `$HOME` literal.
        let command = r#"sh -c 'test "$#" -eq 1 && test "$1" = "fix bug; echo \$HOME"' sh"#;
        let outcome = ProcessRunner::new()
            .run(&request(command, "fix bug; echo $HOME"))
            .await;
        assert_eq!(outcome, ExecutionOutcome::Success);
    }

    #[tokio::test]
    async fn test_run_empty_argument_is_still_passed() {
        let command = r#"sh -c 'test "$#" -eq 1 && test -z "$1"' sh"#;
        let outcome = ProcessRunner::new().run(&request(command, "")).await;
        assert_eq!(outcome, ExecutionOutcome::Success);
    }

    #[tokio::test]
    async fn test_run_missing_command_through_shell() {
        let outcome = ProcessRunner::new()
            .run(&request("code-fallback-no-such-tool-12345", "fix bug").verbose(true))
            .await;
        assert!(matches!(
            outcome,
            ExecutionOutcome::Failure(FailureReason::LaunchError(_))
        ));
    }

    #[tokio::test]
    async fn test_run_missing_command_direct() {
        let outcome = ProcessRunner::new()
            .run(
                &request("code-fallback-no-such-tool-12345", "fix bug")
                    .invocation(Invocation::Direct),
            )
            .await;
        match outcome {
            ExecutionOutcome::Failure(FailureReason::LaunchError(message)) => {
                assert!(message.contains("code-fallback-no-such-tool-12345"));
            }
            other => panic!("expected launch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_timeout_resolves_promptly() {
        let request = ExecutionRequest::new("sleep", "30", Duration::from_millis(200))
            .invocation(Invocation::Direct)
            .verbose(true);

        let started = Instant::now();
        let outcome = ProcessRunner::new().run(&request).await;
        let elapsed = started.elapsed();

        assert_eq!(outcome, ExecutionOutcome::Failure(FailureReason::TimedOut));
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_run_timeout_through_shell() {
        let request = ExecutionRequest::new("sleep", "30", Duration::from_millis(200));
        let outcome = ProcessRunner::new().run(&request).await;
        assert_eq!(outcome, ExecutionOutcome::Failure(FailureReason::TimedOut));
    }

    #[tokio::test]
    async fn test_fast_exit_beats_long_timeout() {
        let request = ExecutionRequest::new("true", "", Duration::from_secs(30));
        let started = Instant::now();
        let outcome = ProcessRunner::new().run(&request).await;
        assert_eq!(outcome, ExecutionOutcome::Success);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout_sends_sigterm_to_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("term");

        // Records SIGTERM into the marker file given as $0. `exec` in the shell
        // wrapper means this script, not an intermediate sh, receives the signal.
        let command = format!(
            r#"sh -c 'trap "echo term > \"$0\"; kill \$!; exit 0" TERM; sleep 30 & wait' {}"#,
            marker.display()
        );
        let request = ExecutionRequest::new(&command, "fix bug", Duration::from_millis(500));

        let outcome = ProcessRunner::new().run(&request).await;
        assert_eq!(outcome, ExecutionOutcome::Failure(FailureReason::TimedOut));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !marker.exists() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(marker.exists(), "timed-out tool never saw SIGTERM");
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_huge_timeout_does_not_overflow() {
        let request = ExecutionRequest::new("true", "", Duration::MAX);
        let outcome = ProcessRunner::new().run(&request).await;
        assert_eq!(outcome, ExecutionOutcome::Success);
    }
}
