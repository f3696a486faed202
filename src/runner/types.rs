use std::fmt;
use std::time::Duration;

/// How a tool's command string is turned into a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Interpret the command through the host shell, passing the argument
    /// as a single positional parameter.
    Shell,
    /// Exec the command directly with the argument as its only argument.
    Direct,
}

/// One bounded attempt at running a tool against a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub command: String,
    pub argument: String,
    pub timeout: Duration,
    pub verbose: bool,
    pub invocation: Invocation,
}

impl ExecutionRequest {
    pub fn new(command: &str, argument: &str, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            argument: argument.to_string(),
            timeout,
            verbose: false,
            invocation: Invocation::Shell,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn invocation(mut self, invocation: Invocation) -> Self {
        self.invocation = invocation;
        self
    }
}

/// Why an attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The tool ran and exited with a non-zero status.
    NonZeroExit(i32),
    /// The tool exceeded its wall-clock budget and was sent SIGTERM.
    TimedOut,
    /// The tool could not be started at all.
    LaunchError(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NonZeroExit(code) => write!(f, "exited with status {code}"),
            FailureReason::TimedOut => write!(f, "timed out"),
            FailureReason::LaunchError(message) => write!(f, "failed to launch: {message}"),
        }
    }
}

/// Result of a single attempt. Produced exactly once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    Failure(FailureReason),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Success => write!(f, "succeeded"),
            ExecutionOutcome::Failure(reason) => reason.fmt(f),
        }
    }
}
