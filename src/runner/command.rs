use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use super::types::{ExecutionOutcome, ExecutionRequest, FailureReason, Invocation};

/// Shell status for "command not found".
const SHELL_NOT_FOUND: i32 = 127;
/// Shell status for "found but not executable".
const SHELL_NOT_EXECUTABLE: i32 = 126;

/// Build the child process for a request.
///
/// The child shares the caller's stdin, stdout and stderr; nothing is piped
/// or buffered.
pub fn build(request: &ExecutionRequest) -> Command {
    let mut cmd = match request.invocation {
        Invocation::Shell => shell_command(&request.command, &request.argument),
        Invocation::Direct => {
            let mut cmd = Command::new(&request.command);
            cmd.arg(&request.argument);
            cmd
        }
    };

    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(false);
    cmd
}

/// `exec` replaces the shell with the tool, so a later SIGTERM lands on the
/// tool itself rather than on an intermediate `sh`.
#[cfg(unix)]
fn shell_command(command: &str, argument: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(format!("exec {command} \"$@\""))
        .arg(command)
        .arg(argument);
    cmd
}

#[cfg(not(unix))]
fn shell_command(command: &str, argument: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command).arg(argument);
    cmd
}

/// Map a finished child's status onto an outcome.
pub fn classify(status: ExitStatus, invocation: Invocation) -> ExecutionOutcome {
    if status.success() {
        return ExecutionOutcome::Success;
    }

    let code = exit_code(status);
    match (invocation, code) {
        (Invocation::Shell, SHELL_NOT_FOUND) => {
            ExecutionOutcome::Failure(FailureReason::LaunchError("command not found".to_string()))
        }
        (Invocation::Shell, SHELL_NOT_EXECUTABLE) => ExecutionOutcome::Failure(
            FailureReason::LaunchError("command not executable".to_string()),
        ),
        _ => ExecutionOutcome::Failure(FailureReason::NonZeroExit(code)),
    }
}

/// Exit code, or `128 + signal` when the child was killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
