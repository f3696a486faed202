use tokio::process::Child;

/// Ask a timed-out child to stop. Fire-and-forget: the child is not waited
/// on, and one that ignores SIGTERM keeps running.
#[cfg(unix)]
pub fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        // Already reaped.
        return;
    };

    let Ok(raw_pid) = i32::try_from(pid) else {
        tracing::warn!(pid, "Child pid out of range, cannot signal");
        return;
    };

    if let Err(e) = kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
        tracing::warn!(pid, error = %e, "Failed to send SIGTERM to timed-out child");
    }
}

#[cfg(not(unix))]
pub fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "Failed to kill timed-out child");
    }
}
