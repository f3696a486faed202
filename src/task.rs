use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{AppError, Result};

/// Resolve the task text.
///
/// A non-empty argument wins and is used verbatim. Otherwise `input` is
/// drained to end-of-stream and trimmed. Nothing left is `AppError::EmptyTask`.
pub async fn resolve_task<R>(argument: Option<String>, mut input: R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    if let Some(task) = argument.filter(|t| !t.is_empty()) {
        return Ok(task);
    }

    let mut buf = Vec::new();
    input.read_to_end(&mut buf).await?;

    let task = String::from_utf8_lossy(&buf).trim().to_string();
    if task.is_empty() {
        return Err(AppError::EmptyTask);
    }

    tracing::debug!(bytes = buf.len(), "Read task from stdin");
    Ok(task)
}
