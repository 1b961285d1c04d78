// Error types for remote execution, per-node collection and output sinks.

use std::time::Duration;

/// Failure of a single remote command invocation.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote command failed: {0}")]
    RemoteFailure(String),
}

/// Why a node ended up in the failure list. Never aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("empty report")]
    EmptyReport,

    #[error("collection deadline exceeded")]
    DeadlineExceeded,

    #[error("worker aborted: {0}")]
    WorkerAborted(String),
}

/// Errors from writing a collection result out. Fatal for the command.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
