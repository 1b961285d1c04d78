// Remote command execution over an already-configured SSH channel.

use crate::error::ExecError;
use crate::models::{Node, RawReport};
use std::future::Future;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::instrument;

/// Diagnostic command run on every node, e.g. `/usr/sbin/nfsiostat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Runs one command on one node. Implementations must not retry and must release
/// the underlying channel on every exit path, including when the future is dropped.
pub trait RemoteExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        node: &Node,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> impl Future<Output = Result<RawReport, ExecError>> + Send;
}

/// Shells out to `ssh` (or any compatible program) once per call.
#[derive(Debug, Clone)]
pub struct SshRepo {
    program: String,
    options: Vec<String>,
    connect_timeout: Duration,
}

impl SshRepo {
    pub fn new(program: impl Into<String>, options: Vec<String>, connect_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            options,
            connect_timeout,
        }
    }

    /// Full argument list after the program name.
    pub fn command_args(&self, node: &Node, command: &RemoteCommand) -> Vec<String> {
        let mut args = self.options.clone();
        args.push("-o".into());
        args.push(format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)));
        args.push(node.as_str().to_string());
        args.push(command.program.clone());
        args.extend(command.args.iter().cloned());
        args
    }
}

impl RemoteExecutor for SshRepo {
    #[instrument(skip(self, command), fields(repo = "remote", operation = "execute", node = %node))]
    async fn execute(
        &self,
        node: &Node,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<RawReport, ExecError> {
        let child = Command::new(&self.program)
            .args(self.command_args(node, command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result
                .map_err(|e| ExecError::RemoteFailure(format!("reading command output: {e}")))?,
            Err(_) => return Err(ExecError::Timeout(timeout)),
        };
        check_output(output, self.connect_timeout)
    }
}

/// Exit code ssh uses for its own (connection-level) errors.
const SSH_CONNECTION_ERROR: i32 = 255;

pub(crate) fn check_output(output: Output, connect_timeout: Duration) -> Result<RawReport, ExecError> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.to_ascii_lowercase().starts_with("warning"))
        .collect();

    if !output.status.success() {
        if output.status.code() == Some(SSH_CONNECTION_ERROR)
            && errors.iter().any(|l| is_unreachable(l))
        {
            return Err(ExecError::Timeout(connect_timeout));
        }
        let message = if errors.is_empty() {
            output.status.to_string()
        } else {
            errors.join("; ")
        };
        return Err(ExecError::RemoteFailure(message));
    }
    if !errors.is_empty() {
        return Err(ExecError::RemoteFailure(errors.join("; ")));
    }
    Ok(RawReport::new(String::from_utf8_lossy(&output.stdout).into_owned()))
}

fn is_unreachable(line: &str) -> bool {
    let line = line.to_ascii_lowercase();
    line.contains("timed out") || line.contains("no route to host")
}
