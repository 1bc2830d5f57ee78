//! External process execution for command-line providers.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{ProviderOperation, ProviderRuntimeError};

/// One process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInput {
    pub command_path: PathBuf,
    pub args: Vec<String>,
    /// Bytes written to the child's stdin before it is closed.
    pub input: Vec<u8>,
    pub timeout: Duration,
}

/// Buffered result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command timed out after {0}ms")]
    Timeout(u64),

    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("command i/o failed: {0}")]
    Io(#[source] std::io::Error),
}

/// Runs external commands. Injected so adapters can be tested without
/// real binaries.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, input: CommandInput) -> Result<CommandOutput, CommandError>;
}

/// Spawns a real child process with piped stdio.
///
/// Stdin is fed from a separate task so a child that fills its stdout
/// pipe before reading all input cannot deadlock. The child is killed
/// when the timeout elapses.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, input: CommandInput) -> Result<CommandOutput, CommandError> {
        let mut child = Command::new(&input.command_path)
            .args(&input.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(CommandError::Spawn)?;

        let write_task = child.stdin.take().map(|mut stdin| {
            let bytes = input.input;
            tokio::spawn(async move {
                if !bytes.is_empty() {
                    stdin.write_all(&bytes).await?;
                }
                stdin.shutdown().await
            })
        });

        let timeout_ms = u64::try_from(input.timeout.as_millis()).unwrap_or(u64::MAX);
        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(input.timeout, child.wait_with_output())
            .await
            .map_err(|_| CommandError::Timeout(timeout_ms))?
            .map_err(CommandError::Io)?;

        if let Some(task) = write_task {
            match task.await {
                Ok(Ok(())) => {}
                // The child may exit without draining stdin.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(CommandError::Io(e)),
                Err(e) => return Err(CommandError::Io(std::io::Error::other(e))),
            }
        }

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
            signal: exit_signal(&output.status),
        })
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Shared invocation logic of the command-line adapters.
///
/// Maps every executor outcome onto a [`ProviderRuntimeError`] carrying
/// the provider id and operation.
#[derive(Clone)]
pub struct CommandRunner {
    command_path: Option<PathBuf>,
    timeout: Duration,
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("command_path", &self.command_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CommandRunner {
    pub fn new(
        command_path: Option<PathBuf>,
        timeout: Duration,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        let command_path =
            command_path.filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty());
        Self {
            command_path,
            timeout,
            executor,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run(
        &self,
        provider_id: &'static str,
        operation: ProviderOperation,
        args: Vec<String>,
        input: Vec<u8>,
    ) -> Result<CommandOutput, ProviderRuntimeError> {
        let command_path = self
            .command_path
            .clone()
            .ok_or_else(|| ProviderRuntimeError::not_configured(provider_id, operation))?;
        let command_location = format!("voice.providers.{}.command", provider_id);

        tracing::debug!(
            provider = provider_id,
            operation = %operation,
            command = %command_path.display(),
            "invoking provider command"
        );

        let output = self
            .executor
            .execute(CommandInput {
                command_path,
                args,
                input,
                timeout: self.timeout,
            })
            .await
            .map_err(|err| match err {
                CommandError::Timeout(_) => ProviderRuntimeError::timeout(
                    provider_id,
                    operation,
                    u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                ),
                other => ProviderRuntimeError::exec_failed(
                    provider_id,
                    operation,
                    command_location.clone(),
                    other.to_string(),
                    format!(
                        "Verify {} runtime binary path and executable access",
                        provider_id
                    ),
                ),
            })?;

        if !output.success() {
            let exit_code = output.exit_code.map_or(Value::Null, Value::from);
            let signal = output.signal.map_or(Value::Null, Value::from);
            let reason = match output.exit_code {
                Some(code) => format!("{} command exited with code {}", provider_id, code),
                None => format!("{} command was terminated by a signal", provider_id),
            };
            tracing::warn!(provider = provider_id, %reason, "provider command failed");
            return Err(ProviderRuntimeError::exec_failed(
                provider_id,
                operation,
                command_location,
                reason,
                format!(
                    "Verify {} runtime binary path, permissions, and model assets",
                    provider_id
                ),
            )
            .with_detail("exitCode", exit_code)
            .with_detail("signal", signal)
            .with_detail(
                "stderr",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(output)
    }
}
