//! Spawning of external collaborator programs.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no command configured")]
    Empty,

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write stdin of `{program}`: {source}")]
    Stdin {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}{}", stderr_suffix(.stderr))]
    Exit { program: String, status: String, stderr: String },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() { String::new() } else { format!(": {trimmed}") }
}

/// How the child's stdout/stderr are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Capture both streams; stderr is reported on failure.
    Capture,
    /// Share the orchestrator's terminal (long-running or interactive children).
    Inherit,
}

/// Argv prefix of an external program. Per-invocation arguments are appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalCommand(Vec<String>);

impl ExternalCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(argv.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.0
    }

    /// Run to completion and return captured stdout (empty when inherited).
    pub async fn run(
        &self,
        args: &[OsString],
        mode: OutputMode,
        stdin: Option<&[u8]>,
    ) -> Result<String, CommandError> {
        let (program, prefix) = self.0.split_first().ok_or(CommandError::Empty)?;

        let mut cmd = Command::new(program);
        cmd.args(prefix).args(args);
        cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::inherit() });
        match mode {
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
        }

        tracing::debug!("spawning {} {:?}", self.0.join(" "), args);
        let spawn_err = |source: std::io::Error| CommandError::Spawn { program: program.clone(), source };
        let mut child = cmd.spawn().map_err(spawn_err)?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let written = match pipe.write_all(input).await {
                Ok(()) => pipe.shutdown().await,
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => {}
                // The child stopped reading; its exit status decides the outcome.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!("{program} closed stdin before reading all input");
                }
                Err(source) => return Err(CommandError::Stdin { program: program.clone(), source }),
            }
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        if !output.status.success() {
            return Err(CommandError::Exit {
                program: program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
