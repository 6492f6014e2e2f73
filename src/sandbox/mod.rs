//! Execution of generated code in a fresh interpreter.
//!
//! Each run starts a new interpreter process, so the snippet sees an empty
//! namespace and everything it defines is gone afterwards. This is a trust
//! boundary, not a security sandbox: the code runs with the user's own
//! filesystem, network and process access, with no CPU, memory or time limit.

use std::collections::BTreeMap;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::config::SandboxConfig;

/// Result of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub success: bool,
    /// One-line failure summary, `None` on success
    pub error: Option<String>,
    /// Everything the code printed to stdout
    pub stdout: String,
    /// Everything the code wrote to stderr
    pub stderr: String,
}

impl ExecutionOutcome {
    pub fn success(stderr: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn failure(error: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }
}

/// Runs a code artifact. Never fails: faults are reported in the outcome.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run(&self, code: &str) -> ExecutionOutcome;
}

/// Passes the code to an interpreter as an argument (`python3 -c <code>`).
///
/// stdin is inherited so programs can read from the user. stdout is echoed to
/// the terminal as it arrives and kept in the outcome; stderr is captured to
/// describe failures.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    interpreter: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl ProcessSandbox {
    pub fn new(interpreter: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(config.interpreter.clone(), config.args.clone()).with_env(config.env.clone())
    }

    /// Extra environment variables for every run.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }
}

/// Last non-empty stderr line, which for Python is the exception itself.
fn summarize_failure(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Copy `reader` to `console` chunk by chunk, returning everything copied.
///
/// Each chunk is flushed so prompts without a trailing newline show up before
/// the program waits for input.
async fn echo_output<R, W>(mut reader: R, console: &mut W) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut captured = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        console.write_all(&chunk[..n]).await?;
        console.flush().await?;
        captured.extend_from_slice(&chunk[..n]);
    }
    Ok(captured)
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    async fn run(&self, code: &str) -> ExecutionOutcome {
        log::info!("Executing {} bytes with {}", code.len(), self.interpreter);

        let spawned = Command::new(&self.interpreter)
            .args(&self.args)
            .arg(code)
            .envs(&self.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                log::warn!("Failed to start {}: {}", self.interpreter, e);
                return ExecutionOutcome::failure(format!("failed to start {}: {}", self.interpreter, e), "");
            }
        };

        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();

        let stdout_task = async {
            match child_stdout {
                Some(out) => echo_output(out, &mut tokio::io::stdout()).await,
                None => Ok(Vec::new()),
            }
        };
        let stderr_task = async {
            match child_stderr {
                Some(err) => read_all(err).await,
                None => Ok(Vec::new()),
            }
        };

        let (stdout, stderr, status) = tokio::join!(stdout_task, stderr_task, child.wait());

        let stdout = stdout.unwrap_or_else(|e| {
            log::warn!("Failed to read stdout of {}: {}", self.interpreter, e);
            Vec::new()
        });
        let stderr = stderr.unwrap_or_else(|e| {
            log::warn!("Failed to read stderr of {}: {}", self.interpreter, e);
            Vec::new()
        });
        let stdout = String::from_utf8_lossy(&stdout).to_string();
        let stderr = String::from_utf8_lossy(&stderr).to_string();

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                log::warn!("Failed to wait for {}: {}", self.interpreter, e);
                return ExecutionOutcome::failure(format!("failed to wait for {}: {}", self.interpreter, e), stderr)
                    .with_stdout(stdout);
            }
        };

        if status.success() {
            log::info!("Execution succeeded");
            ExecutionOutcome::success(stderr).with_stdout(stdout)
        } else {
            let error = summarize_failure(&stderr).unwrap_or_else(|| format!("process {}", status));
            log::info!("Execution failed: {}", error);
            ExecutionOutcome::failure(error, stderr).with_stdout(stdout)
        }
    }
}
