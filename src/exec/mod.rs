//! Remote command execution.
//!
//! One session runs exactly one command and is released on every exit
//! path. The `RemoteExecutor` trait is the seam the engine is built
//! against; production uses the SSH executor, tests drive the engine
//! with a scripted double.

mod ssh;

pub use ssh::*;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::HostTarget;

/// Remote execution error types.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to spawn {0}: {1}")]
    Spawn(String, #[source] std::io::Error),
    #[error("connection to {0} failed: {1}")]
    Connect(String, String),
}

/// Captured result of one remote command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Remote exit code; -1 when the command timed out.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl Default for ExecOutput {
    fn default() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
        }
    }
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Both streams joined; the measurement tool writes rate lines to
    /// either one.
    pub fn merged(&self) -> String {
        if self.stdout.is_empty() || self.stderr.is_empty() {
            format!("{}{}", self.stdout, self.stderr)
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes commands on remote hosts, one fresh session per command.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Open a session and immediately release it; the reachability
    /// probe behind the gate check.
    async fn connect_check(&self, host: &HostTarget) -> bool;

    /// Run one command under `timeout` on a fresh session. On timeout
    /// the remote process is terminated, partial output is kept, and
    /// `timed_out` is set.
    async fn execute(
        &self,
        host: &HostTarget,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutput, ExecError>;
}
