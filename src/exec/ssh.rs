//! SSH executor shelling out to the system `ssh` binary.
//!
//! Password auth goes through `sshpass`; host keys are not checked
//! because the rig hosts are reimaged often. One process per command
//! keeps the one-session-per-command contract: the session is gone
//! when the process exits, on every path.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use super::{ExecError, ExecOutput, RemoteExecutor};
use crate::config::HostTarget;

/// Executes commands over SSH subprocesses.
pub struct SshExecutor {
    connect_timeout: Duration,
}

impl SshExecutor {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn base_args(&self, host: &HostTarget) -> Vec<String> {
        vec![
            "-p".to_string(),
            host.port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            "NumberOfPasswordPrompts=1".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            format!("{}@{}", host.username, host.address),
        ]
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn connect_check(&self, host: &HostTarget) -> bool {
        // ConnectTimeout bounds the TCP phase; the outer budget also
        // covers banner exchange and auth.
        let budget = self.connect_timeout + Duration::from_secs(2);
        match self.execute(host, "true", budget).await {
            Ok(out) => out.success(),
            Err(err) => {
                tracing::warn!("connect check for {} failed: {}", host.address, err);
                false
            }
        }
    }

    async fn execute(
        &self,
        host: &HostTarget,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecOutput, ExecError> {
        let mut child = Command::new("sshpass")
            .arg("-p")
            .arg(&host.password)
            .arg("ssh")
            .args(self.base_args(host))
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::Spawn("sshpass".to_string(), e))?;

        // Drain both pipes concurrently with the wait so a chatty or
        // blocking command cannot deadlock on a full pipe buffer.
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => (status.code().unwrap_or(-1), false),
            Ok(Err(err)) => {
                tracing::warn!("wait for command on {} failed: {}", host.address, err);
                (-1, false)
            }
            Err(_) => {
                // Timed out: terminate the session, keep whatever
                // output already arrived.
                tracing::warn!(
                    "command on {} exceeded {:?}, terminating",
                    host.address,
                    timeout
                );
                let _ = child.start_kill();
                let _ = child.wait().await;
                (-1, true)
            }
        };

        let stdout = String::from_utf8_lossy(&stdout_task.await.unwrap_or_default()).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_task.await.unwrap_or_default()).into_owned();

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
            timed_out,
        })
    }
}
