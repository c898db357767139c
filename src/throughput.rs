//! Topic publish-rate verification.
//!
//! The measurement command prints one line per observation window,
//! starting with the topic path and ending with the rate sample for
//! that window. A healthy topic yields strictly positive samples in
//! every window.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::catalog::CheckItem;
use crate::config::{CheckConfig, HostTarget};
use crate::exec::RemoteExecutor;
use crate::report::Outcome;

static WINDOW_RE: OnceLock<Regex> = OnceLock::new();

/// Extract rate samples from measurement output: for every line that
/// starts with a path token, take the trailing integer. Lines of any
/// other shape contribute nothing.
pub fn parse_rate_windows(text: &str) -> Vec<u64> {
    let re = WINDOW_RE.get_or_init(|| Regex::new(r"^\s*/\S+.*\s(\d+)\s*$").unwrap());

    let mut windows = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || !trimmed.starts_with('/') {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            if let Ok(value) = caps[1].parse::<u64>() {
                windows.push(value);
            }
        }
    }
    windows
}

/// Measures one topic's publish rate and classifies the result.
pub struct ThroughputChecker {
    exec: Arc<dyn RemoteExecutor>,
    cfg: Arc<CheckConfig>,
}

impl ThroughputChecker {
    pub fn new(exec: Arc<dyn RemoteExecutor>, cfg: Arc<CheckConfig>) -> Self {
        Self { exec, cfg }
    }

    /// One measurement attempt. Session errors count as an empty
    /// sample set; the retry policy handles them like any other empty
    /// result.
    async fn measure_once(&self, host: &HostTarget, command: &str) -> Vec<u64> {
        match self.exec.execute(host, command, self.cfg.measure_timeout).await {
            Ok(out) => {
                if out.timed_out {
                    // Partial lines from a killed session are not
                    // evidence of a live topic. The remote-side
                    // `timeout` wrapper exiting nonzero is fine; only
                    // a session timeout voids the attempt.
                    tracing::warn!("measurement on {} timed out", host.address);
                    return Vec::new();
                }
                let merged = out.merged();
                if merged.trim().is_empty() {
                    Vec::new()
                } else {
                    parse_rate_windows(&merged)
                }
            }
            Err(err) => {
                tracing::warn!("measurement on {} failed: {}", host.address, err);
                Vec::new()
            }
        }
    }

    /// Run the measurement for one catalog item, with the single-retry
    /// policy, and classify.
    pub async fn check(&self, item: &CheckItem) -> Outcome {
        let host = self
            .cfg
            .host_target(item.host.as_deref().unwrap_or_default());
        let command = item.command.as_deref().unwrap_or_default();

        let mut windows = self.measure_once(&host, command).await;
        if windows.is_empty() || windows.iter().all(|w| *w == 0) {
            // The measurement tool is occasionally slow to start; one
            // more attempt, taken as final whatever it yields.
            tracing::info!("retrying measurement for {}", item.name);
            windows = self.measure_once(&host, command).await;
        }

        let sample_list = format!("windows={:?}", windows);
        let with_note = |message: String| match &item.safety_note {
            Some(note) => format!("{note}; {message}"),
            None => message,
        };

        if windows.is_empty() {
            let message = format!(
                "possible session overload, unpublished topic, or wrong target host | {command} | {sample_list}"
            );
            return Outcome::failed(item, with_note(message), Some(windows));
        }

        if windows.iter().any(|w| *w == 0) {
            let message = format!("{command} | {sample_list}");
            return Outcome::failed(item, with_note(message), Some(windows));
        }

        Outcome::passed(item, sample_list, Some(windows))
    }
}
