//! NAS mount verification with a single remediation attempt.
//!
//! A mount is healthy when the capacity listing shows the share with
//! enough free space and the mount point answers a liveness probe (a
//! stale CIFS mount still shows up in df). Anything less triggers
//! exactly one cleanup-and-remount before the final verdict; a mount
//! that stays unhealthy after that means the disk should be swapped,
//! not retried.

use std::sync::Arc;

use crate::capacity::parse_capacity_gb;
use crate::catalog::CheckItem;
use crate::config::{CheckConfig, HostTarget, MountSpec};
use crate::exec::RemoteExecutor;
use crate::report::Outcome;

/// Result of one ensure pass.
#[derive(Debug, Clone)]
pub struct MountStatus {
    pub mounted: bool,
    pub df_output: String,
    pub remediated: bool,
}

/// Locate the share's line in `df -h` output and pull the
/// available-capacity field (4th column). First bool: a line for the
/// share exists at all.
pub fn df_avail_field(df_out: &str, share: &str) -> (bool, Option<String>) {
    for line in df_out.lines() {
        if line.contains(share) {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 6 {
                return (true, Some(parts[3].to_string()));
            }
            return (true, None);
        }
    }
    (false, None)
}

/// Verifies and, once per invocation, remediates a NAS mount.
pub struct MountEnsurer {
    exec: Arc<dyn RemoteExecutor>,
    cfg: Arc<CheckConfig>,
}

impl MountEnsurer {
    pub fn new(exec: Arc<dyn RemoteExecutor>, cfg: Arc<CheckConfig>) -> Self {
        Self { exec, cfg }
    }

    /// The cleanup-and-remount command. The mount itself runs under a
    /// remote-side `timeout`, and the option string must not contain
    /// spaces.
    fn remount_command(&self, share: &str) -> String {
        let mount_point = &self.cfg.mount_point;
        let opts = format!(
            "vers=2.0,username={},password={},cache=strict,\
             uid=1000,forceuid,gid=1000,forcegid,\
             file_mode=0755,dir_mode=0755,soft,nounix,noserverino,mapposix,\
             rsize=65536,wsize=65536,bsize=1048576,echo_interval=60,actimeo=1",
            self.cfg.share_user, self.cfg.share_password
        );
        format!(
            "mkdir -p {mount_point}; \
             umount -l {mount_point} 2>/dev/null || true; \
             timeout {}s mount -t cifs //{share}/nas {mount_point} -o {opts}",
            self.cfg.mount_timeout_secs
        )
    }

    /// The mount point must be listable and writable; df alone cannot
    /// tell a live mount from a stale one.
    async fn mount_alive(&self, host: &HostTarget) -> bool {
        let mount_point = &self.cfg.mount_point;
        let ls = format!("ls {mount_point} >/dev/null 2>&1");
        match self.exec.execute(host, &ls, self.cfg.cmd_timeout).await {
            Ok(out) if out.success() => {}
            _ => return false,
        }

        let probe = format!(
            "touch {mount_point}/.__nas_test__ && rm -f {mount_point}/.__nas_test__ >/dev/null 2>&1"
        );
        matches!(
            self.exec.execute(host, &probe, self.cfg.cmd_timeout).await,
            Ok(out) if out.success()
        )
    }

    /// One verification pass: df lookup, capacity threshold, liveness.
    async fn verify(&self, host: &HostTarget, share: &str) -> (bool, String) {
        let df_out = match self.exec.execute(host, "df -h", self.cfg.cmd_timeout).await {
            Ok(out) if !out.timed_out => out.stdout,
            Ok(_) => {
                // Whatever df printed before the session was killed is
                // not a trustworthy table.
                tracing::warn!("df on {} timed out", host.address);
                String::new()
            }
            Err(err) => {
                tracing::warn!("df on {} failed: {}", host.address, err);
                String::new()
            }
        };

        let (found, avail) = df_avail_field(&df_out, share);
        let capacity_ok = avail
            .as_deref()
            .and_then(parse_capacity_gb)
            .is_some_and(|gb| gb >= self.cfg.min_avail_gb);

        let healthy = found && capacity_ok && self.mount_alive(host).await;
        (healthy, df_out)
    }

    /// Verify the mount, remediating at most once. A connect failure
    /// returns unmounted without attempting remediation.
    pub async fn ensure(&self, spec: &MountSpec) -> MountStatus {
        let host = self.cfg.host_target(&spec.host);

        if !self.exec.connect_check(&host).await {
            tracing::warn!("cannot reach {} for mount check", spec.host);
            return MountStatus {
                mounted: false,
                df_output: String::new(),
                remediated: false,
            };
        }

        let (healthy, df_output) = self.verify(&host, &spec.share_address).await;
        if healthy {
            return MountStatus {
                mounted: true,
                df_output,
                remediated: false,
            };
        }

        // One cleanup-and-remount, then a final verdict. No second
        // attempt: a disk that stays broken should be swapped.
        tracing::warn!(
            "mount //{} on {} unhealthy, remounting once",
            spec.share_address,
            spec.host
        );
        let remount = self.remount_command(&spec.share_address);
        let _ = self.exec.execute(&host, &remount, self.cfg.cmd_timeout).await;

        let (healthy, df_output) = self.verify(&host, &spec.share_address).await;
        MountStatus {
            mounted: healthy,
            df_output,
            remediated: true,
        }
    }

    /// Run the full mount check for one catalog item and synthesize
    /// its outcome.
    pub async fn check(&self, item: &CheckItem, spec: &MountSpec) -> Outcome {
        let status = self.ensure(spec).await;

        if !status.mounted {
            return Outcome::failed(
                item,
                "mount failed or disk unusable (cleaned up and remounted once); replace the disk",
                None,
            );
        }

        let (found, avail) = df_avail_field(&status.df_output, &spec.share_address);
        let avail = match (found, avail) {
            (true, Some(avail)) => avail,
            _ => return Outcome::failed(item, "disk state abnormal; replace the disk", None),
        };
        match parse_capacity_gb(&avail) {
            Some(gb) if gb >= self.cfg.min_avail_gb => {
                Outcome::passed(item, format!("available capacity {avail}"), None)
            }
            Some(_) => Outcome::failed(
                item,
                format!(
                    "available capacity {avail} (< {}G); replace the disk",
                    self.cfg.min_avail_gb as u64
                ),
                None,
            ),
            None => Outcome::failed(item, "disk state abnormal; replace the disk", None),
        }
    }
}
