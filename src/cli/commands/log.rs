use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::config::{SobaConfig, LOG_DIR};
use crate::daemon::DaemonManager;
use crate::logging;

pub struct LogCommand {
    config_path: String,
    lines: usize,
    follow: bool,
}

impl LogCommand {
    pub fn new(config_path: String, lines: usize, follow: bool) -> Self {
        Self {
            config_path,
            lines,
            follow,
        }
    }

    /// Delegate to `tail` on the daemon's log file: the running daemon's
    /// log when a PID is known, otherwise the newest one on disk.
    pub fn execute(&self) -> Result<()> {
        let log_path = self.resolve_log_path()?;
        if !log_path.exists() {
            bail!("no log file found at {}", log_path.display());
        }

        let mut cmd = std::process::Command::new("tail");
        if self.follow {
            cmd.arg("-f");
        }
        cmd.arg("-n").arg(self.lines.to_string());
        cmd.arg(&log_path);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            let err = cmd.exec();
            Err(err).context("failed to exec tail")
        }

        #[cfg(not(unix))]
        {
            let status = cmd.status().context("failed to run tail")?;
            if !status.success() {
                anyhow::bail!("tail exited with {status}");
            }
            Ok(())
        }
    }

    fn resolve_log_path(&self) -> Result<PathBuf> {
        let config = SobaConfig::load(Path::new(&self.config_path))?;
        if let Ok(pid) = DaemonManager::default().read_pid() {
            return Ok(config.log_path_for(pid as u32));
        }
        logging::latest_log(Path::new(LOG_DIR))
            .ok_or_else(|| anyhow::anyhow!("no log files in {LOG_DIR}; is the daemon running?"))
    }
}
