//! Daemon lifecycle: PID file, detached start, stop, liveness.
//!
//! The PID file is a bare ASCII decimal. The parent process re-execs the
//! binary detached and records the child pid; the child puts itself in a
//! new session and points stdout/stderr at its log file, so everything the
//! tracing layer emits lands there.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::config::PID_FILE_PATH;
use crate::errors::{Result, SobaError};

/// Environment marker distinguishing the detached child from the parent
/// invocation of `soba start -d`.
pub const DAEMON_CHILD_ENV: &str = "SOBA_DAEMON_CHILD";

pub const STOP_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DaemonState {
    pub pid: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub log_path: PathBuf,
    pub running: bool,
}

pub struct DaemonManager {
    pid_file: PathBuf,
}

impl Default for DaemonManager {
    fn default() -> Self {
        Self::new(PID_FILE_PATH)
    }
}

impl DaemonManager {
    pub fn new(pid_file: impl AsRef<Path>) -> Self {
        Self {
            pid_file: pid_file.as_ref().to_path_buf(),
        }
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// PID file exists and the recorded process answers a signal-0 probe.
    pub fn is_running(&self) -> bool {
        match self.read_pid() {
            Ok(pid) => pid_alive(pid),
            Err(_) => false,
        }
    }

    pub fn read_pid(&self) -> Result<i32> {
        let raw = std::fs::read_to_string(&self.pid_file)
            .map_err(|_| SobaError::not_found("daemon is not running"))?;
        raw.trim()
            .parse::<i32>()
            .map_err(|_| SobaError::validation("invalid PID in file").with_context("pid", raw.trim()))
    }

    pub fn write_pid(&self, pid: u32) -> Result<()> {
        if let Some(parent) = self.pid_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SobaError::external(e.to_string()).with_context("path", parent.display())
            })?;
        }
        std::fs::write(&self.pid_file, format!("{pid}\n")).map_err(|e| {
            SobaError::external(e.to_string()).with_context("path", self.pid_file.display())
        })
    }

    pub fn remove_pid_file(&self) {
        let _ = std::fs::remove_file(&self.pid_file);
    }

    /// Re-exec the binary detached, record the child pid, and return it.
    /// Fails fast when a live daemon already holds the PID file.
    pub fn spawn_detached(&self, extra_args: &[String]) -> Result<u32> {
        match self.read_pid() {
            Ok(pid) if pid_alive(pid) => {
                return Err(SobaError::conflict("daemon already running")
                    .with_context("pid", pid));
            }
            Ok(_) => self.remove_pid_file(), // stale
            Err(_) => {}
        }

        let exe = std::env::current_exe()
            .map_err(|e| SobaError::internal(format!("cannot locate own binary: {e}")))?;

        let child = std::process::Command::new(exe)
            .arg("start")
            .args(extra_args)
            .env(DAEMON_CHILD_ENV, "1")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| SobaError::external(format!("failed to re-exec daemon: {e}")))?;

        let pid = child.id();
        self.write_pid(pid)?;
        Ok(pid)
    }

    /// SIGTERM, wait up to the grace period, SIGKILL on timeout. The PID
    /// file is removed in every exit path.
    pub async fn stop(&self) -> Result<()> {
        let pid = self.read_pid()?;

        if !pid_alive(pid) {
            self.remove_pid_file();
            return Err(SobaError::not_found("process not found").with_context("pid", pid));
        }

        if let Err(err) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
            self.remove_pid_file();
            return Err(SobaError::external("failed to signal daemon")
                .with_context("pid", pid)
                .with_context("errno", err));
        }

        let deadline = tokio::time::Instant::now() + STOP_GRACE;
        while tokio::time::Instant::now() < deadline {
            if !pid_alive(pid) {
                self.remove_pid_file();
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
        self.remove_pid_file();
        Ok(())
    }

    /// Snapshot for `soba status`. Start time is approximated by the PID
    /// file's mtime, which is written exactly once at daemon start.
    pub fn status(&self, log_path: PathBuf) -> Result<DaemonState> {
        let pid = self.read_pid()?;
        let started_at = std::fs::metadata(&self.pid_file)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Ok(DaemonState {
            pid: pid as u32,
            started_at,
            log_path,
            running: pid_alive(pid),
        })
    }
}

/// Signal-0 probe. EPERM still means the process exists.
pub fn pid_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Child-side detachment: new session, stdout/stderr onto the log file.
pub fn detach_into_log(log_path: &Path) -> Result<()> {
    use std::os::fd::AsRawFd;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SobaError::external(e.to_string()).with_context("path", parent.display())
        })?;
    }
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| {
            SobaError::external(e.to_string()).with_context("path", log_path.display())
        })?;

    // Already a session leader when respawned by some init systems; that
    // failure mode is harmless.
    let _ = nix::unistd::setsid();

    let fd = log.as_raw_fd();
    nix::unistd::dup2(fd, 1)
        .and_then(|_| nix::unistd::dup2(fd, 2))
        .map_err(|e| SobaError::external(format!("failed to redirect output: {e}")))?;
    // `log` may drop; the dup'ed descriptors keep the file open.
    Ok(())
}
