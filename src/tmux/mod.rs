//! Subprocess tmux adapter.
//!
//! One session per repository (`soba-<owner>-<repo>`), one window per issue
//! (`issue-<n>`), one pane per phase attempt (horizontal splits). Sessions
//! created by this daemon are stamped with a session-environment variable so
//! the cleaner never touches a session it does not own.

use std::sync::Arc;
use std::time::Duration;

use crate::errors::{Result, SobaError};
use crate::exec::{run_checked, CommandExecutor, CommandSpec};

pub const TMUX_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Session-environment key naming the daemon that created a session.
pub const SESSION_OWNER_KEY: &str = "SOBA_SESSION_OWNER";

/// A pane address usable as a tmux `-t` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub session_name: String,
    pub window_name: String,
    pub pane_index: String,
}

impl Pane {
    pub fn target(&self) -> String {
        format!(
            "{}:{}.{}",
            self.session_name, self.window_name, self.pane_index
        )
    }
}

pub fn window_name(issue_number: u64) -> String {
    format!("issue-{issue_number}")
}

/// Parse `issue-<n>` back into an issue number.
pub fn issue_for_window(window: &str) -> Option<u64> {
    window.strip_prefix("issue-")?.parse().ok()
}

pub struct TmuxClient {
    executor: Arc<dyn CommandExecutor>,
}

impl TmuxClient {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    fn spec(&self, args: &[&str]) -> CommandSpec {
        CommandSpec::new("tmux", args).timeout(TMUX_COMMAND_TIMEOUT)
    }

    pub async fn has_session(&self, session: &str) -> Result<bool> {
        let output = self
            .executor
            .execute(self.spec(&["has-session", "-t", session]))
            .await?;
        Ok(output.success())
    }

    /// Create a detached session and stamp it with `owner`.
    pub async fn create_session(&self, session: &str, owner: &str) -> Result<()> {
        run_checked(
            self.executor.as_ref(),
            self.spec(&["new-session", "-d", "-s", session]),
        )
        .await?;
        run_checked(
            self.executor.as_ref(),
            self.spec(&[
                "set-environment",
                "-t",
                session,
                SESSION_OWNER_KEY,
                owner,
            ]),
        )
        .await?;
        Ok(())
    }

    /// The owner stamp of a session, if one was recorded.
    pub async fn session_owner(&self, session: &str) -> Result<Option<String>> {
        let output = self
            .executor
            .execute(self.spec(&["show-environment", "-t", session, SESSION_OWNER_KEY]))
            .await?;
        if !output.success() {
            return Ok(None);
        }
        // Output shape: SOBA_SESSION_OWNER=value
        Ok(output
            .stdout
            .trim()
            .split_once('=')
            .map(|(_, value)| value.to_string()))
    }

    pub async fn list_windows(&self, session: &str) -> Result<Vec<String>> {
        let output = self
            .executor
            .execute(self.spec(&["list-windows", "-t", session, "-F", "#{window_name}"]))
            .await?;
        if !output.success() {
            // Session vanished between ticks; nothing to list.
            return Ok(Vec::new());
        }
        Ok(output
            .stdout
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    pub async fn window_exists(&self, session: &str, window: &str) -> Result<bool> {
        Ok(self
            .list_windows(session)
            .await?
            .iter()
            .any(|w| w == window))
    }

    /// Create a detached window; the new window starts with pane index 0.
    pub async fn create_window(&self, session: &str, window: &str) -> Result<Pane> {
        run_checked(
            self.executor.as_ref(),
            self.spec(&["new-window", "-d", "-t", session, "-n", window]),
        )
        .await?;
        Ok(Pane {
            session_name: session.to_string(),
            window_name: window.to_string(),
            pane_index: "0".to_string(),
        })
    }

    /// Split the window horizontally and return the new pane.
    pub async fn split_pane(&self, session: &str, window: &str) -> Result<Pane> {
        let target = format!("{session}:{window}");
        let output = run_checked(
            self.executor.as_ref(),
            self.spec(&[
                "split-window",
                "-h",
                "-d",
                "-t",
                &target,
                "-P",
                "-F",
                "#{pane_index}",
            ]),
        )
        .await?;
        let index = output.stdout.trim().to_string();
        if index.is_empty() {
            return Err(SobaError::external("tmux did not report a pane index")
                .with_context("window", target));
        }
        Ok(Pane {
            session_name: session.to_string(),
            window_name: window.to_string(),
            pane_index: index,
        })
    }

    /// Send `text` literally, then Enter. tmux interprets keystrokes sent
    /// in the same call, so the literal flag and the Enter key are two
    /// separate invocations.
    pub async fn send_keys(&self, pane: &Pane, text: &str) -> Result<()> {
        let target = pane.target();
        run_checked(
            self.executor.as_ref(),
            self.spec(&["send-keys", "-t", &target, "-l", text]),
        )
        .await?;
        run_checked(
            self.executor.as_ref(),
            self.spec(&["send-keys", "-t", &target, "Enter"]),
        )
        .await?;
        Ok(())
    }

    pub async fn kill_window(&self, session: &str, window: &str) -> Result<()> {
        let target = format!("{session}:{window}");
        let output = self
            .executor
            .execute(self.spec(&["kill-window", "-t", &target]))
            .await?;
        // An already-gone window is a success for reclamation purposes.
        if !output.success() && !output.stderr.contains("can't find") {
            return Err(SobaError::external("kill-window failed")
                .with_context("window", target)
                .with_context("stderr", output.stderr.trim()));
        }
        Ok(())
    }

    /// Command the user runs to attach; `soba open` execs this.
    pub fn attach_args(session: &str) -> Vec<String> {
        vec![
            "attach-session".to_string(),
            "-t".to_string(),
            session.to_string(),
        ]
    }
}
