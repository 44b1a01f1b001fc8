//! Per-issue git worktree management.
//!
//! Each issue gets a branch `soba/<n>` checked out in
//! `<git.worktree_base_path>/issue-<n>`. All git access is a subprocess;
//! the worktree CLI surface is stable and operators can replay every
//! command by hand.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::GitConfig;
use crate::errors::Result;
use crate::exec::{run_checked, CommandExecutor, CommandSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub issue_number: u64,
    pub worktree_path: PathBuf,
    pub branch_name: String,
}

pub fn branch_name(issue_number: u64) -> String {
    format!("soba/{issue_number}")
}

pub struct WorkspaceManager {
    executor: Arc<dyn CommandExecutor>,
    base_path: PathBuf,
    base_branch: String,
}

impl WorkspaceManager {
    pub fn new(executor: Arc<dyn CommandExecutor>, config: &GitConfig) -> Self {
        Self {
            executor,
            base_path: PathBuf::from(&config.worktree_base_path),
            base_branch: config.base_branch.clone(),
        }
    }

    pub fn worktree_path(&self, issue_number: u64) -> PathBuf {
        self.base_path.join(format!("issue-{issue_number}"))
    }

    fn workspace(&self, issue_number: u64) -> Workspace {
        Workspace {
            issue_number,
            worktree_path: self.worktree_path(issue_number),
            branch_name: branch_name(issue_number),
        }
    }

    /// Create the worktree for an issue, or return the existing one
    /// unchanged. Safe to call every tick.
    pub async fn prepare(&self, issue_number: u64) -> Result<Workspace> {
        let workspace = self.workspace(issue_number);

        if workspace.worktree_path.exists() {
            debug!(issue = issue_number, path = %workspace.worktree_path.display(), "worktree already present");
            return Ok(workspace);
        }

        // Refresh the base branch so new worktrees start from current
        // upstream state. Best-effort: repositories without the remote
        // (tests, mirrors) still get a worktree from the local base.
        let fetch = self
            .executor
            .execute(CommandSpec::new(
                "git",
                &[
                    "fetch",
                    "origin",
                    &format!("{}:{}", self.base_branch, self.base_branch),
                ],
            ))
            .await;
        match fetch {
            Ok(output) if !output.success() => {
                warn!(stderr = %output.stderr.trim(), "base branch fetch failed, continuing");
            }
            Err(err) => warn!(error = %err, "base branch fetch failed, continuing"),
            Ok(_) => {}
        }

        if let Some(parent) = workspace.worktree_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                crate::errors::SobaError::external(e.to_string())
                    .with_context("path", parent.display())
            })?;
        }

        let path = workspace.worktree_path.to_string_lossy().to_string();
        let add = self
            .executor
            .execute(CommandSpec::new(
                "git",
                &[
                    "worktree",
                    "add",
                    "-b",
                    &workspace.branch_name,
                    &path,
                    &self.base_branch,
                ],
            ))
            .await?;

        if !add.success() {
            // Branch survives from an earlier attempt: attach to it instead.
            debug!(issue = issue_number, stderr = %add.stderr.trim(), "branch exists, attaching worktree");
            run_checked(
                self.executor.as_ref(),
                CommandSpec::new("git", &["worktree", "add", &path, &workspace.branch_name]),
            )
            .await?;
        }

        Ok(workspace)
    }

    /// Remove the worktree for an issue. Already-gone worktrees are fine.
    pub async fn cleanup(&self, issue_number: u64) -> Result<()> {
        let path = self.worktree_path(issue_number);
        let path_str = path.to_string_lossy().to_string();

        let output = self
            .executor
            .execute(CommandSpec::new(
                "git",
                &["worktree", "remove", &path_str, "--force"],
            ))
            .await?;

        if !output.success() {
            let stderr = output.stderr.to_lowercase();
            if stderr.contains("not a working tree")
                || stderr.contains("no such file")
                || stderr.contains("is not a working tree")
            {
                debug!(issue = issue_number, "worktree already removed");
                return Ok(());
            }
            return Err(crate::errors::SobaError::external("worktree remove failed")
                .with_context("path", path_str)
                .with_context("stderr", output.stderr.trim()));
        }
        Ok(())
    }
}
