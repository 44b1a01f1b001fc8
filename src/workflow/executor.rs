//! Phase executor: one phase attempt for one issue.
//!
//! Prepares the worktree, creates the pane, sends the agent command, and
//! flips the start labels. Labels stay untouched until the side effects
//! succeed, so a failed attempt is retried cleanly on a later tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::SobaConfig;
use crate::errors::{Result, SobaError};
use crate::github::types::Issue;
use crate::github::{IssueOps, RepoSlug};
use crate::slack::SlackNotifier;
use crate::tmux::{window_name, TmuxClient};
use crate::workflow::phase::{self, Phase};
use crate::workspace::WorkspaceManager;

const REMOVE_LABEL_RETRIES: u32 = 3;

pub struct PhaseExecutor {
    config: Arc<SobaConfig>,
    slug: RepoSlug,
    /// Ownership stamp for sessions this daemon creates.
    session_fingerprint: String,
    issues: Arc<dyn IssueOps>,
    tmux: Arc<TmuxClient>,
    workspace: Arc<WorkspaceManager>,
    slack: Arc<SlackNotifier>,
}

impl PhaseExecutor {
    pub fn new(
        config: Arc<SobaConfig>,
        slug: RepoSlug,
        session_fingerprint: String,
        issues: Arc<dyn IssueOps>,
        tmux: Arc<TmuxClient>,
        workspace: Arc<WorkspaceManager>,
        slack: Arc<SlackNotifier>,
    ) -> Self {
        Self {
            config,
            slug,
            session_fingerprint,
            issues,
            tmux,
            workspace,
            slack,
        }
    }

    /// Run one attempt of `phase` for `issue`: pane + worktree + agent
    /// command, then the start label flip.
    pub async fn execute(&self, issue: &Issue, target: Phase) -> Result<()> {
        let phase_cmd = self
            .config
            .phase_command(target)
            .ok_or_else(|| {
                SobaError::internal("phase has no agent command").with_context("phase", target)
            })?
            .clone();

        let session = self.slug.session_name();
        if self.config.workflow.use_tmux && !self.tmux.has_session(&session).await? {
            self.tmux
                .create_session(&session, &self.session_fingerprint)
                .await?;
        }

        let workspace = self.workspace.prepare(issue.number).await?;

        if self.config.workflow.use_tmux {
            let window = window_name(issue.number);
            let pane = if self.tmux.window_exists(&session, &window).await? {
                // Retry attempt: keep the old pane visible next to the new one.
                self.tmux.split_pane(&session, &window).await?
            } else {
                self.tmux.create_window(&session, &window).await?
            };

            self.settle_pane().await;

            self.tmux
                .send_keys(
                    &pane,
                    &format!("cd {}", workspace.worktree_path.display()),
                )
                .await?;

            let command = compose_command(
                &phase_cmd.command,
                &phase_cmd.options,
                &phase_cmd.parameter,
                issue.number,
            );
            self.tmux.send_keys(&pane, &command).await?;
            info!(issue = issue.number, phase = %target, pane = %pane.target(), "agent dispatched");
        } else {
            info!(issue = issue.number, phase = %target, "tmux disabled, skipping agent dispatch");
        }

        self.transition_start_labels(issue, target).await?;

        self.slack.notify(format!(
            "soba: {} started for issue #{} ({})",
            target, issue.number, issue.title
        ));
        Ok(())
    }

    /// Let a fresh pane finish initializing. Keystrokes sent earlier are
    /// silently dropped by tmux, so this wait is part of the contract, not
    /// cosmetics.
    async fn settle_pane(&self) {
        let delay = self.config.workflow.tmux_command_delay;
        if delay > 0 {
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
    }

    /// Add the in-progress label, then remove the start label. Add comes
    /// first: the new label is authoritative, and a failed remove only
    /// leaves a stale companion that the retry loop clears.
    async fn transition_start_labels(&self, issue: &Issue, target: Phase) -> Result<()> {
        let Some((remove, add)) = phase::start_transition(target) else {
            return Ok(());
        };

        if issue.has_label(add) {
            // Re-entry for an issue already in progress: labels stay put.
            return Ok(());
        }

        self.issues.add_label(issue.number, add).await?;

        let mut last_err = None;
        for attempt in 1..=REMOVE_LABEL_RETRIES {
            match self.issues.remove_label(issue.number, remove).await {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(err) => {
                    warn!(
                        issue = issue.number,
                        label = remove,
                        attempt,
                        error = %err,
                        "failed to remove start label"
                    );
                    last_err = Some(err);
                }
            }
        }

        if let Some(err) = last_err {
            // The new label is in place; treat the phase as started.
            warn!(
                issue = issue.number,
                label = remove,
                error = %err,
                "start label left behind, continuing with phase"
            );
        }
        Ok(())
    }
}

/// `command [options...] parameter` with `{{issue-number}}` substituted.
pub fn compose_command(command: &str, options: &[String], parameter: &str, issue: u64) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(options.len() + 2);
    parts.push(command.to_string());
    parts.extend(options.iter().cloned());
    let parameter = parameter.replace("{{issue-number}}", &issue.to_string());
    if !parameter.is_empty() {
        parts.push(parameter);
    }
    parts.retain(|p| !p.is_empty());
    parts.join(" ")
}
