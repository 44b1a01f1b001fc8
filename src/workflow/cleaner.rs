//! Reclamation loop for closed issues: kill their windows and remove their
//! worktrees.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::Services;
use crate::errors::Result;
use crate::github::types::IssueState;
use crate::tmux::issue_for_window;

pub struct ClosedIssueCleaner {
    services: Services,
    shutdown: watch::Receiver<bool>,
}

impl ClosedIssueCleaner {
    pub fn new(services: Services, shutdown: watch::Receiver<bool>) -> Self {
        Self { services, shutdown }
    }

    pub async fn run(mut self) {
        let period =
            Duration::from_secs(self.services.config.workflow.closed_issue_cleanup_interval);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(period_secs = period.as_secs(), "closed-issue cleaner started");
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = interval.tick() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "cleaner tick failed");
                    }
                }
            }
        }
        info!("closed-issue cleaner stopped");
    }

    pub async fn tick(&mut self) -> Result<()> {
        let session = self.services.slug.session_name();

        if !self.services.tmux.has_session(&session).await? {
            return Ok(());
        }

        // Never reclaim inside a session another daemon (or the developer)
        // owns: the fingerprint stamped at creation must match ours.
        let owner = self.services.tmux.session_owner(&session).await?;
        if owner.as_deref() != Some(self.services.session_fingerprint.as_str()) {
            warn!(
                session = %session,
                owner = owner.as_deref().unwrap_or("<unset>"),
                "session not owned by this daemon, skipping cleanup"
            );
            return Ok(());
        }

        for window in self.services.tmux.list_windows(&session).await? {
            if *self.shutdown.borrow() {
                break;
            }
            let Some(issue_number) = issue_for_window(&window) else {
                continue;
            };

            let closed = match self.services.issues.get_issue(issue_number).await {
                Ok(issue) => issue.state == IssueState::Closed,
                Err(err) if err.is_not_found() => true,
                Err(err) => {
                    debug!(issue = issue_number, error = %err, "issue lookup failed, skipping");
                    continue;
                }
            };
            if !closed {
                continue;
            }

            info!(issue = issue_number, window = %window, "reclaiming closed issue");
            if let Err(err) = self.services.tmux.kill_window(&session, &window).await {
                error!(issue = issue_number, error = %err, "failed to kill window");
                continue;
            }
            if let Err(err) = self.services.workspace.cleanup(issue_number).await {
                error!(issue = issue_number, error = %err, "failed to remove worktree");
            }
        }
        Ok(())
    }
}
