//! The PR loop: drive review, revise, and merge transitions from pull
//! request state.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::phase::{self, labels, Phase};
use super::{flip_labels, Services};
use crate::errors::Result;
use crate::github::types::{Issue, PrState, PullRequest};

pub struct PrWatcher {
    services: Services,
    shutdown: watch::Receiver<bool>,
}

impl PrWatcher {
    pub fn new(services: Services, shutdown: watch::Receiver<bool>) -> Self {
        Self { services, shutdown }
    }

    pub async fn run(mut self) {
        let period = Duration::from_secs(self.services.config.workflow.interval);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(period_secs = period.as_secs(), "PR watcher started");
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = interval.tick() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "PR watcher tick failed");
                    }
                }
            }
        }
        info!("PR watcher stopped");
    }

    pub async fn tick(&mut self) -> Result<()> {
        let pulls = self.services.pulls.list_pulls().await?;
        let issues: HashMap<u64, Issue> = self
            .services
            .issues
            .list_open_soba_issues()
            .await?
            .into_iter()
            .map(|issue| (issue.number, issue))
            .collect();

        for pr in &pulls {
            if *self.shutdown.borrow() {
                break;
            }
            let Some(issue_number) = pr.linked_issue() else {
                // PRs outside the workflow are none of our business.
                continue;
            };
            let Some(issue) = issues.get(&issue_number) else {
                debug!(pr = pr.number, issue = issue_number, "linked issue is not tracked");
                continue;
            };

            if let Err(err) = self.advance(pr, issue).await {
                error!(pr = pr.number, issue = issue_number, error = %err, "PR transition failed");
            }
        }
        Ok(())
    }

    async fn advance(&self, pr: &PullRequest, issue: &Issue) -> Result<()> {
        match pr.state {
            PrState::Merged => self.on_merged(pr, issue).await,
            PrState::Open => self.on_open(pr, issue).await,
            // A closed-unmerged PR leaves the issue where it is; the agent
            // or the operator decides what happens next.
            PrState::Closed => Ok(()),
        }
    }

    /// Externally merged PR: the issue is finished regardless of which
    /// label it was sitting on.
    async fn on_merged(&self, pr: &PullRequest, issue: &Issue) -> Result<()> {
        let current = issue.soba_labels().first().map(|l| l.to_string());
        let Some(current) = current else {
            return Ok(());
        };
        if current == labels::MERGED {
            return Ok(());
        }

        info!(pr = pr.number, issue = issue.number, "PR merged, finishing issue");
        flip_labels(
            self.services.issues.as_ref(),
            issue.number,
            &current,
            labels::MERGED,
        )
        .await?;
        self.services.issues.close_issue(issue.number).await?;
        self.services.slack.notify(format!(
            "soba: issue #{} merged via PR #{}",
            issue.number, pr.number
        ));
        Ok(())
    }

    async fn on_open(&self, pr: &PullRequest, issue: &Issue) -> Result<()> {
        // The PR itself is the implement-phase completion signal: its
        // appearance moves the issue into review.
        if issue.has_label(labels::DOING) {
            phase::validate_transition(Phase::Implement, Phase::Review)?;
            if let Some((remove, add)) = phase::success_transition(Phase::Implement) {
                info!(pr = pr.number, issue = issue.number, "PR opened, implement complete");
                flip_labels(self.services.issues.as_ref(), issue.number, remove, add).await?;
            }
            return Ok(());
        }

        let in_review =
            issue.has_label(labels::REVIEW_REQUESTED) || issue.has_label(labels::REVIEWING);

        if !pr.has_label(labels::LGTM) {
            // A reviewer's standing verdict asks for changes: hand the
            // issue to the revise phase. Approval (lgtm) supersedes.
            if pr.changes_requested && in_review {
                phase::validate_transition(Phase::Review, Phase::Revise)?;
                let current = if issue.has_label(labels::REVIEWING) {
                    labels::REVIEWING
                } else {
                    labels::REVIEW_REQUESTED
                };
                info!(pr = pr.number, issue = issue.number, "changes requested, scheduling revise");
                flip_labels(
                    self.services.issues.as_ref(),
                    issue.number,
                    current,
                    labels::REQUIRES_CHANGES,
                )
                .await?;
                self.services.slack.notify(format!(
                    "soba: changes requested on issue #{} (PR #{})",
                    issue.number, pr.number
                ));
            }
            return Ok(());
        }

        // Approved: reviewing -> done, then merge if configured.
        if issue.has_label(labels::REVIEWING) {
            phase::validate_transition(Phase::Review, Phase::Merge)?;
            if let Some((remove, add)) = phase::success_transition(Phase::Review) {
                info!(pr = pr.number, issue = issue.number, "PR approved, review complete");
                flip_labels(self.services.issues.as_ref(), issue.number, remove, add).await?;
            }
        } else if !issue.has_label(labels::DONE) {
            return Ok(());
        }

        if !self.services.config.workflow.auto_merge_enabled {
            return Ok(());
        }

        let method = self.services.config.workflow.merge_method.clone();
        match self.services.pulls.merge_pull(pr.number, &method).await {
            Ok(()) => {
                info!(pr = pr.number, issue = issue.number, "auto-merged");
                if let Some((remove, add)) = phase::success_transition(Phase::Merge) {
                    flip_labels(self.services.issues.as_ref(), issue.number, remove, add).await?;
                }
                self.services.issues.close_issue(issue.number).await?;
                self.services.slack.notify(format!(
                    "soba: auto-merged PR #{} for issue #{}",
                    pr.number, issue.number
                ));
            }
            Err(err) => {
                // Issue stays in done; the next tick tries again.
                warn!(pr = pr.number, issue = issue.number, error = %err, "auto-merge failed");
            }
        }
        Ok(())
    }
}
