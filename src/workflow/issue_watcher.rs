//! The scheduling loop: fetch, classify, admit, dispatch.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use super::phase::{self, labels};
use super::{flip_labels, queue, Services};
use crate::errors::Result;

pub struct IssueWatcher {
    services: Services,
    shutdown: watch::Receiver<bool>,
    /// Issues whose classification failure was already logged; cleared when
    /// the issue leaves the broken state.
    logged_failures: HashSet<u64>,
}

impl IssueWatcher {
    pub fn new(services: Services, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            services,
            shutdown,
            logged_failures: HashSet::new(),
        }
    }

    pub async fn run(mut self) {
        let period = Duration::from_secs(self.services.config.workflow.interval);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(period_secs = period.as_secs(), "issue watcher started");
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = interval.tick() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "issue watcher tick failed");
                    }
                }
            }
        }
        info!("issue watcher stopped");
    }

    /// One scheduling pass. Per-issue failures are logged and isolated;
    /// only a failed issue fetch aborts the tick (and is retried next
    /// period).
    pub async fn tick(&mut self) -> Result<()> {
        let issues = self.services.issues.list_open_soba_issues().await?;
        debug!(count = issues.len(), "fetched workflow issues");

        // Classification gate: issues with zero or conflicting labels are
        // skipped for the whole tick, logged once.
        let mut classified = Vec::with_capacity(issues.len());
        let mut broken = HashSet::new();
        for issue in &issues {
            match phase::current_phase(&issue.labels) {
                Ok(_) => {
                    classified.push(issue.clone());
                    self.logged_failures.remove(&issue.number);
                }
                Err(err) => {
                    broken.insert(issue.number);
                    if self.logged_failures.insert(issue.number) {
                        error!(issue = issue.number, error = %err, "cannot classify issue");
                    }
                }
            }
        }
        self.logged_failures.retain(|n| broken.contains(n));

        // Admission: at most one todo becomes queued per tick.
        if let Some(number) = queue::admit_next(&classified) {
            info!(issue = number, "admitting issue to the queue");
            if let Err(err) = flip_labels(
                self.services.issues.as_ref(),
                number,
                labels::TODO,
                labels::QUEUED,
            )
            .await
            {
                error!(issue = number, error = %err, "admission failed, will retry next tick");
            } else {
                self.services
                    .slack
                    .notify(format!("soba: issue #{number} queued"));
            }
        }

        // Dispatch: issues sitting on a start label get their phase kicked
        // off. Labels were snapshotted before admission, so a just-queued
        // issue starts its plan on the next tick.
        for issue in &classified {
            if *self.shutdown.borrow() {
                break;
            }
            let Some(target) = issue
                .labels
                .iter()
                .find_map(|l| phase::dispatchable_phase(l))
            else {
                continue;
            };

            if let Err(err) = self.services.executor.execute(issue, target).await {
                error!(issue = issue.number, phase = %target, error = %err, "phase dispatch failed");
            }
        }

        Ok(())
    }
}
