//! Issue operations against the GitHub REST API.

use std::collections::BTreeSet;
use std::time::Duration;

use octocrab::Octocrab;

use super::errors::map_octocrab;
use super::types::{Issue, IssueState};
use crate::errors::{Result, SobaError};

pub const GITHUB_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct IssueHandler {
    octocrab: Octocrab,
    owner: String,
    repo: String,
}

impl IssueHandler {
    pub fn new(octocrab: Octocrab, owner: String, repo: String) -> Self {
        Self {
            octocrab,
            owner,
            repo,
        }
    }

    /// Open issues carrying at least one `soba:` label.
    ///
    /// The REST label filter is AND-semantics, so the open set is fetched
    /// and filtered by prefix here. The issues endpoint also returns pull
    /// requests; those are dropped.
    pub async fn list_open_soba_issues(&self) -> Result<Vec<Issue>> {
        let page = with_timeout("list issues", async {
            self.octocrab
                .issues(&self.owner, &self.repo)
                .list()
                .state(octocrab::params::State::Open)
                .per_page(100)
                .send()
                .await
        })
        .await?;

        Ok(page
            .items
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .map(convert_issue)
            .filter(|issue| !issue.soba_labels().is_empty())
            .collect())
    }

    pub async fn get_issue(&self, number: u64) -> Result<Issue> {
        let issue = with_timeout("get issue", async {
            self.octocrab.issues(&self.owner, &self.repo).get(number).await
        })
        .await?;
        Ok(convert_issue(issue))
    }

    pub async fn add_label(&self, number: u64, label: &str) -> Result<()> {
        with_timeout("add label", async {
            self.octocrab
                .issues(&self.owner, &self.repo)
                .add_labels(number, &[label.to_string()])
                .await
        })
        .await?;
        Ok(())
    }

    pub async fn remove_label(&self, number: u64, label: &str) -> Result<()> {
        let result = with_timeout("remove label", async {
            self.octocrab
                .issues(&self.owner, &self.repo)
                .remove_label(number, label)
                .await
        })
        .await;

        // Removing a label that is already gone keeps the transition
        // idempotent.
        match result {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub async fn close_issue(&self, number: u64) -> Result<()> {
        with_timeout("close issue", async {
            self.octocrab
                .issues(&self.owner, &self.repo)
                .update(number)
                .state(octocrab::models::IssueState::Closed)
                .send()
                .await
        })
        .await?;
        Ok(())
    }
}

fn convert_issue(issue: octocrab::models::issues::Issue) -> Issue {
    let labels: BTreeSet<String> = issue.labels.into_iter().map(|l| l.name).collect();
    Issue {
        number: issue.number,
        title: issue.title,
        state: match issue.state {
            octocrab::models::IssueState::Closed => IssueState::Closed,
            _ => IssueState::Open,
        },
        labels,
    }
}

/// Run a GitHub call under the 30 s budget and map its failure modes.
pub(super) async fn with_timeout<T>(
    operation: &str,
    fut: impl std::future::Future<Output = std::result::Result<T, octocrab::Error>>,
) -> Result<T> {
    match tokio::time::timeout(GITHUB_CALL_TIMEOUT, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(map_octocrab(err, operation)),
        Err(_) => Err(SobaError::transient("GitHub call timed out")
            .with_context("operation", operation)
            .with_context("timeout_secs", GITHUB_CALL_TIMEOUT.as_secs())),
    }
}
