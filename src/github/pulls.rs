//! Pull-request operations against the GitHub REST API.

use std::collections::{BTreeSet, HashMap};

use octocrab::models::pulls::ReviewState;
use octocrab::params::pulls::MergeMethod;
use octocrab::Octocrab;

use super::issues::with_timeout;
use super::types::{PrState, PullRequest};
use crate::errors::{Result, SobaError};

#[derive(Debug, Clone)]
pub struct PullRequestHandler {
    octocrab: Octocrab,
    owner: String,
    repo: String,
}

impl PullRequestHandler {
    pub fn new(octocrab: Octocrab, owner: String, repo: String) -> Self {
        Self {
            octocrab,
            owner,
            repo,
        }
    }

    /// Recent pull requests (open and closed) in update order. Review state
    /// is resolved for open PRs only; merged/closed ones carry their final
    /// state and no review summary.
    pub async fn list_pulls(&self) -> Result<Vec<PullRequest>> {
        let page = with_timeout("list pulls", async {
            self.octocrab
                .pulls(&self.owner, &self.repo)
                .list()
                .state(octocrab::params::State::All)
                .sort(octocrab::params::pulls::Sort::Updated)
                .direction(octocrab::params::Direction::Descending)
                .per_page(100)
                .send()
                .await
        })
        .await?;

        let mut pulls = Vec::with_capacity(page.items.len());
        for pr in page.items {
            let state = pr_state(&pr);
            let (changes_requested, approvals) = if state == PrState::Open {
                self.review_summary(pr.number).await?
            } else {
                (false, 0)
            };

            let labels: BTreeSet<String> = pr
                .labels
                .unwrap_or_default()
                .into_iter()
                .map(|l| l.name)
                .collect();

            pulls.push(PullRequest {
                number: pr.number,
                state,
                head_ref: pr.head.ref_field,
                body: pr.body.unwrap_or_default(),
                labels,
                changes_requested,
                approvals,
                mergeable: pr.mergeable,
            });
        }
        Ok(pulls)
    }

    /// Latest review per reviewer: (any changes requested, approval count).
    async fn review_summary(&self, pr_number: u64) -> Result<(bool, usize)> {
        let reviews = with_timeout("list reviews", async {
            self.octocrab
                .pulls(&self.owner, &self.repo)
                .list_reviews(pr_number)
                .send()
                .await
        })
        .await?;

        let mut latest: HashMap<String, (chrono::DateTime<chrono::Utc>, ReviewState)> =
            HashMap::new();
        for review in reviews.items {
            let (Some(user), Some(state), Some(submitted)) =
                (review.user, review.state, review.submitted_at)
            else {
                continue;
            };
            match latest.entry(user.login) {
                std::collections::hash_map::Entry::Occupied(mut slot) => {
                    if submitted >= slot.get().0 {
                        slot.insert((submitted, state));
                    }
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert((submitted, state));
                }
            }
        }

        let changes_requested = latest
            .values()
            .any(|(_, state)| matches!(state, ReviewState::ChangesRequested));
        let approvals = latest
            .values()
            .filter(|(_, state)| matches!(state, ReviewState::Approved))
            .count();
        Ok((changes_requested, approvals))
    }

    /// Merge with `merge` / `rebase` / anything-else-means-squash, matching
    /// the config surface. A merge the API declines is transient: the PR
    /// watcher retries it next tick.
    pub async fn merge_pull(&self, pr_number: u64, method: &str) -> Result<()> {
        let method = match method {
            "merge" => MergeMethod::Merge,
            "rebase" => MergeMethod::Rebase,
            _ => MergeMethod::Squash,
        };

        let merged = with_timeout("merge pull", async {
            self.octocrab
                .pulls(&self.owner, &self.repo)
                .merge(pr_number)
                .method(method)
                .send()
                .await
        })
        .await?;

        if merged.merged {
            Ok(())
        } else {
            Err(SobaError::transient("merge was not accepted")
                .with_context("pr", pr_number)
                .with_context("sha", merged.sha.unwrap_or_default()))
        }
    }
}

fn pr_state(pr: &octocrab::models::pulls::PullRequest) -> PrState {
    if pr.merged_at.is_some() {
        return PrState::Merged;
    }
    match pr.state {
        Some(octocrab::models::IssueState::Open) => PrState::Open,
        _ => PrState::Closed,
    }
}
