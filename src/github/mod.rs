pub mod client;
pub mod errors;
pub mod issues;
pub mod pulls;
pub mod repo;
pub mod retry;
pub mod types;

use async_trait::async_trait;

use crate::errors::Result;
use types::{Issue, PullRequest};

pub use client::GitHubClient;
pub use repo::RepoSlug;

/// Issue operations the workflow consumes. Implemented by [`GitHubClient`];
/// tests substitute in-memory fakes.
#[async_trait]
pub trait IssueOps: Send + Sync {
    /// Open issues carrying at least one `soba:` label.
    async fn list_open_soba_issues(&self) -> Result<Vec<Issue>>;

    async fn get_issue(&self, number: u64) -> Result<Issue>;

    async fn add_label(&self, number: u64, label: &str) -> Result<()>;

    async fn remove_label(&self, number: u64, label: &str) -> Result<()>;

    async fn close_issue(&self, number: u64) -> Result<()>;
}

/// Pull-request operations the PR watcher consumes.
#[async_trait]
pub trait PullOps: Send + Sync {
    /// Recent pull requests, open and closed, with review state resolved
    /// for the open ones.
    async fn list_pulls(&self) -> Result<Vec<PullRequest>>;

    async fn merge_pull(&self, number: u64, method: &str) -> Result<()>;
}
