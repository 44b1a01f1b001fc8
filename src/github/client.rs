//! GitHub client construction and trait wiring.

use async_trait::async_trait;
use octocrab::Octocrab;

use super::issues::IssueHandler;
use super::pulls::PullRequestHandler;
use super::repo::RepoSlug;
use super::retry::RetryHandler;
use super::types::{Issue, PullRequest};
use super::{IssueOps, PullOps};
use crate::config::{AuthMethod, GitHubConfig};
use crate::errors::{Result, SobaError};
use crate::exec::{CommandExecutor, CommandSpec};

pub struct GitHubClient {
    issues: IssueHandler,
    pulls: PullRequestHandler,
    retry: RetryHandler,
    slug: RepoSlug,
}

impl GitHubClient {
    /// Build an authenticated client. Token resolution follows
    /// `github.auth_method`: `env` requires a configured token, `gh` asks
    /// the GitHub CLI, `auto` prefers the token and falls back to `gh`.
    pub async fn connect(
        config: &GitHubConfig,
        slug: RepoSlug,
        executor: &dyn CommandExecutor,
    ) -> Result<Self> {
        let token = resolve_token(config, executor).await?;
        let octocrab = Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| SobaError::internal(e.to_string()).with_context("operation", "build client"))?;

        Ok(Self {
            issues: IssueHandler::new(octocrab.clone(), slug.owner.clone(), slug.repo.clone()),
            pulls: PullRequestHandler::new(octocrab, slug.owner.clone(), slug.repo.clone()),
            retry: RetryHandler::default(),
            slug,
        })
    }

    pub fn slug(&self) -> &RepoSlug {
        &self.slug
    }
}

async fn resolve_token(config: &GitHubConfig, executor: &dyn CommandExecutor) -> Result<String> {
    match config.auth_method {
        AuthMethod::Env => {
            if config.token.is_empty() {
                Err(SobaError::validation(
                    "github.auth_method is 'env' but no token is configured",
                ))
            } else {
                Ok(config.token.clone())
            }
        }
        AuthMethod::Gh => gh_token(executor).await,
        AuthMethod::Auto => {
            if config.token.is_empty() {
                gh_token(executor).await
            } else {
                Ok(config.token.clone())
            }
        }
    }
}

async fn gh_token(executor: &dyn CommandExecutor) -> Result<String> {
    let output = executor
        .execute(CommandSpec::new("gh", &["auth", "token"]))
        .await?;
    let token = output.stdout.trim().to_string();
    if !output.success() || token.is_empty() {
        return Err(SobaError::permission("gh CLI has no stored token")
            .with_context("stderr", output.stderr.trim()));
    }
    Ok(token)
}

#[async_trait]
impl IssueOps for GitHubClient {
    async fn list_open_soba_issues(&self) -> Result<Vec<Issue>> {
        self.retry
            .run(|| self.issues.list_open_soba_issues())
            .await
    }

    async fn get_issue(&self, number: u64) -> Result<Issue> {
        self.retry.run(|| self.issues.get_issue(number)).await
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<()> {
        self.retry.run(|| self.issues.add_label(number, label)).await
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<()> {
        self.retry
            .run(|| self.issues.remove_label(number, label))
            .await
    }

    async fn close_issue(&self, number: u64) -> Result<()> {
        self.retry.run(|| self.issues.close_issue(number)).await
    }
}

#[async_trait]
impl PullOps for GitHubClient {
    async fn list_pulls(&self) -> Result<Vec<PullRequest>> {
        self.retry.run(|| self.pulls.list_pulls()).await
    }

    async fn merge_pull(&self, number: u64, method: &str) -> Result<()> {
        // No retry wrapper here: the PR watcher owns the retry cadence for
        // merges (one attempt per tick).
        self.pulls.merge_pull(number, method).await
    }
}
