//! Shared test doubles: an in-memory GitHub and a service bundle wired to
//! mock subprocess executors.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use soba::config::SobaConfig;
use soba::errors::{Result, SobaError};
use soba::exec::mock::MockCommandExecutor;
use soba::github::types::{Issue, IssueState, PrState, PullRequest};
use soba::github::{IssueOps, PullOps, RepoSlug};
use soba::slack::SlackNotifier;
use soba::tmux::TmuxClient;
use soba::workflow::{PhaseExecutor, Services};
use soba::workspace::WorkspaceManager;

#[derive(Default)]
pub struct FakeGitHub {
    pub issues: Mutex<HashMap<u64, Issue>>,
    pub pulls: Mutex<Vec<PullRequest>>,
    /// PR numbers whose merge attempts fail.
    pub merge_failures: Mutex<HashSet<u64>>,
    /// Ordered record of every mutation, e.g. `add:3:soba:queued`.
    pub log: Mutex<Vec<String>>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_issue(&self, number: u64, labels: &[&str]) {
        self.seed_issue_state(number, labels, IssueState::Open);
    }

    pub fn seed_issue_state(&self, number: u64, labels: &[&str], state: IssueState) {
        let issue = Issue {
            number,
            title: format!("issue {number}"),
            state,
            labels: labels.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        };
        self.issues.lock().unwrap().insert(number, issue);
    }

    pub fn seed_pull(&self, pr: PullRequest) {
        self.pulls.lock().unwrap().push(pr);
    }

    /// Synchronous snapshot of one issue for direct executor calls.
    pub fn issue_snapshot(&self, number: u64) -> Issue {
        self.issues
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .expect("issue seeded")
    }

    pub fn labels_of(&self, number: u64) -> Vec<String> {
        self.issues
            .lock()
            .unwrap()
            .get(&number)
            .map(|i| i.labels.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_closed(&self, number: u64) -> bool {
        self.issues
            .lock()
            .unwrap()
            .get(&number)
            .map(|i| i.state == IssueState::Closed)
            .unwrap_or(false)
    }

    pub fn mutation_log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueOps for FakeGitHub {
    async fn list_open_soba_issues(&self) -> Result<Vec<Issue>> {
        let mut issues: Vec<Issue> = self
            .issues
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.state == IssueState::Open && !i.soba_labels().is_empty())
            .cloned()
            .collect();
        issues.sort_by_key(|i| i.number);
        Ok(issues)
    }

    async fn get_issue(&self, number: u64) -> Result<Issue> {
        self.issues
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| SobaError::not_found("no such issue").with_context("issue", number))
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<()> {
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .get_mut(&number)
            .ok_or_else(|| SobaError::not_found("no such issue"))?;
        issue.labels.insert(label.to_string());
        self.log.lock().unwrap().push(format!("add:{number}:{label}"));
        Ok(())
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<()> {
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .get_mut(&number)
            .ok_or_else(|| SobaError::not_found("no such issue"))?;
        issue.labels.remove(label);
        self.log
            .lock()
            .unwrap()
            .push(format!("remove:{number}:{label}"));
        Ok(())
    }

    async fn close_issue(&self, number: u64) -> Result<()> {
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .get_mut(&number)
            .ok_or_else(|| SobaError::not_found("no such issue"))?;
        issue.state = IssueState::Closed;
        self.log.lock().unwrap().push(format!("close:{number}"));
        Ok(())
    }
}

#[async_trait]
impl PullOps for FakeGitHub {
    async fn list_pulls(&self) -> Result<Vec<PullRequest>> {
        Ok(self.pulls.lock().unwrap().clone())
    }

    async fn merge_pull(&self, number: u64, _method: &str) -> Result<()> {
        if self.merge_failures.lock().unwrap().contains(&number) {
            return Err(SobaError::transient("merge was not accepted").with_context("pr", number));
        }
        let mut pulls = self.pulls.lock().unwrap();
        if let Some(pr) = pulls.iter_mut().find(|p| p.number == number) {
            pr.state = PrState::Merged;
        }
        self.log.lock().unwrap().push(format!("merge:{number}"));
        Ok(())
    }
}

pub fn open_pull(number: u64, head_ref: &str) -> PullRequest {
    PullRequest {
        number,
        state: PrState::Open,
        head_ref: head_ref.to_string(),
        body: String::new(),
        labels: BTreeSet::new(),
        changes_requested: false,
        approvals: 0,
        mergeable: Some(true),
    }
}

pub struct TestHarness {
    pub github: Arc<FakeGitHub>,
    pub commands: Arc<MockCommandExecutor>,
    pub services: Services,
    _worktree_dir: tempfile::TempDir,
}

/// Services bundle over the fakes: zero settle delay, worktrees in a
/// tempdir, Slack disabled.
pub fn harness() -> TestHarness {
    harness_with(|_| {})
}

pub fn harness_with(tweak: impl FnOnce(&mut SobaConfig)) -> TestHarness {
    let worktree_dir = tempfile::tempdir().expect("tempdir");

    let mut config = SobaConfig::default();
    config.github.repository = "octo/widgets".to_string();
    config.workflow.tmux_command_delay = 0;
    config.workflow.interval = 1;
    config.git.worktree_base_path = worktree_dir
        .path()
        .join("worktrees")
        .to_string_lossy()
        .into_owned();
    tweak(&mut config);
    let config = Arc::new(config);

    let github = Arc::new(FakeGitHub::new());
    let commands = Arc::new(MockCommandExecutor::permissive());
    // No tmux server until a test says otherwise; the executor must create
    // the session itself.
    commands.stub_fail("tmux has-session -t soba-octo-widgets", "no server running");
    let slug = RepoSlug::new("octo", "widgets");
    let fingerprint = "test-host-1".to_string();

    let tmux = Arc::new(TmuxClient::new(commands.clone()));
    let workspace = Arc::new(WorkspaceManager::new(commands.clone(), &config.git));
    let slack = Arc::new(SlackNotifier::disabled());

    let executor = Arc::new(PhaseExecutor::new(
        config.clone(),
        slug.clone(),
        fingerprint.clone(),
        github.clone(),
        tmux.clone(),
        workspace.clone(),
        slack.clone(),
    ));

    let services = Services {
        config,
        slug,
        session_fingerprint: fingerprint,
        issues: github.clone(),
        pulls: github.clone(),
        tmux,
        workspace,
        slack,
        executor,
    };

    TestHarness {
        github,
        commands,
        services,
        _worktree_dir: worktree_dir,
    }
}
