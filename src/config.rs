//! Configuration for the soba daemon.
//!
//! Loaded from `.soba/config.yml` with `SOBA__*` environment overrides on
//! top. `${VAR}` references in string values are expanded at load time from
//! the process environment; `${PID}` is left untouched so the daemon can
//! substitute its own pid when it opens the log file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::github::repo::RepoSlug;

pub const CONFIG_PATH: &str = ".soba/config.yml";
pub const PID_FILE_PATH: &str = ".soba/soba.pid";
pub const LOG_DIR: &str = ".soba/logs";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SobaConfig {
    pub github: GitHubConfig,
    pub workflow: WorkflowConfig,
    pub slack: SlackConfig,
    pub git: GitConfig,
    pub phase: PhaseConfigs,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// `owner/repo`, or any GitHub URL form accepted by [`RepoSlug`].
    pub repository: String,
    pub token: String,
    /// `gh` delegates to the GitHub CLI, `env` requires a token, `auto`
    /// prefers the token and falls back to `gh`.
    pub auth_method: AuthMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Gh,
    Env,
    Auto,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Seconds between issue-watcher (and PR-watcher) ticks.
    pub interval: u64,
    pub use_tmux: bool,
    pub auto_merge_enabled: bool,
    /// `squash` (default), `merge`, or `rebase`.
    pub merge_method: String,
    pub closed_issue_cleanup_enabled: bool,
    pub closed_issue_cleanup_interval: u64,
    /// Seconds to let a fresh pane settle before the first keystroke.
    /// tmux drops keystrokes sent to panes that are still initializing.
    pub tmux_command_delay: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SlackConfig {
    pub webhook_url: String,
    pub notifications_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    pub worktree_base_path: String,
    pub base_branch: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PhaseConfigs {
    pub plan: PhaseCommand,
    pub implement: PhaseCommand,
    pub review: PhaseCommand,
    pub revise: PhaseCommand,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PhaseCommand {
    pub command: String,
    pub options: Vec<String>,
    /// `{{issue-number}}` is replaced at dispatch.
    pub parameter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Empty means `.soba/logs/soba-${PID}.log`.
    pub output_path: String,
    pub retention_count: usize,
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            token: String::new(),
            auth_method: AuthMethod::Auto,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            interval: 20,
            use_tmux: true,
            auto_merge_enabled: true,
            merge_method: "squash".to_string(),
            closed_issue_cleanup_enabled: true,
            closed_issue_cleanup_interval: 300,
            tmux_command_delay: 3,
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            worktree_base_path: ".git/soba/worktrees".to_string(),
            base_branch: "main".to_string(),
        }
    }
}

impl Default for PhaseConfigs {
    fn default() -> Self {
        Self {
            plan: PhaseCommand::claude("/soba:plan {{issue-number}}"),
            implement: PhaseCommand::claude("/soba:implement {{issue-number}}"),
            review: PhaseCommand::claude("/soba:review {{issue-number}}"),
            revise: PhaseCommand::claude("/soba:revise {{issue-number}}"),
        }
    }
}

impl PhaseCommand {
    fn claude(parameter: &str) -> Self {
        Self {
            command: "claude".to_string(),
            options: vec!["--dangerously-skip-permissions".to_string()],
            parameter: parameter.to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output_path: String::new(),
            retention_count: 10,
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl SobaConfig {
    /// Load from `path` (YAML), then apply `SOBA__`-prefixed environment
    /// overrides (`SOBA__WORKFLOW__INTERVAL=5`), then expand `${VAR}`
    /// references.
    pub fn load(path: &Path) -> Result<Self> {
        if Path::new(".env").exists() {
            let _ = dotenvy::dotenv();
        }

        let mut builder = Config::builder();
        if path.exists() {
            builder =
                builder.add_source(File::from(path).format(FileFormat::Yaml).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix("SOBA")
                .separator("__")
                .try_parsing(true),
        );

        let raw = builder
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        let mut cfg: SobaConfig = raw
            .try_deserialize()
            .context("configuration has an invalid shape")?;

        // Token fallback: explicit config value, then SOBA_GITHUB_TOKEN,
        // then GITHUB_TOKEN.
        if cfg.github.token.is_empty() {
            if let Ok(token) = std::env::var("SOBA_GITHUB_TOKEN") {
                cfg.github.token = token;
            } else if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                cfg.github.token = token;
            }
        }

        cfg.expand_env();
        Ok(cfg)
    }

    /// The repository this daemon operates on.
    pub fn repo_slug(&self) -> crate::errors::Result<RepoSlug> {
        RepoSlug::parse(&self.github.repository)
    }

    pub fn phase_command(&self, phase: crate::workflow::phase::Phase) -> Option<&PhaseCommand> {
        use crate::workflow::phase::Phase;
        match phase {
            Phase::Plan => Some(&self.phase.plan),
            Phase::Implement => Some(&self.phase.implement),
            Phase::Review => Some(&self.phase.review),
            Phase::Revise => Some(&self.phase.revise),
            Phase::Queue | Phase::Merge => None,
        }
    }

    /// Resolved log path for a given daemon pid.
    pub fn log_path_for(&self, pid: u32) -> PathBuf {
        if self.log.output_path.is_empty() {
            PathBuf::from(LOG_DIR).join(format!("soba-{pid}.log"))
        } else {
            PathBuf::from(self.log.output_path.replace("${PID}", &pid.to_string()))
        }
    }

    fn expand_env(&mut self) {
        for field in [
            &mut self.github.repository,
            &mut self.github.token,
            &mut self.slack.webhook_url,
            &mut self.git.worktree_base_path,
            &mut self.git.base_branch,
            &mut self.log.output_path,
            &mut self.log.level,
        ] {
            *field = expand_env_refs(field);
        }
        for phase in [
            &mut self.phase.plan,
            &mut self.phase.implement,
            &mut self.phase.review,
            &mut self.phase.revise,
        ] {
            phase.command = expand_env_refs(&phase.command);
            phase.parameter = expand_env_refs(&phase.parameter);
            for opt in &mut phase.options {
                *opt = expand_env_refs(opt);
            }
        }
    }
}

/// Expand `${VAR}` from the environment. Unset variables expand to the
/// empty string; `${PID}` survives untouched for the daemon to fill in.
pub fn expand_env_refs(input: &str) -> String {
    static VAR_RE: OnceLock<Regex> = OnceLock::new();
    let re = VAR_RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        if name == "PID" {
            caps[0].to_string()
        } else {
            std::env::var(name).unwrap_or_default()
        }
    })
    .into_owned()
}

/// Template written by `soba init`.
pub const CONFIG_TEMPLATE: &str = r#"github:
  repository: owner/repo
  token: ${SOBA_GITHUB_TOKEN}
  auth_method: auto

workflow:
  interval: 20
  use_tmux: true
  auto_merge_enabled: true
  merge_method: squash
  closed_issue_cleanup_enabled: true
  closed_issue_cleanup_interval: 300
  tmux_command_delay: 3

slack:
  webhook_url: ""
  notifications_enabled: false

git:
  worktree_base_path: .git/soba/worktrees
  base_branch: main

phase:
  plan:
    command: claude
    options:
      - --dangerously-skip-permissions
    parameter: "/soba:plan {{issue-number}}"
  implement:
    command: claude
    options:
      - --dangerously-skip-permissions
    parameter: "/soba:implement {{issue-number}}"
  review:
    command: claude
    options:
      - --dangerously-skip-permissions
    parameter: "/soba:review {{issue-number}}"
  revise:
    command: claude
    options:
      - --dangerously-skip-permissions
    parameter: "/soba:revise {{issue-number}}"

log:
  output_path: ""
  retention_count: 10
  level: info
  format: text
"#;
