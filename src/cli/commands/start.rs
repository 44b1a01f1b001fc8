use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{SobaConfig, LOG_DIR};
use crate::daemon::{detach_into_log, DaemonManager, DAEMON_CHILD_ENV};
use crate::exec::ProcessCommandExecutor;
use crate::github::GitHubClient;
use crate::logging;
use crate::slack::SlackNotifier;
use crate::tmux::TmuxClient;
use crate::workflow::{PhaseExecutor, Services, Supervisor};
use crate::workspace::WorkspaceManager;

pub struct StartCommand {
    config_path: String,
    daemon: bool,
    level_override: Option<String>,
}

impl StartCommand {
    pub fn new(config_path: String, daemon: bool, level_override: Option<String>) -> Self {
        Self {
            config_path,
            daemon,
            level_override,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Arc::new(SobaConfig::load(Path::new(&self.config_path))?);
        let is_daemon_child = std::env::var(DAEMON_CHILD_ENV).is_ok();

        if self.daemon && !is_daemon_child {
            return self.launch_daemon();
        }

        if is_daemon_child {
            let log_path = config.log_path_for(std::process::id());
            detach_into_log(&log_path)?;
        }

        logging::init(&config.log, self.level_override.as_deref())?;
        logging::prune_logs(Path::new(LOG_DIR), config.log.retention_count);

        let services = build_services(config).await?;
        tracing::info!(
            repository = %services.slug,
            interval = services.config.workflow.interval,
            "starting issue monitoring"
        );

        Supervisor::new(services).run().await?;
        println!("Issue monitoring stopped");
        Ok(())
    }

    /// Parent half of `start -d`: re-exec detached and return to the shell.
    fn launch_daemon(&self) -> Result<()> {
        let manager = DaemonManager::default();

        let mut extra_args = vec!["-c".to_string(), self.config_path.clone()];
        if let Some(level) = &self.level_override {
            extra_args.push("--log-level".to_string());
            extra_args.push(level.clone());
        }

        let pid = manager.spawn_detached(&extra_args)?;
        println!("Daemon started (PID: {pid})");
        println!("PID file: {}", manager.pid_file().display());
        println!("Logs: {LOG_DIR}/soba-{pid}.log");
        Ok(())
    }
}

/// Wire the immutable service record every component receives.
pub async fn build_services(config: Arc<SobaConfig>) -> Result<Services> {
    let slug = config.repo_slug()?;
    let executor = Arc::new(ProcessCommandExecutor);

    let github = Arc::new(
        GitHubClient::connect(&config.github, slug.clone(), executor.as_ref())
            .await
            .context("failed to authenticate with GitHub")?,
    );

    let tmux = Arc::new(TmuxClient::new(executor.clone()));
    let workspace = Arc::new(WorkspaceManager::new(executor, &config.git));
    let slack = Arc::new(SlackNotifier::new(&config.slack));
    let session_fingerprint = session_fingerprint();

    let phase_executor = Arc::new(PhaseExecutor::new(
        config.clone(),
        slug.clone(),
        session_fingerprint.clone(),
        github.clone(),
        tmux.clone(),
        workspace.clone(),
        slack.clone(),
    ));

    Ok(Services {
        config,
        slug,
        session_fingerprint,
        issues: github.clone(),
        pulls: github,
        tmux,
        workspace,
        slack,
        executor: phase_executor,
    })
}

/// Host + pid stamp marking tmux sessions this daemon created.
fn session_fingerprint() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown-host".to_string());
    format!("{host}-{}", std::process::id())
}
