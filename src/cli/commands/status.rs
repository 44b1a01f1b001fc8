use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use crate::config::SobaConfig;
use crate::daemon::DaemonManager;
use crate::exec::ProcessCommandExecutor;
use crate::github::{GitHubClient, IssueOps};
use crate::tmux::TmuxClient;
use crate::workflow::phase;

pub struct StatusCommand {
    config_path: String,
}

impl StatusCommand {
    pub fn new(config_path: String) -> Self {
        Self { config_path }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = SobaConfig::load(Path::new(&self.config_path))?;
        let slug = config.repo_slug()?;

        // Daemon
        let manager = DaemonManager::default();
        match manager.read_pid() {
            Ok(pid) => {
                let state = manager.status(config.log_path_for(pid as u32))?;
                if state.running {
                    let uptime = state
                        .started_at
                        .map(|t| format_duration(Utc::now().signed_duration_since(t)))
                        .unwrap_or_else(|| "unknown".to_string());
                    println!("Daemon: running (PID {}, up {})", state.pid, uptime);
                    println!("Log: {}", state.log_path.display());
                } else {
                    println!("Daemon: not running (stale PID file, PID {})", state.pid);
                }
            }
            Err(_) => println!("Daemon: not running"),
        }

        // tmux windows
        let executor = Arc::new(ProcessCommandExecutor);
        let tmux = TmuxClient::new(executor.clone());
        let session = slug.session_name();
        if tmux.has_session(&session).await.unwrap_or(false) {
            let windows = tmux.list_windows(&session).await.unwrap_or_default();
            println!("Session {session}: {} window(s)", windows.len());
            for window in windows {
                println!("  {window}");
            }
        } else {
            println!("Session {session}: not running");
        }

        // Active issues
        match GitHubClient::connect(&config.github, slug, executor.as_ref()).await {
            Ok(client) => match client.list_open_soba_issues().await {
                Ok(issues) if issues.is_empty() => println!("Issues: none in the workflow"),
                Ok(issues) => {
                    println!("Issues:");
                    for issue in issues {
                        let phase = phase::current_phase(&issue.labels)
                            .map(|p| p.to_string())
                            .unwrap_or_else(|_| "unclassifiable".to_string());
                        println!("  #{} [{}] {}", issue.number, phase, issue.title);
                    }
                }
                Err(err) => println!("Issues: unavailable ({err})"),
            },
            Err(err) => println!("Issues: unavailable ({err})"),
        }

        Ok(())
    }
}

fn format_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m:02}m")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}
