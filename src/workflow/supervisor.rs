//! Daemon supervisor: owns the shutdown signal and the three worker loops.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::cleaner::ClosedIssueCleaner;
use super::issue_watcher::IssueWatcher;
use super::pr_watcher::PrWatcher;
use super::Services;
use crate::errors::Result;

pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub struct Supervisor {
    services: Services,
    shutdown_tx: watch::Sender<bool>,
}

impl Supervisor {
    pub fn new(services: Services) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            services,
            shutdown_tx,
        }
    }

    /// A receiver for components outside the supervisor's own loops.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Run the loops until SIGINT/SIGTERM, then drain them under the grace
    /// cap.
    pub async fn run(self) -> Result<()> {
        let mut handles: Vec<(&str, JoinHandle<()>)> = Vec::new();

        let issue_watcher =
            IssueWatcher::new(self.services.clone(), self.shutdown_tx.subscribe());
        handles.push(("issue watcher", tokio::spawn(issue_watcher.run())));

        let pr_watcher = PrWatcher::new(self.services.clone(), self.shutdown_tx.subscribe());
        handles.push(("PR watcher", tokio::spawn(pr_watcher.run())));

        if self.services.config.workflow.closed_issue_cleanup_enabled {
            let cleaner =
                ClosedIssueCleaner::new(self.services.clone(), self.shutdown_tx.subscribe());
            handles.push(("cleaner", tokio::spawn(cleaner.run())));
        }

        wait_for_signal().await;
        info!("shutdown signal received, stopping workers");
        let _ = self.shutdown_tx.send(true);

        for (name, handle) in handles {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(worker = name, error = %err, "worker panicked"),
                Err(_) => warn!(worker = name, "worker did not stop within grace period"),
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            warn!(error = %err, "cannot install SIGTERM handler, relying on SIGINT");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received interrupt");
}
