use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "soba")]
#[command(version)]
#[command(about = "Autonomous GitHub issue workflow daemon")]
#[command(long_about = "soba watches a repository for issues labeled soba:todo and drives each one \
                        through plan, implement, review, revise, and merge by running an AI agent \
                        in per-issue tmux panes over per-issue git worktrees. Labels on the issue \
                        are the only workflow state.")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long = "config", global = true, default_value = crate::config::CONFIG_PATH)]
    pub config: String,

    /// Shorthand for --log-level debug
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Override the configured log level
    #[arg(long = "log-level", global = true, value_parser = ["debug", "info", "warn", "error"])]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// CLI-level log override: --log-level wins, then -v.
    pub fn level_override(&self) -> Option<&str> {
        if let Some(level) = self.log_level.as_deref() {
            Some(level)
        } else if self.verbose {
            Some("debug")
        } else {
            None
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold .soba/config.yml
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved configuration
    Config,
    /// Start the workflow engine
    Start {
        /// Detach and run in the background
        #[arg(short = 'd', long = "daemon")]
        daemon: bool,
    },
    /// Stop the background daemon
    Stop,
    /// Show daemon, tmux, and issue status
    Status,
    /// Attach the terminal to the soba tmux session
    Open,
    /// Show the daemon log
    Log {
        /// Number of lines to show
        #[arg(short = 'n', long = "lines", default_value = "50")]
        lines: usize,
        /// Follow the log
        #[arg(short = 'f', long = "follow")]
        follow: bool,
    },
    /// Print the version
    Version,
}
