use clap::Parser;

use soba::cli::commands::{
    ConfigCommand, InitCommand, LogCommand, OpenCommand, StartCommand, StatusCommand, StopCommand,
};
use soba::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level_override = cli.level_override().map(str::to_string);

    let result = match cli.command {
        Commands::Init { force } => InitCommand::new(cli.config, force).execute(),
        Commands::Config => ConfigCommand::new(cli.config).execute(),
        Commands::Start { daemon } => {
            StartCommand::new(cli.config, daemon, level_override)
                .execute()
                .await
        }
        Commands::Stop => StopCommand::new().execute().await,
        Commands::Status => StatusCommand::new(cli.config).execute().await,
        Commands::Open => OpenCommand::new(cli.config).execute(),
        Commands::Log { lines, follow } => LogCommand::new(cli.config, lines, follow).execute(),
        Commands::Version => {
            println!("soba {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
