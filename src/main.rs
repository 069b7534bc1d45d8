use std::path::PathBuf;

use clap::Parser;
use flowdocs::config::{ConfigManager, EnvConfigManager, Settings};

mod cli;

use cli::{Cli, CliContext};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env = EnvConfigManager::new(PathBuf::from(".env"));
    let env_file = env.env_file().clone();
    let settings = Settings::load(&ConfigManager(env)).await;
    let context = CliContext::new(settings, env_file);
    let command = cli.command.unwrap_or_else(cli::default_command);
    cli::execute(&context, command).await
}
