use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod mcp;
pub mod schema;
pub mod serve;
pub mod validate;

use mcp::McpArgs;
use schema::SchemaArgs;
use serve::ServeArgs;
use validate::ValidateArgs;

use flowdocs::config::{EnvFile, Settings};
use flowdocs::cross_module::CrossModuleStore;
use flowdocs::store::FlowStore;

#[derive(Parser, Debug)]
#[command(
    name = "flowdocs",
    about = "Documentation browser backend for product flows",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Run the tool server on stdin/stdout
    Mcp(McpArgs),

    /// Check every data file for problems
    Validate(ValidateArgs),

    /// Emit JSON‐Schema for flows and cross-module workflows
    Schema(SchemaArgs),
}

/// Settings resolved from the environment before any flag is applied.
#[derive(Clone, Debug)]
pub struct CliContext {
    pub settings: Settings,
    pub env_file: EnvFile,
}

impl CliContext {
    pub fn new(settings: Settings, env_file: EnvFile) -> Self {
        Self { settings, env_file }
    }

    /// Settings with the directory flags applied.
    pub fn settings_with(&self, data_dir: Option<PathBuf>, backup_dir: Option<PathBuf>) -> Settings {
        let mut settings = self.settings.clone();
        if let Some(dir) = data_dir {
            settings.data_dir = dir;
        }
        if let Some(dir) = backup_dir {
            settings.backup_dir = dir;
        }
        settings
    }
}

pub fn stores(settings: &Settings) -> (FlowStore, CrossModuleStore) {
    let flows = FlowStore::new(
        &settings.data_dir,
        &settings.backup_dir,
        flowdocs::catalog::Catalog::builtin(),
    );
    let workflows = CrossModuleStore::new(flows.clone(), settings.cross_module_files.clone());
    (flows, workflows)
}

pub async fn execute(context: &CliContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve(args) => serve::execute(args, context).await,
        Commands::Mcp(args) => mcp::execute(args, context).await,
        Commands::Validate(args) => validate::execute(args, context).await,
        Commands::Schema(args) => schema::execute(args, context).await,
    }
}

pub fn default_command() -> Commands {
    Commands::Serve(ServeArgs::default())
}
