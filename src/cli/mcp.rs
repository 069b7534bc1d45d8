use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::{CliContext, stores};
use flowdocs::logger::init_tracing;
use flowdocs::tools::ToolServer;

#[derive(Args, Debug)]
pub struct McpArgs {
    /// Directory holding the module and workflow JSON files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Optional log level override (e.g. error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Serve tools over stdin/stdout. Logs only go to files, stdout carries the
/// protocol.
pub async fn execute(args: McpArgs, context: &CliContext) -> anyhow::Result<()> {
    let settings = context.settings_with(args.data_dir, None);
    let _guard = init_tracing(
        settings.log_dir.clone(),
        "flowdocs-mcp.log".to_string(),
        "flowdocs-mcp-requests.json".to_string(),
        args.log_level,
        None,
    )?;
    context.env_file.log();

    let (flows, workflows) = stores(&settings);
    info!(data_dir = %settings.data_dir.display(), "tool server starting");
    tool_rpc::run_stdio(&ToolServer::new(flows, workflows)).await
}
