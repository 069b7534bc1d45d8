use std::{net::SocketAddr, path::PathBuf};

use clap::Args;
use tracing::info;

use super::CliContext;
use flowdocs::api::{self, AppState};
use flowdocs::logger::init_tracing;

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Port to listen on. Defaults to PORT or 3001
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the module and workflow JSON files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory receiving a copy of every file before it is overwritten
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,

    /// Optional log level override (e.g. error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// OpenTelemetry endpoint (e.g. http://localhost:4318)
    #[arg(long)]
    pub otel_endpoint: Option<String>,
}

pub async fn execute(args: ServeArgs, context: &CliContext) -> anyhow::Result<()> {
    let settings = context.settings_with(args.data_dir, args.backup_dir);
    let log_level = if args.log_level.is_empty() {
        "info".to_string()
    } else {
        args.log_level
    };
    let _guard = init_tracing(
        settings.log_dir.clone(),
        "flowdocs.log".to_string(),
        "flowdocs-requests.json".to_string(),
        log_level,
        args.otel_endpoint,
    )?;
    context.env_file.log();

    let port = args.port.unwrap_or(settings.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(
        data_dir = %settings.data_dir.display(),
        backup_dir = %settings.backup_dir.display(),
        "starting API"
    );
    println!("API server running on http://localhost:{port}");
    println!("Health check: http://localhost:{port}/api/health");

    api::serve(AppState::from_settings(&settings), addr).await
}
