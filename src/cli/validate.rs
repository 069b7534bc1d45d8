use std::{path::PathBuf, process};

use clap::Args;

use super::{CliContext, stores};
use flowdocs::audit;
use flowdocs::docs::Docs;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Directory holding the module and workflow JSON files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Root that `source_documents` paths are resolved against
    #[arg(long)]
    pub docs_dir: Option<PathBuf>,
}

pub async fn execute(args: ValidateArgs, context: &CliContext) -> anyhow::Result<()> {
    let mut settings = context.settings_with(args.data_dir, None);
    if let Some(dir) = args.docs_dir {
        settings.docs_dir = dir;
    }
    let (flows, workflows) = stores(&settings);
    let report = audit::run(&flows, &workflows, &Docs::open(&settings)).await;

    for problem in &report.problems {
        println!("❌ {problem}");
    }
    println!(
        "Checked {} modules, {} flows, {} cross-module workflows: {} problems",
        report.modules_checked,
        report.flows_checked,
        report.workflows_checked,
        report.problems.len()
    );
    if !report.is_clean() {
        process::exit(1);
    }
    println!("✅ All data files are consistent.");
    Ok(())
}
