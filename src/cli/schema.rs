use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use super::CliContext;
use flowdocs::validation::{cross_module_schema, flow_schema};

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Directory to write the schema files into
    #[arg(long, default_value = "schemas")]
    pub out: PathBuf,
}

pub async fn execute(args: SchemaArgs, _context: &CliContext) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("creating {}", args.out.display()))?;
    for (name, schema) in [
        ("flow.schema.json", flow_schema()),
        ("cross_module.schema.json", cross_module_schema()),
    ] {
        let path = args.out.join(name);
        let text = serde_json::to_string_pretty(&schema)?;
        tokio::fs::write(&path, text)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
    }
    println!("Schemas written to {}", args.out.display());
    Ok(())
}
