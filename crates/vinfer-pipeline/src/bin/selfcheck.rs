use std::path::PathBuf;

use clap::Parser;

use vinfer_pipeline::setup::ensure_layout;
use vinfer_pipeline::PipelineConfig;

/// Prepare the project layout and validate the model configuration
#[derive(Parser)]
#[command(name = "vinfer-selfcheck")]
struct Args {
    /// Project root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Configuration file, relative to the project root
    #[arg(long, default_value = "config/models.yaml")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("vinfer-selfcheck: starting in {}", args.root.display());

    let created = ensure_layout(&args.root).await?;
    for dir in &created {
        println!("  created {}", dir.display());
    }

    let config_path = args.root.join(&args.config);
    let config = PipelineConfig::load(&config_path)
        .map_err(|e| anyhow::anyhow!("config check failed: {}", e))?;

    println!(
        "vinfer-selfcheck: {} enabled, {} disabled model(s)",
        config.models.len(),
        config.disabled.len()
    );
    for model in &config.models {
        println!("  {}: {}", model.name, model.launch_command());
    }

    println!("vinfer-selfcheck: ok");
    Ok(())
}
