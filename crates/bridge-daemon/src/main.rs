use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use bridge_config::Config;
use bridge_runtime::tracing_init::init_tracing;
use bridge_runtime::{wait_for_signal, Orchestrator};

#[derive(Parser)]
#[command(name = "bridge-daemon", about = "face-tracking to desktop-avatar bridge")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge pipeline.
    Run {
        /// Path to the consolidated config document.
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config_path = config
                .canonicalize()
                .map_err(|e| anyhow::anyhow!("config path '{}': {e}", config.display()))?;

            // Loaded once up front purely to size the logging sink before the
            // orchestrator's own ConfigStore takes over as the live source of
            // truth (spec §7's one fatal path: no config, no last-good cache).
            let bootstrap_config = Config::load(&config_path)
                .map_err(|e| anyhow::anyhow!("failed to load '{}': {e}", config_path.display()))?;
            let base_dir = config_path
                .parent()
                .expect("config path must have a parent directory");
            let _guard = init_tracing(&bootstrap_config.general.logging, base_dir)?;

            let orchestrator = Orchestrator::start(&config_path)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;

            let progress = orchestrator.init_progress();
            tracing::info!(
                domain = "sys",
                elapsed_ms = progress.elapsed.as_millis() as u64,
                "bridge pipeline started"
            );

            wait_for_signal(orchestrator.cancel_token()).await;
            orchestrator.shutdown();
            orchestrator.wait().await;
        }
    }

    Ok(())
}
