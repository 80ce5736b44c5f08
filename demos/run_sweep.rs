use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;

use clap::Parser;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use txo_anonymity_benchmark::bench::{run_sweep, SweepConfig};

#[derive(Parser, Debug)]
#[clap(version)]
pub struct Cli {
    /// path to config file
    #[clap(long, value_parser)]
    config_path: PathBuf,
}

#[tokio::main]
async fn main() {
    let result = _main().await;
    result.unwrap();
}

async fn _main() -> anyhow::Result<()> {
    // Start logging setup block
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt_layer)
        .init();

    let Cli { config_path } = Cli::parse();

    tracing::info!("Config file {:?}", config_path);
    let file = File::open(&config_path).with_context(|| {
        format!(
            "Cannot read config file {path}",
            path = config_path.display()
        )
    })?;
    let config: SweepConfig = serde_yaml::from_reader(file).with_context(|| {
        format!(
            "Cannot read config file {path}",
            path = config_path.display()
        )
    })?;
    let table = run_sweep(&config).await?;

    match config.output_path {
        Some(path) => {
            tracing::info!("Writing results to {:?}", path);
            table.dump(path)?;
        }
        None => table.write_to(&mut std::io::stdout().lock())?,
    }

    Ok(())
}
