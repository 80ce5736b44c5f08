use clap::Parser;
use serde::Serialize;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use txo_anonymity_benchmark::bench::{benchmark_ledger, generate_ledger, RunConfig};
use txo_anonymity_benchmark::bench_utils::run_stats::RunStats;
use txo_anonymity_benchmark::size_model::UniformSizeConfig;
use txo_anonymity_benchmark::txo::LedgerRecord;

#[derive(Parser, Debug)]
#[clap(version)]
pub struct Cli {
    /// relative share of transfers each participant takes part in
    #[clap(long, value_parser, use_value_delimiter = true, default_value = "1.7,1.3,1,1,0.4,0.1")]
    weights: Vec<f64>,

    /// number of txos to generate
    #[clap(long, value_parser, default_value = "10000")]
    target_count: usize,

    #[clap(long, value_parser, default_value = "0")]
    seed: u64,

    /// provenance depth at which outputs get snipped
    #[clap(long, value_parser, default_value = "10")]
    max_depth: u32,

    #[clap(long, value_parser, default_value = "100")]
    low: u64,

    #[clap(long, value_parser, default_value = "10000")]
    high: u64,

    /// print every generated txo before the report (inside the json output with --json)
    #[clap(long)]
    print_ledger: bool,

    /// log pool balances after every transfer (debug level)
    #[clap(long)]
    log_steps: bool,

    /// print the statistics as json instead of the text report
    #[clap(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ledger: Option<Vec<LedgerRecord>>,
    stats: &'a RunStats,
}

fn main() {
    let result = _main();
    result.unwrap();
}

fn _main() -> anyhow::Result<()> {
    // Start logging setup block
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt_layer)
        .init();

    let cli = Cli::parse();
    tracing::info!("Running with {:?}", cli);

    let config = RunConfig {
        weights: cli.weights,
        target_count: cli.target_count,
        seed: cli.seed,
        max_depth: cli.max_depth,
        size_model: UniformSizeConfig {
            low: cli.low,
            high: cli.high,
        },
        log_steps: cli.log_steps,
    };

    let store = generate_ledger(&config)?;
    if cli.print_ledger && !cli.json {
        store.print_ledger(&mut std::io::stdout().lock())?;
    }

    let stats = benchmark_ledger(&store, config.weights.len())?;
    if cli.json {
        let report = JsonReport {
            ledger: cli.print_ledger.then(|| store.records()),
            stats: &stats,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", stats);
    }

    Ok(())
}
