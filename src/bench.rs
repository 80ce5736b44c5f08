use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::analysis::analyze;
use crate::bench_utils::participant_view::ParticipantView;
use crate::bench_utils::results_table::ResultsTable;
use crate::bench_utils::run_stats::{ParticipantStats, RunStats};
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::oracle::VisibilityOracle;
use crate::size_model::{UniformSizeConfig, UniformSizeModel};
use crate::txo::{participant_label, ParticipantId, TxoStore};

use anyhow::Context;
use serde::Deserialize;
use tokio::sync::Semaphore;

/// A single simulation point.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub weights: Vec<f64>,
    pub target_count: usize,
    pub seed: u64,
    pub max_depth: u32,
    pub size_model: UniformSizeConfig,
    pub log_steps: bool,
}

fn default_runs_per_point() -> u64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    pub weights: Vec<f64>,
    pub target_count: usize,
    #[serde(default = "default_runs_per_point")]
    pub runs_per_point: u64,
    pub max_depths: Vec<u32>,
    #[serde(default)]
    pub size_model: UniformSizeConfig,
    #[serde(default)]
    pub reported_participants: Vec<ParticipantId>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub log_steps: bool,
    /// Runs kept in flight at once; defaults to the available cores.
    #[serde(default)]
    pub max_parallel_runs: Option<usize>,
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_depths.is_empty() {
            return Err(Error::InvalidConfig("no max depths to sweep".to_string()));
        }
        if self.runs_per_point == 0 {
            return Err(Error::InvalidConfig(
                "runs per point must be positive".to_string(),
            ));
        }
        if self.max_parallel_runs == Some(0) {
            return Err(Error::InvalidConfig(
                "max parallel runs must be positive".to_string(),
            ));
        }
        if let Some(participant) = self
            .reported_participants
            .iter()
            .find(|participant| **participant as usize >= self.weights.len())
        {
            return Err(Error::InvalidConfig(format!(
                "reported participant {} does not exist",
                participant
            )));
        }
        Ok(())
    }

    /// Every `max_depth` value crossed with seeds `0..runs_per_point`.
    pub fn runs(&self) -> Vec<RunConfig> {
        self.max_depths
            .iter()
            .flat_map(|max_depth| {
                (0..self.runs_per_point).map(move |seed| RunConfig {
                    weights: self.weights.clone(),
                    target_count: self.target_count,
                    seed,
                    max_depth: *max_depth,
                    size_model: self.size_model,
                    log_steps: self.log_steps,
                })
            })
            .collect()
    }

    pub fn parallel_runs(&self) -> usize {
        self.max_parallel_runs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    pub fn results_table(&self) -> ResultsTable {
        ResultsTable::new(self.reported_participants.clone())
    }
}

pub fn generate_ledger(config: &RunConfig) -> Result<TxoStore> {
    let size_model = UniformSizeModel::try_from(config.size_model)?;
    let generator = Generator::new(
        &config.weights,
        config.target_count,
        config.seed,
        config.max_depth,
        size_model,
    )?
    .with_step_logging(config.log_steps);
    Ok(generator.generate().store)
}

/// Runs the analysis with only what `participant` could legitimately see and
/// checks every inference against the ledger.
pub fn analyze_participant(
    store: &TxoStore,
    participant: ParticipantId,
) -> Result<ParticipantStats> {
    let view = ParticipantView::build(store, participant);
    let oracle = VisibilityOracle::new(store, participant);
    let outcome = analyze(&view.incoming, &view.outgoing, &view.known, &oracle)?;
    ParticipantStats::compute(store, &view, &outcome)
}

pub fn run_anonymity_benchmark(config: &RunConfig) -> anyhow::Result<RunStats> {
    let store = generate_ledger(config).with_context(|| {
        format!(
            "Cannot generate ledger for seed {} and max depth {}",
            config.seed, config.max_depth
        )
    })?;
    let stats = benchmark_ledger(&store, config.weights.len())?;

    tracing::info!(
        "Finished run: seed {:?}, max depth {:?}, txos {:?}, transactions {:?}",
        config.seed,
        config.max_depth,
        stats.txo_count,
        stats.transaction_count
    );

    Ok(stats)
}

/// Analyses participants `0..participant_count` one after another over the
/// same ledger.
pub fn benchmark_ledger(store: &TxoStore, participant_count: usize) -> anyhow::Result<RunStats> {
    let mut stats = RunStats {
        txo_count: store.len(),
        transaction_count: store.transaction_count(),
        participants: Vec::with_capacity(participant_count),
    };

    for participant in 0..participant_count as ParticipantId {
        tracing::info!("Analysing participant {}", participant_label(participant));
        let participant_stats = analyze_participant(store, participant).with_context(|| {
            format!(
                "Analysis failed for participant {}",
                participant_label(participant)
            )
        })?;
        stats.participants.push(participant_stats);
    }

    Ok(stats)
}

/// Runs `work` over every job on the blocking pool with at most `limit` jobs
/// in flight, returning the results in job order.
pub async fn run_bounded<J, T, F>(jobs: Vec<J>, limit: usize, work: F) -> anyhow::Result<Vec<T>>
where
    J: Send + 'static,
    T: Send + 'static,
    F: Fn(J) -> T + Send + Sync + 'static,
{
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let work = Arc::new(work);
    let total = jobs.len();

    let mut handles = Vec::with_capacity(total);
    for job in jobs {
        let permit = permits.clone().acquire_owned().await?;
        let work = work.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work(job)
        }));
    }

    let mut results = Vec::with_capacity(total);
    for (done, handle) in handles.into_iter().enumerate() {
        results.push(handle.await?);
        tracing::info!("done {:5}/{:5}", done + 1, total);
    }
    Ok(results)
}

/// Every sweep point is an independent run over its own ledger.
pub async fn run_sweep(config: &SweepConfig) -> anyhow::Result<ResultsTable> {
    config.validate()?;
    let limit = config.parallel_runs();
    tracing::info!("Sweeping {} runs, {} at a time", config.runs().len(), limit);

    let results = run_bounded(config.runs(), limit, |run| {
        let stats = run_anonymity_benchmark(&run);
        (run.max_depth, run.seed, stats)
    })
    .await?;

    let mut table = config.results_table();
    for (max_depth, seed, stats) in results {
        table.add_run(max_depth, seed, stats?);
    }
    Ok(table)
}
