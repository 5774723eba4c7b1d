pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fsio;
pub mod ledger;
pub mod logparse;
pub mod params;
pub mod process;
pub mod record;
pub mod seed;

pub use aggregate::{
    build_table, load_results, render_table, site_repeat_ratios, summarize, DatasetRatio,
};
pub use config::{FailurePolicy, HarnessConfig};
pub use dataset::{Dataset, SequenceType};
pub use error::BenchError;
pub use ledger::{Ledger, MemoryLedger, SentinelLedger};
pub use params::{enumerate, ExclusionRule, ParameterCombination, Simd, Toggle};
pub use process::CellOutcome;
pub use record::{ResultSet, TimingRecord};

use anyhow::{Context, Result};
use fsio::ensure_dir;
use ledger::cell_key;
use process::{CellInvocation, DKS_RESULTS_FILE};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub build_raxml: bool,
    pub build_dks: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub cells_run: usize,
    pub cells_failed: usize,
    pub cells_skipped: usize,
    pub datasets_skipped: usize,
}

pub struct RunResult {
    pub stats: SweepStats,
    pub results: ResultSet,
    pub blob_path: PathBuf,
    pub report_path: PathBuf,
}

/// Fetches and builds whatever `options` asks for, runs every pending cell
/// of every configured dataset, then summarizes and renders the results.
pub fn run_harness(config: &HarnessConfig, options: RunOptions) -> Result<RunResult> {
    prepare_tools(config, options)?;

    let datasets = config.resolved_datasets()?;
    let experiments = config.experiments_path();
    ensure_dir(&experiments)?;
    let mut ledger = SentinelLedger::new(&experiments);
    let mut stats = SweepStats::default();
    for dataset in &datasets {
        run_dataset(config, dataset, &experiments, &mut ledger, &mut stats)
            .with_context(|| format!("dataset {} failed", dataset.name))?;
    }

    for dataset in &datasets {
        let records = summarize(&experiments.join(dataset.dir_name()))?;
        tracing::info!(dataset = %dataset.name, records = records.len(), "summarized");
    }
    let blob_path = config.results_blob_path();
    let report_path = config.report_path();
    let results = build_table(&experiments, &datasets, &blob_path, &report_path)?;
    tracing::info!(
        run = stats.cells_run,
        failed = stats.cells_failed,
        skipped = stats.cells_skipped,
        report = %report_path.display(),
        "sweep complete"
    );
    Ok(RunResult {
        stats,
        results,
        blob_path,
        report_path,
    })
}

fn prepare_tools(config: &HarnessConfig, options: RunOptions) -> Result<()> {
    if !config.datasets.is_empty() {
        process::fetch_repo(&config.data_git_url, &config.data_path())?;
    }
    if options.build_raxml {
        let checkout = config.resolve(&config.raxml.checkout);
        process::fetch_repo(&config.raxml.git_url, &checkout)?;
        process::build_checkout(&checkout)?;
    }
    if options.build_dks {
        let checkout = config.resolve(&config.dks.checkout);
        process::fetch_repo(&config.dks.git_url, &checkout)?;
        process::build_checkout(&checkout)?;
    }
    Ok(())
}

/// Runs every pending cell of one dataset. Cells are always consulted
/// individually; the dataset entry only mirrors whether any cell is left
/// pending and is never used to skip work.
pub fn run_dataset(
    config: &HarnessConfig,
    dataset: &Dataset,
    experiments: &Path,
    ledger: &mut dyn Ledger,
    stats: &mut SweepStats,
) -> Result<()> {
    let dataset_key = dataset.dir_name();
    let dataset_dir = experiments.join(&dataset_key);
    ensure_dir(&dataset_dir)?;

    let dks_results = dataset_dir.join(DKS_RESULTS_FILE);
    if !dks_results.exists() {
        let dks = config.resolve_binary(&config.dks.binary);
        if !process::run_dks(&dks, dataset, &dks_results)? {
            tracing::warn!(binary = %dks.display(), "dks binary not found; skipping dks");
        }
    }

    let seed = seed::get_seed(&dataset_dir)?;
    let binary = config.resolve_binary(&config.raxml.binary);
    let mut pending = 0usize;
    let mut ran = 0usize;
    for combination in enumerate(config.exclusion, &config.simd) {
        let cell_name = combination.cell_name();
        let key = cell_key(&dataset_key, &cell_name);
        if ledger.is_done(&key)? {
            tracing::debug!(cell = %key, "cell already done");
            stats.cells_skipped += 1;
            continue;
        }
        ledger.reset(&key)?;
        tracing::info!(dataset = %dataset.name, cell = %cell_name, seed, "running cell");
        let invocation = CellInvocation {
            binary: &binary,
            dataset,
            combination,
            seed,
            tree_count: config.tree_count,
            link_alignment: config.link_alignment,
        };
        let outcome = invocation.run(&dataset_dir.join(&cell_name))?;
        stats.cells_run += 1;
        ran += 1;
        if !outcome.is_success() {
            stats.cells_failed += 1;
            tracing::warn!(
                cell = %key,
                status = %outcome.status_label(),
                policy = ?config.on_failure,
                "raxml-ng exited unsuccessfully"
            );
            if config.on_failure == FailurePolicy::LeavePending {
                pending += 1;
                continue;
            }
        }
        ledger.mark_done(&key)?;
    }

    if ran == 0 {
        tracing::debug!(dataset = %dataset.name, "no pending cells");
        stats.datasets_skipped += 1;
    }
    if pending == 0 {
        ledger.mark_done(&dataset_key)?;
    } else {
        ledger.reset(&dataset_key)?;
    }
    Ok(())
}
