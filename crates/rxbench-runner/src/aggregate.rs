use crate::dataset::Dataset;
use crate::fsio::{atomic_write_bytes, atomic_write_json_pretty};
use crate::logparse::parse_log;
use crate::params::{Simd, Toggle};
use crate::record::{ResultSet, TimingRecord, RECORD_FIELDS};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub const TIMES_JSON: &str = "times.json";
pub const TIMES_CSV: &str = "times.csv";

/// Parses every `*.log` under a dataset's experiment directory and writes
/// `times.json` and `times.csv` next to the cells.
pub fn summarize(dataset_dir: &Path) -> Result<Vec<TimingRecord>> {
    let mut records = Vec::new();
    for entry in WalkDir::new(dataset_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let record = parse_log(entry.path())
            .with_context(|| format!("failed to summarize {}", dataset_dir.display()))?;
        records.push(record);
    }
    atomic_write_json_pretty(&dataset_dir.join(TIMES_JSON), &records)?;
    atomic_write_bytes(&dataset_dir.join(TIMES_CSV), &records_to_csv(&records)?)?;
    Ok(records)
}

fn records_to_csv(records: &[TimingRecord]) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(RECORD_FIELDS)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow!("failed to flush csv: {}", e.error()))
}

pub fn load_times(dataset_dir: &Path) -> Result<Vec<TimingRecord>> {
    let path = dataset_dir.join(TIMES_JSON);
    let bytes = fs::read(&path).with_context(|| format!("missing {}", path.display()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn save_results(path: &Path, results: &ResultSet) -> Result<()> {
    atomic_write_bytes(path, &serde_json::to_vec(results)?)
}

pub fn load_results(path: &Path) -> Result<ResultSet> {
    let bytes = fs::read(path).with_context(|| format!("missing results {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("corrupt results {}", path.display()))
}

/// Merges every dataset's `times.json` into one result set in `datasets`
/// order, persists it as `blob_path` and writes the rendered report to
/// `report_path`.
pub fn build_table(
    experiments_dir: &Path,
    datasets: &[Dataset],
    blob_path: &Path,
    report_path: &Path,
) -> Result<ResultSet> {
    let mut results = ResultSet::new();
    for dataset in datasets {
        let records = load_times(&experiments_dir.join(dataset.dir_name()))?;
        results.insert(dataset.name.clone(), records);
    }
    save_results(blob_path, &results)?;
    atomic_write_bytes(report_path, render_table(&results).as_bytes())?;
    Ok(results)
}

/// Fixed-width report. Each column is `len(header) + 4` wide with values
/// right-aligned; a longer value pushes the rest of its row over.
pub fn render_table(results: &ResultSet) -> String {
    let widths: Vec<usize> = RECORD_FIELDS.iter().map(|h| h.len() + 4).collect();
    let mut out = String::new();
    for (dataset, records) in results.iter() {
        let _ = writeln!(out, "# {}", dataset);
        for (header, width) in RECORD_FIELDS.iter().zip(&widths) {
            let _ = write!(out, "{:>width$}", header, width = width);
        }
        out.push('\n');
        for (header, width) in RECORD_FIELDS.iter().zip(&widths) {
            let _ = write!(out, "{:>width$}", "-".repeat(header.len()), width = width);
        }
        out.push('\n');
        for record in records {
            for (field, width) in record.fields().iter().zip(&widths) {
                let _ = write!(out, "{:>width$}", field, width = width);
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRatio {
    pub dataset: String,
    pub best_time: f64,
    pub avx2_site_repeats_time: f64,
    pub ratio: f64,
}

/// How far the avx2 + site-repeats configuration is from the fastest run of
/// each dataset. A dataset without that configuration reports 0.
pub fn site_repeat_ratios(results: &ResultSet) -> Vec<DatasetRatio> {
    results
        .iter()
        .map(|(dataset, records)| {
            let best_time = records
                .iter()
                .map(|r| r.time)
                .fold(f64::INFINITY, f64::min);
            let avx2_site_repeats_time = records
                .iter()
                .filter(|r| r.siterepeats == Toggle::On && r.simd == Simd::Avx2)
                .last()
                .map(|r| r.time)
                .unwrap_or(0.0);
            DatasetRatio {
                dataset: dataset.to_string(),
                best_time,
                avx2_site_repeats_time,
                ratio: avx2_site_repeats_time / best_time,
            }
        })
        .collect()
}
