//! Completion ledger for datasets and cells.
//!
//! Keys are paths relative to the experiments directory, e.g. `exp_125` for a
//! dataset and `exp_125/tipinner.on_siterepeats.off_simd.avx` for a cell.

use crate::fsio::{atomic_write_bytes, ensure_dir};
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

pub const DONE_MARKER: &str = ".done";

pub trait Ledger {
    fn is_done(&self, key: &str) -> Result<bool>;
    fn mark_done(&mut self, key: &str) -> Result<()>;
    fn reset(&mut self, key: &str) -> Result<()>;
}

/// Stores each completed key as a `.done` file inside `<root>/<key>/`.
#[derive(Debug, Clone)]
pub struct SentinelLedger {
    root: PathBuf,
}

impl SentinelLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn marker_path(&self, key: &str) -> PathBuf {
        self.root.join(key).join(DONE_MARKER)
    }
}

impl Ledger for SentinelLedger {
    fn is_done(&self, key: &str) -> Result<bool> {
        Ok(self.marker_path(key).is_file())
    }

    fn mark_done(&mut self, key: &str) -> Result<()> {
        let path = self.marker_path(key);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let payload = format!("{}\n", Utc::now().to_rfc3339());
        atomic_write_bytes(&path, payload.as_bytes())
    }

    fn reset(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.marker_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    done: BTreeSet<String>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
    fn is_done(&self, key: &str) -> Result<bool> {
        Ok(self.done.contains(key))
    }

    fn mark_done(&mut self, key: &str) -> Result<()> {
        self.done.insert(key.to_string());
        Ok(())
    }

    fn reset(&mut self, key: &str) -> Result<()> {
        self.done.remove(key);
        Ok(())
    }
}

pub fn cell_key(dataset_dir_name: &str, cell_name: &str) -> String {
    format!("{}/{}", dataset_dir_name, cell_name)
}
