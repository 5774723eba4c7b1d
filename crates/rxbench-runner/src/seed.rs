use crate::error::BenchError;
use crate::fsio::atomic_write_bytes;
use anyhow::{Context, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs;
use std::path::Path;

pub const SEED_FILE: &str = ".seed";

/// Returns the seed shared by every cell of the dataset rooted at
/// `dataset_dir`, creating and persisting it on first use.
///
/// A seed file that does not hold a u32 is an error. Replacing it would make
/// a resumed run incomparable with the cells that already finished.
pub fn get_seed(dataset_dir: &Path) -> Result<u32> {
    let path = dataset_dir.join(SEED_FILE);
    if path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let seed = raw.trim().parse::<u32>().map_err(|_| BenchError::CorruptSeed {
            path: path.clone(),
            content: raw.trim().to_string(),
        })?;
        return Ok(seed);
    }

    let mut bytes = [0u8; 4];
    OsRng.fill_bytes(&mut bytes);
    let seed = u32::from_be_bytes(bytes);
    atomic_write_bytes(&path, seed.to_string().as_bytes())?;
    tracing::debug!(seed, path = %path.display(), "generated dataset seed");
    Ok(seed)
}
