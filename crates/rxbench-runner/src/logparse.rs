use crate::error::BenchError;
use crate::record::TimingRecord;
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const ELAPSED_PREFIX: &str = "Elapsed time: ";
pub const ELAPSED_SUFFIX: &str = " Seconds";

/// Decodes a cell directory name such as
/// `tipinner.on_siterepeats.off_simd.avx2` into its attributes.
pub fn parse_cell_name(name: &str) -> Result<BTreeMap<String, String>, BenchError> {
    let mut attrs = BTreeMap::new();
    for token in name.split('_') {
        match token.split_once('.') {
            Some((key, value)) if !key.is_empty() => {
                attrs.insert(key.to_string(), value.to_string());
            }
            _ => {
                return Err(BenchError::MalformedCellName {
                    name: name.to_string(),
                    token: token.to_string(),
                })
            }
        }
    }
    Ok(attrs)
}

/// Reads the elapsed time from the second-to-last line of a raxml-ng log.
/// Anything other than a well-formed timing line yields infinity.
pub fn parse_elapsed(log: &str) -> f64 {
    let lines: Vec<&str> = log.lines().collect();
    if lines.len() < 2 {
        return f64::INFINITY;
    }
    lines[lines.len() - 2]
        .strip_prefix(ELAPSED_PREFIX)
        .and_then(|rest| {
            rest.strip_suffix(ELAPSED_SUFFIX)
                .or_else(|| rest.strip_suffix(" seconds"))
        })
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|t| !t.is_nan() && *t >= 0.0)
        .unwrap_or(f64::INFINITY)
}

pub fn parse_log(path: &Path) -> Result<TimingRecord> {
    let cell_name = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("log file has no cell directory: {}", path.display()))?;
    let attrs = parse_cell_name(cell_name)?;
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let time = parse_elapsed(&String::from_utf8_lossy(&bytes));
    Ok(TimingRecord::from_attributes(cell_name, &attrs, time)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsio::{ensure_dir, temp_root};
    use crate::params::{Simd, Toggle};

    #[test]
    fn cell_name_decodes_to_attribute_map() {
        let attrs = parse_cell_name("tipinner.on_siterepeats.off_simd.avx2").unwrap();
        let expected: BTreeMap<String, String> = [
            ("tipinner", "on"),
            ("siterepeats", "off"),
            ("simd", "avx2"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(attrs, expected);
    }

    #[test]
    fn cell_name_without_key_value_tokens_is_fatal() {
        for bad in ["exp_125", "tipinner.on_siterepeats", "", ".on_simd.avx"] {
            let err = parse_cell_name(bad).expect_err(bad);
            assert!(matches!(err, BenchError::MalformedCellName { .. }), "{}", bad);
        }
    }

    #[test]
    fn elapsed_time_is_read_from_second_to_last_line() {
        let log = "RAxML-NG v. 1.2.0\nFinal LogLikelihood: -1234.5\nElapsed time: 3.250000 Seconds\n\n";
        assert_eq!(parse_elapsed(log), 3.25);
        let lowercase = "search done\nElapsed time: 0.529 seconds\n\n";
        assert_eq!(parse_elapsed(lowercase), 0.529);
    }

    #[test]
    fn unusable_timing_lines_become_infinite() {
        assert!(parse_elapsed("start\nElapsed time: ERROR Seconds\n\n").is_infinite());
        assert!(parse_elapsed("start\nERROR: alignment file not found\n\n").is_infinite());
        assert!(parse_elapsed("Elapsed time: 3.25 Seconds").is_infinite());
        assert!(parse_elapsed("").is_infinite());
        assert!(parse_elapsed("a\nElapsed time: -1 Seconds\n\n").is_infinite());
    }

    #[test]
    fn parse_log_combines_directory_and_contents() {
        let root = temp_root("parse_log");
        let cell = root.join("tipinner.off_siterepeats.on_simd.avx");
        ensure_dir(&cell).unwrap();
        let log = cell.join("125.phy.raxml.log");
        fs::write(&log, "x\nElapsed time: 10.5 Seconds\n\n").unwrap();
        let rec = parse_log(&log).unwrap();
        assert_eq!(rec.tipinner, Toggle::Off);
        assert_eq!(rec.siterepeats, Toggle::On);
        assert_eq!(rec.simd, Simd::Avx);
        assert_eq!(rec.time, 10.5);
        let _ = fs::remove_dir_all(root);
    }
}
