use crate::dataset::Dataset;
use crate::params::{ExclusionRule, Simd};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "rxbench.yaml";

pub const RAXML_GIT: &str = "https://github.com/amkozlov/raxml-ng.git";
pub const DKS_GIT: &str = "https://github.com/computations/dks";
pub const TEST_DATA_GIT: &str = "https://github.com/stamatak/test-Datasets.git";

/// What to do with a cell whose raxml-ng process exited unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Mark the cell done anyway; it surfaces as an infinite time.
    #[default]
    MarkDone,
    /// Leave the cell pending so the next invocation retries it.
    LeavePending,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub git_url: String,
    pub checkout: PathBuf,
    pub binary: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Every relative path below is resolved against this directory.
    pub root: PathBuf,
    pub experiments_dir: PathBuf,
    pub data_root: PathBuf,
    pub data_git_url: String,
    /// Alignment paths relative to `data_root`.
    pub datasets: Vec<PathBuf>,
    pub raxml: ToolConfig,
    pub dks: ToolConfig,
    pub simd: Vec<Simd>,
    pub exclusion: ExclusionRule,
    pub tree_count: u32,
    pub link_alignment: bool,
    pub on_failure: FailurePolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            experiments_dir: PathBuf::from("experiments"),
            data_root: PathBuf::from("test-Datasets"),
            data_git_url: TEST_DATA_GIT.to_string(),
            datasets: vec![
                PathBuf::from("DNA-Data/125/125.phy"),
                PathBuf::from("DNA-Data/354/354.phy"),
                PathBuf::from("Protein-Data/140/140.phy"),
                PathBuf::from("Protein-Data/775/775.phy"),
            ],
            raxml: ToolConfig {
                git_url: RAXML_GIT.to_string(),
                checkout: PathBuf::from("raxml-ng"),
                binary: PathBuf::from("raxml-ng/bin/raxml-ng"),
            },
            dks: ToolConfig {
                git_url: DKS_GIT.to_string(),
                checkout: PathBuf::from("dks"),
                binary: PathBuf::from("dks/bin/dks"),
            },
            simd: vec![Simd::Avx, Simd::Avx2],
            exclusion: ExclusionRule::Distinct,
            tree_count: 1,
            link_alignment: true,
            on_failure: FailurePolicy::MarkDone,
        }
    }
}

impl ToolConfig {
    /// Fills fields a partial config section left empty.
    fn fill_from(&mut self, defaults: &ToolConfig) {
        if self.git_url.is_empty() {
            self.git_url = defaults.git_url.clone();
        }
        if self.checkout.as_os_str().is_empty() {
            self.checkout = defaults.checkout.clone();
        }
        if self.binary.as_os_str().is_empty() {
            self.binary = defaults.binary.clone();
        }
    }
}

impl HarnessConfig {
    /// Loads `path` when given; otherwise `rxbench.yaml` in the current
    /// directory if it exists, falling back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let mut config: HarnessConfig = serde_yaml::from_str(raw)?;
        let defaults = HarnessConfig::default();
        config.raxml.fill_from(&defaults.raxml);
        config.dks.fill_from(&defaults.dks);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tree_count == 0 {
            return Err(anyhow!("tree_count must be at least 1"));
        }
        if self.datasets.iter().any(|p| p.file_stem().is_none()) {
            return Err(anyhow!("every dataset entry must name an alignment file"));
        }
        Ok(())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Like `resolve`, except a bare program name is left for `PATH` lookup.
    pub fn resolve_binary(&self, path: &Path) -> PathBuf {
        if path.components().count() == 1 && !path.is_absolute() {
            path.to_path_buf()
        } else {
            self.resolve(path)
        }
    }

    pub fn experiments_path(&self) -> PathBuf {
        self.resolve(&self.experiments_dir)
    }

    pub fn data_path(&self) -> PathBuf {
        self.resolve(&self.data_root)
    }

    pub fn results_blob_path(&self) -> PathBuf {
        self.root.join("results.json")
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join("results.md")
    }

    pub fn resolved_datasets(&self) -> Result<Vec<Dataset>> {
        let data_root = self.data_path();
        self.datasets
            .iter()
            .map(|p| {
                let msa = if p.is_absolute() {
                    p.clone()
                } else {
                    data_root.join(p)
                };
                Dataset::new(msa)
            })
            .collect()
    }
}
