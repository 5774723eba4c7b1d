use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceType {
    Dna,
    Protein,
}

impl SequenceType {
    /// Inferred from the alignment path: anything under a `DNA` directory or
    /// named with `DNA` is nucleotide data.
    pub fn infer(msa: &Path) -> Self {
        if msa.to_string_lossy().contains("DNA") {
            SequenceType::Dna
        } else {
            SequenceType::Protein
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            SequenceType::Dna => "gtr",
            SequenceType::Protein => "lg",
        }
    }

    pub fn states(&self) -> u32 {
        match self {
            SequenceType::Dna => 4,
            SequenceType::Protein => 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub msa: PathBuf,
    pub name: String,
    pub sequence_type: SequenceType,
}

impl Dataset {
    pub fn new(msa: impl Into<PathBuf>) -> Result<Self> {
        let msa = msa.into();
        let name = msa
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("dataset path has no file name: {}", msa.display()))?
            .to_string();
        let sequence_type = SequenceType::infer(&msa);
        Ok(Self {
            msa,
            name,
            sequence_type,
        })
    }

    pub fn file_name(&self) -> &std::ffi::OsStr {
        self.msa.file_name().unwrap_or(self.msa.as_os_str())
    }

    /// Name of the dataset's directory under the experiments root.
    pub fn dir_name(&self) -> String {
        format!("exp_{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dna_dataset_is_inferred_from_path() {
        let ds = Dataset::new("test-Datasets/DNA-Data/125/125.phy").unwrap();
        assert_eq!(ds.name, "125");
        assert_eq!(ds.dir_name(), "exp_125");
        assert_eq!(ds.sequence_type, SequenceType::Dna);
        assert_eq!(ds.sequence_type.model(), "gtr");
        assert_eq!(ds.sequence_type.states(), 4);
    }

    #[test]
    fn protein_dataset_uses_lg_and_twenty_states() {
        let ds = Dataset::new("test-Datasets/Protein-Data/140/140.phy").unwrap();
        assert_eq!(ds.sequence_type, SequenceType::Protein);
        assert_eq!(ds.sequence_type.model(), "lg");
        assert_eq!(ds.sequence_type.states(), 20);
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(Dataset::new("").is_err());
    }
}
