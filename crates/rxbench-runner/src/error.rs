use std::path::PathBuf;
use thiserror::Error;

/// Harness invariant violations. These indicate a bug or a tampered
/// experiment tree, never an external-tool failure, and abort the run.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("malformed cell directory name '{name}': token '{token}' is not key.value")]
    MalformedCellName { name: String, token: String },

    #[error("corrupt seed file {path}: '{content}' is not a u32")]
    CorruptSeed { path: PathBuf, content: String },

    #[error("record schema mismatch in '{name}': expected keys [{expected}], found [{found}]")]
    SchemaMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("invalid {field} value '{value}'")]
    InvalidValue { field: &'static str, value: String },
}
