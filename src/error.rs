use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelaxError {
    /// A required results artifact was not written by the engine.
    #[error("Missing artifact: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("Invalid relaxation job: {0}")]
    InvalidJob(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Engine error: {0:#}")]
    Engine(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report export failed: {0}")]
    Report(String),
}

impl From<csv::Error> for RelaxError {
    fn from(e: csv::Error) -> Self {
        RelaxError::Report(e.to_string())
    }
}

impl From<serde_json::Error> for RelaxError {
    fn from(e: serde_json::Error) -> Self {
        RelaxError::Report(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelaxError>;
