//! Pipeline-level errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::ingest::IngestError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("serialize parser specification: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("write {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn artifact(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Artifact {
            path: path.into(),
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
