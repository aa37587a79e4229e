//! CLI-level errors (wraps pipeline errors)

use thiserror::Error;

use crate::config::ConfigError;
use crate::ingest::IngestError;
use crate::pipeline::PipelineError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Config(_) => crate::exitcode::CONFIG,
            CliError::Pipeline(e) => match e {
                PipelineError::Config(_) => crate::exitcode::CONFIG,
                PipelineError::Ingest(IngestError::InputNotFound(_)) => crate::exitcode::NOINPUT,
                PipelineError::Ingest(_) => crate::exitcode::IOERR,
                PipelineError::Serialize(_) => crate::exitcode::SOFTWARE,
                PipelineError::Artifact { .. } => crate::exitcode::CANTCREAT,
            },
            CliError::Io(_) => crate::exitcode::IOERR,
        }
    }
}
