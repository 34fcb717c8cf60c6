//! Error taxonomy and process exit codes.
//!
//! Configuration problems are caught before anything is spawned and exit
//! with [`EXIT_USAGE`]. Artifact problems and strict no-candidate runs exit
//! with [`EXIT_FAILURE`]. Per-command failures never show up here; they live
//! in run records.

use std::path::PathBuf;

use crate::core::selection::SelectionError;

/// At least one command succeeded
pub const EXIT_OK: i32 = 0;
/// Generic failure
pub const EXIT_FAILURE: i32 = 1;
/// Misuse: bad selection syntax, out-of-range index, bad options
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum ReproError
{
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("timeout must be a positive number of seconds")]
    InvalidTimeout,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no candidate commands matched the issue")]
    NoCandidates,

    #[error("replay artifact {}: {reason}", path.display())]
    Artifact { path: PathBuf, reason: String },
}

impl ReproError
{
    pub fn artifact(
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self
    {
        Self::Artifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn exit_code(&self) -> i32
    {
        match self
        {
            ReproError::Selection(_) | ReproError::InvalidTimeout | ReproError::InvalidInput(_) =>
            {
                EXIT_USAGE
            }
            ReproError::NoCandidates | ReproError::Artifact { .. } => EXIT_FAILURE,
        }
    }
}

/// Exit code for any error bubbling out of a command handler
pub fn exit_code_for(err: &anyhow::Error) -> i32
{
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ReproError>())
        .map(ReproError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}
