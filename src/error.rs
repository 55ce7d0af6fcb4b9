//! Errors surfaced to the user by one interaction.

use std::path::PathBuf;
use thiserror::Error;

/// Why an interaction produced no prediction.
///
/// Internals report failures as [`anyhow::Error`]; the session sorts them
/// into one of these two kinds before they reach the user.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A model or scaler artifact is missing or unreadable. Nothing past
    /// the loader runs.
    #[error("error loading model or scaler from {}: {source:#}", .path.display())]
    ArtifactLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Scaling, tensor construction, model evaluation or the inverse
    /// transform failed. History is left untouched.
    #[error("an error occurred during prediction: {0:#}")]
    InferencePipeline(#[source] anyhow::Error),
}

impl PipelineError {
    pub fn is_artifact_load(&self) -> bool {
        matches!(self, PipelineError::ArtifactLoad { .. })
    }
}
