//! Initialize-once access to the model and scaler artifacts.
//!
//! The store is created cheaply at startup and loads nothing until the first
//! interaction asks for the artifacts. A successful load is kept for the
//! lifetime of the store; a failed one is not cached, so the next interaction
//! tries again.

use crate::config::Config;
use crate::error::PipelineError;
use crate::model::{OnnxSequenceModel, SequenceModel};
use crate::scaler::MinMaxScaler;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A loaded model together with the scaler it was trained against.
pub struct Artifacts {
    model: Box<dyn SequenceModel>,
    scaler: MinMaxScaler,
}

impl Artifacts {
    pub fn new(model: Box<dyn SequenceModel>, scaler: MinMaxScaler) -> Self {
        Self { model, scaler }
    }

    /// Read both artifacts from the locations named in `config`.
    pub fn load(config: &Config) -> Result<Self, PipelineError> {
        let scaler_path = config.artifacts.scaler_path();
        let model_path = config.artifacts.model_path();

        let scaler = load_artifact(&scaler_path, MinMaxScaler::load)?;
        if scaler.width() != config.model.num_features {
            return Err(PipelineError::ArtifactLoad {
                path: scaler_path,
                source: anyhow::anyhow!(
                    "scaler was fitted on {} columns, model expects {}",
                    scaler.width(),
                    config.model.num_features
                ),
            });
        }

        let model = load_artifact(&model_path, |path| {
            OnnxSequenceModel::load(path, &config.model)
        })?;

        Ok(Self::new(Box::new(model), scaler))
    }

    pub fn model(&self) -> &dyn SequenceModel {
        self.model.as_ref()
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }
}

fn load_artifact<T>(
    path: &Path,
    load: impl FnOnce(&Path) -> crate::Result<T>,
) -> Result<T, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::ArtifactLoad {
            path: path.to_path_buf(),
            source: anyhow::anyhow!("file not found"),
        });
    }
    load(path).map_err(|source| PipelineError::ArtifactLoad {
        path: path.to_path_buf(),
        source,
    })
}

/// Lazily loaded, process-lifetime artifact handle.
pub struct ArtifactStore {
    config: Config,
    cell: OnceCell<Artifacts>,
}

impl ArtifactStore {
    /// Create a store that loads from `config` on first use.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Create a store that already holds `artifacts`.
    pub fn preloaded(config: Config, artifacts: Artifacts) -> Self {
        Self {
            config,
            cell: OnceCell::with_value(artifacts),
        }
    }

    /// Return the artifacts, loading them on first call.
    pub fn get(&self) -> Result<&Artifacts, PipelineError> {
        self.cell.get_or_try_init(|| {
            info!(dir = %self.config.artifacts.dir.display(), "loading model and scaler");
            Artifacts::load(&self.config).map_err(|e| {
                warn!(error = %e, "artifact load failed");
                e
            })
        })
    }

    /// Whether artifacts have been loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory the artifacts are read from.
    pub fn artifact_dir(&self) -> PathBuf {
        self.config.artifacts.dir.clone()
    }
}
