//! Runtime configuration.
//!
//! Every field has a default matching the shipped artifacts, so a config file
//! is optional. Files are TOML; missing sections and keys fall back to the
//! defaults.

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the model and scaler artifacts live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory holding both artifacts
    pub dir: PathBuf,

    /// ONNX model file name, relative to `dir`
    pub model_file: String,

    /// Scaler JSON file name, relative to `dir`
    pub scaler_file: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            model_file: "lstm_model.onnx".to_string(),
            scaler_file: "lstm_scaler.json".to_string(),
        }
    }
}

impl ArtifactConfig {
    /// Full path of the model artifact.
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model_file)
    }

    /// Full path of the scaler artifact.
    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(&self.scaler_file)
    }
}

/// Tensor geometry and ONNX session options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of (replicated) time steps fed to the model
    pub sequence_length: usize,

    /// Width of one observation: Open, High, Low, Close
    pub num_features: usize,

    /// Graph input carrying the full sequence
    pub sequence_input: String,

    /// Graph input carrying the High channel
    pub aux_high_input: String,

    /// Graph input carrying the Low channel
    pub aux_low_input: String,

    /// Graph output carrying the price prediction
    pub prediction_output: String,

    /// Graph output carrying attention weights, read when present
    pub attention_output: String,

    /// Enable full graph optimization
    pub optimize_graph: bool,

    /// Intra-op threads for the ONNX session
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sequence_length: 20,
            num_features: 4,
            sequence_input: "sequence".to_string(),
            aux_high_input: "aux_high".to_string(),
            aux_low_input: "aux_low".to_string(),
            prediction_output: "prediction".to_string(),
            attention_output: "attention".to_string(),
            optimize_graph: true,
            intra_threads: 1, // Single-threaded for determinism
        }
    }
}

/// Host metrics sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Window between the two CPU refreshes used to compute utilization
    pub cpu_sample_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cpu_sample_interval_ms: 100,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub artifacts: ArtifactConfig,
    pub model: ModelConfig,
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
