//! Sequence model interface and the ONNX Runtime backend.
//!
//! The trained LSTM-with-attention network is opaque to this crate: it takes
//! the full sequence plus the High and Low channels and returns a price
//! prediction, optionally alongside its attention weights.

use crate::config::ModelConfig;
use crate::sequence::PreparedSequence;
use crate::Result;
use anyhow::Context;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tracing::debug;

/// Raw output of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    /// Primary output, flattened in row-major order. One value per time
    /// step for models that predict every step, a single value otherwise.
    pub prediction: Vec<f32>,

    /// Shape the primary output had before flattening: `(1, N, 1)` or
    /// `(1, N)`
    pub shape: Vec<usize>,

    /// Secondary output (attention weights), if the model exposes one
    pub attention: Option<Vec<f32>>,
}

impl ModelOutput {
    /// Check that the primary output is one batch of scalar predictions
    /// and that `shape` agrees with the flattened data.
    pub fn validate(&self) -> Result<()> {
        let per_step = match self.shape.as_slice() {
            [1, n] => *n,
            [1, n, 1] => *n,
            other => anyhow::bail!(
                "unexpected prediction shape {other:?}, expected (1, N, 1) or (1, N)"
            ),
        };
        if per_step != self.prediction.len() {
            anyhow::bail!(
                "prediction shape {:?} does not match {} values",
                self.shape,
                self.prediction.len()
            );
        }
        Ok(())
    }
}

/// A trained sequence model used for inference only.
///
/// Implementations must not change observable state across calls: identical
/// inputs yield identical outputs.
pub trait SequenceModel: Send + Sync {
    fn infer(&self, input: &PreparedSequence) -> Result<ModelOutput>;
}

/// Sequence model backed by an ONNX Runtime session.
pub struct OnnxSequenceModel {
    /// `Session::run` needs exclusive access
    session: Mutex<Session>,

    sequence_input: String,
    aux_high_input: String,
    aux_low_input: String,
    prediction_output: String,
    attention_output: String,
}

impl OnnxSequenceModel {
    /// Load an ONNX model for inference.
    ///
    /// # Example
    /// ```no_run
    /// use close_inference::{config::ModelConfig, OnnxSequenceModel};
    /// use std::path::Path;
    ///
    /// let model = OnnxSequenceModel::load(
    ///     Path::new("artifacts/lstm_model.onnx"),
    ///     &ModelConfig::default(),
    /// ).unwrap();
    /// ```
    pub fn load(model_path: &Path, config: &ModelConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(if config.optimize_graph {
                GraphOptimizationLevel::Level3
            } else {
                GraphOptimizationLevel::Level1
            })?
            .with_intra_threads(config.intra_threads.max(1))?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ONNX model {}", model_path.display()))?;

        debug!(path = %model_path.display(), "ONNX session ready");

        Ok(Self {
            session: Mutex::new(session),
            sequence_input: config.sequence_input.clone(),
            aux_high_input: config.aux_high_input.clone(),
            aux_low_input: config.aux_low_input.clone(),
            prediction_output: config.prediction_output.clone(),
            attention_output: config.attention_output.clone(),
        })
    }

    /// Pull the primary and secondary outputs out of a finished run.
    fn parse_outputs(&self, outputs: &SessionOutputs) -> Result<ModelOutput> {
        let output = outputs.get(&self.prediction_output).ok_or_else(|| {
            anyhow::anyhow!("model has no output named {:?}", self.prediction_output)
        })?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .context("prediction output is not an f32 tensor")?;

        let attention = outputs
            .get(&self.attention_output)
            .and_then(|value| value.try_extract_tensor::<f32>().ok())
            .map(|(_, weights)| weights.to_vec());

        Ok(ModelOutput {
            prediction: data.to_vec(),
            shape: shape.iter().map(|&d| d.max(0) as usize).collect(),
            attention,
        })
    }
}

impl SequenceModel for OnnxSequenceModel {
    fn infer(&self, input: &PreparedSequence) -> Result<ModelOutput> {
        let sequence = Tensor::from_array(input.sequence.clone())?;
        let aux_high = Tensor::from_array(input.aux_high.clone())?;
        let aux_low = Tensor::from_array(input.aux_low.clone())?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            self.sequence_input.as_str() => sequence,
            self.aux_high_input.as_str() => aux_high,
            self.aux_low_input.as_str() => aux_low,
        ])?;

        self.parse_outputs(&outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(shape: Vec<usize>, len: usize) -> ModelOutput {
        ModelOutput {
            prediction: vec![0.5; len],
            shape,
            attention: None,
        }
    }

    #[test]
    fn test_output_shapes_accepted() {
        assert!(output(vec![1, 20, 1], 20).validate().is_ok());
        assert!(output(vec![1, 20], 20).validate().is_ok());
        assert!(output(vec![1, 1], 1).validate().is_ok());
    }

    #[test]
    fn test_output_shapes_rejected() {
        assert!(output(vec![2, 20, 1], 40).validate().is_err());
        assert!(output(vec![1, 20, 4], 80).validate().is_err());
        assert!(output(vec![20], 20).validate().is_err());
        assert!(output(vec![1, 20, 1], 19).validate().is_err());
    }

    #[test]
    fn test_load_missing_model() {
        let result = OnnxSequenceModel::load(
            Path::new("/no/such/dir/lstm_model.onnx"),
            &ModelConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_garbage_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lstm_model.onnx");
        std::fs::write(&path, b"definitely not protobuf").unwrap();

        let result = OnnxSequenceModel::load(&path, &ModelConfig::default());
        assert!(result.is_err());
    }
}
