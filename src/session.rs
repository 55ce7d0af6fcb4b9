//! One interactive prediction session.
//!
//! Each submission runs load, prepare, predict, record and measure to
//! completion before returning. The session owns the history; the artifact
//! store is borrowed so it can outlive any number of sessions.

use crate::error::PipelineError;
use crate::history::{HistoryLedger, HistoryRow};
use crate::input::RawInput;
use crate::loader::ArtifactStore;
use crate::monitor::{HostMetrics, SystemSnapshot};
use crate::predictor::predict_price;
use crate::sequence::prepare_sequence;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything one successful submission displays.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionReport {
    pub input: RawInput,
    pub prediction: f64,

    /// Wall-clock time from loaded artifacts to recorded prediction.
    /// Artifact loading is not included.
    pub runtime: Duration,

    pub system: SystemSnapshot,
}

/// Interaction handler owning the session's history.
pub struct PredictionSession<M: HostMetrics> {
    history: HistoryLedger,
    metrics: M,
}

impl<M: HostMetrics> PredictionSession<M> {
    pub fn new(metrics: M) -> Self {
        Self {
            history: HistoryLedger::new(),
            metrics,
        }
    }

    /// Run one submission through the pipeline.
    ///
    /// History gains exactly one row on success and is untouched on error.
    pub fn submit(
        &mut self,
        store: &ArtifactStore,
        input: RawInput,
    ) -> Result<PredictionReport, PipelineError> {
        let artifacts = store.get()?;
        let start = Instant::now();
        let sequence_length = store.config().model.sequence_length;

        let prediction = prepare_sequence(&input, artifacts.scaler(), sequence_length)
            .and_then(|prepared| predict_price(artifacts.model(), &prepared, artifacts.scaler()))
            .map_err(PipelineError::InferencePipeline)?;

        self.history.append(HistoryRow::new(&input, prediction));
        let runtime = start.elapsed();

        let system = self.metrics.sample();
        info!(
            open = input.open(),
            high = input.high(),
            low = input.low(),
            prediction,
            runtime_ms = runtime.as_millis() as u64,
            "prediction recorded"
        );
        debug!(rows = self.history.len(), "history updated");

        Ok(PredictionReport {
            input,
            prediction,
            runtime,
            system,
        })
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::loader::Artifacts;
    use crate::model::{ModelOutput, SequenceModel};
    use crate::scaler::MinMaxScaler;
    use crate::sequence::PreparedSequence;
    use std::path::PathBuf;

    struct FixedMetrics;

    impl HostMetrics for FixedMetrics {
        fn sample(&mut self) -> SystemSnapshot {
            SystemSnapshot {
                cpu_percent: 12.5,
                memory_percent: 40.0,
            }
        }
    }

    /// Echoes the scaled Open value back as the prediction.
    struct EchoOpenModel;

    impl SequenceModel for EchoOpenModel {
        fn infer(&self, input: &PreparedSequence) -> crate::Result<ModelOutput> {
            Ok(ModelOutput {
                prediction: vec![input.sequence[[0, 0, 0]]],
                shape: vec![1, 1],
                attention: None,
            })
        }
    }

    /// Takes a fixed time per forward pass.
    struct SlowModel(Duration);

    impl SequenceModel for SlowModel {
        fn infer(&self, _input: &PreparedSequence) -> crate::Result<ModelOutput> {
            std::thread::sleep(self.0);
            Ok(ModelOutput {
                prediction: vec![0.5],
                shape: vec![1, 1],
                attention: None,
            })
        }
    }

    struct FailingModel;

    impl SequenceModel for FailingModel {
        fn infer(&self, _input: &PreparedSequence) -> crate::Result<ModelOutput> {
            anyhow::bail!("forward pass exploded")
        }
    }

    fn store_with(model: Box<dyn SequenceModel>) -> ArtifactStore {
        ArtifactStore::preloaded(
            Config::default(),
            Artifacts::new(model, MinMaxScaler::identity(4)),
        )
    }

    #[test]
    fn test_submit_records_history() {
        let store = store_with(Box::new(EchoOpenModel));
        let mut session = PredictionSession::new(FixedMetrics);

        let report = session
            .submit(&store, RawInput::new(100.0, 105.0, 98.0))
            .unwrap();

        assert_eq!(report.prediction, 100.0);
        assert_eq!(report.system.cpu_percent, 12.5);
        assert_eq!(report.system.memory_percent, 40.0);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().last().unwrap().prediction, 100.0);
    }

    #[test]
    fn test_runtime_covers_inference() {
        let store = store_with(Box::new(SlowModel(Duration::from_millis(20))));
        let mut session = PredictionSession::new(FixedMetrics);

        let report = session
            .submit(&store, RawInput::new(100.0, 105.0, 98.0))
            .unwrap();

        assert!(report.runtime >= Duration::from_millis(20));
        assert!(report.runtime < Duration::from_secs(5));
    }

    #[test]
    fn test_history_in_submission_order() {
        let store = store_with(Box::new(EchoOpenModel));
        let mut session = PredictionSession::new(FixedMetrics);

        for open in [10.0, 30.0, 20.0] {
            session
                .submit(&store, RawInput::new(open, open, open))
                .unwrap();
        }

        let predictions: Vec<f64> = session.history().iter().map(|r| r.prediction).collect();
        assert_eq!(predictions, vec![10.0, 30.0, 20.0]);
    }

    #[test]
    fn test_model_failure_leaves_history_unchanged() {
        let good = store_with(Box::new(EchoOpenModel));
        let bad = store_with(Box::new(FailingModel));
        let mut session = PredictionSession::new(FixedMetrics);

        session.submit(&good, RawInput::new(1.0, 2.0, 3.0)).unwrap();
        let err = session.submit(&bad, RawInput::new(4.0, 5.0, 6.0)).unwrap_err();

        assert!(matches!(err, PipelineError::InferencePipeline(_)));
        assert!(err.to_string().contains("forward pass exploded"));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_missing_artifacts_halt_before_prediction() {
        let mut config = Config::default();
        config.artifacts.dir = PathBuf::from("/no/such/artifacts");
        let store = ArtifactStore::new(config);
        let mut session = PredictionSession::new(FixedMetrics);

        let err = session
            .submit(&store, RawInput::new(100.0, 105.0, 98.0))
            .unwrap_err();

        assert!(err.is_artifact_load());
        assert!(session.history().is_empty());
    }
}
