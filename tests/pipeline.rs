//! End-to-end checks of the prediction pipeline with in-process models.

use approx::assert_abs_diff_eq;
use close_inference::{
    prepare_sequence, predict_price, ArtifactStore, Artifacts, Config, HostMetrics, MinMaxScaler,
    ModelOutput, PipelineError, PredictionSession, PreparedSequence, RawInput, SequenceModel,
    SystemSnapshot,
};
use ndarray::{array, s};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SCALER_JSON: &str = r#"{
    "min_": [-0.5, -0.5, -0.5, -0.25],
    "scale_": [0.005, 0.005, 0.005, 0.0025],
    "data_min_": [100.0, 100.0, 100.0, 100.0],
    "data_max_": [300.0, 300.0, 300.0, 500.0],
    "data_range_": [200.0, 200.0, 200.0, 400.0],
    "feature_range": [0.0, 1.0],
    "n_features_in_": 4
}"#;

struct QuietMetrics;

impl HostMetrics for QuietMetrics {
    fn sample(&mut self) -> SystemSnapshot {
        SystemSnapshot {
            cpu_percent: 0.0,
            memory_percent: 0.0,
        }
    }
}

/// Predicts the scaled High at every step and counts its calls.
struct HighModel {
    calls: Arc<AtomicUsize>,
}

impl SequenceModel for HighModel {
    fn infer(&self, input: &PreparedSequence) -> close_inference::Result<ModelOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(input.sequence.shape(), &[1, 20, 4]);
        assert_eq!(input.aux_high.shape(), &[1, 20, 1]);
        assert_eq!(input.aux_low.shape(), &[1, 20, 1]);

        let prediction = input.aux_high.iter().copied().collect::<Vec<f32>>();
        Ok(ModelOutput {
            shape: vec![1, prediction.len(), 1],
            prediction,
            attention: Some(vec![0.05; 20]),
        })
    }
}

/// Fails on any input whose Open exceeds 1000.
struct PickyModel;

impl SequenceModel for PickyModel {
    fn infer(&self, input: &PreparedSequence) -> close_inference::Result<ModelOutput> {
        // Scaled Open of 1000 is 4.5 with this scaler
        if input.sequence[[0, 0, 0]] > 4.5 {
            anyhow::bail!("input outside training distribution");
        }
        Ok(ModelOutput {
            prediction: vec![0.5],
            shape: vec![1, 1],
            attention: None,
        })
    }
}

fn scaler() -> MinMaxScaler {
    MinMaxScaler::from_json_str(SCALER_JSON).unwrap()
}

#[test]
fn scaled_sequence_matches_scaler() {
    let scaler = scaler();
    let prepared = prepare_sequence(&RawInput::new(200.0, 250.0, 150.0), &scaler, 20).unwrap();

    let expected = scaler
        .transform(&array![[200.0, 250.0, 150.0, 0.0]])
        .unwrap()
        .mapv(|v| v as f32);

    for t in 0..20 {
        assert_eq!(prepared.sequence.slice(s![0, t, ..]), expected.row(0));
    }
    assert_eq!(prepared.sequence[[0, 0, 3]], -0.25);
}

#[test]
fn prediction_is_inverse_scaled_on_close_column() {
    let scaler = scaler();
    let calls = Arc::new(AtomicUsize::new(0));
    let model = HighModel {
        calls: Arc::clone(&calls),
    };

    // High 250 scales to 0.75; on the Close column 0.75 inverts to 400
    let prepared = prepare_sequence(&RawInput::new(200.0, 250.0, 150.0), &scaler, 20).unwrap();
    let price = predict_price(&model, &prepared, &scaler).unwrap();

    assert_abs_diff_eq!(price, 400.0, epsilon = 1e-3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn session_history_tracks_only_successes() {
    let store = ArtifactStore::preloaded(
        Config::default(),
        Artifacts::new(Box::new(PickyModel), scaler()),
    );
    let mut session = PredictionSession::new(QuietMetrics);

    let inputs = [
        RawInput::new(100.0, 110.0, 95.0),
        RawInput::new(5000.0, 5100.0, 4900.0),
        RawInput::new(200.0, 210.0, 190.0),
        RawInput::new(300.0, 310.0, 290.0),
    ];

    let mut failures = 0;
    for input in inputs {
        match session.submit(&store, input) {
            Ok(report) => assert_abs_diff_eq!(report.prediction, 300.0, epsilon = 1e-9),
            Err(PipelineError::InferencePipeline(_)) => failures += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(failures, 1);
    let opens: Vec<f64> = session.history().iter().map(|r| r.open).collect();
    assert_eq!(opens, vec![100.0, 200.0, 300.0]);
}

#[test]
fn repeated_predictions_are_identical() {
    let store = ArtifactStore::preloaded(
        Config::default(),
        Artifacts::new(
            Box::new(HighModel {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            scaler(),
        ),
    );
    let mut session = PredictionSession::new(QuietMetrics);

    let input = RawInput::new(123.4, 145.6, 111.1);
    let a = session.submit(&store, input).unwrap().prediction;
    let b = session.submit(&store, input).unwrap().prediction;

    assert_eq!(a.to_bits(), b.to_bits());
    assert_eq!(session.history().len(), 2);
}

#[test]
fn missing_artifacts_never_reach_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.artifacts.dir = dir.path().to_path_buf();
    std::fs::write(config.artifacts.scaler_path(), SCALER_JSON).unwrap();

    let store = ArtifactStore::new(config);
    let mut session = PredictionSession::new(QuietMetrics);

    let err = session
        .submit(&store, RawInput::new(100.0, 105.0, 98.0))
        .unwrap_err();

    match err {
        PipelineError::ArtifactLoad { path, .. } => {
            assert!(path.ends_with("lstm_model.onnx"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(session.history().is_empty());
}
