//! Close-price inference from a single OHLC observation.
//!
//! This crate turns one (Open, High, Low) submission into a predicted Close
//! using a pretrained LSTM-with-attention model exported to ONNX and the
//! min-max scaler it was trained with. Predictions are kept in a
//! session-scoped history alongside host CPU/memory readings.

pub mod config;
pub mod error;
pub mod history;
pub mod input;
pub mod loader;
pub mod model;
pub mod monitor;
pub mod predictor;
pub mod scaler;
pub mod sequence;
pub mod session;

pub use config::Config;
pub use error::PipelineError;
pub use history::{HistoryLedger, HistoryRow};
pub use input::RawInput;
pub use loader::{ArtifactStore, Artifacts};
pub use model::{ModelOutput, OnnxSequenceModel, SequenceModel};
pub use monitor::{HostMetrics, SystemMonitor, SystemSnapshot};
pub use predictor::{predict_price, predict_prices};
pub use scaler::MinMaxScaler;
pub use sequence::{prepare_sequence, PreparedSequence};
pub use session::{PredictionReport, PredictionSession};

/// Library-wide error type.
pub type Result<T> = anyhow::Result<T>;
