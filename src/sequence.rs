//! Model input preparation.
//!
//! The model expects a time dimension even though a submission is a single
//! observation. The observation is scaled once and replicated across every
//! time step, and the High and Low columns are additionally handed to the
//! model as separate single-feature channels for its attention block.
//!
//! The Close column is unknown at prediction time and is filled with a raw
//! `0.0` before scaling, because the scaler was fitted on four columns.

use crate::input::RawInput;
use crate::scaler::MinMaxScaler;
use crate::Result;
use ndarray::{s, Array2, Array3, Axis};

/// Column index of Open in a model row.
pub const OPEN_COLUMN: usize = 0;
/// Column index of High in a model row.
pub const HIGH_COLUMN: usize = 1;
/// Column index of Low in a model row.
pub const LOW_COLUMN: usize = 2;
/// Column index of Close in a model row.
pub const CLOSE_COLUMN: usize = 3;

/// Raw value standing in for the unknown Close before scaling.
pub const CLOSE_PLACEHOLDER: f64 = 0.0;

/// Tensors fed to the model for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSequence {
    /// Shape `(1, sequence_length, 4)`
    pub sequence: Array3<f32>,

    /// High channel, shape `(1, sequence_length, 1)`
    pub aux_high: Array3<f32>,

    /// Low channel, shape `(1, sequence_length, 1)`
    pub aux_low: Array3<f32>,
}

impl PreparedSequence {
    pub fn sequence_length(&self) -> usize {
        self.sequence.len_of(Axis(1))
    }
}

/// Build the raw 4-wide row `[open, high, low, placeholder]`.
pub fn raw_row(input: &RawInput) -> Array2<f64> {
    let mut row = Array2::<f64>::zeros((1, CLOSE_COLUMN + 1));
    row[[0, OPEN_COLUMN]] = input.open();
    row[[0, HIGH_COLUMN]] = input.high();
    row[[0, LOW_COLUMN]] = input.low();
    row[[0, CLOSE_COLUMN]] = CLOSE_PLACEHOLDER;
    row
}

/// Scale one observation and lay it out as model input.
///
/// Pure: the same input and scaler always produce identical tensors.
pub fn prepare_sequence(
    input: &RawInput,
    scaler: &MinMaxScaler,
    sequence_length: usize,
) -> Result<PreparedSequence> {
    if sequence_length == 0 {
        anyhow::bail!("sequence_length must be at least 1");
    }

    let scaled = scaler.transform(&raw_row(input))?;
    let num_features = scaled.ncols();
    if num_features <= LOW_COLUMN {
        anyhow::bail!("scaled row has {num_features} columns, expected at least {}", LOW_COLUMN + 1);
    }

    // Cast once, then broadcast the single row across every time step
    let step = scaled.row(0).mapv(|v| v as f32);
    let sequence = step
        .broadcast((1, sequence_length, num_features))
        .ok_or_else(|| anyhow::anyhow!("failed to broadcast observation to sequence"))?
        .to_owned();

    let aux_high = sequence.slice(s![.., .., HIGH_COLUMN..HIGH_COLUMN + 1]).to_owned();
    let aux_low = sequence.slice(s![.., .., LOW_COLUMN..LOW_COLUMN + 1]).to_owned();

    Ok(PreparedSequence {
        sequence,
        aux_high,
        aux_low,
    })
}
