//! Price prediction from prepared model input.
//!
//! The model works in scaled space. Its output is widened to the scaler's
//! four columns by repetition so the inverse transform can be applied; only
//! the Close column of the result is meaningful.

use crate::model::SequenceModel;
use crate::scaler::MinMaxScaler;
use crate::sequence::PreparedSequence;
use crate::Result;
use anyhow::Context;
use ndarray::Array2;

/// Undo the scaling on raw model output.
///
/// Returns one real-world price per output value.
pub fn inverse_scale_prediction(prediction: &[f32], scaler: &MinMaxScaler) -> Result<Vec<f64>> {
    if prediction.is_empty() {
        anyhow::bail!("model returned an empty prediction");
    }

    let width = scaler.width();
    let widened = Array2::from_shape_fn((prediction.len(), width), |(row, _)| {
        prediction[row] as f64
    });
    let restored = scaler.inverse_transform(&widened)?;

    let prices: Vec<f64> = restored.column(width - 1).to_vec();
    if let Some(bad) = prices.iter().find(|p| !p.is_finite()) {
        anyhow::bail!("inverse transform produced a non-finite price: {bad}");
    }

    Ok(prices)
}

/// Run the model once and return every predicted price, in output order.
pub fn predict_prices(
    model: &dyn SequenceModel,
    input: &PreparedSequence,
    scaler: &MinMaxScaler,
) -> Result<Vec<f64>> {
    let output = model.infer(input).context("model evaluation failed")?;
    output.validate()?;
    inverse_scale_prediction(&output.prediction, scaler)
}

/// Run the model once and return the predicted Close price.
///
/// This is the first value of [`predict_prices`]; the attention output is
/// discarded.
pub fn predict_price(
    model: &dyn SequenceModel,
    input: &PreparedSequence,
    scaler: &MinMaxScaler,
) -> Result<f64> {
    let prices = predict_prices(model, input, scaler)?;
    prices
        .first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("model returned an empty prediction"))
}
