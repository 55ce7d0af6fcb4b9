//! Fitted min-max scaler.
//!
//! The scaler artifact is the JSON dump of a fitted min-max scaler over the
//! columns `[Open, High, Low, Close]`. Attribute names follow scikit-learn's
//! `MinMaxScaler` (`min_`, `scale_`, ...) so the file can be written straight
//! from the training notebook.
//!
//! The same scaler instance must be used for the forward and the inverse
//! transform of one prediction.

use crate::Result;
use anyhow::Context;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// A fitted, reversible per-column affine transform.
///
/// Forward: `x * scale + min`, clamped to `feature_range` when `clip` is
/// set. Inverse: `(x - min) / scale`, never clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    #[serde(rename = "min_")]
    min: Vec<f64>,

    #[serde(rename = "scale_")]
    scale: Vec<f64>,

    #[serde(rename = "data_min_", default, skip_serializing_if = "Option::is_none")]
    data_min: Option<Vec<f64>>,

    #[serde(rename = "data_max_", default, skip_serializing_if = "Option::is_none")]
    data_max: Option<Vec<f64>>,

    #[serde(rename = "data_range_", default, skip_serializing_if = "Option::is_none")]
    data_range: Option<Vec<f64>>,

    #[serde(default = "default_feature_range")]
    feature_range: (f64, f64),

    /// Clamp transformed values to `feature_range`
    #[serde(default)]
    clip: bool,

    #[serde(rename = "n_features_in_", default, skip_serializing_if = "Option::is_none")]
    n_features_in: Option<usize>,
}

impl MinMaxScaler {
    /// Build a scaler from its fitted `min` and `scale` vectors.
    pub fn from_parts(min: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self {
            min,
            scale,
            data_min: None,
            data_max: None,
            data_range: None,
            feature_range: default_feature_range(),
            clip: false,
            n_features_in: None,
        };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Scaler that leaves values unchanged.
    pub fn identity(width: usize) -> Self {
        Self {
            min: vec![0.0; width],
            scale: vec![1.0; width],
            data_min: Some(vec![0.0; width]),
            data_max: Some(vec![1.0; width]),
            data_range: Some(vec![1.0; width]),
            feature_range: default_feature_range(),
            clip: false,
            n_features_in: Some(width),
        }
    }

    /// Fit a scaler to `rows`, mapping each column's observed range onto
    /// `feature_range`. Constant columns get a range of 1.
    pub fn fit(rows: &Array2<f64>, feature_range: (f64, f64)) -> Result<Self> {
        let (lo, hi) = feature_range;
        if lo.is_nan() || hi.is_nan() || lo >= hi {
            anyhow::bail!("feature_range minimum must be below its maximum, got ({lo}, {hi})");
        }
        if rows.nrows() == 0 || rows.ncols() == 0 {
            anyhow::bail!("cannot fit a scaler to an empty matrix");
        }

        let data_min = rows.fold_axis(Axis(0), f64::INFINITY, |acc, &x| acc.min(x));
        let data_max = rows.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &x| acc.max(x));
        let data_range = &data_max - &data_min;

        let scale: Vec<f64> = data_range
            .iter()
            .map(|&r| (hi - lo) / if r == 0.0 { 1.0 } else { r })
            .collect();
        let min: Vec<f64> = data_min
            .iter()
            .zip(&scale)
            .map(|(&dmin, &s)| lo - dmin * s)
            .collect();

        let scaler = Self {
            min,
            scale,
            data_min: Some(data_min.to_vec()),
            data_max: Some(data_max.to_vec()),
            data_range: Some(data_range.to_vec()),
            feature_range,
            clip: false,
            n_features_in: Some(rows.ncols()),
        };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Parse a scaler from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let scaler: Self = serde_json::from_str(json).context("malformed scaler JSON")?;
        scaler.validate()?;
        Ok(scaler)
    }

    /// Read a scaler artifact from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scaler {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Serialize to the artifact JSON form.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of columns the scaler was fitted on.
    pub fn width(&self) -> usize {
        self.scale.len()
    }

    pub fn feature_range(&self) -> (f64, f64) {
        self.feature_range
    }

    /// Clamp forward-transformed values to `feature_range`.
    pub fn with_clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    pub fn clip(&self) -> bool {
        self.clip
    }

    fn validate(&self) -> Result<()> {
        let (lo, hi) = self.feature_range;
        if lo.is_nan() || hi.is_nan() || lo >= hi {
            anyhow::bail!("feature_range minimum must be below its maximum, got ({lo}, {hi})");
        }
        if self.scale.is_empty() {
            anyhow::bail!("scaler has no columns");
        }
        if self.min.len() != self.scale.len() {
            anyhow::bail!(
                "scaler min_ has {} columns but scale_ has {}",
                self.min.len(),
                self.scale.len()
            );
        }
        if let Some(n) = self.n_features_in {
            if n != self.scale.len() {
                anyhow::bail!("scaler declares {} features but has {} columns", n, self.scale.len());
            }
        }
        for (i, (&m, &s)) in self.min.iter().zip(&self.scale).enumerate() {
            if !s.is_finite() || s == 0.0 {
                anyhow::bail!("scaler column {i} has unusable scale {s}");
            }
            if !m.is_finite() {
                anyhow::bail!("scaler column {i} has non-finite min {m}");
            }
        }
        Ok(())
    }

    fn check_width(&self, rows: &Array2<f64>) -> Result<()> {
        if rows.ncols() != self.width() {
            anyhow::bail!(
                "scaler expects {} columns, got {}",
                self.width(),
                rows.ncols()
            );
        }
        Ok(())
    }

    /// Forward transform, row by row.
    pub fn transform(&self, rows: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(rows)?;
        let min = ArrayView1::from(&self.min);
        let scale = ArrayView1::from(&self.scale);
        let scaled = rows * &scale + &min;
        if self.clip {
            let (lo, hi) = self.feature_range;
            return Ok(scaled.mapv_into(|v| v.clamp(lo, hi)));
        }
        Ok(scaled)
    }

    /// Inverse transform, row by row.
    pub fn inverse_transform(&self, rows: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(rows)?;
        let min = ArrayView1::from(&self.min);
        let scale = ArrayView1::from(&self.scale);
        Ok((rows - &min) / &scale)
    }
}
