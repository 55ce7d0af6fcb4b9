//! User-supplied observation.

use crate::Result;
use serde::{Deserialize, Serialize};

/// Smallest accepted price.
pub const INPUT_MIN: f64 = 0.0;

/// Largest accepted price.
pub const INPUT_MAX: f64 = 10_000.0;

/// One submitted (Open, High, Low) observation.
///
/// Each field is clamped to `[INPUT_MIN, INPUT_MAX]` independently on
/// construction, so downstream stages never see out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "InputFields")]
pub struct RawInput {
    open: f64,
    high: f64,
    low: f64,
}

/// Unchecked wire form of [`RawInput`].
#[derive(Deserialize)]
struct InputFields {
    open: f64,
    high: f64,
    low: f64,
}

impl From<InputFields> for RawInput {
    fn from(fields: InputFields) -> Self {
        RawInput::new(fields.open, fields.high, fields.low)
    }
}

fn clamp_price(value: f64) -> f64 {
    if value.is_nan() {
        INPUT_MIN
    } else {
        value.clamp(INPUT_MIN, INPUT_MAX)
    }
}

impl RawInput {
    pub fn new(open: f64, high: f64, low: f64) -> Self {
        Self {
            open: clamp_price(open),
            high: clamp_price(high),
            low: clamp_price(low),
        }
    }

    /// Parse `open high low` from one line of text.
    ///
    /// Fields may be separated by whitespace and/or commas.
    pub fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .collect();

        if fields.len() != 3 {
            anyhow::bail!("expected 3 values (open high low), got {}", fields.len());
        }

        let mut values = [0.0f64; 3];
        for (slot, (name, raw)) in values.iter_mut().zip(["open", "high", "low"].iter().zip(&fields)) {
            *slot = raw
                .parse::<f64>()
                .map_err(|e| anyhow::anyhow!("invalid {name} value {raw:?}: {e}"))?;
        }

        Ok(Self::new(values[0], values[1], values[2]))
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }
}
