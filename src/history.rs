//! Session-scoped prediction history.
//!
//! An append-only log of every successful prediction in submission order.
//! It lives only as long as the session that owns it and is never written
//! to disk.

use crate::input::RawInput;
use serde::Serialize;

/// One row of the history table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryRow {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub prediction: f64,
}

impl HistoryRow {
    pub fn new(input: &RawInput, prediction: f64) -> Self {
        Self {
            open: input.open(),
            high: input.high(),
            low: input.low(),
            prediction,
        }
    }
}

/// Ordered, append-only history of predictions.
///
/// No deduplication and no capacity limit.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    rows: Vec<HistoryRow>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row at the end of the log.
    pub fn append(&mut self, row: HistoryRow) {
        self.rows.push(row);
    }

    /// All rows, oldest first.
    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    /// Most recent row, if any.
    pub fn last(&self) -> Option<&HistoryRow> {
        self.rows.last()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over rows, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryRow> {
        self.rows.iter()
    }
}
