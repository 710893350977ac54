//! Normalizes a date's terminal outcome into its final records.

use chrono::NaiveDate;

use crate::retry::DateOutcome;
use crate::types::PriceRecord;

/// Turns each date's outcome into either priced records or exactly one
/// unavailable/error record.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    default_currency: String,
}

impl ResultAggregator {
    pub fn new(default_currency: impl Into<String>) -> Self {
        Self {
            default_currency: default_currency.into(),
        }
    }

    /// Final records for `date`.
    ///
    /// Emptiness is judged on this date's batch alone.
    pub fn finalize(&self, date: NaiveDate, outcome: DateOutcome) -> Vec<PriceRecord> {
        match outcome {
            DateOutcome::Done(records) if !records.is_empty() => records,
            DateOutcome::Done(_) | DateOutcome::Unavailable => {
                vec![PriceRecord::unavailable(date, self.default_currency.as_str())]
            }
            DateOutcome::Errored(kind) => vec![PriceRecord::errored(
                date,
                self.default_currency.as_str(),
                kind.label(),
            )],
        }
    }
}
