//! Scan events and the sinks that receive them.
//!
//! Every component reports through an [`EventSink`] passed in by the caller,
//! scoped to one run. [`TracingSink`] forwards to `tracing`; [`RecordingSink`]
//! keeps events in memory.

use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::extract::SkipReason;

/// Everything a scan reports while it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScanEvent {
    /// The run has opened its page and is about to scan.
    ScanStarted {
        base_url: String,
        expected_dates: usize,
    },
    /// A navigation attempt for a date has begun.
    AttemptStarted { date: NaiveDate, attempt: u32 },
    /// An attempt failed at navigation or page level.
    AttemptFailed {
        date: NaiveDate,
        attempt: u32,
        error: String,
        timed_out: bool,
        will_retry: bool,
    },
    /// A consent or overlay button was clicked.
    PopupDismissed { selector: String },
    /// Probing a consent selector failed; the page is left as is.
    PopupProbeFailed { selector: String, error: String },
    /// The page says nothing is bookable for the date.
    NoAvailability { date: NaiveDate },
    /// Room blocks were enumerated.
    BlocksFound {
        date: NaiveDate,
        found: usize,
        processed: usize,
        fallback: bool,
    },
    /// A room block produced no record.
    BlockSkipped {
        date: NaiveDate,
        index: usize,
        reason: SkipReason,
    },
    /// A date's records are final.
    DateCompleted {
        date: NaiveDate,
        outcome: String,
        attempts: u32,
        records: usize,
    },
    /// The page could not be closed cleanly at the end of the run.
    SessionCloseFailed { error: String },
    /// The run is over.
    ScanFinished { dates: usize, records: usize },
}

/// Receiver of scan events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ScanEvent);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ScanEvent) {
        match event {
            ScanEvent::ScanStarted {
                base_url,
                expected_dates,
            } => {
                tracing::info!(%base_url, expected_dates, "scan started");
            }
            ScanEvent::AttemptStarted { date, attempt } => {
                tracing::debug!(%date, attempt, "attempt started");
            }
            ScanEvent::AttemptFailed {
                date,
                attempt,
                error,
                timed_out,
                will_retry,
            } => {
                tracing::warn!(%date, attempt, timed_out, will_retry, "attempt failed: {error}");
            }
            ScanEvent::PopupDismissed { selector } => {
                tracing::debug!(%selector, "popup dismissed");
            }
            ScanEvent::PopupProbeFailed { selector, error } => {
                tracing::debug!(%selector, "popup probe failed: {error}");
            }
            ScanEvent::NoAvailability { date } => {
                tracing::info!(%date, "no availability");
            }
            ScanEvent::BlocksFound {
                date,
                found,
                processed,
                fallback,
            } => {
                tracing::debug!(%date, found, processed, fallback, "room blocks found");
            }
            ScanEvent::BlockSkipped {
                date,
                index,
                reason,
            } => {
                tracing::debug!(%date, index, "block skipped: {reason}");
            }
            ScanEvent::DateCompleted {
                date,
                outcome,
                attempts,
                records,
            } => {
                tracing::info!(%date, %outcome, attempts, records, "date completed");
            }
            ScanEvent::SessionCloseFailed { error } => {
                tracing::warn!("failed to close page: {error}");
            }
            ScanEvent::ScanFinished { dates, records } => {
                tracing::info!(dates, records, "scan finished");
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ScanEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScanEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ScanEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.emit(ScanEvent::ScanStarted {
            base_url: "https://example.com".into(),
            expected_dates: 2,
        });
        sink.emit(ScanEvent::ScanFinished {
            dates: 2,
            records: 3,
        });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], ScanEvent::ScanFinished { records: 3, .. }));
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = ScanEvent::NoAvailability {
            date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "NoAvailability");
        assert_eq!(json["date"], "2026-04-02");
    }
}
