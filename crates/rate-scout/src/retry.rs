//! Per-date attempt/retry state machine.
//!
//! ```text
//! Init -> Navigating -> Extracting -> Finished(Unavailable | Done)
//!             |             |
//!             +--failure----+--> Retrying -> Navigating (attempt + 1)
//!                           |
//!                           +--> Finished(Errored)   when attempts are spent
//! ```

use std::time::Duration;

use chrono::NaiveDate;

use crate::config::ScanConfig;
use crate::error::NavigationError;
use crate::events::{EventSink, ScanEvent};
use crate::extract::{ExtractionPipeline, PageExtraction};
use crate::popup::PopupDismisser;
use crate::renderer::BrowserPage;
use crate::types::{PriceRecord, RoomTypeFilter};

/// Fixed-delay retry bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never below 1.
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Why the last attempt for a date failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Failed(String),
}

impl FailureKind {
    /// Stable label stored in error records.
    pub fn label(&self) -> &str {
        match self {
            Self::Timeout => "timeout",
            Self::Failed(description) => description,
        }
    }
}

impl From<NavigationError> for FailureKind {
    fn from(e: NavigationError) -> Self {
        match e {
            NavigationError::Timeout { .. } => Self::Timeout,
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Terminal outcome of one date.
#[derive(Debug, Clone, PartialEq)]
pub enum DateOutcome {
    /// The page said nothing is bookable.
    Unavailable,
    /// Extraction ran; the records may be empty.
    Done(Vec<PriceRecord>),
    /// Every attempt failed.
    Errored(FailureKind),
}

impl DateOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Done(_) => "done",
            Self::Errored(_) => "errored",
        }
    }
}

/// Outcome of a date plus the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct DateReport {
    pub outcome: DateOutcome,
    pub attempts: u32,
}

#[derive(Debug)]
enum AttemptState {
    Init,
    Navigating { attempt: u32 },
    Extracting { attempt: u32 },
    Retrying { attempt: u32 },
    Finished(DateOutcome),
}

/// Drives navigation, popup dismissal and extraction for one date at a time.
#[derive(Debug, Clone)]
pub struct RetryOrchestrator {
    policy: RetryPolicy,
    navigation_timeout_ms: u64,
    settle_delay: Duration,
    dismisser: PopupDismisser,
    pipeline: ExtractionPipeline,
}

impl RetryOrchestrator {
    pub fn new(config: &ScanConfig, pipeline: ExtractionPipeline) -> Self {
        let dismisser = PopupDismisser::new(
            pipeline.profile().consent_selectors.clone(),
            config.popup_timeout_ms,
        );
        Self {
            policy: RetryPolicy::fixed(config.max_attempts, config.retry_delay()),
            navigation_timeout_ms: config.navigation_timeout_ms,
            settle_delay: config.settle_delay(),
            dismisser,
            pipeline,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn pipeline(&self) -> &ExtractionPipeline {
        &self.pipeline
    }

    /// Run the full attempt cycle for `date` against `url`.
    pub async fn scrape_date(
        &self,
        page: &mut dyn BrowserPage,
        date: NaiveDate,
        url: &str,
        filter: &RoomTypeFilter,
        sink: &dyn EventSink,
    ) -> DateReport {
        let mut state = AttemptState::Init;
        let mut attempts = 0;

        loop {
            state = match state {
                AttemptState::Init => AttemptState::Navigating { attempt: 1 },

                AttemptState::Navigating { attempt } => {
                    attempts = attempt;
                    sink.emit(ScanEvent::AttemptStarted { date, attempt });
                    match page.navigate(url, self.navigation_timeout_ms).await {
                        Ok(()) => AttemptState::Extracting { attempt },
                        Err(e) => self.on_failure(date, attempt, e.into(), sink),
                    }
                }

                AttemptState::Extracting { attempt } => {
                    if !self.settle_delay.is_zero() {
                        tokio::time::sleep(self.settle_delay).await;
                    }
                    self.dismisser.dismiss(&*page, sink).await;
                    match self.pipeline.extract(&*page, date, filter, sink).await {
                        Ok(PageExtraction::NoAvailability) => {
                            AttemptState::Finished(DateOutcome::Unavailable)
                        }
                        Ok(PageExtraction::Blocks(records)) => {
                            AttemptState::Finished(DateOutcome::Done(records))
                        }
                        Err(e) => {
                            self.on_failure(date, attempt, FailureKind::Failed(e.to_string()), sink)
                        }
                    }
                }

                AttemptState::Retrying { attempt } => {
                    if !self.policy.delay().is_zero() {
                        tokio::time::sleep(self.policy.delay()).await;
                    }
                    AttemptState::Navigating {
                        attempt: attempt + 1,
                    }
                }

                AttemptState::Finished(outcome) => {
                    return DateReport { outcome, attempts };
                }
            };
        }
    }

    fn on_failure(
        &self,
        date: NaiveDate,
        attempt: u32,
        kind: FailureKind,
        sink: &dyn EventSink,
    ) -> AttemptState {
        let will_retry = self.policy.allows_retry(attempt);
        sink.emit(ScanEvent::AttemptFailed {
            date,
            attempt,
            error: kind.label().to_string(),
            timed_out: kind == FailureKind::Timeout,
            will_retry,
        });
        if will_retry {
            AttemptState::Retrying { attempt }
        } else {
            AttemptState::Finished(DateOutcome::Errored(kind))
        }
    }
}
