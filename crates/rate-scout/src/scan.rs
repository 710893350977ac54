//! The run loop: one page, dates in order, one record set per date.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::aggregate::ResultAggregator;
use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::events::{EventSink, ScanEvent};
use crate::extract::ExtractionPipeline;
use crate::profile::ExtractionProfile;
use crate::renderer::{BrowserPage, PageRenderer};
use crate::retry::RetryOrchestrator;
use crate::types::{DateWindow, PriceRecord, RoomTypeFilter};

/// Query keys owned by [`StayQuery`].
const STAY_KEYS: [&str; 5] = [
    "checkin",
    "checkout",
    "group_adults",
    "group_children",
    "no_rooms",
];

/// Occupancy sent with every search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayQuery {
    pub adults: u32,
    pub children: u32,
    pub rooms: u32,
}

impl Default for StayQuery {
    fn default() -> Self {
        Self {
            adults: 2,
            children: 0,
            rooms: 1,
        }
    }
}

impl StayQuery {
    /// `base` with the stay's dates and occupancy as query parameters.
    ///
    /// Stay keys already present in `base` are replaced; every other pair is
    /// kept in its original order.
    pub fn url_for(&self, base: &Url, window: &DateWindow) -> Url {
        let kept: Vec<(String, String)> = base
            .query_pairs()
            .filter(|(key, _)| !STAY_KEYS.iter().any(|stay| key == stay))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = base.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .extend_pairs(kept)
            .append_pair("checkin", &window.check_in.format("%Y-%m-%d").to_string())
            .append_pair("checkout", &window.check_out.format("%Y-%m-%d").to_string())
            .append_pair("group_adults", &self.adults.to_string())
            .append_pair("group_children", &self.children.to_string())
            .append_pair("no_rooms", &self.rooms.to_string());
        url
    }
}

/// Parse and check a hotel page URL.
pub fn parse_hotel_url(raw: &str) -> ScanResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ScanError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ScanError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}

/// Scans a sequence of dates against one hotel page.
#[derive(Debug, Clone)]
pub struct Scanner {
    orchestrator: RetryOrchestrator,
    aggregator: ResultAggregator,
    stay: StayQuery,
    date_delay: Duration,
}

impl Scanner {
    pub fn new(config: &ScanConfig, profile: ExtractionProfile) -> ScanResult<Self> {
        let aggregator = ResultAggregator::new(profile.default_currency.clone());
        let pipeline = ExtractionPipeline::new(profile)?;
        Ok(Self {
            orchestrator: RetryOrchestrator::new(config, pipeline),
            aggregator,
            stay: StayQuery::default(),
            date_delay: config.date_delay(),
        })
    }

    pub fn with_stay(mut self, stay: StayQuery) -> Self {
        self.stay = stay;
        self
    }

    /// Scan every window in order and return all records.
    ///
    /// Opens one page for the whole run and closes it once before returning.
    /// Dates never fail the run; only failing to open the page does. To stop
    /// early, end the `windows` iterator.
    pub async fn run<I>(
        &self,
        renderer: &dyn PageRenderer,
        base_url: &Url,
        windows: I,
        filter: &RoomTypeFilter,
        sink: &dyn EventSink,
    ) -> ScanResult<Vec<PriceRecord>>
    where
        I: IntoIterator<Item = DateWindow>,
    {
        let windows = windows.into_iter();
        let mut page = renderer
            .open_page()
            .await
            .map_err(|e| ScanError::Session(format!("{e:#}")))?;

        sink.emit(ScanEvent::ScanStarted {
            base_url: base_url.to_string(),
            expected_dates: windows.size_hint().0,
        });

        let (dates, records) = self
            .scan_dates(page.as_mut(), base_url, windows, filter, sink)
            .await;

        if let Err(e) = page.close().await {
            sink.emit(ScanEvent::SessionCloseFailed {
                error: format!("{e:#}"),
            });
        }
        sink.emit(ScanEvent::ScanFinished {
            dates,
            records: records.len(),
        });
        Ok(records)
    }

    async fn scan_dates(
        &self,
        page: &mut dyn BrowserPage,
        base_url: &Url,
        windows: impl Iterator<Item = DateWindow>,
        filter: &RoomTypeFilter,
        sink: &dyn EventSink,
    ) -> (usize, Vec<PriceRecord>) {
        let mut output = Vec::new();
        let mut dates = 0;

        for window in windows {
            let url = self.stay.url_for(base_url, &window);
            let report = self
                .orchestrator
                .scrape_date(page, window.check_in, url.as_str(), filter, sink)
                .await;

            let outcome = report.outcome.name().to_string();
            let records = self.aggregator.finalize(window.check_in, report.outcome);
            sink.emit(ScanEvent::DateCompleted {
                date: window.check_in,
                outcome,
                attempts: report.attempts,
                records: records.len(),
            });
            output.extend(records);
            dates += 1;

            if !self.date_delay.is_zero() {
                tokio::time::sleep(self.date_delay).await;
            }
        }

        (dates, output)
    }
}
