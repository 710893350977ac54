//! rate-scout: per-date hotel rate extraction from rendered booking pages.

pub mod aggregate;
pub mod config;
pub mod dates;
pub mod error;
pub mod events;
pub mod extract;
pub mod popup;
pub mod profile;
pub mod renderer;
pub mod retry;
pub mod scan;
pub mod types;

pub use aggregate::ResultAggregator;
pub use config::ScanConfig;
pub use dates::DateRange;
pub use error::{NavigationError, PageError, ScanError, ScanResult};
pub use events::{EventSink, RecordingSink, ScanEvent, TracingSink};
pub use extract::{ExtractionPipeline, PageExtraction, SkipReason};
pub use popup::PopupDismisser;
pub use profile::{parse_price, ExtractionProfile};
pub use renderer::chromium::ChromiumRenderer;
pub use renderer::snapshot::{SnapshotRenderer, SnapshotStep};
pub use renderer::{BrowserPage, PageElement, PageRenderer};
pub use retry::{DateOutcome, DateReport, FailureKind, RetryOrchestrator, RetryPolicy};
pub use scan::{parse_hotel_url, Scanner, StayQuery};
pub use types::*;
