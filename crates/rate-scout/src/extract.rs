//! Room block extraction from a loaded booking page.
//!
//! The pipeline never produces `unavailable` or `error` records; it reports
//! either that the page shows no availability, or the priced records it
//! could read. Each block is handled independently and yields an explicit
//! [`BlockOutcome`], so one malformed block never affects the others.

use std::fmt;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PageError, ScanResult};
use crate::events::{EventSink, ScanEvent};
use crate::profile::{parse_price, ExtractionProfile};
use crate::renderer::{first_text, BrowserPage, PageElement};
use crate::types::{PriceRecord, RoomType, RoomTypeFilter};

/// Why a room block produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The block's room type is not in the caller's filter.
    FilteredOut { room_type: RoomType },
    /// No price selector matched text containing a digit.
    NoPriceText,
    /// Price text was found but did not parse as a number.
    UnparseablePrice { text: String },
    /// Querying the block's elements failed.
    ElementError { error: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilteredOut { room_type } => write!(f, "room type {room_type} not requested"),
            Self::NoPriceText => write!(f, "no price text"),
            Self::UnparseablePrice { text } => write!(f, "unparseable price {text:?}"),
            Self::ElementError { error } => write!(f, "element error: {error}"),
        }
    }
}

/// Result of processing one room block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    Priced(PriceRecord),
    Skipped(SkipReason),
}

/// Result of extracting a whole page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageExtraction {
    /// The page states that nothing is bookable.
    NoAvailability,
    /// Priced records read from the room blocks (possibly none).
    Blocks(Vec<PriceRecord>),
}

/// Reads priced offers off a loaded page using an [`ExtractionProfile`].
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    profile: ExtractionProfile,
    no_availability: Option<Regex>,
}

impl ExtractionPipeline {
    pub fn new(profile: ExtractionProfile) -> ScanResult<Self> {
        profile.validate()?;
        let no_availability = profile.no_availability_pattern()?;
        Ok(Self {
            profile,
            no_availability,
        })
    }

    pub fn profile(&self) -> &ExtractionProfile {
        &self.profile
    }

    /// Extract priced records for `date` from the page.
    ///
    /// Page-level query failures are returned as errors; block-level failures
    /// become skips reported through `sink`.
    pub async fn extract(
        &self,
        page: &dyn BrowserPage,
        date: NaiveDate,
        filter: &RoomTypeFilter,
        sink: &dyn EventSink,
    ) -> Result<PageExtraction, PageError> {
        if let Some(pattern) = &self.no_availability {
            let text = page.body_text().await?;
            if pattern.is_match(&text) {
                sink.emit(ScanEvent::NoAvailability { date });
                return Ok(PageExtraction::NoAvailability);
            }
        }

        let (blocks, fallback) = self.room_blocks(page).await?;
        let processed = blocks.len().min(self.profile.max_blocks);
        sink.emit(ScanEvent::BlocksFound {
            date,
            found: blocks.len(),
            processed,
            fallback,
        });

        let mut records = Vec::new();
        for (index, block) in blocks.iter().take(processed).enumerate() {
            match self.extract_block(block.as_ref(), date, filter).await {
                BlockOutcome::Priced(record) => records.push(record),
                BlockOutcome::Skipped(reason) => {
                    sink.emit(ScanEvent::BlockSkipped {
                        date,
                        index,
                        reason,
                    });
                }
            }
        }
        Ok(PageExtraction::Blocks(records))
    }

    /// Primary block selector, or the fallback when it matches nothing.
    async fn room_blocks(
        &self,
        page: &dyn BrowserPage,
    ) -> Result<(Vec<Box<dyn PageElement>>, bool), PageError> {
        let blocks = page.query(&self.profile.block_selector).await?;
        if !blocks.is_empty() || self.profile.fallback_block_selector.trim().is_empty() {
            return Ok((blocks, false));
        }
        let blocks = page.query(&self.profile.fallback_block_selector).await?;
        Ok((blocks, true))
    }

    /// Classify and price a single block.
    pub async fn extract_block(
        &self,
        block: &dyn PageElement,
        date: NaiveDate,
        filter: &RoomTypeFilter,
    ) -> BlockOutcome {
        match self.try_block(block, date, filter).await {
            Ok(outcome) => outcome,
            Err(e) => BlockOutcome::Skipped(SkipReason::ElementError {
                error: e.to_string(),
            }),
        }
    }

    async fn try_block(
        &self,
        block: &dyn PageElement,
        date: NaiveDate,
        filter: &RoomTypeFilter,
    ) -> Result<BlockOutcome, PageError> {
        let description = self.description(block).await?;
        let room_type = self.profile.classify(&description);
        if !filter.accepts(room_type) {
            return Ok(BlockOutcome::Skipped(SkipReason::FilteredOut { room_type }));
        }

        let Some(price_text) = self.profile.price_selectors.first_match(block).await? else {
            return Ok(BlockOutcome::Skipped(SkipReason::NoPriceText));
        };
        let Some(price) = parse_price(&price_text) else {
            return Ok(BlockOutcome::Skipped(SkipReason::UnparseablePrice {
                text: price_text,
            }));
        };

        let currency = self.profile.currency_for(&price_text);
        Ok(BlockOutcome::Priced(PriceRecord::priced(
            date, price, currency, room_type,
        )))
    }

    async fn description(&self, block: &dyn PageElement) -> Result<String, PageError> {
        for selector in &self.profile.description_selectors {
            if let Some(text) = first_text(block, selector).await? {
                return Ok(text);
            }
        }
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::renderer::snapshot::SnapshotRenderer;
    use crate::renderer::PageRenderer;
    use async_trait::async_trait;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 14).unwrap()
    }

    const URL: &str = "https://www.booking.com/hotel/il/sea.html?checkin=2026-08-14&checkout=2026-08-15";

    fn row(name: &str, price: &str) -> String {
        format!(
            r#"<tr class="hprt-table-row" data-block-id="b">
                 <td><a class="hprt-roomtype-icon-link">{name}</a></td>
                 <td><div class="bui-price-display__value">{price}</div></td>
               </tr>"#
        )
    }

    fn table(rows: &[String]) -> String {
        format!(
            "<html><body><table class=\"hprt-table\"><tbody>{}</tbody></table></body></html>",
            rows.join("")
        )
    }

    async fn run(html: &str, filter: &RoomTypeFilter) -> (PageExtraction, Vec<ScanEvent>) {
        run_with(ExtractionProfile::booking(), html, filter).await
    }

    async fn run_with(
        profile: ExtractionProfile,
        html: &str,
        filter: &RoomTypeFilter,
    ) -> (PageExtraction, Vec<ScanEvent>) {
        let renderer = SnapshotRenderer::new().page(date(), html);
        let mut page = renderer.open_page().await.unwrap();
        page.navigate(URL, 1000).await.unwrap();
        let sink = RecordingSink::new();
        let pipeline = ExtractionPipeline::new(profile).unwrap();
        let result = pipeline
            .extract(page.as_ref(), date(), filter, &sink)
            .await
            .unwrap();
        (result, sink.events())
    }

    fn records(extraction: PageExtraction) -> Vec<PriceRecord> {
        match extraction {
            PageExtraction::Blocks(r) => r,
            PageExtraction::NoAvailability => panic!("unexpected no-availability"),
        }
    }

    #[tokio::test]
    async fn test_priced_rows_are_classified() {
        let html = table(&[
            row("Double Room", "₪ 1,234.56"),
            row("Double Room - Breakfast included", "US$ 99"),
        ]);
        let (result, _) = run(&html, &RoomTypeFilter::default()).await;
        let records = records(result);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].room_type, RoomType::RoomOnly);
        assert_eq!(records[0].price, Some(1234.56));
        assert_eq!(records[0].currency, "ILS");
        assert_eq!(records[1].room_type, RoomType::WithBreakfast);
        assert_eq!(records[1].price, Some(99.0));
        assert_eq!(records[1].currency, "USD");
        assert!(records.iter().all(|r| r.available && r.date == date()));
    }

    #[tokio::test]
    async fn test_no_availability_short_circuits() {
        let html = format!(
            "<html><body><p>This property is Sold Out on our site</p>{}</body></html>",
            row("Double Room", "₪ 500")
        );
        let (result, events) = run(&html, &RoomTypeFilter::default()).await;
        assert_eq!(result, PageExtraction::NoAvailability);
        assert!(events
            .iter()
            .all(|e| !matches!(e, ScanEvent::BlocksFound { .. })));
    }

    #[tokio::test]
    async fn test_filter_skips_unrequested_types() {
        let html = table(&[
            row("Double Room", "₪ 400"),
            row("Double Room with breakfast", "₪ 480"),
        ]);
        let filter = RoomTypeFilter::new([RoomType::WithBreakfast]);
        let (result, events) = run(&html, &filter).await;
        let records = records(result);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, Some(480.0));
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::BlockSkipped {
                index: 0,
                reason: SkipReason::FilteredOut {
                    room_type: RoomType::RoomOnly
                },
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_cascade_prefers_earlier_selector_with_digits() {
        let html = r#"<html><body><div data-block-id="1">
            <span class="room-name">Suite</span>
            <div data-testid="price-and-discounted-price">Price on request</div>
            <span class="prco-valign-middle-helper">€ 310</span>
            <span class="bui-price-display__value">€ 999</span>
        </div></body></html>"#;
        let (result, _) = run(html, &RoomTypeFilter::default()).await;
        let records = records(result);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, Some(310.0));
        assert_eq!(records[0].currency, "EUR");
    }

    #[tokio::test]
    async fn test_fallback_block_selector() {
        let html = r#"<html><body>
            <div class="room-block"><span class="room-name">Studio</span>
              <span aria-hidden="true">₪ 650</span></div>
        </body></html>"#;
        let (result, events) = run(html, &RoomTypeFilter::default()).await;
        assert_eq!(records(result).len(), 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, ScanEvent::BlocksFound { fallback: true, found: 1, .. })));
    }

    #[tokio::test]
    async fn test_caps_blocks_at_ten() {
        let rows: Vec<String> = (0..14).map(|i| row("Room", &format!("₪ {}", 100 + i))).collect();
        let (result, events) = run(&table(&rows), &RoomTypeFilter::default()).await;
        let records = records(result);
        assert_eq!(records.len(), 10);
        assert_eq!(records.last().unwrap().price, Some(109.0));
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::BlocksFound {
                found: 14,
                processed: 10,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_rows_without_usable_price_are_skipped() {
        let html = table(&[row("Double Room", "Sold"), row("Twin Room", "₪ 720")]);
        let (result, events) = run(&html, &RoomTypeFilter::default()).await;
        let records = records(result);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, Some(720.0));
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::BlockSkipped {
                index: 0,
                reason: SkipReason::NoPriceText,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_unparseable_price_is_skipped() {
        let html = table(&[row("Double Room", "1.234.56 ILS")]);
        let (result, events) = run(&html, &RoomTypeFilter::default()).await;
        assert!(records(result).is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::BlockSkipped {
                reason: SkipReason::UnparseablePrice { .. },
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_block_error_does_not_abort_other_blocks() {
        // The broken selector is only reached by blocks whose earlier
        // selectors found nothing.
        let profile = ExtractionProfile {
            price_selectors: crate::profile::SelectorCascade::new([
                ".bui-price-display__value",
                "span[",
            ]),
            ..ExtractionProfile::booking()
        };
        let html = table(&[
            "<tr class=\"hprt-table-row\"><td><a class=\"room-name\">Broken</a></td></tr>".to_string(),
            row("Double Room", "₪ 530"),
        ]);
        let (result, events) = run_with(profile, &html, &RoomTypeFilter::default()).await;
        let records = records(result);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, Some(530.0));
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::BlockSkipped {
                index: 0,
                reason: SkipReason::ElementError { .. },
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_page_without_blocks_yields_no_records() {
        let (result, _) = run(
            "<html><body><h1>Hotel</h1></body></html>",
            &RoomTypeFilter::default(),
        )
        .await;
        assert!(records(result).is_empty());
    }

    struct BrokenElement;

    #[async_trait]
    impl PageElement for BrokenElement {
        async fn text(&self) -> Result<String, PageError> {
            Err(PageError::Query("detached".into()))
        }
        async fn is_visible(&self, _timeout_ms: u64) -> bool {
            false
        }
        async fn click(&self) -> Result<(), PageError> {
            Err(PageError::Interaction("detached".into()))
        }
        async fn query(&self, _selector: &str) -> Result<Vec<Box<dyn PageElement>>, PageError> {
            Err(PageError::Query("detached".into()))
        }
    }

    #[tokio::test]
    async fn test_extract_block_turns_errors_into_skips() {
        let pipeline = ExtractionPipeline::new(ExtractionProfile::booking()).unwrap();
        let outcome = pipeline
            .extract_block(&BrokenElement, date(), &RoomTypeFilter::default())
            .await;
        assert_eq!(
            outcome,
            BlockOutcome::Skipped(SkipReason::ElementError {
                error: "DOM query failed: detached".into()
            })
        );
    }
}
