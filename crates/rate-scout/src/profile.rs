//! Data-driven extraction tables: selectors, keywords, phrases, currency rules.
//!
//! Every decision the extraction pipeline makes by matching text or markup is
//! driven by an [`ExtractionProfile`]. The default profile targets Booking.com
//! property pages; a JSON file can override any subset of fields.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{PageError, ScanError, ScanResult};
use crate::renderer::{first_text, PageElement};
use crate::types::RoomType;

/// Ordered selectors for locating a price inside a room block.
///
/// Evaluated lazily in order; the first selector whose first match has text
/// containing a digit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorCascade(Vec<String>);

impl SelectorCascade {
    pub fn new<S: Into<String>>(selectors: impl IntoIterator<Item = S>) -> Self {
        Self(selectors.into_iter().map(Into::into).collect())
    }

    pub fn selectors(&self) -> &[String] {
        &self.0
    }

    /// Text of the first qualifying match under `scope`.
    pub async fn first_match(&self, scope: &dyn PageElement) -> Result<Option<String>, PageError> {
        for selector in &self.0 {
            if let Some(text) = first_text(scope, selector).await? {
                if has_digit(&text) {
                    return Ok(Some(text));
                }
            }
        }
        Ok(None)
    }
}

/// A currency marker and the code it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRule {
    pub marker: String,
    pub code: String,
}

impl CurrencyRule {
    pub fn new(marker: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            code: code.into(),
        }
    }
}

/// Ordered currency rules; the first marker found in the text decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyRules(Vec<CurrencyRule>);

impl CurrencyRules {
    pub fn new(rules: impl IntoIterator<Item = CurrencyRule>) -> Self {
        Self(rules.into_iter().collect())
    }

    pub fn detect(&self, text: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|rule| text.contains(rule.marker.as_str()))
            .map(|rule| rule.code.as_str())
    }

    pub fn rules(&self) -> &[CurrencyRule] {
        &self.0
    }
}

/// Selector and keyword tables for one booking site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionProfile {
    /// Phrases whose presence in the page text means nothing is bookable.
    pub no_availability_phrases: Vec<String>,
    /// Room block selector tried first.
    pub block_selector: String,
    /// Room block selector used when the primary one matches nothing.
    pub fallback_block_selector: String,
    /// Upper bound on blocks processed per page.
    pub max_blocks: usize,
    /// Room description selectors, in priority order.
    pub description_selectors: Vec<String>,
    /// Lowercase keywords marking a rate as including breakfast.
    pub breakfast_keywords: Vec<String>,
    pub price_selectors: SelectorCascade,
    pub currency_rules: CurrencyRules,
    pub default_currency: String,
    /// Consent and overlay buttons, in priority order.
    pub consent_selectors: Vec<String>,
}

impl Default for ExtractionProfile {
    fn default() -> Self {
        Self::booking()
    }
}

impl ExtractionProfile {
    /// Profile for Booking.com property pages.
    pub fn booking() -> Self {
        Self {
            no_availability_phrases: strings(&["no availability", "sold out", "not available"]),
            block_selector: "[data-testid=\"property-card-container\"], .hprt-table-row, [data-block-id]"
                .to_string(),
            fallback_block_selector: ".room-block, .hprt-table tbody tr".to_string(),
            max_blocks: 10,
            description_selectors: strings(&[
                ".hprt-roomtype-icon-link",
                "[data-testid=\"title\"]",
                ".room-name",
            ]),
            breakfast_keywords: strings(&["breakfast", "ארוחת בוקר", "כולל ארוחה"]),
            price_selectors: SelectorCascade::new([
                "[data-testid=\"price-and-discounted-price\"]",
                ".prco-valign-middle-helper",
                ".bui-price-display__value",
                ".prco-text-nowrap-helper",
                "span[aria-hidden=\"true\"]",
            ]),
            currency_rules: CurrencyRules::new([
                CurrencyRule::new("₪", "ILS"),
                CurrencyRule::new("ILS", "ILS"),
                CurrencyRule::new("$", "USD"),
                CurrencyRule::new("USD", "USD"),
                CurrencyRule::new("€", "EUR"),
                CurrencyRule::new("EUR", "EUR"),
            ]),
            default_currency: "ILS".to_string(),
            consent_selectors: strings(&[
                "#onetrust-accept-btn-handler",
                "button[data-gdpr-consent=\"accept\"]",
                "[data-testid=\"accept-btn\"]",
                "button[aria-label=\"Dismiss sign-in info.\"]",
            ]),
        }
    }

    /// Parse a profile from JSON. Missing fields keep the Booking.com defaults.
    pub fn from_json_str(json: &str) -> ScanResult<Self> {
        let profile: Self =
            serde_json::from_str(json).map_err(|e| ScanError::Profile(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ScanResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Reject profiles that could never match a room block.
    pub fn validate(&self) -> ScanResult<()> {
        if self.block_selector.trim().is_empty() {
            return Err(ScanError::Profile("block_selector is empty".into()));
        }
        if self.max_blocks == 0 {
            return Err(ScanError::Profile("max_blocks must be positive".into()));
        }
        if self.default_currency.trim().is_empty() {
            return Err(ScanError::Profile("default_currency is empty".into()));
        }
        Ok(())
    }

    /// Case-insensitive regex matching any no-availability phrase.
    ///
    /// Returns `None` when the profile lists no phrases.
    pub fn no_availability_pattern(&self) -> ScanResult<Option<Regex>> {
        let alternatives: Vec<String> = self
            .no_availability_phrases
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| regex::escape(p))
            .collect();
        if alternatives.is_empty() {
            return Ok(None);
        }
        RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map(Some)
            .map_err(|e| ScanError::Profile(e.to_string()))
    }

    /// `with_breakfast` when the description mentions any breakfast keyword.
    pub fn classify(&self, description: &str) -> RoomType {
        let lowered = description.to_lowercase();
        let has_breakfast = self
            .breakfast_keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()));
        if has_breakfast {
            RoomType::WithBreakfast
        } else {
            RoomType::RoomOnly
        }
    }

    /// Currency for raw price text, falling back to the default.
    pub fn currency_for<'a>(&'a self, price_text: &str) -> &'a str {
        self.currency_rules
            .detect(price_text)
            .unwrap_or(self.default_currency.as_str())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Keep ASCII digits and `.` in order and parse the result.
///
/// `None` when nothing numeric remains or the remainder is not a number
/// (e.g. `"1.234.56"`).
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shekel_price() {
        let profile = ExtractionProfile::booking();
        let text = "₪ 1,234.56";
        assert_eq!(parse_price(text), Some(1234.56));
        assert_eq!(profile.currency_for(text), "ILS");
    }

    #[test]
    fn test_parse_dollar_price() {
        let profile = ExtractionProfile::booking();
        assert_eq!(parse_price("$99"), Some(99.0));
        assert_eq!(profile.currency_for("$99"), "USD");
    }

    #[test]
    fn test_parse_price_rejects_non_numeric() {
        assert_eq!(parse_price("Price unavailable"), None);
        assert_eq!(parse_price("..."), None);
        assert_eq!(parse_price("1.234.56"), None);
    }

    #[test]
    fn test_currency_rule_order_and_default() {
        let profile = ExtractionProfile::booking();
        assert_eq!(profile.currency_for("€ 120"), "EUR");
        assert_eq!(profile.currency_for("USD 80"), "USD");
        // First rule wins when several markers appear.
        assert_eq!(profile.currency_for("ILS 300 ($80)"), "ILS");
        assert_eq!(profile.currency_for("300"), "ILS");
    }

    #[test]
    fn test_classify_breakfast() {
        let profile = ExtractionProfile::booking();
        assert_eq!(
            profile.classify("Double Room - breakfast included"),
            RoomType::WithBreakfast
        );
        assert_eq!(profile.classify("Double Room"), RoomType::RoomOnly);
        assert_eq!(profile.classify("BREAKFAST for two"), RoomType::WithBreakfast);
        assert_eq!(profile.classify("חדר זוגי כולל ארוחת בוקר"), RoomType::WithBreakfast);
        assert_eq!(profile.classify(""), RoomType::RoomOnly);
    }

    #[test]
    fn test_no_availability_pattern() {
        let re = ExtractionProfile::booking()
            .no_availability_pattern()
            .unwrap()
            .unwrap();
        assert!(re.is_match("Sorry, this property is SOLD OUT for your dates"));
        assert!(re.is_match("We have No Availability here"));
        assert!(!re.is_match("Deluxe King Room ₪ 820"));
    }

    #[test]
    fn test_phrases_are_literal() {
        let profile = ExtractionProfile {
            no_availability_phrases: vec!["fully booked (all rooms)".into()],
            ..ExtractionProfile::booking()
        };
        let re = profile.no_availability_pattern().unwrap().unwrap();
        assert!(re.is_match("Fully booked (all rooms)"));
        assert!(!re.is_match("fully booked all rooms"));
    }

    #[test]
    fn test_empty_phrase_list_has_no_pattern() {
        let profile = ExtractionProfile {
            no_availability_phrases: vec![],
            ..ExtractionProfile::booking()
        };
        assert!(profile.no_availability_pattern().unwrap().is_none());
    }

    #[test]
    fn test_json_override_keeps_defaults() {
        let profile = ExtractionProfile::from_json_str(
            r#"{"default_currency": "EUR", "price_selectors": [".rate"]}"#,
        )
        .unwrap();
        assert_eq!(profile.default_currency, "EUR");
        assert_eq!(profile.price_selectors.selectors(), [".rate".to_string()]);
        assert_eq!(profile.max_blocks, 10);
        assert_eq!(
            profile.block_selector,
            ExtractionProfile::booking().block_selector
        );
    }

    #[test]
    fn test_json_rejects_invalid_profile() {
        assert!(ExtractionProfile::from_json_str(r#"{"max_blocks": 0}"#).is_err());
        assert!(ExtractionProfile::from_json_str("not json").is_err());
    }
}
