//! Core data types for stay windows and price records.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A one-night stay: check-in date and the following check-out date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl DateWindow {
    /// Build the window starting at `check_in`. Returns `None` past the end of the calendar.
    pub fn starting(check_in: NaiveDate) -> Option<Self> {
        let check_out = check_in.succ_opt()?;
        Some(Self {
            check_in,
            check_out,
        })
    }
}

/// Classification of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    RoomOnly,
    WithBreakfast,
    Unavailable,
    Error,
}

impl RoomType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoomOnly => "room_only",
            Self::WithBreakfast => "with_breakfast",
            Self::Unavailable => "unavailable",
            Self::Error => "error",
        }
    }

    /// Whether records of this type carry a price.
    pub fn is_priced(self) -> bool {
        matches!(self, Self::RoomOnly | Self::WithBreakfast)
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "room_only" => Ok(Self::RoomOnly),
            "with_breakfast" => Ok(Self::WithBreakfast),
            "unavailable" => Ok(Self::Unavailable),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown room type: {other}")),
        }
    }
}

/// The set of priced room types a caller wants back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomTypeFilter {
    accepted: BTreeSet<RoomType>,
}

impl RoomTypeFilter {
    /// Accept only the given types. Non-priced types are ignored since
    /// extraction never produces them.
    pub fn new(types: impl IntoIterator<Item = RoomType>) -> Self {
        Self {
            accepted: types.into_iter().filter(|t| t.is_priced()).collect(),
        }
    }

    pub fn accepts(&self, room_type: RoomType) -> bool {
        self.accepted.contains(&room_type)
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RoomType> + '_ {
        self.accepted.iter().copied()
    }
}

impl Default for RoomTypeFilter {
    fn default() -> Self {
        Self::new([RoomType::RoomOnly, RoomType::WithBreakfast])
    }
}

/// One output row: a priced offer, or the single unavailable/error marker for a date.
///
/// Built only through the constructors below, so `available` always implies a
/// price and a priced room type, and unavailable/error rows never carry a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub price: Option<f64>,
    pub currency: String,
    pub room_type: RoomType,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PriceRecord {
    /// A bookable offer. `room_type` must be a priced type; anything else is
    /// reported as `room_only`.
    pub fn priced(
        date: NaiveDate,
        price: f64,
        currency: impl Into<String>,
        room_type: RoomType,
    ) -> Self {
        let room_type = if room_type.is_priced() {
            room_type
        } else {
            RoomType::RoomOnly
        };
        Self {
            date,
            price: Some(price),
            currency: currency.into(),
            room_type,
            available: true,
            error: None,
        }
    }

    pub fn unavailable(date: NaiveDate, currency: impl Into<String>) -> Self {
        Self {
            date,
            price: None,
            currency: currency.into(),
            room_type: RoomType::Unavailable,
            available: false,
            error: None,
        }
    }

    pub fn errored(date: NaiveDate, currency: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            date,
            price: None,
            currency: currency.into(),
            room_type: RoomType::Error,
            available: false,
            error: Some(error.into()),
        }
    }
}
