//! Consecutive one-night stay windows starting from a fixed date.

use chrono::{Days, NaiveDate};

use crate::types::DateWindow;

/// `days` consecutive windows beginning at `start`.
///
/// Cheap to copy; every call to [`DateRange::iter`] restarts from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    days: u32,
}

impl DateRange {
    /// Windows past the end of the calendar are dropped, so the range may be
    /// shorter than `days` when `start` is near `NaiveDate::MAX`.
    pub fn new(start: NaiveDate, days: u32) -> Self {
        let fit = NaiveDate::MAX.signed_duration_since(start).num_days();
        let fit = u32::try_from(fit).unwrap_or(u32::MAX);
        Self {
            start,
            days: days.min(fit),
        }
    }

    /// Range starting today in the local timezone.
    pub fn from_today(days: u32) -> Self {
        Self::new(chrono::Local::now().date_naive(), days)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn len(&self) -> usize {
        self.days as usize
    }

    pub fn is_empty(&self) -> bool {
        self.days == 0
    }

    pub fn iter(&self) -> DateWindows {
        DateWindows {
            start: self.start,
            next_offset: 0,
            days: self.days,
        }
    }
}

impl IntoIterator for DateRange {
    type Item = DateWindow;
    type IntoIter = DateWindows;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the windows of a [`DateRange`].
#[derive(Debug, Clone)]
pub struct DateWindows {
    start: NaiveDate,
    next_offset: u32,
    days: u32,
}

impl Iterator for DateWindows {
    type Item = DateWindow;

    fn next(&mut self) -> Option<DateWindow> {
        if self.next_offset >= self.days {
            return None;
        }
        let window = self
            .start
            .checked_add_days(Days::new(u64::from(self.next_offset)))
            .and_then(DateWindow::starting);
        match window {
            Some(w) => {
                self.next_offset += 1;
                Some(w)
            }
            None => {
                // Ran off the calendar; the sequence ends here.
                self.next_offset = self.days;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.days - self.next_offset) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DateWindows {}
