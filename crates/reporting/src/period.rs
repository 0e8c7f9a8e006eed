use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use dentalcare_core::Money;

/// Reporting granularity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Month,
    Quarter,
    Year,
}

impl Period {
    const fn months(self) -> u32 {
        match self {
            Period::Month => 1,
            Period::Quarter => 3,
            Period::Year => 12,
        }
    }

    /// The calendar period containing `date`.
    pub fn containing(self, date: NaiveDate) -> DateRange {
        let month0 = date.month0();
        let start_month0 = month0 - month0 % self.months();
        let start = NaiveDate::from_ymd_opt(date.year(), start_month0 + 1, 1).unwrap_or(date);
        DateRange::spanning(start, self.months())
    }
}

/// Inclusive date range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    fn spanning(start: NaiveDate, months: u32) -> Self {
        let end = start
            .checked_add_months(Months::new(months))
            .and_then(|next| next.pred_opt())
            .unwrap_or(start);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The range of equal calendar length immediately before this one.
    pub fn previous(&self, period: Period) -> DateRange {
        let start = self
            .start
            .checked_sub_months(Months::new(period.months()))
            .unwrap_or(self.start);
        DateRange::spanning(start, period.months())
    }
}

/// Relative change from `previous` to `current`, in percent.
///
/// `None` when there is no previous amount to compare against.
pub fn percent_change(current: Money, previous: Money) -> Option<f64> {
    if previous.minor() == 0 {
        return None;
    }
    let delta = (current.minor() - previous.minor()) as f64;
    Some(delta / previous.minor().abs() as f64 * 100.0)
}
