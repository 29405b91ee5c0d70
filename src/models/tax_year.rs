//! UK tax year model.
//!
//! A UK tax year runs from 6 April to 5 April of the following calendar
//! year. PAYE splits it into twelve tax months, month 1 being
//! 6 April to 5 May.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Number of PAYE tax months in a tax year.
pub const TAX_MONTHS_PER_YEAR: u8 = 12;

/// A UK tax year, identified by the calendar year in which it starts.
///
/// Displays and serializes as `"2025-26"`; parses from either
/// `"2025-26"` or `"2025/26"`.
///
/// # Example
///
/// ```
/// use uk_payroll_engine::models::TaxYear;
/// use chrono::NaiveDate;
///
/// let year = TaxYear::containing(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());
/// assert_eq!(year, TaxYear::new(2025));
/// assert_eq!(year.to_string(), "2025-26");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxYear {
    start_year: i32,
}

impl TaxYear {
    /// Creates the tax year starting on 6 April of `start_year`.
    pub const fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The calendar year in which this tax year starts.
    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// The first day of the tax year (6 April).
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year, 4, 6).unwrap_or(NaiveDate::MIN)
    }

    /// The last day of the tax year (5 April of the following year).
    pub fn last_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year + 1, 4, 5).unwrap_or(NaiveDate::MAX)
    }

    /// Returns the tax year that contains `date`.
    pub fn containing(date: NaiveDate) -> Self {
        if (date.month(), date.day()) >= (4, 6) {
            Self::new(date.year())
        } else {
            Self::new(date.year() - 1)
        }
    }

    /// Returns true if `date` falls inside this tax year.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }

    /// Returns the PAYE tax month (1-12) for a pay date in this tax year.
    ///
    /// Month 1 runs from 6 April to 5 May, month 12 from 6 March to 5 April.
    pub fn tax_month(&self, date: NaiveDate) -> EngineResult<u8> {
        if !self.contains(date) {
            return Err(EngineError::InvalidInput {
                field: "pay_date".to_string(),
                message: format!("date is outside tax year {}", self),
            });
        }

        // Shift back five days so each tax month lines up with a calendar month.
        let shifted = date - chrono::Days::new(5);
        let month = (shifted.month() as i32 - 4).rem_euclid(12) + 1;
        Ok(month as u8)
    }
}

impl fmt::Display for TaxYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

impl FromStr for TaxYear {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidInput {
            field: "tax_year".to_string(),
            message: format!("expected a tax year like 2025-26, got '{}'", s),
        };

        let (start, end) = s.trim().split_once(['-', '/']).ok_or_else(invalid)?;
        let start_year: i32 = start.parse().map_err(|_| invalid())?;
        let end_suffix: i32 = end.parse().map_err(|_| invalid())?;

        if start.len() != 4 || end.len() != 2 || (start_year + 1).rem_euclid(100) != end_suffix {
            return Err(invalid());
        }

        Ok(Self::new(start_year))
    }
}

impl TryFrom<String> for TaxYear {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaxYear> for String {
    fn from(value: TaxYear) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_containing_uses_sixth_of_april_boundary() {
        assert_eq!(TaxYear::containing(date(2025, 4, 5)), TaxYear::new(2024));
        assert_eq!(TaxYear::containing(date(2025, 4, 6)), TaxYear::new(2025));
        assert_eq!(TaxYear::containing(date(2026, 4, 5)), TaxYear::new(2025));
    }

    #[test]
    fn test_display_formats_two_digit_suffix() {
        assert_eq!(TaxYear::new(2025).to_string(), "2025-26");
        assert_eq!(TaxYear::new(2099).to_string(), "2099-00");
    }

    #[test]
    fn test_parse_accepts_dash_and_slash() {
        assert_eq!("2025-26".parse::<TaxYear>().unwrap(), TaxYear::new(2025));
        assert_eq!("2025/26".parse::<TaxYear>().unwrap(), TaxYear::new(2025));
    }

    #[test]
    fn test_parse_rejects_mismatched_years() {
        assert!("2025-27".parse::<TaxYear>().is_err());
        assert!("2025".parse::<TaxYear>().is_err());
        assert!("25-26".parse::<TaxYear>().is_err());
    }

    #[test]
    fn test_tax_month_boundaries() {
        let year = TaxYear::new(2025);
        assert_eq!(year.tax_month(date(2025, 4, 6)).unwrap(), 1);
        assert_eq!(year.tax_month(date(2025, 5, 5)).unwrap(), 1);
        assert_eq!(year.tax_month(date(2025, 5, 6)).unwrap(), 2);
        assert_eq!(year.tax_month(date(2025, 12, 31)).unwrap(), 9);
        assert_eq!(year.tax_month(date(2026, 1, 5)).unwrap(), 9);
        assert_eq!(year.tax_month(date(2026, 1, 6)).unwrap(), 10);
        assert_eq!(year.tax_month(date(2026, 3, 6)).unwrap(), 12);
        assert_eq!(year.tax_month(date(2026, 4, 5)).unwrap(), 12);
    }

    #[test]
    fn test_tax_month_outside_year_is_invalid_input() {
        let year = TaxYear::new(2025);
        let result = year.tax_month(date(2026, 4, 6));
        assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
    }

    #[test]
    fn test_serde_uses_display_form() {
        let json = serde_json::to_string(&TaxYear::new(2025)).unwrap();
        assert_eq!(json, "\"2025-26\"");

        let year: TaxYear = serde_json::from_str("\"2025/26\"").unwrap();
        assert_eq!(year, TaxYear::new(2025));
    }
}
