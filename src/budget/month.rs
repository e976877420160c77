//! The YYYYMM month key that budgets are grouped by.

use std::fmt::Display;

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{Error, timezone::local_today};

/// A calendar month written as six digits, e.g. "202501" for January 2025.
///
/// Only months whose following month is also a valid [Date] can be
/// represented, so December 9999 is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BudgetMonth {
    first_day: Date,
    next_first_day: Date,
}

impl BudgetMonth {
    /// Parse a month from `YYYYMM`.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if `text` is not six digits, the month
    /// is not between 01 and 12 or the month is December 9999.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidMonth(text.to_owned());

        if text.len() != 6 || !text.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = text[..4].parse().map_err(|_| invalid())?;
        let month: u8 = text[4..].parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;

        Self::from_calendar_month(year, month).ok_or_else(invalid)
    }

    /// The month containing `date`.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if `date` is in December 9999.
    pub fn containing(date: Date) -> Result<Self, Error> {
        Self::from_calendar_month(date.year(), date.month()).ok_or_else(|| {
            Error::InvalidMonth(format!("{:04}{:02}", date.year(), date.month() as u8))
        })
    }

    /// The current month in `canonical_timezone`.
    pub fn current(canonical_timezone: &str) -> Result<Self, Error> {
        local_today(canonical_timezone).and_then(Self::containing)
    }

    fn from_calendar_month(year: i32, month: Month) -> Option<Self> {
        let first_day = Date::from_calendar_date(year, month, 1).ok()?;
        let next_first_day = match month {
            Month::December => Date::from_calendar_date(year.checked_add(1)?, Month::January, 1),
            month => Date::from_calendar_date(year, month.next(), 1),
        }
        .ok()?;

        Some(Self {
            first_day,
            next_first_day,
        })
    }

    /// The half-open range `[first day, first day of next month)`.
    pub fn date_range(self) -> (Date, Date) {
        (self.first_day, self.next_first_day)
    }
}

impl Display for BudgetMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}{:02}",
            self.first_day.year(),
            self.first_day.month() as u8
        )
    }
}

impl TryFrom<String> for BudgetMonth {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BudgetMonth> for String {
    fn from(month: BudgetMonth) -> Self {
        month.to_string()
    }
}

impl ToSql for BudgetMonth {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for BudgetMonth {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::parse(value.as_str()?).map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}
