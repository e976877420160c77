//! Serde helpers for the date and time formats used in request and response bodies.

/// Serialize a [time::Date] as "YYYY-MM-DD".
pub mod date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

    /// The calendar date format used throughout the API, e.g. "2025-01-31".
    pub const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = date.format(DATE_FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Date::parse(&s, DATE_FORMAT).map_err(|_| {
            serde::de::Error::custom(format!("invalid date \"{s}\", use YYYY-MM-DD"))
        })
    }
}

/// Serialize an optional [time::Date] as "YYYY-MM-DD" or null.
///
/// Fields using this module should also be marked `#[serde(default)]`.
pub mod option_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::date::DATE_FORMAT;

    pub fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => super::date::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(s) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };

        // Query strings such as `?from_date=` send an empty value.
        if s.is_empty() {
            return Ok(None);
        }

        Date::parse(&s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid date \"{s}\", use YYYY-MM-DD")))
    }
}

/// Serialize a [time::OffsetDateTime] as an RFC 3339 timestamp.
pub mod timestamp {
    use serde::Serializer;
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    pub fn serialize<S>(timestamp: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = timestamp
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: an absent field is `None`, an explicit null is
/// `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}
