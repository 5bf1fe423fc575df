//! UTC timestamp formatting shared across the wire surface.
//!
//! The Expo client validates manifest timestamps strictly, so every
//! serialized instant uses exactly `YYYY-MM-DDTHH:MM:SS.sssZ`. The same
//! fixed-width form is used as the storage encoding, which keeps text
//! ordering chronological.

use chrono::{DateTime, ParseError, Utc};

/// Millisecond-precision UTC format used on the wire and in storage.
pub const MILLIS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format an instant as `YYYY-MM-DDTHH:MM:SS.sssZ`.
#[must_use]
pub fn format_utc_millis(instant: &DateTime<Utc>) -> String {
    instant.format(MILLIS_FORMAT).to_string()
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_utc(value: &str) -> Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(value).map(|parsed| parsed.with_timezone(&Utc))
}

/// Serde adapter enforcing the millisecond wire format.
pub mod serde_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_utc_millis(instant))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_utc(&value).map_err(de::Error::custom)
    }

    /// The same adapter for optional timestamps.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S>(
            instant: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match instant {
                Some(instant) => {
                    serializer.serialize_str(&crate::timefmt::format_utc_millis(instant))
                }
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Option::<String>::deserialize(deserializer)?;
            value
                .map(|value| crate::timefmt::parse_utc(&value).map_err(de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_exactly_three_fraction_digits() {
        let instant = parse_utc("2025-01-02T03:04:05.678Z").unwrap();
        assert_eq!(format_utc_millis(&instant), "2025-01-02T03:04:05.678Z");

        let whole_second = parse_utc("2025-01-02T03:04:05Z").unwrap();
        assert_eq!(format_utc_millis(&whole_second), "2025-01-02T03:04:05.000Z");
    }

    #[test]
    fn truncates_sub_millisecond_precision() {
        let instant = parse_utc("2025-01-02T03:04:05.678901Z").unwrap();
        assert_eq!(format_utc_millis(&instant), "2025-01-02T03:04:05.678Z");
    }

    #[test]
    fn parse_accepts_offset_forms() {
        let instant = parse_utc("2025-01-02T04:04:05.678+01:00").unwrap();
        assert_eq!(format_utc_millis(&instant), "2025-01-02T03:04:05.678Z");
    }
}
