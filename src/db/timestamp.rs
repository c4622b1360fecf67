//! Timestamps are stored as fixed-width RFC 3339 strings (UTC, milliseconds)
//! so that string ordering in the store matches time ordering.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&super::format(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.is_empty() => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Stamped {
        #[serde(with = "super")]
        at: DateTime<Utc>,
        #[serde(with = "super::option", default)]
        maybe: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_fixed_width_format() {
        let whole = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let fractional = whole + chrono::Duration::milliseconds(500);
        assert_eq!(format(&whole), "2024-03-01T09:00:00.000Z");
        assert_eq!(format(&fractional), "2024-03-01T09:00:00.500Z");
        assert!(format(&whole) < format(&fractional));
    }

    #[test]
    fn test_serde_through_json() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let value = Stamped { at, maybe: None };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["at"], "2024-12-31T23:59:59.000Z");
        assert!(json["maybe"].is_null());

        let parsed: Stamped =
            serde_json::from_str(r#"{"at":"2024-12-31T23:59:59.000Z","maybe":"2025-01-01T00:00:00+09:00"}"#)
                .unwrap();
        assert_eq!(parsed.at, at);
        assert_eq!(parsed.maybe, Some(Utc.with_ymd_and_hms(2024, 12, 31, 15, 0, 0).unwrap()));
    }
}
