use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};

use crate::error::AppError;

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Parses a `YYYY-MM-DD` query value.
pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), ISO_DATE)
        .map_err(|_| AppError::validation("invalid date format, expected YYYY-MM-DD"))
}

pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<Date>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_date(s).map(Some),
        None => Ok(None),
    }
}

/// Serde adapter writing `Date` as `YYYY-MM-DD`.
pub mod iso_date {
    use serde::{ser, Serializer};
    use time::Date;

    use super::ISO_DATE;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = date.format(ISO_DATE).map_err(ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    /// Optional request dates; blank strings and `null` read as absent.
    pub mod option {
        use serde::{de, Deserialize, Deserializer};
        use time::Date;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(text) if !text.trim().is_empty() => super::super::parse_date(&text)
                    .map(Some)
                    .map_err(de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date("2024-02-29").unwrap(), date!(2024 - 02 - 29));
        assert_eq!(parse_date(" 2024-01-01 ").unwrap(), date!(2024 - 01 - 01));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(matches!(parse_date("2024/01/01"), Err(AppError::Validation(_))));
        assert!(matches!(parse_date("2023-02-29"), Err(AppError::Validation(_))));
        assert!(matches!(parse_date("yesterday"), Err(AppError::Validation(_))));
    }

    #[test]
    fn blank_optional_date_is_none() {
        assert_eq!(parse_optional_date(None).unwrap(), None);
        assert_eq!(parse_optional_date(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_optional_date(Some("2024-03-05")).unwrap(),
            Some(date!(2024 - 03 - 05))
        );
    }

    #[test]
    fn serde_adapter_writes_plain_date() {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(with = "iso_date")]
            day: Date,
        }
        let json = serde_json::to_string(&Wrapper { day: date!(2024 - 01 - 09) }).unwrap();
        assert_eq!(json, r#"{"day":"2024-01-09"}"#);
    }

    #[test]
    fn optional_request_date() {
        #[derive(serde::Deserialize)]
        struct Body {
            #[serde(default, with = "iso_date::option")]
            date: Option<Date>,
        }
        let read = |raw: &str| serde_json::from_str::<Body>(raw).map(|b| b.date);
        assert_eq!(read(r#"{"date":"2024-01-09"}"#).unwrap(), Some(date!(2024 - 01 - 09)));
        assert_eq!(read(r#"{"date":" "}"#).unwrap(), None);
        assert_eq!(read(r#"{"date":null}"#).unwrap(), None);
        assert_eq!(read("{}").unwrap(), None);
        assert!(read(r#"{"date":"09/01/2024"}"#).is_err());
    }
}
