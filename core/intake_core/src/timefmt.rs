//! Text forms for calendar dates (`YYYY-MM-DD`), times of day (`HH:MM`) and RFC 3339
//! timestamps, plus the `serde(with = ...)` adapters the data model uses.

use time::{format_description::well_known::Rfc3339, Date, Month, OffsetDateTime, Time};

/// Parses `YYYY-MM-DD`.
pub fn parse_day(s: &str) -> Option<Date> {
    let parts: Vec<&str> = s.trim().split('-').collect();
    if parts.len() != 3 {
        return None;
    }
    let y: i32 = parts[0].parse().ok()?;
    let m: u8 = parts[1].parse().ok()?;
    let d: u8 = parts[2].parse().ok()?;
    let month = Month::try_from(m).ok()?;
    Date::from_calendar_date(y, month, d).ok()
}

/// Parses `HH:MM` (or `HH:MM:SS`, seconds ignored) or a bare hour `HH`.
pub fn parse_clock(s: &str) -> Option<Time> {
    let s = s.trim();
    let mut parts = s.split(':');
    let h: u8 = parts.next()?.trim().parse().ok()?;
    let m: u8 = match parts.next() {
        Some(p) => p.trim().parse().ok()?,
        None => 0,
    };
    Time::from_hms(h, m, 0).ok()
}

pub fn fmt_day(d: Date) -> String {
    d.to_string()
}

pub fn fmt_clock(t: Time) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

pub fn fmt_ts(t: OffsetDateTime) -> String {
    t.format(&Rfc3339).unwrap_or_default()
}

pub fn parse_ts(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339).ok()
}

pub mod day {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(d: &Date, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::fmt_day(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_day(&raw).ok_or_else(|| D::Error::custom(format!("invalid date '{raw}', expected YYYY-MM-DD")))
    }
}

pub mod clock {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::Time;

    pub fn serialize<S: Serializer>(t: &Time, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::fmt_clock(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Time, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_clock(&raw).ok_or_else(|| D::Error::custom(format!("invalid time '{raw}', expected HH:MM")))
    }
}

pub mod ts {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(t: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::fmt_ts(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_ts(&raw).ok_or_else(|| D::Error::custom(format!("invalid RFC 3339 timestamp '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_day_accepts_iso_and_rejects_garbage() {
        let d = parse_day("2026-02-15").unwrap();
        assert_eq!(d.year(), 2026);
        assert_eq!(d.month(), Month::February);
        assert_eq!(d.day(), 15);
        assert_eq!(fmt_day(d), "2026-02-15");

        assert!(parse_day("2026-02-30").is_none());
        assert!(parse_day("2026/02/15").is_none());
        assert!(parse_day("").is_none());
    }

    #[test]
    fn parse_clock_accepts_hours_and_minutes() {
        assert_eq!(fmt_clock(parse_clock("23:30").unwrap()), "23:30");
        assert_eq!(fmt_clock(parse_clock("7").unwrap()), "07:00");
        assert_eq!(fmt_clock(parse_clock("06:45:10").unwrap()), "06:45");
        assert!(parse_clock("24:00").is_none());
        assert!(parse_clock("ab:cd").is_none());
    }

    #[test]
    fn ts_round_trips_through_text() {
        let t = parse_ts("2026-02-15T08:30:00Z").unwrap();
        assert_eq!(fmt_ts(t), "2026-02-15T08:30:00Z");
    }
}
