use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, OffsetDateTime, Time};

use crate::timefmt;

/// Participant identifier, trimmed and upper-cased (`p001 ` and `P001` are the same participant).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ParticipantId(pub(crate) String);

impl ParticipantId {
    pub fn parse(raw: &str) -> Option<Self> {
        let id = raw.trim().to_uppercase();
        if id.is_empty() {
            return None;
        }
        Some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ParticipantId {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        ParticipantId::parse(&raw).ok_or_else(|| serde::de::Error::custom("empty participant id"))
    }
}

/// Self-declared sensitivity to the tracked substance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

impl Sensitivity {
    /// Case-insensitive; empty or unknown text means "not stated".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: ParticipantId,
    pub age: u8,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub sensitivity: Option<Sensitivity>,
    /// Screen time after 21h, free-form bucket such as `"1-2h"`.
    #[serde(default)]
    pub screen_time_evening: Option<String>,
    #[serde(default)]
    pub sport: Option<bool>,
    #[serde(with = "timefmt::ts")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptoms {
    #[serde(default)]
    pub palpitations: bool,
    #[serde(default)]
    pub headache: bool,
    #[serde(default)]
    pub irritability: bool,
    #[serde(default)]
    pub digestive: bool,
}

/// One participant's self-report for one calendar day. `(participant_id, date)` is the key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub participant_id: ParticipantId,
    #[serde(with = "timefmt::day")]
    pub date: Date,
    pub total_mg: u32,
    pub last_intake_hour: u8,
    #[serde(with = "timefmt::clock")]
    pub bed_time: Time,
    #[serde(with = "timefmt::clock")]
    pub wake_time: Time,
    pub sleep_hours: f64,
    pub sleep_quality: u8,
    pub stress: u8,
    pub anxiety: u8,
    pub focus: u8,
    #[serde(flatten)]
    pub symptoms: Symptoms,
    #[serde(default)]
    pub intake_detail: String,
    #[serde(with = "timefmt::ts")]
    pub created_at: OffsetDateTime,
}

impl DailyRecord {
    pub fn total(&self) -> f64 {
        f64::from(self.total_mg)
    }

    pub fn key(&self) -> String {
        record_key(&self.participant_id, self.date)
    }
}

pub fn record_key(participant_id: &ParticipantId, date: Date) -> String {
    format!("{participant_id}@{date}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_id_is_case_normalized() {
        let a = ParticipantId::parse("  p007 ").unwrap();
        let b = ParticipantId::parse("P007").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "P007");
        assert!(ParticipantId::parse("   ").is_none());
    }

    #[test]
    fn sensitivity_parses_loosely() {
        assert_eq!(Sensitivity::parse("HIGH"), Some(Sensitivity::High));
        assert_eq!(Sensitivity::parse(" low"), Some(Sensitivity::Low));
        assert_eq!(Sensitivity::parse(""), None);
        assert_eq!(Sensitivity::parse("extreme"), None);
    }

    #[test]
    fn daily_record_serializes_flat_with_text_dates() {
        let r = DailyRecord {
            participant_id: ParticipantId::parse("p001").unwrap(),
            date: timefmt::parse_day("2026-02-15").unwrap(),
            total_mg: 170,
            last_intake_hour: 15,
            bed_time: timefmt::parse_clock("23:30").unwrap(),
            wake_time: timefmt::parse_clock("07:00").unwrap(),
            sleep_hours: 7.5,
            sleep_quality: 4,
            stress: 3,
            anxiety: 2,
            focus: 7,
            symptoms: Symptoms {
                headache: true,
                ..Symptoms::default()
            },
            intake_detail: "Filter coffee (250 ml) x1 (95 mg)".to_string(),
            created_at: timefmt::parse_ts("2026-02-15T21:00:00Z").unwrap(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["participant_id"], "P001");
        assert_eq!(v["date"], "2026-02-15");
        assert_eq!(v["bed_time"], "23:30");
        assert_eq!(v["headache"], true);
        assert_eq!(v["palpitations"], false);

        let back: DailyRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, r);
        assert_eq!(back.key(), "P001@2026-02-15");
    }
}
