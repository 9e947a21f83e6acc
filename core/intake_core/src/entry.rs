use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use time::{OffsetDateTime, Time};

use crate::catalog::Catalog;
use crate::metrics::{sleep_duration, total_intake};
use crate::model::{DailyRecord, ParticipantId, Symptoms};
use crate::parse::{bounded_or, clock_or, flag_or, int_or};
use crate::timefmt;

const DEFAULT_LAST_INTAKE_HOUR: u8 = 16;
const DEFAULT_SLEEP_QUALITY: u8 = 3;
const DEFAULT_STRESS: u8 = 5;
const DEFAULT_ANXIETY: u8 = 4;
const DEFAULT_FOCUS: u8 = 6;
const MAX_UNITS_PER_ITEM: i64 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("participant id is required")]
    InvalidParticipantId,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl EntryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParticipantId => "invalid_participant_id",
            Self::InvalidDate(_) => "invalid_date",
        }
    }
}

/// A raw daily submission as a form would post it. Only the key fields are strict; everything
/// else is read with parse-or-default.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EntryForm {
    pub participant_id: String,
    pub date: String,
    #[serde(default)]
    pub quantities: HashMap<String, Value>,
    #[serde(default)]
    pub last_intake_hour: Option<Value>,
    #[serde(default)]
    pub bed_time: Option<Value>,
    #[serde(default)]
    pub wake_time: Option<Value>,
    #[serde(default)]
    pub sleep_quality: Option<Value>,
    #[serde(default)]
    pub stress: Option<Value>,
    #[serde(default)]
    pub anxiety: Option<Value>,
    #[serde(default)]
    pub focus: Option<Value>,
    #[serde(default)]
    pub palpitations: Option<Value>,
    #[serde(default)]
    pub headache: Option<Value>,
    #[serde(default)]
    pub irritability: Option<Value>,
    #[serde(default)]
    pub digestive: Option<Value>,
}

impl EntryForm {
    /// Derives the stored record: totals from the catalog, sleep from bed/wake, `created_at`
    /// from `now`.
    pub fn derive(&self, catalog: &Catalog, now: OffsetDateTime) -> Result<DailyRecord, EntryError> {
        let participant_id =
            ParticipantId::parse(&self.participant_id).ok_or(EntryError::InvalidParticipantId)?;
        let date = timefmt::parse_day(&self.date).ok_or_else(|| EntryError::InvalidDate(self.date.clone()))?;

        let quantities: HashMap<String, u32> = self
            .quantities
            .iter()
            .map(|(label, v)| (label.clone(), int_or(Some(v), 0).clamp(0, MAX_UNITS_PER_ITEM) as u32))
            .collect();
        let intake = total_intake(catalog, &quantities);

        let bed_time = clock_or(self.bed_time.as_ref(), default_bed_time());
        let wake_time = clock_or(self.wake_time.as_ref(), default_wake_time());

        Ok(DailyRecord {
            participant_id,
            date,
            total_mg: intake.total_mg,
            last_intake_hour: bounded_or(self.last_intake_hour.as_ref(), DEFAULT_LAST_INTAKE_HOUR, 0, 23),
            bed_time,
            wake_time,
            sleep_hours: sleep_duration(bed_time, wake_time),
            sleep_quality: bounded_or(self.sleep_quality.as_ref(), DEFAULT_SLEEP_QUALITY, 1, 5),
            stress: bounded_or(self.stress.as_ref(), DEFAULT_STRESS, 1, 10),
            anxiety: bounded_or(self.anxiety.as_ref(), DEFAULT_ANXIETY, 1, 10),
            focus: bounded_or(self.focus.as_ref(), DEFAULT_FOCUS, 1, 10),
            symptoms: Symptoms {
                palpitations: flag_or(self.palpitations.as_ref(), false),
                headache: flag_or(self.headache.as_ref(), false),
                irritability: flag_or(self.irritability.as_ref(), false),
                digestive: flag_or(self.digestive.as_ref(), false),
            },
            intake_detail: intake.detail,
            created_at: now,
        })
    }
}

fn default_bed_time() -> Time {
    Time::from_hms(23, 30, 0).unwrap_or(Time::MIDNIGHT)
}

fn default_wake_time() -> Time {
    Time::from_hms(7, 0, 0).unwrap_or(Time::MIDNIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> OffsetDateTime {
        timefmt::parse_ts("2026-02-15T21:00:00Z").unwrap()
    }

    #[test]
    fn derive_computes_totals_and_sleep() {
        let form: EntryForm = serde_json::from_value(json!({
            "participant_id": " p002 ",
            "date": "2026-02-15",
            "quantities": { "Espresso (30 ml)": 2, "Cola (330 ml)": "1", "Green tea (250 ml)": 0 },
            "last_intake_hour": 18,
            "bed_time": "00:30",
            "wake_time": "06:30",
            "sleep_quality": 2,
            "stress": "8",
            "anxiety": 7,
            "focus": 5,
            "palpitations": 1,
            "headache": false
        }))
        .unwrap();

        let r = form.derive(&Catalog::standard(), now()).unwrap();
        assert_eq!(r.participant_id.as_str(), "P002");
        assert_eq!(r.total_mg, 2 * 75 + 35);
        assert_eq!(r.intake_detail, "Espresso (30 ml) x2 (150 mg) | Cola (330 ml) x1 (35 mg)");
        assert_eq!(r.sleep_hours, 6.0);
        assert_eq!(r.last_intake_hour, 18);
        assert_eq!(r.stress, 8);
        assert!(r.symptoms.palpitations);
        assert!(!r.symptoms.headache);
        assert_eq!(r.created_at, now());
    }

    #[test]
    fn malformed_fields_fall_back_to_form_defaults() {
        let form: EntryForm = serde_json::from_value(json!({
            "participant_id": "P001",
            "date": "2026-02-15",
            "quantities": { "Espresso (30 ml)": "lots", "Black tea (250 ml)": -3 },
            "last_intake_hour": "evening",
            "sleep_quality": 99,
            "anxiety": null
        }))
        .unwrap();

        let r = form.derive(&Catalog::standard(), now()).unwrap();
        assert_eq!(r.total_mg, 0);
        assert_eq!(r.intake_detail, "");
        assert_eq!(r.last_intake_hour, DEFAULT_LAST_INTAKE_HOUR);
        assert_eq!(r.sleep_quality, 5);
        assert_eq!(r.anxiety, DEFAULT_ANXIETY);
        assert_eq!(r.sleep_hours, 7.5);
    }

    #[test]
    fn key_fields_must_parse() {
        let mut form = EntryForm {
            participant_id: "  ".to_string(),
            date: "2026-02-15".to_string(),
            ..EntryForm::default()
        };
        assert_eq!(
            form.derive(&Catalog::standard(), now()),
            Err(EntryError::InvalidParticipantId)
        );

        form.participant_id = "P001".to_string();
        form.date = "15/02/2026".to_string();
        let err = form.derive(&Catalog::standard(), now()).unwrap_err();
        assert_eq!(err.code(), "invalid_date");
    }
}
