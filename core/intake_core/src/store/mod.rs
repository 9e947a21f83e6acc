//! Keyed record store. Participants are keyed by id, daily records by `(participant, date)`.
//! Appends never overwrite: an existing key is rejected with [`StoreError::DuplicateKey`] and the
//! store is left unchanged. Correction is delete-then-append.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;
use time::Date;

use crate::model::{DailyRecord, Participant, ParticipantId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {key}")]
    DuplicateKey { key: String },
    #[error("not found: {key}")]
    NotFound { key: String },
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt row: {details}")]
    Corrupt { details: String },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::NotFound { .. } => "not_found",
            Self::Sql(_) | Self::Io(_) | Self::Corrupt { .. } => "db_error",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait RecordStore {
    /// Ordered by participant id.
    fn list_participants(&self) -> StoreResult<Vec<Participant>>;

    fn get_participant(&self, id: &ParticipantId) -> StoreResult<Option<Participant>>;

    fn append_participant(&mut self, participant: Participant) -> StoreResult<()>;

    /// Returns how many records were deleted with the participant.
    fn delete_participant(&mut self, id: &ParticipantId, delete_records: bool) -> StoreResult<usize>;

    /// One participant's records, ascending by date.
    fn list_records(&self, id: &ParticipantId) -> StoreResult<Vec<DailyRecord>>;

    /// Every record, ordered by participant then date.
    fn list_all_records(&self) -> StoreResult<Vec<DailyRecord>>;

    fn append_record(&mut self, record: DailyRecord) -> StoreResult<()>;

    fn delete_record(&mut self, id: &ParticipantId, date: Date) -> StoreResult<()>;
}

/// Next free `P<nnn>` id: one past the highest numeric `P` id in use.
pub fn next_participant_id<'a>(existing: impl IntoIterator<Item = &'a ParticipantId>) -> ParticipantId {
    let max_n = existing
        .into_iter()
        .filter_map(|id| {
            let digits = id.as_str().strip_prefix('P')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse::<u64>().ok()
        })
        .max()
        .unwrap_or(0);
    ParticipantId(format!("P{:03}", max_n + 1))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::Sensitivity;
    use crate::rules::tests::record;
    use crate::timefmt;

    pub(crate) fn participant(id: &str) -> Participant {
        Participant {
            participant_id: ParticipantId::parse(id).unwrap(),
            age: 21,
            sex: Some("F".to_string()),
            sensitivity: Some(Sensitivity::Medium),
            screen_time_evening: Some("1-2h".to_string()),
            sport: Some(true),
            created_at: timefmt::parse_ts("2026-02-01T09:00:00Z").unwrap(),
        }
    }

    fn rec(id: &str, date: &str, total: u32) -> DailyRecord {
        let mut r = record(date, total, 15, 7.5);
        r.participant_id = ParticipantId::parse(id).unwrap();
        r
    }

    /// Contract every implementation must honour.
    pub(crate) fn exercise_store(store: &mut dyn RecordStore) {
        store.append_participant(participant("p002")).unwrap();
        store.append_participant(participant("P001")).unwrap();
        let dup = store.append_participant(participant(" p001"));
        assert!(matches!(dup, Err(StoreError::DuplicateKey { .. })));
        let ids: Vec<String> = store
            .list_participants()
            .unwrap()
            .into_iter()
            .map(|p| p.participant_id.to_string())
            .collect();
        assert_eq!(ids, vec!["P001", "P002"]);
        assert_eq!(store.get_participant(&ParticipantId::parse("p002").unwrap()).unwrap(), Some(participant("P002")));

        store.append_record(rec("P001", "2026-02-03", 300)).unwrap();
        store.append_record(rec("P001", "2026-02-01", 100)).unwrap();
        store.append_record(rec("P002", "2026-02-02", 50)).unwrap();

        let dup = store.append_record(rec("P001", "2026-02-03", 10));
        match dup {
            Err(StoreError::DuplicateKey { key }) => assert_eq!(key, "P001@2026-02-03"),
            other => panic!("expected duplicate key, got {other:?}"),
        }
        let p1 = ParticipantId::parse("P001").unwrap();
        let records = store.list_records(&p1).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date.to_string(), "2026-02-01");
        assert_eq!(records[1].total_mg, 300, "rejected append must not overwrite");
        assert_eq!(records[1], rec("P001", "2026-02-03", 300));

        let all = store.list_all_records().unwrap();
        let keys: Vec<String> = all.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["P001@2026-02-01", "P001@2026-02-03", "P002@2026-02-02"]);

        let day = timefmt::parse_day("2026-02-01").unwrap();
        store.delete_record(&p1, day).unwrap();
        assert!(matches!(store.delete_record(&p1, day), Err(StoreError::NotFound { .. })));
        // Delete then re-append is how a record gets corrected.
        store.append_record(rec("P001", "2026-02-01", 120)).unwrap();
        assert_eq!(store.list_records(&p1).unwrap()[0].total_mg, 120);

        let p2 = ParticipantId::parse("P002").unwrap();
        assert_eq!(store.delete_participant(&p2, false).unwrap(), 0);
        assert_eq!(store.list_records(&p2).unwrap().len(), 1);
        assert_eq!(store.delete_participant(&p1, true).unwrap(), 2);
        assert!(store.list_records(&p1).unwrap().is_empty());
        assert!(matches!(store.delete_participant(&p1, true), Err(StoreError::NotFound { .. })));
        assert!(store.list_participants().unwrap().is_empty());
    }

    #[test]
    fn next_participant_id_counts_up() {
        let ids: Vec<ParticipantId> = ["P001", "p009", "X100", "P", "P12A", "guest"]
            .iter()
            .filter_map(|s| ParticipantId::parse(s))
            .collect();
        assert_eq!(next_participant_id(&ids).as_str(), "P010");
        assert_eq!(next_participant_id(&[]).as_str(), "P001");
        let big = [ParticipantId::parse("P1234").unwrap()];
        assert_eq!(next_participant_id(&big).as_str(), "P1235");
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(StoreError::DuplicateKey { key: "k".into() }.code(), "duplicate_key");
        assert_eq!(StoreError::NotFound { key: "k".into() }.code(), "not_found");
        assert_eq!(StoreError::Corrupt { details: "x".into() }.code(), "db_error");
    }
}
