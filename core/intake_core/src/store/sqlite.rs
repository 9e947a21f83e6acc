use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use time::{Date, OffsetDateTime};
use tracing::{debug, warn};

use super::{RecordStore, StoreError, StoreResult};
use crate::config::EngineConfig;
use crate::model::{record_key, DailyRecord, Participant, ParticipantId, Sensitivity, Symptoms};
use crate::timefmt;

const RECORD_COLUMNS: &str = "participant_id, date, total_mg, last_intake_hour, bed_time, wake_time, sleep_hours, sleep_quality, stress, anxiety, focus, palpitations, headache, irritability, digestive, intake_detail, created_at";

/// SQLite-backed store. `(participant_id, date)` is the table's primary key, so uniqueness
/// holds even if two connections race past the read-side check.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Stored configuration, or `defaults` when none is stored yet or the stored one no longer
    /// parses or validates. Whatever is returned is also what ends up stored.
    pub fn load_or_init_config(&mut self, defaults: &EngineConfig, now: OffsetDateTime) -> StoreResult<EngineConfig> {
        if let Some(stored) = self.load_config()? {
            match serde_json::from_str::<EngineConfig>(&stored) {
                Ok(cfg) if cfg.validate().is_ok() => return Ok(cfg),
                Ok(cfg) => warn!("stored config rejected ({:?}); resetting", cfg.validate().err()),
                Err(err) => warn!("stored config unreadable ({err}); resetting"),
            }
        }
        self.save_config(defaults, now)?;
        Ok(defaults.clone())
    }

    fn load_config(&self) -> StoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT config_json FROM app_settings WHERE id = 1", [], |row| row.get(0))
            .optional()?)
    }

    pub fn save_config(&mut self, cfg: &EngineConfig, updated_at: OffsetDateTime) -> StoreResult<()> {
        let json = serde_json::to_string(cfg).map_err(|err| StoreError::Corrupt {
            details: format!("config encode: {err}"),
        })?;
        self.conn.execute(
            r#"
INSERT INTO app_settings (id, config_json, updated_at)
VALUES (1, ?1, ?2)
ON CONFLICT(id) DO UPDATE SET
  config_json=excluded.config_json,
  updated_at=excluded.updated_at
        "#,
            (json, timefmt::fmt_ts(updated_at)),
        )?;
        Ok(())
    }
}

fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS participants (
  participant_id TEXT PRIMARY KEY,
  age INTEGER NOT NULL,
  sex TEXT,
  sensitivity TEXT,
  screen_time_evening TEXT,
  sport INTEGER,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS daily_records (
  participant_id TEXT NOT NULL,
  date TEXT NOT NULL,
  total_mg INTEGER NOT NULL,
  last_intake_hour INTEGER NOT NULL,
  bed_time TEXT NOT NULL,
  wake_time TEXT NOT NULL,
  sleep_hours REAL NOT NULL,
  sleep_quality INTEGER NOT NULL,
  stress INTEGER NOT NULL,
  anxiety INTEGER NOT NULL,
  focus INTEGER NOT NULL,
  palpitations INTEGER NOT NULL DEFAULT 0,
  headache INTEGER NOT NULL DEFAULT 0,
  irritability INTEGER NOT NULL DEFAULT 0,
  digestive INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL,
  PRIMARY KEY (participant_id, date)
);

CREATE TABLE IF NOT EXISTS app_settings (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  config_json TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
"#,
    )?;
    ensure_daily_records_columns(conn)?;
    Ok(())
}

/// Older databases predate the intake breakdown column.
fn ensure_daily_records_columns(conn: &Connection) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(daily_records)")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut cols: HashSet<String> = HashSet::new();
    for r in rows {
        cols.insert(r?);
    }

    if !cols.contains("intake_detail") {
        conn.execute(
            "ALTER TABLE daily_records ADD COLUMN intake_detail TEXT NOT NULL DEFAULT ''",
            [],
        )?;
    }
    Ok(())
}

fn conversion_error(col: usize, what: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        col,
        rusqlite::types::Type::Text,
        format!("invalid {what}: '{raw}'").into(),
    )
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    let id: String = row.get(0)?;
    let sensitivity: Option<String> = row.get(3)?;
    let sport: Option<i64> = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(Participant {
        participant_id: ParticipantId::parse(&id).ok_or_else(|| conversion_error(0, "participant id", &id))?,
        age: row.get(1)?,
        sex: row.get(2)?,
        sensitivity: sensitivity.as_deref().and_then(Sensitivity::parse),
        screen_time_evening: row.get(4)?,
        sport: sport.map(|v| v != 0),
        created_at: timefmt::parse_ts(&created_at).ok_or_else(|| conversion_error(6, "timestamp", &created_at))?,
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<DailyRecord> {
    let id: String = row.get(0)?;
    let date: String = row.get(1)?;
    let bed: String = row.get(4)?;
    let wake: String = row.get(5)?;
    let created_at: String = row.get(16)?;
    let flag = |i: usize| -> rusqlite::Result<bool> { Ok(row.get::<_, i64>(i)? != 0) };
    Ok(DailyRecord {
        participant_id: ParticipantId::parse(&id).ok_or_else(|| conversion_error(0, "participant id", &id))?,
        date: timefmt::parse_day(&date).ok_or_else(|| conversion_error(1, "date", &date))?,
        total_mg: row.get(2)?,
        last_intake_hour: row.get(3)?,
        bed_time: timefmt::parse_clock(&bed).ok_or_else(|| conversion_error(4, "time", &bed))?,
        wake_time: timefmt::parse_clock(&wake).ok_or_else(|| conversion_error(5, "time", &wake))?,
        sleep_hours: row.get(6)?,
        sleep_quality: row.get(7)?,
        stress: row.get(8)?,
        anxiety: row.get(9)?,
        focus: row.get(10)?,
        symptoms: Symptoms {
            palpitations: flag(11)?,
            headache: flag(12)?,
            irritability: flag(13)?,
            digestive: flag(14)?,
        },
        intake_detail: row.get(15)?,
        created_at: timefmt::parse_ts(&created_at).ok_or_else(|| conversion_error(16, "timestamp", &created_at))?,
    })
}

impl RecordStore for SqliteStore {
    fn list_participants(&self) -> StoreResult<Vec<Participant>> {
        let mut stmt = self.conn.prepare(
            "SELECT participant_id, age, sex, sensitivity, screen_time_evening, sport, created_at FROM participants ORDER BY participant_id ASC",
        )?;
        let rows = stmt.query_map([], participant_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn get_participant(&self, id: &ParticipantId) -> StoreResult<Option<Participant>> {
        Ok(self
            .conn
            .query_row(
                "SELECT participant_id, age, sex, sensitivity, screen_time_evening, sport, created_at FROM participants WHERE participant_id = ?1",
                [id.as_str()],
                participant_from_row,
            )
            .optional()?)
    }

    fn append_participant(&mut self, p: Participant) -> StoreResult<()> {
        let key = p.participant_id.to_string();
        let res = self.conn.execute(
            "INSERT INTO participants (participant_id, age, sex, sensitivity, screen_time_evening, sport, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                p.participant_id.as_str(),
                p.age,
                p.sex.as_deref(),
                p.sensitivity.map(Sensitivity::as_str),
                p.screen_time_evening.as_deref(),
                p.sport.map(i64::from),
                timefmt::fmt_ts(p.created_at),
            ),
        );
        match res {
            Ok(_) => {
                debug!("participant {key} added");
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => {
                warn!("participant {key} already exists");
                Err(StoreError::DuplicateKey { key })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete_participant(&mut self, id: &ParticipantId, delete_records: bool) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM participants WHERE participant_id = ?1", [id.as_str()])?;
        if removed == 0 {
            return Err(StoreError::NotFound { key: id.to_string() });
        }
        let records_deleted = if delete_records {
            tx.execute("DELETE FROM daily_records WHERE participant_id = ?1", [id.as_str()])?
        } else {
            0
        };
        tx.commit()?;
        debug!("participant {id} deleted ({records_deleted} records)");
        Ok(records_deleted)
    }

    fn list_records(&self, id: &ParticipantId) -> StoreResult<Vec<DailyRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM daily_records WHERE participant_id = ?1 ORDER BY date ASC"
        ))?;
        let rows = stmt.query_map([id.as_str()], record_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn list_all_records(&self) -> StoreResult<Vec<DailyRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM daily_records ORDER BY participant_id ASC, date ASC"
        ))?;
        let rows = stmt.query_map([], record_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn append_record(&mut self, r: DailyRecord) -> StoreResult<()> {
        let key = r.key();
        let date = timefmt::fmt_day(r.date);
        let tx = self.conn.transaction()?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM daily_records WHERE participant_id = ?1 AND date = ?2",
                (r.participant_id.as_str(), date.as_str()),
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            warn!("record {key} already exists; append rejected");
            return Err(StoreError::DuplicateKey { key });
        }
        let res = tx.execute(
            &format!(
                "INSERT INTO daily_records ({RECORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            rusqlite::params![
                r.participant_id.as_str(),
                date,
                r.total_mg,
                r.last_intake_hour,
                timefmt::fmt_clock(r.bed_time),
                timefmt::fmt_clock(r.wake_time),
                r.sleep_hours,
                r.sleep_quality,
                r.stress,
                r.anxiety,
                r.focus,
                r.symptoms.palpitations,
                r.symptoms.headache,
                r.symptoms.irritability,
                r.symptoms.digestive,
                r.intake_detail,
                timefmt::fmt_ts(r.created_at),
            ],
        );
        match res {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Err(StoreError::DuplicateKey { key }),
            Err(err) => return Err(err.into()),
        }
        tx.commit()?;
        debug!("record {key} appended ({} mg)", r.total_mg);
        Ok(())
    }

    fn delete_record(&mut self, id: &ParticipantId, date: Date) -> StoreResult<()> {
        let n = self.conn.execute(
            "DELETE FROM daily_records WHERE participant_id = ?1 AND date = ?2",
            (id.as_str(), timefmt::fmt_day(date)),
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                key: record_key(id, date),
            });
        }
        debug!("record {} deleted", record_key(id, date));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::exercise_store;

    fn now() -> OffsetDateTime {
        timefmt::parse_ts("2026-02-15T08:00:00Z").unwrap()
    }

    #[test]
    fn sqlite_store_honours_contract() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        exercise_store(&mut store);
    }

    #[test]
    fn config_is_seeded_then_reloaded() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let compact = EngineConfig::preset("compact").unwrap();
        let loaded = store.load_or_init_config(&compact, now()).unwrap();
        assert_eq!(loaded, compact);

        let mut changed = compact.clone();
        changed.correlations = true;
        store.save_config(&changed, now()).unwrap();
        let reloaded = store.load_or_init_config(&EngineConfig::default(), now()).unwrap();
        assert_eq!(reloaded, changed);
    }

    #[test]
    fn invalid_stored_config_is_reset() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO app_settings (id, config_json, updated_at) VALUES (1, ?1, ?2)",
                (r#"{"trend": {"window_days": 30, "min_records": 3, "pattern_min_days": 3, "bin_min_records": 5}}"#, "x"),
            )
            .unwrap();
        let loaded = store.load_or_init_config(&EngineConfig::default(), now()).unwrap();
        assert_eq!(loaded, EngineConfig::default());
        let raw = store.load_config().unwrap().unwrap();
        assert!(raw.contains("\"window_days\":7"));
    }

    #[test]
    fn migration_adds_missing_detail_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE daily_records (participant_id TEXT NOT NULL, date TEXT NOT NULL, total_mg INTEGER NOT NULL, last_intake_hour INTEGER NOT NULL, bed_time TEXT NOT NULL, wake_time TEXT NOT NULL, sleep_hours REAL NOT NULL, sleep_quality INTEGER NOT NULL, stress INTEGER NOT NULL, anxiety INTEGER NOT NULL, focus INTEGER NOT NULL, palpitations INTEGER NOT NULL DEFAULT 0, headache INTEGER NOT NULL DEFAULT 0, irritability INTEGER NOT NULL DEFAULT 0, digestive INTEGER NOT NULL DEFAULT 0, created_at TEXT NOT NULL, PRIMARY KEY (participant_id, date));",
        )
        .unwrap();
        init_db(&conn).unwrap();
        let mut stmt = conn.prepare("PRAGMA table_info(daily_records)").unwrap();
        let cols: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(|c| c.unwrap())
            .collect();
        assert!(cols.iter().any(|c| c == "intake_detail"));
    }
}
