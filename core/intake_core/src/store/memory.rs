use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use time::Date;

use super::{RecordStore, StoreError, StoreResult};
use crate::model::{record_key, DailyRecord, Participant, ParticipantId};

/// In-process store over ordered maps. Key order gives the listing order for free.
#[derive(Debug, Default)]
pub struct MemoryStore {
    participants: BTreeMap<ParticipantId, Participant>,
    records: BTreeMap<(ParticipantId, Date), DailyRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn list_participants(&self) -> StoreResult<Vec<Participant>> {
        Ok(self.participants.values().cloned().collect())
    }

    fn get_participant(&self, id: &ParticipantId) -> StoreResult<Option<Participant>> {
        Ok(self.participants.get(id).cloned())
    }

    fn append_participant(&mut self, participant: Participant) -> StoreResult<()> {
        match self.participants.entry(participant.participant_id.clone()) {
            Entry::Occupied(e) => Err(StoreError::DuplicateKey {
                key: e.key().to_string(),
            }),
            Entry::Vacant(e) => {
                e.insert(participant);
                Ok(())
            }
        }
    }

    fn delete_participant(&mut self, id: &ParticipantId, delete_records: bool) -> StoreResult<usize> {
        if self.participants.remove(id).is_none() {
            return Err(StoreError::NotFound { key: id.to_string() });
        }
        if !delete_records {
            return Ok(0);
        }
        let before = self.records.len();
        self.records.retain(|(pid, _), _| pid != id);
        Ok(before - self.records.len())
    }

    fn list_records(&self, id: &ParticipantId) -> StoreResult<Vec<DailyRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|((pid, _), _)| pid == id)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn list_all_records(&self) -> StoreResult<Vec<DailyRecord>> {
        Ok(self.records.values().cloned().collect())
    }

    fn append_record(&mut self, record: DailyRecord) -> StoreResult<()> {
        match self.records.entry((record.participant_id.clone(), record.date)) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey { key: record.key() }),
            Entry::Vacant(e) => {
                e.insert(record);
                Ok(())
            }
        }
    }

    fn delete_record(&mut self, id: &ParticipantId, date: Date) -> StoreResult<()> {
        match self.records.remove(&(id.clone(), date)) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                key: record_key(id, date),
            }),
        }
    }
}
