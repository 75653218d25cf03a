//! In-memory `ResumeStore` for tests. Records every write so tests can count them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::persistence::store::{ResumeStore, StoreError, StoredResume};
use crate::resume::record::ResumeRecord;

#[derive(Default)]
pub struct MemoryStore {
    writes: Mutex<Vec<(Uuid, StoredResume)>>,
    failures_left: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` saves fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<(Uuid, StoredResume)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl ResumeStore for MemoryStore {
    async fn load(&self, resume_id: Uuid) -> Result<Option<StoredResume>, StoreError> {
        Ok(self
            .writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == resume_id)
            .map(|(_, stored)| stored)
            .max_by_key(|stored| stored.revision)
            .cloned())
    }

    async fn save(
        &self,
        resume_id: Uuid,
        revision: u64,
        record: &ResumeRecord,
    ) -> Result<(), StoreError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.writes.lock().unwrap().push((
            resume_id,
            StoredResume {
                revision,
                record: record.clone(),
            },
        ));
        Ok(())
    }
}
