//! Debounced persistence for one resume.
//!
//! `schedule` keeps a single pending write and restarts its timer on every
//! call, so a burst of edits costs one write of the last record. `save_now`
//! bypasses the timer and cancels whatever is pending. All writes go through
//! one lane that remembers the last committed revision; a write that is not
//! newer than it is skipped, which keeps an already-fired timer write from
//! landing on top of a later explicit save.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::persistence::store::{ResumeStore, StoreError};
use crate::resume::document::ResumeDocument;
use crate::resume::record::ResumeRecord;

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// What to do with a pending write when its session goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownPolicy {
    Flush,
    Discard,
}

#[derive(Clone)]
pub struct SaveController {
    inner: Arc<Inner>,
}

struct Inner {
    resume_id: Uuid,
    store: Arc<dyn ResumeStore>,
    window: Duration,
    slot: Mutex<Slot>,
    last_committed: tokio::sync::Mutex<Option<u64>>,
}

#[derive(Default)]
struct Slot {
    pending: Option<PendingWrite>,
    dirty: bool,
}

struct PendingWrite {
    revision: u64,
    record: ResumeRecord,
    timer: JoinHandle<()>,
}

impl SaveController {
    /// `committed` is the revision already in storage, if any.
    pub fn new(
        resume_id: Uuid,
        store: Arc<dyn ResumeStore>,
        window: Duration,
        committed: Option<u64>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                resume_id,
                store,
                window,
                slot: Mutex::new(Slot::default()),
                last_committed: tokio::sync::Mutex::new(committed),
            }),
        }
    }

    /// Replaces any pending write with `document` and restarts the timer.
    /// A document older than the pending one is ignored. Failures on this
    /// path are logged and leave the controller dirty.
    pub fn schedule(&self, document: &ResumeDocument) {
        let mut slot = self.inner.lock_slot();
        if let Some(pending) = &slot.pending {
            if pending.revision >= document.revision {
                debug!(
                    "Ignoring save of resume {} revision {}: revision {} already pending",
                    self.inner.resume_id, document.revision, pending.revision
                );
                return;
            }
        }
        if let Some(previous) = slot.pending.take() {
            previous.timer.abort();
            debug!(
                "Superseded pending save of resume {} revision {}",
                self.inner.resume_id, previous.revision
            );
        }

        let inner = Arc::clone(&self.inner);
        let revision = document.revision;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.window).await;
            inner.fire(revision).await;
        });

        slot.pending = Some(PendingWrite {
            revision,
            record: document.record.clone(),
            timer,
        });
        slot.dirty = true;
    }

    /// Writes `document` immediately and drops any pending write that it
    /// covers. A pending write newer than `document` keeps its timer.
    pub async fn save_now(&self, document: &ResumeDocument) -> Result<(), StoreError> {
        if let Some((revision, _)) = self.inner.cancel_pending_through(document.revision) {
            debug!(
                "Explicit save of resume {} replaces pending revision {revision}",
                self.inner.resume_id
            );
        }
        self.inner.commit(document.revision, &document.record).await
    }

    pub async fn teardown(&self, policy: TeardownPolicy) -> Result<(), StoreError> {
        let Some((revision, record)) = self.inner.cancel_pending() else {
            return Ok(());
        };
        match policy {
            TeardownPolicy::Flush => self.inner.commit(revision, &record).await,
            TeardownPolicy::Discard => {
                info!(
                    "Discarding unsaved revision {revision} of resume {}",
                    self.inner.resume_id
                );
                self.inner.lock_slot().dirty = false;
                Ok(())
            }
        }
    }

    /// True while there are edits storage has not confirmed.
    pub fn is_dirty(&self) -> bool {
        self.inner.lock_slot().dirty
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock_slot().pending.is_some()
    }
}

impl Inner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_pending(&self) -> Option<(u64, ResumeRecord)> {
        self.cancel_pending_through(u64::MAX)
    }

    /// Cancels the pending write if its revision is at most `revision`.
    fn cancel_pending_through(&self, revision: u64) -> Option<(u64, ResumeRecord)> {
        let mut slot = self.lock_slot();
        if slot.pending.as_ref()?.revision > revision {
            return None;
        }
        let pending = slot.pending.take()?;
        pending.timer.abort();
        Some((pending.revision, pending.record))
    }

    /// Timer expiry. Only writes if `revision` is still the pending one.
    async fn fire(&self, revision: u64) {
        let record = {
            let mut slot = self.lock_slot();
            let current = slot
                .pending
                .as_ref()
                .is_some_and(|pending| pending.revision == revision);
            if !current {
                return;
            }
            slot.pending.take().map(|pending| pending.record)
        };
        let Some(record) = record else {
            return;
        };

        if let Err(e) = self.commit(revision, &record).await {
            warn!(
                "Debounced save of resume {} revision {revision} failed, retrying on next edit: {e}",
                self.resume_id
            );
        }
    }

    async fn commit(&self, revision: u64, record: &ResumeRecord) -> Result<(), StoreError> {
        let mut last = self.last_committed.lock().await;
        if last.is_some_and(|committed| revision <= committed) {
            debug!(
                "Skipping save of resume {} revision {revision}: already at {:?}",
                self.resume_id, *last
            );
            self.mark_clean_if_idle();
            return Ok(());
        }

        match self.store.save(self.resume_id, revision, record).await {
            Ok(()) => {
                *last = Some(revision);
                self.mark_clean_if_idle();
                Ok(())
            }
            Err(e) => {
                self.lock_slot().dirty = true;
                Err(e)
            }
        }
    }

    fn mark_clean_if_idle(&self) {
        let mut slot = self.lock_slot();
        if slot.pending.is_none() {
            slot.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::memory::MemoryStore;
    use crate::resume::document::EditCommand;

    fn controller(store: &Arc<MemoryStore>) -> (SaveController, ResumeDocument) {
        let id = Uuid::new_v4();
        let store: Arc<dyn ResumeStore> = store.clone();
        (
            SaveController::new(id, store, DEFAULT_DEBOUNCE_WINDOW, None),
            ResumeDocument::new(id, 0, ResumeRecord::template()),
        )
    }

    fn rename(doc: &ResumeDocument, name: &str) -> ResumeDocument {
        doc.apply(EditCommand::Patch {
            path: "name".into(),
            text: name.into(),
        })
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_window_writes_once_with_last_value() {
        let store = Arc::new(MemoryStore::new());
        let (saver, doc) = controller(&store);

        let first = rename(&doc, "张");
        saver.schedule(&first);
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = rename(&first, "张三");
        saver.schedule(&second);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.write_count(), 0, "timer must restart on each edit");

        tokio::time::sleep(Duration::from_millis(200)).await;
        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1.record.name, "张三");
        assert_eq!(writes[0].1.revision, second.revision);
        assert!(!saver.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_revision_never_replaces_pending_one() {
        let store = Arc::new(MemoryStore::new());
        let (saver, doc) = controller(&store);

        let older = rename(&doc, "甲");
        let newer = rename(&older, "乙");
        saver.schedule(&newer);
        saver.schedule(&older);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1.revision, newer.revision);
        assert_eq!(writes[0].1.record.name, "乙");
        assert!(!saver.is_dirty());

        saver.teardown(TeardownPolicy::Flush).await.unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_now_cancels_pending_write() {
        let store = Arc::new(MemoryStore::new());
        let (saver, doc) = controller(&store);

        let edited = rename(&doc, "李四");
        saver.schedule(&edited);
        saver.save_now(&edited).await.unwrap();
        assert_eq!(store.write_count(), 1);
        assert!(!saver.has_pending());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_now_of_older_snapshot_keeps_newer_pending_write() {
        let store = Arc::new(MemoryStore::new());
        let (saver, doc) = controller(&store);

        let older = rename(&doc, "丙");
        let newer = rename(&older, "丁");
        saver.schedule(&newer);
        saver.save_now(&older).await.unwrap();
        assert!(saver.has_pending());
        assert!(saver.is_dirty());

        tokio::time::sleep(Duration::from_secs(1)).await;
        let writes = store.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].1.record.name, "丁");
        assert!(!saver.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_revision_never_overwrites_newer_save() {
        let store = Arc::new(MemoryStore::new());
        let (saver, doc) = controller(&store);

        let older = rename(&doc, "旧");
        let newer = rename(&older, "新");
        saver.save_now(&newer).await.unwrap();
        saver.save_now(&older).await.unwrap();
        saver.save_now(&newer).await.unwrap();

        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1.record.name, "新");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_debounced_write_stays_dirty_until_next_edit() {
        let store = Arc::new(MemoryStore::new());
        let (saver, doc) = controller(&store);
        store.fail_next(1);

        let first = rename(&doc, "王");
        saver.schedule(&first);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.write_count(), 0);
        assert!(saver.is_dirty());
        assert!(!saver.has_pending(), "failed writes are not retried on a timer");

        let second = rename(&first, "王五");
        saver.schedule(&second);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.write_count(), 1);
        assert!(!saver.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_now_failure_is_returned() {
        let store = Arc::new(MemoryStore::new());
        let (saver, doc) = controller(&store);
        store.fail_next(1);

        let edited = rename(&doc, "赵");
        assert!(saver.save_now(&edited).await.is_err());
        assert!(saver.is_dirty());
        saver.save_now(&edited).await.unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_flush_writes_pending_record() {
        let store = Arc::new(MemoryStore::new());
        let (saver, doc) = controller(&store);

        let edited = rename(&doc, "钱");
        saver.schedule(&edited);
        saver.teardown(TeardownPolicy::Flush).await.unwrap();
        assert_eq!(store.write_count(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_discard_drops_pending_record() {
        let store = Arc::new(MemoryStore::new());
        let (saver, doc) = controller(&store);

        saver.schedule(&rename(&doc, "孙"));
        saver.teardown(TeardownPolicy::Discard).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.write_count(), 0);
        assert!(!saver.is_dirty());
    }
}
