//! Live editing sessions.
//!
//! A session owns the latest in-memory document of one resume. Every edit,
//! whichever view it came from, is applied against that latest document, and
//! each effective change is handed to the session's save controller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::import::extractor::{ImportError, SectionExtractor};
use crate::persistence::save_controller::{SaveController, TeardownPolicy};
use crate::persistence::store::{ResumeStore, StoreError};
use crate::resume::document::{EditCommand, EditError, ResumeDocument};
use crate::resume::record::{ResumeRecord, SectionType};

pub struct EditorSession {
    document: Mutex<ResumeDocument>,
    saver: SaveController,
}

impl EditorSession {
    pub fn new(document: ResumeDocument, saver: SaveController) -> Self {
        Self {
            document: Mutex::new(document),
            saver,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResumeDocument> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ResumeDocument {
        self.lock().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.saver.is_dirty()
    }

    /// Applies one command to the current document and schedules a save if
    /// the revision moved. Scheduling happens under the document lock so
    /// saves are queued in revision order.
    pub fn apply(&self, command: EditCommand) -> Result<ResumeDocument, EditError> {
        let mut document = self.lock();
        let next = document.apply(command)?;
        if next.revision != document.revision {
            *document = next.clone();
            self.saver.schedule(&next);
        }
        Ok(next)
    }

    /// Extracts a fragment from `text` and merges it into the document as it
    /// is when the extractor answers, not as it was when the call started.
    /// Concurrent imports are not cancelled; each merges when it resolves.
    pub async fn import(
        &self,
        section: SectionType,
        text: &str,
        extractor: &dyn SectionExtractor,
    ) -> Result<ResumeDocument, ImportError> {
        let fragment = extractor.extract(section, text).await?;
        self.apply(EditCommand::MergeFragment { section, fragment })
            .map_err(|e| {
                warn!("Rejected {section} fragment: {e}");
                ImportError::from(e)
            })
    }

    /// Writes the current document now, cancelling any scheduled write.
    pub async fn save_now(&self) -> Result<ResumeDocument, StoreError> {
        let document = self.snapshot();
        self.saver.save_now(&document).await?;
        Ok(document)
    }

    pub async fn teardown(&self, policy: TeardownPolicy) -> Result<(), StoreError> {
        if policy == TeardownPolicy::Flush && self.saver.is_dirty() && !self.saver.has_pending() {
            // The last debounced write failed and nothing is queued to retry it.
            self.save_now().await?;
            return Ok(());
        }
        self.saver.teardown(policy).await
    }
}

/// Open sessions by resume id.
pub struct SessionRegistry {
    store: Arc<dyn ResumeStore>,
    window: Duration,
    sessions: Mutex<HashMap<Uuid, Arc<EditorSession>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn ResumeStore>, window: Duration) -> Self {
        Self {
            store,
            window,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<EditorSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_for(&self, document: ResumeDocument, committed: Option<u64>) -> EditorSession {
        let saver = SaveController::new(document.id, Arc::clone(&self.store), self.window, committed);
        EditorSession::new(document, saver)
    }

    /// Starts a new resume from the template and persists it immediately.
    pub async fn create(&self) -> Result<Arc<EditorSession>, StoreError> {
        let id = Uuid::new_v4();
        let session = Arc::new(self.session_for(
            ResumeDocument::new(id, 0, ResumeRecord::template()),
            None,
        ));
        session.save_now().await?;
        self.sessions().insert(id, Arc::clone(&session));
        info!("Created resume {id}");
        Ok(session)
    }

    /// Returns the open session for `id`, loading it from storage if needed.
    pub async fn open(&self, id: Uuid) -> Result<Option<Arc<EditorSession>>, StoreError> {
        if let Some(session) = self.sessions().get(&id) {
            return Ok(Some(Arc::clone(session)));
        }

        let Some(stored) = self.store.load(id).await? else {
            return Ok(None);
        };
        let session = Arc::new(self.session_for(
            ResumeDocument::new(id, stored.revision, stored.record),
            Some(stored.revision),
        ));
        // Another request may have opened it while we were loading.
        let session = Arc::clone(self.sessions().entry(id).or_insert(session));
        info!("Opened resume {id} at revision {}", stored.revision);
        Ok(Some(session))
    }

    /// Closes a session. With `Flush` a failed write keeps the session open so
    /// the pending edits are not lost.
    pub async fn close(&self, id: Uuid, policy: TeardownPolicy) -> Result<bool, StoreError> {
        let Some(session) = self.sessions().remove(&id) else {
            return Ok(false);
        };
        if let Err(e) = session.teardown(policy).await {
            self.sessions().entry(id).or_insert(session);
            return Err(e);
        }
        info!("Closed resume {id} ({policy:?})");
        Ok(true)
    }

    /// Tears down every open session. Used on shutdown.
    pub async fn close_all(&self, policy: TeardownPolicy) {
        let sessions: Vec<(Uuid, Arc<EditorSession>)> = self.sessions().drain().collect();
        for (id, session) in sessions {
            if let Err(e) = session.teardown(policy).await {
                warn!("Failed to flush resume {id} on shutdown: {e}");
            }
        }
    }
}
