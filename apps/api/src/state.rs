use std::sync::Arc;

use crate::import::extractor::SectionExtractor;
use crate::resume::session::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Open editing sessions, backed by the resume store.
    pub sessions: Arc<SessionRegistry>,
    /// Pluggable text-to-JSON collaborator. Default: LlmSectionExtractor.
    pub extractor: Arc<dyn SectionExtractor>,
}

#[cfg(test)]
pub use scripted::test_state;
