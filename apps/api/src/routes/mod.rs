pub mod health;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::import::handlers as import;
use crate::resume::handlers as resume;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route("/api/v1/resumes", post(resume::handle_create))
        .route("/api/v1/resumes/:id", get(resume::handle_get))
        .route("/api/v1/resumes/:id/save", post(resume::handle_save))
        .route("/api/v1/resumes/:id/reset", post(resume::handle_reset))
        .route(
            "/api/v1/resumes/:id/session",
            delete(resume::handle_close_session),
        )
        // Editing
        .route("/api/v1/resumes/:id/patch", post(resume::handle_patch))
        .route("/api/v1/resumes/:id/reorder", post(resume::handle_reorder))
        .route("/api/v1/resumes/:id/sections", get(resume::handle_sections))
        .route(
            "/api/v1/resumes/:id/sections/:section",
            put(resume::handle_replace_section),
        )
        .route(
            "/api/v1/resumes/:id/sections/:section/entries",
            post(resume::handle_add_entry),
        )
        .route(
            "/api/v1/resumes/:id/sections/:section/entries/:index",
            delete(resume::handle_remove_entry),
        )
        .route(
            "/api/v1/resumes/:id/sections/:section/title",
            patch(resume::handle_rename_section),
        )
        // Import
        .route("/api/v1/resumes/:id/import", post(import::handle_import))
        .route(
            "/api/v1/resumes/:id/import/fragment",
            post(import::handle_import_fragment),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_state;

    #[tokio::test]
    async fn test_health() {
        let (state, _store) = test_state(json!({}));
        let response = build_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["service"], "resume-api");
    }
}
