use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::persistence::save_controller::TeardownPolicy;
use crate::resume::document::{EditCommand, ResumeDocument};
use crate::resume::patch::SurfaceText;
use crate::resume::record::SectionType;
use crate::resume::sections::{descriptors, SectionDescriptor};
use crate::resume::session::EditorSession;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PatchRequest {
    pub path: String,
    pub text: SurfaceText,
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub from: usize,
    pub to: usize,
}

#[derive(Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

#[derive(Deserialize)]
pub struct CloseQuery {
    pub policy: Option<TeardownPolicy>,
}

/// Looks up the open session for `id`, loading the latest stored revision.
pub(crate) async fn load_session(
    state: &AppState,
    id: Uuid,
) -> Result<Arc<EditorSession>, AppError> {
    state
        .sessions
        .open(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

/// Accepts a UI id (`experience`) or a record key (`internships`).
pub(crate) fn parse_section(raw: &str) -> Result<SectionType, AppError> {
    SectionType::from_key(raw).ok_or_else(|| AppError::Validation(format!("Unknown section '{raw}'")))
}

async fn apply(
    state: &AppState,
    id: Uuid,
    command: EditCommand,
) -> Result<Json<ResumeDocument>, AppError> {
    let session = load_session(state, id).await?;
    Ok(Json(session.apply(command)?))
}

/// POST /api/v1/resumes
pub async fn handle_create(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ResumeDocument>), AppError> {
    let session = state.sessions.create().await?;
    Ok((StatusCode::CREATED, Json(session.snapshot())))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDocument>, AppError> {
    let session = load_session(&state, id).await?;
    Ok(Json(session.snapshot()))
}

/// GET /api/v1/resumes/:id/sections
pub async fn handle_sections(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SectionDescriptor>>, AppError> {
    let session = load_session(&state, id).await?;
    Ok(Json(descriptors(&session.snapshot().record)))
}

/// POST /api/v1/resumes/:id/patch
pub async fn handle_patch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchRequest>,
) -> Result<Json<ResumeDocument>, AppError> {
    apply(
        &state,
        id,
        EditCommand::Patch {
            path: req.path,
            text: req.text,
        },
    )
    .await
}

/// POST /api/v1/resumes/:id/reorder
pub async fn handle_reorder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<ResumeDocument>, AppError> {
    apply(
        &state,
        id,
        EditCommand::Reorder {
            from: req.from,
            to: req.to,
        },
    )
    .await
}

/// PUT /api/v1/resumes/:id/sections/:section
pub async fn handle_replace_section(
    State(state): State<AppState>,
    Path((id, section)): Path<(Uuid, String)>,
    Json(data): Json<Value>,
) -> Result<Json<ResumeDocument>, AppError> {
    let section = parse_section(&section)?;
    apply(&state, id, EditCommand::ReplaceSection { section, data }).await
}

/// POST /api/v1/resumes/:id/sections/:section/entries
pub async fn handle_add_entry(
    State(state): State<AppState>,
    Path((id, section)): Path<(Uuid, String)>,
) -> Result<Json<ResumeDocument>, AppError> {
    let section = parse_section(&section)?;
    apply(&state, id, EditCommand::AddEntry { section }).await
}

/// DELETE /api/v1/resumes/:id/sections/:section/entries/:index
pub async fn handle_remove_entry(
    State(state): State<AppState>,
    Path((id, section, index)): Path<(Uuid, String, usize)>,
) -> Result<Json<ResumeDocument>, AppError> {
    let section = parse_section(&section)?;
    apply(&state, id, EditCommand::RemoveEntry { section, index }).await
}

/// PATCH /api/v1/resumes/:id/sections/:section/title
pub async fn handle_rename_section(
    State(state): State<AppState>,
    Path((id, section)): Path<(Uuid, String)>,
    Json(req): Json<TitleRequest>,
) -> Result<Json<ResumeDocument>, AppError> {
    let section = parse_section(&section)?;
    apply(
        &state,
        id,
        EditCommand::RenameSection {
            section,
            title: req.title,
        },
    )
    .await
}

/// POST /api/v1/resumes/:id/save
pub async fn handle_save(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDocument>, AppError> {
    let session = load_session(&state, id).await?;
    Ok(Json(session.save_now().await?))
}

/// POST /api/v1/resumes/:id/reset
/// Restores the template and writes it immediately.
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDocument>, AppError> {
    let session = load_session(&state, id).await?;
    session.apply(EditCommand::Reset)?;
    Ok(Json(session.save_now().await?))
}

/// DELETE /api/v1/resumes/:id/session
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<CloseQuery>,
) -> Result<StatusCode, AppError> {
    let policy = params.policy.unwrap_or(TeardownPolicy::Flush);
    if state.sessions.close(id, policy).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No open session for resume {id}")))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::routes::build_router;
    use crate::state::test_state;

    use super::*;

    async fn call(
        app: axum::Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &axum::Router) -> String {
        let (status, body) = call(app.clone(), Method::POST, "/api/v1/resumes", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_then_get_returns_template() {
        let (state, _store) = test_state(json!({}));
        let app = build_router(state);
        let id = create(&app).await;

        let (status, body) = call(app, Method::GET, &format!("/api/v1/resumes/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revision"], 0);
        assert_eq!(body["record"]["sectionOrder"][0], "objective");
        assert!(body["record"]["contact"].is_object());
    }

    #[tokio::test(start_paused = true)]
    async fn test_patch_splits_education_title_line() {
        let (state, _store) = test_state(json!({}));
        let app = build_router(state);
        let id = create(&app).await;

        let (status, body) = call(
            app,
            Method::POST,
            &format!("/api/v1/resumes/{id}/patch"),
            Some(json!({ "path": "education.0.titleLine", "text": "清华大学 - 硕士 - 计算机" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let education = &body["record"]["education"][0];
        assert_eq!(education["school"], "清华大学");
        assert_eq!(education["degree"], "硕士");
        assert_eq!(education["major"], "计算机");
        assert_eq!(body["revision"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_patch_path_is_rejected() {
        let (state, _store) = test_state(json!({}));
        let app = build_router(state);
        let id = create(&app).await;

        let (status, body) = call(
            app,
            Method::POST,
            &format!("/api/v1/resumes/{id}/patch"),
            Some(json!({ "path": "hobbies.0.title", "text": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reorder_keeps_contact_first() {
        let (state, _store) = test_state(json!({}));
        let app = build_router(state);
        let id = create(&app).await;

        let (status, _) = call(
            app.clone(),
            Method::POST,
            &format!("/api/v1/resumes/{id}/reorder"),
            Some(json!({ "from": 2, "to": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, sections) =
            call(app, Method::GET, &format!("/api/v1/resumes/{id}/sections"), None).await;
        assert_eq!(sections[0]["type"], "contact");
        assert_eq!(sections[1]["type"], "internships");
        assert_eq!(sections[2]["type"], "objective");
        assert_eq!(sections[1]["ordinal"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_add_remove_and_rename() {
        let (state, _store) = test_state(json!({}));
        let app = build_router(state);
        let id = create(&app).await;

        let (status, body) = call(
            app.clone(),
            Method::POST,
            &format!("/api/v1/resumes/{id}/sections/projects/entries"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let count = body["record"]["projects"].as_array().unwrap().len();

        let (_, body) = call(
            app.clone(),
            Method::DELETE,
            &format!("/api/v1/resumes/{id}/sections/projects/entries/0"),
            None,
        )
        .await;
        assert_eq!(body["record"]["projects"].as_array().unwrap().len(), count - 1);

        let (_, body) = call(
            app.clone(),
            Method::PATCH,
            &format!("/api/v1/resumes/{id}/sections/experience/title"),
            Some(json!({ "title": "工作经历" })),
        )
        .await;
        assert_eq!(body["record"]["sectionTitles"]["internships"], "工作经历");

        let (status, _) = call(
            app,
            Method::POST,
            &format!("/api/v1/resumes/{id}/sections/summary/entries"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_section_with_structured_data() {
        let (state, _store) = test_state(json!({}));
        let app = build_router(state);
        let id = create(&app).await;

        let (status, body) = call(
            app,
            Method::PUT,
            &format!("/api/v1/resumes/{id}/sections/skills"),
            Some(json!([{ "category": "语言", "details": "Rust；Go" }])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["skills"][0]["category"], "语言");
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_reset_and_close() {
        let (state, store) = test_state(json!({}));
        let app = build_router(state);
        let id = create(&app).await;

        call(
            app.clone(),
            Method::POST,
            &format!("/api/v1/resumes/{id}/patch"),
            Some(json!({ "path": "name", "text": "张三" })),
        )
        .await;
        let (status, body) =
            call(app.clone(), Method::POST, &format!("/api/v1/resumes/{id}/save"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["name"], "张三");
        assert_eq!(store.write_count(), 2);

        let (_, body) =
            call(app.clone(), Method::POST, &format!("/api/v1/resumes/{id}/reset"), None).await;
        assert_eq!(body["record"]["name"], "");
        assert_eq!(store.write_count(), 3);

        let (status, _) = call(
            app.clone(),
            Method::DELETE,
            &format!("/api/v1/resumes/{id}/session?policy=discard"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(
            app,
            Method::DELETE,
            &format!("/api/v1/resumes/{id}/session"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_resume_is_not_found() {
        let (state, _store) = test_state(json!({}));
        let app = build_router(state);
        let (status, body) = call(
            app,
            Method::GET,
            &format!("/api/v1/resumes/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
