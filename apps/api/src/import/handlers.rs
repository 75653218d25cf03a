use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::resume::document::{EditCommand, ResumeDocument};
use crate::resume::handlers::{load_session, parse_section};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ImportRequest {
    pub section: String,
    pub text: String,
}

#[derive(Deserialize)]
pub struct FragmentRequest {
    pub section: String,
    pub fragment: Value,
}

/// POST /api/v1/resumes/:id/import
/// Converts pasted text into one section's fragment and merges it in.
pub async fn handle_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ResumeDocument>, AppError> {
    let section = parse_section(&req.section)?;
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("Nothing to import".to_string()));
    }

    let session = load_session(&state, id).await?;
    let document = session
        .import(section, &req.text, state.extractor.as_ref())
        .await?;
    info!("Imported {section} into resume {id} (revision {})", document.revision);
    Ok(Json(document))
}

/// POST /api/v1/resumes/:id/import/fragment
/// Merges an already structured fragment.
pub async fn handle_import_fragment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FragmentRequest>,
) -> Result<Json<ResumeDocument>, AppError> {
    let section = parse_section(&req.section)?;
    let session = load_session(&state, id).await?;
    let document = session.apply(EditCommand::MergeFragment {
        section,
        fragment: req.fragment,
    })?;
    Ok(Json(document))
}
