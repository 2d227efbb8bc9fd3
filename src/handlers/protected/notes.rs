use axum::extract::{Extension, Path, State};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::Note;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::{CreateNoteRequest, NoteRules, UpdateNoteRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// POST /api/notes - Create a note owned by the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<CreateNoteRequest>,
) -> ApiResult<Note> {
    let note = NoteRules::new(&state.config.notes).validate_create(request)?;
    let created = state.store.create_note(&user.user_id, note).await?;

    tracing::info!("Created note {} for user {}", created.id, user.user_id);
    Ok(ApiResponse::created(created))
}

/// GET /api/notes - The caller's notes, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<Note>> {
    let notes = state.store.list_notes(&user.user_id).await?;
    Ok(ApiResponse::success(notes))
}

/// PUT /api/notes/:id - Update title and/or content of an owned note
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateNoteRequest>,
) -> ApiResult<Note> {
    let id = parse_note_id(&id)?;
    let changes = NoteRules::new(&state.config.notes).validate_update(request)?;

    let updated = state
        .store
        .update_note(&user.user_id, id, changes)
        .await?
        .ok_or_else(ApiError::note_not_found)?;

    tracing::info!("Updated note {} for user {}", updated.id, user.user_id);
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/notes/:id - Permanently delete an owned note
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResponse> {
    let id = parse_note_id(&id)?;

    if !state.store.delete_note(&user.user_id, id).await? {
        return Err(ApiError::note_not_found());
    }

    tracing::info!("Deleted note {} for user {}", id, user.user_id);
    Ok(ApiResponse::success(DeleteResponse {
        message: "Note deleted successfully",
    }))
}

/// Ids that cannot exist are reported exactly like ids owned by someone else.
fn parse_note_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::note_not_found())
}
