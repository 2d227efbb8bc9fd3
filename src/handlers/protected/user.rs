use axum::extract::{Extension, State};

use crate::database::models::UserProfile;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/user/profile - The caller's stored profile and note count
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<UserProfile> {
    let profile = state
        .store
        .user_profile(&user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(profile))
}
