use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::AuthError;
use crate::error::ApiError;
use crate::services::Provisioner;
use crate::state::AppState;

/// Authenticated caller, injected by [`auth_middleware`].
///
/// Handlers behind the middleware may assume the user row exists.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
}

/// Verifies the bearer token, provisions the local user, and injects
/// [`AuthUser`] into the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;

    let identity = state.auth.authenticate(token).await?;

    let provisioner = Provisioner::new(state.store.as_ref(), &state.config.security.identity);
    let user = provisioner.provision(&identity).await?;

    request.extensions_mut().insert(AuthUser { user_id: user.id });

    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MalformedHeader),
    }
}
