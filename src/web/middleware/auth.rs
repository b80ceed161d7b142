use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::warn;

use crate::db::services::user_service;
use crate::services::auth_service::{self, SessionToken};
use crate::web::models::AuthenticatedUser;
use crate::web::{error::AppError, AppState};

/// Authoritative session check: decodes the signed token and confirms the
/// user still exists in the store. Expired, malformed, and unknown-user
/// tokens all collapse to 401 here.
pub async fn auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(auth_service::SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    let claims = match auth_service::decode_session_token(&token, &state.config.jwt_secret) {
        SessionToken::Valid(claims) => claims,
        SessionToken::Expired => {
            warn!("session token expired");
            return Err(AppError::Unauthorized("Unauthorized".to_string()));
        }
        SessionToken::Malformed => {
            warn!("malformed session token");
            return Err(AppError::Unauthorized("Unauthorized".to_string()));
        }
    };

    let user = user_service::find_by_id(&state.db, claims.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    req.extensions_mut().insert(AuthenticatedUser {
        id: user.id,
        email: user.email,
    });
    Ok(next.run(req).await)
}
