use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::extractors::AdminUser;
use crate::state::AppState;

pub const ADMIN_COOKIE: &str = "qrshare_admin";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn session_cookie(token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours.saturating_mul(3600);
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        ADMIN_COOKIE, token, max_age_secs
    )
}

fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        ADMIN_COOKIE
    )
}

/// POST /api/admin/login: exchange admin credentials for an expiring token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let auth = &state.config.auth;
    let Some(hash) = auth.admin_password_hash.clone() else {
        tracing::warn!("Admin login attempted but no admin password hash is configured");
        return Err(AppError::Unauthorized);
    };

    let password = req.password;
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password check panicked: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Stored admin hash is invalid: {}", e)))?;

    if req.username.trim() != auth.admin_username || !matches {
        tracing::warn!(username = %req.username, "Rejected admin login");
        return Err(AppError::Unauthorized);
    }

    let purged = session::purge_expired(&state.db)?;
    if purged > 0 {
        tracing::debug!(purged, "Removed expired admin sessions");
    }

    let session = session::create_session(&state.db, &auth.admin_username, auth.session_hours)?;
    tracing::info!(username = %auth.admin_username, "Admin logged in");

    Ok((
        [(
            header::SET_COOKIE,
            session_cookie(&session.token, auth.session_hours),
        )],
        Json(json!({ "token": session.token, "expires_at": session.expires_at })),
    )
        .into_response())
}

/// POST /api/admin/logout: revoke the caller's token
pub async fn logout(State(state): State<AppState>, admin: AdminUser) -> AppResult<Response> {
    session::delete_session(&state.db, &admin.token)?;
    tracing::info!(username = %admin.username, "Admin logged out");

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "ok": true })),
    )
        .into_response())
}
