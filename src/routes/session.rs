use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{CompanyProfiles, Workbook},
    services::session_store::Session,
    AppState,
};

pub const SESSION_HEADER: &str = "x-session-id";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", post(login).delete(logout))
        .route("/workbook", get(workbook))
        .route("/profiles", get(profiles))
}

/// The session named by the `x-session-id` header.
pub struct SessionContext(pub Arc<Session>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or(AppError::SessionNotFound)?;

        state
            .sessions
            .get(&id)
            .map(SessionContext)
            .ok_or(AppError::SessionNotFound)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    session_id: Uuid,
    companies: usize,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if request.password != state.config.app_password {
        tracing::warn!("Rejected login attempt");
        return Err(AppError::Unauthorized("Incorrect password".to_string()));
    }

    let workbook = state.workbook_loader.load().await?;
    let session = state.sessions.insert(Session::new(workbook));
    if session.profiles.is_empty() {
        tracing::warn!("Workbook contains no companies, every search will come back empty");
    }

    Ok(Json(LoginResponse {
        session_id: session.id,
        companies: session.profiles.len(),
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    SessionContext(session): SessionContext,
) -> StatusCode {
    state.sessions.remove(&session.id);
    StatusCode::NO_CONTENT
}

async fn workbook(SessionContext(session): SessionContext) -> Json<Workbook> {
    Json(session.workbook.as_ref().clone())
}

async fn profiles(SessionContext(session): SessionContext) -> Json<CompanyProfiles> {
    Json(session.profiles.as_ref().clone())
}
