use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{LeadRecord, LeadTags, MatchOutcome},
    routes::session::SessionContext,
    services::matching::{evaluate_lead, lead_titles, select_lead},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/crm/token", put(save_token))
        .route("/leads", get(list_leads))
        .route("/leads/search", get(search))
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    api_token: String,
}

#[derive(Debug, Serialize)]
pub struct LeadsResponse {
    titles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    title: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    lead: LeadRecord,
    tags: LeadTags,
    outcome: MatchOutcome,
}

async fn save_token(
    SessionContext(session): SessionContext,
    Json(request): Json<TokenRequest>,
) -> Result<StatusCode, AppError> {
    let token = request.api_token.trim();
    if token.is_empty() {
        return Err(AppError::InvalidInput("API token must not be empty".to_string()));
    }

    session.set_crm_token(token.to_string());
    tracing::info!("CRM token saved for session {}", session.id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_leads(
    State(state): State<Arc<AppState>>,
    SessionContext(session): SessionContext,
) -> Result<Json<LeadsResponse>, AppError> {
    let token = session.crm_token().ok_or(AppError::CrmTokenMissing)?;
    let leads = state.crm.fetch_leads(&token).await?;

    Ok(Json(LeadsResponse {
        titles: lead_titles(&leads),
    }))
}

#[axum::debug_handler(state = Arc<AppState>)]
async fn search(
    State(state): State<Arc<AppState>>,
    SessionContext(session): SessionContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let start = std::time::Instant::now();
    if query.title.trim().is_empty() {
        return Err(AppError::InvalidInput("No lead selected".to_string()));
    }
    let token = session.crm_token().ok_or(AppError::CrmTokenMissing)?;
    let leads = state.crm.fetch_leads(&token).await?;

    let lead = select_lead(&leads, &query.title)?.clone();
    let outcome = evaluate_lead(&lead.tags, &session.profiles);
    let tags = lead.tags.clone();

    tracing::info!(
        "Search for lead {:?} in session {}: {:?} in {:?}",
        query.title,
        session.id,
        outcome,
        start.elapsed()
    );

    Ok(Json(SearchResponse { lead, tags, outcome }))
}
