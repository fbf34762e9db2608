use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use services::crm_client::CrmClient;
use services::excel::WorkbookLoader;
use services::session_store::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::new()?;
    let addr = config.bind_addr;

    // Build our application state
    let state = Arc::new(AppState::new(config));

    let app = Router::new()
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    config: config::Config,
    sessions: SessionStore,
    crm: CrmClient,
    workbook_loader: WorkbookLoader,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        let http = reqwest::Client::new();
        let crm = CrmClient::new(http.clone(), config.crm_base_url.clone(), config.field_map.clone());
        let workbook_loader = WorkbookLoader::new(config.workbook.clone(), config.max_file_size, http);
        let sessions = SessionStore::new(config.session_idle);

        Self {
            config,
            sessions,
            crm,
            workbook_loader,
        }
    }
}
