use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::LeadRecord;
use crate::services::matching::FieldMap;

/// Envelope of a Pipedrive list response.
#[derive(Debug, Deserialize)]
struct LeadsResponse {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// Minimal Pipedrive client: only the lead list is needed.
#[derive(Debug, Clone)]
pub struct CrmClient {
    http: Client,
    base_url: String,
    field_map: FieldMap,
}

impl CrmClient {
    pub fn new(http: Client, base_url: impl Into<String>, field_map: FieldMap) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            field_map,
        }
    }

    pub async fn fetch_leads(&self, api_token: &str) -> Result<Vec<LeadRecord>, AppError> {
        let url = format!("{}/leads", self.base_url);
        info!("Fetching leads from {}", url);
        let start = std::time::Instant::now();

        let response = self
            .http
            .get(&url)
            .query(&[("api_token", api_token)])
            .send()
            .await
            .map_err(|e| AppError::Crm(format!("Failed to reach CRM: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            warn!("CRM answered {} for lead list", status);
            return Err(AppError::Crm(format!(
                "Lead list request failed with status {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Crm(format!("Invalid lead list response: {}", e.without_url())))?;

        let leads = parse_leads(body, &self.field_map)?;
        info!("Fetched {} leads in {:?}", leads.len(), start.elapsed());
        Ok(leads)
    }
}

/// Extracts lead records from a `{"data": [...]}` payload. A null or absent
/// `data` means the account has no leads.
pub fn parse_leads(body: Value, field_map: &FieldMap) -> Result<Vec<LeadRecord>, AppError> {
    let response: LeadsResponse = serde_json::from_value(body)?;

    let leads = response
        .data
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match item {
            Value::Object(fields) => Some(LeadRecord::from_fields(fields, field_map)),
            other => {
                warn!("Skipping lead #{}: expected an object, got {}", idx, other);
                None
            }
        })
        .collect::<Vec<_>>();

    debug!("Parsed {} lead records", leads.len());
    Ok(leads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use axum::{
        extract::Query,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    const PRODUCTS_ID: &str = "56410da7410b4a607ec34d0891c43678294f74dc";

    fn field_map() -> FieldMap {
        FieldMap::new([(PRODUCTS_ID.to_string(), Category::Products)]).unwrap()
    }

    async fn fake_leads(Query(params): Query<HashMap<String, String>>) -> Response {
        match params.get("api_token").map(String::as_str) {
            Some("good-token") => Json(json!({
                "success": true,
                "data": [
                    {"id": "l-1", "title": "Alpha", PRODUCTS_ID: "Electronics"},
                    {"id": "l-2", "title": "Beta"}
                ]
            }))
            .into_response(),
            Some("empty-token") => Json(json!({"success": true, "data": null})).into_response(),
            Some("garbled-token") => "<html>maintenance</html>".into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn spawn_fake_crm() -> String {
        let app = Router::new().route("/v1/leads", get(fake_leads));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    #[test]
    fn parse_skips_non_objects_and_null_data() {
        let leads = parse_leads(
            json!({"data": [{"title": "Alpha", PRODUCTS_ID: ["A", "B"]}, 42, "x"]}),
            &field_map(),
        )
        .unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].tags.products, ["A", "B"]);

        assert!(parse_leads(json!({"data": null}), &field_map()).unwrap().is_empty());
        assert!(parse_leads(json!({"success": false}), &field_map()).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_malformed_envelope() {
        let result = parse_leads(json!({"data": "oops"}), &field_map());
        assert!(matches!(result, Err(AppError::ParseError(_))));
    }

    #[tokio::test]
    async fn fetches_leads_from_crm() {
        let base_url = spawn_fake_crm().await;
        let client = CrmClient::new(Client::new(), base_url, field_map());

        let leads = assert_ok!(client.fetch_leads("good-token").await);

        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].title.as_deref(), Some("Alpha"));
        assert_eq!(leads[0].tags.products, ["Electronics"]);
        assert!(leads[1].tags.is_empty());
    }

    #[tokio::test]
    async fn null_data_is_an_empty_list() {
        let base_url = spawn_fake_crm().await;
        let client = CrmClient::new(Client::new(), base_url, field_map());

        let leads = assert_ok!(client.fetch_leads("empty-token").await);
        assert!(leads.is_empty());
    }

    #[tokio::test]
    async fn rejected_token_is_a_crm_error() {
        let base_url = spawn_fake_crm().await;
        let client = CrmClient::new(Client::new(), base_url, field_map());

        let err = assert_err!(client.fetch_leads("bad-token").await);
        assert!(matches!(err, AppError::Crm(_)));
    }

    #[tokio::test]
    async fn unreachable_crm_error_hides_token() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = CrmClient::new(Client::new(), format!("http://{}", addr), field_map());

        let err = assert_err!(client.fetch_leads("SUPERSECRET123").await);

        assert!(matches!(err, AppError::Crm(_)));
        assert!(!err.to_string().contains("SUPERSECRET123"));
    }

    #[tokio::test]
    async fn undecodable_body_error_hides_token() {
        let base_url = spawn_fake_crm().await;
        let client = CrmClient::new(Client::new(), base_url, field_map());

        let err = assert_err!(client.fetch_leads("garbled-token").await);

        assert!(matches!(err, AppError::Crm(_)));
        assert!(!err.to_string().contains("garbled-token"));
    }
}
