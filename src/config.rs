use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::Category;
use crate::services::matching::FieldMap;

const DEFAULT_WORKBOOK_PATH: &str = "exceldxb.xlsx";
const DEFAULT_CRM_BASE_URL: &str = "https://api.pipedrive.com/v1";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;

/// Pipedrive custom-field keys used by the lead form.
const DEFAULT_FIELD_IDS: [(Category, &str); 3] = [
    (Category::Products, "56410da7410b4a607ec34d0891c43678294f74dc"),
    (Category::Sectors, "0144bcc78cc774d8675c881b6f97499753c60a06"),
    (Category::Countries, "ac6b557eb070b9f9fca5e6527cda1980b10e6694"),
];

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbookSource {
    Path(PathBuf),
    Url(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_password: String,
    pub workbook: WorkbookSource,
    pub crm_base_url: String,
    pub field_map: FieldMap,
    pub bind_addr: SocketAddr,
    pub session_idle: Duration,
    pub max_file_size: usize,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let app_password = var("APP_PASSWORD")
            .ok_or_else(|| anyhow!("Failed to load APP_PASSWORD: not set"))?;

        let workbook = match var("WORKBOOK_URL") {
            Some(url) => WorkbookSource::Url(url),
            None => WorkbookSource::Path(PathBuf::from(
                var("WORKBOOK_PATH").unwrap_or_else(|| DEFAULT_WORKBOOK_PATH.to_string()),
            )),
        };

        let crm_base_url = var("CRM_BASE_URL")
            .unwrap_or_else(|| DEFAULT_CRM_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let field_entries = DEFAULT_FIELD_IDS
            .iter()
            .map(|(category, default_id)| {
                let key = format!("{}_FIELD_ID", category.sheet_name().to_uppercase());
                (var(&key).unwrap_or_else(|| default_id.to_string()), *category)
            })
            .collect::<Vec<_>>();
        let field_map = FieldMap::new(field_entries)?;

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| anyhow!("Invalid BIND_ADDR: {}", e))?;

        let session_idle = match var("SESSION_IDLE_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| anyhow!("Invalid SESSION_IDLE_SECS: {}", e))?,
            None => DEFAULT_SESSION_IDLE_SECS,
        };

        let max_file_size = match var("MAX_FILE_SIZE") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| anyhow!("Invalid MAX_FILE_SIZE: {}", e))?,
            None => default_max_file_size(),
        };

        Ok(Config {
            app_password,
            workbook,
            crm_base_url,
            field_map,
            bind_addr,
            session_idle: Duration::from_secs(session_idle),
            max_file_size,
        })
    }
}
