use bytes::Bytes;
use calamine::Data;
use reqwest::Client;
use crate::error::AppError;

/// Column label for a header cell. Blank headers get a positional name so
/// that every column stays addressable.
pub fn header_label(cell: &Data, column_idx: usize) -> String {
    match cell_text(cell) {
        Some(text) => text.trim().to_string(),
        None => format!("Unnamed: {}", column_idx),
    }
}

/// Text of a data cell, `None` for empty, blank or error cells.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Rejects files larger than `limit` bytes.
pub fn check_file_size(size: u64, limit: usize) -> Result<(), AppError> {
    if size > limit as u64 {
        tracing::warn!("Workbook of {} bytes exceeds the {} byte limit", size, limit);
        return Err(AppError::FileProcessingError(format!(
            "Workbook is {} bytes, limit is {}",
            size, limit
        )));
    }
    Ok(())
}

pub async fn load_file_from_url(
    client: &Client,
    url: &str,
    max_file_size: usize,
) -> Result<Bytes, AppError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::FileProcessingError(format!("Failed to fetch file: {}", e.without_url())))?;

    if !response.status().is_success() {
        return Err(AppError::FileProcessingError(
            format!("Failed to fetch file. Status: {}", response.status())
        ));
    }

    if let Some(length) = response.content_length() {
        check_file_size(length, max_file_size)?;
    }

    response
        .bytes()
        .await
        .map_err(|e| AppError::FileProcessingError(format!("Failed to read response bytes: {}", e.without_url())))
}
