use super::utils::*;
use std::io::Cursor;
use bytes::Bytes;
use calamine::{Data, Range, Reader, Xlsx, open_workbook_from_rs};
use reqwest::Client;
use crate::config::WorkbookSource;
use crate::error::AppError;
use crate::models::{Category, RawColumn, RawTable, Workbook};

/// Reads the company workbook from its configured source.
#[derive(Debug, Clone)]
pub struct WorkbookLoader {
    source: WorkbookSource,
    max_file_size: usize,
    http: Client,
}

impl WorkbookLoader {
    pub fn new(source: WorkbookSource, max_file_size: usize, http: Client) -> Self {
        Self { source, max_file_size, http }
    }

    pub async fn load(&self) -> Result<Workbook, AppError> {
        let start = std::time::Instant::now();
        let file_data = self.read_bytes().await?;
        tracing::info!("Workbook read, size: {}KB", file_data.len() / 1024);
        check_file_size(file_data.len() as u64, self.max_file_size)?;

        let workbook = tokio::task::spawn_blocking(move || parse_workbook(file_data))
            .await
            .map_err(|e| AppError::Internal(format!("Workbook parsing task failed: {}", e)))??;

        tracing::info!("Workbook parsed in {:?}", start.elapsed());
        Ok(workbook)
    }

    async fn read_bytes(&self) -> Result<Bytes, AppError> {
        match &self.source {
            WorkbookSource::Path(path) => {
                tracing::info!("Reading workbook from {}", path.display());
                let metadata = tokio::fs::metadata(path).await.map_err(|e| {
                    tracing::error!("Failed to stat workbook {}: {}", path.display(), e);
                    AppError::IoError(e)
                })?;
                check_file_size(metadata.len(), self.max_file_size)?;

                let data = tokio::fs::read(path).await.map_err(|e| {
                    tracing::error!("Failed to read workbook {}: {}", path.display(), e);
                    AppError::IoError(e)
                })?;
                Ok(Bytes::from(data))
            }
            WorkbookSource::Url(url) => {
                tracing::info!("Downloading workbook, URL length: {}", url.len());
                load_file_from_url(&self.http, url, self.max_file_size).await
            }
        }
    }
}

/// Parses the `Products`, `Sectors` and `Countries` sheets. Other sheets are
/// ignored; any of the three missing is an error.
pub fn parse_workbook(file_data: Bytes) -> Result<Workbook, AppError> {
    let cursor = Cursor::new(file_data);
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| {
            tracing::error!("Failed to open Excel file: {}", e);
            AppError::FileProcessingError(format!("Failed to open Excel file: {}", e))
        })?;

    let sheet_names = workbook.sheet_names().to_vec();
    tracing::debug!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

    let mut read_table = |category: Category| -> Result<RawTable, AppError> {
        let name = category.sheet_name();
        if !sheet_names.iter().any(|s| s == name) {
            return Err(AppError::FileProcessingError(format!("Sheet {} not found in workbook", name)));
        }
        let range = workbook.worksheet_range(name)?;
        let table = table_from_range(name, &range);
        tracing::info!(
            "Sheet {}: {} columns, {} rows",
            name,
            table.columns.len(),
            table.row_count()
        );
        Ok(table)
    };

    Ok(Workbook {
        products: read_table(Category::Products)?,
        sectors: read_table(Category::Sectors)?,
        countries: read_table(Category::Countries)?,
    })
}

/// Turns a sheet into columns: the first row holds the labels, the rows
/// below hold the cells.
pub fn table_from_range(name: &str, range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        tracing::warn!("Sheet {} is empty", name);
        return RawTable::empty(name);
    };

    let mut columns: Vec<RawColumn> = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| RawColumn::new(header_label(cell, idx), Vec::new()))
        .collect();

    for row in rows {
        for (column, cell) in columns.iter_mut().zip(row.iter()) {
            column.cells.push(cell_text(cell));
        }
    }

    RawTable::new(name, columns)
}
