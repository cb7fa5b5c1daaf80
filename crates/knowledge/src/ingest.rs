//! CSV ingestion of the sales dataset.

use crate::records::{columns, RawRow, SalesRecord};
use csv::ReaderBuilder;
use sales_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Counters from one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub rows_read: usize,
    pub duplicates_removed: usize,
    /// Rows without a customer name or product code
    pub rows_rejected: usize,
    pub records: usize,
}

/// Parsed dataset plus how it was obtained.
#[derive(Debug, Clone)]
pub struct SalesDataset {
    pub records: Vec<SalesRecord>,
    pub report: IngestReport,
}

/// Load a sales CSV from disk.
///
/// Input that is not valid UTF-8 is decoded as Latin-1.
pub fn load_csv(path: &Path) -> AppResult<SalesDataset> {
    tracing::info!("Loading sales data from {:?}", path);

    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Ingest(format!("Failed to read {:?}: {}", path, e)))?;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("{:?} is not UTF-8, decoding as Latin-1", path);
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    let dataset = parse_csv(&text)?;
    tracing::info!(
        "Loaded {} sales records ({} duplicates removed, {} rejected)",
        dataset.report.records,
        dataset.report.duplicates_removed,
        dataset.report.rows_rejected
    );
    Ok(dataset)
}

/// Parse CSV text with a header row into sales records.
pub fn parse_csv(text: &str) -> AppResult<SalesDataset> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| AppError::Ingest(format!("Failed to read CSV header: {}", e)))?
        .iter()
        .map(|h| h.to_uppercase())
        .collect();

    for required in [columns::CUSTOMER_NAME, columns::PRODUCT_CODE] {
        if !headers.iter().any(|h| h == required) {
            return Err(AppError::Ingest(format!(
                "CSV is missing required column {}",
                required
            )));
        }
    }

    let mut report = IngestReport::default();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut records = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        report.rows_read += 1;

        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if !seen.insert(fields) {
            report.duplicates_removed += 1;
            continue;
        }

        let mut row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, cell)| (h.clone(), coerce_cell(cell)))
            .collect();

        if matches!(row.get(columns::STATE), None | Some(Value::Null)) {
            row.insert(columns::STATE.to_string(), Value::String("Unknown".to_string()));
        }

        match SalesRecord::from_row(&row) {
            Ok(r) => records.push(r),
            Err(e) => {
                report.rows_rejected += 1;
                tracing::warn!("Skipping CSV row {}: {}", line + 2, e);
            }
        }
    }

    report.records = records.len();
    Ok(SalesDataset { records, report })
}

fn coerce_cell(s: &str) -> Value {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }

    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }

    Value::String(trimmed.to_string())
}
