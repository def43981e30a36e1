//! CSV export and terminal preview of the aggregated table.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;

use crate::normalize::ResultRecord;

pub const EXPORT_HEADERS: [&str; 8] = [
    "Identifier",
    "Authors",
    "Journal",
    "Title",
    "Publication Date",
    "Publication Year",
    "DOI",
    "Query",
];

pub const DEFAULT_CSV_NAME: &str = "search_results.csv";

const PREVIEW_COLUMN_WIDTH: usize = 32;

fn cells(row: &ResultRecord) -> [String; 8] {
    [
        row.identifier.clone().unwrap_or_default(),
        row.authors.clone().unwrap_or_default(),
        row.journal.clone().unwrap_or_default(),
        row.title.clone().unwrap_or_default(),
        row.publication_date.clone().unwrap_or_default(),
        row.publication_year.map(|y| y.to_string()).unwrap_or_default(),
        row.doi_url.clone().unwrap_or_default(),
        row.source_query.clone(),
    ]
}

/// Serialize rows as UTF-8 CSV with the fixed header row
pub fn to_csv_bytes(rows: &[ResultRecord]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(EXPORT_HEADERS)?;
    for row in rows {
        wtr.write_record(cells(row))?;
    }
    Ok(wtr.into_inner()?)
}

pub async fn write_csv(path: &Path, rows: &[ResultRecord]) -> Result<()> {
    let data = to_csv_bytes(rows)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Reduce a user supplied name to a bare `*.csv` file name
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .replace(|c: char| c.is_control() || c == '"', "");
    if base.is_empty() || base == "." || base == ".." {
        return DEFAULT_CSV_NAME.to_string();
    }
    if base.to_ascii_lowercase().ends_with(".csv") {
        base
    } else {
        format!("{}.csv", base)
    }
}

/// Plain text table of the first `limit` rows
pub fn format_preview(rows: &[ResultRecord], limit: usize) -> String {
    let mut output = String::new();
    let header: Vec<String> = EXPORT_HEADERS
        .iter()
        .map(|h| pad(h, PREVIEW_COLUMN_WIDTH))
        .collect();
    output.push_str(header.join(" | ").trim_end());
    output.push('\n');
    output.push_str(&"-".repeat((PREVIEW_COLUMN_WIDTH + 3) * EXPORT_HEADERS.len() - 3));
    output.push('\n');

    for row in rows.iter().take(limit) {
        let line: Vec<String> = cells(row)
            .iter()
            .map(|cell| pad(&truncate(cell, PREVIEW_COLUMN_WIDTH), PREVIEW_COLUMN_WIDTH))
            .collect();
        output.push_str(line.join(" | ").trim_end());
        output.push('\n');
    }

    if rows.len() > limit {
        output.push_str(&format!("... {} more rows\n", rows.len() - limit));
    }
    output
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}
