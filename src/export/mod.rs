//! Record exporters
//!
//! Scraped data leaves the crate as a list of [`Record`]s (string-keyed
//! JSON objects). An [`Exporter`] writes them somewhere durable and
//! returns the destination identifier; [`export_auto`] picks the exporter
//! from the destination file extension.

mod csv;
mod json;
mod sqlite;

pub use self::csv::CsvExporter;
pub use json::JsonExporter;
pub use sqlite::SqliteExporter;

use crate::{DriftError, Result};
use std::path::Path;

/// One exported row: field name to JSON value
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Destination-agnostic record sink
///
/// `export` replaces whatever is at the destination; `append` adds to it.
/// Both return the destination identifier (a file path) on success.
pub trait Exporter {
    fn export(&mut self, records: &[Record]) -> Result<String>;

    fn append(&mut self, records: &[Record]) -> Result<String>;
}

/// Exports records to `path`, choosing the exporter from the extension
///
/// `.json` and `.jsonl` go to [`JsonExporter`]; `.csv` and `.tsv` to
/// [`CsvExporter`]; `.db` and `.sqlite` to [`SqliteExporter`]. Any other
/// extension is an error.
pub fn export_auto(records: &[Record], path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => JsonExporter::new(path).export(records),
        "jsonl" => JsonExporter::new(path).export_jsonl(records),
        "csv" => CsvExporter::new(path).export(records),
        "tsv" => CsvExporter::tsv(path).export(records),
        "db" | "sqlite" => SqliteExporter::open(path)?.export(records),
        other => Err(DriftError::Export(format!(
            "unsupported export extension '{}' (supported: json, jsonl, csv, tsv, db, sqlite)",
            other
        ))),
    }
}

/// Field names across all records, in first-seen order.
pub(crate) fn column_union(records: &[Record]) -> Vec<String> {
    let mut columns = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

#[cfg(test)]
pub(crate) fn create_test_records() -> Vec<Record> {
    use serde_json::json;

    let mut a = Record::new();
    a.insert("url".to_string(), json!("https://example.com/1"));
    a.insert("title".to_string(), json!("First"));
    a.insert("status".to_string(), json!(200));

    let mut b = Record::new();
    b.insert("url".to_string(), json!("https://example.com/2"));
    b.insert("title".to_string(), json!("Second"));
    b.insert("status".to_string(), json!(200));

    vec![a, b]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_auto_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let dest = export_auto(&create_test_records(), &path).unwrap();
        assert_eq!(dest, path.display().to_string());
        assert!(path.exists());
    }

    #[test]
    fn test_export_auto_sqlite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.sqlite");
        export_auto(&create_test_records(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_export_auto_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        export_auto(&create_test_records(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("status,title,url"));
    }

    #[test]
    fn test_export_auto_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xyz");
        let result = export_auto(&create_test_records(), &path);
        assert!(matches!(result, Err(DriftError::Export(_))));
    }
}
