//! CSV and TSV exporter

use crate::export::{column_union, Exporter, Record};
use crate::{DriftError, Result};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Writes records as delimited rows under a header line.
///
/// The header is the union of field names across all records; a record
/// missing a field leaves its cell empty. Strings are written raw (the
/// writer quotes as needed), other values JSON-encoded.
pub struct CsvExporter {
    path: PathBuf,
    delimiter: u8,
}

impl CsvExporter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter: b',',
        }
    }

    /// Tab-separated variant.
    pub fn tsv(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter: b'\t',
        }
    }

    fn write(&self, records: &[Record], append: bool) -> Result<String> {
        self.ensure_parent()?;

        // Appending to a file that already has rows must not repeat the
        // header; the caller is expected to keep the schema consistent.
        let has_rows = append
            && std::fs::metadata(&self.path)
                .map(|m| m.len() > 0)
                .unwrap_or(false);

        let file = if append {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?
        } else {
            File::create(&self.path)?
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(file);

        let columns = column_union(records);
        if !has_rows && !columns.is_empty() {
            writer.write_record(&columns).map_err(encode_error)?;
        }
        for record in records {
            let row: Vec<String> = columns
                .iter()
                .map(|column| cell(record.get(column.as_str())))
                .collect();
            writer.write_record(&row).map_err(encode_error)?;
        }
        writer.flush()?;

        tracing::info!("Exported {} records to {}", records.len(), self.path.display());
        Ok(self.path.display().to_string())
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

impl Exporter for CsvExporter {
    fn export(&mut self, records: &[Record]) -> Result<String> {
        self.write(records, false)
    }

    fn append(&mut self, records: &[Record]) -> Result<String> {
        self.write(records, true)
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn encode_error(e: csv::Error) -> DriftError {
    DriftError::Export(format!("CSV encoding failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::create_test_records;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.csv");

        CsvExporter::new(&path)
            .export(&create_test_records())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        // Record keys iterate sorted, so the header does too.
        assert_eq!(lines[0], "status,title,url");
        assert_eq!(lines[1], "200,First,https://example.com/1");
    }

    #[test]
    fn test_append_skips_duplicate_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.csv");
        let records = create_test_records();

        let mut exporter = CsvExporter::new(&path);
        exporter.export(&records).unwrap();
        exporter.append(&records).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines.iter().filter(|l| **l == "status,title,url").count(), 1);
    }

    #[test]
    fn test_append_creates_file_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.csv");

        CsvExporter::new(&path)
            .append(&create_test_records())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("status,title,url"));
    }

    #[test]
    fn test_tsv_uses_tab_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.tsv");

        CsvExporter::tsv(&path)
            .export(&create_test_records())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("status\ttitle\turl"));
    }

    #[test]
    fn test_missing_fields_leave_empty_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sparse.csv");

        let mut a = Record::new();
        a.insert("url".to_string(), json!("https://example.com/"));
        a.insert("title".to_string(), json!("Has title"));
        let mut b = Record::new();
        b.insert("url".to_string(), json!("https://example.com/2"));

        CsvExporter::new(&path).export(&[a, b]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "title,url");
        assert_eq!(lines[2], ",https://example.com/2");
    }

    #[test]
    fn test_fields_with_delimiter_are_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quoted.csv");

        let mut record = Record::new();
        record.insert("title".to_string(), json!("Comma, inside"));

        CsvExporter::new(&path).export(&[record]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Comma, inside\""));
    }

    #[test]
    fn test_non_string_values_json_encoded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("typed.csv");

        let mut record = Record::new();
        record.insert("status".to_string(), json!(200));
        record.insert("tags".to_string(), json!(["a", "b"]));

        CsvExporter::new(&path).export(&[record]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "200,\"[\"\"a\"\",\"\"b\"\"]\"");
    }

    #[test]
    fn test_export_empty_records_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");

        CsvExporter::new(&path).export(&[]).unwrap();

        assert!(path.exists());
        assert!(std::fs::read_to_string(&path).unwrap().is_empty());
    }
}
