//! JSON and JSON Lines exporter

use crate::export::{Exporter, Record};
use crate::{DriftError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes records as a pretty-printed JSON array, or one object per line
/// via [`JsonExporter::export_jsonl`].
pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Writes records in JSON Lines format, replacing the file.
    pub fn export_jsonl(&mut self, records: &[Record]) -> Result<String> {
        self.ensure_parent()?;
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record).map_err(encode_error)?;
            writer.write_all(b"\n")?;
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

    fn read_existing(&self) -> Result<Vec<Record>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(encode_error)
    }
}

fn encode_error(e: serde_json::Error) -> DriftError {
    DriftError::Export(format!("JSON encoding failed: {}", e))
}

impl Exporter for JsonExporter {
    fn export(&mut self, records: &[Record]) -> Result<String> {
        self.ensure_parent()?;
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, records).map_err(encode_error)?;
        writer.flush()?;

        tracing::info!("Exported {} records to {}", records.len(), self.path.display());
        Ok(self.path.display().to_string())
    }

    /// Loads the existing array, extends it, and rewrites the file.
    fn append(&mut self, records: &[Record]) -> Result<String> {
        let mut existing = self.read_existing()?;
        existing.extend(records.iter().cloned());
        self.export(&existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::create_test_records;
    use tempfile::TempDir;

    #[test]
    fn test_export_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        let records = create_test_records();

        JsonExporter::new(&path).export(&records).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_append_extends_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        let records = create_test_records();

        let mut exporter = JsonExporter::new(&path);
        exporter.export(&records).unwrap();
        exporter.append(&records).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 4);
    }

    #[test]
    fn test_append_creates_file_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.json");

        JsonExporter::new(&path)
            .append(&create_test_records())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_export_jsonl_one_object_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");

        JsonExporter::new(&path)
            .export_jsonl(&create_test_records())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let _: Record = serde_json::from_str(line).unwrap();
        }
    }

    #[test]
    fn test_export_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deep/records.json");

        JsonExporter::new(&path)
            .export(&create_test_records())
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_export_empty_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");

        JsonExporter::new(&path).export(&[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&content).unwrap();
        assert!(parsed.is_empty());
    }
}
