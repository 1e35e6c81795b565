//! SQLite table exporter

use crate::export::{column_union, Exporter, Record};
use crate::{DriftError, Result};
use rusqlite::Connection;
use serde_json::Value;
use std::path::{Path, PathBuf};

const DEFAULT_TABLE: &str = "scraped_data";

/// Writes records as rows of a SQLite table, one column per record field.
///
/// `export` replaces the table; `append` adds rows to it. Strings land as
/// TEXT, numbers and booleans as their SQLite equivalents, and nested
/// arrays/objects are stored JSON-encoded.
pub struct SqliteExporter {
    conn: Connection,
    path: PathBuf,
    table: String,
}

impl SqliteExporter {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            table: DEFAULT_TABLE.to_string(),
        })
    }

    /// Changes the destination table from the default `scraped_data`.
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    fn write(&mut self, records: &[Record], replace: bool) -> Result<String> {
        let columns = column_union(records);

        if replace {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {}", quote(&self.table)))?;
        }

        if !columns.is_empty() {
            let column_defs: Vec<String> =
                columns.iter().map(|c| format!("{} TEXT", quote(c))).collect();
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                quote(&self.table),
                column_defs.join(", ")
            ))?;
        }

        let tx = self.conn.transaction()?;
        for record in records {
            let keys: Vec<&String> = record.keys().collect();
            let placeholders: Vec<String> =
                (1..=keys.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(&self.table),
                keys.iter()
                    .map(|k| quote(k))
                    .collect::<Vec<_>>()
                    .join(", "),
                placeholders.join(", ")
            );
            let params: Vec<rusqlite::types::Value> =
                record.values().map(to_sql_value).collect();
            tx.execute(&sql, rusqlite::params_from_iter(params))?;
        }
        tx.commit()?;

        tracing::info!(
            "Exported {} records to {} (table {})",
            records.len(),
            self.path.display(),
            self.table
        );
        Ok(self.path.display().to_string())
    }
}

impl Exporter for SqliteExporter {
    fn export(&mut self, records: &[Record]) -> Result<String> {
        self.write(records, true)
    }

    fn append(&mut self, records: &[Record]) -> Result<String> {
        self.write(records, false)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Sql::Integer(i)
            } else {
                Sql::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Sql::Text(s.clone()),
        nested => Sql::Text(nested.to_string()),
    }
}
