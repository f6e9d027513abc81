use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::HistoryError;
use crate::event::ScanRecord;

/// Append-only scan history, newest record first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    records: VecDeque<ScanRecord>,
}

#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Producto")]
    product: &'a str,
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Fecha")]
    timestamp: &'a str,
    #[serde(rename = "Usuario")]
    user: &'a str,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ScanRecord) {
        self.records.push_front(record);
    }

    /// All records, most recent first.
    pub fn all(&self) -> Vec<&ScanRecord> {
        self.records.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScanRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&ScanRecord> {
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Writes the log as CSV with columns `Producto, ID, Fecha, Usuario`.
    pub fn export<W: Write>(&self, writer: W) -> Result<(), HistoryError> {
        let mut csv = csv::Writer::from_writer(writer);
        if self.records.is_empty() {
            csv.write_record(["Producto", "ID", "Fecha", "Usuario"])?;
        }
        for record in &self.records {
            csv.serialize(ExportRow {
                product: &record.item_name,
                id: &record.item_id,
                timestamp: &record.timestamp,
                user: &record.scanned_by,
            })?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn export_to_path(&self, path: impl AsRef<Path>) -> Result<(), HistoryError> {
        let file = std::fs::File::create(path)?;
        self.export(file)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads a log written by [`HistoryLog::save_json`], keeping its order.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let content = std::fs::read_to_string(path)?;
        let records: VecDeque<ScanRecord> = serde_json::from_str(&content)?;
        Ok(Self { records })
    }
}
