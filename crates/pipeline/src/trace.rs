//! Per-frame sample trace (JSONL).

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gonio_analysis::OutcomeLabel;
use gonio_common::error::{GonioError, GonioResult};
use gonio_model::movement::{Category, MovementKind, Side};
use serde::Serialize;

pub const TRACE_SCHEMA_VERSION: &str = "1.0";

/// First line of a trace file, written as a `#` comment.
#[derive(Debug, Clone, Serialize)]
pub struct TraceHeader {
    pub schema_version: String,
    pub run_id: String,
    pub movement: MovementKind,
    pub side: Side,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub started_at: String,
}

/// One frame of the trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub frame: u64,
    pub timestamp_secs: f64,
    /// Arm of a bilateral run; each arm gets its own record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    pub outcome: OutcomeLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// Writes trace records to a JSONL file.
pub struct TraceWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    records_written: u64,
}

impl TraceWriter {
    /// Create the trace file, writing the header as the first line.
    pub fn create(path: &Path, header: &TraceHeader) -> GonioResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);
        let header_json = serde_json::to_string(header)?;
        writeln!(writer, "# {header_json}")
            .map_err(|e| GonioError::resource(format!("Failed to write trace header: {e}")))?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            records_written: 0,
        })
    }

    pub fn write_record(&mut self, record: &TraceRecord) -> GonioResult<()> {
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{json}")
            .map_err(|e| GonioError::processing(format!("Failed to write trace record: {e}")))?;
        self.records_written += 1;

        if self.records_written % 1000 == 0 {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> GonioResult<()> {
        self.writer
            .flush()
            .map_err(|e| GonioError::processing(format!("Failed to flush trace: {e}")))
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TraceWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
