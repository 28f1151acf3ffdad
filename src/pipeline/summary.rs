//! Per-file summary of a batch run.

use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{ErrorKind, PipelineError, PipelineResult};
use crate::domain::MeasurementRecord;

/// Header of the delimited summary.
pub const SUMMARY_HEADER: &str = "relative_path,status,width,height,angle,error_kind";

/// Outcome of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Success,
    Failed,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Success => f.write_str("success"),
            RowStatus::Failed => f.write_str("failed"),
        }
    }
}

/// One row of the summary; exactly one per discovered file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Path relative to the batch root, with `/` separators.
    pub relative_path: String,
    pub status: RowStatus,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub angle: Option<f32>,
    pub error_kind: Option<ErrorKind>,
    /// Human-readable failure message; not part of the delimited output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Full record for successful files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<MeasurementRecord>,
}

impl SummaryRow {
    /// Row of a successfully processed file.
    pub fn success(relative_path: impl Into<String>, record: MeasurementRecord) -> Self {
        Self {
            relative_path: relative_path.into(),
            status: RowStatus::Success,
            width: Some(record.width_px),
            height: Some(record.height_px),
            angle: Some(record.angle_deg),
            error_kind: None,
            message: None,
            record: Some(record),
        }
    }

    /// Row of a file whose pipeline run failed.
    pub fn failure(relative_path: impl Into<String>, error: &PipelineError) -> Self {
        Self {
            relative_path: relative_path.into(),
            status: RowStatus::Failed,
            width: None,
            height: None,
            angle: None,
            error_kind: Some(error.kind()),
            message: Some(error.to_string()),
            record: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RowStatus::Success
    }

    fn delimited(&self) -> String {
        let optional = |v: Option<String>| v.unwrap_or_default();
        format!(
            "{},{},{},{},{},{}",
            quote(&self.relative_path),
            self.status,
            optional(self.width.map(|w| w.to_string())),
            optional(self.height.map(|h| h.to_string())),
            optional(self.angle.map(|a| format!("{a:.2}"))),
            optional(self.error_kind.map(|k| k.to_string())),
        )
    }
}

/// Quotes a field containing the delimiter, a quote or a line break.
fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Ordered rows of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn new(rows: Vec<SummaryRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Writes the delimited summary, header first, one line per row.
    pub fn write_delimited<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "{SUMMARY_HEADER}")?;
        for row in &self.rows {
            writeln!(writer, "{}", row.delimited())?;
        }
        writer.flush()
    }

    /// Writes the delimited summary to `path`.
    pub fn save_delimited(&self, path: &Path) -> PipelineResult<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| PipelineError::io(format!("creating {}", path.display()), e))?;
        self.write_delimited(std::io::BufWriter::new(file))
            .map_err(|e| PipelineError::io(format!("writing {}", path.display()), e))
    }

    /// Pretty-printed JSON of the whole table.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
