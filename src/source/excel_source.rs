use crate::domain::model::SourceRow;
use crate::domain::ports::RowSource;
use crate::utils::error::{EtlError, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::collections::HashMap;

/// Reader for `.xlsx` workbooks. Calamine loads the worksheet up front;
/// chunking here keeps the downstream contract identical to the CSV path.
#[derive(Debug)]
pub struct ExcelSource {
    range: Range<Data>,
    headers: Vec<String>,
    chunk_size: usize,
    next_row: usize,
}

impl ExcelSource {
    pub fn open(path: &str, chunk_size: usize) -> Result<Self> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| EtlError::Parse {
                path: path.to_string(),
                reason: "Workbook has no worksheets".to_string(),
            })?;

        let range = workbook.worksheet_range(&sheet_name)?;
        Self::from_range(range, chunk_size, path)
    }

    fn from_range(range: Range<Data>, chunk_size: usize, path: &str) -> Result<Self> {
        let headers = range
            .rows()
            .next()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect::<Vec<_>>()
            })
            .ok_or_else(|| EtlError::Parse {
                path: path.to_string(),
                reason: "Worksheet has no header row".to_string(),
            })?;

        Ok(Self {
            range,
            headers,
            chunk_size: chunk_size.max(1),
            next_row: 1, // row 0 is the header
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

/// Converts a worksheet cell to a JSON value; empty cells map to `None`.
fn cell_to_value(cell: &Data) -> Option<serde_json::Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(serde_json::Value::String(s.clone())),
        Data::Int(i) => Some(serde_json::json!(*i)),
        Data::Float(f) => {
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Some(serde_json::json!(*f as i64))
            } else {
                Some(serde_json::json!(*f))
            }
        }
        Data::Bool(b) => Some(serde_json::Value::Bool(*b)),
        Data::DateTime(dt) => Some(serde_json::Value::String(format!("{}", dt))),
        Data::DateTimeIso(s) | Data::DurationIso(s) => {
            Some(serde_json::Value::String(s.clone()))
        }
        Data::Error(_) => None,
    }
}

impl RowSource for ExcelSource {
    fn next_chunk(&mut self) -> Result<Option<Vec<SourceRow>>> {
        // Rows are addressed by index; restarting the row iterator every
        // call would make a full read quadratic in the sheet size.
        let end = (self.next_row + self.chunk_size).min(self.range.height());
        if self.next_row >= end {
            return Ok(None);
        }

        let rows: Vec<SourceRow> = (self.next_row..end)
            .map(|row| {
                let mut cells = HashMap::new();
                for (col, header) in self.headers.iter().enumerate() {
                    if let Some(value) = self.range.get((row, col)).and_then(cell_to_value) {
                        cells.insert(header.clone(), value);
                    }
                }
                SourceRow { cells }
            })
            .collect();

        self.next_row = end;
        Ok(Some(rows))
    }
}
