pub mod csv_source;
pub mod excel_source;

use crate::domain::ports::RowSource;
use crate::utils::error::{EtlError, Result};
use std::path::Path;

pub use csv_source::CsvSource;
pub use excel_source::ExcelSource;

/// Opens the right reader for the file extension. `SourceNotFound` for a
/// missing path is raised here, before the destination is ever touched.
pub fn open_source(path: &str, chunk_size: usize) -> Result<Box<dyn RowSource>> {
    if !Path::new(path).exists() {
        return Err(EtlError::SourceNotFound {
            path: path.to_string(),
        });
    }

    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => Ok(Box::new(CsvSource::open(path, chunk_size)?)),
        "xlsx" => Ok(Box::new(ExcelSource::open(path, chunk_size)?)),
        other => Err(EtlError::Parse {
            path: path.to_string(),
            reason: format!("Unsupported file extension: '{}'. Expected csv or xlsx", other),
        }),
    }
}
