use crate::domain::model::SourceRow;
use crate::domain::ports::RowSource;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::fs::File;

/// Streaming CSV reader. Rows are pulled from disk `chunk_size` at a time so
/// memory stays bounded no matter how large the file is.
#[derive(Debug)]
pub struct CsvSource {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    chunk_size: usize,
    done: bool,
}

impl CsvSource {
    pub fn open(path: &str, chunk_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

        let headers = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // Tolerate a leading UTF-8 BOM on the first header cell.
                let h = if i == 0 {
                    h.trim_start_matches('\u{feff}')
                } else {
                    h
                };
                h.trim().to_string()
            })
            .collect();

        Ok(Self {
            reader,
            headers,
            chunk_size: chunk_size.max(1),
            done: false,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn row_from_record(&self, record: &csv::StringRecord) -> SourceRow {
        let mut cells = HashMap::new();
        for (header, value) in self.headers.iter().zip(record.iter()) {
            if !value.is_empty() {
                cells.insert(
                    header.clone(),
                    serde_json::Value::String(value.to_string()),
                );
            }
        }
        SourceRow { cells }
    }
}

impl RowSource for CsvSource {
    fn next_chunk(&mut self) -> Result<Option<Vec<SourceRow>>> {
        if self.done {
            return Ok(None);
        }

        let mut chunk = Vec::with_capacity(self.chunk_size);
        let mut record = csv::StringRecord::new();

        while chunk.len() < self.chunk_size {
            if self.reader.read_record(&mut record)? {
                chunk.push(self.row_from_record(&record));
            } else {
                self.done = true;
                break;
            }
        }

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }
}
