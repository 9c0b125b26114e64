use crate::domain::model::SaleRecord;
use crate::domain::ports::SalesTable;
use crate::utils::error::Result;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub table: String,
    pub batch_size: usize,
    /// Constant pause between batch submissions. Not adaptive backoff.
    pub delay: Duration,
    /// Retry a failed batch one record at a time to isolate bad rows.
    pub fallback_single: bool,
    /// When set, failed-batch descriptions are appended here after the run.
    pub error_log: Option<PathBuf>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            table: "sales_transactions".to_string(),
            batch_size: 50,
            delay: Duration::from_millis(50),
            fallback_single: false,
            error_log: None,
        }
    }
}

/// Groups records into ordered, bounded batches and submits each as one
/// insert call. A failing batch is counted and the run continues; nothing is
/// ever re-sent in a later batch.
pub struct BatchWriter {
    config: WriterConfig,
    pending: Vec<SaleRecord>,
    batch_no: usize,
    pub attempted: u64,
    pub imported: u64,
    pub failed: u64,
    pub failed_batches: u64,
    errors: Vec<String>,
}

impl BatchWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            batch_no: 0,
            attempted: 0,
            imported: 0,
            failed: 0,
            failed_batches: 0,
            errors: Vec::new(),
        }
    }

    /// Queues a record, flushing a full batch when the boundary is reached.
    /// Batch boundaries do not depend on how the source was chunked.
    pub async fn push(&mut self, dest: &dyn SalesTable, record: SaleRecord) {
        self.pending.push(record);
        if self.pending.len() >= self.config.batch_size {
            self.flush(dest).await;
        }
    }

    /// Submits any remaining partial batch and writes the error log.
    pub async fn finish(&mut self, dest: &dyn SalesTable) -> Result<()> {
        if !self.pending.is_empty() {
            self.flush(dest).await;
        }
        self.write_error_log()?;
        Ok(())
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    async fn flush(&mut self, dest: &dyn SalesTable) {
        let batch = std::mem::take(&mut self.pending);
        self.batch_no += 1;
        self.attempted += batch.len() as u64;

        match dest.insert(&self.config.table, &batch).await {
            Ok(()) => {
                self.imported += batch.len() as u64;
                tracing::info!(
                    "Batch {}: inserted {} records (total {})",
                    self.batch_no,
                    batch.len(),
                    self.imported
                );
            }
            Err(e) => {
                self.failed_batches += 1;
                tracing::warn!("Batch {} failed: {}", self.batch_no, e);
                self.errors.push(format!("Batch {}: {}", self.batch_no, e));

                if self.config.fallback_single {
                    self.insert_individually(dest, &batch).await;
                } else {
                    self.failed += batch.len() as u64;
                }
            }
        }

        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
    }

    /// Batch rejected as a whole; find which individual records are bad.
    async fn insert_individually(&mut self, dest: &dyn SalesTable, batch: &[SaleRecord]) {
        for record in batch {
            match dest
                .insert(&self.config.table, std::slice::from_ref(record))
                .await
            {
                Ok(()) => self.imported += 1,
                Err(e) => {
                    self.failed += 1;
                    self.errors.push(format!(
                        "Batch {} record rejected individually: {}",
                        self.batch_no, e
                    ));
                }
            }
        }
    }

    fn write_error_log(&self) -> Result<()> {
        let Some(path) = &self.config.error_log else {
            return Ok(());
        };
        if self.errors.is_empty() {
            return Ok(());
        }
        // Appended, so diagnostics from earlier runs survive.
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        for line in &self.errors {
            writeln!(file, "{}", line)?;
        }
        tracing::info!("Saved {} error lines to {}", self.errors.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{Filter, SelectQuery};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Destination double: records batch sizes, optionally rejecting chosen
    /// batch calls.
    struct ScriptedTable {
        calls: Mutex<Vec<Vec<SaleRecord>>>,
        reject_calls: Vec<usize>,
    }

    impl ScriptedTable {
        fn new(reject_calls: Vec<usize>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reject_calls,
            }
        }

        fn accepted_records(&self) -> Vec<SaleRecord> {
            let calls = self.calls.lock().unwrap();
            calls
                .iter()
                .enumerate()
                .filter(|(i, _)| !self.reject_calls.contains(&(i + 1)))
                .flat_map(|(_, batch)| batch.clone())
                .collect()
        }
    }

    #[async_trait]
    impl SalesTable for ScriptedTable {
        async fn insert(&self, _table: &str, records: &[SaleRecord]) -> crate::utils::error::Result<()> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(records.to_vec());
            if self.reject_calls.contains(&calls.len()) {
                return Err(EtlError::Write("duplicate key".to_string()));
            }
            Ok(())
        }

        async fn select(
            &self,
            _table: &str,
            _query: SelectQuery,
        ) -> crate::utils::error::Result<Vec<SaleRecord>> {
            Ok(vec![])
        }

        async fn update(
            &self,
            _table: &str,
            _filter: Filter,
            _changes: &HashMap<String, serde_json::Value>,
        ) -> crate::utils::error::Result<()> {
            Ok(())
        }

        async fn delete(&self, _table: &str, _filter: Filter) -> crate::utils::error::Result<()> {
            Ok(())
        }

        async fn count(&self, _table: &str) -> crate::utils::error::Result<u64> {
            Ok(0)
        }
    }

    fn record(n: i64) -> SaleRecord {
        let mut rec = SaleRecord::new();
        rec.fields.insert("sales_id".to_string(), serde_json::json!(n));
        rec
    }

    fn config(batch_size: usize) -> WriterConfig {
        WriterConfig {
            batch_size,
            delay: Duration::ZERO,
            ..WriterConfig::default()
        }
    }

    #[tokio::test]
    async fn test_partitioning_is_stable_and_exhaustive() {
        let table = ScriptedTable::new(vec![]);
        let mut writer = BatchWriter::new(config(3));

        for n in 0..8 {
            writer.push(&table, record(n)).await;
        }
        writer.finish(&table).await.unwrap();

        let calls = table.calls.lock().unwrap();
        let sizes: Vec<usize> = calls.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2]);

        // Concatenating the batches reproduces the input exactly once each.
        let ids: Vec<i64> = calls
            .iter()
            .flatten()
            .map(|r| r.get("sales_id").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());
        assert_eq!(writer.attempted, 8);
        assert_eq!(writer.imported, 8);
        assert_eq!(writer.failed, 0);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_abort_or_duplicate() {
        let table = ScriptedTable::new(vec![2]);
        let mut writer = BatchWriter::new(config(3));

        for n in 0..9 {
            writer.push(&table, record(n)).await;
        }
        writer.finish(&table).await.unwrap();

        assert_eq!(writer.attempted, 9);
        assert_eq!(writer.imported, 6);
        assert_eq!(writer.failed, 3);
        assert_eq!(writer.failed_batches, 1);
        assert_eq!(writer.attempted, writer.imported + writer.failed);

        // Later batches carry their own records, never the failed ones.
        let accepted: Vec<i64> = table
            .accepted_records()
            .iter()
            .map(|r| r.get("sales_id").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(accepted, vec![0, 1, 2, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_fallback_isolates_bad_records() {
        // Call 1 is the batch insert; calls 2-4 are the per-record retries,
        // of which call 3 (the second record) fails again.
        let table = ScriptedTable::new(vec![1, 3]);
        let mut writer = BatchWriter::new(WriterConfig {
            fallback_single: true,
            ..config(3)
        });

        for n in 0..3 {
            writer.push(&table, record(n)).await;
        }
        writer.finish(&table).await.unwrap();

        assert_eq!(writer.attempted, 3);
        assert_eq!(writer.imported, 2);
        assert_eq!(writer.failed, 1);
        assert_eq!(writer.attempted, writer.imported + writer.failed);
        assert_eq!(writer.errors().len(), 2); // batch line + record line
    }

    #[tokio::test]
    async fn test_error_log_written_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("import_errors.log");

        let table = ScriptedTable::new(vec![1]);
        let mut writer = BatchWriter::new(WriterConfig {
            error_log: Some(log_path.clone()),
            ..config(2)
        });

        writer.push(&table, record(1)).await;
        writer.push(&table, record(2)).await;
        writer.finish(&table).await.unwrap();

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("Batch 1"));
        assert!(log.contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_error_log_appends_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("import_errors.log");

        for _ in 0..2 {
            let table = ScriptedTable::new(vec![1]);
            let mut writer = BatchWriter::new(WriterConfig {
                error_log: Some(log_path.clone()),
                ..config(2)
            });
            writer.push(&table, record(1)).await;
            writer.finish(&table).await.unwrap();
        }

        let log = std::fs::read_to_string(&log_path).unwrap();
        // The second run's lines land after the first run's, not over them.
        assert_eq!(log.matches("Batch 1").count(), 2);
    }

    #[tokio::test]
    async fn test_no_error_log_on_clean_run() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("import_errors.log");

        let table = ScriptedTable::new(vec![]);
        let mut writer = BatchWriter::new(WriterConfig {
            error_log: Some(log_path.clone()),
            ..config(2)
        });

        writer.push(&table, record(1)).await;
        writer.finish(&table).await.unwrap();

        assert!(!log_path.exists());
    }
}
