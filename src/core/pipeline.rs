use crate::core::normalizer::Normalizer;
use crate::core::writer::BatchWriter;
use crate::domain::model::RunSummary;
use crate::domain::ports::{RowSource, SalesTable};
use crate::utils::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// The linear read -> normalize -> batch-write loop. One chunk is fully
/// processed before the next is read, so memory stays bounded.
pub struct ImportPipeline {
    source: Box<dyn RowSource>,
    normalizer: Normalizer,
    writer: BatchWriter,
    interrupted: Arc<AtomicBool>,
}

impl ImportPipeline {
    pub fn new(source: Box<dyn RowSource>, normalizer: Normalizer, writer: BatchWriter) -> Self {
        Self {
            source,
            normalizer,
            writer,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag checked between chunks. The CLI wires Ctrl-C to it so an
    /// interrupted run still flushes counters and prints its summary.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub async fn run(mut self, dest: &dyn SalesTable) -> Result<RunSummary> {
        let start = Instant::now();
        let mut rows_read: u64 = 0;
        let mut dropped: u64 = 0;
        let mut chunk_no: u64 = 0;

        'read: while let Some(chunk) = self.source.next_chunk()? {
            chunk_no += 1;
            let chunk_len = chunk.len();

            for row in &chunk {
                rows_read += 1;
                match self.normalizer.normalize(row) {
                    Some(record) => self.writer.push(dest, record).await,
                    None => dropped += 1,
                }

                // Checked per row so at most the in-flight batch completes
                // after the signal.
                if self.interrupted.load(Ordering::Relaxed) {
                    tracing::warn!("Interrupt received, stopping after {} rows", rows_read);
                    break 'read;
                }
            }

            tracing::debug!(
                "Chunk {}: {} rows ({} read, {} dropped so far)",
                chunk_no,
                chunk_len,
                rows_read,
                dropped
            );
        }

        self.writer.finish(dest).await?;

        Ok(RunSummary {
            rows_read,
            dropped,
            attempted: self.writer.attempted,
            imported: self.writer.imported,
            failed: self.writer.failed,
            failed_batches: self.writer.failed_batches,
            elapsed: start.elapsed(),
            interrupted: self.interrupted.load(Ordering::Relaxed),
        })
    }
}
