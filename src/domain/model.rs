use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// One raw row from a tabular source. Cells keep whatever shape the file
/// gave them; absent and empty cells are simply not present in the map.
#[derive(Debug, Clone, Default)]
pub struct SourceRow {
    pub cells: HashMap<String, serde_json::Value>,
}

impl SourceRow {
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.cells.get(column)
    }
}

/// A cleaned record in the destination table's shape. Never mutated after
/// the normalizer emits it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SaleRecord {
    pub fields: HashMap<String, serde_json::Value>,
}

impl SaleRecord {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_str())
    }
}

impl Default for SaleRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for one import run. `attempted = imported + failed` always holds:
/// every record handed to the writer ends up in exactly one of the two.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub rows_read: u64,
    pub dropped: u64,
    pub attempted: u64,
    pub imported: u64,
    pub failed: u64,
    pub failed_batches: u64,
    pub elapsed: Duration,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.imported as f64 / secs
        } else {
            0.0
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", "=".repeat(50)));
        if self.interrupted {
            out.push_str("Import interrupted - partial results below\n");
        } else {
            out.push_str("Import completed!\n");
        }
        out.push_str(&format!("Rows read:        {}\n", self.rows_read));
        out.push_str(&format!("Rows dropped:     {}\n", self.dropped));
        out.push_str(&format!("Records imported: {}\n", self.imported));
        out.push_str(&format!("Records failed:   {}\n", self.failed));
        out.push_str(&format!("Failed batches:   {}\n", self.failed_batches));
        out.push_str(&format!(
            "Elapsed: {:.1}s ({:.0} records/s)\n",
            self.elapsed.as_secs_f64(),
            self.throughput()
        ));
        out
    }
}

/// Counters for the owner-linking second stage.
#[derive(Debug, Clone, Default)]
pub struct LinkSummary {
    pub candidates: u64,
    pub updated: u64,
    pub unmatched: u64,
    pub failed: u64,
}

impl LinkSummary {
    pub fn render(&self) -> String {
        format!(
            "Owner linking done: {} candidates, {} updated, {} unmatched, {} failed",
            self.candidates, self.updated, self.unmatched, self.failed
        )
    }
}
