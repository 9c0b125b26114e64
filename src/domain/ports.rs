use crate::domain::model::{SaleRecord, SourceRow};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// A lazy, finite, non-restartable sequence of source rows, delivered in
/// bounded chunks and in file order.
pub trait RowSource: Send + std::fmt::Debug {
    /// Returns the next chunk, or `None` once the file is exhausted.
    fn next_chunk(&mut self) -> Result<Option<Vec<SourceRow>>>;
}

/// Equality/pattern/range filters supported by the destination API.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    Ilike(String, String),
    Gte(String, String),
}

impl Filter {
    /// Renders the filter as a PostgREST query pair, e.g. `price=gte.100`.
    pub fn to_query_pair(&self) -> (String, String) {
        match self {
            Filter::Eq(col, v) => (col.clone(), format!("eq.{}", v)),
            Filter::Ilike(col, v) => (col.clone(), format!("ilike.{}", v)),
            Filter::Gte(col, v) => (col.clone(), format!("gte.{}", v)),
        }
    }
}

/// A read query: filters plus optional ordering and limit.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub filters: Vec<Filter>,
    pub order: Option<(String, bool)>, // (column, descending)
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some((column.to_string(), descending));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// The destination's table surface: everything this tool needs from the
/// hosted API, and nothing more.
#[async_trait]
pub trait SalesTable: Send + Sync {
    /// Inserts all records in one call. All-or-nothing per batch.
    async fn insert(&self, table: &str, records: &[SaleRecord]) -> Result<()>;

    async fn select(&self, table: &str, query: SelectQuery) -> Result<Vec<SaleRecord>>;

    /// Applies `changes` to every row matching `filter`.
    async fn update(
        &self,
        table: &str,
        filter: Filter,
        changes: &HashMap<String, serde_json::Value>,
    ) -> Result<()>;

    async fn delete(&self, table: &str, filter: Filter) -> Result<()>;

    /// Exact row count of the table.
    async fn count(&self, table: &str) -> Result<u64>;
}
