pub mod engine;
pub mod linker;
pub mod normalizer;
pub mod pipeline;
pub mod reporter;
pub mod writer;

pub use crate::domain::model::{LinkSummary, RunSummary, SaleRecord, SourceRow};
pub use crate::domain::ports::{Filter, RowSource, SalesTable, SelectQuery};
pub use crate::utils::error::Result;
