pub mod config;
pub mod core;
pub mod destination;
pub mod domain;
pub mod source;
pub mod utils;

pub use config::EtlConfig;
pub use core::engine::EtlEngine;
pub use core::linker::OwnerLinker;
pub use core::normalizer::Normalizer;
pub use core::pipeline::ImportPipeline;
pub use core::reporter::Reporter;
pub use core::writer::BatchWriter;
pub use destination::PostgrestClient;
pub use utils::error::{EtlError, Result};
