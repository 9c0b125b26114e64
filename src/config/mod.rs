#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::linker::LinkConfig;
use crate::core::normalizer::{default_mapping, ColumnSpec, RecordPolicy};
use crate::core::reporter::ReportConfig;
use crate::core::writer::WriterConfig;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use std::time::Duration;

pub use toml_config::TomlConfig;

pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_KEY: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Clone)]
pub struct DestinationConfig {
    pub url: String,
    pub key: String,
    pub sales_table: String,
    pub parcels_table: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            sales_table: "sales_transactions".to_string(),
            parcels_table: "parcels".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub chunk_size: usize,
    pub batch_size: usize,
    pub delay_ms: u64,
    pub fallback_single: bool,
    pub error_log: Option<String>,
    pub policy: RecordPolicy,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            batch_size: 50,
            delay_ms: 50,
            fallback_single: false,
            error_log: None,
            policy: RecordPolicy::default(),
        }
    }
}

/// Fully resolved configuration. Precedence, lowest to highest: built-in
/// defaults, TOML file, environment, CLI flags.
#[derive(Debug, Clone, Default)]
pub struct EtlConfig {
    pub destination: DestinationConfig,
    pub import: ImportSettings,
    pub mapping_override: Option<Vec<ColumnSpec>>,
    pub link: LinkConfig,
    pub report: ReportConfig,
}

impl EtlConfig {
    /// Overlays a TOML file onto the defaults.
    pub fn apply_file(&mut self, file: &TomlConfig) {
        if let Some(dest) = &file.destination {
            overlay(&mut self.destination.url, &dest.url);
            overlay(&mut self.destination.key, &dest.key);
            overlay(&mut self.destination.sales_table, &dest.sales_table);
            overlay(&mut self.destination.parcels_table, &dest.parcels_table);
        }

        if let Some(import) = &file.import {
            overlay(&mut self.import.chunk_size, &import.chunk_size);
            overlay(&mut self.import.batch_size, &import.batch_size);
            overlay(&mut self.import.delay_ms, &import.delay_ms);
            overlay(&mut self.import.fallback_single, &import.fallback_single);
            if import.error_log.is_some() {
                self.import.error_log = import.error_log.clone();
            }
            overlay(&mut self.import.policy.min_price, &import.min_price);
            if import.price_field.is_some() {
                self.import.policy.price_field = import.price_field.clone();
            }
            overlay(&mut self.import.policy.required_fields, &import.required_fields);
            overlay(&mut self.import.policy.any_of_fields, &import.any_of_fields);
        }

        if let Some(mapping) = &file.mapping {
            self.mapping_override = Some(mapping.clone());
        }

        if let Some(link) = &file.link {
            overlay(&mut self.link.sentinel, &link.sentinel);
            overlay(&mut self.link.seller_field, &link.seller_field);
            overlay(&mut self.link.address_field, &link.address_field);
        }

        if let Some(report) = &file.report {
            overlay(&mut self.report.highlight_price, &report.highlight_price);
            overlay(&mut self.report.sample_size, &report.sample_size);
        }

        // Table names live in one place but feed three components.
        self.link.sales_table = self.destination.sales_table.clone();
        self.link.parcels_table = self.destination.parcels_table.clone();
        self.report.table = self.destination.sales_table.clone();
    }

    /// Overlays `SUPABASE_URL` / `SUPABASE_ANON_KEY` from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_URL) {
            if !url.is_empty() {
                self.destination.url = url;
            }
        }
        if let Ok(key) = std::env::var(ENV_KEY) {
            if !key.is_empty() {
                self.destination.key = key;
            }
        }
    }

    /// The effective column mapping: the file's table, or the built-in
    /// Detroit sales mapping.
    pub fn mapping(&self) -> Vec<ColumnSpec> {
        self.mapping_override.clone().unwrap_or_else(default_mapping)
    }

    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            table: self.destination.sales_table.clone(),
            batch_size: self.import.batch_size,
            delay: Duration::from_millis(self.import.delay_ms),
            fallback_single: self.import.fallback_single,
            error_log: self.import.error_log.as_ref().map(Into::into),
        }
    }
}

fn overlay<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

impl Validate for EtlConfig {
    fn validate(&self) -> Result<()> {
        if self.destination.url.is_empty() {
            return Err(EtlError::MissingConfig {
                field: format!("destination.url (or {})", ENV_URL),
            });
        }
        validate_url("destination.url", &self.destination.url)?;

        if self.destination.key.is_empty() {
            return Err(EtlError::MissingConfig {
                field: format!("destination.key (or {})", ENV_KEY),
            });
        }

        validate_non_empty_string("destination.sales_table", &self.destination.sales_table)?;
        validate_positive_number("import.batch_size", self.import.batch_size, 1)?;
        validate_positive_number("import.chunk_size", self.import.chunk_size, 1)?;

        if let Some(error_log) = &self.import.error_log {
            validate_path("import.error_log", error_log)?;
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
impl EtlConfig {
    /// Builds the effective configuration from all four layers.
    pub fn resolve(cli: &cli::Cli) -> Result<Self> {
        let mut config = EtlConfig::default();
        // Run the overlay even without a file so the table names propagate.
        let file = match &cli.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        config.apply_file(&file);
        config.apply_env();

        if let Some(url) = &cli.url {
            config.destination.url = url.clone();
        }
        if let Some(key) = &cli.key {
            config.destination.key = key.clone();
        }

        match &cli.command {
            cli::Command::Import(args) => {
                if let Some(table) = &args.table {
                    config.destination.sales_table = table.clone();
                    config.report.table = table.clone();
                    config.link.sales_table = table.clone();
                }
                if let Some(batch_size) = args.batch_size {
                    config.import.batch_size = batch_size;
                }
                if let Some(chunk_size) = args.chunk_size {
                    config.import.chunk_size = chunk_size;
                }
                if let Some(delay_ms) = args.delay_ms {
                    config.import.delay_ms = delay_ms;
                }
                if let Some(min_price) = args.min_price {
                    config.import.policy.min_price = min_price;
                }
                if args.fallback_single {
                    config.import.fallback_single = true;
                }
                if args.error_log.is_some() {
                    config.import.error_log = args.error_log.clone();
                }
            }
            cli::Command::LinkOwners(args) => {
                if let Some(sentinel) = &args.sentinel {
                    config.link.sentinel = sentinel.clone();
                }
                if let Some(parcels_table) = &args.parcels_table {
                    config.link.parcels_table = parcels_table.clone();
                }
            }
            cli::Command::Verify(args) => {
                if let Some(highlight_price) = args.highlight_price {
                    config.report.highlight_price = highlight_price;
                }
            }
        }

        Ok(config)
    }
}
