use crate::core::normalizer::ColumnSpec;
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk configuration. Every field is optional; whatever is present
/// overrides the built-in defaults when merged into `EtlConfig`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub destination: Option<DestinationSection>,
    pub import: Option<ImportSection>,
    /// Declarative column mapping; replaces the default Detroit mapping
    /// wholesale when present.
    pub mapping: Option<Vec<ColumnSpec>>,
    pub link: Option<LinkSection>,
    pub report: Option<ReportSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationSection {
    pub url: Option<String>,
    pub key: Option<String>,
    pub sales_table: Option<String>,
    pub parcels_table: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSection {
    pub chunk_size: Option<usize>,
    pub batch_size: Option<usize>,
    pub delay_ms: Option<u64>,
    pub fallback_single: Option<bool>,
    pub error_log: Option<String>,
    pub min_price: Option<f64>,
    pub price_field: Option<String>,
    pub required_fields: Option<Vec<String>>,
    pub any_of_fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkSection {
    pub sentinel: Option<String>,
    pub seller_field: Option<String>,
    pub address_field: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSection {
    pub highlight_price: Option<f64>,
    pub sample_size: Option<usize>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| EtlError::InvalidConfigValue {
            field: "toml".to_string(),
            value: String::new(),
            reason: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` with the environment value; unknown variables
    /// are left as-is so validation reports them meaningfully.
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }
}
