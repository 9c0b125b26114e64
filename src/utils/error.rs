use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Source file not found: {path}")]
    SourceNotFound { path: String },

    #[error("Cannot parse {path} as tabular data: {reason}")]
    Parse { path: String, reason: String },

    #[error("Destination request failed: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Destination refused writes: {0}")]
    Unwritable(String),

    #[error("Batch insert rejected: {0}")]
    Write(String),

    #[error("Verification query failed: {0}")]
    Verify(String),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel processing error: {0}")]
    Excel(#[from] calamine::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing configuration field: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Recovered at row or batch granularity; the run keeps going.
    Recoverable,
    /// Aborts the run before (or without) any writes.
    Fatal,
}

impl EtlError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::Write(_) | EtlError::Verify(_) => ErrorSeverity::Recoverable,
            _ => ErrorSeverity::Fatal,
        }
    }

    /// Exit code for the process when the error reaches `main`. Partial
    /// row/batch failures never reach here, so anything fatal maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Recoverable => 0,
            ErrorSeverity::Fatal => 1,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::SourceNotFound { .. } => "Check the source file path",
            EtlError::Parse { .. } | EtlError::Csv(_) | EtlError::Excel(_) => {
                "Verify the file is valid CSV or XLSX with a header row"
            }
            EtlError::Connection(_) => {
                "Check the destination URL, API key and network connectivity"
            }
            EtlError::Unwritable(_) => {
                "Check the table's row-level-security policy allows inserts for this key"
            }
            EtlError::Write(_) => "Inspect the error log for the rejected batch",
            EtlError::Verify(_) => "The import itself succeeded; re-run `verify` later",
            EtlError::MissingConfig { .. } | EtlError::InvalidConfigValue { .. } => {
                "Fix the configuration (flags, TOML file or environment)"
            }
            EtlError::Io(_) => "Check file permissions and disk space",
            EtlError::Serialization(_) => "The record contained a non-JSON value",
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
