use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sales-etl")]
#[command(about = "Imports property-sales spreadsheets into a hosted table API")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Destination base URL (overrides config file and SUPABASE_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Destination API key (overrides config file and SUPABASE_ANON_KEY)
    #[arg(long)]
    pub key: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log process CPU/memory usage per stage
    #[arg(long)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read a CSV/XLSX file and insert its rows into the sales table
    Import(ImportArgs),
    /// Fill in owner names for sales still carrying the placeholder seller
    LinkOwners(LinkArgs),
    /// Run the read-only verification queries and print the summary
    Verify(VerifyArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Source file (.csv or .xlsx)
    pub source: String,

    /// Destination table name
    #[arg(long)]
    pub table: Option<String>,

    /// Records per insert call
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Rows read from the source at a time
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Constant pause between batch submissions, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Drop rows whose price is not strictly above this
    #[arg(long)]
    pub min_price: Option<f64>,

    /// Retry a failed batch record-by-record to isolate bad rows
    #[arg(long)]
    pub fallback_single: bool,

    /// File to write failed-batch descriptions to
    #[arg(long)]
    pub error_log: Option<String>,

    /// Skip the post-run verification queries
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Placeholder seller value marking rows still to be enriched
    #[arg(long)]
    pub sentinel: Option<String>,

    /// Parcels table to look owners up in
    #[arg(long)]
    pub parcels_table: Option<String>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Price threshold for the notable-sales section
    #[arg(long)]
    pub highlight_price: Option<f64>,
}
