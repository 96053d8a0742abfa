//! CLI argument definitions for eodex.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `import` | Reconcile a vendor EOD flat file into the warehouse |
//! | `registry` | Seed or inspect the securities registry |
//! | `sql` | Query the local DuckDB warehouse |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Reconcile vendor end-of-day price feeds against the local securities
/// registry.
#[derive(Debug, Parser)]
#[command(
    name = "eodex",
    author,
    version,
    about = "EOD price feed reconciliation CLI"
)]
pub struct Cli {
    /// Warehouse database path (defaults to $EODEX_HOME/warehouse.duckdb).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    ///
    /// Useful for scheduled imports that must not paper over skipped
    /// symbols.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Key/value table for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import a vendor EOD flat file into the warehouse.
    ///
    /// Each symbol is resolved against the registry, already-stored bars
    /// are skipped, and splits/dividends are derived from the vendor's
    /// adjustment factors. Unresolved symbols are reported and skipped.
    Import(ImportArgs),

    /// Manage the securities registry.
    Registry(RegistryArgs),

    /// Run SQL queries against the DuckDB warehouse.
    ///
    /// Default mode is read-only; use --write for data modifications.
    Sql(SqlArgs),
}

/// Arguments for the `import` command.
#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Path to the vendor flat file (headerless CSV, grouped by symbol).
    pub feed: PathBuf,
}

/// Arguments for the `registry` command group.
#[derive(Debug, Args)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub command: RegistryCommand,
}

/// Registry administration subcommands.
#[derive(Debug, Subcommand)]
pub enum RegistryCommand {
    /// Load exchanges and securities from a JSON seed document.
    ///
    /// Securities reference exchanges by label; re-seeding is idempotent.
    Seed(SeedArgs),

    /// List registered exchanges and securities.
    List,
}

/// Arguments for `registry seed`.
#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Path to the JSON seed document.
    pub file: PathBuf,
}

/// Arguments for the `sql` command.
#[derive(Debug, Args)]
pub struct SqlArgs {
    /// SQL query to execute.
    pub query: String,

    /// Allow write operations (INSERT, UPDATE, DELETE, CREATE, etc.).
    #[arg(long, default_value_t = false)]
    pub write: bool,

    /// Maximum number of rows to return.
    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    /// Query timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub query_timeout_ms: u64,
}
