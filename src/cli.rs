//! CLI argument parsing for the enrichment job.
//!
//! Every flag is optional so a config file can supply the run; flags win over
//! the file when both are given.
use crate::config::RowRange;
use crate::policy::OverwritePolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "cenrich",
    version,
    about = "Fill in company website, LinkedIn, careers, and job-listing URLs via web-search LM lookups",
    after_help = "Commands:\n  run     Enrich rows that are missing a website or job listings URL\n  status  Count complete / partial / unresolved rows without calling the service\n  models  List models that support generateContent\n\nExamples:\n  cenrich run --input companies.csv --output companies_enriched.csv\n  cenrich run --input companies.csv --output out.csv --rows 88..150 --delay-ms 2000\n  cenrich status --input out.csv --json\n  cenrich models",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// JSON config file (defaults to <config dir>/cenrich/config.json when present)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Emit debug-level logs on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Status(StatusArgs),
    Models(ModelsArgs),
}

/// Run command inputs; unset flags fall back to the config file.
#[derive(Parser, Debug, Default)]
#[command(about = "Look up missing links and write the enriched table")]
pub struct RunArgs {
    /// Input table (CSV, or an .xlsx/.xls/.ods workbook) with a "Company Name" column
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output CSV (must differ from the input); an existing one is resumed
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Row slice to process, START..END (zero-based, END exclusive; either side optional)
    #[arg(long, value_name = "RANGE")]
    pub rows: Option<RowRange>,

    /// Which existing fields a lookup may replace
    #[arg(long, value_enum)]
    pub overwrite: Option<OverwritePolicy>,

    /// Save the output every N rows (by row index)
    #[arg(long, value_name = "N")]
    pub checkpoint_every: Option<usize>,

    /// Pause after each looked-up row, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Model used for lookups
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature for lookups
    #[arg(long)]
    pub temperature: Option<f32>,

    /// API key (overrides the config file and GEMINI_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Append one JSON line per lookup to this file
    #[arg(long, value_name = "PATH")]
    pub lookup_log: Option<PathBuf>,

    /// Start over from the input even when the output already exists
    #[arg(long)]
    pub restart: bool,
}

/// Status command inputs for a read-only summary.
#[derive(Parser, Debug, Default)]
#[command(about = "Summarize how many rows still need a lookup")]
pub struct StatusArgs {
    /// CSV to inspect (defaults to the configured output once written, else the input)
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Row slice to inspect, START..END
    #[arg(long, value_name = "RANGE")]
    pub rows: Option<RowRange>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Models command inputs.
#[derive(Parser, Debug, Default)]
#[command(about = "List models that support generateContent")]
pub struct ModelsArgs {
    /// API key (overrides the config file and GEMINI_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
