use crate::export::ExportFormat;
use crate::matcher::{EmptyPolicy, PipelineMode};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catalog-match")]
#[command(about = "Match transaction line items against a product catalog", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match every transaction against the catalog
    Match(MatchArgs),

    /// Show or initialize the config file
    Config {
        /// Print the effective config
        #[arg(long)]
        show: bool,

        /// Write the default config file
        #[arg(long)]
        init: bool,
    },

    /// Manage the decision service verdict cache
    Cache {
        /// Delete the cache
        #[arg(long)]
        clear: bool,

        /// Folder holding the cache (default: current directory)
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// Show cache info
        #[arg(long)]
        info: bool,
    },
}

#[derive(Args)]
pub struct MatchArgs {
    /// Catalog file (xlsx/xls/ods/csv)
    #[arg(short, long)]
    pub catalog: PathBuf,

    /// Transaction file (xlsx/xls/ods/csv)
    #[arg(required = true)]
    pub transactions: PathBuf,

    /// Transaction worksheet (asks when the workbook has several)
    #[arg(short, long)]
    pub sheet: Option<String>,

    /// Catalog worksheet (first sheet when omitted)
    #[arg(long)]
    pub catalog_sheet: Option<String>,

    /// Output file or directory (default: next to the transactions)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: ExportFormat,

    /// Stage preset (ignored when the config lists stages)
    #[arg(short, long, value_enum)]
    pub mode: Option<PipelineMode>,

    /// Codes reported per transaction
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Candidates a fuzzy stage keeps
    #[arg(long)]
    pub top_k: Option<usize>,

    /// What a hard-gate elimination yields
    #[arg(long, value_enum)]
    pub on_empty: Option<EmptyPolicy>,

    /// Worker threads (0 = all cores, 1 = sequential)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Write per-pass candidate CSVs into this directory
    #[arg(long)]
    pub dump_passes: Option<PathBuf>,

    /// Synonym JSON file merged over the preset
    #[arg(long)]
    pub synonyms: Option<PathBuf>,

    /// Reuse decision service verdicts from earlier runs
    #[arg(long)]
    pub use_cache: bool,

    /// Match only this transaction row (0-based)
    #[arg(long)]
    pub entry: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_match_flags() {
        let cli = Cli::try_parse_from([
            "catalog-match",
            "match",
            "-c",
            "master.xlsx",
            "aug.xlsx",
            "--on-empty",
            "last-non-empty",
            "--mode",
            "exact",
            "-f",
            "xlsx",
            "--top-n",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Match(args) => {
                assert_eq!(args.catalog, PathBuf::from("master.xlsx"));
                assert_eq!(args.transactions, PathBuf::from("aug.xlsx"));
                assert_eq!(args.on_empty, Some(EmptyPolicy::LastNonEmpty));
                assert_eq!(args.mode, Some(PipelineMode::Exact));
                assert_eq!(args.format, ExportFormat::Xlsx);
                assert_eq!(args.top_n, Some(2));
                assert!(!args.use_cache);
            }
            _ => panic!("expected match command"),
        }
    }
}
