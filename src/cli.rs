use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sheetcache",
    version,
    about = "Inspect and sync local caches of remote spreadsheet tabs."
)]
pub struct Cli {
    /// Config file (TOML). Defaults to config.toml in the platform config directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the per-sheet cache files. Overrides the config file.
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory of `*.json` credential files. Overrides the config file.
    #[arg(long, global = true, value_name = "DIR")]
    pub keys_dir: Option<PathBuf>,

    /// Use a directory of CSV files as the remote (`<DIR>/<spreadsheet>/<sheet>.csv`).
    ///
    /// Without it the cache runs offline and only sheets already cached can be read.
    #[arg(long, global = true, value_name = "DIR")]
    pub mirror: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Clone, Debug)]
pub struct SheetArgs {
    /// Spreadsheet id.
    pub spreadsheet: String,

    /// Sheet (tab) name.
    pub sheet: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show credential pool status.
    Keys,

    /// Print one cell value.
    Get {
        #[command(flatten)]
        sheet: SheetArgs,
        /// Cell label, e.g. B2.
        cell: String,
    },

    /// Write one cell locally; it stays dirty until flushed.
    Set {
        #[command(flatten)]
        sheet: SheetArgs,
        cell: String,
        value: String,
    },

    /// Print a range as CSV (A1:C3, A:C, 2:5, A2:C).
    Range {
        #[command(flatten)]
        sheet: SheetArgs,
        range: String,
    },

    /// List dirty cells.
    Dirty {
        #[command(flatten)]
        sheet: SheetArgs,
    },

    /// Push cells to the remote; all dirty cells when none are given.
    Flush {
        #[command(flatten)]
        sheet: SheetArgs,
        cells: Vec<String>,
    },

    /// Export a range to a CSV file, guarding against formula injection.
    Export {
        #[command(flatten)]
        sheet: SheetArgs,
        range: String,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}
