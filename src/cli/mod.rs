pub mod categories;
pub mod export;
pub mod import;
pub mod init;
pub mod receipt;

use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{RekapError, Result};
use crate::exporter::ExportFormat;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "rekap", about = "Import spreadsheet transactions, reconcile categories, export them back.")]
pub struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory, create the database and seed default categories.
    Init {
        /// Path for rekap data (default: ~/Documents/rekap)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a CSV/XLSX/XLS file after previewing it.
    Import {
        /// Path to the spreadsheet
        file: String,
        /// Commit without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Import the JSON result of a receipt scan.
    Receipt {
        /// Path to the scan result
        file: String,
        /// Commit without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Export all transactions.
    Export {
        #[arg(long, value_enum, default_value = "xlsx")]
        format: FormatArg,
        /// Output path (default: <data_dir>/exports/transactions_YYYY-MM-DD.<ext>)
        #[arg(long)]
        output: Option<String>,
    },
    /// List categories.
    Categories,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Xlsx,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

/// Open the configured database, pointing at `rekap init` when it is missing.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(RekapError::Settings(format!(
            "No database found at {}\nRun `rekap init` to create one.",
            db_path.display()
        )));
    }
    get_connection(&db_path)
}
