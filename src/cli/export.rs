use std::path::{Path, PathBuf};

use crate::cli::open_db;
use crate::error::Result;
use crate::exporter::{default_filename, export_transactions, ExportFormat};
use crate::settings::{load_settings, Settings};
use crate::store::{SqliteStore, Store};

fn default_path(settings: &Settings, format: ExportFormat) -> PathBuf {
    let today = chrono::Local::now().date_naive();
    PathBuf::from(&settings.data_dir)
        .join("exports")
        .join(default_filename(format, today))
}

fn write_file(bytes: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn run(format: ExportFormat, output: Option<String>) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let store = SqliteStore::new(&conn);

    let transactions = store.list_transactions(settings.user_id)?;
    let categories = store.list_categories(settings.user_id)?;
    let bytes = export_transactions(&transactions, &categories, format)?;

    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path(&settings, format));
    write_file(&bytes, &path)?;
    println!("Exported {} transactions to {}", transactions.len(), path.display());
    Ok(())
}
