use std::path::Path;

use crate::cli::import::drive;
use crate::cli::open_db;
use crate::error::Result;
use crate::receipt::parse_receipt;
use crate::session::Importer;
use crate::settings::load_settings;
use crate::store::SqliteStore;

pub fn run(file: &str, yes: bool) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let store = SqliteStore::new(&conn);

    let json = std::fs::read_to_string(file)?;
    let row = parse_receipt(&json)?;
    let source = Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());

    let mut importer = Importer::new(&store, settings.user_id, settings.color_strategy());
    importer.stage_rows(&source, vec![row]);
    drive(&mut importer, yes, &mut std::io::stdin().lock())
}
