use std::path::PathBuf;

use crate::db::{get_connection, init_db, seed_default_categories};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    std::fs::create_dir_all(PathBuf::from(&settings.data_dir).join("exports"))?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    let seeded = seed_default_categories(&conn, settings.user_id)?;
    save_settings(&settings)?;

    println!("Data directory: {}", settings.data_dir);
    if seeded > 0 {
        println!("Seeded {seeded} default categories.");
    }
    Ok(())
}
