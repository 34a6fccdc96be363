use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::settings::load_settings;
use crate::store::{SqliteStore, Store};

pub fn list() -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let categories = SqliteStore::new(&conn).list_categories(settings.user_id)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Color", "Default"]);
    for cat in categories {
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.name),
            Cell::new(cat.kind.label()),
            Cell::new(cat.color),
            Cell::new(if cat.is_default { "yes" } else { "" }),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}
