use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    category_type TEXT NOT NULL CHECK (category_type IN ('income', 'expense')),
    color TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_user_name
    ON categories (user_id, name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL CHECK (amount >= 0),
    transaction_type TEXT NOT NULL CHECK (transaction_type IN ('income', 'expense')),
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_user_date
    ON transactions (user_id, date);
";

// (name, category_type, color)
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    // Income
    ("Salary", "income", "#22c55e"),
    ("Bonus", "income", "#14b8a6"),
    ("Other Income", "income", "#06b6d4"),
    // Expenses
    ("Food & Drink", "expense", "#ef4444"),
    ("Transport", "expense", "#f97316"),
    ("Shopping", "expense", "#eab308"),
    ("Bills & Utilities", "expense", "#3b82f6"),
    ("Entertainment", "expense", "#8b5cf6"),
    ("Health", "expense", "#ec4899"),
    ("Other", "expense", "#6b7280"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Give a user the stock category set, unless they already have categories.
/// Returns how many were inserted.
pub fn seed_default_categories(conn: &Connection, user_id: i64) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM categories WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    if count > 0 {
        return Ok(0);
    }
    for (name, category_type, color) in DEFAULT_CATEGORIES {
        conn.execute(
            "INSERT INTO categories (user_id, name, category_type, color, is_default) VALUES (?1, ?2, ?3, ?4, 1)",
            rusqlite::params![user_id, name, category_type, color],
        )?;
    }
    Ok(DEFAULT_CATEGORIES.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["categories", "transactions"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_seed_defaults_once_per_user() {
        let (_dir, conn) = test_db();
        assert_eq!(seed_default_categories(&conn, 1).unwrap(), DEFAULT_CATEGORIES.len());
        assert_eq!(seed_default_categories(&conn, 1).unwrap(), 0);
        assert_eq!(seed_default_categories(&conn, 2).unwrap(), DEFAULT_CATEGORIES.len());
        let defaults: i64 = conn
            .query_row(
                "SELECT count(*) FROM categories WHERE user_id = 1 AND is_default = 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(defaults as usize, DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn test_category_names_unique_per_user_ignoring_case() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO categories (user_id, name, category_type, color) VALUES (1, 'Coffee', 'expense', '#000000')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO categories (user_id, name, category_type, color) VALUES (1, 'COFFEE', 'expense', '#000000')",
            [],
        );
        assert!(dup.is_err());
        conn.execute(
            "INSERT INTO categories (user_id, name, category_type, color) VALUES (2, 'Coffee', 'expense', '#000000')",
            [],
        )
        .unwrap();
    }
}
