use chrono::NaiveDate;
use rusqlite::{Connection, Row};

use crate::error::{RekapError, Result};
use crate::models::{Category, NewCategory, NewTransaction, Transaction, TransactionType};

/// The persistence collaborator the import pipeline writes through.
/// Every call may fail; nothing is assumed to be atomic across calls.
pub trait Store {
    fn list_categories(&self, user_id: i64) -> Result<Vec<Category>>;
    fn create_category(&self, user_id: i64, category: &NewCategory) -> Result<Category>;
    fn create_transactions_bulk(
        &self,
        user_id: i64,
        rows: &[NewTransaction],
    ) -> Result<Vec<Transaction>>;
    fn list_transactions(&self, user_id: i64) -> Result<Vec<Transaction>>;
}

pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

fn parse_kind(raw: String, idx: usize) -> rusqlite::Result<TransactionType> {
    TransactionType::from_key(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown transaction type: {raw}").into(),
        )
    })
}

fn parse_date(raw: String, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: parse_kind(row.get(3)?, 3)?,
        color: row.get(4)?,
        is_default: row.get(5)?,
    })
}

fn transaction_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        date: parse_date(row.get(3)?, 3)?,
        description: row.get(4)?,
        amount: row.get(5)?,
        kind: parse_kind(row.get(6)?, 6)?,
    })
}

impl Store for SqliteStore<'_> {
    fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, category_type, color, is_default FROM categories \
             WHERE user_id = ?1 \
             ORDER BY CASE category_type WHEN 'income' THEN 0 ELSE 1 END, name ASC",
        )?;
        let categories = stmt
            .query_map([user_id], category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn create_category(&self, user_id: i64, category: &NewCategory) -> Result<Category> {
        if category.name.trim().is_empty() {
            return Err(RekapError::Other("Category name is required".into()));
        }
        self.conn.execute(
            "INSERT INTO categories (user_id, name, category_type, color, is_default) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                user_id,
                category.name,
                category.kind.key(),
                category.color,
                category.is_default
            ],
        )?;
        Ok(Category {
            id: self.conn.last_insert_rowid(),
            user_id,
            name: category.name.clone(),
            kind: category.kind,
            color: category.color.clone(),
            is_default: category.is_default,
        })
    }

    /// All rows land in one SQLite transaction: either every row is stored or none.
    fn create_transactions_bulk(
        &self,
        user_id: i64,
        rows: &[NewTransaction],
    ) -> Result<Vec<Transaction>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut created = Vec::with_capacity(rows.len());
        {
            let mut owner_stmt =
                tx.prepare_cached("SELECT 1 FROM categories WHERE id = ?1 AND user_id = ?2")?;
            let mut insert_stmt = tx.prepare_cached(
                "INSERT INTO transactions (user_id, category_id, date, description, amount, transaction_type) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                if !owner_stmt.exists(rusqlite::params![row.category_id, user_id])? {
                    return Err(RekapError::UnknownCategory(row.category_id.to_string()));
                }
                insert_stmt.execute(rusqlite::params![
                    user_id,
                    row.category_id,
                    row.date.format("%Y-%m-%d").to_string(),
                    row.description,
                    row.amount,
                    row.kind.key(),
                ])?;
                created.push(Transaction {
                    id: tx.last_insert_rowid(),
                    user_id,
                    category_id: row.category_id,
                    date: row.date,
                    description: row.description.clone(),
                    amount: row.amount,
                    kind: row.kind,
                });
            }
        }
        tx.commit()?;
        Ok(created)
    }

    fn list_transactions(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, category_id, date, description, amount, transaction_type \
             FROM transactions WHERE user_id = ?1 ORDER BY date DESC, id DESC",
        )?;
        let transactions = stmt
            .query_map([user_id], transaction_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db, seed_default_categories};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn new_txn(category_id: i64, day: u32) -> NewTransaction {
        NewTransaction {
            category_id,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            description: format!("Item {day}"),
            amount: 1000.0 * day as f64,
            kind: TransactionType::Expense,
        }
    }

    #[test]
    fn test_create_and_list_categories() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn);
        let created = store
            .create_category(
                7,
                &NewCategory {
                    name: "Coffee".into(),
                    kind: TransactionType::Expense,
                    color: "#ef4444".into(),
                    is_default: false,
                },
            )
            .unwrap();
        let listed = store.list_categories(7).unwrap();
        assert_eq!(listed, vec![created]);
        assert!(store.list_categories(8).unwrap().is_empty());
    }

    #[test]
    fn test_bulk_create_roundtrips_dates_and_types() {
        let (_dir, conn) = test_db();
        seed_default_categories(&conn, 1).unwrap();
        let store = SqliteStore::new(&conn);
        let category_id = store.list_categories(1).unwrap()[0].id;
        let created = store
            .create_transactions_bulk(1, &[new_txn(category_id, 1), new_txn(category_id, 2)])
            .unwrap();
        assert_eq!(created.len(), 2);
        let listed = store.list_transactions(1).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(listed[0].kind, TransactionType::Expense);
    }

    #[test]
    fn test_bulk_create_is_all_or_nothing() {
        let (_dir, conn) = test_db();
        seed_default_categories(&conn, 1).unwrap();
        seed_default_categories(&conn, 2).unwrap();
        let store = SqliteStore::new(&conn);
        let mine = store.list_categories(1).unwrap()[0].id;
        let theirs = store.list_categories(2).unwrap()[0].id;

        let err = store
            .create_transactions_bulk(1, &[new_txn(mine, 1), new_txn(theirs, 2)])
            .unwrap_err();
        assert!(matches!(err, RekapError::UnknownCategory(_)));
        assert!(store.list_transactions(1).unwrap().is_empty());
    }
}
