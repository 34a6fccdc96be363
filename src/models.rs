use std::fmt;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Storage key, as written to the `category_type` / `transaction_type` columns.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }

    /// Label used in the exported `Type` column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: TransactionType,
    pub color: String,
    pub is_default: bool,
}

/// Creation request for a category not yet known to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub kind: TransactionType,
    pub color: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub category_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionType,
}

/// A normalized spreadsheet row, ready for category reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub date: NaiveDate,
    /// Always non-negative; direction lives in `kind`.
    pub amount: f64,
    pub description: String,
    pub category_name: String,
    pub kind: TransactionType,
}
