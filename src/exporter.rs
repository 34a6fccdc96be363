//! Transactions back out into the five-column import schema.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{RekapError, Result};
use crate::models::{Category, Transaction, TransactionType};
use crate::normalize::DEFAULT_DESCRIPTION;
use crate::sheet::format_number;

pub const HEADERS: [&str; 5] = ["Period", "Category", "Note", "Amount", "Type"];
pub const COLUMN_WIDTHS: [f64; 5] = [12.0, 20.0, 40.0, 15.0, 10.0];
pub const UNKNOWN_CATEGORY: &str = "Unknown";
pub const PERIOD_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub period: NaiveDate,
    pub category: String,
    pub note: String,
    pub amount: f64,
    pub kind: TransactionType,
}

impl ExportRow {
    pub fn period_text(&self) -> String {
        self.period.format(PERIOD_FORMAT).to_string()
    }
}

/// Join transactions to their category names, newest first.
pub fn build_rows(transactions: &[Transaction], categories: &[Category]) -> Vec<ExportRow> {
    let names: HashMap<i64, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();
    let mut rows: Vec<ExportRow> = transactions
        .iter()
        .map(|t| ExportRow {
            period: t.date,
            category: names
                .get(&t.category_id)
                .copied()
                .unwrap_or(UNKNOWN_CATEGORY)
                .to_string(),
            note: if t.description.trim().is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                t.description.clone()
            },
            amount: t.amount.abs(),
            kind: t.kind,
        })
        .collect();
    rows.sort_by(|a, b| b.period.cmp(&a.period));
    rows
}

pub fn export_transactions(
    transactions: &[Transaction],
    categories: &[Category],
    format: ExportFormat,
) -> Result<Vec<u8>> {
    let rows = build_rows(transactions, categories);
    tracing::info!(rows = rows.len(), format = format.extension(), "exporting transactions");
    match format {
        ExportFormat::Csv => write_csv(&rows),
        ExportFormat::Xlsx => write_xlsx(&rows),
    }
}

pub fn default_filename(format: ExportFormat, date: NaiveDate) -> String {
    format!("transactions_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

fn write_csv(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(HEADERS)?;
    for row in rows {
        wtr.write_record([
            row.period_text(),
            row.category.clone(),
            row.note.clone(),
            format_number(row.amount),
            row.kind.label().to_string(),
        ])?;
    }
    wtr.into_inner().map_err(|e| RekapError::Io(e.into_error()))
}

#[cfg(feature = "xlsx")]
fn write_xlsx(rows: &[ExportRow]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Transactions")?;
    for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, width)?;
        sheet.write_string(0, col, *header)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, row.period_text())?;
        sheet.write_string(r, 1, &row.category)?;
        sheet.write_string(r, 2, &row.note)?;
        sheet.write_number(r, 3, row.amount)?;
        sheet.write_string(r, 4, row.kind.label())?;
    }
    Ok(workbook.save_to_buffer()?)
}

#[cfg(not(feature = "xlsx"))]
fn write_xlsx(_rows: &[ExportRow]) -> Result<Vec<u8>> {
    Err(RekapError::UnsupportedFormat(
        "xlsx export not compiled in (enable the `xlsx` feature)".into(),
    ))
}
