//! Adapter for the receipt-scanning service's JSON output.
//!
//! The service reads a photo of a receipt and answers with something like
//! `{"date": "01/03/2024", "amount": "Rp 35000", "description": "...",
//! "category": "Coffee", "type": "expense"}`. Field values may be strings,
//! numbers or null. The result is normalized exactly like a spreadsheet row.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{RekapError, Result};
use crate::models::ParsedRow;
use crate::normalize::{
    normalize_amount, normalize_category_name, normalize_date, normalize_description,
    normalize_type,
};
use crate::sheet::CellValue;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReceiptScan {
    pub date: Value,
    pub amount: Value,
    pub description: Value,
    pub category: Value,
    #[serde(rename = "type")]
    pub kind: Value,
}

fn cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
        Value::String(s) if s.trim().is_empty() => CellValue::Empty,
        Value::String(s) => CellValue::Text(s.clone()),
        Value::Bool(b) => CellValue::Text(b.to_string()),
        Value::Array(_) | Value::Object(_) => CellValue::Empty,
    }
}

impl ReceiptScan {
    pub fn into_row(self) -> Result<ParsedRow> {
        let date = cell(&self.date);
        let amount = cell(&self.amount);
        let category = cell(&self.category);
        let description = cell(&self.description);
        let kind = cell(&self.kind);

        Ok(ParsedRow {
            date: normalize_date(&date).map_err(|e| RekapError::Receipt(e.to_string()))?,
            amount: normalize_amount(&amount).map_err(|e| RekapError::Receipt(e.to_string()))?,
            category_name: normalize_category_name(Some(&category)),
            description: normalize_description(Some(&description), Some(&category)),
            kind: normalize_type(Some(&kind)),
        })
    }
}

pub fn parse_receipt(json: &str) -> Result<ParsedRow> {
    let scan: ReceiptScan =
        serde_json::from_str(json).map_err(|e| RekapError::Receipt(e.to_string()))?;
    scan.into_row()
}
