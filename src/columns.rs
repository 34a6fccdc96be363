use crate::error::{RekapError, Result};
use crate::sheet::CellValue;

const DATE_ALIASES: &[&str] = &["period", "date", "tanggal", "waktu"];
const CATEGORY_ALIASES: &[&str] = &["category", "kategori"];
const DESCRIPTION_ALIASES: &[&str] = &[
    "note",
    "description",
    "desc",
    "keterangan",
    "catatan",
    "deskripsi",
];
const AMOUNT_ALIASES: &[&str] = &["idr", "amount", "jumlah", "nominal"];
const TYPE_ALIASES: &[&str] = &["type", "tipe", "jenis"];

/// Header positions of the five logical fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date: usize,
    pub category: usize,
    pub amount: usize,
    pub description: Option<usize>,
    pub kind: Option<usize>,
}

fn header_matches(header: &str, alias: &str) -> bool {
    header.contains(alias) || alias.contains(header)
}

/// First header (left to right) that matches any alias of the field.
fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        !h.is_empty() && aliases.iter().any(|alias| header_matches(h, alias))
    })
}

/// Resolve the header row. Fails before any data row is looked at when a
/// required column (date, category, amount) is missing.
pub fn map_columns(header: &[CellValue]) -> Result<ColumnMapping> {
    let headers: Vec<String> = header
        .iter()
        .map(|cell| cell.to_text().trim().to_lowercase())
        .collect();

    let date = find_column(&headers, DATE_ALIASES);
    let category = find_column(&headers, CATEGORY_ALIASES);
    let amount = find_column(&headers, AMOUNT_ALIASES);

    match (date, category, amount) {
        (Some(date), Some(category), Some(amount)) => {
            let mapping = ColumnMapping {
                date,
                category,
                amount,
                description: find_column(&headers, DESCRIPTION_ALIASES),
                kind: find_column(&headers, TYPE_ALIASES),
            };
            tracing::debug!(?mapping, "mapped header row");
            Ok(mapping)
        }
        _ => {
            let missing: Vec<&'static str> = [("date", date), ("category", category), ("amount", amount)]
                .into_iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name)
                .collect();
            Err(RekapError::MissingColumns(missing))
        }
    }
}
