use crate::columns::{map_columns, ColumnMapping};
use crate::error::{RekapError, Result};
use crate::models::ParsedRow;
use crate::normalize::{
    normalize_amount, normalize_category_name, normalize_date, normalize_description,
    normalize_type, RowError,
};
use crate::sheet::{read_sheet, CellValue};

/// Rows that survived normalization plus one message per dropped row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub rows: Vec<ParsedRow>,
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

fn parse_row(row: &[CellValue], mapping: &ColumnMapping) -> std::result::Result<ParsedRow, RowError> {
    let cell = |idx: usize| row.get(idx);
    let optional = |idx: Option<usize>| idx.and_then(|i| row.get(i));

    let date = normalize_date(cell(mapping.date).unwrap_or(&CellValue::Empty))?;
    let amount = normalize_amount(cell(mapping.amount).unwrap_or(&CellValue::Empty))?;
    let category_name = normalize_category_name(cell(mapping.category));
    let description = normalize_description(optional(mapping.description), cell(mapping.category));
    let kind = normalize_type(optional(mapping.kind));

    Ok(ParsedRow {
        date,
        amount,
        description,
        category_name,
        kind,
    })
}

/// Normalize every data row. Blank rows are skipped silently; a row whose
/// date or amount cannot be read is dropped with a message naming its sheet
/// row (the header is row 1). Fails only when nothing survives.
pub fn parse_rows(data_rows: &[Vec<CellValue>], mapping: &ColumnMapping) -> Result<ParseOutcome> {
    let mut outcome = ParseOutcome::default();

    for (i, row) in data_rows.iter().enumerate() {
        if row.iter().all(CellValue::is_blank) {
            continue;
        }
        match parse_row(row, mapping) {
            Ok(parsed) => outcome.rows.push(parsed),
            Err(e) => {
                let row_number = i + 2;
                tracing::warn!(row = row_number, error = %e, "skipping row");
                outcome.errors.push(format!("Row {row_number}: {e}"));
            }
        }
    }

    if outcome.rows.is_empty() {
        return Err(RekapError::NoValidRows(outcome.errors));
    }

    outcome.rows.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(outcome)
}

/// Read, map and normalize a whole file.
pub fn parse_file(file_name: &str, bytes: &[u8]) -> Result<ParseOutcome> {
    let rows = read_sheet(file_name, bytes)?;
    let (header, data) = rows.split_first().ok_or(RekapError::TooFewRows)?;
    let mapping = map_columns(header)?;
    let outcome = parse_rows(data, &mapping)?;
    tracing::info!(
        file = file_name,
        parsed = outcome.rows.len(),
        skipped = outcome.errors.len(),
        "parsed import file"
    );
    Ok(outcome)
}
