use std::path::Path;

use chrono::NaiveDate;

use crate::error::{RekapError, Result};

/// One spreadsheet cell, as delivered by the CSV or workbook reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) | Self::Date(_) => false,
        }
    }

    /// Plain-text rendering used by the header matcher and the text normalizers.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Render a number the way a spreadsheet shows it: no trailing `.0` on integers.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
    Xls,
}

impl SheetFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "xls" => Ok(Self::Xls),
            _ => Err(RekapError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// Read the rows of a CSV file or the first worksheet of a workbook.
///
/// Fails unless there is a header row plus at least one data row.
pub fn read_sheet(file_name: &str, bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    let format = SheetFormat::from_file_name(file_name)?;
    let rows = match format {
        SheetFormat::Csv => read_csv_rows(bytes)?,
        SheetFormat::Xlsx | SheetFormat::Xls => read_workbook_rows(bytes)?,
    };
    tracing::debug!(file = file_name, ?format, rows = rows.len(), "read sheet");
    if rows.len() < 2 {
        return Err(RekapError::TooFewRows);
    }
    Ok(rows)
}

fn read_csv_rows(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(csv_cell).collect());
    }
    Ok(rows)
}

fn csv_cell(raw: &str) -> CellValue {
    let s = raw.trim();
    if s.is_empty() {
        return CellValue::Empty;
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(s.to_string()),
    }
}

#[cfg(feature = "xlsx")]
fn read_workbook_rows(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    use calamine::Reader;

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)?;
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(RekapError::NoWorksheet)?;
    let range = workbook.worksheet_range(&first_sheet)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect())
}

#[cfg(not(feature = "xlsx"))]
fn read_workbook_rows(_bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    Err(RekapError::UnsupportedFormat(
        "workbook support not compiled in (enable the `xlsx` feature)".into(),
    ))
}

#[cfg(feature = "xlsx")]
fn workbook_cell(cell: &calamine::Data) -> CellValue {
    use calamine::Data;

    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match crate::normalize::serial_to_date(dt.as_f64()) {
            Some(date) => CellValue::Date(date),
            None => CellValue::Number(dt.as_f64()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SheetFormat::from_file_name("a.CSV").unwrap(), SheetFormat::Csv);
        assert_eq!(SheetFormat::from_file_name("b.xlsx").unwrap(), SheetFormat::Xlsx);
        assert_eq!(SheetFormat::from_file_name("c.Xls").unwrap(), SheetFormat::Xls);
        assert!(matches!(
            SheetFormat::from_file_name("notes.txt"),
            Err(RekapError::UnsupportedFormat(_))
        ));
        assert!(SheetFormat::from_file_name("no_extension").is_err());
    }

    #[test]
    fn test_csv_cells_are_typed() {
        let rows = read_sheet("t.csv", b"Period,IDR\n01/03/2024, 35000 \n,\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], CellValue::Text("01/03/2024".into()));
        assert_eq!(rows[1][1], CellValue::Number(35000.0));
        assert_eq!(rows[2], vec![CellValue::Empty, CellValue::Empty]);
    }

    #[test]
    fn test_csv_strips_bom() {
        let rows = read_sheet("t.csv", b"\xEF\xBB\xBFDate,Amount\n01/01/2024,5\n").unwrap();
        assert_eq!(rows[0][0], CellValue::Text("Date".into()));
    }

    #[test]
    fn test_header_only_is_too_few_rows() {
        let err = read_sheet("t.csv", b"Date,Category,Amount\n").unwrap_err();
        assert!(matches!(err, RekapError::TooFewRows));
        assert!(err.is_structural());
    }

    #[test]
    fn test_ragged_csv_rows_are_accepted() {
        let rows = read_sheet("t.csv", b"a,b,c\n1\n1,2,3,4\n").unwrap();
        assert_eq!(rows[1].len(), 1);
        assert_eq!(rows[2].len(), 4);
    }

    #[test]
    fn test_number_text_has_no_trailing_zero() {
        assert_eq!(CellValue::Number(35000.0).to_text(), "35000");
        assert_eq!(CellValue::Number(12.5).to_text(), "12.5");
        assert_eq!(
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).to_text(),
            "2024-03-01"
        );
    }

    #[test]
    fn test_blank_cells() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("   ".into()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_garbage_workbook_is_rejected() {
        let err = read_sheet("broken.xlsx", b"definitely not a zip").unwrap_err();
        assert!(err.is_structural());
    }
}
