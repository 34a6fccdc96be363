use thiserror::Error;

#[derive(Error, Debug)]
pub enum RekapError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "xlsx")]
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[cfg(feature = "xlsx")]
    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Unsupported file format: {0} (expected .xlsx, .xls or .csv)")]
    UnsupportedFormat(String),

    #[error("No worksheet found in workbook")]
    NoWorksheet,

    #[error("File must contain a header row and at least one data row")]
    TooFewRows,

    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error("No valid transactions found ({} row error(s))", .0.len())]
    NoValidRows(Vec<String>),

    #[error("Failed to create category {name:?}: {source}")]
    Reconciliation {
        name: String,
        #[source]
        source: Box<RekapError>,
    },

    #[error("Failed to create transactions: {0}")]
    Commit(#[source] Box<RekapError>),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid receipt: {0}")]
    Receipt(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl RekapError {
    /// File-level failures that keep the import on the upload step.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::NoWorksheet
                | Self::TooFewRows
                | Self::MissingColumns(_)
                | Self::NoValidRows(_)
                | Self::Csv(_)
        ) || self.is_workbook()
    }

    #[cfg(feature = "xlsx")]
    fn is_workbook(&self) -> bool {
        matches!(self, Self::Workbook(_))
    }

    #[cfg(not(feature = "xlsx"))]
    fn is_workbook(&self) -> bool {
        false
    }
}

pub type Result<T> = std::result::Result<T, RekapError>;
