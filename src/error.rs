use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Workbook layout does not match its classification (sheet '{sheet}'): {details}")]
    StructuralMismatch { sheet: String, details: String },

    #[error("No month header row found in sheet '{sheet}' between rows {first_row} and {last_row}")]
    HeaderNotFound {
        sheet: String,
        first_row: usize,
        last_row: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid path pattern '{pattern}': {details}")]
    InvalidPattern { pattern: String, details: String },

    #[error("Workbook read error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ReportError {
    /// Short machine-friendly name used in per-file status lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::StructuralMismatch { .. } => "StructuralMismatch",
            ReportError::HeaderNotFound { .. } => "HeaderNotFound",
            ReportError::InvalidConfig(_) => "InvalidConfig",
            ReportError::InvalidPattern { .. } => "InvalidPattern",
            ReportError::Workbook(_) => "WorkbookError",
            ReportError::SerializationError(_) => "SerializationError",
            ReportError::CsvError(_) => "CsvError",
            ReportError::IoError(_) => "IoError",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
