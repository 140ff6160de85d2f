use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while the
/// pipeline converts, reshapes, or consolidates result sheets.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the bundled reference data cannot be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::Error),

    /// Raised when a sheet does not follow the expected results layout.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a file name does not follow the `{year}_{period}` convention.
    #[error("invalid file name '{0}': expected '{{year}}_{{period}}'")]
    InvalidFileName(String),

    /// Raised when a cell cannot be coerced into the column's type.
    #[error("invalid literal value '{value}' in column {column}")]
    InvalidLiteral { column: String, value: String },

    /// Raised when the user provides a path that does not exist.
    #[error("input directory not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the external converter fails on a legacy workbook.
    #[error("conversion of {file} failed: {message}")]
    Conversion { file: PathBuf, message: String },

    /// Raised when no normalized workbook could be read for consolidation.
    #[error("no valid workbook found to consolidate in {0}")]
    NothingToConsolidate(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
