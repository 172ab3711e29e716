use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type covering the failures that can occur while loading, synchronising,
/// saving, or exporting a workbook.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when the workbook container cannot be opened as a ZIP archive.
    #[error("workbook container error: {0}")]
    Container(#[from] zip::result::ZipError),

    /// Raised when a worksheet part contains malformed XML.
    #[error("worksheet XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Raised when CSV serialisation fails.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Raised when the user provides a path that does not exist.
    #[error("workbook not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a sheet required by the operation is absent.
    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),

    /// Raised when a sheet is added under a name that is already taken.
    #[error("sheet '{0}' already exists")]
    DuplicateSheet(String),

    /// Raised when the source and destination resolve to the same sheet.
    #[error("source and destination are the same sheet '{0}'")]
    SameSheet(String),

    /// Raised when an A1-style cell reference cannot be parsed.
    #[error("invalid cell reference '{0}'")]
    InvalidCellReference(String),

    /// Raised when a merged range is malformed or covers a single cell.
    #[error("invalid merged range '{0}'")]
    InvalidMergeRange(String),

    /// Raised when a merged range would overlap one already on the sheet.
    #[error("merged range {range} overlaps existing range {existing}")]
    MergeOverlap { range: String, existing: String },

    /// Raised when unmerging a range that is not registered on the sheet.
    #[error("merged range {0} is not registered on the sheet")]
    MergeNotFound(String),

    /// Raised when a column width is not a usable display width.
    #[error("invalid width {width} for column {column}")]
    InvalidColumnWidth { column: u32, width: f64 },

    /// Raised when a row height is not a usable display height.
    #[error("invalid height {height} for row {row}")]
    InvalidRowHeight { row: u32, height: f64 },

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
