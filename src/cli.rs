//! Pieces shared by the `update_basketlist` and `update_and_export` binaries.

use clap::Args;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, SyncError};
use crate::sync::{DESTINATION_SHEET, SOURCE_SHEET, SheetPair};

/// Generic failure, and the missing-sheet status of `update_basketlist`.
pub const EXIT_FAILURE: i32 = 1;
/// Wrong argument count. clap exits with this status on usage errors.
pub const EXIT_USAGE: i32 = 2;
/// Workbook file not found, for `update_basketlist`.
pub const EXIT_MISSING_WORKBOOK: i32 = 3;

/// Sheet names, overridable from the command line.
#[derive(Args, Debug, Clone)]
pub struct SheetArgs {
    /// Sheet to copy values from.
    #[arg(long, value_name = "NAME", default_value = SOURCE_SHEET)]
    pub source_sheet: String,

    /// Sheet to overwrite with the source's values.
    #[arg(long, value_name = "NAME", default_value = DESTINATION_SHEET)]
    pub destination_sheet: String,
}

impl SheetArgs {
    pub fn pair(&self) -> SheetPair {
        SheetPair::new(&self.source_sheet, &self.destination_sheet)
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| SyncError::Logging(error.to_string()))
}

/// Exit status of `update_basketlist` for a failed run.
pub fn update_exit_code(error: &SyncError) -> i32 {
    match error {
        SyncError::MissingInput(_) => EXIT_MISSING_WORKBOOK,
        _ => EXIT_FAILURE,
    }
}
