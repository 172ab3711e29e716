use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::io::{csv_export, excel_read, excel_write};
use crate::model::{Cell, CellRef, Sheet, Workbook};

/// Sheet the values are copied from.
pub const SOURCE_SHEET: &str = "oilpricechart";
/// Sheet the values are copied into.
pub const DESTINATION_SHEET: &str = "Basketlist";

/// Names of the sheets taking part in a synchronisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPair {
    pub source: String,
    pub destination: String,
}

impl SheetPair {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl Default for SheetPair {
    fn default() -> Self {
        Self::new(SOURCE_SHEET, DESTINATION_SHEET)
    }
}

/// Outcome of [`clear_sheet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub cells_cleared: usize,
    pub merges_removed: usize,
    pub unmerge_failures: usize,
}

/// Outcome of [`copy_sheet`]. Skipped merges and widths are the best-effort
/// replications that did not apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub rows: u32,
    pub columns: u32,
    pub merges_copied: usize,
    pub merges_skipped: usize,
    pub widths_copied: usize,
    pub widths_skipped: usize,
}

/// Outcome of [`update_and_export`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    /// `None` when the update step was skipped because the source sheet is absent.
    pub update: Option<CopyReport>,
    /// CSV files written, source sheet first.
    pub files: Vec<PathBuf>,
}

/// Removes every merged range from the sheet, then empties every cell in its
/// bounding extent. Unmerge failures are skipped.
pub fn clear_sheet(sheet: &mut Sheet) -> ClearReport {
    let mut report = ClearReport::default();

    for range in sheet.merged_ranges().to_vec() {
        match sheet.unmerge(&range) {
            Ok(()) => report.merges_removed += 1,
            Err(error) => {
                debug!(sheet = sheet.name(), %range, %error, "unmerge failed");
                report.unmerge_failures += 1;
            }
        }
    }

    // Every populated cell lies inside the extent, so emptying the populated
    // cells empties the whole extent.
    let populated: Vec<CellRef> = sheet.cells().map(|(position, _)| position).collect();
    for position in populated {
        sheet.set_cell(position.row, position.column, Cell::default());
        report.cells_cleared += 1;
    }

    report
}

/// Copies the source's full rectangular extent into `destination`, then
/// replicates merged ranges and explicit column widths on a best-effort basis.
///
/// `destination` is expected to have been cleared with [`clear_sheet`].
pub fn copy_sheet(source: &Sheet, destination: &mut Sheet) -> CopyReport {
    let mut report = CopyReport {
        rows: source.max_row(),
        columns: source.max_column(),
        ..CopyReport::default()
    };

    // Positions inside the source extent that are blank in the source end up
    // blank in the destination too.
    let stale: Vec<CellRef> = destination
        .cells()
        .map(|(position, _)| position)
        .filter(|position| {
            position.row <= report.rows
                && position.column <= report.columns
                && source.cell(position.row, position.column).is_none()
        })
        .collect();
    for position in stale {
        destination.set_cell(position.row, position.column, Cell::default());
    }
    for (position, cell) in source.cells() {
        destination.set_cell(position.row, position.column, cell.clone());
    }

    for range in source.merged_ranges() {
        match destination.merge(*range) {
            Ok(()) => report.merges_copied += 1,
            Err(error) => {
                debug!(sheet = destination.name(), %range, %error, "merge not replicated");
                report.merges_skipped += 1;
            }
        }
    }

    for (column, width) in source.column_widths() {
        if width <= 0.0 {
            report.widths_skipped += 1;
            continue;
        }
        match destination.set_column_width(column, width) {
            Ok(()) => report.widths_copied += 1,
            Err(error) => {
                debug!(sheet = destination.name(), column, %error, "width not replicated");
                report.widths_skipped += 1;
            }
        }
    }

    report
}

/// Clears the destination sheet and copies the source sheet into it, creating
/// the destination when the workbook lacks it.
///
/// Fails with [`SyncError::MissingSheet`] before touching the workbook when the
/// source sheet is absent.
#[instrument(
    level = "debug",
    skip_all,
    fields(source = %pair.source, destination = %pair.destination)
)]
pub fn synchronize(workbook: &mut Workbook, pair: &SheetPair) -> Result<CopyReport> {
    if !workbook.contains(&pair.source) {
        return Err(SyncError::MissingSheet(pair.source.clone()));
    }
    if pair.source == pair.destination {
        return Err(SyncError::SameSheet(pair.source.clone()));
    }
    if !workbook.contains(&pair.destination) {
        info!("destination sheet missing; creating it");
        workbook.get_or_create_sheet(&pair.destination);
    }

    let (source, destination) = workbook.sheet_pair_mut(&pair.source, &pair.destination)?;
    let cleared = clear_sheet(destination);
    debug!(
        cells = cleared.cells_cleared,
        merges = cleared.merges_removed,
        "destination cleared"
    );

    let report = copy_sheet(source, destination);
    debug!(
        rows = report.rows,
        columns = report.columns,
        merges = report.merges_copied,
        widths = report.widths_copied,
        "source copied"
    );
    Ok(report)
}

/// Synchronises the sheets of the workbook at `path` and saves it in place.
///
/// Nothing is written when the source sheet is missing.
#[instrument(level = "info", skip_all, fields(workbook = %path.display()))]
pub fn update_workbook(path: &Path, pair: &SheetPair) -> Result<CopyReport> {
    ensure_exists(path)?;
    let mut workbook = excel_read::read_workbook(path)?;
    let report = synchronize(&mut workbook, pair)?;
    excel_write::write_workbook(path, &workbook)?;
    info!(rows = report.rows, columns = report.columns, "workbook updated");
    Ok(report)
}

/// Synchronises the workbook at `path` when its source sheet exists, then
/// exports the source and destination sheets to `<sheet>.csv` files inside
/// `export_dir`.
///
/// A missing source sheet skips the update; whichever of the two sheets exist
/// are still exported. After an update the saved file is read again so the
/// export holds stored values.
#[instrument(
    level = "info",
    skip_all,
    fields(workbook = %path.display(), export_dir = %export_dir.display())
)]
pub fn update_and_export(
    path: &Path,
    export_dir: &Path,
    pair: &SheetPair,
) -> Result<ExportSummary> {
    ensure_exists(path)?;
    let mut workbook = excel_read::read_workbook(path)?;

    let update = match synchronize(&mut workbook, pair) {
        Ok(report) => {
            excel_write::write_workbook(path, &workbook)?;
            info!(rows = report.rows, columns = report.columns, "workbook updated");
            workbook = excel_read::read_workbook(path)?;
            Some(report)
        }
        Err(SyncError::MissingSheet(sheet)) => {
            warn!(%sheet, "source sheet not found; skipping update");
            None
        }
        Err(error) => return Err(error),
    };

    fs::create_dir_all(export_dir)?;

    let mut files = Vec::new();
    for name in [&pair.source, &pair.destination] {
        let Some(sheet) = workbook.sheet(name) else {
            warn!(sheet = %name, "sheet not found; nothing to export");
            continue;
        };
        let output = export_dir.join(format!("{name}.csv"));
        csv_export::export_sheet(sheet, &output)?;
        info!(sheet = %name, output = %output.display(), rows = sheet.max_row(), "sheet exported");
        files.push(output);
    }

    Ok(ExportSummary { update, files })
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SyncError::MissingInput(path.to_path_buf()));
    }
    Ok(())
}
