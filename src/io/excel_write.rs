use std::path::Path;

use rust_xlsxwriter::{Format, Formula, IntoExcelDateTime, Workbook as XlsxWorkbook, Worksheet};
use tracing::warn;

use crate::error::{Result, SyncError};
use crate::model::{CellRef, CellValue, DefinedName, NumberFormat, Sheet, Visibility, Workbook};

/// Number format applied to date-time cells so they read back as dates.
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Writes the workbook to `path`, replacing the whole file.
pub fn write_workbook(path: &Path, workbook: &Workbook) -> Result<()> {
    let mut writer = XlsxWorkbook::new();
    let mut active_chosen = false;

    for sheet in workbook.sheets() {
        let worksheet = writer.add_worksheet();
        worksheet.set_name(sheet.name())?;
        match sheet.visibility() {
            Visibility::Visible if !active_chosen => {
                // A hidden first tab must not be left as the active one.
                worksheet.set_active(true);
                active_chosen = true;
            }
            Visibility::Visible => {}
            Visibility::Hidden => {
                worksheet.set_hidden(true);
            }
            Visibility::VeryHidden => {
                worksheet.set_very_hidden(true);
            }
        }
        write_sheet(worksheet, sheet)?;
    }

    for name in workbook.defined_names() {
        let formula = format!("={}", name.formula);
        if let Err(error) = writer.define_name(qualified_name(name), &formula) {
            warn!(name = %name.name, %error, "defined name not kept");
        }
    }

    writer.save(path)?;
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<()> {
    // merge_range() blanks the whole span, so merges go first and the anchor
    // value is written over them below.
    let merge_format = Format::new();
    for range in sheet.merged_ranges() {
        let (first_row, first_column) = position(range.first)?;
        let (last_row, last_column) = position(range.last)?;
        worksheet.merge_range(first_row, first_column, last_row, last_column, "", &merge_format)?;
    }

    for (cell_ref, cell) in sheet.cells() {
        let (row, column) = position(cell_ref)?;
        let stored = sheet.number_format(cell_ref.row, cell_ref.column);
        let format = match (stored, &cell.value) {
            (Some(number_format), _) => cell_format(number_format),
            (None, CellValue::DateTime(_)) => Format::new().set_num_format(DATETIME_FORMAT),
            (None, _) => Format::new(),
        };

        if let Some(formula) = &cell.formula {
            let formula = Formula::new(formula).set_result(cached_result(&cell.value));
            worksheet.write_formula_with_format(row, column, formula, &format)?;
            continue;
        }

        match &cell.value {
            CellValue::Empty => {}
            CellValue::String(value) | CellValue::Error(value) => {
                worksheet.write_string_with_format(row, column, value, &format)?;
            }
            CellValue::Number(value) => {
                worksheet.write_number_with_format(row, column, *value, &format)?;
            }
            CellValue::Bool(value) => {
                worksheet.write_boolean_with_format(row, column, *value, &format)?;
            }
            CellValue::DateTime(value) => {
                worksheet.write_datetime_with_format(row, column, value, &format)?;
            }
        }
    }

    // Formatted positions without a value keep their format as blank cells.
    for (cell_ref, number_format) in sheet.number_formats() {
        if sheet.cell(cell_ref.row, cell_ref.column).is_some() {
            continue;
        }
        let (row, column) = position(cell_ref)?;
        worksheet.write_blank(row, column, &cell_format(number_format))?;
    }

    for (column, width) in sheet.column_widths() {
        let (_, column) = position(CellRef::new(1, column))?;
        worksheet.set_column_width(column, width)?;
    }

    for (row, height) in sheet.row_heights() {
        let (row, _) = position(CellRef::new(row, 1))?;
        worksheet.set_row_height(row, height)?;
    }

    Ok(())
}

/// Text stored as a formula's cached result. Without an explicit result the
/// writer caches `0`, so an unknown value is stored as an empty string, which
/// reads back as no value. Date-times are stored as serial numbers.
fn cached_result(value: &CellValue) -> String {
    match value {
        CellValue::DateTime(value) => value.to_excel_serial_date().to_string(),
        value => value.to_string(),
    }
}

fn cell_format(number_format: &NumberFormat) -> Format {
    match number_format {
        NumberFormat::Builtin(index) => Format::new().set_num_format_index(*index),
        NumberFormat::Custom(code) => Format::new().set_num_format(code),
    }
}

/// Sheet-local names are written as `'Sheet'!Name`.
fn qualified_name(name: &DefinedName) -> String {
    match &name.scope {
        Some(sheet) => format!("'{}'!{}", sheet.replace('\'', "''"), name.name),
        None => name.name.clone(),
    }
}

/// Converts a 1-based coordinate into the writer's 0-based row and column.
fn position(cell: CellRef) -> Result<(u32, u16)> {
    let invalid = || SyncError::InvalidCellReference(format!("R{}C{}", cell.row, cell.column));
    let row = cell.row.checked_sub(1).ok_or_else(invalid)?;
    let column = cell
        .column
        .checked_sub(1)
        .and_then(|column| u16::try_from(column).ok())
        .ok_or_else(invalid)?;
    Ok((row, column))
}
