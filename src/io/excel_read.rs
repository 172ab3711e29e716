use std::path::Path;

use calamine::{Data, Reader, SheetType, SheetVisible, Xlsx, open_workbook};
use tracing::{debug, warn};

use crate::error::Result;
use crate::io::layout::{self, SheetLayout};
use crate::model::{Cell, CellRef, CellValue, MergedRange, Sheet, Visibility, Workbook};

/// Loads every worksheet of the xlsx file at `path` into memory.
///
/// Values are the ones stored in the file, so computed cells carry their last
/// cached result next to the formula text. Chartsheets and other non-grid
/// sheets have no place in the model and are reported, then left out.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut reader: Xlsx<_> = open_workbook(path)?;
    let mut layout = layout::read_layout(path)?;

    let mut worksheets = Vec::new();
    for sheet in reader.sheets_metadata() {
        if sheet.typ == SheetType::WorkSheet {
            worksheets.push((sheet.name.clone(), sheet_visibility(sheet.visible)));
        } else {
            warn!(
                sheet = %sheet.name,
                kind = ?sheet.typ,
                "sheet is not a worksheet and will not be kept on save"
            );
        }
    }

    let mut workbook = Workbook::new();
    for (name, visibility) in worksheets {
        let mut sheet = read_sheet(&mut reader, &name)?;
        sheet.set_visibility(visibility);
        apply_layout(&mut sheet, layout.sheets.remove(&name).unwrap_or_default());
        workbook.push_sheet(sheet)?;
    }
    for name in layout.defined_names {
        workbook.add_defined_name(name);
    }

    debug!(sheet_count = workbook.sheets().len(), "workbook loaded");
    Ok(workbook)
}

fn sheet_visibility(visible: SheetVisible) -> Visibility {
    match visible {
        SheetVisible::Visible => Visibility::Visible,
        SheetVisible::Hidden => Visibility::Hidden,
        SheetVisible::VeryHidden => Visibility::VeryHidden,
    }
}

fn apply_layout(sheet: &mut Sheet, layout: SheetLayout) {
    for (column, width) in layout.column_widths {
        if let Err(error) = sheet.set_column_width(column, width) {
            debug!(sheet = sheet.name(), %error, "ignoring unusable column width");
        }
    }
    for (row, height) in layout.row_heights {
        if let Err(error) = sheet.set_row_height(row, height) {
            debug!(sheet = sheet.name(), %error, "ignoring unusable row height");
        }
    }
    for (position, format) in layout.number_formats {
        sheet.set_number_format(position, format);
    }
}

fn read_sheet<R: std::io::Read + std::io::Seek>(reader: &mut Xlsx<R>, name: &str) -> Result<Sheet> {
    let mut sheet = Sheet::new(name);

    let values = reader.worksheet_range(name)?;
    if let Some((first_row, first_column)) = values.start() {
        for (row, column, data) in values.used_cells() {
            sheet.set_value(
                first_row + row as u32 + 1,
                first_column + column as u32 + 1,
                cell_value(data),
            );
        }
    }

    let formulas = reader.worksheet_formula(name)?;
    if let Some((first_row, first_column)) = formulas.start() {
        for (row, column, formula) in formulas.used_cells() {
            if formula.is_empty() {
                continue;
            }
            let row = first_row + row as u32 + 1;
            let column = first_column + column as u32 + 1;
            let cached = sheet.value(row, column).clone();
            sheet.set_cell(row, column, Cell::with_formula(formula.clone(), cached));
        }
    }

    let merges = reader
        .worksheet_merge_cells(name)
        .transpose()?
        .unwrap_or_default();
    for dimensions in merges {
        let merged = MergedRange::new(
            CellRef::new(dimensions.start.0 + 1, dimensions.start.1 + 1),
            CellRef::new(dimensions.end.0 + 1, dimensions.end.1 + 1),
        )
        .and_then(|range| sheet.merge(range));
        if let Err(error) = merged {
            debug!(sheet = %name, %error, "ignoring unusable merged region");
        }
    }

    debug!(
        sheet = %name,
        max_row = sheet.max_row(),
        max_column = sheet.max_column(),
        merged = sheet.merged_ranges().len(),
        "sheet loaded"
    );
    Ok(sheet)
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(value) if value.is_empty() => CellValue::Empty,
        Data::String(value) => CellValue::String(value.clone()),
        Data::Float(value) => CellValue::Number(*value),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) if !value.is_duration() => CellValue::DateTime(datetime),
            _ => CellValue::Number(value.as_f64()),
        },
        Data::DateTimeIso(value) | Data::DurationIso(value) => CellValue::String(value.clone()),
        Data::Error(error) => CellValue::Error(error.to_string()),
    }
}
