use basketlist_sync::SyncError;
use basketlist_sync::model::{
    Cell, CellRef, CellValue, MAX_COLUMN, MAX_ROW, MergedRange, NumberFormat, Sheet, Visibility,
    Workbook,
};
use basketlist_sync::sync::{self, SheetPair};
use pretty_assertions::assert_eq;

fn source_sheet() -> Sheet {
    let mut sheet = Sheet::new("oilpricechart");
    sheet.set_value(1, 1, "OPEC");
    sheet.set_value(1, 2, "Arab Light");
    sheet.set_value(2, 1, 81.25);
    sheet.set_value(2, 2, true);
    sheet.set_value(3, 4, "Murban");
    sheet.merge("A1:B2".parse().unwrap()).unwrap();
    sheet.set_column_width(1, 18.5).unwrap();
    sheet.set_column_width(4, 0.0).unwrap();
    sheet
}

fn stale_destination() -> Sheet {
    let mut sheet = Sheet::new("Basketlist");
    sheet.set_value(1, 1, "old");
    sheet.set_value(12, 9, "far away");
    sheet.merge("C5:D6".parse().unwrap()).unwrap();
    sheet
}

fn grid(sheet: &Sheet, rows: u32, columns: u32) -> Vec<Vec<CellValue>> {
    (1..=rows)
        .map(|row| {
            (1..=columns)
                .map(|column| sheet.value(row, column).clone())
                .collect()
        })
        .collect()
}

#[test]
fn clear_empties_extent_and_drops_merges() {
    let mut destination = stale_destination();
    let report = sync::clear_sheet(&mut destination);

    assert_eq!(report.cells_cleared, 2);
    assert_eq!(report.merges_removed, 1);
    assert_eq!(report.unmerge_failures, 0);
    assert!(destination.merged_ranges().is_empty());
    for row in 1..=12 {
        for column in 1..=9 {
            assert_eq!(destination.value(row, column), &CellValue::Empty);
        }
    }
    assert_eq!((destination.max_row(), destination.max_column()), (0, 0));
}

#[test]
fn copy_reproduces_every_value_over_source_extent() {
    let source = source_sheet();
    let mut destination = stale_destination();

    sync::clear_sheet(&mut destination);
    let report = sync::copy_sheet(&source, &mut destination);

    assert_eq!((report.rows, report.columns), (3, 4));
    assert_eq!(grid(&destination, 3, 4), grid(&source, 3, 4));
    assert_eq!(destination.value(12, 9), &CellValue::Empty);
    assert_eq!(destination.value(3, 1), &CellValue::Empty);
}

#[test]
fn merged_range_is_removed_by_clear_and_recreated_by_copy() {
    let source = source_sheet();
    let merged: MergedRange = "A1:B2".parse().unwrap();
    let mut destination = Sheet::new("Basketlist");
    destination.merge(merged).unwrap();

    sync::clear_sheet(&mut destination);
    assert!(!destination.merged_ranges().contains(&merged));

    let report = sync::copy_sheet(&source, &mut destination);
    assert_eq!(report.merges_copied, 1);
    assert_eq!(destination.merged_ranges(), &[merged]);
}

#[test]
fn copy_replicates_positive_widths_only() {
    let source = source_sheet();
    let mut destination = Sheet::new("Basketlist");

    let report = sync::copy_sheet(&source, &mut destination);

    assert_eq!(report.widths_copied, 1);
    assert_eq!(report.widths_skipped, 1);
    assert_eq!(destination.column_width(1), Some(18.5));
    assert_eq!(destination.column_width(4), None);
}

#[test]
fn conflicting_merge_is_skipped_without_blocking_the_rest() {
    let mut source = source_sheet();
    source.merge("E1:F1".parse().unwrap()).unwrap();

    // Not cleared: the existing merge collides with the source's A1:B2.
    let mut destination = Sheet::new("Basketlist");
    destination.merge("B2:C3".parse().unwrap()).unwrap();

    let report = sync::copy_sheet(&source, &mut destination);

    assert_eq!(report.merges_copied, 1);
    assert_eq!(report.merges_skipped, 1);
    assert!(
        destination
            .merged_ranges()
            .contains(&"E1:F1".parse().unwrap())
    );
    assert_eq!(destination.value(1, 1), &CellValue::from("OPEC"));
}

#[test]
fn far_corner_value_is_cleared_and_copied_cell_by_cell() {
    let mut source = Sheet::new("oilpricechart");
    source.set_value(1, 1, "OPEC");
    source.set_value(MAX_ROW, MAX_COLUMN, "corner");
    let mut destination = Sheet::new("Basketlist");
    destination.set_value(MAX_ROW, 1, "stale");
    destination.set_value(2, 2, "stale");

    let cleared = sync::clear_sheet(&mut destination);
    let report = sync::copy_sheet(&source, &mut destination);

    assert_eq!(cleared.cells_cleared, 2);
    assert_eq!((report.rows, report.columns), (MAX_ROW, MAX_COLUMN));
    assert_eq!(destination.cells().count(), 2);
    assert_eq!(destination.value(MAX_ROW, MAX_COLUMN), &CellValue::from("corner"));
    assert_eq!(destination.value(MAX_ROW, 1), &CellValue::Empty);
}

#[test]
fn copy_blanks_uncleared_cells_inside_source_extent() {
    let source = source_sheet();
    let mut destination = Sheet::new("Basketlist");
    destination.set_value(3, 1, "inside");
    destination.set_value(4, 1, "outside");

    sync::copy_sheet(&source, &mut destination);

    assert_eq!(grid(&destination, 3, 4), grid(&source, 3, 4));
    assert_eq!(destination.value(4, 1), &CellValue::from("outside"));
}

#[test]
fn number_formats_heights_and_visibility_are_neither_cleared_nor_copied() {
    let mut source = source_sheet();
    source.set_number_format(CellRef::new(2, 1), NumberFormat::Builtin(10));
    source.set_row_height(1, 24.0).unwrap();
    let mut destination = stale_destination();
    destination.set_visibility(Visibility::Hidden);
    destination.set_number_format(CellRef::new(5, 5), NumberFormat::Custom("0.000".to_string()));
    destination.set_row_height(2, 40.0).unwrap();

    sync::clear_sheet(&mut destination);
    sync::copy_sheet(&source, &mut destination);

    assert_eq!(destination.visibility(), Visibility::Hidden);
    assert_eq!(destination.number_format(2, 1), None);
    assert_eq!(
        destination.number_format(5, 5),
        Some(&NumberFormat::Custom("0.000".to_string()))
    );
    assert_eq!(destination.row_height(1), None);
    assert_eq!(destination.row_height(2), Some(40.0));
}

#[test]
fn formulas_travel_with_their_cells() {
    let mut source = Sheet::new("oilpricechart");
    source.set_value(1, 1, 2.0);
    source.set_cell(1, 2, Cell::with_formula("A1*2", CellValue::Number(4.0)));
    let mut destination = Sheet::new("Basketlist");

    sync::copy_sheet(&source, &mut destination);

    let cell = destination.cell(1, 2).unwrap();
    assert_eq!(cell.formula.as_deref(), Some("A1*2"));
    assert_eq!(cell.value, CellValue::Number(4.0));
}

#[test]
fn synchronize_creates_missing_destination() {
    let mut workbook = Workbook::new();
    workbook.push_sheet(source_sheet()).unwrap();

    let report = sync::synchronize(&mut workbook, &SheetPair::default()).unwrap();

    assert_eq!(workbook.sheet_names(), vec!["oilpricechart", "Basketlist"]);
    let destination = workbook.sheet("Basketlist").unwrap();
    assert_eq!((report.rows, report.columns), (3, 4));
    assert_eq!(destination.value(3, 4), &CellValue::from("Murban"));
}

#[test]
fn synchronize_replaces_stale_destination() {
    let mut workbook = Workbook::new();
    workbook.push_sheet(stale_destination()).unwrap();
    workbook.push_sheet(source_sheet()).unwrap();

    sync::synchronize(&mut workbook, &SheetPair::default()).unwrap();

    let source = workbook.sheet("oilpricechart").unwrap().clone();
    let destination = workbook.sheet("Basketlist").unwrap();
    assert_eq!(grid(destination, 12, 9), grid(&source, 12, 9));
    assert_eq!(destination.merged_ranges(), source.merged_ranges());
}

#[test]
fn synchronize_without_source_leaves_workbook_untouched() {
    let mut workbook = Workbook::new();
    workbook.push_sheet(stale_destination()).unwrap();
    let before = workbook.clone();

    let error = sync::synchronize(&mut workbook, &SheetPair::default()).unwrap_err();

    assert!(matches!(error, SyncError::MissingSheet(ref name) if name == "oilpricechart"));
    assert_eq!(workbook, before);
}

#[test]
fn synchronize_rejects_identical_sheet_names() {
    let mut workbook = Workbook::new();
    workbook.push_sheet(source_sheet()).unwrap();

    let pair = SheetPair::new("oilpricechart", "oilpricechart");
    let error = sync::synchronize(&mut workbook, &pair).unwrap_err();

    assert!(matches!(error, SyncError::SameSheet(_)));
}
