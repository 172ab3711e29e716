#![allow(dead_code)]

use std::path::Path;

use rust_xlsxwriter::{Format, Formula, Workbook};

/// CSV text both sheets export to once `Basketlist` mirrors the fixture's
/// `oilpricechart` sheet.
pub const EXPECTED_CSV: &str = "\u{feff}OPEC Basket,,\r\n\
Date,Price,Note\r\n\
2024-01-15,79.37,\r\n\
2024-01-16,80.12,\"Basrah, Medium\"\r\n";

/// Writes a workbook holding a populated `oilpricechart` sheet (unless
/// `with_source` is false) and a `Basketlist` sheet full of stale content.
pub fn write_fixture(path: &Path, with_source: bool) {
    let mut workbook = Workbook::new();
    let plain = Format::new();

    if with_source {
        let sheet = workbook.add_worksheet();
        sheet.set_name("oilpricechart").expect("source sheet named");
        sheet
            .merge_range(0, 0, 0, 1, "OPEC Basket", &plain)
            .expect("title merged");
        sheet.write_string(1, 0, "Date").expect("header written");
        sheet.write_string(1, 1, "Price").expect("header written");
        sheet.write_string(1, 2, "Note").expect("header written");
        sheet.write_string(2, 0, "2024-01-15").expect("row written");
        sheet.write_number(2, 1, 79.37).expect("row written");
        sheet.write_string(3, 0, "2024-01-16").expect("row written");
        sheet.write_number(3, 1, 80.12).expect("row written");
        sheet.write_string(3, 2, "Basrah, Medium").expect("row written");
        sheet.set_column_width(0, 14.0).expect("width set");
        sheet.set_column_width(2, 30.0).expect("width set");
    }

    let basket = workbook.add_worksheet();
    basket.set_name("Basketlist").expect("destination sheet named");
    basket.write_string(0, 0, "stale").expect("stale value written");
    basket.write_string(9, 5, "stale corner").expect("stale value written");
    basket
        .merge_range(5, 0, 6, 2, "stale merge", &plain)
        .expect("stale merge written");

    workbook.save(path).expect("fixture saved");
}

/// CSV text both sheets export to once `Basketlist` mirrors the formula
/// fixture. The uncached formula exports as an empty field.
pub const FORMULA_CSV: &str = "\u{feff}Price,Double\r\n\
79.5,159\r\n\
80,\r\n";

/// Writes a workbook whose `oilpricechart` sheet holds one formula with a
/// cached result (`B2`) and one without (`B3`), as files saved by writers
/// that do not evaluate formulas carry them.
pub fn write_formula_fixture(path: &Path) {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("oilpricechart").expect("source sheet named");
    sheet.write_string(0, 0, "Price").expect("header written");
    sheet.write_string(0, 1, "Double").expect("header written");
    sheet.write_number(1, 0, 79.5).expect("row written");
    sheet
        .write_formula(1, 1, Formula::new("=A2*2").set_result("159"))
        .expect("cached formula written");
    sheet.write_number(2, 0, 80.0).expect("row written");
    sheet
        .write_formula(2, 1, Formula::new("=A3*2").set_result(""))
        .expect("uncached formula written");

    workbook
        .add_worksheet()
        .set_name("Basketlist")
        .expect("destination sheet named");

    workbook.save(path).expect("fixture saved");
}

/// Writes a workbook carrying state outside the synchronised values: a
/// percentage-formatted cell and a tall first row on `oilpricechart`, a
/// workbook-level defined name, a hidden `lookup` sheet and a very hidden
/// `internal` sheet.
pub fn write_layout_fixture(path: &Path) {
    let mut workbook = Workbook::new();
    let percent = Format::new().set_num_format("0.00%");

    let sheet = workbook.add_worksheet();
    sheet.set_name("oilpricechart").expect("source sheet named");
    sheet.write_string(0, 0, "Change").expect("header written");
    sheet
        .write_number_with_format(1, 0, 0.0525, &percent)
        .expect("percentage written");
    sheet.set_row_height(0, 30).expect("row height set");

    workbook
        .add_worksheet()
        .set_name("Basketlist")
        .expect("destination sheet named");

    let lookup = workbook.add_worksheet();
    lookup.set_name("lookup").expect("lookup sheet named");
    lookup.write_string(0, 0, "Brent").expect("lookup value written");
    lookup.set_hidden(true);

    let internal = workbook.add_worksheet();
    internal.set_name("internal").expect("internal sheet named");
    internal.set_very_hidden(true);

    workbook
        .define_name("Change", "=oilpricechart!$A$2")
        .expect("name defined");

    workbook.save(path).expect("fixture saved");
}
