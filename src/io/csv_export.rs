use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::Result;
use crate::model::Sheet;

/// Byte-order mark spreadsheet readers use to detect UTF-8 input.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Serialises the sheet's values to a CSV file at `path`, replacing it.
pub fn export_sheet(sheet: &Sheet, path: &Path) -> Result<()> {
    let mut output = BufWriter::new(File::create(path)?);
    write_sheet(sheet, &mut output)?;
    output.flush()?;
    Ok(())
}

/// Writes one record per row of the sheet's bounding extent, each holding one
/// field per column. Empty cells become empty fields and fields are only quoted
/// when they contain a delimiter, a quote, or a line break.
pub fn write_sheet<W: Write>(sheet: &Sheet, mut output: W) -> Result<()> {
    output.write_all(UTF8_BOM)?;

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(output);

    let max_column = sheet.max_column();
    for row in 1..=sheet.max_row() {
        let record: Vec<String> = (1..=max_column)
            .map(|column| sheet.value(row, column).to_string())
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
