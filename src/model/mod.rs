use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::error::{Result, SyncError};

/// Largest row index accepted by the xlsx container.
pub const MAX_ROW: u32 = 1_048_576;
/// Largest column index accepted by the xlsx container (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;
/// Widest column width, in character units, a spreadsheet application accepts.
pub const MAX_COLUMN_WIDTH: f64 = 255.0;
/// Tallest row height, in points, a spreadsheet application accepts.
pub const MAX_ROW_HEIGHT: f64 = 409.0;

static EMPTY_VALUE: CellValue = CellValue::Empty;

/// Scalar value held by a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// No value. Absent cells read as `Empty`.
    #[default]
    Empty,
    /// Plain text.
    String(String),
    /// Any numeric value; integers are stored as floats like the container does.
    Number(f64),
    /// Boolean literal.
    Bool(bool),
    /// Date-time value, already resolved from the serial number.
    DateTime(NaiveDateTime),
    /// Spreadsheet error literal such as `#N/A` or `#DIV/0!`.
    Error(String),
}

impl CellValue {
    /// Returns `true` when the value is [`CellValue::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// Renders the value as the text written to delimited exports. Empty values
/// render as an empty string.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::String(value) => f.write_str(value),
            CellValue::Number(value) => write!(f, "{value}"),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
            CellValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Error(value) => f.write_str(value),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// A cell's content: its value and, when the cell is computed, the formula
/// text whose last stored result is `value`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub formula: Option<String>,
}

impl Cell {
    /// Creates a literal cell.
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            formula: None,
        }
    }

    /// Creates a computed cell carrying `cached` as its stored result.
    pub fn with_formula(formula: impl Into<String>, cached: CellValue) -> Self {
        Self {
            value: cached,
            formula: Some(formula.into()),
        }
    }

    /// A blank cell has neither a value nor a formula and is not stored.
    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.formula.is_none()
    }
}

/// 1-based cell coordinate. Ordering is row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub column: u32,
}

impl CellRef {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

impl FromStr for CellRef {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SyncError::InvalidCellReference(s.to_string());
        let split = s
            .find(|ch: char| ch.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = s.split_at(split);
        let column = column_index(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 || row > MAX_ROW {
            return Err(invalid());
        }
        Ok(CellRef::new(row, column))
    }
}

/// Converts a 1-based column index into its letter form (`1` → `A`, `27` → `AA`).
pub fn column_letters(column: u32) -> String {
    let mut letters = Vec::new();
    let mut remaining = column;
    while remaining > 0 {
        let offset = ((remaining - 1) % 26) as u8;
        letters.push(b'A' + offset);
        remaining = (remaining - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Parses column letters into a 1-based index. Letters are case-insensitive;
/// anything beyond `XFD` is rejected.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut column: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        column = column * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    (column <= MAX_COLUMN).then_some(column)
}

/// Rectangular span of cells treated as one logical cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergedRange {
    pub first: CellRef,
    pub last: CellRef,
}

impl MergedRange {
    /// Builds a range from its top-left and bottom-right corners.
    pub fn new(first: CellRef, last: CellRef) -> Result<Self> {
        let inverted = first.row > last.row || first.column > last.column;
        if first.row == 0 || first.column == 0 || inverted {
            return Err(SyncError::InvalidMergeRange(format!("{first}:{last}")));
        }
        Ok(Self { first, last })
    }

    pub fn is_single_cell(&self) -> bool {
        self.first == self.last
    }

    pub fn overlaps(&self, other: &MergedRange) -> bool {
        self.first.row <= other.last.row
            && other.first.row <= self.last.row
            && self.first.column <= other.last.column
            && other.first.column <= self.last.column
    }
}

impl fmt::Display for MergedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}

impl FromStr for MergedRange {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let (first, last) = s
            .split_once(':')
            .ok_or_else(|| SyncError::InvalidMergeRange(s.to_string()))?;
        MergedRange::new(first.parse()?, last.parse()?)
    }
}

/// Whether a sheet tab is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    /// Hidden, but can be unhidden from the application.
    Hidden,
    /// Hidden and only reachable programmatically.
    VeryHidden,
}

/// Number format attached to a cell position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberFormat {
    /// One of the container's predefined formats, by index (`10` is `0.00%`).
    Builtin(u8),
    /// A format code stored in the workbook, such as `#,##0.000`.
    Custom(String),
}

/// Named formula or range reference stored at workbook level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    /// Sheet the name is local to; `None` for workbook-wide names.
    pub scope: Option<String>,
    /// Reference or formula text without the leading `=`.
    pub formula: String,
}

/// A named grid of cells with its merged ranges and layout.
///
/// Cells are stored sparsely: only cells holding a value or a formula are kept,
/// so the bounding extent always describes populated content anchored at `A1`.
/// Number formats, row heights and visibility are sheet state that travels with
/// the file but is neither cleared nor copied by a synchronisation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    name: String,
    visibility: Visibility,
    cells: BTreeMap<CellRef, Cell>,
    merged: Vec<MergedRange>,
    column_widths: BTreeMap<u32, f64>,
    row_heights: BTreeMap<u32, f64>,
    number_formats: BTreeMap<CellRef, NumberFormat>,
}

impl Sheet {
    /// Creates an empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    /// Largest populated row, or `0` when the sheet holds no cells.
    pub fn max_row(&self) -> u32 {
        self.cells.keys().map(|cell| cell.row).max().unwrap_or(0)
    }

    /// Largest populated column, or `0` when the sheet holds no cells.
    pub fn max_column(&self) -> u32 {
        self.cells.keys().map(|cell| cell.column).max().unwrap_or(0)
    }

    pub fn cell(&self, row: u32, column: u32) -> Option<&Cell> {
        self.cells.get(&CellRef::new(row, column))
    }

    /// Value at `(row, column)`; absent cells read as [`CellValue::Empty`].
    pub fn value(&self, row: u32, column: u32) -> &CellValue {
        self.cell(row, column)
            .map(|cell| &cell.value)
            .unwrap_or(&EMPTY_VALUE)
    }

    /// Replaces the cell at `(row, column)` with a literal value, dropping any
    /// formula it held.
    pub fn set_value(&mut self, row: u32, column: u32, value: impl Into<CellValue>) {
        self.set_cell(row, column, Cell::new(value));
    }

    /// Replaces the cell at `(row, column)`. Blank cells are removed.
    pub fn set_cell(&mut self, row: u32, column: u32, cell: Cell) {
        let position = CellRef::new(row, column);
        if cell.is_blank() {
            self.cells.remove(&position);
        } else {
            self.cells.insert(position, cell);
        }
    }

    /// Populated cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells.iter().map(|(position, cell)| (*position, cell))
    }

    pub fn merged_ranges(&self) -> &[MergedRange] {
        &self.merged
    }

    /// Registers a merged range. Single-cell ranges and ranges overlapping an
    /// existing merge are rejected.
    pub fn merge(&mut self, range: MergedRange) -> Result<()> {
        if range.is_single_cell() {
            return Err(SyncError::InvalidMergeRange(range.to_string()));
        }
        if let Some(existing) = self.merged.iter().find(|existing| existing.overlaps(&range)) {
            return Err(SyncError::MergeOverlap {
                range: range.to_string(),
                existing: existing.to_string(),
            });
        }
        self.merged.push(range);
        Ok(())
    }

    /// Removes a registered merged range.
    pub fn unmerge(&mut self, range: &MergedRange) -> Result<()> {
        let index = self
            .merged
            .iter()
            .position(|existing| existing == range)
            .ok_or_else(|| SyncError::MergeNotFound(range.to_string()))?;
        self.merged.remove(index);
        Ok(())
    }

    pub fn column_width(&self, column: u32) -> Option<f64> {
        self.column_widths.get(&column).copied()
    }

    /// Sets the display width of a 1-based column.
    pub fn set_column_width(&mut self, column: u32, width: f64) -> Result<()> {
        if column == 0
            || column > MAX_COLUMN
            || !width.is_finite()
            || !(0.0..=MAX_COLUMN_WIDTH).contains(&width)
        {
            return Err(SyncError::InvalidColumnWidth { column, width });
        }
        self.column_widths.insert(column, width);
        Ok(())
    }

    /// Columns with an explicit width, in column order.
    pub fn column_widths(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.column_widths.iter().map(|(column, width)| (*column, *width))
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    /// Sets the height of a 1-based row, in points.
    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<()> {
        if row == 0
            || row > MAX_ROW
            || !height.is_finite()
            || !(0.0..=MAX_ROW_HEIGHT).contains(&height)
        {
            return Err(SyncError::InvalidRowHeight { row, height });
        }
        self.row_heights.insert(row, height);
        Ok(())
    }

    /// Rows with an explicit height, in row order.
    pub fn row_heights(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.row_heights.iter().map(|(row, height)| (*row, *height))
    }

    pub fn number_format(&self, row: u32, column: u32) -> Option<&NumberFormat> {
        self.number_formats.get(&CellRef::new(row, column))
    }

    pub fn set_number_format(&mut self, position: CellRef, format: NumberFormat) {
        self.number_formats.insert(position, format);
    }

    /// Positions carrying a number format, in row-major order. A position may
    /// be formatted without holding a cell.
    pub fn number_formats(&self) -> impl Iterator<Item = (CellRef, &NumberFormat)> {
        self.number_formats.iter().map(|(position, format)| (*position, format))
    }
}

/// Ordered collection of named sheets loaded from, and saved to, one file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    defined_names: Vec<DefinedName>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn defined_names(&self) -> &[DefinedName] {
        &self.defined_names
    }

    pub fn add_defined_name(&mut self, name: DefinedName) {
        self.defined_names.push(name);
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.position(name).map(|index| &self.sheets[index])
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.position(name).map(|index| &mut self.sheets[index])
    }

    /// Appends an empty sheet. Names must be unique within the workbook.
    pub fn add_sheet(&mut self, name: &str) -> Result<&mut Sheet> {
        self.push_sheet(Sheet::new(name))
    }

    /// Appends a populated sheet. Names must be unique within the workbook.
    pub fn push_sheet(&mut self, sheet: Sheet) -> Result<&mut Sheet> {
        if self.contains(sheet.name()) {
            return Err(SyncError::DuplicateSheet(sheet.name().to_string()));
        }
        self.sheets.push(sheet);
        let index = self.sheets.len() - 1;
        Ok(&mut self.sheets[index])
    }

    /// Returns the named sheet, appending an empty one when it is absent.
    pub fn get_or_create_sheet(&mut self, name: &str) -> &mut Sheet {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[index]
    }

    /// Borrows two distinct sheets at once: the first shared, the second mutable.
    pub fn sheet_pair_mut(
        &mut self,
        source: &str,
        destination: &str,
    ) -> Result<(&Sheet, &mut Sheet)> {
        let source_index = self
            .position(source)
            .ok_or_else(|| SyncError::MissingSheet(source.to_string()))?;
        let destination_index = self
            .position(destination)
            .ok_or_else(|| SyncError::MissingSheet(destination.to_string()))?;

        if source_index == destination_index {
            return Err(SyncError::SameSheet(source.to_string()));
        }

        if source_index < destination_index {
            let (head, tail) = self.sheets.split_at_mut(destination_index);
            Ok((&head[source_index], &mut tail[0]))
        } else {
            let (head, tail) = self.sheets.split_at_mut(source_index);
            Ok((&tail[0], &mut head[destination_index]))
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|sheet| sheet.name() == name)
    }
}
