//! Layout reader for xlsx containers.
//!
//! calamine exposes cell values and merged regions but not the presentation
//! state around them, so column widths, row heights, cell number formats and
//! defined names are read straight from the container. Each sheet name is
//! resolved to its part through `xl/workbook.xml` and the workbook
//! relationships, then the part's `<cols>`, `<row>` and `<c>` elements are
//! parsed against the `cellXfs` table of `xl/styles.xml`.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::Result;
use crate::model::{CellRef, DefinedName, MAX_COLUMN, NumberFormat};

/// Width of the widest digit in the default font, in pixels.
const MAX_DIGIT_WIDTH: f64 = 7.0;
/// Cell padding the container adds to every stored column width, in pixels.
const COLUMN_PADDING: f64 = 5.0;
/// First identifier available to workbook-defined number formats.
const FIRST_CUSTOM_FORMAT: u16 = 164;
/// Prefix of names the writer manages itself (print areas, filter ranges).
const RESERVED_NAME_PREFIX: &str = "_xlnm.";

/// Presentation state of one worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    /// Explicit widths keyed by 1-based column, in character units.
    pub column_widths: BTreeMap<u32, f64>,
    /// Explicit heights keyed by 1-based row, in points.
    pub row_heights: BTreeMap<u32, f64>,
    /// Number formats other than `General`, keyed by cell position.
    pub number_formats: BTreeMap<CellRef, NumberFormat>,
}

/// Presentation state of a whole workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookLayout {
    pub sheets: HashMap<String, SheetLayout>,
    pub defined_names: Vec<DefinedName>,
}

/// Reads the layout of every worksheet in the workbook at `path`.
pub fn read_layout(path: &Path) -> Result<WorkbookLayout> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?.unwrap_or_default();
    let rels_xml = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();
    let styles_xml = read_part(&mut archive, "xl/styles.xml")?.unwrap_or_default();
    let cell_formats = parse_cell_formats(&styles_xml)?;

    let mut layout = WorkbookLayout {
        defined_names: parse_defined_names(&workbook_xml)?,
        ..WorkbookLayout::default()
    };
    for (sheet_name, part) in resolve_sheet_parts(&workbook_xml, &rels_xml)? {
        let Some(xml) = read_part(&mut archive, &part)? else {
            continue;
        };
        layout
            .sheets
            .insert(sheet_name, parse_sheet_layout(&xml, &cell_formats)?);
    }
    Ok(layout)
}

/// Parses the `<col>`, `<row>` and `<c>` elements of a worksheet part.
///
/// Every `<col>` carrying a width counts as explicit, whether or not the
/// writer flagged it with `customWidth`. Rows count only with
/// `customHeight`. `cell_formats` maps a cell's `s` style index to its
/// number format.
pub fn parse_sheet_layout(
    xml: &str,
    cell_formats: &[Option<NumberFormat>],
) -> Result<SheetLayout> {
    let mut layout = SheetLayout::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"col" => {
                    let mut min_col: Option<u32> = None;
                    let mut max_col: Option<u32> = None;
                    let mut width: Option<f64> = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"min" => min_col = parse_attr(&attr.value),
                            b"max" => max_col = parse_attr(&attr.value),
                            b"width" => width = parse_attr(&attr.value),
                            _ => {}
                        }
                    }

                    if let (Some(min), Some(max), Some(stored)) = (min_col, max_col, width) {
                        let width = character_width(stored);
                        for column in min.max(1)..=max.min(MAX_COLUMN) {
                            layout.column_widths.insert(column, width);
                        }
                    }
                }
                b"row" => {
                    let mut row: Option<u32> = None;
                    let mut height: Option<f64> = None;
                    let mut custom_height = false;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => row = parse_attr(&attr.value),
                            b"ht" => height = parse_attr(&attr.value),
                            b"customHeight" => custom_height = is_true(&attr.value),
                            _ => {}
                        }
                    }

                    if custom_height {
                        if let (Some(row), Some(height)) = (row, height) {
                            layout.row_heights.insert(row, height);
                        }
                    }
                }
                b"c" => {
                    let mut position: Option<CellRef> = None;
                    let mut style: Option<usize> = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => {
                                position = std::str::from_utf8(&attr.value)
                                    .ok()
                                    .and_then(|s| s.parse().ok());
                            }
                            b"s" => style = parse_attr(&attr.value),
                            _ => {}
                        }
                    }

                    let format = style
                        .and_then(|index| cell_formats.get(index))
                        .cloned()
                        .flatten();
                    if let (Some(position), Some(format)) = (position, format) {
                        layout.number_formats.insert(position, format);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(layout)
}

/// Resolves every `cellXfs` entry of a styles part to its number format;
/// `None` stands for `General`.
pub fn parse_cell_formats(xml: &str) -> Result<Vec<Option<NumberFormat>>> {
    let mut custom: HashMap<u16, String> = HashMap::new();
    let mut format_ids: Vec<u16> = Vec::new();
    let mut in_num_fmts = false;
    let mut in_cell_xfs = false;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().as_ref() == b"numFmts" => in_num_fmts = true,
            Event::End(ref e) if e.name().as_ref() == b"numFmts" => in_num_fmts = false,
            Event::Start(ref e) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(ref e) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(ref e) | Event::Empty(ref e)
                if in_num_fmts && e.name().as_ref() == b"numFmt" =>
            {
                let mut id: Option<u16> = None;
                let mut code: Option<String> = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"numFmtId" => id = parse_attr(&attr.value),
                        b"formatCode" => {
                            code = Some(unescape_xml(&String::from_utf8_lossy(&attr.value)));
                        }
                        _ => {}
                    }
                }
                if let (Some(id), Some(code)) = (id, code) {
                    custom.insert(id, code);
                }
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if in_cell_xfs && e.name().as_ref() == b"xf" =>
            {
                let id = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref() == b"numFmtId")
                    .and_then(|attr| parse_attr(&attr.value))
                    .unwrap_or(0);
                format_ids.push(id);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(format_ids
        .into_iter()
        .map(|id| match custom.get(&id) {
            Some(code) => Some(NumberFormat::Custom(code.clone())),
            None if id == 0 => None,
            None if id < FIRST_CUSTOM_FORMAT => u8::try_from(id).ok().map(NumberFormat::Builtin),
            None => {
                debug!(id, "number format missing from styles part");
                None
            }
        })
        .collect())
}

/// Parses the `<definedName>` entries of `xl/workbook.xml`. Names the writer
/// manages itself are left out.
pub fn parse_defined_names(workbook_xml: &str) -> Result<Vec<DefinedName>> {
    let sheet_names: Vec<String> = sheet_entries(workbook_xml)?
        .into_iter()
        .map(|(name, _)| name)
        .collect();

    let mut names = Vec::new();
    let mut reader = Reader::from_str(workbook_xml);
    let mut buf = Vec::new();
    let mut current: Option<(String, Option<String>)> = None;
    let mut formula = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().as_ref() == b"definedName" => {
                let mut name = None;
                let mut scope = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = Some(unescape_xml(&String::from_utf8_lossy(&attr.value))),
                        b"localSheetId" => {
                            scope = parse_attr::<usize>(&attr.value)
                                .and_then(|index| sheet_names.get(index).cloned());
                        }
                        _ => {}
                    }
                }
                formula.clear();
                current = name.map(|name| (name, scope));
            }
            Event::Text(ref t) if current.is_some() => {
                formula.push_str(&String::from_utf8_lossy(t));
            }
            Event::GeneralRef(ref r) if current.is_some() => match r.resolve_char_ref()? {
                Some(ch) => formula.push(ch),
                None => {
                    let entity = format!("&{};", String::from_utf8_lossy(r));
                    formula.push_str(&unescape_xml(&entity));
                }
            },
            Event::End(ref e) if e.name().as_ref() == b"definedName" => {
                if let Some((name, scope)) = current.take() {
                    if name.starts_with(RESERVED_NAME_PREFIX) {
                        debug!(%name, "skipping reserved defined name");
                    } else {
                        names.push(DefinedName {
                            name,
                            scope,
                            formula: formula.trim().trim_start_matches('=').to_string(),
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(names)
}

/// Converts a stored width (which includes the font padding) back into the
/// character width that was requested when the column was sized.
pub fn character_width(stored: f64) -> f64 {
    if stored <= 0.0 {
        return 0.0;
    }
    let pixels = (stored * MAX_DIGIT_WIDTH).round();
    let width = if pixels < MAX_DIGIT_WIDTH + COLUMN_PADDING {
        pixels / (MAX_DIGIT_WIDTH + COLUMN_PADDING)
    } else {
        (pixels - COLUMN_PADDING) / MAX_DIGIT_WIDTH
    };
    (width * 100.0).round() / 100.0
}

fn parse_attr<T: std::str::FromStr>(value: &[u8]) -> Option<T> {
    std::str::from_utf8(value).ok().and_then(|s| s.parse().ok())
}

fn is_true(value: &[u8]) -> bool {
    value == b"1" || value == b"true"
}

/// Unescapes the predefined XML entities; `&amp;` goes last so escaped
/// entities stay literal.
fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(error) => return Err(error.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

/// Name and relationship id of every `<sheet>` in `xl/workbook.xml`, in tab
/// order. Chartsheets are included.
fn sheet_entries(workbook_xml: &str) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rid = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = Some(unescape_xml(&String::from_utf8_lossy(&attr.value))),
                        b"r:id" => rid = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                        _ => {}
                    }
                }
                if let (Some(name), Some(rid)) = (name, rid) {
                    entries.push((name, rid));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

/// Maps each sheet name to the path of its part inside the archive.
fn resolve_sheet_parts(workbook_xml: &str, rels_xml: &str) -> Result<Vec<(String, String)>> {
    let name_to_rid = sheet_entries(workbook_xml)?;

    let mut rid_to_target: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                        b"Target" => {
                            target = Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    rid_to_target.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(name_to_rid
        .into_iter()
        .filter_map(|(name, rid)| {
            let target = rid_to_target.get(&rid)?;
            let part = match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{target}"),
            };
            Some((name, part))
        })
        .collect())
}
