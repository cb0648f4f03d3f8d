//! Schema source extraction.
//!
//! Turns a [`SchemaSource`] (plain text, delimited table, or spreadsheet)
//! into one canonical text blob for chunking. Plain text passes through
//! unchanged. Tables are serialized column by column:
//!
//! ```text
//! - Table/Sheet Name: 'id'
//!   Columns:
//!     - 1
//!     - 2
//!
//! - Table/Sheet Name: 'name'
//!   Columns:
//!     - Alice
//!     - Bob
//!
//! ```
//!
//! Columns appear in file order and values in row order; null cells are
//! skipped. Spreadsheets are read with `zip` + `quick-xml` directly from the
//! OOXML package: the first worksheet is the table and its first row is the
//! header.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use athena_rag_core::{RagError, Result};
use quick_xml::events::{BytesStart, Event};

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_TSV: &str = "text/tab-separated-values";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Maximum non-empty cells accepted from one worksheet.
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Excel grid limits: columns `A..=XFD`, rows `1..=1048576`.
const XLSX_MAX_COLUMNS: usize = 16_384;
const XLSX_MAX_ROWS: usize = 1_048_576;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";

/// Cell texts read as null in delimited tables, the same set pandas uses.
const NA_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A schema document tagged by how it must be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    PlainText(Vec<u8>),
    DelimitedTable { bytes: Vec<u8>, delimiter: u8 },
    Spreadsheet(Vec<u8>),
}

impl SchemaSource {
    /// Select the extractor for a declared media type.
    ///
    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn from_media_type(media_type: &str, bytes: Vec<u8>) -> Result<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            MIME_TEXT | "application/sql" => Ok(SchemaSource::PlainText(bytes)),
            MIME_CSV | "application/csv" => Ok(SchemaSource::DelimitedTable {
                bytes,
                delimiter: b',',
            }),
            MIME_TSV => Ok(SchemaSource::DelimitedTable {
                bytes,
                delimiter: b'\t',
            }),
            MIME_XLSX => Ok(SchemaSource::Spreadsheet(bytes)),
            _ => Err(RagError::UnsupportedFormat(media_type.to_string())),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaSource::PlainText(_) => "plain-text",
            SchemaSource::DelimitedTable { .. } => "delimited-table",
            SchemaSource::Spreadsheet(_) => "spreadsheet",
        }
    }
}

/// An uploaded schema file: name, declared media type, and raw bytes.
#[derive(Debug, Clone)]
pub struct SchemaFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SchemaFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring the media type from its extension.
    ///
    /// Fails with [`RagError::UnsupportedFormat`] for unknown extensions.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let media_type = media_type_for_path(path)
            .ok_or_else(|| RagError::UnsupportedFormat(path.display().to_string()))?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, media_type, bytes))
    }

    pub fn to_source(&self) -> Result<SchemaSource> {
        SchemaSource::from_media_type(&self.media_type, self.bytes.clone())
    }
}

/// Media type for a file name, by extension.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" | "sql" | "ddl" | "md" => Some(MIME_TEXT),
        "csv" => Some(MIME_CSV),
        "tsv" => Some(MIME_TSV),
        "xlsx" => Some(MIME_XLSX),
        _ => None,
    }
}

/// Produce the canonical text for a schema source.
pub fn extract(source: &SchemaSource) -> Result<String> {
    match source {
        SchemaSource::PlainText(bytes) => String::from_utf8(bytes.clone())
            .map_err(|e| RagError::Decoding(format!("schema text is not valid UTF-8: {e}"))),
        SchemaSource::DelimitedTable { bytes, delimiter } => {
            Ok(render_table(&read_delimited(bytes, *delimiter)?))
        }
        SchemaSource::Spreadsheet(bytes) => Ok(render_table(&read_spreadsheet(bytes)?)),
    }
}

/// Columns in file order, each holding its non-null values in row order.
#[derive(Debug, Default)]
struct Table {
    columns: Vec<Column>,
}

#[derive(Debug)]
struct Column {
    name: String,
    values: Vec<String>,
}

impl Column {
    fn new(name: String) -> Self {
        Self {
            name,
            values: Vec::new(),
        }
    }
}

fn render_table(table: &Table) -> String {
    let mut out = String::new();
    for column in &table.columns {
        out.push_str(&format!("- Table/Sheet Name: '{}'\n", single_line(&column.name)));
        out.push_str("  Columns:\n");
        for value in &column.values {
            out.push_str(&format!("    - {}\n", single_line(value)));
        }
        out.push('\n');
    }
    out
}

/// Keep one value per line so the chunker never splits a cell.
fn single_line(s: &str) -> String {
    if s.contains(['\n', '\r']) {
        s.split(['\n', '\r'])
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        s.to_string()
    }
}

fn unnamed(index: usize) -> String {
    format!("Unnamed: {index}")
}

// ============ Delimited tables ============

fn read_delimited(bytes: &[u8], delimiter: u8) -> Result<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| RagError::Decoding(format!("failed to read table header: {e}")))?
        .clone();
    let mut columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if h.trim().is_empty() {
                Column::new(unnamed(i))
            } else {
                Column::new(h.to_string())
            }
        })
        .collect();

    for record in reader.records() {
        let record =
            record.map_err(|e| RagError::Decoding(format!("failed to read table row: {e}")))?;
        // Cells past the header width have no column and are dropped.
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            if !NA_VALUES.contains(&cell) {
                column.values.push(cell.to_string());
            }
        }
    }

    Ok(Table { columns })
}

// ============ Spreadsheets (OOXML) ============

fn ooxml_error(e: impl std::fmt::Display) -> RagError {
    RagError::Decoding(format!("spreadsheet extraction failed: {e}"))
}

fn read_spreadsheet(bytes: &[u8]) -> Result<Table> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_error)?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet = first_worksheet_name(&archive)
        .ok_or_else(|| ooxml_error("workbook has no worksheets"))?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, &sheet, MAX_XML_ENTRY_BYTES)?;
    let cells = read_sheet_cells(&sheet_xml, &shared_strings)?;
    Ok(table_from_cells(cells))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>> {
    let entry = archive.by_name(name).map_err(ooxml_error)?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(ooxml_error)?;
    if out.len() as u64 >= max_bytes {
        return Err(ooxml_error(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Lowest-numbered `xl/worksheets/sheetN.xml`.
fn first_worksheet_name(archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>) -> Option<String> {
    archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches("xl/worksheets/sheet")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(|s| s.to_string())
}

/// Shared string table; rich-text runs inside one `<si>` are concatenated.
fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>> {
    if !archive.file_names().any(|n| n == SHARED_STRINGS) {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, SHARED_STRINGS, MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" if current.is_some() && !in_phonetic => in_t = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_t => {
                let text = te.unescape().map_err(ooxml_error)?;
                if let Some(s) = current.as_mut() {
                    s.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    FormulaString,
    Boolean,
    Error,
}

impl CellKind {
    fn from_attr(t: Option<&str>) -> Self {
        match t {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            Some("str") => CellKind::FormulaString,
            Some("b") => CellKind::Boolean,
            Some("e") => CellKind::Error,
            _ => CellKind::Number,
        }
    }
}

struct PendingCell {
    row: usize,
    col: usize,
    kind: CellKind,
    raw: String,
}

impl PendingCell {
    fn resolve(self, shared_strings: &[String]) -> Option<String> {
        if self.raw.is_empty() {
            return None;
        }
        let value = match self.kind {
            CellKind::SharedString => self
                .raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i).cloned()),
            CellKind::Boolean => Some(if self.raw.trim() == "1" {
                "True".to_string()
            } else {
                "False".to_string()
            }),
            CellKind::Error => None,
            CellKind::Number | CellKind::InlineString | CellKind::FormulaString => Some(self.raw),
        };
        value.filter(|v| !v.is_empty())
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// `"B3"` → `(col 1, row 2)`, zero-based.
fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        col = col.checked_mul(26)?.checked_add(digit)?;
        if col > XLSX_MAX_COLUMNS {
            return None;
        }
    }
    let row: usize = digits.parse().ok()?;
    if row == 0 || row > XLSX_MAX_ROWS {
        return None;
    }
    Some((col - 1, row - 1))
}

/// Rejects positions reached by counting cells without an `r` reference.
fn check_in_grid(row: usize, col: usize) -> Result<()> {
    if row >= XLSX_MAX_ROWS || col >= XLSX_MAX_COLUMNS {
        return Err(ooxml_error(format!(
            "cell at row {} column {} is outside the worksheet grid",
            row + 1,
            col + 1
        )));
    }
    Ok(())
}

/// Non-null cells keyed by `(row, col)`.
fn read_sheet_cells(
    xml: &[u8],
    shared_strings: &[String],
) -> Result<BTreeMap<(usize, usize), String>> {
    let mut cells = BTreeMap::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut next_row = 0usize;
    let mut current_row = 0usize;
    let mut next_col = 0usize;
    let mut pending: Option<PendingCell> = None;
    let mut capture = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = attr_value(&e, b"r")
                        .and_then(|r| r.parse::<usize>().ok())
                        .filter(|r| (1..=XLSX_MAX_ROWS).contains(r))
                        .map(|r| r - 1)
                        .unwrap_or(next_row);
                    check_in_grid(current_row, 0)?;
                    next_row = current_row + 1;
                    next_col = 0;
                }
                b"c" => {
                    let (col, row) = attr_value(&e, b"r")
                        .and_then(|r| parse_cell_ref(&r))
                        .unwrap_or((next_col, current_row));
                    check_in_grid(row, col)?;
                    next_col = col + 1;
                    let kind = CellKind::from_attr(attr_value(&e, b"t").as_deref());
                    pending = Some(PendingCell {
                        row,
                        col,
                        kind,
                        raw: String::new(),
                    });
                }
                b"v" if pending.is_some() => capture = true,
                b"t" if pending
                    .as_ref()
                    .is_some_and(|p| p.kind == CellKind::InlineString) =>
                {
                    capture = true
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"c" {
                    let col = attr_value(&e, b"r")
                        .and_then(|r| parse_cell_ref(&r))
                        .map(|(c, _)| c)
                        .unwrap_or(next_col);
                    check_in_grid(current_row, col)?;
                    next_col = col + 1;
                }
            }
            Ok(Event::Text(te)) if capture => {
                let text = te.unescape().map_err(ooxml_error)?;
                if let Some(p) = pending.as_mut() {
                    p.raw.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    capture = false;
                    if let Some(p) = pending.take() {
                        let key = (p.row, p.col);
                        if let Some(value) = p.resolve(shared_strings) {
                            if cells.len() >= XLSX_MAX_CELLS_PER_SHEET && !cells.contains_key(&key) {
                                return Err(ooxml_error(format!(
                                    "worksheet has more than {XLSX_MAX_CELLS_PER_SHEET} non-empty cells"
                                )));
                            }
                            cells.insert(key, value);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

/// First populated row is the header; later rows are data.
///
/// Only columns holding a header or at least one value are emitted, so a
/// sparse sheet costs memory in proportion to its non-empty cells.
fn table_from_cells(cells: BTreeMap<(usize, usize), String>) -> Table {
    let Some(&(header_row, _)) = cells.keys().next() else {
        return Table::default();
    };

    // Row-major iteration: every header cell is seen before any value.
    let mut by_col: BTreeMap<usize, Column> = BTreeMap::new();
    for ((row, col), value) in cells {
        if row == header_row {
            by_col.insert(col, Column::new(value));
        } else {
            by_col
                .entry(col)
                .or_insert_with(|| Column::new(unnamed(col)))
                .values
                .push(value);
        }
    }

    Table {
        columns: by_col.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const WORKBOOK_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    fn xlsx(shared: Option<&[&str]>, sheet_rows: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let opts = zip::write::SimpleFileOptions::default();
            if let Some(strings) = shared {
                zip.start_file("xl/sharedStrings.xml", opts).unwrap();
                let items: String = strings
                    .iter()
                    .map(|s| format!("<si><t>{s}</t></si>"))
                    .collect();
                let xml = format!(
                    "<?xml version=\"1.0\"?><sst xmlns=\"{WORKBOOK_NS}\" count=\"{n}\" uniqueCount=\"{n}\">{items}</sst>",
                    n = strings.len()
                );
                zip.write_all(xml.as_bytes()).unwrap();
            }
            zip.start_file("xl/worksheets/sheet1.xml", opts).unwrap();
            let xml = format!(
                "<?xml version=\"1.0\"?><worksheet xmlns=\"{WORKBOOK_NS}\"><sheetData>{sheet_rows}</sheetData></worksheet>"
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    fn csv_source(text: &str) -> SchemaSource {
        SchemaSource::from_media_type(MIME_CSV, text.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_plain_text_unchanged() {
        let ddl = "CREATE TABLE customers(id INT, name VARCHAR(255));\n";
        let source = SchemaSource::from_media_type(MIME_TEXT, ddl.as_bytes().to_vec()).unwrap();
        assert_eq!(extract(&source).unwrap(), ddl);
    }

    #[test]
    fn test_plain_text_invalid_utf8() {
        let source = SchemaSource::PlainText(vec![0xff, 0xfe, 0x00]);
        assert!(matches!(extract(&source), Err(RagError::Decoding(_))));
    }

    #[test]
    fn test_unsupported_media_type() {
        let err = SchemaSource::from_media_type("application/pdf", b"%PDF".to_vec()).unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_media_type_parameters_ignored() {
        let source =
            SchemaSource::from_media_type("Text/CSV; charset=utf-8", b"a\n1\n".to_vec()).unwrap();
        assert_eq!(source.kind(), "delimited-table");
    }

    #[test]
    fn test_csv_column_blocks() {
        let text = extract(&csv_source("id,name\n1,Alice\n2,Bob\n")).unwrap();
        assert_eq!(
            text,
            "- Table/Sheet Name: 'id'\n  Columns:\n    - 1\n    - 2\n\n\
             - Table/Sheet Name: 'name'\n  Columns:\n    - Alice\n    - Bob\n\n"
        );
    }

    #[test]
    fn test_csv_nulls_skipped() {
        let text = extract(&csv_source("table,column\norders,\n,total\nNULL,NA\n")).unwrap();
        assert_eq!(
            text,
            "- Table/Sheet Name: 'table'\n  Columns:\n    - orders\n\n\
             - Table/Sheet Name: 'column'\n  Columns:\n    - total\n\n"
        );
    }

    #[test]
    fn test_csv_ragged_rows_and_unnamed_header() {
        let text = extract(&csv_source("a,\n1\n2,x\n")).unwrap();
        assert!(text.contains("- Table/Sheet Name: 'Unnamed: 1'\n  Columns:\n    - x\n"));
        assert!(text.contains("- Table/Sheet Name: 'a'\n  Columns:\n    - 1\n    - 2\n"));
    }

    #[test]
    fn test_csv_bom_and_multiline_cell() {
        let text = extract(&csv_source("\u{feff}note\n\"line one\nline two\"\n")).unwrap();
        assert_eq!(
            text,
            "- Table/Sheet Name: 'note'\n  Columns:\n    - line one line two\n\n"
        );
    }

    #[test]
    fn test_tsv() {
        let source =
            SchemaSource::from_media_type(MIME_TSV, b"col\tkind\nid\tINT\n".to_vec()).unwrap();
        let text = extract(&source).unwrap();
        assert!(text.contains("'kind'\n  Columns:\n    - INT\n"));
    }

    #[test]
    fn test_csv_invalid_utf8() {
        let source = SchemaSource::DelimitedTable {
            bytes: b"name\n\xff\xfe\n".to_vec(),
            delimiter: b',',
        };
        assert!(matches!(extract(&source), Err(RagError::Decoding(_))));
    }

    #[test]
    fn test_empty_csv_yields_empty_text() {
        assert_eq!(extract(&csv_source("")).unwrap(), "");
    }

    #[test]
    fn test_xlsx_shared_and_inline_strings() {
        let rows = "<row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c><c r=\"B1\" t=\"s\"><v>1</v></c></row>\
                    <row r=\"2\"><c r=\"A2\"><v>1</v></c><c r=\"B2\" t=\"inlineStr\"><is><t>Alice</t></is></c></row>\
                    <row r=\"3\"><c r=\"A3\"><v>2</v></c><c r=\"B3\" t=\"s\"><v>2</v></c></row>";
        let source = SchemaSource::Spreadsheet(xlsx(Some(&["id", "name", "Bob"]), rows));
        assert_eq!(
            extract(&source).unwrap(),
            "- Table/Sheet Name: 'id'\n  Columns:\n    - 1\n    - 2\n\n\
             - Table/Sheet Name: 'name'\n  Columns:\n    - Alice\n    - Bob\n\n"
        );
    }

    #[test]
    fn test_xlsx_sparse_cells_keep_alignment() {
        let rows = "<row r=\"1\"><c r=\"A1\" t=\"inlineStr\"><is><t>table</t></is></c>\
                    <c r=\"C1\" t=\"inlineStr\"><is><t>flag</t></is></c></row>\
                    <row r=\"2\"><c r=\"C2\" t=\"b\"><v>1</v></c></row>\
                    <row r=\"4\"><c r=\"A4\" t=\"inlineStr\"><is><t>orders</t></is></c><c r=\"B4\"/></row>";
        let source = SchemaSource::Spreadsheet(xlsx(None, rows));
        let text = extract(&source).unwrap();
        assert_eq!(
            text,
            "- Table/Sheet Name: 'table'\n  Columns:\n    - orders\n\n\
             - Table/Sheet Name: 'flag'\n  Columns:\n    - True\n\n"
        );
    }

    #[test]
    fn test_xlsx_value_without_header_is_unnamed() {
        let rows = "<row r=\"1\"><c r=\"A1\" t=\"inlineStr\"><is><t>id</t></is></c></row>\
                    <row r=\"2\"><c r=\"A2\"><v>7</v></c><c r=\"C2\" t=\"inlineStr\"><is><t>x</t></is></c></row>";
        let text = extract(&SchemaSource::Spreadsheet(xlsx(None, rows))).unwrap();
        assert_eq!(
            text,
            "- Table/Sheet Name: 'id'\n  Columns:\n    - 7\n\n\
             - Table/Sheet Name: 'Unnamed: 2'\n  Columns:\n    - x\n\n"
        );
    }

    #[test]
    fn test_xlsx_far_corner_cell_stays_sparse() {
        let rows = "<row r=\"1\"><c r=\"A1\" t=\"inlineStr\"><is><t>id</t></is></c></row>\
                    <row r=\"1048576\"><c r=\"XFD1048576\" t=\"inlineStr\"><is><t>far</t></is></c></row>";
        let text = extract(&SchemaSource::Spreadsheet(xlsx(None, rows))).unwrap();
        assert_eq!(
            text,
            "- Table/Sheet Name: 'id'\n  Columns:\n\n\
             - Table/Sheet Name: 'Unnamed: 16383'\n  Columns:\n    - far\n\n"
        );
    }

    #[test]
    fn test_xlsx_oversized_ref_falls_back_to_position() {
        let rows = "<row r=\"1\"><c r=\"AAAAAAAAAAAAAAAA1\" t=\"inlineStr\"><is><t>id</t></is></c>\
                    <c r=\"XFE1\" t=\"inlineStr\"><is><t>name</t></is></c></row>";
        let text = extract(&SchemaSource::Spreadsheet(xlsx(None, rows))).unwrap();
        assert_eq!(
            text,
            "- Table/Sheet Name: 'id'\n  Columns:\n\n\
             - Table/Sheet Name: 'name'\n  Columns:\n\n"
        );
    }

    #[test]
    fn test_xlsx_row_past_grid_rejected() {
        let rows = "<row r=\"1048576\"><c t=\"inlineStr\"><is><t>a</t></is></c></row>\
                    <row><c t=\"inlineStr\"><is><t>b</t></is></c></row>";
        let err = extract(&SchemaSource::Spreadsheet(xlsx(None, rows))).unwrap_err();
        assert!(matches!(err, RagError::Decoding(ref m) if m.contains("outside the worksheet grid")));
    }

    #[test]
    fn test_xlsx_cell_cap_is_an_error() {
        let rows: String = (1..=XLSX_MAX_CELLS_PER_SHEET + 1)
            .map(|r| format!("<row r=\"{r}\"><c r=\"A{r}\"><v>{r}</v></c></row>"))
            .collect();
        let err = extract(&SchemaSource::Spreadsheet(xlsx(None, &rows))).unwrap_err();
        assert!(matches!(err, RagError::Decoding(ref m) if m.contains("non-empty cells")));
    }

    #[test]
    fn test_xlsx_not_a_zip() {
        let source = SchemaSource::Spreadsheet(b"not a zip".to_vec());
        assert!(matches!(extract(&source), Err(RagError::Decoding(_))));
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("B3"), Some((1, 2)));
        assert_eq!(parse_cell_ref("AA10"), Some((26, 9)));
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("A0"), None);
    }

    #[test]
    fn test_parse_cell_ref_bounds() {
        assert_eq!(parse_cell_ref("XFD1048576"), Some((16_383, 1_048_575)));
        assert_eq!(parse_cell_ref("XFE1"), None);
        assert_eq!(parse_cell_ref("AAAAAAAAAAAAAAAA1"), None);
        assert_eq!(parse_cell_ref("A1048577"), None);
        assert_eq!(parse_cell_ref("A99999999999999999999999"), None);
    }

    #[test]
    fn test_media_type_for_path() {
        assert_eq!(media_type_for_path(Path::new("schema.sql")), Some(MIME_TEXT));
        assert_eq!(media_type_for_path(Path::new("s.CSV")), Some(MIME_CSV));
        assert_eq!(media_type_for_path(Path::new("s.xlsx")), Some(MIME_XLSX));
        assert_eq!(media_type_for_path(Path::new("s.pdf")), None);
        assert_eq!(media_type_for_path(Path::new("noext")), None);
    }

    #[test]
    fn test_schema_file_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("schema.csv");
        std::fs::write(&path, "id\n1\n").unwrap();
        let file = SchemaFile::from_path(&path).unwrap();
        assert_eq!(file.name, "schema.csv");
        assert_eq!(file.media_type, MIME_CSV);
        assert!(matches!(
            file.to_source().unwrap(),
            SchemaSource::DelimitedTable { delimiter: b',', .. }
        ));

        let bad = dir.path().join("schema.pdf");
        std::fs::write(&bad, "x").unwrap();
        let err = SchemaFile::from_path(&bad).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::UnsupportedFormat(_))
        ));
    }
}
