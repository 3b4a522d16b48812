//! Reads the first worksheet of an uploaded workbook into header-keyed rows.
//!
//! `.csv` files go through the `csv` reader; every other suffix is handed to calamine,
//! which detects `.xlsx`, `.xlsm`, `.xlsb`, `.xls` and `.ods`.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("failed to open workbook: {0}")]
    Open(#[source] calamine::Error),
    #[error("failed to read first worksheet: {0}")]
    Range(#[source] calamine::Error),
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),
}

/// One data row of the sheet. Only non-empty cells under a non-empty header are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    /// 1-based line in the sheet, counting the header as line 1.
    pub line: usize,
    cells: HashMap<String, String>,
}

impl SheetRow {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            cells: HashMap::new(),
        }
    }

    pub fn with(mut self, header: &str, value: &str) -> Self {
        self.insert(header, value);
        self
    }

    pub fn insert(&mut self, header: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.cells.insert(header.to_string(), value.to_string());
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells.get(header).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Parses the first worksheet. A workbook without sheets yields no rows.
pub fn read_first_sheet(path: &Path) -> Result<Vec<SheetRow>, SheetError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        return read_csv(path);
    }

    let mut workbook = open_workbook_auto(path).map_err(SheetError::Open)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Vec::new());
    };
    let range = range.map_err(SheetError::Range)?;

    let mut lines = range.rows();
    let Some(header_cells) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<Option<String>> = header_cells.iter().map(cell_text).collect();

    let mut rows = Vec::new();
    for (idx, cells) in lines.enumerate() {
        let mut row = SheetRow::new(idx + 2);
        for (header, cell) in headers.iter().zip(cells) {
            if let (Some(header), Some(value)) = (header, cell_text(cell)) {
                row.insert(header, &value);
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    debug!(path = %path.display(), rows = rows.len(), "parsed first sheet");
    Ok(rows)
}

fn read_csv(path: &Path) -> Result<Vec<SheetRow>, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // the reader skips empty lines, so a running index would drift
        let line = record.position().map_or(rows.len() + 2, |p| p.line() as usize);
        let mut row = SheetRow::new(line);
        for (header, value) in headers.iter().zip(record.iter()) {
            if !header.is_empty() {
                row.insert(header, value);
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    debug!(path = %path.display(), rows = rows.len(), "parsed csv");
    Ok(rows)
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        // phone numbers typed into a numeric cell come back as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}
