//! Spreadsheet and PDF renderings of a record set.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use rust_xlsxwriter::{Workbook, XlsxError};

use crate::files::UploadRecord;

pub const XLSX_FILE_NAME: &str = "UserData.xlsx";
pub const PDF_FILE_NAME: &str = "UserData.pdf";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const SHEET_NAME: &str = "User Data";
const XLSX_COLUMNS: [&str; 7] = [
    "id",
    "name",
    "email",
    "contact_no",
    "gender",
    "address",
    "upload_users_id",
];

// A4 portrait, in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN_X: i64 = 40;
const MARGIN_BOTTOM: i64 = 40;
/// Distance from the top of the page to the header row (20 mm).
const TABLE_TOP: i64 = 57;
const ROW_HEIGHT: i64 = 16;
const FONT_SIZE: i64 = 9;
const PDF_COLUMNS: [(&str, i64); 6] = [
    ("ID", 35),
    ("Name", 90),
    ("Email", 140),
    ("Contact No", 80),
    ("Gender", 55),
    ("Address", 115),
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("spreadsheet export failed: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("pdf export failed: {0}")]
    Pdf(String),
}

/// One worksheet, a header row of record keys, one row per record.
pub fn records_to_xlsx<'a>(
    records: impl IntoIterator<Item = &'a UploadRecord>,
) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, key) in XLSX_COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *key)?;
    }
    for (idx, r) in records.into_iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_number(row, 0, r.id as f64)?;
        let text = [
            r.name.as_deref(),
            Some(r.email.as_str()),
            Some(r.contact_no.as_str()),
            r.gender.as_deref(),
            r.address.as_deref(),
            Some(r.upload_users_id.as_str()),
        ];
        for (offset, value) in text.into_iter().enumerate() {
            if let Some(value) = value {
                sheet.write_string(row, offset as u16 + 1, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Rows that fit below the header on one page.
fn rows_per_page() -> usize {
    ((PAGE_HEIGHT - TABLE_TOP - MARGIN_BOTTOM) / ROW_HEIGHT - 1) as usize
}

/// Fixed six-column table; pages break when the table reaches the bottom margin and
/// repeat the header.
pub fn records_to_pdf<'a>(
    records: impl IntoIterator<Item = &'a UploadRecord>,
) -> Result<Vec<u8>, ExportError> {
    let rows: Vec<[String; 6]> = records.into_iter().map(pdf_cells).collect();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    let chunks: Vec<&[[String; 6]]> = if rows.is_empty() {
        vec![&rows[..]]
    } else {
        rows.chunks(rows_per_page()).collect()
    };
    for chunk in chunks {
        let content = page_content(chunk);
        let encoded = content
            .encode()
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        "Count" => page_ids.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(out)
}

fn pdf_cells(r: &UploadRecord) -> [String; 6] {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    [
        r.id.to_string(),
        opt(&r.name),
        r.email.clone(),
        r.contact_no.clone(),
        opt(&r.gender),
        opt(&r.address),
    ]
}

fn page_content(rows: &[[String; 6]]) -> Content {
    let mut ops = Vec::new();
    let header_y = PAGE_HEIGHT - TABLE_TOP;

    let mut x = MARGIN_X;
    for (title, width) in PDF_COLUMNS {
        text(&mut ops, "F2", x + 2, header_y, title);
        x += width;
    }

    // rule under the header
    let rule_y = header_y - 4;
    ops.push(Operation::new("w", vec![Object::Integer(1)]));
    ops.push(Operation::new(
        "m",
        vec![Object::Integer(MARGIN_X), Object::Integer(rule_y)],
    ));
    ops.push(Operation::new(
        "l",
        vec![Object::Integer(PAGE_WIDTH - MARGIN_X), Object::Integer(rule_y)],
    ));
    ops.push(Operation::new("S", vec![]));

    for (idx, cells) in rows.iter().enumerate() {
        let y = header_y - ROW_HEIGHT * (idx as i64 + 1);
        let mut x = MARGIN_X;
        for (cell, (_, width)) in cells.iter().zip(PDF_COLUMNS) {
            text(&mut ops, "F1", x + 2, y, &fit(cell, width));
            x += width;
        }
    }

    Content { operations: ops }
}

fn text(ops: &mut Vec<Operation>, font: &str, x: i64, y: i64, value: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![
            Object::Name(font.as_bytes().to_vec()),
            Object::Integer(FONT_SIZE),
        ],
    ));
    ops.push(Operation::new(
        "Td",
        vec![Object::Integer(x), Object::Integer(y)],
    ));
    ops.push(Operation::new(
        "Tj",
        vec![Object::string_literal(win_ansi(value))],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// Truncates `value` so it fits a column `width` points wide at the table font size.
fn fit(value: &str, width: i64) -> String {
    // Helvetica averages roughly half an em per glyph.
    let max_chars = ((width - 4) * 2 / FONT_SIZE).max(4) as usize;
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_chars - 3).collect();
    format!("{kept}...")
}

fn win_ansi(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
