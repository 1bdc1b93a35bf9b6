use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, ObjectId, Stream,
};

use crate::error::{AppError, AppResult};
use crate::journal::repo_types::JournalEntry;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 50;
const LEADING: i64 = 14;
const WRAP_WIDTH: usize = 100;

const TITLE_SIZE: i64 = 16;
const BODY_SIZE: i64 = 12;

/// Greedy word wrap. Words longer than `width` are split; a blank paragraph
/// yields no lines.
pub fn wrap(paragraph: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in paragraph.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Body lines: every paragraph wrapped, each followed by a blank line.
fn body_lines(content: &str) -> Vec<String> {
    content
        .split('\n')
        .flat_map(|p| {
            let mut lines = wrap(p, WRAP_WIDTH);
            lines.push(String::new());
            lines
        })
        .collect()
}

/// Latin-1 bytes for the standard Type1 fonts; anything else becomes `?`.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn text_at(ops: &mut Vec<Operation>, font: &str, size: i64, y: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.as_bytes().to_vec()), Object::Integer(size)],
    ));
    ops.push(Operation::new(
        "Td",
        vec![Object::Integer(MARGIN), Object::Integer(y)],
    ));
    ops.push(Operation::new("Tj", vec![Object::string_literal(latin1(text))]));
    ops.push(Operation::new("ET", vec![]));
}

/// Lay out an entry into per-page operation lists.
fn layout(entry: &JournalEntry) -> Vec<Vec<Operation>> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut pages = Vec::new();
    let mut ops = Vec::new();

    text_at(&mut ops, "F2", TITLE_SIZE, top, &format!("Title: {}", entry.title));
    text_at(&mut ops, "F1", BODY_SIZE, top - 20, &format!("Date: {}", entry.timestamp));

    let mut y = top - 50;
    for line in body_lines(&entry.content) {
        if !line.is_empty() {
            text_at(&mut ops, "F1", BODY_SIZE, y, &line);
        }
        y -= LEADING;
        if y < MARGIN {
            pages.push(std::mem::take(&mut ops));
            y = top;
        }
    }
    if !ops.is_empty() || pages.is_empty() {
        pages.push(ops);
    }
    pages
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::ExternalService(format!("failed to render PDF: {}", e))
}

/// Render an entry as a paginated US Letter PDF.
pub fn render_pdf(entry: &JournalEntry) -> AppResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

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
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => regular, "F2" => bold },
    });

    let mut kids = Vec::new();
    for operations in layout(entry) {
        let content = Content { operations };
        let stream = doc.add_object(Stream::new(dictionary! {}, content.encode().map_err(pdf_error)?));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => stream,
        });
        kids.push(Object::Reference(page));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => resources,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(pdf_error)?;
    Ok(out)
}
