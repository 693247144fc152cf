use crate::error::ParseError;
use crate::models::PageText;
use lopdf::Document;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracts ordered page text from raw PDF bytes. Page order follows the
/// source document exactly and `page` is 0-based. Pages without extractable
/// text are kept (with empty text) so page attribution never shifts.
///
/// Fails with [`ParseError`] before any other work happens, so callers can
/// short-circuit without paying for network calls.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, ParseError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ParseError::NotPdf("missing %PDF header".to_string()));
    }

    let document =
        Document::load_mem(bytes).map_err(|error| ParseError::Malformed(error.to_string()))?;

    if document.is_encrypted() {
        return Err(ParseError::Encrypted);
    }

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(ParseError::Malformed("pdf has no pages".to_string()));
    }

    let mut pages = Vec::with_capacity(page_numbers.len());
    for (index, page_number) in page_numbers.iter().enumerate() {
        let text = document
            .extract_text(&[*page_number])
            .map_err(|error| ParseError::Malformed(error.to_string()))?;

        pages.push(PageText {
            page: index as u32,
            text,
        });
    }

    Ok(pages)
}

/// Builds a minimal single-font PDF with one page per entry in `texts`.
/// An empty entry produces a page with no text operations.
#[cfg(test)]
pub(crate) fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in texts {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = document.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).expect("write pdf fixture");
    bytes
}
