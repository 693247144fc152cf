use crate::error::IngestError;
use crate::models::{Chunk, ChunkingOptions, PageText};

/// Splits page text into overlapping fixed-size windows.
///
/// Each page is windowed independently, so a chunk's `page` attribution is
/// always exact. Window starts advance by `window_size - overlap`; the last
/// window of a page may be shorter. Pages with no text (after trimming)
/// produce no chunks, but `chunk_index` keeps counting globally across the
/// document. The same input always yields the same chunk sequence.
pub fn chunk_pages(pages: &[PageText], options: ChunkingOptions) -> Result<Vec<Chunk>, IngestError> {
    validate_options(options)?;

    let stride = options.window_size - options.overlap;
    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for page in pages {
        if page.text.trim().is_empty() {
            continue;
        }

        let chars: Vec<char> = page.text.chars().collect();
        let mut start = 0;
        loop {
            let end = (start + options.window_size).min(chars.len());
            chunks.push(Chunk {
                chunk_index: cursor,
                page: page.page,
                text: chars[start..end].iter().collect(),
            });
            cursor += 1;

            if end == chars.len() {
                break;
            }
            start += stride;
        }
    }

    Ok(chunks)
}

fn validate_options(options: ChunkingOptions) -> Result<(), IngestError> {
    if options.window_size == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "window_size must be positive".to_string(),
        ));
    }
    if options.overlap >= options.window_size {
        return Err(IngestError::InvalidChunkConfig(format!(
            "overlap {} must be smaller than window_size {}",
            options.overlap, options.window_size
        )));
    }
    Ok(())
}
