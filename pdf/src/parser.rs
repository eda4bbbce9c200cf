use lopdf::Document;
use tracing::{debug, warn};

use crate::PageText;

/// Extracts normalised text for every page, in page order, dropping pages with no text.
pub(crate) fn extract_pages(doc: &Document, source_name: &str) -> Vec<PageText> {
    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in page_numbers {
        let raw = match doc.extract_text(&[number]) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    source = source_name,
                    page = number,
                    error = %e,
                    "failed to extract page text"
                );
                continue;
            }
        };
        let text = normalize_text(&raw);
        if text.is_empty() {
            debug!(source = source_name, page = number, "page has no text layer");
            continue;
        }
        pages.push(PageText { number, text });
    }

    debug!(source = source_name, pages = pages.len(), "extracted PDF text");
    pages
}

/// Trims every line and drops blank ones.
pub(crate) fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_blank_lines_and_padding() {
        assert_eq!(
            normalize_text("  SECTION 4: LOANS \n\n\t \nBooks may be renewed twice.  \r\n"),
            "SECTION 4: LOANS\nBooks may be renewed twice."
        );
        assert_eq!(normalize_text(" \n \n"), "");
    }
}
