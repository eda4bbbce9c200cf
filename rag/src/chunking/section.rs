//! Section-aware paragraph chunking.

use regex::Regex;
use std::sync::LazyLock;

use crate::dedup::char_prefix;
use crate::types::{CONTENT_TYPE_KEY, Chunk, Document, Metadata, PAGE_KEY, SECTION_KEY};

use super::{Chunker, classify_content};

static HEADER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:SECTION\s+\d+|[A-Z][A-Z\s]+:$|\d+\.\s+[A-Z]|[IVX]+\.|[A-Z\s]{5,30}$|Q:|PROBLEM\s+\d+|HOW TO\s+)",
    )
    .ok()
});

static NUMBERED_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d+[.)]").ok());

const TOPIC_STARTS: &[&str] = &[
    "what is", "how do", "where is", "why is", "when is", "who can", "can i",
];

/// Lines longer than this are never headings.
const MAX_HEADER_CHARS: usize = 200;
/// Once a section holds this much text, questions and numbered items also open a new one.
const TOPIC_BREAK_CHARS: usize = 100;

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits after `.`, `!` or `?` followed by whitespace.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|(_, next)| next.is_whitespace());
        if boundary {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Cuts text longer than `max_chars` at the last whitespace inside each window.
fn split_long(paragraph: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut rest = paragraph.trim();

    while char_len(rest) > max_chars {
        let window = char_prefix(rest, max_chars);
        let cut = window
            .rfind(char::is_whitespace)
            .filter(|&at| at > 0)
            .unwrap_or(window.len());
        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            pieces.push(piece);
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

struct Section {
    title: String,
    lines: Vec<String>,
    page: Option<String>,
    inherited: Metadata,
}

impl Section {
    fn text_len(&self) -> usize {
        self.lines.iter().map(|line| char_len(line) + 1).sum()
    }
}

/// Follows headings across pages and cuts sections into short paragraphs.
///
/// A heading line starts a new section and is kept as the section's first line, so markers
/// such as `SECTION 11:`, `STEP 1` or `Q:` stay visible in the chunk text. Each section is
/// split into sentences that are packed into paragraphs, closing a paragraph once it is longer
/// than `paragraph_chars` or a sentence ends with `:` or `;`. Paragraphs shorter than
/// `min_chars` are dropped and longer than `max_chars` are split at whitespace.
///
/// Every chunk carries its page's metadata plus `page`, `section` and `content_type`.
#[derive(Debug, Clone)]
pub struct SectionChunker {
    min_chars: usize,
    max_chars: usize,
    paragraph_chars: usize,
}

impl Default for SectionChunker {
    fn default() -> Self {
        Self::new(30, 800)
    }
}

impl SectionChunker {
    /// Creates a chunker keeping paragraphs between `min_chars` and `max_chars` characters.
    #[must_use]
    pub const fn new(min_chars: usize, max_chars: usize) -> Self {
        Self {
            min_chars,
            max_chars,
            paragraph_chars: 100,
        }
    }

    /// Sets the length after which a paragraph is closed at the next sentence end.
    #[must_use]
    pub const fn with_paragraph_chars(mut self, chars: usize) -> Self {
        self.paragraph_chars = chars;
        self
    }

    fn is_section_header(line: &str, section_len: usize) -> bool {
        if char_len(line) > MAX_HEADER_CHARS {
            return false;
        }
        if HEADER_RE.as_ref().is_some_and(|re| re.is_match(line)) {
            return true;
        }
        if section_len > TOPIC_BREAK_CHARS {
            let lowered = line.to_lowercase();
            if TOPIC_STARTS.iter().any(|start| lowered.starts_with(start)) {
                return true;
            }
            if NUMBERED_RE.as_ref().is_some_and(|re| re.is_match(line)) {
                return true;
            }
        }
        false
    }

    fn paragraphs<'a>(&self, text: &'a str) -> Vec<String> {
        let mut paragraphs = Vec::new();
        let mut current: Vec<&'a str> = Vec::new();
        let mut current_len = 0usize;

        for sentence in sentences(text) {
            current_len += char_len(sentence) + usize::from(!current.is_empty());
            current.push(sentence);
            if current_len > self.paragraph_chars || sentence.ends_with([':', ';']) {
                paragraphs.push(current.join(" "));
                current.clear();
                current_len = 0;
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join(" "));
        }
        paragraphs
    }

    fn emit(&self, section: &Section, chunks: &mut Vec<Chunk>) {
        let content = section.lines.join(" ");
        for paragraph in self.paragraphs(&content) {
            for piece in split_long(&paragraph, self.max_chars) {
                if char_len(piece) < self.min_chars {
                    continue;
                }
                let mut metadata = section.inherited.clone();
                if let Some(page) = &section.page {
                    metadata.insert(PAGE_KEY.to_string(), page.clone());
                }
                if !section.title.is_empty() {
                    metadata.insert(SECTION_KEY.to_string(), section.title.clone());
                }
                metadata.insert(
                    CONTENT_TYPE_KEY.to_string(),
                    classify_content(piece).to_string(),
                );
                chunks.push(Chunk::new(piece, metadata));
            }
        }
    }
}

impl Chunker for SectionChunker {
    fn chunk(&self, pages: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut section: Option<Section> = None;

        for page in pages {
            for line in page.text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let section_len = section.as_ref().map_or(0, Section::text_len);
                if Self::is_section_header(line, section_len) {
                    if let Some(done) = section.take() {
                        self.emit(&done, &mut chunks);
                    }
                    section = Some(Section {
                        title: line.to_string(),
                        lines: vec![line.to_string()],
                        page: page.metadata.get(PAGE_KEY).cloned(),
                        inherited: page.metadata.clone(),
                    });
                } else {
                    section
                        .get_or_insert_with(|| Section {
                            title: String::new(),
                            lines: Vec::new(),
                            page: page.metadata.get(PAGE_KEY).cloned(),
                            inherited: page.metadata.clone(),
                        })
                        .lines
                        .push(line.to_string());
                }
            }
        }

        if let Some(done) = section {
            self.emit(&done, &mut chunks);
        }
        chunks
    }

    fn name(&self) -> &'static str {
        "section"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SOURCE_KEY;

    fn page(number: u32, text: &str) -> Document {
        Document::with_metadata(
            format!("guide.pdf#page_{number}"),
            text,
            Metadata::from([
                (SOURCE_KEY.to_string(), "guide.pdf".to_string()),
                (PAGE_KEY.to_string(), number.to_string()),
            ]),
        )
    }

    #[test]
    fn sentence_split_keeps_abbreviated_numbers() {
        assert_eq!(
            sentences("Open at 8.30 daily. Closed Sunday! Why? Ask."),
            vec!["Open at 8.30 daily.", "Closed Sunday!", "Why?", "Ask."]
        );
    }

    #[test]
    fn long_text_splits_at_whitespace() {
        let pieces = split_long("alpha beta gamma delta", 11);
        assert_eq!(pieces, vec!["alpha beta", "gamma delta"]);
        assert_eq!(split_long("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn headers_are_detected() {
        assert!(SectionChunker::is_section_header("SECTION 11: MyLoft", 0));
        assert!(SectionChunker::is_section_header("BORROWING RULES:", 0));
        assert!(SectionChunker::is_section_header("Q: How do I renew?", 0));
        assert!(SectionChunker::is_section_header("2. Renewals", 0));
        assert!(!SectionChunker::is_section_header(
            "Books may be borrowed for fourteen days by all students.",
            0
        ));
        assert!(!SectionChunker::is_section_header("can i bring food inside the library", 0));
        assert!(SectionChunker::is_section_header("can i bring food inside the library", 150));
    }

    #[test]
    fn sections_carry_title_page_and_topic() {
        let chunker = SectionChunker::default();
        let pages = [
            page(
                1,
                "SECTION 3: BORROWING\nUndergraduate students may borrow up to five books at a time.",
            ),
            page(
                2,
                "Books can be renewed twice through the library portal before the due date.",
            ),
        ];
        let chunks = chunker.chunk(&pages);

        assert!(!chunks.is_empty());
        let first = &chunks[0];
        assert!(first.text.starts_with("SECTION 3: BORROWING"));
        assert_eq!(first.metadata[SECTION_KEY], "SECTION 3: BORROWING");
        assert_eq!(first.metadata[PAGE_KEY], "1");
        assert_eq!(first.metadata[SOURCE_KEY], "guide.pdf");
        assert_eq!(first.metadata[CONTENT_TYPE_KEY], "borrowing");
        assert!(chunks.iter().any(|c| c.text.contains("renewed twice")));
    }

    #[test]
    fn short_fragments_are_dropped() {
        let chunker = SectionChunker::default();
        assert!(chunker.chunk(&[page(1, "Tiny note.")]).is_empty());
        assert!(chunker.chunk(&[]).is_empty());
    }

    #[test]
    fn oversized_paragraphs_respect_max() {
        let chunker = SectionChunker::new(5, 50);
        let text = "word ".repeat(60);
        let chunks = chunker.chunk(&[page(1, &text)]);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 50));
    }
}
