//! Bounded context assembly for a downstream generation step.

use std::fmt::Write as _;

use crate::dedup::char_prefix;
use crate::scoring::{is_faq_structured, is_step_structured};
use crate::types::SearchResult;

/// First line of every non-empty context.
pub const CONTEXT_HEADER: &str = "Relevant library information:\n\n";
/// Appended after a truncated block.
pub const TRUNCATION_MARKER: &str = "\n[... truncated]";
/// A truncated block keeps at least this many characters of content, or is left out.
pub const MIN_FRAGMENT_CHARS: usize = 100;

/// Formats ranked results into one text block of bounded length.
///
/// Step-by-step chunks come first, then question-and-answer chunks, then everything else;
/// inside each group the score order is kept. Every block reads
/// `[Relevance: 0.87]\n<content>\n\n`. Lengths are counted in characters.
///
/// The first block that does not fit is cut to the remaining room when at least
/// [`MIN_FRAGMENT_CHARS`] of it fit, and assembly stops there. When not even the first block
/// fits that way, the context is the header and the truncation marker.
///
/// The output never exceeds `max(max_length, header) + marker` characters.
///
/// # Example
///
/// ```rust
/// use shelf_rag::ContextAssembler;
///
/// assert_eq!(ContextAssembler::default().format(&[], Some(10)), "");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextAssembler {
    max_length: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(3000)
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn annotation(score: f32) -> String {
    format!("[Relevance: {score:.2}]\n")
}

impl ContextAssembler {
    /// Creates an assembler with a default budget of `max_length` characters.
    #[must_use]
    pub const fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Returns the default budget.
    #[must_use]
    pub const fn max_length(&self) -> usize {
        self.max_length
    }

    /// Orders results for the context: score descending, then grouped step, FAQ, other.
    #[must_use]
    pub fn prioritize(results: &[SearchResult]) -> Vec<&SearchResult> {
        let mut ranked: Vec<&SearchResult> = results.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        let (steps, rest): (Vec<_>, Vec<_>) = ranked
            .into_iter()
            .partition(|result| is_step_structured(&result.content));
        let (faqs, other): (Vec<_>, Vec<_>) = rest
            .into_iter()
            .partition(|result| is_faq_structured(&result.content));

        steps.into_iter().chain(faqs).chain(other).collect()
    }

    /// Builds the context for `results` within `max_length` characters (default budget if
    /// `None`). Empty input gives an empty string.
    #[must_use]
    pub fn format(&self, results: &[SearchResult], max_length: Option<usize>) -> String {
        let max_length = max_length.unwrap_or(self.max_length);
        let candidates: Vec<&SearchResult> = Self::prioritize(results)
            .into_iter()
            .filter(|result| !result.content.trim().is_empty())
            .collect();
        if candidates.is_empty() {
            return String::new();
        }

        let mut out = String::from(CONTEXT_HEADER);
        let mut used = char_len(CONTEXT_HEADER);
        let mut added = 0usize;

        for result in &candidates {
            let prefix = annotation(result.score);
            let block_len = char_len(&prefix) + char_len(&result.content) + 2;
            if used + block_len <= max_length {
                let _ = write!(out, "{prefix}{}\n\n", result.content);
                used += block_len;
                added += 1;
                continue;
            }
            if Self::push_fragment(&mut out, used, max_length, &prefix, &result.content) {
                added += 1;
            } else if added == 0 {
                out.push_str(TRUNCATION_MARKER);
            }
            break;
        }

        out
    }

    /// Appends as much of `content` as fits after `used` characters, followed by the marker.
    /// Returns `false` without writing when fewer than [`MIN_FRAGMENT_CHARS`] would fit.
    fn push_fragment(
        out: &mut String,
        used: usize,
        max_length: usize,
        prefix: &str,
        content: &str,
    ) -> bool {
        let room = max_length
            .saturating_sub(used)
            .saturating_sub(char_len(prefix));
        if room < MIN_FRAGMENT_CHARS {
            return false;
        }
        out.push_str(prefix);
        out.push_str(char_prefix(content, room).trim_end());
        out.push_str(TRUNCATION_MARKER);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    fn result(content: &str, score: f32) -> SearchResult {
        SearchResult {
            content: content.to_string(),
            distance: 0.0,
            similarity: score,
            score,
            metadata: Metadata::new(),
            query_variant: String::new(),
            chunk_index: 0,
        }
    }

    #[test]
    fn empty_input_is_empty_string() {
        let assembler = ContextAssembler::default();
        assert_eq!(assembler.format(&[], None), "");
        assert_eq!(assembler.format(&[], Some(0)), "");
        assert_eq!(assembler.format(&[result("   ", 0.9)], None), "");
    }

    #[test]
    fn blocks_are_annotated() {
        let context =
            ContextAssembler::default().format(&[result("Loans last 14 days.", 0.876)], None);
        assert_eq!(
            context,
            "Relevant library information:\n\n[Relevance: 0.88]\nLoans last 14 days.\n\n"
        );
    }

    #[test]
    fn steps_then_faq_then_other() {
        let results = [
            result("The library opens at 8am", 0.95),
            result("Q: How do I renew? A: Online", 0.6),
            result("STEP 1: Visit MyLoft", 0.5),
            result("Another general note", 0.99),
        ];
        let context = ContextAssembler::default().format(&results, None);

        let step = context.find("STEP 1").unwrap();
        let faq = context.find("Q: How").unwrap();
        let general = context.find("Another general").unwrap();
        let opens = context.find("opens at 8am").unwrap();
        assert!(step < faq);
        assert!(faq < general);
        assert!(general < opens);
    }

    #[test]
    fn overflowing_block_is_truncated_with_marker() {
        let long = "a".repeat(400);
        let results = [result("short first chunk", 0.9), result(&long, 0.8)];
        let context = ContextAssembler::default().format(&results, Some(250));

        assert!(context.contains("short first chunk"));
        assert!(context.ends_with(TRUNCATION_MARKER));
        assert!(char_len(&context) <= 250 + char_len(TRUNCATION_MARKER));
    }

    #[test]
    fn too_small_remainder_stops_without_fragment() {
        let results = [result(&"b".repeat(60), 0.9), result(&"z".repeat(400), 0.8)];
        let context = ContextAssembler::default().format(&results, Some(150));

        assert!(context.contains(&"b".repeat(60)));
        assert!(!context.contains('z'));
        assert!(!context.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn first_block_over_budget_is_included_as_fragment() {
        let long = format!("Overdue loans {}", "o".repeat(900));
        let results = [result(&long, 0.7), result("Loans last 14 days.", 0.6)];
        let context = ContextAssembler::default().format(&results, Some(300));

        assert!(context.starts_with(CONTEXT_HEADER));
        assert!(context.contains("[Relevance: 0.70]\nOverdue loans ooo"));
        assert!(!context.contains("Loans last 14 days."));
        assert!(context.ends_with(TRUNCATION_MARKER));
        assert_eq!(context.matches(TRUNCATION_MARKER).count(), 1);
        assert!(char_len(&context) <= 300 + char_len(TRUNCATION_MARKER));
    }

    #[test]
    fn tiny_budget_yields_header_and_marker() {
        let context =
            ContextAssembler::default().format(&[result(&"x".repeat(500), 0.7)], Some(50));
        assert!(char_len(&context) <= 100);
        assert!(context.starts_with(CONTEXT_HEADER));
        assert!(context.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn prioritized_block_is_cut_before_higher_scores() {
        let results = [
            result(&format!("Step {}", "s".repeat(600)), 0.4),
            result(&"t".repeat(600), 0.9),
        ];
        let context = ContextAssembler::default().format(&results, Some(200));
        assert!(context.contains("[Relevance: 0.40]"));
        assert!(!context.contains("[Relevance: 0.90]"));
        assert!(context.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn sorts_by_score_within_group() {
        let results = [result("first low", 0.1), result("second high", 0.9)];
        let context = ContextAssembler::default().format(&results, None);
        assert!(context.find("second high").unwrap() < context.find("first low").unwrap());
    }

    #[test]
    fn counts_characters_not_bytes() {
        let content = "é".repeat(150);
        let context = ContextAssembler::default().format(&[result(&content, 0.5)], Some(200));
        assert!(context.contains(&content));
        assert!(char_len(&context) <= 200 + char_len(TRUNCATION_MARKER));
        assert!(context.ends_with(TRUNCATION_MARKER));
    }
}
