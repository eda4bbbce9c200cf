//! Heuristic re-ranking on top of vector similarity.
//!
//! The retriever multiplies every similarity by `1 + boost`, where the boost comes from a
//! [`ScoreBooster`]. [`HeuristicBooster`] encodes the library rules; [`NoBoost`] ranks by pure
//! similarity.

/// Computes a boost in `[0, 1]` for a chunk given the original (non-expanded) query.
pub trait ScoreBooster: Send + Sync {
    /// Returns the boost for `content` answering `query`.
    fn boost(&self, content: &str, query: &str) -> f32;
}

/// Ranks by similarity alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBoost;

impl ScoreBooster for NoBoost {
    fn boost(&self, _content: &str, _query: &str) -> f32 {
        0.0
    }
}

/// Returns `true` for step-by-step content: it mentions a step, or numbers items 1. and 2.
#[must_use]
pub fn is_step_structured(content: &str) -> bool {
    let lowered = content.to_lowercase();
    lowered.contains("step") || (lowered.contains("1.") && lowered.contains("2."))
}

/// Returns `true` for question-and-answer content.
#[must_use]
pub fn is_faq_structured(content: &str) -> bool {
    let lowered = content.to_lowercase();
    lowered.contains("q:") || (lowered.contains("question") && lowered.contains("answer"))
}

fn has_faq_marker(content_lowered: &str) -> bool {
    content_lowered.contains("q:") || content_lowered.contains("question")
}

/// Rule-based booster for library documents.
///
/// | Rule | Boost |
/// |------|-------|
/// | content contains the query verbatim (case-insensitive) | `verbatim` (0.5) |
/// | content contains an important section marker | `section_marker` (0.3), once |
/// | how-to query and step-structured content | `how_to` (0.4) |
/// | interrogative query and content with a FAQ marker | `faq` (0.3) |
///
/// The sum is clamped to `[0, 1]`.
#[derive(Clone, Debug)]
pub struct HeuristicBooster {
    section_markers: Vec<String>,
    how_to_signals: Vec<String>,
    interrogatives: Vec<String>,
    verbatim: f32,
    section_marker: f32,
    how_to: f32,
    faq: f32,
}

impl Default for HeuristicBooster {
    fn default() -> Self {
        Self {
            section_markers: Vec::from([
                "SECTION 11:",
                "MYLOFT",
                "PAST EXAM PAPERS",
                "STEP 1",
                "STEP 2",
                "STEP 3",
            ]
            .map(String::from)),
            how_to_signals: Vec::from(
                ["how to", "step by step", "process", "procedure"].map(String::from),
            ),
            interrogatives: Vec::from(
                ["how", "what", "where", "when", "why", "can", "do", "does"].map(String::from),
            ),
            verbatim: 0.5,
            section_marker: 0.3,
            how_to: 0.4,
            faq: 0.3,
        }
    }
}

impl HeuristicBooster {
    /// Replaces the important section markers, matched case-sensitively in priority order.
    #[must_use]
    pub fn with_section_markers<S: Into<String>>(
        mut self,
        markers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.section_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the rule weights.
    #[must_use]
    pub const fn with_weights(
        mut self,
        verbatim: f32,
        section_marker: f32,
        how_to: f32,
        faq: f32,
    ) -> Self {
        self.verbatim = verbatim;
        self.section_marker = section_marker;
        self.how_to = how_to;
        self.faq = faq;
        self
    }

    fn starts_with_interrogative(&self, query_lowered: &str) -> bool {
        query_lowered
            .split_whitespace()
            .next()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .is_some_and(|word| self.interrogatives.iter().any(|w| w == word))
    }
}

impl ScoreBooster for HeuristicBooster {
    fn boost(&self, content: &str, query: &str) -> f32 {
        let content_lowered = content.to_lowercase();
        let query_lowered = query.trim().to_lowercase();
        let mut boost = 0.0;

        if !query_lowered.is_empty() && content_lowered.contains(&query_lowered) {
            boost += self.verbatim;
        }

        if self
            .section_markers
            .iter()
            .any(|marker| content.contains(marker.as_str()))
        {
            boost += self.section_marker;
        }

        let how_to_query = self
            .how_to_signals
            .iter()
            .any(|signal| query_lowered.contains(signal.as_str()));
        if how_to_query && is_step_structured(content) {
            boost += self.how_to;
        }

        if self.starts_with_interrogative(&query_lowered) && has_faq_marker(&content_lowered) {
            boost += self.faq;
        }

        f32::clamp(boost, 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn verbatim_query_boost() {
        let booster = HeuristicBooster::default();
        approx(
            booster.boost("Opening Hours are listed below", "opening hours"),
            0.5,
        );
        approx(booster.boost("Closing time is 9pm", "opening hours"), 0.0);
    }

    #[test]
    fn section_marker_applies_once() {
        let booster = HeuristicBooster::default();
        approx(
            booster.boost("SECTION 11: MYLOFT and PAST EXAM PAPERS", "wifi"),
            0.3,
        );
        approx(booster.boost("section 11: myloft", "wifi"), 0.0);
    }

    #[test]
    fn how_to_needs_step_structure() {
        let booster = HeuristicBooster::default();
        approx(
            booster.boost("1. Log in 2. Open loans", "renewal procedure"),
            0.4,
        );
        approx(booster.boost("Loans last two weeks", "renewal procedure"), 0.0);
    }

    #[test]
    fn interrogative_with_faq_marker() {
        let booster = HeuristicBooster::default();
        approx(booster.boost("Q: Can I renew? A: Yes", "Can I renew twice?"), 0.3);
        approx(booster.boost("Q: Can I renew? A: Yes", "renew twice"), 0.0);
        approx(booster.boost("Q: Can I renew? A: Yes", "dogs allowed?"), 0.0);
    }

    #[test]
    fn sum_is_clamped() {
        let booster = HeuristicBooster::default();
        let content = "STEP 1: how to renew a book. Question: see below";
        approx(booster.boost(content, "how to renew a book"), 1.0);
    }

    #[test]
    fn renew_scenario_boosts() {
        let booster = HeuristicBooster::default();
        let query = "how to renew a book";
        approx(booster.boost("STEP 1: Visit MyLoft", query), 0.7);
        approx(
            booster.boost("Q: How do I renew a book? A: Use MyLoft app", query),
            0.3,
        );
        approx(booster.boost("The library opens at 8am", query), 0.0);
    }

    #[test]
    fn custom_markers_and_weights() {
        let booster = HeuristicBooster::default()
            .with_section_markers(["WIFI"])
            .with_weights(0.1, 0.2, 0.0, 0.0);
        approx(booster.boost("WIFI access", "access"), 0.3);
    }

    #[test]
    fn shape_detection() {
        assert!(is_step_structured("Step one"));
        assert!(is_step_structured("1. a 2. b"));
        assert!(!is_step_structured("1. only one"));
        assert!(is_faq_structured("Q: hours?"));
        assert!(is_faq_structured("Question ... Answer ..."));
        assert!(!is_faq_structured("A question without reply"));
        approx(NoBoost.boost("anything", "anything"), 0.0);
    }
}
