//! Rule-based query expansion for library vocabulary.
//!
//! A query such as "where are past exams" becomes several variants ("past exam papers",
//! "previous papers", ...) that are embedded separately. The rules are a fixed table so that
//! the same query always yields the same variants.

/// Domain phrases (matched as lower-case substrings) and the variants they add.
const LIBRARY_TERMS: &[(&str, &[&str])] = &[
    (
        "past exam",
        &["past exam papers", "previous papers", "exam papers", "old papers"],
    ),
    (
        "myloft",
        &["myloft app", "mobile app", "e-resources app", "past exam papers app"],
    ),
    ("borrow", &["borrowing", "loan", "checkout", "borrow books"]),
    ("renew", &["renew books", "renewal", "extend loan", "extend due date"]),
    ("overdue", &["overdue fine", "late fee", "penalty"]),
    ("fine", &["overdue fine", "late fee", "penalty"]),
    (
        "library hours",
        &["opening hours", "closing time", "library schedule"],
    ),
    ("plagiarism", &["turnitin", "academic integrity", "citation"]),
    (
        "citation",
        &["apa", "referencing", "bibliography", "reference style"],
    ),
    (
        "e-resource",
        &["electronic resources", "online databases", "e-journals"],
    ),
    (
        "database",
        &["databases", "e-journals", "e-books", "online resources"],
    ),
];

/// Keywords appended together as one extra variant when present in the query.
const LIBRARY_KEYWORDS: &[&str] = &[
    "past",
    "exam",
    "paper",
    "myloft",
    "borrow",
    "renew",
    "loan",
    "book",
    "fine",
    "overdue",
    "hours",
    "plagiarism",
    "turnitin",
    "citation",
    "database",
    "e-resource",
    "membership",
];

/// Maps a query to itself plus related variants.
///
/// # Example
///
/// ```rust
/// use shelf_rag::QueryExpander;
///
/// let variants = QueryExpander::default().expand("How do I renew?");
/// assert_eq!(variants[0], "How do I renew?");
/// assert!(variants.contains(&"extend loan".to_string()));
/// assert_eq!(variants.last().unwrap(), "How do I renew? renew");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryExpander {
    terms: Vec<(String, Vec<String>)>,
    keywords: Vec<String>,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new(
            LIBRARY_TERMS
                .iter()
                .map(|(key, phrases)| (*key, phrases.iter().copied())),
            LIBRARY_KEYWORDS.iter().copied(),
        )
    }
}

impl QueryExpander {
    /// Creates an expander from a phrase table and a keyword list.
    ///
    /// Keys and keywords are matched case-insensitively; table order is variant order.
    pub fn new<K, P, I, W>(terms: I, keywords: impl IntoIterator<Item = W>) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: AsRef<str>,
        P: IntoIterator,
        P::Item: Into<String>,
        W: AsRef<str>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(|(key, phrases)| {
                    (
                        key.as_ref().to_lowercase(),
                        phrases.into_iter().map(Into::into).collect(),
                    )
                })
                .collect(),
            keywords: keywords
                .into_iter()
                .map(|keyword| keyword.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns the keyword list.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Expands `query` into an ordered, duplicate-free list whose first element is `query`.
    #[must_use]
    pub fn expand(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let mut variants = vec![query.to_string()];

        let mut push = |variant: String| {
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        };

        for (key, phrases) in &self.terms {
            if lowered.contains(key.as_str()) {
                for phrase in phrases {
                    push(phrase.clone());
                }
            }
        }

        let found: Vec<&str> = self
            .keywords
            .iter()
            .filter(|keyword| lowered.contains(keyword.as_str()))
            .map(String::as_str)
            .collect();
        if !found.is_empty() {
            push(format!("{query} {}", found.join(" ")));
        }

        variants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_query_yields_only_itself() {
        let variants = QueryExpander::default().expand("Where is the cafeteria?");
        assert_eq!(variants, vec!["Where is the cafeteria?".to_string()]);
    }

    #[test]
    fn matches_case_insensitively_and_keeps_original_casing() {
        let variants = QueryExpander::default().expand("Where are PAST EXAM papers");
        assert_eq!(variants[0], "Where are PAST EXAM papers");
        assert_eq!(variants[1], "past exam papers");
        assert!(variants.contains(&"previous papers".to_string()));
        assert_eq!(
            variants.last().unwrap(),
            "Where are PAST EXAM papers past exam paper"
        );
    }

    #[test]
    fn overlapping_entries_do_not_duplicate() {
        let variants = QueryExpander::default().expand("overdue fine");
        let late_fees = variants.iter().filter(|v| *v == "late fee").count();
        assert_eq!(late_fees, 1);
    }

    #[test]
    fn custom_table_is_used_in_order() {
        let expander = QueryExpander::new(
            [("Wifi", vec!["wireless network", "eduroam"])],
            ["wifi"],
        );
        assert_eq!(
            expander.expand("wifi password"),
            vec![
                "wifi password".to_string(),
                "wireless network".to_string(),
                "eduroam".to_string(),
                "wifi password wifi".to_string(),
            ]
        );
    }

    #[test]
    fn keyword_variant_equal_to_existing_is_skipped() {
        let expander = QueryExpander::new([("x", vec!["x x"])], ["x"]);
        assert_eq!(expander.expand("x"), vec!["x".to_string(), "x x".to_string()]);
    }
}
