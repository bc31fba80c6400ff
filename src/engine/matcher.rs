//! KeywordMatcher - literal keyword and negative-term matching
//!
//! Every configured keyword is matched as an escaped literal, case-insensitive,
//! never as a pattern. Occurrences are emitted slot by slot (then negative by
//! negative), stably sorted by start offset, and overlaps are resolved with a
//! greedy leftmost-wins pass: a span is kept only when it starts at or after
//! the end of the previously kept span, and overlapping spans are dropped
//! whole, never truncated.
//!
//! An Aho-Corasick automaton over the same literals answers the cheap
//! "could this segment contain anything at all" question before the per-slot
//! scans run. The automaton folds ASCII case only, so it is built solely when
//! every pattern is ASCII; otherwise the pre-filter stays permissive.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind as AcMatchKind};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

// ==================== TYPE DEFINITIONS ====================

/// How a slot came to exist. Auto-derived slots may be replaced by a new
/// search; manually entered ones signal user intent and win over auto flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotOrigin {
    Manual,
    AutoDerived,
}

impl Default for SlotOrigin {
    fn default() -> Self {
        SlotOrigin::Manual
    }
}

/// A configured positive keyword plus its display color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSlot {
    pub keyword: String,
    pub color: String,
    #[serde(default)]
    pub origin: SlotOrigin,
}

impl KeywordSlot {
    pub fn manual(keyword: &str, color: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            color: color.to_string(),
            origin: SlotOrigin::Manual,
        }
    }

    pub fn auto(keyword: &str, color: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            color: color.to_string(),
            origin: SlotOrigin::AutoDerived,
        }
    }

    /// Empty and whitespace-only keywords are never matched
    pub fn is_inert(&self) -> bool {
        self.keyword.trim().is_empty()
    }
}

/// What a span marks: a colored highlight or a de-emphasized negative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatchKind {
    Highlight { color: String },
    Negative,
}

/// One keyword occurrence inside a single text segment.
/// Invariant: `start < end <= segment.len()`, byte offsets on char boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
    #[serde(flatten)]
    pub kind: MatchKind,
}

impl MatchSpan {
    pub fn is_highlight(&self) -> bool {
        matches!(self.kind, MatchKind::Highlight { .. })
    }
}

// ==================== MAIN IMPLEMENTATION ====================

struct CompiledPattern {
    regex: Regex,
    kind: MatchKind,
}

/// Compiled matcher over the current slot/negative state.
///
/// Rebuilt wholesale on every state replacement; scanning takes `&self` so a
/// scan pass always sees one consistent snapshot.
pub struct KeywordMatcher {
    patterns: Vec<CompiledPattern>,
    prefilter: Option<AhoCorasick>,
}

impl KeywordMatcher {
    /// Compile slots (in order) followed by negatives (in order). Inert
    /// entries are skipped; slot-before-negative compilation order is what
    /// gives highlights priority on identical start offsets.
    pub fn build(slots: &[KeywordSlot], negatives: &[String]) -> Self {
        let mut patterns = Vec::new();
        let mut literals: Vec<String> = Vec::new();

        for slot in slots {
            if slot.is_inert() {
                continue;
            }
            if let Some(regex) = compile_literal(&slot.keyword) {
                patterns.push(CompiledPattern {
                    regex,
                    kind: MatchKind::Highlight {
                        color: slot.color.clone(),
                    },
                });
                literals.push(slot.keyword.clone());
            }
        }

        for negative in negatives {
            if negative.trim().is_empty() {
                continue;
            }
            if let Some(regex) = compile_literal(negative) {
                patterns.push(CompiledPattern {
                    regex,
                    kind: MatchKind::Negative,
                });
                literals.push(negative.clone());
            }
        }

        let prefilter = if !literals.is_empty() && literals.iter().all(|l| l.is_ascii()) {
            AhoCorasickBuilder::new()
                .ascii_case_insensitive(true)
                .match_kind(AcMatchKind::LeftmostFirst)
                .build(&literals)
                .ok()
        } else {
            None
        };

        Self { patterns, prefilter }
    }

    /// An empty matcher that can never match
    pub fn empty() -> Self {
        Self::build(&[], &[])
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Cheap pre-filter: false guarantees `scan` would find nothing.
    /// Permissive (true) whenever no automaton could be built.
    pub fn may_contain(&self, text: &str) -> bool {
        match &self.prefilter {
            Some(automaton) => automaton.is_match(text),
            None => !self.patterns.is_empty(),
        }
    }

    /// Find every occurrence in `text` and resolve overlaps.
    /// Result is sorted ascending by start and pairwise non-overlapping.
    pub fn scan(&self, text: &str) -> Vec<MatchSpan> {
        if text.is_empty() || self.patterns.is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        for pattern in &self.patterns {
            for found in pattern.regex.find_iter(text) {
                spans.push(MatchSpan {
                    start: found.start(),
                    end: found.end(),
                    text: found.as_str().to_string(),
                    kind: pattern.kind.clone(),
                });
            }
        }

        // Stable sort: emission order (slots before negatives) breaks ties
        spans.sort_by_key(|span| span.start);
        resolve_overlaps(spans)
    }
}

/// One-shot form of the matcher contract
pub fn find_matches(text: &str, slots: &[KeywordSlot], negatives: &[String]) -> Vec<MatchSpan> {
    KeywordMatcher::build(slots, negatives).scan(text)
}

/// Escape regex metacharacters and compile a case-insensitive literal
/// matcher. Escaped literals always form valid patterns; a pathological
/// build failure (pattern size limits) just drops that entry.
fn compile_literal(keyword: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Greedy leftmost-wins cover: keep a span only when it starts at or after
/// the end of the last kept span. Overlapping spans are dropped in full.
fn resolve_overlaps(spans: Vec<MatchSpan>) -> Vec<MatchSpan> {
    let mut kept: Vec<MatchSpan> = Vec::with_capacity(spans.len());
    let mut last_end = 0;
    for span in spans {
        if kept.is_empty() || span.start >= last_end {
            last_end = span.end;
            kept.push(span);
        }
    }
    kept
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(keyword: &str, color: &str) -> KeywordSlot {
        KeywordSlot::manual(keyword, color)
    }

    #[test]
    fn test_case_insensitive_matching() {
        let spans = find_matches(
            "The cat sat on a CAT mat",
            &[slot("Cat", "#ffee58")],
            &[],
        );
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "cat");
        assert_eq!(spans[0].start, 4);
        assert_eq!(spans[1].text, "CAT");
        assert_eq!(spans[1].start, 17);
    }

    #[test]
    fn test_metacharacters_match_literally() {
        let spans = find_matches("C++ is fast", &[slot("C++", "#ffee58")], &[]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 3);
        assert_eq!(spans[0].text, "C++");
    }

    #[test]
    fn test_overlap_keeps_first_starting_span() {
        // "abcde" at [0,5) overlaps "defgh" at [3,8): the later span drops whole
        let spans = find_matches(
            "abcdefgh",
            &[slot("abcde", "#ffee58")],
            &["defgh".to_string()],
        );
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start, spans[0].end), (0, 5));
        assert!(spans[0].is_highlight());
    }

    #[test]
    fn test_same_start_prefers_earlier_slot() {
        let spans = find_matches(
            "alphabet",
            &[slot("alpha", "#ffee58"), slot("alphabet", "#f48fb1")],
            &[],
        );
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].end, 5, "first-emitted slot wins the tie");
        assert_eq!(
            spans[0].kind,
            MatchKind::Highlight {
                color: "#ffee58".to_string()
            }
        );
    }

    #[test]
    fn test_highlight_beats_negative_at_same_start() {
        let spans = find_matches(
            "rust",
            &[slot("rust", "#ffee58")],
            &["rust".to_string()],
        );
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_highlight());
    }

    #[test]
    fn test_spans_never_overlap() {
        let spans = find_matches(
            "aaa aaaa aa",
            &[slot("aa", "#ffee58"), slot("aaa", "#f48fb1")],
            &["a".to_string()],
        );
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_inert_entries_are_skipped() {
        let spans = find_matches(
            "anything at all",
            &[slot("", "#ffee58"), slot("   ", "#f48fb1")],
            &["".to_string()],
        );
        assert!(spans.is_empty());

        let matcher = KeywordMatcher::build(&[slot("  ", "#ffee58")], &[]);
        assert!(matcher.is_empty());
    }

    #[test]
    fn test_empty_text_is_a_cheap_exit() {
        let matcher = KeywordMatcher::build(&[slot("word", "#ffee58")], &[]);
        assert!(matcher.scan("").is_empty());
    }

    #[test]
    fn test_negatives_are_tagged_negative() {
        let spans = find_matches("buy cheap stuff", &[], &["cheap".to_string()]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, MatchKind::Negative);
        assert_eq!(spans[0].start, 4);
    }

    #[test]
    fn test_prefilter_rejects_unrelated_text() {
        let matcher =
            KeywordMatcher::build(&[slot("rust", "#ffee58")], &["slow".to_string()]);
        assert!(matcher.may_contain("Rust is great"));
        assert!(!matcher.may_contain("nothing to see here"));
    }

    #[test]
    fn test_prefilter_stays_permissive_for_non_ascii() {
        let matcher = KeywordMatcher::build(&[slot("caf\u{e9}", "#ffee58")], &[]);
        // No ASCII automaton, so the pre-filter cannot rule anything out
        assert!(matcher.may_contain("no accents here"));
        let spans = matcher.scan("a caf\u{e9} visit");
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn test_slot_order_is_significant_across_overlaps() {
        // "bcd" starts later than "abc": leftmost wins regardless of slot order
        let spans = find_matches(
            "abcd",
            &[slot("bcd", "#ffee58"), slot("abc", "#f48fb1")],
            &[],
        );
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start, spans[0].end), (0, 3));
    }

    #[test]
    fn test_multiple_slots_and_negatives_sorted_by_start() {
        let spans = find_matches(
            "alpha beta gamma",
            &[slot("gamma", "#ffee58"), slot("alpha", "#f48fb1")],
            &["beta".to_string()],
        );
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[1].start, 6);
        assert_eq!(spans[2].start, 11);
        assert_eq!(spans[1].kind, MatchKind::Negative);
    }

    #[test]
    fn test_slot_origin_default_is_manual() {
        let parsed: KeywordSlot =
            serde_json::from_str(r##"{"keyword": "cat", "color": "#ffee58"}"##).unwrap();
        assert_eq!(parsed.origin, SlotOrigin::Manual);
    }
}
