//! HighlightConductor - owns highlight state and runs scan passes
//!
//! Single coordinator per page context. Holds the only mutable copy of the
//! keyword/negative state, replaces it wholesale on every update, and runs
//! the clear → walk → match → apply pipeline as one synchronous pass. A
//! phase machine over {Idle, Scanning} documents that exactly one scan runs
//! at a time; re-entrant triggers are coalesced by the quiet-period debounce,
//! never queued.

use instant::Instant;
use serde::{Deserialize, Serialize};

use crate::dom::{NodeId, PageModel};
use crate::engine::matcher::{KeywordMatcher, KeywordSlot};
use crate::engine::observer::{added_nodes_are_genuine, QuietPeriod};
use crate::engine::rewriter::{apply_matches, remove_all_markers};
use crate::engine::walker::collect_text_segments;
use crate::search::{derive_auto_slots, extract_search_query, is_search_url, parse_query_words};
use crate::settings::{self, Settings, SettingsStore};

// =============================================================================
// Types
// =============================================================================

/// Everything the engine currently looks for. Replaced wholesale on each
/// update; scans always read a consistent snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HighlightState {
    pub slots: Vec<KeywordSlot>,
    pub negatives: Vec<String>,
    pub enabled: bool,
}

impl HighlightState {
    /// True when anything at all could match
    pub fn has_patterns(&self) -> bool {
        self.slots.iter().any(|slot| !slot.is_inert())
            || self.negatives.iter().any(|neg| !neg.trim().is_empty())
    }

    /// True when the user typed at least one of the active slots
    pub fn has_manual_slots(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.origin == crate::engine::matcher::SlotOrigin::Manual && !slot.is_inert())
    }
}

/// Statistics for one scan pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub highlight_matches: usize,
    pub negative_matches: usize,
    pub segments_scanned: usize,
    pub segments_marked: usize,
    pub scan_time_us: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Scanning,
}

// =============================================================================
// HighlightConductor
// =============================================================================

pub struct HighlightConductor {
    state: HighlightState,
    matcher: KeywordMatcher,
    quiet: QuietPeriod,
    /// Auto-derived slot set kept aside for the mutation re-scan fallback
    auto_slots: Vec<KeywordSlot>,
    /// Auto-derived words cached for pages visited from a search
    auto_keywords: Vec<String>,
    last_query: Option<String>,
    auto_enabled: bool,
    phase: Phase,
    last_outcome: Option<ScanOutcome>,
}

impl HighlightConductor {
    pub fn new() -> Self {
        Self {
            state: HighlightState::default(),
            matcher: KeywordMatcher::empty(),
            quiet: QuietPeriod::new(),
            auto_slots: Vec::new(),
            auto_keywords: Vec::new(),
            last_query: None,
            auto_enabled: true,
            phase: Phase::Idle,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> &HighlightState {
        &self.state
    }

    /// Current phase name (for debugging)
    pub fn phase_name(&self) -> &'static str {
        match self.phase {
            Phase::Idle => "idle",
            Phase::Scanning => "scanning",
        }
    }

    pub fn last_outcome(&self) -> Option<&ScanOutcome> {
        self.last_outcome.as_ref()
    }

    /// Replace the highlight state wholesale and bring the page in line with
    /// it. Disabled state or nothing to match clears every marker and
    /// reports zero; otherwise a full scan pass runs. The returned count is
    /// highlight matches only, negatives are applied but not counted.
    pub fn set_state(
        &mut self,
        page: &mut PageModel,
        slots: Vec<KeywordSlot>,
        negatives: Vec<String>,
        enabled: bool,
    ) -> usize {
        let slots: Vec<KeywordSlot> = slots.into_iter().filter(|s| !s.is_inert()).collect();
        self.state = HighlightState {
            slots,
            negatives,
            enabled,
        };
        self.matcher = KeywordMatcher::build(&self.state.slots, &self.state.negatives);
        // A pending re-scan belongs to the replaced state
        self.quiet.cancel();

        if !self.state.enabled || !self.state.has_patterns() {
            self.clear(page);
            return 0;
        }
        self.scan_page(page).highlight_matches
    }

    /// Apply a freshly loaded/changed settings blob. Mirrors the change
    /// notification path: enabled settings replace the state and re-scan;
    /// disabled settings clear the page (the host may follow up with
    /// [`auto_highlight`](Self::auto_highlight)).
    pub fn apply_settings(&mut self, page: &mut PageModel, config: &Settings) -> usize {
        self.auto_enabled = config.auto_highlight;
        if config.enabled {
            self.set_state(page, config.slots.clone(), config.negatives.clone(), true)
        } else {
            self.clear(page);
            0
        }
    }

    /// Remove every marker without touching the configured state
    pub fn clear(&mut self, page: &mut PageModel) {
        self.quiet.cancel();
        let root = page.root();
        remove_all_markers(page, root);
    }

    /// One full scan pass: clear, snapshot segments, match, apply
    pub fn scan_page(&mut self, page: &mut PageModel) -> ScanOutcome {
        self.phase = Phase::Scanning;
        let start = Instant::now();
        let root = page.root();

        remove_all_markers(page, root);

        let mut outcome = ScanOutcome::default();
        // Fully materialized before the first mutation: rewriting during
        // traversal would invalidate the walk
        let segments = collect_text_segments(page, root);
        outcome.segments_scanned = segments.len();

        for segment in &segments {
            if !self.matcher.may_contain(&segment.text) {
                continue;
            }
            let spans = self.matcher.scan(&segment.text);
            if spans.is_empty() {
                continue;
            }
            outcome.highlight_matches += spans.iter().filter(|s| s.is_highlight()).count();
            outcome.negative_matches += spans.iter().filter(|s| !s.is_highlight()).count();
            outcome.segments_marked += 1;
            apply_matches(page, segment.node, &spans);
        }

        outcome.scan_time_us = start.elapsed().as_micros() as u64;
        self.phase = Phase::Idle;
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    /// A page mutation was observed. Ignored when there is nothing to match
    /// or when the additions are only the engine's own marker wrappers;
    /// otherwise the quiet period restarts from `now`.
    pub fn on_content_mutated(&mut self, page: &PageModel, added: &[NodeId], now: Instant) {
        if !self.state.has_patterns() && self.auto_slots.is_empty() {
            return;
        }
        if !added_nodes_are_genuine(page, added) {
            return;
        }
        self.quiet.note(now);
    }

    /// Run the debounced re-scan if its quiet period has elapsed. Auto slots
    /// stand in when no slots are active (content kept streaming in after
    /// the auto-derived set was built).
    pub fn poll(&mut self, page: &mut PageModel, now: Instant) -> Option<usize> {
        if !self.quiet.fire(now) {
            return None;
        }
        if self.state.slots.is_empty() && !self.auto_slots.is_empty() {
            self.state.slots = self.auto_slots.clone();
            self.matcher = KeywordMatcher::build(&self.state.slots, &self.state.negatives);
        }
        Some(self.scan_page(page).highlight_matches)
    }

    /// True while a debounced re-scan is waiting for its quiet period
    pub fn rescan_pending(&self) -> bool {
        self.quiet.pending()
    }

    /// Derive slots from the current search query and scan with them.
    ///
    /// On a search page the query is extracted and cached; a changed query
    /// while manually entered slots are active means a new search, so the
    /// stale keyword set is dropped and the cleared blob written back
    /// best-effort. Words travel to non-search pages through the store.
    /// Manual slots always win: the auto flow backs off entirely.
    /// Returns the highlight count of the scan it ran, if any.
    pub fn auto_highlight(
        &mut self,
        page: &mut PageModel,
        store: &mut dyn SettingsStore,
    ) -> Option<usize> {
        if !self.auto_enabled {
            return None;
        }

        let mut words: Vec<String> = Vec::new();
        if is_search_url(&page.url) {
            let query = extract_search_query(&page.url).unwrap_or_default();

            if !query.is_empty()
                && self.last_query.as_deref() != Some(query.as_str())
                && self.state.has_manual_slots()
            {
                // New search supersedes the previous keyword set
                self.state.slots.clear();
                self.state.negatives.clear();
                self.matcher = KeywordMatcher::empty();
                settings::clear_keyword_state(store);
            }
            self.last_query = Some(query.clone());

            words = parse_query_words(&query);
            if !words.is_empty() {
                self.auto_keywords = words.clone();
                settings::save_auto_keywords(store, &words);
            }
        } else if !self.auto_keywords.is_empty() {
            words = self.auto_keywords.clone();
        } else {
            words = settings::load_auto_keywords(store);
            self.auto_keywords = words.clone();
        }

        if self.state.has_manual_slots() {
            self.auto_slots.clear();
            return None;
        }
        if words.is_empty() {
            self.auto_slots.clear();
            return None;
        }

        let slots = derive_auto_slots(&words);
        self.auto_slots = slots.clone();
        self.state.slots = slots;
        self.matcher = KeywordMatcher::build(&self.state.slots, &self.state.negatives);
        Some(self.scan_page(page).highlight_matches)
    }
}

impl Default for HighlightConductor {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn slot(keyword: &str, color: &str) -> KeywordSlot {
        KeywordSlot::manual(keyword, color)
    }

    /// body > (p > "the cat sat", div > "a CAT nap", script > "cat()")
    fn sample_page() -> PageModel {
        let mut page = PageModel::new();
        let root = page.root();
        let p = page.element("p");
        let t1 = page.text("the cat sat");
        let div = page.element("div");
        let t2 = page.text("a CAT nap");
        let script = page.element("script");
        let t3 = page.text("cat()");
        page.append_child(root, p);
        page.append_child(p, t1);
        page.append_child(root, div);
        page.append_child(div, t2);
        page.append_child(root, script);
        page.append_child(script, t3);
        page
    }

    #[test]
    fn test_full_scan_counts_highlights_only() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        let count = conductor.set_state(
            &mut page,
            vec![slot("cat", "#ffee58")],
            vec!["sat".to_string()],
            true,
        );

        // Two prose "cat"s; the script one is skipped; "sat" marks but is
        // not counted
        assert_eq!(count, 2);
        let outcome = conductor.last_outcome().unwrap();
        assert_eq!(outcome.negative_matches, 1);
        assert_eq!(outcome.segments_marked, 2);
        assert_eq!(page.collect_markers(page.root()).len(), 3);
    }

    #[test]
    fn test_empty_state_clears_and_reports_zero() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        conductor.set_state(&mut page, vec![slot("cat", "#ffee58")], vec![], true);
        assert!(!page.collect_markers(page.root()).is_empty());

        let count = conductor.set_state(&mut page, vec![], vec![], true);
        assert_eq!(count, 0);
        assert!(page.collect_markers(page.root()).is_empty());
    }

    #[test]
    fn test_disabled_state_clears_regardless_of_slots() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        conductor.set_state(&mut page, vec![slot("cat", "#ffee58")], vec![], true);

        let count = conductor.set_state(&mut page, vec![slot("cat", "#ffee58")], vec![], false);
        assert_eq!(count, 0);
        assert!(page.collect_markers(page.root()).is_empty());
    }

    #[test]
    fn test_repeated_scans_are_idempotent() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        let slots = vec![slot("cat", "#ffee58")];

        let first = conductor.set_state(&mut page, slots.clone(), vec![], true);
        let markers_after_first = page.collect_markers(page.root()).len();
        let second = conductor.set_state(&mut page, slots, vec![], true);

        assert_eq!(first, second);
        assert_eq!(page.collect_markers(page.root()).len(), markers_after_first);
        assert_eq!(page.text_content(page.root()), "the cat sata CAT napcat()");
    }

    #[test]
    fn test_inert_slots_are_dropped_on_replace() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        let count = conductor.set_state(
            &mut page,
            vec![slot("  ", "#ffee58"), slot("cat", "#f48fb1")],
            vec![],
            true,
        );
        assert_eq!(count, 2);
        assert_eq!(conductor.state().slots.len(), 1);
    }

    #[test]
    fn test_mutation_debounce_coalesces() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        conductor.set_state(&mut page, vec![slot("cat", "#ffee58")], vec![], true);

        // New content arrives in three bursts 50ms apart
        let added = {
            let div = page.element("div");
            let text = page.text("another cat appears");
            let root = page.root();
            page.append_child(root, div);
            page.append_child(div, text);
            vec![div]
        };

        let start = Instant::now();
        conductor.on_content_mutated(&page, &added, start);
        conductor.on_content_mutated(&page, &added, start + ms(50));
        conductor.on_content_mutated(&page, &added, start + ms(100));

        assert_eq!(conductor.poll(&mut page, start + ms(150)), None);
        let count = conductor.poll(&mut page, start + ms(250));
        assert_eq!(count, Some(3), "one scan, covering the new content");
        assert_eq!(conductor.poll(&mut page, start + ms(400)), None);
    }

    #[test]
    fn test_marker_only_mutations_do_not_schedule() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        conductor.set_state(&mut page, vec![slot("cat", "#ffee58")], vec![], true);

        let markers = page.collect_markers(page.root());
        conductor.on_content_mutated(&page, &markers, Instant::now());
        assert!(!conductor.rescan_pending());
    }

    #[test]
    fn test_mutations_without_patterns_are_ignored() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        let div = page.element("div");
        let root = page.root();
        page.append_child(root, div);

        conductor.on_content_mutated(&page, &[div], Instant::now());
        assert!(!conductor.rescan_pending());
    }

    #[test]
    fn test_auto_highlight_from_search_page() {
        let mut page = sample_page();
        page.url = "https://www.google.com/search?q=cat+-tutorial".to_string();
        let mut store = MemoryStore::new();
        let mut conductor = HighlightConductor::new();

        let count = conductor.auto_highlight(&mut page, &mut store);
        assert_eq!(count, Some(2));
        assert_eq!(conductor.state().slots.len(), 1);
        assert_eq!(
            conductor.state().slots[0].origin,
            crate::engine::matcher::SlotOrigin::AutoDerived
        );
        assert_eq!(
            settings::load_auto_keywords(&store),
            vec!["cat".to_string()],
            "words persisted for visited pages"
        );
    }

    #[test]
    fn test_auto_highlight_reuses_cache_on_visited_page() {
        let mut page = sample_page();
        page.url = "https://example.com/article".to_string();
        let mut store = MemoryStore::new();
        settings::save_auto_keywords(&mut store, &["cat".to_string()]);

        let mut conductor = HighlightConductor::new();
        let count = conductor.auto_highlight(&mut page, &mut store);
        assert_eq!(count, Some(2));
    }

    #[test]
    fn test_auto_highlight_backs_off_for_manual_slots() {
        let mut page = sample_page();
        page.url = "https://example.com/article".to_string();
        let mut store = MemoryStore::new();
        settings::save_auto_keywords(&mut store, &["cat".to_string()]);

        let mut conductor = HighlightConductor::new();
        conductor.set_state(&mut page, vec![slot("sat", "#ffee58")], vec![], true);
        assert_eq!(conductor.auto_highlight(&mut page, &mut store), None);
        assert_eq!(conductor.state().slots[0].keyword, "sat");
    }

    #[test]
    fn test_new_search_clears_manual_keyword_state() {
        let mut page = sample_page();
        page.url = "https://www.google.com/search?q=fresh+terms".to_string();
        let mut store = MemoryStore::new();
        let mut persisted = Settings::default();
        persisted.enabled = true;
        persisted.slots = vec![slot("stale", "#ffee58")];
        persisted.negatives = vec!["old".to_string()];
        settings::save_settings(&mut store, &persisted);

        let mut conductor = HighlightConductor::new();
        conductor.set_state(
            &mut page,
            vec![slot("stale", "#ffee58")],
            vec!["old".to_string()],
            true,
        );

        conductor.auto_highlight(&mut page, &mut store);

        // The manual set was superseded and the cleared blob written back
        let cleared = settings::load_settings(&store);
        assert!(cleared.slots.is_empty());
        assert!(cleared.negatives.is_empty());
        assert!(conductor.state().slots.iter().all(|s| {
            s.origin == crate::engine::matcher::SlotOrigin::AutoDerived
        }));
    }

    #[test]
    fn test_same_query_keeps_manual_slots() {
        let mut page = sample_page();
        page.url = "https://www.google.com/search?q=cat".to_string();
        let mut store = MemoryStore::new();

        let mut conductor = HighlightConductor::new();
        // First visit caches the query with no manual slots in the way
        conductor.auto_highlight(&mut page, &mut store);

        // Manual slots arrive, then the same query is seen again
        conductor.set_state(&mut page, vec![slot("sat", "#ffee58")], vec![], true);
        assert_eq!(conductor.auto_highlight(&mut page, &mut store), None);
        assert_eq!(conductor.state().slots[0].keyword, "sat");
    }

    #[test]
    fn test_auto_highlight_disabled_does_nothing() {
        let mut page = sample_page();
        page.url = "https://www.google.com/search?q=cat".to_string();
        let mut store = MemoryStore::new();

        let mut conductor = HighlightConductor::new();
        let mut config = Settings::default();
        config.auto_highlight = false;
        conductor.apply_settings(&mut page, &config);

        assert_eq!(conductor.auto_highlight(&mut page, &mut store), None);
        assert!(page.collect_markers(page.root()).is_empty());
    }

    #[test]
    fn test_apply_settings_enabled_scans() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        let mut config = Settings::default();
        config.enabled = true;
        config.slots = vec![slot("cat", "#ffee58")];

        assert_eq!(conductor.apply_settings(&mut page, &config), 2);

        config.enabled = false;
        assert_eq!(conductor.apply_settings(&mut page, &config), 0);
        assert!(page.collect_markers(page.root()).is_empty());
    }

    #[test]
    fn test_phase_returns_to_idle() {
        let mut page = sample_page();
        let mut conductor = HighlightConductor::new();
        assert_eq!(conductor.phase_name(), "idle");
        conductor.set_state(&mut page, vec![slot("cat", "#ffee58")], vec![], true);
        assert_eq!(conductor.phase_name(), "idle");
    }
}
