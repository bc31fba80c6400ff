//! MarkerEngine - JS-facing highlight facade
//!
//! The content script owns the live DOM; Rust owns the decisions. The script
//! feeds segment text across the boundary and gets back resolved spans or a
//! ready-to-render part list (class + inline style per part), one call per
//! segment.
//!
//! # Usage (JavaScript)
//! ```javascript
//! import init, { MarkerEngine } from 'markcore';
//!
//! await init();
//! const engine = new MarkerEngine();
//! engine.setState(slots, negatives, true);
//! const parts = engine.segmentParts(textNode.textContent);
//! ```

use wasm_bindgen::prelude::*;

use crate::engine::matcher::{KeywordMatcher, KeywordSlot, MatchSpan};
use crate::engine::rewriter::{segment_parts, SegmentPart};
use crate::search::{derive_auto_slots, parse_query_words};

// ==================== MAIN IMPLEMENTATION ====================

/// Per-segment highlight facade over the compiled matcher state
#[wasm_bindgen]
pub struct MarkerEngine {
    slots: Vec<KeywordSlot>,
    negatives: Vec<String>,
    enabled: bool,
    matcher: KeywordMatcher,
}

impl MarkerEngine {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            negatives: Vec::new(),
            enabled: false,
            matcher: KeywordMatcher::empty(),
        }
    }

    /// Replace the slot/negative state wholesale and recompile the matcher
    pub fn set_state(&mut self, slots: Vec<KeywordSlot>, negatives: Vec<String>, enabled: bool) {
        self.slots = slots.into_iter().filter(|s| !s.is_inert()).collect();
        self.negatives = negatives;
        self.enabled = enabled;
        self.matcher = if enabled {
            KeywordMatcher::build(&self.slots, &self.negatives)
        } else {
            KeywordMatcher::empty()
        };
    }

    /// Resolved, non-overlapping spans for one segment
    pub fn match_segment(&self, text: &str) -> Vec<MatchSpan> {
        if !self.enabled || !self.matcher.may_contain(text) {
            return Vec::new();
        }
        self.matcher.scan(text)
    }

    /// Render plan for one segment: plain and marked runs in document order
    pub fn parts_for_segment(&self, text: &str) -> Vec<SegmentPart> {
        let spans = self.match_segment(text);
        if spans.is_empty() {
            return Vec::new();
        }
        segment_parts(text, &spans)
    }
}

impl Default for MarkerEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== WASM BINDINGS ====================

#[wasm_bindgen]
impl MarkerEngine {
    #[wasm_bindgen(constructor)]
    pub fn js_new() -> Self {
        Self::new()
    }

    /// Replace state (JS binding). Expects arrays of
    /// `{ keyword, color, origin? }` and plain strings.
    #[wasm_bindgen(js_name = setState)]
    pub fn js_set_state(
        &mut self,
        slots: JsValue,
        negatives: JsValue,
        enabled: bool,
    ) -> Result<(), JsValue> {
        let slots: Vec<KeywordSlot> = serde_wasm_bindgen::from_value(slots)
            .map_err(|e| JsValue::from_str(&format!("Invalid slots: {}", e)))?;
        let negatives: Vec<String> = serde_wasm_bindgen::from_value(negatives)
            .map_err(|e| JsValue::from_str(&format!("Invalid negatives: {}", e)))?;
        self.set_state(slots, negatives, enabled);
        Ok(())
    }

    /// Resolved spans for one segment (JS binding)
    #[wasm_bindgen(js_name = matchSegment)]
    pub fn js_match_segment(&self, text: &str) -> JsValue {
        match serde_wasm_bindgen::to_value(&self.match_segment(text)) {
            Ok(value) => value,
            Err(e) => {
                web_sys::console::error_1(
                    &format!("[MarkerEngine] Serialization failed: {:?}", e).into(),
                );
                JsValue::NULL
            }
        }
    }

    /// Render plan for one segment (JS binding)
    #[wasm_bindgen(js_name = segmentParts)]
    pub fn js_segment_parts(&self, text: &str) -> JsValue {
        match serde_wasm_bindgen::to_value(&self.parts_for_segment(text)) {
            Ok(value) => value,
            Err(e) => {
                web_sys::console::error_1(
                    &format!("[MarkerEngine] Serialization failed: {:?}", e).into(),
                );
                JsValue::NULL
            }
        }
    }

    /// Derive auto-highlight slots from a search query (JS binding)
    #[wasm_bindgen(js_name = deriveAutoSlots)]
    pub fn js_derive_auto_slots(query: &str) -> Result<JsValue, JsValue> {
        let slots = derive_auto_slots(&parse_query_words(query));
        serde_wasm_bindgen::to_value(&slots)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Engine status (JS binding)
    #[wasm_bindgen(js_name = getStatus)]
    pub fn js_get_status(&self) -> JsValue {
        let status = serde_json::json!({
            "enabled": self.enabled,
            "slot_count": self.slots.len(),
            "negative_count": self.negatives.len(),
            "pattern_count": self.matcher.pattern_count(),
        });
        JsValue::from_str(&status.to_string())
    }
}

// ==================== TESTS ====================
