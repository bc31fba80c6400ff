//! MarkCore: Keyword Highlight Engine
//!
//! A Rust/WASM implementation of the browser-extension highlight pipeline:
//! scan a page's visible text for configured keywords and negative terms,
//! resolve overlapping matches deterministically, and rewrite the tree with
//! marker wrappers without ever corrupting content or stacking wrappers on
//! re-application.
//!
//! # Architecture
//!
//! ## Engine
//! - `engine/matcher.rs` - KeywordMatcher: escaped-literal, case-insensitive
//!   matching with greedy leftmost overlap resolution
//! - `engine/walker.rs` - Text segment enumeration (visible prose only)
//! - `engine/rewriter.rs` - Marker materialization and its inverse
//! - `engine/conductor.rs` - HighlightConductor: state ownership, scan
//!   passes, debounced mutation re-scans, auto-keyword flow
//! - `engine/observer.rs` - Mutation gating + quiet-period debounce
//! - `engine/color.rs` - hex to rgba conversion, auto-highlight palette
//! - `engine/core.rs` - MarkerEngine: per-segment WASM facade
//!
//! ## Collaborators
//! - `dom/` - PageModel: arena-backed page tree the engine rewrites
//! - `search/` - Search-page detection, query extraction, auto slots
//! - `settings.rs` - Settings blob + best-effort key-value store seam
//! - `messages.rs` - highlight / getPageInfo contract + delivery retry
//! - `strategy/` - Theme to keywords via a text-generation provider
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { MarkerEngine } from 'markcore';
//!
//! await init();
//! const engine = new MarkerEngine();
//! engine.setState(
//!   [{ keyword: 'rust', color: '#ffee58' }],
//!   ['sponsored'],
//!   true
//! );
//!
//! // Per text node: ask for the render plan and materialize it
//! const parts = engine.segmentParts(node.textContent);
//! // [{ part: 'plain', text: '...' },
//! //  { part: 'marked', text: 'rust', class: 'highlight', style: '...' }]
//! ```

pub mod dom;
pub mod engine;
pub mod messages;
pub mod search;
pub mod settings;
pub mod strategy;

pub use dom::{MarkerClass, NodeData, NodeId, PageModel};
pub use engine::*;
pub use messages::{deliver, handle_request, ContentChannel, EngineRequest, EngineResponse};
pub use search::{derive_auto_slots, extract_search_query, parse_query_words, PageInfo};
pub use settings::{Settings, SettingsStore};
pub use strategy::{generate_strategy, ApiCredentials, ProviderKind, Strategy};

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("markcore v{}", env!("CARGO_PKG_VERSION"))
}
