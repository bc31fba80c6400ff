//! Mutation gating and quiet-period debounce
//!
//! Page mutations arrive in bursts (progressive search results, infinite
//! scroll). A re-scan fires only after a quiet period with no qualifying
//! mutation; every new qualifying mutation resets the window rather than
//! queueing work. Mutations whose added nodes are all marker wrappers are
//! the engine's own writes and never qualify.

use instant::Instant;
use std::time::Duration;

use crate::dom::{NodeId, PageModel};

/// Quiet period before a mutation-triggered re-scan
pub const QUIET_PERIOD_MS: u64 = 150;

// =============================================================================
// Mutation gating
// =============================================================================

/// True when the added nodes contain genuine new content: at least one
/// element that is not itself a marker wrapper. This is the guard that keeps
/// the engine's own DOM writes from re-triggering it.
pub fn added_nodes_are_genuine(page: &PageModel, added: &[NodeId]) -> bool {
    added
        .iter()
        .any(|&node| page.is_element(node) && !page.is_marker(node))
}

// =============================================================================
// QuietPeriod
// =============================================================================

/// Trailing-edge debounce window. The clock is always passed in, never read,
/// so hosts and tests drive it deterministically.
pub struct QuietPeriod {
    window: Duration,
    deadline: Option<Instant>,
    note_count: u64,
    fire_count: u64,
}

impl QuietPeriod {
    pub fn new() -> Self {
        Self::with_window(Duration::from_millis(QUIET_PERIOD_MS))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            note_count: 0,
            fire_count: 0,
        }
    }

    /// A qualifying event happened: restart the window from `now`
    pub fn note(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
        self.note_count += 1;
    }

    /// True while a window is pending
    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Report and clear the window if it has elapsed by `now`
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.fire_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending window without firing
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn note_count(&self) -> u64 {
        self.note_count
    }

    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }
}

impl Default for QuietPeriod {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
