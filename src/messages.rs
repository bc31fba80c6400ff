//! Cross-context request/response contract
//!
//! The engine is driven by two messages regardless of transport: `highlight`
//! replaces the keyword state and answers with a match count, `getPageInfo`
//! answers with the detected query and page identity. The wire shape matches
//! the extension messaging payloads (`action` + `data`, camelCase).
//!
//! Delivery is the host's problem, but the contract it must uphold lives
//! here: one re-injection of the engine and a single retry on failure, then
//! silent acceptance (some contexts can never host the engine).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::PageModel;
use crate::engine::conductor::HighlightConductor;
use crate::engine::matcher::KeywordSlot;
use crate::search::{self, PageInfo};

// =============================================================================
// Types
// =============================================================================

/// Requests the engine answers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum EngineRequest {
    #[serde(rename_all = "camelCase")]
    Highlight {
        slots: Vec<KeywordSlot>,
        negatives: Vec<String>,
        enabled: bool,
    },
    GetPageInfo,
}

/// Responses, one per request kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineResponse {
    #[serde(rename_all = "camelCase")]
    MatchCount { match_count: usize },
    PageInfo(PageInfo),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("content context not ready: {0}")]
    NotReady(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("injection refused: {0}")]
    InjectionRefused(String),
}

// =============================================================================
// Dispatch
// =============================================================================

/// Answer one request against a page context
pub fn handle_request(
    conductor: &mut HighlightConductor,
    page: &mut PageModel,
    request: EngineRequest,
) -> EngineResponse {
    match request {
        EngineRequest::Highlight {
            slots,
            negatives,
            enabled,
        } => EngineResponse::MatchCount {
            match_count: conductor.set_state(page, slots, negatives, enabled),
        },
        EngineRequest::GetPageInfo => EngineResponse::PageInfo(search::page_info(page)),
    }
}

// =============================================================================
// Delivery contract
// =============================================================================

/// A transport to one page context: send a request, or (re-)inject the
/// engine into the context when it is not listening yet.
pub trait ContentChannel {
    fn send(&mut self, request: &EngineRequest) -> Result<EngineResponse, ChannelError>;
    fn inject(&mut self) -> Result<(), ChannelError>;
}

/// Deliver a request with the one-shot recovery the host owes the engine:
/// on failure, inject once and retry once. A context that refuses injection
/// (privileged pages) or fails the retry is silently given up on.
pub fn deliver(
    channel: &mut dyn ContentChannel,
    request: &EngineRequest,
) -> Option<EngineResponse> {
    match channel.send(request) {
        Ok(response) => Some(response),
        Err(_) => {
            if channel.inject().is_err() {
                return None;
            }
            channel.send(request).ok()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
