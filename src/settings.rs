//! Settings blob and key-value configuration store
//!
//! The extension keeps everything in a handful of opaque JSON values under
//! well-known keys. The engine reads the settings blob on initialization and
//! on every change notification, and writes back only two things: the cached
//! auto-keyword list and a cleared slots/negatives blob when a new search is
//! detected. All store traffic is best-effort: a torn-down or failing store
//! degrades to defaults and the engine keeps operating on last-known
//! in-memory state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::engine::matcher::KeywordSlot;
use crate::strategy::ApiCredentials;

// =============================================================================
// Keys
// =============================================================================

/// Settings blob: slots, negatives, toggles, preset
pub const SETTINGS_KEY: &str = "markcore_settings";
/// Last search query seen by the background host
pub const LAST_QUERY_KEY: &str = "markcore_last_query";
/// Auto-derived keyword list, reused on pages visited from a search
pub const AUTO_KEYWORDS_KEY: &str = "markcore_auto_keywords";
/// Text-generation provider credentials
pub const API_CREDENTIALS_KEY: &str = "markcore_api";
/// Custom strategy prompt template
pub const PROMPT_KEY: &str = "markcore_prompt";

// =============================================================================
// Settings blob
// =============================================================================

fn default_true() -> bool {
    true
}

/// The persisted settings blob, camelCase on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub slots: Vec<KeywordSlot>,
    #[serde(default)]
    pub negatives: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub auto_highlight: bool,
    #[serde(default = "default_true")]
    pub use_negatives_in_search: bool,
    #[serde(default)]
    pub preset: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            negatives: Vec::new(),
            enabled: false,
            auto_highlight: true,
            use_negatives_in_search: true,
            preset: None,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed value for {key}: {message}")]
    Malformed { key: String, message: String },
}

/// Async key-value storage as seen from the engine: get/set/remove of opaque
/// JSON values. Hosts adapt their own storage (chrome.storage, files, ...)
/// behind this seam; the engine never assumes a call can't fail.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// HashMap-backed store for native hosts and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

// =============================================================================
// Best-effort typed access
// =============================================================================

fn load<T: serde::de::DeserializeOwned>(store: &dyn SettingsStore, key: &str) -> Option<T> {
    let value = store.get(key).ok()??;
    serde_json::from_value(value).ok()
}

fn save<T: Serialize>(store: &mut dyn SettingsStore, key: &str, value: &T) -> bool {
    match serde_json::to_value(value) {
        Ok(json) => store.set(key, json).is_ok(),
        Err(_) => false,
    }
}

/// Current settings blob, or defaults when the store fails or is empty
pub fn load_settings(store: &dyn SettingsStore) -> Settings {
    load(store, SETTINGS_KEY).unwrap_or_default()
}

pub fn save_settings(store: &mut dyn SettingsStore, settings: &Settings) -> bool {
    save(store, SETTINGS_KEY, settings)
}

pub fn load_auto_keywords(store: &dyn SettingsStore) -> Vec<String> {
    load(store, AUTO_KEYWORDS_KEY).unwrap_or_default()
}

pub fn save_auto_keywords(store: &mut dyn SettingsStore, words: &[String]) -> bool {
    save(store, AUTO_KEYWORDS_KEY, &words)
}

pub fn load_last_query(store: &dyn SettingsStore) -> Option<String> {
    load(store, LAST_QUERY_KEY)
}

pub fn save_last_query(store: &mut dyn SettingsStore, query: &str) -> bool {
    save(store, LAST_QUERY_KEY, &query)
}

/// Provider credentials, if configured
pub fn load_credentials(store: &dyn SettingsStore) -> Option<ApiCredentials> {
    load(store, API_CREDENTIALS_KEY)
}

/// Custom strategy prompt template, if one was saved
pub fn load_prompt_template(store: &dyn SettingsStore) -> Option<String> {
    load(store, PROMPT_KEY)
}

/// Clear slots and negatives while keeping every other setting. Used when a
/// new search supersedes the previous keyword set.
pub fn clear_keyword_state(store: &mut dyn SettingsStore) -> bool {
    let mut settings = load_settings(store);
    settings.slots = Vec::new();
    settings.negatives = Vec::new();
    save_settings(store, &settings)
}

// =============================================================================
// Tests
// =============================================================================
