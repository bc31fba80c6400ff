//! AI keyword strategy collaborator
//!
//! Given a free-text theme, a text-generation provider proposes up to eight
//! keywords and a set of negative terms. The HTTP transport is an external
//! seam the host supplies; this module owns everything around it: prompt
//! templating, per-provider request shapes, response-text extraction, and
//! tolerant JSON parsing (providers love wrapping JSON in markdown fences).
//!
//! One attempt per user request, no retry. Every failure maps to a
//! [`StrategyError`] the caller renders as a status message; nothing here
//! can take the highlighting pipeline down.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

// =============================================================================
// Types
// =============================================================================

/// Supported text-generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Claude,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    /// Model used when the credentials carry none
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude-3-5-haiku-20241022",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Gemini => "gemini-2.0-flash",
        }
    }
}

/// Provider credentials as persisted in the configuration store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCredentials {
    pub provider: ProviderKind,
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl ApiCredentials {
    fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }
}

/// What the provider proposes. Missing fields are empty lists, not errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub negatives: Vec<String>,
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("no API key configured")]
    MissingCredentials,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("no JSON object in response")]
    NoJson,
    #[error("malformed strategy payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("provider returned no keywords")]
    Empty,
}

/// One outbound HTTP call, fully assembled
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The external transport seam. Hosts adapt fetch/reqwest/whatever behind
/// it; the engine only sees the raw response body or a failure.
pub trait HttpTransport {
    fn post(&self, request: &HttpRequest) -> Result<String, StrategyError>;
}

/// Keyword cap applied to every strategy
pub const MAX_STRATEGY_KEYWORDS: usize = 8;
/// How many keywords travel into the composed search query
pub const SEARCH_QUERY_KEYWORDS: usize = 4;

/// Default prompt when the store carries no custom template
pub const DEFAULT_PROMPT: &str = r#"You are an expert research strategist. Given the theme "${theme}", create a noise-filtering search strategy.

GOAL: Help the user find high-quality, relevant content by selecting keywords that surface expert sources and excluding terms that pollute results with commercial, shallow, or off-topic content.

LANGUAGE RULE: Detect the theme's language and generate ALL output in that SAME language.

Return ONLY valid JSON:
{
  "keywords": ["kw1", "kw2", "kw3", "kw4", "kw5", "kw6", "kw7", "kw8"],
  "negatives": ["exclude1", "exclude2", "exclude3", "exclude4", "exclude5"]
}

KEYWORDS (8 total): core theme + synonym, practical terms real people use, quality signals (white paper, research, analysis), freshness or persona terms when the theme is trend-sensitive.

NEGATIVES (5 required): the specific noise polluting "${theme}" results - shopping sites, adjacent fields sharing terminology, job listings, wrong-depth tutorials, noisy platforms.

IMPORTANT: Return words WITHOUT minus signs. The system adds them automatically.
Ensure output is strictly valid JSON. No text before or after the JSON block."#;

// =============================================================================
// Prompt and request building
// =============================================================================

/// Substitute the theme into a prompt template
pub fn render_prompt(template: &str, theme: &str) -> String {
    template.replace("${theme}", theme)
}

/// Assemble the provider-specific request for one prompt
pub fn build_request(credentials: &ApiCredentials, prompt: &str) -> HttpRequest {
    let model = credentials.model();
    match credentials.provider {
        ProviderKind::Claude => HttpRequest {
            url: "https://api.anthropic.com/v1/messages".to_string(),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("x-api-key".to_string(), credentials.api_key.clone()),
                ("anthropic-version".to_string(), "2023-06-01".to_string()),
                (
                    "anthropic-dangerous-direct-browser-access".to_string(),
                    "true".to_string(),
                ),
            ],
            body: json!({
                "model": model,
                "max_tokens": 500,
                "messages": [{"role": "user", "content": prompt}],
            })
            .to_string(),
        },
        ProviderKind::OpenAi => HttpRequest {
            url: "https://api.openai.com/v1/chat/completions".to_string(),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", credentials.api_key),
                ),
            ],
            body: json!({
                "model": model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": 500,
            })
            .to_string(),
        },
        ProviderKind::Gemini => HttpRequest {
            url: format!(
                "https://generativelanguage.googleapis.com/v1/models/{}:generateContent?key={}",
                model, credentials.api_key
            ),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: json!({
                "contents": [{"parts": [{"text": prompt}]}],
            })
            .to_string(),
        },
    }
}

/// Pull the generated text out of a provider response body. Anything that
/// does not parse or lacks the expected path degrades to an empty JSON
/// object, which downstream treats as "no keywords".
fn response_text(provider: ProviderKind, raw: &str) -> String {
    let value: Value = serde_json::from_str(raw).unwrap_or(Value::Null);
    let text = match provider {
        ProviderKind::Claude => value.pointer("/content/0/text"),
        ProviderKind::OpenAi => value.pointer("/choices/0/message/content"),
        ProviderKind::Gemini => value.pointer("/candidates/0/content/parts/0/text"),
    };
    text.and_then(Value::as_str).unwrap_or("{}").to_string()
}

// =============================================================================
// Response parsing
// =============================================================================

/// First well-formed JSON object region in free text: from the first `{`
/// through the last `}` (tolerates markdown fences and prose around it)
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse generated text into a strategy
pub fn parse_strategy(text: &str) -> Result<Strategy, StrategyError> {
    let object = extract_json_object(text).ok_or(StrategyError::NoJson)?;
    Ok(serde_json::from_str(object)?)
}

// =============================================================================
// Generation
// =============================================================================

/// One strategy-generation attempt: render the prompt, call the provider,
/// parse the answer. Keywords are capped; an answer without keywords is a
/// failure the caller reports, not a usable strategy.
pub fn generate_strategy(
    theme: &str,
    template: Option<&str>,
    credentials: &ApiCredentials,
    transport: &dyn HttpTransport,
) -> Result<Strategy, StrategyError> {
    if credentials.api_key.trim().is_empty() {
        return Err(StrategyError::MissingCredentials);
    }

    let prompt = render_prompt(template.unwrap_or(DEFAULT_PROMPT), theme);
    let raw = transport.post(&build_request(credentials, &prompt))?;
    let text = response_text(credentials.provider, &raw);

    let mut strategy = parse_strategy(&text)?;
    strategy.keywords.truncate(MAX_STRATEGY_KEYWORDS);
    if strategy.keywords.is_empty() {
        return Err(StrategyError::Empty);
    }
    Ok(strategy)
}

/// Compose the search query a deployed strategy opens: the first few
/// keywords, plus each negative as a `-term` when enabled. Stored negatives
/// carry no minus sign; any that do are not doubled.
pub fn build_search_query(keywords: &[String], negatives: &[String], use_negatives: bool) -> String {
    let mut terms: Vec<String> = keywords
        .iter()
        .take(SEARCH_QUERY_KEYWORDS)
        .cloned()
        .collect();
    if use_negatives {
        terms.extend(
            negatives
                .iter()
                .map(|negative| format!("-{}", negative.trim_start_matches('-'))),
        );
    }
    terms.join(" ")
}

/// Search URL for a composed query
pub fn search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("https://www.google.com/search?q={}", encoded)
}

// =============================================================================
// Tests
// =============================================================================
