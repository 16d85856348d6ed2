use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

const EXCERPT_CHARS: usize = 2000;

/// Backend failure with enough context to debug a bad reply after the fact.
///
/// Callers reach it through `anyhow::Error::downcast_ref`.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    /// `http`, `empty_text` or `parse`.
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    pub fn http(provider: Provider, status: reqwest::StatusCode, body: String) -> Self {
        Self {
            provider,
            stage: "http",
            detail: format!("status={status}"),
            raw_response_json: serde_json::from_str(&body).ok(),
            raw_output: Some(body),
        }
    }

    pub fn empty_text(provider: Provider, response: Value) -> Self {
        Self {
            provider,
            stage: "empty_text",
            detail: "response contained no text blocks".to_string(),
            raw_output: None,
            raw_response_json: Some(response),
        }
    }

    pub fn parse(provider: Provider, detail: String, text: String, response: Value) -> Self {
        Self {
            provider,
            stage: "parse",
            detail,
            raw_output: Some(text),
            raw_response_json: Some(response),
        }
    }

    /// Head of the raw output, bounded for log lines.
    pub fn raw_excerpt(&self) -> Option<&str> {
        let raw = self.raw_output.as_deref()?;
        Some(match raw.char_indices().nth(EXCERPT_CHARS) {
            Some((idx, _)) => &raw[..idx],
            None => raw,
        })
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} backend failed at {}: {}", self.provider, self.stage, self.detail)
    }
}

impl std::error::Error for LlmDiagnosticsError {}
