//! Completion client for OpenAI-compatible chat APIs (Groq by default).
//!
//! [`CompletionClient`] is the seam the session talks to; tests substitute
//! their own implementation. [`OpenAICompatClient`] speaks the wire format:
//!
//! - `GET {base_url}/models` → `data[].id`
//! - `POST {base_url}/chat/completions` → `choices[0].message.content`
//!
//! Failures are mapped onto distinct [`RagError`] variants and are never
//! retried here: a rate-limit or outage reaches the caller unchanged.

use std::time::Duration;

use async_trait::async_trait;
use athena_rag_core::{RagError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::http::{build_client, invalid_response, status_error, transport_error};

/// One chat message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionParams {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A hosted text-generation service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Model identifiers offered by the provider, sorted ascending.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Run one completion; the answer is trimmed, and an absent answer is `""`.
    async fn complete(&self, messages: &[ChatMessage], params: &CompletionParams)
        -> Result<String>;
}

/// HTTP client for any OpenAI-compatible endpoint.
pub struct OpenAICompatClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAICompatClient {
    /// Build from config, reading the key from `config.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                RagError::Authentication(format!(
                    "{} environment variable not set",
                    config.api_key_env
                ))
            })?;
        Self::with_api_key(&config.base_url, api_key, config.timeout())
    }

    pub fn with_api_key(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            client: build_client(timeout)?,
        })
    }

    /// Check the status, decode the body, and hand it to `parse`.
    ///
    /// An undecodable body or a `parse` failure is an
    /// [`RagError::ApiStatus`] carrying the response status.
    async fn read_json<T>(
        &self,
        response: std::result::Result<reqwest::Response, reqwest::Error>,
        operation: &'static str,
        parse: impl FnOnce(&serde_json::Value) -> std::result::Result<T, String>,
    ) -> Result<T> {
        let response = response.map_err(|e| transport_error(e, operation, self.timeout))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = status_error(status, &body);
            warn!(operation, status = status.as_u16(), error = %err, "provider returned an error");
            return Err(err);
        }
        let json: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                invalid_response(status, operation, e)
            } else {
                transport_error(e, operation, self.timeout)
            }
        })?;
        parse(&json).map_err(|detail| invalid_response(status, operation, detail))
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatClient {
    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await;
        let models = self
            .read_json(response, "model listing", parse_models)
            .await?;
        debug!(count = models.len(), "listed models");
        Ok(models)
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String> {
        let body = serde_json::json!({
            "model": params.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;
        self.read_json(response, "completion", |json| Ok(parse_completion(json)))
            .await
    }
}

fn parse_models(json: &serde_json::Value) -> std::result::Result<Vec<String>, String> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| "missing data array".to_string())?;
    let mut ids: Vec<String> = data
        .iter()
        .filter_map(|m| m.get("id").and_then(|id| id.as_str()))
        .map(str::to_string)
        .collect();
    ids.sort();
    ids.dedup();
    Ok(ids)
}

fn parse_completion(json: &serde_json::Value) -> String {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .unwrap_or_default()
}

/// `preferred` if the provider offers it, otherwise the first listed model.
///
/// An empty list keeps `preferred`; the completion call will report it.
pub fn choose_model(preferred: &str, available: &[String]) -> String {
    if available.is_empty() || available.iter().any(|m| m == preferred) {
        preferred.to_string()
    } else {
        available[0].clone()
    }
}

/// Body of the first fenced code block in `answer`, or the trimmed answer
/// when it has no fence.
pub fn extract_sql(answer: &str) -> String {
    let Some(open) = answer.find("```") else {
        return answer.trim().to_string();
    };
    let after_fence = &answer[open + 3..];
    // Skip the info string (e.g. "sql") up to the end of the fence line.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(after_fence.len());
    let body = &after_fence[body_start..];
    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_models_sorted() {
        let json = serde_json::json!({
            "object": "list",
            "data": [
                {"id": "openai/gpt-oss-120b"},
                {"id": "llama-3.3-70b-versatile"},
                {"id": "gemma2-9b-it"},
            ]
        });
        assert_eq!(
            parse_models(&json).unwrap(),
            vec![
                "gemma2-9b-it".to_string(),
                "llama-3.3-70b-versatile".to_string(),
                "openai/gpt-oss-120b".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_models_missing_data() {
        let err = parse_models(&serde_json::json!({"object": "list"})).unwrap_err();
        assert_eq!(err, "missing data array");
    }

    #[test]
    fn test_parse_completion_trims() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  \n```sql\nSELECT 1;\n```\n "}}]
        });
        assert_eq!(parse_completion(&json), "```sql\nSELECT 1;\n```");
    }

    #[test]
    fn test_parse_completion_missing_content_is_empty() {
        assert_eq!(parse_completion(&serde_json::json!({"choices": []})), "");
        assert_eq!(
            parse_completion(&serde_json::json!({"choices": [{"message": {"content": null}}]})),
            ""
        );
    }

    #[test]
    fn test_choose_model() {
        let available = vec!["a-model".to_string(), "b-model".to_string()];
        assert_eq!(choose_model("b-model", &available), "b-model");
        assert_eq!(choose_model("gone", &available), "a-model");
        assert_eq!(choose_model("gone", &[]), "gone");
    }

    #[test]
    fn test_extract_sql_fenced() {
        let answer = "Here you go:\n```sql\nSELECT *\nFROM customers;\n```\nEnjoy";
        assert_eq!(extract_sql(answer), "SELECT *\nFROM customers;");
    }

    #[test]
    fn test_extract_sql_unfenced_and_unterminated() {
        assert_eq!(extract_sql("  SELECT 1;  "), "SELECT 1;");
        assert_eq!(extract_sql("```\nSELECT 2;"), "SELECT 2;");
    }

    #[test]
    fn test_missing_api_key_is_authentication_error() {
        let config = LlmConfig {
            api_key_env: "ATHENA_RAG_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            OpenAICompatClient::new(&config),
            Err(RagError::Authentication(_))
        ));
    }
}
