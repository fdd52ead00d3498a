//! Ollama Client - the default `Oracle` backend

use crate::llm::oracle::Oracle;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Ollama API client
pub struct OllamaOracle {
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: String,
    stream: bool,
    format: &'static str, // JSON format for structured output
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
}

impl OllamaOracle {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for OllamaOracle {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
impl Oracle for OllamaOracle {
    async fn complete(&self, system: &str, payload: &serde_json::Value) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = OllamaRequest {
            model: &self.model,
            system,
            prompt: serde_json::to_string_pretty(payload).context("Failed to encode oracle payload")?,
            stream: false,
            format: "json",
            options: OllamaOptions {
                num_predict: 1024,
                temperature: 0.1, // near-deterministic JSON
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?
            .error_for_status()
            .context("Ollama returned an error status")?;

        let body: OllamaResponse = response.json().await.context("Failed to parse Ollama response")?;
        Ok(body.response)
    }

    /// Check if Ollama server is available
    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Extract the JSON object from a reply (handles markdown code fences)
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    let unfenced = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest)
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        match rest.find('\n') {
            Some(nl) => {
                let body = &rest[nl + 1..];
                body.find("```").map(|end| body[..end].trim()).unwrap_or(body)
            }
            None => rest,
        }
    } else {
        trimmed
    };

    // Object boundaries
    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), r#"{"a": 1}"#);
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), r#"{"a": 1}"#);
        assert_eq!(extract_json("Sure! {\"a\": 1} hope it helps"), r#"{"a": 1}"#);
        assert_eq!(extract_json("no json here"), "no json here");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let oracle = OllamaOracle::new(Some("http://host:11434/".into()), None);
        assert_eq!(oracle.base_url, "http://host:11434");
        assert_eq!(oracle.model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let oracle = OllamaOracle::new(Some("http://127.0.0.1:9".into()), None);
        let result = oracle.complete("sys", &serde_json::json!({})).await;
        assert!(result.is_err());
        assert!(!oracle.health_check().await);
    }
}
