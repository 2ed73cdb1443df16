//! External LLM summarizer clients
//!
//! Summaries are produced by the Gemini `generateContent` REST API. The
//! `Summarizer` trait keeps the provider swappable; a mock implementation
//! backs tests and local development.

use crate::config::SummarizerConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Text summarization via an external LLM
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a summary for the given prompt
    async fn summarize(&self, prompt: &str) -> Result<String>;

    /// Name of the underlying model
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Gemini-backed summarizer
pub struct GeminiSummarizer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_retries: u32,
    timeout: Duration,
}

impl GeminiSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "Summarizer API key not configured".into(),
        })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key,
            model: config.model.clone(),
            max_retries: config.max_retries,
            timeout,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self.client.post(&url).json(&request).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::SummarizerTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                AppError::SummarizerError {
                    message: format!("Request to summarizer failed: {}", e),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SummarizerError {
                message: format!(
                    "Summarizer returned status {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            });
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::SummarizerError {
                message: format!("Unparseable summarizer response: {}", e),
            }
        })?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AppError::SummarizerError {
                message: "Summarizer returned no content".into(),
            })
    }

    fn is_retryable(err: &AppError) -> bool {
        matches!(
            err,
            AppError::SummarizerTimeout { .. } | AppError::SummarizerError { .. }
        )
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.generate(prompt).await {
                Ok(text) => {
                    debug!(model = %self.model, attempt, "Summary generated");
                    return Ok(text);
                }
                Err(err) if attempt < self.max_retries && Self::is_retryable(&err) => {
                    attempt += 1;
                    // Exponential backoff with jitter
                    let base_delay = 500u64 * 2u64.pow(attempt.min(6));
                    let jitter = rand::thread_rng().gen_range(0..250);
                    let delay = Duration::from_millis(base_delay + jitter);
                    warn!(
                        error = %err,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Summarizer call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Deterministic summarizer for tests and local development
pub struct MockSummarizer {
    model: String,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            model: "mock".to_string(),
        }
    }
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String> {
        let head: String = prompt.chars().take(64).collect();
        Ok(format!("Summary of: {}", head))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Build a summarizer from configuration
pub fn create_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>> {
    match config.provider.as_str() {
        "gemini" => {
            info!(model = %config.model, "Using Gemini summarizer");
            Ok(Arc::new(GeminiSummarizer::new(config)?))
        }
        "mock" => {
            info!("Using mock summarizer");
            Ok(Arc::new(MockSummarizer::new()))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown summarizer provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_summarizer_echoes_prompt_head() {
        let summarizer = MockSummarizer::new();
        let summary = summarizer.summarize("Road maintenance tender").await.unwrap();
        assert!(summary.contains("Road maintenance tender"));
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let config = SummarizerConfig {
            provider: "oracle".to_string(),
            api_key: None,
            api_base: None,
            model: crate::DEFAULT_SUMMARY_MODEL.to_string(),
            timeout_secs: 5,
            max_retries: 0,
        };
        assert!(create_summarizer(&config).is_err());
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let config = SummarizerConfig {
            provider: "gemini".to_string(),
            api_key: None,
            api_base: None,
            model: crate::DEFAULT_SUMMARY_MODEL.to_string(),
            timeout_secs: 5,
            max_retries: 0,
        };
        assert!(GeminiSummarizer::new(&config).is_err());
    }
}
