//! Text-completion oracle for shelf-life estimates.
//!
//! Speaks the OpenAI `/v1/completions` wire format. One request per call, no
//! retries; every failure is reported as `OracleUnavailable`.

use crate::config::OracleSettings;
use crate::domain::ports::ExpiryOracle;
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

fn unavailable(message: impl Into<String>) -> TrackerError {
    TrackerError::OracleUnavailable {
        message: message.into(),
    }
}

pub fn build_prompt(product_name: &str) -> String {
    format!(
        "Provide the estimated expiry period (in days) for the grocery product \"{}\". Only provide the number of days.",
        product_name
    )
}

#[derive(Debug, Clone)]
pub struct CompletionOracle {
    client: Client,
    settings: OracleSettings,
}

impl CompletionOracle {
    pub fn new(settings: OracleSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/completions", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ExpiryOracle for CompletionOracle {
    async fn estimate(&self, product_name: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.settings.model,
            prompt: build_prompt(product_name),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        tracing::debug!("Asking oracle about {}", product_name);
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("oracle returned {}: {}", status, body)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("malformed response: {}", e)))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(unavailable("empty completion"));
        }

        tracing::debug!("Oracle answered {:?} for {}", text, product_name);
        Ok(text)
    }
}
