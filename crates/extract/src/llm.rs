use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::ExtractError;
use crate::prompt::{INSTRUCTION_CONTRACT, InstructionContract};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::schema::{RawExtraction, RawExtractionResult};

/// One outbound call: the fixed contract plus the caller's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    contract: InstructionContract,
    source_text: String,
}

impl ExtractionRequest {
    pub fn new(source_text: impl Into<String>) -> Self {
        Self {
            contract: INSTRUCTION_CONTRACT,
            source_text: source_text.into(),
        }
    }

    pub fn contract(&self) -> &InstructionContract {
        &self.contract
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn to_body(&self) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Content::text(self.contract.text),
            contents: vec![Content::text(&self.source_text)],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Sends a request body and returns the raw response body.
///
/// Any `Err` is a transport failure and will be retried.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, body: &GenerateContentRequest) -> Result<String>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn post(&self, body: &GenerateContentRequest) -> Result<String> {
        (**self).post(body).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post(&self, body: &GenerateContentRequest) -> Result<String> {
        (**self).post(body).await
    }
}

#[derive(Clone)]
pub struct HttpTransport {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(config, client))
    }

    /// Use a preconfigured client; its timeout applies instead of the config's.
    pub fn with_client(config: &GeminiConfig, client: reqwest::Client) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: &GenerateContentRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(body)
            .send()
            .await
            .context("Failed to send request to AI service")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("AI service request failed: {}", status);
        }

        response
            .text()
            .await
            .context("Failed to read AI service response body")
    }
}

/// Client for the `generateContent` API.
pub struct GeminiClient<T = HttpTransport, S = TokioSleeper> {
    transport: T,
    sleeper: S,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        Ok(Self::with_parts(
            HttpTransport::new(config)?,
            TokioSleeper,
            RetryPolicy::from_config(&config.retry),
        ))
    }
}

impl<T: Transport, S: Sleeper> GeminiClient<T, S> {
    pub fn with_parts(transport: T, sleeper: S, retry: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            retry,
        }
    }

    /// Ask the model to pull a table and a chart suggestion out of `source_text`.
    pub async fn extract(&self, source_text: &str) -> RawExtractionResult {
        let request = ExtractionRequest::new(source_text);
        let body = request.to_body();

        debug!(
            contract_version = request.contract().version,
            source_len = request.source_text().len(),
            "Sending extraction request"
        );

        let response = self
            .retry
            .run("generate_content", &self.sleeper, |_| self.transport.post(&body))
            .await
            .map_err(|exhausted| ExtractError::Transport {
                attempts: exhausted.attempts,
                detail: format!("{:#}", exhausted.last_error),
            })?;

        candidate_text(&response).map(RawExtraction::new)
    }
}

/// Text of the first candidate that carries any.
fn candidate_text(body: &str) -> Result<String, ExtractError> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;

    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .find(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            ExtractError::InvalidResponseStructure(
                "response has no candidate with text content".to_string(),
            )
        })
}
