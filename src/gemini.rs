//! Gemini `generateContent` adapter.
//!
//! Uses reqwest against the REST endpoint directly so inline attachments, system instructions
//! and response schemas can all go through the same request shape.

use crate::config::{Config, ConfigError};
use crate::service::{Content, GenerateRequest, ModelService, Part, ServiceError, ServiceResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User-Agent string identifying this client
const USER_AGENT: &str = concat!("docsumma/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Gemini API. Construct once and share.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Build the client from configuration, reading the API key once.
    pub fn from_config(config: &Config) -> Result<Self, GeminiSetupError> {
        let api_key = config.api_key()?;
        let client = Self::new(
            api_key,
            &config.agent.model,
            &config.agent.endpoint,
            config.timeout(),
        )?;
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    fn map_error(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout(self.timeout)
        } else if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create HTTP client: {0}")]
    Client(#[from] ServiceError),
}

#[async_trait]
impl ModelService for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> ServiceResult<Option<String>> {
        let body = RequestBody::from(&request);
        tracing::debug!(
            model = %self.model,
            contents = body.contents.len(),
            structured = body.generation_config.is_some(),
            "sending generateContent request"
        );

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_error(e))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "generateContent failed");
            return Err(api_error(status.as_u16(), &text));
        }

        parse_reply(&text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a serde_json::Value,
}

impl<'a> From<&'a GenerateRequest> for RequestBody<'a> {
    fn from(request: &'a GenerateRequest) -> Self {
        Self {
            contents: &request.contents,
            system_instruction: request.system_instruction.as_ref().map(|text| {
                SystemInstruction {
                    parts: vec![Part::Text(text.clone())],
                }
            }),
            generation_config: request
                .response_schema
                .as_ref()
                .map(|schema| GenerationConfig {
                    response_mime_type: "application/json",
                    response_schema: schema,
                }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    status: Option<String>,
}

/// Join the text parts of the first candidate. Thought summaries are skipped.
fn parse_reply(body: &str) -> ServiceResult<Option<String>> {
    let parsed: ResponseBody =
        serde_json::from_str(body).map_err(|e| ServiceError::Decode(e.to_string()))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

fn api_error(status: u16, body: &str) -> ServiceError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) => match error.status {
            Some(code) => format!("{} ({})", error.message, code),
            None => error.message,
        },
        Err(_) if body.trim().is_empty() => "empty error body".to_string(),
        Err(_) => body.trim().to_string(),
    };
    ServiceError::Api { status, message }
}
