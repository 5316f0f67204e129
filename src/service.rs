//! The boundary to the remote model.
//!
//! Extraction, summarisation and chat are all expressed as a single `generate` primitive so
//! the orchestration code can run against any provider (or an in-memory fake in tests).

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("the model service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("the request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("the request was cancelled")]
    Cancelled,
    #[error("could not decode the service reply: {0}")]
    Decode(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A piece of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(Blob),
}

/// Binary attachment, already transport-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// base64 of the raw bytes
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::Text(text.into())])
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// One generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    /// When set, the model must reply with a single JSON document matching this schema.
    pub response_schema: Option<serde_json::Value>,
}

impl GenerateRequest {
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            ..Default::default()
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

#[async_trait]
pub trait ModelService: Send + Sync {
    /// Run one generation and return the reply text, or `None` when the model produced none.
    async fn generate(&self, request: GenerateRequest) -> ServiceResult<Option<String>>;
}

/// Deadline and cancellation applied to every remote call.
#[derive(Debug, Clone)]
pub struct CallGuard {
    timeout: Duration,
    cancel: CancellationToken,
}

impl CallGuard {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    pub async fn run<F, T>(&self, call: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ServiceError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout(self.timeout)),
            },
        }
    }

    /// Shorthand for `run(service.generate(request))`.
    pub async fn generate<S>(
        &self,
        service: &S,
        request: GenerateRequest,
    ) -> ServiceResult<Option<String>>
    where
        S: ModelService + ?Sized,
    {
        self.run(service.generate(request)).await
    }
}
