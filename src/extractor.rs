//! Text extraction from uploaded documents.
//!
//! The document is sent to the model as an inline base64 attachment together with a fixed
//! instruction; whatever text comes back is the extraction result.

use crate::document::ValidatedDocument;
use crate::service::{Blob, CallGuard, Content, GenerateRequest, ModelService, Part, ServiceError};
use base64::Engine;
use thiserror::Error;

pub const EXTRACTION_PROMPT: &str = "Extract all text from this document. Present it as clean, \
readable text without any additional commentary, formatting, or explanations. Just return the \
raw text content.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("{0}")]
    Service(#[from] ServiceError),
    #[error("The API did not return any text. The document might be empty or unreadable.")]
    EmptyReply,
}

/// Build the two-part extraction request: the attachment first, then the instruction.
pub fn extraction_request(document: &ValidatedDocument) -> GenerateRequest {
    let data = base64::engine::general_purpose::STANDARD.encode(document.bytes());
    GenerateRequest::new(vec![Content::user(vec![
        Part::InlineData(Blob {
            mime_type: document.mime_type().to_string(),
            data,
        }),
        Part::Text(EXTRACTION_PROMPT.to_string()),
    ])])
}

/// Ask the model for the document's text. The reply is returned exactly as received.
pub async fn extract_text(
    service: &dyn ModelService,
    document: &ValidatedDocument,
    guard: &CallGuard,
) -> Result<String, ExtractionError> {
    tracing::info!(
        name = document.name(),
        mime_type = document.mime_type(),
        size = document.size(),
        "extracting text"
    );

    let reply = guard
        .generate(service, extraction_request(document))
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "extraction request failed"))?;

    match reply {
        Some(text) if !text.trim().is_empty() => {
            tracing::debug!(chars = text.len(), "extraction finished");
            Ok(text)
        }
        _ => Err(ExtractionError::EmptyReply),
    }
}
