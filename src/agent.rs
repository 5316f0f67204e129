//! LLM agent module for structured summarization.
//!
//! The request carries a response schema derived from [`SummaryResult`], so the model replies
//! with a single JSON document that is parsed here in one step.

pub use crate::summary::SummaryResult;

use crate::schema::summary_schema;
use crate::service::{CallGuard, Content, GenerateRequest, ModelService, ServiceError};
use crate::summary::WordRange;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummaryError {
    #[error("{0}")]
    Service(#[from] ServiceError),
    #[error("The API did not return a summary. Please try again.")]
    EmptyReply,
    #[error("The model returned an invalid summary format. Please try again. ({0})")]
    InvalidFormat(String),
}

/// Build the summary request for the given text and word range.
pub fn summary_request(text: &str, range: WordRange) -> GenerateRequest {
    let prompt = format!(
        "Based on the following text, generate a summary of between {} and {} words. \
         The text is: \"{}\"",
        range.min, range.max, text
    );
    GenerateRequest::new(vec![Content::user_text(prompt)])
        .with_response_schema(summary_schema(range))
}

/// Run the summarization agent on the provided text
pub async fn summarize(
    service: &dyn ModelService,
    text: &str,
    range: WordRange,
    guard: &CallGuard,
) -> Result<SummaryResult, SummaryError> {
    tracing::info!(chars = text.len(), words = %range, "generating summary");

    let reply = guard
        .generate(service, summary_request(text, range))
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "summary request failed"))?
        .filter(|reply| !reply.trim().is_empty())
        .ok_or(SummaryError::EmptyReply)?;

    parse_summary(&reply)
}

/// Parse a reply into a complete [`SummaryResult`]; any missing field fails the whole parse.
pub fn parse_summary(reply: &str) -> Result<SummaryResult, SummaryError> {
    let cleaned = strip_markdown_json(reply);
    serde_json::from_str(cleaned).map_err(|e| {
        tracing::warn!(error = %e, "failed to parse summary JSON");
        SummaryError::InvalidFormat(e.to_string())
    })
}

/// Strip markdown code block wrappers from JSON response
fn strip_markdown_json(text: &str) -> &str {
    let trimmed = text.trim();

    // Remove ```json ... ``` or ``` ... ```
    if let Some(rest) = trimmed.strip_prefix("```") {
        let without_prefix = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end_idx) = without_prefix.rfind("```") {
            return without_prefix[..end_idx].trim();
        }
    }

    trimmed
}
