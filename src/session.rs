//! Single-user session controller.
//!
//! `Assistant` sequences validation, extraction and summarisation for the current document,
//! owns the chat session, and publishes a [`Status`] for the front-end to render. Every method
//! that talks to the model takes `&mut self`, so only one remote call can be outstanding.

use crate::agent::{self, SummaryError};
use crate::chat::{ChatSession, Conversation, ConversationError};
use crate::config::Config;
use crate::document::{Document, RejectionReason};
use crate::extractor::{self, ExtractionError};
use crate::service::{CallGuard, ModelService};
use crate::summary::{SummaryLength, SummaryResult};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Every failure the controller can surface, labelled by stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Failed to extract text. {0}")]
    Rejected(#[from] RejectionReason),
    #[error("Failed to extract text. {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Failed to generate summary. {0}")]
    Summary(#[from] SummaryError),
    #[error("Failed to get response. {0}")]
    Conversation(#[from] ConversationError),
    #[error("Cannot generate summary without extracted text.")]
    NoTextAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Summarizing,
}

impl Stage {
    pub fn message(self) -> &'static str {
        match self {
            Stage::Extracting => "Extracting text from document...",
            Stage::Summarizing => "Generating your smart summary...",
        }
    }
}

/// What the document workflow is doing right now. Loading and failure exclude each other.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Loading(Stage),
    Ready(Stage),
    Failed { stage: Stage, message: String },
}

impl Status {
    pub fn is_loading(&self) -> bool {
        matches!(self, Status::Loading(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Status::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// The document currently loaded, without its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl From<&Document> for DocumentInfo {
    fn from(document: &Document) -> Self {
        Self {
            name: document.name().to_string(),
            mime_type: document.mime_type().to_string(),
            size: document.size(),
        }
    }
}

/// Data derived from the current document. Replaced wholesale on reset.
#[derive(Debug, Clone, Default)]
struct Workspace {
    document: Option<DocumentInfo>,
    extracted: Option<String>,
    summary: Option<SummaryResult>,
}

pub struct Assistant {
    service: Arc<dyn ModelService>,
    config: Config,
    workspace: Workspace,
    conversation: Conversation,
    chat_open: bool,
    status: watch::Sender<Status>,
    cancel: CancellationToken,
}

impl Assistant {
    pub fn new(service: Arc<dyn ModelService>, config: Config) -> Self {
        let (status, _) = watch::channel(Status::Idle);
        Self {
            service,
            config,
            workspace: Workspace::default(),
            conversation: Conversation::default(),
            chat_open: false,
            status,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Watch status changes, e.g. to drive a progress indicator.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    pub fn document(&self) -> Option<&DocumentInfo> {
        self.workspace.document.as_ref()
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.workspace.extracted.as_deref()
    }

    pub fn summary(&self) -> Option<&SummaryResult> {
        self.workspace.summary.as_ref()
    }

    /// Summaries can be requested once text has been extracted and nothing is in flight.
    pub fn can_summarize(&self) -> bool {
        self.workspace.extracted.is_some() && !self.status.borrow().is_loading()
    }

    /// Token that cancels the next remote call. A token that was already used to cancel is
    /// replaced, so grab this right before starting the operation it should guard.
    pub fn cancellation_token(&mut self) -> CancellationToken {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.cancel.clone()
    }

    fn guard(&mut self) -> CallGuard {
        CallGuard::new(self.config.timeout(), self.cancellation_token())
    }

    fn set_status(&self, status: Status) {
        self.status.send_replace(status);
    }

    fn fail(&self, stage: Stage, error: AppError) -> AppError {
        self.set_status(Status::Failed {
            stage,
            message: error.to_string(),
        });
        error
    }

    /// Drop the current document, its text and summary, and any error.
    pub fn reset(&mut self) {
        self.workspace = Workspace::default();
        self.set_status(Status::Idle);
    }

    /// Load a newly selected document: reset, validate, then extract its text.
    pub async fn select_file(&mut self, document: Document) -> Result<&str, AppError> {
        self.reset();
        self.workspace.document = Some(DocumentInfo::from(&document));

        let validated = match document.validate(&self.config.upload) {
            Ok(validated) => validated,
            Err(reason) => {
                tracing::info!(%reason, "document rejected");
                return Err(self.fail(Stage::Extracting, reason.into()));
            }
        };

        self.set_status(Status::Loading(Stage::Extracting));
        let guard = self.guard();
        match extractor::extract_text(self.service.as_ref(), &validated, &guard).await {
            Ok(text) => {
                self.set_status(Status::Ready(Stage::Extracting));
                Ok(self.workspace.extracted.insert(text).as_str())
            }
            Err(e) => Err(self.fail(Stage::Extracting, e.into())),
        }
    }

    /// Summarise the held text at the given length. A failure keeps the previous summary.
    pub async fn generate_summary(
        &mut self,
        length: SummaryLength,
    ) -> Result<&SummaryResult, AppError> {
        let Some(text) = self.workspace.extracted.clone() else {
            return Err(self.fail(Stage::Summarizing, AppError::NoTextAvailable));
        };

        self.set_status(Status::Loading(Stage::Summarizing));
        let range = self.config.tiers.range(length);
        let guard = self.guard();
        match agent::summarize(self.service.as_ref(), &text, range, &guard).await {
            Ok(summary) => {
                self.set_status(Status::Ready(Stage::Summarizing));
                Ok(self.workspace.summary.insert(summary))
            }
            Err(e) => Err(self.fail(Stage::Summarizing, e.into())),
        }
    }

    pub fn is_chat_open(&self) -> bool {
        self.chat_open
    }

    /// Open or close the chat panel. The first open starts the session; closing clears the
    /// chat error but keeps the transcript.
    pub fn toggle_chat(&mut self) -> bool {
        self.chat_open = !self.chat_open;
        if self.chat_open {
            let agent = &self.config.agent;
            self.conversation.open(&agent.persona, &agent.greeting);
        } else if let Some(session) = self.conversation.session_mut() {
            session.clear_error();
        }
        self.chat_open
    }

    pub fn chat(&self) -> Option<&ChatSession> {
        self.conversation.session()
    }

    /// Send a chat message, opening the session first if it has never been opened.
    pub async fn send_chat(&mut self, message: &str) -> Result<String, AppError> {
        let guard = self.guard();
        let agent = &self.config.agent;
        let session = self.conversation.open(&agent.persona, &agent.greeting);
        session
            .send_message(self.service.as_ref(), message, &guard)
            .await
            .map_err(AppError::from)
    }
}
