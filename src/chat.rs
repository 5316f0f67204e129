//! Multi-turn chat with the model.
//!
//! The transcript is what the user sees. It always starts with a greeting and grows by exactly
//! two turns per sent message, even when the exchange fails. Failed assistant turns are kept in
//! the transcript, tagged as failed, but never enter the history sent back to the model.

use crate::service::{CallGuard, Content, GenerateRequest, ModelService, ServiceError};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("{0}")]
    Service(#[from] ServiceError),
    #[error("The assistant returned an empty reply.")]
    EmptyReply,
    #[error("Cannot send an empty message.")]
    EmptyMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Delivered,
    Failed,
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub status: TurnStatus,
    pub at: DateTime<Utc>,
}

impl Turn {
    fn new(speaker: Speaker, text: impl Into<String>, status: TurnStatus) -> Self {
        Self {
            speaker,
            text: text.into(),
            status,
            at: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == TurnStatus::Failed
    }
}

/// Text shown in place of a reply when an exchange fails.
pub fn apology(error: &ConversationError) -> String {
    format!("Sorry, I encountered an error. Please try again. ({})", error)
}

/// An active chat session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    system_instruction: String,
    transcript: Vec<Turn>,
    history: Vec<Content>,
    last_error: Option<String>,
}

impl ChatSession {
    pub fn new(system_instruction: impl Into<String>, greeting: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            transcript: vec![Turn::new(
                Speaker::Assistant,
                greeting,
                TurnStatus::Delivered,
            )],
            history: Vec::new(),
            last_error: None,
        }
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn request_for(&self, message: &str) -> GenerateRequest {
        let mut contents = self.history.clone();
        contents.push(Content::user_text(message));
        GenerateRequest::new(contents).with_system_instruction(self.system_instruction.clone())
    }

    /// Send one message and wait for the reply.
    ///
    /// The user turn is appended before the call. On failure an apology turn tagged
    /// [`TurnStatus::Failed`] is appended and the error is returned as well.
    pub async fn send_message(
        &mut self,
        service: &dyn ModelService,
        message: &str,
        guard: &CallGuard,
    ) -> Result<String, ConversationError> {
        if message.trim().is_empty() {
            return Err(ConversationError::EmptyMessage);
        }

        self.last_error = None;
        self.transcript
            .push(Turn::new(Speaker::User, message, TurnStatus::Delivered));
        tracing::debug!(turns = self.transcript.len(), "sending chat message");

        let outcome = match guard.generate(service, self.request_for(message)).await {
            Ok(Some(reply)) if !reply.trim().is_empty() => Ok(reply),
            Ok(_) => Err(ConversationError::EmptyReply),
            Err(e) => Err(ConversationError::from(e)),
        };

        match outcome {
            Ok(reply) => {
                self.history.push(Content::user_text(message));
                self.history.push(Content::model_text(reply.clone()));
                self.transcript.push(Turn::new(
                    Speaker::Assistant,
                    reply.clone(),
                    TurnStatus::Delivered,
                ));
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat exchange failed");
                self.last_error = Some(format!("Failed to get response. {}", e));
                self.transcript.push(Turn::new(
                    Speaker::Assistant,
                    apology(&e),
                    TurnStatus::Failed,
                ));
                Err(e)
            }
        }
    }
}

/// Chat lifecycle: no session until the first open, then the same one for the life of the
/// process.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    session: Option<ChatSession>,
}

impl Conversation {
    /// Start the session if needed and return it. Opening an active session never re-greets.
    pub fn open(&mut self, system_instruction: &str, greeting: &str) -> &mut ChatSession {
        self.session.get_or_insert_with(|| {
            tracing::info!("starting chat session");
            ChatSession::new(system_instruction, greeting)
        })
    }

    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ChatSession> {
        self.session.as_mut()
    }
}
