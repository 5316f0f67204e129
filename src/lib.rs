//! # docsumma
//!
//! Document text extraction, structured summaries and a chat assistant, all backed by a
//! hosted generative model.
//!
//! ## Features
//!
//! - **Extraction**: PDFs and images are sent to the model, which returns their text
//! - **Structured Summaries**: Replies are constrained by a JSON schema derived from `SummaryResult`
//! - **Chat**: A multi-turn assistant that keeps its transcript for the whole process
//! - **Bounded Calls**: Every remote call has a timeout and can be cancelled

pub mod agent;
pub mod chat;
pub mod config;
pub mod document;
pub mod extractor;
pub mod gemini;
pub mod schema;
pub mod service;
pub mod session;
pub mod summary;
pub mod ui;

pub use config::Config;
pub use document::Document;
pub use gemini::GeminiClient;
pub use service::ModelService;
pub use session::{AppError, Assistant, Status};
pub use summary::{SummaryLength, SummaryResult};
