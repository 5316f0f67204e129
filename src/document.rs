//! Uploaded documents and the pre-flight checks applied before extraction.
//!
//! The MIME type is taken from what the caller declares (for files on disk, the extension).
//! File contents are never sniffed.

use crate::config::UploadConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a document was refused before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("Unsupported file type '{mime_type}'. Please upload one of: {}.", accepted.join(", "))]
    UnsupportedType {
        mime_type: String,
        accepted: Vec<String>,
    },
    #[error("File is too large ({}). Maximum size is {}.", human_size(*size), human_size(*max))]
    TooLarge { size: u64, max: u64 },
}

/// A candidate file as selected by the user.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring its MIME type from the extension.
    pub async fn load(path: &Path) -> Result<Self, DocumentError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| DocumentError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!(%name, %mime_type, size = bytes.len(), "loaded document");
        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Check the declared type and size against the upload limits.
    ///
    /// Size is checked first, so an oversized file is `TooLarge` whatever its type.
    pub fn validate(mut self, limits: &UploadConfig) -> Result<ValidatedDocument, RejectionReason> {
        if self.size() > limits.max_bytes {
            return Err(RejectionReason::TooLarge {
                size: self.size(),
                max: limits.max_bytes,
            });
        }
        let Some(canonical) = limits
            .accepted_types
            .iter()
            .find(|accepted| accepted.eq_ignore_ascii_case(&self.mime_type))
        else {
            return Err(RejectionReason::UnsupportedType {
                mime_type: self.mime_type,
                accepted: limits.accepted_types.clone(),
            });
        };
        // The configured spelling is what goes over the wire.
        self.mime_type = canonical.clone();
        Ok(ValidatedDocument(self))
    }
}

/// A document that passed [`Document::validate`]. Only these can be sent for extraction.
#[derive(Debug, Clone)]
pub struct ValidatedDocument(Document);

impl std::ops::Deref for ValidatedDocument {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.0
    }
}

fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= MIB {
        format!("{:.1}MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1}KB", bytes as f64 / KIB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
