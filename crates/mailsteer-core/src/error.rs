//! Error types for the core library.

use thiserror::Error;

use crate::model::{AccountId, FolderId};

/// Errors that can occur in core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The backing store rejected or failed an operation.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Folder not found.
    #[error("Folder not found: {0}")]
    FolderNotFound(FolderId),

    /// The account has no inbox the provider can resolve.
    #[error("No inbox for account: {0}")]
    NoInbox(AccountId),

    /// The account cannot run searches.
    #[error("Search not supported by account: {0}")]
    SearchUnsupported(AccountId),

    /// Fixture or snapshot data could not be decoded.
    #[error("Serialization error: {0}")]
    Serde(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
