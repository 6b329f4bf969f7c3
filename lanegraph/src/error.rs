use thiserror::Error;

use crate::core::RevId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced while reading history or laying out rows.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying repository failed while resolving data.
    #[error("repository backend error: {0}")]
    Backend(#[from] git2::Error),

    #[error("unknown revision {0}")]
    UnknownRevision(RevId),

    #[error("unknown branch '{0}'")]
    UnknownBranch(String),

    #[error("no history found for path '{0}'")]
    NoFileHistory(String),

    #[error("invalid timestamp on revision {0}")]
    InvalidTimestamp(RevId),
}
