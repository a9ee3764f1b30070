//! Remote store error types.

use thiserror::Error;

/// Errors returned by a [`RemoteStore`](super::RemoteStore).
///
/// The reconciliation engine never propagates these to its callers; they
/// are recorded on the affected plant's sync state instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The store could not be reached (connection refused, DNS, timeout).
    #[error("Remote store unreachable: {0}")]
    Transport(String),

    /// The store was reached but refused the request.
    #[error("Remote store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The store answered with a body that could not be understood.
    #[error("Unexpected response from remote store: {0}")]
    Protocol(String),
}

impl RemoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Protocol(e.to_string())
        } else if let Some(status) = e.status() {
            RemoteError::Rejected {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}
