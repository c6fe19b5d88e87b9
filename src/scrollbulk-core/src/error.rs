use crate::bulk::BulkError;

/// Errors surfaced by the client layer.
///
/// Callers can tell a batch that never reached the server
/// ([`ClientError::Transport`], [`ClientError::Status`]) apart from one the
/// server accepted but partially rejected ([`ClientError::Bulk`]).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid client configuration: {0}")]
    Connection(String),

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Server error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Scroll protocol error: {0}")]
    ScrollProtocol(String),

    /// The caller's page handler failed; the session stopped paging.
    #[error("Page handler failed: {0}")]
    Handler(anyhow::Error),

    #[error(transparent)]
    Bulk(#[from] BulkError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures where the request as a whole did not succeed at the
    /// HTTP level.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
