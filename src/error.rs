use crate::ds::{DeliveryServiceError, TransportEventError};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity must be exactly 8 characters: {0:?}")]
    InvalidLength(String),
    #[error("Identity must be uppercase alphanumeric: {0:?}")]
    InvalidCharacters(String),
    #[error("Group token must be 16 hex digits: {0:?}")]
    InvalidGroupToken(String),
    #[error("No identity stored at {0}")]
    IdentityMissing(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure to write or read persisted directory state.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory lookup for {identity} failed: {reason}")]
    LookupFailed { identity: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The receipt collaborator refused to mint an acknowledgement.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("Cannot acknowledge a message sent by ourselves ({0})")]
    SelfAddressed(String),
    #[error("Receipt status {0} cannot be sent")]
    UnsupportedStatus(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Failed to build acknowledgement: {0}")]
    Receipt(#[from] ReceiptError),
    #[error(transparent)]
    Transport(#[from] TransportEventError),
    #[error(transparent)]
    Delivery(#[from] DeliveryServiceError),
}

impl DispatchError {
    /// Fatal errors end the dispatch loop. Everything else is logged per event.
    pub fn is_fatal(&self) -> bool {
        match self {
            DispatchError::Storage(_) => true,
            DispatchError::Directory(DirectoryError::Storage(_)) => true,
            DispatchError::Delivery(DeliveryServiceError::SinkClosed) => true,
            _ => false,
        }
    }
}
