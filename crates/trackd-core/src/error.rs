//! Error types for trackd.
//!
//! The user-visible variants carry short, stable messages. String equality
//! on these messages is part of the observable contract of the HTTP API,
//! so they are pinned by unit tests below and must not be reworded.

use thiserror::Error;

/// Result type alias using trackd's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for trackd operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A create-required field is absent from an insert payload
    #[error("missing input data")]
    MissingRequiredInput,

    /// A present field fails its type/length/format rule
    #[error("invalid input data")]
    InvalidInput,

    /// A present filter field fails its type/length/format rule
    #[error("invalid query")]
    InvalidQuery,

    /// Update payload has no fields to change
    #[error("no updated field sent")]
    EmptyUpdate,

    /// Update issued without an identifier
    #[error("no id sent")]
    MissingId,

    /// Delete issued without an identifier
    #[error("id error")]
    IdRequired,

    /// Insert did not persist exactly one document
    #[error("error while saving issue")]
    SaveFailed,

    /// Find operation failed at the store
    #[error("error fetching data")]
    FetchFailed,

    /// Update matched/modified zero documents, or the store errored
    #[error("could not update {0}")]
    UpdateFailed(String),

    /// Soft delete matched/modified zero documents, or the store errored
    #[error("could not delete {0}")]
    DeleteFailed(String),
}

impl Error {
    /// Whether this error is the caller's fault (HTTP 400) as opposed to a
    /// persistence-side failure (HTTP 500).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MissingRequiredInput
                | Error::InvalidInput
                | Error::InvalidQuery
                | Error::EmptyUpdate
                | Error::MissingId
                | Error::IdRequired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_client_messages() {
        assert_eq!(Error::MissingRequiredInput.to_string(), "missing input data");
        assert_eq!(Error::InvalidInput.to_string(), "invalid input data");
        assert_eq!(Error::InvalidQuery.to_string(), "invalid query");
        assert_eq!(Error::EmptyUpdate.to_string(), "no updated field sent");
        assert_eq!(Error::MissingId.to_string(), "no id sent");
        assert_eq!(Error::IdRequired.to_string(), "id error");
    }

    #[test]
    fn test_stable_server_messages() {
        assert_eq!(Error::SaveFailed.to_string(), "error while saving issue");
        assert_eq!(Error::FetchFailed.to_string(), "error fetching data");
        assert_eq!(
            Error::UpdateFailed("abc".to_string()).to_string(),
            "could not update abc"
        );
        assert_eq!(
            Error::DeleteFailed("abc".to_string()).to_string(),
            "could not delete abc"
        );
    }

    #[test]
    fn test_client_server_split() {
        assert!(Error::MissingRequiredInput.is_client_error());
        assert!(Error::InvalidInput.is_client_error());
        assert!(Error::InvalidQuery.is_client_error());
        assert!(Error::EmptyUpdate.is_client_error());
        assert!(Error::MissingId.is_client_error());
        assert!(Error::IdRequired.is_client_error());
        assert!(!Error::SaveFailed.is_client_error());
        assert!(!Error::FetchFailed.is_client_error());
        assert!(!Error::UpdateFailed("x".into()).is_client_error());
        assert!(!Error::DeleteFailed("x".into()).is_client_error());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
