//! Workflow-level errors.

use provisioner_common::error::{ClientError, RemoteError};
use provisioner_common::types::ValidationError;

/// Everything that can stop an account from being provisioned.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ProvisionError {
    /// A mandatory name field was empty; the request was skipped without
    /// contacting the server
    #[error("skipped: {field} is empty")]
    #[diagnostic(code(provisioner::skipped))]
    Skipped {
        /// Which field was empty
        field: &'static str,
    },

    /// The request failed local validation
    #[error("invalid request: {0}")]
    #[diagnostic(code(provisioner::validation))]
    Validation(
        #[from]
        #[diagnostic_source]
        ValidationError,
    ),

    /// The suggestion set's validity window elapsed
    #[error("suggested usernames expired")]
    #[diagnostic(
        code(provisioner::expired_suggestions),
        help("request new suggestions; the server has released the old ones")
    )]
    ExpiredSuggestions,

    /// The suggestion set is not the most recent one for this session
    #[error("suggested usernames were superseded by a newer suggest call")]
    #[diagnostic(
        code(provisioner::stale_suggestions),
        help("select from the suggestion set returned by the latest suggest call")
    )]
    StaleSuggestions,

    /// The server answered suggest with an empty list
    #[error("the server returned no username suggestions")]
    #[diagnostic(code(provisioner::no_suggestions))]
    NoSuggestions,

    /// The server reported an error via `errorMessage`
    #[error("{0}")]
    #[diagnostic(code(provisioner::remote))]
    Remote(RemoteError),

    /// Transport, encoding or decoding failure
    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(ClientError),
}

impl From<ClientError> for ProvisionError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Remote(remote) => Self::Remote(remote),
            other => Self::Client(other),
        }
    }
}

/// Coarse classification of a [`ProvisionError`], for batch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionErrorKind {
    /// See [`ProvisionError::Skipped`]
    Skipped,
    /// See [`ProvisionError::Validation`]
    Validation,
    /// See [`ProvisionError::ExpiredSuggestions`]
    ExpiredSuggestions,
    /// See [`ProvisionError::StaleSuggestions`]
    StaleSuggestions,
    /// See [`ProvisionError::NoSuggestions`]
    NoSuggestions,
    /// See [`ProvisionError::Remote`]
    Remote,
    /// See [`ProvisionError::Client`]
    Transport,
}

impl ProvisionError {
    /// Classify this error
    pub fn kind(&self) -> ProvisionErrorKind {
        match self {
            Self::Skipped { .. } => ProvisionErrorKind::Skipped,
            Self::Validation(_) => ProvisionErrorKind::Validation,
            Self::ExpiredSuggestions => ProvisionErrorKind::ExpiredSuggestions,
            Self::StaleSuggestions => ProvisionErrorKind::StaleSuggestions,
            Self::NoSuggestions => ProvisionErrorKind::NoSuggestions,
            Self::Remote(_) => ProvisionErrorKind::Remote,
            Self::Client(_) => ProvisionErrorKind::Transport,
        }
    }

    /// The request was skipped rather than failed
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, ProvisionError>;
