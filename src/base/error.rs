//! Error taxonomy for the relay core.

use std::fmt::Display;

/// Errors surfaced by the relay core and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A network-level failure reaching the backend or the messaging API.
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// A non-success status or an undecodable payload.
    #[error("protocol failure: {message}")]
    Protocol { status: Option<u16>, message: String },

    /// Every attempt allowed by the retry policy failed.
    #[error("gave up after {attempts} attempts: {source}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        source: Box<RelayError>,
    },

    /// A required collaborator is missing.
    #[error("invalid relay state: {message}")]
    State { message: String },

    /// The surrounding context was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl RelayError {
    #[must_use]
    pub fn transport(message: impl Display) -> Self {
        Self::Transport { message: message.to_string() }
    }

    #[must_use]
    pub fn protocol(message: impl Display) -> Self {
        Self::Protocol { status: None, message: message.to_string() }
    }

    #[must_use]
    pub fn status(status: u16, message: impl Display) -> Self {
        Self::Protocol {
            status: Some(status),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn state(message: impl Display) -> Self {
        Self::State { message: message.to_string() }
    }

    /// Whether this error (or the failure it wraps) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.last_failure(), Self::Cancelled)
    }

    /// The innermost failure, looking through `ExhaustedRetries`.
    pub fn last_failure(&self) -> &RelayError {
        match self {
            Self::ExhaustedRetries { source, .. } => source.last_failure(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_failure_unwraps_exhausted() {
        let err = RelayError::ExhaustedRetries {
            attempts: 4,
            source: Box::new(RelayError::status(500, "backend returned 500")),
        };

        assert!(matches!(err.last_failure(), RelayError::Protocol { status: Some(500), .. }));
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("4 attempts"));
    }
}
