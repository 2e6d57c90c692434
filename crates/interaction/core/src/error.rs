//! Error types of the interaction core.
//!
//! Nothing here is raised for rejected transitions: an edge missing from a
//! transition table is a silent no-op. Errors cover unknown entities, missing
//! preconditions and calls forwarded across the authority boundary.

use core::fmt;

use crate::state::{InteractableId, InteractorId};

/// Severity level of an error, used for logging and recovery decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// The same call may succeed later, e.g. after replication catches up.
    Recoverable,
    /// The request itself is invalid for the current state.
    Validation,
    /// World bookkeeping is inconsistent. Indicates a bug.
    Internal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Failures of world operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InteractionError {
    #[error("{0} does not exist")]
    UnknownInteractable(InteractableId),

    #[error("{0} does not exist")]
    UnknownInteractor(InteractorId),

    #[error("{operation} requires {requirement}")]
    MissingPrecondition {
        operation: &'static str,
        requirement: &'static str,
    },

    #[error("{operation} forwarded to the authority")]
    Forwarded { operation: &'static str },

    #[error("dependency processing exceeded depth {limit} at {entity}")]
    DependencyTooDeep { entity: String, limit: usize },
}

impl InteractionError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Forwarded { .. } => ErrorSeverity::Recoverable,
            Self::UnknownInteractable(_)
            | Self::UnknownInteractor(_)
            | Self::MissingPrecondition { .. } => ErrorSeverity::Validation,
            Self::DependencyTooDeep { .. } => ErrorSeverity::Internal,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownInteractable(_) => "UNKNOWN_INTERACTABLE",
            Self::UnknownInteractor(_) => "UNKNOWN_INTERACTOR",
            Self::MissingPrecondition { .. } => "MISSING_PRECONDITION",
            Self::Forwarded { .. } => "FORWARDED",
            Self::DependencyTooDeep { .. } => "DEPENDENCY_TOO_DEEP",
        }
    }
}

/// Successful convenience request. Displays as the reason shown to users.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accepted {
    pub subject: String,
    pub verb: &'static str,
}

impl fmt::Display for Accepted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has been {}", self.subject, self.verb)
    }
}

/// Failed convenience request. The `Display` text is the user-facing reason.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("{subject} is already {state}")]
    Already { subject: String, state: String },

    #[error("{subject} is {state}, cannot be {verb}")]
    Rejected {
        subject: String,
        state: String,
        verb: &'static str,
    },

    #[error(transparent)]
    World(#[from] InteractionError),
}

impl RequestError {
    /// True for requests queued for the authority rather than refused.
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Self::World(InteractionError::Forwarded { .. }))
    }
}

pub type RequestResult = Result<Accepted, RequestError>;
pub type Result<T, E = InteractionError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_read_naturally() {
        let accepted = Accepted {
            subject: "door".into(),
            verb: "activated",
        };
        assert_eq!(accepted.to_string(), "door has been activated");

        let rejected = RequestError::Rejected {
            subject: "door".into(),
            state: "completed".into(),
            verb: "awoken",
        };
        assert_eq!(rejected.to_string(), "door is completed, cannot be awoken");
    }

    #[test]
    fn forwarded_requests_are_recoverable() {
        let error = InteractionError::Forwarded {
            operation: "set_state",
        };
        assert!(error.severity().is_recoverable());
        assert!(RequestError::from(error).is_forwarded());
    }
}
