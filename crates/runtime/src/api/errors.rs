//! Unified error type surfaced by the runtime.
//!
//! Wraps scenario loading, event log and core failures so the binary can
//! bubble them up with consistent context.
use std::path::PathBuf;

use interaction_core::InteractionError;
use thiserror::Error;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to read scenario {path}")]
    ReadScenario {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario RON")]
    ParseScenario(#[source] ron::error::SpannedError),

    #[error("scenario refers to unknown {kind} '{key}'")]
    UnknownReference { kind: ReferenceKind, key: String },

    #[error("scenario declares {kind} '{key}' twice")]
    DuplicateKey { kind: ReferenceKind, key: String },

    #[error("scenario step {index} is scheduled at {at} but the clock is already at {now}")]
    StepInPast { index: usize, at: f32, now: f32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Interaction(#[from] InteractionError),
}

/// Named entity kinds a scenario can refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReferenceKind {
    Interactable,
    Interactor,
    Actor,
}
