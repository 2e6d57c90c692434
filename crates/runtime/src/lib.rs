//! Host runtime for the interaction core.
//!
//! This crate wires [`interaction_core`] to a concrete scene, a scenario
//! format and an event log. Consumers load a [`Scenario`], build a
//! [`Session`] on top of an [`EventRepository`] and run the script.
//!
//! Modules are organized by responsibility:
//! - [`scene`] answers spatial queries from simple geometry
//! - [`scenario`] defines the RON scenario format
//! - [`session`] drives the authority and the mirrored replica
//! - [`repository`] persists the event stream
//! - [`api`] exposes the error types clients handle
pub mod api;
pub mod repository;
pub mod scenario;
pub mod scene;
pub mod session;

pub use api::{ReferenceKind, RepositoryError, Result, RuntimeError};
pub use repository::{
    EventRepository, FileEventLog, InMemoryEventLog, LogEntry, LogRecord, Side, read_all,
};
pub use scenario::{
    ActorSpec, InteractableOp, InteractableSpec, InteractorOp, InteractorSpec, Scenario,
    ScriptStep, Step, SurfaceSpec, WallSpec,
};
pub use scene::{SceneActor, SceneSpace, SphereSurface, Wall};
pub use session::{RunSummary, Session};
