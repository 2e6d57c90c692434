//! Interaction state machines for simulated worlds.
//!
//! `interaction-core` models interactable objects and the interactors that
//! select and use them. Both sides run explicit transition tables, arbitrate
//! competing candidates by weight and cascade state through dependencies.
//! All mutation flows through [`engine::InteractionWorld`]; geometry and time
//! are supplied by the host through the traits in [`env`].
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod event;
pub mod replication;
pub mod state;

pub use config::{
    Detection, HighlightSetup, InteractableConfig, InteractionSettings, InteractionStyle,
    InteractorConfig, LifecycleMode, MashSettings, Persistence, SafetyTrace, SafetyTraceMode,
    SensorSurface, TraceKind, TraceSettings,
};
pub use engine::{InteractionWorld, Outbox};
pub use env::{
    EmptySpace, Hit, QueryRequest, QueryShape, Ray, SpatialQuery, TimerFired, TimerHandle,
    TimerKind, TimerManager, TimerOwner, TimerPurpose, TimerService, TimerSlots, Vec3,
};
pub use error::{Accepted, ErrorSeverity, InteractionError, RequestError, RequestResult};
pub use event::{
    InteractableEvent, InteractionEvent, InteractorEvent, Present, PresentCommand, SurfaceCommand,
};
pub use replication::{
    Authority, AuthorityMessage, InteractableFields, InteractableValue, InteractorFields,
    InteractorValue, ReplicatedUpdate, ReplicationGate, Request, Route,
};
pub use state::{
    ActorId, Channel, Interactable, InteractableId, InteractableState, Interactor, InteractorId,
    InteractorState, SurfaceId, SurfaceStatus,
};
