//! Collaborators supplied by the host.
//!
//! The core never touches geometry or the wall clock directly. Spatial queries
//! go through [`SpatialQuery`] and every delayed callback through
//! [`TimerService`], so a host can plug in its physics scene and scheduler
//! while tests use the deterministic [`TimerManager`].
mod spatial;
mod timer;

pub use spatial::{EmptySpace, Hit, QueryRequest, QueryShape, Ray, SpatialQuery, Vec3};
pub use timer::{
    TimerFired, TimerHandle, TimerKind, TimerManager, TimerOwner, TimerPurpose, TimerService,
    TimerSlots,
};
