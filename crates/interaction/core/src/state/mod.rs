//! Entity data and lifecycle states.
//!
//! Entities refer to each other by id only. A lookup of a despawned id yields
//! nothing, which is how weak references behave across the crate.
mod ids;
mod interactable;
mod interactor;
mod status;

pub use ids::{ActorId, Channel, InteractableId, InteractorId, SurfaceId};
pub use interactable::{Interactable, SurfaceStatus};
pub use interactor::Interactor;
pub use status::{InteractableState, InteractorState};
