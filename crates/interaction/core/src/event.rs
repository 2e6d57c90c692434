//! Events and fire-and-forget commands produced by the world.
//!
//! Every broadcast of the two state machines lands in an outbox as an
//! [`InteractionEvent`]. Hosts drain the outbox after each call or tick.
//! Presentation and collision commands are separate streams because the core
//! never reads anything back from them.

use crate::config::HighlightSetup;
use crate::state::{
    ActorId, Channel, InteractableId, InteractableState, InteractorId, InteractorState, SurfaceId,
};

/// Broadcasts of an interactable.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractableEvent {
    StateChanged {
        from: InteractableState,
        to: InteractableState,
    },
    DefaultStateChanged {
        state: InteractableState,
    },
    WeightChanged {
        weight: i32,
    },
    InteractorFound {
        interactor: InteractorId,
    },
    InteractorLost {
        interactor: InteractorId,
    },
    Selected {
        interactor: InteractorId,
    },
    InteractionStarted {
        time: f32,
        interactor: InteractorId,
    },
    InteractionStopped {
        time: f32,
        interactor: InteractorId,
    },
    InteractionCompleted {
        time: f32,
        interactor: Option<InteractorId>,
    },
    InteractionCanceled,
    InteractionFailed,
    CycleCompleted {
        time: f32,
        remaining: i32,
    },
    CooldownCompleted,
    KeyMashed {
        presses: u32,
    },
    LifecycleCountChanged {
        remaining: i32,
    },
    DependencyStarted {
        master: InteractableId,
    },
    DependencyStopped {
        master: InteractableId,
    },
}

/// Broadcasts of an interactor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractorEvent {
    StateChanged {
        from: InteractorState,
        to: InteractorState,
    },
    InteractableFound {
        interactable: InteractableId,
    },
    InteractableLost {
        interactable: InteractableId,
    },
    /// The active binding was (re)affirmed.
    InteractableUpdated {
        interactable: InteractableId,
    },
    InteractionStarted {
        time: f32,
        interactable: InteractableId,
    },
    InteractionStopped {
        time: f32,
        interactable: InteractableId,
    },
    IgnoredActorAdded {
        actor: ActorId,
    },
    IgnoredActorRemoved {
        actor: ActorId,
    },
    DependencyAdded {
        dependent: InteractorId,
    },
    DependencyRemoved {
        dependent: InteractorId,
    },
    ResponseChannelChanged {
        channel: Channel,
    },
    TracingEnabled,
    TracingDisabled,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractionEvent {
    Interactable {
        id: InteractableId,
        event: InteractableEvent,
    },
    Interactor {
        id: InteractorId,
        event: InteractorEvent,
    },
}

impl InteractionEvent {
    pub fn interactable(&self) -> Option<(InteractableId, &InteractableEvent)> {
        match self {
            Self::Interactable { id, event } => Some((*id, event)),
            Self::Interactor { .. } => None,
        }
    }

    pub fn interactor(&self) -> Option<(InteractorId, &InteractorEvent)> {
        match self {
            Self::Interactor { id, event } => Some((*id, event)),
            Self::Interactable { .. } => None,
        }
    }
}

/// Command for the widget and highlight layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Present {
    ShowProgress(f32),
    SetVisible(bool),
    SetHighlight {
        enabled: bool,
        setup: Option<HighlightSetup>,
    },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PresentCommand {
    pub target: InteractableId,
    pub command: Present,
}

/// Enables or disables detection of a collision surface in the host scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SurfaceCommand {
    Bind(SurfaceId),
    Unbind(SurfaceId),
}
