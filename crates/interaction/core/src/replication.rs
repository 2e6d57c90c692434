//! Authority boundary between the source of truth and its replicas.
//!
//! A world is either [`Authority::Authoritative`] or a [`Authority::Replica`].
//! Every externally triggered mutation is routed first:
//!
//! - on the authority it runs as a [`Route::LocalMutation`]
//! - on a replica it becomes an [`AuthorityMessage::RemoteForward`] carrying the
//!   [`Request`], and the local call returns without effect
//!
//! The authority records which replicated fields changed in bit masks and turns
//! them into [`AuthorityMessage::ReplicatedUpdate`]s on flush. Replicas apply
//! those updates and re-broadcast the same events the authority emitted, so
//! observers on either side see one event protocol.

use std::collections::BTreeSet;

use bitflags::bitflags;

use crate::state::{
    ActorId, Channel, InteractableId, InteractableState, InteractorId, InteractorState, SurfaceId,
};

/// Which side of the boundary a world is on.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Authority {
    #[default]
    Authoritative,
    Replica,
}

impl Authority {
    pub const fn is_authoritative(self) -> bool {
        matches!(self, Self::Authoritative)
    }
}

/// Routing decision for one mutating call.
#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    LocalMutation,
    RemoteForward(Request),
}

/// Mutating operation forwarded from a replica to the authority.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Request {
    SetInteractableState {
        id: InteractableId,
        state: InteractableState,
    },
    SetInteractableDefaultState {
        id: InteractableId,
        state: InteractableState,
    },
    SetWeight {
        id: InteractableId,
        weight: i32,
    },
    SetLifecycleCount {
        id: InteractableId,
        count: i32,
    },
    SetCooldownPeriod {
        id: InteractableId,
        period: f32,
    },
    SetInteractionPeriod {
        id: InteractableId,
        period: f32,
    },
    SetHovered {
        id: InteractableId,
        surface: SurfaceId,
        hovered: bool,
    },
    TriggerCooldown {
        id: InteractableId,
    },
    AddInteractableDependency {
        master: InteractableId,
        dependent: InteractableId,
    },
    RemoveInteractableDependency {
        master: InteractableId,
        dependent: InteractableId,
    },
    SetInteractorState {
        id: InteractorId,
        state: InteractorState,
    },
    SetInteractorDefaultState {
        id: InteractorId,
        state: InteractorState,
    },
    SetResponseChannel {
        id: InteractorId,
        channel: Channel,
    },
    AddIgnoredActor {
        id: InteractorId,
        actor: ActorId,
    },
    RemoveIgnoredActor {
        id: InteractorId,
        actor: ActorId,
    },
    AddInteractorDependency {
        master: InteractorId,
        dependent: InteractorId,
    },
    RemoveInteractorDependency {
        master: InteractorId,
        dependent: InteractorId,
    },
    StartInteraction {
        id: InteractorId,
        time: f32,
    },
    StopInteraction {
        id: InteractorId,
        time: f32,
    },
    EnableTracing {
        id: InteractorId,
    },
    DisableTracing {
        id: InteractorId,
    },
    PauseTracing {
        id: InteractorId,
    },
    ResumeTracing {
        id: InteractorId,
    },
    BeginOverlap {
        id: InteractorId,
        surface: SurfaceId,
        other: ActorId,
    },
    EndOverlap {
        id: InteractorId,
        surface: SurfaceId,
        other: ActorId,
    },
}

impl Request {
    /// Operation name used in logs and forwarded errors.
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::SetInteractableState { .. } | Self::SetInteractorState { .. } => "set_state",
            Self::SetInteractableDefaultState { .. } | Self::SetInteractorDefaultState { .. } => {
                "set_default_state"
            }
            Self::SetWeight { .. } => "set_weight",
            Self::SetLifecycleCount { .. } => "set_lifecycle_count",
            Self::SetCooldownPeriod { .. } => "set_cooldown_period",
            Self::SetInteractionPeriod { .. } => "set_interaction_period",
            Self::SetHovered { .. } => "set_hovered",
            Self::TriggerCooldown { .. } => "trigger_cooldown",
            Self::AddInteractableDependency { .. } | Self::AddInteractorDependency { .. } => {
                "add_dependency"
            }
            Self::RemoveInteractableDependency { .. }
            | Self::RemoveInteractorDependency { .. } => "remove_dependency",
            Self::SetResponseChannel { .. } => "set_response_channel",
            Self::AddIgnoredActor { .. } => "add_ignored_actor",
            Self::RemoveIgnoredActor { .. } => "remove_ignored_actor",
            Self::StartInteraction { .. } => "start_interaction",
            Self::StopInteraction { .. } => "stop_interaction",
            Self::EnableTracing { .. } => "enable_tracing",
            Self::DisableTracing { .. } => "disable_tracing",
            Self::PauseTracing { .. } => "pause_tracing",
            Self::ResumeTracing { .. } => "resume_tracing",
            Self::BeginOverlap { .. } => "begin_overlap",
            Self::EndOverlap { .. } => "end_overlap",
        }
    }
}

bitflags! {
    /// Replicated fields of an interactable changed since the last flush.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct InteractableFields: u8 {
        const STATE               = 1 << 0;
        const DEFAULT_STATE       = 1 << 1;
        const WEIGHT              = 1 << 2;
        const REMAINING_LIFECYCLE = 1 << 3;
        const INTERACTOR          = 1 << 4;
    }
}

bitflags! {
    /// Replicated fields of an interactor changed since the last flush.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct InteractorFields: u8 {
        const STATE              = 1 << 0;
        const DEFAULT_STATE      = 1 << 1;
        const ACTIVE_INTERACTABLE = 1 << 2;
        const IGNORED_ACTORS     = 1 << 3;
        const RESPONSE_CHANNEL   = 1 << 4;
    }
}

/// New value of one replicated interactable field.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractableValue {
    State(InteractableState),
    DefaultState(InteractableState),
    Weight(i32),
    RemainingLifecycle(i32),
    Interactor(Option<InteractorId>),
}

/// New value of one replicated interactor field.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractorValue {
    State(InteractorState),
    DefaultState(InteractorState),
    ActiveInteractable(Option<InteractableId>),
    IgnoredActors(BTreeSet<ActorId>),
    ResponseChannel(Channel),
}

/// One-way push of a replicated field from the authority.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReplicatedUpdate {
    Interactable {
        id: InteractableId,
        value: InteractableValue,
    },
    Interactor {
        id: InteractorId,
        value: InteractorValue,
    },
}

/// Message crossing the authority boundary.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthorityMessage {
    /// Replica to authority.
    RemoteForward(Request),
    /// Authority to replicas.
    ReplicatedUpdate(ReplicatedUpdate),
}

/// Routes mutating calls by the world's [`Authority`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplicationGate {
    authority: Authority,
}

impl ReplicationGate {
    pub const fn new(authority: Authority) -> Self {
        Self { authority }
    }

    pub const fn authority(&self) -> Authority {
        self.authority
    }

    pub const fn is_authoritative(&self) -> bool {
        self.authority.is_authoritative()
    }

    /// Builds the request lazily so the authoritative path never allocates it.
    pub fn route(&self, request: impl FnOnce() -> Request) -> Route {
        if self.is_authoritative() {
            Route::LocalMutation
        } else {
            Route::RemoteForward(request())
        }
    }
}
