use std::collections::{BTreeMap, BTreeSet};

use crate::config::{InteractableConfig, LifecycleMode};
use crate::env::TimerSlots;
use crate::replication::InteractableFields;
use crate::state::{ActorId, InteractableId, InteractableState, InteractorId, SurfaceId};

/// Detection status of one interactable surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceStatus {
    /// Whether queries may currently report this surface.
    pub bound: bool,
    /// Whether the host reports a cursor over this surface.
    pub hovered: bool,
}

/// Runtime data of an interactable.
///
/// Mutation goes through [`InteractionWorld`](crate::InteractionWorld); this type
/// only exposes read accessors.
#[derive(Clone, Debug)]
pub struct Interactable {
    pub(crate) id: InteractableId,
    pub(crate) owner: ActorId,
    pub(crate) config: InteractableConfig,
    pub(crate) state: InteractableState,
    pub(crate) weight: i32,
    /// Weight to restore once no master forces it down.
    pub(crate) cached_weight: Option<i32>,
    /// Interactables currently holding this one as a dependency.
    pub(crate) masters: BTreeSet<InteractableId>,
    pub(crate) remaining_lifecycle: i32,
    pub(crate) interactor: Option<InteractorId>,
    pub(crate) dependencies: BTreeSet<InteractableId>,
    pub(crate) surfaces: BTreeMap<SurfaceId, SurfaceStatus>,
    pub(crate) highlighted: bool,
    pub(crate) widget_visible: bool,
    pub(crate) mash_presses: u32,
    pub(crate) timers: TimerSlots,
    pub(crate) begun: bool,
    pub(crate) dirty: InteractableFields,
}

impl Interactable {
    pub(crate) fn new(id: InteractableId, owner: ActorId, config: InteractableConfig) -> Self {
        let config = config.coerced();
        let surfaces = config
            .surfaces
            .iter()
            .map(|surface| (*surface, SurfaceStatus::default()))
            .collect();

        Self {
            id,
            owner,
            state: config.default_state,
            weight: config.weight,
            cached_weight: None,
            masters: BTreeSet::new(),
            remaining_lifecycle: config.initial_remaining(),
            interactor: None,
            dependencies: BTreeSet::new(),
            surfaces,
            highlighted: false,
            widget_visible: false,
            mash_presses: 0,
            timers: TimerSlots::default(),
            begun: false,
            dirty: InteractableFields::empty(),
            config,
        }
    }

    pub fn id(&self) -> InteractableId {
        self.id
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &InteractableConfig {
        &self.config
    }

    pub fn state(&self) -> InteractableState {
        self.state
    }

    pub fn default_state(&self) -> InteractableState {
        self.config.default_state
    }

    /// Effective weight, including any reduction forced by a master.
    pub fn weight(&self) -> i32 {
        self.weight
    }

    /// Weight restored when the last master releases this interactable.
    pub fn base_weight(&self) -> i32 {
        self.cached_weight.unwrap_or(self.weight)
    }

    pub fn remaining_lifecycle(&self) -> i32 {
        self.remaining_lifecycle
    }

    pub fn interactor(&self) -> Option<InteractorId> {
        self.interactor
    }

    pub fn dependencies(&self) -> &BTreeSet<InteractableId> {
        &self.dependencies
    }

    pub fn surfaces(&self) -> impl Iterator<Item = (SurfaceId, SurfaceStatus)> + '_ {
        self.surfaces.iter().map(|(id, status)| (*id, *status))
    }

    pub fn owns_surface(&self, surface: SurfaceId) -> bool {
        self.surfaces.contains_key(&surface)
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn is_widget_visible(&self) -> bool {
        self.widget_visible
    }

    pub fn mash_presses(&self) -> u32 {
        self.mash_presses
    }

    pub fn lifecycle_mode(&self) -> LifecycleMode {
        self.config.lifecycle_mode
    }

    /// Awake, Active or Paused with an interactor bound.
    pub fn can_interact(&self) -> bool {
        self.state.allows_interaction() && self.interactor.is_some()
    }

    /// Awake, Active or Paused with no interactor bound yet.
    pub fn can_be_triggered(&self) -> bool {
        self.state.allows_interaction() && self.interactor.is_none()
    }

    pub(crate) fn is_hovered(&self) -> bool {
        self.surfaces.values().any(|status| status.hovered)
    }

    /// Tag filter applied during arbitration.
    pub fn accepts_tag(&self, tag: Option<&str>) -> bool {
        let Some(tag) = tag else {
            return true;
        };
        if self.config.ignored_interactor_tags.contains(tag) {
            return false;
        }
        self.config.compatible_tags.is_empty() || self.config.compatible_tags.contains(tag)
    }

    pub(crate) fn mark(&mut self, fields: InteractableFields) {
        self.dirty |= fields;
    }
}
