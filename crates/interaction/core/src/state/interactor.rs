use std::collections::BTreeSet;

use crate::config::{Detection, InteractorConfig, SafetyTrace, SensorSurface, TraceSettings};
use crate::env::TimerSlots;
use crate::replication::InteractorFields;
use crate::state::{ActorId, Channel, InteractableId, InteractorId, InteractorState};

/// Runtime data of an interactor.
#[derive(Clone, Debug)]
pub struct Interactor {
    pub(crate) id: InteractorId,
    pub(crate) owner: ActorId,
    pub(crate) config: InteractorConfig,
    pub(crate) state: InteractorState,
    pub(crate) active: Option<InteractableId>,
    pub(crate) ignored_actors: BTreeSet<ActorId>,
    pub(crate) dependencies: BTreeSet<InteractorId>,
    pub(crate) timers: TimerSlots,
    pub(crate) begun: bool,
    pub(crate) dirty: InteractorFields,
}

impl Interactor {
    pub(crate) fn new(id: InteractorId, owner: ActorId, config: InteractorConfig) -> Self {
        let config = config.coerced();
        Self {
            id,
            owner,
            state: config.default_state,
            active: None,
            ignored_actors: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            timers: TimerSlots::default(),
            begun: false,
            dirty: InteractorFields::empty(),
            config,
        }
    }

    pub fn id(&self) -> InteractorId {
        self.id
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &InteractorConfig {
        &self.config
    }

    pub fn state(&self) -> InteractorState {
        self.state
    }

    pub fn default_state(&self) -> InteractorState {
        self.config.default_state
    }

    pub fn active_interactable(&self) -> Option<InteractableId> {
        self.active
    }

    pub fn ignored_actors(&self) -> &BTreeSet<ActorId> {
        &self.ignored_actors
    }

    pub fn dependencies(&self) -> &BTreeSet<InteractorId> {
        &self.dependencies
    }

    pub fn response_channel(&self) -> Channel {
        self.config.response_channel
    }

    pub fn tag(&self) -> Option<&str> {
        self.config.tag.as_deref()
    }

    pub fn safety_trace(&self) -> &SafetyTrace {
        &self.config.safety_trace
    }

    pub fn can_interact(&self) -> bool {
        self.state.can_interact()
    }

    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }

    pub fn sensor_surfaces(&self) -> &[SensorSurface] {
        match &self.config.detection {
            Detection::Overlap { surfaces } => surfaces,
            Detection::Trace(_) => &[],
        }
    }

    pub fn trace_settings(&self) -> Option<&TraceSettings> {
        match &self.config.detection {
            Detection::Trace(settings) => Some(settings),
            Detection::Overlap { .. } => None,
        }
    }

    /// Actors excluded from every query this interactor issues.
    pub(crate) fn query_exclusions(&self) -> BTreeSet<ActorId> {
        let mut excluded = self.ignored_actors.clone();
        excluded.insert(self.owner);
        excluded
    }

    pub(crate) fn mark(&mut self, fields: InteractorFields) {
        self.dirty |= fields;
    }
}
