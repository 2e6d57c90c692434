//! Interactor state machine and candidate evaluation.

use crate::config::{SafetyTrace, coerce_interactor_default};
use crate::error::{Accepted, RequestError, RequestResult, Result};
use crate::event::InteractorEvent;
use crate::replication::{InteractorFields, Request};
use crate::state::{ActorId, Channel, InteractableId, InteractorId, InteractorState};

use super::InteractionWorld;
use super::interactable::display_name;

impl InteractionWorld {
    // ===== transitions =====

    pub fn set_interactor_state(&mut self, id: InteractorId, state: InteractorState) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::SetInteractorState { id, state })?;
        Ok(self.transition_interactor(id, state))
    }

    pub(crate) fn transition_interactor(&mut self, id: InteractorId, to: InteractorState) -> bool {
        let Some(entity) = self.interactors.get_mut(&id) else {
            return false;
        };
        let from = entity.state;
        if !from.permits(to) {
            tracing::trace!(%id, %from, %to, "interactor transition rejected");
            return false;
        }

        entity.state = to;
        entity.mark(InteractorFields::STATE);
        tracing::trace!(%id, %from, %to, "interactor transition");

        self.emit_interactor(id, InteractorEvent::StateChanged { from, to });
        self.interactor_arrived(id, to);
        self.process_interactor_dependencies(id);
        true
    }

    /// Trace detection follows the state: on while the interactor can interact.
    pub(crate) fn interactor_arrived(&mut self, id: InteractorId, state: InteractorState) {
        let tracing_detection = self
            .interactors
            .get(&id)
            .is_some_and(|entity| entity.trace_settings().is_some());
        if !tracing_detection {
            return;
        }
        if state.can_interact() {
            self.enable_tracing_local(id);
        } else {
            self.disable_tracing_local(id);
        }
    }

    pub(crate) fn route_interactor(&mut self, id: InteractorId, target: InteractorState) {
        let Some(entity) = self.interactors.get(&id) else {
            return;
        };
        let Some(path) = entity.state.route_to(target) else {
            tracing::debug!(%id, from = %entity.state, to = %target, "no route between states");
            return;
        };
        for hop in path {
            if !self.transition_interactor(id, hop) {
                break;
            }
        }
    }

    fn route_interactor_to_default(&mut self, id: InteractorId) {
        if let Some(target) = self.interactors.get(&id).map(|entity| entity.default_state()) {
            self.route_interactor(id, target);
        }
    }

    // ===== convenience requests =====

    pub fn activate_interactor(&mut self, id: InteractorId) -> RequestResult {
        self.request_interactor_state(id, InteractorState::Active, "activated")
    }

    pub fn wake_up_interactor(&mut self, id: InteractorId) -> RequestResult {
        self.request_interactor_state(id, InteractorState::Awake, "awoken")
    }

    pub fn suppress_interactor(&mut self, id: InteractorId) -> RequestResult {
        self.request_interactor_state(id, InteractorState::Suppressed, "suppressed")
    }

    pub fn deactivate_interactor(&mut self, id: InteractorId) -> RequestResult {
        self.request_interactor_state(id, InteractorState::Disabled, "disabled")
    }

    pub fn sleep_interactor(&mut self, id: InteractorId) -> RequestResult {
        self.request_interactor_state(id, InteractorState::Asleep, "put to sleep")
    }

    fn request_interactor_state(
        &mut self,
        id: InteractorId,
        to: InteractorState,
        verb: &'static str,
    ) -> RequestResult {
        let entity = self.require_interactor(id)?;
        let subject = display_name(entity.name(), id);
        let current = entity.state;

        if current == to {
            return Err(RequestError::Already {
                subject,
                state: to.to_string(),
            });
        }
        if !current.permits(to) {
            return Err(RequestError::Rejected {
                subject,
                state: current.to_string(),
                verb,
            });
        }

        self.set_interactor_state(id, to)?;
        Ok(Accepted { subject, verb })
    }

    // ===== configuration =====

    pub fn set_interactor_default_state(
        &mut self,
        id: InteractorId,
        state: InteractorState,
    ) -> Result<()> {
        self.require_interactor(id)?;
        self.authorize(|| Request::SetInteractorDefaultState { id, state })?;

        let entity = self.interactor_mut(id)?;
        entity.config.default_state = coerce_interactor_default(state);
        entity.mark(InteractorFields::DEFAULT_STATE);
        Ok(())
    }

    pub fn set_response_channel(&mut self, id: InteractorId, channel: Channel) -> Result<()> {
        self.require_interactor(id)?;
        self.authorize(|| Request::SetResponseChannel { id, channel })?;

        let entity = self.interactor_mut(id)?;
        if entity.config.response_channel == channel {
            return Ok(());
        }
        entity.config.response_channel = channel;
        entity.mark(InteractorFields::RESPONSE_CHANNEL);
        self.emit_interactor(id, InteractorEvent::ResponseChannelChanged { channel });
        Ok(())
    }

    /// Host-local, not replicated.
    pub fn set_safety_trace(&mut self, id: InteractorId, safety_trace: SafetyTrace) -> Result<()> {
        self.interactor_mut(id)?.config.safety_trace = safety_trace;
        Ok(())
    }

    pub fn add_ignored_actor(&mut self, id: InteractorId, actor: ActorId) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::AddIgnoredActor { id, actor })?;

        let entity = self.interactor_mut(id)?;
        if !entity.ignored_actors.insert(actor) {
            return Ok(false);
        }
        entity.mark(InteractorFields::IGNORED_ACTORS);
        self.emit_interactor(id, InteractorEvent::IgnoredActorAdded { actor });
        Ok(true)
    }

    pub fn remove_ignored_actor(&mut self, id: InteractorId, actor: ActorId) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::RemoveIgnoredActor { id, actor })?;

        let entity = self.interactor_mut(id)?;
        if !entity.ignored_actors.remove(&actor) {
            return Ok(false);
        }
        entity.mark(InteractorFields::IGNORED_ACTORS);
        self.emit_interactor(id, InteractorEvent::IgnoredActorRemoved { actor });
        Ok(true)
    }

    // ===== dependencies =====

    pub fn add_interactor_dependency(
        &mut self,
        master: InteractorId,
        dependent: InteractorId,
    ) -> Result<bool> {
        self.require_interactor(master)?;
        self.require_interactor(dependent)?;
        self.authorize(|| Request::AddInteractorDependency { master, dependent })?;
        if master == dependent {
            return Ok(false);
        }

        if !self.interactor_mut(master)?.dependencies.insert(dependent) {
            return Ok(false);
        }
        self.emit_interactor(master, InteractorEvent::DependencyAdded { dependent });
        self.process_interactor_dependencies(master);
        Ok(true)
    }

    pub fn remove_interactor_dependency(
        &mut self,
        master: InteractorId,
        dependent: InteractorId,
    ) -> Result<bool> {
        self.require_interactor(master)?;
        self.authorize(|| Request::RemoveInteractorDependency { master, dependent })?;

        if !self.interactor_mut(master)?.dependencies.remove(&dependent) {
            return Ok(false);
        }
        self.emit_interactor(master, InteractorEvent::DependencyRemoved { dependent });
        self.restore_interactor_dependent(dependent);
        Ok(true)
    }

    pub(crate) fn process_interactor_dependencies(&mut self, id: InteractorId) {
        let Some(entity) = self.interactors.get(&id) else {
            return;
        };
        if entity.dependencies.is_empty() {
            return;
        }
        let state = entity.state;
        let dependents: Vec<_> = entity.dependencies.iter().copied().collect();

        if !self.enter_dependencies(&id) {
            return;
        }
        use InteractorState::*;
        match state {
            Active | Suppressed | Asleep => {
                for dependent in dependents {
                    self.transition_interactor(dependent, Suppressed);
                }
            }
            Awake => {
                for dependent in dependents {
                    self.restore_interactor_dependent(dependent);
                }
            }
            Disabled => {
                for dependent in dependents {
                    self.restore_interactor_dependent(dependent);
                    if let Some(entity) = self.interactors.get_mut(&id) {
                        entity.dependencies.remove(&dependent);
                    }
                    self.emit_interactor(id, InteractorEvent::DependencyRemoved { dependent });
                }
            }
        }
        self.leave_dependencies();
    }

    fn restore_interactor_dependent(&mut self, dependent: InteractorId) {
        let resting = self.interactors.get(&dependent).is_some_and(|entity| {
            matches!(
                entity.state,
                InteractorState::Suppressed | InteractorState::Awake | InteractorState::Asleep
            )
        });
        if resting {
            self.route_interactor_to_default(dependent);
        }
    }

    // ===== evaluation =====

    /// Weighs `candidate` against the current selection.
    ///
    /// `None` drops the current selection. A heavier candidate replaces it; an
    /// equal or lighter one is turned away and the incumbent is re-affirmed.
    pub(crate) fn evaluate_interactable(
        &mut self,
        id: InteractorId,
        candidate: Option<InteractableId>,
    ) {
        let Some(entity) = self.interactors.get(&id) else {
            return;
        };
        if !entity.state.can_evaluate() {
            tracing::trace!(%id, state = %entity.state, "evaluation skipped");
            return;
        }
        let active = entity.active;

        let Some(candidate) = candidate else {
            if let Some(active) = active {
                self.interactable_lost(id, active);
            }
            return;
        };

        match active {
            None => self.bind_interactable(id, candidate),
            Some(active) if active == candidate => {
                self.emit_interactor(id, InteractorEvent::InteractableUpdated { interactable: active });
            }
            Some(active) => {
                let weight_of = |world: &Self, target: InteractableId| {
                    world.interactables.get(&target).map_or(i32::MIN, |entity| entity.weight)
                };
                if weight_of(self, candidate) > weight_of(self, active) {
                    self.interactable_lost(id, active);
                    self.bind_interactable(id, candidate);
                } else {
                    self.emit_interactor(
                        id,
                        InteractorEvent::InteractableLost {
                            interactable: candidate,
                        },
                    );
                    self.interactor_lost(candidate, id);
                    self.emit_interactor(id, InteractorEvent::InteractableUpdated { interactable: active });
                }
            }
        }
    }

    fn bind_interactable(&mut self, id: InteractorId, interactable: InteractableId) {
        let Some(entity) = self.interactors.get_mut(&id) else {
            return;
        };
        entity.active = Some(interactable);
        entity.mark(InteractorFields::ACTIVE_INTERACTABLE);
        tracing::debug!(%id, %interactable, "interactable selected");

        self.emit_interactor(id, InteractorEvent::InteractableUpdated { interactable });
        self.interactable_selected(interactable, id);
    }

    /// Candidate reported by detection: offered to the interactable, then weighed.
    pub(crate) fn interactable_found(&mut self, id: InteractorId, interactable: InteractableId) {
        self.emit_interactor(id, InteractorEvent::InteractableFound { interactable });
        self.interactor_found(interactable, id);
        self.evaluate_interactable(id, Some(interactable));
    }

    /// Drops `interactable` from this interactor and releases it.
    pub(crate) fn interactable_lost(&mut self, id: InteractorId, interactable: InteractableId) {
        self.emit_interactor(id, InteractorEvent::InteractableLost { interactable });
        self.clear_active(id, interactable);
        self.interactor_lost(interactable, id);
    }

    /// The interactable dropped its binding on its own.
    pub(crate) fn interactor_released(&mut self, id: InteractorId, interactable: InteractableId) {
        let is_active = self
            .interactors
            .get(&id)
            .is_some_and(|entity| entity.active == Some(interactable));
        if !is_active {
            return;
        }
        self.emit_interactor(id, InteractorEvent::InteractableLost { interactable });
        self.clear_active(id, interactable);
    }

    fn clear_active(&mut self, id: InteractorId, interactable: InteractableId) {
        let Some(entity) = self.interactors.get_mut(&id) else {
            return;
        };
        if entity.active != Some(interactable) {
            return;
        }
        entity.active = None;
        entity.mark(InteractorFields::ACTIVE_INTERACTABLE);
        if entity.state == InteractorState::Active {
            self.transition_interactor(id, InteractorState::Awake);
        }
    }

    // ===== interaction =====

    /// Starts interacting with the active interactable.
    pub fn start_interaction(&mut self, id: InteractorId, time: f32) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::StartInteraction { id, time })?;

        let entity = self.require_interactor(id)?;
        let Some(interactable) = entity.active else {
            tracing::debug!(%id, "nothing to interact with");
            return Ok(false);
        };
        if !entity.can_interact() {
            tracing::debug!(%id, state = %entity.state, "interactor cannot interact");
            return Ok(false);
        }

        self.transition_interactor(id, InteractorState::Active);
        self.emit_interactor(id, InteractorEvent::InteractionStarted { time, interactable });
        Ok(self.start_interaction_on(interactable, time, id))
    }

    /// Stops interacting with the active interactable.
    pub fn stop_interaction(&mut self, id: InteractorId, time: f32) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::StopInteraction { id, time })?;

        let entity = self.require_interactor(id)?;
        let Some(interactable) = entity.active else {
            return Ok(false);
        };
        if !entity.can_interact() {
            return Ok(false);
        }

        self.route_interactor_to_default(id);
        self.emit_interactor(id, InteractorEvent::InteractionStopped { time, interactable });
        Ok(self.stop_interaction_on(interactable, time, id))
    }
}
