//! Both ends of the authority boundary.
//!
//! The authority executes [`Request`]s forwarded by replicas and publishes
//! dirty fields with [`InteractionWorld::flush_replication`]. Replicas apply the
//! resulting [`ReplicatedUpdate`]s and re-broadcast the matching events.

use crate::env::SpatialQuery;
use crate::error::{InteractionError, Result};
use crate::event::{InteractableEvent, InteractorEvent, Present};
use crate::replication::{
    AuthorityMessage, InteractableFields, InteractableValue, InteractorFields, InteractorValue,
    ReplicatedUpdate, Request,
};
use crate::state::{InteractableId, InteractorId};

use super::InteractionWorld;

impl InteractionWorld {
    /// Executes a request forwarded by a replica. Only meaningful on the authority.
    pub fn handle_request(&mut self, request: Request, space: &dyn SpatialQuery) -> Result<()> {
        if !self.is_authoritative() {
            return Err(InteractionError::MissingPrecondition {
                operation: request.operation(),
                requirement: "authority",
            });
        }
        tracing::debug!(operation = request.operation(), "handling forwarded request");

        match request {
            Request::SetInteractableState { id, state } => {
                self.set_interactable_state(id, state)?;
            }
            Request::SetInteractableDefaultState { id, state } => {
                self.set_interactable_default_state(id, state)?
            }
            Request::SetWeight { id, weight } => self.set_weight(id, weight)?,
            Request::SetLifecycleCount { id, count } => self.set_lifecycle_count(id, count)?,
            Request::SetCooldownPeriod { id, period } => self.set_cooldown_period(id, period)?,
            Request::SetInteractionPeriod { id, period } => {
                self.set_interaction_period(id, period)?
            }
            Request::SetHovered {
                id,
                surface,
                hovered,
            } => self.set_hovered(id, surface, hovered)?,
            Request::TriggerCooldown { id } => {
                self.trigger_cooldown(id)?;
            }
            Request::AddInteractableDependency { master, dependent } => {
                self.add_interactable_dependency(master, dependent)?;
            }
            Request::RemoveInteractableDependency { master, dependent } => {
                self.remove_interactable_dependency(master, dependent)?;
            }
            Request::SetInteractorState { id, state } => {
                self.set_interactor_state(id, state)?;
            }
            Request::SetInteractorDefaultState { id, state } => {
                self.set_interactor_default_state(id, state)?
            }
            Request::SetResponseChannel { id, channel } => self.set_response_channel(id, channel)?,
            Request::AddIgnoredActor { id, actor } => {
                self.add_ignored_actor(id, actor)?;
            }
            Request::RemoveIgnoredActor { id, actor } => {
                self.remove_ignored_actor(id, actor)?;
            }
            Request::AddInteractorDependency { master, dependent } => {
                self.add_interactor_dependency(master, dependent)?;
            }
            Request::RemoveInteractorDependency { master, dependent } => {
                self.remove_interactor_dependency(master, dependent)?;
            }
            Request::StartInteraction { id, time } => {
                self.start_interaction(id, time)?;
            }
            Request::StopInteraction { id, time } => {
                self.stop_interaction(id, time)?;
            }
            Request::EnableTracing { id } => {
                self.enable_tracing(id)?;
            }
            Request::DisableTracing { id } => {
                self.disable_tracing(id)?;
            }
            Request::PauseTracing { id } => {
                self.pause_tracing(id)?;
            }
            Request::ResumeTracing { id } => {
                self.resume_tracing(id)?;
            }
            Request::BeginOverlap { id, surface, other } => {
                self.begin_overlap(id, surface, other, space)?;
            }
            Request::EndOverlap { id, surface, other } => {
                self.end_overlap(id, surface, other, space)?;
            }
        }
        Ok(())
    }

    /// Turns every dirty field into a replicated update in the outbox.
    /// Returns the number of updates queued.
    pub fn flush_replication(&mut self) -> usize {
        if !self.is_authoritative() {
            return 0;
        }
        let mut updates = Vec::new();

        for entity in self.interactables.values_mut() {
            let dirty = std::mem::take(&mut entity.dirty);
            let id = entity.id;
            let mut push = |value| updates.push(ReplicatedUpdate::Interactable { id, value });
            if dirty.contains(InteractableFields::STATE) {
                push(InteractableValue::State(entity.state));
            }
            if dirty.contains(InteractableFields::DEFAULT_STATE) {
                push(InteractableValue::DefaultState(entity.config.default_state));
            }
            if dirty.contains(InteractableFields::WEIGHT) {
                push(InteractableValue::Weight(entity.weight));
            }
            if dirty.contains(InteractableFields::REMAINING_LIFECYCLE) {
                push(InteractableValue::RemainingLifecycle(entity.remaining_lifecycle));
            }
            if dirty.contains(InteractableFields::INTERACTOR) {
                push(InteractableValue::Interactor(entity.interactor));
            }
        }

        for entity in self.interactors.values_mut() {
            let dirty = std::mem::take(&mut entity.dirty);
            let id = entity.id;
            let mut push = |value| updates.push(ReplicatedUpdate::Interactor { id, value });
            if dirty.contains(InteractorFields::STATE) {
                push(InteractorValue::State(entity.state));
            }
            if dirty.contains(InteractorFields::DEFAULT_STATE) {
                push(InteractorValue::DefaultState(entity.config.default_state));
            }
            if dirty.contains(InteractorFields::ACTIVE_INTERACTABLE) {
                push(InteractorValue::ActiveInteractable(entity.active));
            }
            if dirty.contains(InteractorFields::IGNORED_ACTORS) {
                push(InteractorValue::IgnoredActors(entity.ignored_actors.clone()));
            }
            if dirty.contains(InteractorFields::RESPONSE_CHANNEL) {
                push(InteractorValue::ResponseChannel(entity.config.response_channel));
            }
        }

        let count = updates.len();
        if count > 0 {
            tracing::trace!(count, "replicated updates flushed");
        }
        self.outbox
            .messages
            .extend(updates.into_iter().map(AuthorityMessage::ReplicatedUpdate));
        count
    }

    /// Applies an update received from the authority. Replica only.
    pub fn apply_replicated(&mut self, update: ReplicatedUpdate) -> Result<()> {
        if self.is_authoritative() {
            return Err(InteractionError::MissingPrecondition {
                operation: "apply_replicated",
                requirement: "replica",
            });
        }
        match update {
            ReplicatedUpdate::Interactable { id, value } => self.apply_interactable_value(id, value),
            ReplicatedUpdate::Interactor { id, value } => self.apply_interactor_value(id, value),
        }
    }

    fn apply_interactable_value(&mut self, id: InteractableId, value: InteractableValue) -> Result<()> {
        let entity = self.interactable_mut(id)?;
        match value {
            InteractableValue::State(to) => {
                let from = entity.state;
                if from == to {
                    return Ok(());
                }
                entity.state = to;
                self.emit_interactable(id, InteractableEvent::StateChanged { from, to });
                if !to.allows_interaction() {
                    self.stop_highlight(id);
                    self.hide_widget(id);
                }
            }
            InteractableValue::DefaultState(state) => {
                if entity.config.default_state == state {
                    return Ok(());
                }
                entity.config.default_state = state;
                self.emit_interactable(id, InteractableEvent::DefaultStateChanged { state });
            }
            InteractableValue::Weight(weight) => {
                if entity.weight == weight {
                    return Ok(());
                }
                entity.weight = weight;
                self.emit_interactable(id, InteractableEvent::WeightChanged { weight });
            }
            InteractableValue::RemainingLifecycle(remaining) => {
                if entity.remaining_lifecycle == remaining {
                    return Ok(());
                }
                entity.remaining_lifecycle = remaining;
                self.emit_interactable(id, InteractableEvent::LifecycleCountChanged { remaining });
            }
            InteractableValue::Interactor(interactor) => {
                let previous = std::mem::replace(&mut entity.interactor, interactor);
                if previous == interactor {
                    return Ok(());
                }
                if let Some(previous) = previous {
                    self.hide_widget(id);
                    self.emit_interactable(id, InteractableEvent::InteractorLost { interactor: previous });
                }
                if let Some(interactor) = interactor {
                    self.show_widget(id);
                    self.emit_interactable(id, InteractableEvent::InteractorFound { interactor });
                }
            }
        }
        Ok(())
    }

    fn apply_interactor_value(&mut self, id: InteractorId, value: InteractorValue) -> Result<()> {
        let entity = self.interactor_mut(id)?;
        match value {
            InteractorValue::State(to) => {
                let from = entity.state;
                if from == to {
                    return Ok(());
                }
                entity.state = to;
                self.emit_interactor(id, InteractorEvent::StateChanged { from, to });
            }
            InteractorValue::DefaultState(state) => {
                entity.config.default_state = state;
            }
            InteractorValue::ActiveInteractable(active) => {
                let previous = std::mem::replace(&mut entity.active, active);
                if previous == active {
                    return Ok(());
                }
                if let Some(interactable) = previous {
                    self.emit_interactor(id, InteractorEvent::InteractableLost { interactable });
                }
                if let Some(interactable) = active {
                    self.emit_interactor(id, InteractorEvent::InteractableUpdated { interactable });
                }
            }
            InteractorValue::IgnoredActors(actors) => {
                let previous = std::mem::replace(&mut entity.ignored_actors, actors.clone());
                for actor in actors.difference(&previous) {
                    self.emit_interactor(id, InteractorEvent::IgnoredActorAdded { actor: *actor });
                }
                for actor in previous.difference(&actors) {
                    self.emit_interactor(id, InteractorEvent::IgnoredActorRemoved { actor: *actor });
                }
            }
            InteractorValue::ResponseChannel(channel) => {
                if entity.config.response_channel == channel {
                    return Ok(());
                }
                entity.config.response_channel = channel;
                self.emit_interactor(id, InteractorEvent::ResponseChannelChanged { channel });
            }
        }
        Ok(())
    }

    fn show_widget(&mut self, id: InteractableId) {
        if let Some(entity) = self.interactables.get_mut(&id) {
            if !entity.widget_visible {
                entity.widget_visible = true;
                self.present(id, Present::SetVisible(true));
            }
        }
    }

    fn hide_widget(&mut self, id: InteractableId) {
        if let Some(entity) = self.interactables.get_mut(&id) {
            if entity.widget_visible {
                entity.widget_visible = false;
                self.present(id, Present::SetVisible(false));
            }
        }
    }
}
