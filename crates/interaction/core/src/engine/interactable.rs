//! Interactable state machine.
//!
//! [`InteractionWorld::set_interactable_state`] is the only way an interactable
//! changes state. An accepted transition writes the state, broadcasts it, runs
//! the side effects of the arriving state and then processes dependencies.

use crate::config::{
    INFINITE_LIFECYCLE, INSTANT_PERIOD, InteractionStyle, LifecycleMode, MIN_EXPIRATION_PERIOD,
    coerce_cooldown_period, coerce_interactable_default, coerce_interaction_period,
    coerce_lifecycle_count, coerce_weight,
};
use crate::env::{TimerKind, TimerOwner};
use crate::error::{Accepted, RequestError, RequestResult, Result};
use crate::event::{InteractableEvent, Present, SurfaceCommand};
use crate::replication::{InteractableFields, Request};
use crate::state::{InteractableId, InteractableState, InteractorId, SurfaceId};

use super::InteractionWorld;
use super::style::StyleContext;

/// Timers tied to one interaction attempt.
const ATTEMPT_TIMERS: [TimerKind; 3] = [
    TimerKind::Interaction,
    TimerKind::ProgressExpiration,
    TimerKind::Keystroke,
];

impl InteractionWorld {
    // ===== transitions =====

    /// Requests a state change. Returns whether the transition table accepted it.
    pub fn set_interactable_state(
        &mut self,
        id: InteractableId,
        state: InteractableState,
    ) -> Result<bool> {
        self.require_interactable(id)?;
        self.authorize(|| Request::SetInteractableState { id, state })?;
        Ok(self.transition_interactable(id, state))
    }

    pub(crate) fn transition_interactable(
        &mut self,
        id: InteractableId,
        to: InteractableState,
    ) -> bool {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return false;
        };
        let from = entity.state;
        if !from.permits(to) {
            tracing::trace!(%id, %from, %to, "interactable transition rejected");
            return false;
        }

        entity.state = to;
        entity.mark(InteractableFields::STATE);
        tracing::trace!(%id, %from, %to, "interactable transition");

        self.emit_interactable(id, InteractableEvent::StateChanged { from, to });
        self.interactable_arrived(id, from, to);
        self.process_interactable_dependencies(id);
        true
    }

    fn interactable_arrived(
        &mut self,
        id: InteractableId,
        from: InteractableState,
        to: InteractableState,
    ) {
        use InteractableState::*;

        match to {
            Active | Paused => {}
            Awake => self.bind_surfaces(id),
            Asleep | Disabled => self.shut_down(id),
            Cooldown => {
                self.stop_highlight(id);
                self.cancel_attempt_timers(id);
                if !matches!(from, Awake | Active) {
                    self.shut_down(id);
                }
            }
            Completed => {
                self.shut_down(id);
                if let Some(entity) = self.interactables.get_mut(&id) {
                    entity.surfaces.clear();
                    entity.config.highlight = None;
                }
            }
            Suppressed => {
                self.cancel_attempt_timers(id);
                if from == Cooldown {
                    self.cancel_timer(id, TimerKind::Cooldown);
                }
                self.emit_interactable(id, InteractableEvent::InteractionCanceled);
            }
        }
    }

    /// Highlight off, every timer canceled, interactor released, surfaces unbound.
    fn shut_down(&mut self, id: InteractableId) {
        self.stop_highlight(id);
        if let Some(entity) = self.interactables.get_mut(&id) {
            entity.timers.cancel_all(self.timers.as_mut());
            entity.mash_presses = 0;
        }
        self.release_interactor(id);
        self.unbind_surfaces(id);
    }

    /// Walks legal edges until `target` is reached. Cooldown and Completed are
    /// left alone.
    pub(crate) fn route_interactable(&mut self, id: InteractableId, target: InteractableState) {
        let Some(entity) = self.interactables.get(&id) else {
            return;
        };
        if matches!(
            entity.state,
            InteractableState::Cooldown | InteractableState::Completed
        ) {
            return;
        }
        let Some(path) = entity.state.route_to(target) else {
            tracing::debug!(%id, from = %entity.state, to = %target, "no route between states");
            return;
        };
        for hop in path {
            if !self.transition_interactable(id, hop) {
                break;
            }
        }
    }

    pub(crate) fn route_interactable_to_default(&mut self, id: InteractableId) {
        if let Some(target) = self.interactables.get(&id).map(|entity| entity.default_state()) {
            self.route_interactable(id, target);
        }
    }

    // ===== convenience requests =====

    pub fn activate_interactable(&mut self, id: InteractableId) -> RequestResult {
        self.request_interactable_state(id, InteractableState::Active, "activated")
    }

    pub fn wake_up_interactable(&mut self, id: InteractableId) -> RequestResult {
        self.request_interactable_state(id, InteractableState::Awake, "awoken")
    }

    pub fn complete_interactable(&mut self, id: InteractableId) -> RequestResult {
        self.request_interactable_state(id, InteractableState::Completed, "completed")
    }

    pub fn deactivate_interactable(&mut self, id: InteractableId) -> RequestResult {
        self.request_interactable_state(id, InteractableState::Disabled, "disabled")
    }

    pub fn suppress_interactable(&mut self, id: InteractableId) -> RequestResult {
        self.request_interactable_state(id, InteractableState::Suppressed, "suppressed")
    }

    pub fn sleep_interactable(&mut self, id: InteractableId) -> RequestResult {
        self.request_interactable_state(id, InteractableState::Asleep, "put to sleep")
    }

    fn request_interactable_state(
        &mut self,
        id: InteractableId,
        to: InteractableState,
        verb: &'static str,
    ) -> RequestResult {
        let entity = self.require_interactable(id)?;
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

        self.set_interactable_state(id, to)?;
        Ok(Accepted { subject, verb })
    }

    // ===== configuration =====

    pub fn set_interactable_default_state(
        &mut self,
        id: InteractableId,
        state: InteractableState,
    ) -> Result<()> {
        self.require_interactable(id)?;
        self.authorize(|| Request::SetInteractableDefaultState { id, state })?;

        let state = coerce_interactable_default(state);
        let entity = self.interactable_mut(id)?;
        if entity.config.default_state == state {
            return Ok(());
        }
        entity.config.default_state = state;
        entity.mark(InteractableFields::DEFAULT_STATE);
        self.emit_interactable(id, InteractableEvent::DefaultStateChanged { state });
        Ok(())
    }

    /// Sets the base weight. A weight currently forced down by a master stays
    /// capped until the master releases it.
    pub fn set_weight(&mut self, id: InteractableId, weight: i32) -> Result<()> {
        self.require_interactable(id)?;
        self.authorize(|| Request::SetWeight { id, weight })?;

        let weight = coerce_weight(weight);
        let entity = self.interactable_mut(id)?;
        entity.cached_weight = Some(weight);
        let dependents: Vec<_> = entity.dependencies.iter().copied().collect();

        self.apply_forced_weight(id);
        for dependent in dependents {
            self.apply_forced_weight(dependent);
        }
        Ok(())
    }

    /// Cycled mode only. Also resets the remaining count.
    pub fn set_lifecycle_count(&mut self, id: InteractableId, count: i32) -> Result<()> {
        self.require_interactable(id)?;
        self.authorize(|| Request::SetLifecycleCount { id, count })?;

        let entity = self.interactable_mut(id)?;
        if entity.config.lifecycle_mode != LifecycleMode::Cycled {
            tracing::warn!(%id, "lifecycle count only applies to cycled interactables");
            return Ok(());
        }
        let count = coerce_lifecycle_count(count);
        entity.config.lifecycle_count = count;
        entity.remaining_lifecycle = count;
        entity.mark(InteractableFields::REMAINING_LIFECYCLE);
        self.emit_interactable(
            id,
            InteractableEvent::LifecycleCountChanged { remaining: count },
        );
        Ok(())
    }

    pub fn set_cooldown_period(&mut self, id: InteractableId, period: f32) -> Result<()> {
        self.require_interactable(id)?;
        self.authorize(|| Request::SetCooldownPeriod { id, period })?;
        self.interactable_mut(id)?.config.cooldown_period = coerce_cooldown_period(period);
        Ok(())
    }

    pub fn set_interaction_period(&mut self, id: InteractableId, period: f32) -> Result<()> {
        self.require_interactable(id)?;
        self.authorize(|| Request::SetInteractionPeriod { id, period })?;
        let entity = self.interactable_mut(id)?;
        entity.config.interaction_period = coerce_interaction_period(&entity.config.style, period);
        Ok(())
    }

    /// Registers a collision surface. Host-local, never replicated.
    pub fn add_surface(&mut self, id: InteractableId, surface: SurfaceId) -> Result<()> {
        let entity = self.interactable_mut(id)?;
        if entity.surfaces.contains_key(&surface) {
            return Ok(());
        }
        entity.surfaces.insert(surface, Default::default());
        if entity.state == InteractableState::Awake {
            self.bind_surfaces(id);
        }
        Ok(())
    }

    pub fn remove_surface(&mut self, id: InteractableId, surface: SurfaceId) -> Result<()> {
        let entity = self.interactable_mut(id)?;
        if let Some(status) = entity.surfaces.remove(&surface) {
            if status.bound {
                self.outbox.surfaces.push(SurfaceCommand::Unbind(surface));
            }
        }
        Ok(())
    }

    /// Marks a surface as hovered, which the hover style requires to interact.
    pub fn set_hovered(&mut self, id: InteractableId, surface: SurfaceId, hovered: bool) -> Result<()> {
        self.require_interactable(id)?;
        self.authorize(|| Request::SetHovered {
            id,
            surface,
            hovered,
        })?;
        if let Some(status) = self.interactable_mut(id)?.surfaces.get_mut(&surface) {
            status.hovered = hovered;
        }
        Ok(())
    }

    // ===== selection protocol =====

    /// An interactor found this interactable. Binds it if nothing else is bound.
    pub(crate) fn interactor_found(&mut self, id: InteractableId, interactor: InteractorId) -> bool {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return false;
        };
        if !entity.can_be_triggered() {
            return false;
        }
        entity.interactor = Some(interactor);
        entity.mark(InteractableFields::INTERACTOR);

        self.toggle_active(id, true);
        self.emit_interactable(id, InteractableEvent::InteractorFound { interactor });
        true
    }

    /// The bound interactor selected this interactable as its active one.
    pub(crate) fn interactable_selected(&mut self, id: InteractableId, interactor: InteractorId) {
        let Some(entity) = self.interactables.get(&id) else {
            return;
        };
        if entity.interactor != Some(interactor) {
            return;
        }
        let style = entity.config.style;

        self.transition_interactable(id, InteractableState::Active);
        self.emit_interactable(id, InteractableEvent::Selected { interactor });
        style.on_selected(&mut StyleContext::new(self, id, interactor));
    }

    /// The bound interactor lost this interactable.
    pub(crate) fn interactor_lost(&mut self, id: InteractableId, interactor: InteractorId) {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        if entity.interactor != Some(interactor) {
            return;
        }
        entity.interactor = None;
        entity.mark(InteractableFields::INTERACTOR);
        entity.mash_presses = 0;

        self.cancel_attempt_timers(id);
        self.toggle_active(id, false);
        self.route_interactable_to_default(id);
        self.emit_interactable(id, InteractableEvent::InteractorLost { interactor });
        self.emit_interactable(id, InteractableEvent::InteractionCanceled);
    }

    /// Drops the binding on both sides without changing this interactable's state.
    fn release_interactor(&mut self, id: InteractableId) {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        let Some(interactor) = entity.interactor.take() else {
            return;
        };
        entity.mark(InteractableFields::INTERACTOR);

        self.toggle_active(id, false);
        self.emit_interactable(id, InteractableEvent::InteractorLost { interactor });
        self.interactor_released(interactor, id);
    }

    // ===== interaction =====

    pub(crate) fn start_interaction_on(
        &mut self,
        id: InteractableId,
        time: f32,
        interactor: InteractorId,
    ) -> bool {
        let Some(entity) = self.interactables.get(&id) else {
            return false;
        };
        let style = entity.config.style;
        let hover_blocked = matches!(style, InteractionStyle::Hover) && !entity.is_hovered();
        if !entity.can_interact() || entity.interactor != Some(interactor) || hover_blocked {
            tracing::debug!(%id, state = %entity.state, %interactor, "interaction cannot start");
            return false;
        }

        self.cancel_timer(id, TimerKind::ProgressExpiration);
        self.transition_interactable(id, InteractableState::Active);
        self.emit_interactable(id, InteractableEvent::InteractionStarted { time, interactor });
        style.on_interaction_started(&mut StyleContext::new(self, id, interactor).at(time));
        true
    }

    pub(crate) fn stop_interaction_on(
        &mut self,
        id: InteractableId,
        time: f32,
        interactor: InteractorId,
    ) -> bool {
        let Some(entity) = self.interactables.get(&id) else {
            return false;
        };
        if entity.state != InteractableState::Active || entity.interactor != Some(interactor) {
            return false;
        }
        let style = entity.config.style;
        let persist = entity.config.persistence.can_persist;

        let mut ctx = StyleContext::new(self, id, interactor).at(time);
        if !style.on_stop_requested(&mut ctx) {
            tracing::trace!(%id, "stop ignored by style");
            return false;
        }

        self.emit_interactable(id, InteractableEvent::InteractionStopped { time, interactor });
        let has_progress = self
            .interactables
            .get(&id)
            .and_then(|entity| entity.timers.get(TimerKind::Interaction))
            .is_some();
        if persist && has_progress {
            self.pause_interaction(id);
        } else {
            self.cancel_interaction(id);
        }
        true
    }

    /// Keeps progress and starts the expiration window.
    fn pause_interaction(&mut self, id: InteractableId) {
        if !self.transition_interactable(id, InteractableState::Paused) {
            return;
        }
        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        if let Some(handle) = entity.timers.get(TimerKind::Interaction) {
            self.timers.pause(handle);
        }
        let expiration = entity
            .config
            .persistence
            .expiration_period
            .max(MIN_EXPIRATION_PERIOD);
        entity.timers.start(
            self.timers.as_mut(),
            TimerOwner::Interactable(id),
            TimerKind::ProgressExpiration,
            expiration,
        );
    }

    /// Drops the current attempt. The binding stays, so the object remains selected.
    pub(crate) fn cancel_interaction(&mut self, id: InteractableId) {
        self.cancel_attempt_timers(id);
        if let Some(entity) = self.interactables.get_mut(&id) {
            entity.mash_presses = 0;
        }
        self.hide_progress(id);
        if self.interactables.get(&id).map(|entity| entity.state) == Some(InteractableState::Paused) {
            self.transition_interactable(id, InteractableState::Active);
        }
        self.emit_interactable(id, InteractableEvent::InteractionCanceled);
    }

    /// Completes the attempt, cycling into cooldown while cycles remain.
    pub(crate) fn finish_interaction(&mut self, id: InteractableId, time: f32) {
        let Some(entity) = self.interactables.get(&id) else {
            return;
        };
        let interactor = entity.interactor;
        let cycled = entity.config.lifecycle_mode == LifecycleMode::Cycled;

        self.hide_progress(id);
        if cycled && self.trigger_cooldown_at(id, time) {
            return;
        }
        self.transition_interactable(id, InteractableState::Completed);
        self.emit_interactable(
            id,
            InteractableEvent::InteractionCompleted { time, interactor },
        );
    }

    /// Consumes one cycle. Returns false once the lifecycle is exhausted, in
    /// which case the caller completes the object instead.
    pub fn trigger_cooldown(&mut self, id: InteractableId) -> Result<bool> {
        self.require_interactable(id)?;
        self.authorize(|| Request::TriggerCooldown { id })?;
        let now = self.now();
        Ok(self.trigger_cooldown_at(id, now))
    }

    fn trigger_cooldown_at(&mut self, id: InteractableId, time: f32) -> bool {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return false;
        };
        let state = entity.state;
        if state != InteractableState::Cooldown && !state.permits(InteractableState::Cooldown) {
            tracing::debug!(%id, %state, "cooldown not reachable");
            return false;
        }

        if entity.remaining_lifecycle != INFINITE_LIFECYCLE {
            entity.remaining_lifecycle = (entity.remaining_lifecycle - 1).max(0);
            entity.mark(InteractableFields::REMAINING_LIFECYCLE);
        }
        let remaining = entity.remaining_lifecycle;
        if remaining == 0 {
            tracing::debug!(%id, "lifecycle exhausted");
            return false;
        }
        let period = entity.config.cooldown_period;

        self.transition_interactable(id, InteractableState::Cooldown);
        let Some(entity) = self.interactables.get_mut(&id) else {
            return false;
        };
        if entity.state != InteractableState::Cooldown {
            return false;
        }
        entity.timers.start(
            self.timers.as_mut(),
            TimerOwner::Interactable(id),
            TimerKind::Cooldown,
            period,
        );
        self.emit_interactable(id, InteractableEvent::CycleCompleted { time, remaining });
        true
    }

    // ===== timer callbacks =====

    pub(crate) fn interaction_timer_elapsed(&mut self, id: InteractableId, at: f32) {
        let Some(entity) = self.interactables.get(&id) else {
            return;
        };
        let style = entity.config.style;
        let Some(interactor) = entity.interactor else {
            self.finish_interaction(id, at);
            return;
        };
        style.on_timer_elapsed(&mut StyleContext::new(self, id, interactor).at(at));
    }

    pub(crate) fn progress_expired(&mut self, id: InteractableId) {
        let Some(entity) = self.interactables.get(&id) else {
            return;
        };
        if entity.state != InteractableState::Paused {
            return;
        }
        tracing::debug!(%id, "paused progress expired");
        if entity.interactor.is_some() {
            self.cancel_interaction(id);
        } else {
            self.cancel_attempt_timers(id);
            self.route_interactable_to_default(id);
            self.emit_interactable(id, InteractableEvent::InteractionCanceled);
        }
    }

    pub(crate) fn cooldown_elapsed(&mut self, id: InteractableId) {
        let Some(entity) = self.interactables.get(&id) else {
            return;
        };
        if entity.state != InteractableState::Cooldown {
            return;
        }
        self.bind_surfaces(id);
        self.transition_interactable(id, InteractableState::Awake);
        self.emit_interactable(id, InteractableEvent::CooldownCompleted);
    }

    pub(crate) fn keystroke_elapsed(&mut self, id: InteractableId) {
        let Some(interactor) = self.interactables.get(&id).and_then(|entity| entity.interactor)
        else {
            return;
        };
        StyleContext::new(self, id, interactor).fail();
    }

    // ===== dependencies =====

    /// Makes `dependent` follow `master`: suppressed while the master is active
    /// and weighted below it for as long as the dependency lasts.
    pub fn add_interactable_dependency(
        &mut self,
        master: InteractableId,
        dependent: InteractableId,
    ) -> Result<bool> {
        self.require_interactable(master)?;
        self.require_interactable(dependent)?;
        self.authorize(|| Request::AddInteractableDependency { master, dependent })?;
        if master == dependent {
            return Ok(false);
        }

        if !self.interactable_mut(master)?.dependencies.insert(dependent) {
            return Ok(false);
        }
        self.interactable_mut(dependent)?.masters.insert(master);
        self.emit_interactable(dependent, InteractableEvent::DependencyStarted { master });
        self.apply_forced_weight(dependent);
        self.process_interactable_dependencies(master);
        Ok(true)
    }

    pub fn remove_interactable_dependency(
        &mut self,
        master: InteractableId,
        dependent: InteractableId,
    ) -> Result<bool> {
        self.require_interactable(master)?;
        self.authorize(|| Request::RemoveInteractableDependency { master, dependent })?;

        if !self.interactable_mut(master)?.dependencies.remove(&dependent) {
            return Ok(false);
        }
        self.release_dependent(master, dependent);
        Ok(true)
    }

    /// Ends the master side channel on `dependent` and restores its default.
    pub(crate) fn release_dependent(&mut self, master: InteractableId, dependent: InteractableId) {
        let Some(entity) = self.interactables.get_mut(&dependent) else {
            return;
        };
        if !entity.masters.remove(&master) {
            return;
        }
        self.emit_interactable(dependent, InteractableEvent::DependencyStopped { master });
        self.apply_forced_weight(dependent);
        self.restore_dependent(dependent);
    }

    pub(crate) fn process_interactable_dependencies(&mut self, id: InteractableId) {
        let Some(entity) = self.interactables.get(&id) else {
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
        use InteractableState::*;
        match state {
            Active | Suppressed => {
                for dependent in dependents {
                    let skip = self.interactables.get(&dependent).is_none_or(|entity| {
                        matches!(entity.state, Completed | Disabled | Suppressed)
                    });
                    if !skip {
                        self.transition_interactable(dependent, Suppressed);
                    }
                }
            }
            Awake | Asleep | Cooldown => {
                for dependent in dependents {
                    self.restore_dependent(dependent);
                }
            }
            Disabled | Completed => {
                for dependent in dependents {
                    if let Some(entity) = self.interactables.get_mut(&id) {
                        entity.dependencies.remove(&dependent);
                    }
                    self.release_dependent(id, dependent);
                }
            }
            Paused => {}
        }
        self.leave_dependencies();
    }

    /// Returns a resting dependent to its own default state.
    fn restore_dependent(&mut self, dependent: InteractableId) {
        let Some(entity) = self.interactables.get(&dependent) else {
            return;
        };
        if matches!(
            entity.state,
            InteractableState::Suppressed | InteractableState::Awake | InteractableState::Asleep
        ) {
            self.route_interactable_to_default(dependent);
        }
    }

    /// Recomputes the weight of `id` from its base and its masters.
    ///
    /// While any master holds it, the weight is `min(base, master - 1)` for the
    /// lowest master. Without masters the cached base weight is restored.
    fn apply_forced_weight(&mut self, id: InteractableId) {
        let Some(entity) = self.interactables.get(&id) else {
            return;
        };
        let base = entity.base_weight();
        let cap = entity
            .masters
            .iter()
            .filter_map(|master| self.interactables.get(master))
            .map(|master| master.weight - 1)
            .min();

        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        let weight = match cap {
            Some(cap) => {
                entity.cached_weight = Some(base);
                base.min(cap)
            }
            None => {
                entity.cached_weight = None;
                base
            }
        };
        if weight == entity.weight {
            return;
        }
        entity.weight = weight;
        entity.mark(InteractableFields::WEIGHT);
        self.emit_interactable(id, InteractableEvent::WeightChanged { weight });
    }

    // ===== presentation and surfaces =====

    /// Shows or hides the widget and highlight of a selection.
    fn toggle_active(&mut self, id: InteractableId, on: bool) {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        if entity.widget_visible != on {
            entity.widget_visible = on;
            self.present(id, Present::SetVisible(on));
        }
        if on {
            self.start_highlight(id);
        } else {
            self.stop_highlight(id);
        }
    }

    fn start_highlight(&mut self, id: InteractableId) {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        if entity.highlighted || entity.config.highlight.is_none() {
            return;
        }
        entity.highlighted = true;
        let setup = entity.config.highlight.clone();
        self.present(
            id,
            Present::SetHighlight {
                enabled: true,
                setup,
            },
        );
    }

    pub(crate) fn stop_highlight(&mut self, id: InteractableId) {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        if !entity.highlighted {
            return;
        }
        entity.highlighted = false;
        let setup = entity.config.highlight.clone();
        self.present(
            id,
            Present::SetHighlight {
                enabled: false,
                setup,
            },
        );
    }

    pub(crate) fn hide_progress(&mut self, id: InteractableId) {
        self.present(id, Present::ShowProgress(0.0));
    }

    pub(crate) fn bind_surfaces(&mut self, id: InteractableId) {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        for (surface, status) in entity.surfaces.iter_mut() {
            if !status.bound {
                status.bound = true;
                self.outbox.surfaces.push(SurfaceCommand::Bind(*surface));
            }
        }
    }

    fn unbind_surfaces(&mut self, id: InteractableId) {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        for (surface, status) in entity.surfaces.iter_mut() {
            if status.bound {
                status.bound = false;
                self.outbox.surfaces.push(SurfaceCommand::Unbind(*surface));
            }
        }
    }

    // ===== timers =====

    pub(crate) fn cancel_timer(&mut self, id: InteractableId, kind: TimerKind) {
        if let Some(entity) = self.interactables.get_mut(&id) {
            entity.timers.cancel(self.timers.as_mut(), kind);
        }
    }

    pub(crate) fn cancel_attempt_timers(&mut self, id: InteractableId) {
        for kind in ATTEMPT_TIMERS {
            self.cancel_timer(id, kind);
        }
    }

    /// Starts, or resumes when progress is persisted, the interaction timer.
    pub(crate) fn start_progress(&mut self, id: InteractableId, period: f32) {
        let Some(entity) = self.interactables.get_mut(&id) else {
            return;
        };
        let persisted = entity.config.persistence.can_persist
            && entity.timers.is_paused(self.timers.as_ref(), TimerKind::Interaction);
        if persisted {
            if let Some(handle) = entity.timers.get(TimerKind::Interaction) {
                self.timers.resume(handle);
            }
            return;
        }
        entity.timers.start(
            self.timers.as_mut(),
            TimerOwner::Interactable(id),
            TimerKind::Interaction,
            period,
        );
    }

    pub(crate) fn is_instant(&self, id: InteractableId) -> bool {
        self.interactables
            .get(&id)
            .is_some_and(|entity| entity.config.interaction_period == INSTANT_PERIOD)
    }
}

pub(crate) fn display_name(name: &str, id: impl core::fmt::Display) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}
