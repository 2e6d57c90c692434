//! The interaction world: both state machines, the arbitrator and the timer
//! dispatch, operating on one set of entities.
//!
//! Operations are spread over submodules by responsibility:
//! - `interactable` hosts the interactable machine and its dependency processing
//! - `interactor` hosts the interactor machine and candidate evaluation
//! - `arbitration` turns overlap and trace results into evaluations
//! - `style` holds the per-style interaction hooks
//! - `replication` applies forwarded requests and replicated updates
//!
//! Everything runs on the caller's thread. A call returns once every cascade it
//! triggered (dependency processing, synchronous completion, bindings) is done.
mod arbitration;
mod interactable;
mod interactor;
mod replication;
mod style;

use std::collections::BTreeMap;

use crate::config::{InteractableConfig, InteractionSettings, InteractorConfig};
use crate::env::{SpatialQuery, TimerFired, TimerKind, TimerManager, TimerOwner, TimerService};
use crate::error::{InteractionError, Result};
use crate::event::{
    InteractableEvent, InteractionEvent, InteractorEvent, Present, PresentCommand, SurfaceCommand,
};
use crate::replication::{
    Authority, AuthorityMessage, InteractableFields, InteractorFields, ReplicationGate, Request,
    Route,
};
use crate::state::{
    ActorId, Interactable, InteractableId, InteractableState, Interactor, InteractorId,
};

/// Everything produced by the world since the last drain.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    pub events: Vec<InteractionEvent>,
    pub present: Vec<PresentCommand>,
    pub surfaces: Vec<SurfaceCommand>,
    pub messages: Vec<AuthorityMessage>,
}

/// Owner of all interactables, interactors and their timers.
pub struct InteractionWorld {
    settings: InteractionSettings,
    gate: ReplicationGate,
    timers: Box<dyn TimerService>,
    interactables: BTreeMap<InteractableId, Interactable>,
    interactors: BTreeMap<InteractorId, Interactor>,
    next_id: u32,
    outbox: Outbox,
    /// Nesting of dependency processing currently on the stack.
    dependency_depth: usize,
}

impl InteractionWorld {
    pub fn new(settings: InteractionSettings, authority: Authority) -> Self {
        Self::with_timers(settings, authority, Box::new(TimerManager::new()))
    }

    /// Builds a world on a host supplied timer service.
    pub fn with_timers(
        settings: InteractionSettings,
        authority: Authority,
        timers: Box<dyn TimerService>,
    ) -> Self {
        tracing::debug!(%authority, "interaction world created");
        Self {
            settings,
            gate: ReplicationGate::new(authority),
            timers,
            interactables: BTreeMap::new(),
            interactors: BTreeMap::new(),
            next_id: 1,
            outbox: Outbox::default(),
            dependency_depth: 0,
        }
    }

    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    pub fn authority(&self) -> Authority {
        self.gate.authority()
    }

    pub fn is_authoritative(&self) -> bool {
        self.gate.is_authoritative()
    }

    /// Current world time in seconds.
    pub fn now(&self) -> f32 {
        self.timers.now()
    }

    pub fn timers(&self) -> &dyn TimerService {
        self.timers.as_ref()
    }

    // ===== entity registry =====

    pub fn interactable(&self, id: InteractableId) -> Option<&Interactable> {
        self.interactables.get(&id)
    }

    pub fn interactor(&self, id: InteractorId) -> Option<&Interactor> {
        self.interactors.get(&id)
    }

    pub fn interactables(&self) -> impl Iterator<Item = &Interactable> {
        self.interactables.values()
    }

    pub fn interactors(&self) -> impl Iterator<Item = &Interactor> {
        self.interactors.values()
    }

    /// Interactables owned by `actor`, in id order.
    pub fn interactables_of(&self, actor: ActorId) -> impl Iterator<Item = &Interactable> {
        self.interactables
            .values()
            .filter(move |entity| entity.owner == actor)
    }

    pub fn spawn_interactable(
        &mut self,
        owner: ActorId,
        config: InteractableConfig,
    ) -> InteractableId {
        let id = InteractableId(self.allocate_id());
        let entity = Interactable::new(id, owner, config);
        tracing::debug!(%id, %owner, name = entity.name(), state = %entity.state, "interactable spawned");
        self.interactables.insert(id, entity);
        id
    }

    pub fn spawn_interactor(&mut self, owner: ActorId, config: InteractorConfig) -> InteractorId {
        let id = InteractorId(self.allocate_id());
        let entity = Interactor::new(id, owner, config);
        tracing::debug!(%id, %owner, name = entity.name(), state = %entity.state, "interactor spawned");
        self.interactors.insert(id, entity);
        id
    }

    /// Applies the arrival effects of the default state, as on scene start.
    pub fn begin_interactable(&mut self, id: InteractableId) -> Result<()> {
        let entity = self.interactable_mut(id)?;
        if entity.begun {
            return Ok(());
        }
        entity.begun = true;
        entity.mark(InteractableFields::all());
        let state = entity.state;

        if state == InteractableState::Awake {
            self.bind_surfaces(id);
        }
        if self.is_authoritative() {
            self.process_interactable_dependencies(id);
        }
        Ok(())
    }

    /// Applies the arrival effects of the default state, as on scene start.
    pub fn begin_interactor(&mut self, id: InteractorId) -> Result<()> {
        let entity = self.interactor_mut(id)?;
        if entity.begun {
            return Ok(());
        }
        entity.begun = true;
        entity.mark(InteractorFields::all());
        let state = entity.state;

        if self.is_authoritative() {
            self.interactor_arrived(id, state);
            self.process_interactor_dependencies(id);
        }
        Ok(())
    }

    /// Begins every entity that has not begun yet.
    pub fn begin_all(&mut self) {
        let interactables: Vec<_> = self.interactables.keys().copied().collect();
        for id in interactables {
            let _ = self.begin_interactable(id);
        }
        let interactors: Vec<_> = self.interactors.keys().copied().collect();
        for id in interactors {
            let _ = self.begin_interactor(id);
        }
    }

    /// Removes an interactable, releasing its binding and timers.
    pub fn despawn_interactable(&mut self, id: InteractableId) -> Result<()> {
        let entity = self.interactable_mut(id)?;
        let interactor = entity.interactor;
        let masters: Vec<_> = entity.masters.iter().copied().collect();
        let dependents: Vec<_> = entity.dependencies.iter().copied().collect();

        if let Some(interactor) = interactor {
            self.interactable_lost(interactor, id);
        }
        if let Some(entity) = self.interactables.get_mut(&id) {
            entity.timers.cancel_all(self.timers.as_mut());
        }
        for master in masters {
            if let Some(master) = self.interactables.get_mut(&master) {
                master.dependencies.remove(&id);
            }
        }
        self.interactables.remove(&id);
        for dependent in dependents {
            self.release_dependent(id, dependent);
        }

        tracing::debug!(%id, "interactable despawned");
        Ok(())
    }

    /// Removes an interactor, releasing its binding and timers.
    pub fn despawn_interactor(&mut self, id: InteractorId) -> Result<()> {
        let active = self.interactor_mut(id)?.active;
        if let Some(active) = active {
            self.interactable_lost(id, active);
        }
        if let Some(entity) = self.interactors.get_mut(&id) {
            entity.timers.cancel_all(self.timers.as_mut());
        }
        self.interactors.remove(&id);
        for other in self.interactors.values_mut() {
            other.dependencies.remove(&id);
        }

        tracing::debug!(%id, "interactor despawned");
        Ok(())
    }

    // ===== clock =====

    /// Advances the clock by `dt` seconds, firing due timers in deadline order.
    pub fn advance(&mut self, dt: f32, space: &dyn SpatialQuery) {
        let until = self.timers.now() + dt.max(0.0);
        while let Some(fired) = self.timers.pop_due(until) {
            self.dispatch_timer(fired, space);
        }
        self.timers.advance_to(until);
        self.report_progress();
    }

    fn dispatch_timer(&mut self, fired: TimerFired, space: &dyn SpatialQuery) {
        let kind = fired.purpose.kind;
        match fired.purpose.owner {
            TimerOwner::Interactable(id) => {
                let Some(entity) = self.interactables.get_mut(&id) else {
                    return;
                };
                if !entity.timers.take_fired(kind, fired.handle) {
                    return;
                }
                tracing::trace!(%id, %kind, at = fired.at, "interactable timer fired");
                match kind {
                    TimerKind::Interaction => self.interaction_timer_elapsed(id, fired.at),
                    TimerKind::ProgressExpiration => self.progress_expired(id),
                    TimerKind::Cooldown => self.cooldown_elapsed(id),
                    TimerKind::Keystroke => self.keystroke_elapsed(id),
                    TimerKind::Trace => {}
                }
            }
            TimerOwner::Interactor(id) => {
                let Some(entity) = self.interactors.get_mut(&id) else {
                    return;
                };
                if !entity.timers.take_fired(kind, fired.handle) {
                    return;
                }
                if kind == TimerKind::Trace {
                    self.process_trace(id, space);
                }
            }
        }
    }

    /// Fraction of the running or paused interaction timer that has elapsed.
    pub fn interaction_progress(&self, id: InteractableId) -> Option<f32> {
        let handle = self
            .interactables
            .get(&id)?
            .timers
            .get(TimerKind::Interaction)?;
        let duration = self.timers.duration(handle)?;
        let elapsed = self.timers.elapsed(handle)?;
        if duration <= 0.0 {
            return Some(1.0);
        }
        Some((elapsed / duration).clamp(0.0, 1.0))
    }

    fn report_progress(&mut self) {
        let running: Vec<_> = self
            .interactables
            .values()
            .filter(|entity| entity.timers.is_active(self.timers.as_ref(), TimerKind::Interaction))
            .map(|entity| entity.id)
            .collect();
        for id in running {
            if let Some(fraction) = self.interaction_progress(id) {
                self.present(id, Present::ShowProgress(fraction));
            }
        }
    }

    // ===== outbox =====

    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.outbox.events)
    }

    pub fn drain_presentation(&mut self) -> Vec<PresentCommand> {
        std::mem::take(&mut self.outbox.present)
    }

    pub fn drain_surface_commands(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.outbox.surfaces)
    }

    pub fn drain_messages(&mut self) -> Vec<AuthorityMessage> {
        std::mem::take(&mut self.outbox.messages)
    }

    /// Takes the whole outbox at once.
    pub fn take_outbox(&mut self) -> Outbox {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn emit_interactable(&mut self, id: InteractableId, event: InteractableEvent) {
        tracing::trace!(%id, ?event, "interactable event");
        self.outbox
            .events
            .push(InteractionEvent::Interactable { id, event });
    }

    pub(crate) fn emit_interactor(&mut self, id: InteractorId, event: InteractorEvent) {
        tracing::trace!(%id, ?event, "interactor event");
        self.outbox.events.push(InteractionEvent::Interactor { id, event });
    }

    pub(crate) fn present(&mut self, target: InteractableId, command: Present) {
        self.outbox.present.push(PresentCommand { target, command });
    }

    // ===== helpers =====

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn interactable_mut(&mut self, id: InteractableId) -> Result<&mut Interactable> {
        self.interactables
            .get_mut(&id)
            .ok_or(InteractionError::UnknownInteractable(id))
    }

    pub(crate) fn interactor_mut(&mut self, id: InteractorId) -> Result<&mut Interactor> {
        self.interactors
            .get_mut(&id)
            .ok_or(InteractionError::UnknownInteractor(id))
    }

    pub(crate) fn require_interactable(&self, id: InteractableId) -> Result<&Interactable> {
        self.interactables
            .get(&id)
            .ok_or(InteractionError::UnknownInteractable(id))
    }

    pub(crate) fn require_interactor(&self, id: InteractorId) -> Result<&Interactor> {
        self.interactors
            .get(&id)
            .ok_or(InteractionError::UnknownInteractor(id))
    }

    /// Runs the gate for a mutating call. On a replica the request is queued
    /// for the authority and the call ends with [`InteractionError::Forwarded`].
    pub(crate) fn authorize(&mut self, request: impl FnOnce() -> Request) -> Result<()> {
        match self.gate.route(request) {
            Route::LocalMutation => Ok(()),
            Route::RemoteForward(request) => {
                let operation = request.operation();
                tracing::debug!(operation, "forwarding request to the authority");
                self.outbox
                    .messages
                    .push(AuthorityMessage::RemoteForward(request));
                Err(InteractionError::Forwarded { operation })
            }
        }
    }

    /// Enters one level of dependency processing. Returns false past the limit.
    pub(crate) fn enter_dependencies(&mut self, entity: &dyn core::fmt::Display) -> bool {
        let limit = self.settings.dependency_depth_limit;
        if self.dependency_depth >= limit {
            let error = InteractionError::DependencyTooDeep {
                entity: entity.to_string(),
                limit,
            };
            tracing::error!(code = error.error_code(), "{error}");
            return false;
        }
        self.dependency_depth += 1;
        true
    }

    pub(crate) fn leave_dependencies(&mut self) {
        self.dependency_depth = self.dependency_depth.saturating_sub(1);
    }
}
