//! Candidate detection: overlap reports from the host and polling traces.
//!
//! Both paths end in the same selection protocol. Every candidate that would
//! win the weight comparison is checked with the safety trace first, the
//! current selection included on trace polls.

use crate::config::{SafetyTraceMode, TraceKind};
use crate::env::{QueryRequest, QueryShape, Ray, SpatialQuery, TimerKind, TimerOwner, Vec3};
use crate::error::Result;
use crate::event::InteractorEvent;
use crate::replication::Request;
use crate::state::{ActorId, InteractableId, InteractorId, SurfaceId};

use super::InteractionWorld;

impl InteractionWorld {
    // ===== overlap detection =====

    /// One of the interactor's sensor surfaces started touching `other`.
    ///
    /// Returns whether a new interactable was selected.
    pub fn begin_overlap(
        &mut self,
        id: InteractorId,
        surface: SurfaceId,
        other: ActorId,
        space: &dyn SpatialQuery,
    ) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::BeginOverlap { id, surface, other })?;

        let interactor = self.require_interactor(id)?;
        if !interactor.can_interact() || interactor.ignored_actors.contains(&other) {
            return Ok(false);
        }
        let Some(sensor) = interactor
            .sensor_surfaces()
            .iter()
            .find(|sensor| sensor.id == surface)
        else {
            tracing::debug!(%id, %surface, "overlap on an unknown sensor surface");
            return Ok(false);
        };
        let channel = interactor.response_channel();
        let tag = interactor.tag();

        let mut best: Option<(InteractableId, i32)> = None;
        for candidate in self.interactables_of(other) {
            let eligible = candidate.can_be_triggered()
                && candidate.config.response_channel == channel
                && sensor.responds_to(channel)
                && candidate.accepts_tag(tag);
            if !eligible {
                continue;
            }
            if best.is_none_or(|(_, weight)| candidate.weight > weight) {
                best = Some((candidate.id, candidate.weight));
            }
        }
        let Some((best, weight)) = best else {
            return Ok(false);
        };

        let active = interactor.active;
        if active == Some(best) {
            return Ok(false);
        }
        if let Some(active) = active {
            let incumbent = self.interactables.get(&active).map_or(i32::MIN, |entity| entity.weight);
            if weight <= incumbent {
                tracing::trace!(%id, candidate = %best, %active, "incumbent keeps the selection");
                return Ok(false);
            }
        }
        if !self.safety_trace(id, best, space) {
            return Ok(false);
        }

        if let Some(active) = active {
            self.interactable_lost(id, active);
        }
        self.interactable_found(id, best);
        Ok(true)
    }

    /// Contact with `other` ended. The selection is kept while any surface pair
    /// between the two still overlaps.
    pub fn end_overlap(
        &mut self,
        id: InteractorId,
        surface: SurfaceId,
        other: ActorId,
        space: &dyn SpatialQuery,
    ) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::EndOverlap { id, surface, other })?;

        let interactor = self.require_interactor(id)?;
        let Some(active) = interactor.active else {
            return Ok(false);
        };
        let Some(target) = self.interactables.get(&active) else {
            return Ok(false);
        };
        if target.owner != other {
            return Ok(false);
        }
        let still_touching = interactor.sensor_surfaces().iter().any(|sensor| {
            target
                .surfaces
                .keys()
                .any(|theirs| space.is_overlapping(sensor.id, *theirs))
        });
        if still_touching {
            tracing::trace!(%id, %surface, %other, "other surfaces still overlap");
            return Ok(false);
        }

        self.interactable_lost(id, active);
        Ok(true)
    }

    // ===== trace detection =====

    pub fn enable_tracing(&mut self, id: InteractorId) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::EnableTracing { id })?;
        Ok(self.enable_tracing_local(id))
    }

    pub fn disable_tracing(&mut self, id: InteractorId) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::DisableTracing { id })?;
        Ok(self.disable_tracing_local(id))
    }

    pub fn pause_tracing(&mut self, id: InteractorId) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::PauseTracing { id })?;

        let handle = self.require_interactor(id)?.timers.get(TimerKind::Trace);
        match handle {
            Some(handle) if self.timers.is_active(handle) => {
                self.timers.pause(handle);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn resume_tracing(&mut self, id: InteractorId) -> Result<bool> {
        self.require_interactor(id)?;
        self.authorize(|| Request::ResumeTracing { id })?;

        let handle = self.require_interactor(id)?.timers.get(TimerKind::Trace);
        match handle {
            Some(handle) if self.timers.is_paused(handle) => {
                self.timers.resume(handle);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn is_tracing(&self, id: InteractorId) -> bool {
        self.interactors
            .get(&id)
            .is_some_and(|entity| entity.timers.get(TimerKind::Trace).is_some())
    }

    pub(crate) fn enable_tracing_local(&mut self, id: InteractorId) -> bool {
        let Some(entity) = self.interactors.get_mut(&id) else {
            return false;
        };
        let Some(settings) = entity.trace_settings().copied() else {
            return false;
        };
        if !entity.can_interact() || entity.timers.get(TimerKind::Trace).is_some() {
            return false;
        }
        entity.timers.start(
            self.timers.as_mut(),
            TimerOwner::Interactor(id),
            TimerKind::Trace,
            settings.interval,
        );
        self.emit_interactor(id, InteractorEvent::TracingEnabled);
        true
    }

    pub(crate) fn disable_tracing_local(&mut self, id: InteractorId) -> bool {
        let Some(entity) = self.interactors.get_mut(&id) else {
            return false;
        };
        if entity.timers.get(TimerKind::Trace).is_none() {
            return false;
        }
        entity.timers.cancel(self.timers.as_mut(), TimerKind::Trace);
        self.emit_interactor(id, InteractorEvent::TracingDisabled);
        true
    }

    /// One polling step. Picks the heaviest interactable along the view ray
    /// that passes the safety trace, diffs it against the selection and
    /// reschedules itself.
    pub(crate) fn process_trace(&mut self, id: InteractorId, space: &dyn SpatialQuery) {
        let Some(interactor) = self.interactors.get(&id) else {
            return;
        };
        let Some(settings) = interactor.trace_settings().copied() else {
            return;
        };
        if !interactor.can_interact() {
            self.emit_interactor(id, InteractorEvent::TracingDisabled);
            return;
        }

        let origin = settings
            .custom_origin
            .or_else(|| space.viewpoint(interactor.owner))
            .or_else(|| {
                space
                    .actor_location(interactor.owner)
                    .map(|location| Ray::new(location, Vec3::new(1.0, 0.0, 0.0)))
            });
        let active = interactor.active;

        let mut best: Option<(InteractableId, i32)> = None;
        if let Some(origin) = origin {
            let shape = match settings.kind {
                TraceKind::Precise => QueryShape::Line,
                TraceKind::Loose => QueryShape::Box {
                    half_extent: settings.half_extent,
                },
            };
            let request = QueryRequest::line(
                origin.origin,
                origin.at(settings.range),
                interactor.response_channel(),
            )
            .with_shape(shape)
            .ignoring(interactor.query_exclusions());

            for hit in space.query(&request) {
                let Some(candidate) = self
                    .interactables
                    .values()
                    .find(|entity| entity.owner == hit.actor && entity.owns_surface(hit.surface))
                else {
                    continue;
                };
                let eligible = candidate.config.response_channel == interactor.response_channel()
                    && (candidate.can_be_triggered() || candidate.interactor == Some(id))
                    && candidate.accepts_tag(interactor.tag());
                if !eligible {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((_, weight)) if candidate.weight > weight => true,
                    Some((_, weight)) => candidate.weight == weight && Some(candidate.id) == active,
                };
                // A blocked hit is skipped; lighter candidates further along stay eligible.
                if better && self.safety_trace(id, candidate.id, space) {
                    best = Some((candidate.id, candidate.weight));
                }
            }
        } else {
            tracing::debug!(%id, "trace has no origin");
        }

        let best = best.map(|(candidate, _)| candidate);
        if best != active {
            if let Some(active) = active {
                self.interactable_lost(id, active);
            }
            if let Some(best) = best {
                self.interactable_found(id, best);
            }
        }

        if let Some(entity) = self.interactors.get_mut(&id) {
            if entity.can_interact() && entity.timers.get(TimerKind::Trace).is_none() {
                entity.timers.start(
                    self.timers.as_mut(),
                    TimerOwner::Interactor(id),
                    TimerKind::Trace,
                    settings.interval,
                );
            }
        }
    }

    // ===== safety trace =====

    /// Line of sight from the interactor to the candidate's owner.
    ///
    /// The first hit on the validation channel must belong to the candidate's
    /// owner. Without a configured mode every candidate passes.
    pub(crate) fn safety_trace(
        &self,
        id: InteractorId,
        candidate: InteractableId,
        space: &dyn SpatialQuery,
    ) -> bool {
        let (Some(interactor), Some(target)) =
            (self.interactors.get(&id), self.interactables.get(&candidate))
        else {
            return false;
        };
        let safety = interactor.safety_trace();
        let start = match &safety.mode {
            SafetyTraceMode::None => return true,
            SafetyTraceMode::Location(location) => Some(*location),
            SafetyTraceMode::Socket(socket) => space
                .socket_location(interactor.owner, socket)
                .or_else(|| space.actor_location(interactor.owner)),
        };
        let (Some(start), Some(end)) = (start, space.actor_location(target.owner)) else {
            tracing::debug!(%id, %candidate, "safety trace has no endpoints");
            return true;
        };

        let request = QueryRequest::line(start, end, safety.validation_channel)
            .ignoring(interactor.query_exclusions());
        let passed = space
            .query(&request)
            .first()
            .is_some_and(|hit| hit.actor == target.owner);
        if !passed {
            tracing::debug!(%id, %candidate, "safety trace blocked");
        }
        passed
    }
}
