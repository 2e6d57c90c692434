//! Scenario execution against an authoritative world and an optional replica.
//!
//! The session owns the scene and the worlds and routes messages between
//! them. After every step it pumps the loopback until it is quiet:
//! forwarded requests from the replica run on the authority, the authority's
//! dirty fields are flushed and applied on the replica, and everything either
//! side produced is appended to the event log.

use std::collections::{BTreeMap, BTreeSet};

use interaction_core::{
    ActorId, Authority, AuthorityMessage, Detection, InteractableId, InteractionError,
    InteractionWorld, InteractorId, Outbox, RequestError, RequestResult, SensorSurface, SurfaceId,
};

use crate::api::{ReferenceKind, Result, RuntimeError};
use crate::repository::{EventRepository, LogEntry, LogRecord, Side};
use crate::scenario::{InteractableOp, InteractorOp, Scenario, ScriptStep, Step};
use crate::scene::{SceneActor, SceneSpace, SphereSurface, Wall};

/// Clock slack accepted when a step is scheduled slightly in the past.
const SCHEDULE_EPSILON: f32 = 1e-4;

/// Upper bound on loopback round trips per pump.
const MAX_PUMP_ROUNDS: usize = 64;

/// Totals reported after a script ran.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub records: u64,
    pub end_time: f32,
}

pub struct Session {
    scene: SceneSpace,
    authority: InteractionWorld,
    replica: Option<InteractionWorld>,
    interactables: BTreeMap<String, InteractableId>,
    interactors: BTreeMap<String, InteractorId>,
    /// Sensor sphere to the interactor it belongs to.
    sensors: BTreeMap<SurfaceId, InteractorId>,
    contacts: BTreeSet<(SurfaceId, SurfaceId)>,
    log: Box<dyn EventRepository>,
}

impl Session {
    /// Builds the scene and both worlds, spawning in scenario order so ids
    /// match across the authority boundary.
    pub fn new(scenario: &Scenario, log: Box<dyn EventRepository>) -> Result<Self> {
        scenario.validate()?;

        let mut scene = SceneSpace::new();
        for actor in &scenario.actors {
            scene.add_actor(
                ActorId(actor.id),
                SceneActor {
                    location: actor.location,
                    facing: actor.facing,
                    sockets: actor.sockets.clone(),
                },
            );
        }
        for wall in &scenario.walls {
            scene.add_wall(Wall {
                id: SurfaceId(wall.id),
                actor: ActorId(wall.actor),
                min: wall.min,
                max: wall.max,
            });
        }

        let mut authority =
            InteractionWorld::new(scenario.settings.clone(), Authority::Authoritative);
        let mut replica = scenario
            .replicate
            .then(|| InteractionWorld::new(scenario.settings.clone(), Authority::Replica));

        let mut interactables = BTreeMap::new();
        for spec in &scenario.interactables {
            let owner = ActorId(spec.owner);
            let mut config = spec.config.clone();
            if config.name.is_empty() {
                config.name = spec.key.clone();
            }
            for surface in &spec.surfaces {
                let id = SurfaceId(surface.id);
                if !config.surfaces.contains(&id) {
                    config.surfaces.push(id);
                }
                scene.add_sphere(SphereSurface {
                    id,
                    actor: owner,
                    offset: surface.offset,
                    radius: surface.radius,
                    channels: surface.channels.clone(),
                });
            }

            let id = authority.spawn_interactable(owner, config.clone());
            if let Some(replica) = replica.as_mut() {
                replica.spawn_interactable(owner, config);
            }
            interactables.insert(spec.key.clone(), id);
        }

        let mut interactors = BTreeMap::new();
        let mut sensors = BTreeMap::new();
        for spec in &scenario.interactors {
            let owner = ActorId(spec.owner);
            let mut config = spec.config.clone();
            if config.name.is_empty() {
                config.name = spec.key.clone();
            }
            let sensor_ids: Vec<SurfaceId> =
                spec.sensors.iter().map(|sensor| SurfaceId(sensor.id)).collect();
            if let Detection::Overlap { surfaces } = &mut config.detection {
                for id in &sensor_ids {
                    if !surfaces.iter().any(|surface| surface.id == *id) {
                        surfaces.push(SensorSurface::new(*id));
                    }
                }
            }
            for sensor in &spec.sensors {
                scene.add_sphere(SphereSurface {
                    id: SurfaceId(sensor.id),
                    actor: owner,
                    offset: sensor.offset,
                    radius: sensor.radius,
                    channels: sensor.channels.clone(),
                });
            }

            let id = authority.spawn_interactor(owner, config.clone());
            if let Some(replica) = replica.as_mut() {
                replica.spawn_interactor(owner, config);
            }
            for sensor in sensor_ids {
                sensors.insert(sensor, id);
            }
            interactors.insert(spec.key.clone(), id);
        }

        authority.begin_all();
        if let Some(replica) = replica.as_mut() {
            replica.begin_all();
        }

        tracing::info!(
            scenario = %scenario.name,
            interactables = interactables.len(),
            interactors = interactors.len(),
            replicated = replica.is_some(),
            "session started"
        );

        let mut session = Self {
            scene,
            authority,
            replica,
            interactables,
            interactors,
            sensors,
            contacts: BTreeSet::new(),
            log,
        };
        session.refresh_contacts()?;
        session.pump()?;
        Ok(session)
    }

    pub fn scene(&self) -> &SceneSpace {
        &self.scene
    }

    pub fn authority(&self) -> &InteractionWorld {
        &self.authority
    }

    pub fn replica(&self) -> Option<&InteractionWorld> {
        self.replica.as_ref()
    }

    pub fn now(&self) -> f32 {
        self.authority.now()
    }

    pub fn interactable_id(&self, key: &str) -> Result<InteractableId> {
        self.interactables
            .get(key)
            .copied()
            .ok_or_else(|| unknown(ReferenceKind::Interactable, key))
    }

    pub fn interactor_id(&self, key: &str) -> Result<InteractorId> {
        self.interactors
            .get(key)
            .copied()
            .ok_or_else(|| unknown(ReferenceKind::Interactor, key))
    }

    /// Runs every step in order, advancing the clock to each scheduled time.
    pub fn run(&mut self, script: &[ScriptStep]) -> Result<RunSummary> {
        for (index, step) in script.iter().enumerate() {
            if let Some(at) = step.at {
                let now = self.now();
                if at + SCHEDULE_EPSILON < now {
                    return Err(RuntimeError::StepInPast { index, at, now });
                }
                if at > now {
                    self.advance(at - now)?;
                }
            }
            self.execute(step.side, &step.step)?;
        }
        self.log.flush()?;

        let summary = RunSummary {
            steps: script.len(),
            records: self.log.len()?,
            end_time: self.now(),
        };
        tracing::info!(
            steps = summary.steps,
            records = summary.records,
            end_time = summary.end_time,
            "script finished"
        );
        Ok(summary)
    }

    /// Advances both worlds by `dt` seconds.
    pub fn advance(&mut self, dt: f32) -> Result<()> {
        self.authority.advance(dt, &self.scene);
        if let Some(replica) = self.replica.as_mut() {
            replica.advance(dt, &self.scene);
        }
        self.pump()
    }

    /// Executes one step on the chosen side. Replica steps without a replica
    /// run on the authority.
    pub fn execute(&mut self, side: Side, step: &Step) -> Result<()> {
        tracing::debug!(%side, ?step, time = self.now(), "executing step");
        let side = if self.replica.is_some() {
            side
        } else {
            Side::Authority
        };

        match step {
            Step::Advance(dt) => return self.advance(*dt),
            Step::MoveActor { actor, to } => {
                if self.scene.move_actor(ActorId(*actor), *to) {
                    self.refresh_contacts()?;
                }
            }
            Step::FaceActor { actor, direction } => {
                self.scene.face(ActorId(*actor), *direction);
            }
            _ => self.execute_on(side, step)?,
        }
        self.pump()
    }

    fn execute_on(&mut self, side: Side, step: &Step) -> Result<()> {
        let time = self.now();
        let (world, scene) = match (side, self.replica.as_mut()) {
            (Side::Replica, Some(replica)) => (replica, &self.scene),
            _ => (&mut self.authority, &self.scene),
        };
        let interactable = |key: &str| {
            self.interactables
                .get(key)
                .copied()
                .ok_or_else(|| unknown(ReferenceKind::Interactable, key))
        };
        let interactor = |key: &str| {
            self.interactors
                .get(key)
                .copied()
                .ok_or_else(|| unknown(ReferenceKind::Interactor, key))
        };

        match step {
            Step::Advance(_) | Step::MoveActor { .. } | Step::FaceActor { .. } => {}
            Step::BeginOverlap {
                interactor: key,
                sensor,
                other,
            } => {
                let id = interactor(key)?;
                forwardable(world.begin_overlap(id, SurfaceId(*sensor), ActorId(*other), scene))?;
            }
            Step::EndOverlap {
                interactor: key,
                sensor,
                other,
            } => {
                let id = interactor(key)?;
                forwardable(world.end_overlap(id, SurfaceId(*sensor), ActorId(*other), scene))?;
            }
            Step::StartInteraction(key) => {
                forwardable(world.start_interaction(interactor(key)?, time))?;
            }
            Step::StopInteraction(key) => {
                forwardable(world.stop_interaction(interactor(key)?, time))?;
            }
            Step::SetInteractableState {
                interactable: key,
                state,
            } => {
                forwardable(world.set_interactable_state(interactable(key)?, *state))?;
            }
            Step::SetInteractorState {
                interactor: key,
                state,
            } => {
                forwardable(world.set_interactor_state(interactor(key)?, *state))?;
            }
            Step::Interactable { key, op } => {
                let id = interactable(key)?;
                let outcome = match op {
                    InteractableOp::Activate => world.activate_interactable(id),
                    InteractableOp::WakeUp => world.wake_up_interactable(id),
                    InteractableOp::Complete => world.complete_interactable(id),
                    InteractableOp::Deactivate => world.deactivate_interactable(id),
                    InteractableOp::Suppress => world.suppress_interactable(id),
                    InteractableOp::Sleep => world.sleep_interactable(id),
                    InteractableOp::TriggerCooldown => {
                        forwardable(world.trigger_cooldown(id))?;
                        return Ok(());
                    }
                };
                let reason = reason(outcome)?;
                self.log.append(&LogRecord::new(time, side, reason))?;
            }
            Step::Interactor { key, op } => {
                let id = interactor(key)?;
                let outcome = match op {
                    InteractorOp::Activate => world.activate_interactor(id),
                    InteractorOp::WakeUp => world.wake_up_interactor(id),
                    InteractorOp::Suppress => world.suppress_interactor(id),
                    InteractorOp::Deactivate => world.deactivate_interactor(id),
                    InteractorOp::Sleep => world.sleep_interactor(id),
                    tracing_op => {
                        let result = match tracing_op {
                            InteractorOp::EnableTracing => world.enable_tracing(id),
                            InteractorOp::DisableTracing => world.disable_tracing(id),
                            InteractorOp::PauseTracing => world.pause_tracing(id),
                            _ => world.resume_tracing(id),
                        };
                        forwardable(result)?;
                        return Ok(());
                    }
                };
                let reason = reason(outcome)?;
                self.log.append(&LogRecord::new(time, side, reason))?;
            }
            Step::SetWeight {
                interactable: key,
                weight,
            } => {
                forwardable(world.set_weight(interactable(key)?, *weight))?;
            }
            Step::SetHovered {
                interactable: key,
                surface,
                hovered,
            } => {
                forwardable(world.set_hovered(interactable(key)?, SurfaceId(*surface), *hovered))?;
            }
            Step::AddDependency { master, dependent } => {
                let (master, dependent) = (interactable(master)?, interactable(dependent)?);
                forwardable(world.add_interactable_dependency(master, dependent))?;
            }
            Step::RemoveDependency { master, dependent } => {
                let (master, dependent) = (interactable(master)?, interactable(dependent)?);
                forwardable(world.remove_interactable_dependency(master, dependent))?;
            }
            Step::AddInteractorDependency { master, dependent } => {
                let (master, dependent) = (interactor(master)?, interactor(dependent)?);
                forwardable(world.add_interactor_dependency(master, dependent))?;
            }
            Step::RemoveInteractorDependency { master, dependent } => {
                let (master, dependent) = (interactor(master)?, interactor(dependent)?);
                forwardable(world.remove_interactor_dependency(master, dependent))?;
            }
            Step::IgnoreActor {
                interactor: key,
                actor,
            } => {
                forwardable(world.add_ignored_actor(interactor(key)?, ActorId(*actor)))?;
            }
            Step::UnignoreActor {
                interactor: key,
                actor,
            } => {
                forwardable(world.remove_ignored_actor(interactor(key)?, ActorId(*actor)))?;
            }
            Step::DespawnInteractable(key) => {
                let id = interactable(key)?;
                self.authority.despawn_interactable(id)?;
                if let Some(replica) = self.replica.as_mut() {
                    replica.despawn_interactable(id)?;
                }
            }
            Step::DespawnInteractor(key) => {
                let id = interactor(key)?;
                self.authority.despawn_interactor(id)?;
                if let Some(replica) = self.replica.as_mut() {
                    replica.despawn_interactor(id)?;
                }
                self.sensors.retain(|_, owner| *owner != id);
            }
        }
        Ok(())
    }

    /// Reports overlaps that started or ended since the last refresh to the
    /// authority.
    fn refresh_contacts(&mut self) -> Result<()> {
        let contacts = self.scene.contacts();
        let started: Vec<_> = contacts.difference(&self.contacts).copied().collect();
        let ended: Vec<_> = self.contacts.difference(&contacts).copied().collect();
        self.contacts = contacts;

        for (a, b) in ended {
            if let Some((interactor, sensor, other)) = self.sensor_contact(a, b) {
                tracing::debug!(%interactor, %sensor, %other, "overlap ended");
                self.authority
                    .end_overlap(interactor, sensor, other, &self.scene)?;
            }
        }
        for (a, b) in started {
            if let Some((interactor, sensor, other)) = self.sensor_contact(a, b) {
                tracing::debug!(%interactor, %sensor, %other, "overlap started");
                self.authority
                    .begin_overlap(interactor, sensor, other, &self.scene)?;
            }
        }
        Ok(())
    }

    /// Resolves a sphere contact into `(interactor, sensor, other actor)` when
    /// exactly one side is a sensor.
    fn sensor_contact(
        &self,
        a: SurfaceId,
        b: SurfaceId,
    ) -> Option<(InteractorId, SurfaceId, ActorId)> {
        let owner = |surface: SurfaceId| {
            self.scene
                .spheres()
                .find(|sphere| sphere.id == surface)
                .map(|sphere| sphere.actor)
        };
        match (self.sensors.get(&a), self.sensors.get(&b)) {
            (Some(interactor), None) => Some((*interactor, a, owner(b)?)),
            (None, Some(interactor)) => Some((*interactor, b, owner(a)?)),
            _ => None,
        }
    }

    /// Moves traffic across the loopback until both worlds are quiet.
    fn pump(&mut self) -> Result<()> {
        for _ in 0..MAX_PUMP_ROUNDS {
            let mut moved = false;

            if let Some(replica) = self.replica.as_mut() {
                let time = replica.now();
                let outbox = replica.take_outbox();
                for message in &outbox.messages {
                    if let AuthorityMessage::RemoteForward(request) = message {
                        self.log.append(&LogRecord::new(
                            time,
                            Side::Replica,
                            LogEntry::Forwarded(request.clone()),
                        ))?;
                        self.authority.handle_request(request.clone(), &self.scene)?;
                        moved = true;
                    }
                }
                record_outbox(self.log.as_mut(), time, Side::Replica, outbox)?;
            }

            let time = self.authority.now();
            if self.replica.is_some() {
                self.authority.flush_replication();
            }
            let outbox = self.authority.take_outbox();
            for message in &outbox.messages {
                if let (AuthorityMessage::ReplicatedUpdate(update), Some(replica)) =
                    (message, self.replica.as_mut())
                {
                    self.log.append(&LogRecord::new(
                        time,
                        Side::Authority,
                        LogEntry::Replicated(update.clone()),
                    ))?;
                    replica.apply_replicated(update.clone())?;
                    moved = true;
                }
            }
            record_outbox(self.log.as_mut(), time, Side::Authority, outbox)?;

            if !moved {
                return Ok(());
            }
        }
        tracing::warn!(rounds = MAX_PUMP_ROUNDS, "loopback did not settle");
        Ok(())
    }
}

fn record_outbox(
    log: &mut dyn EventRepository,
    time: f32,
    side: Side,
    outbox: Outbox,
) -> Result<()> {
    for event in outbox.events {
        log.append(&LogRecord::new(time, side, LogEntry::Event(event)))?;
    }
    for command in outbox.present {
        log.append(&LogRecord::new(time, side, LogEntry::Present(command)))?;
    }
    for command in outbox.surfaces {
        log.append(&LogRecord::new(time, side, LogEntry::Surface(command)))?;
    }
    Ok(())
}

/// Treats a call forwarded to the authority as handled.
fn forwardable<T>(result: core::result::Result<T, InteractionError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InteractionError::Forwarded { operation }) => {
            tracing::debug!(operation, "forwarded to the authority");
            Ok(None)
        }
        Err(error) => Err(error.into()),
    }
}

/// Turns a convenience outcome into a log entry. Forwarded requests still log
/// their pending state.
fn reason(outcome: RequestResult) -> Result<LogEntry> {
    match outcome {
        Ok(accepted) => {
            tracing::info!(reason = %accepted, "request accepted");
            Ok(LogEntry::Reason {
                accepted: true,
                text: accepted.to_string(),
            })
        }
        Err(RequestError::World(error)) if !error.severity().is_recoverable() => Err(error.into()),
        Err(refused) => {
            tracing::info!(reason = %refused, "request refused");
            Ok(LogEntry::Reason {
                accepted: false,
                text: refused.to_string(),
            })
        }
    }
}

fn unknown(kind: ReferenceKind, key: &str) -> RuntimeError {
    RuntimeError::UnknownReference {
        kind,
        key: key.to_string(),
    }
}
