//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use interaction_core::{
    ActorId, Authority, Channel, Hit, InteractableConfig, InteractableEvent, InteractableId,
    InteractionEvent, InteractionSettings, InteractionStyle, InteractionWorld, InteractorConfig,
    InteractorEvent, InteractorId, QueryRequest, Ray, SensorSurface, SpatialQuery, SurfaceId,
    Vec3,
};

pub const OWNER: ActorId = ActorId(1);
pub const OTHER_OWNER: ActorId = ActorId(3);
pub const PLAYER: ActorId = ActorId(2);
pub const HAND: SurfaceId = SurfaceId(20);

/// Spatial scene answering from tables filled in by the test.
#[derive(Debug, Default)]
pub struct ScriptedSpace {
    pub locations: BTreeMap<ActorId, Vec3>,
    pub sockets: BTreeMap<(ActorId, String), Vec3>,
    pub viewpoints: BTreeMap<ActorId, Ray>,
    /// Hits returned for every query on a channel, nearest first.
    pub hits: BTreeMap<Channel, Vec<Hit>>,
    /// Hits for queries ending at a given point. Take precedence over `hits`.
    pub towards: Vec<(Vec3, Vec<Hit>)>,
    pub overlapping: BTreeSet<(SurfaceId, SurfaceId)>,
}

impl ScriptedSpace {
    pub fn hit(&mut self, channel: Channel, actor: ActorId, surface: SurfaceId) {
        self.hits.entry(channel).or_default().push(Hit {
            surface,
            actor,
            impact: Vec3::ZERO,
        });
    }

    /// Queues a hit for queries ending at `end`, nearest first.
    pub fn hit_towards(&mut self, end: Vec3, actor: ActorId, surface: SurfaceId) {
        let hit = Hit {
            surface,
            actor,
            impact: Vec3::ZERO,
        };
        match self.towards.iter_mut().find(|(point, _)| *point == end) {
            Some((_, hits)) => hits.push(hit),
            None => self.towards.push((end, vec![hit])),
        }
    }
}

impl SpatialQuery for ScriptedSpace {
    fn query(&self, request: &QueryRequest) -> Vec<Hit> {
        let hits = self
            .towards
            .iter()
            .find(|(end, _)| *end == request.end)
            .map(|(_, hits)| hits)
            .or_else(|| self.hits.get(&request.channel));
        hits.map(|hits| {
            hits.iter()
                .filter(|hit| !request.ignored.contains(&hit.actor))
                .copied()
                .collect()
        })
        .unwrap_or_default()
    }

    fn actor_location(&self, actor: ActorId) -> Option<Vec3> {
        self.locations.get(&actor).copied()
    }

    fn socket_location(&self, actor: ActorId, socket: &str) -> Option<Vec3> {
        self.sockets.get(&(actor, socket.to_string())).copied()
    }

    fn viewpoint(&self, actor: ActorId) -> Option<Ray> {
        self.viewpoints.get(&actor).copied()
    }

    fn is_overlapping(&self, a: SurfaceId, b: SurfaceId) -> bool {
        self.overlapping.contains(&(a, b)) || self.overlapping.contains(&(b, a))
    }
}

pub fn world() -> InteractionWorld {
    InteractionWorld::new(InteractionSettings::default(), Authority::Authoritative)
}

pub fn interactable(style: InteractionStyle, name: &str, surface: u32) -> InteractableConfig {
    InteractableConfig::new(style)
        .with_name(name)
        .with_surfaces([SurfaceId(surface)])
}

pub fn hand() -> InteractorConfig {
    InteractorConfig::overlap([SensorSurface::new(HAND)]).with_name("hand")
}

/// A begun world with one interactable owned by [`OWNER`] and one overlap
/// interactor owned by [`PLAYER`].
pub fn single(config: InteractableConfig) -> (InteractionWorld, InteractableId, InteractorId) {
    let mut world = world();
    let target = world.spawn_interactable(OWNER, config);
    let interactor = world.spawn_interactor(PLAYER, hand());
    world.begin_all();
    world.take_outbox();
    (world, target, interactor)
}

/// Same as [`single`], with the interactable already selected.
pub fn selected(
    config: InteractableConfig,
    space: &ScriptedSpace,
) -> (InteractionWorld, InteractableId, InteractorId) {
    let (mut world, target, interactor) = single(config);
    assert!(world.begin_overlap(interactor, HAND, OWNER, space).unwrap());
    world.take_outbox();
    (world, target, interactor)
}

pub fn interactable_events(
    events: &[InteractionEvent],
    id: InteractableId,
) -> Vec<InteractableEvent> {
    events
        .iter()
        .filter_map(|event| event.interactable())
        .filter(|(target, _)| *target == id)
        .map(|(_, event)| event.clone())
        .collect()
}

pub fn interactor_events(events: &[InteractionEvent], id: InteractorId) -> Vec<InteractorEvent> {
    events
        .iter()
        .filter_map(|event| event.interactor())
        .filter(|(target, _)| *target == id)
        .map(|(_, event)| event.clone())
        .collect()
}
