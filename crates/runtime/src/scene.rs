//! Geometric world answering the core's spatial queries.
//!
//! Interaction surfaces and interactor sensors are spheres attached to an
//! actor. Walls are axis-aligned boxes that block every channel. Queries sweep
//! a segment (optionally inflated by a half extent) and report hits ordered by
//! distance, stopping at the first wall.

use std::collections::{BTreeMap, BTreeSet};

use interaction_core::{
    ActorId, Channel, Hit, QueryRequest, QueryShape, Ray, SpatialQuery, SurfaceId, Vec3,
};

/// An actor placed in the scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneActor {
    pub location: Vec3,
    /// Eye direction. Absent actors have no viewpoint.
    pub facing: Option<Vec3>,
    /// Named sockets, relative to the actor location.
    pub sockets: BTreeMap<String, Vec3>,
}

/// Sphere attached to an actor.
#[derive(Clone, Debug, PartialEq)]
pub struct SphereSurface {
    pub id: SurfaceId,
    pub actor: ActorId,
    pub offset: Vec3,
    pub radius: f32,
    /// Channels this surface answers. Empty answers every channel.
    pub channels: BTreeSet<Channel>,
}

impl SphereSurface {
    fn responds_to(&self, channel: Channel) -> bool {
        self.channels.is_empty() || self.channels.contains(&channel)
    }
}

/// Blocking axis-aligned box.
#[derive(Clone, Debug, PartialEq)]
pub struct Wall {
    pub id: SurfaceId,
    pub actor: ActorId,
    pub min: Vec3,
    pub max: Vec3,
}

#[derive(Clone, Debug, Default)]
pub struct SceneSpace {
    actors: BTreeMap<ActorId, SceneActor>,
    spheres: BTreeMap<SurfaceId, SphereSurface>,
    walls: Vec<Wall>,
}

impl SceneSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_actor(&mut self, id: ActorId, actor: SceneActor) {
        self.actors.insert(id, actor);
    }

    pub fn actor(&self, id: ActorId) -> Option<&SceneActor> {
        self.actors.get(&id)
    }

    pub fn add_sphere(&mut self, sphere: SphereSurface) {
        self.spheres.insert(sphere.id, sphere);
    }

    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.push(wall);
    }

    pub fn spheres(&self) -> impl Iterator<Item = &SphereSurface> {
        self.spheres.values()
    }

    /// Moves an actor and every surface attached to it. Returns `false` for an
    /// unknown actor.
    pub fn move_actor(&mut self, id: ActorId, location: Vec3) -> bool {
        match self.actors.get_mut(&id) {
            Some(actor) => {
                actor.location = location;
                true
            }
            None => false,
        }
    }

    pub fn face(&mut self, id: ActorId, direction: Vec3) -> bool {
        match self.actors.get_mut(&id) {
            Some(actor) => {
                actor.facing = Some(direction);
                true
            }
            None => false,
        }
    }

    /// Every sphere pair currently touching, as `(a, b)` with `a < b`.
    pub fn contacts(&self) -> BTreeSet<(SurfaceId, SurfaceId)> {
        let mut contacts = BTreeSet::new();
        for a in self.spheres.values() {
            for b in self.spheres.range(a.id..).map(|(_, b)| b).skip(1) {
                if self.spheres_touch(a, b) {
                    contacts.insert((a.id, b.id));
                }
            }
        }
        contacts
    }

    fn center(&self, sphere: &SphereSurface) -> Option<Vec3> {
        self.actors
            .get(&sphere.actor)
            .map(|actor| actor.location + sphere.offset)
    }

    fn spheres_touch(&self, a: &SphereSurface, b: &SphereSurface) -> bool {
        match (self.center(a), self.center(b)) {
            (Some(ca), Some(cb)) => (ca - cb).length() <= a.radius + b.radius,
            _ => false,
        }
    }
}

impl SpatialQuery for SceneSpace {
    fn query(&self, request: &QueryRequest) -> Vec<Hit> {
        let inflate = match request.shape {
            QueryShape::Line => 0.0,
            QueryShape::Box { half_extent } => half_extent,
        };
        let segment = Segment::new(request.start, request.end);

        let mut hits: Vec<(f32, bool, Hit)> = Vec::new();
        for sphere in self.spheres.values() {
            if request.ignored.contains(&sphere.actor) || !sphere.responds_to(request.channel) {
                continue;
            }
            let Some(center) = self.center(sphere) else {
                continue;
            };
            if let Some(t) = segment.sphere(center, sphere.radius + inflate) {
                let hit = Hit {
                    surface: sphere.id,
                    actor: sphere.actor,
                    impact: segment.at(t),
                };
                hits.push((t, false, hit));
            }
        }
        for wall in &self.walls {
            if request.ignored.contains(&wall.actor) {
                continue;
            }
            let margin = Vec3::new(inflate, inflate, inflate);
            if let Some(t) = segment.aabb(wall.min - margin, wall.max + margin) {
                let hit = Hit {
                    surface: wall.id,
                    actor: wall.actor,
                    impact: segment.at(t),
                };
                hits.push((t, true, hit));
            }
        }

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut ordered = Vec::with_capacity(hits.len());
        for (_, blocking, hit) in hits {
            ordered.push(hit);
            if blocking {
                break;
            }
        }
        ordered
    }

    fn actor_location(&self, actor: ActorId) -> Option<Vec3> {
        self.actors.get(&actor).map(|actor| actor.location)
    }

    fn socket_location(&self, actor: ActorId, socket: &str) -> Option<Vec3> {
        let actor = self.actors.get(&actor)?;
        actor
            .sockets
            .get(socket)
            .map(|offset| actor.location + *offset)
    }

    fn viewpoint(&self, actor: ActorId) -> Option<Ray> {
        let actor = self.actors.get(&actor)?;
        actor
            .facing
            .map(|facing| Ray::new(actor.location, facing))
    }

    fn is_overlapping(&self, a: SurfaceId, b: SurfaceId) -> bool {
        match (self.spheres.get(&a), self.spheres.get(&b)) {
            (Some(a), Some(b)) => self.spheres_touch(a, b),
            _ => false,
        }
    }
}

/// Parametric segment `start + t * (end - start)`, `t` in `[0, 1]`.
struct Segment {
    start: Vec3,
    delta: Vec3,
}

impl Segment {
    fn new(start: Vec3, end: Vec3) -> Self {
        Self {
            start,
            delta: end - start,
        }
    }

    fn at(&self, t: f32) -> Vec3 {
        self.start + self.delta * t
    }

    /// Entry parameter into a sphere. A start inside the sphere hits at 0.
    fn sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let offset = self.start - center;
        let c = offset.dot(offset) - radius * radius;
        if c <= 0.0 {
            return Some(0.0);
        }
        let a = self.delta.dot(self.delta);
        if a <= f32::EPSILON {
            return None;
        }
        let b = offset.dot(self.delta);
        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let t = (-b - discriminant.sqrt()) / a;
        (0.0..=1.0).contains(&t).then_some(t)
    }

    /// Slab test against a box.
    fn aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut enter = 0.0f32;
        let mut exit = 1.0f32;
        let axes = [
            (self.start.x, self.delta.x, min.x, max.x),
            (self.start.y, self.delta.y, min.y, max.y),
            (self.start.z, self.delta.z, min.z, max.z),
        ];
        for (origin, delta, lo, hi) in axes {
            if delta.abs() <= f32::EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let (mut t0, mut t1) = ((lo - origin) / delta, (hi - origin) / delta);
            if t0 > t1 {
                core::mem::swap(&mut t0, &mut t1);
            }
            enter = enter.max(t0);
            exit = exit.min(t1);
            if enter > exit {
                return None;
            }
        }
        Some(enter)
    }
}
