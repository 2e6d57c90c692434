use core::ops::{Add, Mul, Sub};
use std::collections::BTreeSet;

use crate::state::{ActorId, Channel, SurfaceId};

/// World-space vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector, or zero for a degenerate input.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            return Self::ZERO;
        }
        self * (1.0 / len)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Origin plus direction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalized(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Query volume.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryShape {
    Line,
    /// Axis-aligned box swept along the segment.
    Box { half_extent: f32 },
}

/// A single spatial query.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    pub shape: QueryShape,
    pub start: Vec3,
    pub end: Vec3,
    pub channel: Channel,
    /// Actors whose surfaces never produce hits.
    pub ignored: BTreeSet<ActorId>,
}

impl QueryRequest {
    pub fn line(start: Vec3, end: Vec3, channel: Channel) -> Self {
        Self {
            shape: QueryShape::Line,
            start,
            end,
            channel,
            ignored: BTreeSet::new(),
        }
    }

    pub fn with_shape(mut self, shape: QueryShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn ignoring(mut self, actors: impl IntoIterator<Item = ActorId>) -> Self {
        self.ignored.extend(actors);
        self
    }
}

/// One result of a spatial query.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hit {
    pub surface: SurfaceId,
    pub actor: ActorId,
    pub impact: Vec3,
}

/// Spatial queries answered by the host.
///
/// Hits are ordered from the query start outwards. A blocking surface ends the
/// sequence. Each call is one independent query.
pub trait SpatialQuery {
    fn query(&self, request: &QueryRequest) -> Vec<Hit>;

    fn actor_location(&self, actor: ActorId) -> Option<Vec3>;

    /// Location of a named socket on `actor`.
    fn socket_location(&self, actor: ActorId, socket: &str) -> Option<Vec3>;

    /// Eye viewpoint of `actor`, used as the default trace origin.
    fn viewpoint(&self, actor: ActorId) -> Option<Ray>;

    /// Whether the two surfaces currently overlap.
    fn is_overlapping(&self, a: SurfaceId, b: SurfaceId) -> bool;
}

/// Query service that never reports anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptySpace;

impl SpatialQuery for EmptySpace {
    fn query(&self, _request: &QueryRequest) -> Vec<Hit> {
        Vec::new()
    }

    fn actor_location(&self, _actor: ActorId) -> Option<Vec3> {
        None
    }

    fn socket_location(&self, _actor: ActorId, _socket: &str) -> Option<Vec3> {
        None
    }

    fn viewpoint(&self, _actor: ActorId) -> Option<Ray> {
        None
    }

    fn is_overlapping(&self, _a: SurfaceId, _b: SurfaceId) -> bool {
        false
    }
}
