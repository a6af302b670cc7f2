//! Vision-cone perception with line-of-sight occlusion.
//!
//! Each tick an agent enumerates candidates within its vision radius, keeps
//! those inside the cone, ray-tests each against the obstruction geometry,
//! and picks the nearest visible one. The result is transient; nothing here
//! is persisted between ticks.

use glam::Vec3;
use nightfall_common::{ContactTag, EntityId};
use serde::{Deserialize, Serialize};

/// Default vision radius in world units.
const DEFAULT_VISION_RADIUS: f32 = 10.0;
/// Default full cone angle in degrees.
const DEFAULT_VISION_ANGLE: f32 = 45.0;

/// A potential perception target returned by the spatial query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// The candidate entity.
    pub entity: EntityId,
    /// Its current position.
    pub position: Vec3,
    /// Its collision faction tag.
    pub tag: ContactTag,
}

/// Spatial query service: radius overlap with target-layer filtering,
/// ray-cast occlusion against the obstruction layer, and read-only
/// transform lookup for chase tracking.
pub trait SpatialQuery {
    /// Returns all target-layer candidates within `radius` of `center`.
    ///
    /// Ordering must be deterministic for a fixed world state; perception
    /// tie-breaks by enumeration order.
    fn targets_within(&self, center: Vec3, radius: f32) -> Vec<Candidate>;

    /// Returns whether the segment from `from` to `to` hits obstruction
    /// geometry before reaching `to`.
    fn ray_obstructed(&self, from: Vec3, to: Vec3) -> bool;

    /// Returns the current position of an entity, if it still exists.
    fn position_of(&self, entity: EntityId) -> Option<Vec3>;
}

/// The nearest qualifying target this tick, or nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerceptionHit {
    /// The perceived entity.
    pub entity: EntityId,
    /// Where it was seen.
    pub position: Vec3,
    /// Distance from the perceiving agent.
    pub distance: f32,
}

/// Vision-cone parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionCone {
    /// Maximum sight distance.
    pub radius: f32,
    /// Full cone angle in degrees; a candidate qualifies when its bearing
    /// from agent-forward is within half this angle.
    pub angle_deg: f32,
}

impl Default for VisionCone {
    fn default() -> Self {
        Self {
            radius: DEFAULT_VISION_RADIUS,
            angle_deg: DEFAULT_VISION_ANGLE,
        }
    }
}

impl VisionCone {
    /// Creates a cone with the given radius and full angle in degrees.
    #[must_use]
    pub const fn new(radius: f32, angle_deg: f32) -> Self {
        Self { radius, angle_deg }
    }

    /// Runs one perception pass from `origin` looking along `forward`.
    ///
    /// `exclude` is the perceiving agent itself (its own collider may sit on
    /// the target layer). Only Player and Enemy tagged candidates qualify.
    /// Returns the nearest visible candidate; ties break by enumeration
    /// order of the spatial query.
    pub fn perceive<S: SpatialQuery>(
        &self,
        origin: Vec3,
        forward: Vec3,
        exclude: EntityId,
        spatial: &S,
    ) -> Option<PerceptionHit> {
        let half_angle = (self.angle_deg * 0.5).to_radians();
        let mut best: Option<PerceptionHit> = None;
        let mut best_distance = self.radius;

        for candidate in spatial.targets_within(origin, self.radius) {
            if candidate.entity == exclude {
                continue;
            }
            if !matches!(candidate.tag, ContactTag::Player | ContactTag::Enemy) {
                continue;
            }

            let to_target = candidate.position - origin;
            let distance = to_target.length();
            if distance <= f32::EPSILON {
                continue;
            }
            let dir = to_target / distance;
            if forward.angle_between(dir) >= half_angle {
                continue;
            }
            if spatial.ray_obstructed(origin, candidate.position) {
                continue;
            }
            if distance < best_distance {
                best_distance = distance;
                best = Some(PerceptionHit {
                    entity: candidate.entity,
                    position: candidate.position,
                    distance,
                });
            }
        }

        best
    }
}

/// In-memory spatial world with sphere obstructions, for harnessing and
/// tests. Targets are enumerated in insertion order.
#[derive(Debug, Default)]
pub struct MockSpatialWorld {
    targets: Vec<Candidate>,
    obstructions: Vec<(Vec3, f32)>,
}

impl MockSpatialWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target-layer entity.
    pub fn add_target(&mut self, entity: EntityId, position: Vec3, tag: ContactTag) {
        self.targets.push(Candidate {
            entity,
            position,
            tag,
        });
    }

    /// Moves a previously added target.
    pub fn move_target(&mut self, entity: EntityId, position: Vec3) {
        if let Some(t) = self.targets.iter_mut().find(|t| t.entity == entity) {
            t.position = position;
        }
    }

    /// Removes a target entirely.
    pub fn remove_target(&mut self, entity: EntityId) {
        self.targets.retain(|t| t.entity != entity);
    }

    /// Adds a sphere of obstruction geometry.
    pub fn add_obstruction(&mut self, center: Vec3, radius: f32) {
        self.obstructions.push((center, radius));
    }
}

impl SpatialQuery for MockSpatialWorld {
    fn targets_within(&self, center: Vec3, radius: f32) -> Vec<Candidate> {
        self.targets
            .iter()
            .filter(|t| t.position.distance(center) <= radius)
            .copied()
            .collect()
    }

    fn ray_obstructed(&self, from: Vec3, to: Vec3) -> bool {
        let seg = to - from;
        let len_sq = seg.length_squared();
        self.obstructions.iter().any(|&(center, radius)| {
            let t = if len_sq <= f32::EPSILON {
                0.0
            } else {
                ((center - from).dot(seg) / len_sq).clamp(0.0, 1.0)
            };
            let closest = from + seg * t;
            closest.distance(center) <= radius
        })
    }

    fn position_of(&self, entity: EntityId) -> Option<Vec3> {
        self.targets
            .iter()
            .find(|t| t.entity == entity)
            .map(|t| t.position)
    }
}
