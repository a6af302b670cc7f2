//! Navigation-mesh port.
//!
//! The core never owns the walkable surface; it drives agents through the
//! [`Navigation`] service: destination assignment, path-completion queries,
//! walkable-point sampling, and jump-link detection/completion. A flat
//! reference implementation, [`PlanarNav`], ships for harnessing and tests.

use glam::Vec3;
use nightfall_common::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f32::consts::{PI, TAU};
use tracing::debug;

/// A designated gap in the walkable surface requiring a scripted traversal
/// rather than continuous pathing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpLink {
    /// Walkable point on the near side of the gap.
    pub start: Vec3,
    /// Walkable point on the far side of the gap.
    pub end: Vec3,
}

impl JumpLink {
    /// Creates a new jump link.
    #[must_use]
    pub const fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }
}

/// Navigation service keyed by agent id.
///
/// Movement commands issued for an agent that is not on the walkable surface
/// are silently ignored: off-mesh spawn placement is common and must not
/// take the simulation down.
pub trait Navigation {
    /// Registers an agent's movable body at a position and heading.
    fn insert_agent(&mut self, agent: EntityId, position: Vec3, yaw: f32);
    /// Removes an agent's body entirely.
    fn remove_agent(&mut self, agent: EntityId);
    /// Returns whether the agent currently stands on the walkable surface.
    fn is_on_walkable(&self, agent: EntityId) -> bool;
    /// Returns the agent's position (zero for unknown agents).
    fn position(&self, agent: EntityId) -> Vec3;
    /// Overwrites the agent's position (used by the traversal overlay).
    fn set_position(&mut self, agent: EntityId, position: Vec3);
    /// Returns the agent's heading in radians (0 faces +Z).
    fn yaw(&self, agent: EntityId) -> f32;
    /// Sets the agent's heading.
    fn set_yaw(&mut self, agent: EntityId, yaw: f32);
    /// Requests a path toward a destination point.
    fn set_destination(&mut self, agent: EntityId, destination: Vec3);
    /// Returns whether a requested path is still being computed.
    fn is_path_pending(&self, agent: EntityId) -> bool;
    /// Returns the remaining distance along the current path.
    fn remaining_distance(&self, agent: EntityId) -> f32;
    /// Returns the arrival threshold for the agent.
    fn stopping_distance(&self, agent: EntityId) -> f32;
    /// Sets the agent's movement speed.
    fn set_speed(&mut self, agent: EntityId, speed: f32);
    /// Suspends or resumes steering without discarding the path.
    fn set_stopped(&mut self, agent: EntityId, stopped: bool);
    /// Discards the current path.
    fn clear_path(&mut self, agent: EntityId);
    /// Finds the nearest walkable point to `point` within `max_radius`.
    fn sample_walkable(&self, point: Vec3, max_radius: f32) -> Option<Vec3>;
    /// Returns the jump link the agent is standing at, if any.
    fn current_jump_link(&self, agent: EntityId) -> Option<JumpLink>;
    /// Marks the agent's current jump link as traversed.
    fn complete_jump_link(&mut self, agent: EntityId);
}

/// Returns the forward direction for a heading (yaw 0 faces +Z).
#[must_use]
pub fn forward_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Returns the heading that faces along `dir` (projected to the plane).
#[must_use]
pub fn yaw_toward(dir: Vec3) -> f32 {
    dir.x.atan2(dir.z)
}

/// Interpolates between two headings along the shortest arc.
#[must_use]
pub fn lerp_yaw(from: f32, to: f32, t: f32) -> f32 {
    let mut diff = (to - from).rem_euclid(TAU);
    if diff > PI {
        diff -= TAU;
    }
    from + diff * t.clamp(0.0, 1.0)
}

/// Default arrival threshold for [`PlanarNav`] bodies.
const DEFAULT_STOPPING_DISTANCE: f32 = 0.5;
/// Default movement speed for newly inserted bodies.
const DEFAULT_SPEED: f32 = 3.5;
/// Distance at which a body standing near a jump link start is considered
/// to be at the link.
const LINK_TRIGGER_RADIUS: f32 = 0.75;

/// A movable body tracked by [`PlanarNav`].
#[derive(Debug, Clone)]
struct NavBody {
    position: Vec3,
    yaw: f32,
    speed: f32,
    destination: Option<Vec3>,
    path_pending: bool,
    stopped: bool,
    active_link: Option<JumpLink>,
}

/// Flat-disc navigation surface: everything within `walkable_radius` of the
/// origin (at y = 0) is walkable, and registered jump links bridge gaps the
/// steering itself will not cross.
///
/// This is the reference collaborator used by the crate's own tests; a real
/// level plugs in its own [`Navigation`] implementation.
#[derive(Debug, Default)]
pub struct PlanarNav {
    bodies: HashMap<EntityId, NavBody>,
    links: Vec<JumpLink>,
    walkable_radius: f32,
    stopping_distance: f32,
}

impl PlanarNav {
    /// Creates a surface with the given walkable radius.
    #[must_use]
    pub fn new(walkable_radius: f32) -> Self {
        Self {
            bodies: HashMap::new(),
            links: Vec::new(),
            walkable_radius,
            stopping_distance: DEFAULT_STOPPING_DISTANCE,
        }
    }

    /// Overrides the arrival threshold.
    #[must_use]
    pub const fn with_stopping_distance(mut self, distance: f32) -> Self {
        self.stopping_distance = distance;
        self
    }

    /// Registers a jump link on the surface.
    pub fn add_jump_link(&mut self, link: JumpLink) {
        self.links.push(link);
    }

    /// Returns the current speed of an agent's body, if registered.
    #[must_use]
    pub fn speed_of(&self, agent: EntityId) -> Option<f32> {
        self.bodies.get(&agent).map(|b| b.speed)
    }

    /// Returns whether an agent currently has a destination.
    #[must_use]
    pub fn has_path(&self, agent: EntityId) -> bool {
        self.bodies
            .get(&agent)
            .is_some_and(|b| b.destination.is_some())
    }

    fn walkable(&self, point: Vec3) -> bool {
        Vec3::new(point.x, 0.0, point.z).length() <= self.walkable_radius
    }

    /// Integrates one physics step: resolves pending paths, steers bodies
    /// toward their destinations, and detects jump-link proximity.
    pub fn advance(&mut self, dt: f32) {
        let links = self.links.clone();
        let walkable_radius = self.walkable_radius;
        let stopping = self.stopping_distance;

        for body in self.bodies.values_mut() {
            body.path_pending = false;

            if body.stopped || body.speed <= 0.0 {
                continue;
            }
            if Vec3::new(body.position.x, 0.0, body.position.z).length() > walkable_radius {
                continue;
            }
            let Some(dest) = body.destination else {
                continue;
            };

            let to = Vec3::new(dest.x - body.position.x, 0.0, dest.z - body.position.z);
            let dist = to.length();
            if dist > stopping {
                let step = (body.speed * dt).min(dist);
                let dir = to / dist;
                body.position += dir * step;
                body.yaw = yaw_toward(dir);
            }

            if body.active_link.is_none() {
                body.active_link = links
                    .iter()
                    .find(|link| body.position.distance(link.start) <= LINK_TRIGGER_RADIUS)
                    .copied();
            }
        }
    }
}

impl Navigation for PlanarNav {
    fn insert_agent(&mut self, agent: EntityId, position: Vec3, yaw: f32) {
        self.bodies.insert(
            agent,
            NavBody {
                position,
                yaw,
                speed: DEFAULT_SPEED,
                destination: None,
                path_pending: false,
                stopped: false,
                active_link: None,
            },
        );
    }

    fn remove_agent(&mut self, agent: EntityId) {
        self.bodies.remove(&agent);
    }

    fn is_on_walkable(&self, agent: EntityId) -> bool {
        self.bodies
            .get(&agent)
            .is_some_and(|b| self.walkable(b.position))
    }

    fn position(&self, agent: EntityId) -> Vec3 {
        self.bodies
            .get(&agent)
            .map_or(Vec3::ZERO, |b| b.position)
    }

    fn set_position(&mut self, agent: EntityId, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.position = position;
        }
    }

    fn yaw(&self, agent: EntityId) -> f32 {
        self.bodies.get(&agent).map_or(0.0, |b| b.yaw)
    }

    fn set_yaw(&mut self, agent: EntityId, yaw: f32) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.yaw = yaw;
        }
    }

    fn set_destination(&mut self, agent: EntityId, destination: Vec3) {
        let walkable = self.is_on_walkable(agent);
        if let Some(body) = self.bodies.get_mut(&agent) {
            if !walkable {
                // Off-mesh bodies ignore movement commands.
                debug!(agent = agent.raw(), "destination ignored: agent off-mesh");
                return;
            }
            body.destination = Some(destination);
            body.path_pending = true;
        }
    }

    fn is_path_pending(&self, agent: EntityId) -> bool {
        self.bodies.get(&agent).is_some_and(|b| b.path_pending)
    }

    fn remaining_distance(&self, agent: EntityId) -> f32 {
        self.bodies.get(&agent).map_or(0.0, |b| {
            b.destination
                .map_or(0.0, |dest| b.position.distance(dest))
        })
    }

    fn stopping_distance(&self, _agent: EntityId) -> f32 {
        self.stopping_distance
    }

    fn set_speed(&mut self, agent: EntityId, speed: f32) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.speed = speed;
        }
    }

    fn set_stopped(&mut self, agent: EntityId, stopped: bool) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.stopped = stopped;
        }
    }

    fn clear_path(&mut self, agent: EntityId) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.destination = None;
            body.path_pending = false;
        }
    }

    fn sample_walkable(&self, point: Vec3, max_radius: f32) -> Option<Vec3> {
        let planar = Vec3::new(point.x, 0.0, point.z);
        let len = planar.length();
        if len <= self.walkable_radius {
            return Some(planar);
        }
        // Nearest walkable point is on the rim.
        let rim = planar / len * self.walkable_radius;
        (point.distance(rim) <= max_radius).then_some(rim)
    }

    fn current_jump_link(&self, agent: EntityId) -> Option<JumpLink> {
        self.bodies.get(&agent).and_then(|b| b.active_link)
    }

    fn complete_jump_link(&mut self, agent: EntityId) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.active_link = None;
        }
    }
}
