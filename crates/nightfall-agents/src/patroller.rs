//! Patroller archetype: walks a waypoint route (or roams) and hops across
//! jump links. No combat.

use crate::agent::TickCtx;
use crate::nav::Navigation;
use crate::perception::SpatialQuery;
use crate::rng::RandomSource;
use crate::route::{PatrolFollower, PatrolRoute};
use crate::traversal::{JumpArc, TraversalConfig};
use nightfall_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Patroller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatrollerConfig {
    /// Maximum health.
    pub max_health: f32,
    /// Dwell time at each waypoint, in seconds.
    pub patrol_wait: f32,
    /// Roam radius when no route is configured.
    pub roam_radius: f32,
    /// Movement speed.
    pub speed: f32,
    /// Damage taken from a vision-volume contact.
    pub contact_damage: f32,
    /// Jump-link arc parameters.
    pub traversal: TraversalConfig,
}

impl Default for PatrollerConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            patrol_wait: 2.0,
            roam_radius: 10.0,
            speed: 3.5,
            contact_damage: 10.0,
            traversal: TraversalConfig::default(),
        }
    }
}

/// Patroller behavior states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatrollerState {
    /// Walking the route (or roaming).
    Patrol,
    /// Mid-hop across a jump link; steering suspended.
    Jumping,
}

/// The patroller's state machine.
#[derive(Debug, Clone)]
pub struct PatrollerBrain {
    follower: PatrolFollower,
    jump: Option<JumpArc>,
    traversal: TraversalConfig,
}

impl PatrollerBrain {
    /// Creates a brain walking `route` (roaming if absent or empty).
    #[must_use]
    pub fn new(config: &PatrollerConfig, route: Option<PatrolRoute>) -> Self {
        Self {
            follower: PatrolFollower::new(route)
                .with_wait_time(config.patrol_wait)
                .with_roam_radius(config.roam_radius),
            jump: None,
            traversal: config.traversal,
        }
    }

    /// Returns the current behavior state.
    #[must_use]
    pub const fn state(&self) -> PatrollerState {
        if self.jump.is_some() {
            PatrollerState::Jumping
        } else {
            PatrollerState::Patrol
        }
    }

    /// Returns the current waypoint index.
    #[must_use]
    pub const fn patrol_index(&self) -> usize {
        self.follower.index()
    }

    /// Returns whether the brain roams instead of walking a route.
    #[must_use]
    pub const fn is_roaming(&self) -> bool {
        self.follower.is_roaming()
    }

    /// Runs one tick.
    pub fn update<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        // The hop is exclusive: no other movement command while airborne.
        if let Some(arc) = &mut self.jump {
            let position = arc.advance(ctx.dt);
            ctx.nav.set_position(agent, position);
            if arc.is_complete() {
                ctx.nav.set_position(agent, arc.end());
                ctx.nav.complete_jump_link(agent);
                ctx.nav.set_stopped(agent, false);
                self.jump = None;
            }
            return;
        }

        self.follower.update(agent, ctx.now, ctx.nav, ctx.rng);

        if let Some(link) = ctx.nav.current_jump_link(agent) {
            debug!(agent = agent.raw(), "starting jump-link traversal");
            ctx.nav.set_stopped(agent, true);
            self.jump = Some(JumpArc::new(link, self.traversal));
        }
    }
}
