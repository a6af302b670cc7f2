//! Hunter archetype: patrols until its vision cone picks up a target, then
//! chases, tracks, and shoots until the target stays out of sight long
//! enough to give up.

use crate::agent::TickCtx;
use crate::combat::{Aim, FirePolicy, Shooter};
use crate::events::{AgentEvent, CueKind, TimedCue};
use crate::nav::{forward_from_yaw, lerp_yaw, yaw_toward, Navigation};
use crate::perception::{SpatialQuery, VisionCone};
use crate::rng::RandomSource;
use crate::route::{PatrolFollower, PatrolRoute};
use nightfall_common::{EntityId, Faction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hunter tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HunterConfig {
    /// Maximum health.
    pub max_health: f32,
    /// Vision cone used for target acquisition.
    pub vision: VisionCone,
    /// Seconds a chase survives without a perception result.
    pub lost_sight_duration: f32,
    /// Grace delay between giving up a chase and resuming patrol.
    pub return_grace: f32,
    /// Dwell time at each waypoint.
    pub patrol_wait: f32,
    /// Roam radius when no route is configured.
    pub roam_radius: f32,
    /// Movement speed.
    pub speed: f32,
    /// Heading smoothing factor while chasing (per second).
    pub turn_rate: f32,
    /// Shot cooldown in seconds.
    pub shoot_cooldown: f32,
    /// Projectile launch force.
    pub projectile_force: f32,
    /// Contact damage dealt to the player on touch.
    pub contact_damage: f32,
    /// Seconds the question-mark cue stays visible.
    pub question_mark_display: f32,
    /// Firing policy.
    pub fire_policy: FirePolicy,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            vision: VisionCone::default(),
            lost_sight_duration: 3.0,
            return_grace: 1.0,
            patrol_wait: 0.5,
            roam_radius: 10.0,
            speed: 3.5,
            turn_rate: 5.0,
            shoot_cooldown: 1.0,
            projectile_force: 10.0,
            contact_damage: 10.0,
            question_mark_display: 2.0,
            fire_policy: FirePolicy::default(),
        }
    }
}

/// Hunter behavior states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HunterState {
    /// Walking the route (or roaming).
    Patrol,
    /// Tracking and shooting a perceived target.
    Chase,
    /// Gave up the chase; waiting out the grace delay before patrolling.
    Returning,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Patrol,
    Chase { target: EntityId, lost_sight: f32 },
    Returning { resume_at: f32 },
}

/// The hunter's state machine.
#[derive(Debug, Clone)]
pub struct HunterBrain {
    config: HunterConfig,
    mode: Mode,
    follower: PatrolFollower,
    shooter: Shooter,
    question_cue: TimedCue,
}

impl HunterBrain {
    /// Creates a brain patrolling `route` (roaming if absent or empty).
    #[must_use]
    pub fn new(config: &HunterConfig, route: Option<PatrolRoute>) -> Self {
        Self {
            config: *config,
            mode: Mode::Patrol,
            follower: PatrolFollower::new(route)
                .with_wait_time(config.patrol_wait)
                .with_roam_radius(config.roam_radius),
            shooter: Shooter::new(config.shoot_cooldown),
            question_cue: TimedCue::new(CueKind::QuestionMark, config.question_mark_display),
        }
    }

    /// Returns the current behavior state.
    #[must_use]
    pub const fn state(&self) -> HunterState {
        match self.mode {
            Mode::Patrol => HunterState::Patrol,
            Mode::Chase { .. } => HunterState::Chase,
            Mode::Returning { .. } => HunterState::Returning,
        }
    }

    /// Returns the entity currently being chased.
    #[must_use]
    pub const fn chase_target(&self) -> Option<EntityId> {
        match self.mode {
            Mode::Chase { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Runs one tick.
    pub fn update<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        match self.mode {
            Mode::Chase { target, .. } => {
                self.chase(agent, target, ctx);
                self.shoot(agent, target, ctx);
            }
            Mode::Patrol => {
                self.follower.update(agent, ctx.now, ctx.nav, ctx.rng);
            }
            Mode::Returning { resume_at } => {
                if ctx.now >= resume_at {
                    self.mode = Mode::Patrol;
                    self.follower.reissue();
                }
            }
        }

        // Perception runs every tick regardless of state.
        self.check_vision(agent, ctx);
        self.question_cue.update(agent, ctx.now, ctx.events);
    }

    fn check_vision<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        let origin = ctx.nav.position(agent);
        let forward = forward_from_yaw(ctx.nav.yaw(agent));
        let seen = self.config.vision.perceive(origin, forward, agent, ctx.spatial);

        if let Some(hit) = seen {
            match &mut self.mode {
                Mode::Chase { target, lost_sight } => {
                    *target = hit.entity;
                    *lost_sight = 0.0;
                }
                _ => {
                    debug!(agent = agent.raw(), target = hit.entity.raw(), "chase started");
                    self.mode = Mode::Chase {
                        target: hit.entity,
                        lost_sight: 0.0,
                    };
                    self.question_cue.hide(agent, ctx.events);
                    ctx.events.publish(AgentEvent::ChaseStarted {
                        agent,
                        target: hit.entity,
                    });
                }
            }
        } else if let Mode::Chase { lost_sight, .. } = &mut self.mode {
            *lost_sight += ctx.dt;
            if *lost_sight >= self.config.lost_sight_duration {
                debug!(agent = agent.raw(), "chase abandoned");
                self.mode = Mode::Returning {
                    resume_at: ctx.now + self.config.return_grace,
                };
                self.question_cue.show(agent, ctx.now, ctx.events);
                ctx.events.publish(AgentEvent::TargetLost { agent });
            }
        }
    }

    /// Continuous tracking: the destination is refreshed every tick, not
    /// just on chase entry.
    fn chase<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        target: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        if !ctx.nav.is_on_walkable(agent) {
            return;
        }
        let Some(target_pos) = ctx.spatial.position_of(target) else {
            return;
        };
        ctx.nav.set_destination(agent, target_pos);

        let position = ctx.nav.position(agent);
        let to_target = target_pos - position;
        if to_target.length_squared() > f32::EPSILON {
            let desired = yaw_toward(to_target);
            let current = ctx.nav.yaw(agent);
            let t = (self.config.turn_rate * ctx.dt).min(1.0);
            ctx.nav.set_yaw(agent, lerp_yaw(current, desired, t));
        }
    }

    fn shoot<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        target: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        let Some(target_pos) = ctx.spatial.position_of(target) else {
            return;
        };
        let origin = self.shooter.muzzle(ctx.nav.position(agent));
        if self.config.fire_policy.require_line_of_sight
            && ctx.spatial.ray_obstructed(origin, target_pos)
        {
            return;
        }

        let spawn = self.shooter.try_shoot(
            ctx.now,
            agent,
            Faction::Enemy,
            origin,
            Aim::At(target_pos),
            self.config.projectile_force,
            1.0,
        );
        if let Some(spawn) = spawn {
            let projectile = ctx.projectiles.spawn(spawn, ctx.now);
            ctx.events.publish(AgentEvent::ShotFired { agent, projectile });
        }
    }
}
