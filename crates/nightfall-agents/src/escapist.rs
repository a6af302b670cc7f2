//! Escapist archetype: closes on the player to shooting range, bolts when
//! cornered, and collapses exhausted after the sprint.

use crate::agent::TickCtx;
use crate::combat::{Aim, FirePolicy, Shooter};
use crate::events::{AgentEvent, CueKind, TimedCue};
use crate::nav::Navigation;
use crate::perception::SpatialQuery;
use crate::rng::RandomSource;
use glam::Vec3;
use nightfall_common::{EntityId, Faction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cooldown multiplier while tired.
const TIRED_COOLDOWN_SCALE: f32 = 2.0;

/// Escapist tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscapistConfig {
    /// Maximum health.
    pub max_health: f32,
    /// Range at which the escapist stops advancing and shoots.
    pub detection_radius: f32,
    /// Range at which the escapist starts fleeing.
    pub flee_radius: f32,
    /// Seconds a flee lasts regardless of distance.
    pub flee_duration: f32,
    /// Seconds the tired recovery lasts.
    pub tired_duration: f32,
    /// Movement speed while active.
    pub normal_speed: f32,
    /// Movement speed while fleeing.
    pub flee_speed: f32,
    /// Shot cooldown in seconds (doubled while tired).
    pub shoot_cooldown: f32,
    /// Interval between flee-destination rechecks.
    pub flee_check_interval: f32,
    /// Projectile force while active or fleeing.
    pub normal_force: f32,
    /// Projectile force while tired.
    pub tired_force: f32,
    /// Bound of the random horizontal jitter mixed into the flee direction.
    pub flee_jitter: f32,
    /// Seconds the tired cue stays visible.
    pub tired_display: f32,
    /// Firing policy.
    pub fire_policy: FirePolicy,
}

impl Default for EscapistConfig {
    fn default() -> Self {
        Self {
            max_health: 60.0,
            detection_radius: 10.0,
            flee_radius: 5.0,
            flee_duration: 5.0,
            tired_duration: 5.0,
            normal_speed: 3.5,
            flee_speed: 6.0,
            shoot_cooldown: 1.5,
            flee_check_interval: 0.5,
            normal_force: 10.0,
            tired_force: 5.0,
            flee_jitter: 0.2,
            tired_display: 2.0,
            fire_policy: FirePolicy::default(),
        }
    }
}

/// Escapist behavior states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscapistState {
    /// Advancing on the player or holding at shooting range.
    Active,
    /// Sprinting away from the player.
    Fleeing,
    /// Exhausted: rooted in place, weakened shots.
    Tired,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Active,
    Fleeing { until: f32, next_recheck: f32 },
    Tired { until: f32 },
}

/// The escapist's state machine.
#[derive(Debug, Clone)]
pub struct EscapistBrain {
    config: EscapistConfig,
    mode: Mode,
    shooter: Shooter,
    tired_cue: TimedCue,
}

impl EscapistBrain {
    /// Creates a brain in the active state.
    #[must_use]
    pub fn new(config: &EscapistConfig) -> Self {
        Self {
            config: *config,
            mode: Mode::Active,
            shooter: Shooter::new(config.shoot_cooldown),
            tired_cue: TimedCue::new(CueKind::Tired, config.tired_display),
        }
    }

    /// Returns the current behavior state.
    #[must_use]
    pub const fn state(&self) -> EscapistState {
        match self.mode {
            Mode::Active => EscapistState::Active,
            Mode::Fleeing { .. } => EscapistState::Fleeing,
            Mode::Tired { .. } => EscapistState::Tired,
        }
    }

    /// Runs one tick. State priority: Fleeing > Tired > flee-radius entry >
    /// detection-radius combat > advance toward the player.
    pub fn update<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        let position = ctx.nav.position(agent);
        let distance = position.distance(ctx.player.position);

        match self.mode {
            Mode::Fleeing { until, next_recheck } => {
                self.handle_flee(agent, distance, until, next_recheck, ctx);
            }
            Mode::Tired { until } => {
                self.handle_tired(agent, until, ctx);
            }
            Mode::Active => {
                if distance <= self.config.flee_radius {
                    self.enter_flee(agent, ctx);
                } else if distance <= self.config.detection_radius {
                    // Hold position and trade shots.
                    ctx.nav.clear_path(agent);
                    self.shoot(agent, self.config.normal_force, 1.0, ctx);
                } else {
                    ctx.nav.set_destination(agent, ctx.player.position);
                }
            }
        }

        self.tired_cue.update(agent, ctx.now, ctx.events);
    }

    fn enter_flee<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        debug!(agent = agent.raw(), "fleeing");
        self.mode = Mode::Fleeing {
            until: ctx.now + self.config.flee_duration,
            next_recheck: ctx.now + self.config.flee_check_interval,
        };
        ctx.nav.set_speed(agent, self.config.flee_speed);
        ctx.events.publish(AgentEvent::FleeStarted { agent });
        self.update_flee_destination(agent, ctx);
    }

    fn handle_flee<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        distance: f32,
        until: f32,
        next_recheck: f32,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        // The sprint expires on schedule no matter where the player is.
        if ctx.now >= until {
            self.enter_tired(agent, ctx);
            return;
        }

        if distance <= self.config.flee_radius && ctx.now >= next_recheck {
            self.update_flee_destination(agent, ctx);
            self.mode = Mode::Fleeing {
                until,
                next_recheck: ctx.now + self.config.flee_check_interval,
            };
        }

        self.shoot(agent, self.config.normal_force, 1.0, ctx);
    }

    /// Picks a point away from the player, perturbed by bounded horizontal
    /// jitter so flight lines stay unpredictable, and validated against the
    /// walkable surface with a radius-halving retry.
    fn update_flee_destination<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        let position = ctx.nav.position(agent);
        let away = (position - ctx.player.position)
            .try_normalize()
            .unwrap_or(Vec3::Z);

        let bound = self.config.flee_jitter;
        let jitter = Vec3::new(ctx.rng.range(-bound, bound), 0.0, ctx.rng.range(-bound, bound))
            .try_normalize()
            .unwrap_or(Vec3::ZERO);
        let direction = (away + jitter).try_normalize().unwrap_or(away);

        let reach = self.config.flee_radius * 2.0;
        let candidate = position + direction * reach;
        if let Some(point) = ctx.nav.sample_walkable(candidate, reach) {
            ctx.nav.set_destination(agent, point);
        } else {
            // Retry closer in before giving up for this tick.
            let candidate = position + direction * self.config.flee_radius;
            if let Some(point) = ctx.nav.sample_walkable(candidate, self.config.flee_radius) {
                ctx.nav.set_destination(agent, point);
            }
        }
    }

    fn enter_tired<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        debug!(agent = agent.raw(), "tired");
        self.mode = Mode::Tired {
            until: ctx.now + self.config.tired_duration,
        };
        ctx.nav.clear_path(agent);
        ctx.nav.set_speed(agent, 0.0);
        self.tired_cue.show(agent, ctx.now, ctx.events);
        ctx.events.publish(AgentEvent::TiredStarted { agent });
    }

    fn handle_tired<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        until: f32,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        if ctx.now >= until {
            self.tired_cue.hide(agent, ctx.events);
            self.enter_active(agent, ctx);
        } else {
            // Weakened shots on a doubled cooldown.
            self.shoot(agent, self.config.tired_force, TIRED_COOLDOWN_SCALE, ctx);
        }
    }

    fn enter_active<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        debug!(agent = agent.raw(), "recovered");
        self.mode = Mode::Active;
        ctx.nav.set_speed(agent, self.config.normal_speed);
        ctx.nav.set_destination(agent, ctx.player.position);
        ctx.events.publish(AgentEvent::Recovered { agent });
    }

    fn shoot<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        agent: EntityId,
        force: f32,
        cooldown_scale: f32,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        let origin = self.shooter.muzzle(ctx.nav.position(agent));
        if self.config.fire_policy.require_line_of_sight
            && ctx.spatial.ray_obstructed(origin, ctx.player.position)
        {
            return;
        }

        let spawn = self.shooter.try_shoot(
            ctx.now,
            agent,
            Faction::Enemy,
            origin,
            Aim::At(ctx.player.position),
            force,
            cooldown_scale,
        );
        if let Some(spawn) = spawn {
            let projectile = ctx.projectiles.spawn(spawn, ctx.now);
            ctx.events.publish(AgentEvent::ShotFired { agent, projectile });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::test_support::TestRig;
    use crate::agent::Behavior;
    use glam::Vec3;

    fn config() -> EscapistConfig {
        EscapistConfig::default()
    }

    #[test]
    fn test_advances_toward_distant_player() {
        let mut rig = TestRig::new();
        rig.set_player_pos(Vec3::new(0.0, 0.0, 50.0));
        let agent = rig.spawn_escapist(config());

        rig.run(2.0);
        assert_eq!(rig.behavior(agent), Some(Behavior::Active));
        assert!(rig.nav.position(agent).z > 1.0);
    }

    #[test]
    fn test_holds_and_shoots_inside_detection_radius() {
        let mut rig = TestRig::new();
        rig.set_player_pos(Vec3::new(0.0, 0.0, 8.0));
        let agent = rig.spawn_escapist(config());

        rig.run(1.0);
        assert_eq!(rig.behavior(agent), Some(Behavior::Active));
        // Holding position, not closing in.
        assert!(rig.nav.position(agent).distance(Vec3::ZERO) < 0.5);
        assert!(rig.shot_count() >= 1);
    }

    #[test]
    fn test_enters_flee_within_one_tick() {
        let mut rig = TestRig::new();
        rig.set_player_pos(Vec3::new(0.0, 0.0, 3.0));
        let agent = rig.spawn_escapist(config());

        rig.step();
        assert_eq!(rig.behavior(agent), Some(Behavior::Fleeing));
        assert_eq!(rig.nav.speed_of(agent), Some(config().flee_speed));
    }

    #[test]
    fn test_flee_moves_away_from_player() {
        let mut rig = TestRig::new();
        rig.set_player_pos(Vec3::new(0.0, 0.0, 3.0));
        let agent = rig.spawn_escapist(config());

        let start_distance = rig.nav.position(agent).distance(Vec3::new(0.0, 0.0, 3.0));
        rig.run(2.0);
        let end_distance = rig.nav.position(agent).distance(Vec3::new(0.0, 0.0, 3.0));
        assert!(end_distance > start_distance);
    }

    #[test]
    fn test_flee_expires_into_tired_with_zero_speed() {
        let mut rig = TestRig::new();
        rig.set_player_pos(Vec3::new(0.0, 0.0, 3.0));
        let agent = rig.spawn_escapist(config());

        rig.step();
        assert_eq!(rig.behavior(agent), Some(Behavior::Fleeing));

        // Flee runs its full duration even though the player stays put.
        rig.run(config().flee_duration + 0.2);
        assert_eq!(rig.behavior(agent), Some(Behavior::Tired));
        assert_eq!(rig.nav.speed_of(agent), Some(0.0));
        assert!(!rig.nav.has_path(agent));

        let events = rig.drain_events();
        assert!(events.iter().any(|e| matches!(e, AgentEvent::TiredStarted { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, AgentEvent::CueShown { cue: CueKind::Tired, .. })));
    }

    #[test]
    fn test_tired_expires_into_active() {
        let mut rig = TestRig::new();
        rig.set_player_pos(Vec3::new(0.0, 0.0, 3.0));
        let agent = rig.spawn_escapist(config());

        rig.run(config().flee_duration + 0.2);
        assert_eq!(rig.behavior(agent), Some(Behavior::Tired));

        // Park the player far away so recovery does not re-trigger a flee.
        rig.set_player_pos(Vec3::new(0.0, 0.0, 80.0));
        rig.run(config().tired_duration + 0.2);
        assert_eq!(rig.behavior(agent), Some(Behavior::Active));
        assert_eq!(rig.nav.speed_of(agent), Some(config().normal_speed));
        assert!(rig
            .drain_events()
            .iter()
            .any(|e| matches!(e, AgentEvent::Recovered { .. })));
    }

    #[test]
    fn test_tired_shots_are_weaker_and_slower() {
        let mut rig = TestRig::new();
        rig.set_player_pos(Vec3::new(0.0, 0.0, 3.0));
        let agent = rig.spawn_escapist(config());

        rig.run(config().flee_duration + 0.3);
        assert_eq!(rig.behavior(agent), Some(Behavior::Tired));
        rig.drain_events();
        rig.projectile_speeds.clear();

        rig.run(config().tired_duration - 0.5);
        let speeds = rig.projectile_speeds.clone();
        assert!(!speeds.is_empty());
        for speed in speeds {
            assert!((speed - config().tired_force).abs() < 0.01);
        }
    }

    #[test]
    fn test_flee_jitter_is_deterministic_with_seeded_rng() {
        let run_once = || {
            let mut rig = TestRig::new();
            rig.set_player_pos(Vec3::new(0.0, 0.0, 3.0));
            let agent = rig.spawn_escapist(config());
            rig.run(3.0);
            rig.nav.position(agent)
        };
        assert_eq!(run_once(), run_once());
    }

    #[test]
    fn test_flee_reentry_after_recovery() {
        let mut rig = TestRig::new();
        rig.set_player_pos(Vec3::new(0.0, 0.0, 3.0));
        let agent = rig.spawn_escapist(config());

        // Full flee + tired cycle.
        rig.run(config().flee_duration + config().tired_duration + 0.4);
        assert_eq!(rig.behavior(agent), Some(Behavior::Active));

        // The player corners it again: flees again within one tick.
        let pos = rig.nav.position(agent);
        rig.set_player_pos(pos + Vec3::new(0.0, 0.0, 1.0));
        rig.step();
        assert_eq!(rig.behavior(agent), Some(Behavior::Fleeing));
    }
}
