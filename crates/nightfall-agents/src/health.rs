//! Health and damage model.
//!
//! Every damageable entity owns a [`Health`]: clamped hit points, a short
//! invulnerability window after each hit (overlapping collision events in
//! one tick must not multi-hit), and a death transition that schedules
//! removal after a fixed delay. There is no way back out of dead.

use serde::{Deserialize, Serialize};

/// Default maximum health for agents.
const DEFAULT_MAX_HEALTH: f32 = 100.0;
/// Post-hit invulnerability window for agents, in seconds.
const DEFAULT_INVULNERABILITY: f32 = 0.1;
/// Post-hit invulnerability window for the player, in seconds.
const PLAYER_INVULNERABILITY: f32 = 1.5;
/// Delay between death and removal, bound to the death cue length.
const DEFAULT_DESPAWN_DELAY: f32 = 2.0;

/// Something that can receive damage.
///
/// This is the one-shot cross-entity call of the simulation: safe to invoke
/// from any caller's tick, applied synchronously, never queued.
pub trait DamageSink {
    /// Applies damage at time `now`, returning what happened.
    fn take_damage(&mut self, amount: f32, now: f32) -> DamageOutcome;
}

/// Result of a damage application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// The target was invulnerable or already dead; nothing changed.
    Ignored,
    /// Damage was applied and the target survived.
    Damaged {
        /// Health remaining after the hit.
        remaining: f32,
    },
    /// The hit was lethal.
    Died,
}

/// Configuration for a [`Health`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Maximum (and starting) health.
    pub max_health: f32,
    /// Invulnerability window opened after each applied hit, in seconds.
    pub invulnerability_window: f32,
    /// Delay between death and scheduled removal, in seconds.
    pub despawn_delay: f32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: DEFAULT_MAX_HEALTH,
            invulnerability_window: DEFAULT_INVULNERABILITY,
            despawn_delay: DEFAULT_DESPAWN_DELAY,
        }
    }
}

impl HealthConfig {
    /// Configuration for the player-side damage sink, which uses a much
    /// longer invulnerability window than agents.
    #[must_use]
    pub fn player() -> Self {
        Self {
            invulnerability_window: PLAYER_INVULNERABILITY,
            ..Self::default()
        }
    }

    /// Overrides the maximum health.
    #[must_use]
    pub const fn with_max_health(mut self, max_health: f32) -> Self {
        self.max_health = max_health;
        self
    }
}

/// Hit points with invulnerability and death bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    max: f32,
    current: f32,
    invulnerability_window: f32,
    despawn_delay: f32,
    invulnerable_until: f32,
    despawn_at: Option<f32>,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

impl Health {
    /// Creates a full-health instance from a configuration.
    #[must_use]
    pub fn new(config: HealthConfig) -> Self {
        Self {
            max: config.max_health,
            current: config.max_health,
            invulnerability_window: config.invulnerability_window,
            despawn_delay: config.despawn_delay,
            invulnerable_until: 0.0,
            despawn_at: None,
        }
    }

    /// Returns current health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Returns maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Returns current health as a fraction of maximum, in [0, 1].
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }

    /// Returns whether this entity has died.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.despawn_at.is_some()
    }

    /// Returns whether the invulnerability window is open at `now`.
    #[must_use]
    pub fn is_invulnerable(&self, now: f32) -> bool {
        now < self.invulnerable_until
    }

    /// Returns whether the post-death removal delay has elapsed.
    #[must_use]
    pub fn despawn_due(&self, now: f32) -> bool {
        self.despawn_at.is_some_and(|at| now >= at)
    }
}

impl DamageSink for Health {
    fn take_damage(&mut self, amount: f32, now: f32) -> DamageOutcome {
        if self.is_dead() || self.is_invulnerable(now) {
            return DamageOutcome::Ignored;
        }

        self.current = (self.current - amount).clamp(0.0, self.max);
        self.invulnerable_until = now + self.invulnerability_window;

        if self.current <= 0.0 {
            self.despawn_at = Some(now + self.despawn_delay);
            DamageOutcome::Died
        } else {
            DamageOutcome::Damaged {
                remaining: self.current,
            }
        }
    }
}
