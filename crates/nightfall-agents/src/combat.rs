//! Cooldown-gated ranged attacks.
//!
//! A [`Shooter`] turns an aim request into a [`ProjectileSpawn`] command at
//! most once per cooldown. Force and cooldown scaling are policy knobs
//! passed per shot (the Escapist's "tired" tier halves force and doubles
//! cooldown without a structural difference).

use glam::Vec3;
use nightfall_common::{EntityId, Faction};
use serde::{Deserialize, Serialize};

/// Default shot cooldown in seconds.
const DEFAULT_COOLDOWN: f32 = 1.0;
/// Default projectile damage.
const DEFAULT_PROJECTILE_DAMAGE: f32 = 20.0;
/// Default projectile lifetime in seconds.
const DEFAULT_PROJECTILE_LIFETIME: f32 = 3.0;
/// Default muzzle height above the agent's feet.
const DEFAULT_MUZZLE_HEIGHT: f32 = 1.0;

/// Firing policy knobs.
///
/// The line-of-sight gate resolves the divergence in the source material
/// (one revision gated shots on cooldown only, another additionally on
/// sight): the stricter variant is the default, and it stays configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirePolicy {
    /// Require unobstructed line of sight to the target before firing.
    pub require_line_of_sight: bool,
}

impl Default for FirePolicy {
    fn default() -> Self {
        Self {
            require_line_of_sight: true,
        }
    }
}

/// What a shot is aimed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aim {
    /// Aim at a world point (direction computed from the muzzle).
    At(Vec3),
    /// Fire along a fixed direction.
    Along(Vec3),
}

/// Command to instantiate a projectile, handed to the projectile system and
/// the physics layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    /// Id allocated for the new projectile.
    pub projectile: EntityId,
    /// The agent that fired; the physics layer must suppress collision
    /// between the two.
    pub shooter: EntityId,
    /// Owning faction of the projectile.
    pub faction: Faction,
    /// Muzzle position.
    pub origin: Vec3,
    /// Initial velocity (normalized direction times force).
    pub velocity: Vec3,
    /// Damage dealt on hit.
    pub damage: f32,
    /// Seconds until self-destruction.
    pub lifetime: f32,
}

/// Cooldown-gated projectile launcher owned by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shooter {
    cooldown: f32,
    next_shot_at: f32,
    projectile_damage: f32,
    projectile_lifetime: f32,
    muzzle_height: f32,
}

impl Default for Shooter {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl Shooter {
    /// Creates a shooter with the given cooldown and default projectile
    /// stats.
    #[must_use]
    pub const fn new(cooldown: f32) -> Self {
        Self {
            cooldown,
            next_shot_at: 0.0,
            projectile_damage: DEFAULT_PROJECTILE_DAMAGE,
            projectile_lifetime: DEFAULT_PROJECTILE_LIFETIME,
            muzzle_height: DEFAULT_MUZZLE_HEIGHT,
        }
    }

    /// Overrides projectile damage.
    #[must_use]
    pub const fn with_damage(mut self, damage: f32) -> Self {
        self.projectile_damage = damage;
        self
    }

    /// Overrides projectile lifetime.
    #[must_use]
    pub const fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.projectile_lifetime = lifetime;
        self
    }

    /// Overrides the muzzle height.
    #[must_use]
    pub const fn with_muzzle_height(mut self, height: f32) -> Self {
        self.muzzle_height = height;
        self
    }

    /// Returns the muzzle position for an agent standing at `position`.
    #[must_use]
    pub fn muzzle(&self, position: Vec3) -> Vec3 {
        position + Vec3::Y * self.muzzle_height
    }

    /// Returns whether the cooldown gate is open at `now`.
    #[must_use]
    pub fn can_fire(&self, now: f32) -> bool {
        now >= self.next_shot_at
    }

    /// Attempts a shot at time `now` from `origin`.
    ///
    /// On success the cooldown closes for `cooldown * cooldown_scale`
    /// seconds and the spawn command is returned. Returns `None` while the
    /// gate is closed or when the aim direction is degenerate; failed
    /// attempts are simply retried on later ticks.
    pub fn try_shoot(
        &mut self,
        now: f32,
        shooter: EntityId,
        faction: Faction,
        origin: Vec3,
        aim: Aim,
        force: f32,
        cooldown_scale: f32,
    ) -> Option<ProjectileSpawn> {
        if !self.can_fire(now) {
            return None;
        }

        let dir = match aim {
            Aim::At(point) => point - origin,
            Aim::Along(direction) => direction,
        };
        let dir = dir.try_normalize()?;

        self.next_shot_at = now + self.cooldown * cooldown_scale;
        Some(ProjectileSpawn {
            projectile: EntityId::new(),
            shooter,
            faction,
            origin,
            velocity: dir * force,
            damage: self.projectile_damage,
            lifetime: self.projectile_lifetime,
        })
    }
}
