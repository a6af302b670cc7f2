//! Projectile lifetime and hit bookkeeping.
//!
//! The physics layer owns collision detection; this system owns everything
//! else about a projectile in flight: kinematic state, lifetime expiry, the
//! one-shot damage flag, and the faction rules deciding what a hit may
//! damage. A projectile dies on its first successful hit or when its
//! lifetime runs out, whichever comes first.

use crate::combat::ProjectileSpawn;
use glam::Vec3;
use nightfall_common::{ContactTag, EntityId, Faction};
use std::collections::HashMap;

/// A projectile in flight.
#[derive(Debug, Clone)]
pub struct Projectile {
    /// The agent or player that fired it.
    pub shooter: EntityId,
    /// Owning faction.
    pub faction: Faction,
    /// Damage dealt on hit.
    pub damage: f32,
    /// Spawn timestamp.
    pub spawned_at: f32,
    /// Seconds until self-destruction.
    pub lifetime: f32,
    /// Current position.
    pub position: Vec3,
    /// Current velocity.
    pub velocity: Vec3,
    has_dealt_damage: bool,
}

impl Projectile {
    /// Returns whether the lifetime has expired at `now`.
    #[must_use]
    pub fn expired(&self, now: f32) -> bool {
        now - self.spawned_at >= self.lifetime
    }
}

/// A resolved projectile hit, ready for damage dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileHit {
    /// The projectile that connected (already destroyed).
    pub projectile: EntityId,
    /// The entity that was struck.
    pub target: EntityId,
    /// The struck collider's faction tag.
    pub target_tag: ContactTag,
    /// Damage to apply.
    pub damage: f32,
    /// Whether the player fired the projectile (kill attribution).
    pub caused_by_player: bool,
}

/// Owns all live projectiles.
#[derive(Debug, Default)]
pub struct ProjectileSystem {
    live: HashMap<EntityId, Projectile>,
}

impl ProjectileSystem {
    /// Creates an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates a projectile from a spawn command.
    pub fn spawn(&mut self, spawn: ProjectileSpawn, now: f32) -> EntityId {
        self.live.insert(
            spawn.projectile,
            Projectile {
                shooter: spawn.shooter,
                faction: spawn.faction,
                damage: spawn.damage,
                spawned_at: now,
                lifetime: spawn.lifetime,
                position: spawn.origin,
                velocity: spawn.velocity,
                has_dealt_damage: false,
            },
        );
        spawn.projectile
    }

    /// Advances kinematics and removes expired projectiles, returning their
    /// ids so the physics layer can drop the colliders.
    pub fn update(&mut self, now: f32, dt: f32) -> Vec<EntityId> {
        let mut expired = Vec::new();
        for (id, p) in &mut self.live {
            p.position += p.velocity * dt;
            if p.expired(now) {
                expired.push(*id);
            }
        }
        for id in &expired {
            self.live.remove(id);
        }
        expired
    }

    /// Resolves a physics trigger between a projectile and another collider.
    ///
    /// Returns the hit to dispatch if the faction rules allow it; the
    /// projectile is destroyed on a successful hit. A projectile never hits
    /// its own shooter (the spawn command told physics to ignore that pair,
    /// and this guards against it anyway), and the one-shot flag prevents
    /// double-hits from overlapping trigger events.
    pub fn handle_trigger(
        &mut self,
        projectile: EntityId,
        target: EntityId,
        target_tag: ContactTag,
    ) -> Option<ProjectileHit> {
        let p = self.live.get(&projectile)?;
        if p.has_dealt_damage || target == p.shooter {
            return None;
        }

        let connects = match (p.faction, target_tag) {
            (Faction::Enemy, ContactTag::Player | ContactTag::Enemy) => true,
            (Faction::Player, ContactTag::Enemy | ContactTag::EnemyVision) => true,
            _ => false,
        };
        if !connects {
            return None;
        }

        let mut p = self.live.remove(&projectile)?;
        p.has_dealt_damage = true;

        Some(ProjectileHit {
            projectile,
            target,
            target_tag,
            damage: p.damage,
            caused_by_player: p.faction == Faction::Player,
        })
    }

    /// Returns a live projectile.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Projectile> {
        self.live.get(&id)
    }

    /// Returns the number of live projectiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns whether no projectiles are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
