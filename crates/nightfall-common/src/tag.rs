//! Collision faction tags.
//!
//! Physics trigger notifications carry the colliding entity's tag; the
//! behavior core uses it to dispatch contact damage and to destroy spent
//! projectiles.

use serde::{Deserialize, Serialize};

/// Faction tag attached to a collider, mirroring the level's collision
/// layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactTag {
    /// The player character.
    Player,
    /// A projectile in flight (either faction).
    Projectile,
    /// A hostile agent's body.
    Enemy,
    /// A hostile agent's vision trigger volume.
    EnemyVision,
}

impl ContactTag {
    /// Returns whether this tag denotes a projectile collider.
    #[must_use]
    pub const fn is_projectile(self) -> bool {
        matches!(self, Self::Projectile)
    }

    /// Returns whether this tag denotes an agent-owned collider.
    #[must_use]
    pub const fn is_agent(self) -> bool {
        matches!(self, Self::Enemy | Self::EnemyVision)
    }
}

/// Owning faction of a projectile, deciding what it may damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Fired by a hostile agent.
    Enemy,
    /// Fired by the player.
    Player,
}
