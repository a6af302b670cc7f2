//! # Nightfall Agents
//!
//! Perception-driven behavior core for hostile agents:
//! - Navigation port over the walkable surface (destinations, jump links)
//! - Vision-cone perception with line-of-sight occlusion
//! - Health/damage model with invulnerability windows
//! - Cooldown-gated ranged combat and projectile bookkeeping
//! - Per-archetype behavior state machines (Patroller, Hunter, Escapist)
//! - Jump-link traversal arcs
//! - Spawn factory and the event bus for presentation collaborators
//!
//! Everything runs on a single-threaded per-tick driver: one
//! [`agent::AgentSystem::update`] call per simulation frame mutates every
//! live agent; cross-agent interaction is limited to read-only transform
//! queries and one-shot damage calls.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod combat;
pub mod escapist;
pub mod events;
pub mod health;
pub mod hunter;
pub mod nav;
pub mod patroller;
pub mod perception;
pub mod projectile;
pub mod rng;
pub mod route;
pub mod spawner;
pub mod traversal;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::combat::*;
    pub use crate::escapist::*;
    pub use crate::events::*;
    pub use crate::health::*;
    pub use crate::hunter::*;
    pub use crate::nav::*;
    pub use crate::patroller::*;
    pub use crate::perception::*;
    pub use crate::projectile::*;
    pub use crate::rng::*;
    pub use crate::route::*;
    pub use crate::spawner::*;
    pub use crate::traversal::*;
}

pub use prelude::*;
