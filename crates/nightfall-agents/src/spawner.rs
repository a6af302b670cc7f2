//! Spawn factory for hostile agents.
//!
//! A spawner stands at a fixed point in the level, owns the patrol route it
//! lends out, and knows which archetype it produces. Spawning builds the
//! agent, registers its body with the navigation service, and initializes it
//! exactly once; spawning again through the same spawner despawns the
//! previous agent first. A spawner with no archetype configured logs a
//! warning and spawns nothing rather than crashing.

use crate::agent::{Agent, AgentSystem, Archetype};
use crate::escapist::EscapistConfig;
use crate::hunter::HunterConfig;
use crate::nav::Navigation;
use crate::patroller::PatrollerConfig;
use crate::route::PatrolRoute;
use glam::Vec3;
use nightfall_common::EntityId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Error types for spawn operations.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The spawner has no archetype configured.
    #[error("spawner has no archetype configured")]
    MissingArchetype,
}

/// Result type for spawn operations.
pub type SpawnResult<T> = Result<T, SpawnError>;

/// What a spawner produces: an archetype plus its tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArchetypeSpec {
    /// A route walker with no combat.
    Patroller(PatrollerConfig),
    /// A patrolling chaser.
    Hunter(HunterConfig),
    /// A skirmisher that flees when cornered.
    Escapist(EscapistConfig),
}

impl ArchetypeSpec {
    /// Returns the archetype this spec builds.
    #[must_use]
    pub const fn archetype(&self) -> Archetype {
        match self {
            Self::Patroller(_) => Archetype::Patroller,
            Self::Hunter(_) => Archetype::Hunter,
            Self::Escapist(_) => Archetype::Escapist,
        }
    }

    fn build(&self, route: Option<PatrolRoute>) -> Agent {
        match self {
            Self::Patroller(config) => Agent::patroller(config, route),
            Self::Hunter(config) => Agent::hunter(config, route),
            // The escapist neither patrols nor roams; the route stays with
            // the spawner.
            Self::Escapist(config) => Agent::escapist(config),
        }
    }
}

/// A fixed spawn point producing one live agent at a time.
#[derive(Debug)]
pub struct AgentSpawner {
    position: Vec3,
    yaw: f32,
    spec: Option<ArchetypeSpec>,
    route: Option<PatrolRoute>,
    current: Option<EntityId>,
}

impl AgentSpawner {
    /// Creates a spawner at a point and heading.
    #[must_use]
    pub fn new(position: Vec3, yaw: f32, spec: Option<ArchetypeSpec>) -> Self {
        Self {
            position,
            yaw,
            spec,
            route: None,
            current: None,
        }
    }

    /// Attaches the patrol route this spawner lends to its agents.
    #[must_use]
    pub fn with_route(mut self, route: PatrolRoute) -> Self {
        self.route = Some(route);
        self
    }

    /// Returns the spawn position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Returns the agent this spawner most recently produced, if it is
    /// still alive in `system`.
    #[must_use]
    pub fn current(&self, system: &AgentSystem) -> Option<EntityId> {
        self.current.filter(|id| system.contains(*id))
    }

    /// Spawns a fresh agent, replacing any previous one from this spawner.
    ///
    /// The agent is built from the configured archetype spec, handed the
    /// spawner's route, inserted into the navigation service at the spawn
    /// point, and initialized exactly once. Returns an error (after a
    /// warning) when no archetype is configured.
    pub fn spawn<N: Navigation>(
        &mut self,
        system: &mut AgentSystem,
        nav: &mut N,
    ) -> SpawnResult<EntityId> {
        let Some(spec) = &self.spec else {
            warn!("spawner has no archetype configured; skipping spawn");
            return Err(SpawnError::MissingArchetype);
        };

        if let Some(previous) = self.current.take() {
            if system.contains(previous) {
                let _ = system.despawn(previous, nav);
            }
        }

        let agent = spec.build(self.route.clone());
        let id = system.spawn(agent, nav, self.position, self.yaw);
        self.current = Some(id);
        Ok(id)
    }
}
