//! Agent composition and the per-tick driver.
//!
//! An [`Agent`] bundles what every archetype shares (health,
//! invulnerability, contact profile) with an archetype-specific brain; the
//! [`AgentSystem`] is the single tick driver that runs every live agent once
//! per simulation frame, applies death/despawn bookkeeping, and dispatches
//! physics trigger notifications into damage.

use crate::escapist::{EscapistBrain, EscapistConfig, EscapistState};
use crate::events::{AgentEvent, EventBus};
use crate::health::{DamageOutcome, DamageSink, Health, HealthConfig};
use crate::hunter::{HunterBrain, HunterConfig, HunterState};
use crate::nav::Navigation;
use crate::patroller::{PatrollerBrain, PatrollerConfig, PatrollerState};
use crate::perception::SpatialQuery;
use crate::projectile::{ProjectileHit, ProjectileSystem};
use crate::rng::RandomSource;
use crate::route::PatrolRoute;
use glam::Vec3;
use nightfall_common::{ContactTag, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error types for agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent not found
    #[error("agent not found: {0:?}")]
    NotFound(EntityId),
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Hostile agent archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Walks a route; no combat.
    Patroller,
    /// Patrols, perceives, chases, and shoots.
    Hunter,
    /// Skirmishes at range and flees when cornered.
    Escapist,
}

/// Flattened behavior state exposed to presentation collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    /// Walking a route (or roaming).
    Patrol,
    /// Mid-hop across a jump link.
    Jumping,
    /// Tracking and shooting a perceived target.
    Chase,
    /// Waiting out the post-chase grace delay.
    Returning,
    /// Advancing on the player or holding at shooting range.
    Active,
    /// Sprinting away from the player.
    Fleeing,
    /// Exhausted recovery.
    Tired,
    /// Dead; awaiting despawn. Terminal.
    Dead,
}

/// How an agent's colliders interact with contact events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactProfile {
    /// Whether touching the player deals contact damage.
    pub damages_player: bool,
    /// Whether a vision-volume contact hurts this agent.
    pub vision_volume_hurts: bool,
}

/// Read-only view of the player for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerRef {
    /// The player's entity id.
    pub entity: EntityId,
    /// The player's position this tick.
    pub position: Vec3,
}

/// Per-tick collaborator handles passed down to the brains.
pub struct TickCtx<'a, N: Navigation, S: SpatialQuery, R: RandomSource> {
    /// Absolute simulation time in seconds.
    pub now: f32,
    /// Elapsed time since the previous tick.
    pub dt: f32,
    /// The player this tick.
    pub player: PlayerRef,
    /// Navigation service.
    pub nav: &'a mut N,
    /// Spatial query service.
    pub spatial: &'a S,
    /// Injected random source.
    pub rng: &'a mut R,
    /// Live projectiles.
    pub projectiles: &'a mut ProjectileSystem,
    /// Event bus for presentation notifications.
    pub events: &'a EventBus,
}

#[derive(Debug, Clone)]
enum Brain {
    Patroller(PatrollerBrain),
    Hunter(HunterBrain),
    Escapist(EscapistBrain),
}

/// A hostile agent: shared health/contact state plus an archetype brain.
#[derive(Debug, Clone)]
pub struct Agent {
    archetype: Archetype,
    brain: Brain,
    health: Health,
    contact_damage: f32,
    profile: ContactProfile,
    killed_by_player: bool,
    initial_speed: f32,
}

impl Agent {
    /// Builds a patroller walking `route` (roaming if absent or empty).
    #[must_use]
    pub fn patroller(config: &PatrollerConfig, route: Option<PatrolRoute>) -> Self {
        Self {
            archetype: Archetype::Patroller,
            brain: Brain::Patroller(PatrollerBrain::new(config, route)),
            health: Health::new(HealthConfig::default().with_max_health(config.max_health)),
            contact_damage: config.contact_damage,
            // The patroller never hurts the player on touch; its own vision
            // volume can still hurt it.
            profile: ContactProfile {
                damages_player: false,
                vision_volume_hurts: true,
            },
            killed_by_player: false,
            initial_speed: config.speed,
        }
    }

    /// Builds a hunter patrolling `route` (roaming if absent or empty).
    #[must_use]
    pub fn hunter(config: &HunterConfig, route: Option<PatrolRoute>) -> Self {
        Self {
            archetype: Archetype::Hunter,
            brain: Brain::Hunter(HunterBrain::new(config, route)),
            health: Health::new(HealthConfig::default().with_max_health(config.max_health)),
            contact_damage: config.contact_damage,
            profile: ContactProfile {
                damages_player: true,
                vision_volume_hurts: false,
            },
            killed_by_player: false,
            initial_speed: config.speed,
        }
    }

    /// Builds an escapist.
    #[must_use]
    pub fn escapist(config: &EscapistConfig) -> Self {
        Self {
            archetype: Archetype::Escapist,
            brain: Brain::Escapist(EscapistBrain::new(config)),
            health: Health::new(HealthConfig::default().with_max_health(config.max_health)),
            contact_damage: 0.0,
            profile: ContactProfile {
                damages_player: false,
                vision_volume_hurts: false,
            },
            killed_by_player: false,
            initial_speed: config.normal_speed,
        }
    }

    /// Returns the archetype.
    #[must_use]
    pub const fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Returns the agent's health.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Returns whether the killing blow came from the player.
    #[must_use]
    pub const fn killed_by_player(&self) -> bool {
        self.killed_by_player
    }

    /// Returns the flattened behavior state.
    #[must_use]
    pub const fn behavior(&self) -> Behavior {
        if self.health.is_dead() {
            return Behavior::Dead;
        }
        match &self.brain {
            Brain::Patroller(b) => match b.state() {
                PatrollerState::Patrol => Behavior::Patrol,
                PatrollerState::Jumping => Behavior::Jumping,
            },
            Brain::Hunter(b) => match b.state() {
                HunterState::Patrol => Behavior::Patrol,
                HunterState::Chase => Behavior::Chase,
                HunterState::Returning => Behavior::Returning,
            },
            Brain::Escapist(b) => match b.state() {
                EscapistState::Active => Behavior::Active,
                EscapistState::Fleeing => Behavior::Fleeing,
                EscapistState::Tired => Behavior::Tired,
            },
        }
    }

    /// Returns the hunter brain, if this agent is a hunter.
    #[must_use]
    pub const fn as_hunter(&self) -> Option<&HunterBrain> {
        match &self.brain {
            Brain::Hunter(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the patroller brain, if this agent is a patroller.
    #[must_use]
    pub const fn as_patroller(&self) -> Option<&PatrollerBrain> {
        match &self.brain {
            Brain::Patroller(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the escapist brain, if this agent is an escapist.
    #[must_use]
    pub const fn as_escapist(&self) -> Option<&EscapistBrain> {
        match &self.brain {
            Brain::Escapist(b) => Some(b),
            _ => None,
        }
    }

    fn update<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        id: EntityId,
        ctx: &mut TickCtx<'_, N, S, R>,
    ) {
        match &mut self.brain {
            Brain::Patroller(b) => b.update(id, ctx),
            Brain::Hunter(b) => b.update(id, ctx),
            Brain::Escapist(b) => b.update(id, ctx),
        }
    }
}

/// The per-tick driver for every live agent.
///
/// Exactly one archetype state machine governs an agent at a time, and all
/// mutation of an agent's state happens inside its own tick invocation here
/// or through the one-shot damage calls below.
#[derive(Debug, Default)]
pub struct AgentSystem {
    agents: HashMap<EntityId, Agent>,
    bus: EventBus,
}

impl AgentSystem {
    /// Creates an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the event bus for presentation collaborators to drain.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Returns the number of live agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns whether there are no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Returns whether an agent exists.
    #[must_use]
    pub fn contains(&self, agent: EntityId) -> bool {
        self.agents.contains_key(&agent)
    }

    /// Returns an agent.
    #[must_use]
    pub fn get(&self, agent: EntityId) -> Option<&Agent> {
        self.agents.get(&agent)
    }

    /// Returns an agent's health fraction in [0, 1], for health-bar
    /// rendering.
    #[must_use]
    pub fn health_fraction(&self, agent: EntityId) -> Option<f32> {
        self.agents.get(&agent).map(|a| a.health.fraction())
    }

    /// Returns an agent's flattened behavior state.
    #[must_use]
    pub fn behavior_of(&self, agent: EntityId) -> Option<Behavior> {
        self.agents.get(&agent).map(Agent::behavior)
    }

    /// Returns an iterator over all agents.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Agent)> {
        self.agents.iter().map(|(&id, agent)| (id, agent))
    }

    /// Registers a freshly built agent at a spawn point.
    ///
    /// This is the once-only initialization: the agent's body is inserted
    /// into the navigation service at the given position and heading, its
    /// starting speed is applied, and the spawn is announced.
    pub fn spawn<N: Navigation>(
        &mut self,
        agent: Agent,
        nav: &mut N,
        position: Vec3,
        yaw: f32,
    ) -> EntityId {
        let id = EntityId::new();
        nav.insert_agent(id, position, yaw);
        nav.set_speed(id, agent.initial_speed);
        self.bus.publish(AgentEvent::Spawned {
            agent: id,
            archetype: agent.archetype,
        });
        self.agents.insert(id, agent);
        id
    }

    /// Removes an agent immediately (spawner replacement, level teardown).
    pub fn despawn<N: Navigation>(
        &mut self,
        agent: EntityId,
        nav: &mut N,
    ) -> AgentResult<Agent> {
        let removed = self
            .agents
            .remove(&agent)
            .ok_or(AgentError::NotFound(agent))?;
        nav.remove_agent(agent);
        self.bus.publish(AgentEvent::Despawned { agent });
        Ok(removed)
    }

    /// Runs one simulation tick for every live agent.
    ///
    /// Dead agents never tick their brain; they linger until the death
    /// delay elapses and are then removed.
    pub fn update<N: Navigation, S: SpatialQuery, R: RandomSource>(
        &mut self,
        now: f32,
        dt: f32,
        player: PlayerRef,
        nav: &mut N,
        spatial: &S,
        rng: &mut R,
        projectiles: &mut ProjectileSystem,
    ) {
        let ids: Vec<EntityId> = self.agents.keys().copied().collect();

        for id in ids {
            let (dead, despawn_due) = match self.agents.get(&id) {
                Some(a) => (a.health.is_dead(), a.health.despawn_due(now)),
                None => continue,
            };
            if dead {
                if despawn_due {
                    self.agents.remove(&id);
                    nav.remove_agent(id);
                    self.bus.publish(AgentEvent::Despawned { agent: id });
                }
                continue;
            }

            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            let mut ctx = TickCtx {
                now,
                dt,
                player,
                nav: &mut *nav,
                spatial,
                rng: &mut *rng,
                projectiles: &mut *projectiles,
                events: &self.bus,
            };
            agent.update(id, &mut ctx);
        }
    }

    /// Applies damage to an agent, publishing feedback events and running
    /// the death transition on a lethal hit.
    pub fn damage_agent<N: Navigation>(
        &mut self,
        agent: EntityId,
        amount: f32,
        caused_by_player: bool,
        now: f32,
        nav: &mut N,
    ) -> DamageOutcome {
        let Some(a) = self.agents.get_mut(&agent) else {
            return DamageOutcome::Ignored;
        };
        let outcome = a.health.take_damage(amount, now);
        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Damaged { .. } | DamageOutcome::Died => {
                let remaining_fraction = a.health.fraction();
                self.bus.publish(AgentEvent::Damaged {
                    agent,
                    amount,
                    remaining_fraction,
                    caused_by_player,
                });
                if outcome == DamageOutcome::Died {
                    a.killed_by_player = caused_by_player;
                    // Death halts all activity; the body is removed from the
                    // navigation service once the despawn delay elapses.
                    nav.set_stopped(agent, true);
                    nav.clear_path(agent);
                    self.bus.publish(AgentEvent::Died {
                        agent,
                        caused_by_player,
                    });
                }
            }
        }
        outcome
    }

    /// Dispatches a physics "trigger entered" notification for an agent's
    /// body collider.
    pub fn handle_trigger<N: Navigation, P: DamageSink>(
        &mut self,
        agent: EntityId,
        other: EntityId,
        other_tag: ContactTag,
        now: f32,
        nav: &mut N,
        player: &mut P,
        projectiles: &mut ProjectileSystem,
    ) {
        let Some(a) = self.agents.get(&agent) else {
            return;
        };
        if a.health.is_dead() {
            return;
        }
        let contact_damage = a.contact_damage;
        let profile = a.profile;

        match other_tag {
            ContactTag::Player if profile.damages_player => {
                if player.take_damage(contact_damage, now) != DamageOutcome::Ignored {
                    self.bus.publish(AgentEvent::PlayerDamaged {
                        amount: contact_damage,
                        source: agent,
                    });
                }
            }
            ContactTag::Projectile => {
                if let Some(hit) = projectiles.handle_trigger(other, agent, ContactTag::Enemy) {
                    self.apply_projectile_hit(hit, now, nav, player);
                }
            }
            ContactTag::EnemyVision if profile.vision_volume_hurts => {
                self.damage_agent(agent, contact_damage, false, now, nav);
            }
            _ => {}
        }
    }

    /// Routes a resolved projectile hit into the right damage sink.
    pub fn apply_projectile_hit<N: Navigation, P: DamageSink>(
        &mut self,
        hit: ProjectileHit,
        now: f32,
        nav: &mut N,
        player: &mut P,
    ) {
        match hit.target_tag {
            ContactTag::Player => {
                if player.take_damage(hit.damage, now) != DamageOutcome::Ignored {
                    self.bus.publish(AgentEvent::PlayerDamaged {
                        amount: hit.damage,
                        source: hit.projectile,
                    });
                }
            }
            ContactTag::Enemy | ContactTag::EnemyVision => {
                self.damage_agent(hit.target, hit.damage, hit.caused_by_player, now, nav);
            }
            ContactTag::Projectile => {}
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::TestRig;
    use super::*;
    use crate::escapist::EscapistConfig;
    use crate::hunter::HunterConfig;
    use crate::patroller::PatrollerConfig;
    use crate::nav::PlanarNav;

    fn patroller_rig() -> (TestRig, EntityId) {
        let mut rig = TestRig::new();
        let agent = rig.spawn_patroller(PatrollerConfig::default(), None);
        (rig, agent)
    }

    #[test]
    fn test_spawn_announces_and_registers() {
        let (mut rig, agent) = patroller_rig();
        assert!(rig.system.contains(agent));
        assert_eq!(rig.system.len(), 1);

        rig.step();
        assert!(rig
            .drain_events()
            .iter()
            .any(|e| matches!(e, AgentEvent::Spawned { archetype: Archetype::Patroller, .. })));
    }

    #[test]
    fn test_damage_publishes_feedback() {
        let (mut rig, agent) = patroller_rig();
        let TestRig { system, nav, .. } = &mut rig;
        let outcome = system.damage_agent(agent, 30.0, true, 1.0, nav);

        assert_eq!(outcome, DamageOutcome::Damaged { remaining: 70.0 });
        assert_eq!(rig.system.health_fraction(agent), Some(0.7));
        rig.step();
        assert!(rig.drain_events().iter().any(|e| matches!(
            e,
            AgentEvent::Damaged {
                caused_by_player: true,
                ..
            }
        )));
    }

    #[test]
    fn test_lethal_damage_emits_death_and_despawns_later() {
        let (mut rig, agent) = patroller_rig();
        let TestRig { system, nav, .. } = &mut rig;
        let outcome = system.damage_agent(agent, 500.0, true, 0.1, nav);
        assert_eq!(outcome, DamageOutcome::Died);

        rig.step();
        let events = rig.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::Died {
                caused_by_player: true,
                ..
            }
        )));
        assert!(rig.system.contains(agent));
        assert_eq!(rig.behavior(agent), Some(Behavior::Dead));

        // The removal happens after the despawn delay.
        rig.run(2.5);
        assert!(!rig.system.contains(agent));
        assert!(rig
            .drain_events()
            .iter()
            .any(|e| matches!(e, AgentEvent::Despawned { .. })));
    }

    #[test]
    fn test_no_transition_out_of_dead() {
        let (mut rig, agent) = patroller_rig();
        let TestRig { system, nav, .. } = &mut rig;
        system.damage_agent(agent, 500.0, false, 0.1, nav);

        for _ in 0..10 {
            rig.step();
            if !rig.system.contains(agent) {
                break;
            }
            assert_eq!(rig.behavior(agent), Some(Behavior::Dead));
        }
    }

    #[test]
    fn test_dead_agent_refuses_further_damage() {
        let (mut rig, agent) = patroller_rig();
        let TestRig { system, nav, .. } = &mut rig;
        system.damage_agent(agent, 500.0, false, 0.1, nav);

        let outcome = system.damage_agent(agent, 10.0, false, 5.0, nav);
        assert_eq!(outcome, DamageOutcome::Ignored);
    }

    #[test]
    fn test_hunter_contact_damages_player() {
        let mut rig = TestRig::new();
        let agent = rig.spawn_hunter(HunterConfig::default(), None);

        let TestRig {
            system,
            nav,
            player_health,
            projectiles,
            ..
        } = &mut rig;
        system.handle_trigger(
            agent,
            EntityId::new(),
            ContactTag::Player,
            1.0,
            nav,
            player_health,
            projectiles,
        );
        assert!(rig.player_health.current() < rig.player_health.max());
        rig.step();
        assert!(rig
            .drain_events()
            .iter()
            .any(|e| matches!(e, AgentEvent::PlayerDamaged { .. })));
    }

    #[test]
    fn test_patroller_contact_spares_player() {
        let (mut rig, agent) = patroller_rig();
        let TestRig {
            system,
            nav,
            player_health,
            projectiles,
            ..
        } = &mut rig;
        system.handle_trigger(
            agent,
            EntityId::new(),
            ContactTag::Player,
            1.0,
            nav,
            player_health,
            projectiles,
        );
        assert_eq!(rig.player_health.current(), rig.player_health.max());
    }

    #[test]
    fn test_vision_volume_contact_hurts_patroller() {
        let (mut rig, agent) = patroller_rig();
        let TestRig {
            system,
            nav,
            player_health,
            projectiles,
            ..
        } = &mut rig;
        system.handle_trigger(
            agent,
            EntityId::new(),
            ContactTag::EnemyVision,
            1.0,
            nav,
            player_health,
            projectiles,
        );
        assert_eq!(rig.system.health_fraction(agent), Some(0.9));
    }

    #[test]
    fn test_vision_volume_contact_spares_hunter() {
        let mut rig = TestRig::new();
        let agent = rig.spawn_hunter(HunterConfig::default(), None);
        let TestRig {
            system,
            nav,
            player_health,
            projectiles,
            ..
        } = &mut rig;
        system.handle_trigger(
            agent,
            EntityId::new(),
            ContactTag::EnemyVision,
            1.0,
            nav,
            player_health,
            projectiles,
        );
        assert_eq!(rig.system.health_fraction(agent), Some(1.0));
    }

    #[test]
    fn test_player_projectile_damages_agent_with_attribution() {
        use crate::combat::ProjectileSpawn;
        use nightfall_common::Faction;

        let (mut rig, agent) = patroller_rig();
        let spawn = ProjectileSpawn {
            projectile: EntityId::new(),
            shooter: rig.player,
            faction: Faction::Player,
            origin: Vec3::ZERO,
            velocity: Vec3::Z,
            damage: 20.0,
            lifetime: 3.0,
        };
        let projectile = rig.projectiles.spawn(spawn, 0.0);

        let TestRig {
            system,
            nav,
            player_health,
            projectiles,
            ..
        } = &mut rig;
        system.handle_trigger(
            agent,
            projectile,
            ContactTag::Projectile,
            1.0,
            nav,
            player_health,
            projectiles,
        );

        assert_eq!(rig.system.health_fraction(agent), Some(0.8));
        assert!(rig.projectiles.is_empty());
        rig.step();
        assert!(rig.drain_events().iter().any(|e| matches!(
            e,
            AgentEvent::Damaged {
                caused_by_player: true,
                ..
            }
        )));
    }

    #[test]
    fn test_enemy_projectile_hit_on_player_routes_to_sink() {
        use crate::combat::ProjectileSpawn;
        use nightfall_common::Faction;

        let mut rig = TestRig::new();
        let shooter = rig.spawn_escapist(EscapistConfig::default());
        let spawn = ProjectileSpawn {
            projectile: EntityId::new(),
            shooter,
            faction: Faction::Enemy,
            origin: Vec3::ZERO,
            velocity: Vec3::Z,
            damage: 20.0,
            lifetime: 3.0,
        };
        let projectile = rig.projectiles.spawn(spawn, 0.0);

        let hit = rig
            .projectiles
            .handle_trigger(projectile, rig.player, ContactTag::Player)
            .expect("enemy projectile connects with player");
        let TestRig {
            system,
            nav,
            player_health,
            ..
        } = &mut rig;
        system.apply_projectile_hit(hit, 1.0, nav, player_health);

        assert!(rig.player_health.current() < rig.player_health.max());
    }

    #[test]
    fn test_despawn_unknown_agent_errors() {
        let mut system = AgentSystem::new();
        let mut nav = PlanarNav::new(10.0);
        let result = system.despawn(EntityId::new(), &mut nav);
        assert!(matches!(result, Err(AgentError::NotFound(_))));
    }

    #[test]
    fn test_iter_and_queries() {
        let mut rig = TestRig::new();
        let a = rig.spawn_patroller(PatrollerConfig::default(), None);
        let b = rig.spawn_escapist(EscapistConfig::default());

        assert_eq!(rig.system.len(), 2);
        let ids: Vec<EntityId> = rig.system.iter().map(|(id, _)| id).collect();
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
        assert_eq!(
            rig.system.get(b).map(Agent::archetype),
            Some(Archetype::Escapist)
        );
        assert!(rig.system.behavior_of(EntityId::new()).is_none());
    }
}
