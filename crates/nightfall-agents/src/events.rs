//! Event bus for presentation and game-management collaborators.
//!
//! The core never talks to audio, HUD, or score systems directly; it
//! publishes [`AgentEvent`]s onto a bounded channel that the presentation
//! layer drains once per frame. Publishing never blocks: when the channel is
//! full the event is dropped.

use crate::agent::Archetype;
use crossbeam_channel::{bounded, Receiver, Sender};
use nightfall_common::EntityId;
use serde::{Deserialize, Serialize};

/// Default bus capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Timed indicator kinds shown above an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueKind {
    /// "Where did it go?" indicator after losing a chase target.
    QuestionMark,
    /// Exhaustion indicator during the tired state.
    Tired,
}

/// Events published by the behavior core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// An agent was spawned and initialized.
    Spawned {
        /// The new agent.
        agent: EntityId,
        /// Its archetype.
        archetype: Archetype,
    },
    /// An agent was removed from the simulation.
    Despawned {
        /// The removed agent.
        agent: EntityId,
    },
    /// An agent took damage (flash/audio feedback).
    Damaged {
        /// The damaged agent.
        agent: EntityId,
        /// Damage applied.
        amount: f32,
        /// Health fraction remaining, in [0, 1] (health-bar rendering).
        remaining_fraction: f32,
        /// Whether the player dealt the damage.
        caused_by_player: bool,
    },
    /// An agent died (despawn bookkeeping, score, HUD).
    Died {
        /// The dead agent.
        agent: EntityId,
        /// Whether the player landed the killing blow.
        caused_by_player: bool,
    },
    /// The player took damage from an agent or projectile.
    PlayerDamaged {
        /// Damage applied.
        amount: f32,
        /// The entity responsible.
        source: EntityId,
    },
    /// A hunter acquired a target.
    ChaseStarted {
        /// The chasing agent.
        agent: EntityId,
        /// The perceived target.
        target: EntityId,
    },
    /// A hunter gave up a chase after the lost-sight timer ran out.
    TargetLost {
        /// The agent that lost its target.
        agent: EntityId,
    },
    /// An escapist began fleeing.
    FleeStarted {
        /// The fleeing agent.
        agent: EntityId,
    },
    /// An escapist collapsed into the tired state.
    TiredStarted {
        /// The exhausted agent.
        agent: EntityId,
    },
    /// An escapist recovered from the tired state.
    Recovered {
        /// The recovered agent.
        agent: EntityId,
    },
    /// An agent fired a projectile.
    ShotFired {
        /// The shooter.
        agent: EntityId,
        /// The spawned projectile.
        projectile: EntityId,
    },
    /// A timed indicator became visible.
    CueShown {
        /// The agent the cue belongs to.
        agent: EntityId,
        /// Which indicator.
        cue: CueKind,
    },
    /// A timed indicator was hidden.
    CueHidden {
        /// The agent the cue belongs to.
        agent: EntityId,
        /// Which indicator.
        cue: CueKind,
    },
}

/// Bounded broadcast channel for [`AgentEvent`]s.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<AgentEvent>,
    receiver: Receiver<AgentEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Non-blocking: dropped if the bus is full.
    pub fn publish(&self, event: AgentEvent) {
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a sender handle for publishing from elsewhere.
    #[must_use]
    pub fn sender(&self) -> Sender<AgentEvent> {
        self.sender.clone()
    }
}

/// A timed indicator above an agent: shown on demand, hidden after a fixed
/// display time. Re-showing cancels the pending hide and restarts the
/// clock, so overlapping waits for the same cue never race.
#[derive(Debug, Clone)]
pub struct TimedCue {
    kind: CueKind,
    display_time: f32,
    visible_until: Option<f32>,
}

impl TimedCue {
    /// Creates a hidden cue.
    #[must_use]
    pub const fn new(kind: CueKind, display_time: f32) -> Self {
        Self {
            kind,
            display_time,
            visible_until: None,
        }
    }

    /// Returns whether the cue is currently visible.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible_until.is_some()
    }

    /// Shows the cue, restarting the display clock.
    pub fn show(&mut self, agent: EntityId, now: f32, events: &EventBus) {
        if !self.is_visible() {
            events.publish(AgentEvent::CueShown {
                agent,
                cue: self.kind,
            });
        }
        self.visible_until = Some(now + self.display_time);
    }

    /// Hides the cue immediately, cancelling any pending expiry.
    pub fn hide(&mut self, agent: EntityId, events: &EventBus) {
        if self.visible_until.take().is_some() {
            events.publish(AgentEvent::CueHidden {
                agent,
                cue: self.kind,
            });
        }
    }

    /// Hides the cue once its display time has elapsed.
    pub fn update(&mut self, agent: EntityId, now: f32, events: &EventBus) {
        if self.visible_until.is_some_and(|until| now >= until) {
            self.hide(agent, events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(16);
        let agent = EntityId::new();
        bus.publish(AgentEvent::TargetLost { agent });

        let events = bus.drain();
        assert_eq!(events, vec![AgentEvent::TargetLost { agent }]);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(1);
        let agent = EntityId::new();
        bus.publish(AgentEvent::TargetLost { agent });
        bus.publish(AgentEvent::TargetLost { agent });
        assert_eq!(bus.pending_count(), 1);
    }

    #[test]
    fn test_sender_handle() {
        let bus = EventBus::new(4);
        let sender = bus.sender();
        let agent = EntityId::new();
        sender
            .try_send(AgentEvent::TargetLost { agent })
            .expect("bus has room");
        assert_eq!(bus.drain().len(), 1);
    }

    #[test]
    fn test_cue_shows_and_expires() {
        let bus = EventBus::new(16);
        let agent = EntityId::new();
        let mut cue = TimedCue::new(CueKind::QuestionMark, 2.0);

        cue.show(agent, 0.0, &bus);
        assert!(cue.is_visible());

        cue.update(agent, 1.0, &bus);
        assert!(cue.is_visible());

        cue.update(agent, 2.0, &bus);
        assert!(!cue.is_visible());

        let events = bus.drain();
        assert_eq!(
            events,
            vec![
                AgentEvent::CueShown {
                    agent,
                    cue: CueKind::QuestionMark
                },
                AgentEvent::CueHidden {
                    agent,
                    cue: CueKind::QuestionMark
                },
            ]
        );
    }

    #[test]
    fn test_reshow_extends_deadline() {
        let bus = EventBus::new(16);
        let agent = EntityId::new();
        let mut cue = TimedCue::new(CueKind::Tired, 2.0);

        cue.show(agent, 0.0, &bus);
        cue.show(agent, 1.5, &bus);

        // The first deadline has passed, but the re-show replaced it.
        cue.update(agent, 2.5, &bus);
        assert!(cue.is_visible());

        cue.update(agent, 3.5, &bus);
        assert!(!cue.is_visible());

        // Only one shown/hidden pair despite two show calls.
        assert_eq!(bus.drain().len(), 2);
    }

    #[test]
    fn test_hide_without_show_is_noop() {
        let bus = EventBus::new(16);
        let mut cue = TimedCue::new(CueKind::Tired, 2.0);
        cue.hide(EntityId::new(), &bus);
        assert_eq!(bus.pending_count(), 0);
    }
}
