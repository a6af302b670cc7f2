//! Patrol routes and the shared waypoint/roam follower.
//!
//! The spawner owns the waypoints and lends them to agents through a cheap
//! reference-counted handle; an agent owns only its current index. The
//! source material duplicated this walk-dwell-advance loop across
//! archetypes; [`PatrolFollower`] is the one generalized copy, and it
//! substitutes a perpetual random roam when no route is configured.

use crate::nav::Navigation;
use crate::rng::RandomSource;
use glam::Vec3;
use nightfall_common::EntityId;
use std::f32::consts::TAU;
use std::sync::Arc;
use tracing::warn;

/// Default dwell time at each waypoint, in seconds.
const DEFAULT_WAIT_TIME: f32 = 2.0;
/// Default radius for random roaming.
const DEFAULT_ROAM_RADIUS: f32 = 10.0;

/// Ordered waypoint sequence shared between a spawner and its agents.
#[derive(Debug, Clone)]
pub struct PatrolRoute {
    points: Arc<[Vec3]>,
}

impl PatrolRoute {
    /// Creates a route from a waypoint list.
    #[must_use]
    pub fn new(points: Vec<Vec3>) -> Self {
        Self {
            points: points.into(),
        }
    }

    /// Returns the number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns whether the route has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the waypoint at `index`, wrapping modulo the route length.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Vec3> {
        (!self.is_empty()).then(|| self.points[index % self.points.len()])
    }
}

impl FromIterator<Vec3> for PatrolRoute {
    fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Samples the nearest walkable point, retrying once at half radius before
/// giving up for this tick.
fn sample_with_retry<N: Navigation>(nav: &N, point: Vec3, radius: f32) -> Option<Vec3> {
    nav.sample_walkable(point, radius)
        .or_else(|| nav.sample_walkable(point, radius * 0.5))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Walking toward the current destination (or still trying to pick one).
    Seek { destination_issued: bool },
    /// Dwelling at a reached waypoint until the deadline.
    Dwell { until: f32 },
}

/// Walk-dwell-advance loop over a route, or a perpetual random roam when no
/// route is configured.
#[derive(Debug, Clone)]
pub struct PatrolFollower {
    route: Option<PatrolRoute>,
    index: usize,
    phase: Phase,
    wait_time: f32,
    roam_radius: f32,
}

impl PatrolFollower {
    /// Creates a follower. An absent or empty route degrades to random
    /// roaming rather than failing.
    #[must_use]
    pub fn new(route: Option<PatrolRoute>) -> Self {
        let route = match route {
            Some(r) if r.is_empty() => {
                warn!("empty patrol route; falling back to random roam");
                None
            }
            other => other,
        };
        Self {
            route,
            index: 0,
            phase: Phase::Seek {
                destination_issued: false,
            },
            wait_time: DEFAULT_WAIT_TIME,
            roam_radius: DEFAULT_ROAM_RADIUS,
        }
    }

    /// Overrides the dwell time.
    #[must_use]
    pub const fn with_wait_time(mut self, wait_time: f32) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Overrides the roam radius.
    #[must_use]
    pub const fn with_roam_radius(mut self, roam_radius: f32) -> Self {
        self.roam_radius = roam_radius;
        self
    }

    /// Returns the current waypoint index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns whether the follower roams instead of walking a route.
    #[must_use]
    pub const fn is_roaming(&self) -> bool {
        self.route.is_none()
    }

    /// Returns whether the follower is dwelling at a waypoint.
    #[must_use]
    pub const fn is_dwelling(&self) -> bool {
        matches!(self.phase, Phase::Dwell { .. })
    }

    /// Forces the follower to re-issue its destination on the next tick
    /// (used when patrol resumes after an interruption).
    pub fn reissue(&mut self) {
        self.phase = Phase::Seek {
            destination_issued: false,
        };
    }

    /// Restarts the loop from the first waypoint (re-initialization).
    pub fn restart(&mut self) {
        self.index = 0;
        self.reissue();
    }

    /// Runs one tick of the loop.
    pub fn update<N: Navigation, R: RandomSource>(
        &mut self,
        agent: EntityId,
        now: f32,
        nav: &mut N,
        rng: &mut R,
    ) {
        if !nav.is_on_walkable(agent) {
            return;
        }

        match self.phase {
            Phase::Seek {
                destination_issued: false,
            } => {
                if self.issue_destination(agent, nav, rng) {
                    self.phase = Phase::Seek {
                        destination_issued: true,
                    };
                }
            }
            Phase::Seek {
                destination_issued: true,
            } => {
                let arrived = !nav.is_path_pending(agent)
                    && nav.remaining_distance(agent) <= nav.stopping_distance(agent);
                if arrived {
                    self.phase = Phase::Dwell {
                        until: now + self.wait_time,
                    };
                }
            }
            Phase::Dwell { until } => {
                if now >= until {
                    if let Some(route) = &self.route {
                        self.index = (self.index + 1) % route.len();
                    }
                    let issued = self.issue_destination(agent, nav, rng);
                    self.phase = Phase::Seek {
                        destination_issued: issued,
                    };
                }
            }
        }
    }

    /// Picks and assigns the next destination. Returns false when a roam
    /// sample fails (abandoned for this tick, retried next tick).
    fn issue_destination<N: Navigation, R: RandomSource>(
        &mut self,
        agent: EntityId,
        nav: &mut N,
        rng: &mut R,
    ) -> bool {
        let destination = match &self.route {
            Some(route) => match route.point(self.index) {
                Some(point) => point,
                None => return false,
            },
            None => {
                let position = nav.position(agent);
                let angle = rng.range(0.0, TAU);
                let distance = rng.range(0.0, self.roam_radius);
                let candidate =
                    position + Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);
                match sample_with_retry(nav, candidate, self.roam_radius) {
                    Some(point) => point,
                    None => return false,
                }
            }
        };
        nav.set_destination(agent, destination);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::PlanarNav;
    use crate::rng::SeededRng;

    const DT: f32 = 0.1;

    fn setup(route: Option<PatrolRoute>) -> (PlanarNav, EntityId, PatrolFollower, SeededRng) {
        let mut nav = PlanarNav::new(100.0);
        let agent = EntityId::new();
        nav.insert_agent(agent, Vec3::ZERO, 0.0);
        let follower = PatrolFollower::new(route).with_wait_time(0.5);
        (nav, agent, follower, SeededRng::new(7))
    }

    fn square_route() -> PatrolRoute {
        PatrolRoute::new(vec![
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, 5.0),
        ])
    }

    /// Runs follower + nav for `seconds`, returning the indices seen.
    fn run(
        nav: &mut PlanarNav,
        agent: EntityId,
        follower: &mut PatrolFollower,
        rng: &mut SeededRng,
        seconds: f32,
    ) -> Vec<usize> {
        let mut indices = Vec::new();
        let steps = (seconds / DT) as usize;
        for step in 0..steps {
            let now = step as f32 * DT;
            nav.advance(DT);
            follower.update(agent, now, nav, rng);
            if indices.last() != Some(&follower.index()) {
                indices.push(follower.index());
            }
        }
        indices
    }

    #[test]
    fn test_route_point_wraps() {
        let route = square_route();
        assert_eq!(route.point(0), route.point(3));
        assert_eq!(route.point(1), route.point(4));
    }

    #[test]
    fn test_empty_route_degrades_to_roam() {
        let follower = PatrolFollower::new(Some(PatrolRoute::new(Vec::new())));
        assert!(follower.is_roaming());
    }

    #[test]
    fn test_waypoints_visited_in_order() {
        let (mut nav, agent, mut follower, mut rng) = setup(Some(square_route()));
        let indices = run(&mut nav, agent, &mut follower, &mut rng, 30.0);

        assert!(indices.len() >= 3);
        assert_eq!(indices[0], 0);
        assert_eq!(indices[1], 1);
        assert_eq!(indices[2], 2);
    }

    #[test]
    fn test_index_cycles_modulo_route_length() {
        let (mut nav, agent, mut follower, mut rng) = setup(Some(square_route()));
        let indices = run(&mut nav, agent, &mut follower, &mut rng, 60.0);

        // After N arrivals the index returns to its starting value.
        assert!(indices.len() >= 4, "route should wrap within the run");
        assert_eq!(indices[..4], [0, 1, 2, 0]);
    }

    #[test]
    fn test_dwell_between_waypoints() {
        let (mut nav, agent, mut follower, mut rng) = setup(Some(PatrolRoute::new(vec![
            Vec3::new(1.0, 0.0, 0.0),
        ])));

        // Arrive (already within stopping distance after a couple of steps).
        for step in 0..5 {
            nav.advance(DT);
            follower.update(agent, step as f32 * DT, &mut nav, &mut rng);
        }
        assert!(follower.is_dwelling());
    }

    #[test]
    fn test_roam_issues_destinations() {
        let (mut nav, agent, mut follower, mut rng) = setup(None);
        assert!(follower.is_roaming());

        nav.advance(DT);
        follower.update(agent, 0.0, &mut nav, &mut rng);
        assert!(nav.has_path(agent));
    }

    #[test]
    fn test_roam_is_deterministic_with_seeded_rng() {
        let (mut nav_a, agent_a, mut follower_a, mut rng_a) = setup(None);
        let (mut nav_b, agent_b, mut follower_b, mut rng_b) = setup(None);

        for step in 0..50 {
            let now = step as f32 * DT;
            nav_a.advance(DT);
            nav_b.advance(DT);
            follower_a.update(agent_a, now, &mut nav_a, &mut rng_a);
            follower_b.update(agent_b, now, &mut nav_b, &mut rng_b);
        }
        assert_eq!(nav_a.position(agent_a), nav_b.position(agent_b));
    }

    #[test]
    fn test_off_mesh_agent_stays_inert() {
        let mut nav = PlanarNav::new(10.0);
        let agent = EntityId::new();
        nav.insert_agent(agent, Vec3::new(50.0, 0.0, 0.0), 0.0);
        let mut follower = PatrolFollower::new(Some(square_route()));
        let mut rng = SeededRng::new(1);

        for step in 0..50 {
            nav.advance(DT);
            follower.update(agent, step as f32 * DT, &mut nav, &mut rng);
        }
        assert_eq!(nav.position(agent), Vec3::new(50.0, 0.0, 0.0));
        assert_eq!(follower.index(), 0);
    }

    #[test]
    fn test_restart_resets_index() {
        let (mut nav, agent, mut follower, mut rng) = setup(Some(square_route()));
        run(&mut nav, agent, &mut follower, &mut rng, 20.0);
        assert_ne!(follower.index(), 0);

        follower.restart();
        assert_eq!(follower.index(), 0);
        assert!(!follower.is_dwelling());
    }
}
