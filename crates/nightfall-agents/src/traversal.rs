//! Jump-link traversal: a time-parameterized arc across a mesh
//! discontinuity.
//!
//! While an arc is active the agent's steering is suspended and its position
//! is written directly: a linear interpolation between the link endpoints
//! plus a sine-shaped vertical offset, which reads as a parabolic hop. The
//! final sample snaps exactly to the end point.

use crate::nav::JumpLink;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Default hop duration in seconds.
const DEFAULT_DURATION: f32 = 1.0;
/// Default arc height in world units.
const DEFAULT_ARC_HEIGHT: f32 = 2.0;

/// Arc parameters for jump-link traversal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Seconds from start to end of the hop.
    pub duration: f32,
    /// Peak height of the arc above the straight line.
    pub arc_height: f32,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            arc_height: DEFAULT_ARC_HEIGHT,
        }
    }
}

/// A jump in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpArc {
    start: Vec3,
    end: Vec3,
    duration: f32,
    height: f32,
    elapsed: f32,
}

impl JumpArc {
    /// Begins a traversal across `link`.
    #[must_use]
    pub fn new(link: JumpLink, config: TraversalConfig) -> Self {
        Self {
            start: link.start,
            end: link.end,
            duration: config.duration.max(f32::EPSILON),
            height: config.arc_height,
            elapsed: 0.0,
        }
    }

    /// Returns the position at normalized time `t` ∈ [0, 1].
    #[must_use]
    pub fn position_at(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        if t >= 1.0 {
            // Snap: the sine term would leave a rounding-error residue.
            return self.end;
        }
        self.start.lerp(self.end, t) + Vec3::Y * ((PI * t).sin() * self.height)
    }

    /// Advances the arc by `dt`, returning the new position.
    pub fn advance(&mut self, dt: f32) -> Vec3 {
        self.elapsed += dt;
        self.position_at(self.elapsed / self.duration)
    }

    /// Returns whether the hop has landed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Returns the landing point.
    #[must_use]
    pub const fn end(&self) -> Vec3 {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc() -> JumpArc {
        JumpArc::new(
            JumpLink::new(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)),
            TraversalConfig {
                duration: 1.0,
                arc_height: 2.0,
            },
        )
    }

    #[test]
    fn test_starts_at_link_start() {
        let arc = arc();
        assert_eq!(arc.position_at(0.0), Vec3::ZERO);
    }

    #[test]
    fn test_lands_exactly_on_end() {
        let mut arc = arc();
        let mut pos = Vec3::ZERO;
        while !arc.is_complete() {
            pos = arc.advance(0.016);
        }
        assert_eq!(pos, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_peak_height_at_midpoint() {
        let arc = arc();
        let mid = arc.position_at(0.5);
        assert!((mid.y - 2.0).abs() < 0.001);
        assert!((mid.x - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_height_rises_then_falls() {
        let arc = arc();
        assert!(arc.position_at(0.25).y < arc.position_at(0.5).y);
        assert!(arc.position_at(0.75).y < arc.position_at(0.5).y);
        assert!(arc.position_at(0.25).y > 0.0);
    }

    #[test]
    fn test_horizontal_progress_is_monotone() {
        let arc = arc();
        let mut last_x = -1.0;
        for i in 0..=20 {
            let t = i as f32 / 20.0;
            let x = arc.position_at(t).x;
            assert!(x >= last_x);
            last_x = x;
        }
    }

    #[test]
    fn test_overshoot_clamps_to_end() {
        let mut arc = arc();
        let pos = arc.advance(5.0);
        assert_eq!(pos, Vec3::new(4.0, 0.0, 0.0));
        assert!(arc.is_complete());
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let mut arc = JumpArc::new(
            JumpLink::new(Vec3::ZERO, Vec3::X),
            TraversalConfig {
                duration: 0.0,
                arc_height: 1.0,
            },
        );
        assert_eq!(arc.advance(0.016), Vec3::X);
        assert!(arc.is_complete());
    }
}
