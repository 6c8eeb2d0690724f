//! Controller — centroid steering and motion integration.

use std::time::Duration;

use crate::conf::MotionConfig;
use crate::state::{Kinematics, Position, Vec2};

/// Velocity (units per second) plus an optional waypoint to stop at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionVector {
    pub velocity: Vec2,
    pub target: Option<Position>,
}

impl MotionVector {
    /// Hold position.
    pub const fn idle() -> Self {
        Self {
            velocity: Vec2::ZERO,
            target: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.velocity.is_zero()
    }

    /// Unit heading, `None` while idle.
    pub fn heading(&self) -> Option<Vec2> {
        self.velocity.normalized()
    }
}

/// Arithmetic mean of `positions`; `None` when empty.
pub fn centroid(positions: &[Position]) -> Option<Position> {
    if positions.is_empty() {
        return None;
    }
    let n = positions.len() as f64;
    let (sx, sy) = positions
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Position::new(sx / n, sy / n))
}

#[derive(Debug, Clone)]
pub struct FlockingController {
    cruise_speed: f64,
    lookahead: f64,
    stop_at_target: bool,
}

impl FlockingController {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            cruise_speed: config.cruise_speed,
            lookahead: config.lookahead,
            stop_at_target: config.stop_at_target,
        }
    }

    /// Steer from `self_position` toward the centroid of `peers`.
    ///
    /// No peers, or already at the centroid, yields an idle vector. The
    /// waypoint sits `lookahead` units along the heading but never past the
    /// centroid itself.
    pub fn recompute(&self, peers: &[Position], self_position: Position) -> MotionVector {
        let Some(center) = centroid(peers) else {
            return MotionVector::idle();
        };

        let displacement = center - self_position;
        let Some(unit) = displacement.normalized() else {
            return MotionVector::idle();
        };

        let target = self
            .stop_at_target
            .then(|| self_position + unit * self.lookahead.min(displacement.length()));

        MotionVector {
            velocity: unit * self.cruise_speed,
            target,
        }
    }
}

/// Advance `kinematics` by one tick of length `dt`.
///
/// With a waypoint, a step that would reach or pass it lands exactly on it and
/// the vector goes idle.
pub fn integrate(kinematics: Kinematics, dt: Duration) -> Kinematics {
    let Kinematics { position, motion } = kinematics;
    if motion.is_idle() {
        return kinematics;
    }

    let delta = motion.velocity * dt.as_secs_f64();
    if let Some(target) = motion.target {
        if delta.length() >= position.distance_to(target) {
            return Kinematics {
                position: target,
                motion: MotionVector::idle(),
            };
        }
    }

    Kinematics {
        position: position + delta,
        motion,
    }
}
