//! Movement sequencing
//!
//! A [`Motion`] is the entity's current movement program. The world steps it
//! on the entity's movement timer: the program yields a displacement, the
//! world applies it (possibly clipped at the canvas edge), then the program
//! checks whether its target was reached. Paths are a queue of waypoints
//! consumed one target at a time.

use std::collections::VecDeque;

use glam::Vec2;

use crate::geom::{reached_point, step_toward};

/// Interval between movement steps (ms)
pub const MOVE_INTERVAL_MS: u64 = 16;

/// Result of checking a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionStatus {
    Moving,
    /// The point or path is complete; the motion is now idle
    Arrived,
}

/// Movement program
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Motion {
    #[default]
    Idle,
    /// Constant displacement per step
    Vector { velocity: Vec2 },
    /// Step toward a single point
    ToPoint { from: Vec2, target: Vec2, speed: f32 },
    /// Walk through waypoints in order
    Path {
        from: Vec2,
        target: Vec2,
        rest: VecDeque<Vec2>,
        speed: f32,
    },
}

impl Motion {
    pub fn to_point(from: Vec2, target: Vec2, speed: f32) -> Self {
        Motion::ToPoint {
            from,
            target,
            speed,
        }
    }

    /// A path through `points`; an empty list is no motion at all
    pub fn path(from: Vec2, points: impl IntoIterator<Item = Vec2>, speed: f32) -> Self {
        let mut rest: VecDeque<Vec2> = points.into_iter().collect();
        match rest.pop_front() {
            Some(target) => Motion::Path {
                from,
                target,
                rest,
                speed,
            },
            None => Motion::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Motion::Idle)
    }

    /// A point or path move that has not completed yet
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Motion::ToPoint { .. } | Motion::Path { .. })
    }

    /// Displacement for one step starting at `pos`
    pub fn delta(&self, pos: Vec2) -> Vec2 {
        match self {
            Motion::Idle => Vec2::ZERO,
            Motion::Vector { velocity } => *velocity,
            Motion::ToPoint { target, speed, .. } | Motion::Path { target, speed, .. } => {
                step_toward(pos, *target, *speed) - pos
            }
        }
    }

    /// Check arrival after moving to `pos`. Paths move on to their next
    /// waypoint; the final arrival leaves the motion idle.
    pub fn settle(&mut self, pos: Vec2) -> MotionStatus {
        match self {
            Motion::Idle | Motion::Vector { .. } => MotionStatus::Moving,
            Motion::ToPoint { from, target, .. } => {
                if reached_point(*from, pos, *target) {
                    *self = Motion::Idle;
                    MotionStatus::Arrived
                } else {
                    MotionStatus::Moving
                }
            }
            Motion::Path {
                from, target, rest, ..
            } => {
                if !reached_point(*from, pos, *target) {
                    return MotionStatus::Moving;
                }
                match rest.pop_front() {
                    Some(next) => {
                        *from = pos;
                        *target = next;
                        MotionStatus::Moving
                    }
                    None => {
                        *self = Motion::Idle;
                        MotionStatus::Arrived
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(motion: &mut Motion, mut pos: Vec2, max_steps: usize) -> (Vec2, usize) {
        for step in 1..=max_steps {
            pos += motion.delta(pos);
            if motion.settle(pos) == MotionStatus::Arrived {
                return (pos, step);
            }
        }
        (pos, max_steps + 1)
    }

    #[test]
    fn test_to_point_arrives_once() {
        let start = Vec2::new(10.0, 10.0);
        let target = Vec2::new(50.0, 30.0);
        let mut motion = Motion::to_point(start, target, 5.0);
        let (pos, steps) = run(&mut motion, start, 100);
        assert_eq!(pos, target);
        assert_eq!(steps, 8);
        assert!(motion.is_idle());
        assert_eq!(motion.settle(pos), MotionStatus::Moving);
    }

    #[test]
    fn test_path_visits_waypoints_in_order() {
        let start = Vec2::new(0.0, -40.0);
        let points = [
            Vec2::new(0.0, 100.0),
            Vec2::new(100.0, 100.0),
            Vec2::new(100.0, 50.0),
        ];
        let mut motion = Motion::path(start, points, 10.0);

        let mut pos = start;
        let mut visited = Vec::new();
        for _ in 0..200 {
            pos += motion.delta(pos);
            let before = motion.clone();
            let status = motion.settle(pos);
            if let Motion::Path { target, .. } = before {
                if motion != before {
                    visited.push(target);
                }
            }
            if status == MotionStatus::Arrived {
                break;
            }
        }
        assert_eq!(visited, points.to_vec());
        assert_eq!(pos, points[2]);
    }

    #[test]
    fn test_empty_path_is_idle() {
        assert!(Motion::path(Vec2::ZERO, Vec::new(), 3.0).is_idle());
    }

    #[test]
    fn test_vector_never_arrives() {
        let mut motion = Motion::Vector {
            velocity: Vec2::new(0.0, 2.0),
        };
        assert_eq!(motion.delta(Vec2::ZERO), Vec2::new(0.0, 2.0));
        assert_eq!(motion.settle(Vec2::new(0.0, 1e6)), MotionStatus::Moving);
        assert!(!motion.is_outstanding());
    }
}
