//! Axis-aligned rectangles and boundary tests
//!
//! Shared by both games. Everything here is pure.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Tolerance for "reached or passed" boundary checks.
///
/// Movement toward a point converges on this band instead of the exact
/// coordinate, otherwise float steps can oscillate around the target.
pub const BOUNDARY_EPSILON: f32 = 0.1;

/// An axis-aligned rectangle (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.w, self.h)
    }

    /// Open-interval overlap, see [`rectangles_overlap`]
    pub fn overlaps(&self, other: &Rect) -> bool {
        rectangles_overlap(self, other)
    }

    /// Whether `inner` lies entirely inside this rectangle
    pub fn contains(&self, inner: &Rect) -> bool {
        inner.x >= self.x
            && inner.y >= self.y
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }
}

/// True iff the rectangles share interior area. Touching edges do not count.
#[inline]
pub fn rectangles_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y
}

/// Moving up: has `y` reached or passed `bound`?
#[inline]
pub fn past_top(y: f32, bound: f32) -> bool {
    y <= bound + BOUNDARY_EPSILON
}

/// Moving down: has `y` reached or passed `bound`?
#[inline]
pub fn past_bottom(y: f32, bound: f32) -> bool {
    y >= bound - BOUNDARY_EPSILON
}

/// Moving left: has `x` reached or passed `bound`?
#[inline]
pub fn past_left(x: f32, bound: f32) -> bool {
    x <= bound + BOUNDARY_EPSILON
}

/// Moving right: has `x` reached or passed `bound`?
#[inline]
pub fn past_right(x: f32, bound: f32) -> bool {
    x >= bound - BOUNDARY_EPSILON
}

/// Whether `pos` has reached `target` on both axes, checking each of the
/// four directional components against the direction of travel from `from`.
pub fn reached_point(from: Vec2, pos: Vec2, target: Vec2) -> bool {
    let x_done = if target.x < from.x {
        past_left(pos.x, target.x)
    } else if target.x > from.x {
        past_right(pos.x, target.x)
    } else {
        past_left(pos.x, target.x) && past_right(pos.x, target.x)
    };
    let y_done = if target.y < from.y {
        past_top(pos.y, target.y)
    } else if target.y > from.y {
        past_bottom(pos.y, target.y)
    } else {
        past_top(pos.y, target.y) && past_bottom(pos.y, target.y)
    };
    x_done && y_done
}

/// One step of at most `speed` toward `target`, each axis independently.
///
/// An axis already within `speed` of the target snaps onto it.
pub fn step_toward(pos: Vec2, target: Vec2, speed: f32) -> Vec2 {
    let axis = |p: f32, t: f32| {
        let d = t - p;
        if d.abs() <= speed { t } else { p + d.signum() * speed }
    };
    Vec2::new(axis(pos.x, target.x), axis(pos.y, target.y))
}

/// Zero the components of `delta` that would push `rect` across an edge of
/// `bounds`. Each axis is judged on its own so an entity can still slide
/// along a wall.
pub fn confine_step(rect: &Rect, delta: Vec2, bounds: &Rect) -> Vec2 {
    let moved = rect.translated(delta);
    let x = if moved.x < bounds.x || moved.right() > bounds.right() {
        0.0
    } else {
        delta.x
    };
    let y = if moved.y < bounds.y || moved.bottom() > bounds.bottom() {
        0.0
    } else {
        delta.y
    };
    Vec2::new(x, y)
}

/// True once `rect` lies fully outside `bounds`
pub fn fully_outside(rect: &Rect, bounds: &Rect) -> bool {
    rect.right() <= bounds.x
        || rect.x >= bounds.right()
        || rect.bottom() <= bounds.y
        || rect.y >= bounds.bottom()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_overlap_and_edge_touch() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rectangles_overlap(&a, &Rect::new(5.0, 5.0, 10.0, 10.0)));
        // Sharing an edge is not overlap
        assert!(!rectangles_overlap(&a, &Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!rectangles_overlap(&a, &Rect::new(0.0, 10.0, 10.0, 10.0)));
        assert!(!rectangles_overlap(&a, &Rect::new(20.0, 20.0, 1.0, 1.0)));
    }

    #[test]
    fn test_boundary_epsilon() {
        assert!(past_left(10.05, 10.0));
        assert!(!past_left(10.2, 10.0));
        assert!(past_right(9.95, 10.0));
        assert!(past_top(5.09, 5.0));
        assert!(past_bottom(4.91, 5.0));
    }

    #[test]
    fn test_step_toward_converges() {
        let from = Vec2::new(0.0, 100.0);
        let target = Vec2::new(33.3, 10.0);
        let mut pos = from;
        let mut steps = 0;
        while !reached_point(from, pos, target) {
            pos = step_toward(pos, target, 4.0);
            steps += 1;
            assert!(steps < 100, "step_toward never converged");
        }
        assert_eq!(pos, target);
    }

    #[test]
    fn test_confine_step_blocks_axis_only() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let rect = Rect::new(95.0, 50.0, 5.0, 5.0);
        let step = confine_step(&rect, Vec2::new(3.0, -3.0), &bounds);
        assert_eq!(step, Vec2::new(0.0, -3.0));
    }

    #[test]
    fn test_fully_outside() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(fully_outside(&Rect::new(0.0, -10.0, 5.0, 10.0), &bounds));
        assert!(!fully_outside(&Rect::new(0.0, -9.0, 5.0, 10.0), &bounds));
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(
            ax in -100.0f32..100.0, ay in -100.0f32..100.0, aw in 0.5f32..50.0, ah in 0.5f32..50.0,
            bx in -100.0f32..100.0, by in -100.0f32..100.0, bw in 0.5f32..50.0, bh in 0.5f32..50.0,
        ) {
            let a = Rect::new(ax, ay, aw, ah);
            let b = Rect::new(bx, by, bw, bh);
            prop_assert_eq!(rectangles_overlap(&a, &b), rectangles_overlap(&b, &a));
        }
    }
}
