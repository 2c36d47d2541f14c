//! Continuous-to-grid coordinate mapping.
//!
//! The field lives on a square lattice with spacing `step_size`. Agents move in
//! continuous space, so every read and write first resolves the four lattice
//! points enclosing a position and the share of influence each of them takes.

use serde::{Deserialize, Serialize};

/// Relative tolerance used when deciding whether a coordinate already sits on
/// a lattice line.
const ALIGN_EPSILON: f64 = 1e-9;

/// A real-valued location in environment units (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Moves `length` along `angle` (radians, counter-clockwise from +x).
    #[must_use]
    pub fn offset(&self, angle: f64, length: f64) -> Position {
        Position {
            x: self.x + angle.cos() * length,
            y: self.y + angle.sin() * length,
        }
    }
}

/// An integer lattice coordinate. May lie outside the materialized grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub x: i64,
    pub y: i64,
}

impl GridPoint {
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// A lattice point together with its distance to, and influence on, one
/// specific continuous position. Only meaningful for that single query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub point: GridPoint,
    pub distance: f64,
    pub weight: f64,
}

/// Index of the largest lattice line not above `value`.
///
/// Values within `ALIGN_EPSILON` of a lattice line snap onto it, so that
/// accumulated float error in sampled positions does not skip a cell.
pub(crate) fn floor_to_step(value: f64, step: f64) -> i64 {
    let remainder = value.rem_euclid(step);
    let aligned = if step - remainder <= ALIGN_EPSILON * step {
        value + (step - remainder)
    } else {
        value - remainder
    };
    (aligned / step).round() as i64
}

/// Index of the smallest lattice line not below `value`.
pub(crate) fn ceil_to_step(value: f64, step: f64) -> i64 {
    let remainder = value.rem_euclid(step);
    let aligned = if remainder <= ALIGN_EPSILON * step {
        value - remainder
    } else {
        value + (step - remainder)
    };
    (aligned / step).round() as i64
}

/// Maps continuous positions onto a `side × side` lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMapper {
    step_size: f64,
    side: usize,
}

impl GridMapper {
    #[must_use]
    pub fn new(step_size: f64, side: usize) -> Self {
        Self { step_size, side }
    }

    /// Lattice covering `[0, environment_size]` inclusive on both ends.
    #[must_use]
    pub fn for_environment(environment_size: f64, step_size: f64) -> Self {
        let side = floor_to_step(environment_size, step_size).max(0) as usize + 1;
        Self::new(step_size, side)
    }

    #[must_use]
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    #[must_use]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Exact only when `coord` is a multiple of the step size.
    #[must_use]
    pub fn to_index(&self, coord: f64) -> f64 {
        coord / self.step_size
    }

    #[must_use]
    pub fn floor_index(&self, coord: f64) -> i64 {
        floor_to_step(coord, self.step_size)
    }

    #[must_use]
    pub fn ceil_index(&self, coord: f64) -> i64 {
        ceil_to_step(coord, self.step_size)
    }

    #[must_use]
    pub fn real_position(&self, point: GridPoint) -> Position {
        Position::new(
            point.x as f64 * self.step_size,
            point.y as f64 * self.step_size,
        )
    }

    #[must_use]
    pub fn contains(&self, point: GridPoint) -> bool {
        point.x >= 0
            && point.y >= 0
            && (point.x as u64) < self.side as u64
            && (point.y as u64) < self.side as u64
    }

    /// Row-major offset of `point` (rows are indexed by `x`), or `None` when
    /// the point lies outside the grid.
    #[inline]
    #[must_use]
    pub fn linear_index(&self, point: GridPoint) -> Option<usize> {
        if self.contains(point) {
            Some(point.x as usize * self.side + point.y as usize)
        } else {
            None
        }
    }

    /// The four lattice points around `position`, in the order
    /// `(x0, y0), (x0+1, y0), (x0+1, y0+1), (x0, y0+1)`.
    #[must_use]
    pub fn enclosing_points(&self, position: Position) -> [GridPoint; 4] {
        let x0 = self.floor_index(position.x);
        let y0 = self.floor_index(position.y);
        let x1 = x0.saturating_add(1);
        let y1 = y0.saturating_add(1);
        [
            GridPoint::new(x0, y0),
            GridPoint::new(x1, y0),
            GridPoint::new(x1, y1),
            GridPoint::new(x0, y1),
        ]
    }

    /// Twice the span of one cell side; the normalizing distance for
    /// influence weights.
    #[must_use]
    pub fn max_influence_distance(&self) -> f64 {
        2.0 * (self.step_size * self.step_size).sqrt()
    }

    /// Linear-falloff influence of each point on `position`, normalized to sum
    /// to one.
    ///
    /// Raw terms are `1 - d / max_distance` and are not clamped, so a point
    /// farther than `max_distance` contributes a negative share. A degenerate
    /// zero total falls back to equal quarters.
    #[must_use]
    pub fn influence_weights(&self, position: Position, points: &[GridPoint; 4]) -> [f64; 4] {
        let max_distance = self.max_influence_distance();
        let raw = points.map(|p| 1.0 - position.distance(&self.real_position(p)) / max_distance);
        let total: f64 = raw.iter().sum();
        if total.abs() < f64::EPSILON || !total.is_finite() {
            return [0.25; 4];
        }
        raw.map(|r| r / total)
    }

    /// First of `points` with the smallest distance to `position`.
    #[must_use]
    pub fn nearest_point(&self, position: Position, points: &[GridPoint; 4]) -> GridPoint {
        let mut nearest = points[0];
        let mut best = position.distance(&self.real_position(nearest));
        for &candidate in &points[1..] {
            let distance = position.distance(&self.real_position(candidate));
            if distance < best {
                best = distance;
                nearest = candidate;
            }
        }
        nearest
    }

    /// Enclosing points with their distances and influence weights.
    #[must_use]
    pub fn enclose(&self, position: Position) -> [WeightedPoint; 4] {
        let points = self.enclosing_points(position);
        let weights = self.influence_weights(position, &points);
        let mut out = [WeightedPoint {
            point: points[0],
            distance: 0.0,
            weight: 0.0,
        }; 4];
        for (slot, (point, weight)) in out.iter_mut().zip(points.into_iter().zip(weights)) {
            *slot = WeightedPoint {
                point,
                distance: position.distance(&self.real_position(point)),
                weight,
            };
        }
        out
    }
}
