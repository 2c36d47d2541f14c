//! Precomputed Gaussian kernel used by path-based deposition.

use crate::grid::ceil_to_step;
use std::f64::consts::PI;

/// Kernel support in standard deviations.
pub const CUTOFF_SIGMAS: f64 = 4.0;

/// Tolerance on the cutoff comparison for cells lying exactly on the radius.
const CUTOFF_EPSILON: f64 = 1e-9;

/// Immutable `(2r+1) × (2r+1)` stamp of normal-pdf samples, zeroed beyond
/// `4σ` and renormalized to sum to one.
///
/// Built once per configuration and shared read-only by every field.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianTemplate {
    sigma: f64,
    step_size: f64,
    radius: usize,
    values: Vec<f64>,
}

fn normal_pdf(x: f64, sigma: f64) -> f64 {
    (-(x * x) / (2.0 * sigma * sigma)).exp() / (sigma * (2.0 * PI).sqrt())
}

impl GaussianTemplate {
    #[must_use]
    pub fn new(sigma: f64, step_size: f64) -> Self {
        let cutoff = CUTOFF_SIGMAS * sigma;
        let radius = ceil_to_step(cutoff, step_size).max(0) as usize;
        let size = 2 * radius + 1;

        let mut values = vec![0.0; size * size];
        for i in 0..size {
            for j in 0..size {
                let di = i as f64 - radius as f64;
                let dj = j as f64 - radius as f64;
                let distance = di.hypot(dj) * step_size;
                if distance <= cutoff + CUTOFF_EPSILON {
                    values[i * size + j] = normal_pdf(distance, sigma);
                }
            }
        }

        let total: f64 = values.iter().sum();
        if total > 0.0 && total.is_finite() {
            for v in &mut values {
                *v /= total;
            }
        } else {
            // Degenerate sigma: everything lands on the center cell.
            values.iter_mut().for_each(|v| *v = 0.0);
            values[radius * size + radius] = 1.0;
        }

        Self {
            sigma,
            step_size,
            radius,
            values,
        }
    }

    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    #[must_use]
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Offset of the center cell in both directions.
    #[must_use]
    pub fn radius(&self) -> usize {
        self.radius
    }

    #[must_use]
    pub fn size(&self) -> usize {
        2 * self.radius + 1
    }

    #[inline]
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size() + j]
    }

    /// One kernel row (fixed `i`).
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        let size = self.size();
        &self.values[i * size..(i + 1) * size]
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}
