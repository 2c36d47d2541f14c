//! Expansion of one movement step into deposit sample points.

use crate::grid::Position;

/// Amount divisor used when the agent did not move and marks a single spot.
pub const STATIONARY_DIVISOR: f64 = 5.0;

/// Evenly spaced sample points along one travelled segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSampler {
    samples_per_step: usize,
    step_length: f64,
}

/// Result of sampling a step: where to deposit, and what to divide the
/// total amount by.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSamples {
    pub points: Vec<Position>,
    pub divisor: f64,
}

impl PathSamples {
    /// Amount attributed to each sample point.
    #[must_use]
    pub fn share(&self, amount: f64) -> f64 {
        amount / self.divisor
    }
}

impl PathSampler {
    #[must_use]
    pub fn new(samples_per_step: usize, step_length: f64) -> Self {
        Self {
            samples_per_step: samples_per_step.max(1),
            step_length,
        }
    }

    #[must_use]
    pub fn samples_per_step(&self) -> usize {
        self.samples_per_step
    }

    #[must_use]
    pub fn step_length(&self) -> f64 {
        self.step_length
    }

    /// Samples the segment starting at `start` (the previous position) along
    /// `direction` in radians. The first sample is one increment past
    /// `start`, the last one lands on the end of the step.
    ///
    /// Without a direction the agent stood still: one sample at `start`,
    /// divided by [`STATIONARY_DIVISOR`].
    #[must_use]
    pub fn sample(&self, start: Position, direction: Option<f64>) -> PathSamples {
        match direction {
            Some(angle) => {
                let increment = self.step_length / self.samples_per_step as f64;
                let points = (1..=self.samples_per_step)
                    .map(|k| start.offset(angle, increment * k as f64))
                    .collect();
                PathSamples {
                    points,
                    divisor: self.samples_per_step as f64,
                }
            }
            None => PathSamples {
                points: vec![start],
                divisor: STATIONARY_DIVISOR,
            },
        }
    }
}
