//! Pheromone concentration field: deposition, interpolated lookup and the
//! explicit decay-diffusion step.
//!
//! One field solves `∂c/∂t = D∇²c − kc` on a square lattice with a 5-point
//! stencil and an absorbing (zero) border. Cells outside the lattice are
//! never stored; reads there yield zero and writes there are dropped.

use crate::gaussian::GaussianTemplate;
use crate::grid::{GridMapper, GridPoint, Position};
use crate::path::PathSampler;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Decimal places kept in exported snapshots.
pub const SNAPSHOT_DECIMALS: i32 = 10;

/// How a deposit is spread over the lattice. Chosen once per configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepositMode {
    /// Whole share onto the closest lattice point.
    #[serde(alias = "nearest_grid_point")]
    Nearest,
    /// Share split over the four enclosing points by influence weight.
    #[serde(alias = "position")]
    Spread,
    /// Share stamped with the Gaussian template around each enclosing point.
    #[default]
    Gaussian,
}

impl DepositMode {
    pub const ALL: [DepositMode; 3] = [Self::Nearest, Self::Spread, Self::Gaussian];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Spread => "spread",
            Self::Gaussian => "gaussian",
        }
    }
}

impl fmt::Display for DepositMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepositMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" | "nearest_grid_point" => Ok(Self::Nearest),
            "spread" | "position" => Ok(Self::Spread),
            "gaussian" => Ok(Self::Gaussian),
            other => anyhow::bail!("Unknown pheromone deposit mode \"{other}\""),
        }
    }
}

/// Per-step multipliers of the explicit scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffusionCoefficients {
    /// `1 − Δt·k`
    pub decay: f64,
    /// `D·Δt / h²`
    pub spread: f64,
}

impl DiffusionCoefficients {
    #[must_use]
    pub fn new(decay_rate: f64, diffusion_constant: f64, delta_t: f64, step_size: f64) -> Self {
        Self {
            decay: 1.0 - delta_t * decay_rate,
            spread: diffusion_constant * delta_t / (step_size * step_size),
        }
    }

    /// `|decay − 4·spread| + 4·spread`; the scheme is stable (no growth, no
    /// oscillation) when this does not exceed one.
    #[must_use]
    pub fn amplification(&self) -> f64 {
        (self.decay - 4.0 * self.spread).abs() + 4.0 * self.spread
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.amplification() <= 1.0 + 1e-12
    }
}

/// Geometry and sampling shared by every field of one configuration.
#[derive(Debug, Clone)]
pub struct FieldContext {
    pub mapper: GridMapper,
    pub sampler: PathSampler,
    pub template: Arc<GaussianTemplate>,
    pub delta_t: f64,
}

impl FieldContext {
    #[must_use]
    pub fn new(
        mapper: GridMapper,
        sampler: PathSampler,
        template: Arc<GaussianTemplate>,
        delta_t: f64,
    ) -> Self {
        Self {
            mapper,
            sampler,
            template,
            delta_t,
        }
    }
}

/// Row-major copy of a field (`rows[x][y]`), rounded to
/// [`SNAPSHOT_DECIMALS`] places.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSnapshot(pub Vec<Vec<f64>>);

impl FieldSnapshot {
    #[must_use]
    pub fn side(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.iter().flatten().sum()
    }

    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.0.iter().flatten().copied().fold(0.0, f64::max)
    }
}

fn round_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let rounded = (value * scale).round() / scale;
    // Avoid exporting "-0.0" for tiny negative residue.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// One scalar concentration grid.
#[derive(Debug, Clone)]
pub struct PheromoneField {
    cells: Vec<f64>,
    back_buffer: Vec<f64>,
    context: FieldContext,
    decay_rate: f64,
    diffusion_constant: f64,
    coefficients: DiffusionCoefficients,
}

impl PheromoneField {
    /// Zero-initialized field.
    #[must_use]
    pub fn new(context: FieldContext, decay_rate: f64, diffusion_constant: f64) -> Self {
        let side = context.mapper.side();
        let coefficients = DiffusionCoefficients::new(
            decay_rate,
            diffusion_constant,
            context.delta_t,
            context.mapper.step_size(),
        );
        Self {
            cells: vec![0.0; side * side],
            back_buffer: vec![0.0; side * side],
            context,
            decay_rate,
            diffusion_constant,
            coefficients,
        }
    }

    /// Field seeded from an exported snapshot, e.g. to resume a run.
    pub fn from_snapshot(
        context: FieldContext,
        decay_rate: f64,
        diffusion_constant: f64,
        snapshot: &FieldSnapshot,
    ) -> anyhow::Result<Self> {
        let mut field = Self::new(context, decay_rate, diffusion_constant);
        let side = field.side();
        anyhow::ensure!(
            snapshot.side() == side,
            "Snapshot has {} rows, expected {}",
            snapshot.side(),
            side
        );
        for (x, row) in snapshot.0.iter().enumerate() {
            anyhow::ensure!(
                row.len() == side,
                "Snapshot row {} has {} columns, expected {}",
                x,
                row.len(),
                side
            );
            field.cells[x * side..(x + 1) * side].copy_from_slice(row);
        }
        Ok(field)
    }

    #[must_use]
    pub fn side(&self) -> usize {
        self.context.mapper.side()
    }

    #[must_use]
    pub fn mapper(&self) -> &GridMapper {
        &self.context.mapper
    }

    #[must_use]
    pub fn context(&self) -> &FieldContext {
        &self.context
    }

    #[must_use]
    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    #[must_use]
    pub fn diffusion_constant(&self) -> f64 {
        self.diffusion_constant
    }

    #[must_use]
    pub fn coefficients(&self) -> DiffusionCoefficients {
        self.coefficients
    }

    /// Raw cell storage, rows indexed by `x`.
    #[must_use]
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Concentration at a lattice point; zero outside the grid.
    #[inline]
    #[must_use]
    pub fn value(&self, point: GridPoint) -> f64 {
        self.context
            .mapper
            .linear_index(point)
            .map_or(0.0, |idx| self.cells[idx])
    }

    #[inline]
    fn add(&mut self, point: GridPoint, amount: f64) {
        if let Some(idx) = self.context.mapper.linear_index(point) {
            self.cells[idx] += amount;
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }

    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.cells.iter().copied().fold(0.0, f64::max)
    }

    /// Dispatches to the deposition routine selected by `mode`.
    pub fn deposit(
        &mut self,
        mode: DepositMode,
        start: Position,
        direction: Option<f64>,
        amount: f64,
    ) {
        match mode {
            DepositMode::Nearest => self.deposit_nearest(start, direction, amount),
            DepositMode::Spread => self.deposit_spread(start, direction, amount),
            DepositMode::Gaussian => self.deposit_gaussian(start, direction, amount),
        }
    }

    pub fn deposit_nearest(&mut self, start: Position, direction: Option<f64>, amount: f64) {
        let samples = self.context.sampler.sample(start, direction);
        let share = samples.share(amount);
        for position in samples.points {
            if !position.is_finite() {
                continue;
            }
            let mapper = self.context.mapper;
            let points = mapper.enclosing_points(position);
            let nearest = mapper.nearest_point(position, &points);
            self.add(nearest, share);
        }
    }

    pub fn deposit_spread(&mut self, start: Position, direction: Option<f64>, amount: f64) {
        let samples = self.context.sampler.sample(start, direction);
        let share = samples.share(amount);
        for position in samples.points {
            if !position.is_finite() {
                continue;
            }
            for wp in self.context.mapper.enclose(position) {
                self.add(wp.point, wp.weight * share);
            }
        }
    }

    pub fn deposit_gaussian(&mut self, start: Position, direction: Option<f64>, amount: f64) {
        let samples = self.context.sampler.sample(start, direction);
        let share = samples.share(amount);
        for position in samples.points {
            if !position.is_finite() {
                continue;
            }
            for wp in self.context.mapper.enclose(position) {
                self.stamp(wp.point, wp.weight * share);
            }
        }
    }

    /// Adds `amount × template` centered on `center`, clipped to the grid.
    fn stamp(&mut self, center: GridPoint, amount: f64) {
        let template = Arc::clone(&self.context.template);
        let radius = template.radius() as i64;
        let last = self.side() as i64 - 1;

        let origin_x = center.x.saturating_sub(radius);
        let origin_y = center.y.saturating_sub(radius);
        let x_start = origin_x.max(0);
        let y_start = origin_y.max(0);
        let x_end = center.x.saturating_add(radius).min(last);
        let y_end = center.y.saturating_add(radius).min(last);
        if x_start > x_end || y_start > y_end {
            return;
        }

        let side = self.side();
        let ky_start = (y_start - origin_y) as usize;
        let width = (y_end - y_start + 1) as usize;
        for gx in x_start..=x_end {
            let kernel_row = template.row((gx - origin_x) as usize);
            let base = gx as usize * side + y_start as usize;
            let target = &mut self.cells[base..base + width];
            for (cell, k) in target.iter_mut().zip(&kernel_row[ky_start..ky_start + width]) {
                *cell += amount * k;
            }
        }
    }

    /// Influence-weighted interpolation of the four enclosing lattice values.
    #[must_use]
    pub fn lookup(&self, position: Position) -> f64 {
        if !position.is_finite() {
            return 0.0;
        }
        self.context
            .mapper
            .enclose(position)
            .iter()
            .map(|wp| wp.weight * self.value(wp.point))
            .sum()
    }

    /// One explicit Euler step:
    /// `F' = (decay − 4·spread)·F + spread·(F[x±1] + F[y±1])`, with
    /// neighbours outside the grid read as zero.
    pub fn diffuse(&mut self) {
        let n = self.side();
        let DiffusionCoefficients { decay, spread } = self.coefficients;
        let center = decay - 4.0 * spread;
        let cells = &self.cells;

        for x in 0..n {
            let row = x * n;
            for y in 0..n {
                let up = if x > 0 { cells[row - n + y] } else { 0.0 };
                let down = if x + 1 < n { cells[row + n + y] } else { 0.0 };
                let left = if y > 0 { cells[row + y - 1] } else { 0.0 };
                let right = if y + 1 < n { cells[row + y + 1] } else { 0.0 };
                self.back_buffer[row + y] =
                    center * cells[row + y] + spread * (up + down + left + right);
            }
        }
        std::mem::swap(&mut self.cells, &mut self.back_buffer);
    }

    #[must_use]
    pub fn export_snapshot(&self) -> FieldSnapshot {
        FieldSnapshot(
            self.cells
                .chunks(self.side())
                .map(|row| {
                    row.iter()
                        .map(|v| round_decimals(*v, SNAPSHOT_DECIMALS))
                        .collect()
                })
                .collect(),
        )
    }
}
