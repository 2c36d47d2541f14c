//! The boundary between the field engine and whatever moves the agents.
//!
//! A [`Forager`] reads the fields while moving and hands back at most one
//! [`DepositRequest`] per tick; the run driver applies all requests after
//! every forager has moved.

use formica_core::config::AppConfig;
use formica_core::grid::Position;
use formica_core::system::{PheromoneSystem, Role};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, PI, TAU};

/// One tick's marking intent.
///
/// A forager that moved reports the segment's start and heading; one that
/// stood still reports its position and no direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositRequest {
    pub role: Role,
    pub start: Option<Position>,
    pub direction: Option<f64>,
    pub amount: f64,
}

/// Serializable forager state stored in step files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForagerRecord {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub role: Role,
    pub deposits: u32,
}

/// An agent driven by the run loop.
pub trait Forager: Send {
    /// Moves one tick. Only lookups are possible here.
    fn advance(&mut self, tick: u64, system: &PheromoneSystem);

    /// What to deposit for the move just made, if anything.
    fn deposit_request(&self) -> Option<DepositRequest>;

    fn record(&self) -> ForagerRecord;
}

/// Antenna offset from the body centre (mm).
const ANTENNA_DISTANCE: f64 = 2.1;
/// Antenna angle either side of the heading.
const ANTENNA_ANGLE: f64 = FRAC_PI_4;
/// Turn towards the stronger antenna per tick.
const STEER_ANGLE: f64 = 0.2;

/// Movement parameters shared by a colony of [`Wanderer`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct WandererParams {
    pub environment_size: f64,
    pub step_length: f64,
    pub turn_noise: f64,
    pub deposit_limit: u32,
    pub outbound_amount: f64,
    pub returning_amount: f64,
    pub nest: Position,
    pub nest_radius: f64,
}

impl WandererParams {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let sim = &config.simulation;
        Self {
            environment_size: config.grid.environment_size,
            step_length: config.deposit.step_length,
            turn_noise: sim.turn_noise,
            deposit_limit: sim.deposit_limit,
            outbound_amount: sim.outbound_amount,
            returning_amount: sim.returning_amount,
            nest: Position::new(sim.nest_x, sim.nest_y),
            nest_radius: sim.nest_radius,
        }
    }

    fn inside(&self, position: Position) -> bool {
        (0.0..=self.environment_size).contains(&position.x)
            && (0.0..=self.environment_size).contains(&position.y)
    }

    fn amount(&self, role: Role) -> f64 {
        match role {
            Role::Outbound => self.outbound_amount,
            Role::Returning => self.returning_amount,
        }
    }
}

/// A minimal demo forager: antenna-guided random walk that turns around and
/// switches role at the environment edge, and drops back to outbound on
/// reaching the nest.
#[derive(Debug, Clone)]
pub struct Wanderer {
    id: usize,
    position: Position,
    heading: f64,
    role: Role,
    deposits: u32,
    params: WandererParams,
    rng: ChaCha8Rng,
    pending: Option<DepositRequest>,
}

impl Wanderer {
    /// A wanderer at a random spot inside the nest with a random heading.
    #[must_use]
    pub fn new(id: usize, params: WandererParams, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let angle = rng.gen_range(0.0..TAU);
        let radius = params.nest_radius.max(0.0) * rng.gen::<f64>().sqrt();
        let position = params.nest.offset(angle, radius);
        let heading = rng.gen_range(0.0..TAU);
        Self {
            id,
            position,
            heading,
            role: Role::Outbound,
            deposits: 0,
            params,
            rng,
            pending: None,
        }
    }

    /// `config.simulation.foragers` wanderers seeded from `seed`.
    #[must_use]
    pub fn colony(config: &AppConfig, seed: u64) -> Vec<Box<dyn Forager>> {
        let params = WandererParams::from_config(config);
        (0..config.simulation.foragers)
            .map(|id| {
                let forager_seed = seed
                    .wrapping_mul(0x517C_C1B7_2722_0A95)
                    .wrapping_add(id as u64);
                Box::new(Wanderer::new(id, params.clone(), forager_seed)) as Box<dyn Forager>
            })
            .collect()
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn deposits(&self) -> u32 {
        self.deposits
    }

    fn steer(&mut self, system: &PheromoneSystem) {
        let left = system.lookup_for(
            self.role,
            self.position
                .offset(self.heading + ANTENNA_ANGLE, ANTENNA_DISTANCE),
        );
        let right = system.lookup_for(
            self.role,
            self.position
                .offset(self.heading - ANTENNA_ANGLE, ANTENNA_DISTANCE),
        );
        let bias = if left > right {
            STEER_ANGLE
        } else if right > left {
            -STEER_ANGLE
        } else {
            0.0
        };
        let noise = if self.params.turn_noise > 0.0 {
            self.rng
                .gen_range(-self.params.turn_noise..self.params.turn_noise)
        } else {
            0.0
        };
        self.heading = (self.heading + bias + noise).rem_euclid(TAU);
    }
}

impl Forager for Wanderer {
    fn advance(&mut self, _tick: u64, system: &PheromoneSystem) {
        self.steer(system);

        let start = self.position;
        let next = start.offset(self.heading, self.params.step_length);
        let request = if self.params.inside(next) {
            self.position = next;
            if self.role == Role::Returning
                && next.distance(&self.params.nest) <= self.params.nest_radius
            {
                self.role = Role::Outbound;
            }
            Some(DepositRequest {
                role: self.role,
                start: Some(start),
                direction: Some(self.heading),
                amount: self.params.amount(self.role),
            })
        } else {
            // Edge reached: stand still this tick, turn around and switch role.
            self.heading = (self.heading + PI).rem_euclid(TAU);
            self.role = self.role.opposite();
            Some(DepositRequest {
                role: self.role,
                start: Some(start),
                direction: None,
                amount: self.params.amount(self.role),
            })
        };

        self.pending = match request {
            Some(r) if self.deposits < self.params.deposit_limit => {
                if r.direction.is_some() {
                    self.deposits += 1;
                }
                Some(r)
            }
            _ => None,
        };
    }

    fn deposit_request(&self) -> Option<DepositRequest> {
        self.pending
    }

    fn record(&self) -> ForagerRecord {
        ForagerRecord {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            heading: self.heading,
            role: self.role,
            deposits: self.deposits,
        }
    }
}
