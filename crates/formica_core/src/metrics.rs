//! Run metrics and structured logging.
//!
//! Tracks tick counts, field mass and per-phase timings so long runs can be
//! monitored from the log.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Ticks between periodic progress lines.
pub const LOG_EVERY_TICKS: u64 = 100;

/// Metrics collector for a single simulation run.
pub struct Metrics {
    tick_count: AtomicU64,
    forager_count: AtomicU64,
    deposit_count: AtomicU64,
    /// Total field mass after the last tick, stored as `f64` bits.
    total_mass: AtomicU64,
    phase_nanos: Mutex<HashMap<String, u64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            forager_count: AtomicU64::new(0),
            deposit_count: AtomicU64::new(0),
            total_mass: AtomicU64::new(0.0f64.to_bits()),
            phase_nanos: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick. Logs at info level every
    /// [`LOG_EVERY_TICKS`] ticks.
    pub fn record_tick(&self, duration: Duration, foragers: usize, total_mass: f64) {
        self.tick_count.fetch_add(1, Ordering::Relaxed);
        self.forager_count.store(foragers as u64, Ordering::Relaxed);
        self.total_mass.store(total_mass.to_bits(), Ordering::Relaxed);

        let tick = self.tick_count.load(Ordering::Relaxed);
        if tick % LOG_EVERY_TICKS == 0 {
            tracing::info!(
                tick = tick,
                foragers = foragers,
                deposits = self.deposit_count(),
                total_mass = total_mass,
                duration_us = duration.as_micros() as u64,
                "Simulation tick"
            );
        }
    }

    pub fn record_deposits(&self, count: u64) {
        self.deposit_count.fetch_add(count, Ordering::Relaxed);
    }

    /// Runs `f` and adds its wall time to the phase `name`.
    pub fn time_phase<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = f();
        let nanos = started.elapsed().as_nanos() as u64;
        let mut phases = self.phase_nanos.lock().unwrap_or_else(|e| e.into_inner());
        *phases.entry(name.to_string()).or_insert(0) += nanos;
        result
    }

    /// Accumulated wall time of a phase.
    #[must_use]
    pub fn phase_duration(&self, name: &str) -> Duration {
        let phases = self.phase_nanos.lock().unwrap_or_else(|e| e.into_inner());
        Duration::from_nanos(phases.get(name).copied().unwrap_or(0))
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn forager_count(&self) -> u64 {
        self.forager_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn deposit_count(&self) -> u64 {
        self.deposit_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_mass(&self) -> f64 {
        f64::from_bits(self.total_mass.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs the run totals and the time spent in each phase.
    pub fn log_summary(&self, run_name: &str) {
        let phases = self.phase_nanos.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<&String> = phases.keys().collect();
        names.sort();
        for name in names {
            tracing::debug!(
                run = run_name,
                phase = name.as_str(),
                millis = phases[name] / 1_000_000,
                "Phase timing"
            );
        }
        tracing::info!(
            run = run_name,
            ticks = self.tick_count(),
            deposits = self.deposit_count(),
            total_mass = self.total_mass(),
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Run finished"
        );
    }
}

/// Initialize tracing subscriber for logging. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}
