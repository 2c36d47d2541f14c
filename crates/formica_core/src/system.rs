//! Routing of deposits and lookups to the pheromone fields by agent role.
//!
//! Outbound agents (searching for food) mark field A and follow field B;
//! returning agents (carrying food) mark field B and follow field A. Each
//! role senses the trail laid by the other one.

use crate::config::AppConfig;
use crate::grid::Position;
use crate::pheromone::{DepositMode, FieldContext, FieldSnapshot, PheromoneField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An agent's current travel intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Leaving the nest, looking for food.
    Outbound,
    /// Carrying food back to the nest.
    Returning,
}

impl Role {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Role::Outbound => Role::Returning,
            Role::Returning => Role::Outbound,
        }
    }
}

/// Which fields exist and how roles share them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldLayout {
    /// Independent fields A and B.
    #[default]
    Dual,
    /// Field A only, written and read by both roles.
    Shared,
    /// Field B only; outbound agents neither mark nor get sensed.
    FoodOnly,
}

impl FieldLayout {
    pub const ALL: [FieldLayout; 3] = [Self::Dual, Self::Shared, Self::FoodOnly];

    #[must_use]
    pub fn has_field_a(self) -> bool {
        !matches!(self, FieldLayout::FoodOnly)
    }

    #[must_use]
    pub fn has_field_b(self) -> bool {
        !matches!(self, FieldLayout::Shared)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dual => "dual",
            Self::Shared => "shared",
            Self::FoodOnly => "food_only",
        }
    }
}

impl fmt::Display for FieldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "dual" => Ok(Self::Dual),
            "shared" => Ok(Self::Shared),
            "food_only" => Ok(Self::FoodOnly),
            other => anyhow::bail!("Unknown field layout \"{other}\""),
        }
    }
}

/// Selects one of the owned fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    A,
    B,
}

/// Exported state of every owned field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pheromone_a: Option<FieldSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pheromone_b: Option<FieldSnapshot>,
}

impl SystemSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pheromone_a.is_none() && self.pheromone_b.is_none()
    }
}

/// Owns zero to two pheromone fields and routes agent calls to them.
#[derive(Debug, Clone)]
pub struct PheromoneSystem {
    layout: FieldLayout,
    pheromone_a: Option<PheromoneField>,
    pheromone_b: Option<PheromoneField>,
}

impl PheromoneSystem {
    /// Empty fields for `config`.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let context = config.field_context();
        let pheromone_a = config.layout.has_field_a().then(|| {
            PheromoneField::new(
                context.clone(),
                config.pheromone_a.effective_decay_rate(),
                config.pheromone_a.diffusion_constant,
            )
        });
        let pheromone_b = config.layout.has_field_b().then(|| {
            PheromoneField::new(
                context,
                config.pheromone_b.effective_decay_rate(),
                config.pheromone_b.diffusion_constant,
            )
        });
        Self {
            layout: config.layout,
            pheromone_a,
            pheromone_b,
        }
    }

    /// Fields restored from `snapshot`. Fields the layout has but the
    /// snapshot lacks start empty; snapshot fields the layout lacks are
    /// ignored.
    pub fn with_snapshots(config: &AppConfig, snapshot: &SystemSnapshot) -> anyhow::Result<Self> {
        let context = config.field_context();
        let build = |present: bool,
                     params: &crate::config::PheromoneParams,
                     seed: Option<&FieldSnapshot>,
                     context: FieldContext|
         -> anyhow::Result<Option<PheromoneField>> {
            if !present {
                return Ok(None);
            }
            let decay = params.effective_decay_rate();
            let field = match seed {
                Some(s) => PheromoneField::from_snapshot(context, decay, params.diffusion_constant, s)?,
                None => PheromoneField::new(context, decay, params.diffusion_constant),
            };
            Ok(Some(field))
        };

        if !config.layout.has_field_a() && snapshot.pheromone_a.is_some() {
            tracing::debug!("Ignoring pheromone_a snapshot for {:?} layout", config.layout);
        }
        if !config.layout.has_field_b() && snapshot.pheromone_b.is_some() {
            tracing::debug!("Ignoring pheromone_b snapshot for {:?} layout", config.layout);
        }

        Ok(Self {
            layout: config.layout,
            pheromone_a: build(
                config.layout.has_field_a(),
                &config.pheromone_a,
                snapshot.pheromone_a.as_ref(),
                context.clone(),
            )?,
            pheromone_b: build(
                config.layout.has_field_b(),
                &config.pheromone_b,
                snapshot.pheromone_b.as_ref(),
                context,
            )?,
        })
    }

    #[must_use]
    pub fn layout(&self) -> FieldLayout {
        self.layout
    }

    #[must_use]
    pub fn field_a(&self) -> Option<&PheromoneField> {
        self.pheromone_a.as_ref()
    }

    #[must_use]
    pub fn field_b(&self) -> Option<&PheromoneField> {
        self.pheromone_b.as_ref()
    }

    fn released_slot(&self, role: Role) -> Option<Slot> {
        match (self.layout, role) {
            (FieldLayout::Shared, _) => Some(Slot::A),
            (FieldLayout::FoodOnly, Role::Outbound) => None,
            (FieldLayout::Dual, Role::Outbound) => Some(Slot::A),
            (_, Role::Returning) => Some(Slot::B),
        }
    }

    fn watched_slot(&self, role: Role) -> Option<Slot> {
        match self.layout {
            FieldLayout::Shared => Some(Slot::A),
            _ => self.released_slot(role.opposite()),
        }
    }

    fn slot(&self, slot: Slot) -> Option<&PheromoneField> {
        match slot {
            Slot::A => self.pheromone_a.as_ref(),
            Slot::B => self.pheromone_b.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> Option<&mut PheromoneField> {
        match slot {
            Slot::A => self.pheromone_a.as_mut(),
            Slot::B => self.pheromone_b.as_mut(),
        }
    }

    /// The field an agent with `role` writes into.
    #[must_use]
    pub fn released_field(&self, role: Role) -> Option<&PheromoneField> {
        self.released_slot(role).and_then(|s| self.slot(s))
    }

    /// The field an agent with `role` senses.
    #[must_use]
    pub fn watched_field(&self, role: Role) -> Option<&PheromoneField> {
        self.watched_slot(role).and_then(|s| self.slot(s))
    }

    /// Marks the released field of `role` along the step that began at
    /// `start`. Without a start position or a direction the agent has no
    /// valid segment and nothing is deposited; non-finite start coordinates
    /// count as missing.
    ///
    /// Returns whether a field was written.
    pub fn deposit_for(
        &mut self,
        role: Role,
        start: Option<Position>,
        direction: Option<f64>,
        amount: f64,
        mode: DepositMode,
    ) -> bool {
        let (Some(start), Some(direction)) = (start, direction) else {
            return false;
        };
        if !start.is_finite() {
            return false;
        }
        match self.released_slot(role).and_then(|s| self.slot_mut(s)) {
            Some(field) => {
                field.deposit(mode, start, Some(direction), amount);
                true
            }
            None => false,
        }
    }

    /// Concentration sensed by `role` at `position`; zero when the watched
    /// field does not exist.
    #[must_use]
    pub fn lookup_for(&self, role: Role, position: Position) -> f64 {
        self.watched_field(role)
            .map_or(0.0, |field| field.lookup(position))
    }

    /// One diffusion step on every owned field.
    pub fn diffuse_all(&mut self) {
        if let Some(field) = self.pheromone_a.as_mut() {
            field.diffuse();
        }
        if let Some(field) = self.pheromone_b.as_mut() {
            field.diffuse();
        }
    }

    /// `substeps` consecutive diffusion steps.
    pub fn diffuse_substeps(&mut self, substeps: usize) {
        for _ in 0..substeps {
            self.diffuse_all();
        }
    }

    #[must_use]
    pub fn total_mass(&self) -> f64 {
        self.pheromone_a.as_ref().map_or(0.0, PheromoneField::total)
            + self.pheromone_b.as_ref().map_or(0.0, PheromoneField::total)
    }

    #[must_use]
    pub fn export_snapshots(&self) -> SystemSnapshot {
        SystemSnapshot {
            pheromone_a: self.pheromone_a.as_ref().map(PheromoneField::export_snapshot),
            pheromone_b: self.pheromone_b.as_ref().map(PheromoneField::export_snapshot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    fn config(layout: FieldLayout) -> AppConfig {
        AppConfig {
            layout,
            grid: GridConfig {
                environment_size: 40.0,
                step_size: 1.0,
            },
            ..Default::default()
        }
    }

    fn deposit(system: &mut PheromoneSystem, role: Role) -> bool {
        system.deposit_for(
            role,
            Some(Position::new(20.0, 20.0)),
            Some(0.0),
            1.0,
            DepositMode::Spread,
        )
    }

    #[test]
    fn test_dual_layout_routes_by_role() {
        let mut system = PheromoneSystem::new(&config(FieldLayout::Dual));
        deposit(&mut system, Role::Outbound);
        let a = system.field_a().map_or(0.0, PheromoneField::total);
        let b = system.field_b().map_or(0.0, PheromoneField::total);
        assert!((a - 1.0).abs() < 1e-12);
        assert_eq!(b, 0.0);

        let probe = Position::new(22.0, 20.0);
        // Outbound agents follow the returning trail, which is still empty.
        assert_eq!(system.lookup_for(Role::Outbound, probe), 0.0);
        assert!(system.lookup_for(Role::Returning, probe) > 0.0);
    }

    #[test]
    fn test_shared_layout_uses_single_field() {
        let mut system = PheromoneSystem::new(&config(FieldLayout::Shared));
        assert!(system.field_b().is_none());
        deposit(&mut system, Role::Returning);
        let probe = Position::new(22.0, 20.0);
        assert!(system.lookup_for(Role::Outbound, probe) > 0.0);
        assert!(system.lookup_for(Role::Returning, probe) > 0.0);
    }

    #[test]
    fn test_food_only_layout_ignores_outbound() {
        let mut system = PheromoneSystem::new(&config(FieldLayout::FoodOnly));
        assert!(system.field_a().is_none());
        assert!(!deposit(&mut system, Role::Outbound));
        assert_eq!(system.total_mass(), 0.0);

        assert!(deposit(&mut system, Role::Returning));
        let probe = Position::new(22.0, 20.0);
        assert!(system.lookup_for(Role::Outbound, probe) > 0.0);
        assert_eq!(system.lookup_for(Role::Returning, probe), 0.0);
    }

    #[test]
    fn test_missing_segment_is_noop() {
        let mut system = PheromoneSystem::new(&config(FieldLayout::Dual));
        assert!(!system.deposit_for(Role::Outbound, None, Some(0.0), 1.0, DepositMode::Nearest));
        assert!(!system.deposit_for(
            Role::Outbound,
            Some(Position::new(20.0, 20.0)),
            None,
            1.0,
            DepositMode::Nearest,
        ));
        assert!(!system.deposit_for(
            Role::Outbound,
            Some(Position::new(f64::NAN, 20.0)),
            Some(0.0),
            1.0,
            DepositMode::Nearest,
        ));
        assert_eq!(system.total_mass(), 0.0);
    }

    #[test]
    fn test_snapshot_restore_respects_layout() {
        let mut dual = PheromoneSystem::new(&config(FieldLayout::Dual));
        deposit(&mut dual, Role::Outbound);
        deposit(&mut dual, Role::Returning);
        let snapshot = dual.export_snapshots();

        let shared = PheromoneSystem::with_snapshots(&config(FieldLayout::Shared), &snapshot)
            .expect("restore shared");
        assert!(shared.field_b().is_none());
        assert!((shared.total_mass() - 1.0).abs() < 1e-8);

        let restored = PheromoneSystem::with_snapshots(&config(FieldLayout::Dual), &snapshot)
            .expect("restore dual");
        assert!((restored.total_mass() - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_layout_parsing() {
        for layout in FieldLayout::ALL {
            assert_eq!(layout.as_str().parse::<FieldLayout>().unwrap(), layout);
        }
        assert_eq!("Food-Only".parse::<FieldLayout>().unwrap(), FieldLayout::FoodOnly);
        let err = "triple".parse::<FieldLayout>().unwrap_err();
        assert!(err.to_string().contains("triple"));
    }

    #[test]
    fn test_snapshot_json_keys() {
        let system = PheromoneSystem::new(&config(FieldLayout::FoodOnly));
        let json = serde_json::to_string(&system.export_snapshots()).expect("serialize");
        assert!(json.contains("pheromone_b"));
        assert!(!json.contains("pheromone_a"));
    }
}
