mod common;

use common::FieldBuilder;
use formica_core::gaussian::GaussianTemplate;
use formica_core::grid::{GridPoint, Position};
use formica_core::pheromone::DepositMode;

#[test]
fn test_mass_round_trip_nearest() {
    let mut field = FieldBuilder::new().build_field();
    field.deposit(
        DepositMode::Nearest,
        Position::new(20.3, 19.6),
        Some(0.5),
        3.0,
    );
    assert_mass!(field, 3.0);
}

#[test]
fn test_mass_round_trip_gaussian() {
    let mut field = FieldBuilder::new().build_field();
    field.deposit(
        DepositMode::Gaussian,
        Position::new(17.25, 18.8),
        Some(1.1),
        0.03,
    );
    assert_mass!(field, 0.03, 1e-12);
}

#[test]
fn test_mass_round_trip_spread() {
    let mut field = FieldBuilder::new().build_field();
    field.deposit(DepositMode::Spread, Position::new(10.5, 30.5), Some(-2.0), 7.0);
    assert_mass!(field, 7.0);
}

#[test]
fn test_empty_field_lookup_is_zero() {
    let field = FieldBuilder::new().build_field();
    let probes = [
        Position::new(0.0, 0.0),
        Position::new(20.5, 13.25),
        Position::new(40.0, 40.0),
        Position::new(-7.0, 12.0),
        Position::new(1e9, -1e9),
        Position::new(f64::NAN, 3.0),
    ];
    for p in probes {
        assert_eq!(field.lookup(p), 0.0, "lookup at {:?}", p);
    }
}

#[test]
fn test_pure_decay() {
    let mut field = FieldBuilder::new().with_rates(0.0, 0.01).build_field();
    field.deposit(DepositMode::Gaussian, Position::new(20.0, 20.0), Some(0.0), 2.0);
    let initial = field.total();
    let multiplier: f64 = 1.0 - 0.5 * 0.01;
    for n in 1..=10 {
        field.diffuse();
        assert_close!(field.total(), initial * multiplier.powi(n), 1e-12);
    }
}

#[test]
fn test_interior_diffusion_conserves_mass() {
    let mut field = FieldBuilder::new().with_rates(0.05, 0.0).build_field();
    field.deposit(DepositMode::Nearest, Position::new(20.0, 20.0), None, 5.0);
    for _ in 0..10 {
        field.diffuse();
        assert_mass!(field, 1.0, 1e-12);
    }
    assert!(field.value(GridPoint::new(20, 21)) > 0.0);
}

#[test]
fn test_mass_reaching_border_is_lost() {
    let mut field = FieldBuilder::new().with_rates(0.05, 0.0).build_field();
    field.deposit(DepositMode::Nearest, Position::new(0.0, 20.0), None, 5.0);
    field.diffuse();
    // One of the four neighbours of (0, 20) lies outside the grid.
    assert_mass!(field, 1.0 - 0.025, 1e-12);
}

#[test]
fn test_far_outside_positions_are_ignored() {
    let far = [
        Position::new(-500.0, 20.0),
        Position::new(20.0, 1e6),
        Position::new(1e300, -1e300),
        Position::new(f64::INFINITY, 0.0),
    ];
    for mode in DepositMode::ALL {
        let mut field = FieldBuilder::new().build_field();
        for p in far {
            field.deposit(mode, p, Some(0.3), 1.0);
            field.deposit(mode, p, None, 1.0);
            assert_eq!(field.lookup(p), 0.0);
        }
        assert_eq!(field.total(), 0.0, "mode {}", mode);
    }
}

#[test]
fn test_gaussian_kernel_is_normalized() {
    let template = GaussianTemplate::new(1.5, 1.0);
    assert_close!(template.sum(), 1.0, 1e-12);
    assert_eq!(template.size(), 2 * template.radius() + 1);
}

#[test]
fn test_stationary_nearest_deposit_end_to_end() {
    let mut field = FieldBuilder::new().with_environment(4.0, 1.0).build_field();
    assert_eq!(field.side(), 5);
    field.deposit(DepositMode::Nearest, Position::new(2.0, 2.0), None, 100.0);
    for x in 0..5 {
        for y in 0..5 {
            let expected = if (x, y) == (2, 2) { 20.0 } else { 0.0 };
            assert_eq!(field.value(GridPoint::new(x, y)), expected);
        }
    }
}

#[test]
fn test_half_step_grid() {
    let mut field = FieldBuilder::new().with_environment(10.0, 0.5).build_field();
    assert_eq!(field.side(), 21);
    field.deposit(DepositMode::Nearest, Position::new(5.0, 5.0), None, 5.0);
    assert_eq!(field.value(GridPoint::new(10, 10)), 1.0);
    // Lookup on a lattice point still blends in its three empty neighbours.
    let expected = 1.0 / (3.0 - std::f64::consts::FRAC_1_SQRT_2);
    assert_close!(field.lookup(Position::new(5.0, 5.0)), expected, 1e-12);
}
