mod common;

use common::{temp_results_dir, FieldBuilder};
use formica_core::system::FieldLayout;
use formica_io::{read_json_file, read_step_file, ResultsLayout, SavedSettings};
use formica_lib::model::batch::BatchRunner;
use formica_lib::model::forager::{ForagerRecord, Wanderer};
use formica_lib::model::simulation::RunSummary;

fn small_run(results_dir: &str) -> FieldBuilder {
    let results_dir = results_dir.to_string();
    FieldBuilder::new().with_config(move |c| {
        c.simulation.foragers = 5;
        c.simulation.steps = 10;
        c.simulation.save_pheromones_every = 5;
        c.simulation.seed = Some(17);
        c.simulation.results_dir = results_dir;
    })
}

#[test]
fn test_run_writes_results_layout() {
    let root = temp_results_dir("run");
    let builder = small_run(&root.to_string_lossy());
    let config = builder.config();
    let foragers = Wanderer::colony(&config, 17);
    let summary = builder
        .build_simulation(foragers, "layout_check")
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(summary.steps, 10);
    assert_eq!(summary.steps_written, 11);
    assert_eq!(summary.steps_failed, 0);
    assert!(summary.deposits > 0);
    assert!(summary.mass_a.is_some_and(|m| m > 0.0));

    let layout = ResultsLayout::new(&root, "layout_check").unwrap();
    let settings: SavedSettings = read_json_file(layout.settings_path()).unwrap();
    assert_eq!(settings.fingerprint, config.fingerprint());

    let first = read_step_file::<ForagerRecord, _>(layout.step_path(0)).unwrap();
    assert_eq!(first.foragers.len(), 5);
    assert!(first.pheromones.is_some());
    let middle = read_step_file::<ForagerRecord, _>(layout.step_path(3)).unwrap();
    assert!(middle.pheromones.is_none());
    let fifth = read_step_file::<ForagerRecord, _>(layout.step_path(5)).unwrap();
    assert!(fifth.pheromones.is_some());

    let stored: RunSummary = read_json_file(layout.results_path()).unwrap();
    assert_eq!(stored.run_name, "layout_check");
    assert_eq!(stored.deposits, summary.deposits);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_same_seed_same_fields() {
    let root = temp_results_dir("determinism");
    let run = |name: &str| {
        let builder = small_run(&root.to_string_lossy());
        let config = builder.config();
        builder
            .build_simulation(Wanderer::colony(&config, 17), name)
            .unwrap()
            .run()
            .unwrap()
    };
    let a = run("first");
    let b = run("second");
    assert_eq!(a.deposits, b.deposits);
    assert_eq!(a.mass_a, b.mass_a);
    assert_eq!(a.mass_b, b.mass_b);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_batch_isolates_failures() {
    let root = temp_results_dir("batch");
    let base = small_run(&root.to_string_lossy()).config();
    let outcomes = BatchRunner::new("grp", base)
        .with_layouts(&[FieldLayout::Dual, FieldLayout::FoodOnly])
        .with_entry("unstable", |c| c.pheromone_a.diffusion_constant = 5.0)
        .repetitions(2)
        .max_concurrent(2)
        .run()
        .unwrap();

    assert_eq!(outcomes.len(), 6);
    for outcome in &outcomes {
        if outcome.entry == "unstable" {
            assert!(!outcome.is_ok());
            assert!(outcome
                .error
                .as_deref()
                .is_some_and(|e| e.contains("unstable")));
        } else {
            assert!(outcome.is_ok(), "{} failed: {:?}", outcome.run_name, outcome.error);
        }
    }

    let names: Vec<&str> = outcomes.iter().map(|o| o.run_name.as_str()).collect();
    assert!(names.contains(&"grp_dual_000"));
    assert!(names.contains(&"grp_food_only_001"));

    // Variants of one repetition share the forager seed.
    let seeds: Vec<u64> = outcomes
        .iter()
        .filter(|o| o.repetition == 1)
        .map(|o| o.seed)
        .collect();
    assert!(seeds.windows(2).all(|w| w[0] == w[1]));

    let food_only = outcomes
        .iter()
        .find(|o| o.run_name == "grp_food_only_000")
        .and_then(|o| o.summary.as_ref())
        .unwrap();
    assert!(food_only.mass_a.is_none());
    std::fs::remove_dir_all(&root).ok();
}
