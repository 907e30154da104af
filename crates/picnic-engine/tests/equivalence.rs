//! Integration test: a distributed run reproduces the single-node run.
//!
//! Every preset scenario is run on one node with [`LocalSimulation`] and
//! distributed over 1, 2, 4 and 16 emulated nodes. Particles (matched by
//! id) and owned cells must agree within `1e-10`.
//!
//! [`LocalSimulation`]: picnic_physics::LocalSimulation

use picnic_engine::ExchangeMetrics;
use picnic_test_utils::{init_tracing, presets, SimulationComparator};

const NODE_COUNTS: [usize; 4] = [1, 2, 4, 16];

fn check(scenario: &str, comparator: &SimulationComparator) -> ExchangeMetrics {
    let (report, run) = match comparator.compare() {
        Ok(out) => out,
        Err(e) => panic!("{scenario} on {} nodes failed: {e}", comparator.nodes),
    };
    assert!(
        report.is_match(),
        "{scenario} on {} nodes: {report}",
        comparator.nodes
    );
    assert_eq!(run.metrics.len(), comparator.nodes);
    let total = run.total_metrics();
    assert_eq!(total.steps as usize, comparator.nodes * comparator.settings.iterations);
    total
}

// ── Preset grid ─────────────────────────────────────────────────────

#[test]
fn every_preset_matches_on_every_node_count() {
    init_tracing();
    for scenario in presets(16, 20) {
        for nodes in NODE_COUNTS {
            let comparator = SimulationComparator::new(scenario.settings.clone(), nodes);
            check(scenario.name, &comparator);
        }
    }
}

#[test]
fn several_seeds_match_on_four_nodes() {
    init_tracing();
    for scenario in presets(8, 15).into_iter().take(3) {
        for seed in [1, 2, 3] {
            let comparator = SimulationComparator::new(scenario.settings.clone(), 4)
                .with_seed(seed)
                .with_particles(120);
            check(scenario.name, &comparator);
        }
    }
}

// ── Exchange accounting ─────────────────────────────────────────────

#[test]
fn every_sent_particle_is_received() {
    init_tracing();
    for scenario in presets(16, 25).into_iter().take(3) {
        let comparator = SimulationComparator::new(scenario.settings, 16).with_particles(400);
        let total = check(scenario.name, &comparator);
        assert!(total.particles_sent > 0, "{}: nothing migrated", scenario.name);
        assert_eq!(total.particles_sent, total.particles_received, "{}", scenario.name);
        assert!(total.ghost_particles_sent > 0);
        assert!(total.cells_sent > 0);
    }
}

#[test]
fn closed_boundaries_keep_every_particle() {
    init_tracing();
    for scenario in presets(16, 30) {
        if scenario.name.starts_with("absorbing") {
            continue;
        }
        let comparator = SimulationComparator::new(scenario.settings, 4).with_particles(150);
        let run = comparator.run_distributed().unwrap();
        assert_eq!(run.particles.len(), 150, "{}", scenario.name);
    }
}

#[test]
fn absorbing_walls_lose_particles_identically() {
    init_tracing();
    let scenario = presets(8, 100)
        .into_iter()
        .find(|s| s.name == "absorbing")
        .unwrap();
    let comparator = SimulationComparator::new(scenario.settings, 4).with_particles(100);
    let (local, _) = comparator.run_local().unwrap();
    assert!(local.len() < 100, "no particle reached an absorbing wall");
    check(scenario.name, &comparator);
}

#[test]
fn single_node_talks_to_itself_under_periodic_boundaries() {
    init_tracing();
    let scenario = presets(8, 40).remove(0);
    assert_eq!(scenario.name, "periodic");
    let comparator = SimulationComparator::new(scenario.settings, 1).with_particles(60);
    let total = check(scenario.name, &comparator);
    assert!(total.particles_sent > 0);
    assert!(total.cells_sent > 0);
}

#[test]
fn worker_pool_threads_do_not_change_the_result() {
    init_tracing();
    let mut settings = presets(16, 10).remove(0).settings;
    settings.threads = 3;
    let comparator = SimulationComparator::new(settings, 4);
    check("periodic with 3 pool threads", &comparator);
}
