//! End-to-end runs of the BRKGA-MP-IPR engine.

use proptest::prelude::*;
use u_brkga::{
    stopping, AlgorithmStatus, BiasFunction, BrkgaError, BrkgaMpIpr, BrkgaParams, ControlParams,
    Decoder, DistanceFunction, PathRelinkingSelection, PathRelinkingType, RunState, Sense,
    ShakingType,
};

// ---- Decoders ----

struct SumOfSquares;

impl Decoder for SumOfSquares {
    fn decode(&self, keys: &[f64]) -> anyhow::Result<f64> {
        Ok(keys.iter().map(|k| k * k).sum())
    }
}

/// Counts keys above 0.5; plateaus quickly so stall-driven operators fire.
struct OneMax;

impl Decoder for OneMax {
    fn decode(&self, keys: &[f64]) -> anyhow::Result<f64> {
        Ok(-(keys.iter().filter(|&&k| k > 0.5).count() as f64))
    }
}

/// Fails on any key below 0.5.
struct LowKeyRejecting;

impl Decoder for LowKeyRejecting {
    fn decode(&self, keys: &[f64]) -> anyhow::Result<f64> {
        if let Some(k) = keys.iter().find(|&&k| k < 0.5) {
            anyhow::bail!("key {} below 0.5", k);
        }
        Ok(keys.iter().sum())
    }
}

/// Tour length over points on a circle, keys decoded as a visiting order.
struct CircleTsp {
    points: Vec<(f64, f64)>,
}

impl CircleTsp {
    fn new(n: usize) -> Self {
        let points = (0..n)
            .map(|i| {
                let a = (i * 7 % n) as f64 / n as f64 * std::f64::consts::TAU;
                (a.cos(), a.sin())
            })
            .collect();
        Self { points }
    }
}

impl Decoder for CircleTsp {
    fn decode(&self, keys: &[f64]) -> anyhow::Result<f64> {
        let tour = u_brkga::permutation(keys);
        let dist = |a: usize, b: usize| {
            let (p, q) = (self.points[a], self.points[b]);
            ((p.0 - q.0).powi(2) + (p.1 - q.1).powi(2)).sqrt()
        };
        let mut length = dist(tour[tour.len() - 1], tour[0]);
        for w in tour.windows(2) {
            length += dist(w[0], w[1]);
        }
        Ok(length)
    }

    fn chromosome_length(&self) -> Option<usize> {
        Some(self.points.len())
    }
}

fn base_params() -> BrkgaParams {
    BrkgaParams::default()
        .with_population_size(100)
        .with_elite_percentage(0.2)
        .with_mutants_percentage(0.1)
        .with_parents(2, 1)
}

// ---- Scenarios ----

#[test]
fn test_fixed_iterations_scenario() {
    let mut brkga =
        BrkgaMpIpr::new(&SumOfSquares, Sense::Minimize, 42, 10, base_params(), 4).unwrap();
    brkga.set_stopping_criteria(|status| status.current_iteration == 50);

    let mut trace = Vec::new();
    let status = brkga
        .run_with_progress(&ControlParams::default(), |s| trace.push(s.best_fitness))
        .unwrap();

    assert_eq!(status.current_iteration, 50);
    assert_eq!(status.state, RunState::UserStopped);
    assert_eq!(trace.len(), 51);
    for w in trace.windows(2) {
        assert!(w[1] <= w[0], "best fitness got worse: {} -> {}", w[0], w[1]);
    }
    assert_eq!(status.best_fitness, *trace.last().unwrap());
}

#[test]
fn test_all_elite_population() {
    let params = BrkgaParams::default()
        .with_population_size(10)
        .with_elite_percentage(1.0)
        .with_mutants_percentage(0.0);
    let mut brkga = BrkgaMpIpr::new(&SumOfSquares, Sense::Minimize, 7, 5, params, 1).unwrap();
    brkga.initialize().unwrap();
    let before = brkga.populations()[0].members().to_vec();

    brkga.set_stopping_criteria(stopping::max_iterations(5));
    let status = brkga.run(&ControlParams::default()).unwrap();

    assert_eq!(status.current_iteration, 5);
    assert_eq!(brkga.populations()[0].members(), &before[..]);
}

#[test]
fn test_decoder_error_aborts_run() {
    let params = BrkgaParams::default()
        .with_population_size(20)
        .with_elite_percentage(0.2)
        .with_mutants_percentage(0.5);
    let mut brkga = BrkgaMpIpr::new(&LowKeyRejecting, Sense::Minimize, 42, 10, params, 2).unwrap();
    // Every seeded key is >= 0.5, so crossover never produces a failing
    // chromosome; only random mutants can.
    let seeded: Vec<Vec<f64>> = (0..20)
        .map(|i| (0..10).map(|j| 0.5 + ((i * 10 + j) % 50) as f64 / 100.0).collect())
        .collect();
    brkga.set_initial_population(seeded).unwrap();
    brkga.set_stopping_criteria(stopping::max_iterations(100));

    let err = brkga.run(&ControlParams::default()).unwrap_err();
    assert!(matches!(err, BrkgaError::Decoder { .. }));
    assert_eq!(brkga.status().state, RunState::Error);
    assert_eq!(brkga.status().current_iteration, 0);
    assert_eq!(brkga.populations()[0].len(), 20);
}

#[test]
fn test_reproducible_across_thread_counts() {
    let trace = |threads: usize| {
        let params = base_params()
            .with_populations(2)
            .with_bias(BiasFunction::Quadratic)
            .with_parents(3, 2);
        let mut brkga = BrkgaMpIpr::new(&OneMax, Sense::Minimize, 42, 12, params, threads).unwrap();
        brkga.set_stopping_criteria(stopping::max_iterations(25));
        let control = ControlParams::default()
            .with_ipr_interval(3)
            .with_exchange_interval(2)
            .with_shake_interval(4)
            .with_reset_interval(9);
        let mut statuses: Vec<AlgorithmStatus> = Vec::new();
        brkga
            .run_with_progress(&control, |s| statuses.push(s.without_timing()))
            .unwrap();
        statuses
    };

    let a = trace(1);
    let b = trace(4);
    assert_eq!(a.len(), 26);
    assert_eq!(a, b);
}

#[test]
fn test_stall_driven_operators() {
    let params = base_params()
        .with_populations(3)
        .with_exchange_individuals(2)
        .with_path_relinking(PathRelinkingType::Direct, PathRelinkingSelection::RandomElite)
        .with_distance(DistanceFunction::Hamming { threshold: 0.5 }, 0.0)
        .with_shaking(ShakingType::Swap, 0.1, 0.4);
    let mut brkga = BrkgaMpIpr::new(&OneMax, Sense::Minimize, 3, 10, params, 2).unwrap();
    brkga.set_stopping_criteria(stopping::max_iterations(40));
    let control = ControlParams::default()
        .with_ipr_interval(1)
        .with_ipr_path_length(5)
        .with_exchange_interval(1)
        .with_shake_interval(2)
        .with_reset_interval(5);

    let mut bests = Vec::new();
    let status = brkga
        .run_with_progress(&control, |s| {
            bests.push(s.best_fitness);
            assert_eq!(s.population_best.len(), 3);
        })
        .unwrap();

    assert!(status.num_path_relink_calls > 0);
    assert!(status.num_exchanges > 0);
    assert!(status.num_shakes > 0);
    assert!(status.num_resets > 0);
    for w in bests.windows(2) {
        assert!(w[1] <= w[0], "global best is never lost");
    }
    for population in brkga.populations() {
        assert_eq!(population.len(), 100);
    }
}

#[test]
fn test_all_pairs_relinking_in_run() {
    let params = base_params()
        .with_path_relinking(PathRelinkingType::Direct, PathRelinkingSelection::AllPairs)
        .with_pr_number_pairs(3)
        .with_alpha_block_size(2)
        .with_pr_percentage(0.5);
    let mut brkga = BrkgaMpIpr::new(&OneMax, Sense::Minimize, 8, 12, params, 2).unwrap();
    brkga.set_stopping_criteria(stopping::max_iterations(30));
    let control = ControlParams::default()
        .with_ipr_interval(2)
        .with_ipr_path_length(4);

    let mut bests = Vec::new();
    let status = brkga
        .run_with_progress(&control, |s| bests.push(s.best_fitness))
        .unwrap();

    assert_eq!(status.current_iteration, 30);
    assert!(status.num_path_relink_calls > 0);
    assert!(
        status.num_homogenities + status.num_best_improvements + status.num_elite_improvements
            <= status.num_path_relink_calls
    );
    for w in bests.windows(2) {
        assert!(w[1] <= w[0]);
    }
}

#[test]
fn test_stop_checked_every_generation() {
    let mut brkga =
        BrkgaMpIpr::new(&SumOfSquares, Sense::Minimize, 5, 6, base_params(), 1).unwrap();
    brkga.set_stopping_criteria(stopping::either(
        stopping::max_iterations(7),
        stopping::target_fitness(Sense::Minimize, -1.0),
    ));
    let status = brkga.run(&ControlParams::default()).unwrap();
    assert_eq!(status.current_iteration, 7);
}

#[test]
fn test_maximize() {
    struct KeySum;
    impl Decoder for KeySum {
        fn decode(&self, keys: &[f64]) -> anyhow::Result<f64> {
            Ok(keys.iter().sum())
        }
    }

    let mut brkga = BrkgaMpIpr::new(&KeySum, Sense::Maximize, 1, 8, base_params(), 2).unwrap();
    brkga.set_stopping_criteria(stopping::max_iterations(30));
    let mut trace = Vec::new();
    let status = brkga
        .run_with_progress(&ControlParams::default(), |s| trace.push(s.best_fitness))
        .unwrap();
    for w in trace.windows(2) {
        assert!(w[1] >= w[0]);
    }
    assert!(status.best_fitness > 6.0, "got {}", status.best_fitness);
}

#[test]
fn test_tsp_with_permutation_relinking() {
    let decoder = CircleTsp::new(12);
    let params = base_params()
        .with_population_size(60)
        .with_parents(3, 2)
        .with_path_relinking(
            PathRelinkingType::Permutation,
            PathRelinkingSelection::BestSolution,
        )
        .with_distance(DistanceFunction::KendallTau, 0.05);
    let mut brkga = BrkgaMpIpr::new(&decoder, Sense::Minimize, 42, 12, params, 2).unwrap();
    brkga.set_stopping_criteria(stopping::max_iterations(150));
    let control = ControlParams::default()
        .with_ipr_interval(10)
        .with_ipr_path_length(20)
        .with_ipr_stall_cutoff(5);

    let status = brkga.run(&control).unwrap();
    let perimeter = 12.0 * 2.0 * (std::f64::consts::PI / 12.0).sin();
    assert!(status.best_fitness >= perimeter - 1e-9);
    assert!(
        status.best_fitness < 1.8 * perimeter,
        "tour {} vs optimum {}",
        status.best_fitness,
        perimeter
    );
    assert_eq!(status.best_chromosome.len(), 12);
}

#[test]
fn test_invalid_control_rejected() {
    let mut brkga =
        BrkgaMpIpr::new(&SumOfSquares, Sense::Minimize, 5, 6, base_params(), 1).unwrap();
    let control = ControlParams::default()
        .with_ipr_interval(5)
        .with_ipr_path_length(0);
    assert!(matches!(
        brkga.run(&control),
        Err(BrkgaError::Configuration(_))
    ));
}

// ---- Invariants ----

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_population_invariants(
        seed in any::<u64>(),
        size in 4usize..40,
        elite in 0.25f64..0.6,
        parents in 2usize..5,
        genes in 1usize..12,
        generations in 1usize..8,
    ) {
        let params = BrkgaParams::default()
            .with_population_size(size)
            .with_elite_percentage(elite)
            .with_mutants_percentage(0.1)
            .with_parents(parents, 1);
        let mut brkga = BrkgaMpIpr::new(&SumOfSquares, Sense::Minimize, seed, genes, params, 1).unwrap();
        brkga.initialize().unwrap();
        let mut best = brkga.populations()[0].best_fitness();

        for _ in 0..generations {
            brkga.evolve(1).unwrap();
            let population = &brkga.populations()[0];
            prop_assert_eq!(population.len(), size);
            prop_assert!(population.best_fitness() <= best);
            best = population.best_fitness();
            for chromosome in population.members() {
                prop_assert_eq!(chromosome.len(), genes);
                prop_assert!(chromosome.keys().iter().all(|k| (0.0..1.0).contains(k)));
            }
        }
    }
}
