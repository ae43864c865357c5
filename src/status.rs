//! Run progress snapshots.

use std::fmt;
use std::time::Duration;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunState {
    /// Populations are built, no generation has run under `run`.
    #[default]
    Initialized,
    /// Generations are being produced.
    Running,
    /// Stopped after `stall_offset` generations without improvement.
    Converged,
    /// Stopped because `maximum_running_time` elapsed.
    TimedOut,
    /// Stopped by a caller predicate or a new-solution observer.
    UserStopped,
    /// A decoder failure aborted the run.
    Error,
}

impl RunState {
    /// Returns `true` for states that end a run.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Initialized | RunState::Running)
    }
}

/// Outcome of one path relinking call.
///
/// Variants are ordered from least to most useful, so the outcome over
/// several populations is their maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathRelinkingResult {
    /// No elite pair was far enough apart.
    TooHomogeneous,
    /// A path was walked but the population did not change for the better.
    NoImprovement,
    /// The path produced a chromosome better than the worst elite.
    EliteImprovement,
    /// The path produced a new global best.
    BestImprovement,
}

/// Snapshot of run progress.
///
/// Built by the engine between generations and handed to stopping
/// predicates, progress callbacks and new-solution observers. Time fields
/// are wall-clock; every other field is deterministic for a fixed seed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlgorithmStatus {
    /// Best fitness found so far over all populations.
    pub best_fitness: f64,

    /// Keys of the best chromosome found so far.
    pub best_chromosome: Vec<f64>,

    /// Generations completed (0 after initialization).
    pub current_iteration: usize,

    /// Generation at which the best fitness last improved.
    pub last_update_iteration: usize,

    /// Time since the run started.
    pub current_time: Duration,

    /// Time at which the best fitness last improved.
    pub last_update_time: Duration,

    /// Longest gap, in generations, between two improvements.
    pub largest_iteration_offset: usize,

    /// Generations since the best fitness last improved.
    pub stalled_iterations: usize,

    /// Best fitness of each population.
    pub population_best: Vec<f64>,

    /// Generations since each population's best last improved, cleared by
    /// shaking and reset.
    pub population_stalled: Vec<usize>,

    /// Time spent in path relinking.
    pub path_relink_time: Duration,

    /// Path relinking calls.
    pub num_path_relink_calls: usize,

    /// Path relinking calls that found no eligible elite pair.
    pub num_homogenities: usize,

    /// Path relinking calls that improved the global best.
    pub num_best_improvements: usize,

    /// Path relinking calls that improved an elite set.
    pub num_elite_improvements: usize,

    /// Elite exchanges performed.
    pub num_exchanges: usize,

    /// Shakes performed.
    pub num_shakes: usize,

    /// Resets performed.
    pub num_resets: usize,

    /// Lifecycle state.
    pub state: RunState,
}

impl AlgorithmStatus {
    pub(crate) fn new(populations: usize) -> Self {
        Self {
            best_fitness: f64::NAN,
            best_chromosome: Vec::new(),
            current_iteration: 0,
            last_update_iteration: 0,
            current_time: Duration::ZERO,
            last_update_time: Duration::ZERO,
            largest_iteration_offset: 0,
            stalled_iterations: 0,
            population_best: vec![f64::NAN; populations],
            population_stalled: vec![0; populations],
            path_relink_time: Duration::ZERO,
            num_path_relink_calls: 0,
            num_homogenities: 0,
            num_best_improvements: 0,
            num_elite_improvements: 0,
            num_exchanges: 0,
            num_shakes: 0,
            num_resets: 0,
            state: RunState::Initialized,
        }
    }

    /// Copy with every wall-clock field zeroed, for reproducibility checks.
    pub fn without_timing(&self) -> Self {
        Self {
            current_time: Duration::ZERO,
            last_update_time: Duration::ZERO,
            path_relink_time: Duration::ZERO,
            ..self.clone()
        }
    }
}

impl fmt::Display for AlgorithmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\nbest_fitness: {}\
             \ncurrent_iteration: {}\
             \nlast_update_iteration: {}\
             \ncurrent_time: {:.3}s\
             \nlast_update_time: {:.3}s\
             \nlargest_iteration_offset: {}\
             \nstalled_iterations: {}\
             \npath_relink_time: {:.3}s\
             \nnum_path_relink_calls: {}\
             \nnum_homogenities: {}\
             \nnum_best_improvements: {}\
             \nnum_elite_improvements: {}\
             \nnum_exchanges: {}\
             \nnum_shakes: {}\
             \nnum_resets: {}\
             \nstate: {:?}",
            self.best_fitness,
            self.current_iteration,
            self.last_update_iteration,
            self.current_time.as_secs_f64(),
            self.last_update_time.as_secs_f64(),
            self.largest_iteration_offset,
            self.stalled_iterations,
            self.path_relink_time.as_secs_f64(),
            self.num_path_relink_calls,
            self.num_homogenities,
            self.num_best_improvements,
            self.num_elite_improvements,
            self.num_exchanges,
            self.num_shakes,
            self.num_resets,
            self.state,
        )
    }
}
