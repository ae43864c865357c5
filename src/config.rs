//! Engine and control configuration.
//!
//! [`BrkgaParams`] shapes the populations and operators and is fixed at
//! construction. [`ControlParams`] tells [`crate::BrkgaMpIpr::run`] when to
//! stop and how often to apply exchange, shaking, reset and path relinking.

use crate::bias::BiasFunction;
use crate::error::{BrkgaError, Result};
use std::fmt;
use std::time::Duration;

/// How intermediate chromosomes are built between two elites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathRelinkingType {
    /// Copy key blocks from the guide into the base at the same indices.
    #[default]
    Direct,
    /// Swap keys inside the base so that its derived permutation moves
    /// towards the guide's, one rank position at a time.
    Permutation,
}

/// Which elite pairs are relinked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathRelinkingSelection {
    /// Base is the best chromosome, guide a random other elite.
    #[default]
    BestSolution,
    /// Base and guide are two distinct random elites.
    RandomElite,
    /// Every ordered-by-rank elite pair, best pairs first.
    AllPairs,
}

/// Distance used to decide whether two elites are far enough apart.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceFunction {
    /// Fraction of genes that fall on different sides of `threshold`.
    Hamming { threshold: f64 },
    /// Normalized count of discordant pairs of the derived permutations.
    KendallTau,
}

impl Default for DistanceFunction {
    fn default() -> Self {
        DistanceFunction::Hamming { threshold: 0.5 }
    }
}

/// Perturbation applied to each shaken chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShakingType {
    /// Redraw the selected genes uniformly in `[0, 1)`.
    #[default]
    Change,
    /// Swap the selected genes with random partners.
    Swap,
}

/// Algorithm parameters for BRKGA-MP-IPR.
///
/// # Population layout
///
/// Each of the `num_independent_populations` populations holds
/// `population_size` chromosomes sorted best-first:
///
/// ```text
/// [ elite | crossover offspring | mutants ]
/// ```
///
/// `elite_size() + mutants_size() <= population_size`. An elite set that
/// fills the whole population is accepted and makes evolution a no-op.
///
/// # Examples
///
/// ```
/// use u_brkga::{BiasFunction, BrkgaParams};
///
/// let params = BrkgaParams::default()
///     .with_population_size(200)
///     .with_elite_percentage(0.15)
///     .with_mutants_percentage(0.10)
///     .with_parents(3, 1)
///     .with_bias(BiasFunction::Quadratic);
/// assert!(params.validate().is_ok());
/// assert_eq!(params.elite_size(), 30);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrkgaParams {
    /// Chromosomes per population.
    pub population_size: usize,

    /// Fraction of each population kept as elite.
    pub elite_percentage: f64,

    /// Fraction of each new generation made of fresh random chromosomes.
    pub mutants_percentage: f64,

    /// Parents drawn from the elite set for each mating.
    pub num_elite_parents: usize,

    /// Parents per mating (π).
    pub total_parents: usize,

    /// Rank weighting of parents during gene selection.
    pub bias_type: BiasFunction,

    /// Number of independent populations (islands).
    pub num_independent_populations: usize,

    /// Elite pairs tried per relinking call. 0 tries every pair.
    pub pr_number_pairs: usize,

    /// Minimum distance between base and guide, in `[0, 1]`.
    pub pr_minimum_distance: f64,

    /// Path construction.
    pub pr_type: PathRelinkingType,

    /// Elite pair selection.
    pub pr_selection: PathRelinkingSelection,

    /// Distance between candidate pairs.
    pub pr_distance_function: DistanceFunction,

    /// Genes moved together in one direct relinking step.
    pub alpha_block_size: usize,

    /// Fraction of the path between base and guide that is walked.
    pub pr_percentage: f64,

    /// Elites each population receives from every other during exchange.
    pub num_exchange_individuals: usize,

    /// Perturbation used by shaking.
    pub shaking_type: ShakingType,

    /// Smallest fraction of genes perturbed by one shake.
    pub shaking_intensity_lower_bound: f64,

    /// Largest fraction of genes perturbed by one shake.
    pub shaking_intensity_upper_bound: f64,

    /// Fraction of the non-elite members that are shaken.
    pub shaking_fraction: f64,

    /// Reinject the global best into population 0 after a reset.
    pub reset_keeps_best: bool,
}

impl Default for BrkgaParams {
    fn default() -> Self {
        Self {
            population_size: 100,
            elite_percentage: 0.20,
            mutants_percentage: 0.10,
            num_elite_parents: 1,
            total_parents: 2,
            bias_type: BiasFunction::default(),
            num_independent_populations: 1,
            pr_number_pairs: 0,
            pr_minimum_distance: 0.15,
            pr_type: PathRelinkingType::default(),
            pr_selection: PathRelinkingSelection::default(),
            pr_distance_function: DistanceFunction::default(),
            alpha_block_size: 1,
            pr_percentage: 1.0,
            num_exchange_individuals: 1,
            shaking_type: ShakingType::default(),
            shaking_intensity_lower_bound: 0.10,
            shaking_intensity_upper_bound: 0.30,
            shaking_fraction: 1.0,
            reset_keeps_best: true,
        }
    }
}

impl BrkgaParams {
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_elite_percentage(mut self, f: f64) -> Self {
        self.elite_percentage = f;
        self
    }

    pub fn with_mutants_percentage(mut self, f: f64) -> Self {
        self.mutants_percentage = f;
        self
    }

    /// Sets the total number of parents and how many of them are elite.
    pub fn with_parents(mut self, total: usize, elite: usize) -> Self {
        self.total_parents = total;
        self.num_elite_parents = elite;
        self
    }

    pub fn with_bias(mut self, bias: BiasFunction) -> Self {
        self.bias_type = bias;
        self
    }

    pub fn with_populations(mut self, n: usize) -> Self {
        self.num_independent_populations = n;
        self
    }

    pub fn with_path_relinking(
        mut self,
        pr_type: PathRelinkingType,
        selection: PathRelinkingSelection,
    ) -> Self {
        self.pr_type = pr_type;
        self.pr_selection = selection;
        self
    }

    pub fn with_distance(mut self, distance: DistanceFunction, minimum: f64) -> Self {
        self.pr_distance_function = distance;
        self.pr_minimum_distance = minimum;
        self
    }

    pub fn with_pr_number_pairs(mut self, n: usize) -> Self {
        self.pr_number_pairs = n;
        self
    }

    pub fn with_alpha_block_size(mut self, n: usize) -> Self {
        self.alpha_block_size = n;
        self
    }

    pub fn with_pr_percentage(mut self, f: f64) -> Self {
        self.pr_percentage = f;
        self
    }

    pub fn with_exchange_individuals(mut self, n: usize) -> Self {
        self.num_exchange_individuals = n;
        self
    }

    /// Sets the shaking perturbation and its intensity range.
    pub fn with_shaking(mut self, shaking_type: ShakingType, lower: f64, upper: f64) -> Self {
        self.shaking_type = shaking_type;
        self.shaking_intensity_lower_bound = lower;
        self.shaking_intensity_upper_bound = upper;
        self
    }

    pub fn with_shaking_fraction(mut self, f: f64) -> Self {
        self.shaking_fraction = f;
        self
    }

    pub fn with_reset_keeps_best(mut self, keep: bool) -> Self {
        self.reset_keeps_best = keep;
        self
    }

    /// Number of elite chromosomes per population.
    pub fn elite_size(&self) -> usize {
        ((self.population_size as f64 * self.elite_percentage).round() as usize)
            .min(self.population_size)
    }

    /// Number of mutants introduced per generation.
    pub fn mutants_size(&self) -> usize {
        (self.population_size as f64 * self.mutants_percentage).round() as usize
    }

    /// Validates the parameter combination.
    pub fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(BrkgaError::config("population_size must be at least 2"));
        }
        if !(0.0..=1.0).contains(&self.elite_percentage) {
            return Err(BrkgaError::config(format!(
                "elite_percentage ({}) must be in [0, 1]",
                self.elite_percentage
            )));
        }
        if !(0.0..=1.0).contains(&self.mutants_percentage) {
            return Err(BrkgaError::config(format!(
                "mutants_percentage ({}) must be in [0, 1]",
                self.mutants_percentage
            )));
        }
        let elite = self.elite_size();
        let mutants = self.mutants_size();
        if elite + mutants > self.population_size {
            return Err(BrkgaError::config(format!(
                "elite ({}) + mutants ({}) exceed population_size ({})",
                elite, mutants, self.population_size
            )));
        }
        if self.total_parents < 2 {
            return Err(BrkgaError::config("total_parents must be at least 2"));
        }
        if self.num_elite_parents == 0 || self.num_elite_parents > self.total_parents {
            return Err(BrkgaError::config(format!(
                "num_elite_parents ({}) must be in [1, total_parents ({})]",
                self.num_elite_parents, self.total_parents
            )));
        }
        self.bias_type.validate(self.total_parents)?;
        if self.num_independent_populations == 0 {
            return Err(BrkgaError::config(
                "num_independent_populations must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.pr_minimum_distance) {
            return Err(BrkgaError::config(format!(
                "pr_minimum_distance ({}) must be in [0, 1]",
                self.pr_minimum_distance
            )));
        }
        if let DistanceFunction::Hamming { threshold } = self.pr_distance_function {
            if !(threshold > 0.0 && threshold < 1.0) {
                return Err(BrkgaError::config(format!(
                    "hamming threshold ({}) must be in (0, 1)",
                    threshold
                )));
            }
        }
        if self.alpha_block_size == 0 {
            return Err(BrkgaError::config("alpha_block_size must be at least 1"));
        }
        if !(self.pr_percentage > 0.0 && self.pr_percentage <= 1.0) {
            return Err(BrkgaError::config(format!(
                "pr_percentage ({}) must be in (0, 1]",
                self.pr_percentage
            )));
        }
        if self.num_independent_populations > 1 {
            let incoming =
                self.num_exchange_individuals * (self.num_independent_populations - 1);
            if incoming > self.population_size - elite {
                return Err(BrkgaError::config(format!(
                    "exchange would overwrite elites: {} incoming > {} non-elite",
                    incoming,
                    self.population_size - elite
                )));
            }
        }
        let (lo, hi) = (
            self.shaking_intensity_lower_bound,
            self.shaking_intensity_upper_bound,
        );
        if !(lo > 0.0 && lo <= hi && hi <= 1.0) {
            return Err(BrkgaError::config(format!(
                "shaking intensity bounds ({}, {}) must satisfy 0 < lower <= upper <= 1",
                lo, hi
            )));
        }
        if !(0.0..=1.0).contains(&self.shaking_fraction) {
            return Err(BrkgaError::config(format!(
                "shaking_fraction ({}) must be in [0, 1]",
                self.shaking_fraction
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BrkgaParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "population_size {}", self.population_size)?;
        writeln!(f, "elite_percentage {}", self.elite_percentage)?;
        writeln!(f, "mutants_percentage {}", self.mutants_percentage)?;
        writeln!(f, "num_elite_parents {}", self.num_elite_parents)?;
        writeln!(f, "total_parents {}", self.total_parents)?;
        writeln!(f, "bias_type {}", self.bias_type)?;
        writeln!(
            f,
            "num_independent_populations {}",
            self.num_independent_populations
        )?;
        writeln!(f, "pr_number_pairs {}", self.pr_number_pairs)?;
        writeln!(f, "pr_minimum_distance {}", self.pr_minimum_distance)?;
        writeln!(f, "pr_type {:?}", self.pr_type)?;
        writeln!(f, "pr_selection {:?}", self.pr_selection)?;
        writeln!(f, "pr_distance_function {:?}", self.pr_distance_function)?;
        writeln!(f, "alpha_block_size {}", self.alpha_block_size)?;
        writeln!(f, "pr_percentage {}", self.pr_percentage)?;
        writeln!(f, "num_exchange_individuals {}", self.num_exchange_individuals)?;
        writeln!(f, "shaking_type {:?}", self.shaking_type)?;
        writeln!(
            f,
            "shaking_intensity_lower_bound {}",
            self.shaking_intensity_lower_bound
        )?;
        writeln!(
            f,
            "shaking_intensity_upper_bound {}",
            self.shaking_intensity_upper_bound
        )?;
        writeln!(f, "shaking_fraction {}", self.shaking_fraction)?;
        write!(f, "reset_keeps_best {}", self.reset_keeps_best)
    }
}

/// Run control: termination and operator intervals.
///
/// Intervals count stalled generations (generations without improvement
/// of the global best). An operator fires when the stall counter is a
/// positive multiple of its interval. An interval of 0 disables it.
///
/// The default disables every operator and never stops on its own: a
/// stopping predicate must be supplied to the engine.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_brkga::ControlParams;
///
/// let control = ControlParams::default()
///     .with_maximum_running_time(Duration::from_secs(30))
///     .with_ipr_interval(200)
///     .with_shake_interval(300)
///     .with_reset_interval(500)
///     .with_stall_offset(1000);
/// assert!(control.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlParams {
    /// Wall-clock budget for [`crate::BrkgaMpIpr::run`].
    pub maximum_running_time: Duration,

    /// Stalled generations between elite exchanges.
    pub exchange_interval: usize,

    /// Stalled generations between path relinking calls.
    pub ipr_interval: usize,

    /// Maximum intermediate points committed along one path.
    pub ipr_path_length: usize,

    /// Abandon a path after this many steps without improving on the
    /// path's best point. 0 walks the whole path.
    pub ipr_stall_cutoff: usize,

    /// Stalled generations between shakes.
    pub shake_interval: usize,

    /// Stalled generations between resets.
    pub reset_interval: usize,

    /// Stop once this many generations pass without improvement.
    /// 0 disables the check.
    pub stall_offset: usize,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            maximum_running_time: Duration::MAX,
            exchange_interval: 0,
            ipr_interval: 0,
            ipr_path_length: 100,
            ipr_stall_cutoff: 0,
            shake_interval: 0,
            reset_interval: 0,
            stall_offset: 0,
        }
    }
}

impl ControlParams {
    pub fn with_maximum_running_time(mut self, d: Duration) -> Self {
        self.maximum_running_time = d;
        self
    }

    pub fn with_exchange_interval(mut self, n: usize) -> Self {
        self.exchange_interval = n;
        self
    }

    pub fn with_ipr_interval(mut self, n: usize) -> Self {
        self.ipr_interval = n;
        self
    }

    pub fn with_ipr_path_length(mut self, n: usize) -> Self {
        self.ipr_path_length = n;
        self
    }

    pub fn with_ipr_stall_cutoff(mut self, n: usize) -> Self {
        self.ipr_stall_cutoff = n;
        self
    }

    pub fn with_shake_interval(mut self, n: usize) -> Self {
        self.shake_interval = n;
        self
    }

    pub fn with_reset_interval(mut self, n: usize) -> Self {
        self.reset_interval = n;
        self
    }

    pub fn with_stall_offset(mut self, n: usize) -> Self {
        self.stall_offset = n;
        self
    }

    /// Validates the control parameters.
    pub fn validate(&self) -> Result<()> {
        if self.maximum_running_time.is_zero() {
            return Err(BrkgaError::config("maximum_running_time must be positive"));
        }
        if self.ipr_interval > 0 && self.ipr_path_length == 0 {
            return Err(BrkgaError::config(
                "ipr_path_length must be at least 1 when path relinking is enabled",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ControlParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.maximum_running_time == Duration::MAX {
            writeln!(f, "maximum_running_time unlimited")?;
        } else {
            writeln!(f, "maximum_running_time {:?}", self.maximum_running_time)?;
        }
        writeln!(f, "exchange_interval {}", self.exchange_interval)?;
        writeln!(f, "ipr_interval {}", self.ipr_interval)?;
        writeln!(f, "ipr_path_length {}", self.ipr_path_length)?;
        writeln!(f, "ipr_stall_cutoff {}", self.ipr_stall_cutoff)?;
        writeln!(f, "shake_interval {}", self.shake_interval)?;
        writeln!(f, "reset_interval {}", self.reset_interval)?;
        write!(f, "stall_offset {}", self.stall_offset)
    }
}
