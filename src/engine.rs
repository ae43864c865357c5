//! The BRKGA-MP-IPR control loop.
//!
//! [`BrkgaMpIpr`] owns the populations, the random generator and the run
//! status. [`run`](BrkgaMpIpr::run) drives generations until a stopping
//! condition holds:
//!
//! ```text
//! evolve all populations → update status
//!   → (stalled) path relinking → elite exchange → shaking → reset
//!   → progress callback → stopping check → ...
//! ```
//!
//! Operators fire when the stall counter is a positive multiple of their
//! interval in [`ControlParams`]. Stopping is only checked between
//! generations: a generation, once started, always completes.

use crate::config::{BrkgaParams, ControlParams, ShakingType};
use crate::decode::DecodePool;
use crate::error::{BrkgaError, Result};
use crate::evolution::Mating;
use crate::path_relink::Relinker;
use crate::population::Population;
use crate::shaking::{exchange_elite, shake_population};
use crate::status::{AlgorithmStatus, PathRelinkingResult, RunState};
use crate::stopping::StoppingCriteria;
use crate::types::{Chromosome, Decoder, Sense};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

type Observer<'a> = Box<dyn FnMut(&AlgorithmStatus) -> bool + 'a>;

/// Multi-parent BRKGA with implicit path relinking.
///
/// # Usage
///
/// ```
/// use u_brkga::{BrkgaMpIpr, BrkgaParams, ControlParams, Decoder, Sense};
///
/// struct SumOfSquares;
///
/// impl Decoder for SumOfSquares {
///     fn decode(&self, keys: &[f64]) -> anyhow::Result<f64> {
///         Ok(keys.iter().map(|k| k * k).sum())
///     }
/// }
///
/// let params = BrkgaParams::default().with_population_size(50);
/// let mut brkga = BrkgaMpIpr::new(&SumOfSquares, Sense::Minimize, 42, 10, params, 1)?;
/// brkga.set_stopping_criteria(|status| status.current_iteration == 20);
///
/// let status = brkga.run(&ControlParams::default())?;
/// assert_eq!(status.current_iteration, 20);
/// # Ok::<(), u_brkga::BrkgaError>(())
/// ```
pub struct BrkgaMpIpr<'a, D: Decoder> {
    decoder: &'a D,
    sense: Sense,
    chromosome_size: usize,
    params: BrkgaParams,
    mating: Mating,
    pool: DecodePool,
    rng: StdRng,
    populations: Vec<Population>,
    initial_population: Vec<Vec<f64>>,
    status: AlgorithmStatus,
    started: Instant,
    stopping_criteria: Option<StoppingCriteria<'a>>,
    observers: Vec<Observer<'a>>,
    stop_requested: bool,
}

impl<'a, D: Decoder> BrkgaMpIpr<'a, D> {
    /// Creates an engine for `decoder`.
    ///
    /// Populations are built lazily on the first call that needs them, so
    /// [`set_initial_population`](Self::set_initial_population) can still
    /// seed them.
    ///
    /// # Errors
    /// [`BrkgaError::Configuration`] if `params` are invalid, the
    /// chromosome is empty, or the decoder requires another length.
    pub fn new(
        decoder: &'a D,
        sense: Sense,
        seed: u64,
        chromosome_size: usize,
        params: BrkgaParams,
        num_threads: usize,
    ) -> Result<Self> {
        params.validate()?;
        if chromosome_size == 0 {
            return Err(BrkgaError::config("chromosome_size must be at least 1"));
        }
        if let Some(required) = decoder.chromosome_length() {
            if required != chromosome_size {
                return Err(BrkgaError::config(format!(
                    "decoder requires {} keys, engine configured for {}",
                    required, chromosome_size
                )));
            }
        }

        let pool = DecodePool::new(num_threads)?;
        let populations = params.num_independent_populations;
        Ok(Self {
            decoder,
            sense,
            chromosome_size,
            mating: Mating::new(&params),
            params,
            pool,
            rng: StdRng::seed_from_u64(seed),
            populations: Vec::with_capacity(populations),
            initial_population: Vec::new(),
            status: AlgorithmStatus::new(populations),
            started: Instant::now(),
            stopping_criteria: None,
            observers: Vec::new(),
            stop_requested: false,
        })
    }

    /// Sets the caller's stopping predicate. It is ORed with the built-in
    /// time and stall limits of [`ControlParams`].
    pub fn set_stopping_criteria(&mut self, criteria: impl FnMut(&AlgorithmStatus) -> bool + 'a) {
        self.stopping_criteria = Some(Box::new(criteria));
    }

    /// Registers a callback invoked whenever the global best improves.
    /// Returning `true` asks the run to stop at the next generation
    /// boundary.
    pub fn add_new_solution_observer(
        &mut self,
        observer: impl FnMut(&AlgorithmStatus) -> bool + 'a,
    ) {
        self.observers.push(Box::new(observer));
    }

    /// Seeds population 0 with known chromosomes; the remaining slots are
    /// drawn at random.
    ///
    /// # Errors
    /// [`BrkgaError::InvalidArgument`] if the populations are already
    /// built, there are more chromosomes than `population_size`, or a
    /// chromosome has the wrong length or a key outside `[0, 1)`.
    pub fn set_initial_population(&mut self, chromosomes: Vec<Vec<f64>>) -> Result<()> {
        if !self.populations.is_empty() {
            return Err(BrkgaError::invalid(
                "initial population must be set before the first generation",
            ));
        }
        if chromosomes.len() > self.params.population_size {
            return Err(BrkgaError::invalid(format!(
                "{} initial chromosomes exceed population_size {}",
                chromosomes.len(),
                self.params.population_size
            )));
        }
        for keys in &chromosomes {
            self.check_keys(keys)?;
        }
        self.initial_population = chromosomes;
        Ok(())
    }

    /// Builds and decodes the populations if that has not happened yet.
    pub fn initialize(&mut self) -> Result<()> {
        if !self.populations.is_empty() {
            return Ok(());
        }
        let size = self.params.population_size;
        let elite = self.params.elite_size();
        let mut populations = Vec::with_capacity(self.params.num_independent_populations);
        for k in 0..self.params.num_independent_populations {
            let seeded = if k == 0 {
                std::mem::take(&mut self.initial_population)
            } else {
                Vec::new()
            };
            populations.push(Population::initialize(
                seeded,
                size,
                self.chromosome_size,
                elite,
                self.sense,
                self.decoder,
                &self.pool,
                &mut self.rng,
            )?);
        }
        self.populations = populations;
        self.status.current_time = self.elapsed();
        self.record_best();
        tracing::debug!(
            populations = self.populations.len(),
            population_size = size,
            elite,
            best_fitness = self.status.best_fitness,
            "populations initialized"
        );
        Ok(())
    }

    /// Runs until a stopping condition holds and returns the final status.
    pub fn run(&mut self, control: &ControlParams) -> Result<AlgorithmStatus> {
        self.run_with_progress(control, |_| {})
    }

    /// Like [`run`](Self::run), calling `progress` once for the initial
    /// population and once after every generation.
    ///
    /// # Errors
    /// [`BrkgaError::Configuration`] for invalid `control`;
    /// [`BrkgaError::Decoder`] if the decoder fails, in which case
    /// [`status`](Self::status) still describes the last completed
    /// generation.
    pub fn run_with_progress<F>(
        &mut self,
        control: &ControlParams,
        mut progress: F,
    ) -> Result<AlgorithmStatus>
    where
        F: FnMut(&AlgorithmStatus),
    {
        control.validate()?;
        self.started = Instant::now();
        self.stop_requested = false;
        if let Err(err) = self.initialize() {
            self.status.state = RunState::Error;
            return Err(err);
        }
        self.status.state = RunState::Running;
        tracing::info!(
            sense = %self.sense,
            chromosome_size = self.chromosome_size,
            population_size = self.params.population_size,
            populations = self.params.num_independent_populations,
            threads = self.pool.num_threads(),
            "starting BRKGA-MP-IPR run"
        );
        progress(&self.status);

        loop {
            if let Some(state) = self.stop_reason(control) {
                self.status.state = state;
                break;
            }
            if let Err(err) = self.run_generation(control) {
                self.status.state = RunState::Error;
                tracing::error!(
                    iteration = self.status.current_iteration,
                    error = %err,
                    "run aborted"
                );
                return Err(err);
            }
            progress(&self.status);
        }

        self.status.current_time = self.elapsed();
        tracing::info!(
            state = ?self.status.state,
            iterations = self.status.current_iteration,
            best_fitness = self.status.best_fitness,
            "BRKGA-MP-IPR run finished"
        );
        Ok(self.status.clone())
    }

    /// Evolves every population for `generations` generations.
    pub fn evolve(&mut self, generations: usize) -> Result<()> {
        self.initialize()?;
        for _ in 0..generations {
            // All populations evolve before any is replaced, so a decoder
            // failure leaves the previous generation intact.
            let mut next = Vec::with_capacity(self.populations.len());
            for population in &self.populations {
                next.push(self.mating.next_generation(
                    population,
                    self.chromosome_size,
                    self.decoder,
                    &self.pool,
                    &mut self.rng,
                )?);
            }
            for (k, (population, members)) in self.populations.iter_mut().zip(next).enumerate() {
                if let Some(members) = members {
                    population.replace(members)?;
                }
                if self
                    .sense
                    .is_better(population.best_fitness(), self.status.population_best[k])
                {
                    self.status.population_stalled[k] = 0;
                } else {
                    self.status.population_stalled[k] += 1;
                }
            }

            self.status.current_iteration += 1;
            self.status.current_time = self.elapsed();
            if !self.record_best() {
                self.status.stalled_iterations += 1;
            }
            tracing::debug!(
                iteration = self.status.current_iteration,
                best_fitness = self.status.best_fitness,
                stalled = self.status.stalled_iterations,
                "generation complete"
            );
        }
        Ok(())
    }

    /// Relinks one elite pair in every population.
    ///
    /// # Errors
    /// [`BrkgaError::Configuration`] if `ipr_path_length` is zero.
    pub fn path_relink(&mut self, control: &ControlParams) -> Result<PathRelinkingResult> {
        control.validate()?;
        if control.ipr_path_length == 0 {
            return Err(BrkgaError::config("ipr_path_length must be at least 1"));
        }
        self.initialize()?;
        let relinker = Relinker::new(&self.params, control);
        let started = Instant::now();

        let mut outcome = PathRelinkingResult::TooHomogeneous;
        let mut best = self.status.best_fitness;
        for population in self.populations.iter_mut() {
            let result = relinker.relink_population(
                population,
                best,
                self.decoder,
                &self.pool,
                &mut self.rng,
            )?;
            if self.sense.is_better(population.best_fitness(), best) {
                best = population.best_fitness();
            }
            outcome = outcome.max(result);
        }

        self.status.path_relink_time += started.elapsed();
        self.status.num_path_relink_calls += 1;
        match outcome {
            PathRelinkingResult::TooHomogeneous => {
                self.status.num_homogenities += 1;
                tracing::warn!(
                    iteration = self.status.current_iteration,
                    "path relinking skipped: elite set too homogeneous"
                );
            }
            PathRelinkingResult::EliteImprovement => self.status.num_elite_improvements += 1,
            PathRelinkingResult::BestImprovement => self.status.num_best_improvements += 1,
            PathRelinkingResult::NoImprovement => {}
        }
        self.record_best();
        tracing::info!(
            iteration = self.status.current_iteration,
            result = ?outcome,
            "path relinking"
        );
        Ok(outcome)
    }

    /// Copies the best `count` members of each population into the others.
    ///
    /// # Errors
    /// [`BrkgaError::InvalidArgument`] if the immigrants would overwrite
    /// elite members.
    pub fn exchange_elite(&mut self, count: usize) -> Result<()> {
        self.initialize()?;
        let k = self.populations.len();
        if k < 2 || count == 0 {
            return Ok(());
        }
        let non_elite = self.params.population_size - self.params.elite_size();
        if count * (k - 1) > non_elite {
            return Err(BrkgaError::invalid(format!(
                "exchanging {} individuals from {} populations exceeds {} non-elite slots",
                count,
                k - 1,
                non_elite
            )));
        }
        exchange_elite(&mut self.populations, count);
        self.status.num_exchanges += 1;
        self.record_best();
        tracing::info!(
            iteration = self.status.current_iteration,
            count,
            "elite exchange"
        );
        Ok(())
    }

    /// Perturbs the non-elite members of one population, or of all of them
    /// when `population` is `None`.
    ///
    /// # Errors
    /// [`BrkgaError::InvalidArgument`] for an intensity outside `(0, 1]` or
    /// an unknown population index.
    pub fn shake(
        &mut self,
        intensity: f64,
        shaking_type: ShakingType,
        population: Option<usize>,
    ) -> Result<()> {
        if !(intensity > 0.0 && intensity <= 1.0) {
            return Err(BrkgaError::invalid(format!(
                "shaking intensity {} must be in (0, 1]",
                intensity
            )));
        }
        self.initialize()?;
        let targets = self.population_range(population)?;
        for k in targets {
            shake_population(
                &mut self.populations[k],
                intensity,
                shaking_type,
                self.params.shaking_fraction,
                self.decoder,
                &self.pool,
                &mut self.rng,
            )?;
            self.status.population_stalled[k] = 0;
        }
        self.status.num_shakes += 1;
        self.record_best();
        tracing::info!(
            iteration = self.status.current_iteration,
            intensity,
            shaking_type = ?shaking_type,
            "shaking"
        );
        Ok(())
    }

    /// Reinitializes every population with random chromosomes.
    ///
    /// The global best in [`status`](Self::status) is kept; with
    /// `reset_keeps_best` it is also put back into population 0.
    pub fn reset(&mut self) -> Result<()> {
        self.initialize()?;
        let size = self.params.population_size;
        let elite = self.params.elite_size();
        let mut fresh = Vec::with_capacity(self.populations.len());
        for _ in 0..self.populations.len() {
            fresh.push(Population::initialize(
                Vec::new(),
                size,
                self.chromosome_size,
                elite,
                self.sense,
                self.decoder,
                &self.pool,
                &mut self.rng,
            )?);
        }
        if self.params.reset_keeps_best && !self.status.best_chromosome.is_empty() {
            let best = Chromosome::new(
                self.status.best_chromosome.clone(),
                self.status.best_fitness,
            );
            fresh[0].set_member(size - 1, best);
        }
        self.populations = fresh;
        self.status.population_stalled.iter_mut().for_each(|s| *s = 0);
        self.status.num_resets += 1;
        self.record_best();
        tracing::info!(iteration = self.status.current_iteration, "populations reset");
        Ok(())
    }

    /// Replaces the member at rank `position` of `population` with `keys`,
    /// decodes it and re-sorts the population.
    pub fn inject_chromosome(
        &mut self,
        keys: Vec<f64>,
        population: usize,
        position: usize,
    ) -> Result<()> {
        self.check_keys(&keys)?;
        self.initialize()?;
        if population >= self.populations.len() {
            return Err(BrkgaError::invalid(format!(
                "population index {} out of range",
                population
            )));
        }
        if position >= self.params.population_size {
            return Err(BrkgaError::invalid(format!(
                "position {} out of range",
                position
            )));
        }
        let fitness = self.pool.evaluate(self.decoder, std::slice::from_ref(&keys))?;
        self.populations[population].set_member(position, Chromosome::new(keys, fitness[0]));
        self.record_best();
        Ok(())
    }

    /// The current run status.
    pub fn status(&self) -> &AlgorithmStatus {
        &self.status
    }

    /// Best fitness found so far (NaN before initialization).
    pub fn best_fitness(&self) -> f64 {
        self.status.best_fitness
    }

    /// Keys of the best chromosome found so far.
    pub fn best_chromosome(&self) -> &[f64] {
        &self.status.best_chromosome
    }

    /// Generations completed.
    pub fn current_iteration(&self) -> usize {
        self.status.current_iteration
    }

    /// Population `index`, if the populations are built.
    pub fn current_population(&self, index: usize) -> Option<&Population> {
        self.populations.get(index)
    }

    /// All populations (empty before initialization).
    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn params(&self) -> &BrkgaParams {
        &self.params
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn chromosome_size(&self) -> usize {
        self.chromosome_size
    }

    /// One generation of `run`: evolution, then stall-triggered operators.
    fn run_generation(&mut self, control: &ControlParams) -> Result<()> {
        self.evolve(1)?;

        let stalled = self.status.stalled_iterations;
        if stalled == 0 {
            return Ok(());
        }
        let due = |interval: usize| interval > 0 && stalled % interval == 0;

        if due(control.ipr_interval) {
            self.path_relink(control)?;
        }
        if due(control.exchange_interval) && self.populations.len() > 1 {
            self.exchange_elite(self.params.num_exchange_individuals)?;
        }
        if due(control.shake_interval) {
            let intensity = self.rng.random_range(
                self.params.shaking_intensity_lower_bound
                    ..=self.params.shaking_intensity_upper_bound,
            );
            self.shake(intensity, self.params.shaking_type, None)?;
        }
        if due(control.reset_interval) {
            self.reset()?;
        }
        self.status.current_time = self.elapsed();
        Ok(())
    }

    /// The terminal state the run should enter now, if any.
    fn stop_reason(&mut self, control: &ControlParams) -> Option<RunState> {
        let user = match self.stopping_criteria.as_mut() {
            Some(criteria) => criteria(&self.status),
            None => false,
        };
        if user || self.stop_requested {
            Some(RunState::UserStopped)
        } else if self.elapsed() >= control.maximum_running_time {
            Some(RunState::TimedOut)
        } else if control.stall_offset > 0 && self.status.stalled_iterations >= control.stall_offset
        {
            Some(RunState::Converged)
        } else {
            None
        }
    }

    /// Refreshes per-population bests and the global best. Returns `true`
    /// and notifies observers when the global best improved.
    fn record_best(&mut self) -> bool {
        let mut best: Option<&Chromosome> = None;
        for (k, population) in self.populations.iter().enumerate() {
            self.status.population_best[k] = population.best_fitness();
            let candidate = population.best();
            if best.map_or(true, |b| self.sense.is_better(candidate.fitness(), b.fitness())) {
                best = Some(candidate);
            }
        }
        let Some(best) = best else {
            return false;
        };
        if !self.sense.is_better(best.fitness(), self.status.best_fitness)
            && !self.status.best_chromosome.is_empty()
        {
            return false;
        }

        let now = self.elapsed();
        let status = &mut self.status;
        status.best_fitness = best.fitness();
        status.best_chromosome = best.keys().to_vec();
        status.largest_iteration_offset = status
            .largest_iteration_offset
            .max(status.current_iteration - status.last_update_iteration);
        status.last_update_iteration = status.current_iteration;
        status.last_update_time = now;
        status.stalled_iterations = 0;

        for observer in self.observers.iter_mut() {
            if observer(&self.status) {
                self.stop_requested = true;
            }
        }
        true
    }

    fn population_range(&self, population: Option<usize>) -> Result<std::ops::Range<usize>> {
        match population {
            None => Ok(0..self.populations.len()),
            Some(k) if k < self.populations.len() => Ok(k..k + 1),
            Some(k) => Err(BrkgaError::invalid(format!(
                "population index {} out of range",
                k
            ))),
        }
    }

    fn check_keys(&self, keys: &[f64]) -> Result<()> {
        if keys.len() != self.chromosome_size {
            return Err(BrkgaError::invalid(format!(
                "chromosome has {} keys, expected {}",
                keys.len(),
                self.chromosome_size
            )));
        }
        if let Some(k) = keys.iter().find(|k| !(0.0..1.0).contains(*k)) {
            return Err(BrkgaError::invalid(format!("key {} outside [0, 1)", k)));
        }
        Ok(())
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
