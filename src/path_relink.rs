//! Implicit path relinking between elite chromosomes.
//!
//! A path starts at a *base* elite and moves towards a *guide* elite in
//! key space. At every step each remaining move is tried, all candidates
//! are decoded as one batch, and the best candidate becomes the next point
//! of the path. Only intermediate points are visited: a move that would
//! reproduce the guide is never taken. The best point of the whole path may then replace the worst
//! non-elite member of the population.
//!
//! Because the path lives in key space, the same decoder serves both
//! evolution and relinking.
//!
//! # References
//!
//! - Andrade, Toso, Gonçalves & Resende (2021), "The Multi-Parent Biased
//!   Random-Key Genetic Algorithm with Implicit Path-Relinking and its
//!   real-world applications", *EJOR* 289(1), 17–30

use crate::config::{
    BrkgaParams, ControlParams, DistanceFunction, PathRelinkingSelection, PathRelinkingType,
};
use crate::decode::DecodePool;
use crate::error::Result;
use crate::population::Population;
use crate::status::PathRelinkingResult;
use crate::types::{permutation, Chromosome, Decoder, Sense};
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::Range;

impl DistanceFunction {
    /// Normalized distance in `[0, 1]` between two key vectors.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let n = a.len().min(b.len());
        if n == 0 {
            return 0.0;
        }
        match *self {
            DistanceFunction::Hamming { threshold } => {
                let differing = a
                    .iter()
                    .zip(b)
                    .filter(|&(&x, &y)| (x >= threshold) != (y >= threshold))
                    .count();
                differing as f64 / n as f64
            }
            DistanceFunction::KendallTau => {
                if n < 2 {
                    return 0.0;
                }
                let pa = permutation(&a[..n]);
                let pb = permutation(&b[..n]);
                let mut rank_b = vec![0usize; n];
                for (rank, &gene) in pb.iter().enumerate() {
                    rank_b[gene] = rank;
                }
                let mut discordant = 0usize;
                for i in 0..n {
                    for j in (i + 1)..n {
                        if rank_b[pa[i]] > rank_b[pa[j]] {
                            discordant += 1;
                        }
                    }
                }
                discordant as f64 / (n * (n - 1) / 2) as f64
            }
        }
    }
}

/// Relinking parameters gathered from [`BrkgaParams`] and [`ControlParams`].
#[derive(Debug, Clone)]
pub(crate) struct Relinker {
    pr_type: PathRelinkingType,
    selection: PathRelinkingSelection,
    distance: DistanceFunction,
    minimum_distance: f64,
    number_pairs: usize,
    block_size: usize,
    percentage: f64,
    path_length: usize,
    stall_cutoff: usize,
}

impl Relinker {
    pub(crate) fn new(params: &BrkgaParams, control: &ControlParams) -> Self {
        Self {
            pr_type: params.pr_type,
            selection: params.pr_selection,
            distance: params.pr_distance_function,
            minimum_distance: params.pr_minimum_distance,
            number_pairs: params.pr_number_pairs,
            block_size: params.alpha_block_size.max(1),
            percentage: params.pr_percentage,
            path_length: control.ipr_path_length,
            stall_cutoff: control.ipr_stall_cutoff,
        }
    }

    /// Relinks one elite pair of `population`.
    ///
    /// Elite members are never overwritten: the best point of the path
    /// replaces the worst member only when that member is non-elite and
    /// strictly worse.
    pub(crate) fn relink_population<D: Decoder, R: Rng>(
        &self,
        population: &mut Population,
        global_best: f64,
        decoder: &D,
        pool: &DecodePool,
        rng: &mut R,
    ) -> Result<PathRelinkingResult> {
        let pairs = select_pairs(population.elite_size(), self.selection, self.number_pairs, rng);
        let elites = population.elites();
        let pair = pairs.into_iter().find(|&(base, guide)| {
            let (b, g) = (elites[base].keys(), elites[guide].keys());
            b != g && self.distance.distance(b, g) >= self.minimum_distance
        });
        let Some((base, guide)) = pair else {
            return Ok(PathRelinkingResult::TooHomogeneous);
        };

        let base = elites[base].keys().to_vec();
        let guide = elites[guide].keys().to_vec();
        let sense = population.sense();
        let found = match self.pr_type {
            PathRelinkingType::Direct => self.direct_path(&base, &guide, sense, decoder, pool)?,
            PathRelinkingType::Permutation => {
                self.permutation_path(&base, &guide, sense, decoder, pool)?
            }
        };

        Ok(match found {
            Some(found) => place(population, found, global_best),
            None => PathRelinkingResult::NoImprovement,
        })
    }

    /// Number of steps to walk on a path with `moves` available moves.
    fn steps(&self, moves: usize) -> usize {
        let walked = (self.percentage * moves as f64).ceil() as usize;
        walked.min(moves).min(self.path_length)
    }

    /// Copies blocks of guide keys into the base at the same indices.
    fn direct_path<D: Decoder>(
        &self,
        base: &[f64],
        guide: &[f64],
        sense: Sense,
        decoder: &D,
        pool: &DecodePool,
    ) -> Result<Option<Chromosome>> {
        let n = base.len();
        let mut remaining: Vec<Range<usize>> = (0..n)
            .step_by(self.block_size)
            .map(|start| start..(start + self.block_size).min(n))
            .filter(|block| base[block.clone()] != guide[block.clone()])
            .collect();

        let steps = self.steps(remaining.len());
        let mut current = base.to_vec();
        let mut walk = PathBest::new(sense, self.stall_cutoff);

        for _ in 0..steps {
            // The last remaining block would turn the path into the guide.
            if remaining.len() < 2 {
                break;
            }
            let mut candidates: Vec<Vec<f64>> = remaining
                .iter()
                .map(|block| {
                    let mut keys = current.clone();
                    keys[block.clone()].copy_from_slice(&guide[block.clone()]);
                    keys
                })
                .collect();
            let fitness = pool.evaluate(decoder, &candidates)?;
            let pick = best_index(&fitness, sense);

            remaining.remove(pick);
            current = candidates.swap_remove(pick);
            if walk.record(&current, fitness[pick]) {
                break;
            }
        }
        Ok(walk.into_best())
    }

    /// Swaps keys inside the base so that, rank position by rank position,
    /// its derived permutation matches the guide's.
    fn permutation_path<D: Decoder>(
        &self,
        base: &[f64],
        guide: &[f64],
        sense: Sense,
        decoder: &D,
        pool: &DecodePool,
    ) -> Result<Option<Chromosome>> {
        let guide_perm = permutation(guide);
        let mut current = base.to_vec();
        let steps = self.steps(pending_swaps(&current, &guide_perm).len());
        let mut walk = PathBest::new(sense, self.stall_cutoff);

        for _ in 0..steps {
            let mut candidates: Vec<Vec<f64>> = pending_swaps(&current, &guide_perm)
                .into_iter()
                .map(|(a, b)| {
                    let mut keys = current.clone();
                    keys.swap(a, b);
                    keys
                })
                .filter(|keys| permutation(keys) != guide_perm)
                .collect();
            if candidates.is_empty() {
                break;
            }
            let fitness = pool.evaluate(decoder, &candidates)?;
            let pick = best_index(&fitness, sense);

            current = candidates.swap_remove(pick);
            if walk.record(&current, fitness[pick]) {
                break;
            }
        }
        Ok(walk.into_best())
    }
}

/// Key swaps `(current gene, guide gene)` for every rank position where the
/// two permutations disagree.
fn pending_swaps(current: &[f64], guide_perm: &[usize]) -> Vec<(usize, usize)> {
    permutation(current)
        .into_iter()
        .zip(guide_perm)
        .filter(|(a, b)| a != *b)
        .map(|(a, &b)| (a, b))
        .collect()
}

/// Tracks the best point of a path and the no-improvement cutoff.
struct PathBest {
    sense: Sense,
    cutoff: usize,
    since_improvement: usize,
    best: Option<Chromosome>,
}

impl PathBest {
    fn new(sense: Sense, cutoff: usize) -> Self {
        Self {
            sense,
            cutoff,
            since_improvement: 0,
            best: None,
        }
    }

    /// Records a committed point; returns `true` when the path should stop.
    fn record(&mut self, keys: &[f64], fitness: f64) -> bool {
        let improved = self
            .best
            .as_ref()
            .map_or(true, |b| self.sense.is_better(fitness, b.fitness));
        if improved {
            self.best = Some(Chromosome::new(keys.to_vec(), fitness));
            self.since_improvement = 0;
            false
        } else {
            self.since_improvement += 1;
            self.cutoff > 0 && self.since_improvement >= self.cutoff
        }
    }

    fn into_best(self) -> Option<Chromosome> {
        self.best
    }
}

/// Index of the best fitness; ties go to the lowest index.
fn best_index(fitness: &[f64], sense: Sense) -> usize {
    let mut best = 0;
    for (i, &f) in fitness.iter().enumerate().skip(1) {
        if sense.is_better(f, fitness[best]) {
            best = i;
        }
    }
    best
}

/// Elite pairs `(base, guide)` as indices into the elite set.
fn select_pairs<R: Rng>(
    elite_size: usize,
    selection: PathRelinkingSelection,
    number_pairs: usize,
    rng: &mut R,
) -> Vec<(usize, usize)> {
    if elite_size < 2 {
        return Vec::new();
    }
    let all_pairs = move || {
        (0..elite_size).flat_map(move |i| ((i + 1)..elite_size).map(move |j| (i, j)))
    };
    let mut pairs: Vec<(usize, usize)> = match selection {
        PathRelinkingSelection::BestSolution => {
            let mut guides: Vec<usize> = (1..elite_size).collect();
            guides.shuffle(rng);
            guides.into_iter().map(|g| (0, g)).collect()
        }
        PathRelinkingSelection::RandomElite => {
            let mut pairs: Vec<(usize, usize)> = all_pairs().collect();
            pairs.shuffle(rng);
            pairs
                .into_iter()
                .map(|(i, j)| if rng.random_bool(0.5) { (i, j) } else { (j, i) })
                .collect()
        }
        PathRelinkingSelection::AllPairs => all_pairs().collect(),
    };
    if number_pairs > 0 {
        pairs.truncate(number_pairs);
    }
    pairs
}

/// Puts the best path point over the worst non-elite member if it is
/// strictly better, and classifies the outcome.
fn place(population: &mut Population, found: Chromosome, global_best: f64) -> PathRelinkingResult {
    let sense = population.sense();
    let last = population.len() - 1;
    let elite = population.elite_size();
    if elite > last || !sense.is_better(found.fitness, population.members()[last].fitness) {
        return PathRelinkingResult::NoImprovement;
    }

    let result = if sense.is_better(found.fitness, global_best) {
        PathRelinkingResult::BestImprovement
    } else if elite > 0 && sense.is_better(found.fitness, population.elites()[elite - 1].fitness)
    {
        PathRelinkingResult::EliteImprovement
    } else {
        PathRelinkingResult::NoImprovement
    };
    population.set_member(last, found);
    result
}
