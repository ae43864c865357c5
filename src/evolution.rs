//! One generation of multi-parent biased crossover.
//!
//! The next generation is laid out as `[elites | offspring | mutants]`:
//!
//! 1. **Elite copy**: the elite set is carried forward unchanged.
//! 2. **Mating**: each offspring draws `total_parents` parents with
//!    replacement, `num_elite_parents` of them from the elite set and the
//!    rest from the non-elite set. Parents are ranked by fitness and every
//!    gene is taken from one parent, chosen by roulette over the bias
//!    function of its rank.
//! 3. **Mutants**: fresh random chromosomes.
//!
//! Only offspring and mutants are decoded.

use crate::bias::BiasFunction;
use crate::config::BrkgaParams;
use crate::decode::DecodePool;
use crate::error::Result;
use crate::population::{random_keys, Population};
use crate::types::{Chromosome, Decoder, Sense};
use rand::Rng;

/// Precomputed mating parameters shared by all populations.
#[derive(Debug, Clone)]
pub(crate) struct Mating {
    total_parents: usize,
    num_elite_parents: usize,
    mutants: usize,
    cumulative_bias: Vec<f64>,
}

impl Mating {
    pub(crate) fn new(params: &BrkgaParams) -> Self {
        Self::with_bias(
            params.total_parents,
            params.num_elite_parents,
            params.mutants_size(),
            &params.bias_type,
        )
    }

    fn with_bias(
        total_parents: usize,
        num_elite_parents: usize,
        mutants: usize,
        bias: &BiasFunction,
    ) -> Self {
        Self {
            total_parents,
            num_elite_parents,
            mutants,
            cumulative_bias: bias.cumulative_weights(total_parents),
        }
    }

    /// Produces the next generation of `population`, or `None` when every
    /// member is elite and there is nothing to recombine.
    ///
    /// The current population is not modified; on a decoder failure no
    /// partial generation escapes.
    pub(crate) fn next_generation<D: Decoder, R: Rng>(
        &self,
        population: &Population,
        chromosome_size: usize,
        decoder: &D,
        pool: &DecodePool,
        rng: &mut R,
    ) -> Result<Option<Vec<Chromosome>>> {
        let size = population.len();
        let elite = population.elite_size();
        if elite >= size {
            return Ok(None);
        }
        let mutants = self.mutants.min(size - elite);
        let offspring = size - elite - mutants;

        let mut batch: Vec<Vec<f64>> = Vec::with_capacity(size - elite);
        for _ in 0..offspring {
            batch.push(self.mate(population, chromosome_size, rng));
        }
        for _ in 0..mutants {
            batch.push(random_keys(chromosome_size, rng));
        }

        let decoded = pool.decode_all(decoder, batch)?;
        let mut next = Vec::with_capacity(size);
        next.extend_from_slice(population.elites());
        next.extend(decoded);
        Ok(Some(next))
    }

    /// Builds one offspring from parents drawn out of `population`.
    fn mate<R: Rng>(&self, population: &Population, chromosome_size: usize, rng: &mut R) -> Vec<f64> {
        let elites = population.elites();
        let non_elites = population.non_elites();

        let from_elite = if elites.is_empty() {
            0
        } else if non_elites.is_empty() {
            self.total_parents
        } else {
            self.num_elite_parents
        };

        let mut parents: Vec<&Chromosome> = Vec::with_capacity(self.total_parents);
        for _ in 0..from_elite {
            parents.push(&elites[rng.random_range(0..elites.len())]);
        }
        for _ in from_elite..self.total_parents {
            parents.push(&non_elites[rng.random_range(0..non_elites.len())]);
        }

        inherit(&mut parents, population.sense(), &self.cumulative_bias, chromosome_size, rng)
    }
}

/// Ranks `parents` and picks every gene from one of them by biased roulette.
pub(crate) fn inherit<R: Rng>(
    parents: &mut [&Chromosome],
    sense: Sense,
    cumulative_bias: &[f64],
    chromosome_size: usize,
    rng: &mut R,
) -> Vec<f64> {
    parents.sort_by(|a, b| sense.compare(a.fitness, b.fitness));
    (0..chromosome_size)
        .map(|gene| parents[spin(cumulative_bias, rng)].keys[gene])
        .collect()
}

/// Roulette over cumulative weights; returns a 0-based rank.
fn spin<R: Rng>(cumulative: &[f64], rng: &mut R) -> usize {
    let total = cumulative[cumulative.len() - 1];
    let x = rng.random_range(0.0..total);
    cumulative
        .iter()
        .position(|&c| x < c)
        .unwrap_or(cumulative.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct SumDecoder;

    impl Decoder for SumDecoder {
        fn decode(&self, keys: &[f64]) -> anyhow::Result<f64> {
            Ok(keys.iter().sum())
        }
    }

    fn population(size: usize, elite: usize, rng: &mut StdRng) -> Population {
        let pool = DecodePool::new(1).unwrap();
        Population::initialize(Vec::new(), size, 8, elite, Sense::Minimize, &SumDecoder, &pool, rng)
            .unwrap()
    }

    #[test]
    fn test_elites_carried_forward() {
        let mut rng = StdRng::seed_from_u64(42);
        let pop = population(20, 4, &mut rng);
        let params = BrkgaParams::default()
            .with_population_size(20)
            .with_elite_percentage(0.2)
            .with_mutants_percentage(0.1);
        let mating = Mating::new(&params);
        let pool = DecodePool::new(1).unwrap();

        let next = mating
            .next_generation(&pop, 8, &SumDecoder, &pool, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(next.len(), 20);
        assert_eq!(&next[..4], pop.elites());
        assert!(next
            .iter()
            .all(|c| c.keys().iter().all(|k| (0.0..1.0).contains(k))));
    }

    #[test]
    fn test_all_elite_is_noop() {
        let mut rng = StdRng::seed_from_u64(1);
        let pop = population(10, 10, &mut rng);
        let params = BrkgaParams::default()
            .with_population_size(10)
            .with_elite_percentage(1.0)
            .with_mutants_percentage(0.0);
        let pool = DecodePool::new(1).unwrap();
        let next = Mating::new(&params)
            .next_generation(&pop, 8, &SumDecoder, &pool, &mut rng)
            .unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn test_no_elite_uses_non_elite_parents() {
        let mut rng = StdRng::seed_from_u64(3);
        let pop = population(10, 0, &mut rng);
        let params = BrkgaParams::default()
            .with_population_size(10)
            .with_elite_percentage(0.0)
            .with_mutants_percentage(0.0);
        let pool = DecodePool::new(1).unwrap();
        let next = Mating::new(&params)
            .next_generation(&pop, 8, &SumDecoder, &pool, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(next.len(), 10);
    }

    #[test]
    fn test_bias_favours_best_parent() {
        let mut rng = StdRng::seed_from_u64(42);
        let best = Chromosome::new(vec![0.1; 50], 1.0);
        let middle = Chromosome::new(vec![0.5; 50], 2.0);
        let worst = Chromosome::new(vec![0.9; 50], 3.0);
        let cumulative = BiasFunction::Linear.cumulative_weights(3);

        let (mut from_best, mut from_worst) = (0usize, 0usize);
        for _ in 0..400 {
            let mut parents = vec![&worst, &best, &middle];
            let child = inherit(&mut parents, Sense::Minimize, &cumulative, 50, &mut rng);
            from_best += child.iter().filter(|&&k| k == 0.1).count();
            from_worst += child.iter().filter(|&&k| k == 0.9).count();
        }
        // Linear bias over 3 parents: 6/11 vs 2/11 of the genes.
        assert!(from_best > 2 * from_worst, "{} vs {}", from_best, from_worst);
    }

    #[test]
    fn test_constant_bias_is_unbiased() {
        let mut rng = StdRng::seed_from_u64(9);
        let a = Chromosome::new(vec![0.2; 100], 1.0);
        let b = Chromosome::new(vec![0.8; 100], 2.0);
        let cumulative = BiasFunction::Constant.cumulative_weights(2);
        let mut from_a = 0usize;
        for _ in 0..100 {
            let mut parents = vec![&a, &b];
            let child = inherit(&mut parents, Sense::Minimize, &cumulative, 100, &mut rng);
            from_a += child.iter().filter(|&&k| k == 0.2).count();
        }
        let share = from_a as f64 / 10_000.0;
        assert!((share - 0.5).abs() < 0.05, "share {}", share);
    }
}
