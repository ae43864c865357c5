//! Sorted population storage with elite / non-elite views.

use crate::decode::DecodePool;
use crate::error::{BrkgaError, Result};
use crate::types::{Chromosome, Decoder, Sense};
use rand::Rng;

/// Draws `n` keys uniformly in `[0, 1)`.
pub(crate) fn random_keys<R: Rng>(n: usize, rng: &mut R) -> Vec<f64> {
    (0..n).map(|_| rng.random_range(0.0..1.0)).collect()
}

/// A population of decoded chromosomes, kept sorted best-first.
///
/// The first [`elite_size`](Population::elite_size) members are the elite
/// set. Sorting is stable: members of equal fitness keep the order in
/// which they were produced.
#[derive(Debug, Clone)]
pub struct Population {
    members: Vec<Chromosome>,
    elite_size: usize,
    sense: Sense,
}

impl Population {
    /// Builds a population from already decoded members and sorts it.
    pub(crate) fn from_members(members: Vec<Chromosome>, elite_size: usize, sense: Sense) -> Self {
        let mut population = Self {
            members,
            elite_size,
            sense,
        };
        population.sort();
        population
    }

    /// Fills up `seeded` with random chromosomes of `chromosome_size` keys
    /// until it holds `size` members, decodes them and sorts the result.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn initialize<D: Decoder, R: Rng>(
        mut seeded: Vec<Vec<f64>>,
        size: usize,
        chromosome_size: usize,
        elite_size: usize,
        sense: Sense,
        decoder: &D,
        pool: &DecodePool,
        rng: &mut R,
    ) -> Result<Self> {
        seeded.truncate(size);
        while seeded.len() < size {
            seeded.push(random_keys(chromosome_size, rng));
        }
        let members = pool.decode_all(decoder, seeded)?;
        Ok(Self::from_members(members, elite_size, sense))
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the population has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of elite members.
    pub fn elite_size(&self) -> usize {
        self.elite_size
    }

    /// The optimization sense used for ranking.
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// All members, best first.
    pub fn members(&self) -> &[Chromosome] {
        &self.members
    }

    /// The elite members, best first.
    pub fn elites(&self) -> &[Chromosome] {
        &self.members[..self.elite_size]
    }

    /// The non-elite members, best first.
    pub fn non_elites(&self) -> &[Chromosome] {
        &self.members[self.elite_size..]
    }

    /// Member at rank `position` (0 = best).
    pub fn get(&self, position: usize) -> Option<&Chromosome> {
        self.members.get(position)
    }

    /// The best member.
    pub fn best(&self) -> &Chromosome {
        &self.members[0]
    }

    /// Fitness of the best member.
    pub fn best_fitness(&self) -> f64 {
        self.members[0].fitness
    }

    /// Swaps in a complete new generation of the same size.
    ///
    /// The new members are sorted before the swap; on a size mismatch the
    /// population is left untouched.
    pub(crate) fn replace(&mut self, members: Vec<Chromosome>) -> Result<()> {
        if members.len() != self.members.len() {
            return Err(BrkgaError::invalid(format!(
                "replacement has {} members, population has {}",
                members.len(),
                self.members.len()
            )));
        }
        self.members = members;
        self.sort();
        Ok(())
    }

    /// Overwrites the member at `position` and restores the ordering.
    pub(crate) fn set_member(&mut self, position: usize, chromosome: Chromosome) {
        self.members[position] = chromosome;
        self.sort();
    }

    /// Mutable access for operators that re-sort afterwards.
    pub(crate) fn members_mut(&mut self) -> &mut [Chromosome] {
        &mut self.members
    }

    pub(crate) fn sort(&mut self) {
        let sense = self.sense;
        self.members
            .sort_by(|a, b| sense.compare(a.fitness, b.fitness));
    }
}
