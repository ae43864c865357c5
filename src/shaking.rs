//! Diversification operators: shaking and elite exchange.
//!
//! Shaking perturbs non-elite members only, so the elite set and therefore
//! the best fitness of a population never get worse. Exchange copies the
//! best members of every population over the worst members of the others.

use crate::config::ShakingType;
use crate::decode::DecodePool;
use crate::error::Result;
use crate::population::Population;
use crate::types::{Chromosome, Decoder};
use rand::seq::SliceRandom;
use rand::Rng;

/// Perturbs a share of the non-elite members of `population`.
///
/// * `intensity` - fraction of genes perturbed per chromosome (at least one)
/// * `fraction` - fraction of non-elite members shaken
///
/// Returns the number of members shaken. On a decoder failure the
/// population is left untouched.
pub(crate) fn shake_population<D: Decoder, R: Rng>(
    population: &mut Population,
    intensity: f64,
    shaking_type: ShakingType,
    fraction: f64,
    decoder: &D,
    pool: &DecodePool,
    rng: &mut R,
) -> Result<usize> {
    let elite = population.elite_size();
    let non_elite = population.len() - elite;
    let count = ((fraction * non_elite as f64).ceil() as usize).min(non_elite);
    if count == 0 {
        return Ok(0);
    }

    let mut targets: Vec<usize> = (elite..population.len()).collect();
    targets.shuffle(rng);
    targets.truncate(count);
    targets.sort_unstable();

    let batch: Vec<Vec<f64>> = targets
        .iter()
        .map(|&i| {
            let mut keys = population.members()[i].keys().to_vec();
            perturb(&mut keys, intensity, shaking_type, rng);
            keys
        })
        .collect();
    let shaken = pool.decode_all(decoder, batch)?;

    let members = population.members_mut();
    for (i, chromosome) in targets.into_iter().zip(shaken) {
        members[i] = chromosome;
    }
    population.sort();
    Ok(count)
}

/// Applies one perturbation to a key vector; keys stay in `[0, 1)`.
fn perturb<R: Rng>(keys: &mut [f64], intensity: f64, shaking_type: ShakingType, rng: &mut R) {
    let n = keys.len();
    if n == 0 {
        return;
    }
    let genes = ((intensity * n as f64).round() as usize).max(1);
    match shaking_type {
        ShakingType::Change => {
            for _ in 0..genes {
                let i = rng.random_range(0..n);
                keys[i] = rng.random_range(0.0..1.0);
            }
        }
        ShakingType::Swap => {
            for _ in 0..genes {
                let i = rng.random_range(0..n);
                let j = rng.random_range(0..n);
                keys.swap(i, j);
            }
        }
    }
}

/// Copies the best `count` members of every population over the worst
/// members of each other population, then re-sorts.
///
/// Callers must ensure `count * (populations - 1)` does not exceed the
/// non-elite size.
pub(crate) fn exchange_elite(populations: &mut [Population], count: usize) {
    if populations.len() < 2 || count == 0 {
        return;
    }
    let emigrants: Vec<Vec<Chromosome>> = populations
        .iter()
        .map(|p| p.members()[..count.min(p.len())].to_vec())
        .collect();

    for (i, population) in populations.iter_mut().enumerate() {
        let members = population.members_mut();
        let mut dest = members.len();
        for (j, group) in emigrants.iter().enumerate() {
            if i == j {
                continue;
            }
            for chromosome in group {
                dest -= 1;
                members[dest] = chromosome.clone();
            }
        }
        population.sort();
    }
}
