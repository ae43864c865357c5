//! Core types: the decoder contract, optimization sense and chromosomes.

use std::cmp::Ordering;

/// Decoder trait for BRKGA-MP-IPR.
///
/// This is the **only** trait a user must implement. It maps a random-key
/// chromosome (a slice of `f64` in `[0, 1)`) to a fitness value. Whether
/// lower or higher is better is decided by the [`Sense`] given to the engine.
///
/// The engine calls `decode` from several worker threads at once, so the
/// implementation must be a pure function of its input: any internal cache
/// must be thread-safe.
///
/// # Examples
///
/// ```ignore
/// struct TspDecoder { dist: Vec<Vec<f64>> }
///
/// impl Decoder for TspDecoder {
///     fn decode(&self, keys: &[f64]) -> anyhow::Result<f64> {
///         let tour = u_brkga::permutation(keys);
///         let mut len = self.dist[tour[tour.len() - 1]][tour[0]];
///         for w in tour.windows(2) {
///             len += self.dist[w[0]][w[1]];
///         }
///         Ok(len)
///     }
/// }
/// ```
pub trait Decoder: Send + Sync {
    /// Decodes a random-key chromosome and returns its fitness.
    ///
    /// # Arguments
    /// * `keys` - A slice of `f64` values in `[0.0, 1.0)` whose length
    ///   equals the chromosome size given to the engine.
    ///
    /// An `Err` aborts the run and is reported as
    /// [`crate::BrkgaError::Decoder`].
    fn decode(&self, keys: &[f64]) -> anyhow::Result<f64>;

    /// The chromosome length this decoder requires, if it knows it.
    ///
    /// When `Some`, the engine rejects a mismatching chromosome size at
    /// construction.
    fn chromosome_length(&self) -> Option<usize> {
        None
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sense {
    /// Lower fitness is better.
    #[default]
    Minimize,
    /// Higher fitness is better.
    Maximize,
}

impl Sense {
    /// Orders two fitness values so that the better one compares `Less`.
    ///
    /// NaN always ranks after every number.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self {
                Sense::Minimize => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                Sense::Maximize => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
            },
        }
    }

    /// Returns `true` if `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// The worst possible fitness for this sense.
    pub fn worst(self) -> f64 {
        match self {
            Sense::Minimize => f64::INFINITY,
            Sense::Maximize => f64::NEG_INFINITY,
        }
    }
}

impl std::fmt::Display for Sense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sense::Minimize => write!(f, "minimize"),
            Sense::Maximize => write!(f, "maximize"),
        }
    }
}

/// A random-key chromosome together with its decoded fitness.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chromosome {
    pub(crate) keys: Vec<f64>,
    pub(crate) fitness: f64,
}

impl Chromosome {
    pub(crate) fn new(keys: Vec<f64>, fitness: f64) -> Self {
        Self { keys, fitness }
    }

    /// The random keys, each in `[0, 1)`.
    pub fn keys(&self) -> &[f64] {
        &self.keys
    }

    /// The fitness computed by the decoder.
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the chromosome has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Consumes the chromosome and returns its keys.
    pub fn into_keys(self) -> Vec<f64> {
        self.keys
    }
}

/// Decodes random keys into a permutation: gene indices sorted by key.
///
/// Equal keys keep index order, so the result is deterministic.
pub fn permutation(keys: &[f64]) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..keys.len()).collect();
    perm.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));
    perm
}
