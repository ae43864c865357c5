//! Rank-based bias functions for multi-parent crossover.
//!
//! When an offspring picks the value of a gene, parent ranked `r`
//! (1 = best among the parents of that mating) is chosen with probability
//! `bias(r) / sum(bias(1..=n))`.

use crate::error::{BrkgaError, Result};
use std::fmt;
use std::sync::Arc;

/// Custom bias function over 1-based parent rank.
pub type BiasFn = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

/// Weighting of parents by rank.
///
/// All built-in variants are strictly decreasing except [`Constant`],
/// which gives every parent the same chance (unbiased uniform crossover).
///
/// [`Constant`]: BiasFunction::Constant
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BiasFunction {
    /// `1 / n` for every rank.
    Constant,
    /// `r^-3`
    Cubic,
    /// `e^-r`
    Exponential,
    /// `1 / r`
    #[default]
    Linear,
    /// `1 / ln(r + 1)`
    LogInverse,
    /// `r^-2`
    Quadratic,
    /// User-supplied function. Must be positive and non-increasing over
    /// the ranks in use.
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(BiasFn),
}

impl BiasFunction {
    /// Wraps a custom function.
    pub fn custom(f: impl Fn(usize) -> f64 + Send + Sync + 'static) -> Self {
        BiasFunction::Custom(Arc::new(f))
    }

    /// Weight of the parent at 1-based `rank` among `total_parents`.
    pub fn weight(&self, rank: usize, total_parents: usize) -> f64 {
        let r = rank as f64;
        match self {
            BiasFunction::Constant => 1.0 / total_parents.max(1) as f64,
            BiasFunction::Cubic => r.powi(-3),
            BiasFunction::Exponential => (-r).exp(),
            BiasFunction::Linear => 1.0 / r,
            BiasFunction::LogInverse => 1.0 / (r + 1.0).ln(),
            BiasFunction::Quadratic => r.powi(-2),
            BiasFunction::Custom(f) => f(rank),
        }
    }

    /// Cumulative weights for ranks `1..=total_parents`, used as a roulette.
    pub(crate) fn cumulative_weights(&self, total_parents: usize) -> Vec<f64> {
        let mut acc = 0.0;
        (1..=total_parents)
            .map(|r| {
                acc += self.weight(r, total_parents);
                acc
            })
            .collect()
    }

    /// Checks that weights are finite, positive and non-increasing.
    pub fn validate(&self, total_parents: usize) -> Result<()> {
        let mut previous = f64::INFINITY;
        for rank in 1..=total_parents {
            let w = self.weight(rank, total_parents);
            if !w.is_finite() || w <= 0.0 {
                return Err(BrkgaError::config(format!(
                    "bias function {} gives non-positive weight {} at rank {}",
                    self, w, rank
                )));
            }
            if w > previous {
                return Err(BrkgaError::config(format!(
                    "bias function {} is not monotonically non-increasing at rank {}",
                    self, rank
                )));
            }
            previous = w;
        }
        Ok(())
    }
}

impl fmt::Debug for BiasFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for BiasFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BiasFunction::Constant => "CONSTANT",
            BiasFunction::Cubic => "CUBIC",
            BiasFunction::Exponential => "EXPONENTIAL",
            BiasFunction::Linear => "LINEAR",
            BiasFunction::LogInverse => "LOGINVERSE",
            BiasFunction::Quadratic => "QUADRATIC",
            BiasFunction::Custom(_) => "CUSTOM",
        };
        f.write_str(name)
    }
}
