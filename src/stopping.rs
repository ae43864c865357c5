//! Composable stopping predicates.
//!
//! A predicate looks at an [`AlgorithmStatus`] between generations and
//! returns `true` to stop. The engine always ORs the caller's predicate
//! with its built-in time and stall limits.
//!
//! ```
//! use u_brkga::{stopping, Sense};
//!
//! let stop = stopping::either(
//!     stopping::max_iterations(1000),
//!     stopping::target_fitness(Sense::Minimize, 0.0),
//! );
//! ```

use crate::status::AlgorithmStatus;
use crate::types::Sense;

/// Boxed predicate as stored by the engine.
pub type StoppingCriteria<'a> = Box<dyn FnMut(&AlgorithmStatus) -> bool + 'a>;

/// Stops once `n` generations have completed.
pub fn max_iterations(n: usize) -> impl FnMut(&AlgorithmStatus) -> bool {
    move |status| status.current_iteration >= n
}

/// Stops once the best fitness reaches `target` (or gets better).
pub fn target_fitness(sense: Sense, target: f64) -> impl FnMut(&AlgorithmStatus) -> bool {
    move |status| !sense.is_better(target, status.best_fitness)
}

/// Stops when either predicate does. Both are evaluated every time.
pub fn either<A, B>(mut a: A, mut b: B) -> impl FnMut(&AlgorithmStatus) -> bool
where
    A: FnMut(&AlgorithmStatus) -> bool,
    B: FnMut(&AlgorithmStatus) -> bool,
{
    move |status| {
        let x = a(status);
        let y = b(status);
        x || y
    }
}

/// Stops only when both predicates do.
pub fn both<A, B>(mut a: A, mut b: B) -> impl FnMut(&AlgorithmStatus) -> bool
where
    A: FnMut(&AlgorithmStatus) -> bool,
    B: FnMut(&AlgorithmStatus) -> bool,
{
    move |status| {
        let x = a(status);
        let y = b(status);
        x && y
    }
}
