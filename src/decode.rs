//! Batch decoding on a fixed-size worker pool.
//!
//! Every batch is a barrier: [`DecodePool::evaluate`] returns only after all
//! chromosomes of the batch are decoded, and results come back in input
//! order regardless of which worker produced them.

use crate::error::Result;
use crate::types::{Chromosome, Decoder};
use rayon::prelude::*;

/// Worker pool used for all decoder calls of one engine.
pub(crate) struct DecodePool {
    pool: Option<rayon::ThreadPool>,
    num_threads: usize,
}

impl DecodePool {
    /// Creates a pool with `num_threads` workers. A single worker decodes
    /// on the calling thread.
    pub(crate) fn new(num_threads: usize) -> Result<Self> {
        let num_threads = num_threads.max(1);
        let pool = if num_threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .thread_name(|i| format!("brkga-decode-{}", i))
                    .build()?,
            )
        } else {
            None
        };
        Ok(Self { pool, num_threads })
    }

    pub(crate) fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Decodes every key vector and returns the fitness values in order.
    ///
    /// The first decoder failure aborts the batch.
    pub(crate) fn evaluate<D: Decoder>(&self, decoder: &D, batch: &[Vec<f64>]) -> Result<Vec<f64>> {
        let fitness = match &self.pool {
            Some(pool) => pool.install(|| {
                batch
                    .par_iter()
                    .map(|keys| decoder.decode(keys))
                    .collect::<anyhow::Result<Vec<f64>>>()
            }),
            None => batch
                .iter()
                .map(|keys| decoder.decode(keys))
                .collect::<anyhow::Result<Vec<f64>>>(),
        }?;
        Ok(fitness)
    }

    /// Decodes a batch and pairs each key vector with its fitness.
    pub(crate) fn decode_all<D: Decoder>(
        &self,
        decoder: &D,
        batch: Vec<Vec<f64>>,
    ) -> Result<Vec<Chromosome>> {
        let fitness = self.evaluate(decoder, &batch)?;
        Ok(batch
            .into_iter()
            .zip(fitness)
            .map(|(keys, f)| Chromosome::new(keys, f))
            .collect())
    }
}
