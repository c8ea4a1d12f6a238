//! # Posterior Samples
//!
//! Storage for a Markov-chain Monte Carlo run produced elsewhere, and random
//! draws from it. A [`Chain`] holds one row per sample and one column per
//! varying parameter. [`Chain::draw`] picks distinct rows after burn-in and
//! thinning, and hands them out through [`PosteriorSamples`], an iterator of
//! copied rows that can be cloned to replay the same draw.

use crate::error::{LayerFitError, Result};
use ndarray::{Array1, Array2, ArrayView2};
use rand::seq::index;
use rand::Rng;

/// Samples of the varying parameters, shape `(n_samples, n_params)`.
///
/// Columns follow the order of the objective's varying parameters. The chain
/// is only stored and sampled here; producing it is the job of an external
/// sampler.
///
/// # Examples
///
/// ```
/// use layerfit_rs::uncertainty::Chain;
/// use rand::SeedableRng;
///
/// let chain = Chain::from_rows(&[
///     vec![1.0, 10.0],
///     vec![2.0, 20.0],
///     vec![3.0, 30.0],
///     vec![4.0, 40.0],
/// ])
/// .unwrap();
///
/// // drop the first sample, keep every second of the rest
/// assert_eq!(chain.available(1, 2).unwrap(), vec![1, 3]);
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let draws: Vec<_> = chain.draw(5, 1, 2, &mut rng).unwrap().collect();
/// assert_eq!(draws.len(), 2);
/// assert_ne!(draws[0], draws[1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    samples: Array2<f64>,
}

impl Chain {
    /// Wrap an `(n_samples, n_params)` array.
    pub fn new(samples: Array2<f64>) -> Self {
        Self { samples }
    }

    /// Build a chain from row vectors, which must all have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_params = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != n_params) {
            return Err(LayerFitError::DimensionMismatch(format!(
                "chain rows must all have {} entries, found one with {}",
                n_params,
                bad.len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let samples = Array2::from_shape_vec((rows.len(), n_params), flat)
            .map_err(|e| LayerFitError::DimensionMismatch(e.to_string()))?;
        Ok(Self { samples })
    }

    pub fn n_samples(&self) -> usize {
        self.samples.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.samples.ncols()
    }

    pub fn samples(&self) -> ArrayView2<f64> {
        self.samples.view()
    }

    /// Rows left after discarding `nburn` and keeping every `nthin`-th.
    pub fn available(&self, nburn: usize, nthin: usize) -> Result<Vec<usize>> {
        if nthin == 0 {
            return Err(LayerFitError::InvalidInput(
                "thinning interval must be at least 1".to_string(),
            ));
        }
        Ok((nburn..self.n_samples()).step_by(nthin).collect())
    }

    /// Choose `min(ngen, available)` distinct rows at random.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        ngen: usize,
        nburn: usize,
        nthin: usize,
        rng: &mut R,
    ) -> Result<PosteriorSamples<'_>> {
        let available = self.available(nburn, nthin)?;
        let amount = ngen.min(available.len());
        let rows = index::sample(rng, available.len(), amount)
            .into_iter()
            .map(|i| available[i])
            .collect();
        Ok(PosteriorSamples {
            chain: self,
            rows,
            position: 0,
        })
    }
}

/// Copies of selected chain rows, in draw order.
#[derive(Debug, Clone)]
pub struct PosteriorSamples<'a> {
    chain: &'a Chain,
    rows: Vec<usize>,
    position: usize,
}

impl PosteriorSamples<'_> {
    /// Indices of the chain rows this iterator yields.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }
}

impl Iterator for PosteriorSamples<'_> {
    type Item = Array1<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = *self.rows.get(self.position)?;
        self.position += 1;
        Some(self.chain.samples.row(row).to_owned())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rows.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PosteriorSamples<'_> {}
