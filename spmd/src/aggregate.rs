//! Combining per-worker partial results at the coordinator.

use crate::{collective::Collective, error::Result};

/// The first two raw moments of a set of per-worker estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MomentPair {
    pub sum: f64,
    pub sum_of_squares: f64,
}

/// Population statistics of the per-worker estimates, not of the underlying samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
}

impl MomentPair {
    /// The moments of a single estimate.
    pub fn of(estimate: f64) -> Self {
        Self {
            sum: estimate,
            sum_of_squares: estimate * estimate,
        }
    }

    /// Folds `estimates` in order, the same order the coordinator reduces in.
    pub fn from_estimates(estimates: &[f64]) -> Self {
        estimates
            .iter()
            .map(|&x| Self::of(x))
            .fold(Self::default(), |acc, m| Self {
                sum: acc.sum + m.sum,
                sum_of_squares: acc.sum_of_squares + m.sum_of_squares,
            })
    }

    /// Derives mean, variance and standard deviation over `count` estimates.
    ///
    /// The variance is clamped to zero before the square root, cancellation can make
    /// it slightly negative when the estimates are (almost) all equal.
    pub fn stats(&self, count: usize) -> Stats {
        let n = count as f64;
        let mean = self.sum / n;
        let variance = (self.sum_of_squares / n - mean * mean).max(0.0);

        Stats {
            mean,
            variance,
            std_dev: variance.sqrt(),
        }
    }
}

impl Stats {
    /// Standard deviation relative to the mean.
    pub fn coefficient_of_variation(&self) -> f64 {
        self.std_dev / self.mean
    }
}

/// Sums every worker's integer partial at the coordinator.
pub async fn reduce_total<C: Collective>(group: &mut C, local: i64) -> Result<Option<i64>> {
    group.reduce_sum(local).await
}

/// Concatenates every worker's block in worker id order at the coordinator.
pub async fn gather_blocks<C: Collective>(group: &mut C, block: &[f64]) -> Result<Option<Vec<f64>>> {
    group.gather(block).await
}

/// Reduces an estimate and its square in two separate sums, so the coordinator can
/// derive both moments without ever seeing the individual estimates.
///
/// # Returns
/// `Some` at the coordinator, `None` everywhere else.
pub async fn reduce_moments<C: Collective>(
    group: &mut C,
    estimate: f64,
) -> Result<Option<MomentPair>> {
    let local = MomentPair::of(estimate);
    let sum = group.reduce_sum(local.sum).await?;
    let sum_of_squares = group.reduce_sum(local.sum_of_squares).await?;

    Ok(sum
        .zip(sum_of_squares)
        .map(|(sum, sum_of_squares)| MomentPair {
            sum,
            sum_of_squares,
        }))
}
