use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Uniform};

use super::Kernel;
use crate::{
    aggregate::{self, MomentPair, Stats},
    collective::{COORDINATOR, Collective},
    error::{Result, SpmdErr},
    partition::Partition,
};

/// Estimates π by sampling points uniformly in `[-1, 1] x [-1, 1]`.
#[derive(Debug, Clone)]
pub struct MonteCarloKernel {
    samples: u64,
    seed: Option<u64>,
}

/// The coordinator's answer to a Monte Carlo run.
#[derive(Debug, Clone, PartialEq)]
pub struct PiOutcome {
    pub samples: u64,
    /// The base seed the group ran with.
    pub seed: u64,
    pub moments: MomentPair,
    pub stats: Stats,
}

impl PiOutcome {
    pub fn abs_error(&self) -> f64 {
        (self.stats.mean - std::f64::consts::PI).abs()
    }

    pub fn rel_error(&self) -> f64 {
        self.abs_error() / std::f64::consts::PI
    }

    /// The expected standard error of a single estimate over every sample.
    pub fn theoretical_error(&self) -> f64 {
        1.0 / (self.samples as f64).sqrt()
    }
}

impl MonteCarloKernel {
    /// Creates a new `MonteCarloKernel`.
    ///
    /// # Args
    /// * `samples` - The total amount of points, split among the workers.
    /// * `seed` - The group's base seed, drawn from the OS when `None`.
    pub fn new(samples: u64, seed: Option<u64>) -> Self {
        Self { samples, seed }
    }
}

/// The seed a worker samples with, distinct for every worker of a group.
pub fn worker_seed(base: u64, owner_id: usize) -> u64 {
    base.wrapping_add(owner_id as u64)
}

/// Draws `samples` points and returns `4 * inside / samples`.
///
/// # Errors
/// `Precondition` if `samples` is zero.
pub fn estimate_pi(samples: u64, seed: u64) -> Result<f64> {
    if samples == 0 {
        return Err(SpmdErr::Precondition(
            "can't estimate π from zero samples".into(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let unit = Uniform::new_inclusive(-1.0, 1.0)
        .map_err(|e| SpmdErr::Precondition(e.to_string()))?;

    let mut inside: u64 = 0;
    for _ in 0..samples {
        let x: f64 = unit.sample(&mut rng);
        let y: f64 = unit.sample(&mut rng);
        if x * x + y * y <= 1.0 {
            inside += 1;
        }
    }

    Ok(4.0 * inside as f64 / samples as f64)
}

impl Kernel for MonteCarloKernel {
    type Global = u64;
    type Local = u64;
    type Estimate = f64;
    type Collected = MomentPair;
    type Outcome = PiOutcome;

    fn validate(&self, worker_count: usize) -> Result<()> {
        if self.samples < worker_count as u64 {
            return Err(SpmdErr::InvalidConfig(format!(
                "{} samples can't feed {worker_count} workers, every worker needs at least one",
                self.samples
            )));
        }

        Ok(())
    }

    fn total_work(&self, _worker_count: usize) -> u64 {
        self.samples
    }

    fn prepare(&self) -> Result<u64> {
        Ok(self.seed.unwrap_or_else(|| rand::rng().random()))
    }

    async fn distribute<C>(
        &self,
        group: &mut C,
        _partition: &Partition,
        global: Option<&u64>,
    ) -> Result<u64>
    where
        C: Collective + Send,
    {
        // the coordinator's seed wins so the whole group shares one base
        let mut seed = [global.copied().unwrap_or_default() as i64];
        group.broadcast(&mut seed, COORDINATOR).await?;
        Ok(seed[0] as u64)
    }

    fn compute(&self, partition: &Partition, base_seed: u64) -> Result<f64> {
        estimate_pi(partition.len, worker_seed(base_seed, partition.owner_id))
    }

    fn describe(&self, partition: &Partition, estimate: &f64) -> String {
        format!(
            "worker {}: local π estimate = {estimate:.8} ({} samples)",
            partition.owner_id, partition.len
        )
    }

    async fn collect<C>(
        &self,
        group: &mut C,
        estimate: f64,
    ) -> Result<Option<MomentPair>>
    where
        C: Collective + Send,
    {
        aggregate::reduce_moments(group, estimate).await
    }

    fn finalize(&self, seed: u64, moments: MomentPair, worker_count: usize) -> Result<PiOutcome> {
        Ok(PiOutcome {
            samples: self.samples,
            seed,
            moments,
            stats: moments.stats(worker_count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_estimate() {
        assert_eq!(estimate_pi(10_000, 7).unwrap(), estimate_pi(10_000, 7).unwrap());
    }

    #[test]
    fn estimate_is_close_to_pi() {
        let pi = estimate_pi(200_000, 42).unwrap();
        assert!((pi - std::f64::consts::PI).abs() < 0.05, "{pi}");
    }

    #[test]
    fn estimate_is_bounded() {
        for seed in 0..20 {
            let pi = estimate_pi(3, seed).unwrap();
            assert!((0.0..=4.0).contains(&pi));
        }
    }

    #[test]
    fn zero_samples_is_rejected() {
        assert!(matches!(estimate_pi(0, 1), Err(SpmdErr::Precondition(_))));
    }

    #[test]
    fn workers_get_distinct_seeds() {
        let seeds: Vec<_> = (0..8).map(|id| worker_seed(u64::MAX - 3, id)).collect();
        for (i, a) in seeds.iter().enumerate() {
            assert!(seeds[i + 1..].iter().all(|b| a != b));
        }
    }

    #[test]
    fn too_few_samples_for_the_group_is_rejected() {
        let kernel = MonteCarloKernel::new(3, Some(1));
        assert!(kernel.validate(3).is_ok());
        assert!(matches!(kernel.validate(4), Err(SpmdErr::InvalidConfig(_))));
    }

    #[test]
    fn configured_seed_is_used_verbatim() {
        assert_eq!(MonteCarloKernel::new(10, Some(99)).prepare().unwrap(), 99);
    }
}
