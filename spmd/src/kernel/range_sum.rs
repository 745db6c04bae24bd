use super::Kernel;
use crate::{
    aggregate,
    collective::Collective,
    error::{Result, SpmdErr},
    partition::Partition,
};

/// The largest `n` for which `1 + 2 + ... + n` fits in an `i64`.
pub const MAX_TERMS: u64 = 4_294_967_295;

/// Sums the integers `1..=n`, each worker adding up its own partition.
#[derive(Debug, Clone)]
pub struct RangeSumKernel {
    n: u64,
}

/// The coordinator's answer to a range sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumOutcome {
    pub n: u64,
    pub sum: i64,
    pub expected: i64,
}

impl SumOutcome {
    pub fn is_exact(&self) -> bool {
        self.sum == self.expected
    }
}

impl RangeSumKernel {
    pub fn new(n: u64) -> Self {
        Self { n }
    }
}

/// `1 + 2 + ... + n`, exact.
pub fn triangular(n: u64) -> u128 {
    let n = n as u128;
    n * (n + 1) / 2
}

/// Sums `start + 1 ..= start + len` of `partition` in closed form.
///
/// # Errors
/// `Overflow` if the sum doesn't fit in an `i64`.
pub fn range_sum(partition: &Partition) -> Result<i64> {
    let sum = triangular(partition.end()) - triangular(partition.start);

    i64::try_from(sum).map_err(|_| {
        SpmdErr::Overflow(format!(
            "sum of elements {} to {} doesn't fit in 64 bits",
            partition.start + 1,
            partition.end()
        ))
    })
}

impl Kernel for RangeSumKernel {
    type Global = ();
    type Local = ();
    type Estimate = i64;
    type Collected = i64;
    type Outcome = SumOutcome;

    fn validate(&self, _worker_count: usize) -> Result<()> {
        if self.n > MAX_TERMS {
            return Err(SpmdErr::InvalidConfig(format!(
                "can't sum {} terms, the total would overflow 64 bits past {MAX_TERMS}",
                self.n
            )));
        }

        Ok(())
    }

    fn total_work(&self, _worker_count: usize) -> u64 {
        self.n
    }

    fn prepare(&self) -> Result<Self::Global> {
        Ok(())
    }

    async fn distribute<C>(
        &self,
        _group: &mut C,
        _partition: &Partition,
        _global: Option<&()>,
    ) -> Result<()>
    where
        C: Collective + Send,
    {
        // every worker already knows `n`
        Ok(())
    }

    fn compute(&self, partition: &Partition, _local: ()) -> Result<i64> {
        range_sum(partition)
    }

    fn describe(&self, partition: &Partition, estimate: &i64) -> String {
        if partition.is_empty() {
            return format!("worker {}: no elements to sum", partition.owner_id);
        }

        format!(
            "worker {}: calculated local sum = {estimate} (elements {} to {})",
            partition.owner_id,
            partition.start + 1,
            partition.end()
        )
    }

    async fn collect<C>(&self, group: &mut C, estimate: i64) -> Result<Option<i64>>
    where
        C: Collective + Send,
    {
        aggregate::reduce_total(group, estimate).await
    }

    fn finalize(&self, _global: (), sum: i64, _worker_count: usize) -> Result<SumOutcome> {
        // `validate` bounds `n`, so this always fits
        let expected = triangular(self.n) as i64;

        Ok(SumOutcome {
            n: self.n,
            sum,
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sums_add_up_to_the_closed_form() {
        for workers in [1, 2, 3, 7] {
            let total: i64 = (0..workers)
                .map(|id| range_sum(&Partition::new(1_000_000, workers, id)).unwrap())
                .sum();
            assert_eq!(total, 500_000_500_000);
        }
    }

    #[test]
    fn partial_sum_matches_a_plain_loop() {
        let part = Partition::new(1000, 3, 1);
        let looped: i64 = (part.start + 1..=part.end()).map(|i| i as i64).sum();
        assert_eq!(range_sum(&part).unwrap(), looped);
    }

    #[test]
    fn empty_partition_sums_to_zero() {
        let part = Partition::new(2, 4, 3);
        assert_eq!(range_sum(&part).unwrap(), 0);
    }

    #[test]
    fn largest_supported_range_fits() {
        let part = Partition::new(MAX_TERMS, 1, 0);
        assert_eq!(range_sum(&part).unwrap() as u128, triangular(MAX_TERMS));
        assert!(RangeSumKernel::new(MAX_TERMS).validate(4).is_ok());
    }

    #[test]
    fn ranges_past_the_limit_are_rejected_upfront() {
        let err = RangeSumKernel::new(MAX_TERMS + 1).validate(4).unwrap_err();
        assert!(matches!(err, SpmdErr::InvalidConfig(_)));
        assert!(range_sum(&Partition::new(MAX_TERMS + 1, 1, 0)).is_err());
    }
}
