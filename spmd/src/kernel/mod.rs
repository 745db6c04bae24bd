//! The pluggable local computations, one per task.

mod hello;
mod mat_mul;
mod monte_carlo;
mod range_sum;

use crate::{collective::Collective, error::Result, partition::Partition};

pub use hello::{GREETING, Greeting, HelloKernel, HelloOutcome};
pub use mat_mul::{LocalBlock, MatMulInputs, MatMulKernel, MatMulOutcome, Matrix, multiply_rows};
pub use monte_carlo::{MonteCarloKernel, PiOutcome, estimate_pi, worker_seed};
pub use range_sum::{MAX_TERMS, RangeSumKernel, SumOutcome, range_sum, triangular};

/// One task's hooks into the partition, distribute, compute, collect and aggregate
/// pipeline.
///
/// Data owned by the coordinator only (`Global`, `Collected`) is handed around as
/// `Option`s, what every worker owns (`Local`, `Estimate`) is passed by value so a
/// phase can't read another phase's buffers.
///
/// Tasks implement `Kernel`, whose `distribute` and `collect` futures are `Send`.
#[trait_variant::make(Kernel: Send)]
pub trait LocalKernel {
    /// The full inputs, materialized at the coordinator.
    type Global;
    /// What a worker owns once distribution is over.
    type Local;
    /// A worker's partial result.
    type Estimate;
    /// What the coordinator holds once collection is over.
    type Collected;
    /// The final answer.
    type Outcome;

    /// Checks the run's preconditions. Every worker runs it with the same arguments so
    /// either the whole group fails before the first collective or nobody does.
    fn validate(&self, _worker_count: usize) -> Result<()> {
        Ok(())
    }

    /// The amount of work units to partition among `worker_count` workers.
    fn total_work(&self, worker_count: usize) -> u64;

    /// Materializes the full inputs, called at the coordinator only.
    fn prepare(&self) -> Result<Self::Global>;

    /// Moves the inputs each worker needs onto it.
    ///
    /// # Args
    /// * `group` - The collective channel.
    /// * `partition` - This worker's share of the work.
    /// * `global` - The full inputs, `Some` only at the coordinator.
    async fn distribute<C>(
        &self,
        group: &mut C,
        partition: &Partition,
        global: Option<&Self::Global>,
    ) -> Result<Self::Local>
    where
        C: Collective + Send;

    /// The local computation, no communication happens here.
    fn compute(&self, partition: &Partition, local: Self::Local) -> Result<Self::Estimate>;

    /// A one line summary of a worker's partial result.
    fn describe(&self, partition: &Partition, estimate: &Self::Estimate) -> String;

    /// Moves every partial result to the coordinator.
    ///
    /// # Returns
    /// `Some` at the coordinator, `None` everywhere else.
    async fn collect<C>(
        &self,
        group: &mut C,
        estimate: Self::Estimate,
    ) -> Result<Option<Self::Collected>>
    where
        C: Collective + Send;

    /// Turns the collected partial results into the final answer, at the coordinator.
    fn finalize(
        &self,
        global: Self::Global,
        collected: Self::Collected,
        worker_count: usize,
    ) -> Result<Self::Outcome>;
}
