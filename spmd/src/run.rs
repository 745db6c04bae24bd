//! The run coordinator: sequences the collective calls identically on every worker.

use std::time::{Duration, Instant};

use log::{debug, error};

use crate::{
    collective::Collective,
    error::{Result, SpmdErr},
    kernel::Kernel,
    partition::Partition,
};

/// The states every worker of a run goes through, in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    Partitioned,
    Distributed,
    Computed,
    Collected,
    Finalized,
    ShutDown,
}

/// The coordinator's result of a run.
#[derive(Debug, Clone)]
pub struct Finished<O> {
    pub outcome: O,
    pub worker_count: usize,
    /// From the barrier opening distribution until collection is over.
    pub elapsed: Duration,
}

struct Tracker {
    worker_id: usize,
    phase: Phase,
}

impl Tracker {
    fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            phase: Phase::Init,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "{:?} can't follow {:?}", next, self.phase);
        debug!(worker_id = self.worker_id; "{:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}

/// Runs `kernel` through the whole pipeline on this worker.
///
/// Every member of `group` must call this with an equivalent kernel, the collective
/// calls are issued in the same order on all of them.
///
/// # Args
/// * `group` - This worker's end of the collective channel.
/// * `kernel` - The task to run.
///
/// # Returns
/// `Some` with the final answer at the coordinator, `None` everywhere else.
///
/// # Errors
/// Any error is terminal for the run, nothing is retried. A local failure is sent to
/// the rest of the group as an abort. The coordinator also forwards aborts it
/// receives, so every member fails with the reason of the one that failed first.
pub async fn execute<K, C>(group: &mut C, kernel: &K) -> Result<Option<Finished<K::Outcome>>>
where
    K: Kernel,
    C: Collective + Send,
{
    let res = pipeline(group, kernel).await;

    if let Err(e) = &res {
        let worker_id = group.worker_id();
        error!(worker_id; "run failed: {e}");

        match e {
            SpmdErr::Remote(reason) if group.is_coordinator() => group.abort(reason).await,
            SpmdErr::Remote(_) => {}
            e => group.abort(&format!("worker {worker_id}: {e}")).await,
        }
    }

    res
}

async fn pipeline<K, C>(group: &mut C, kernel: &K) -> Result<Option<Finished<K::Outcome>>>
where
    K: Kernel,
    C: Collective + Send,
{
    let worker_id = group.worker_id();
    let worker_count = group.worker_count();
    let mut tracker = Tracker::new(worker_id);

    kernel.validate(worker_count)?;
    let global = if group.is_coordinator() {
        Some(kernel.prepare()?)
    } else {
        None
    };
    let partition = Partition::new(kernel.total_work(worker_count), worker_count, worker_id);
    tracker.advance(Phase::Partitioned);

    group.barrier().await?;
    let start = Instant::now();
    let local = kernel.distribute(group, &partition, global.as_ref()).await?;
    tracker.advance(Phase::Distributed);

    let estimate = kernel.compute(&partition, local)?;
    println!("{}", kernel.describe(&partition, &estimate));
    tracker.advance(Phase::Computed);

    group.barrier().await?;
    let collected = kernel.collect(group, estimate).await?;
    let elapsed = start.elapsed();
    tracker.advance(Phase::Collected);

    let finished = match (global, collected) {
        (Some(global), Some(collected)) => Some(Finished {
            outcome: kernel.finalize(global, collected, worker_count)?,
            worker_count,
            elapsed,
        }),
        _ => None,
    };
    tracker.advance(Phase::Finalized);

    group.shutdown().await?;
    tracker.advance(Phase::ShutDown);

    Ok(finished)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use futures::future::try_join_all;

    use super::*;
    use crate::{
        collective::local_group,
        kernel::{MonteCarloKernel, RangeSumKernel},
    };

    #[test]
    fn phases_are_ordered() {
        assert!(Phase::Init < Phase::Partitioned);
        assert!(Phase::Collected < Phase::Finalized);
        assert!(Phase::Finalized < Phase::ShutDown);
    }

    #[tokio::test]
    async fn only_the_coordinator_finishes_with_an_answer() {
        let members = local_group(NonZeroUsize::new(3).unwrap());

        let results = try_join_all(
            members
                .into_iter()
                .map(|mut g| async move { execute(&mut g, &RangeSumKernel::new(10)).await }),
        )
        .await
        .unwrap();

        let finished = results[0].as_ref().unwrap();
        assert_eq!(finished.outcome.sum, 55);
        assert_eq!(finished.worker_count, 3);
        assert!(results[1].is_none() && results[2].is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn members_can_run_on_a_work_stealing_runtime() {
        let handles: Vec<_> = local_group(NonZeroUsize::new(3).unwrap())
            .into_iter()
            .map(|mut g| {
                tokio::spawn(async move {
                    let kernel = MonteCarloKernel::new(3_000, Some(5));
                    execute(&mut g, &kernel).await.map(|f| f.map(|f| f.outcome.seed))
                })
            })
            .collect();

        let seeds = try_join_all(handles).await.unwrap();
        assert!(seeds.iter().all(Result::is_ok));
        assert_eq!(seeds[0].as_ref().unwrap(), &Some(5));
    }

    #[tokio::test]
    async fn failed_preconditions_stop_every_worker_before_communicating() {
        let members = local_group(NonZeroUsize::new(4).unwrap());
        let kernel = MonteCarloKernel::new(2, Some(1));

        let results: Vec<_> = futures::future::join_all(
            members.into_iter().map(|mut g| {
                let kernel = kernel.clone();
                async move { execute(&mut g, &kernel).await }
            }),
        )
        .await;

        assert!(
            results
                .iter()
                .all(|r| matches!(r, Err(SpmdErr::InvalidConfig(_))))
        );
    }
}
