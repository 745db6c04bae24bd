use super::Kernel;
use crate::{
    collective::{COORDINATOR, Collective},
    error::{Result, SpmdErr},
    partition::Partition,
};

/// The payload the coordinator broadcasts to greet the group.
pub const GREETING: [i64; 5] = [1, 2, 3, 4, 5];

/// Every worker introduces itself and acknowledges the coordinator's greeting.
#[derive(Debug, Clone, Default)]
pub struct HelloKernel;

/// What a worker knows once greeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub worker_id: usize,
    pub worker_count: usize,
    pub host: String,
    pub numbers: Vec<i64>,
}

/// The coordinator's view of the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloOutcome {
    pub greeting: Vec<i64>,
    /// Worker ids in the order they were gathered.
    pub roster: Vec<i64>,
}

/// The machine's host name, `localhost` if the OS won't tell or it isn't UTF-8.
fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

impl Kernel for HelloKernel {
    type Global = Vec<i64>;
    type Local = Greeting;
    type Estimate = Greeting;
    type Collected = Vec<i64>;
    type Outcome = HelloOutcome;

    fn total_work(&self, worker_count: usize) -> u64 {
        worker_count as u64
    }

    fn prepare(&self) -> Result<Vec<i64>> {
        Ok(GREETING.to_vec())
    }

    async fn distribute<C>(
        &self,
        group: &mut C,
        _partition: &Partition,
        global: Option<&Vec<i64>>,
    ) -> Result<Greeting>
    where
        C: Collective + Send,
    {
        let mut numbers = global.cloned().unwrap_or_else(|| vec![0; GREETING.len()]);
        group.broadcast(&mut numbers, COORDINATOR).await?;

        Ok(Greeting {
            worker_id: group.worker_id(),
            worker_count: group.worker_count(),
            host: String::new(),
            numbers,
        })
    }

    fn compute(&self, _partition: &Partition, local: Greeting) -> Result<Greeting> {
        if local.numbers != GREETING {
            return Err(SpmdErr::Precondition(format!(
                "worker {} received a corrupted greeting {:?}",
                local.worker_id, local.numbers
            )));
        }

        Ok(Greeting {
            host: host_name(),
            ..local
        })
    }

    fn describe(&self, _partition: &Partition, estimate: &Greeting) -> String {
        format!(
            "hello world from {}, worker {} out of {}, received {:?}",
            estimate.host, estimate.worker_id, estimate.worker_count, estimate.numbers
        )
    }

    async fn collect<C>(
        &self,
        group: &mut C,
        estimate: Greeting,
    ) -> Result<Option<Vec<i64>>>
    where
        C: Collective + Send,
    {
        group.gather(&[estimate.worker_id as i64]).await
    }

    fn finalize(
        &self,
        greeting: Vec<i64>,
        roster: Vec<i64>,
        _worker_count: usize,
    ) -> Result<HelloOutcome> {
        Ok(HelloOutcome { greeting, roster })
    }
}
