use crate::{
    collective::Collective,
    config::{RunConfig, TaskKind},
    error::{Result, SpmdErr},
    kernel::{HelloKernel, MatMulKernel, MonteCarloKernel, RangeSumKernel},
    report::Report,
    run::execute,
};

/// The task selected at startup, one kernel per variant.
#[derive(Debug, Clone)]
pub enum Task {
    Hello(HelloKernel),
    Sum(RangeSumKernel),
    MatMul(MatMulKernel),
    MonteCarlo(MonteCarloKernel),
}

impl Task {
    /// Builds the task described by `config`.
    ///
    /// # Errors
    /// `InvalidConfig` if the matrix dimension doesn't fit in memory indices.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let task = match config.task {
            TaskKind::Hello => Task::Hello(HelloKernel),
            TaskKind::Sum => Task::Sum(RangeSumKernel::new(config.work)),
            TaskKind::MatMul => {
                let dim = usize::try_from(config.work).map_err(|_| {
                    SpmdErr::InvalidConfig(format!("matrix dimension {} is too large", config.work))
                })?;
                Task::MatMul(MatMulKernel::new(dim, config.seed))
            }
            TaskKind::MonteCarlo => {
                Task::MonteCarlo(MonteCarloKernel::new(config.work, config.seed))
            }
        };

        Ok(task)
    }

    /// Runs the task on this member of `group`.
    ///
    /// # Returns
    /// `Some` report at the coordinator, `None` everywhere else.
    pub async fn run<C: Collective + Send>(&self, group: &mut C) -> Result<Option<Report>> {
        match self {
            Task::Hello(kernel) => execute(group, kernel).await.map(|f| f.map(Report::Hello)),
            Task::Sum(kernel) => execute(group, kernel).await.map(|f| f.map(Report::Sum)),
            Task::MatMul(kernel) => execute(group, kernel).await.map(|f| f.map(Report::MatMul)),
            Task::MonteCarlo(kernel) => {
                execute(group, kernel).await.map(|f| f.map(Report::MonteCarlo))
            }
        }
    }
}
