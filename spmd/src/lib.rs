pub mod aggregate;
pub mod collective;
pub mod config;
pub mod error;
pub mod kernel;
pub mod launch;
pub mod partition;
pub mod report;
pub mod run;
pub mod task;

pub use collective::{COORDINATOR, Collective, LocalCollective};
pub use config::{GroupConfig, RunConfig, TaskKind};
pub use error::{Result, SpmdErr};
pub use launch::{run_local, run_tcp};
pub use partition::Partition;
pub use report::Report;
pub use run::{Finished, Phase, execute};
pub use task::Task;
