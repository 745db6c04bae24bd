use std::{env, io};

use log::info;
use spmd::{GroupConfig, RunConfig, Task, config};
use tokio::runtime;

fn main() -> io::Result<()> {
    env_logger::init();

    let seed = config::seed_from_env()?;
    let run_config = RunConfig::from_args(env::args().skip(1), seed)?;
    let group_config = GroupConfig::from_env()?;
    let task = Task::from_config(&run_config)?;

    info!("starting {} run with work={}", run_config.task, run_config.work);

    let report = match group_config.worker_id {
        None => spmd::run_local(&task, group_config.worker_count)?,
        Some(_) => {
            let rt = runtime::Builder::new_current_thread().enable_all().build()?;
            rt.block_on(spmd::run_tcp(&task, &group_config))?
        }
    };

    if let Some(report) = report {
        println!("{report}");
    }

    Ok(())
}
