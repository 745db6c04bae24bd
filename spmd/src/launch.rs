//! Launchers for the two ways a group comes to be: threads in one process, or
//! one process per worker over TCP.

use std::{io, num::NonZeroUsize, thread};

use log::{info, warn};
use tokio::runtime;

use crate::{
    collective::{self, Collective, LocalGroup},
    config::GroupConfig,
    error::{Result, SpmdErr},
    report::Report,
    task::Task,
};

/// Runs `task` on `worker_count` workers inside this process.
///
/// Every worker gets its own thread and its own single threaded runtime, so the
/// workers proceed independently between collective calls.
///
/// # Returns
/// The coordinator's report.
///
/// # Errors
/// The failure that brought the run down, see [`root_cause`].
pub fn run_local(task: &Task, worker_count: NonZeroUsize) -> Result<Option<Report>> {
    info!(worker_count = worker_count.get(); "launching local group");

    let results = on_threads(worker_count, |mut group| {
        let rt = runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        rt.block_on(task.run(&mut group))
    })?;

    let mut report = None;
    let mut errors = Vec::new();

    for res in results {
        match res {
            Ok(Some(r)) => report = Some(r),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }

    match root_cause(errors) {
        Some(e) => Err(e),
        None => Ok(report),
    }
}

/// Runs `body` once per member of a local group, each on its own named thread.
///
/// # Returns
/// Every member's result, indexed by worker id.
///
/// # Errors
/// If a thread couldn't be spawned.
fn on_threads<T, F>(worker_count: NonZeroUsize, body: F) -> Result<Vec<Result<Option<T>>>>
where
    T: Send,
    F: Fn(LocalGroup) -> Result<Option<T>> + Sync,
{
    let groups = collective::local_group(worker_count);
    let body = &body;

    thread::scope(|s| {
        let handles = groups
            .into_iter()
            .map(|group| {
                thread::Builder::new()
                    .name(format!("worker-{}", group.worker_id()))
                    .spawn_scoped(s, move || body(group))
            })
            .collect::<io::Result<Vec<_>>>()?;

        let results = handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::other("worker thread panicked").into()))
            })
            .collect();

        Ok(results)
    })
}

/// Picks the error that explains a failed run out of every member's error.
///
/// A member that failed on its own wins over one that was told to abort, and both
/// win over one that only saw its peers hang up.
fn root_cause(errors: Vec<SpmdErr>) -> Option<SpmdErr> {
    let rank = |e: &SpmdErr| match e {
        SpmdErr::Io(e) if is_disconnect(e) => 2,
        SpmdErr::Remote(_) => 1,
        _ => 0,
    };

    errors.into_iter().min_by_key(rank)
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

/// Joins the TCP group described by `config` and runs `task` as its member.
///
/// # Errors
/// Anything forming the group or running the task fails with.
pub async fn run_tcp(task: &Task, config: &GroupConfig) -> Result<Option<Report>> {
    let mut group = collective::connect(config).await?;
    info!(worker_id = group.worker_id(), worker_count = group.worker_count(); "joined group");

    let res = task.run(&mut group).await;
    if res.is_err() {
        warn!(worker_id = group.worker_id(); "leaving group after a failed run");
    }

    res
}
