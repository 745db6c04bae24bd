use std::{env, fmt, num::NonZeroUsize, str::FromStr, time::Duration};

use crate::error::{Result, SpmdErr};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7070;
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_CONNECT_RETRIES: usize = 50;
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// The numeric task the group runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Hello,
    Sum,
    MatMul,
    MonteCarlo,
}

impl TaskKind {
    /// The amount of work used when none is given on the command line.
    pub fn default_work(self) -> u64 {
        match self {
            TaskKind::Hello => 0,
            TaskKind::Sum => 1_000_000,
            TaskKind::MatMul => 800,
            TaskKind::MonteCarlo => 100_000_000,
        }
    }
}

impl FromStr for TaskKind {
    type Err = SpmdErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hello" => Ok(TaskKind::Hello),
            "sum" => Ok(TaskKind::Sum),
            "matmul" => Ok(TaskKind::MatMul),
            "montecarlo" | "pi" => Ok(TaskKind::MonteCarlo),
            other => Err(SpmdErr::InvalidConfig(format!(
                "unknown task {other:?}, expected one of hello, sum, matmul, montecarlo"
            ))),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::Hello => "hello",
            TaskKind::Sum => "sum",
            TaskKind::MatMul => "matmul",
            TaskKind::MonteCarlo => "montecarlo",
        })
    }
}

/// What to run, identical on every worker of the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub task: TaskKind,
    /// Total work units: range length, samples, or the matrix dimension.
    pub work: u64,
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Parses `<task> [count]` from the program arguments, without the program name.
    ///
    /// # Args
    /// * `args` - The positional arguments.
    /// * `seed` - The optional seed shared by the group.
    ///
    /// # Errors
    /// Returns `InvalidConfig` on an unknown task, a malformed count or extra arguments.
    pub fn from_args<I, S>(args: I, seed: Option<u64>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();

        let task: TaskKind = match args.next() {
            Some(task) => task.as_ref().parse()?,
            None => {
                return Err(SpmdErr::InvalidConfig(
                    "missing task, usage: spmd <hello|sum|matmul|montecarlo> [count]".into(),
                ));
            }
        };

        let work = match args.next() {
            Some(count) => parse_var("count", count.as_ref())?,
            None => task.default_work(),
        };

        if let Some(extra) = args.next() {
            return Err(SpmdErr::InvalidConfig(format!(
                "unexpected argument {:?}",
                extra.as_ref()
            )));
        }

        Ok(Self { task, work, seed })
    }
}

/// How this process joins its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConfig {
    pub worker_count: NonZeroUsize,
    /// `None` launches the whole group inside this process.
    pub worker_id: Option<usize>,
    pub addr: String,
    pub connect_retries: usize,
}

impl GroupConfig {
    /// Reads the group configuration from the environment.
    ///
    /// * `WORKER_COUNT` - Size of the group, defaults to 4.
    /// * `WORKER_ID` - This process' id; when unset the group runs locally.
    /// * `HOST`, `PORT` - The coordinator's address.
    /// * `CONNECT_RETRIES` - Connection attempts of a peer before giving up.
    ///
    /// # Errors
    /// Returns `InvalidConfig` on malformed or out of range values.
    pub fn from_env() -> Result<Self> {
        let worker_count: usize = env_or("WORKER_COUNT", DEFAULT_WORKER_COUNT)?;
        let worker_count = NonZeroUsize::new(worker_count)
            .ok_or_else(|| SpmdErr::InvalidConfig("WORKER_COUNT must be positive".into()))?;

        let worker_id = match env::var("WORKER_ID") {
            Ok(id) => Some(parse_var("WORKER_ID", &id)?),
            Err(_) => None,
        };

        if let Some(id) = worker_id.filter(|&id| id >= worker_count.get()) {
            return Err(SpmdErr::InvalidConfig(format!(
                "WORKER_ID {id} out of range for {worker_count} workers"
            )));
        }

        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port: u16 = env_or("PORT", DEFAULT_PORT)?;

        Ok(Self {
            worker_count,
            worker_id,
            addr: format!("{host}:{port}"),
            connect_retries: env_or("CONNECT_RETRIES", DEFAULT_CONNECT_RETRIES)?,
        })
    }
}

/// Reads the optional `SEED` variable.
pub fn seed_from_env() -> Result<Option<u64>> {
    match env::var("SEED") {
        Ok(seed) => Ok(Some(parse_var("SEED", &seed)?)),
        Err(_) => Ok(None),
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => parse_var(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SpmdErr::InvalidConfig(format!("{name}: can't parse {value:?}")))
}
