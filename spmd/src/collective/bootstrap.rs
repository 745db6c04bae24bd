//! Process group setup, the `groupInit` side of a run.

use std::num::NonZeroUsize;

use comms::msg::{Command, Msg};
use log::{debug, info};
use tokio::{
    io::{self, DuplexStream, ReadHalf, WriteHalf},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time,
};

use super::{
    COORDINATOR, Group, Link,
    group::{recv, unexpected},
};
use crate::{
    config::{CONNECT_RETRY_DELAY, GroupConfig},
    error::{Result, SpmdErr},
};

/// A group member linked through in-memory pipes.
pub type LocalGroup = Group<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// A group member linked through TCP.
pub type TcpGroup = Group<OwnedReadHalf, OwnedWriteHalf>;

const LOCAL_LINK_CAPACITY: usize = 1 << 16;

/// Builds every member of a group living in this process.
///
/// # Args
/// * `worker_count` - The size of the group.
///
/// # Returns
/// The members, indexed by worker id.
pub fn local_group(worker_count: NonZeroUsize) -> Vec<LocalGroup> {
    let count = worker_count.get();
    let mut hub_links = Vec::with_capacity(count - 1);
    let mut peers = Vec::with_capacity(count - 1);

    for worker_id in 1..count {
        let (hub_end, peer_end) = io::duplex(LOCAL_LINK_CAPACITY);

        let (rx, tx) = io::split(hub_end);
        hub_links.push(Link::new(rx, tx));

        let (rx, tx) = io::split(peer_end);
        peers.push(Group::peer(worker_id, count, Link::new(rx, tx)));
    }

    let mut members = Vec::with_capacity(count);
    members.push(Group::coordinator(hub_links));
    members.extend(peers);
    members
}

/// Joins or forms the TCP group described by `config`.
///
/// The coordinator binds `config.addr` and waits for every peer, the rest connect to it.
///
/// # Errors
/// `InvalidConfig` if `config` has no worker id, plus anything `accept` or `join` fail with.
pub async fn connect(config: &GroupConfig) -> Result<TcpGroup> {
    let worker_count = config.worker_count.get();
    let worker_id = config.worker_id.ok_or_else(|| {
        SpmdErr::InvalidConfig("a TCP group member needs a WORKER_ID".into())
    })?;

    if worker_id == COORDINATOR {
        let listener = TcpListener::bind(&config.addr).await?;
        info!("coordinator listening at {}", config.addr);
        accept(listener, worker_count).await
    } else {
        join(&config.addr, worker_id, worker_count, config.connect_retries).await
    }
}

/// Accepts `worker_count - 1` peers on `listener` and welcomes them once all joined.
///
/// # Errors
/// `InvalidConfig` if a peer claims an id out of range or already taken,
/// `UnexpectedMessage` if it doesn't start with a join request.
pub async fn accept(listener: TcpListener, worker_count: usize) -> Result<TcpGroup> {
    let mut slots: Vec<Option<Link<_, _>>> = (1..worker_count).map(|_| None).collect();
    let mut buf = Vec::new();

    for joined in 0..slots.len() {
        debug!("waiting for peers: joined={joined} expected={}", slots.len());

        let (stream, addr) = listener.accept().await?;
        stream.set_nodelay(true)?;
        let (rx, tx) = stream.into_split();
        let mut link = Link::new(rx, tx);

        let worker_id = match recv(&mut link.rx, &mut buf).await? {
            Msg::Control(Command::Join { worker_id }) => worker_id,
            other => return Err(unexpected("join", "join", &other)),
        };

        if worker_id == COORDINATOR || worker_id >= worker_count {
            return Err(SpmdErr::InvalidConfig(format!(
                "peer at {addr} claims id {worker_id}, valid ids are 1..{worker_count}"
            )));
        }

        let slot = &mut slots[worker_id - 1];
        if slot.is_some() {
            return Err(SpmdErr::InvalidConfig(format!(
                "peer at {addr} claims id {worker_id} which already joined"
            )));
        }

        info!(worker_id = worker_id; "peer joined from {addr}");
        *slot = Some(link);
    }

    let mut links: Vec<_> = slots.into_iter().flatten().collect();
    for link in &mut links {
        link.tx
            .send(&Msg::Control(Command::Welcome { worker_count }))
            .await?;
    }

    Ok(Group::coordinator(links))
}

/// Connects to the coordinator at `addr` and asks to join as `worker_id`.
///
/// # Errors
/// `InvalidConfig` if the coordinator runs a group of another size, `Io` once every
/// connection attempt failed.
pub async fn join(
    addr: &str,
    worker_id: usize,
    worker_count: usize,
    retries: usize,
) -> Result<TcpGroup> {
    let stream = connect_with_retries(addr, retries).await?;
    stream.set_nodelay(true)?;
    let (rx, tx) = stream.into_split();
    let mut link = Link::new(rx, tx);

    link.tx
        .send(&Msg::Control(Command::Join { worker_id }))
        .await?;

    let mut buf = Vec::new();
    match recv(&mut link.rx, &mut buf).await? {
        Msg::Control(Command::Welcome { worker_count: theirs }) if theirs == worker_count => {}
        Msg::Control(Command::Welcome { worker_count: theirs }) => {
            return Err(SpmdErr::InvalidConfig(format!(
                "coordinator runs {theirs} workers, this member expects {worker_count}"
            )));
        }
        other => return Err(unexpected("join", "welcome", &other)),
    }

    info!(worker_id = worker_id; "joined group of {worker_count} at {addr}");
    Ok(Group::peer(worker_id, worker_count, link))
}

async fn connect_with_retries(addr: &str, retries: usize) -> Result<TcpStream> {
    let mut attempt = 0;

    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) if attempt < retries => {
                attempt += 1;
                debug!("connecting to {addr} failed ({e}), attempt {attempt}/{retries}");
                time::sleep(CONNECT_RETRY_DELAY).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
