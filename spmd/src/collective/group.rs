use std::{borrow::Cow, fmt};

use comms::{
    Element, FrameReceiver, FrameSender,
    msg::{Command, Msg},
};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{COORDINATOR, Collective};
use crate::error::{Result, SpmdErr};

/// A bidirectional framed connection to one other member.
pub struct Link<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(super) rx: FrameReceiver<R>,
    pub(super) tx: FrameSender<W>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Link<R, W> {
    pub fn new(rx: R, tx: W) -> Self {
        let (rx, tx) = comms::channel(rx, tx);
        Self { rx, tx }
    }
}

enum Topology<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// The coordinator, `links[i]` leads to worker `i + 1`.
    Hub(Vec<Link<R, W>>),
    /// Any other member, linked to the coordinator only.
    Spoke(Link<R, W>),
}

/// A group member running the collectives over a star of framed links centered on
/// the coordinator.
pub struct Group<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    worker_id: usize,
    worker_count: usize,
    topology: Topology<R, W>,
    buf: Vec<u64>,
}

impl<R, W> fmt::Debug for Group<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("worker_id", &self.worker_id)
            .field("worker_count", &self.worker_count)
            .finish_non_exhaustive()
    }
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Group<R, W> {
    /// Creates the coordinator's end of the group.
    ///
    /// # Args
    /// * `links` - One link per peer, ordered by worker id starting at 1.
    pub fn coordinator(links: Vec<Link<R, W>>) -> Self {
        Self {
            worker_id: COORDINATOR,
            worker_count: links.len() + 1,
            topology: Topology::Hub(links),
            buf: Vec::new(),
        }
    }

    /// Creates a peer's end of the group.
    ///
    /// # Args
    /// * `worker_id` - The peer's id, never the coordinator's.
    /// * `worker_count` - The size of the group.
    /// * `link` - The link to the coordinator.
    pub fn peer(worker_id: usize, worker_count: usize, link: Link<R, W>) -> Self {
        debug_assert!(worker_id != COORDINATOR && worker_id < worker_count);

        Self {
            worker_id,
            worker_count,
            topology: Topology::Spoke(link),
            buf: Vec::new(),
        }
    }

    fn check_root(&self, root: usize) -> Result<()> {
        if root >= self.worker_count {
            return Err(SpmdErr::InvalidConfig(format!(
                "broadcast root {root} out of range for {} workers",
                self.worker_count
            )));
        }

        Ok(())
    }
}

impl<R, W> Collective for Group<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn worker_id(&self) -> usize {
        self.worker_id
    }

    fn worker_count(&self) -> usize {
        self.worker_count
    }

    async fn barrier(&mut self) -> Result<()> {
        match &mut self.topology {
            Topology::Hub(links) => {
                for link in links.iter_mut() {
                    expect(&mut link.rx, &mut self.buf, "barrier", Command::Barrier).await?;
                }

                for link in links.iter_mut() {
                    link.tx.send(&Msg::Control(Command::Release)).await?;
                }
            }
            Topology::Spoke(link) => {
                link.tx.send(&Msg::Control(Command::Barrier)).await?;
                expect(&mut link.rx, &mut self.buf, "barrier", Command::Release).await?;
            }
        }

        Ok(())
    }

    async fn broadcast<T: Element>(&mut self, buf: &mut [T], root: usize) -> Result<()> {
        self.check_root(root)?;

        match &mut self.topology {
            Topology::Hub(links) => {
                if root != COORDINATOR {
                    let got = recv_slice::<T, _>(&mut links[root - 1].rx, &mut self.buf, "broadcast")
                        .await?;
                    check_len("broadcast", got.len(), buf.len())?;
                    buf.copy_from_slice(got);
                }

                for (i, link) in links.iter_mut().enumerate() {
                    if i + 1 != root {
                        link.tx.send(&Msg::Data(T::payload(buf))).await?;
                    }
                }

                for link in links.iter_mut() {
                    expect(&mut link.rx, &mut self.buf, "broadcast", Command::Ack).await?;
                }
            }
            Topology::Spoke(link) => {
                if root == self.worker_id {
                    link.tx.send(&Msg::Data(T::payload(buf))).await?;
                } else {
                    let got = recv_slice::<T, _>(&mut link.rx, &mut self.buf, "broadcast").await?;
                    check_len("broadcast", got.len(), buf.len())?;
                    buf.copy_from_slice(got);
                }

                link.tx.send(&Msg::Control(Command::Ack)).await?;
            }
        }

        Ok(())
    }

    async fn scatter<T: Element>(&mut self, source: Option<&[T]>, chunk: usize) -> Result<Vec<T>> {
        match &mut self.topology {
            Topology::Hub(links) => {
                let source = source.ok_or_else(|| {
                    SpmdErr::InvalidConfig("scatter needs a source buffer at the coordinator".into())
                })?;
                check_len("scatter", source.len(), chunk * self.worker_count)?;

                for (i, link) in links.iter_mut().enumerate() {
                    let start = (i + 1) * chunk;
                    let part = &source[start..start + chunk];
                    link.tx.send(&Msg::Data(T::payload(part))).await?;
                }

                Ok(source[..chunk].to_vec())
            }
            Topology::Spoke(link) => {
                let got = recv_slice::<T, _>(&mut link.rx, &mut self.buf, "scatter").await?;
                check_len("scatter", got.len(), chunk)?;
                Ok(got.to_vec())
            }
        }
    }

    async fn gather<T: Element>(&mut self, local: &[T]) -> Result<Option<Vec<T>>> {
        match &mut self.topology {
            Topology::Hub(links) => {
                let mut full = Vec::with_capacity(local.len() * self.worker_count);
                full.extend_from_slice(local);

                for link in links.iter_mut() {
                    let got = recv_slice::<T, _>(&mut link.rx, &mut self.buf, "gather").await?;
                    check_len("gather", got.len(), local.len())?;
                    full.extend_from_slice(got);
                }

                Ok(Some(full))
            }
            Topology::Spoke(link) => {
                link.tx.send(&Msg::Data(T::payload(local))).await?;
                Ok(None)
            }
        }
    }

    async fn reduce_sum<T: Element>(&mut self, value: T) -> Result<Option<T>> {
        match &mut self.topology {
            Topology::Hub(links) => {
                let mut total = value;

                for link in links.iter_mut() {
                    let got = recv_slice::<T, _>(&mut link.rx, &mut self.buf, "reduce").await?;
                    check_len("reduce", got.len(), 1)?;
                    total = total + got[0];
                }

                Ok(Some(total))
            }
            Topology::Spoke(link) => {
                link.tx.send(&Msg::Data(T::payload(&[value]))).await?;
                Ok(None)
            }
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        match &mut self.topology {
            Topology::Hub(links) => {
                for link in links.iter_mut() {
                    expect(&mut link.rx, &mut self.buf, "shutdown", Command::Disconnect).await?;
                }

                for link in links.iter_mut() {
                    link.tx.send(&Msg::Control(Command::Disconnect)).await?;
                }
            }
            Topology::Spoke(link) => {
                link.tx.send(&Msg::Control(Command::Disconnect)).await?;
                expect(&mut link.rx, &mut self.buf, "shutdown", Command::Disconnect).await?;
            }
        }

        debug!(worker_id = self.worker_id; "group shut down");
        Ok(())
    }

    async fn abort(&mut self, reason: &str) {
        let msg = Msg::Err(Cow::Borrowed(reason));
        let links = match &mut self.topology {
            Topology::Hub(links) => links.as_mut_slice(),
            Topology::Spoke(link) => std::slice::from_mut(link),
        };

        for link in links {
            if let Err(e) = link.tx.send(&msg).await {
                warn!(worker_id = self.worker_id; "failed to notify abort: {e}");
            }
        }
    }
}

/// Receives the next message, turning an error frame into `SpmdErr::Remote`.
pub(super) async fn recv<'buf, R: AsyncRead + Unpin>(
    rx: &mut FrameReceiver<R>,
    buf: &'buf mut Vec<u64>,
) -> Result<Msg<'buf>> {
    let msg: Msg = rx.recv_into(buf).await?;

    if let Msg::Err(reason) = &msg {
        return Err(SpmdErr::Remote(reason.to_string()));
    }

    Ok(msg)
}

pub(super) fn unexpected(op: &'static str, expected: &'static str, got: &Msg<'_>) -> SpmdErr {
    SpmdErr::UnexpectedMessage {
        op,
        expected,
        got: got.kind(),
    }
}

async fn expect<R: AsyncRead + Unpin>(
    rx: &mut FrameReceiver<R>,
    buf: &mut Vec<u64>,
    op: &'static str,
    expected: Command,
) -> Result<()> {
    match recv(rx, buf).await? {
        Msg::Control(cmd) if cmd == expected => Ok(()),
        other => Err(unexpected(op, command_name(&expected), &other)),
    }
}

async fn recv_slice<'buf, T: Element, R: AsyncRead + Unpin>(
    rx: &mut FrameReceiver<R>,
    buf: &'buf mut Vec<u64>,
    op: &'static str,
) -> Result<&'buf [T]> {
    match recv(rx, buf).await? {
        Msg::Data(payload) => T::from_payload(payload).ok_or(SpmdErr::UnexpectedMessage {
            op,
            expected: "numeric data of the requested type",
            got: payload.kind(),
        }),
        other => Err(unexpected(op, "data", &other)),
    }
}

fn check_len(op: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(SpmdErr::LengthMismatch { op, got, expected });
    }

    Ok(())
}

fn command_name(cmd: &Command) -> &'static str {
    match cmd {
        Command::Join { .. } => "join",
        Command::Welcome { .. } => "welcome",
        Command::Barrier => "barrier",
        Command::Release => "release",
        Command::Ack => "ack",
        Command::Disconnect => "disconnect",
    }
}
