//! Blocking group communication among a fixed set of workers.
//!
//! Every operation here is collective: all members of the group must call the same
//! operation, in the same order, exactly once per round. A member that skips or
//! repeats a call leaves the rest of the group waiting forever, the channel has no
//! way of detecting it. The run coordinator is the only place that sequences calls.

mod bootstrap;
mod group;

use comms::Element;

use crate::error::Result;

pub use bootstrap::{LocalGroup, TcpGroup, accept, connect, join, local_group};
pub use group::{Group, Link};

/// The worker that owns the full buffers and produces the final report.
pub const COORDINATOR: usize = 0;

/// The communication primitives the pipeline needs.
///
/// Implementors implement `Collective`, whose futures are `Send`. `LocalCollective`
/// is what callers bound on when the futures stay on one thread.
#[trait_variant::make(Collective: Send)]
pub trait LocalCollective {
    /// This member's identity, in `[0, worker_count)`.
    fn worker_id(&self) -> usize;

    /// The amount of members in the group.
    fn worker_count(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.worker_id() == COORDINATOR
    }

    /// Blocks until every member of the group has reached this call.
    async fn barrier(&mut self) -> Result<()>;

    /// Makes `buf` on every member a copy of `buf` on `root`.
    ///
    /// Returns only once every member holds the same elements.
    ///
    /// # Args
    /// * `buf` - The source at `root`, the destination everywhere else.
    /// * `root` - The member whose contents are replicated.
    ///
    /// # Errors
    /// `LengthMismatch` if the buffers differ in length across the group.
    async fn broadcast<T: Element>(&mut self, buf: &mut [T], root: usize) -> Result<()>;

    /// Splits the coordinator's `source` into `worker_count` chunks of `chunk` elements,
    /// member `i` receives chunk `i`.
    ///
    /// # Args
    /// * `source` - The full buffer, only read at the coordinator.
    /// * `chunk` - The uniform chunk length.
    ///
    /// # Returns
    /// This member's chunk.
    async fn scatter<T: Element>(&mut self, source: Option<&[T]>, chunk: usize) -> Result<Vec<T>>;

    /// Concatenates every member's `local` slice in worker id order at the coordinator.
    ///
    /// # Returns
    /// `Some` with the full buffer at the coordinator, `None` everywhere else.
    async fn gather<T: Element>(&mut self, local: &[T]) -> Result<Option<Vec<T>>>;

    /// Sums every member's `value` at the coordinator, folding in worker id order.
    ///
    /// # Returns
    /// `Some` with the total at the coordinator, `None` everywhere else.
    async fn reduce_sum<T: Element>(&mut self, value: T) -> Result<Option<T>>;

    /// Tears the group down, every member has to call it.
    async fn shutdown(&mut self) -> Result<()>;

    /// Best-effort notification to the reachable members that this one is giving up.
    async fn abort(&mut self, reason: &str);
}
