//! Length-prefixed framing for the links between group members.
//!
//! A frame is a big-endian `u64` body length followed by the body. Bodies are
//! read into caller-owned word buffers so numeric payloads can be viewed in place.

mod deserialize;
mod element;
pub mod msg;
mod receiver;
mod sender;
mod serialize;
mod word;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use element::Element;
pub use receiver::FrameReceiver;
pub use sender::FrameSender;
pub use serialize::Serialize;
pub use word::FrameWord;

type FrameLen = u64;
const PREFIX_SIZE: usize = size_of::<FrameLen>();

/// The largest body either end accepts, anything above is treated as corruption.
pub const MAX_FRAME_LEN: usize = 1 << 31;

/// Wraps a reader and a writer into the two ends of a framed link.
///
/// # Arguments
/// * `rx` - Where incoming frames are read from.
/// * `tx` - Where outgoing frames are written to.
///
/// # Returns
/// The receiving and the sending end, usable independently.
pub fn channel<R, W>(rx: R, tx: W) -> (FrameReceiver<R>, FrameSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (FrameReceiver::new(rx), FrameSender::new(tx))
}
