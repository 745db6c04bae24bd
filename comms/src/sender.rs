use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{FrameLen, MAX_FRAME_LEN, PREFIX_SIZE, Serialize};

/// Writes frames to one link, reusing a scratch buffer between sends.
pub struct FrameSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    head: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> FrameSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            head: Vec::new(),
        }
    }

    /// Sends `msg` as one frame and flushes the link.
    ///
    /// The owned part of the body goes out through the scratch buffer right after the
    /// length prefix, the borrowed tail is written straight from `msg`.
    ///
    /// # Arguments
    /// * `msg` - The message to frame.
    ///
    /// # Errors
    /// `InvalidInput` if the body is larger than `MAX_FRAME_LEN`, otherwise whatever
    /// the writer fails with.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.head.clear();
        self.head.resize(PREFIX_SIZE, 0);

        let tail = msg.serialize(&mut self.head);
        let body_len = self.head.len() - PREFIX_SIZE + tail.map_or(0, <[u8]>::len);

        if body_len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame body of {body_len} bytes exceeds the {MAX_FRAME_LEN} limit"),
            ));
        }

        self.head[..PREFIX_SIZE].copy_from_slice(&(body_len as FrameLen).to_be_bytes());
        self.tx.write_all(&self.head).await?;

        if let Some(tail) = tail {
            self.tx.write_all(tail).await?;
        }

        self.tx.flush().await
    }
}
