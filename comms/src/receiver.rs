use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Deserialize, FrameLen, FrameWord, MAX_FRAME_LEN, PREFIX_SIZE};

/// Reads frames from one link.
pub struct FrameReceiver<R: AsyncRead + Unpin> {
    rx: R,
}

impl<R: AsyncRead + Unpin> FrameReceiver<R> {
    pub(super) fn new(rx: R) -> Self {
        Self { rx }
    }

    /// Waits for the next frame and decodes its body out of `buf`.
    ///
    /// # Arguments
    /// * `buf` - Scratch storage for the body. The decoded `T` borrows from it, and
    ///           its word type decides how the body is aligned.
    ///
    /// # Errors
    /// `UnexpectedEof` if the link closes mid frame, `InvalidData` if the length
    /// prefix is past `MAX_FRAME_LEN` or the body doesn't decode.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: FrameWord,
    {
        let mut prefix = [0; PREFIX_SIZE];
        self.rx.read_exact(&mut prefix).await?;

        let body_len = usize::try_from(FrameLen::from_be_bytes(prefix))
            .ok()
            .filter(|&len| len <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "frame length prefix out of bounds")
            })?;

        buf.clear();
        buf.resize(body_len.div_ceil(size_of::<B>()), bytemuck::Zeroable::zeroed());

        let body = &mut bytemuck::cast_slice_mut::<B, u8>(buf)[..body_len];
        self.rx.read_exact(body).await?;

        T::deserialize(body)
    }
}
