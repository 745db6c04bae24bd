/// Element type of a receive buffer. The buffer's alignment is the word's, so a
/// `u64` buffer lets 8-byte payloads be cast without copying.
pub trait FrameWord: bytemuck::Pod {}

impl FrameWord for u8 {}
impl FrameWord for u64 {}
