/// Types that can be written into a frame.
pub trait Serialize<'a> {
    /// Writes the owned part of `self` into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The frame buffer, the length prefix is already reserved.
    ///
    /// # Returns
    /// An optional borrowed tail that is written right after `buf` without copying.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
