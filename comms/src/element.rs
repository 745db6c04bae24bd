use std::{fmt::Debug, ops::Add};

use crate::msg::Payload;

/// A numeric type that can travel as a `Payload` and be summed by reductions.
pub trait Element:
    bytemuck::Pod + Add<Output = Self> + Default + Debug + PartialEq + Send + Sync
{
    /// Wraps a slice of `Self` into its payload variant.
    fn payload(nums: &[Self]) -> Payload<'_>;

    /// Returns the inner slice if `payload` carries `Self`.
    fn from_payload(payload: Payload<'_>) -> Option<&[Self]>;
}

impl Element for f64 {
    fn payload(nums: &[Self]) -> Payload<'_> {
        Payload::F64(nums)
    }

    fn from_payload(payload: Payload<'_>) -> Option<&[Self]> {
        match payload {
            Payload::F64(nums) => Some(nums),
            _ => None,
        }
    }
}

impl Element for i64 {
    fn payload(nums: &[Self]) -> Payload<'_> {
        Payload::I64(nums)
    }

    fn from_payload(payload: Payload<'_>) -> Option<&[Self]> {
        match payload {
            Payload::I64(nums) => Some(nums),
            _ => None,
        }
    }
}
