use thiserror::Error;

use crate::math::axis::Axis3;

/// Errors raised by coordinate packers and the maps built on top of them.
///
/// All of them are precondition violations that are detected eagerly; a map is never left in a
/// partially modified state.
#[derive(Clone, Copy, Debug, Error, Hash, PartialEq, Eq)]
pub enum MapError {
    /// A span given at construction was zero or negative.
    #[error("span along the {axis:?} axis must be positive, got {span}")]
    InvalidSpan { axis: Axis3, span: i32 },
    /// The spans given at construction need more bits than fit into a packed key.
    #[error("addressing the given spans requires {bits} bits, but packed keys only have 64")]
    CapacityExceeded { bits: u32 },
    /// A function that must produce a value produced none.
    #[error("a value is required, but none was produced")]
    NullValue,
}
