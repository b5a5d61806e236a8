//! Maps from integer 3D coordinates to values, keyed by coordinates packed into a single `u64`.
//!
//! A [`CoordPacker`] decides how many bits each axis gets. Coordinates outside of the span it was
//! created for wrap around instead of being rejected, so every map has a fixed
//! [addressable size](CoordPacker::addressable_size).

pub mod collections;
pub mod error;
pub mod math;
pub mod packing;

pub use collections::{
    builder::CoordMapBuilder, concurrent::ConcurrentHashCoordMap, hash::HashCoordMap, CoordMap,
};
pub use error::MapError;
pub use packing::CoordPacker;
