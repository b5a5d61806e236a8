use glam::IVec3;

use super::{concurrent::ConcurrentHashCoordMap, hash::HashCoordMap};
use crate::{error::MapError, math::bounds::IBounds3, packing::CoordPacker};

/// Collects the layout and sizing hints for a coordinate map before creating it.
///
/// The layout is only validated once one of the `build` functions is called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct CoordMapBuilder {
    origin: IVec3,
    span: IVec3,
    capacity: usize,
    shard_amount: Option<usize>,
}

impl CoordMapBuilder {
    pub fn new(origin: IVec3, span: IVec3) -> Self {
        Self {
            origin,
            span,
            capacity: 0,
            shard_amount: None,
        }
    }

    pub fn from_bounds(bounds: IBounds3) -> Self {
        Self::new(bounds.origin(), bounds.lengths())
    }

    /// The number of entries the map should have room for without reallocating.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// The number of shards of a [`ConcurrentHashCoordMap`]; ignored by other maps.
    ///
    /// # Panics
    ///
    /// Panics if `shard_amount` is not a power of two greater than one.
    pub fn shard_amount(mut self, shard_amount: usize) -> Self {
        assert!(shard_amount > 1, "shard amount must be greater than one");
        assert!(
            shard_amount.is_power_of_two(),
            "shard amount must be a power of two"
        );
        self.shard_amount = Some(shard_amount);
        self
    }

    pub fn packer(&self) -> Result<CoordPacker, MapError> {
        CoordPacker::new(self.origin, self.span)
    }

    pub fn build_hash<T>(self) -> Result<HashCoordMap<T>, MapError> {
        Ok(HashCoordMap::with_packer(self.packer()?, self.capacity))
    }

    pub fn build_concurrent<T>(self) -> Result<ConcurrentHashCoordMap<T>, MapError> {
        let packer = self.packer()?;
        Ok(match self.shard_amount {
            Some(shard_amount) => {
                ConcurrentHashCoordMap::with_shard_amount(packer, self.capacity, shard_amount)
            }
            None => ConcurrentHashCoordMap::with_packer(packer, self.capacity),
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::ivec3;

    use super::*;
    use crate::math::axis::Axis3;

    #[test]
    fn builds_both_maps_with_same_layout() {
        let builder = CoordMapBuilder::new(ivec3(-8, 0, 8), ivec3(16, 2, 3)).capacity(32);

        let hash = builder.build_hash::<u8>().unwrap();
        let concurrent = builder.shard_amount(8).build_concurrent::<u8>().unwrap();

        assert_eq!(hash.packer(), concurrent.packer());
        assert_eq!(hash.origin(), ivec3(-8, 0, 8));
        assert!(hash.capacity() >= 32);
        assert_eq!(concurrent.addressable_size(), 16 * 2 * 4);
    }

    #[test]
    fn from_bounds() {
        let bounds = IBounds3::new(ivec3(1, 2, 3), ivec3(4, 5, 6));
        let builder = CoordMapBuilder::from_bounds(bounds);
        assert_eq!(builder, CoordMapBuilder::new(ivec3(1, 2, 3), ivec3(4, 5, 6)));
        assert_eq!(builder.packer(), CoordPacker::from_bounds(bounds));
    }

    #[test]
    fn invalid_layouts_fail_on_build() {
        let builder = CoordMapBuilder::new(IVec3::ZERO, ivec3(1, -1, 1));
        assert_eq!(
            builder.build_hash::<()>().err(),
            Some(MapError::InvalidSpan {
                axis: Axis3::Y,
                span: -1
            })
        );

        let builder = CoordMapBuilder::new(IVec3::ZERO, IVec3::splat(i32::MAX)).capacity(1);
        assert_eq!(
            builder.build_concurrent::<()>().err(),
            Some(MapError::CapacityExceeded { bits: 93 })
        );
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn shard_amount_must_be_power_of_two() {
        let _ = CoordMapBuilder::new(IVec3::ZERO, IVec3::ONE).shard_amount(12);
    }

    #[test]
    #[should_panic(expected = "greater than one")]
    fn shard_amount_must_exceed_one() {
        let _ = CoordMapBuilder::new(IVec3::ZERO, IVec3::ONE).shard_amount(1);
    }
}
