pub mod builder;
pub mod concurrent;
pub mod hash;

use std::ops::Deref;

use glam::IVec3;

use crate::{error::MapError, packing::CoordPacker};

/// A map from integer coordinates to values of type `T`, keyed by a [`CoordPacker`].
///
/// Coordinates are passed as separate `x`, `y` and `z` components and packed into a single [`u64`]
/// before they reach the underlying map. Since packing wraps around, no coordinate is ever
/// rejected, but coordinates that differ by a multiple of the actual width of every axis refer to
/// the same entry. See [`CoordPacker`] for details.
///
/// Functions that visit every entry receive its coordinate unpacked again, i.e. as the
/// representative within the addressable space rather than the coordinate it was inserted with.
/// Functions that are handed a single entry receive the coordinate they were called with.
///
/// Absence is expressed with [`Option`]. Maps that need to tell a present-but-empty value apart from
/// a missing one can store an `Option<U>` and use [`CoordMap::contains_key`].
pub trait CoordMap<T> {
    /// A reference to a value stored in the map.
    type Ref<'a>: Deref<Target = T>
    where
        Self: 'a;

    fn packer(&self) -> &CoordPacker;

    /// The number of entries in the map.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The maximum number of entries that the map can hold; never less than [`CoordMap::len`].
    fn addressable_size(&self) -> u128 {
        self.packer().addressable_size()
    }

    fn get(&self, x: i32, y: i32, z: i32) -> Option<Self::Ref<'_>>;

    fn contains_key(&self, x: i32, y: i32, z: i32) -> bool;

    /// Inserts `value` and returns the value that was previously stored.
    fn insert(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<T>;

    /// Inserts `value` only if no value is stored yet.
    ///
    /// Returns the stored value if there was one, in which case `value` is dropped.
    fn insert_if_absent(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<Self::Ref<'_>>;

    fn remove(&mut self, x: i32, y: i32, z: i32) -> Option<T>;

    /// Removes the entry only if it is equal to `value`.
    fn remove_if_eq(&mut self, x: i32, y: i32, z: i32, value: &T) -> bool
    where
        T: PartialEq;

    /// Returns the stored value, inserting the result of `f` first if there is none.
    ///
    /// `f` is called at most once and only if no value is stored.
    fn compute_if_absent(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> T,
    ) -> Self::Ref<'_>;

    /// Like [`CoordMap::compute_if_absent`], but `f` may fail to produce a value.
    ///
    /// Fails with [`MapError::NullValue`] if `f` is called and returns [`None`], in which case the
    /// map is left unchanged.
    fn try_compute_if_absent(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> Option<T>,
    ) -> Result<Self::Ref<'_>, MapError>;

    /// Replaces a stored value with the result of `f`, removing it if `f` returns [`None`].
    ///
    /// Does nothing and returns [`None`] if no value is stored.
    fn compute_if_present(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, &T) -> Option<T>,
    ) -> Option<Self::Ref<'_>>;

    /// Stores the result of `f`, which receives the current value if there is one.
    ///
    /// If `f` returns [`None`], the entry is removed (or stays absent).
    fn compute(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, Option<&T>) -> Option<T>,
    ) -> Option<Self::Ref<'_>>;

    /// Inserts `value` if no value is stored, otherwise stores `f(current, value)`.
    ///
    /// If `f` returns [`None`], the entry is removed.
    fn merge(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        value: T,
        f: impl FnOnce(&T, T) -> Option<T>,
    ) -> Option<Self::Ref<'_>>;

    /// Replaces the stored value, but only if there is one.
    fn replace(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<T>;

    /// Replaces the stored value with `new`, but only if it is equal to `old`.
    fn replace_if_eq(&mut self, x: i32, y: i32, z: i32, old: &T, new: T) -> bool
    where
        T: PartialEq;

    /// Replaces every value with the result of `f`.
    fn replace_all(&mut self, f: impl FnMut(i32, i32, i32, &T) -> T);

    /// Keeps only the entries for which `f` returns `true`.
    fn retain(&mut self, f: impl FnMut(i32, i32, i32, &mut T) -> bool);

    /// Calls `f` once for every entry, in no particular order.
    fn for_each(&self, f: impl FnMut(i32, i32, i32, &T));

    fn contains_value(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        let mut found = false;
        self.for_each(|_, _, _, other| found |= other == value);
        found
    }

    fn clear(&mut self);

    fn get_at(&self, pos: IVec3) -> Option<Self::Ref<'_>> {
        self.get(pos.x, pos.y, pos.z)
    }

    fn contains_key_at(&self, pos: IVec3) -> bool {
        self.contains_key(pos.x, pos.y, pos.z)
    }

    fn insert_at(&mut self, pos: IVec3, value: T) -> Option<T> {
        self.insert(pos.x, pos.y, pos.z, value)
    }

    fn remove_at(&mut self, pos: IVec3) -> Option<T> {
        self.remove(pos.x, pos.y, pos.z)
    }
}

#[cfg(test)]
mod tests {
    use glam::ivec3;

    use super::{concurrent::ConcurrentHashCoordMap, hash::HashCoordMap, *};

    /// Counts how often each wrapped coordinate of a `4x4x4` grid is hit by the given points.
    fn count_hits<M: CoordMap<u32>>(map: &mut M, points: impl IntoIterator<Item = IVec3>) {
        for pos in points {
            map.compute(pos.x, pos.y, pos.z, |_, _, _, count| {
                Some(count.copied().unwrap_or(0) + 1)
            });
        }
    }

    fn exercise<M: CoordMap<u32>>(mut map: M) {
        assert!(map.is_empty());
        assert_eq!(map.addressable_size(), 64);

        count_hits(&mut map, [ivec3(0, 0, 0), ivec3(4, 0, 0), ivec3(1, 2, 3)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(0, 0, 0).as_deref(), Some(&2));
        assert_eq!(map.get_at(ivec3(-3, 2, -1)).as_deref(), Some(&1));
        assert!(map.contains_value(&2));
        assert!(!map.contains_value(&3));

        assert_eq!(map.insert_at(ivec3(3, 3, 3), 7), None);
        assert!(map.contains_key_at(ivec3(-1, -1, -1)));
        assert_eq!(map.remove_at(ivec3(7, 7, 7)), Some(7));

        let mut visited = Vec::new();
        map.for_each(|x, y, z, &count| visited.push((ivec3(x, y, z), count)));
        visited.sort_by_key(|&(pos, _)| pos.to_array());
        assert_eq!(visited, [(ivec3(0, 0, 0), 2), (ivec3(1, 2, 3), 1)]);

        map.replace_all(|x, _, _, &count| count * 10 + x as u32);
        assert_eq!(map.get(0, 0, 0).as_deref(), Some(&20));
        assert_eq!(map.get(1, 2, 3).as_deref(), Some(&11));

        map.retain(|_, _, _, count| *count > 15);
        assert_eq!(map.len(), 1);

        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn hash_map_contract() {
        exercise(HashCoordMap::new(IVec3::ZERO, IVec3::splat(4)).unwrap());
    }

    #[test]
    fn concurrent_map_contract() {
        exercise(ConcurrentHashCoordMap::new(IVec3::ZERO, IVec3::splat(4)).unwrap());
    }
}
