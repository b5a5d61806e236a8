use std::{
    collections::hash_map::{self, Entry, HashMap},
    fmt,
    hash::BuildHasherDefault,
    iter::FusedIterator,
    mem,
};

use derive_where::derive_where;
use glam::IVec3;
use rustc_hash::FxHasher;
use tracing::trace;

use super::CoordMap;
use crate::{error::MapError, math::bounds::IBounds3, packing::CoordPacker};

type PackedMap<T> = HashMap<u64, T, BuildHasherDefault<FxHasher>>;

/// A [`CoordMap`] backed by a [`HashMap`] from packed keys to values.
///
/// Not synchronized in any way; see
/// [`ConcurrentHashCoordMap`](super::concurrent::ConcurrentHashCoordMap) for a map that can be
/// shared between threads.
#[derive(Clone, PartialEq, Eq)]
pub struct HashCoordMap<T> {
    packer: CoordPacker,
    map: PackedMap<T>,
}

impl<T> HashCoordMap<T> {
    /// Creates an empty map for coordinates relative to `origin` with room for at least `span`
    /// unique coordinates along each axis.
    ///
    /// See [`CoordPacker::new`] for when this fails.
    pub fn new(origin: IVec3, span: IVec3) -> Result<Self, MapError> {
        Self::with_capacity(origin, span, 0)
    }

    /// Like [`Self::new`], but preallocates room for `capacity` entries.
    pub fn with_capacity(origin: IVec3, span: IVec3, capacity: usize) -> Result<Self, MapError> {
        Ok(Self::with_packer(CoordPacker::new(origin, span)?, capacity))
    }

    /// Creates an empty map covering at least the given `bounds`.
    pub fn from_bounds(bounds: IBounds3) -> Result<Self, MapError> {
        Self::from_bounds_with_capacity(bounds, 0)
    }

    pub fn from_bounds_with_capacity(bounds: IBounds3, capacity: usize) -> Result<Self, MapError> {
        Ok(Self::with_packer(CoordPacker::from_bounds(bounds)?, capacity))
    }

    /// Creates an empty map that uses an existing `packer`.
    ///
    /// Maps sharing a packer can copy entries between each other without repacking them, see
    /// [`Self::put_all`].
    pub fn with_packer(packer: CoordPacker, capacity: usize) -> Self {
        Self {
            packer,
            map: PackedMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn packer(&self) -> &CoordPacker {
        &self.packer
    }

    pub fn origin(&self) -> IVec3 {
        self.packer.origin()
    }

    pub fn addressable_size(&self) -> u128 {
        self.packer.addressable_size()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.map.reserve(additional);
    }

    pub fn shrink_to_fit(&mut self) {
        self.map.shrink_to_fit();
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<&T> {
        self.map.get(&self.packer.pack(x, y, z))
    }

    pub fn get_mut(&mut self, x: i32, y: i32, z: i32) -> Option<&mut T> {
        self.map.get_mut(&self.packer.pack(x, y, z))
    }

    /// Returns the stored value or `default` if there is none.
    pub fn get_or<'a>(&'a self, x: i32, y: i32, z: i32, default: &'a T) -> &'a T {
        self.get(x, y, z).unwrap_or(default)
    }

    pub fn contains_key(&self, x: i32, y: i32, z: i32) -> bool {
        self.map.contains_key(&self.packer.pack(x, y, z))
    }

    pub fn contains_value(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.map.values().any(|other| other == value)
    }

    pub fn insert(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<T> {
        self.map.insert(self.packer.pack(x, y, z), value)
    }

    /// See [`CoordMap::insert_if_absent`].
    pub fn insert_if_absent(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<&mut T> {
        match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) => Some(entry.into_mut()),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    pub fn remove(&mut self, x: i32, y: i32, z: i32) -> Option<T> {
        self.map.remove(&self.packer.pack(x, y, z))
    }

    pub fn remove_if_eq(&mut self, x: i32, y: i32, z: i32, value: &T) -> bool
    where
        T: PartialEq,
    {
        match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) if entry.get() == value => {
                entry.remove();
                true
            }
            _ => false,
        }
    }

    /// See [`CoordMap::compute_if_absent`].
    pub fn compute_if_absent(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> T,
    ) -> &mut T {
        self.map
            .entry(self.packer.pack(x, y, z))
            .or_insert_with(|| f(x, y, z))
    }

    /// See [`CoordMap::try_compute_if_absent`].
    pub fn try_compute_if_absent(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> Option<T>,
    ) -> Result<&mut T, MapError> {
        match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(f(x, y, z).ok_or(MapError::NullValue)?)),
        }
    }

    /// See [`CoordMap::compute_if_present`].
    pub fn compute_if_present(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, &T) -> Option<T>,
    ) -> Option<&mut T> {
        match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) => {
                let value = f(x, y, z, entry.get());
                store(entry, value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// See [`CoordMap::compute`].
    pub fn compute(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, Option<&T>) -> Option<T>,
    ) -> Option<&mut T> {
        match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) => {
                let value = f(x, y, z, Some(entry.get()));
                store(entry, value)
            }
            Entry::Vacant(entry) => f(x, y, z, None).map(|value| entry.insert(value)),
        }
    }

    /// See [`CoordMap::merge`].
    pub fn merge(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        value: T,
        f: impl FnOnce(&T, T) -> Option<T>,
    ) -> Option<&mut T> {
        match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) => {
                let value = f(entry.get(), value);
                store(entry, value)
            }
            Entry::Vacant(entry) => Some(entry.insert(value)),
        }
    }

    pub fn replace(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<T> {
        self.get_mut(x, y, z)
            .map(|current| mem::replace(current, value))
    }

    pub fn replace_if_eq(&mut self, x: i32, y: i32, z: i32, old: &T, new: T) -> bool
    where
        T: PartialEq,
    {
        match self.get_mut(x, y, z) {
            Some(current) if current == old => {
                *current = new;
                true
            }
            _ => false,
        }
    }

    pub fn replace_all(&mut self, mut f: impl FnMut(i32, i32, i32, &T) -> T) {
        for (pos, value) in self.iter_mut() {
            *value = f(pos.x, pos.y, pos.z, &*value);
        }
    }

    pub fn retain(&mut self, mut f: impl FnMut(i32, i32, i32, &mut T) -> bool) {
        let packer = self.packer;
        self.map.retain(|&key, value| {
            let pos = packer.unpack(key);
            f(pos.x, pos.y, pos.z, value)
        });
    }

    pub fn for_each(&self, mut f: impl FnMut(i32, i32, i32, &T)) {
        for (pos, value) in self {
            f(pos.x, pos.y, pos.z, value);
        }
    }

    /// Copies all entries of `other` into this map.
    ///
    /// If both maps use the same [`CoordPacker`], packed keys are copied as they are. Otherwise
    /// every key is unpacked and packed again for this map, which may merge entries that were
    /// distinct in `other`.
    pub fn put_all(&mut self, other: &Self)
    where
        T: Clone,
    {
        if self.packer == other.packer {
            trace!(entries = other.len(), "copying packed entries");
            self.map
                .extend(other.map.iter().map(|(&key, value)| (key, value.clone())));
        } else {
            trace!(entries = other.len(), "repacking entries");
            self.extend(other.iter().map(|(pos, value)| (pos, value.clone())));
        }
    }

    /// Iterates over all entries with their unpacked coordinates, in no particular order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            packer: self.packer,
            inner: self.map.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            packer: self.packer,
            inner: self.map.iter_mut(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = IVec3> + '_ {
        let packer = self.packer;
        self.map.keys().map(move |&key| packer.unpack(key))
    }

    pub fn values(&self) -> hash_map::Values<'_, u64, T> {
        self.map.values()
    }

    pub fn values_mut(&mut self) -> hash_map::ValuesMut<'_, u64, T> {
        self.map.values_mut()
    }

    /// Removes all entries, returning them as an iterator.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            packer: self.packer,
            inner: self.map.drain(),
        }
    }
}

/// Stores `value` in an occupied `entry` or removes the entry if there is no value.
fn store<T>(mut entry: hash_map::OccupiedEntry<'_, u64, T>, value: Option<T>) -> Option<&mut T> {
    match value {
        Some(value) => {
            entry.insert(value);
            Some(entry.into_mut())
        }
        None => {
            entry.remove();
            None
        }
    }
}

impl<T> CoordMap<T> for HashCoordMap<T> {
    type Ref<'a> = &'a T where Self: 'a;

    fn packer(&self) -> &CoordPacker {
        &self.packer
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn get(&self, x: i32, y: i32, z: i32) -> Option<&T> {
        HashCoordMap::get(self, x, y, z)
    }

    fn contains_key(&self, x: i32, y: i32, z: i32) -> bool {
        HashCoordMap::contains_key(self, x, y, z)
    }

    fn insert(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<T> {
        HashCoordMap::insert(self, x, y, z, value)
    }

    fn insert_if_absent(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<&T> {
        HashCoordMap::insert_if_absent(self, x, y, z, value).map(|value| &*value)
    }

    fn remove(&mut self, x: i32, y: i32, z: i32) -> Option<T> {
        HashCoordMap::remove(self, x, y, z)
    }

    fn remove_if_eq(&mut self, x: i32, y: i32, z: i32, value: &T) -> bool
    where
        T: PartialEq,
    {
        HashCoordMap::remove_if_eq(self, x, y, z, value)
    }

    fn compute_if_absent(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> T,
    ) -> &T {
        HashCoordMap::compute_if_absent(self, x, y, z, f)
    }

    fn try_compute_if_absent(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> Option<T>,
    ) -> Result<&T, MapError> {
        HashCoordMap::try_compute_if_absent(self, x, y, z, f).map(|value| &*value)
    }

    fn compute_if_present(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, &T) -> Option<T>,
    ) -> Option<&T> {
        HashCoordMap::compute_if_present(self, x, y, z, f).map(|value| &*value)
    }

    fn compute(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, Option<&T>) -> Option<T>,
    ) -> Option<&T> {
        HashCoordMap::compute(self, x, y, z, f).map(|value| &*value)
    }

    fn merge(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        value: T,
        f: impl FnOnce(&T, T) -> Option<T>,
    ) -> Option<&T> {
        HashCoordMap::merge(self, x, y, z, value, f).map(|value| &*value)
    }

    fn replace(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<T> {
        HashCoordMap::replace(self, x, y, z, value)
    }

    fn replace_if_eq(&mut self, x: i32, y: i32, z: i32, old: &T, new: T) -> bool
    where
        T: PartialEq,
    {
        HashCoordMap::replace_if_eq(self, x, y, z, old, new)
    }

    fn replace_all(&mut self, f: impl FnMut(i32, i32, i32, &T) -> T) {
        HashCoordMap::replace_all(self, f);
    }

    fn retain(&mut self, f: impl FnMut(i32, i32, i32, &mut T) -> bool) {
        HashCoordMap::retain(self, f);
    }

    fn for_each(&self, f: impl FnMut(i32, i32, i32, &T)) {
        HashCoordMap::for_each(self, f);
    }

    fn contains_value(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        HashCoordMap::contains_value(self, value)
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

impl<T> Extend<(IVec3, T)> for HashCoordMap<T> {
    fn extend<I: IntoIterator<Item = (IVec3, T)>>(&mut self, iter: I) {
        let packer = self.packer;
        self.map.extend(
            iter.into_iter()
                .map(|(pos, value)| (packer.pack_vec(pos), value)),
        );
    }
}

impl<T: fmt::Debug> fmt::Debug for HashCoordMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

macro_rules! impl_unpacked_iter {
    { $name:ident < $( $lt:lifetime ),* > => $item:ty, |$packer:ident, $next:pat_param| $map:expr } => {
        impl< $( $lt, )* T> Iterator for $name< $( $lt, )* T> {
            type Item = $item;

            fn next(&mut self) -> Option<Self::Item> {
                let $packer = &self.packer;
                let $next = self.inner.next()?;
                Some($map)
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                self.inner.size_hint()
            }
        }

        impl< $( $lt, )* T> ExactSizeIterator for $name< $( $lt, )* T> {}

        impl< $( $lt, )* T> FusedIterator for $name< $( $lt, )* T> {}
    };
}

/// An iterator over the entries of a [`HashCoordMap`].
#[derive_where(Clone)]
pub struct Iter<'a, T> {
    packer: CoordPacker,
    inner: hash_map::Iter<'a, u64, T>,
}

impl_unpacked_iter! {
    Iter<'a> => (IVec3, &'a T), |packer, (&key, value)| (packer.unpack(key), value)
}

/// A mutable iterator over the entries of a [`HashCoordMap`].
pub struct IterMut<'a, T> {
    packer: CoordPacker,
    inner: hash_map::IterMut<'a, u64, T>,
}

impl_unpacked_iter! {
    IterMut<'a> => (IVec3, &'a mut T), |packer, (&key, value)| (packer.unpack(key), value)
}

/// An owning iterator over the entries of a [`HashCoordMap`].
pub struct IntoIter<T> {
    packer: CoordPacker,
    inner: hash_map::IntoIter<u64, T>,
}

impl_unpacked_iter! {
    IntoIter<> => (IVec3, T), |packer, (key, value)| (packer.unpack(key), value)
}

/// A draining iterator over the entries of a [`HashCoordMap`].
pub struct Drain<'a, T> {
    packer: CoordPacker,
    inner: hash_map::Drain<'a, u64, T>,
}

impl_unpacked_iter! {
    Drain<'a> => (IVec3, T), |packer, (key, value)| (packer.unpack(key), value)
}

impl<T> IntoIterator for HashCoordMap<T> {
    type Item = (IVec3, T);
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            packer: self.packer,
            inner: self.map.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a HashCoordMap<T> {
    type Item = (IVec3, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut HashCoordMap<T> {
    type Item = (IVec3, &'a mut T);
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use glam::ivec3;

    use super::*;

    fn map<T>(origin: IVec3, span: IVec3) -> HashCoordMap<T> {
        HashCoordMap::new(origin, span).unwrap()
    }

    #[test]
    fn iterate_keys() {
        let mut map = map(IVec3::ZERO, IVec3::splat(5));
        map.insert(0, 0, 0, "test");
        map.insert(4, 4, 4, "test2");

        let keys = map.keys().collect::<HashSet<_>>();
        assert_eq!(keys, HashSet::from([IVec3::ZERO, IVec3::splat(4)]));

        let mut actual = HashSet::new();
        map.for_each(|x, y, z, _| {
            actual.insert(ivec3(x, y, z));
        });
        assert_eq!(actual, keys);
    }

    #[test]
    fn addressable_space() {
        let mut map = map(IVec3::ZERO, IVec3::splat(2));
        for i in 0..10 {
            for j in 0..10 {
                for k in 0..10 {
                    map.insert(i, j, k, i * j * k);
                }
            }
        }

        assert_eq!(map.len(), 8);
        assert_eq!(map.addressable_size(), 8);
    }

    #[test]
    fn access_wrapping() {
        let mut map = map(IVec3::ZERO, IVec3::splat(2));
        map.insert(0, 0, 0, 10);

        for i in 0..1000 {
            let c = i * 2;
            assert_eq!(map.get(c, c, c), Some(&10));
            assert_eq!(map.get(-c, c, -c), Some(&10));
        }
        assert_eq!(map.get(1, 0, 0), None);
    }

    #[test]
    fn packed_space() {
        let mut map = map(IVec3::splat(-4), IVec3::splat(8));
        for pos in IBounds3::new(IVec3::splat(-4), IVec3::splat(8)).iter() {
            assert_eq!(map.insert_at(pos, pos), None);
            assert_eq!(map.get_at(pos), Some(&pos));
        }

        assert_eq!(map.len() as u128, map.addressable_size());
        for (pos, value) in &map {
            assert_eq!(pos, *value);
        }
    }

    #[test]
    fn insert_returns_previous() {
        let mut map = map(IVec3::ZERO, IVec3::splat(4));
        assert_eq!(map.insert(1, 1, 1, 'a'), None);
        assert_eq!(map.insert(5, 1, 1, 'b'), Some('a'));
        assert_eq!(map.get(1, 1, 1), Some(&'b'));
        assert!(map.contains_key(1, -3, 1));
    }

    #[test]
    fn compute_if_absent() {
        let mut map = map(IVec3::splat(-4), IVec3::splat(8));
        let mut calls = 0;

        let result = *map.compute_if_absent(0, 0, 0, |_, _, _| {
            calls += 1;
            ivec3(10, 10, 10)
        });
        assert_eq!(result, ivec3(10, 10, 10));
        assert!(map.contains_key(0, 0, 0));

        let result2 = *map.compute_if_absent(0, 0, 0, |_, _, _| {
            calls += 1;
            ivec3(20, 20, 20)
        });
        assert_eq!(result2, result);
        assert_eq!(calls, 1);
    }

    #[test]
    fn compute_if_absent_receives_coordinate() {
        let mut map = map(IVec3::ZERO, IVec3::splat(4));
        let value = *map.compute_if_absent(9, -2, 3, |x, y, z| ivec3(x, y, z));
        assert_eq!(value, ivec3(9, -2, 3));
        assert_eq!(map.get(1, 2, 3), Some(&ivec3(9, -2, 3)));
    }

    #[test]
    fn try_compute_if_absent() {
        let mut map = map::<u8>(IVec3::ZERO, IVec3::splat(4));

        assert_eq!(
            map.try_compute_if_absent(0, 0, 0, |_, _, _| None),
            Err(MapError::NullValue)
        );
        assert!(map.is_empty());

        assert_eq!(map.try_compute_if_absent(0, 0, 0, |_, _, _| Some(1)), Ok(&mut 1));
        // not called for present entries
        assert_eq!(map.try_compute_if_absent(0, 0, 0, |_, _, _| None), Ok(&mut 1));
    }

    #[test]
    fn compute_if_present() {
        let mut map = map(IVec3::splat(-4), IVec3::splat(8));

        assert_eq!(map.compute_if_present(0, 0, 0, |_, _, _, _| Some(IVec3::ZERO)), None);
        assert!(map.is_empty());

        map.insert(0, 0, 0, IVec3::ZERO);
        let removed = map.compute_if_present(0, 0, 0, |_, _, _, old| {
            assert_eq!(*old, IVec3::ZERO);
            None
        });
        assert_eq!(removed, None);
        assert!(!map.contains_key(0, 0, 0));
        assert_eq!(map.len(), 0);

        map.insert(0, 0, 0, IVec3::ZERO);
        let value = map.compute_if_present(0, 0, 0, |_, _, _, _| Some(IVec3::ONE));
        assert_eq!(value, Some(&mut IVec3::ONE));
        assert!(map.contains_key(0, 0, 0));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn compute() {
        let mut map = map(IVec3::splat(-4), IVec3::splat(8));

        let value = map.compute(0, 0, 0, |_, _, _, old| {
            assert_eq!(old, None);
            Some(IVec3::ZERO)
        });
        assert_eq!(value, Some(&mut IVec3::ZERO));
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(0, 0, 0));

        let removed = map.compute(0, 0, 0, |_, _, _, old| {
            assert!(old.is_some());
            None
        });
        assert_eq!(removed, None);
        assert!(!map.contains_key(0, 0, 0));
        assert_eq!(map.len(), 0);

        // removing an absent entry leaves the map unchanged
        map.insert(1, 1, 1, IVec3::ONE);
        assert_eq!(map.compute(2, 2, 2, |_, _, _, _| None), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn merge() {
        let mut map = map(IVec3::ZERO, IVec3::splat(4));

        assert_eq!(map.merge(1, 2, 3, 5, |_, _| unreachable!()), Some(&mut 5));
        assert_eq!(map.merge(1, 2, 3, 2, |old, new| Some(old + new)), Some(&mut 7));
        assert_eq!(map.merge(1, 2, 3, 0, |_, _| None), None);
        assert!(map.is_empty());
    }

    #[test]
    fn replace() {
        let mut map = map(IVec3::ZERO, IVec3::splat(4));

        assert_eq!(map.replace(0, 0, 0, "a"), None);
        assert!(map.is_empty());

        map.insert(0, 0, 0, "a");
        assert_eq!(map.replace(0, 0, 0, "b"), Some("a"));

        assert!(!map.replace_if_eq(0, 0, 0, &"a", "c"));
        assert_eq!(map.get(0, 0, 0), Some(&"b"));
        assert!(map.replace_if_eq(0, 0, 0, &"b", "c"));
        assert_eq!(map.get(0, 0, 0), Some(&"c"));
        assert!(!map.replace_if_eq(1, 1, 1, &"c", "d"));
    }

    #[test]
    fn insert_if_absent() {
        let mut map = map(IVec3::ZERO, IVec3::splat(4));

        assert_eq!(map.insert_if_absent(0, 0, 0, 1), None);
        assert_eq!(map.insert_if_absent(0, 0, 0, 2), Some(&mut 1));
        assert_eq!(map.get(0, 0, 0), Some(&1));
    }

    #[test]
    fn remove_if_eq() {
        let mut map = map(IVec3::ZERO, IVec3::splat(4));
        map.insert(0, 0, 0, 1);

        assert!(!map.remove_if_eq(0, 0, 0, &2));
        assert!(map.contains_key(0, 0, 0));
        assert!(map.remove_if_eq(4, 4, 4, &1));
        assert!(map.is_empty());
        assert!(!map.remove_if_eq(0, 0, 0, &1));
    }

    #[test]
    fn get_or() {
        let mut map = map(IVec3::ZERO, IVec3::splat(4));
        map.insert(0, 0, 0, 1);

        assert_eq!(*map.get_or(0, 0, 0, &5), 1);
        assert_eq!(*map.get_or(1, 0, 0, &5), 5);
    }

    #[test]
    fn retain_and_drain() {
        let mut map = map(IVec3::ZERO, IVec3::splat(8));
        map.extend(IBounds3::new(IVec3::ZERO, IVec3::splat(2)).iter().map(|pos| (pos, pos.x)));
        assert_eq!(map.len(), 8);

        map.retain(|x, _, _, value| {
            *value += 10;
            x == 0
        });
        assert_eq!(map.len(), 4);
        assert!(map.values().all(|&value| value == 10));

        let mut drained = map.drain().map(|(pos, _)| pos).collect::<Vec<_>>();
        drained.sort_by_key(|pos| pos.to_array());
        assert_eq!(
            drained,
            [ivec3(0, 0, 0), ivec3(0, 0, 1), ivec3(0, 1, 0), ivec3(0, 1, 1)]
        );
        assert!(map.is_empty());
    }

    #[test]
    fn put_all_with_same_packer() {
        let packer = CoordPacker::new(IVec3::ZERO, IVec3::splat(4)).unwrap();
        let mut source = HashCoordMap::with_packer(packer, 2);
        source.insert(1, 2, 3, "a");
        source.insert(3, 2, 1, "b");

        let mut target = HashCoordMap::with_packer(packer, 0);
        target.insert(1, 2, 3, "old");
        target.put_all(&source);

        assert_eq!(target.len(), 2);
        assert_eq!(target.get(1, 2, 3), Some(&"a"));
        assert_eq!(target.get(3, 2, 1), Some(&"b"));
    }

    #[test]
    fn put_all_repacks_different_layouts() {
        let mut source = map(IVec3::ZERO, IVec3::splat(8));
        source.insert(1, 2, 3, "a");
        source.insert(7, 0, 0, "b");

        let mut target = map(IVec3::splat(-2), ivec3(16, 4, 4));
        target.put_all(&source);

        assert_eq!(target.len(), 2);
        assert_eq!(target.get(1, 2, 3), Some(&"a"));
        assert_eq!(target.get(7, 0, 0), Some(&"b"));
    }

    #[test]
    fn lenient_values() {
        let mut map = map::<Option<&str>>(IVec3::ZERO, IVec3::splat(4));
        map.insert(0, 0, 0, None);

        assert!(map.contains_key(0, 0, 0));
        assert_eq!(map.get(0, 0, 0), Some(&None));
        assert_eq!(map.get(1, 0, 0), None);
    }

    #[test]
    fn into_iter_unpacks() {
        let mut map = map(IVec3::splat(100), IVec3::splat(4));
        map.insert(101, 102, 103, 'x');
        map.insert(99, 100, 100, 'y');

        let mut entries = map.clone().into_iter().collect::<Vec<_>>();
        entries.sort_by_key(|&(_, value)| value);
        assert_eq!(entries, [(ivec3(101, 102, 103), 'x'), (ivec3(103, 100, 100), 'y')]);

        for (_, value) in &mut map {
            *value = value.to_ascii_uppercase();
        }
        assert_eq!(map.get(101, 102, 103), Some(&'X'));
        assert_eq!(map.iter().len(), 2);
    }

    #[test]
    fn debug_shows_unpacked_keys() {
        let mut map = map(IVec3::splat(-1), IVec3::splat(2));
        map.insert(-1, 0, -1, 5);
        assert_eq!(format!("{map:?}"), format!("{{{:?}: 5}}", ivec3(-1, 0, -1)));
    }

    #[test]
    fn capacity_hint() {
        let map = HashCoordMap::<u8>::with_capacity(IVec3::ZERO, IVec3::ONE, 100).unwrap();
        assert!(map.capacity() >= 100);
        assert_eq!(map.origin(), IVec3::ZERO);
    }

    #[test]
    fn from_bounds() {
        let bounds = IBounds3::new(ivec3(-10, 0, 5), ivec3(20, 1, 3));
        let map = HashCoordMap::<u8>::from_bounds(bounds).unwrap();
        assert_eq!(map.origin(), bounds.origin());
        assert_eq!(map.packer().width(), 32);
        assert_eq!(map.packer().height(), 2);
        assert_eq!(map.packer().depth(), 4);

        assert_eq!(
            HashCoordMap::<u8>::from_bounds(IBounds3::point(IVec3::ZERO).shrink_directional(IVec3::X)),
            Err(MapError::InvalidSpan {
                axis: crate::math::axis::Axis3::X,
                span: 0
            })
        );
    }
}
