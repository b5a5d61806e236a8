use std::{
    fmt,
    hash::BuildHasherDefault,
    iter::{Fuse, FusedIterator},
    mem,
    ops::{Deref, DerefMut},
    ptr,
};

use dashmap::{
    iter::{Iter as ShardIter, OwningIter},
    mapref::{
        entry::Entry,
        multiple::RefMulti,
        one::{Ref, RefMut},
    },
    DashMap,
};
use glam::IVec3;
use rustc_hash::FxHasher;
use tracing::trace;

use super::CoordMap;
use crate::{error::MapError, math::bounds::IBounds3, packing::CoordPacker};

type PackedHasher = BuildHasherDefault<FxHasher>;

/// A [`CoordMap`] that can be shared between threads, backed by a [`DashMap`].
///
/// Every operation takes `&self`. Operations on a single coordinate are atomic; the functions
/// passed to the `compute` family run while the shard of that coordinate is locked, so they must
/// not access the same map again.
///
/// Values are handed out as guards such as [`ValueRef`], which keep their shard locked until they
/// are dropped. Holding on to one while writing to the map from the same thread can deadlock.
#[derive(Clone)]
pub struct ConcurrentHashCoordMap<T> {
    packer: CoordPacker,
    map: DashMap<u64, T, PackedHasher>,
}

impl<T> ConcurrentHashCoordMap<T> {
    pub fn new(origin: IVec3, span: IVec3) -> Result<Self, MapError> {
        Self::with_capacity(origin, span, 0)
    }

    pub fn with_capacity(origin: IVec3, span: IVec3, capacity: usize) -> Result<Self, MapError> {
        Ok(Self::with_packer(CoordPacker::new(origin, span)?, capacity))
    }

    pub fn from_bounds(bounds: IBounds3) -> Result<Self, MapError> {
        Self::from_bounds_with_capacity(bounds, 0)
    }

    pub fn from_bounds_with_capacity(bounds: IBounds3, capacity: usize) -> Result<Self, MapError> {
        Ok(Self::with_packer(CoordPacker::from_bounds(bounds)?, capacity))
    }

    pub fn with_packer(packer: CoordPacker, capacity: usize) -> Self {
        Self {
            packer,
            map: DashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Creates an empty map that splits its entries across `shard_amount` independently locked
    /// shards.
    ///
    /// # Panics
    ///
    /// Panics if `shard_amount` is not a power of two greater than one.
    pub fn with_shard_amount(packer: CoordPacker, capacity: usize, shard_amount: usize) -> Self {
        Self {
            packer,
            map: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                Default::default(),
                shard_amount,
            ),
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

    pub fn shrink_to_fit(&self) {
        self.map.shrink_to_fit();
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<ValueRef<'_, T>> {
        self.map.get(&self.packer.pack(x, y, z)).map(ValueRef)
    }

    pub fn get_mut(&self, x: i32, y: i32, z: i32) -> Option<ValueRefMut<'_, T>> {
        self.map.get_mut(&self.packer.pack(x, y, z)).map(ValueRefMut)
    }

    /// Returns a copy of the stored value or `default` if there is none.
    ///
    /// Unlike [`Self::get`], this does not keep the shard locked.
    pub fn get_or(&self, x: i32, y: i32, z: i32, default: T) -> T
    where
        T: Clone,
    {
        self.get(x, y, z).map_or(default, |value| T::clone(&value))
    }

    pub fn contains_key(&self, x: i32, y: i32, z: i32) -> bool {
        self.map.contains_key(&self.packer.pack(x, y, z))
    }

    pub fn contains_value(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.map.iter().any(|entry| entry.value() == value)
    }

    pub fn insert(&self, x: i32, y: i32, z: i32, value: T) -> Option<T> {
        self.map.insert(self.packer.pack(x, y, z), value)
    }

    /// See [`CoordMap::insert_if_absent`].
    pub fn insert_if_absent(&self, x: i32, y: i32, z: i32, value: T) -> Option<ValueRef<'_, T>> {
        match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) => Some(ValueRef(entry.into_ref().downgrade())),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    pub fn remove(&self, x: i32, y: i32, z: i32) -> Option<T> {
        self.map
            .remove(&self.packer.pack(x, y, z))
            .map(|(_, value)| value)
    }

    pub fn remove_if_eq(&self, x: i32, y: i32, z: i32, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.map
            .remove_if(&self.packer.pack(x, y, z), |_, current| current == value)
            .is_some()
    }

    /// See [`CoordMap::compute_if_absent`].
    ///
    /// `f` is called at most once, even if multiple threads race to compute the same coordinate.
    pub fn compute_if_absent(
        &self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> T,
    ) -> ValueRef<'_, T> {
        ValueRef(
            self.map
                .entry(self.packer.pack(x, y, z))
                .or_insert_with(|| f(x, y, z))
                .downgrade(),
        )
    }

    /// See [`CoordMap::try_compute_if_absent`].
    pub fn try_compute_if_absent(
        &self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> Option<T>,
    ) -> Result<ValueRef<'_, T>, MapError> {
        let value = match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => entry.insert(f(x, y, z).ok_or(MapError::NullValue)?),
        };
        Ok(ValueRef(value.downgrade()))
    }

    /// See [`CoordMap::compute_if_present`].
    pub fn compute_if_present(
        &self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, &T) -> Option<T>,
    ) -> Option<ValueRef<'_, T>> {
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
        &self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, Option<&T>) -> Option<T>,
    ) -> Option<ValueRef<'_, T>> {
        match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) => {
                let value = f(x, y, z, Some(entry.get()));
                store(entry, value)
            }
            Entry::Vacant(entry) => {
                f(x, y, z, None).map(|value| ValueRef(entry.insert(value).downgrade()))
            }
        }
    }

    /// See [`CoordMap::merge`].
    pub fn merge(
        &self,
        x: i32,
        y: i32,
        z: i32,
        value: T,
        f: impl FnOnce(&T, T) -> Option<T>,
    ) -> Option<ValueRef<'_, T>> {
        match self.map.entry(self.packer.pack(x, y, z)) {
            Entry::Occupied(entry) => {
                let value = f(entry.get(), value);
                store(entry, value)
            }
            Entry::Vacant(entry) => Some(ValueRef(entry.insert(value).downgrade())),
        }
    }

    pub fn replace(&self, x: i32, y: i32, z: i32, value: T) -> Option<T> {
        self.get_mut(x, y, z)
            .map(|mut current| mem::replace(&mut *current, value))
    }

    pub fn replace_if_eq(&self, x: i32, y: i32, z: i32, old: &T, new: T) -> bool
    where
        T: PartialEq,
    {
        match self.get_mut(x, y, z) {
            Some(mut current) if *current == *old => {
                *current = new;
                true
            }
            _ => false,
        }
    }

    /// Replaces every value with the result of `f`.
    ///
    /// Not atomic as a whole; shards are updated one after another.
    pub fn replace_all(&self, mut f: impl FnMut(i32, i32, i32, &T) -> T) {
        for mut entry in self.map.iter_mut() {
            let (&key, value) = entry.pair_mut();
            let pos = self.packer.unpack(key);
            *value = f(pos.x, pos.y, pos.z, &*value);
        }
    }

    pub fn retain(&self, mut f: impl FnMut(i32, i32, i32, &mut T) -> bool) {
        self.map.retain(|&key, value| {
            let pos = self.packer.unpack(key);
            f(pos.x, pos.y, pos.z, value)
        });
    }

    pub fn for_each(&self, mut f: impl FnMut(i32, i32, i32, &T)) {
        for entry in self.iter() {
            let pos = entry.pos();
            f(pos.x, pos.y, pos.z, entry.value());
        }
    }

    /// Copies all entries of `other` into this map.
    ///
    /// The entries are collected before any of them are inserted, so two maps can copy from each
    /// other at the same time without deadlocking. Copying a map into itself does nothing.
    pub fn put_all(&self, other: &Self)
    where
        T: Clone,
    {
        if ptr::eq(self, other) {
            return;
        }

        if self.packer == other.packer {
            trace!(entries = other.len(), "copying packed entries");
            let entries = other
                .map
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect::<Vec<_>>();
            for (key, value) in entries {
                self.map.insert(key, value);
            }
        } else {
            trace!(entries = other.len(), "repacking entries");
            let entries = other
                .iter()
                .map(|entry| (entry.pos(), entry.value().clone()))
                .collect::<Vec<_>>();
            for (pos, value) in entries {
                self.map.insert(self.packer.pack_vec(pos), value);
            }
        }
    }

    /// Iterates over all entries, in no particular order.
    ///
    /// Each shard stays read-locked while the iterator is inside of it.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            packer: self.packer,
            inner: self.map.iter().fuse(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.iter().map(|entry| entry.pos())
    }
}

/// Stores `value` in an occupied `entry` or removes the entry if there is no value.
fn store<T>(
    mut entry: dashmap::mapref::entry::OccupiedEntry<'_, u64, T>,
    value: Option<T>,
) -> Option<ValueRef<'_, T>> {
    match value {
        Some(value) => {
            entry.insert(value);
            Some(ValueRef(entry.into_ref().downgrade()))
        }
        None => {
            entry.remove();
            None
        }
    }
}

impl<T> CoordMap<T> for ConcurrentHashCoordMap<T> {
    type Ref<'a> = ValueRef<'a, T> where Self: 'a;

    fn packer(&self) -> &CoordPacker {
        &self.packer
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn get(&self, x: i32, y: i32, z: i32) -> Option<ValueRef<'_, T>> {
        ConcurrentHashCoordMap::get(self, x, y, z)
    }

    fn contains_key(&self, x: i32, y: i32, z: i32) -> bool {
        ConcurrentHashCoordMap::contains_key(self, x, y, z)
    }

    fn insert(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<T> {
        ConcurrentHashCoordMap::insert(self, x, y, z, value)
    }

    fn insert_if_absent(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<ValueRef<'_, T>> {
        ConcurrentHashCoordMap::insert_if_absent(self, x, y, z, value)
    }

    fn remove(&mut self, x: i32, y: i32, z: i32) -> Option<T> {
        ConcurrentHashCoordMap::remove(self, x, y, z)
    }

    fn remove_if_eq(&mut self, x: i32, y: i32, z: i32, value: &T) -> bool
    where
        T: PartialEq,
    {
        ConcurrentHashCoordMap::remove_if_eq(self, x, y, z, value)
    }

    fn compute_if_absent(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> T,
    ) -> ValueRef<'_, T> {
        ConcurrentHashCoordMap::compute_if_absent(self, x, y, z, f)
    }

    fn try_compute_if_absent(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32) -> Option<T>,
    ) -> Result<ValueRef<'_, T>, MapError> {
        ConcurrentHashCoordMap::try_compute_if_absent(self, x, y, z, f)
    }

    fn compute_if_present(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, &T) -> Option<T>,
    ) -> Option<ValueRef<'_, T>> {
        ConcurrentHashCoordMap::compute_if_present(self, x, y, z, f)
    }

    fn compute(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        f: impl FnOnce(i32, i32, i32, Option<&T>) -> Option<T>,
    ) -> Option<ValueRef<'_, T>> {
        ConcurrentHashCoordMap::compute(self, x, y, z, f)
    }

    fn merge(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        value: T,
        f: impl FnOnce(&T, T) -> Option<T>,
    ) -> Option<ValueRef<'_, T>> {
        ConcurrentHashCoordMap::merge(self, x, y, z, value, f)
    }

    fn replace(&mut self, x: i32, y: i32, z: i32, value: T) -> Option<T> {
        ConcurrentHashCoordMap::replace(self, x, y, z, value)
    }

    fn replace_if_eq(&mut self, x: i32, y: i32, z: i32, old: &T, new: T) -> bool
    where
        T: PartialEq,
    {
        ConcurrentHashCoordMap::replace_if_eq(self, x, y, z, old, new)
    }

    fn replace_all(&mut self, f: impl FnMut(i32, i32, i32, &T) -> T) {
        ConcurrentHashCoordMap::replace_all(self, f);
    }

    fn retain(&mut self, f: impl FnMut(i32, i32, i32, &mut T) -> bool) {
        ConcurrentHashCoordMap::retain(self, f);
    }

    fn for_each(&self, f: impl FnMut(i32, i32, i32, &T)) {
        ConcurrentHashCoordMap::for_each(self, f);
    }

    fn contains_value(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        ConcurrentHashCoordMap::contains_value(self, value)
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

impl<T> Extend<(IVec3, T)> for ConcurrentHashCoordMap<T> {
    fn extend<I: IntoIterator<Item = (IVec3, T)>>(&mut self, iter: I) {
        for (pos, value) in iter {
            self.map.insert(self.packer.pack_vec(pos), value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ConcurrentHashCoordMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for entry in self.iter() {
            map.entry(&entry.pos(), entry.value());
        }
        map.finish()
    }
}

/// A read-locked reference to a value in a [`ConcurrentHashCoordMap`].
pub struct ValueRef<'a, T>(Ref<'a, u64, T>);

impl<T> Deref for ValueRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0.value()
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.value().fmt(f)
    }
}

/// A write-locked reference to a value in a [`ConcurrentHashCoordMap`].
pub struct ValueRefMut<'a, T>(RefMut<'a, u64, T>);

impl<'a, T> ValueRefMut<'a, T> {
    pub fn downgrade(self) -> ValueRef<'a, T> {
        ValueRef(self.0.downgrade())
    }
}

impl<T> Deref for ValueRefMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0.value()
    }
}

impl<T> DerefMut for ValueRefMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.0.value_mut()
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueRefMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.value().fmt(f)
    }
}

/// An entry yielded by [`ConcurrentHashCoordMap::iter`].
pub struct EntryRef<'a, T> {
    pos: IVec3,
    inner: RefMulti<'a, u64, T>,
}

impl<'a, T> EntryRef<'a, T> {
    /// The unpacked coordinate of the entry.
    pub fn pos(&self) -> IVec3 {
        self.pos
    }

    pub fn value(&self) -> &T {
        self.inner.value()
    }
}

impl<T> Deref for EntryRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.value()
    }
}

/// An iterator over the entries of a [`ConcurrentHashCoordMap`].
pub struct Iter<'a, T> {
    packer: CoordPacker,
    inner: Fuse<ShardIter<'a, u64, T, PackedHasher, DashMap<u64, T, PackedHasher>>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = EntryRef<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.inner.next()?;
        Some(EntryRef {
            pos: self.packer.unpack(*inner.key()),
            inner,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

/// An owning iterator over the entries of a [`ConcurrentHashCoordMap`].
pub struct IntoIter<T> {
    packer: CoordPacker,
    inner: OwningIter<u64, T, PackedHasher>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = (IVec3, T);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.inner.next()?;
        Some((self.packer.unpack(key), value))
    }
}

impl<T> IntoIterator for ConcurrentHashCoordMap<T> {
    type Item = (IVec3, T);
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            packer: self.packer,
            inner: self.map.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a ConcurrentHashCoordMap<T> {
    type Item = EntryRef<'a, T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
