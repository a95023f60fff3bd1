//! # Pool — Sparse-Set Component Storage
//!
//! One [`ComponentPool`] per component type. Lookups go entity index →
//! `sparse` → dense slot, so attach, detach and get are all O(1), and the dense
//! arrays can be walked with no holes.
//!
//! ```text
//! sparse:  [ 1 | ~ | 0 | ~ | 2 ]          (indexed by entity index, ~ = NONE)
//! dense:   [ 2v0 | 0v0 | 4v1 ]            (owning entity per slot)
//! data:    [  c  |  a  |  b  ]            (ComponentColumn, same order)
//! ```
//!
//! Invariant: `sparse[dense[k].index] == k` for every occupied slot `k`.
//!
//! ## Design
//!
//! - Detach swaps the last slot into the hole and repairs the moved entity's
//!   `sparse` entry, keeping the arrays packed.
//! - Dense storage grows in fixed chunks (`component_grow`), so capacity is
//!   predictable for pools that fill one entity at a time.
//! - The pool compares the stored dense entity on lookup, so a recycled index
//!   never reads the previous owner's component. Full liveness checks belong
//!   to the [`Registry`](super::registry::Registry).
//!
//! ## Subpool Ranges
//!
//! A pool can be split into contiguous *ranges* of dense slots, each named by
//! a generational [`RangeId`]. Members of one range are always adjacent, so a
//! renderer can walk "every sprite of layer 2" as a single slice:
//!
//! ```text
//! dense:  [ a  h  b | c  f  g | d  e | x  y ]
//! ends:          3        6      8            (one past each range)
//!           range 0   range 1  range 2  tail (no range)
//! ```
//!
//! Entering a range swaps one boundary element per following range; leaving
//! one does the same in reverse. Order *within* a range is not preserved.

use std::any::Any;
use std::cmp::Ordering;
use std::ops::Range;

use super::component::{ComponentColumn, ComponentInfo};
use super::entity::Entity;

/// Marks an entity index with no slot in this pool.
const NONE: u32 = u32::MAX;

/// Generational handle to one subpool range of a [`ComponentPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RangeId {
    index: u32,
    generation: u32,
}

impl RangeId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Range bookkeeping: `ends[p]` is one past the last slot of the range at
/// dense position `p`; `order[id.index]` is that `p`, or `NONE` when free.
#[derive(Default)]
struct Subpools {
    generations: Vec<u32>,
    order: Vec<u32>,
    ends: Vec<u32>,
    free: Vec<u32>,
}

impl Subpools {
    fn position(&self, id: RangeId) -> Option<usize> {
        let i = id.index as usize;
        let p = *self.order.get(i)?;
        (p != NONE && self.generations[i] == id.generation).then_some(p as usize)
    }

    fn bounds(&self, p: usize) -> Range<usize> {
        let start = if p == 0 { 0 } else { self.ends[p - 1] as usize };
        start..self.ends[p] as usize
    }

    /// First slot past every range.
    fn tail(&self) -> usize {
        self.ends.last().map_or(0, |&end| end as usize)
    }

    /// Position of the range holding `slot`, if any.
    fn containing(&self, slot: usize) -> Option<usize> {
        let p = self.ends.partition_point(|&end| end as usize <= slot);
        (p < self.ends.len()).then_some(p)
    }

    fn allocate(&mut self) -> RangeId {
        let p = self.ends.len() as u32;
        self.ends.push(self.tail() as u32);
        if let Some(index) = self.free.pop() {
            self.order[index as usize] = p;
            return RangeId {
                index,
                generation: self.generations[index as usize],
            };
        }
        let index = self.order.len() as u32;
        self.order.push(p);
        self.generations.push(0);
        RangeId {
            index,
            generation: 0,
        }
    }

    /// Drop the range at position `p` after its slots have been removed.
    fn release(&mut self, id: RangeId, p: usize, removed: u32) {
        self.ends.remove(p);
        for end in &mut self.ends[p..] {
            *end -= removed;
        }
        self.shift_order_after(p);
        let i = id.index as usize;
        self.order[i] = NONE;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free.push(id.index);
    }

    fn shift_order_after(&mut self, p: usize) {
        for order in &mut self.order {
            if *order != NONE && *order as usize > p {
                *order -= 1;
            }
        }
    }

    fn live(&self) -> usize {
        self.ends.len()
    }
}

/// Sparse-set container for one component type.
pub struct ComponentPool {
    info: ComponentInfo,
    sparse: Vec<u32>,
    dense: Vec<Entity>,
    data: ComponentColumn,
    ranges: Subpools,
    grow: usize,
}

impl ComponentPool {
    pub fn new<T: 'static>(info: ComponentInfo, grow: usize) -> Self {
        Self {
            info,
            sparse: Vec::new(),
            dense: Vec::new(),
            data: ComponentColumn::new::<T>(),
            ranges: Subpools::default(),
            grow: grow.max(1),
        }
    }

    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    pub(crate) fn set_info(&mut self, info: ComponentInfo) {
        self.info = info;
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.dense.capacity()
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        let k = *self.sparse.get(entity.index as usize)?;
        if k == NONE || self.dense[k as usize] != entity {
            return None;
        }
        Some(k as usize)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    pub fn get<T: 'static>(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|k| self.data.get::<T>(k))
    }

    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        let k = self.slot(entity)?;
        Some(self.data.get_mut::<T>(k))
    }

    /// Type-erased view of an entity's component, for debug formatting.
    pub fn get_any(&self, entity: Entity) -> Option<&dyn Any> {
        self.slot(entity).map(|k| self.data.get_any(k))
    }

    /// Attach a component, constructing it only when the entity has none.
    ///
    /// Idempotent: an existing component is returned untouched.
    pub fn attach_with<T: 'static>(&mut self, entity: Entity, construct: impl FnOnce() -> T) -> &mut T {
        let k = match self.slot(entity) {
            Some(k) => k,
            None => self.push(entity, construct()),
        };
        self.data.get_mut::<T>(k)
    }

    /// Append past every range (into the tail) and return the new slot.
    fn push<T: 'static>(&mut self, entity: Entity, value: T) -> usize {
        if self.dense.len() == self.dense.capacity() {
            self.dense.reserve_exact(self.grow);
            self.data.reserve(self.grow);
        }

        let idx = entity.index as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, NONE);
        }

        let k = self.dense.len();
        self.sparse[idx] = k as u32;
        self.dense.push(entity);
        self.data.push(value);
        k
    }

    /// Attach or overwrite. An overwritten value is dropped without running
    /// the removal hook.
    pub fn insert<T: 'static>(&mut self, entity: Entity, value: T) -> &mut T {
        if let Some(k) = self.slot(entity) {
            let slot = self.data.get_mut::<T>(k);
            *slot = value;
            return slot;
        }
        self.attach_with(entity, || value)
    }

    /// Remove and return the entity's component.
    pub fn detach<T: 'static>(&mut self, entity: Entity) -> Option<T> {
        self.detach_any(entity)?.downcast::<T>().ok().map(|b| *b)
    }

    pub(crate) fn detach_any(&mut self, entity: Entity) -> Option<Box<dyn Any>> {
        let mut k = self.slot(entity)?;
        if let Some(p) = self.ranges.containing(k) {
            // Bubble the hole through every following range, then the tail.
            for i in p..self.ranges.live() {
                let last = self.ranges.ends[i] as usize - 1;
                self.swap_slots(k, last);
                self.ranges.ends[i] -= 1;
                k = last;
            }
            let end = self.dense.len() - 1;
            self.swap_slots(k, end);
            k = end;
        }
        let removed = self.data.take(k);
        self.dense.swap_remove(k);
        if let Some(&moved) = self.dense.get(k) {
            self.sparse[moved.index as usize] = k as u32;
        }
        self.sparse[entity.index as usize] = NONE;
        Some(removed)
    }

    /// Owning entities in dense order.
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    /// Component values in dense order.
    pub fn values<T: 'static>(&self) -> &[T] {
        self.data.as_slice::<T>()
    }

    pub fn values_mut<T: 'static>(&mut self) -> &mut [T] {
        self.data.as_mut_slice::<T>()
    }

    pub fn iter<T: 'static>(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.dense.iter().copied().zip(self.values::<T>())
    }

    /// Reorder the dense arrays by a comparator over component values.
    ///
    /// Handles stay valid; only dense order (and so iteration order) changes.
    /// Sorting a pool that has ranges mixes their members; sort each range
    /// with [`sort_range_by`](Self::sort_range_by) instead.
    pub fn sort_by<T: 'static>(&mut self, compare: impl FnMut(&T, &T) -> Ordering) {
        self.sort_range_by(0..self.len(), compare);
    }

    /// Sort only the dense slots in `range`, leaving the rest in place.
    ///
    /// # Panics
    ///
    /// Panics if `range` reaches past the end of the pool.
    pub fn sort_range_by<T: 'static>(&mut self, range: Range<usize>, mut compare: impl FnMut(&T, &T) -> Ordering) {
        assert!(
            range.start <= range.end && range.end <= self.len(),
            "sort range {range:?} out of bounds for pool of {}",
            self.len()
        );
        let values = self.data.as_slice::<T>();
        let mut sorted: Vec<usize> = range.clone().collect();
        sorted.sort_by(|&a, &b| compare(&values[a], &values[b]));

        let order: Vec<usize> = (0..range.start)
            .chain(sorted)
            .chain(range.end..self.len())
            .collect();
        self.reorder(&order, range);
    }

    /// Apply a full-length permutation and repair `sparse` over `touched`.
    fn reorder(&mut self, order: &[usize], touched: Range<usize>) {
        self.data.permute(order);
        self.dense = order.iter().map(|&i| self.dense[i]).collect();
        for k in touched {
            self.sparse[self.dense[k].index as usize] = k as u32;
        }
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.dense.swap(a, b);
        self.data.swap(a, b);
        self.sparse[self.dense[a].index as usize] = a as u32;
        self.sparse[self.dense[b].index as usize] = b as u32;
    }

    // ── Subpool ranges ───────────────────────────────────────────────

    /// Open a new, empty range after every existing one.
    pub fn new_range(&mut self) -> RangeId {
        self.ranges.allocate()
    }

    /// Dense slots currently held by range `id`, or `None` for a stale id.
    pub fn range(&self, id: RangeId) -> Option<Range<usize>> {
        self.ranges.position(id).map(|p| self.ranges.bounds(p))
    }

    /// Number of live ranges.
    pub fn range_count(&self) -> usize {
        self.ranges.live()
    }

    /// Attach `value` to `entity` as a member of range `id`.
    ///
    /// An entity already in the pool keeps its slot and gets `value` written
    /// over its component. Returns `None` for a stale range id.
    pub fn insert_in_range<T: 'static>(&mut self, id: RangeId, entity: Entity, value: T) -> Option<&mut T> {
        if let Some(k) = self.slot(entity) {
            let slot = self.data.get_mut::<T>(k);
            *slot = value;
            return Some(slot);
        }
        let p = self.ranges.position(id)?;
        let mut k = self.push(entity, value);

        let tail = self.ranges.tail();
        if k > tail {
            self.swap_slots(k, tail);
            k = tail;
        }
        for i in (p + 1..self.ranges.live()).rev() {
            let start = self.ranges.ends[i - 1] as usize;
            self.swap_slots(k, start);
            self.ranges.ends[i] += 1;
            k = start;
        }
        self.ranges.ends[p] += 1;
        Some(self.data.get_mut::<T>(k))
    }

    /// Delete range `id` along with every component in it. Later slots move
    /// down in order.
    ///
    /// Returns the removed entities and values, or `None` for a stale id.
    pub(crate) fn remove_range_any(&mut self, id: RangeId) -> Option<Vec<(Entity, Box<dyn Any>)>> {
        let p = self.ranges.position(id)?;
        let Range { start, end } = self.ranges.bounds(p);
        let len = self.len();
        let order: Vec<usize> = (0..start).chain(end..len).chain(start..end).collect();
        self.reorder(&order, start..len - (end - start));

        let mut removed = Vec::with_capacity(end - start);
        for _ in start..end {
            let last = self.dense.len() - 1;
            let value = self.data.take(last);
            if let Some(entity) = self.dense.pop() {
                self.sparse[entity.index as usize] = NONE;
                removed.push((entity, value));
            }
        }
        removed.reverse();
        self.ranges.release(id, p, (end - start) as u32);
        Some(removed)
    }

    /// Delete range `id`, dropping its components without running removal
    /// hooks. Returns the number removed, or `None` for a stale id.
    pub fn delete_range(&mut self, id: RangeId) -> Option<usize> {
        self.remove_range_any(id).map(|removed| removed.len())
    }

    /// Move range `id` behind every other range, rotating its members past
    /// the ranges that followed it. Returns `false` for a stale id.
    pub fn move_range_last(&mut self, id: RangeId) -> bool {
        let Some(p) = self.ranges.position(id) else {
            return false;
        };
        let last = self.ranges.live() - 1;
        let Range { start, end } = self.ranges.bounds(p);
        let last_end = self.ranges.ends[last] as usize;
        let order: Vec<usize> = (0..start)
            .chain(end..last_end)
            .chain(start..end)
            .chain(last_end..self.len())
            .collect();
        self.reorder(&order, start..last_end);

        let count = (end - start) as u32;
        for i in p..last {
            self.ranges.ends[i] = self.ranges.ends[i + 1] - count;
        }
        self.ranges.shift_order_after(p);
        self.ranges.order[id.index as usize] = last as u32;
        true
    }

    #[cfg(test)]
    fn check_consistency(&self) {
        assert_eq!(self.dense.len(), self.data.len());
        for (k, entity) in self.dense.iter().enumerate() {
            assert_eq!(self.sparse[entity.index as usize], k as u32);
        }
        let mapped = self.sparse.iter().filter(|&&k| k != NONE).count();
        assert_eq!(mapped, self.dense.len());
        assert!(self.ranges.ends.windows(2).all(|w| w[0] <= w[1]));
        assert!(self.ranges.tail() <= self.dense.len());
        let mut positions: Vec<u32> = self.ranges.order.iter().copied().filter(|&p| p != NONE).collect();
        positions.sort_unstable();
        assert_eq!(positions, (0..self.ranges.live() as u32).collect::<Vec<_>>());
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn ent(index: u32) -> Entity {
        Entity {
            index,
            generation: 0,
        }
    }

    fn pool() -> ComponentPool {
        ComponentPool::new::<i32>(ComponentInfo::of::<i32>(), 4)
    }

    #[test]
    fn attach_is_idempotent() {
        let mut pool = pool();
        *pool.attach_with(ent(3), || 10) += 1;
        let value = pool.attach_with(ent(3), || 99);
        assert_eq!(*value, 11);
        assert_eq!(pool.len(), 1);
        pool.check_consistency();
    }

    #[test]
    fn detach_moves_last_into_hole() {
        let mut pool = pool();
        pool.attach_with(ent(0), || 0);
        pool.attach_with(ent(5), || 5);
        pool.attach_with(ent(2), || 2);

        assert_eq!(pool.detach::<i32>(ent(0)), Some(0));
        assert_eq!(pool.entities(), &[ent(2), ent(5)]);
        assert_eq!(pool.get::<i32>(ent(2)), Some(&2));
        assert!(!pool.contains(ent(0)));
        pool.check_consistency();
    }

    #[test]
    fn detach_absent_is_none() {
        let mut pool = pool();
        pool.attach_with(ent(1), || 1);
        assert_eq!(pool.detach::<i32>(ent(7)), None);
        assert_eq!(pool.detach::<i32>(ent(0)), None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn recycled_index_does_not_alias() {
        let mut pool = pool();
        pool.attach_with(ent(1), || 1);
        let recycled = Entity {
            index: 1,
            generation: 1,
        };
        assert!(!pool.contains(recycled));
        assert_eq!(pool.get::<i32>(recycled), None);
    }

    #[test]
    fn grows_in_chunks() {
        let mut pool = pool();
        pool.attach_with(ent(0), || 0);
        assert_eq!(pool.capacity(), 4);
        for i in 1..5 {
            pool.attach_with(ent(i), || i as i32);
        }
        assert_eq!(pool.capacity(), 8);
    }

    #[test]
    fn insert_overwrites() {
        let mut pool = pool();
        pool.insert(ent(0), 1);
        pool.insert(ent(0), 2);
        assert_eq!(pool.values::<i32>(), &[2]);
    }

    #[test]
    fn sort_by_reorders_and_keeps_lookups() {
        let mut pool = pool();
        for (i, v) in [(0, 30), (1, 10), (2, 20)] {
            pool.attach_with(ent(i), || v);
        }
        pool.sort_by::<i32>(|a, b| a.cmp(b));
        assert_eq!(pool.values::<i32>(), &[10, 20, 30]);
        assert_eq!(pool.entities(), &[ent(1), ent(2), ent(0)]);
        assert_eq!(pool.get::<i32>(ent(0)), Some(&30));
        pool.check_consistency();
    }

    #[test]
    fn mixed_sequence_stays_consistent() {
        let mut pool = pool();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..500 {
            let index = rng.gen_range(0..32u32);
            if rng.gen_bool(0.5) {
                pool.attach_with(ent(index), || index as i32);
            } else {
                pool.detach::<i32>(ent(index));
            }
            pool.check_consistency();
        }
        for (entity, value) in pool.iter::<i32>() {
            assert_eq!(entity.index as i32, *value);
        }
    }

    // ── Subpool ranges ───────────────────────────────────────────────

    fn ends(pool: &ComponentPool) -> Vec<u32> {
        pool.ranges.ends.clone()
    }

    /// Entities `a..=h` are indices 0..=7; `sp1` holds a, b, h, `sp2` holds
    /// c, f, g and `sp3` holds d, e. Values are attach order.
    fn ranged() -> (ComponentPool, [RangeId; 3]) {
        let mut pool = ComponentPool::new::<u32>(ComponentInfo::of::<u32>(), 4);
        let ids = [pool.new_range(), pool.new_range(), pool.new_range()];
        assert_eq!(ends(&pool), [0, 0, 0]);
        let members = [0, 0, 1, 2, 2, 1, 1, 0];
        for (value, &range) in members.iter().enumerate() {
            pool.insert_in_range(ids[range], ent(value as u32), value as u32).unwrap();
            pool.check_consistency();
        }
        (pool, ids)
    }

    #[test]
    fn ranges_keep_members_adjacent() {
        let (pool, [sp1, sp2, sp3]) = ranged();
        assert_eq!(ends(&pool), [3, 6, 8]);
        assert_eq!(pool.values::<u32>(), &[0, 1, 7, 5, 6, 2, 4, 3]);
        assert_eq!(pool.range(sp1), Some(0..3));
        assert_eq!(pool.range(sp2), Some(3..6));
        assert_eq!(pool.range(sp3), Some(6..8));
    }

    #[test]
    fn detach_from_range_shifts_boundaries() {
        let (mut pool, [_, _, sp3]) = ranged();

        pool.detach::<u32>(ent(1));
        assert_eq!(ends(&pool), [2, 5, 7]);
        assert_eq!(pool.values::<u32>(), &[0, 7, 2, 5, 6, 3, 4]);

        pool.detach::<u32>(ent(3));
        assert_eq!(ends(&pool), [2, 5, 6]);
        assert_eq!(pool.values::<u32>(), &[0, 7, 2, 5, 6, 4]);

        pool.detach::<u32>(ent(4));
        assert_eq!(ends(&pool), [2, 5, 5]);
        assert_eq!(pool.values::<u32>(), &[0, 7, 2, 5, 6]);

        pool.insert_in_range::<u32>(sp3, ent(3), 8).unwrap();
        pool.insert_in_range::<u32>(sp3, ent(4), 9).unwrap();
        assert_eq!(ends(&pool), [2, 5, 7]);
        assert_eq!(pool.values::<u32>(), &[0, 7, 2, 5, 6, 8, 9]);

        for e in [2, 5, 6] {
            pool.detach::<u32>(ent(e));
        }
        assert_eq!(ends(&pool), [2, 2, 4]);
        assert_eq!(pool.values::<u32>(), &[0, 7, 9, 8]);
        pool.check_consistency();
    }

    #[test]
    fn deleted_range_id_is_recycled_with_new_generation() {
        let (mut pool, [_, sp2, sp3]) = ranged();
        for e in [1, 3, 4] {
            pool.detach::<u32>(ent(e));
        }
        pool.insert_in_range::<u32>(sp3, ent(3), 8).unwrap();
        pool.insert_in_range::<u32>(sp3, ent(4), 9).unwrap();
        for e in [2, 5, 6] {
            pool.detach::<u32>(ent(e));
        }

        assert_eq!(pool.delete_range(sp2), Some(0));
        assert_eq!(ends(&pool), [2, 4]);
        assert_eq!(pool.range(sp2), None);
        assert_eq!(pool.delete_range(sp2), None);

        let fresh = pool.new_range();
        assert_eq!(fresh.index(), sp2.index());
        assert_eq!(fresh.generation(), sp2.generation() + 1);
        assert_eq!(ends(&pool), [2, 4, 4]);
        for (e, v) in [(2, 10), (5, 11), (6, 12)] {
            pool.insert_in_range::<u32>(fresh, ent(e), v).unwrap();
        }
        assert_eq!(ends(&pool), [2, 4, 7]);
        assert_eq!(pool.values::<u32>(), &[0, 7, 9, 8, 10, 11, 12]);

        assert!(pool.move_range_last(sp3));
        assert_eq!(ends(&pool), [2, 5, 7]);
        assert_eq!(pool.values::<u32>(), &[0, 7, 10, 11, 12, 9, 8]);
        assert_eq!(pool.range(sp3), Some(5..7));
        assert_eq!(pool.range(fresh), Some(2..5));
        assert_eq!(pool.get::<u32>(ent(4)), Some(&9));
        pool.check_consistency();
    }

    #[test]
    fn delete_range_compacts_following_slots() {
        let (mut pool, [sp1, sp2, sp3]) = ranged();
        pool.attach_with::<u32>(ent(20), || 20);
        assert_eq!(pool.delete_range(sp2), Some(3));
        assert_eq!(pool.values::<u32>(), &[0, 1, 7, 4, 3, 20]);
        assert_eq!(pool.range(sp1), Some(0..3));
        assert_eq!(pool.range(sp3), Some(3..5));
        assert!(!pool.contains(ent(5)));
        assert_eq!(pool.get::<u32>(ent(20)), Some(&20));
        pool.check_consistency();
    }

    #[test]
    fn tail_survives_range_inserts() {
        let mut pool = ComponentPool::new::<u32>(ComponentInfo::of::<u32>(), 4);
        pool.attach_with::<u32>(ent(10), || 10);
        pool.attach_with::<u32>(ent(11), || 11);
        let range = pool.new_range();
        assert_eq!(pool.range(range), Some(0..0));
        pool.insert_in_range::<u32>(range, ent(0), 0).unwrap();
        assert_eq!(pool.range(range), Some(0..1));
        assert_eq!(pool.values::<u32>(), &[0, 11, 10]);
        pool.detach::<u32>(ent(0));
        assert_eq!(pool.range(range), Some(0..0));
        assert_eq!(pool.len(), 2);
        pool.check_consistency();
    }

    #[test]
    fn sort_range_leaves_other_slots() {
        let (mut pool, [_, sp2, _]) = ranged();
        let range = pool.range(sp2).unwrap();
        pool.sort_range_by::<u32>(range, |a, b| a.cmp(b));
        assert_eq!(pool.values::<u32>(), &[0, 1, 7, 2, 5, 6, 4, 3]);
        assert_eq!(pool.get::<u32>(ent(2)), Some(&2));
        pool.check_consistency();
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn sort_range_past_end_panics() {
        let mut pool = pool();
        pool.attach_with(ent(0), || 0);
        pool.sort_range_by::<i32>(0..2, |a, b| a.cmp(b));
    }
}
