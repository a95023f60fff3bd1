//! # Hierarchy — Trees as Flat Parallel Arrays
//!
//! A [`Hierarchy`] stores one tree as a handful of equally long columns. No
//! node owns a pointer to another; every relation is a position:
//!
//! ```text
//!            root                 pos:  0    1    2    3    4    5
//!          /  |  \                ent:  R    A    B    C    B1   B2
//!         A   B   C               parent_index: ~    0    0    0    2    2
//!            / \                  child_index:  1    4    4    6    6    6
//!           B1  B2                child_count:  3    0    2    0    0    0
//! ```
//!
//! ## Design: Canonical Breadth-First Order
//!
//! Nodes are kept in level order, and the children of each node form one
//! contiguous block `[child_index, child_index + child_count)`. Blocks appear
//! in the order of their parents, so `child_index` never decreases and a
//! leaf's `child_index` is where its first child would go. Two properties
//! follow and every operation preserves them:
//!
//! 1. **Topological order**: `parent_index[i] < i`. One forward pass over the
//!    columns sees every parent before its children, which is what transform
//!    propagation relies on.
//! 2. **Block contiguity**: each child block ends within the column, and
//!    `child_index[i] == 1 + sum(child_count[..i])`.
//!
//! A subtree is therefore contiguous *per level*, not as a whole. Inserting a
//! block shifts the indices behind it, removing a subtree compacts the
//! columns. Both are linear in the shifted range, which keeps reads (the hot
//! path) branch-free.
//!
//! ## Back-References
//!
//! Every entity placed in a hierarchy carries a [`HierRef`] component naming
//! the hierarchy and its current position. The structural primitives here only
//! move rows; the [`Registry`] operations in [`engine`](super::engine) rewrite
//! the refs after each move.
//!
//! ## Comparison
//!
//! - **bevy_ecs**: `Parent`/`Children` components, pointer-chasing traversal.
//! - **Unity DOTS / Frostbite-style scene graphs**: sorted flat arrays, same
//!   idea as here.

use std::any::Any;
use std::fmt;
use std::ops::Range;

use super::entity::{Entity, NULL_INDEX};
use super::error::InvariantViolation;
use super::layout::{HierarchyLayout, PayloadColumn, column_slice, column_slice_mut};
use super::pool::ComponentPool;
use super::registry::Registry;

/// Identifies a hierarchy instance. It is the entity that owns the instance,
/// so ids are generation-checked like any other handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HierarchyId(pub(crate) Entity);

impl HierarchyId {
    pub fn entity(self) -> Entity {
        self.0
    }
}

impl fmt::Debug for HierarchyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hierarchy({})", self.0)
    }
}

/// Back-reference from an entity to its node: `(hierarchy, position)`.
///
/// Maintained by the registry. Removing this component from an entity removes
/// the entity's node from its hierarchy and destroys the node's descendants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HierRef {
    hierarchy: Option<HierarchyId>,
    index: u32,
}

impl HierRef {
    /// A reference to no node.
    pub const UNBOUND: Self = Self {
        hierarchy: None,
        index: NULL_INDEX,
    };

    /// Address the node at `index` of `hierarchy`.
    pub fn new(hierarchy: HierarchyId, index: u32) -> Self {
        Self {
            hierarchy: Some(hierarchy),
            index,
        }
    }

    pub fn hierarchy(self) -> Option<HierarchyId> {
        self.hierarchy
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn is_bound(self) -> bool {
        self.hierarchy.is_some()
    }
}

impl Default for HierRef {
    fn default() -> Self {
        Self::UNBOUND
    }
}

/// Rows lifted out of a hierarchy by [`Hierarchy::take_fragment`], in
/// breadth-first order. Child blocks are relative to the fragment.
pub(crate) struct Fragment {
    ent: Vec<Option<Entity>>,
    child_index: Vec<u32>,
    child_count: Vec<u32>,
    payload: Vec<Box<dyn PayloadColumn>>,
}

impl Fragment {
    pub fn len(&self) -> usize {
        self.ent.len()
    }
}

/// What [`Hierarchy::remove_rows`] took out.
pub(crate) struct Removed {
    /// Removed positions, ascending, as they were before compaction.
    pub rows: Vec<u32>,
    /// Entities that were bound to the removed rows.
    pub entities: Vec<Entity>,
}

impl Removed {
    /// Where a surviving position `pos` lands after compaction.
    pub fn remap(&self, pos: u32) -> u32 {
        pos - self.rows.partition_point(|&r| r < pos) as u32
    }
}

/// One tree stored as parallel columns. See the [module docs](self).
pub struct Hierarchy {
    ent: Vec<Option<Entity>>,
    parent_index: Vec<u32>,
    child_index: Vec<u32>,
    child_count: Vec<u32>,
    payload: Vec<Box<dyn PayloadColumn>>,
    layout: HierarchyLayout,
    /// Capacity is reserved in multiples of this.
    grow: usize,
}

impl Hierarchy {
    pub(crate) fn new(layout: HierarchyLayout, capacity: usize, grow: usize, create_root: bool) -> Self {
        let mut hierarchy = Self {
            ent: Vec::new(),
            parent_index: Vec::new(),
            child_index: Vec::new(),
            child_count: Vec::new(),
            payload: layout.create_columns(),
            layout,
            grow: grow.max(1),
        };
        hierarchy.reserve(capacity.max(usize::from(create_root)));
        if create_root {
            hierarchy.insert_root();
        }
        hierarchy
    }

    // ── Read access ──────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.ent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ent.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ent.capacity()
    }

    pub fn layout(&self) -> &HierarchyLayout {
        &self.layout
    }

    /// The entity bound to `index`, if any.
    pub fn entity(&self, index: u32) -> Option<Entity> {
        self.ent.get(index as usize).copied().flatten()
    }

    pub fn entities(&self) -> &[Option<Entity>] {
        &self.ent
    }

    /// Parent positions; the root holds `NULL_INDEX`.
    pub fn parent_index(&self) -> &[u32] {
        &self.parent_index
    }

    pub fn child_index(&self) -> &[u32] {
        &self.child_index
    }

    pub fn child_count(&self) -> &[u32] {
        &self.child_count
    }

    /// Parent position of `index`, `None` for the root or an unknown position.
    pub fn parent(&self, index: u32) -> Option<u32> {
        self.parent_index
            .get(index as usize)
            .copied()
            .filter(|&p| p != NULL_INDEX)
    }

    /// Positions of `index`'s direct children.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn children(&self, index: u32) -> Range<u32> {
        let start = self.child_index[index as usize];
        start..start + self.child_count[index as usize]
    }

    /// Position of the node bound to `entity`. Linear scan.
    pub fn position_of(&self, entity: Entity) -> Option<u32> {
        self.ent
            .iter()
            .position(|e| *e == Some(entity))
            .map(|p| p as u32)
    }

    /// Number of edges between `index` and the root.
    pub fn depth(&self, index: u32) -> usize {
        let mut depth = 0;
        let mut cursor = index;
        while let Some(parent) = self.parent(cursor) {
            depth += 1;
            cursor = parent;
        }
        depth
    }

    /// True if `ancestor` lies strictly above `node`.
    pub fn is_ancestor(&self, ancestor: u32, node: u32) -> bool {
        let mut cursor = node;
        while let Some(parent) = self.parent(cursor) {
            if parent == ancestor {
                return true;
            }
            if parent < ancestor {
                return false;
            }
            cursor = parent;
        }
        false
    }

    /// Positions of `index` and all its descendants, breadth-first (and so
    /// ascending).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn subtree(&self, index: u32) -> Vec<u32> {
        assert!(
            (index as usize) < self.len(),
            "subtree: position {index} out of bounds ({} nodes)",
            self.len()
        );
        let mut rows = vec![index];
        let mut next = 0;
        while next < rows.len() {
            let row = rows[next] as usize;
            let start = self.child_index[row];
            rows.extend(start..start + self.child_count[row]);
            next += 1;
        }
        debug_assert!(rows.windows(2).all(|w| w[0] < w[1]));
        rows
    }

    /// Typed view of payload column `column`.
    ///
    /// # Panics
    ///
    /// Panics if the column does not exist or does not hold `T`.
    pub fn column<T: 'static>(&self, column: usize) -> &[T] {
        column_slice::<T>(&*self.payload[column])
    }

    /// Mutable typed view of payload column `column`.
    ///
    /// # Panics
    ///
    /// Panics if the column does not exist or does not hold `T`.
    pub fn column_mut<T: 'static>(&mut self, column: usize) -> &mut [T] {
        column_slice_mut::<T>(&mut *self.payload[column])
    }

    pub fn column_by_name<T: 'static>(&self, name: &str) -> Option<&[T]> {
        let index = self.layout.column_index(name)?;
        self.payload[index].as_any().downcast_ref::<Vec<T>>().map(Vec::as_slice)
    }

    /// Parent positions alongside all payload columns, for single-pass
    /// propagation over several columns at once.
    pub fn parents_and_payload_mut(&mut self) -> (&[u32], &mut [Box<dyn PayloadColumn>]) {
        (self.parent_index.as_slice(), self.payload.as_mut_slice())
    }

    /// Verify the structural invariants described in the [module docs](self).
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let len = self.len();
        let lengths = [
            ("parent_index", self.parent_index.len()),
            ("child_index", self.child_index.len()),
            ("child_count", self.child_count.len()),
        ];
        let payload = self
            .layout
            .columns()
            .iter()
            .zip(&self.payload)
            .map(|(desc, column)| (desc.name, column.len()));
        for (column, found) in lengths.into_iter().chain(payload) {
            if found != len {
                return Err(InvariantViolation::ColumnLength {
                    column,
                    expected: len,
                    found,
                });
            }
        }
        if len == 0 {
            return Ok(());
        }
        if self.parent_index[0] != NULL_INDEX {
            return Err(InvariantViolation::RootHasParent(self.parent_index[0]));
        }

        let mut expected = 1u32;
        for i in 0..len {
            let index = i as u32;
            let parent = self.parent_index[i];
            if i > 0 && parent >= index {
                return Err(InvariantViolation::TopologicalOrder { index, parent });
            }
            let start = self.child_index[i];
            if start != expected {
                return Err(InvariantViolation::ChildIndex {
                    index,
                    expected,
                    found: start,
                });
            }
            let end = start.saturating_add(self.child_count[i]);
            if end as usize > len {
                return Err(InvariantViolation::BlockOutOfBounds { index, end, len });
            }
            for child in start..end {
                let found = self.parent_index[child as usize];
                if found != index {
                    return Err(InvariantViolation::ParentMismatch {
                        child,
                        expected: index,
                        found,
                    });
                }
            }
            expected = end;
        }
        if expected as usize != len {
            return Err(InvariantViolation::Uncovered {
                covered: expected,
                len,
            });
        }
        Ok(())
    }

    // ── Structural primitives ────────────────────────────────────────

    /// Grow every column to hold `count` more rows, in `grow`-sized steps.
    fn reserve(&mut self, count: usize) {
        let needed = self.len() + count;
        if needed <= self.ent.capacity() {
            return;
        }
        let additional = needed.div_ceil(self.grow) * self.grow - self.len();
        self.ent.reserve_exact(additional);
        self.parent_index.reserve_exact(additional);
        self.child_index.reserve_exact(additional);
        self.child_count.reserve_exact(additional);
        for column in &mut self.payload {
            column.reserve_rows(additional);
        }
    }

    /// Insert `count` blank rows before `at` in every column.
    fn open(&mut self, at: usize, count: usize) {
        self.reserve(count);
        self.ent.splice(at..at, std::iter::repeat_n(None, count));
        self.parent_index.splice(at..at, std::iter::repeat_n(NULL_INDEX, count));
        self.child_index.splice(at..at, std::iter::repeat_n(0, count));
        self.child_count.splice(at..at, std::iter::repeat_n(0, count));
        for column in &mut self.payload {
            column.open(at, count);
        }
    }

    /// Write the root of an empty hierarchy.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy already has nodes.
    pub(crate) fn insert_root(&mut self) -> u32 {
        assert!(self.is_empty(), "insert_root: hierarchy already has {} nodes", self.len());
        self.open(0, 1);
        self.child_index[0] = 1;
        0
    }

    /// Append `count` new leaves to the end of `parent`'s child block and
    /// return the position of the first one.
    ///
    /// Every position at or after the insertion point moves back by `count`;
    /// the caller rewrites back-references from there on.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is out of bounds.
    pub(crate) fn insert_block(&mut self, parent: u32, count: u32) -> u32 {
        assert!(
            (parent as usize) < self.len(),
            "insert_block: parent {parent} out of bounds ({} nodes)",
            self.len()
        );
        let p = parent as usize;
        let at = self.child_index[p] + self.child_count[p];
        // The new leaves' own (empty) block starts where the block of the
        // node before them ends.
        let before = (at - 1) as usize;
        let first_child = self.child_index[before] + self.child_count[before];

        for start in &mut self.child_index[p + 1..] {
            *start += count;
        }
        for parent_pos in &mut self.parent_index[first_child as usize..] {
            *parent_pos += count;
        }

        self.open(at as usize, count as usize);
        for row in at as usize..(at + count) as usize {
            self.parent_index[row] = parent;
            self.child_index[row] = first_child + count;
        }
        self.child_count[p] += count;
        at
    }

    /// A new leaf under `parent`, or the root when `parent` is `None`.
    pub(crate) fn insert_leaf(&mut self, parent: Option<u32>) -> u32 {
        match parent {
            Some(parent) => self.insert_block(parent, 1),
            None => self.insert_root(),
        }
    }

    /// Copy the subtree at `index` out, moving its entities with it.
    ///
    /// The source rows stay in place, unbound, until the caller removes them.
    pub(crate) fn take_fragment(&mut self, index: u32) -> Fragment {
        let rows = self.subtree(index);
        let child_index = rows
            .iter()
            .map(|&r| {
                let start = self.child_index[r as usize];
                rows.partition_point(|&x| x < start) as u32
            })
            .collect();
        let child_count = rows.iter().map(|&r| self.child_count[r as usize]).collect();
        let ent = rows.iter().map(|&r| self.ent[r as usize].take()).collect();
        let positions: Vec<usize> = rows.iter().map(|&r| r as usize).collect();
        let payload = self.payload.iter().map(|c| c.gather(&positions)).collect();
        Fragment {
            ent,
            child_index,
            child_count,
            payload,
        }
    }

    /// Insert `fragment` as the last child of `parent` (or as the root), one
    /// sibling block at a time. `track` follows a position of this hierarchy
    /// across the insertions.
    pub(crate) fn insert_fragment(
        &mut self,
        parent: Option<u32>,
        fragment: &Fragment,
        mut track: Option<&mut u32>,
    ) -> u32 {
        let root = self.insert_leaf(parent);
        if let Some(tracked) = track.as_deref_mut() {
            if root <= *tracked {
                *tracked += 1;
            }
        }
        self.place(root, fragment, 0);
        self.graft_children(root, fragment, 0, track);
        root
    }

    fn graft_children(&mut self, node: u32, fragment: &Fragment, k: usize, mut track: Option<&mut u32>) {
        let count = fragment.child_count[k];
        if count == 0 {
            return;
        }
        let at = self.insert_block(node, count);
        if let Some(tracked) = track.as_deref_mut() {
            if at <= *tracked {
                *tracked += count;
            }
        }
        let first = fragment.child_index[k] as usize;
        for j in 0..count {
            self.place(at + j, fragment, first + j as usize);
        }
        // Deeper blocks land after this level, so `at + j` stays put.
        for j in 0..count {
            self.graft_children(at + j, fragment, first + j as usize, track.as_deref_mut());
        }
    }

    fn place(&mut self, at: u32, fragment: &Fragment, k: usize) {
        self.ent[at as usize] = fragment.ent[k];
        for (column, source) in self.payload.iter_mut().zip(&fragment.payload) {
            column.copy_rows(at as usize, &**source, k, 1);
        }
    }

    /// Remove the node at `index` and all its descendants, compacting every
    /// column and rewriting surviving indices.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub(crate) fn remove_rows(&mut self, index: u32) -> Removed {
        let rows = self.subtree(index);
        let len = self.len();
        let parent = self.parent_index[index as usize];
        if parent != NULL_INDEX {
            self.child_count[parent as usize] -= 1;
        }

        let mut keep = vec![true; len];
        for &row in &rows {
            keep[row as usize] = false;
        }
        let removed_before = |pos: u32| rows.partition_point(|&r| r < pos) as u32;
        for i in (0..len).filter(|&i| keep[i]) {
            let parent = self.parent_index[i];
            if parent != NULL_INDEX {
                self.parent_index[i] = parent - removed_before(parent);
            }
            self.child_index[i] -= removed_before(self.child_index[i]);
        }

        let entities = rows
            .iter()
            .filter_map(|&r| self.ent[r as usize])
            .collect();
        retain_mask(&mut self.ent, &keep);
        retain_mask(&mut self.parent_index, &keep);
        retain_mask(&mut self.child_index, &keep);
        retain_mask(&mut self.child_count, &keep);
        for column in &mut self.payload {
            column.retain_rows(&keep);
        }
        Removed { rows, entities }
    }

    /// Bind or clear the entity at `index`, returning the previous one.
    pub(crate) fn set_entity(&mut self, index: u32, entity: Option<Entity>) -> Option<Entity> {
        std::mem::replace(&mut self.ent[index as usize], entity)
    }

    /// Same structure and payload, no entities.
    pub(crate) fn duplicate(&self) -> Hierarchy {
        let mut ent = Vec::with_capacity(self.capacity());
        ent.resize(self.len(), None);
        Hierarchy {
            ent,
            parent_index: self.parent_index.clone(),
            child_index: self.child_index.clone(),
            child_count: self.child_count.clone(),
            payload: self.payload.iter().map(|c| c.boxed_clone()).collect(),
            layout: self.layout.clone(),
            grow: self.grow,
        }
    }
}

fn retain_mask<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut row = 0;
    values.retain(|_| {
        let kept = keep[row];
        row += 1;
        kept
    });
}

// ── Back-reference maintenance ───────────────────────────────────────

/// Rewrite the `HierRef` of every entity at position `from` or later.
pub(crate) fn sync_refs(refs: &mut ComponentPool, id: HierarchyId, hierarchy: &Hierarchy, from: usize) {
    for (i, entity) in hierarchy.ent.iter().enumerate().skip(from) {
        if let Some(entity) = entity {
            if let Some(node) = refs.get_mut::<HierRef>(*entity) {
                *node = HierRef::new(id, i as u32);
            }
        }
    }
}

pub(crate) fn bind(refs: &mut ComponentPool, id: HierarchyId, index: u32, entity: Entity) {
    refs.insert(entity, HierRef::new(id, index));
}

pub(crate) fn unbind(refs: &mut ComponentPool, entities: &[Entity]) {
    for entity in entities {
        if let Some(node) = refs.get_mut::<HierRef>(*entity) {
            *node = HierRef::UNBOUND;
        }
    }
}

pub(crate) fn unbind_members(refs: &mut ComponentPool, hierarchy: &Hierarchy) {
    for entity in hierarchy.ent.iter().flatten() {
        if let Some(node) = refs.get_mut::<HierRef>(*entity) {
            *node = HierRef::UNBOUND;
        }
    }
}

/// Removal hook for [`HierRef`]: the entity leaves its hierarchy and takes
/// its descendants with it.
pub(crate) fn on_hierref_removed(registry: &mut Registry, entity: Entity, value: &dyn Any) {
    let Some(&node) = value.downcast_ref::<HierRef>() else {
        return;
    };
    let Some(id) = node.hierarchy() else {
        return;
    };
    registry.detach_removed_node(id, node.index(), entity);
}
