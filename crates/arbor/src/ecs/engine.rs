//! # Hierarchy Engine — Structural Operations
//!
//! The [`Registry`] methods that build and restructure hierarchies. Each one
//! validates its arguments, moves rows with the position-level primitives of
//! [`Hierarchy`], then rewrites the [`HierRef`] of every entity whose position
//! changed.
//!
//! ## Usage
//!
//! ```
//! use arbor::prelude::*;
//!
//! let mut registry = Registry::new();
//! let root = registry.create_named("root");
//! let arm = registry.create_named("arm");
//! let hand = registry.create_named("hand");
//!
//! registry.new_tree(root, HierarchyLayout::new()).unwrap();
//! registry.add_child(root, arm).unwrap();
//! registry.add_child(arm, hand).unwrap();
//!
//! // Move the hand under the root; it becomes the root's last child.
//! registry.set_entity_parent(hand, Some(root)).unwrap();
//! assert_eq!(registry.children_of(root), vec![arm, hand]);
//! ```
//!
//! ## Design: Graft, Then Remove
//!
//! Reparenting is two primitives. First the moved subtree is lifted into a
//! fragment and inserted under the new parent, one sibling block at a time,
//! so the destination stays in canonical order. Then the now-unbound source
//! rows are removed. Inside one hierarchy the insertion can shift the source,
//! so its position is tracked across every block insert.
//!
//! Every rejection happens before the first write, so an `Err` leaves all
//! hierarchies exactly as they were.

use super::entity::Entity;
use super::error::HierarchyError;
use super::hierarchy::{self, HierRef, Hierarchy, HierarchyId, Removed};
use super::layout::HierarchyLayout;
use super::pool::ComponentPool;
use super::registry::{HIERREF_POOL, Name, Registry};

/// Where [`Registry::insert_subtree`] put things.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Graft {
    /// Root of the inserted block.
    pub node: HierRef,
    /// The copied source node's position after the insertion. Its rows are
    /// unbound and waiting for [`Registry::remove_subtree`].
    pub source: Option<HierRef>,
}

impl Registry {
    // ── Instances ────────────────────────────────────────────────────

    /// Create a hierarchy instance with room for `capacity` nodes.
    ///
    /// With `create_root`, a single unbound root is written at position 0.
    pub fn new_hierarchy(&mut self, layout: HierarchyLayout, capacity: usize, create_root: bool) -> HierarchyId {
        let owner = self.create();
        let grow = self.config().hierarchy_grow;
        self.hierarchies
            .insert(owner.index, Hierarchy::new(layout, capacity, grow, create_root));
        log::debug!("new_hierarchy: {owner:?} (capacity {capacity}, root: {create_root})");
        HierarchyId(owner)
    }

    pub fn hierarchy(&self, id: HierarchyId) -> Option<&Hierarchy> {
        if !self.is_alive(id.0) {
            return None;
        }
        self.hierarchies.get(&id.0.index)
    }

    /// Mutable access for payload writes. Structure only changes through the
    /// registry operations.
    pub fn hierarchy_mut(&mut self, id: HierarchyId) -> Option<&mut Hierarchy> {
        if !self.is_alive(id.0) {
            return None;
        }
        self.hierarchies.get_mut(&id.0.index)
    }

    /// Delete a hierarchy instance. Members stay alive with unbound refs.
    ///
    /// Returns `false` if the hierarchy does not exist.
    pub fn delete_hierarchy(&mut self, id: HierarchyId) -> bool {
        if self.hierarchy(id).is_none() {
            return false;
        }
        self.destroy(id.0)
    }

    /// Clone a hierarchy's structure and payload. Every node of the copy gets
    /// a fresh entity (named after the original, if it had a [`Name`]).
    pub fn copy_hierarchy(&mut self, source: HierarchyId) -> Result<HierarchyId, HierarchyError> {
        let original = self
            .hierarchy(source)
            .ok_or(HierarchyError::InvalidHierarchy(source))
            .inspect_err(|err| log::error!("copy_hierarchy: {err}"))?;
        let copy = original.duplicate();
        let names: Vec<Option<String>> = original
            .entities()
            .iter()
            .map(|e| e.and_then(|e| self.name_of(e)).map(str::to_owned))
            .collect();

        let owner = self.create();
        let id = HierarchyId(owner);
        self.hierarchies.insert(owner.index, copy);
        for (index, name) in names.into_iter().enumerate() {
            let entity = self.create();
            if let Some(name) = name {
                self.insert(entity, Name(name));
            }
            let (copy, refs) = self.store_mut(id)?;
            copy.set_entity(index as u32, Some(entity));
            hierarchy::bind(refs, id, index as u32, entity);
        }
        log::debug!("copy_hierarchy: {source:?} -> {id:?}");
        Ok(id)
    }

    // ── Node insertion ───────────────────────────────────────────────

    /// Write the root of an empty hierarchy, optionally bound to `entity`.
    pub fn insert_root(&mut self, id: HierarchyId, entity: Option<Entity>) -> Result<HierRef, HierarchyError> {
        self.try_insert_root(id, entity)
            .inspect_err(|err| log::error!("insert_root: {err}"))
    }

    fn try_insert_root(&mut self, id: HierarchyId, entity: Option<Entity>) -> Result<HierRef, HierarchyError> {
        let target = self.hierarchy(id).ok_or(HierarchyError::InvalidHierarchy(id))?;
        if !target.is_empty() {
            return Err(HierarchyError::RootOccupied(id));
        }
        if let Some(entity) = entity {
            self.check_bindable(entity)?;
        }
        let (target, refs) = self.store_mut(id)?;
        let at = target.insert_root();
        if let Some(entity) = entity {
            target.set_entity(at, Some(entity));
            hierarchy::bind(refs, id, at, entity);
        }
        Ok(HierRef::new(id, at))
    }

    /// Append a new leaf to `parent`'s children, optionally bound to `entity`.
    pub fn insert_node(&mut self, parent: HierRef, entity: Option<Entity>) -> Result<HierRef, HierarchyError> {
        self.try_insert_node(parent, entity)
            .inspect_err(|err| log::error!("insert_node: {err}"))
    }

    fn try_insert_node(&mut self, parent: HierRef, entity: Option<Entity>) -> Result<HierRef, HierarchyError> {
        let (id, parent) = self.resolve(parent)?;
        if let Some(entity) = entity {
            self.check_bindable(entity)?;
        }
        let at = self.graft_leaf(id, Some(parent))?;
        if let Some(entity) = entity {
            let (target, refs) = self.store_mut(id)?;
            target.set_entity(at, Some(entity));
            hierarchy::bind(refs, id, at, entity);
        }
        Ok(HierRef::new(id, at))
    }

    /// Insert under `parent` of `dest` (or as the root of an empty `dest`).
    ///
    /// With `source = None` this is one new unbound leaf. Otherwise the
    /// subtree at `source` is copied in, from the same or another hierarchy
    /// with the same layout. Its entities move to the copy; the source rows
    /// stay behind unbound until removed with [`remove_subtree`](Self::remove_subtree).
    pub fn insert_subtree(
        &mut self,
        dest: HierarchyId,
        parent: Option<u32>,
        source: Option<HierRef>,
    ) -> Result<Graft, HierarchyError> {
        self.try_insert_subtree(dest, parent, source)
            .inspect_err(|err| log::error!("insert_subtree: {err}"))
    }

    fn try_insert_subtree(
        &mut self,
        dest: HierarchyId,
        parent: Option<u32>,
        source: Option<HierRef>,
    ) -> Result<Graft, HierarchyError> {
        let target = self.hierarchy(dest).ok_or(HierarchyError::InvalidHierarchy(dest))?;
        match parent {
            Some(index) if index as usize >= target.len() => {
                return Err(HierarchyError::PositionOutOfBounds {
                    hierarchy: dest,
                    index,
                    len: target.len(),
                });
            }
            None if !target.is_empty() => return Err(HierarchyError::RootOccupied(dest)),
            _ => {}
        }

        let Some(source) = source else {
            let at = self.graft_leaf(dest, parent)?;
            return Ok(Graft {
                node: HierRef::new(dest, at),
                source: None,
            });
        };

        let (origin, position) = self.resolve(source)?;
        self.check_move(dest, parent, origin, position)?;
        let (at, moved) = self.graft_subtree(dest, parent, origin, position)?;
        Ok(Graft {
            node: HierRef::new(dest, at),
            source: Some(HierRef::new(origin, moved)),
        })
    }

    // ── Removal ──────────────────────────────────────────────────────

    /// Remove `node` and all its descendants. Their entities are unbound, or
    /// destroyed with `destroy_entities`.
    ///
    /// Returns the number of removed nodes. An emptied hierarchy is kept.
    pub fn remove_subtree(&mut self, node: HierRef, destroy_entities: bool) -> Result<usize, HierarchyError> {
        let (id, position) = self
            .resolve(node)
            .inspect_err(|err| log::error!("remove_subtree: {err}"))?;
        let removed = self.remove_rows(id, position)?;
        if destroy_entities {
            for entity in &removed.entities {
                self.destroy(*entity);
            }
        }
        Ok(removed.rows.len())
    }

    // ── Reparenting ──────────────────────────────────────────────────

    /// Move `node` and its subtree to the end of `new_parent`'s children, or
    /// into a new standalone hierarchy when `new_parent` is `None`.
    ///
    /// Returns the node's new reference. A source hierarchy left empty by a
    /// move into another hierarchy is deleted.
    pub fn set_parent(&mut self, new_parent: Option<HierRef>, node: HierRef) -> Result<HierRef, HierarchyError> {
        self.try_set_parent(new_parent, node)
            .inspect_err(|err| log::error!("set_parent: {err}"))
    }

    fn try_set_parent(&mut self, new_parent: Option<HierRef>, node: HierRef) -> Result<HierRef, HierarchyError> {
        let (origin, position) = self.resolve(node)?;
        let Some(new_parent) = new_parent else {
            return self.detach_to_new_hierarchy(origin, position);
        };
        let (dest, parent) = self.resolve(new_parent)?;
        self.check_move(dest, Some(parent), origin, position)?;

        let source = self.hierarchy(origin).ok_or(HierarchyError::InvalidHierarchy(origin))?;
        if dest == origin && source.parent(position) == Some(parent) {
            return Ok(node);
        }

        let (at, moved) = self.graft_subtree(dest, Some(parent), origin, position)?;
        let removed = self.remove_rows(origin, moved)?;
        debug_assert!(removed.entities.is_empty());

        if dest == origin {
            log::debug!("set_parent: moved {position} under {parent} in {dest:?}");
            return Ok(HierRef::new(dest, removed.remap(at)));
        }
        if self.hierarchy(origin).is_some_and(Hierarchy::is_empty) {
            self.destroy(origin.0);
        }
        log::debug!("set_parent: moved {origin:?}[{position}] under {dest:?}[{parent}]");
        Ok(HierRef::new(dest, at))
    }

    fn detach_to_new_hierarchy(&mut self, origin: HierarchyId, position: u32) -> Result<HierRef, HierarchyError> {
        if position == 0 {
            return Ok(HierRef::new(origin, 0));
        }
        let source = self.hierarchy(origin).ok_or(HierarchyError::InvalidHierarchy(origin))?;
        let layout = source.layout().clone();
        let size = source.subtree(position).len();

        let dest = self.new_hierarchy(layout, size, false);
        let (at, moved) = self.graft_subtree(dest, None, origin, position)?;
        self.remove_rows(origin, moved)?;
        log::debug!("set_parent: detached {origin:?}[{position}] into {dest:?}");
        Ok(HierRef::new(dest, at))
    }

    // ── Entity-level surface ─────────────────────────────────────────

    /// The bound back-reference of `entity`, if it is a hierarchy member.
    pub fn node_ref(&self, entity: Entity) -> Option<HierRef> {
        self.get::<HierRef>(entity).copied().filter(|node| node.is_bound())
    }

    /// Start a new hierarchy with `root` as its root node.
    pub fn new_tree(&mut self, root: Entity, layout: HierarchyLayout) -> Result<HierRef, HierarchyError> {
        self.check_bindable(root)
            .inspect_err(|err| log::error!("new_tree: {err}"))?;
        let id = self.new_hierarchy(layout, 1, false);
        self.insert_root(id, Some(root))
    }

    /// Place `child` (not yet a member of any hierarchy) under `parent`.
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> Result<HierRef, HierarchyError> {
        let Some(parent_node) = self.node_ref(parent) else {
            let err = HierarchyError::NotInHierarchy(parent);
            log::error!("add_child: {err}");
            return Err(err);
        };
        self.insert_node(parent_node, Some(child))
    }

    /// Bind `entity` to the unbound node `node`.
    pub fn bind_entity(&mut self, node: HierRef, entity: Entity) -> Result<(), HierarchyError> {
        let (id, position) = self
            .resolve(node)
            .inspect_err(|err| log::error!("bind_entity: {err}"))?;
        self.check_bindable(entity)
            .inspect_err(|err| log::error!("bind_entity: {err}"))?;
        let (target, refs) = self.store_mut(id)?;
        if let Some(previous) = target.set_entity(position, Some(entity)) {
            hierarchy::unbind(refs, &[previous]);
        }
        hierarchy::bind(refs, id, position, entity);
        Ok(())
    }

    /// Reparent by entity: `child` moves under `parent`, or becomes the root
    /// of its own hierarchy when `parent` is `None`. A `child` outside any
    /// hierarchy is added as a new leaf.
    pub fn set_entity_parent(&mut self, child: Entity, parent: Option<Entity>) -> Result<HierRef, HierarchyError> {
        match (self.node_ref(child), parent) {
            (Some(node), None) => self.set_parent(None, node),
            (Some(node), Some(parent)) => {
                let Some(parent_node) = self.node_ref(parent) else {
                    let err = HierarchyError::NotInHierarchy(parent);
                    log::error!("set_entity_parent: {err}");
                    return Err(err);
                };
                self.set_parent(Some(parent_node), node)
            }
            (None, Some(parent)) => self.add_child(parent, child),
            (None, None) => {
                let err = HierarchyError::NotInHierarchy(child);
                log::error!("set_entity_parent: {err}");
                Err(err)
            }
        }
    }

    /// The entity bound to `entity`'s parent node.
    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        let node = self.node_ref(entity)?;
        let tree = self.hierarchy(node.hierarchy()?)?;
        tree.entity(tree.parent(node.index())?)
    }

    /// Entities bound to `entity`'s child nodes, in sibling order.
    pub fn children_of(&self, entity: Entity) -> Vec<Entity> {
        let Some(node) = self.node_ref(entity) else {
            return Vec::new();
        };
        let Some(tree) = node.hierarchy().and_then(|id| self.hierarchy(id)) else {
            return Vec::new();
        };
        tree.children(node.index())
            .filter_map(|i| tree.entity(i))
            .collect()
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Called from the `HierRef` removal hook once `entity`'s ref is gone.
    pub(crate) fn detach_removed_node(&mut self, id: HierarchyId, index: u32, entity: Entity) {
        let Some(tree) = self.hierarchy(id) else {
            return;
        };
        if tree.entity(index) != Some(entity) {
            log::warn!("detach: {entity:?} is not at {id:?}[{index}], leaving hierarchy untouched");
            return;
        }
        let Ok((tree, _)) = self.store_mut(id) else {
            return;
        };
        tree.set_entity(index, None);
        let Ok(removed) = self.remove_rows(id, index) else {
            return;
        };
        for descendant in &removed.entities {
            self.destroy(*descendant);
        }
        if self.hierarchy(id).is_some_and(Hierarchy::is_empty) {
            self.destroy(id.0);
        }
    }

    fn resolve(&self, node: HierRef) -> Result<(HierarchyId, u32), HierarchyError> {
        let id = node.hierarchy().ok_or(HierarchyError::Unbound)?;
        let tree = self.hierarchy(id).ok_or(HierarchyError::InvalidHierarchy(id))?;
        if node.index() as usize >= tree.len() {
            return Err(HierarchyError::PositionOutOfBounds {
                hierarchy: id,
                index: node.index(),
                len: tree.len(),
            });
        }
        Ok((id, node.index()))
    }

    fn check_bindable(&self, entity: Entity) -> Result<(), HierarchyError> {
        if !self.is_alive(entity) {
            return Err(HierarchyError::DeadEntity(entity));
        }
        if self.node_ref(entity).is_some() {
            return Err(HierarchyError::AlreadyInHierarchy(entity));
        }
        Ok(())
    }

    /// Reject moving `origin[position]` under `dest[parent]` when layouts
    /// differ or the parent sits inside the moved subtree.
    fn check_move(
        &self,
        dest: HierarchyId,
        parent: Option<u32>,
        origin: HierarchyId,
        position: u32,
    ) -> Result<(), HierarchyError> {
        let target = self.hierarchy(dest).ok_or(HierarchyError::InvalidHierarchy(dest))?;
        let source = self.hierarchy(origin).ok_or(HierarchyError::InvalidHierarchy(origin))?;
        if !target.layout().same_shape(source.layout()) {
            return Err(HierarchyError::LayoutMismatch { target: dest, origin });
        }
        if let (true, Some(parent)) = (dest == origin, parent) {
            if parent == position || source.is_ancestor(position, parent) {
                return Err(HierarchyError::CycleDetected { node: position, parent });
            }
        }
        Ok(())
    }

    fn store_mut(&mut self, id: HierarchyId) -> Result<(&mut Hierarchy, &mut ComponentPool), HierarchyError> {
        let tree = self
            .hierarchies
            .get_mut(&id.0.index)
            .ok_or(HierarchyError::InvalidHierarchy(id))?;
        Ok((tree, &mut self.pools[HIERREF_POOL]))
    }

    fn graft_leaf(&mut self, dest: HierarchyId, parent: Option<u32>) -> Result<u32, HierarchyError> {
        let (target, refs) = self.store_mut(dest)?;
        let at = target.insert_leaf(parent);
        hierarchy::sync_refs(refs, dest, target, at as usize);
        Ok(at)
    }

    /// Copy `origin[position]` under `dest[parent]`. Returns the new node's
    /// position and the (possibly shifted) source position.
    fn graft_subtree(
        &mut self,
        dest: HierarchyId,
        parent: Option<u32>,
        origin: HierarchyId,
        position: u32,
    ) -> Result<(u32, u32), HierarchyError> {
        let fragment = self.store_mut(origin)?.0.take_fragment(position);
        let mut moved = position;
        let (target, refs) = self.store_mut(dest)?;
        let at = target.insert_fragment(parent, &fragment, (dest == origin).then_some(&mut moved));
        hierarchy::sync_refs(refs, dest, target, at as usize);
        log::debug!("graft: {} nodes into {dest:?} at {at}", fragment.len());
        Ok((at, moved))
    }

    fn remove_rows(&mut self, id: HierarchyId, position: u32) -> Result<Removed, HierarchyError> {
        let (tree, refs) = self.store_mut(id)?;
        let removed = tree.remove_rows(position);
        hierarchy::unbind(refs, &removed.entities);
        hierarchy::sync_refs(refs, id, tree, position as usize);
        debug_assert!(tree.check_invariants().is_ok());
        log::debug!("remove: {} nodes from {id:?} at {position}", removed.rows.len());
        Ok(removed)
    }
}
