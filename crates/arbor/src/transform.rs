//! # Transform Hierarchies
//!
//! A transform hierarchy carries three payload columns per node:
//!
//! | column     | type   | meaning                                 |
//! |------------|--------|-----------------------------------------|
//! | `modified` | `bool` | local matrix changed since last update  |
//! | `local`    | `Mat4` | transform relative to the parent        |
//! | `world`    | `Mat4` | `world[parent] * local`, after update   |
//!
//! ## Usage
//!
//! ```
//! use arbor::prelude::*;
//!
//! let mut registry = Registry::new();
//! let body = registry.new_transform(None).unwrap();
//! let arm = registry.new_transform(Some(body)).unwrap();
//!
//! registry.set_local_transform(body, Transform::from_xyz(100.0, 0.0, 0.0));
//! registry.set_local_transform(arm, Transform::from_xyz(10.0, 0.0, 0.0));
//! let id = registry.node_ref(body).unwrap().hierarchy().unwrap();
//! registry.update_world_matrices(id);
//!
//! let world = registry.world_matrix(arm).unwrap();
//! assert_eq!(world.col(3).x, 110.0);
//! ```
//!
//! ## Design: One Forward Pass
//!
//! Hierarchy positions are topologically ordered, so [`propagate`] walks the
//! columns once, front to back. A node is recomputed when it or its parent is
//! marked; marking a node passes the mark on to everything below it.
//!
//! ## Comparison
//!
//! - **bevy_transform**: `Transform` + `GlobalTransform` components, recursive
//!   descent from roots with change detection.

use crate::ecs::entity::Entity;
use crate::ecs::error::HierarchyError;
use crate::ecs::hierarchy::{HierRef, Hierarchy, HierarchyId};
use crate::ecs::layout::{HierarchyLayout, column_slice, column_slice_mut};
use crate::ecs::registry::Registry;
use crate::math::{Mat4, Transform};

pub const MODIFIED: usize = 0;
pub const LOCAL: usize = 1;
pub const WORLD: usize = 2;

/// The payload layout every transform hierarchy uses.
pub fn transform_layout() -> HierarchyLayout {
    HierarchyLayout::new()
        .with_column::<bool>("modified")
        .with_column::<Mat4>("local")
        .with_column::<Mat4>("world")
}

/// Recompute world matrices of marked nodes and their descendants, then clear
/// every mark.
///
/// # Panics
///
/// Panics if `hierarchy` was not built with [`transform_layout`].
pub fn propagate(hierarchy: &mut Hierarchy) {
    let (parents, columns) = hierarchy.parents_and_payload_mut();
    if parents.is_empty() {
        return;
    }
    let (flags, matrices) = columns.split_at_mut(LOCAL);
    let (local, world) = matrices.split_at_mut(WORLD - LOCAL);
    let modified = column_slice_mut::<bool>(&mut *flags[0]);
    let local = column_slice::<Mat4>(&*local[0]);
    let world = column_slice_mut::<Mat4>(&mut *world[0]);

    if modified[0] {
        world[0] = local[0];
    }
    for i in 1..parents.len() {
        let parent = parents[i] as usize;
        if modified[i] || modified[parent] {
            modified[i] = true;
            world[i] = world[parent] * local[i];
        }
    }
    modified.fill(false);
}

impl Registry {
    /// Create an entity with an identity transform, as the root of a new
    /// transform hierarchy or as the last child of `parent`.
    pub fn new_transform(&mut self, parent: Option<Entity>) -> Result<Entity, HierarchyError> {
        if let Some(parent) = parent {
            self.node_ref(parent)
                .ok_or(HierarchyError::NotInHierarchy(parent))
                .and_then(|node| self.transform_tree(node))
                .inspect_err(|err| log::error!("new_transform: {err}"))?;
        }
        let entity = self.create();
        let created = match parent {
            Some(parent) => self.add_child(parent, entity),
            None => self.new_tree(entity, transform_layout()),
        };
        match created {
            Ok(node) => {
                self.mark_modified(node);
                Ok(entity)
            }
            Err(err) => {
                self.destroy(entity);
                Err(err)
            }
        }
    }

    /// Replace an entity's local transform and mark it for the next update.
    ///
    /// Returns `false` if the entity is not in a transform hierarchy.
    pub fn set_local_transform(&mut self, entity: Entity, transform: Transform) -> bool {
        let Some(node) = self.node_ref(entity) else {
            return false;
        };
        let Ok(id) = self.transform_tree(node) else {
            return false;
        };
        let Some(tree) = self.hierarchy_mut(id) else {
            return false;
        };
        let i = node.index() as usize;
        tree.column_mut::<Mat4>(LOCAL)[i] = transform.matrix();
        tree.column_mut::<bool>(MODIFIED)[i] = true;
        true
    }

    pub fn local_matrix(&self, entity: Entity) -> Option<Mat4> {
        self.read_matrix(entity, LOCAL)
    }

    /// World matrix as of the last [`update_world_matrices`](Self::update_world_matrices).
    pub fn world_matrix(&self, entity: Entity) -> Option<Mat4> {
        self.read_matrix(entity, WORLD)
    }

    /// Run [`propagate`] over one transform hierarchy.
    ///
    /// Returns `false` if `id` is not a live transform hierarchy.
    pub fn update_world_matrices(&mut self, id: HierarchyId) -> bool {
        let layout = transform_layout();
        match self.hierarchy_mut(id) {
            Some(tree) if tree.layout().same_shape(&layout) => {
                propagate(tree);
                true
            }
            _ => false,
        }
    }

    /// Reparent within transform hierarchies, then refresh world matrices of
    /// the moved subtree.
    ///
    /// Both the child's current tree (if any) and the new parent's tree must
    /// be transform hierarchies. Nothing moves when either check fails.
    pub fn set_transform_parent(&mut self, child: Entity, parent: Option<Entity>) -> Result<HierRef, HierarchyError> {
        self.check_transform_move(child, parent)
            .inspect_err(|err| log::error!("set_transform_parent: {err}"))?;
        let node = self.set_entity_parent(child, parent)?;
        let id = self.transform_tree(node)?;
        self.mark_modified(node);
        self.update_world_matrices(id);
        Ok(node)
    }

    fn check_transform_move(&self, child: Entity, parent: Option<Entity>) -> Result<(), HierarchyError> {
        if let Some(parent) = parent {
            let node = self.node_ref(parent).ok_or(HierarchyError::NotInHierarchy(parent))?;
            self.transform_tree(node)?;
        }
        if let Some(node) = self.node_ref(child) {
            self.transform_tree(node)?;
        }
        Ok(())
    }

    fn transform_tree(&self, node: HierRef) -> Result<HierarchyId, HierarchyError> {
        let id = node.hierarchy().ok_or(HierarchyError::Unbound)?;
        let tree = self.hierarchy(id).ok_or(HierarchyError::InvalidHierarchy(id))?;
        if !tree.layout().same_shape(&transform_layout()) {
            return Err(HierarchyError::NotTransformHierarchy(id));
        }
        Ok(id)
    }

    fn mark_modified(&mut self, node: HierRef) {
        if let Some(tree) = node.hierarchy().and_then(|id| self.hierarchy_mut(id)) {
            tree.column_mut::<bool>(MODIFIED)[node.index() as usize] = true;
        }
    }

    fn read_matrix(&self, entity: Entity, column: usize) -> Option<Mat4> {
        let node = self.node_ref(entity)?;
        let id = self.transform_tree(node).ok()?;
        let tree = self.hierarchy(id)?;
        tree.column::<Mat4>(column).get(node.index() as usize).copied()
    }
}
