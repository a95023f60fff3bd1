#![allow(dead_code)]

use std::collections::HashMap;

use arbor::prelude::*;

pub const N: Option<u32> = None;

/// `(entity, index, parent, child_index, child_count)`
pub type Row = (Entity, u32, Option<u32>, u32, u32);

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create a named entity, as a new root or as the last child of `parent`.
pub fn spawn(registry: &mut Registry, parent: Option<Entity>, name: &str) -> Entity {
    let entity = registry.create_named(name);
    let placed = match parent {
        Some(parent) => registry.add_child(parent, entity),
        None => registry.new_tree(entity, HierarchyLayout::new()),
    };
    placed.unwrap_or_else(|err| panic!("spawn {name}: {err}"));
    entity
}

/// Spawn `(parent, name)` pairs in order; an empty parent starts a new tree.
pub fn build(registry: &mut Registry, nodes: &[(&'static str, &'static str)]) -> HashMap<&'static str, Entity> {
    let mut names = HashMap::new();
    for &(parent, name) in nodes {
        let parent = (!parent.is_empty()).then(|| names[parent]);
        names.insert(name, spawn(registry, parent, name));
    }
    names
}

/// The thirteen-node tree used throughout the scenarios.
pub const THIRTEEN: &[(&str, &str)] = &[
    ("", "root"),
    ("root", "A"),
    ("root", "B"),
    ("root", "C"),
    ("B", "B1"),
    ("A", "A1"),
    ("A1", "A1a"),
    ("B", "B2"),
    ("A", "A2"),
    ("B", "B3"),
    ("B2", "B2a"),
    ("root", "D"),
    ("C", "C1"),
];

pub fn hierarchy_of(registry: &Registry, entity: Entity) -> HierarchyId {
    registry
        .node_ref(entity)
        .and_then(HierRef::hierarchy)
        .unwrap_or_else(|| panic!("{} is not in a hierarchy", label(registry, entity)))
}

fn label(registry: &Registry, entity: Entity) -> String {
    registry
        .name_of(entity)
        .map_or_else(|| entity.to_string(), str::to_owned)
}

/// Assert the hierarchy holding `entity` has `size` nodes, satisfies its
/// invariants and that every bound entity's ref points back at its row.
pub fn check_size(registry: &Registry, entity: Entity, size: usize) -> HierarchyId {
    let id = hierarchy_of(registry, entity);
    check_tree(registry, id);
    assert_eq!(registry.hierarchy(id).map(Hierarchy::len), Some(size));
    id
}

pub fn check_tree(registry: &Registry, id: HierarchyId) {
    let tree = registry.hierarchy(id).expect("hierarchy exists");
    if let Err(err) = tree.check_invariants() {
        panic!("{err}\n{}", dump(registry, id));
    }
    for (i, entity) in tree.entities().iter().enumerate() {
        if let Some(entity) = entity {
            assert_eq!(
                registry.node_ref(*entity),
                Some(HierRef::new(id, i as u32)),
                "stale ref for {}\n{}",
                label(registry, *entity),
                dump(registry, id)
            );
        }
    }
}

pub fn check_rows(registry: &Registry, rows: &[Row]) {
    for &(entity, index, parent, child_index, child_count) in rows {
        let name = label(registry, entity);
        let node = registry
            .node_ref(entity)
            .unwrap_or_else(|| panic!("{name} is not in a hierarchy"));
        let id = node.hierarchy().expect("bound ref");
        let tree = registry.hierarchy(id).expect("hierarchy exists");
        let found = (
            node.index(),
            tree.parent(node.index()),
            tree.child_index()[node.index() as usize],
            tree.child_count()[node.index() as usize],
        );
        assert_eq!(
            found,
            (index, parent, child_index, child_count),
            "{name}: (index, parent, child_index, child_count)\n{}",
            dump(registry, id)
        );
    }
}

#[cfg(feature = "diagnostics")]
pub fn dump(registry: &Registry, id: HierarchyId) -> String {
    registry
        .hierarchy_snapshot(id)
        .map(|snapshot| snapshot.table())
        .unwrap_or_default()
}

#[cfg(not(feature = "diagnostics"))]
pub fn dump(_registry: &Registry, _id: HierarchyId) -> String {
    String::new()
}
