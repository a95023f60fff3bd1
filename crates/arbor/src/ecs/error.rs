use thiserror::Error;

use super::entity::Entity;
use super::hierarchy::HierarchyId;

/// Rejected hierarchy operation. No state is modified when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("hierarchy {0:?} does not exist")]
    InvalidHierarchy(HierarchyId),

    #[error("node reference is not bound to any hierarchy")]
    Unbound,

    #[error("position {index} is out of bounds for hierarchy {hierarchy:?} with {len} nodes")]
    PositionOutOfBounds {
        hierarchy: HierarchyId,
        index: u32,
        len: usize,
    },

    #[error("hierarchies {target:?} and {origin:?} have different payload layouts")]
    LayoutMismatch {
        target: HierarchyId,
        origin: HierarchyId,
    },

    #[error("cannot move node {node} under {parent}, which lies inside its own subtree")]
    CycleDetected { node: u32, parent: u32 },

    #[error("hierarchy {0:?} already has a root")]
    RootOccupied(HierarchyId),

    #[error("entity {0} is not a member of any hierarchy")]
    NotInHierarchy(Entity),

    #[error("entity {0} already belongs to a hierarchy")]
    AlreadyInHierarchy(Entity),

    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    #[error("hierarchy {0:?} does not carry transform columns")]
    NotTransformHierarchy(HierarchyId),
}

/// A broken structural invariant, reported by
/// [`Hierarchy::check_invariants`](super::hierarchy::Hierarchy::check_invariants).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("root has parent {0}, expected none")]
    RootHasParent(u32),

    #[error("node {index} has parent {parent}, which does not precede it")]
    TopologicalOrder { index: u32, parent: u32 },

    #[error("node {index} starts its child block at {found}, expected {expected}")]
    ChildIndex {
        index: u32,
        expected: u32,
        found: u32,
    },

    #[error("child block of node {index} ends at {end}, past the {len} stored nodes")]
    BlockOutOfBounds { index: u32, end: u32, len: usize },

    #[error("node {child} lies in the child block of {expected} but records parent {found}")]
    ParentMismatch {
        child: u32,
        expected: u32,
        found: u32,
    },

    #[error("child blocks cover positions up to {covered}, but {len} nodes are stored")]
    Uncovered { covered: u32, len: usize },

    #[error("column `{column}` holds {found} rows, expected {expected}")]
    ColumnLength {
        column: &'static str,
        expected: usize,
        found: usize,
    },
}
