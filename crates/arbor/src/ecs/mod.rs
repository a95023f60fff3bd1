//! # Sparse-Set ECS with Flat Hierarchies
//!
//! Entities are generational handles, components live in one sparse set per
//! type, and parent/child trees are stored as parallel arrays indexed by
//! position rather than as pointers between entities.
//!
//! ## Module Overview
//!
//! - [`entity`] — Generational entity IDs and the slot-table allocator
//! - [`component`] — Type-erased columnar storage (`Box<dyn ErasedColumn>`)
//! - [`pool`] — Sparse-set component pools
//! - [`registry`] — Central container (entities + pools + hierarchies)
//! - [`layout`] — Payload columns carried by a hierarchy
//! - [`hierarchy`] — Flat tree storage and `HierRef` back-references
//! - [`engine`] — Structural operations: insert, remove, reparent
//! - [`error`] — Rejected-operation and invariant errors

pub mod component;
pub mod engine;
pub mod entity;
pub mod error;
pub mod hierarchy;
pub mod layout;
pub mod pool;
pub mod registry;

pub use engine::Graft;
pub use entity::Entity;
pub use error::{HierarchyError, InvariantViolation};
pub use hierarchy::{HierRef, Hierarchy, HierarchyId};
pub use layout::HierarchyLayout;
pub use pool::{ComponentPool, RangeId};
pub use registry::{Name, Registry};
