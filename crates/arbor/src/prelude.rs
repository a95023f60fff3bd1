//! Convenience re-exports. `use arbor::prelude::*` brings in the common items.

pub use crate::config::RegistryConfig;
pub use crate::ecs::{
    Entity, Graft, HierRef, Hierarchy, HierarchyError, HierarchyId, HierarchyLayout, Name, RangeId, Registry,
};
pub use crate::math::{Mat4, Quat, Transform, Vec3};
pub use crate::transform::{propagate, transform_layout};
#[cfg(feature = "diagnostics")]
pub use crate::diag::{EntitySnapshot, HierarchySnapshot};
