//! # Arbor — Entity Storage and Flat Scene Hierarchies
//!
//! A storage layer for game objects: generational entity handles, sparse-set
//! component pools, and parent/child trees kept as flat, breadth-first
//! ordered arrays so a single forward pass visits parents before children.
//!
//! Start with `use arbor::prelude::*` and create a [`Registry`](ecs::Registry).

pub mod config;
pub mod ecs;
pub mod math;
pub mod prelude;
pub mod transform;

#[cfg(feature = "diagnostics")]
pub mod diag;
