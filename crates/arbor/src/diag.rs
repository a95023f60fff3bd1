//! Diagnostics: serializable snapshots of registry and hierarchy state.
//!
//! Enabled by the `diagnostics` feature flag (on by default). Nothing here is
//! ever loaded back; snapshots exist to be logged, diffed in tests, or shipped
//! to an external viewer as JSON.
//!
//! [`HierarchySnapshot::table`] prints the flat columns in the fixed-width
//! layout used when debugging structural bugs:
//!
//! ```text
//!  in:  ri  pa  ci  cc      en name
//!   0:   0   -   1   2     1v0 root
//!   1:   1   0   3   0     2v0 A
//!   2:   2   0   3   0     3v0 B
//! ```
//!
//! `ri` is the position recorded in the entity's `HierRef`; it must equal `in`.

use std::fmt::Write;

use serde::Serialize;

use crate::ecs::entity::{Entity, NULL_INDEX};
use crate::ecs::hierarchy::{HierRef, HierarchyId};
use crate::ecs::registry::Registry;

// ── Snapshot types (wire format) ────────────────────────────────────────

/// Slot table usage, plus churn since the previous call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityPoolStats {
    pub total_slots: u32,
    pub free_count: u32,
    pub alive_count: usize,
    pub created_since_snapshot: u32,
    pub destroyed_since_snapshot: u32,
    pub fragmentation_pct: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRow {
    pub index: u32,
    /// Position recorded in the bound entity's `HierRef`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    pub child_index: u32,
    pub child_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchySnapshot {
    pub hierarchy: String,
    pub columns: Vec<String>,
    pub rows: Vec<NodeRow>,
}

impl HierarchySnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Fixed-width dump, one line per node.
    pub fn table(&self) -> String {
        fn cell(value: Option<u32>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }
        let mut out = format!("{:>3}: {:>3} {:>3} {:>3} {:>3} {:>7} name\n", "in", "ri", "pa", "ci", "cc", "en");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:>3}: {:>3} {:>3} {:>3} {:>3} {:>7} {}",
                row.index,
                cell(row.ref_index),
                cell(row.parent),
                row.child_index,
                row.child_count,
                row.entity.as_deref().unwrap_or("-"),
                row.name.as_deref().unwrap_or(""),
            );
        }
        out
    }

    /// Rows whose entity's `HierRef` disagrees with their position.
    pub fn stale_refs(&self) -> Vec<u32> {
        self.rows
            .iter()
            .filter(|row| row.entity.is_some() && row.ref_index != Some(row.index))
            .map(|row| row.index)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitySnapshot {
    pub id: u32,
    pub generation: u32,
    pub components: Vec<ComponentSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentSnapshot {
    pub name: String,
    pub debug_value: String,
}

// ── Registry snapshots ───────────────────────────────────────────────────

impl Registry {
    /// Slot table statistics. Resets the churn counters.
    pub fn diagnostics_entity_stats(&mut self) -> EntityPoolStats {
        let (total_slots, free_count, alive_count) = self.allocator_stats();
        let (created, destroyed) = self.take_churn_counters();
        let fragmentation_pct = if total_slots > 0 {
            free_count as f32 / total_slots as f32 * 100.0
        } else {
            0.0
        };
        EntityPoolStats {
            total_slots,
            free_count,
            alive_count,
            created_since_snapshot: created,
            destroyed_since_snapshot: destroyed,
            fragmentation_pct,
        }
    }

    pub fn hierarchy_snapshot(&self, id: HierarchyId) -> Option<HierarchySnapshot> {
        let tree = self.hierarchy(id)?;
        let rows = (0..tree.len())
            .map(|i| {
                let entity = tree.entities()[i];
                let ref_index = entity
                    .and_then(|e| self.get::<HierRef>(e))
                    .filter(|node| node.hierarchy() == Some(id))
                    .map(|node| node.index());
                let parent = tree.parent_index()[i];
                NodeRow {
                    index: i as u32,
                    ref_index,
                    parent: (parent != NULL_INDEX).then_some(parent),
                    child_index: tree.child_index()[i],
                    child_count: tree.child_count()[i],
                    entity: entity.map(|e| e.to_string()),
                    name: entity.and_then(|e| self.name_of(e)).map(str::to_owned),
                }
            })
            .collect();
        Some(HierarchySnapshot {
            hierarchy: format!("{id:?}"),
            columns: tree
                .layout()
                .columns()
                .iter()
                .map(|c| format!("{c:?}"))
                .collect(),
            rows,
        })
    }

    /// Every component attached to `entity`. Types registered without
    /// [`register_component_debug`](Self::register_component_debug) print as
    /// `<opaque>`.
    pub fn entity_snapshot(&self, entity: Entity) -> Option<EntitySnapshot> {
        if !self.is_alive(entity) {
            return None;
        }
        let components = self
            .pools
            .iter()
            .filter_map(|pool| {
                let info = pool.info();
                let value = pool.get_any(entity)?;
                Some(ComponentSnapshot {
                    name: info.name.to_string(),
                    debug_value: info.format(value).unwrap_or_else(|| "<opaque>".to_string()),
                })
            })
            .collect();
        Some(EntitySnapshot {
            id: entity.index(),
            generation: entity.generation(),
            components,
        })
    }
}

// ── Logging ──────────────────────────────────────────────────────────────

/// Install an `env_logger` configured from `RUST_LOG`.
///
/// Logs a warning and keeps the existing logger if one is already set.
pub fn init_logger() {
    if env_logger::Builder::new().parse_default_env().try_init().is_err() {
        log::warn!("init_logger: a logger is already set");
    }
}
