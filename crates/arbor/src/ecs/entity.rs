//! # Entity — Generational Handles with an Intrusive Free List
//!
//! An [`Entity`] is an opaque `(index, generation)` pair. It owns nothing: the
//! [`Registry`](super::registry::Registry) maps entities to their components and
//! to their position in a [`Hierarchy`](super::hierarchy::Hierarchy).
//!
//! ## Design: One Table, Two Meanings
//!
//! The allocator keeps a single slot table of `Entity` values. A slot means
//! different things depending on whether its index is alive:
//!
//! ```text
//! slots:     [ 0v0 | 3v1 | 2v0 | ~v2 ]      next_free: 1    available: 2
//!              live   dead  live  dead
//!                      │           │
//!                      └──► 3 ─────┴──► ~ (NULL_INDEX)
//! ```
//!
//! - A **live** slot stores its own handle: `slots[i] == Entity { index: i, .. }`.
//! - A **dead** slot stores `(next free index, generation for the next reuse)`.
//!
//! The free list is threaded through the dead slots, so recycling needs no
//! side allocation. Destroying bumps the stored generation, so any handle held
//! across the destroy no longer matches the slot.
//!
//! ## Comparison
//!
//! - **EnTT (C++)**: same implicit free list inside the entity array.
//! - **hecs / bevy_ecs**: generation table plus an explicit free-index stack.
//!
//! A dead slot can never compare equal to a handle because its `index` field
//! holds a *different* index (the next link, or `NULL_INDEX`).

use std::fmt;

/// Sentinel index: "no entity", "end of free list" and "root has no parent".
pub const NULL_INDEX: u32 = u32::MAX;

/// A lightweight handle to an entity in a [`Registry`](super::registry::Registry).
///
/// Entities are created via [`Registry::create`](super::registry::Registry::create)
/// and destroyed via [`Registry::destroy`](super::registry::Registry::destroy). A
/// handle is only valid for the registry that created it, and only while its
/// generation matches the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Slot index in the allocator. Recycled after destroy.
    pub(crate) index: u32,
    /// Reuse counter for the slot.
    pub(crate) generation: u32,
}

impl Entity {
    /// Returns the raw index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation. Useful for diagnostics.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Slot table with an intrusive free list.
pub(crate) struct EntityAllocator {
    slots: Vec<Entity>,
    /// Head of the free list, `NULL_INDEX` when empty.
    next_free: u32,
    /// Number of dead slots waiting for reuse.
    available: u32,
    max_entities: u32,
}

impl EntityAllocator {
    pub fn new(max_entities: u32) -> Self {
        Self {
            slots: Vec::new(),
            next_free: NULL_INDEX,
            available: 0,
            max_entities,
        }
    }

    /// Allocate a new [`Entity`], reusing the free-list head when possible.
    ///
    /// # Panics
    ///
    /// Panics when every index below `max_entities` is live.
    pub fn allocate(&mut self) -> Entity {
        if self.available > 0 {
            let index = self.next_free;
            let slot = &mut self.slots[index as usize];
            self.next_free = slot.index;
            *slot = Entity {
                index,
                generation: slot.generation,
            };
            self.available -= 1;
            return *slot;
        }

        let index = self.slots.len() as u32;
        if index >= self.max_entities {
            panic!(
                "EntityAllocator: entity limit of {} reached, cannot create more entities",
                self.max_entities
            );
        }
        let entity = Entity {
            index,
            generation: 0,
        };
        self.slots.push(entity);
        entity
    }

    /// Release an entity's slot and push it onto the free list.
    ///
    /// Returns `false` for stale or already-freed handles.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.slots[entity.index as usize] = Entity {
            index: self.next_free,
            generation: entity.generation.wrapping_add(1),
        };
        self.next_free = entity.index;
        self.available += 1;
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index as usize)
            .is_some_and(|slot| *slot == entity)
    }

    pub fn alive_count(&self) -> usize {
        self.slots.len() - self.available as usize
    }

    pub fn free_count(&self) -> u32 {
        self.available
    }

    pub fn total_slots(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Iterate over every live handle in index order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(i, slot)| slot.index as usize == *i)
            .map(|(_, slot)| *slot)
    }
}
