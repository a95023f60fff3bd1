//! # Registry — The Central Container
//!
//! The [`Registry`] owns every entity, every component pool and every
//! hierarchy instance. It is the single source of truth for the storage layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Registry                                                 │
//! │                                                          │
//! │  EntityAllocator: slot table + intrusive free list       │
//! │                                                          │
//! │  pools: Vec<ComponentPool>          (pool 0 = HierRef)    │
//! │  pool_lookup: HashMap<TypeId, usize>                     │
//! │                                                          │
//! │  hierarchies: HashMap<u32, Hierarchy>                    │
//! │    key = index of the entity that owns the hierarchy     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Removal Hooks
//!
//! A component type may register a [`RemoveHook`]. It runs after the value has
//! left its pool, whether through [`Registry::remove`] or [`Registry::destroy`].
//! [`HierRef`] registers one at construction: removing a node's back-reference
//! removes the node from its hierarchy and destroys its descendants.
//!
//! ## Comparison
//!
//! - **EnTT (C++)**: one sparse set per component, signals on destroy. Same
//!   shape as this registry.
//! - **bevy_ecs**: archetype tables plus component hooks.
//!
//! Sparse sets fit here because hierarchy code touches one component
//! (`HierRef`) on many entities, never whole archetype rows.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::component::{ComponentInfo, RemoveHook};
use super::entity::{Entity, EntityAllocator};
use super::hierarchy::{self, HierRef, Hierarchy};
use super::pool::{ComponentPool, RangeId};
use crate::config::RegistryConfig;

/// Pool slot reserved for [`HierRef`], registered first by every registry.
pub(crate) const HIERREF_POOL: usize = 0;

/// Human-readable label, used by diagnostics dumps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owns entities, component pools and hierarchy instances.
pub struct Registry {
    config: RegistryConfig,
    allocator: EntityAllocator,
    pub(crate) pools: Vec<ComponentPool>,
    pool_lookup: HashMap<TypeId, usize>,
    pub(crate) hierarchies: HashMap<u32, Hierarchy>,
    /// Entities created since the last stats snapshot (diagnostics only).
    #[cfg(feature = "diagnostics")]
    created_since_snapshot: u32,
    /// Entities destroyed since the last stats snapshot (diagnostics only).
    #[cfg(feature = "diagnostics")]
    destroyed_since_snapshot: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let config = config.sanitized();
        let mut registry = Self {
            config,
            allocator: EntityAllocator::new(config.max_entities),
            pools: Vec::new(),
            pool_lookup: HashMap::new(),
            hierarchies: HashMap::new(),
            #[cfg(feature = "diagnostics")]
            created_since_snapshot: 0,
            #[cfg(feature = "diagnostics")]
            destroyed_since_snapshot: 0,
        };
        registry.register_component_with_hook::<HierRef>(hierarchy::on_hierref_removed);
        registry.register_component_debug::<HierRef>();
        registry.register_component_debug::<Name>();
        registry
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ── Create / Destroy ─────────────────────────────────────────────

    /// Create an entity with no components.
    ///
    /// # Panics
    ///
    /// Panics when `max_entities` indices are already live.
    pub fn create(&mut self) -> Entity {
        #[cfg(feature = "diagnostics")]
        {
            self.created_since_snapshot += 1;
        }
        self.allocator.allocate()
    }

    /// Create an entity carrying a [`Name`].
    pub fn create_named(&mut self, name: &str) -> Entity {
        let entity = self.create();
        self.insert(entity, Name::new(name));
        entity
    }

    /// Destroy an entity, detaching every component and freeing its index.
    ///
    /// Removal hooks run for each detached component. A hierarchy member
    /// takes its descendants with it; a hierarchy id takes its hierarchy
    /// instance (members survive, unbound).
    ///
    /// Returns `false` for a stale or already-destroyed handle.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.allocator.is_alive(entity) {
            log::warn!("destroy: {entity:?} is not alive");
            return false;
        }

        for i in 0..self.pools.len() {
            if let Some(value) = self.pools[i].detach_any(entity) {
                self.run_remove_hook(i, entity, &*value);
            }
        }

        if let Some(owned) = self.hierarchies.remove(&entity.index) {
            log::debug!("destroy: releasing hierarchy owned by {entity:?} ({} nodes)", owned.len());
            hierarchy::unbind_members(&mut self.pools[HIERREF_POOL], &owned);
        }

        if self.allocator.deallocate(entity) {
            #[cfg(feature = "diagnostics")]
            {
                self.destroyed_since_snapshot += 1;
            }
        }
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities, hierarchy ids included.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Iterate over every live entity in index order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.allocator.iter_alive()
    }

    pub(crate) fn allocator_stats(&self) -> (u32, u32, usize) {
        (
            self.allocator.total_slots(),
            self.allocator.free_count(),
            self.allocator.alive_count(),
        )
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn take_churn_counters(&mut self) -> (u32, u32) {
        let counters = (self.created_since_snapshot, self.destroyed_since_snapshot);
        self.created_since_snapshot = 0;
        self.destroyed_since_snapshot = 0;
        counters
    }

    // ── Component Types ──────────────────────────────────────────────

    /// Register a component type. Calling it again is a no-op.
    pub fn register_component<T: 'static>(&mut self) {
        self.pool_index::<T>();
    }

    /// Register a component type with a removal hook, replacing any hook it
    /// already had.
    pub fn register_component_with_hook<T: 'static>(&mut self, hook: RemoveHook) {
        let index = self.pool_index::<T>();
        let info = self.pools[index].info().with_hook(hook);
        self.pools[index].set_info(info);
    }

    /// Print `T` values in entity snapshots, registering `T` if needed.
    pub fn register_component_debug<T: fmt::Debug + 'static>(&mut self) {
        let index = self.pool_index::<T>();
        let info = self.pools[index].info().with_debug::<T>();
        self.pools[index].set_info(info);
    }

    /// Metadata of every registered component type, in registration order.
    pub fn component_infos(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.pools.iter().map(ComponentPool::info)
    }

    fn pool_index<T: 'static>(&mut self) -> usize {
        let type_id = TypeId::of::<T>();
        if let Some(&index) = self.pool_lookup.get(&type_id) {
            return index;
        }
        let index = self.pools.len();
        self.pools.push(ComponentPool::new::<T>(
            ComponentInfo::of::<T>(),
            self.config.component_grow,
        ));
        self.pool_lookup.insert(type_id, index);
        index
    }

    fn lookup<T: 'static>(&self) -> Option<usize> {
        self.pool_lookup.get(&TypeId::of::<T>()).copied()
    }

    fn run_remove_hook(&mut self, pool: usize, entity: Entity, value: &dyn Any) {
        if let Some(hook) = self.pools[pool].info().on_remove {
            hook(self, entity, value);
        }
    }

    /// The pool holding `T`, if the type has been registered.
    pub fn pool<T: 'static>(&self) -> Option<&ComponentPool> {
        self.lookup::<T>().map(|i| &self.pools[i])
    }

    pub fn pool_mut<T: 'static>(&mut self) -> Option<&mut ComponentPool> {
        self.lookup::<T>().map(|i| &mut self.pools[i])
    }

    // ── Per-Entity Component Access ──────────────────────────────────

    /// Insert a component, replacing an existing one of the same type.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    pub fn insert<T: 'static>(&mut self, entity: Entity, component: T) -> &mut T {
        assert!(
            self.allocator.is_alive(entity),
            "Cannot insert component on dead entity {entity:?}"
        );
        let index = self.pool_index::<T>();
        self.pools[index].insert(entity, component)
    }

    /// Attach a component built by `construct` unless the entity already has
    /// one, and return it.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    pub fn attach<T: 'static>(&mut self, entity: Entity, construct: impl FnOnce() -> T) -> &mut T {
        assert!(
            self.allocator.is_alive(entity),
            "Cannot attach component to dead entity {entity:?}"
        );
        let index = self.pool_index::<T>();
        self.pools[index].attach_with(entity, construct)
    }

    /// [`attach`](Self::attach) with `T::default()`.
    pub fn attach_default<T: Default + 'static>(&mut self, entity: Entity) -> &mut T {
        self.attach(entity, T::default)
    }

    /// Remove a component and return it. Runs the type's removal hook first.
    ///
    /// Returns `None` if the entity is dead or has no such component.
    pub fn remove<T: 'static>(&mut self, entity: Entity) -> Option<T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        let index = self.lookup::<T>()?;
        let value = self.pools[index].detach_any(entity)?;
        self.run_remove_hook(index, entity, &*value);
        value.downcast::<T>().ok().map(|b| *b)
    }

    /// Strip `T` from every entity that has it, running the removal hook for
    /// each. Returns how many components were removed.
    pub fn remove_entities<T: 'static>(&mut self) -> usize {
        let Some(index) = self.lookup::<T>() else {
            return 0;
        };
        let mut removed = 0;
        // Hooks may detach further `T`s, so take from the back until empty.
        while let Some(&entity) = self.pools[index].entities().last() {
            if let Some(value) = self.pools[index].detach_any(entity) {
                self.run_remove_hook(index, entity, &*value);
                removed += 1;
            }
        }
        log::debug!("remove_entities: {removed} x {}", std::any::type_name::<T>());
        removed
    }

    // ── Subpool Ranges ───────────────────────────────────────────────

    /// Open a new range in `T`'s pool, registering `T` if needed.
    pub fn new_component_range<T: 'static>(&mut self) -> RangeId {
        let index = self.pool_index::<T>();
        self.pools[index].new_range()
    }

    /// Insert `component` as a member of range `id` of `T`'s pool.
    ///
    /// Returns `None` for a stale range id.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    pub fn insert_in_range<T: 'static>(&mut self, entity: Entity, id: RangeId, component: T) -> Option<&mut T> {
        assert!(
            self.allocator.is_alive(entity),
            "Cannot insert component on dead entity {entity:?}"
        );
        let index = self.pool_index::<T>();
        self.pools[index].insert_in_range(id, entity, component)
    }

    /// Dense slots of range `id` in `T`'s pool.
    pub fn component_range<T: 'static>(&self, id: RangeId) -> Option<std::ops::Range<usize>> {
        self.pool::<T>()?.range(id)
    }

    /// Delete range `id` of `T`'s pool and the components in it, running the
    /// removal hook for each. Returns `false` for a stale id.
    pub fn delete_component_range<T: 'static>(&mut self, id: RangeId) -> bool {
        let Some(index) = self.lookup::<T>() else {
            return false;
        };
        let Some(removed) = self.pools[index].remove_range_any(id) else {
            log::warn!("delete_component_range: stale {id:?}");
            return false;
        };
        for (entity, value) in removed {
            self.run_remove_hook(index, entity, &*value);
        }
        true
    }

    /// Returns `None` if the entity is dead or doesn't have the component.
    pub fn get<T: 'static>(&self, entity: Entity) -> Option<&T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.pool::<T>()?.get::<T>(entity)
    }

    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.pool_mut::<T>()?.get_mut::<T>(entity)
    }

    pub fn has<T: 'static>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Look up a component by `TypeId`, for diagnostics.
    pub fn get_any_by_type_id(&self, entity: Entity, type_id: TypeId) -> Option<&dyn Any> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        let &index = self.pool_lookup.get(&type_id)?;
        self.pools[index].get_any(entity)
    }

    // ── Names ────────────────────────────────────────────────────────

    pub fn name_of(&self, entity: Entity) -> Option<&str> {
        self.get::<Name>(entity).map(Name::as_str)
    }

    /// First live entity carrying `name`, in pool order.
    pub fn try_named(&self, name: &str) -> Option<Entity> {
        self.pool::<Name>()?
            .iter::<Name>()
            .find(|(_, n)| n.as_str() == name)
            .map(|(entity, _)| entity)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Default)]
    struct Position {
        x: f32,
        y: f32,
    }
    struct Health(u32);

    #[test]
    fn create_and_destroy() {
        let mut registry = Registry::new();
        let e1 = registry.create();
        let e2 = registry.create();
        assert_eq!(registry.entity_count(), 2);

        assert!(registry.destroy(e1));
        assert_eq!(registry.entity_count(), 1);
        assert!(!registry.is_alive(e1));
        assert!(registry.is_alive(e2));
    }

    #[test]
    fn destroy_stale_handle_is_noop() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.destroy(e);
        let reused = registry.create();
        assert_eq!(reused.index(), e.index());
        assert!(!registry.destroy(e));
        assert!(registry.is_alive(reused));
    }

    #[test]
    fn destroy_detaches_components() {
        let mut registry = Registry::new();
        let e1 = registry.create();
        let e2 = registry.create();
        registry.insert(e1, Position { x: 1.0, y: 1.0 });
        registry.insert(e2, Position { x: 2.0, y: 2.0 });

        registry.destroy(e1);
        let pool = registry.pool::<Position>().unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.entities(), &[e2]);
        assert_eq!(registry.get::<Position>(e2), Some(&Position { x: 2.0, y: 2.0 }));
    }

    #[test]
    fn recycled_entity_starts_empty() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.insert(e, Health(10));
        registry.destroy(e);
        let reused = registry.create();
        assert!(!registry.has::<Health>(reused));
        assert!(registry.get::<Health>(e).is_none());
    }

    #[test]
    fn insert_replaces_existing_component() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.insert(e, Health(100));
        registry.insert(e, Health(50));
        assert_eq!(registry.get::<Health>(e).unwrap().0, 50);
    }

    #[test]
    fn attach_default_is_idempotent() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.attach_default::<Position>(e).x = 3.0;
        assert_eq!(registry.attach_default::<Position>(e).x, 3.0);
        assert_eq!(registry.pool::<Position>().unwrap().len(), 1);
    }

    #[test]
    fn remove_returns_value() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.insert(e, Health(7));
        assert_eq!(registry.remove::<Health>(e).map(|h| h.0), Some(7));
        assert!(registry.remove::<Health>(e).is_none());
        assert!(!registry.has::<Health>(e));
    }

    #[test]
    fn get_dead_entity_returns_none() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.insert(e, Health(1));
        registry.destroy(e);
        assert!(registry.get::<Health>(e).is_none());
        assert!(registry.get_mut::<Health>(e).is_none());
        assert!(registry.remove::<Health>(e).is_none());
    }

    #[test]
    fn lookup_by_type_id() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.insert(e, Health(7));
        let value = registry.get_any_by_type_id(e, TypeId::of::<Health>()).unwrap();
        assert_eq!(value.downcast_ref::<Health>().map(|h| h.0), Some(7));
        assert!(registry.get_any_by_type_id(e, TypeId::of::<Position>()).is_none());
    }

    #[test]
    #[should_panic(expected = "dead entity")]
    fn insert_on_dead_entity_panics() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.destroy(e);
        registry.insert(e, Health(1));
    }

    struct Tracked(u32);

    fn count_removed(registry: &mut Registry, _entity: Entity, value: &dyn Any) {
        if let Some(tracked) = value.downcast_ref::<Tracked>() {
            let sink = registry.create();
            registry.insert(sink, tracked.0 as u64);
        }
    }

    fn removed_values(registry: &Registry) -> Vec<u64> {
        let mut seen = registry
            .pool::<u64>()
            .map(|pool| pool.values::<u64>().to_vec())
            .unwrap_or_default();
        seen.sort();
        seen
    }

    #[test]
    fn remove_hook_runs_on_remove_and_destroy() {
        let mut registry = Registry::new();
        registry.register_component_with_hook::<Tracked>(count_removed);
        let a = registry.create();
        let b = registry.create();
        registry.insert(a, Tracked(1));
        registry.insert(b, Tracked(2));

        registry.remove::<Tracked>(a);
        registry.destroy(b);
        assert_eq!(removed_values(&registry), vec![1, 2]);
    }

    #[test]
    fn remove_entities_strips_every_holder() {
        let mut registry = Registry::new();
        assert_eq!(registry.remove_entities::<Tracked>(), 0);

        registry.register_component_with_hook::<Tracked>(count_removed);
        let holders: Vec<Entity> = (0..3).map(|_| registry.create()).collect();
        for (i, entity) in holders.iter().enumerate() {
            registry.insert(*entity, Tracked(i as u32 + 1));
        }
        registry.insert(holders[1], Health(7));

        assert_eq!(registry.remove_entities::<Tracked>(), 3);
        assert_eq!(removed_values(&registry), vec![1, 2, 3]);
        for entity in &holders {
            assert!(registry.is_alive(*entity));
            assert!(!registry.has::<Tracked>(*entity));
        }
        assert_eq!(registry.get::<Health>(holders[1]).map(|h| h.0), Some(7));
        assert_eq!(registry.remove_entities::<Tracked>(), 0);
    }

    #[test]
    fn component_ranges_group_members() {
        let mut registry = Registry::new();
        registry.register_component_with_hook::<Tracked>(count_removed);
        let first = registry.new_component_range::<Tracked>();
        let second = registry.new_component_range::<Tracked>();
        let [a, b, c] = [registry.create(), registry.create(), registry.create()];

        registry.insert_in_range(a, second, Tracked(1)).unwrap();
        registry.insert_in_range(b, first, Tracked(2)).unwrap();
        registry.insert_in_range(c, second, Tracked(3)).unwrap();
        assert_eq!(registry.component_range::<Tracked>(first), Some(0..1));
        assert_eq!(registry.component_range::<Tracked>(second), Some(1..3));

        assert!(registry.delete_component_range::<Tracked>(second));
        assert!(!registry.delete_component_range::<Tracked>(second));
        assert_eq!(registry.component_range::<Tracked>(second), None);
        assert_eq!(removed_values(&registry), vec![1, 3]);
        assert!(!registry.has::<Tracked>(a));
        assert_eq!(registry.get::<Tracked>(b).map(|t| t.0), Some(2));
        assert!(!registry.has::<Tracked>(c));
    }

    #[test]
    fn sort_range_through_pool() {
        let mut registry = Registry::new();
        let entities: Vec<Entity> = (0..4).map(|_| registry.create()).collect();
        for (entity, value) in entities.iter().zip([4u32, 3, 2, 1]) {
            registry.insert(*entity, value);
        }
        let pool = registry.pool_mut::<u32>().unwrap();
        pool.sort_range_by::<u32>(1..3, |a, b| a.cmp(b));
        assert_eq!(pool.values::<u32>(), &[4, 2, 3, 1]);
        assert_eq!(registry.get::<u32>(entities[1]), Some(&3));
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = Registry::new();
        let before = registry.component_infos().count();
        registry.register_component::<Health>();
        registry.register_component::<Health>();
        assert_eq!(registry.component_infos().count(), before + 1);
        let names: Vec<&str> = registry.component_infos().map(|i| i.name).collect();
        assert_eq!(&names[..2], &["HierRef", "Name"]);
    }

    #[test]
    fn named_lookup() {
        let mut registry = Registry::new();
        let player = registry.create_named("player");
        registry.create_named("enemy");
        assert_eq!(registry.try_named("player"), Some(player));
        assert_eq!(registry.name_of(player), Some("player"));
        assert_eq!(registry.try_named("nobody"), None);
    }

    #[test]
    fn entities_lists_live_handles() {
        let mut registry = Registry::new();
        let a = registry.create();
        let b = registry.create();
        let c = registry.create();
        registry.destroy(b);
        assert_eq!(registry.entities().collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn config_limits_entities() {
        let config = RegistryConfig {
            max_entities: 3,
            ..RegistryConfig::default()
        };
        let mut registry = Registry::with_config(config);
        for _ in 0..3 {
            registry.create();
        }
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| registry.create()));
        assert!(result.is_err());
    }
}
