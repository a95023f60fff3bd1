//! # Component — Type-Erased Dense Columns
//!
//! A [`ComponentPool`](super::pool::ComponentPool) stores one component type
//! without the registry knowing that type at compile time. This module provides
//! the erased storage underneath it.
//!
//! ## Design: `Vec<T>` Behind a Capability Trait
//!
//! Every column is a plain `Vec<T>`, so values of one type sit next to each
//! other in memory. The pool only sees it through [`ErasedColumn`], a small
//! capability interface with one method per lifecycle step:
//!
//! | Capability    | `ErasedColumn` method |
//! |---------------|-----------------------|
//! | construct     | typed `push`          |
//! | relocate      | `swap_remove_boxed`   |
//! | destroy       | drop of the taken box, then [`ComponentInfo`] hook |
//! | reorder       | `permute`, `swap_rows` |
//!
//! Typed access goes back through `Any::downcast_ref::<Vec<T>>()`, which
//! panics on mismatch. A mismatch means the registry handed the wrong pool out,
//! which is a framework bug rather than a user error.
//!
//! ## Comparison
//!
//! - **hecs / bevy_ecs**: `BlobVec` of raw bytes plus a `Layout`. Fast,
//!   needs unsafe.
//! - **arbor**: `Box<dyn ErasedColumn>` wrapping a real `Vec<T>`. Dense like a
//!   blob vector, zero unsafe.

use std::any::{Any, TypeId};

use super::entity::Entity;
use super::registry::Registry;

/// Erased operations over a `Vec<T>` of components.
pub trait ErasedColumn: Any {
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    fn reserve_rows(&mut self, additional: usize);
    /// Swap-remove `row`, handing the removed value back as a box.
    fn swap_remove_boxed(&mut self, row: usize) -> Box<dyn Any>;
    /// Rearrange rows so that new row `k` is old row `order[k]`.
    fn permute(&mut self, order: &[usize]);
    fn swap_rows(&mut self, a: usize, b: usize);
    fn row_any(&self, row: usize) -> &dyn Any;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedColumn for Vec<T> {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }

    fn reserve_rows(&mut self, additional: usize) {
        self.reserve_exact(additional);
    }

    fn swap_remove_boxed(&mut self, row: usize) -> Box<dyn Any> {
        Box::new(self.swap_remove(row))
    }

    fn permute(&mut self, order: &[usize]) {
        let mut taken: Vec<Option<T>> = self.drain(..).map(Some).collect();
        self.extend(order.iter().filter_map(|&i| taken[i].take()));
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        self.swap(a, b);
    }

    fn row_any(&self, row: usize) -> &dyn Any {
        &self[row]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A type-erased column of components of one type.
pub struct ComponentColumn {
    data: Box<dyn ErasedColumn>,
    type_name: &'static str,
}

impl ComponentColumn {
    /// Create a new empty column for `T`.
    pub fn new<T: 'static>() -> Self {
        Self {
            data: Box::new(Vec::<T>::new()),
            type_name: std::any::type_name::<T>(),
        }
    }

    fn typed<T: 'static>(&self) -> &Vec<T> {
        self.data
            .as_any()
            .downcast_ref::<Vec<T>>()
            .unwrap_or_else(|| self.mismatch::<T>())
    }

    fn typed_mut<T: 'static>(&mut self) -> &mut Vec<T> {
        let type_name = self.type_name;
        self.data
            .as_any_mut()
            .downcast_mut::<Vec<T>>()
            .unwrap_or_else(|| {
                panic!(
                    "Component type mismatch: expected `{}` in column of `{}`",
                    std::any::type_name::<T>(),
                    type_name
                )
            })
    }

    fn mismatch<T>(&self) -> ! {
        panic!(
            "Component type mismatch: expected `{}` in column of `{}`",
            std::any::type_name::<T>(),
            self.type_name
        )
    }

    /// Push a typed component onto the end of the column.
    pub fn push<T: 'static>(&mut self, value: T) {
        self.typed_mut::<T>().push(value);
    }

    /// Get a shared reference to the component at `row`.
    ///
    /// # Panics
    ///
    /// Panics if the row is out of bounds or the type doesn't match.
    pub fn get<T: 'static>(&self, row: usize) -> &T {
        &self.typed::<T>()[row]
    }

    /// Get a mutable reference to the component at `row`.
    ///
    /// # Panics
    ///
    /// Panics if the row is out of bounds or the type doesn't match.
    pub fn get_mut<T: 'static>(&mut self, row: usize) -> &mut T {
        &mut self.typed_mut::<T>()[row]
    }

    pub fn as_slice<T: 'static>(&self) -> &[T] {
        self.typed::<T>()
    }

    pub fn as_mut_slice<T: 'static>(&mut self) -> &mut [T] {
        self.typed_mut::<T>()
    }

    /// Remove the component at `row` via swap-remove and return it boxed.
    pub fn take(&mut self, row: usize) -> Box<dyn Any> {
        self.data.swap_remove_boxed(row)
    }

    /// Get a reference to the raw `dyn Any` at `row`.
    pub fn get_any(&self, row: usize) -> &dyn Any {
        self.data.row_any(row)
    }

    pub fn permute(&mut self, order: &[usize]) {
        self.data.permute(order);
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.data.swap_rows(a, b);
    }

    pub fn reserve(&mut self, additional: usize) {
        self.data.reserve_rows(additional);
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Number of components stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

// ── ComponentInfo ────────────────────────────────────────────────────────

/// Called after a component has left its pool, with the removed value.
///
/// The hook may mutate the registry freely; the value is already detached.
pub type RemoveHook = fn(&mut Registry, Entity, &dyn Any);

/// Renders a component value for entity snapshots.
pub type DebugFormatter = fn(&dyn Any) -> String;

/// Per-type metadata for one registered component.
#[derive(Clone, Copy)]
pub struct ComponentInfo {
    pub name: &'static str,
    pub type_id: TypeId,
    pub(crate) on_remove: Option<RemoveHook>,
    debug: Option<DebugFormatter>,
}

impl ComponentInfo {
    pub fn of<T: 'static>() -> Self {
        Self {
            name: short_type_name(std::any::type_name::<T>()),
            type_id: TypeId::of::<T>(),
            on_remove: None,
            debug: None,
        }
    }

    pub fn with_hook(mut self, hook: RemoveHook) -> Self {
        self.on_remove = Some(hook);
        self
    }

    pub fn has_hook(&self) -> bool {
        self.on_remove.is_some()
    }

    /// Format values with `T`'s `Debug` impl. `T` must be the type this info
    /// was built for.
    pub fn with_debug<T: std::fmt::Debug + 'static>(mut self) -> Self {
        self.debug = Some(|value| match value.downcast_ref::<T>() {
            Some(value) => format!("{value:?}"),
            None => "<type mismatch>".to_string(),
        });
        self
    }

    /// `None` for types registered without a formatter.
    pub fn format(&self, value: &dyn Any) -> Option<String> {
        self.debug.map(|debug| debug(value))
    }
}

impl std::fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInfo")
            .field("name", &self.name)
            .field("has_hook", &self.has_hook())
            .field("has_debug", &self.debug.is_some())
            .finish()
    }
}

/// `arbor::transform::Local<glam::Mat4>` -> `Local<glam::Mat4>`.
fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_get() {
        let mut col = ComponentColumn::new::<u32>();
        col.push(10u32);
        assert_eq!(col.len(), 1);
        assert_eq!(*col.get::<u32>(0), 10);
    }

    #[test]
    fn take_swaps_last_into_hole() {
        let mut col = ComponentColumn::new::<u32>();
        col.push(1u32);
        col.push(2u32);
        col.push(3u32);
        let removed = col.take(0);
        assert_eq!(removed.downcast_ref::<u32>(), Some(&1));
        assert_eq!(col.as_slice::<u32>(), &[3, 2]);
    }

    #[test]
    fn take_last() {
        let mut col = ComponentColumn::new::<u32>();
        col.push(1u32);
        col.push(2u32);
        col.take(1);
        assert_eq!(col.as_slice::<u32>(), &[1]);
    }

    #[test]
    fn drop_called_on_take() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROP_COUNT.store(0, Ordering::SeqCst);
        let mut col = ComponentColumn::new::<Tracked>();
        col.push(Tracked);
        col.push(Tracked);
        drop(col.take(0));
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 1);
        drop(col);
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn permute_reorders_rows() {
        let mut col = ComponentColumn::new::<String>();
        for s in ["a", "b", "c"] {
            col.push(s.to_string());
        }
        col.permute(&[2, 0, 1]);
        assert_eq!(col.as_slice::<String>(), &["c", "a", "b"]);
    }

    #[test]
    fn zst_components() {
        struct Marker;
        let mut col = ComponentColumn::new::<Marker>();
        col.push(Marker);
        col.push(Marker);
        assert_eq!(col.len(), 2);
    }

    #[test]
    #[should_panic(expected = "Component type mismatch")]
    fn wrong_type_panics() {
        let mut col = ComponentColumn::new::<u32>();
        col.push(1u32);
        let _ = col.get::<u64>(0);
    }

    #[test]
    fn info_uses_short_name() {
        struct Health;
        let info = ComponentInfo::of::<Health>();
        assert_eq!(info.name, "Health");
        assert_eq!(info.type_id, TypeId::of::<Health>());
        assert!(!info.has_hook());
        assert_eq!(ComponentInfo::of::<Vec<u8>>().name, "Vec<u8>");
    }

    #[test]
    fn info_formats_only_with_debug() {
        let plain = ComponentInfo::of::<u32>();
        assert_eq!(plain.format(&7u32), None);

        let info = plain.with_debug::<u32>();
        assert_eq!(info.format(&7u32).as_deref(), Some("7"));
        assert_eq!(info.format(&"seven").as_deref(), Some("<type mismatch>"));
    }
}
