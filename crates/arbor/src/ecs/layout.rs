//! # Layout — Payload Columns Carried by a Hierarchy
//!
//! Besides its four structural columns, a [`Hierarchy`](super::hierarchy::Hierarchy)
//! can carry any number of *payload* columns: per-node data that must move in
//! lock-step with the nodes (local and world matrices, visibility flags, ...).
//!
//! A [`HierarchyLayout`] declares those columns once, by name and type:
//!
//! ```
//! use arbor::ecs::layout::HierarchyLayout;
//!
//! let layout = HierarchyLayout::new()
//!     .with_column::<bool>("visible")
//!     .with_column::<f32>("opacity");
//! assert_eq!(layout.column_index("opacity"), Some(1));
//! ```
//!
//! Payload types must be `Clone + Default`: new leaves get `T::default()` and
//! grafts copy rows from one hierarchy into another.

use std::any::{Any, TypeId};

/// Erased operations over one payload `Vec<T>`.
pub trait PayloadColumn: Any {
    fn len(&self) -> usize;
    fn reserve_rows(&mut self, additional: usize);
    /// Insert `count` default rows before `at`.
    fn open(&mut self, at: usize, count: usize);
    /// Keep row `i` exactly when `keep[i]`.
    fn retain_rows(&mut self, keep: &[bool]);
    /// Clone the listed rows, in order, into a new column.
    fn gather(&self, rows: &[usize]) -> Box<dyn PayloadColumn>;
    /// Overwrite `count` rows starting at `at` with rows of `src` from `src_at`.
    fn copy_rows(&mut self, at: usize, src: &dyn PayloadColumn, src_at: usize, count: usize);
    fn boxed_clone(&self) -> Box<dyn PayloadColumn>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Clone + Default + 'static> PayloadColumn for Vec<T> {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn reserve_rows(&mut self, additional: usize) {
        self.reserve_exact(additional);
    }

    fn open(&mut self, at: usize, count: usize) {
        self.splice(at..at, std::iter::repeat_with(T::default).take(count));
    }

    fn retain_rows(&mut self, keep: &[bool]) {
        let mut row = 0;
        self.retain(|_| {
            let kept = keep[row];
            row += 1;
            kept
        });
    }

    fn gather(&self, rows: &[usize]) -> Box<dyn PayloadColumn> {
        Box::new(rows.iter().map(|&r| self[r].clone()).collect::<Vec<T>>())
    }

    fn copy_rows(&mut self, at: usize, src: &dyn PayloadColumn, src_at: usize, count: usize) {
        if let Some(src) = src.as_any().downcast_ref::<Vec<T>>() {
            self[at..at + count].clone_from_slice(&src[src_at..src_at + count]);
        }
    }

    fn boxed_clone(&self) -> Box<dyn PayloadColumn> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed view of an erased payload column.
///
/// # Panics
///
/// Panics if the column does not hold `T`.
pub fn column_slice<T: 'static>(column: &dyn PayloadColumn) -> &[T] {
    column
        .as_any()
        .downcast_ref::<Vec<T>>()
        .unwrap_or_else(|| panic!("Payload type mismatch: column does not hold `{}`", std::any::type_name::<T>()))
}

/// Mutable typed view of an erased payload column.
///
/// # Panics
///
/// Panics if the column does not hold `T`.
pub fn column_slice_mut<T: 'static>(column: &mut dyn PayloadColumn) -> &mut [T] {
    column
        .as_any_mut()
        .downcast_mut::<Vec<T>>()
        .unwrap_or_else(|| panic!("Payload type mismatch: column does not hold `{}`", std::any::type_name::<T>()))
}

/// One declared payload column.
#[derive(Clone, Copy)]
pub struct ColumnDesc {
    pub name: &'static str,
    pub type_id: TypeId,
    pub type_name: &'static str,
    create: fn() -> Box<dyn PayloadColumn>,
}

impl ColumnDesc {
    pub(crate) fn create(&self) -> Box<dyn PayloadColumn> {
        (self.create)()
    }
}

impl std::fmt::Debug for ColumnDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)
    }
}

fn new_column<T: Clone + Default + 'static>() -> Box<dyn PayloadColumn> {
    Box::new(Vec::<T>::new())
}

/// Ordered payload column declarations shared by hierarchies of one kind.
#[derive(Clone, Debug, Default)]
pub struct HierarchyLayout {
    columns: Vec<ColumnDesc>,
}

impl HierarchyLayout {
    /// A layout with no payload columns.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column<T: Clone + Default + 'static>(mut self, name: &'static str) -> Self {
        self.columns.push(ColumnDesc {
            name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            create: new_column::<T>,
        });
        self
    }

    pub fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Same column types in the same order. Names are labels only.
    pub fn same_shape(&self, other: &HierarchyLayout) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.type_id == b.type_id)
    }

    pub(crate) fn create_columns(&self) -> Vec<Box<dyn PayloadColumn>> {
        self.columns.iter().map(ColumnDesc::create).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(values: &[i32]) -> Box<dyn PayloadColumn> {
        Box::new(values.to_vec())
    }

    #[test]
    fn open_inserts_defaults() {
        let mut col = filled(&[1, 2, 3]);
        col.open(1, 2);
        assert_eq!(column_slice::<i32>(&*col), &[1, 0, 0, 2, 3]);
        col.open(5, 1);
        assert_eq!(column_slice::<i32>(&*col), &[1, 0, 0, 2, 3, 0]);
    }

    #[test]
    fn retain_follows_mask() {
        let mut col = filled(&[1, 2, 3, 4]);
        col.retain_rows(&[true, false, true, false]);
        assert_eq!(column_slice::<i32>(&*col), &[1, 3]);
    }

    #[test]
    fn gather_and_copy_rows() {
        let src = filled(&[10, 20, 30, 40]);
        let picked = src.gather(&[3, 1]);
        assert_eq!(column_slice::<i32>(&*picked), &[40, 20]);

        let mut dst = filled(&[0, 0, 0]);
        dst.copy_rows(1, &*picked, 0, 2);
        assert_eq!(column_slice::<i32>(&*dst), &[0, 40, 20]);
    }

    #[test]
    fn copy_rows_ignores_foreign_type() {
        let src: Box<dyn PayloadColumn> = Box::new(vec![1.5f32]);
        let mut dst = filled(&[7]);
        dst.copy_rows(0, &*src, 0, 1);
        assert_eq!(column_slice::<i32>(&*dst), &[7]);
    }

    #[test]
    fn layouts_compare_by_type_order() {
        let a = HierarchyLayout::new().with_column::<bool>("a").with_column::<f32>("b");
        let b = HierarchyLayout::new().with_column::<bool>("x").with_column::<f32>("y");
        let c = HierarchyLayout::new().with_column::<f32>("b").with_column::<bool>("a");
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
        assert!(!a.same_shape(&HierarchyLayout::new()));
    }

    #[test]
    fn create_columns_matches_layout() {
        let layout = HierarchyLayout::new().with_column::<u8>("flags").with_column::<String>("label");
        let columns = layout.create_columns();
        assert_eq!(columns.len(), 2);
        assert!(columns[0].as_any().is::<Vec<u8>>());
        assert!(columns[1].as_any().is::<Vec<String>>());
    }

    #[test]
    #[should_panic(expected = "Payload type mismatch")]
    fn wrong_slice_type_panics() {
        let col = filled(&[1]);
        let _ = column_slice::<u64>(&*col);
    }
}
