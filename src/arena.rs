//! Slot-stable resource arena with free-list reuse.
//!
//! This module provides [`Arena<T>`], a growable collection that gives each
//! inserted value a stable index usable as a lightweight handle. Removing a
//! value never shifts the others: interior slots are recycled through a
//! free list instead of compacting.
//!
//! # Motivation
//!
//! GPU resources are referenced from many places (binding sets, render
//! states, published cross-node names). Index handles into an arena stay
//! valid for exactly the lifetime of the slot, and a stale handle is a
//! detectable panic rather than a dangling pointer.
//!
//! # Example
//!
//! ```
//! use garnet_render::arena::Arena;
//!
//! let mut arena = Arena::new();
//! let a = arena.add("uniforms");
//! let b = arena.add("vertices");
//!
//! assert_eq!(arena[a], "uniforms");
//! arena.remove(a);
//!
//! // The freed slot is reused before the arena grows.
//! let c = arena.add("indices");
//! assert_eq!(c.index(), a.index());
//! assert_eq!(arena.len(), 2);
//! # let _ = b;
//! ```

use std::marker::PhantomData;

/// Handle to a slot in an [`Arena<T>`].
///
/// `Handle` is `Copy` and cheap to pass around. It is valid from the moment
/// its owning [`Arena::add`] returns until the matching [`Arena::remove`];
/// accessing it afterwards panics with a stale-handle diagnostic.
pub struct Handle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// The raw slot index (for debugging and diagnostics).
    pub fn index(self) -> usize {
        self.index as usize
    }
}

// Manual impls: deriving would incorrectly bound them on `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

/// A growable, slot-stable collection with free-list reuse.
///
/// `add` either appends or recycles the most recently freed slot (LIFO);
/// `remove` shrinks if the removed slot is the tail, otherwise marks the
/// slot free without compacting. `len() == slots - freed` at all times.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<u32>,
}

impl<T> Arena<T> {
    /// Create a new empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Create an arena with pre-allocated slot capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Insert a value, returning a stable handle to its slot.
    ///
    /// Reuses the most recently freed slot if any, else appends. O(1).
    pub fn add(&mut self, value: T) -> Handle<T> {
        if let Some(index) = self.free.pop() {
            debug_assert!(self.slots[index as usize].is_none());
            self.slots[index as usize] = Some(value);
            Handle::new(index)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Some(value));
            Handle::new(index)
        }
    }

    /// Remove the value at `handle`, returning it.
    ///
    /// If the slot is the tail, the arena shrinks; otherwise the slot index
    /// is pushed onto the free list for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the handle is out of range or already removed; a repeated
    /// removal is a lifetime bug in the caller, never tolerated silently.
    pub fn remove(&mut self, handle: Handle<T>) -> T {
        let index = handle.index();
        let value = self.slots[index]
            .take()
            .unwrap_or_else(|| panic!("remove of stale arena handle {index}"));

        if index + 1 == self.slots.len() {
            self.slots.pop();
        } else {
            self.free.push(handle.index);
        }
        value
    }

    /// Get a reference to the value at `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or out of range (use-after-free guard).
    pub fn get(&self, handle: Handle<T>) -> &T {
        let index = handle.index();
        self.slots[index]
            .as_ref()
            .unwrap_or_else(|| panic!("access of stale arena handle {index}"))
    }

    /// Get a mutable reference to the value at `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or out of range.
    pub fn get_mut(&mut self, handle: Handle<T>) -> &mut T {
        let index = handle.index();
        self.slots[index]
            .as_mut()
            .unwrap_or_else(|| panic!("access of stale arena handle {index}"))
    }

    /// Check whether `handle` refers to a live slot.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slots
            .get(handle.index())
            .is_some_and(|slot| slot.is_some())
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Check if the arena holds no live values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over live entries as `(handle, &value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (Handle::new(i as u32), v)))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<Handle<T>> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        self.get(handle)
    }
}

impl<T> std::ops::IndexMut<Handle<T>> for Arena<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        self.get_mut(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut arena = Arena::new();
        let a = arena.add(10);
        let b = arena.add(20);

        assert_eq!(arena[a], 10);
        assert_eq!(arena[b], 20);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_handle_stability_across_removals() {
        let mut arena = Arena::new();
        let a = arena.add("a");
        let b = arena.add("b");
        let c = arena.add("c");

        arena.remove(b);

        // Other handles still resolve to the same values.
        assert_eq!(arena[a], "a");
        assert_eq!(arena[c], "c");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_free_list_reuse_is_lifo() {
        let mut arena = Arena::new();
        let a = arena.add(1);
        let b = arena.add(2);
        let _c = arena.add(3);

        arena.remove(a);
        arena.remove(b);

        // Most recently freed slot comes back first.
        let d = arena.add(4);
        assert_eq!(d.index(), b.index());
        let e = arena.add(5);
        assert_eq!(e.index(), a.index());
    }

    #[test]
    fn test_reuses_freed_slot_before_growing() {
        let mut arena = Arena::new();
        let a = arena.add(1);
        let _b = arena.add(2);

        arena.remove(a);
        let c = arena.add(3);

        assert_eq!(c.index(), a.index());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_remove_tail_shrinks() {
        let mut arena = Arena::new();
        let _a = arena.add(1);
        let b = arena.add(2);

        let value = arena.remove(b);
        assert_eq!(value, 2);
        assert_eq!(arena.len(), 1);

        // Tail removal shrinks instead of growing the free list,
        // so the next add appends to the same index.
        let c = arena.add(3);
        assert_eq!(c.index(), b.index());
    }

    #[test]
    #[should_panic(expected = "stale arena handle")]
    fn test_double_remove_panics() {
        let mut arena = Arena::new();
        let a = arena.add(1);
        let _b = arena.add(2);

        arena.remove(a);
        arena.remove(a);
    }

    #[test]
    #[should_panic(expected = "stale arena handle")]
    fn test_get_after_remove_panics() {
        let mut arena = Arena::new();
        let a = arena.add(1);
        let _b = arena.add(2);

        arena.remove(a);
        let _ = arena.get(a);
    }

    #[test]
    fn test_contains() {
        let mut arena = Arena::new();
        let a = arena.add(1);
        let _b = arena.add(2);

        assert!(arena.contains(a));
        arena.remove(a);
        assert!(!arena.contains(a));
    }

    #[test]
    fn test_len_invariant() {
        let mut arena = Arena::new();
        let handles: Vec<_> = (0..8).map(|i| arena.add(i)).collect();
        assert_eq!(arena.len(), 8);

        arena.remove(handles[1]);
        arena.remove(handles[4]);
        assert_eq!(arena.len(), 6);

        arena.add(100);
        assert_eq!(arena.len(), 7);
    }

    #[test]
    fn test_iter_skips_freed_slots() {
        let mut arena = Arena::new();
        let a = arena.add(1);
        let b = arena.add(2);
        let _c = arena.add(3);

        arena.remove(b);

        let live: Vec<i32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(live, vec![1, 3]);
        assert_eq!(arena.iter().next().unwrap().0, a);
    }

    #[test]
    fn test_get_mut() {
        let mut arena = Arena::new();
        let a = arena.add(vec![1, 2]);
        arena.get_mut(a).push(3);
        assert_eq!(arena[a], vec![1, 2, 3]);
    }
}
