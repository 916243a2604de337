use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Typed reference to a slot in a [`HandlePool`].
///
/// A handle is a plain value: copying it does not keep anything alive. It
/// names a live element only while [`HandlePool::is_valid`] says so. The
/// generation `0` is never issued, so `Handle::default()` is the null handle.
pub struct Handle<T> {
    pub slot: u32,
    pub generation: u32,
    phantom: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self {
            slot,
            generation,
            phantom: PhantomData,
        }
    }

    pub const fn null() -> Self {
        Self::new(0, 0)
    }

    pub fn is_null(&self) -> bool {
        self.generation == 0
    }

    /// Reinterprets the handle as naming another resource type.
    pub fn cast<U>(self) -> Handle<U> {
        Handle::new(self.slot, self.generation)
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        if self.is_null() {
            write!(f, "Handle<{}>(null)", short)
        } else {
            write!(f, "Handle<{}>({}v{})", short, self.slot, self.generation)
        }
    }
}

struct Slot<T, K> {
    value: Option<T>,
    handle: Handle<K>,
    next_free: Option<u32>,
    active_index: usize,
}

/// Arena owning `T` values and handing out `Handle<K>` references to them.
///
/// `K` defaults to `T`; a different tag lets a pool of records hand out
/// handles typed by the resource they describe.
///
/// Allocation pops the free list before growing. Releasing the last slot
/// shrinks storage instead of free-listing it. Generations come from a single
/// pool-wide counter, so a handle to a released slot never matches whatever
/// is allocated there later.
pub struct HandlePool<T, K = T> {
    slots: Vec<Slot<T, K>>,
    free_head: Option<u32>,
    free_count: usize,
    active: Vec<Handle<K>>,
    next_generation: u32,
}

impl<T, K> Default for HandlePool<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K> HandlePool<T, K> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            free_count: 0,
            active: Vec::with_capacity(capacity),
            next_generation: 1,
        }
    }

    fn bump_generation(&mut self) -> u32 {
        let generation = self.next_generation;
        // Zero stays reserved for the null handle.
        self.next_generation = self.next_generation.wrapping_add(1).max(1);
        generation
    }

    pub fn allocate(&mut self, value: T) -> Handle<K> {
        let generation = self.bump_generation();
        let active_index = self.active.len();

        let handle = match self.free_head {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                self.free_head = entry.next_free.take();
                self.free_count -= 1;
                entry.handle = Handle::new(slot, generation);
                entry.value = Some(value);
                entry.active_index = active_index;
                entry.handle
            }
            None => {
                let slot = self.slots.len() as u32;
                let handle = Handle::new(slot, generation);
                self.slots.push(Slot {
                    value: Some(value),
                    handle,
                    next_free: None,
                    active_index,
                });
                handle
            }
        };

        self.active.push(handle);
        handle
    }

    pub fn is_valid(&self, handle: Handle<K>) -> bool {
        if handle.is_null() {
            return false;
        }
        match self.slots.get(handle.slot as usize) {
            Some(entry) => entry.value.is_some() && entry.handle == handle,
            None => false,
        }
    }

    pub fn get_ref(&self, handle: Handle<K>) -> Option<&T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.slots[handle.slot as usize].value.as_ref()
    }

    pub fn get_mut_ref(&mut self, handle: Handle<K>) -> Option<&mut T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.slots[handle.slot as usize].value.as_mut()
    }

    /// Releases the slot behind `handle` and returns its value. Invalid
    /// handles are ignored.
    pub fn deallocate(&mut self, handle: Handle<K>) -> Option<T> {
        if !self.is_valid(handle) {
            return None;
        }

        let slot = handle.slot as usize;
        let active_index = self.slots[slot].active_index;
        self.active.swap_remove(active_index);
        if let Some(moved) = self.active.get(active_index).copied() {
            self.slots[moved.slot as usize].active_index = active_index;
        }

        if slot + 1 == self.slots.len() {
            return self.slots.pop().and_then(|entry| entry.value);
        }

        let entry = &mut self.slots[slot];
        let value = entry.value.take();
        entry.next_free = self.free_head;
        self.free_head = Some(handle.slot);
        self.free_count += 1;
        value
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Number of slots backing the pool, live or free-listed.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Currently active handles. Order is unspecified once slots are released.
    pub fn handles(&self) -> impl Iterator<Item = Handle<K>> + '_ {
        self.active.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &T)> + '_ {
        self.active.iter().filter_map(move |h| {
            self.slots[h.slot as usize]
                .value
                .as_ref()
                .map(|value| (*h, value))
        })
    }

    pub fn for_each_occupied<F>(&self, mut func: F)
    where
        F: FnMut(&T),
    {
        for (_, value) in self.iter() {
            func(value);
        }
    }

    pub fn for_each_occupied_mut<F>(&mut self, mut func: F)
    where
        F: FnMut(&mut T),
    {
        for entry in self.slots.iter_mut() {
            if let Some(value) = entry.value.as_mut() {
                func(value);
            }
        }
    }

    /// Drops every element. Outstanding handles become invalid.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.active.clear();
        self.free_head = None;
        self.free_count = 0;
    }
}

impl<T, K> Index<Handle<K>> for HandlePool<T, K> {
    type Output = T;

    fn index(&self, handle: Handle<K>) -> &T {
        match self.get_ref(handle) {
            Some(value) => value,
            None => panic!("invalid handle {:?}", handle),
        }
    }
}

impl<T, K> IndexMut<Handle<K>> for HandlePool<T, K> {
    fn index_mut(&mut self, handle: Handle<K>) -> &mut T {
        if !self.is_valid(handle) {
            panic!("invalid handle {:?}", handle);
        }
        match self.slots[handle.slot as usize].value.as_mut() {
            Some(value) => value,
            None => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_handle_is_valid_until_released() {
        let mut pool = HandlePool::<_>::new();
        let a = pool.allocate(1u32);
        let b = pool.allocate(2u32);
        assert!(pool.is_valid(a));
        assert!(pool.is_valid(b));
        assert_eq!(pool[a], 1);

        assert_eq!(pool.deallocate(a), Some(1));
        assert!(!pool.is_valid(a));
        assert!(pool.is_valid(b));
        assert_eq!(pool.deallocate(a), None);
    }

    #[test]
    fn never_issued_handles_are_invalid() {
        let mut pool = HandlePool::<&str>::new();
        pool.allocate("x");
        assert!(!pool.is_valid(Handle::null()));
        assert!(!pool.is_valid(Handle::new(0, 999)));
        assert!(!pool.is_valid(Handle::new(7, 1)));
    }

    #[test]
    fn releasing_last_slot_shrinks_storage() {
        let mut pool = HandlePool::<_>::new();
        let _a = pool.allocate('a');
        let b = pool.allocate('b');
        assert_eq!(pool.slot_count(), 2);

        pool.deallocate(b);
        assert_eq!(pool.slot_count(), 1);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn releasing_inner_slot_is_reused_before_growth() {
        let mut pool = HandlePool::<_>::new();
        let a = pool.allocate(10);
        let _b = pool.allocate(20);
        let _c = pool.allocate(30);

        pool.deallocate(a);
        assert_eq!(pool.slot_count(), 3);
        assert_eq!(pool.free_count(), 1);

        let d = pool.allocate(40);
        assert_eq!(d.slot, a.slot);
        assert_eq!(pool.slot_count(), 3);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let mut pool = HandlePool::<_>::new();
        let a = pool.allocate("first");
        let _b = pool.allocate("keep");
        pool.deallocate(a);
        let c = pool.allocate("second");

        assert_eq!(a.slot, c.slot);
        assert!(!pool.is_valid(a));
        assert!(pool.is_valid(c));
        assert_eq!(pool.get_ref(a), None);
    }

    #[test]
    fn stale_handle_stays_invalid_across_shrink_and_regrow() {
        let mut pool = HandlePool::<_>::new();
        let a = pool.allocate(1);
        pool.deallocate(a);
        assert_eq!(pool.slot_count(), 0);

        let b = pool.allocate(2);
        assert_eq!(a.slot, b.slot);
        assert!(!pool.is_valid(a));
    }

    #[test]
    fn handles_yields_exactly_active_set() {
        let mut pool = HandlePool::<_>::new();
        let hs: Vec<_> = (0..6).map(|i| pool.allocate(i)).collect();
        pool.deallocate(hs[1]);
        pool.deallocate(hs[4]);
        let extra = pool.allocate(99);

        let mut live: Vec<_> = pool.handles().collect();
        live.sort_by_key(|h| h.slot);
        let mut expected = vec![hs[0], hs[2], hs[3], hs[5], extra];
        expected.sort_by_key(|h| h.slot);
        assert_eq!(live, expected);
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn typed_handles_over_records() {
        struct Record {
            native: u64,
        }
        struct Buffer;

        let mut pool: HandlePool<Record, Buffer> = HandlePool::new();
        let h: Handle<Buffer> = pool.allocate(Record { native: 7 });
        assert_eq!(pool[h].native, 7);
        pool[h].native = 8;
        assert_eq!(pool.get_ref(h).map(|r| r.native), Some(8));
    }

    #[test]
    #[should_panic(expected = "invalid handle")]
    fn indexing_with_invalid_handle_panics() {
        let mut pool = HandlePool::<_>::new();
        let a = pool.allocate(5u8);
        pool.deallocate(a);
        let _ = pool[a];
    }
}
