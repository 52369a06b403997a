//! Ordered in-memory table used for accounts, books and loans.
//!
//! Every appended record is tagged with a monotonically increasing sequence
//! number. The entries vector stays sorted by that number, so a [`Handle`] is
//! resolved with a binary search and erasing shifts the tail down instead of
//! swapping, which keeps the surviving records in insertion order.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Stable reference to a record inside a [`RecordStore`]. It stays valid until
/// the record is erased; afterwards it resolves to nothing.
pub struct Handle<T> {
    seq: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(seq: u64) -> Self {
        Self {
            seq,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seq.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.seq)
    }
}

struct Entry<T> {
    seq: u64,
    value: T,
}

/// Owning, insertion-ordered collection of records.
pub struct RecordStore<T> {
    entries: Vec<Entry<T>>,
    next_seq: u64,
}

impl<T> Default for RecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for RecordStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> RecordStore<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take ownership of `value` and place it after every live record.
    pub fn append(&mut self, value: T) -> Handle<T> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { seq, value });
        Handle::new(seq)
    }

    fn position(&self, handle: Handle<T>) -> Option<usize> {
        self.entries
            .binary_search_by_key(&handle.seq, |entry| entry.seq)
            .ok()
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.position(handle).is_some()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.position(handle).map(|idx| &self.entries[idx].value)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let idx = self.position(handle)?;
        Some(&mut self.entries[idx].value)
    }

    /// First record, in insertion order, accepted by `predicate`.
    pub fn find_match<P>(&self, predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.match_handle(predicate)
            .and_then(|handle| self.get(handle))
    }

    /// Handle of the first record accepted by `predicate`.
    pub fn match_handle<P>(&self, mut predicate: P) -> Option<Handle<T>>
    where
        P: FnMut(&T) -> bool,
    {
        self.entries
            .iter()
            .find(|entry| predicate(&entry.value))
            .map(|entry| Handle::new(entry.seq))
    }

    /// Remove the record behind `handle`. A stale or foreign handle leaves the
    /// store untouched and reports `false`.
    pub fn erase(&mut self, handle: Handle<T>) -> bool {
        match self.position(handle) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|entry| &entry.value)
    }

    /// Live records paired with their handles, in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.entries
            .iter()
            .map(|entry| (Handle::new(entry.seq), &entry.value))
    }
}

impl<T: PartialEq> RecordStore<T> {
    /// First record whose full contents equal `value`.
    pub fn find(&self, value: &T) -> Option<&T> {
        self.find_match(|candidate| candidate == value)
    }

    pub fn find_handle(&self, value: &T) -> Option<Handle<T>> {
        self.match_handle(|candidate| candidate == value)
    }
}

impl<T> FromIterator<T> for RecordStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut store = Self::new();
        for value in iter {
            store.append(value);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(store: &RecordStore<u32>) -> Vec<u32> {
        store.iter().copied().collect()
    }

    #[test]
    fn append_keeps_insertion_order() {
        let store: RecordStore<u32> = [5, 3, 9, 3].into_iter().collect();
        assert_eq!(collect(&store), vec![5, 3, 9, 3]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn erase_preserves_order_of_survivors() {
        let mut store = RecordStore::new();
        let handles: Vec<_> = (0..10u32).map(|n| store.append(n)).collect();

        for idx in [0usize, 4, 9, 5] {
            assert!(store.erase(handles[idx]));
        }
        assert_eq!(collect(&store), vec![1, 2, 3, 6, 7, 8]);

        let late = store.append(42);
        assert!(store.erase(handles[2]));
        assert_eq!(collect(&store), vec![1, 3, 6, 7, 8, 42]);
        assert_eq!(store.get(late), Some(&42));
    }

    #[test]
    fn interleaved_appends_and_erasures_match_a_reference_model() {
        let mut store = RecordStore::new();
        let mut model: Vec<(Handle<u32>, u32)> = Vec::new();

        for step in 0..200u32 {
            if step % 3 == 2 && !model.is_empty() {
                let victim = (step as usize * 7) % model.len();
                let (handle, _) = model.remove(victim);
                assert!(store.erase(handle));
            } else {
                model.push((store.append(step), step));
            }
        }

        let expected: Vec<u32> = model.iter().map(|(_, value)| *value).collect();
        assert_eq!(collect(&store), expected);
        for (handle, value) in &model {
            assert_eq!(store.get(*handle), Some(value));
        }
    }

    #[test]
    fn stale_handle_is_rejected_without_mutation() {
        let mut store = RecordStore::new();
        let first = store.append(1u32);
        store.append(2);
        assert!(store.erase(first));
        assert!(!store.erase(first));
        assert!(store.get(first).is_none());
        assert_eq!(collect(&store), vec![2]);
    }

    #[test]
    fn find_and_match_return_first_hit() {
        let mut store = RecordStore::new();
        store.append((1u32, "a"));
        let second = store.append((2, "b"));
        store.append((2, "c"));

        assert_eq!(store.find(&(2, "c")), Some(&(2, "c")));
        assert_eq!(store.find(&(9, "z")), None);
        assert_eq!(store.find_match(|(n, _)| *n == 2), Some(&(2, "b")));
        assert_eq!(store.match_handle(|(n, _)| *n == 2), Some(second));
        assert_eq!(store.find_handle(&(1, "a")).map(|h| store.contains(h)), Some(true));
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut store = RecordStore::new();
        let handle = store.append(String::from("draft"));
        if let Some(value) = store.get_mut(handle) {
            value.push_str("-final");
        }
        assert_eq!(store.get(handle).map(String::as_str), Some("draft-final"));
    }
}
