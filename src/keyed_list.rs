//! §4.7: `KeyedObservableList<K, T>` — an `ObservableList` with a
//! `key → index` map kept in lockstep with every structural change.
//! Grounded on the same `medea_reactive::ObservableHashMap` subscriber
//! pattern as [`crate::list`], extended with the index-tracking discipline
//! `leptos_reactive`'s `SlotMap`-backed arena uses to keep a dense id→slot
//! mapping valid across removals.

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{ObservableError, Result};
use crate::list::{CollectionChange, ObservableList};
use crate::notifier::Notifier;
use crate::subject::Subject;

/// `KeyedObservableList<K, T>` (§4.7). Wraps an [`ObservableList`] and
/// keeps a `key → index` side-map consistent with it by listening to its
/// own `collection_changes` stream internally, rather than duplicating the
/// list's mutation methods.
pub struct KeyedObservableList<K, T> {
    list: Rc<ObservableList<T>>,
    key_of: Box<dyn Fn(&T) -> K>,
    index_by_key: RefCell<FxHashMap<K, usize>>,
}

impl<K: std::fmt::Debug + Eq + Hash, T: std::fmt::Debug + Clone + PartialEq + 'static> std::fmt::Debug
    for KeyedObservableList<K, T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedObservableList").field("items", &self.list.snapshot()).finish()
    }
}

impl<'a, K: Eq + Hash + Clone + 'static, T: Clone + PartialEq + 'static> IntoIterator
    for &'a KeyedObservableList<K, T>
{
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshot().into_iter()
    }
}

impl<K, T> KeyedObservableList<K, T>
where
    K: Eq + Hash + Clone + 'static,
    T: Clone + PartialEq + 'static,
{
    pub fn new(key_of: impl Fn(&T) -> K + 'static) -> Rc<Self> {
        let list = Rc::new(ObservableList::new());
        let this = Rc::new(Self {
            list,
            key_of: Box::new(key_of),
            index_by_key: RefCell::new(FxHashMap::default()),
        });
        let weak = Rc::downgrade(&this);
        this.list.on_collection_changed(move |change| {
            if let Some(this) = weak.upgrade() {
                this.reindex(change);
            }
        });
        this
    }

    fn reindex(&self, change: &CollectionChange<T>) {
        // Index tracking is a full rebuild rather than an incremental
        // patch: correctness over cleverness, since keyed lists are not
        // expected to be hot-path-sized in this crate's domain.
        let snapshot = self.list.snapshot();
        let mut map = FxHashMap::default();
        for (i, item) in snapshot.iter().enumerate() {
            map.insert((self.key_of)(item), i);
        }
        *self.index_by_key.borrow_mut() = map;
        let _ = change;
    }

    pub fn notifier(&self) -> &Rc<Notifier> {
        self.list.notifier()
    }

    pub fn collection_changes(&self) -> Subject<CollectionChange<T>> {
        self.list.collection_changes()
    }

    pub fn count(&self) -> usize {
        self.list.count()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.list.snapshot()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.list.get(index)
    }

    pub fn get_key(&self, value: &T) -> K {
        (self.key_of)(value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index_by_key.borrow().contains_key(key)
    }

    pub fn index_of_key(&self, key: &K) -> Option<usize> {
        self.index_by_key.borrow().get(key).copied()
    }

    pub fn try_get(&self, key: &K) -> Option<T> {
        self.index_of_key(key).and_then(|i| self.list.get(i))
    }

    pub fn add(&self, value: T) -> Result<()> {
        let key = (self.key_of)(&value);
        if self.contains_key(&key) {
            return Err(ObservableError::DuplicateKey);
        }
        self.list.add(value);
        Ok(())
    }

    pub fn remove_key(&self, key: &K) -> Option<T> {
        let index = self.index_of_key(key)?;
        self.list.remove_at(index).ok()
    }

    /// Replaces the existing entry with the same key, or appends if none
    /// exists.
    pub fn add_or_update(&self, value: T) {
        let key = (self.key_of)(&value);
        match self.index_of_key(&key) {
            Some(index) => {
                self.list.replace_at(index, value).expect("index came from the live map");
            }
            None => self.list.add(value),
        }
    }

    pub fn clear(&self) {
        self.list.clear();
    }

    /// Resets to `iterable`; fails with `DuplicateKey` if two items share a
    /// key, leaving the list unchanged.
    pub fn reset(&self, iterable: impl IntoIterator<Item = T>) -> Result<()> {
        let items: Vec<T> = iterable.into_iter().collect();
        let mut seen = FxHashMap::default();
        for (i, item) in items.iter().enumerate() {
            let key = (self.key_of)(item);
            if seen.insert(key, i).is_some() {
                return Err(ObservableError::DuplicateKey);
            }
        }
        self.list.reset(items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Row {
        id: u32,
        name: &'static str,
    }

    #[test]
    fn add_remove_and_lookup_by_key() {
        let list = KeyedObservableList::new(|r: &Row| r.id);
        list.add(Row { id: 1, name: "a" }).unwrap();
        list.add(Row { id: 2, name: "b" }).unwrap();
        assert!(list.contains_key(&1));
        assert_eq!(list.index_of_key(&2), Some(1));
        assert_eq!(list.try_get(&1), Some(Row { id: 1, name: "a" }));

        assert!(matches!(list.add(Row { id: 1, name: "dup" }), Err(ObservableError::DuplicateKey)));

        let removed = list.remove_key(&1);
        assert_eq!(removed, Some(Row { id: 1, name: "a" }));
        assert!(!list.contains_key(&1));
        assert_eq!(list.index_of_key(&2), Some(0));
    }

    #[test]
    fn add_or_update_replaces_existing_in_place() {
        let list = KeyedObservableList::new(|r: &Row| r.id);
        list.add(Row { id: 1, name: "a" }).unwrap();
        list.add(Row { id: 2, name: "b" }).unwrap();
        list.add_or_update(Row { id: 1, name: "updated" });
        assert_eq!(list.snapshot(), vec![Row { id: 1, name: "updated" }, Row { id: 2, name: "b" }]);
    }

    #[test]
    fn reset_with_duplicate_keys_errors_and_leaves_list_unchanged() {
        let list = KeyedObservableList::new(|r: &Row| r.id);
        list.add(Row { id: 1, name: "a" }).unwrap();
        let result = list.reset([Row { id: 2, name: "x" }, Row { id: 2, name: "y" }]);
        assert!(matches!(result, Err(ObservableError::DuplicateKey)));
        assert_eq!(list.snapshot(), vec![Row { id: 1, name: "a" }]);
    }
}
