//! §4.8: original-snapshot accounting layered over [`crate::list`]. Grounded
//! on [`crate::trackable_object`]'s shadow-plus-changed-set discipline,
//! generalized from a single object's named properties to a list's
//! positional/keyed items.
//!
//! Item tracking is generic over `T: PartialEq`: for domain types that are
//! themselves [`crate::trackable_object::Trackable`], structural comparison
//! degenerates to whatever `PartialEq` the type defines (conventionally its
//! own `original_equals`-shaped comparison — see the `Person` test type in
//! `trackable_object.rs`), and [`TrackableList::notify_item_changed`] lets a
//! caller forward an item's `is_changed` toggle the same way
//! `TrackableBase::set_child` forwards a nested object's toggle.

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{ObservableError, Result};
use crate::keyed_list::KeyedObservableList;
use crate::list::ObservableList;
use crate::notifier::Notifier;

/// One entry in [`TrackableList::get_changed_items`] / the keyed
/// equivalent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Change<T> {
    Add(T),
    Remove(T),
    Change { current: T, original: T },
}

/// `TrackableList<T>` (§4.8, list variant).
pub struct TrackableList<T> {
    list: Rc<ObservableList<T>>,
    notifier: Rc<Notifier>,
    original: RefCell<Option<Vec<T>>>,
    is_changed: RefCell<bool>,
    init_depth: RefCell<u32>,
}

impl<T: Clone + PartialEq + 'static> TrackableList<T> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            list: Rc::new(ObservableList::new()),
            notifier: Rc::new(Notifier::new()),
            original: RefCell::new(None),
            is_changed: RefCell::new(false),
            init_depth: RefCell::new(0),
        })
    }

    pub fn list(&self) -> &Rc<ObservableList<T>> {
        &self.list
    }

    pub fn notifier(&self) -> &Rc<Notifier> {
        &self.notifier
    }

    pub fn is_changed(&self) -> bool {
        *self.is_changed.borrow()
    }

    pub fn is_initializing(&self) -> bool {
        *self.init_depth.borrow() > 0
    }

    fn ensure_captured(&self) {
        if !self.is_initializing() && self.original.borrow().is_none() {
            *self.original.borrow_mut() = Some(self.list.snapshot());
        }
    }

    fn set_is_changed(&self, value: bool) {
        let mut slot = self.is_changed.borrow_mut();
        if *slot != value {
            *slot = value;
            drop(slot);
            self.notifier.raise("is_changed");
        }
    }

    fn recompute_is_changed(&self) {
        let changed = match &*self.original.borrow() {
            Some(original) => *original != self.list.snapshot(),
            None => false,
        };
        self.set_is_changed(changed);
    }

    /// Call after any structural mutation made through `self.list()`
    /// directly (e.g. `list().add(x)`), so the original snapshot and
    /// `is_changed` stay consistent. During init, mirrors the mutation
    /// into the captured original (if one exists) instead of diffing
    /// against it.
    pub fn on_mutated(&self) {
        if self.is_initializing() {
            if self.original.borrow().is_some() {
                *self.original.borrow_mut() = Some(self.list.snapshot());
            }
            return;
        }
        self.ensure_captured();
        self.recompute_is_changed();
    }

    /// `add(item)` (§4.8): structural mutation plus `on_mutated()` as one
    /// atomic step, so `is_changed`/`get_changed_items()` can never go
    /// stale behind a forgotten follow-up call the way a raw `list().add`
    /// would allow.
    pub fn add(&self, item: T) {
        self.list.add(item);
        self.on_mutated();
    }

    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.list.insert(index, item)?;
        self.on_mutated();
        Ok(())
    }

    pub fn remove(&self, item: &T) -> bool {
        let removed = self.list.remove(item);
        if removed {
            self.on_mutated();
        }
        removed
    }

    pub fn remove_at(&self, index: usize) -> Result<T> {
        let item = self.list.remove_at(index)?;
        self.on_mutated();
        Ok(item)
    }

    pub fn replace_at(&self, index: usize, value: T) -> Result<T> {
        let old = self.list.replace_at(index, value)?;
        self.on_mutated();
        Ok(old)
    }

    pub fn move_item(&self, old_index: usize, new_index: usize) -> Result<()> {
        self.list.move_item(old_index, new_index)?;
        self.on_mutated();
        Ok(())
    }

    pub fn clear(&self) {
        self.list.clear();
        self.on_mutated();
    }

    /// Forwards a contained trackable item's `is_changed` toggle (§4.8:
    /// "when a contained trackable item raises an is_changed toggle").
    pub fn notify_item_changed(&self) {
        if !self.is_initializing() {
            self.recompute_is_changed();
        }
    }

    pub fn begin_init(&self) -> Result<()> {
        if self.is_changed() {
            return Err(ObservableError::InvalidOperation("begin_init while changed"));
        }
        *self.init_depth.borrow_mut() += 1;
        Ok(())
    }

    pub fn end_init(&self) -> Result<()> {
        let mut depth = self.init_depth.borrow_mut();
        if *depth == 0 {
            return Err(ObservableError::InvalidOperation("end_init without matching begin_init"));
        }
        *depth -= 1;
        Ok(())
    }

    /// `reset(iterable, initialize)` (§4.8).
    pub fn reset(&self, iterable: impl IntoIterator<Item = T>, initialize: bool) -> Result<()> {
        if initialize {
            self.begin_init()?;
            *self.original.borrow_mut() = None;
            self.list.reset(iterable);
            self.end_init()?;
            self.set_is_changed(false);
        } else {
            self.list.reset(iterable);
            self.on_mutated();
        }
        Ok(())
    }

    /// `accept_changes` (§4.8): non-trackable-items path — simply discards
    /// the original snapshot and clears `is_changed`. Callers whose items
    /// are themselves trackable must `accept_changes()` each item first
    /// (mirroring `TrackableBase::accept_child`'s recursive-then-flatten
    /// order) before calling this.
    pub fn accept_changes(&self) -> Result<()> {
        if self.is_initializing() {
            return Err(ObservableError::InvalidOperation("accept_changes while initializing"));
        }
        *self.original.borrow_mut() = None;
        self.set_is_changed(false);
        Ok(())
    }

    /// `reject_changes` (§4.8): restores the captured original, if any.
    pub fn reject_changes(&self) -> Result<()> {
        if self.is_initializing() {
            return Err(ObservableError::InvalidOperation("reject_changes while initializing"));
        }
        if let Some(original) = self.original.borrow_mut().take() {
            self.list.reset(original);
        }
        self.set_is_changed(false);
        Ok(())
    }

    /// `get_changed_items()` (§4.8, list variant): position/identity diff
    /// against the captured original.
    pub fn get_changed_items(&self) -> Vec<Change<T>> {
        let Some(original) = self.original.borrow().clone() else {
            return Vec::new();
        };
        let current = self.list.snapshot();
        let mut changes = Vec::new();
        let mut matched_original = vec![false; original.len()];

        for (i, item) in current.iter().enumerate() {
            if let Some(orig_at_same_pos) = original.get(i) {
                if orig_at_same_pos == item {
                    matched_original[i] = true;
                    continue;
                }
            }
            // Same-position original didn't match; look for the item
            // elsewhere in the original (an unmatched position change).
            if let Some(found) = original
                .iter()
                .enumerate()
                .find(|(j, o)| !matched_original[*j] && *o == item)
            {
                matched_original[found.0] = true;
                changes.push(Change::Change { current: item.clone(), original: found.1.clone() });
                continue;
            }
            changes.push(Change::Add(item.clone()));
        }

        for (j, orig) in original.iter().enumerate() {
            if !matched_original[j] {
                changes.push(Change::Remove(orig.clone()));
            }
        }
        changes
    }

    /// `original_equals` (§4.8, list variant): element-wise equality
    /// against another sequence of the same length.
    pub fn original_equals(&self, other: &[T]) -> bool {
        let current = self.list.snapshot();
        current.len() == other.len() && current.iter().zip(other).all(|(a, b)| a == b)
    }
}

/// `TrackableKeyedList<K, T>` (§4.8, keyed variant).
pub struct TrackableKeyedList<K, T> {
    list: Rc<KeyedObservableList<K, T>>,
    notifier: Rc<Notifier>,
    original: RefCell<Option<FxHashMap<K, T>>>,
    is_changed: RefCell<bool>,
    init_depth: RefCell<u32>,
}

impl<K, T> TrackableKeyedList<K, T>
where
    K: Eq + Hash + Clone + 'static,
    T: Clone + PartialEq + 'static,
{
    pub fn new(key_of: impl Fn(&T) -> K + 'static) -> Rc<Self> {
        Rc::new(Self {
            list: KeyedObservableList::new(key_of),
            notifier: Rc::new(Notifier::new()),
            original: RefCell::new(None),
            is_changed: RefCell::new(false),
            init_depth: RefCell::new(0),
        })
    }

    pub fn list(&self) -> &Rc<KeyedObservableList<K, T>> {
        &self.list
    }

    pub fn notifier(&self) -> &Rc<Notifier> {
        &self.notifier
    }

    pub fn is_changed(&self) -> bool {
        *self.is_changed.borrow()
    }

    pub fn is_initializing(&self) -> bool {
        *self.init_depth.borrow() > 0
    }

    fn current_map(&self) -> FxHashMap<K, T> {
        self.list
            .snapshot()
            .into_iter()
            .map(|item| (self.list.get_key(&item), item))
            .collect()
    }

    fn set_is_changed(&self, value: bool) {
        let mut slot = self.is_changed.borrow_mut();
        if *slot != value {
            *slot = value;
            drop(slot);
            self.notifier.raise("is_changed");
        }
    }

    fn recompute_is_changed(&self) {
        let changed = match &*self.original.borrow() {
            Some(original) => *original != self.current_map(),
            None => false,
        };
        self.set_is_changed(changed);
    }

    pub fn on_mutated(&self) {
        if self.is_initializing() {
            if self.original.borrow().is_some() {
                *self.original.borrow_mut() = Some(self.current_map());
            }
            return;
        }
        if self.original.borrow().is_none() {
            *self.original.borrow_mut() = Some(self.current_map());
        }
        self.recompute_is_changed();
    }

    pub fn notify_item_changed(&self) {
        if !self.is_initializing() {
            self.recompute_is_changed();
        }
    }

    /// `add(value)` (§4.8, keyed variant): structural mutation plus
    /// `on_mutated()` as one atomic step.
    pub fn add(&self, value: T) -> Result<()> {
        self.list.add(value)?;
        self.on_mutated();
        Ok(())
    }

    pub fn remove_key(&self, key: &K) -> Option<T> {
        let removed = self.list.remove_key(key);
        if removed.is_some() {
            self.on_mutated();
        }
        removed
    }

    pub fn add_or_update(&self, value: T) {
        self.list.add_or_update(value);
        self.on_mutated();
    }

    pub fn clear(&self) {
        self.list.clear();
        self.on_mutated();
    }

    pub fn begin_init(&self) -> Result<()> {
        if self.is_changed() {
            return Err(ObservableError::InvalidOperation("begin_init while changed"));
        }
        *self.init_depth.borrow_mut() += 1;
        Ok(())
    }

    pub fn end_init(&self) -> Result<()> {
        let mut depth = self.init_depth.borrow_mut();
        if *depth == 0 {
            return Err(ObservableError::InvalidOperation("end_init without matching begin_init"));
        }
        *depth -= 1;
        Ok(())
    }

    pub fn accept_changes(&self) -> Result<()> {
        if self.is_initializing() {
            return Err(ObservableError::InvalidOperation("accept_changes while initializing"));
        }
        *self.original.borrow_mut() = None;
        self.set_is_changed(false);
        Ok(())
    }

    pub fn reject_changes(&self) -> Result<()> {
        if self.is_initializing() {
            return Err(ObservableError::InvalidOperation("reject_changes while initializing"));
        }
        if let Some(original) = self.original.borrow_mut().take() {
            self.list.reset(original.into_values()).expect("captured original had no duplicate keys");
        }
        self.set_is_changed(false);
        Ok(())
    }

    /// `try_get_change(key)` (§4.8, keyed variant).
    pub fn try_get_change(&self, key: &K) -> Option<Change<T>> {
        let original = self.original.borrow();
        let original = original.as_ref()?;
        let current = self.list.try_get(key);
        match (current, original.get(key)) {
            (Some(c), None) => Some(Change::Add(c)),
            (None, Some(o)) => Some(Change::Remove(o.clone())),
            (Some(c), Some(o)) if &c != o => Some(Change::Change { current: c, original: o.clone() }),
            _ => None,
        }
    }

    pub fn is_value_changed(&self, key: &K) -> bool {
        self.try_get_change(key).is_some()
    }

    pub fn get_changed_items(&self) -> Vec<Change<T>> {
        let Some(original) = self.original.borrow().clone() else {
            return Vec::new();
        };
        let current = self.current_map();
        let mut changes = Vec::new();
        for (key, item) in &current {
            match original.get(key) {
                None => changes.push(Change::Add(item.clone())),
                Some(orig) if orig != item => {
                    changes.push(Change::Change { current: item.clone(), original: orig.clone() })
                }
                _ => {}
            }
        }
        for (key, orig) in &original {
            if !current.contains_key(key) {
                changes.push(Change::Remove(orig.clone()));
            }
        }
        changes
    }

    /// `add_or_update_original(v)` (§4.8): edits the captured-original map
    /// directly, recomputing `is_changed` if that toggles its state.
    pub fn add_or_update_original(&self, value: T) {
        let key = self.list.get_key(&value);
        if let Some(original) = self.original.borrow_mut().as_mut() {
            original.insert(key, value);
        }
        self.recompute_is_changed();
    }

    /// `original_equals` (§4.8, keyed variant): map comparison where a key
    /// missing on either side is a mismatch.
    pub fn original_equals(&self, other: &FxHashMap<K, T>) -> bool {
        &self.current_map() == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_changes_clears_is_changed_and_baseline() {
        let t = TrackableList::<i32>::new();
        t.add(1);
        t.add(2);
        assert!(t.is_changed());
        t.accept_changes().unwrap();
        assert!(!t.is_changed());
        assert!(t.get_changed_items().is_empty());
    }

    #[test]
    fn reject_changes_restores_snapshot() {
        let t = TrackableList::<i32>::new();
        t.reset([1, 2, 3], true).unwrap();
        t.add(4);
        assert!(t.is_changed());
        t.reject_changes().unwrap();
        assert!(!t.is_changed());
        assert_eq!(t.list().snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn get_changed_items_detects_add_remove_and_position_change() {
        let t = TrackableList::<&'static str>::new();
        t.reset(["a", "b", "c"], true).unwrap();
        t.reset(["b", "a", "d"], false).unwrap();
        let mut changes = t.get_changed_items();
        changes.sort_by_key(|c| format!("{c:?}"));
        assert!(changes.iter().any(|c| matches!(c, Change::Add("d"))));
        assert!(changes.iter().any(|c| matches!(c, Change::Remove("c"))));
    }

    #[test]
    fn keyed_try_get_change_reports_add_remove_and_change() {
        let t = TrackableKeyedList::<u32, (u32, &'static str)>::new(|p| p.0);
        t.reset([(1, "a"), (2, "b")], true).unwrap();
        t.add_or_update((1, "a-updated"));
        t.remove_key(&2);
        t.add((3, "c")).unwrap();

        assert!(matches!(t.try_get_change(&1), Some(Change::Change { .. })));
        assert!(matches!(t.try_get_change(&2), Some(Change::Remove(_))));
        assert!(matches!(t.try_get_change(&3), Some(Change::Add(_))));
        assert!(t.is_value_changed(&1));
    }
}
