//! §4.6: `ObservableList<T>`, the structural-change event, and persisted
//! sort. Grounded on `medea_reactive`'s `ObservableHashMap` subscriber-vec
//! pattern (other_examples) for `collection_changed`/`collection_changes`,
//! generalized from a map's `Insert`/`Remove` pair to the five list action
//! tags the source calls for.

use std::cell::RefCell;
use std::rc::Rc;

use std::cell::Cell;

use crate::error::{ObservableError, Result};
use crate::notifier::{Notifier, PropertyChangedArgs, SubscriptionId};
use crate::observable_object::ObservableObject;
use crate::subject::Subject;

/// The standard action tag carried by every `collection_changed` delivery.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollectionChange<T> {
    Add { index: usize, item: T },
    Remove { index: usize, item: T },
    Replace { index: usize, old: T, new: T },
    Move { old_index: usize, new_index: usize, item: T },
    Reset,
}

/// How a list keeps itself sorted, if at all.
enum SortMode<T> {
    None,
    /// `persist`: re-sort position on every insert and expose
    /// `update_sort_position`; non-persisted sorts are one-shot and leave
    /// the list unsorted thereafter.
    Persisted(Rc<dyn Fn(&T, &T) -> std::cmp::Ordering>),
}

/// `list<T>` (§4.6): ordered, observable, with optional persisted sort and
/// an item-property fan-in stream.
pub struct ObservableList<T> {
    notifier: Rc<Notifier>,
    items: RefCell<Vec<T>>,
    changes: RefCell<Option<Subject<CollectionChange<T>>>>,
    sort_mode: RefCell<SortMode<T>>,
    /// Same-thread structural listeners (`bind`, keyed-list reindexing,
    /// derived views, `items_changes`' own resync). Kept separate from
    /// `changes` because those consumers capture `Rc`/`Weak` state, which
    /// cannot satisfy `collection_changes()`'s `Send + Sync` subscriber
    /// bound — the same split `Notifier` makes from `Subject`.
    internal_changes: RefCell<Vec<Rc<RefCell<dyn FnMut(&CollectionChange<T>)>>>>,
    item_changes: RefCell<Option<Subject<(usize, PropertyChangedArgs)>>>,
    item_subscriptions: RefCell<Vec<(Rc<Notifier>, SubscriptionId)>>,
    item_changes_bound: Cell<bool>,
}

impl<T: Clone + PartialEq + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug + 'static> std::fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableList").field("items", &self.items.borrow()).finish()
    }
}

impl<'a, T: Clone + PartialEq + 'static> IntoIterator for &'a ObservableList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshot().into_iter()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableList<T> {
    pub fn new() -> Self {
        Self {
            notifier: Rc::new(Notifier::new()),
            items: RefCell::new(Vec::new()),
            changes: RefCell::new(None),
            sort_mode: RefCell::new(SortMode::None),
            internal_changes: RefCell::new(Vec::new()),
            item_changes: RefCell::new(None),
            item_subscriptions: RefCell::new(Vec::new()),
            item_changes_bound: Cell::new(false),
        }
    }

    pub fn notifier(&self) -> &Rc<Notifier> {
        &self.notifier
    }

    pub fn collection_changes(&self) -> Subject<CollectionChange<T>> {
        self.changes.borrow_mut().get_or_insert_with(Subject::new).clone()
    }

    /// Same-thread counterpart to [`Self::collection_changes`] for `Rc`-based
    /// internal consumers that cannot offer a `Send + Sync` closure — the
    /// mechanism `bind`, [`crate::keyed_list::KeyedObservableList`], the
    /// derived views, and `items_changes`' own resync all use.
    pub(crate) fn on_collection_changed(&self, f: impl FnMut(&CollectionChange<T>) + 'static) {
        self.internal_changes.borrow_mut().push(Rc::new(RefCell::new(f)));
    }

    fn publish(&self, change: CollectionChange<T>) {
        if let Some(stream) = self.changes.borrow().as_ref() {
            stream.on_next(change.clone());
        }
        let listeners: Vec<_> = self.internal_changes.borrow().iter().cloned().collect();
        for listener in listeners {
            (listener.borrow_mut())(&change);
        }
    }

    pub fn count(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn first(&self) -> Option<T> {
        self.items.borrow().first().cloned()
    }

    pub fn last(&self) -> Option<T> {
        self.items.borrow().last().cloned()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.borrow().get(index).cloned()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.borrow().iter().any(|x| x == item)
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.borrow().iter().position(|x| x == item)
    }

    fn raise_structural(&self) {
        self.notifier.raise("count");
        self.notifier.raise("is_empty");
        self.notifier.raise("first");
        self.notifier.raise("last");
    }

    /// Enables a persisted sort: every subsequent `add`/`add_range` inserts
    /// at the binary-search position instead of appending.
    pub fn enable_persisted_sort(&self, cmp: impl Fn(&T, &T) -> std::cmp::Ordering + 'static) {
        *self.sort_mode.borrow_mut() = SortMode::Persisted(Rc::new(cmp));
    }

    fn persisted_insert_index(&self, item: &T) -> Option<usize> {
        match &*self.sort_mode.borrow() {
            SortMode::None => None,
            SortMode::Persisted(cmp) => {
                let items = self.items.borrow();
                // Stable tie-break: append after existing equals, so search
                // for the first position strictly greater than `item`.
                let pos = items.partition_point(|existing| cmp(existing, item) != std::cmp::Ordering::Greater);
                Some(pos)
            }
        }
    }

    pub fn add(&self, item: T) {
        let index = self.persisted_insert_index(&item).unwrap_or(self.count());
        self.items.borrow_mut().insert(index, item.clone());
        self.raise_structural();
        self.publish(CollectionChange::Add { index, item });
    }

    pub fn add_range(&self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.add(item);
        }
    }

    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        if index > self.count() {
            return Err(ObservableError::OutOfRange { index, len: self.count() });
        }
        self.items.borrow_mut().insert(index, item.clone());
        self.raise_structural();
        self.publish(CollectionChange::Add { index, item });
        Ok(())
    }

    pub fn remove(&self, item: &T) -> bool {
        match self.index_of(item) {
            Some(index) => {
                self.remove_at(index).expect("index_of guarantees validity");
                true
            }
            None => false,
        }
    }

    /// `this[index] = value` (§4.6): replaces the element in place and
    /// publishes `Replace` rather than a `Remove`/`Add` pair, so a bound
    /// target or derived view sees one positional update instead of two
    /// structural ones.
    pub fn replace_at(&self, index: usize, value: T) -> Result<T> {
        let len = self.count();
        if index >= len {
            return Err(ObservableError::OutOfRange { index, len });
        }
        let old = std::mem::replace(&mut self.items.borrow_mut()[index], value.clone());
        self.notifier.raise("indexer");
        self.publish(CollectionChange::Replace { index, old: old.clone(), new: value });
        Ok(old)
    }

    pub fn remove_at(&self, index: usize) -> Result<T> {
        let len = self.count();
        if index >= len {
            return Err(ObservableError::OutOfRange { index, len });
        }
        let item = self.items.borrow_mut().remove(index);
        self.raise_structural();
        self.publish(CollectionChange::Remove { index, item: item.clone() });
        Ok(item)
    }

    pub fn remove_all(&self, predicate: impl Fn(&T) -> bool) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.count() {
            let matches = predicate(&self.items.borrow()[i]);
            if matches {
                self.remove_at(i).expect("bounds checked by loop");
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    pub fn move_item(&self, old_index: usize, new_index: usize) -> Result<()> {
        let len = self.count();
        if old_index >= len {
            return Err(ObservableError::OutOfRange { index: old_index, len });
        }
        if new_index >= len {
            return Err(ObservableError::OutOfRange { index: new_index, len });
        }
        if old_index == new_index {
            return Ok(());
        }
        let item = self.items.borrow_mut().remove(old_index);
        self.items.borrow_mut().insert(new_index, item.clone());
        self.notifier.raise("indexer");
        self.publish(CollectionChange::Move { old_index, new_index, item });
        Ok(())
    }

    pub fn clear(&self) {
        if self.is_empty() {
            return;
        }
        self.items.borrow_mut().clear();
        self.raise_structural();
        self.publish(CollectionChange::Reset);
    }

    pub fn reset(&self, iterable: impl IntoIterator<Item = T>) {
        *self.items.borrow_mut() = iterable.into_iter().collect();
        self.raise_structural();
        self.publish(CollectionChange::Reset);
    }

    /// Unstable-primitive-sort avoided: sorts an index array and
    /// tie-breaks on original position, matching the stable-sort technique
    /// the source calls for when the items themselves are not `Ord`.
    pub fn sort_by<K: Ord>(&self, mut key: impl FnMut(&T) -> K) {
        let mut indexed: Vec<(usize, K)> =
            self.items.borrow().iter().enumerate().map(|(i, t)| (i, key(t))).collect();
        indexed.sort_by(|(ia, ka), (ib, kb)| ka.cmp(kb).then(ia.cmp(ib)));
        let order: Vec<usize> = indexed.into_iter().map(|(i, _)| i).collect();
        let old = self.items.borrow().clone();
        *self.items.borrow_mut() = order.into_iter().map(|i| old[i].clone()).collect();
        self.notifier.raise("indexer");
        self.publish(CollectionChange::Reset);
    }

    /// Recomputes the sorted position for a single item under the
    /// currently enabled persisted sort, issuing a `Move` if it changed.
    pub fn update_sort_position(&self, item: &T) -> Result<()> {
        let old_index = self
            .index_of(item)
            .ok_or(ObservableError::InvalidOperation("update_sort_position: item not present"))?;
        let Some(mut new_index) = self.persisted_insert_index(item) else {
            return Err(ObservableError::InvalidOperation("update_sort_position: no persisted sort enabled"));
        };
        // `persisted_insert_index` assumes the item is not yet in the
        // list; compensate for its own slot shifting the partition point.
        if new_index > old_index {
            new_index -= 1;
        }
        self.move_item(old_index, new_index)
    }

    pub fn aggregate<A>(&self, seed: A, mut f: impl FnMut(A, &T) -> A) -> A {
        self.items.borrow().iter().fold(seed, |acc, item| f(acc, item))
    }

    /// Mirrors every structural change onto `target` (§4.6): `add`/`remove`
    /// for `Add`/`Remove`, clear-then-restore-then-append for `Reset`.
    pub fn bind<Target>(self: &Rc<Self>, target: Rc<Target>, mut selector: impl FnMut(&T) -> Target::Item + 'static)
    where
        Target: BindTarget + 'static,
    {
        let snapshot_at_bind = self.snapshot();
        let weak_target = Rc::downgrade(&target);
        self.on_collection_changed(move |change| {
            let Some(target) = weak_target.upgrade() else { return };
            match change {
                CollectionChange::Add { item, .. } => target.add(selector(item)),
                CollectionChange::Remove { item, .. } => target.remove(&selector(item)),
                CollectionChange::Replace { old, new, .. } => {
                    target.remove(&selector(old));
                    target.add(selector(new));
                }
                CollectionChange::Move { .. } => {}
                CollectionChange::Reset => {
                    target.clear();
                    for item in &snapshot_at_bind {
                        target.add(selector(item));
                    }
                }
            }
        });
    }
}

/// Minimal external-collection surface `bind` needs from its mirror
/// target.
pub trait BindTarget {
    type Item;
    fn add(&self, item: Self::Item);
    fn remove(&self, item: &Self::Item);
    fn clear(&self);
}

impl<T> ObservableList<T>
where
    T: Clone + PartialEq + ObservableObject + 'static,
{
    /// Lazily-allocated fan-in stream of `(index, PropertyChangedArgs)` from
    /// every contained item's own `property_changed`. Requires `T:
    /// ObservableObject`, which is how this crate expresses §4.6's "`T` must
    /// be observable" requirement at compile time rather than with a runtime
    /// `NotSupported` error — a non-observable `T` simply never has this
    /// method in scope.
    ///
    /// Subscriptions are rebuilt from scratch on every structural change
    /// (matching [`crate::keyed_list::KeyedObservableList`]'s reindex
    /// strategy) rather than patched incrementally, so indices stay correct
    /// across `Move`/`Reset` without per-change index arithmetic.
    pub fn items_changes(self: &Rc<Self>) -> Subject<(usize, PropertyChangedArgs)> {
        {
            let mut guard = self.item_changes.borrow_mut();
            if guard.is_none() {
                *guard = Some(Subject::new());
            }
        }
        self.resubscribe_item_changes();
        if !self.item_changes_bound.replace(true) {
            let weak = Rc::downgrade(self);
            self.on_collection_changed(move |_| {
                if let Some(this) = weak.upgrade() {
                    this.resubscribe_item_changes();
                }
            });
        }
        self.item_changes.borrow().as_ref().unwrap().clone()
    }

    fn resubscribe_item_changes(&self) {
        for (notifier, id) in self.item_subscriptions.borrow_mut().drain(..) {
            notifier.unsubscribe(id);
        }
        let Some(stream) = self.item_changes.borrow().as_ref().cloned() else { return };
        for (index, item) in self.items.borrow().iter().enumerate() {
            let out = stream.clone();
            let id = item.notifier().subscribe(move |args| out.on_next((index, args.clone())));
            self.item_subscriptions.borrow_mut().push((Rc::clone(item.notifier()), id));
        }
    }
}
