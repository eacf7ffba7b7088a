//! §4.9: derived, read-only views over an [`ObservableList`] — map,
//! combine, new-items, and aggregate. Grounded on
//! `leptos_reactive::memo`/`selector.rs`'s "subscribe upstream, recompute
//! lazily, push only on real change" shape, adapted from a single scalar
//! memo to list-shaped derivations.

use std::cell::RefCell;
use std::rc::Rc;

use crate::list::{CollectionChange, ObservableList};
use crate::notifier::Notifier;
use crate::subject::Subject;

/// `source_list.map(selector)` (§4.9): a read-only list mirroring `source`
/// through `selector`, subscribed weakly so the view does not keep the
/// source alive.
pub struct MapView<T> {
    list: Rc<ObservableList<T>>,
}

impl<T: Clone + PartialEq + 'static> MapView<T> {
    pub fn new<S>(source: &Rc<ObservableList<S>>, selector: impl Fn(&S) -> T + 'static) -> Rc<Self>
    where
        S: Clone + PartialEq + 'static,
    {
        let list = Rc::new(ObservableList::new());
        list.reset(source.snapshot().iter().map(&selector));
        let view = Rc::new(Self { list });
        let weak_list = Rc::downgrade(&view.list);
        source.on_collection_changed(move |change| {
            let Some(list) = weak_list.upgrade() else { return };
            match change {
                CollectionChange::Add { index, item } => {
                    let _ = list.insert(*index, selector(item));
                }
                CollectionChange::Remove { index, .. } => {
                    let _ = list.remove_at(*index);
                }
                CollectionChange::Replace { index, new, .. } => {
                    let _ = list.remove_at(*index);
                    let _ = list.insert(*index, selector(new));
                }
                CollectionChange::Move { old_index, new_index, .. } => {
                    let _ = list.move_item(*old_index, *new_index);
                }
                CollectionChange::Reset => {
                    // The view can't re-derive from a `Reset` payload alone
                    // (the source doesn't carry its new contents in the
                    // event); callers must call `resync` with the fresh
                    // source snapshot after a reset they issued themselves.
                    list.clear();
                }
            }
        });
        view
    }

    pub fn list(&self) -> &Rc<ObservableList<T>> {
        &self.list
    }

    /// Rebuilds from a fresh source snapshot; needed after the source
    /// fires `Reset`, since that event carries no payload to re-derive
    /// from (§4.6: `Reset` is the one action tag that does not describe
    /// its own effect).
    pub fn resync<S>(&self, source_snapshot: &[S], selector: impl Fn(&S) -> T) {
        self.list.reset(source_snapshot.iter().map(selector));
    }
}

/// `combine(a, b)` (§4.9): `a` followed by `b`, with a maintained boundary
/// index.
pub struct CombineView<T> {
    list: Rc<ObservableList<T>>,
    boundary: RefCell<usize>,
}

impl<T: Clone + PartialEq + 'static> CombineView<T> {
    pub fn new(a: &Rc<ObservableList<T>>, b: &Rc<ObservableList<T>>) -> Rc<Self> {
        let mut initial = a.snapshot();
        let boundary = initial.len();
        initial.extend(b.snapshot());
        let list = Rc::new(ObservableList::new());
        list.reset(initial);
        let view = Rc::new(Self { list, boundary: RefCell::new(boundary) });

        let weak = Rc::downgrade(&view);
        let weak_list_a = weak.clone();
        a.on_collection_changed(move |change| {
            let Some(view) = weak_list_a.upgrade() else { return };
            view.apply_left(change);
        });
        let weak_list_b = weak;
        b.on_collection_changed(move |change| {
            let Some(view) = weak_list_b.upgrade() else { return };
            view.apply_right(change);
        });
        view
    }

    pub fn list(&self) -> &Rc<ObservableList<T>> {
        &self.list
    }

    fn apply_left(&self, change: &CollectionChange<T>) {
        match change {
            CollectionChange::Add { index, item } => {
                let _ = self.list.insert(*index, item.clone());
                *self.boundary.borrow_mut() += 1;
            }
            CollectionChange::Remove { index, .. } => {
                let _ = self.list.remove_at(*index);
                *self.boundary.borrow_mut() -= 1;
            }
            CollectionChange::Replace { index, new, .. } => {
                let _ = self.list.remove_at(*index);
                let _ = self.list.insert(*index, new.clone());
            }
            CollectionChange::Move { old_index, new_index, .. } => {
                let _ = self.list.move_item(*old_index, *new_index);
            }
            CollectionChange::Reset => {
                tracing::warn!("combine view: left side reset has no payload to re-derive from; clearing");
                self.list.clear();
                *self.boundary.borrow_mut() = 0;
            }
        }
    }

    fn apply_right(&self, change: &CollectionChange<T>) {
        let boundary = *self.boundary.borrow();
        match change {
            CollectionChange::Add { index, item } => {
                let _ = self.list.insert(boundary + index, item.clone());
            }
            CollectionChange::Remove { index, .. } => {
                let _ = self.list.remove_at(boundary + index);
            }
            CollectionChange::Replace { index, new, .. } => {
                let _ = self.list.remove_at(boundary + index);
                let _ = self.list.insert(boundary + index, new.clone());
            }
            CollectionChange::Move { old_index, new_index, .. } => {
                let _ = self.list.move_item(boundary + old_index, boundary + new_index);
            }
            CollectionChange::Reset => {
                tracing::warn!("combine view: right side reset has no payload to re-derive from; clearing");
                let boundary = *self.boundary.borrow();
                let left: Vec<T> = self.list.snapshot().into_iter().take(boundary).collect();
                self.list.reset(left);
            }
        }
    }
}

/// `NewItemsView<T>` (§4.9): the subset of items newly present on each
/// add/replace/reset, tracked by a snapshot set across changes.
pub struct NewItemsView<T> {
    list: Rc<ObservableList<T>>,
    seen: RefCell<Vec<T>>,
    is_initializing: RefCell<bool>,
}

impl<T: Clone + PartialEq + 'static> NewItemsView<T> {
    pub fn new(source: &Rc<ObservableList<T>>) -> Rc<Self> {
        let view = Rc::new(Self {
            list: Rc::new(ObservableList::new()),
            seen: RefCell::new(source.snapshot()),
            is_initializing: RefCell::new(true),
        });
        let weak = Rc::downgrade(&view);
        source.on_collection_changed(move |change| {
            if let Some(view) = weak.upgrade() {
                view.on_source_changed(change);
            }
        });
        view
    }

    pub fn list(&self) -> &Rc<ObservableList<T>> {
        &self.list
    }

    pub fn is_initializing(&self) -> bool {
        *self.is_initializing.borrow()
    }

    /// A caller driving a trackable source sets this around its
    /// `begin_init`/`end_init` bracket so `Reset` deliveries during
    /// initialization are distinguishable (§4.9).
    pub fn set_initializing(&self, value: bool) {
        *self.is_initializing.borrow_mut() = value;
    }

    fn on_source_changed(&self, change: &CollectionChange<T>) {
        match change {
            CollectionChange::Add { item, .. } => {
                if !self.seen.borrow().contains(item) {
                    self.list.add(item.clone());
                }
                self.seen.borrow_mut().push(item.clone());
            }
            CollectionChange::Replace { new, .. } => {
                if !self.seen.borrow().contains(new) {
                    self.list.add(new.clone());
                }
                self.seen.borrow_mut().push(new.clone());
            }
            CollectionChange::Reset => {
                self.list.clear();
                self.seen.borrow_mut().clear();
            }
            CollectionChange::Remove { .. } | CollectionChange::Move { .. } => {}
        }
    }
}

/// `list.aggregate(seed, f)` as a lazily-recomputed, observable scalar
/// (§4.9). `relevant_properties`, if supplied, is the cheap per-item
/// change filter: a property-changed name not in that set is ignored.
pub struct AggregateView<T, A> {
    notifier: Rc<Notifier>,
    value: RefCell<A>,
    stream: RefCell<Option<Subject<A>>>,
    seed: A,
    fold: Box<dyn Fn(A, &T) -> A>,
    relevant_properties: Option<Vec<&'static str>>,
}

impl<T, A> AggregateView<T, A>
where
    T: Clone + 'static,
    A: Clone + PartialEq + 'static,
{
    pub fn new(
        source: &Rc<ObservableList<T>>,
        seed: A,
        fold: impl Fn(A, &T) -> A + 'static,
        relevant_properties: Option<Vec<&'static str>>,
    ) -> Rc<Self>
    where
        T: PartialEq,
    {
        let initial = source.snapshot().iter().fold(seed.clone(), |acc, item| fold(acc, item));
        let view = Rc::new(Self {
            notifier: Rc::new(Notifier::new()),
            value: RefCell::new(initial),
            stream: RefCell::new(None),
            seed,
            fold: Box::new(fold),
            relevant_properties,
        });
        let weak = Rc::downgrade(&view);
        let weak_source = Rc::downgrade(source);
        source.on_collection_changed(move |_| {
            if let (Some(view), Some(src)) = (weak.upgrade(), weak_source.upgrade()) {
                view.recompute(&src.snapshot());
            }
        });
        view
    }

    pub fn value(&self) -> A {
        self.value.borrow().clone()
    }

    pub fn values(&self) -> Subject<A> {
        self.stream.borrow_mut().get_or_insert_with(Subject::new).clone()
    }

    /// Recomputes from `items`, raising `property_changed("Value")`
    /// unconditionally (any incoming notification *might* change the
    /// result) and pushing to the stream only if the value actually
    /// differs.
    pub fn recompute(&self, items: &[T])
    where
        T: PartialEq,
    {
        let new_value = items.iter().fold(self.seed.clone(), |acc, item| (self.fold)(acc, item));
        self.notifier.raise("Value");
        let mut current = self.value.borrow_mut();
        if *current != new_value {
            *current = new_value.clone();
            drop(current);
            if let Some(stream) = self.stream.borrow().as_ref() {
                stream.on_next(new_value);
            }
        }
    }

    /// Per-item notification filter (§4.9): when an expression-text
    /// allowlist is configured, a property name outside it is ignored.
    pub fn is_relevant(&self, property_name: &str) -> bool {
        match &self.relevant_properties {
            Some(names) => names.contains(&property_name),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_view_mirrors_add_and_remove() {
        let source: Rc<ObservableList<i32>> = Rc::new(ObservableList::new());
        source.add(1);
        source.add(2);
        let view = MapView::new(&source, |n: &i32| n * 10);
        assert_eq!(view.list().snapshot(), vec![10, 20]);
        source.add(3);
        assert_eq!(view.list().snapshot(), vec![10, 20, 30]);
        source.remove(&2);
        assert_eq!(view.list().snapshot(), vec![10, 30]);
    }

    #[test]
    fn combine_view_presents_a_then_b_and_tracks_boundary() {
        let a: Rc<ObservableList<i32>> = Rc::new(ObservableList::new());
        let b: Rc<ObservableList<i32>> = Rc::new(ObservableList::new());
        a.add(1);
        b.add(2);
        let combined = CombineView::new(&a, &b);
        assert_eq!(combined.list().snapshot(), vec![1, 2]);
        a.add(10);
        assert_eq!(combined.list().snapshot(), vec![1, 10, 2]);
        b.add(20);
        assert_eq!(combined.list().snapshot(), vec![1, 10, 2, 20]);
    }

    #[test]
    fn new_items_view_yields_only_unseen_items() {
        let source: Rc<ObservableList<i32>> = Rc::new(ObservableList::new());
        let view = NewItemsView::new(&source);
        source.add(1);
        source.add(1);
        source.add(2);
        assert_eq!(view.list().snapshot(), vec![1, 2]);
    }
}
