//! §3 "Trackable object state" and §4.5: the original-value shadow, the
//! changed-set, accept/reject semantics, `begin_init`/`end_init`, and
//! nested-child propagation.
//!
//! The source keeps one shadow field per declared trackable property,
//! generated at type-synthesis time. Since this crate takes DESIGN NOTES
//! alternative (c) (explicit builder methods, no code generation),
//! `TrackableBase` instead keeps a *generic value bag* — alternative (b) —
//! indexed by property name rather than by a generated field: two
//! `HashMap<&'static str, Box<dyn Any>>` (current, original) plus the
//! changed-set. This is the same tradeoff `leptos_reactive::stored_value`
//! makes for its `Rc<RefCell<dyn Any>>` slots, generalized to a pair of
//! maps instead of a slotmap arena since there is no need for disposal by
//! id here — a `TrackableObject` is dropped as an ordinary Rust value.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;

use crate::error::{ObservableError, Result};
use crate::notifier::{Notifier, SubscriptionId};
use crate::observable_object::ObservableObject;

/// Implemented by every trackable object: plain values (`String`, `i32`,
/// …) are not `Trackable` themselves, only the objects built from
/// [`TrackableBase`] are. A nested trackable property's value type must
/// implement this (in addition to [`ObservableObject`], since `is_changed`
/// toggles are observed through the ordinary `property_changed` channel).
pub trait Trackable {
    fn is_changed(&self) -> bool;
    fn accept_changes(&self) -> Result<()>;
    fn reject_changes(&self) -> Result<()>;
    fn begin_init(&self) -> Result<()>;
    fn end_init(&self) -> Result<()>;
}

type Bag = FxHashMap<&'static str, Box<dyn Any>>;

/// One changed-property entry as returned by [`TrackableBase::changes`]:
/// the name only — typed original/current values are fetched back out
/// through [`TrackableBase::get_original`]/[`TrackableBase::get_current`]
/// with the caller's own `T`, since the bag is type-erased.
pub type ChangedPropertyName = &'static str;

/// Shadow storage and accept/reject machinery shared by every trackable
/// object. Embed one of these (behind an `Rc` so nested-child propagation
/// closures can hold a weak back-reference) alongside a `Rc<Notifier>`.
pub struct TrackableBase {
    notifier: Rc<Notifier>,
    current: RefCell<Bag>,
    original: RefCell<Bag>,
    changed: RefCell<IndexSet<&'static str>>,
    /// For trackable-child properties: whether the *reference itself*
    /// differs from the original, independent of the child's own
    /// `is_changed` — needed to recompute the combined `different` flag
    /// when the child later toggles (§4.5 step 3's two OR'd conditions).
    ref_changed: RefCell<FxHashMap<&'static str, bool>>,
    child_subscriptions: RefCell<FxHashMap<&'static str, (Rc<Notifier>, SubscriptionId)>>,
    init_depth: Cell<u32>,
}

impl TrackableBase {
    pub fn new(notifier: Rc<Notifier>) -> Rc<Self> {
        Rc::new(Self {
            notifier,
            current: RefCell::new(FxHashMap::default()),
            original: RefCell::new(FxHashMap::default()),
            changed: RefCell::new(IndexSet::new()),
            ref_changed: RefCell::new(FxHashMap::default()),
            child_subscriptions: RefCell::new(FxHashMap::default()),
            init_depth: Cell::new(0),
        })
    }

    pub fn is_initializing(&self) -> bool {
        self.init_depth.get() > 0
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.borrow().is_empty()
    }

    pub fn changes(&self) -> Vec<ChangedPropertyName> {
        self.changed.borrow().iter().copied().collect()
    }

    fn toggle_is_changed_if_needed(&self, was_empty: bool) {
        let now_empty = self.changed.borrow().is_empty();
        if was_empty != now_empty {
            self.notifier.raise_exact("is_changed");
        }
    }

    pub fn begin_init(&self) -> Result<()> {
        if self.is_changed() {
            return Err(ObservableError::InvalidOperation("begin_init while changed"));
        }
        self.init_depth.set(self.init_depth.get() + 1);
        Ok(())
    }

    pub fn end_init(&self) -> Result<()> {
        let depth = self.init_depth.get();
        if depth == 0 {
            return Err(ObservableError::InvalidOperation("end_init without matching begin_init"));
        }
        self.init_depth.set(depth - 1);
        Ok(())
    }

    fn get<T: Clone + 'static>(bag: &RefCell<Bag>, name: &'static str) -> T {
        bag.borrow()
            .get(name)
            .and_then(|b| b.downcast_ref::<T>())
            .cloned()
            .unwrap_or_else(|| panic!("trackable property `{name}` read before being initialized"))
    }

    pub fn get_current<T: Clone + 'static>(&self, name: &'static str) -> T {
        Self::get(&self.current, name)
    }

    pub fn get_original<T: Clone + 'static>(&self, name: &'static str) -> T {
        Self::get(&self.original, name)
    }

    /// The synthesized setter for a plain (non-nested) trackable value
    /// property: §4.5 steps 2–5 (step 1 and 6, detach/attach, only apply to
    /// trackable-kinded children — see [`TrackableBase::set_child`]).
    pub fn set_value<T: Clone + PartialEq + 'static>(&self, name: &'static str, incoming: T) {
        let was_empty = self.changed.borrow().is_empty();

        if self.is_initializing() {
            self.original.borrow_mut().insert(name, Box::new(incoming.clone()));
        }

        let different = match self.original.borrow().get(name).and_then(|b| b.downcast_ref::<T>()) {
            Some(original) => original != &incoming,
            None => true,
        };

        self.current.borrow_mut().insert(name, Box::new(incoming));
        self.notifier.raise_exact(name);

        if different {
            self.changed.borrow_mut().insert(name);
        } else {
            self.changed.borrow_mut().shift_remove(name);
        }
        self.toggle_is_changed_if_needed(was_empty);
        self.notifier.cascade_dependents(name);
    }

    /// The synthesized setter for a nested trackable-object property
    /// (§4.5, all six steps). `C` must be both observable (so its
    /// `is_changed` toggles are visible as property-changed events) and
    /// `Trackable`.
    pub fn set_child<C>(self: &Rc<Self>, name: &'static str, incoming: Option<Rc<C>>)
    where
        C: ObservableObject + Trackable + PartialEq + 'static,
    {
        // Step 1: detach the previous child's nested-change listener.
        if let Some((notifier, id)) = self.child_subscriptions.borrow_mut().remove(name) {
            notifier.unsubscribe(id);
        }

        let was_empty = self.changed.borrow().is_empty();

        // Step 2: initializing writes establish the baseline too.
        if self.is_initializing() {
            self.original.borrow_mut().insert(name, Box::new(incoming.clone()));
        }

        // Step 3: structural diff of the reference, independent of the
        // child's own changed state.
        let ref_diff = match self
            .original
            .borrow()
            .get(name)
            .and_then(|b| b.downcast_ref::<Option<Rc<C>>>())
        {
            Some(original) => !options_eq(original, &incoming),
            None => true,
        };
        self.ref_changed.borrow_mut().insert(name, ref_diff);
        let child_is_changed = incoming.as_ref().is_some_and(|c| c.is_changed());
        let different = !self.is_initializing() && (ref_diff || child_is_changed);

        // Step 4: store and raise.
        self.current.borrow_mut().insert(name, Box::new(incoming.clone()));
        self.notifier.raise_exact(name);

        // Step 5: changed-set bookkeeping.
        if different {
            self.changed.borrow_mut().insert(name);
        } else {
            self.changed.borrow_mut().shift_remove(name);
        }
        self.toggle_is_changed_if_needed(was_empty);
        self.notifier.cascade_dependents(name);

        // Step 6: attach the new child's propagation handler.
        if let Some(child) = incoming {
            let weak_owner = Rc::downgrade(self);
            let child_for_closure = Rc::clone(&child);
            let child_notifier = Rc::clone(child.notifier());
            let id = child_notifier.subscribe(move |args| {
                if args.property_name == "is_changed" {
                    if let Some(owner) = weak_owner.upgrade() {
                        owner.on_child_changed(name, child_for_closure.is_changed());
                    }
                }
            });
            self.child_subscriptions.borrow_mut().insert(name, (child_notifier, id));
        }
    }

    fn on_child_changed(&self, name: &'static str, child_is_changed: bool) {
        let was_empty = self.changed.borrow().is_empty();
        let ref_diff = *self.ref_changed.borrow().get(name).unwrap_or(&false);
        let different = !self.is_initializing() && (ref_diff || child_is_changed);
        if different {
            self.changed.borrow_mut().insert(name);
        } else {
            self.changed.borrow_mut().shift_remove(name);
        }
        self.toggle_is_changed_if_needed(was_empty);
    }

    /// Accept changes for a single plain-value property (§4.5).
    pub fn accept_value<T: Clone + 'static>(&self, name: &'static str) {
        if !self.changed.borrow().contains(name) {
            return;
        }
        let current: T = self.get_current(name);
        self.original.borrow_mut().insert(name, Box::new(current));
        self.changed.borrow_mut().shift_remove(name);
    }

    /// Accept changes for a nested trackable-child property (§4.5):
    /// recursively accepts the child, then copies current→original.
    pub fn accept_child<C: Trackable + 'static>(&self, name: &'static str) -> Result<()> {
        if !self.changed.borrow().contains(name) {
            return Ok(());
        }
        let current: Option<Rc<C>> = self.get_current(name);
        if let Some(child) = &current {
            child.accept_changes()?;
        }
        self.original.borrow_mut().insert(name, Box::new(current));
        self.ref_changed.borrow_mut().insert(name, false);
        self.changed.borrow_mut().shift_remove(name);
        Ok(())
    }

    /// Reject changes for a single plain-value property (§4.5): writes
    /// original back into current.
    pub fn reject_value<T: Clone + 'static>(&self, name: &'static str) {
        if !self.changed.borrow().contains(name) {
            return;
        }
        let original: T = self.get_original(name);
        self.current.borrow_mut().insert(name, Box::new(original));
        self.changed.borrow_mut().shift_remove(name);
        self.notifier.raise_exact(name);
    }

    /// Reject changes for a nested trackable-child property: recursively
    /// rejects the original child (if one was captured), then restores it
    /// as current.
    pub fn reject_child<C: Trackable + 'static>(&self, name: &'static str) -> Result<()> {
        if !self.changed.borrow().contains(name) {
            return Ok(());
        }
        let original: Option<Rc<C>> = self.get_original(name);
        if let Some(child) = &original {
            child.reject_changes()?;
        }
        self.current.borrow_mut().insert(name, Box::new(original));
        self.ref_changed.borrow_mut().insert(name, false);
        self.changed.borrow_mut().shift_remove(name);
        self.notifier.raise_exact(name);
        Ok(())
    }

    /// Object-level accept/reject bracket: call before iterating
    /// properties, and [`TrackableBase::finish_object_mutation`] after.
    /// Fails with `InvalidOperation` while initializing.
    pub fn begin_object_mutation(&self) -> Result<bool> {
        if self.is_initializing() {
            return Err(ObservableError::InvalidOperation(
                "accept_changes/reject_changes while initializing",
            ));
        }
        Ok(self.changed.borrow().is_empty())
    }

    pub fn finish_object_mutation(&self, was_empty_before: bool) {
        self.toggle_is_changed_if_needed(was_empty_before);
    }

    /// `set_original_value` (§4.5): rewrites the original slot; if the
    /// property is not currently changed, also rewrites current; if it is
    /// currently changed, re-evaluates whether current now equals the new
    /// original.
    pub fn set_original_value<T: Clone + PartialEq + 'static>(&self, name: &'static str, value: T) {
        let was_empty = self.changed.borrow().is_empty();
        self.original.borrow_mut().insert(name, Box::new(value.clone()));
        if !self.changed.borrow().contains(name) {
            self.current.borrow_mut().insert(name, Box::new(value));
        } else {
            let current: T = self.get_current(name);
            if current == value {
                self.changed.borrow_mut().shift_remove(name);
            }
        }
        self.toggle_is_changed_if_needed(was_empty);
    }

    /// `reset_value` (§4.5): writes both slots, raises `property_changed`,
    /// and drops the property from the changed-set.
    pub fn reset_value<T: Clone + 'static>(&self, name: &'static str, value: T) {
        let was_empty = self.changed.borrow().is_empty();
        self.original.borrow_mut().insert(name, Box::new(value.clone()));
        self.current.borrow_mut().insert(name, Box::new(value));
        self.changed.borrow_mut().shift_remove(name);
        self.notifier.raise_exact(name);
        self.toggle_is_changed_if_needed(was_empty);
    }

    /// Helper for a concrete type's `original_equals`: compares the
    /// *current* values of `self` and `other` for one property by the
    /// property's own structural discipline. `other` is conventionally a
    /// captured baseline whose current slots already hold the baseline
    /// values.
    pub fn values_equal<T: PartialEq + Clone + 'static>(&self, other: &TrackableBase, name: &'static str) -> bool {
        let a: T = self.get_current(name);
        let b: T = other.get_current(name);
        a == b
    }
}

fn options_eq<C: PartialEq>(a: &Option<Rc<C>>, b: &Option<Rc<C>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b) || **a == **b,
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::Notifier;

    struct Person {
        notifier: Rc<Notifier>,
        base: Rc<TrackableBase>,
    }

    impl Person {
        fn new(name: &str, age: i32) -> Rc<Self> {
            let notifier = Rc::new(Notifier::new());
            let base = TrackableBase::new(Rc::clone(&notifier));
            let person = Rc::new(Self { notifier, base });
            person.base.begin_init().unwrap();
            person.set_name(name.to_string());
            person.set_age(age);
            person.set_mother(None);
            person.base.end_init().unwrap();
            person
        }

        fn name(&self) -> String {
            self.base.get_current("name")
        }
        fn set_name(&self, v: String) {
            self.base.set_value("name", v)
        }
        fn age(&self) -> i32 {
            self.base.get_current("age")
        }
        fn set_age(&self, v: i32) {
            self.base.set_value("age", v)
        }
        fn mother(&self) -> Option<Rc<Person>> {
            self.base.get_current("mother")
        }
        fn set_mother(&self, v: Option<Rc<Person>>) {
            self.base.set_child("mother", v)
        }
    }

    impl PartialEq for Person {
        fn eq(&self, other: &Self) -> bool {
            self.name() == other.name() && self.age() == other.age()
        }
    }

    impl ObservableObject for Person {
        fn notifier(&self) -> &Rc<Notifier> {
            &self.notifier
        }
    }

    impl Trackable for Person {
        fn is_changed(&self) -> bool {
            self.base.is_changed()
        }
        fn accept_changes(&self) -> Result<()> {
            let was_empty = self.base.begin_object_mutation()?;
            self.base.accept_value::<String>("name");
            self.base.accept_value::<i32>("age");
            self.base.accept_child::<Person>("mother")?;
            self.base.finish_object_mutation(was_empty);
            Ok(())
        }
        fn reject_changes(&self) -> Result<()> {
            let was_empty = self.base.begin_object_mutation()?;
            self.base.reject_value::<String>("name");
            self.base.reject_value::<i32>("age");
            self.base.reject_child::<Person>("mother")?;
            self.base.finish_object_mutation(was_empty);
            Ok(())
        }
        fn begin_init(&self) -> Result<()> {
            self.base.begin_init()
        }
        fn end_init(&self) -> Result<()> {
            self.base.end_init()
        }
    }

    #[test]
    fn s3_trackable_nested_accept_and_reject() {
        let p = Person::new("M", 36);
        p.set_age(37);
        assert!(p.is_changed());
        assert_eq!(p.base.get_original::<i32>("age"), 36);

        p.reject_changes().unwrap();
        assert!(!p.is_changed());
        assert_eq!(p.age(), 36);

        let mother = Person::new("N", 60);
        p.set_mother(Some(Rc::clone(&mother)));
        p.accept_changes().unwrap();
        assert!(!p.is_changed());
        assert!(!p.mother().unwrap().is_changed());

        mother.set_age(61);
        assert!(mother.is_changed());
        assert!(p.is_changed());

        mother.base.set_original_value("age", 61);
        assert!(!mother.is_changed());
        assert!(!p.is_changed());
    }

    #[test]
    fn accept_then_reject_is_a_no_op() {
        let p = Person::new("A", 1);
        p.set_age(2);
        p.accept_changes().unwrap();
        p.reject_changes().unwrap();
        assert!(!p.is_changed());
        assert!(p.base.changes().is_empty());
        assert_eq!(p.age(), 2);
    }

    #[test]
    fn begin_init_refuses_while_changed() {
        let p = Person::new("A", 1);
        p.set_age(2);
        assert!(p.begin_init().is_err());
    }
}
