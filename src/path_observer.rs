//! §4.4: the property-path observer.
//!
//! The source resolves a dotted property-access chain through its
//! language's runtime reflection (an expression tree walked at the
//! property-descriptor level); Rust has no such facility, so per the
//! DESIGN NOTES redesign entry this takes the explicit-builder route:
//! the caller supplies, per path segment, a small closure that re-derives
//! "the notifier to watch at this level" directly from the (fixed) root,
//! plus one closure that evaluates the whole expression. Grounded on
//! `leptos_reactive::memo`'s "recompute on any upstream signal, emit only
//! if the result changed" shape.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{ObservableError, Result};
use crate::notifier::{Notifier, PropertyChangedArgs, SubscriptionId};

/// One segment of the watched path: `name` is the property this segment
/// represents (for diagnostics and for matching which `property_changed`
/// deliveries should trigger a re-subscribe), and `notifier_of` re-derives
/// the `Notifier` to subscribe to at this level, starting over from the
/// root every time (so it always reflects the current intermediate
/// value, however it got there).
pub struct PathStep<Root> {
    pub name: &'static str,
    pub notifier_of: Box<dyn Fn(&Root) -> Option<Rc<Notifier>>>,
}

impl<Root> PathStep<Root> {
    pub fn new(name: &'static str, notifier_of: impl Fn(&Root) -> Option<Rc<Notifier>> + 'static) -> Self {
        Self { name, notifier_of: Box::new(notifier_of) }
    }
}

/// Builds a [`PropertyPathObserver`] over a two- or three-segment dotted
/// accessor chain (`observe_path!(root, address.city)`,
/// `observe_path!(root, department.manager.name)`) instead of hand-writing
/// each [`PathStep`]. Every named segment must be a `fn(&Self) -> Option<Rc<_>>`
/// accessor on the previous node, and every node but the leaf value must
/// implement [`crate::observable_object::ObservableObject`]. Longer chains
/// still need the explicit `PathStep::new` form this expands to.
#[macro_export]
macro_rules! observe_path {
    ($root:expr, $a:ident . $b:ident) => {{
        let __root = ::std::rc::Rc::clone(&$root);
        let __root_a = ::std::rc::Rc::clone(&$root);
        let __root_b = ::std::rc::Rc::clone(&$root);
        $crate::PropertyPathObserver::new(
            ::std::rc::Rc::clone(&$root),
            vec![
                $crate::PathStep::new(stringify!($a), move |_root: &_| {
                    Some(::std::rc::Rc::clone($crate::observable_object::ObservableObject::notifier(&*__root_a)))
                }),
                $crate::PathStep::new(stringify!($b), move |_root: &_| {
                    __root_b.$a().map(|node| ::std::rc::Rc::clone($crate::observable_object::ObservableObject::notifier(&*node)))
                }),
            ],
            move |_root: &_| __root.$a().map(|node| node.$b()),
        )
    }};
    ($root:expr, $a:ident . $b:ident . $c:ident) => {{
        let __root = ::std::rc::Rc::clone(&$root);
        let __root_a = ::std::rc::Rc::clone(&$root);
        let __root_b = ::std::rc::Rc::clone(&$root);
        let __root_c = ::std::rc::Rc::clone(&$root);
        $crate::PropertyPathObserver::new(
            ::std::rc::Rc::clone(&$root),
            vec![
                $crate::PathStep::new(stringify!($a), move |_root: &_| {
                    Some(::std::rc::Rc::clone($crate::observable_object::ObservableObject::notifier(&*__root_a)))
                }),
                $crate::PathStep::new(stringify!($b), move |_root: &_| {
                    __root_b.$a().map(|node| ::std::rc::Rc::clone($crate::observable_object::ObservableObject::notifier(&*node)))
                }),
                $crate::PathStep::new(stringify!($c), move |_root: &_| {
                    __root_c.$a().and_then(|node| node.$b()).map(|node| ::std::rc::Rc::clone($crate::observable_object::ObservableObject::notifier(&*node)))
                }),
            ],
            move |_root: &_| __root.$a().and_then(|node| node.$b()).map(|node| node.$c()),
        )
    }};
}

/// `PropertyPathObserver<Root, V>` (§4.4): watches every segment along
/// `S.a.b.c`, recomputing and re-subscribing whenever an intermediate
/// value changes, and emitting the final value only when it differs from
/// the last one emitted.
pub struct PropertyPathObserver<Root, V> {
    root: Rc<Root>,
    steps: Vec<PathStep<Root>>,
    compute: Box<dyn Fn(&Root) -> Option<V>>,
    notifier: Rc<Notifier>,
    bindings: RefCell<Vec<(Rc<Notifier>, SubscriptionId)>>,
    last_emitted: RefCell<Option<V>>,
    active: Cell<bool>,
}

impl<Root: 'static, V: Clone + PartialEq + 'static> PropertyPathObserver<Root, V> {
    pub fn new(
        root: Rc<Root>,
        steps: Vec<PathStep<Root>>,
        compute: impl Fn(&Root) -> Option<V> + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            root,
            steps,
            compute: Box::new(compute),
            notifier: Rc::new(Notifier::new()),
            bindings: RefCell::new(Vec::new()),
            last_emitted: RefCell::new(None),
            active: Cell::new(false),
        })
    }

    /// Evaluates the path against the current tree, failing with
    /// `MissingProperty` if any segment is not currently resolvable.
    pub fn get(&self) -> Result<V> {
        (self.compute)(&self.root).ok_or_else(|| {
            let path = self.steps.iter().map(|s| s.name).collect::<Vec<_>>().join(".");
            ObservableError::MissingProperty(path)
        })
    }

    /// Subscribes a handler to re-evaluations of the path. Activates the
    /// root binding on the first subscriber (§4.4 point 5).
    pub fn subscribe(self: &Rc<Self>, handler: impl Fn(&V) + 'static) -> SubscriptionId {
        if !self.active.get() {
            self.activate();
        }
        let this = Rc::clone(self);
        self.notifier.subscribe(move |_args: &PropertyChangedArgs| {
            if let Ok(value) = this.get() {
                handler(&value);
            }
        })
    }

    /// Unsubscribes; deactivates (tearing down intermediate subscriptions)
    /// once the last subscriber leaves.
    pub fn unsubscribe(self: &Rc<Self>, id: SubscriptionId) {
        self.notifier.unsubscribe(id);
        if self.notifier.subscriber_count() == 0 {
            self.deactivate();
        }
    }

    fn activate(self: &Rc<Self>) {
        self.active.set(true);
        *self.last_emitted.borrow_mut() = self.get().ok();
        self.resubscribe_all();
    }

    fn deactivate(&self) {
        self.active.set(false);
        for (notifier, id) in self.bindings.borrow_mut().drain(..) {
            notifier.unsubscribe(id);
        }
    }

    /// Re-derives every segment's notifier from the root and subscribes
    /// fresh, dropping whatever was subscribed before. Re-entrant: if a
    /// handler triggers this while already inside it (a node re-assigning
    /// itself to itself), the `name`-matched re-subscribe below only acts
    /// on an actual emitted difference, so a self-referential write does
    /// not loop (§4.4, "must not loop if a handler re-assigns an
    /// intermediate node to itself").
    fn resubscribe_all(self: &Rc<Self>) {
        for (notifier, id) in self.bindings.borrow_mut().drain(..) {
            notifier.unsubscribe(id);
        }
        if !self.active.get() {
            return;
        }
        for step in &self.steps {
            let Some(notifier) = (step.notifier_of)(&self.root) else { continue };
            let name = step.name;
            let this = Rc::clone(self);
            let id = notifier.subscribe(move |args| {
                if args.property_name == name {
                    this.on_segment_changed();
                }
            });
            self.bindings.borrow_mut().push((notifier, id));
        }
    }

    fn on_segment_changed(self: &Rc<Self>) {
        self.resubscribe_all();
        let new_value = self.get().ok();
        let changed = *self.last_emitted.borrow() != new_value;
        if changed {
            *self.last_emitted.borrow_mut() = new_value;
            if let Some(value) = self.last_emitted.borrow().clone() {
                self.notifier.raise("Value");
                let _ = value;
            }
        }
    }
}
