//! §4.1: the observable object contract and the synthesized-setter helper
//! that every plain (non-trackable) observable property is built from.
//!
//! The source relies on runtime code generation (a concrete override class
//! per declared type); per the DESIGN NOTES redesign entry we take
//! alternative (c), "explicit builder APIs on the base that accept `(name,
//! getter, setter)` triples" — concretely, a small free function plus a
//! declarative macro sugar layer, grounded on `leptos_reactive`'s own use of
//! ergonomic `macro_rules!` wrappers (`macros.rs`) over an explicit,
//! hand-written core (`WriteSignal::set` in `signal.rs`).

use std::rc::Rc;

use crate::error::Result;
use crate::notifier::{DeferGuard, Notifier, PropertyChangedArgs};
use crate::subject::Subject;

/// Implemented by every type produced through [`crate::factory::create_observable`]
/// (or hand-assembled the same way). Provides the public notification
/// surface described in §4.1: the event, the hot stream, deferral, and a
/// manual raise.
pub trait ObservableObject {
    /// The notifier backing this instance. Domain types store one
    /// `Rc<Notifier>` field and return a reference to it here; everything
    /// else is a default method built on top.
    fn notifier(&self) -> &Rc<Notifier>;

    /// Subscribes a plain closure to `property_changed`.
    fn on_property_changed(&self, handler: impl Fn(&PropertyChangedArgs) + 'static) -> usize {
        self.notifier().subscribe(handler)
    }

    /// The lazily-allocated hot stream of `(sender-implicit, property name)`
    /// changes.
    fn property_changes(&self) -> Subject<PropertyChangedArgs> {
        self.notifier().property_changes()
    }

    /// Enters a deferred-notification scope (§4.1). Fails with
    /// `InvalidOperation` if a scope is already active.
    fn defer_property_changes(&self) -> Result<DeferGuard> {
        self.notifier().defer()
    }

    /// Manually raises `property_changed` for `name`, cascading to
    /// dependents.
    fn raise_property_changed(&self, name: &'static str) {
        self.notifier().raise(name)
    }
}

/// The synthesized plain-observable setter contract (§4.1): compare
/// `*slot` against `incoming` by structural equality; if different, store
/// and raise. Returns whether a change occurred, since some callers (the
/// `observable_field!` macro) want to skip the raise on the caller's
/// behalf when they need to batch multiple fields under one `defer` scope.
pub fn set_observable<T: PartialEq>(notifier: &Notifier, slot: &mut T, incoming: T, name: &'static str) -> bool {
    if *slot == incoming {
        return false;
    }
    *slot = incoming;
    notifier.raise(name);
    true
}

/// Generates a getter and setter pair for an observable `RefCell<T>` field,
/// implementing the synthesized setter contract of §4.1. Expects the
/// surrounding type to have a `notifier: Rc<Notifier>` field (any
/// `ObservableObject` impl built this way satisfies that by construction).
///
/// ```ignore
/// struct Person {
///     notifier: Rc<Notifier>,
///     name: RefCell<String>,
/// }
/// impl Person {
///     observable_field!(pub name / set_name : name : String = "Name");
/// }
/// ```
#[macro_export]
macro_rules! observable_field {
    ($vis:vis $getter:ident / $setter:ident : $field:ident : $ty:ty = $name:literal) => {
        $vis fn $getter(&self) -> $ty {
            self.$field.borrow().clone()
        }

        $vis fn $setter(&self, value: $ty) {
            let mut slot = self.$field.borrow_mut();
            let changed = *slot != value;
            if changed {
                *slot = value;
            }
            drop(slot);
            if changed {
                self.notifier.raise($name);
            }
        }
    };
}
