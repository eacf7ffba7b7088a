//! §4.2: weak subscriptions that do not root their targets, and the list
//! that holds them and sweeps dead entries during iteration.
//!
//! The source's primitive here is a dependent-handle (a GC-aware weak event
//! handler); the portable substitute the DESIGN NOTES call for is "an
//! intrusive weak list where each node holds a weak reference to both the
//! handler's target and the handler", matching `leptos_reactive`'s own use
//! of `Weak`-backed callbacks for unobtrusive fan-in
//! (`callback.rs::StoredCallback` models a similar non-owning indirection,
//! and `frankentui`'s `Observable<T>` — `reactive/observable.rs` — prunes
//! dead `Weak<dyn Fn>` subscriber entries lazily on `notify`, which is the
//! sweep strategy adopted here).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A subscription that holds its target only weakly. Liveness is checked on
/// every delivery; once the target is gone the entry self-removes the next
/// time the owning [`WeakSubscriptionList`] notifies or sweeps.
struct Entry<T> {
    target: Weak<dyn Fn(&T)>,
}

/// An intrusive list of weak subscribers. Typical use: a long-lived source
/// (a collection, a derived view) holds a `WeakSubscriptionList<Args>` and
/// calls [`WeakSubscriptionList::notify`] whenever it changes; short-lived
/// observers subscribe without extending the source's ability to outlive
/// them, and vice versa.
pub struct WeakSubscriptionList<T> {
    entries: RefCell<Vec<Entry<T>>>,
}

impl<T> Default for WeakSubscriptionList<T> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<T> WeakSubscriptionList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler`, keeping only a weak reference to it. The caller
    /// must keep the returned `Rc` alive for as long as it wants to keep
    /// receiving notifications; dropping it lets the entry self-dispose.
    pub fn subscribe(&self, handler: Rc<dyn Fn(&T)>) -> Rc<dyn Fn(&T)> {
        self.entries.borrow_mut().push(Entry {
            target: Rc::downgrade(&handler),
        });
        handler
    }

    /// Delivers `args` to every still-live subscriber, in subscription
    /// order, then compacts away any that were reclaimed.
    pub fn notify(&self, args: &T) {
        let live: Vec<Rc<dyn Fn(&T)>> = {
            let entries = self.entries.borrow();
            entries.iter().filter_map(|e| e.target.upgrade()).collect()
        };
        for handler in &live {
            handler(args);
        }
        self.sweep();
    }

    /// Drops entries whose target has been reclaimed. Called automatically
    /// after every `notify`, but exposed so a caller can sweep eagerly
    /// (e.g. before reporting a subscriber count).
    pub fn sweep(&self) {
        self.entries.borrow_mut().retain(|e| e.target.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
