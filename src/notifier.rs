//! The per-object property-notification graph: §4.1's `property_changed`
//! event, the lazily-allocated `property_changes` hot stream, deferral, and
//! dependency fan-out.
//!
//! Grounded on `leptos_reactive::runtime::Runtime::update`/`mark_dirty`
//! (the dirty-marking / fan-out walk) and on
//! `leptos_reactive::signal::WriteSignal` (the "compare, store, notify"
//! setter shape) — rewritten here as an explicit handler list instead of a
//! pull-based dependency graph, since this crate's notification contract is
//! push-only (an event/stream, not fine-grained recomputation).

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{ObservableError, Result};
use crate::runtime::TypeMetadata;
use crate::subject::Subject;

/// A `(sender, property name)` pair delivered to every `property_changed`
/// handler and every `property_changes` stream subscriber.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyChangedArgs {
    pub property_name: &'static str,
}

impl PropertyChangedArgs {
    pub fn new(property_name: &'static str) -> Self {
        Self { property_name }
    }
}

type Handler = Rc<dyn Fn(&PropertyChangedArgs)>;

/// A token identifying one [`Notifier::subscribe`] registration, usable with
/// [`Notifier::unsubscribe`]. Plain `usize` indices are not reused, so a
/// stale id from a long-gone handler is simply a no-op to unsubscribe.
pub type SubscriptionId = usize;

/// Owns the notification machinery for one observable object.
///
/// Held as a field (not inherited) by observable/trackable base types,
/// matching the source's composition of a notifier-like object rather than
/// multiple inheritance — Rust has no inheritance, so composition is the
/// only option here, but it mirrors how `leptos_reactive::runtime::Runtime`
/// is a single piece of state that every signal handle indirects through.
pub struct Notifier {
    handlers: RefCell<Vec<Option<Handler>>>,
    stream: RefCell<Option<Subject<PropertyChangedArgs>>>,
    defer_depth: RefCell<u32>,
    pending: RefCell<Vec<&'static str>>,
    type_metadata: Option<Arc<TypeMetadata>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            stream: RefCell::new(None),
            defer_depth: RefCell::new(0),
            pending: RefCell::new(Vec::new()),
            type_metadata: None,
        }
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the owning type's registered dependency metadata so that
    /// `raise` can fan out to dependents.
    pub fn with_type_metadata(mut self, metadata: Arc<TypeMetadata>) -> Self {
        self.type_metadata = Some(metadata);
        self
    }

    /// Subscribes a plain closure to `property_changed`. Returns a token
    /// that can be used with [`Notifier::unsubscribe`]; subscriptions are
    /// otherwise permanent (use [`crate::weak_sub::WeakSubscriptionList`]
    /// for automatic, liveness-based removal).
    pub fn subscribe(&self, handler: impl Fn(&PropertyChangedArgs) + 'static) -> SubscriptionId {
        let mut handlers = self.handlers.borrow_mut();
        handlers.push(Some(Rc::new(handler)));
        handlers.len() - 1
    }

    /// Removes a handler registered through [`Notifier::subscribe`]. A
    /// stale or already-removed id is a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(slot) = self.handlers.borrow_mut().get_mut(id) {
            *slot = None;
        }
    }

    /// Count of currently-live handlers. Used by activation-on-first-
    /// subscriber machinery (e.g. [`crate::path_observer::PropertyPathObserver`]).
    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().iter().filter(|h| h.is_some()).count()
    }

    /// The lazily-allocated hot stream of property changes.
    pub fn property_changes(&self) -> Subject<PropertyChangedArgs> {
        let mut stream = self.stream.borrow_mut();
        stream.get_or_insert_with(Subject::new).clone()
    }

    /// Raises `property_changed` for `name`, then fans out to every
    /// transitive dependent registered for the owning type, all within the
    /// same batch (so a single deferred scope sees all of them as one
    /// coalesced flush). This is the manual-raise entry point; the plain
    /// observable setter (§4.1) calls it after a structural compare.
    ///
    /// Trackable properties need finer control over ordering (§4.5 / S1:
    /// `is_changed` must be raised between the property itself and its
    /// dependents), so [`Notifier::raise_exact`] and
    /// [`Notifier::cascade_dependents`] are exposed separately; `raise` is
    /// just `raise_exact` followed by `cascade_dependents`.
    pub fn raise(&self, name: &'static str) {
        self.raise_exact(name);
        self.cascade_dependents(name);
    }

    /// Delivers `property_changed` for exactly `name`, queuing instead if a
    /// deferred scope is active. Does not cascade to dependents.
    pub fn raise_exact(&self, name: &'static str) {
        if *self.defer_depth.borrow() > 0 {
            let mut pending = self.pending.borrow_mut();
            if !pending.contains(&name) {
                pending.push(name);
            }
            return;
        }
        self.deliver(name);
    }

    /// Delivers `property_changed` for every transitive dependent of `name`
    /// (not `name` itself), in the memoized breadth-first closure order.
    pub fn cascade_dependents(&self, name: &'static str) {
        if let Some(metadata) = &self.type_metadata {
            for dependent in metadata.dependents_of(name).iter() {
                self.raise_exact(dependent);
            }
        }
    }

    fn deliver(&self, name: &'static str) {
        let args = PropertyChangedArgs::new(name);
        // Snapshot the handler count before delivery: a handler subscribing
        // from within another handler's callback (re-entrant subscription)
        // must not be invoked for this in-progress raise, only for later
        // ones (§4.4 point 6 / §5 ordering guarantee). We index by position
        // rather than holding one long-lived borrow so that a handler is
        // free to call `subscribe` (a `borrow_mut`) during delivery.
        let snapshot_len = self.handlers.borrow().len();
        for i in 0..snapshot_len {
            // Clone the `Rc` out and drop the borrow before invoking the
            // handler, so a handler that calls `subscribe` (a `borrow_mut`)
            // during delivery does not panic on a re-entrant borrow.
            let handler = self.handlers.borrow().get(i).cloned().flatten();
            if let Some(f) = handler {
                f(&args);
            }
        }
        if let Some(stream) = self.stream.borrow().as_ref() {
            stream.on_next(args.clone());
        }
    }

    /// Manual raise, equivalent to what the synthesized setter calls.
    pub fn raise_property_changed(&self, name: &'static str) {
        self.raise(name);
    }

    /// Enters a deferred scope. While any guard returned by this method is
    /// alive, `raise` accumulates distinct property names (first-observed
    /// order) instead of delivering immediately. Dropping the last guard
    /// flushes the queue.
    pub fn defer(self: &Rc<Self>) -> Result<DeferGuard> {
        let mut depth = self.defer_depth.borrow_mut();
        if *depth > 0 {
            return Err(ObservableError::InvalidOperation("already deferred"));
        }
        *depth += 1;
        Ok(DeferGuard {
            notifier: Rc::clone(self),
        })
    }

    fn flush(&self) {
        *self.defer_depth.borrow_mut() -= 1;
        if *self.defer_depth.borrow() > 0 {
            return;
        }
        // `raise`/`cascade_dependents` already expanded dependents into
        // `pending` at queue time (deduplicated), so flushing just delivers
        // the flat queue in first-observed order — calling `raise` again
        // here would re-cascade and double-deliver dependents.
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for name in pending {
            self.deliver(name);
        }
    }
}

/// RAII handle returned by [`Notifier::defer`]. Flushes accumulated
/// notifications on drop, in first-observed order, duplicates coalesced.
pub struct DeferGuard {
    notifier: Rc<Notifier>,
}

impl Drop for DeferGuard {
    fn drop(&mut self) {
        self.notifier.flush();
    }
}
