//! §4.3: hot multicast `Subject` and `BehaviorSubject`, the two subject
//! kinds every other stream in the crate (`property_changes`,
//! `collection_changes`, derived views) is built from.
//!
//! Grounded on `leptos_reactive::signal_wrappers_write`/`watch.rs` for the
//! "subscribe, deliver, late subscribers miss history" shape, and on
//! `medea_reactive`'s `mpsc::UnboundedSender` subscriber-vec pattern
//! (`collections/hash_map.rs`, other_examples) for the concrete
//! lock-around-subscriber-list, deliver-outside-the-lock structure used
//! here.

use std::fmt;
use std::sync::{Arc, Mutex};

/// One subscriber's callback, identified by a stable id so it can be
/// removed later.
type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type TerminalCallback = Arc<dyn Fn(&Terminal) + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Terminal {
    None,
    Completed,
    Error(String),
}

struct Inner<T> {
    subscribers: Mutex<Vec<(u64, Callback<T>)>>,
    terminal_subscribers: Mutex<Vec<(u64, TerminalCallback)>>,
    next_id: Mutex<u64>,
    terminal: Mutex<Terminal>,
}

/// A hot, multicast stream with no replay: subscribers only receive values
/// produced after they subscribe.
///
/// `on_error`/`on_completed` are terminal — once either fires, later
/// `on_next` calls are silently ignored (§4.3) and the terminal state is
/// replayed to any subscriber that joins afterward, since by definition a
/// terminal signal is the end of the stream for everyone.
pub struct Subject<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("subscriber_count", &self.inner.subscribers.lock().unwrap().len())
            .finish()
    }
}

/// Token returned from `subscribe`; dropping it does not unsubscribe
/// (matching the source's explicit-dispose subscription model) — call
/// [`Subject::unsubscribe`] with the id it carries, or keep the handle
/// around for `dispose()`.
pub struct Subscription<T> {
    id: u64,
    subject: Subject<T>,
}

impl<T: 'static> Subscription<T> {
    pub fn unsubscribe(self) {
        self.subject.unsubscribe(self.id);
    }
}

impl<T: 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(Vec::new()),
                terminal_subscribers: Mutex::new(Vec::new()),
                next_id: Mutex::new(0),
                terminal: Mutex::new(Terminal::None),
            }),
        }
    }

    /// Subscribes `f`. Late subscribers receive only subsequent `on_next`
    /// values — once the stream has terminated, `on_next` is a no-op, so a
    /// subscriber joining afterward never sees one. A caller that needs to
    /// observe completion itself (rather than just stop seeing values)
    /// should use `subscribe_terminal`.
    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription<T> {
        let mut next_id = self.inner.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        drop(next_id);
        self.inner.subscribers.lock().unwrap().push((id, Arc::new(f)));
        Subscription {
            id,
            subject: self.clone(),
        }
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner.subscribers.lock().unwrap().retain(|(sid, _)| *sid != id);
    }

    /// Registers a handler fired exactly once, when the subject completes
    /// or errors — immediately, if it already has. This is the terminal
    /// counterpart to `subscribe`'s `on_next`-only callback, used by
    /// `to_async_sequence`/`first_async` to close their channel on
    /// completion instead of holding it open forever.
    pub(crate) fn subscribe_terminal(&self, f: impl Fn(&Terminal) + Send + Sync + 'static) {
        let terminal = self.inner.terminal.lock().unwrap();
        if !matches!(*terminal, Terminal::None) {
            f(&terminal);
            return;
        }
        drop(terminal);
        let mut next_id = self.inner.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        drop(next_id);
        self.inner.terminal_subscribers.lock().unwrap().push((id, Arc::new(f)));
    }

    fn notify_terminal_subscribers(&self) {
        let terminal = self.inner.terminal.lock().unwrap().clone();
        let snapshot: Vec<TerminalCallback> = {
            let subs = self.inner.terminal_subscribers.lock().unwrap();
            subs.iter().map(|(_, f)| Arc::clone(f)).collect()
        };
        for f in snapshot {
            f(&terminal);
        }
    }

    /// Publishes a value to every subscriber that was registered before
    /// this call began. Subscribers are snapshotted under the lock;
    /// delivery happens outside it, so a subscriber callback that itself
    /// subscribes or unsubscribes does not deadlock and is not re-entered
    /// for this in-progress delivery (§5 ordering guarantee).
    pub fn on_next(&self, value: T) {
        if !matches!(*self.inner.terminal.lock().unwrap(), Terminal::None) {
            return;
        }
        let snapshot: Vec<Callback<T>> = {
            let subs = self.inner.subscribers.lock().unwrap();
            subs.iter().map(|(_, f)| Arc::clone(f)).collect()
        };
        for f in snapshot {
            f(&value);
        }
    }

    pub fn on_completed(&self) {
        let mut terminal = self.inner.terminal.lock().unwrap();
        if matches!(*terminal, Terminal::None) {
            *terminal = Terminal::Completed;
            drop(terminal);
            self.notify_terminal_subscribers();
        }
    }

    pub fn on_error(&self, message: impl Into<String>) {
        let mut terminal = self.inner.terminal.lock().unwrap();
        if matches!(*terminal, Terminal::None) {
            *terminal = Terminal::Error(message.into());
            drop(terminal);
            self.notify_terminal_subscribers();
        }
    }

    pub fn is_terminated(&self) -> bool {
        !matches!(*self.inner.terminal.lock().unwrap(), Terminal::None)
    }

    /// Disposing a subject completes all current subscribers, matching
    /// §4.3's disposal contract.
    pub fn dispose(&self) {
        self.on_completed();
        self.inner.subscribers.lock().unwrap().clear();
        self.inner.terminal_subscribers.lock().unwrap().clear();
    }
}

/// A hot multicast stream that also memoizes its most recent value: every
/// new subscriber immediately receives the current value, then subsequent
/// ones, and the terminal state (if any) is delivered to late subscribers
/// too.
pub struct BehaviorSubject<T> {
    subject: Subject<T>,
    current: Arc<Mutex<T>>,
}

impl<T: Clone> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            current: Arc::clone(&self.current),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> BehaviorSubject<T> {
    pub fn new(initial: T) -> Self {
        Self {
            subject: Subject::new(),
            current: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn value(&self) -> T {
        self.current.lock().unwrap().clone()
    }

    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription<T> {
        f(&self.value());
        self.subject.subscribe(f)
    }

    pub(crate) fn subscribe_terminal(&self, f: impl Fn(&Terminal) + Send + Sync + 'static) {
        self.subject.subscribe_terminal(f);
    }

    pub fn on_next(&self, value: T) {
        *self.current.lock().unwrap() = value.clone();
        self.subject.on_next(value);
    }

    pub fn on_completed(&self) {
        self.subject.on_completed();
    }

    pub fn on_error(&self, message: impl Into<String>) {
        self.subject.on_error(message);
    }

    pub fn dispose(&self) {
        self.subject.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn late_subscriber_misses_earlier_values() {
        let subject: Subject<i32> = Subject::new();
        subject.on_next(1);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _sub = subject.subscribe(move |v| seen2.lock().unwrap().push(*v));
        subject.on_next(2);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn on_next_after_terminal_is_ignored() {
        let subject: Subject<i32> = Subject::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _sub = subject.subscribe(move |v| seen2.lock().unwrap().push(*v));
        subject.on_completed();
        subject.on_next(1);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn behavior_subject_replays_current_value_to_new_subscribers() {
        let subject = BehaviorSubject::new(1);
        subject.on_next(2);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _sub = subject.subscribe(move |v| seen2.lock().unwrap().push(*v));
        assert_eq!(*seen.lock().unwrap(), vec![2]);
        subject.on_next(3);
        assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
    }

}
