//! A handful of standard reactive operators layered over [`Subject`] and
//! [`BehaviorSubject`]: `select`, `where_`, `distinct_until_changed`,
//! `take`, `skip`, `combine_latest`, `first`.
//!
//! These are thin, deliberately unoptimized wrappers, mirroring
//! `leptos_reactive::watch`'s "subscribe, recompute, push" shape rather
//! than building a combinator algebra from scratch.

use crate::subject::{BehaviorSubject, Subject};

/// Maps every value through `f`.
pub fn select<T, R>(source: &Subject<T>, f: impl Fn(&T) -> R + Send + Sync + 'static) -> Subject<R>
where
    T: 'static,
    R: 'static,
{
    let output = Subject::new();
    let out = output.clone();
    source.subscribe(move |v| out.on_next(f(v)));
    output
}

/// Forwards only values matching `predicate`.
pub fn where_<T>(source: &Subject<T>, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Subject<T>
where
    T: Clone + 'static,
{
    let output = Subject::new();
    let out = output.clone();
    source.subscribe(move |v| {
        if predicate(v) {
            out.on_next(v.clone());
        }
    });
    output
}

/// Forwards a value only when it differs (by `PartialEq`) from the last one
/// forwarded.
pub fn distinct_until_changed<T>(source: &Subject<T>) -> Subject<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let output = Subject::new();
    let out = output.clone();
    let last: std::sync::Mutex<Option<T>> = std::sync::Mutex::new(None);
    source.subscribe(move |v| {
        let mut last = last.lock().unwrap();
        if last.as_ref() != Some(v) {
            *last = Some(v.clone());
            out.on_next(v.clone());
        }
    });
    output
}

/// Forwards up to `count` values, then completes the output.
pub fn take<T>(source: &Subject<T>, count: usize) -> Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    let output = Subject::new();
    let out = output.clone();
    let remaining = std::sync::atomic::AtomicUsize::new(count);
    source.subscribe(move |v| {
        use std::sync::atomic::Ordering;
        if remaining.load(Ordering::SeqCst) == 0 {
            return;
        }
        out.on_next(v.clone());
        if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            out.on_completed();
        }
    });
    output
}

/// Drops the first `count` values, forwarding the rest.
pub fn skip<T>(source: &Subject<T>, count: usize) -> Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    let output = Subject::new();
    let out = output.clone();
    let seen = std::sync::atomic::AtomicUsize::new(0);
    source.subscribe(move |v| {
        use std::sync::atomic::Ordering;
        if seen.fetch_add(1, Ordering::SeqCst) >= count {
            out.on_next(v.clone());
        }
    });
    output
}

/// Combines the latest values of two behavior subjects through `f`,
/// delivering a new combined value immediately (S7: first delivery is
/// `f(a.value(), b.value())` at subscribe time) and on every subsequent
/// update to either source.
pub fn combine_latest<A, B, R>(
    a: &BehaviorSubject<A>,
    b: &BehaviorSubject<B>,
    f: impl Fn(&A, &B) -> R + Send + Sync + 'static,
) -> BehaviorSubject<R>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    let f = std::sync::Arc::new(f);
    let output = BehaviorSubject::new(f(&a.value(), &b.value()));

    let a2 = a.clone();
    let b2 = b.clone();
    let out = output.clone();
    let f1 = std::sync::Arc::clone(&f);
    a.subscribe(move |_| out.on_next(f1(&a2.value(), &b2.value())));

    let a3 = a.clone();
    let b3 = b.clone();
    let out2 = output.clone();
    b.subscribe(move |_| out2.on_next(f(&a3.value(), &b3.value())));

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_latest_matches_s7() {
        let s1 = BehaviorSubject::new(1);
        let s2 = BehaviorSubject::new(2);
        let sum = combine_latest(&s1, &s2, |a, b| a + b);
        assert_eq!(sum.value(), 3);
        s1.on_next(2);
        assert_eq!(sum.value(), 4);
        s2.on_next(4);
        assert_eq!(sum.value(), 6);
    }

    #[test]
    fn distinct_until_changed_drops_repeats() {
        let source: Subject<i32> = Subject::new();
        let out = distinct_until_changed(&source);
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen2 = std::sync::Arc::clone(&seen);
        out.subscribe(move |v| seen2.lock().unwrap().push(*v));
        source.on_next(1);
        source.on_next(1);
        source.on_next(2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
