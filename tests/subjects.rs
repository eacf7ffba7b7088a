use std::sync::{Arc, Mutex};

use observant::streams::{combine_latest, distinct_until_changed, select, skip, take, where_};
use observant::{BehaviorSubject, Subject};

#[test]
fn late_subscribers_only_see_values_published_after_they_join() {
    let subject: Subject<i32> = Subject::new();
    subject.on_next(1);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    let _sub = subject.subscribe(move |v| seen2.lock().unwrap().push(*v));

    subject.on_next(2);
    subject.on_next(3);
    assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
}

#[test]
fn behavior_subject_hands_new_subscribers_the_current_value_first() {
    let subject = BehaviorSubject::new("idle".to_string());
    subject.on_next("running".to_string());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    let _sub = subject.subscribe(move |v| seen2.lock().unwrap().push(v.clone()));

    subject.on_next("done".to_string());
    assert_eq!(*seen.lock().unwrap(), vec!["running".to_string(), "done".to_string()]);
}

#[test]
fn dispose_completes_the_subject_and_silences_further_values() {
    let subject: Subject<i32> = Subject::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    let _sub = subject.subscribe(move |v| seen2.lock().unwrap().push(*v));

    subject.dispose();
    assert!(subject.is_terminated());
    subject.on_next(1);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn select_and_where_and_take_compose_over_a_shared_source() {
    let source: Subject<i32> = Subject::new();
    let doubled = select(&source, |v| v * 2);
    let evens = where_(&doubled, |v| v % 4 == 0);
    let first_two = take(&evens, 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    let _sub = first_two.subscribe(move |v| seen2.lock().unwrap().push(*v));

    for v in 1..=6 {
        source.on_next(v);
    }

    assert_eq!(*seen.lock().unwrap(), vec![4, 8]);
    assert!(first_two.is_terminated());
}

#[test]
fn skip_drops_a_fixed_prefix() {
    let source: Subject<i32> = Subject::new();
    let rest = skip(&source, 2);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    let _sub = rest.subscribe(move |v| seen2.lock().unwrap().push(*v));

    for v in [1, 2, 3, 4] {
        source.on_next(v);
    }
    assert_eq!(*seen.lock().unwrap(), vec![3, 4]);
}

// A combined numeric sum tracks two independently updated sources,
// recomputing on every change to either one.
#[test]
fn combine_latest_tracks_two_independently_updated_sources() {
    let a = BehaviorSubject::new(1);
    let b = BehaviorSubject::new(10);
    let sum = combine_latest(&a, &b, |x, y| x + y);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    let _sub = sum.subscribe(move |v| seen2.lock().unwrap().push(*v));

    assert_eq!(sum.value(), 11);
    a.on_next(2);
    b.on_next(20);
    assert_eq!(*seen.lock().unwrap(), vec![12, 22]);
}

#[test]
fn distinct_until_changed_forwards_only_real_transitions() {
    let source: Subject<&'static str> = Subject::new();
    let transitions = distinct_until_changed(&source);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    let _sub = transitions.subscribe(move |v| seen2.lock().unwrap().push(*v));

    for v in ["idle", "idle", "running", "running", "done"] {
        source.on_next(v);
    }
    assert_eq!(*seen.lock().unwrap(), vec!["idle", "running", "done"]);
}
