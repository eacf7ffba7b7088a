use criterion::{criterion_group, criterion_main, Criterion};
use observant::runtime::{register_type, PropertyDescriptor};
use observant::Notifier;

struct FanOutTarget;

fn notifier_fan_out(c: &mut Criterion) {
    let names: Vec<&'static str> = (0..1000)
        .map(|i| &*Box::leak(format!("dependent_{i}").into_boxed_str()))
        .collect();
    let source: &'static [&'static str] = Box::leak(vec!["source"].into_boxed_slice());
    let dependents: Vec<(&'static str, &'static [&'static str])> =
        names.iter().map(|name| (*name, source)).collect();
    let metadata = register_type::<FanOutTarget>(
        vec![PropertyDescriptor {
            name: "source",
            is_trackable: false,
            is_reference_only: false,
            is_read_only: false,
        }],
        &dependents,
    );

    c.bench_function("notifier_raise_1000_dependents", |b| {
        b.iter(|| {
            let notifier = Notifier::new().with_type_metadata(metadata.clone());
            let total = std::cell::Cell::new(0usize);
            notifier.subscribe(move |_| total.set(total.get() + 1));
            notifier.raise("source");
        });
    });
}

fn notifier_deferred_batch(c: &mut Criterion) {
    use std::rc::Rc;

    c.bench_function("notifier_deferred_batch_of_100", |b| {
        b.iter(|| {
            let notifier = Rc::new(Notifier::new());
            notifier.subscribe(|_| {});
            let guard = notifier.defer().unwrap();
            for _ in 0..100 {
                notifier.raise("a");
                notifier.raise("b");
            }
            drop(guard);
        });
    });
}

criterion_group!(fan_out, notifier_fan_out, notifier_deferred_batch);
criterion_main!(fan_out);
