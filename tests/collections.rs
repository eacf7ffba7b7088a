use std::rc::Rc;

use observant::{Change, CollectionChange, KeyedObservableList, ObservableList, TrackableList};

#[test]
fn observable_list_structural_operations_and_events() {
    let list: Rc<ObservableList<i32>> = Rc::new(ObservableList::new());
    let changes: std::sync::Arc<std::sync::Mutex<Vec<CollectionChange<i32>>>> =
        std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let changes2 = std::sync::Arc::clone(&changes);
    list.collection_changes().subscribe(move |c| changes2.lock().unwrap().push(c.clone()));

    list.add_range([1, 2, 3]);
    assert_eq!(list.count(), 3);
    list.insert(1, 99).unwrap();
    assert_eq!(list.snapshot(), vec![1, 99, 2, 3]);
    list.move_item(0, 3).unwrap();
    assert_eq!(list.snapshot(), vec![99, 2, 3, 1]);
    assert!(list.remove(&99));
    assert_eq!(list.snapshot(), vec![2, 3, 1]);

    assert!(changes.lock().unwrap().iter().any(|c| matches!(c, CollectionChange::Add { .. })));
    assert!(changes.lock().unwrap().iter().any(|c| matches!(c, CollectionChange::Move { .. })));
    assert!(changes.lock().unwrap().iter().any(|c| matches!(c, CollectionChange::Remove { .. })));
}

#[test]
fn persisted_sort_keeps_items_ordered_on_every_add() {
    let list: Rc<ObservableList<i32>> = Rc::new(ObservableList::new());
    list.enable_persisted_sort(|a, b| a.cmp(b));
    for v in [5, 1, 4, 2, 3] {
        list.add(v);
    }
    assert_eq!(list.snapshot(), vec![1, 2, 3, 4, 5]);
}

#[derive(Clone, PartialEq, Debug)]
struct Row {
    id: u32,
    value: &'static str,
}

#[test]
fn keyed_list_add_or_update_and_reset_duplicate_detection() {
    let list = KeyedObservableList::new(|r: &Row| r.id);
    list.add(Row { id: 1, value: "a" }).unwrap();
    list.add_or_update(Row { id: 1, value: "b" });
    assert_eq!(list.try_get(&1), Some(Row { id: 1, value: "b" }));

    let err = list.reset([Row { id: 2, value: "x" }, Row { id: 2, value: "y" }]);
    assert!(err.is_err());
}

#[test]
fn trackable_list_get_changed_items_reports_added_and_removed_elements() {
    let t = TrackableList::<&'static str>::new();
    t.reset(["a", "b", "c"], true).unwrap();
    assert!(!t.is_changed());

    t.remove(&"b");
    t.add("d");

    assert!(t.is_changed());
    let changes = t.get_changed_items();
    assert!(changes.iter().any(|c| matches!(c, Change::Remove("b"))));
    assert!(changes.iter().any(|c| matches!(c, Change::Add("d"))));

    t.accept_changes().unwrap();
    assert!(!t.is_changed());
    assert!(t.get_changed_items().is_empty());
}
