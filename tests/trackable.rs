use std::rc::Rc;

use observant::{Notifier, ObservableError, ObservableObject, Result, Trackable, TrackableBase};

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

// Mirrors testable property 2: writes that round-trip back to the
// original value leave the object clean.
#[test]
fn round_trip_write_leaves_is_changed_false() {
    let p = Person::new("Ada", 30);
    p.set_age(31);
    assert!(p.is_changed());
    p.set_age(30);
    assert!(!p.is_changed());
    assert!(p.base.changes().is_empty());
}

#[test]
fn accept_changes_commits_current_as_new_baseline() {
    let p = Person::new("Ada", 30);
    p.set_age(31);
    p.accept_changes().unwrap();
    assert!(!p.is_changed());
    assert_eq!(p.base.get_original::<i32>("age"), 31);
}

#[test]
fn reject_changes_restores_original_value() {
    let p = Person::new("Ada", 30);
    p.set_age(31);
    p.reject_changes().unwrap();
    assert!(!p.is_changed());
    assert_eq!(p.age(), 30);
}

#[test]
fn nested_child_toggle_propagates_up_and_back_down() {
    let mother = Person::new("Eve", 55);
    let p = Person::new("Ada", 30);
    p.set_mother(Some(Rc::clone(&mother)));
    p.accept_changes().unwrap();
    assert!(!p.is_changed());

    mother.set_age(56);
    assert!(mother.is_changed());
    assert!(p.is_changed(), "owner must reflect a child's is_changed toggle");

    mother.reject_changes().unwrap();
    assert!(!mother.is_changed());
    assert!(!p.is_changed(), "owner must clear once the child is clean again");
}

#[test]
fn begin_init_refuses_while_changed() {
    let p = Person::new("Ada", 30);
    p.set_age(31);
    assert!(matches!(p.begin_init(), Err(ObservableError::InvalidOperation(_))));
}

#[test]
fn end_init_without_begin_init_errors() {
    let p = Person::new("Ada", 30);
    assert!(matches!(p.end_init(), Err(ObservableError::InvalidOperation(_))));
}
