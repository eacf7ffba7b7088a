//! Observable, change-tracking domain models.
//!
//! Two layers sit on top of each other:
//!
//! - **Observable**: a property-changed event, a hot stream of the same,
//!   deferred batching, and dependency fan-out between properties whose
//!   values derive from one another.
//! - **Trackable**: an original-value shadow over an observable object or
//!   collection, with an accept/reject changed-set, nested-child
//!   propagation, and `begin_init`/`end_init` for bulk construction.
//!
//! Everything above is single-owner (see [`notifier`] for the
//! re-entrancy rules a `Notifier` upholds); weak subscriptions
//! ([`weak_sub`]) and subjects ([`subject`]) are the two primitives that
//! cross that boundary.

#[cfg(feature = "tokio")]
pub mod async_ext;
pub mod error;
pub mod keyed_list;
pub mod list;
pub mod notifier;
pub mod observable_object;
pub mod path_observer;
pub mod runtime;
pub mod streams;
pub mod subject;
pub mod trackable_collection;
pub mod trackable_object;
pub mod views;
pub mod weak_sub;

pub use error::{ObservableError, Result};
pub use keyed_list::KeyedObservableList;
pub use list::{CollectionChange, ObservableList};
pub use notifier::{DeferGuard, Notifier, PropertyChangedArgs, SubscriptionId};
pub use observable_object::{set_observable, ObservableObject};
pub use path_observer::{PathStep, PropertyPathObserver};
pub use subject::{BehaviorSubject, Subject, Subscription};
pub use trackable_collection::{Change, TrackableKeyedList, TrackableList};
pub use trackable_object::{Trackable, TrackableBase};
pub use views::{AggregateView, CombineView, MapView, NewItemsView};
pub use weak_sub::WeakSubscriptionList;
