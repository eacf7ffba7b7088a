use thiserror::Error;

/// Every failure mode the crate can surface to a caller.
///
/// Grounded on `leptos_reactive`'s `SignalError` / `SerializationError`
/// (`signal.rs`, `serialization.rs`): one flat `thiserror` enum rather than a
/// tree of nested error types, since none of these variants wrap a further
/// source error worth preserving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservableError {
    /// An operation requiring an original-value shadow was called on an
    /// instance produced without the tracking factory.
    #[error("instance is not tracked: no original-value shadow exists")]
    NotTracked,

    /// `begin_init` while changed, `end_init` without a matching
    /// `begin_init`, `accept_changes`/`reject_changes` while initializing,
    /// or `defer_property_changes` while already deferred.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// A trackable property cannot be overridden because the synthesis
    /// facility could not produce a setter-shaped hook for it.
    #[error("property `{0}` cannot be made trackable: not overridable")]
    NonVirtualProperty(&'static str),

    /// A trackable property has no setter to synthesize against.
    #[error("property `{0}` has no setter")]
    NoSetter(&'static str),

    /// `reset` of a keyed collection encountered a repeated key.
    #[error("duplicate key encountered during reset")]
    DuplicateKey,

    /// `get_value(key)` / `try_get(key)` missed.
    #[error("key not found")]
    KeyNotFound,

    /// The path observer could not resolve a property name at a dynamic
    /// step of the chain.
    #[error("property `{0}` not found while resolving path")]
    MissingProperty(String),

    /// A list-index argument was out of bounds.
    #[error("index {index} out of range (len = {len})")]
    OutOfRange { index: usize, len: usize },

    /// `items_changes` requested on a list whose item type is not
    /// observable, or a comparator asked for a hash it cannot produce.
    #[error("not supported: {0}")]
    NotSupported(&'static str),

    /// `first_async` completed (`on_completed`) without ever producing a
    /// value.
    #[error("sequence completed without producing a value")]
    EmptySequence,
}

/// Convenience alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, ObservableError>;
