//! Process-wide shared state: per-type property registries, the memoized
//! dependency closure, and the expression fingerprint cache.
//!
//! Grounded on `leptos_reactive::runtime`, which keeps exactly this kind of
//! state (`nodes`, `node_subscribers`, `node_sources`) behind a single
//! `thread_local! static RUNTIME: Runtime`. leptos can get away with
//! thread-local storage because its scopes are `!Send`; this crate's
//! registries are genuinely process-wide (subscribe/unsubscribe may happen
//! from any thread per the concurrency model), so publication is guarded by
//! a `RwLock` instead of a thread-local cell, giving a "write-once,
//! lock-guarded publish, lock-free-ish read" shape.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use rustc_hash::FxHashMap;

/// A single declared property on an observable or trackable type.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub is_trackable: bool,
    pub is_reference_only: bool,
    pub is_read_only: bool,
}

/// Everything the registry knows about one concrete type: its declared
/// properties in declaration order, and the direct (non-transitive)
/// dependency edges declared via `#[depends_on(...)]`-style registration.
#[derive(Debug, Default)]
pub struct TypeMetadata {
    pub properties: Vec<PropertyDescriptor>,
    /// `property -> properties that directly depend on it`.
    direct_dependents: FxHashMap<&'static str, Vec<&'static str>>,
    /// Memoized transitive closure, `property -> ordered dependents`.
    closure_cache: RwLock<FxHashMap<&'static str, Arc<Vec<&'static str>>>>,
}

impl TypeMetadata {
    fn new(properties: Vec<PropertyDescriptor>, dependencies: &[(&'static str, &[&'static str])]) -> Self {
        let mut direct_dependents: FxHashMap<&'static str, Vec<&'static str>> = FxHashMap::default();
        for (dependent, depends_on) in dependencies {
            for source in *depends_on {
                direct_dependents.entry(source).or_default().push(dependent);
            }
        }
        Self {
            properties,
            direct_dependents,
            closure_cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// The transitive closure of properties that must also be raised when
    /// `property` changes, breadth-first, with self-edges removed. Memoized
    /// per `(type, property)`.
    pub fn dependents_of(&self, property: &'static str) -> Arc<Vec<&'static str>> {
        if let Some(hit) = self.closure_cache.read().unwrap().get(property) {
            return Arc::clone(hit);
        }

        let mut seen = std::collections::HashSet::new();
        let mut order = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(property);
        seen.insert(property);

        let mut self_dependent = false;
        while let Some(current) = queue.pop_front() {
            if let Some(dependents) = self.direct_dependents.get(current) {
                for &dependent in dependents {
                    if dependent == property {
                        self_dependent = true;
                        continue;
                    }
                    if seen.insert(dependent) {
                        order.push(dependent);
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if self_dependent {
            tracing::warn!(
                property,
                "property transitively depends on itself; self-edge removed from dependency closure"
            );
        }

        let result = Arc::new(order);
        self.closure_cache
            .write()
            .unwrap()
            .insert(property, Arc::clone(&result));
        result
    }
}

type Registry = RwLock<HashMap<TypeId, Arc<TypeMetadata>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a concrete type's property descriptors and dependency edges.
/// Idempotent: if `T` was already registered, this is a no-op (first
/// observation wins, matching the "write-once" rule in the concurrency
/// model).
pub fn register_type<T: 'static>(
    properties: Vec<PropertyDescriptor>,
    dependencies: &[(&'static str, &[&'static str])],
) -> Arc<TypeMetadata> {
    let key = TypeId::of::<T>();
    if let Some(existing) = registry().read().unwrap().get(&key) {
        return Arc::clone(existing);
    }
    let metadata = Arc::new(TypeMetadata::new(properties, dependencies));
    let mut write = registry().write().unwrap();
    // Another thread may have published between the read-miss and the
    // write-lock acquisition; defer to whoever got there first.
    Arc::clone(write.entry(key).or_insert(metadata))
}

/// Looks up a previously registered type's metadata.
pub fn type_metadata<T: 'static>() -> Option<Arc<TypeMetadata>> {
    registry().read().unwrap().get(&TypeId::of::<T>()).cloned()
}

/// Process-wide cache from a structural fingerprint to a compiled/parsed
/// value, with collision detection via structural equality on a cheap key.
///
/// Portable substitute for the source's expression-tree-keyed delegate
/// cache (per §5 and the DESIGN NOTES redesign entry for the expression
/// cache): the fingerprint is a hash of whatever the caller considers the
/// "shape" of the expression (e.g. a joined path-segment string), and on a
/// second insert with the same fingerprint we fall back to structural
/// equality on `key` to rule out a collision.
pub struct ExpressionCache<K, V> {
    entries: RwLock<FxHashMap<u64, Vec<(K, Arc<V>)>>>,
}

impl<K: PartialEq + Clone, V> Default for ExpressionCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<K: PartialEq + Clone, V> ExpressionCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with(&self, fingerprint: u64, key: &K, build: impl FnOnce() -> V) -> Arc<V> {
        if let Some(hit) = self.lookup(fingerprint, key) {
            return hit;
        }
        let value = Arc::new(build());
        let mut entries = self.entries.write().unwrap();
        let bucket = entries.entry(fingerprint).or_default();
        if let Some((_, existing)) = bucket.iter().find(|(k, _)| k == key) {
            return Arc::clone(existing);
        }
        bucket.push((key.clone(), Arc::clone(&value)));
        value
    }

    fn lookup(&self, fingerprint: u64, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap();
        entries
            .get(&fingerprint)
            .and_then(|bucket| bucket.iter().find(|(k, _)| k == key))
            .map(|(_, v)| Arc::clone(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Demo;

    #[test]
    fn dependency_closure_is_breadth_first_and_drops_self_edges() {
        let meta = register_type::<Demo>(
            vec![],
            &[
                ("b", &["a"]),
                ("c", &["a"]),
                ("d", &["b"]),
                ("a", &["a"]), // self-edge, must be removed
            ],
        );
        let dependents = meta.dependents_of("a");
        assert_eq!(dependents.as_slice(), &["b", "c", "d"]);
    }

    #[test]
    fn expression_cache_detects_collision_via_structural_equality() {
        let cache: ExpressionCache<String, u32> = ExpressionCache::new();
        let a = cache.get_or_insert_with(1, &"a.b".to_string(), || 42);
        let b = cache.get_or_insert_with(1, &"a.b".to_string(), || 99);
        assert_eq!(*a, 42);
        assert_eq!(*b, 42);
        let c = cache.get_or_insert_with(1, &"x.y".to_string(), || 7);
        assert_eq!(*c, 7);
    }
}
