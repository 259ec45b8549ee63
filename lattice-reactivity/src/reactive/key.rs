//! Identity and key types for the dependency registry.
//!
//! Observed objects are identified by a [`TargetId`] token rather than by
//! reference, so the registry never keeps an object alive. Property keys are
//! type-erased: any `Hash + Eq + Debug + Send + Sync + 'static` value can be
//! used as a [`PropKey`].

use std::any::{Any, TypeId};
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dyn_hash::DynHash;

use super::runtime;

/// Stable identity token of an observed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Issue a fresh target identity.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned identity of an observed object.
///
/// Dropping the handle removes the object's dependency data from the
/// registry. Adapters embed one in the shared state of each observed object.
#[derive(Debug)]
pub struct TargetHandle {
    id: TargetId,
}

impl TargetHandle {
    /// Issue a new target identity.
    pub fn new() -> Self {
        Self { id: TargetId::new() }
    }

    /// The identity used with [`track`](runtime::track) and
    /// [`trigger`](runtime::trigger).
    pub fn id(&self) -> TargetId {
        self.id
    }
}

impl Default for TargetHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TargetHandle {
    fn drop(&mut self) {
        runtime::forget(self.id);
    }
}

/// Object-safe equality comparison.
pub trait DynEq: Any {
    /// Returns `true` if `other` is the same concrete type and equal to `self`.
    fn dyn_eq(&self, other: &dyn Any) -> bool;
}

impl<T: Eq + 'static> DynEq for T {
    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|o| self == o)
    }
}

/// Trait for values usable as property keys.
///
/// Implemented for every `Hash + Eq + Debug + Send + Sync + 'static` type.
pub trait KeyValue: DynHash + DynEq + Debug + Send + Sync {
    /// Get the key as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Hash + Eq + Debug + Send + Sync + 'static> KeyValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

dyn_hash::hash_trait_object!(KeyValue);

/// Type-erased property key.
#[derive(Clone)]
pub struct PropKey {
    key_type: TypeId,
    key: Arc<dyn KeyValue>,
}

impl PropKey {
    /// Wrap any hashable value as a property key.
    pub fn new<K: KeyValue + 'static>(key: K) -> Self {
        Self {
            key_type: TypeId::of::<K>(),
            key: Arc::new(key),
        }
    }

    /// Downcast the key to its original type.
    pub fn downcast<K: 'static>(&self) -> Option<&K> {
        self.key.as_any().downcast_ref()
    }
}

impl Debug for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.key)
    }
}

impl Hash for PropKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_type.hash(state);
        self.key.hash(state);
    }
}

impl PartialEq for PropKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type && self.key.dyn_eq(other.key.as_any())
    }
}

impl Eq for PropKey {}

impl From<&str> for PropKey {
    fn from(key: &str) -> Self {
        Self::new(key.to_string())
    }
}

impl From<String> for PropKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl From<&String> for PropKey {
    fn from(key: &String) -> Self {
        Self::new(key.clone())
    }
}

impl From<usize> for PropKey {
    fn from(key: usize) -> Self {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Hash, PartialEq, Eq)]
    struct Marker;

    #[test]
    fn target_ids_are_unique() {
        assert_ne!(TargetId::new(), TargetId::new());
    }

    #[test]
    fn str_and_string_keys_are_equal() {
        assert_eq!(PropKey::from("x"), PropKey::from(String::from("x")));
        assert_ne!(PropKey::from("x"), PropKey::from("y"));
    }

    #[test]
    fn keys_of_different_types_never_collide() {
        let mut keys = HashSet::new();
        keys.insert(PropKey::new(1usize));
        keys.insert(PropKey::new(1u32));
        keys.insert(PropKey::new(Marker));
        keys.insert(PropKey::new(Marker));

        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn downcast_recovers_the_key() {
        let key = PropKey::from("count");
        assert_eq!(key.downcast::<String>().map(String::as_str), Some("count"));
        assert!(key.downcast::<usize>().is_none());
    }
}
