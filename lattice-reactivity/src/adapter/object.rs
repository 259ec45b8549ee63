//! Reactive objects.
//!
//! A [`ReactiveObject`] is a keyed bag of [`Value`]s whose reads and writes go
//! through [`track`](crate::reactive::track) and
//! [`trigger`](crate::reactive::trigger). Reading a key subscribes the active
//! effect to that key; listing the keys subscribes it to the object's shape,
//! which changes when a key is added or removed.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::trace;

use crate::reactive::{runtime, PropKey, TargetHandle, TargetId};

/// Key tracked by reads that depend on which keys exist.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct IterateKey;

fn iterate_key() -> PropKey {
    PropKey::new(IterateKey)
}

/// A value stored in a [`ReactiveObject`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A nested object. Compared by identity.
    Object(ReactiveObject),
}

impl Value {
    /// Get the nested object, if this is one.
    pub fn as_object(&self) -> Option<&ReactiveObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Get the number, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn to_json_with(&self, seen: &mut HashSet<TargetId>) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Object(object) => object.to_json_with(seen),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ReactiveObject> for Value {
    fn from(object: ReactiveObject) -> Self {
        Value::Object(object)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Object(ReactiveObject::from_entries(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| (index.to_string(), Value::from(item))),
            )),
            serde_json::Value::Object(map) => Value::Object(ReactiveObject::from(map)),
        }
    }
}

struct ObjectInner {
    target: TargetHandle,
    props: RwLock<IndexMap<String, Value>>,
}

/// A reactive keyed object.
///
/// Clones are handles to the same object. The object's dependency data is
/// dropped from the registry together with the last handle.
///
/// # Example
///
/// ```rust,ignore
/// let state = ReactiveObject::new();
/// state.set("count", 1);
///
/// let reader = state.clone();
/// let _effect = create_effect(move || {
///     println!("count = {:?}", reader.get("count"));
/// }, EffectOptions::default());
///
/// state.set("count", 2); // Prints: count = Some(Number(2.0))
/// ```
#[derive(Clone)]
pub struct ReactiveObject {
    inner: Arc<ObjectInner>,
}

impl ReactiveObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::from_entries(std::iter::empty::<(String, Value)>())
    }

    /// Create an object holding `entries`, in order.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self {
            inner: Arc::new(ObjectInner {
                target: TargetHandle::new(),
                props: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            }),
        }
    }

    /// Build an object tree from JSON.
    ///
    /// Nested objects become nested reactive objects; arrays become objects
    /// keyed by index. Returns `None` for JSON scalars.
    pub fn from_json(json: serde_json::Value) -> Option<Self> {
        match Value::from(json) {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The identity used in the dependency registry.
    pub fn target(&self) -> TargetId {
        self.inner.target.id()
    }

    /// Read `key`, subscribing the active effect to it.
    pub fn get(&self, key: &str) -> Option<Value> {
        runtime::track(self.target(), key);
        self.get_untracked(key)
    }

    /// Read `key` without tracking.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        self.inner.props.read().get(key).cloned()
    }

    /// Check if `key` exists, subscribing the active effect to it.
    pub fn contains_key(&self, key: &str) -> bool {
        runtime::track(self.target(), key);
        self.inner.props.read().contains_key(key)
    }

    /// Write `key`.
    ///
    /// Subscribers of `key` are notified only if the value changed. Adding a
    /// new key also notifies readers of the key list.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        let (changed, added) = {
            let mut props = self.inner.props.write();
            match props.get_mut(&key) {
                Some(old) if *old == value => (false, false),
                Some(old) => {
                    *old = value;
                    (true, false)
                }
                None => {
                    props.insert(key.clone(), value);
                    (true, true)
                }
            }
        };

        if changed {
            trace!(object = self.target().raw(), %key, added, "object write");
            runtime::trigger(self.target(), key.as_str());
        }
        if added {
            runtime::trigger(self.target(), iterate_key());
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.inner.props.write().shift_remove(key);

        if removed.is_some() {
            runtime::trigger(self.target(), key);
            runtime::trigger(self.target(), iterate_key());
        }
        removed
    }

    /// List the keys, subscribing the active effect to the key list.
    pub fn keys(&self) -> Vec<String> {
        runtime::track(self.target(), iterate_key());
        self.inner.props.read().keys().cloned().collect()
    }

    /// Number of keys, subscribing the active effect to the key list.
    pub fn len(&self) -> usize {
        runtime::track(self.target(), iterate_key());
        self.inner.props.read().len()
    }

    /// Check if the object has no keys, subscribing the active effect to the
    /// key list.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read every key and return the entries, subscribing the active effect
    /// to each key and to the key list.
    pub fn entries(&self) -> Vec<(String, Value)> {
        let target = self.target();
        runtime::track(target, iterate_key());

        let entries: Vec<_> = self
            .inner
            .props
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, _) in &entries {
            runtime::track(target, key);
        }
        entries
    }

    /// Snapshot the object tree as JSON, without tracking.
    ///
    /// A nested object that is already being converted higher up the tree is
    /// written as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_with(&mut HashSet::new())
    }

    fn to_json_with(&self, seen: &mut HashSet<TargetId>) -> serde_json::Value {
        if !seen.insert(self.target()) {
            return serde_json::Value::Null;
        }

        let entries: Vec<_> = self
            .inner
            .props
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let map = entries
            .into_iter()
            .map(|(k, v)| (k, v.to_json_with(seen)))
            .collect();

        seen.remove(&self.target());
        serde_json::Value::Object(map)
    }
}

impl Default for ReactiveObject {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ReactiveObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ReactiveObject {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::from_entries(map.into_iter().map(|(k, v)| (k, Value::from(v))))
    }
}

impl std::fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys only: nested objects may form cycles.
        f.debug_struct("ReactiveObject")
            .field("target", &self.target())
            .field("keys", &self.inner.props.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
