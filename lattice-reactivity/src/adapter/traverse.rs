//! Deep reads for deep watchers.

use std::collections::HashSet;

use super::object::{ReactiveObject, Value};
use crate::reactive::{Signal, TargetId};

/// Read every reactive value reachable from `self`, for tracking only.
///
/// A deep watcher traverses its source inside its effect, so a write
/// anywhere in the tree notifies it. Each [`ReactiveObject`] is visited at
/// most once per traversal, so cyclic trees terminate.
pub trait Traverse {
    /// Traverse, skipping objects already in `seen`.
    fn traverse_with(&self, seen: &mut HashSet<TargetId>);

    /// Traverse from a fresh visited set.
    fn traverse(&self) {
        self.traverse_with(&mut HashSet::new());
    }
}

macro_rules! impl_traverse_leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Traverse for $ty {
                fn traverse_with(&self, _seen: &mut HashSet<TargetId>) {}
            }
        )*
    };
}

impl_traverse_leaf!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    String,
);

impl<T: Traverse> Traverse for Option<T> {
    fn traverse_with(&self, seen: &mut HashSet<TargetId>) {
        if let Some(value) = self {
            value.traverse_with(seen);
        }
    }
}

impl<T: Traverse> Traverse for Vec<T> {
    fn traverse_with(&self, seen: &mut HashSet<TargetId>) {
        for value in self {
            value.traverse_with(seen);
        }
    }
}

impl<A: Traverse, B: Traverse> Traverse for (A, B) {
    fn traverse_with(&self, seen: &mut HashSet<TargetId>) {
        self.0.traverse_with(seen);
        self.1.traverse_with(seen);
    }
}

impl Traverse for Value {
    fn traverse_with(&self, seen: &mut HashSet<TargetId>) {
        if let Value::Object(object) = self {
            object.traverse_with(seen);
        }
    }
}

impl Traverse for ReactiveObject {
    fn traverse_with(&self, seen: &mut HashSet<TargetId>) {
        if !seen.insert(self.target()) {
            return;
        }
        for (_, value) in self.entries() {
            value.traverse_with(seen);
        }
    }
}

impl<T> Traverse for Signal<T>
where
    T: Traverse + Clone + PartialEq + Send + Sync + 'static,
{
    fn traverse_with(&self, seen: &mut HashSet<TargetId>) {
        self.with(|value| value.traverse_with(seen));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_effect, EffectOptions};
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn traversal_subscribes_to_nested_keys() {
        let state = ReactiveObject::from_json(json!({ "a": { "b": { "c": 1 } } })).unwrap();
        let count = Arc::new(AtomicI32::new(0));

        let _effect = {
            let state = state.clone();
            let count = count.clone();
            create_effect(
                move || {
                    state.traverse();
                    count.fetch_add(1, Ordering::SeqCst);
                },
                EffectOptions::default(),
            )
        };

        let b = state
            .get_untracked("a")
            .and_then(|a| a.as_object().cloned())
            .and_then(|a| a.get_untracked("b"))
            .and_then(|b| b.as_object().cloned())
            .unwrap();
        b.set("c", 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        b.set("d", true);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cyclic_objects_terminate() {
        let a = ReactiveObject::new();
        let b = ReactiveObject::new();
        a.set("b", b.clone());
        b.set("a", a.clone());

        let count = Arc::new(AtomicI32::new(0));
        let _effect = {
            let a = a.clone();
            let count = count.clone();
            create_effect(
                move || {
                    a.traverse();
                    count.fetch_add(1, Ordering::SeqCst);
                },
                EffectOptions::default(),
            )
        };
        assert_eq!(count.load(Ordering::SeqCst), 1);

        b.set("x", 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        b.remove("a");
    }

    #[test]
    fn signal_of_object_tracks_both() {
        let inner = ReactiveObject::new();
        let signal = Signal::new(Some(inner.clone()));
        let count = Arc::new(AtomicI32::new(0));

        let _effect = {
            let signal = signal.clone();
            let count = count.clone();
            create_effect(
                move || {
                    signal.traverse();
                    count.fetch_add(1, Ordering::SeqCst);
                },
                EffectOptions::default(),
            )
        };

        inner.set("k", "v");
        assert_eq!(count.load(Ordering::SeqCst), 2);

        signal.set(None);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
