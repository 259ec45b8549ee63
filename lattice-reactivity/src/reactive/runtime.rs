//! Reactive Runtime
//!
//! The runtime owns the dependency registry: a process-wide map from an
//! observed object's [`TargetId`] to a per-key table of [`Dep`]s. Adapters
//! call [`track`] from their read path and [`trigger`] from their write path.
//!
//! # How It Works
//!
//! 1. While an effect runs, every `track(target, key)` subscribes it to the
//!    dependency set of that pair, creating the set on first use.
//!
//! 2. `trigger(target, key)` looks the set up and notifies its subscribers.
//!    Computed effects go first (see [`Dep::trigger`]).
//!
//! 3. When an observed object goes away, its [`TargetHandle`] calls
//!    [`forget`] and the whole entry is dropped.
//!
//! # Thread Safety
//!
//! The registry is a `DashMap`. Shard guards are only held while a set is
//! looked up or created, never while subscribers run, so effects are free to
//! track and trigger from inside a notification.
//!
//! [`TargetHandle`]: super::TargetHandle

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::trace;

use super::context::ReactiveContext;
use super::dep::Dep;
use super::key::{PropKey, TargetId};

type KeyToDep = HashMap<PropKey, Arc<Dep>>;

static TARGETS: OnceLock<DashMap<TargetId, KeyToDep>> = OnceLock::new();

fn targets() -> &'static DashMap<TargetId, KeyToDep> {
    TARGETS.get_or_init(DashMap::new)
}

/// Subscribe the active effect to `(target, key)`.
///
/// Does nothing when no effect is running. Subscribing an effect that is
/// already subscribed changes nothing.
pub fn track(target: TargetId, key: impl Into<PropKey>) {
    let Some(active) = ReactiveContext::current() else {
        return;
    };
    let key = key.into();
    trace!(object = target.raw(), ?key, subscriber = active.id().raw(), "track");

    let dep = {
        let mut keys = targets().entry(target).or_default();
        let dep = keys.entry(key).or_insert_with(Dep::new);
        Arc::clone(dep)
    };
    dep.add(&active);
}

/// Notify the subscribers of `(target, key)`.
///
/// Does nothing when nothing ever tracked the pair. The written value is not
/// needed: deciding whether a write is a change is the adapter's job.
pub fn trigger(target: TargetId, key: impl Into<PropKey>) {
    let key = key.into();
    let dep = targets()
        .get(&target)
        .and_then(|keys| keys.get(&key).cloned());

    if let Some(dep) = dep {
        trace!(object = target.raw(), ?key, "trigger");
        dep.trigger();
    }
}

/// Look up the dependency set of `(target, key)` without creating it.
pub fn dep_for(target: TargetId, key: impl Into<PropKey>) -> Option<Arc<Dep>> {
    let key = key.into();
    targets()
        .get(&target)
        .and_then(|keys| keys.get(&key).cloned())
}

/// Number of keys of `target` that have a dependency set.
pub fn tracked_key_count(target: TargetId) -> usize {
    targets().get(&target).map(|keys| keys.len()).unwrap_or(0)
}

/// Drop all dependency data of `target`.
pub fn forget(target: TargetId) {
    if targets().remove(&target).is_some() {
        trace!(object = target.raw(), "forget target");
    }
}
