//! Reactive Primitives
//!
//! This module implements the core reactive system: dependency tracking,
//! effects, computeds and signals.
//!
//! # Concepts
//!
//! ## Dependency Tracking
//!
//! Observed objects call [`track`] when a property is read and [`trigger`]
//! when it is written. A read made while an effect runs subscribes that
//! effect to the property's [`Dep`]; a write notifies the subscribers.
//!
//! ## Effects
//!
//! An Effect is a computation that re-runs whenever its dependencies change,
//! or hands the change to a scheduler of its choosing.
//!
//! ## Computeds
//!
//! A Computed is a derived value that caches its result. It re-evaluates only
//! on the first read after one of its dependencies changed.
//!
//! ## Signals
//!
//! A Signal is a single mutable value with its own dependency set.
//!
//! # Implementation Notes
//!
//! The active effect lives on a thread-local stack, so nested effects
//! restore the outer one when they finish. The registry mapping observed
//! objects to their dependency sets is process-wide.

mod computed;
mod context;
mod dep;
mod effect;
mod key;
pub mod runtime;
mod signal;
mod subscriber;

pub use computed::{Computed, ComputedState};
pub use context::{untracked, ReactiveContext};
pub use dep::Dep;
pub use effect::{create_effect, Effect, EffectOptions, EffectScheduler, ReactiveEffect};
pub use key::{DynEq, KeyValue, PropKey, TargetHandle, TargetId};
pub use runtime::{track, trigger};
pub use signal::Signal;
pub use subscriber::SubscriberId;

pub(crate) use effect::EffectKind;
