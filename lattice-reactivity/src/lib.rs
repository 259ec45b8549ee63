//! Lattice Reactivity
//!
//! This crate provides the dependency-tracking runtime for the Lattice
//! reactive UI framework. It implements:
//!
//! - Dependency tracking (`track` / `trigger`) keyed by observed object and
//!   property
//! - Effects, computeds and signals
//! - A batching job scheduler with a pluggable deferred flush
//! - Watchers with old/new value comparison
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and the dependency registry
//! - `scheduler`: Deduplicating job queue and its flush hosts
//! - `watch`: Watchers built on effects and the scheduler
//! - `adapter`: Reactive objects that report their reads and writes
//! - `config` / `error`: Scheduler configuration and error types
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_reactivity::reactive::{create_effect, Computed, EffectOptions, Signal};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let c = count.clone();
//! let doubled = Computed::new(move || c.get() * 2);
//!
//! // Create an effect
//! let d = doubled.clone();
//! let _effect = create_effect(move || {
//!     println!("Doubled: {}", d.get());
//! }, EffectOptions::default());
//!
//! // Update the signal
//! count.set(5);
//! // Effect automatically runs, prints: "Doubled: 10"
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod reactive;
pub mod scheduler;
pub mod watch;

pub use adapter::{ReactiveObject, Traverse, Value};
pub use config::{Config, FlushMode};
pub use error::ReactiveError;
pub use reactive::{
    create_effect, track, trigger, untracked, Computed, Effect, EffectOptions, ReactiveEffect,
    Signal,
};
pub use scheduler::{flush_jobs, queue_job, run_microtasks, Job};
pub use watch::{watch, WatchHandle, WatchOptions, WatchSource};
