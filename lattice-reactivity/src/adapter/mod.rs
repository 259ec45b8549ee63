//! Reactive Object Adapter
//!
//! The reactive core only knows targets and keys. This module gives it
//! something to observe: [`ReactiveObject`], a keyed object that reports its
//! reads and writes to the dependency registry, and [`Traverse`], which deep
//! watchers use to read a whole value tree.

mod object;
mod traverse;

pub use object::{ReactiveObject, Value};
pub use traverse::Traverse;
