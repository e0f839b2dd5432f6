#![forbid(unsafe_code)]

//! Observable state for view-model bindings.
//!
//! This module provides the change-notification primitives the composer wires
//! widgets to:
//!
//! - [`State`]: a shared, version-tracked value cell with change notification
//!   via registered [`StateChangeListener`]s.
//! - [`StateChangeListener`]: a cloneable single-argument callback handle.
//!   Handles compare by identity, so the same handle can be removed again.
//! - [`StateKind`]: marker trait naming a state capability and its value type.
//! - [`AnyState`]: the type-erased view of a `State<T>` that provider tables
//!   store.
//!
//! # Architecture
//!
//! `State<T>` uses `Rc<..>` with interior mutability for single-threaded shared
//! ownership. Values are held as `Rc<T>` so that "unchanged" means *the same
//! allocation*, not an equal value.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per `set` that stores a new value.
//! 2. Listeners are notified in registration order.
//! 3. Setting the current `Rc` again is a no-op (no version bump, no
//!    notifications). Setting an equal but distinct value notifies.
//! 4. No borrow is held while a listener runs: listeners may read, `set`, or
//!    register further listeners re-entrantly.
//! 5. Adding the same listener twice notifies it twice.

pub mod listener;
pub mod state;

pub use listener::StateChangeListener;
pub use state::{AnyState, State, StateKind};
