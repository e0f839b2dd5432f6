#![forbid(unsafe_code)]

//! Circular-update guard.
//!
//! A field bound to both a state and an action forms a loop: the action
//! handler sets the state, the state listener updates the widget, and the
//! widget re-emits its change event. The guard, owned by the field's binding
//! record, breaks that loop by suppressing action invocations on the field
//! while one is already running.
//!
//! # Invariants
//!
//! 1. An unarmed guard never suppresses. Only fields with a state binding are
//!    armed.
//! 2. While a [`PropagationScope`] is alive on an armed guard,
//!    [`is_propagating`](BindingGuard::is_propagating) is `true`.
//! 3. Dropping the scope clears the flag, on success, error, or unwind.

use std::cell::Cell;

/// Per-field "currently propagating" flag.
#[derive(Debug, Default)]
pub struct BindingGuard {
    armed: Cell<bool>,
    propagating: Cell<bool>,
}

impl BindingGuard {
    /// Create an unarmed guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the guard and reset it to not-propagating.
    pub fn arm(&self) {
        self.armed.set(true);
        self.propagating.set(false);
    }

    /// Whether a state binding armed this guard.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// Whether an action on this field is currently running.
    #[must_use]
    pub fn is_propagating(&self) -> bool {
        self.armed.get() && self.propagating.get()
    }

    /// Mark the field as propagating until the returned scope drops.
    ///
    /// A no-op on an unarmed guard.
    pub fn enter(&self) -> PropagationScope<'_> {
        if self.armed.get() {
            self.propagating.set(true);
        }
        PropagationScope { guard: self }
    }
}

/// RAII scope returned by [`BindingGuard::enter`].
#[must_use = "dropping this scope immediately clears the propagation flag"]
#[derive(Debug)]
pub struct PropagationScope<'a> {
    guard: &'a BindingGuard,
}

impl Drop for PropagationScope<'_> {
    fn drop(&mut self) {
        if self.guard.armed.get() {
            self.guard.propagating.set(false);
        }
    }
}
