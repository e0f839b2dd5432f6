#![forbid(unsafe_code)]

//! The observable [`State`] cell.
//!
//! # Failure Modes
//!
//! - Listener panic: propagates out of `set`; listeners after it are not
//!   notified and the new value stays stored.
//! - Listener calling `set` on the same state: recurses; the outer loop keeps
//!   going and later listeners observe the newest value.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::listener::StateChangeListener;

/// Marker type naming a state capability.
///
/// A view binds a widget to a `StateKind`; a view-model provides a
/// `State<Self::Value>` under the same kind. Declare kinds with
/// [`state_kind!`](crate::state_kind).
pub trait StateKind: 'static {
    /// Type of the value held by the provided state.
    type Value: 'static;

    /// Human-readable capability name used in errors and logs.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Declare a [`StateKind`] marker type.
///
/// ```ignore
/// bindery::state_kind!(pub UserName: String);
/// ```
#[macro_export]
macro_rules! state_kind {
    ($(#[$meta:meta])* $vis:vis $name:ident : $value:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name;

        impl $crate::reactive::StateKind for $name {
            type Value = $value;
        }
    };
}

// ---------------------------------------------------------------------------
// State<T>
// ---------------------------------------------------------------------------

struct Inner<T: 'static> {
    value: RefCell<Rc<T>>,
    listeners: RefCell<Vec<StateChangeListener<T>>>,
    version: Cell<u64>,
}

/// A shared, observable value cell.
///
/// Clones share the same cell. The value is held as an `Rc<T>`; [`set`]
/// always stores a fresh allocation and therefore always notifies, while
/// [`set_shared`] with the `Rc` returned by [`get`] is a no-op.
///
/// [`set`]: Self::set
/// [`set_shared`]: Self::set_shared
/// [`get`]: Self::get
pub struct State<T: 'static> {
    inner: Rc<Inner<T>>,
}

impl<T: 'static> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> State<T> {
    /// Create a state holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::from_shared(Rc::new(value))
    }

    /// Create a state holding an existing shared value.
    #[must_use]
    pub fn from_shared(value: Rc<T>) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                listeners: RefCell::new(Vec::new()),
                version: Cell::new(0),
            }),
        }
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> Rc<T> {
        Rc::clone(&self.inner.value.borrow())
    }

    /// Run `f` against the current value.
    ///
    /// The value is pinned for the duration of `f`, so `f` may call `set`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.get();
        f(&value)
    }

    /// Store `value` and notify every listener.
    ///
    /// Returns `true`: a freshly moved-in value is never the current one.
    pub fn set(&self, value: T) -> bool {
        self.set_shared(Rc::new(value))
    }

    /// Store `value` and notify every listener, unless `value` is the
    /// allocation already held.
    ///
    /// Returns whether the value changed.
    pub fn set_shared(&self, value: Rc<T>) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if Rc::ptr_eq(&current, &value) {
                return false;
            }
            *current = value;
        }
        self.inner.version.set(self.inner.version.get().wrapping_add(1));
        self.notify_all_listeners();
        true
    }

    /// Register `listener`. Always succeeds; duplicates are kept.
    pub fn add_listener(&self, listener: StateChangeListener<T>) -> bool {
        self.inner.listeners.borrow_mut().push(listener);
        true
    }

    /// Remove the first registration of `listener`.
    ///
    /// Returns whether a registration was removed.
    pub fn remove_listener(&self, listener: &StateChangeListener<T>) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        match listeners.iter().position(|l| l.ptr_eq(listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Register a callback and return its handle.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> StateChangeListener<T> {
        let listener = StateChangeListener::new(f);
        self.add_listener(listener.clone());
        listener
    }

    /// Deliver the current value to `listener` once.
    pub fn notify_listener(&self, listener: &StateChangeListener<T>) {
        let value = self.get();
        listener.state_change(&value);
    }

    /// Re-deliver the current value to every registered listener.
    pub fn notify_all_listeners(&self) {
        // Snapshot so listeners can register or remove listeners while we iterate.
        let listeners = self.inner.listeners.borrow().clone();
        for listener in &listeners {
            self.notify_listener(listener);
        }
    }

    /// Number of registrations (duplicates counted).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Number of effective `set` calls so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// `TypeId` of the value type.
    #[must_use]
    pub fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    /// Name of the value type.
    #[must_use]
    pub fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    /// Whether `self` and `other` share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Default + 'static> Default for State<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("value", &self.get())
            .field("version", &self.version())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AnyState: type-erased access
// ---------------------------------------------------------------------------

/// Type-erased view of a [`State`].
///
/// Provider tables hold states of different value types side by side; the
/// composer talks to them through this trait and adapters see values as
/// `&dyn Any`.
pub trait AnyState {
    /// `TypeId` of the value type.
    fn value_type(&self) -> TypeId;

    /// Name of the value type.
    fn value_type_name(&self) -> &'static str;

    /// Register an erased listener.
    fn add_any_listener(&self, listener: &StateChangeListener<dyn Any>);

    /// Deliver the current value to an erased listener once.
    fn notify_any_listener(&self, listener: &StateChangeListener<dyn Any>);

    /// Number of registrations on the underlying state.
    fn listener_count(&self) -> usize;

    /// Access to the concrete `State<T>` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AnyState for State<T> {
    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn add_any_listener(&self, listener: &StateChangeListener<dyn Any>) {
        let erased = listener.clone();
        self.add_listener(StateChangeListener::new(move |value: &T| {
            erased.state_change(value);
        }));
    }

    fn notify_any_listener(&self, listener: &StateChangeListener<dyn Any>) {
        let value = self.get();
        listener.state_change(&*value);
    }

    fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
