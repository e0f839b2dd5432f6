#![forbid(unsafe_code)]

//! Change listener handles.

use std::fmt;
use std::rc::Rc;

/// A single-argument change callback.
///
/// Cloning shares the callback; [`ptr_eq`](Self::ptr_eq) tells clones of one
/// listener apart from distinct listeners that happen to do the same thing.
///
/// `StateChangeListener<dyn Any>` is the type-erased form adapters produce:
/// it receives the new value as `&dyn Any` and downcasts to whatever the
/// widget can display.
pub struct StateChangeListener<T: ?Sized + 'static> {
    callback: Rc<dyn Fn(&T)>,
}

impl<T: ?Sized + 'static> StateChangeListener<T> {
    /// Wrap `f` as a listener.
    pub fn new(f: impl Fn(&T) + 'static) -> Self {
        Self {
            callback: Rc::new(f),
        }
    }

    /// Deliver `value` to the callback.
    pub fn state_change(&self, value: &T) {
        (self.callback)(value);
    }

    /// Whether `self` and `other` are handles to the same callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<T: ?Sized + 'static> Clone for StateChangeListener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<T: ?Sized + 'static> fmt::Debug for StateChangeListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateChangeListener")
            .field("handles", &Rc::strong_count(&self.callback))
            .finish()
    }
}
