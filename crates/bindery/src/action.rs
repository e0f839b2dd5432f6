#![forbid(unsafe_code)]

//! Action capabilities and handler primitives.
//!
//! Widgets emit values through an [`ActionHandler`]; the value travels as
//! [`ActionData`], a borrowed `&dyn Any` tagged with its type name so that a
//! mismatch against the view-model's typed handler can be reported precisely.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::error::InvocationError;

/// Error returned by a fallible view-model action handler.
pub type HandlerError = Box<dyn std::error::Error + 'static>;

/// Marker type naming an action capability.
///
/// A view binds a widget's change events to an `ActionKind`; a view-model
/// handles it with a callback taking `&Self::Data`. Declare kinds with
/// [`action_kind!`](crate::action_kind).
pub trait ActionKind: 'static {
    /// Type of the data the handler accepts.
    type Data: 'static;

    /// Human-readable capability name used in errors and logs.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Declare an [`ActionKind`] marker type.
///
/// ```ignore
/// bindery::action_kind!(pub Rename: String);
/// ```
#[macro_export]
macro_rules! action_kind {
    ($(#[$meta:meta])* $vis:vis $name:ident : $data:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name;

        impl $crate::action::ActionKind for $name {
            type Data = $data;
        }
    };
}

// ---------------------------------------------------------------------------
// ActionData
// ---------------------------------------------------------------------------

/// A borrowed action payload.
#[derive(Clone, Copy)]
pub struct ActionData<'a> {
    value: &'a dyn Any,
    type_name: &'static str,
}

impl<'a> ActionData<'a> {
    /// Wrap `value`, remembering its type name.
    #[must_use]
    pub fn new<T: Any>(value: &'a T) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The payload as `&dyn Any`.
    #[must_use]
    pub fn value(&self) -> &'a dyn Any {
        self.value
    }

    /// Name of the payload's concrete type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `TypeId` of the payload's concrete type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        Any::type_id(self.value)
    }

    /// The payload as `&T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for ActionData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionData")
            .field("type", &self.type_name)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ActionHandler
// ---------------------------------------------------------------------------

/// A callback invoked with one action payload.
///
/// Returns an [`InvocationError`] when the payload cannot be handled; widget
/// adapters hand that error back to whatever dispatched the event.
#[derive(Clone)]
pub struct ActionHandler {
    callback: Rc<dyn Fn(ActionData<'_>) -> Result<(), InvocationError>>,
}

impl ActionHandler {
    /// Wrap `f` as a handler.
    pub fn new(f: impl Fn(ActionData<'_>) -> Result<(), InvocationError> + 'static) -> Self {
        Self {
            callback: Rc::new(f),
        }
    }

    /// Invoke the handler.
    ///
    /// # Errors
    ///
    /// Whatever the wrapped callback reports.
    pub fn handle(&self, data: ActionData<'_>) -> Result<(), InvocationError> {
        (self.callback)(data)
    }

    /// Invoke the handler with `value`.
    ///
    /// # Errors
    ///
    /// Whatever the wrapped callback reports.
    pub fn handle_value<T: Any>(&self, value: &T) -> Result<(), InvocationError> {
        self.handle(ActionData::new(value))
    }

    /// Whether `self` and `other` are handles to the same callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn action_data_downcasts() {
        let value = 42_i64;
        let data = ActionData::new(&value);
        assert_eq!(data.downcast_ref::<i64>(), Some(&42));
        assert!(data.downcast_ref::<String>().is_none());
        assert_eq!(data.type_name(), "i64");
        assert_eq!(data.type_id(), TypeId::of::<i64>());
    }

    #[test]
    fn handler_receives_value() {
        let seen = Rc::new(Cell::new(0_i64));
        let s = Rc::clone(&seen);
        let handler = ActionHandler::new(move |data| {
            if let Some(v) = data.downcast_ref::<i64>() {
                s.set(*v);
            }
            Ok(())
        });
        handler.handle_value(&5_i64).unwrap();
        assert_eq!(seen.get(), 5);
        assert!(handler.ptr_eq(&handler.clone()));
    }
}
