#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! | Error | Phase | Propagation |
//! |-------|-------|-------------|
//! | [`BindError`] not-found | resolution | aborts the current `bind` pass |
//! | [`BindError`] configuration | resolution | aborts the current `bind` pass |
//! | [`InvocationError`] | event dispatch | returned to the widget's dispatcher |
//! | [`HookFailure`](crate::HookFailure) | post-binding | collected, never returned as `Err` |
//!
//! Nothing is retried: every failure here is a wiring mistake, not a
//! transient condition.

use std::fmt;

use thiserror::Error;

use crate::action::HandlerError;

/// Which adapter registry a lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterRole {
    /// [`StateChangeWrapper`](crate::StateChangeWrapper) registry.
    State,
    /// [`ActionWrapper`](crate::ActionWrapper) registry.
    Action,
}

impl fmt::Display for AdapterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State => f.write_str("state-change"),
            Self::Action => f.write_str("action"),
        }
    }
}

/// Which kind of view-model declaration a duplicate was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// A state provider.
    State,
    /// An action handler.
    Action,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State => f.write_str("state provider"),
            Self::Action => f.write_str("action handler"),
        }
    }
}

/// Coarse classification of a [`BindError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindErrorKind {
    /// A capability or adapter could not be found.
    NotFound,
    /// The declarations or registrations contradict each other.
    Configuration,
}

/// Failure to resolve or wire a binding.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindError {
    /// No candidate view-model provides the state.
    #[error("provider for state `{capability}` not found: check the view-model provider tables")]
    StateNotFound {
        /// Requested capability.
        capability: &'static str,
    },

    /// No candidate view-model handles the action.
    #[error("handler for action `{capability}` not found: check the view-model provider tables")]
    ActionNotFound {
        /// Requested capability.
        capability: &'static str,
    },

    /// No adapter is registered for the field's widget type.
    #[error("no {role} adapter for `{widget}` (field `{field}`) found")]
    AdapterNotFound {
        /// Registry consulted.
        role: AdapterRole,
        /// Widget type name.
        widget: &'static str,
        /// View field name.
        field: &'static str,
    },

    /// The adapter chosen for the field does not handle its widget type.
    #[error("{role} adapter for `{widget}` (field `{field}`) rejects that widget type")]
    AdapterMismatch {
        /// Registry or explicit adapter role.
        role: AdapterRole,
        /// Widget type name.
        widget: &'static str,
        /// View field name.
        field: &'static str,
    },

    /// A view-model declares the same capability twice.
    #[error("more than one {kind} for `{capability}` declared in `{view_model}`")]
    DuplicateProvider {
        /// Declaration kind.
        kind: ProviderKind,
        /// Duplicated capability.
        capability: &'static str,
        /// Offending view-model type.
        view_model: &'static str,
    },

    /// Several adapter families match the widget and none is registered for
    /// its exact type.
    #[error("ambiguous {role} adapter for `{widget}` (field `{field}`): {families:?} all match")]
    AmbiguousAdapter {
        /// Registry consulted.
        role: AdapterRole,
        /// Widget type name.
        widget: &'static str,
        /// View field name.
        field: &'static str,
        /// Matching family names, in registration order.
        families: Vec<&'static str>,
    },

    /// The field is already bound to this state and duplicates are rejected.
    #[error("field `{field}` is already bound to state `{capability}`")]
    AlreadyBound {
        /// View field name.
        field: &'static str,
        /// Capability bound twice.
        capability: &'static str,
    },
}

impl BindError {
    /// Coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> BindErrorKind {
        match self {
            Self::StateNotFound { .. }
            | Self::ActionNotFound { .. }
            | Self::AdapterNotFound { .. } => BindErrorKind::NotFound,
            Self::AdapterMismatch { .. }
            | Self::DuplicateProvider { .. }
            | Self::AmbiguousAdapter { .. }
            | Self::AlreadyBound { .. } => BindErrorKind::Configuration,
        }
    }

    /// Whether this is a not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == BindErrorKind::NotFound
    }

    /// Whether this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        self.kind() == BindErrorKind::Configuration
    }
}

/// Why an action handler could not run.
#[derive(Debug, Error)]
pub enum InvocationCause {
    /// The widget emitted a value of a different type than the handler takes.
    #[error("expected `{expected}` action data, got `{found}`")]
    DataMismatch {
        /// Handler's data type.
        expected: &'static str,
        /// Emitted value's type.
        found: &'static str,
    },

    /// The handler ran and reported an error.
    #[error("handler returned an error: {0}")]
    Handler(#[source] HandlerError),
}

/// An action handler could not be invoked with the emitted value.
#[derive(Debug, Error)]
#[error("handler `{view_model}::{handler}` for `{capability}` on field `{field}` failed: {cause}")]
pub struct InvocationError {
    /// Handler name as declared in the provider table.
    pub handler: &'static str,
    /// View-model type name.
    pub view_model: &'static str,
    /// Action capability.
    pub capability: &'static str,
    /// Widget type name.
    pub widget: &'static str,
    /// View field name.
    pub field: &'static str,
    /// Underlying failure.
    #[source]
    pub cause: InvocationCause,
}

impl InvocationError {
    /// Whether the failure was a payload type mismatch.
    #[must_use]
    pub fn is_data_mismatch(&self) -> bool {
        matches!(self.cause, InvocationCause::DataMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_classify() {
        let missing = BindError::StateNotFound { capability: "Name" };
        assert!(missing.is_not_found());
        let dup = BindError::DuplicateProvider {
            kind: ProviderKind::State,
            capability: "Name",
            view_model: "Vm",
        };
        assert!(dup.is_configuration());
        let mismatch = BindError::AdapterMismatch {
            role: AdapterRole::State,
            widget: "Heading",
            field: "title",
        };
        assert!(mismatch.is_configuration());
        assert_eq!(
            dup.to_string(),
            "more than one state provider for `Name` declared in `Vm`"
        );
    }

    #[test]
    fn invocation_error_names_handler_and_field() {
        let err = InvocationError {
            handler: "on_age",
            view_model: "PersonVm",
            capability: "SetAge",
            widget: "TextField",
            field: "age",
            cause: InvocationCause::DataMismatch {
                expected: "i64",
                found: "alloc::string::String",
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("on_age"));
        assert!(msg.contains("field `age`"));
        assert!(err.is_data_mismatch());
        assert!(std::error::Error::source(&err).is_some());
    }
}
