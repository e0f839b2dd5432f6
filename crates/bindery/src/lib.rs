#![forbid(unsafe_code)]

//! Typed view / view-model binding engine.
//!
//! A *view* exposes widget fields; a *view-model* exposes observable
//! [`State`] cells and action handlers. The [`ViewModelComposer`] reads the
//! view's [`ViewBindings`] table, resolves every entry against the
//! [`Providers`] tables of the supplied view-models, and wires the two sides
//! together through per-widget-type adapters:
//!
//! - state → widget: a [`StateChangeWrapper`] turns state changes into widget
//!   updates ("display this value").
//! - widget → action: an [`ActionWrapper`] subscribes a guarded
//!   [`ActionHandler`] to the widget's change events.
//!
//! Capabilities are marker types declared with [`state_kind!`] and
//! [`action_kind!`]; a binding and a provider match when they name the same
//! marker type.
//!
//! # Example
//!
//! ```ignore
//! use bindery::{Field, Providers, State, View, ViewBindings, ViewModel, ViewModelComposer};
//!
//! bindery::state_kind!(pub Greeting: String);
//!
//! struct Vm { greeting: State<String> }
//! impl ViewModel for Vm {
//!     fn providers(&self) -> Providers {
//!         Providers::new().state::<Greeting>(&self.greeting)
//!     }
//! }
//!
//! struct Screen { label: Field<Label> }
//! impl View for Screen {
//!     fn bindings(&self) -> ViewBindings {
//!         ViewBindings::new().state::<Greeting, _>(&self.label)
//!     }
//! }
//!
//! let mut composer = ViewModelComposer::new();
//! composer.register_state_adapter::<Label>(state_adapter(|label: &Label, v| label.show(v)));
//! let report = composer.bind(&screen, &[&vm])?;
//! ```
//!
//! # Threading
//!
//! Everything is single-threaded and synchronous: `Rc`-based, `!Send`, and a
//! `State::set` returns only after every listener has returned.

pub mod action;
pub mod adapter;
pub mod composer;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod guard;
pub mod hooks;
pub mod reactive;

pub use action::{ActionData, ActionHandler, ActionKind, HandlerError};
pub use adapter::{
    ActionWrapper, AdapterRegistry, FnActionAdapter, FnStateAdapter, StateChangeWrapper,
    WidgetRef, action_adapter, state_adapter,
};
pub use composer::{BindReport, ViewModelComposer};
#[cfg(feature = "policy-config")]
pub use config::ConfigError;
pub use config::{ComposerConfig, DuplicateBindingPolicy};
pub use descriptor::{
    ActionProvider, BindingDescriptor, BindingKind, BoundField, Capability, Field, Providers,
    StateProvider, View, ViewBindings, ViewModel,
};
pub use error::{
    AdapterRole, BindError, BindErrorKind, InvocationCause, InvocationError, ProviderKind,
};
pub use guard::{BindingGuard, PropagationScope};
pub use hooks::{HookError, HookFailure, PostBindingHooks};
pub use reactive::{AnyState, State, StateChangeListener, StateKind};
