#![forbid(unsafe_code)]

//! The binding composer.
//!
//! [`ViewModelComposer`] owns the adapter registries and performs binding:
//!
//! 1. Every state entry of the view's [`ViewBindings`] is resolved and wired.
//! 2. Every action entry is resolved and wired.
//! 3. The view's post-binding hooks run, then each view-model's, in argument
//!    order.
//!
//! Binding is fail-fast: the first resolution error aborts the pass and
//! bindings made before it stay in place.
//!
//! # Resolution
//!
//! For each entry the candidate view-models are tried in argument order. A
//! candidate's whole provider table is checked for duplicates before it is
//! searched, so a broken view-model is reported even when the capability
//! being looked up is not the duplicated one. The first candidate providing
//! the capability wins.
//!
//! # Circular updates
//!
//! Wiring a state arms the field's [`BindingGuard`](crate::BindingGuard).
//! Action handlers attached to an armed field skip invocations that arrive
//! while an earlier invocation on the same field is still running.

use std::any::Any;
use std::rc::Rc;

use tracing::{debug, debug_span, trace};

use crate::action::{ActionHandler, ActionKind};
use crate::adapter::{ActionWrapper, AdapterRegistry, StateChangeWrapper};
use crate::config::{ComposerConfig, DuplicateBindingPolicy};
use crate::descriptor::{
    ActionProvider, BindingKind, BoundField, Capability, StateProvider, View, ViewModel,
};
use crate::error::{AdapterRole, BindError, InvocationError};
use crate::hooks::HookFailure;
use crate::reactive::{State, StateKind};

/// Outcome of a successful [`ViewModelComposer::bind`].
#[derive(Debug, Default)]
pub struct BindReport {
    /// Number of state bindings wired.
    pub states_bound: usize,
    /// Number of action bindings wired.
    pub actions_bound: usize,
    /// Post-binding hooks that reported an error.
    pub hook_failures: Vec<HookFailure>,
}

impl BindReport {
    /// Whether every hook succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.hook_failures.is_empty()
    }
}

/// Wires views to view-models through registered widget adapters.
#[derive(Debug)]
pub struct ViewModelComposer {
    state_adapters: AdapterRegistry<dyn StateChangeWrapper>,
    action_adapters: AdapterRegistry<dyn ActionWrapper>,
    config: ComposerConfig,
}

impl Default for ViewModelComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewModelComposer {
    /// Create a composer with no adapters and the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ComposerConfig::default())
    }

    /// Create a composer with no adapters and the given configuration.
    #[must_use]
    pub fn with_config(config: ComposerConfig) -> Self {
        Self {
            state_adapters: AdapterRegistry::new(AdapterRole::State),
            action_adapters: AdapterRegistry::new(AdapterRole::Action),
            config,
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Replace the configuration for subsequent bindings.
    pub fn set_config(&mut self, config: ComposerConfig) {
        self.config = config;
    }

    // -- Adapter registration ----------------------------------------------

    /// Register the state adapter for widgets of type `W`.
    ///
    /// Returns the adapter it replaces, if any.
    pub fn register_state_adapter<W: Any>(
        &mut self,
        adapter: impl StateChangeWrapper + 'static,
    ) -> Option<Rc<dyn StateChangeWrapper>> {
        self.state_adapters.insert::<W>(Rc::new(adapter))
    }

    /// Register the action adapter for widgets of type `W`.
    ///
    /// Returns the adapter it replaces, if any.
    pub fn register_action_adapter<W: Any>(
        &mut self,
        adapter: impl ActionWrapper + 'static,
    ) -> Option<Rc<dyn ActionWrapper>> {
        self.action_adapters.insert::<W>(Rc::new(adapter))
    }

    /// Register a state adapter for every widget `matcher` accepts.
    ///
    /// Families are consulted only when no exact-type adapter exists.
    pub fn register_state_family(
        &mut self,
        name: &'static str,
        matcher: impl Fn(&dyn Any) -> bool + 'static,
        adapter: impl StateChangeWrapper + 'static,
    ) -> Option<Rc<dyn StateChangeWrapper>> {
        self.state_adapters.insert_family(name, matcher, Rc::new(adapter))
    }

    /// Register an action adapter for every widget `matcher` accepts.
    pub fn register_action_family(
        &mut self,
        name: &'static str,
        matcher: impl Fn(&dyn Any) -> bool + 'static,
        adapter: impl ActionWrapper + 'static,
    ) -> Option<Rc<dyn ActionWrapper>> {
        self.action_adapters.insert_family(name, matcher, Rc::new(adapter))
    }

    /// The state adapter registry.
    #[must_use]
    pub fn state_adapters(&self) -> &AdapterRegistry<dyn StateChangeWrapper> {
        &self.state_adapters
    }

    /// The action adapter registry.
    #[must_use]
    pub fn action_adapters(&self) -> &AdapterRegistry<dyn ActionWrapper> {
        &self.action_adapters
    }

    // -- Binding -----------------------------------------------------------

    /// Bind every entry of `view`'s binding table against `view_models`,
    /// then run post-binding hooks.
    ///
    /// # Errors
    ///
    /// The first [`BindError`] met while wiring. Bindings wired before it are
    /// kept and no hooks run.
    pub fn bind(
        &self,
        view: &dyn View,
        view_models: &[&dyn ViewModel],
    ) -> Result<BindReport, BindError> {
        let _span = debug_span!(
            "bind",
            view = view.type_name(),
            view_models = view_models.len()
        )
        .entered();

        let bindings = view.bindings();
        let mut report = BindReport::default();

        for descriptor in bindings.states() {
            self.wire_state(&descriptor.field, descriptor.capability, None, view_models)?;
            report.states_bound += 1;
        }
        for descriptor in bindings.actions() {
            let BindingKind::Action { source } = descriptor.kind else {
                continue;
            };
            self.wire_action(
                &descriptor.field,
                descriptor.capability,
                source,
                None,
                view_models,
            )?;
            report.actions_bound += 1;
        }

        report
            .hook_failures
            .extend(view.post_binding_hooks().run(view.type_name()));
        for view_model in view_models {
            report
                .hook_failures
                .extend(view_model.post_binding_hooks().run(view_model.type_name()));
        }

        debug!(
            states = report.states_bound,
            actions = report.actions_bound,
            hook_failures = report.hook_failures.len(),
            "bind complete"
        );
        Ok(report)
    }

    /// Bind `field` to state `K` using the registered adapter for its widget.
    ///
    /// # Errors
    ///
    /// - [`BindError::StateNotFound`] if no view-model provides `K`.
    /// - [`BindError::AdapterNotFound`] / [`BindError::AmbiguousAdapter`] if
    ///   the widget has no unique adapter.
    /// - [`BindError::AdapterMismatch`] if that adapter rejects the widget.
    /// - [`BindError::DuplicateProvider`] if a searched view-model is broken.
    /// - [`BindError::AlreadyBound`] under [`DuplicateBindingPolicy::Reject`].
    pub fn bind_state<K: StateKind>(
        &self,
        field: &impl AsRef<BoundField>,
        view_models: &[&dyn ViewModel],
    ) -> Result<(), BindError> {
        self.wire_state(field.as_ref(), Capability::state::<K>(), None, view_models)
    }

    /// Bind `field` to state `K` through `adapter`, bypassing the registry.
    ///
    /// # Errors
    ///
    /// As [`bind_state`](Self::bind_state), minus adapter lookup failures.
    pub fn bind_state_with<K: StateKind>(
        &self,
        field: &impl AsRef<BoundField>,
        adapter: &dyn StateChangeWrapper,
        view_models: &[&dyn ViewModel],
    ) -> Result<(), BindError> {
        self.wire_state(
            field.as_ref(),
            Capability::state::<K>(),
            Some(adapter),
            view_models,
        )
    }

    /// Bind `field`'s `source` event (or its default event) to action `K`.
    ///
    /// # Errors
    ///
    /// - [`BindError::ActionNotFound`] if no view-model handles `K`.
    /// - [`BindError::AdapterNotFound`] / [`BindError::AmbiguousAdapter`] if
    ///   the widget has no unique adapter.
    /// - [`BindError::AdapterMismatch`] if that adapter rejects the widget.
    /// - [`BindError::DuplicateProvider`] if a searched view-model is broken.
    pub fn bind_action<K: ActionKind>(
        &self,
        field: &impl AsRef<BoundField>,
        source: Option<&'static str>,
        view_models: &[&dyn ViewModel],
    ) -> Result<(), BindError> {
        self.wire_action(
            field.as_ref(),
            Capability::action::<K>(),
            source,
            None,
            view_models,
        )
    }

    /// Bind `field` to action `K` through `adapter`, bypassing the registry.
    ///
    /// # Errors
    ///
    /// As [`bind_action`](Self::bind_action), minus adapter lookup failures.
    pub fn bind_action_with<K: ActionKind>(
        &self,
        field: &impl AsRef<BoundField>,
        source: Option<&'static str>,
        adapter: &dyn ActionWrapper,
        view_models: &[&dyn ViewModel],
    ) -> Result<(), BindError> {
        self.wire_action(
            field.as_ref(),
            Capability::action::<K>(),
            source,
            Some(adapter),
            view_models,
        )
    }

    /// The typed state the first view-model provides as `K`.
    ///
    /// # Errors
    ///
    /// [`BindError::StateNotFound`] or [`BindError::DuplicateProvider`], as
    /// for [`bind_state`](Self::bind_state).
    pub fn resolve_state<K: StateKind>(
        &self,
        view_models: &[&dyn ViewModel],
    ) -> Result<State<K::Value>, BindError> {
        let capability = Capability::state::<K>();
        let (_, provider) = find_state(capability, view_models)?;
        provider
            .state()
            .as_any()
            .downcast_ref::<State<K::Value>>()
            .cloned()
            .ok_or(BindError::StateNotFound {
                capability: capability.name(),
            })
    }

    // -- Wiring ------------------------------------------------------------

    fn wire_state(
        &self,
        field: &BoundField,
        capability: Capability,
        adapter: Option<&dyn StateChangeWrapper>,
        view_models: &[&dyn ViewModel],
    ) -> Result<(), BindError> {
        let (view_model, provider) = find_state(capability, view_models)?;

        let registered;
        let adapter = match adapter {
            Some(adapter) => adapter,
            None => {
                registered = self.state_adapters.resolve(field)?;
                &*registered
            }
        };
        ensure_accepts(adapter.accepts(&**field.widget()), AdapterRole::State, field)?;

        if self.config.duplicate_bindings == DuplicateBindingPolicy::Reject
            && field.is_bound_to(capability)
        {
            return Err(BindError::AlreadyBound {
                field: field.name(),
                capability: capability.name(),
            });
        }

        field.guard().arm();
        field.note_state_binding(capability);

        let listener = adapter.state_change_listener(field.widget());
        let state = provider.state();
        state.add_any_listener(&listener);
        if self.config.push_initial_state {
            state.notify_any_listener(&listener);
        }

        debug!(
            field = field.name(),
            widget = field.widget_type_name(),
            capability = capability.name(),
            view_model,
            "state bound"
        );
        Ok(())
    }

    fn wire_action(
        &self,
        field: &BoundField,
        capability: Capability,
        source: Option<&'static str>,
        adapter: Option<&dyn ActionWrapper>,
        view_models: &[&dyn ViewModel],
    ) -> Result<(), BindError> {
        let (view_model, provider) = find_action(capability, view_models)?;

        let registered;
        let adapter = match adapter {
            Some(adapter) => adapter,
            None => {
                registered = self.action_adapters.resolve(field)?;
                &*registered
            }
        };
        ensure_accepts(adapter.accepts(&**field.widget()), AdapterRole::Action, field)?;

        let handler = guarded_handler(field, view_model, &provider);
        adapter.add_action_handler(field.widget(), handler, source);

        debug!(
            field = field.name(),
            widget = field.widget_type_name(),
            capability = capability.name(),
            handler = provider.handler(),
            source,
            view_model,
            "action bound"
        );
        Ok(())
    }
}

fn ensure_accepts(accepted: bool, role: AdapterRole, field: &BoundField) -> Result<(), BindError> {
    if accepted {
        Ok(())
    } else {
        Err(BindError::AdapterMismatch {
            role,
            widget: field.widget_type_name(),
            field: field.name(),
        })
    }
}

fn find_state(
    capability: Capability,
    view_models: &[&dyn ViewModel],
) -> Result<(&'static str, StateProvider), BindError> {
    for view_model in view_models {
        let providers = view_model.providers();
        providers.check_unique(view_model.type_name())?;
        if let Some(provider) = providers.find_state(capability) {
            return Ok((view_model.type_name(), provider.clone()));
        }
    }
    Err(BindError::StateNotFound {
        capability: capability.name(),
    })
}

fn find_action(
    capability: Capability,
    view_models: &[&dyn ViewModel],
) -> Result<(&'static str, ActionProvider), BindError> {
    for view_model in view_models {
        let providers = view_model.providers();
        providers.check_unique(view_model.type_name())?;
        if let Some(provider) = providers.find_action(capability) {
            return Ok((view_model.type_name(), provider.clone()));
        }
    }
    Err(BindError::ActionNotFound {
        capability: capability.name(),
    })
}

/// Wrap `provider`'s handler so re-entrant invocations on `field` are
/// dropped while its guard is propagating.
fn guarded_handler(
    field: &BoundField,
    view_model: &'static str,
    provider: &ActionProvider,
) -> ActionHandler {
    let record = Rc::clone(field.record());
    let invoke = provider.invoker();
    let handler = provider.handler();
    let capability = provider.capability().name();
    let widget = field.widget_type_name();
    let field = field.name();

    ActionHandler::new(move |data| {
        if record.guard.is_propagating() {
            trace!(field, capability, "re-entrant action suppressed");
            return Ok(());
        }
        let _scope = record.guard.enter();
        invoke(data).map_err(|cause| {
            let error = InvocationError {
                handler,
                view_model,
                capability,
                widget,
                field,
                cause,
            };
            debug!(error = %error, "action invocation failed");
            error
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionData;
    use crate::adapter::{action_adapter, state_adapter};
    use crate::descriptor::{Field, Providers, ViewBindings};
    use crate::error::InvocationCause;
    use crate::hooks::PostBindingHooks;
    use crate::{action_kind, state_kind};
    use std::cell::{Cell, RefCell};
    use std::sync::{Arc, Mutex};

    state_kind!(Text: String);
    state_kind!(Total: i64);
    action_kind!(Rename: String);
    action_kind!(Reset: ());

    // -- In-memory widgets ---------------------------------------------------

    #[derive(Default)]
    struct Label {
        shown: RefCell<Vec<String>>,
    }

    #[derive(Default)]
    struct Entry {
        value: RefCell<String>,
        handlers: RefCell<Vec<ActionHandler>>,
    }

    impl Entry {
        /// Set the value and fire change handlers, like a toolkit would for
        /// both user edits and programmatic updates.
        fn set_text(&self, text: &str) -> Vec<Result<(), InvocationError>> {
            *self.value.borrow_mut() = text.to_owned();
            let handlers = self.handlers.borrow().clone();
            let value = text.to_owned();
            handlers.iter().map(|h| h.handle_value(&value)).collect()
        }
    }

    fn composer() -> ViewModelComposer {
        composer_with(ComposerConfig::default())
    }

    fn composer_with(config: ComposerConfig) -> ViewModelComposer {
        let mut composer = ViewModelComposer::with_config(config);
        composer.register_state_adapter::<Label>(state_adapter(|label: &Label, value| {
            if let Some(text) = value.downcast_ref::<String>() {
                label.shown.borrow_mut().push(text.clone());
            }
        }));
        composer.register_state_adapter::<Entry>(state_adapter(|entry: &Entry, value| {
            if let Some(text) = value.downcast_ref::<String>() {
                let _ = entry.set_text(text);
            }
        }));
        composer.register_action_adapter::<Entry>(action_adapter(
            |entry: &Entry, handler, _source| entry.handlers.borrow_mut().push(handler),
        ));
        composer
    }

    // -- View-models -----------------------------------------------------------

    struct Profile {
        name: State<String>,
        renames: Rc<Cell<usize>>,
        hooks_ran: Cell<bool>,
    }

    impl Profile {
        fn new(name: &str) -> Self {
            Self {
                name: State::new(name.to_owned()),
                renames: Rc::new(Cell::new(0)),
                hooks_ran: Cell::new(false),
            }
        }
    }

    impl ViewModel for Profile {
        fn providers(&self) -> Providers {
            let name = self.name.clone();
            let renames = Rc::clone(&self.renames);
            Providers::new()
                .state::<Text>(&self.name)
                .action::<Rename>("rename", move |new_name: &String| {
                    renames.set(renames.get() + 1);
                    name.set(new_name.to_uppercase());
                })
        }

        fn post_binding_hooks(&self) -> PostBindingHooks<'_> {
            PostBindingHooks::new().hook("mark", || self.hooks_ran.set(true))
        }
    }

    struct Broken;

    impl ViewModel for Broken {
        fn providers(&self) -> Providers {
            Providers::new()
                .action::<Reset>("reset", |_| {})
                .action::<Reset>("reset_again", |_| {})
        }
    }

    struct ProfileView {
        title: Field<Label>,
        name: Field<Entry>,
    }

    impl ProfileView {
        fn new() -> Self {
            Self {
                title: Field::new("title", Label::default()),
                name: Field::new("name", Entry::default()),
            }
        }
    }

    impl View for ProfileView {
        fn bindings(&self) -> ViewBindings {
            ViewBindings::new()
                .state::<Text, _>(&self.title)
                .state::<Text, _>(&self.name)
                .action::<Rename, _>(&self.name)
        }
    }

    // -- Tests ---------------------------------------------------------------

    #[test]
    fn bind_wires_states_then_actions_and_runs_hooks() {
        let vm = Profile::new("ada");
        let view = ProfileView::new();

        let report = composer().bind(&view, &[&vm]).unwrap();

        assert_eq!(report.states_bound, 2);
        assert_eq!(report.actions_bound, 1);
        assert!(report.is_clean());
        assert!(vm.hooks_ran.get());
        assert_eq!(*view.title.shown.borrow(), vec!["ada"]);
        assert_eq!(*view.name.value.borrow(), "ada");
    }

    #[test]
    fn guard_suppresses_feedback_and_recovers() {
        let vm = Profile::new("ada");
        let view = ProfileView::new();
        composer().bind(&view, &[&vm]).unwrap();

        // Handler upper-cases and sets the state; the state pushes into the
        // entry, which re-fires its change event. That nested event is dropped.
        let results = view.name.set_text("grace");
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(vm.renames.get(), 1);
        assert_eq!(*vm.name.get(), "GRACE");
        assert_eq!(*view.name.value.borrow(), "GRACE");
        assert!(!view.name.bound().guard().is_propagating());

        let _ = view.name.set_text("linus");
        assert_eq!(vm.renames.get(), 2);
        assert_eq!(*vm.name.get(), "LINUS");
    }

    #[test]
    fn unarmed_field_is_never_suppressed() {
        struct ActionOnly {
            name: Field<Entry>,
        }
        impl View for ActionOnly {
            fn bindings(&self) -> ViewBindings {
                ViewBindings::new().action::<Rename, _>(&self.name)
            }
        }

        let vm = Profile::new("ada");
        let view = ActionOnly {
            name: Field::new("name", Entry::default()),
        };
        composer().bind(&view, &[&vm]).unwrap();

        assert!(!view.name.bound().guard().is_armed());
        let _ = view.name.set_text("grace");
        assert_eq!(vm.renames.get(), 1);
    }

    #[test]
    fn push_initial_state_can_be_disabled() {
        let vm = Profile::new("ada");
        let title = Field::new("title", Label::default());
        composer_with(ComposerConfig::new().push_initial_state(false))
            .bind_state::<Text>(&title, &[&vm])
            .unwrap();

        assert!(title.shown.borrow().is_empty());
        assert_eq!(vm.name.listener_count(), 1);
        vm.name.set("bo".to_owned());
        assert_eq!(*title.shown.borrow(), vec!["bo"]);
    }

    #[test]
    fn duplicate_binding_policy() {
        let vm = Profile::new("ada");
        let label = Field::new("title", Label::default());

        let allow = composer();
        allow.bind_state::<Text>(&label, &[&vm]).unwrap();
        allow.bind_state::<Text>(&label, &[&vm]).unwrap();
        assert_eq!(vm.name.listener_count(), 2);
        vm.name.set("x".to_owned());
        assert_eq!(*label.shown.borrow(), vec!["ada", "ada", "x", "x"]);

        let reject = composer_with(
            ComposerConfig::new().duplicate_bindings(DuplicateBindingPolicy::Reject),
        );
        let err = reject.bind_state::<Text>(&label, &[&vm]).unwrap_err();
        assert!(matches!(err, BindError::AlreadyBound { field: "title", .. }));
        assert!(err.is_configuration());
        assert_eq!(vm.name.listener_count(), 2);
    }

    #[test]
    fn missing_state_and_action_are_not_found() {
        let vm = Broken;
        let label = Field::new("title", Label::default());
        let entry = Field::new("name", Entry::default());
        let composer = composer();

        let state_err = composer.bind_state::<Text>(&label, &[]).unwrap_err();
        assert!(matches!(state_err, BindError::StateNotFound { .. }));

        let profile = Profile::new("ada");
        let action_err = composer
            .bind_action::<Reset>(&entry, None, &[&profile])
            .unwrap_err();
        assert!(matches!(action_err, BindError::ActionNotFound { .. }));

        // A broken candidate is reported even though `Rename` is not the
        // duplicated capability.
        let dup_err = composer
            .bind_action::<Rename>(&entry, None, &[&vm, &profile])
            .unwrap_err();
        assert!(matches!(dup_err, BindError::DuplicateProvider { .. }));
    }

    #[test]
    fn broken_candidate_after_winner_is_not_inspected() {
        let profile = Profile::new("ada");
        let entry = Field::new("name", Entry::default());
        composer()
            .bind_action::<Rename>(&entry, None, &[&profile, &Broken])
            .unwrap();
    }

    #[test]
    fn explicit_adapter_bypasses_registry() {
        struct Gauge(Cell<usize>);
        let vm = Profile::new("ada");
        let gauge = Field::new("gauge", Gauge(Cell::new(0)));
        let adapter = state_adapter(|gauge: &Gauge, _value| gauge.0.set(gauge.0.get() + 1));

        let composer = composer();
        let err = composer.bind_state::<Text>(&gauge, &[&vm]).unwrap_err();
        assert!(matches!(err, BindError::AdapterNotFound { .. }));
        assert_eq!(vm.name.listener_count(), 0);

        composer
            .bind_state_with::<Text>(&gauge, &adapter, &[&vm])
            .unwrap();
        assert_eq!(gauge.0.get(), 1);
    }

    #[test]
    fn family_adapter_for_another_widget_type_is_rejected() {
        struct Badge;
        let vm = Profile::new("ada");
        let badge = Field::new("badge", Badge);
        let mut composer = composer();
        composer.register_state_family(
            "display",
            |w| w.is::<Label>() || w.is::<Badge>(),
            state_adapter(|label: &Label, _value| label.shown.borrow_mut().clear()),
        );
        composer.register_action_family(
            "editable",
            |w| w.is::<Badge>(),
            action_adapter(|entry: &Entry, handler, _source| {
                entry.handlers.borrow_mut().push(handler);
            }),
        );

        let err = composer.bind_state::<Text>(&badge, &[&vm]).unwrap_err();
        assert!(matches!(
            err,
            BindError::AdapterMismatch {
                role: AdapterRole::State,
                field: "badge",
                ..
            }
        ));
        assert!(err.is_configuration());
        assert_eq!(vm.name.listener_count(), 0);
        assert!(!badge.bound().guard().is_armed());
        assert!(!badge.bound().is_bound_to(Capability::state::<Text>()));

        let err = composer
            .bind_action::<Rename>(&badge, None, &[&vm])
            .unwrap_err();
        assert!(matches!(
            err,
            BindError::AdapterMismatch {
                role: AdapterRole::Action,
                ..
            }
        ));
    }

    #[test]
    fn explicit_adapter_for_another_widget_type_is_rejected() {
        let vm = Profile::new("ada");
        let title = Field::new("title", Label::default());
        let adapter = state_adapter(|entry: &Entry, _value| entry.value.borrow_mut().clear());

        let err = composer()
            .bind_state_with::<Text>(&title, &adapter, &[&vm])
            .unwrap_err();
        assert!(matches!(err, BindError::AdapterMismatch { .. }));
        assert_eq!(vm.name.listener_count(), 0);
    }

    #[test]
    fn explicit_action_adapter_receives_source() {
        let vm = Profile::new("ada");
        let entry = Field::new("name", Entry::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let adapter = action_adapter(move |entry: &Entry, handler, source: Option<&str>| {
            sink.borrow_mut().push(source.map(str::to_owned));
            entry.handlers.borrow_mut().push(handler);
        });

        composer()
            .bind_action_with::<Rename>(&entry, Some("submit"), &adapter, &[&vm])
            .unwrap();
        assert_eq!(*seen.borrow(), vec![Some("submit".to_owned())]);
    }

    #[test]
    fn resolve_state_returns_shared_cell() {
        let vm = Profile::new("ada");
        let state = composer().resolve_state::<Text>(&[&vm]).unwrap();
        assert!(state.ptr_eq(&vm.name));
        assert!(composer().resolve_state::<Total>(&[&vm]).is_err());
    }

    #[test]
    fn invocation_error_names_handler_and_field() {
        let vm = Profile::new("ada");
        let entry = Field::new("name", Entry::default());
        composer()
            .bind_action::<Rename>(&entry, None, &[&vm])
            .unwrap();

        let handler = entry.handlers.borrow()[0].clone();
        let err = handler.handle(ActionData::new(&42_i32)).unwrap_err();
        assert_eq!(err.handler, "rename");
        assert_eq!(err.field, "name");
        assert!(err.view_model.ends_with("Profile"));
        assert!(matches!(err.cause, InvocationCause::DataMismatch { .. }));
        assert!(!entry.bound().guard().is_propagating());
    }

    // -- Logging -------------------------------------------------------------

    #[derive(Clone, Default)]
    struct WarnCapture(Arc<Mutex<Vec<String>>>);

    struct HookVisitor(Option<String>);

    impl tracing::field::Visit for HookVisitor {
        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            if field.name() == "hook" {
                self.0 = Some(value.to_owned());
            }
        }

        fn record_debug(&mut self, _field: &tracing::field::Field, _value: &dyn std::fmt::Debug) {}
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCapture {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut visitor = HookVisitor(None);
            event.record(&mut visitor);
            if let (Some(hook), Ok(mut hooks)) = (visitor.0, self.0.lock()) {
                hooks.push(hook);
            }
        }
    }

    #[test]
    fn hook_failures_are_collected_and_logged() {
        use tracing_subscriber::layer::SubscriberExt;

        struct FlakyView {
            title: Field<Label>,
        }
        impl View for FlakyView {
            fn bindings(&self) -> ViewBindings {
                ViewBindings::new().state::<Text, _>(&self.title)
            }
            fn post_binding_hooks(&self) -> PostBindingHooks<'_> {
                PostBindingHooks::new()
                    .try_hook("focus", || Err("no window"))
                    .hook("layout", || {})
            }
        }

        let capture = WarnCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let vm = Profile::new("ada");
        let view = FlakyView {
            title: Field::new("title", Label::default()),
        };

        let report = tracing::subscriber::with_default(subscriber, || {
            composer().bind(&view, &[&vm]).unwrap()
        });

        assert_eq!(report.hook_failures.len(), 1);
        assert_eq!(report.hook_failures[0].hook, "focus");
        assert!(vm.hooks_ran.get());
        let logged = capture.0.lock().unwrap().clone();
        assert_eq!(logged, vec!["focus".to_owned()]);
    }
}
