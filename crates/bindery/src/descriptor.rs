#![forbid(unsafe_code)]

//! Binding and provider descriptor tables.
//!
//! Views and view-models describe themselves with explicit, ordered tables
//! instead of being scanned:
//!
//! - A [`View`] returns [`ViewBindings`]: `(field, capability, kind)` entries.
//! - A [`ViewModel`] returns [`Providers`]: `(capability, state | handler)`
//!   entries.
//!
//! Both sides name capabilities with marker types ([`StateKind`],
//! [`ActionKind`]), so a handler's argument type is checked against the
//! capability when the table is built.
//!
//! # Invariants
//!
//! 1. Table order is declaration order; resolution never reorders entries.
//! 2. Every clone of a [`Field`] or [`BoundField`] shares one binding record
//!    and therefore one [`BindingGuard`].

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use ahash::AHashSet;

use crate::action::{ActionData, ActionKind, HandlerError};
use crate::adapter::WidgetRef;
use crate::error::{BindError, InvocationCause, ProviderKind};
use crate::guard::BindingGuard;
use crate::hooks::PostBindingHooks;
use crate::reactive::{AnyState, State, StateKind};

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Type-erased capability identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    id: TypeId,
    name: &'static str,
}

impl Capability {
    /// Identifier of state capability `K`.
    #[must_use]
    pub fn state<K: StateKind>() -> Self {
        Self {
            id: TypeId::of::<K>(),
            name: K::name(),
        }
    }

    /// Identifier of action capability `K`.
    #[must_use]
    pub fn action<K: ActionKind>() -> Self {
        Self {
            id: TypeId::of::<K>(),
            name: K::name(),
        }
    }

    /// `TypeId` of the marker type.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Name of the marker type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(crate) struct FieldRecord {
    pub(crate) guard: BindingGuard,
    states: RefCell<Vec<Capability>>,
}

/// A widget field as the composer sees it: erased widget, type identity,
/// field name and the field's binding record.
#[derive(Clone)]
pub struct BoundField {
    name: &'static str,
    widget: WidgetRef,
    widget_type: TypeId,
    widget_type_name: &'static str,
    record: Rc<FieldRecord>,
}

impl BoundField {
    /// Describe `widget` as the view field called `name`.
    #[must_use]
    pub fn new<W: Any>(name: &'static str, widget: &Rc<W>) -> Self {
        let erased: WidgetRef = Rc::clone(widget) as WidgetRef;
        Self {
            name,
            widget: erased,
            widget_type: TypeId::of::<W>(),
            widget_type_name: std::any::type_name::<W>(),
            record: Rc::new(FieldRecord::default()),
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The erased widget.
    #[must_use]
    pub fn widget(&self) -> &WidgetRef {
        &self.widget
    }

    /// `TypeId` of the concrete widget type.
    #[must_use]
    pub fn widget_type(&self) -> TypeId {
        self.widget_type
    }

    /// Name of the concrete widget type.
    #[must_use]
    pub fn widget_type_name(&self) -> &'static str {
        self.widget_type_name
    }

    /// The field's circular-update guard.
    #[must_use]
    pub fn guard(&self) -> &BindingGuard {
        &self.record.guard
    }

    /// State capabilities bound to this field so far, in binding order.
    #[must_use]
    pub fn state_bindings(&self) -> Vec<Capability> {
        self.record.states.borrow().clone()
    }

    /// Whether this field is bound to state `capability`.
    #[must_use]
    pub fn is_bound_to(&self, capability: Capability) -> bool {
        self.record.states.borrow().contains(&capability)
    }

    /// Whether `self` and `other` describe the same field.
    #[must_use]
    pub fn same_field(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.record, &other.record)
    }

    pub(crate) fn record(&self) -> &Rc<FieldRecord> {
        &self.record
    }

    pub(crate) fn note_state_binding(&self, capability: Capability) {
        self.record.states.borrow_mut().push(capability);
    }
}

impl AsRef<BoundField> for BoundField {
    fn as_ref(&self) -> &BoundField {
        self
    }
}

impl fmt::Debug for BoundField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundField")
            .field("name", &self.name)
            .field("widget", &self.widget_type_name)
            .field("guard", &self.record.guard)
            .finish()
    }
}

/// A typed widget field of a view.
///
/// Dereferences to the widget. Declare one per widget the view binds and
/// reference it from [`View::bindings`].
pub struct Field<W: Any> {
    widget: Rc<W>,
    bound: BoundField,
}

impl<W: Any> Field<W> {
    /// Wrap `widget` as the field called `name`.
    #[must_use]
    pub fn new(name: &'static str, widget: W) -> Self {
        Self::from_rc(name, Rc::new(widget))
    }

    /// Wrap an already shared widget as the field called `name`.
    #[must_use]
    pub fn from_rc(name: &'static str, widget: Rc<W>) -> Self {
        let bound = BoundField::new(name, &widget);
        Self { widget, bound }
    }

    /// The shared widget.
    #[must_use]
    pub fn widget(&self) -> &Rc<W> {
        &self.widget
    }

    /// The composer's view of this field.
    #[must_use]
    pub fn bound(&self) -> &BoundField {
        &self.bound
    }
}

impl<W: Any> Clone for Field<W> {
    fn clone(&self) -> Self {
        Self {
            widget: Rc::clone(&self.widget),
            bound: self.bound.clone(),
        }
    }
}

impl<W: Any> Deref for Field<W> {
    type Target = W;

    fn deref(&self) -> &W {
        &self.widget
    }
}

impl<W: Any> AsRef<BoundField> for Field<W> {
    fn as_ref(&self) -> &BoundField {
        &self.bound
    }
}

impl<W: Any> fmt::Debug for Field<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.bound, f)
    }
}

// ---------------------------------------------------------------------------
// View side
// ---------------------------------------------------------------------------

/// What a view field is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// The field displays a state.
    State,
    /// The field's events trigger an action, optionally from one named source.
    Action {
        /// Event source discriminator passed to the action adapter.
        source: Option<&'static str>,
    },
}

/// One entry of a [`ViewBindings`] table.
#[derive(Debug, Clone)]
pub struct BindingDescriptor {
    /// Bound field.
    pub field: BoundField,
    /// Capability the field is bound to.
    pub capability: Capability,
    /// State or action.
    pub kind: BindingKind,
}

/// Ordered binding table of a view.
#[derive(Debug, Clone, Default)]
pub struct ViewBindings {
    entries: Vec<BindingDescriptor>,
}

impl ViewBindings {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `field` to state `K`.
    #[must_use]
    pub fn state<K: StateKind, W: Any>(mut self, field: &Field<W>) -> Self {
        self.push(BindingDescriptor {
            field: field.bound().clone(),
            capability: Capability::state::<K>(),
            kind: BindingKind::State,
        });
        self
    }

    /// Bind `field`'s default event to action `K`.
    #[must_use]
    pub fn action<K: ActionKind, W: Any>(mut self, field: &Field<W>) -> Self {
        self.push(BindingDescriptor {
            field: field.bound().clone(),
            capability: Capability::action::<K>(),
            kind: BindingKind::Action { source: None },
        });
        self
    }

    /// Bind `field`'s `source` event to action `K`.
    #[must_use]
    pub fn action_from<K: ActionKind, W: Any>(
        mut self,
        field: &Field<W>,
        source: &'static str,
    ) -> Self {
        self.push(BindingDescriptor {
            field: field.bound().clone(),
            capability: Capability::action::<K>(),
            kind: BindingKind::Action {
                source: Some(source),
            },
        });
        self
    }

    /// Append a raw descriptor.
    pub fn push(&mut self, descriptor: BindingDescriptor) {
        self.entries.push(descriptor);
    }

    /// All entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &BindingDescriptor> {
        self.entries.iter()
    }

    /// State entries in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &BindingDescriptor> {
        self.entries
            .iter()
            .filter(|d| matches!(d.kind, BindingKind::State))
    }

    /// Action entries in declaration order.
    pub fn actions(&self) -> impl Iterator<Item = &BindingDescriptor> {
        self.entries
            .iter()
            .filter(|d| matches!(d.kind, BindingKind::Action { .. }))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An object exposing widget fields for binding.
pub trait View {
    /// The view's binding table.
    fn bindings(&self) -> ViewBindings;

    /// Hooks to run once all bindings are in place.
    fn post_binding_hooks(&self) -> PostBindingHooks<'_> {
        PostBindingHooks::new()
    }

    /// Name used in logs and hook failures.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// View-model side
// ---------------------------------------------------------------------------

pub(crate) type Invoker = Rc<dyn Fn(ActionData<'_>) -> Result<(), InvocationCause>>;

/// A state declared in a [`Providers`] table.
#[derive(Clone)]
pub struct StateProvider {
    capability: Capability,
    state: Rc<dyn AnyState>,
}

impl StateProvider {
    /// Provided capability.
    #[must_use]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// The provided state, type-erased.
    #[must_use]
    pub fn state(&self) -> &dyn AnyState {
        &*self.state
    }
}

impl fmt::Debug for StateProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateProvider")
            .field("capability", &self.capability.name())
            .field("value_type", &self.state.value_type_name())
            .finish()
    }
}

/// An action handler declared in a [`Providers`] table.
#[derive(Clone)]
pub struct ActionProvider {
    capability: Capability,
    handler: &'static str,
    data_type_name: &'static str,
    invoke: Invoker,
}

impl ActionProvider {
    /// Handled capability.
    #[must_use]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Handler name.
    #[must_use]
    pub fn handler(&self) -> &'static str {
        self.handler
    }

    /// Name of the data type the handler accepts.
    #[must_use]
    pub fn data_type_name(&self) -> &'static str {
        self.data_type_name
    }

    pub(crate) fn invoker(&self) -> Invoker {
        Rc::clone(&self.invoke)
    }
}

impl fmt::Debug for ActionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionProvider")
            .field("capability", &self.capability.name())
            .field("handler", &self.handler)
            .field("data_type", &self.data_type_name)
            .finish()
    }
}

/// Ordered provider table of a view-model.
#[derive(Debug, Clone, Default)]
pub struct Providers {
    states: Vec<StateProvider>,
    actions: Vec<ActionProvider>,
}

impl Providers {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide `state` as capability `K`.
    #[must_use]
    pub fn state<K: StateKind>(mut self, state: &State<K::Value>) -> Self {
        self.states.push(StateProvider {
            capability: Capability::state::<K>(),
            state: Rc::new(state.clone()),
        });
        self
    }

    /// Handle action `K` with an infallible callback.
    #[must_use]
    pub fn action<K: ActionKind>(
        self,
        handler: &'static str,
        f: impl Fn(&K::Data) + 'static,
    ) -> Self {
        self.try_action::<K, HandlerError>(handler, move |data| {
            f(data);
            Ok(())
        })
    }

    /// Handle action `K` with a fallible callback.
    #[must_use]
    pub fn try_action<K, E>(
        mut self,
        handler: &'static str,
        f: impl Fn(&K::Data) -> Result<(), E> + 'static,
    ) -> Self
    where
        K: ActionKind,
        E: Into<HandlerError>,
    {
        let invoke = invoker(move |data| {
            let value = data
                .downcast_ref::<K::Data>()
                .ok_or(InvocationCause::DataMismatch {
                    expected: std::any::type_name::<K::Data>(),
                    found: data.type_name(),
                })?;
            f(value).map_err(|e| InvocationCause::Handler(e.into()))
        });
        self.actions.push(ActionProvider {
            capability: Capability::action::<K>(),
            handler,
            data_type_name: std::any::type_name::<K::Data>(),
            invoke,
        });
        self
    }

    /// Declared states in order.
    #[must_use]
    pub fn states(&self) -> &[StateProvider] {
        &self.states
    }

    /// Declared action handlers in order.
    #[must_use]
    pub fn actions(&self) -> &[ActionProvider] {
        &self.actions
    }

    /// First state provided as `capability`.
    #[must_use]
    pub fn find_state(&self, capability: Capability) -> Option<&StateProvider> {
        self.states.iter().find(|p| p.capability == capability)
    }

    /// First handler for `capability`.
    #[must_use]
    pub fn find_action(&self, capability: Capability) -> Option<&ActionProvider> {
        self.actions.iter().find(|p| p.capability == capability)
    }

    /// Check that no capability is declared twice.
    ///
    /// # Errors
    ///
    /// [`BindError::DuplicateProvider`] naming the first duplicate found,
    /// states before actions.
    pub fn check_unique(&self, view_model: &'static str) -> Result<(), BindError> {
        let mut seen = AHashSet::new();
        for provider in &self.states {
            if !seen.insert(provider.capability.id()) {
                return Err(BindError::DuplicateProvider {
                    kind: ProviderKind::State,
                    capability: provider.capability.name(),
                    view_model,
                });
            }
        }
        seen.clear();
        for provider in &self.actions {
            if !seen.insert(provider.capability.id()) {
                return Err(BindError::DuplicateProvider {
                    kind: ProviderKind::Action,
                    capability: provider.capability.name(),
                    view_model,
                });
            }
        }
        Ok(())
    }
}

fn invoker(f: impl Fn(ActionData<'_>) -> Result<(), InvocationCause> + 'static) -> Invoker {
    Rc::new(f)
}

/// An object exposing states and action handlers.
pub trait ViewModel {
    /// The view-model's provider table.
    fn providers(&self) -> Providers;

    /// Hooks to run once the view is bound.
    fn post_binding_hooks(&self) -> PostBindingHooks<'_> {
        PostBindingHooks::new()
    }

    /// Name used in errors, logs and hook failures.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{action_kind, state_kind};

    state_kind!(Title: String);
    state_kind!(Count: u32);
    action_kind!(Rename: String);

    struct Label;

    #[test]
    fn field_clones_share_record() {
        let field = Field::new("title", Label);
        let copy = field.clone();
        assert!(field.bound().same_field(copy.bound()));
        assert!(!field.bound().same_field(Field::new("title", Label).bound()));
        assert_eq!(field.bound().widget_type(), TypeId::of::<Label>());
    }

    #[test]
    fn view_bindings_keep_order_and_split_kinds() {
        let a = Field::new("a", Label);
        let b = Field::new("b", Label);
        let bindings = ViewBindings::new()
            .action::<Rename, _>(&a)
            .state::<Title, _>(&a)
            .action_from::<Rename, _>(&b, "double_click")
            .state::<Count, _>(&b);

        assert_eq!(bindings.len(), 4);
        let states: Vec<_> = bindings.states().map(|d| d.field.name()).collect();
        assert_eq!(states, vec!["a", "b"]);
        let sources: Vec<_> = bindings.actions().map(|d| d.kind).collect();
        assert_eq!(
            sources,
            vec![
                BindingKind::Action { source: None },
                BindingKind::Action {
                    source: Some("double_click")
                },
            ]
        );
    }

    #[test]
    fn duplicate_state_provider_detected() {
        let first = State::new(String::from("one"));
        let second = State::new(String::from("two"));
        let providers = Providers::new()
            .state::<Title>(&first)
            .state::<Title>(&second);

        let err = providers.check_unique("Vm").unwrap_err();
        assert!(matches!(
            err,
            BindError::DuplicateProvider {
                kind: ProviderKind::State,
                ..
            }
        ));
        assert_eq!(first.listener_count(), 0);
        assert_eq!(second.listener_count(), 0);
    }

    #[test]
    fn duplicate_action_handler_detected() {
        let providers = Providers::new()
            .action::<Rename>("first", |_| {})
            .action::<Rename>("second", |_| {});
        assert!(providers.check_unique("Vm").is_err());
    }

    #[test]
    fn same_capability_in_both_tables_is_fine() {
        let providers = Providers::new()
            .state::<Title>(&State::new(String::new()))
            .state::<Count>(&State::new(0))
            .action::<Rename>("rename", |_| {});
        assert!(providers.check_unique("Vm").is_ok());
        assert!(providers.find_state(Capability::state::<Count>()).is_some());
        assert!(providers.find_action(Capability::action::<Rename>()).is_some());
    }

    #[test]
    fn typed_handler_rejects_foreign_payload() {
        let providers = Providers::new().action::<Rename>("rename", |_| {});
        let provider = &providers.actions()[0];
        let invoke = provider.invoker();

        assert!(invoke(ActionData::new(&String::from("ok"))).is_ok());
        match invoke(ActionData::new(&7_i64)) {
            Err(InvocationCause::DataMismatch { expected, found }) => {
                assert_eq!(expected, "alloc::string::String");
                assert_eq!(found, "i64");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn fallible_handler_error_is_wrapped() {
        let providers =
            Providers::new().try_action::<Rename, _>("rename", |name: &String| {
                if name.is_empty() {
                    Err("name must not be empty")
                } else {
                    Ok(())
                }
            });
        let invoke = providers.actions()[0].invoker();
        let result = invoke(ActionData::new(&String::new()));
        assert!(matches!(result, Err(InvocationCause::Handler(_))));
    }
}
