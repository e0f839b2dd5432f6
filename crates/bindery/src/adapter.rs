#![forbid(unsafe_code)]

//! Widget adapters and their registry.
//!
//! The composer never touches widgets directly. A [`StateChangeWrapper`]
//! builds the listener that pushes state into a widget, and an
//! [`ActionWrapper`] subscribes a handler to a widget's change events.
//!
//! # Resolution
//!
//! [`AdapterRegistry::resolve`] looks for an adapter in two steps:
//!
//! 1. An adapter registered for the widget's exact type wins.
//! 2. Otherwise every *family* (a named matcher over `&dyn Any`, e.g. "any
//!    text widget") is asked. Exactly one match resolves; several matches are
//!    a configuration error, never a registration-order tie-break.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | No adapter | Widget type never registered | [`BindError::AdapterNotFound`] |
//! | Ambiguous family | Two matchers accept the widget | [`BindError::AmbiguousAdapter`] |
//! | Wrong widget type | Adapter does not accept the widget | [`BindError::AdapterMismatch`] |
//! | Widget dropped | View gone, state still alive | Listener does nothing |

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::warn;

use crate::action::ActionHandler;
use crate::descriptor::BoundField;
use crate::error::{AdapterRole, BindError};
use crate::reactive::StateChangeListener;

/// A type-erased widget reference.
pub type WidgetRef = Rc<dyn Any>;

/// Builds state-change listeners for one kind of widget.
pub trait StateChangeWrapper {
    /// Build a listener that displays incoming values on `widget`.
    fn state_change_listener(&self, widget: &WidgetRef) -> StateChangeListener<dyn Any>;

    /// Whether this adapter can drive `widget`.
    ///
    /// The composer checks this before wiring, so a family that matches more
    /// widget types than its adapter handles fails at bind time.
    fn accepts(&self, widget: &dyn Any) -> bool {
        let _ = widget;
        true
    }
}

/// Attaches action handlers to one kind of widget.
pub trait ActionWrapper {
    /// Subscribe `handler` to `widget`'s change events.
    ///
    /// `source` selects one of several event sources the widget may offer
    /// (e.g. `"click"` vs `"double_click"`); `None` means the default one.
    fn add_action_handler(&self, widget: &WidgetRef, handler: ActionHandler, source: Option<&str>);

    /// Whether this adapter can subscribe to `widget`.
    fn accepts(&self, widget: &dyn Any) -> bool {
        let _ = widget;
        true
    }
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

/// State adapter built from a closure over the concrete widget type.
///
/// The produced listener holds the widget weakly, so a state outliving its
/// view does not keep the view's widgets alive.
pub struct FnStateAdapter<W, F> {
    apply: Rc<F>,
    _widget: PhantomData<fn(&W)>,
}

/// Build a [`StateChangeWrapper`] from `apply(widget, value)`.
pub fn state_adapter<W, F>(apply: F) -> FnStateAdapter<W, F>
where
    W: Any,
    F: Fn(&W, &dyn Any) + 'static,
{
    FnStateAdapter {
        apply: Rc::new(apply),
        _widget: PhantomData,
    }
}

impl<W, F> StateChangeWrapper for FnStateAdapter<W, F>
where
    W: Any,
    F: Fn(&W, &dyn Any) + 'static,
{
    fn state_change_listener(&self, widget: &WidgetRef) -> StateChangeListener<dyn Any> {
        let target = Rc::downgrade(widget);
        let apply = Rc::clone(&self.apply);
        StateChangeListener::<dyn Any>::new(move |value| {
            let Some(widget) = target.upgrade() else {
                return;
            };
            match widget.downcast_ref::<W>() {
                Some(widget) => apply(widget, value),
                None => warn!(
                    expected = std::any::type_name::<W>(),
                    "state adapter received a widget of another type"
                ),
            }
        })
    }

    fn accepts(&self, widget: &dyn Any) -> bool {
        widget.is::<W>()
    }
}

/// Action adapter built from a closure over the concrete widget type.
pub struct FnActionAdapter<W, F> {
    attach: F,
    _widget: PhantomData<fn(&W)>,
}

/// Build an [`ActionWrapper`] from `attach(widget, handler, source)`.
pub fn action_adapter<W, F>(attach: F) -> FnActionAdapter<W, F>
where
    W: Any,
    F: Fn(&W, ActionHandler, Option<&str>) + 'static,
{
    FnActionAdapter {
        attach,
        _widget: PhantomData,
    }
}

impl<W, F> ActionWrapper for FnActionAdapter<W, F>
where
    W: Any,
    F: Fn(&W, ActionHandler, Option<&str>) + 'static,
{
    fn add_action_handler(&self, widget: &WidgetRef, handler: ActionHandler, source: Option<&str>) {
        match widget.downcast_ref::<W>() {
            Some(widget) => (self.attach)(widget, handler, source),
            None => warn!(
                expected = std::any::type_name::<W>(),
                "action adapter received a widget of another type"
            ),
        }
    }

    fn accepts(&self, widget: &dyn Any) -> bool {
        widget.is::<W>()
    }
}

// ---------------------------------------------------------------------------
// AdapterRegistry
// ---------------------------------------------------------------------------

type Matcher = Rc<dyn Fn(&dyn Any) -> bool>;

struct Family<A: ?Sized> {
    name: &'static str,
    matcher: Matcher,
    adapter: Rc<A>,
}

/// Adapters keyed by widget type, plus named fallback families.
pub struct AdapterRegistry<A: ?Sized> {
    role: AdapterRole,
    exact: AHashMap<TypeId, (&'static str, Rc<A>)>,
    families: Vec<Family<A>>,
}

impl<A: ?Sized> AdapterRegistry<A> {
    /// Create an empty registry for `role`.
    #[must_use]
    pub fn new(role: AdapterRole) -> Self {
        Self {
            role,
            exact: AHashMap::new(),
            families: Vec::new(),
        }
    }

    /// Register `adapter` for widgets of exactly type `W`.
    ///
    /// Returns the adapter previously registered for `W`, if any.
    pub fn insert<W: Any>(&mut self, adapter: Rc<A>) -> Option<Rc<A>> {
        self.exact
            .insert(TypeId::of::<W>(), (std::any::type_name::<W>(), adapter))
            .map(|(_, previous)| previous)
    }

    /// Register `adapter` for every widget `matcher` accepts.
    ///
    /// Returns the adapter previously registered under `name`, if any.
    pub fn insert_family(
        &mut self,
        name: &'static str,
        matcher: impl Fn(&dyn Any) -> bool + 'static,
        adapter: Rc<A>,
    ) -> Option<Rc<A>> {
        let family = Family {
            name,
            matcher: Rc::new(matcher),
            adapter,
        };
        match self.families.iter_mut().find(|f| f.name == name) {
            Some(existing) => Some(std::mem::replace(existing, family).adapter),
            None => {
                self.families.push(family);
                None
            }
        }
    }

    /// Remove the exact-type adapter for `W`.
    pub fn remove<W: Any>(&mut self) -> Option<Rc<A>> {
        self.exact.remove(&TypeId::of::<W>()).map(|(_, adapter)| adapter)
    }

    /// Whether an exact-type adapter is registered for `W`.
    #[must_use]
    pub fn contains<W: Any>(&self) -> bool {
        self.exact.contains_key(&TypeId::of::<W>())
    }

    /// Number of exact-type and family registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.families.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the unique adapter for `field`'s widget.
    ///
    /// # Errors
    ///
    /// - [`BindError::AdapterNotFound`] if nothing matches.
    /// - [`BindError::AmbiguousAdapter`] if several families match and no
    ///   exact-type adapter exists.
    pub fn resolve(&self, field: &BoundField) -> Result<Rc<A>, BindError> {
        if let Some((_, adapter)) = self.exact.get(&field.widget_type()) {
            return Ok(Rc::clone(adapter));
        }

        let widget: &dyn Any = &**field.widget();
        let mut matches = self.families.iter().filter(|f| (f.matcher)(widget));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Ok(Rc::clone(&only.adapter)),
            (None, _) => Err(BindError::AdapterNotFound {
                role: self.role,
                widget: field.widget_type_name(),
                field: field.name(),
            }),
            (Some(_), Some(_)) => Err(BindError::AmbiguousAdapter {
                role: self.role,
                widget: field.widget_type_name(),
                field: field.name(),
                families: self
                    .families
                    .iter()
                    .filter(|f| (f.matcher)(widget))
                    .map(|f| f.name)
                    .collect(),
            }),
        }
    }
}

impl<A: ?Sized> fmt::Debug for AdapterRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exact: Vec<_> = self.exact.values().map(|(name, _)| *name).collect();
        exact.sort_unstable();
        f.debug_struct("AdapterRegistry")
            .field("role", &self.role)
            .field("exact", &exact)
            .field(
                "families",
                &self.families.iter().map(|f| f.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
