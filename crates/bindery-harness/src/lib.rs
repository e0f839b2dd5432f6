#![forbid(unsafe_code)]

//! In-memory widget toolkit for driving bindery end to end.
//!
//! The widgets behave like a retained-mode toolkit's: setting a value
//! programmatically fires the same change event as user input, which is
//! exactly the feedback loop the composer's guard must break.
//!
//! | Widget | Displays | Emits |
//! |--------|----------|-------|
//! | [`Label`] | `String`, `i64` | nothing |
//! | [`TextField`] | `String` | `String` on change |
//! | [`NumberField`] | `i64` | `i64` on change |
//! | [`Button`] | nothing | `()` on `click` / `double_click` |
//!
//! [`install_default_adapters`] registers an adapter for each of them.

use std::any::Any;
use std::cell::{Cell, RefCell};

use bindery::{ActionHandler, InvocationError, ViewModelComposer, action_adapter, state_adapter};
use tracing::warn;

/// Click event source of a [`Button`].
pub const CLICK: &str = "click";
/// Double-click event source of a [`Button`].
pub const DOUBLE_CLICK: &str = "double_click";

#[derive(Default)]
struct Handlers {
    handlers: RefCell<Vec<ActionHandler>>,
    errors: RefCell<Vec<InvocationError>>,
}

impl Handlers {
    fn push(&self, handler: ActionHandler) {
        self.handlers.borrow_mut().push(handler);
    }

    fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Fire every handler with `value`, collecting failures.
    fn fire<T: Any>(&self, value: &T) -> Vec<InvocationError> {
        let handlers = self.handlers.borrow().clone();
        handlers
            .iter()
            .filter_map(|handler| handler.handle_value(value).err())
            .collect()
    }

    /// Fire, returning the first failure and recording the rest.
    fn fire_first<T: Any>(&self, value: &T) -> Result<(), InvocationError> {
        let mut errors = self.fire(value).into_iter();
        let first = errors.next();
        self.errors.borrow_mut().extend(errors);
        first.map_or(Ok(()), Err)
    }

    /// Fire, recording every failure.
    fn fire_recorded<T: Any>(&self, value: &T) {
        let errors = self.fire(value);
        for err in &errors {
            warn!(error = %err, "change handler failed during display");
        }
        self.errors.borrow_mut().extend(errors);
    }

    fn take_errors(&self) -> Vec<InvocationError> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }
}

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

/// Read-only text. Records every `display` call.
#[derive(Default)]
pub struct Label {
    shown: RefCell<Vec<String>>,
}

impl Label {
    /// Create an empty label.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `text`.
    pub fn display(&self, text: &str) {
        self.shown.borrow_mut().push(text.to_owned());
    }

    /// Everything displayed so far, in order.
    #[must_use]
    pub fn displays(&self) -> Vec<String> {
        self.shown.borrow().clone()
    }

    /// Currently shown text.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.shown.borrow().last().cloned()
    }
}

// ---------------------------------------------------------------------------
// TextField
// ---------------------------------------------------------------------------

/// Editable text emitting its new value on every change.
#[derive(Default)]
pub struct TextField {
    text: RefCell<String>,
    changes: Cell<usize>,
    handlers: Handlers,
}

impl TextField {
    /// Create an empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text.
    #[must_use]
    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    /// Number of change events fired.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.changes.get()
    }

    /// Simulate the user typing `text`.
    ///
    /// # Errors
    ///
    /// The first handler failure. Further failures are recorded.
    pub fn input(&self, text: &str) -> Result<(), InvocationError> {
        self.handlers.fire_first(&self.change(text))
    }

    /// Set the text programmatically. Fires change handlers like
    /// [`input`](Self::input); failures are kept for
    /// [`take_errors`](Self::take_errors).
    pub fn display(&self, text: &str) {
        self.handlers.fire_recorded(&self.change(text));
    }

    /// Handler failures recorded so far.
    pub fn take_errors(&self) -> Vec<InvocationError> {
        self.handlers.take_errors()
    }

    /// Number of attached change handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Attach a change handler.
    pub fn on_change(&self, handler: ActionHandler) {
        self.handlers.push(handler);
    }

    fn change(&self, text: &str) -> String {
        text.clone_into(&mut self.text.borrow_mut());
        self.changes.set(self.changes.get() + 1);
        text.to_owned()
    }
}

// ---------------------------------------------------------------------------
// NumberField
// ---------------------------------------------------------------------------

/// Editable integer emitting its new value on every change.
#[derive(Default)]
pub struct NumberField {
    value: Cell<i64>,
    handlers: Handlers,
}

impl NumberField {
    /// Create a field holding zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value.get()
    }

    /// Simulate the user entering `value`.
    ///
    /// # Errors
    ///
    /// The first handler failure. Further failures are recorded.
    pub fn input(&self, value: i64) -> Result<(), InvocationError> {
        self.value.set(value);
        self.handlers.fire_first(&value)
    }

    /// Set the value programmatically, firing change handlers.
    pub fn display(&self, value: i64) {
        self.value.set(value);
        self.handlers.fire_recorded(&value);
    }

    /// Handler failures recorded so far.
    pub fn take_errors(&self) -> Vec<InvocationError> {
        self.handlers.take_errors()
    }

    /// Attach a change handler.
    pub fn on_change(&self, handler: ActionHandler) {
        self.handlers.push(handler);
    }
}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

/// A button with separate click and double-click event sources.
#[derive(Default)]
pub struct Button {
    click: Handlers,
    double_click: Handlers,
}

impl Button {
    /// Create a button with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a click.
    ///
    /// # Errors
    ///
    /// The first handler failure.
    pub fn click(&self) -> Result<(), InvocationError> {
        self.click.fire_first(&())
    }

    /// Simulate a double click.
    ///
    /// # Errors
    ///
    /// The first handler failure.
    pub fn double_click(&self) -> Result<(), InvocationError> {
        self.double_click.fire_first(&())
    }

    /// Attach `handler` to the event named `source`; `None` means click.
    ///
    /// Returns `false` for an unknown source.
    pub fn on(&self, source: Option<&str>, handler: ActionHandler) -> bool {
        match source {
            None | Some(CLICK) => self.click.push(handler),
            Some(DOUBLE_CLICK) => self.double_click.push(handler),
            Some(other) => {
                warn!(source = other, "button has no such event source");
                return false;
            }
        }
        true
    }

    /// Number of handlers on `source`.
    #[must_use]
    pub fn handler_count(&self, source: &str) -> usize {
        match source {
            CLICK => self.click.len(),
            DOUBLE_CLICK => self.double_click.len(),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

fn text_of(value: &dyn Any) -> Option<String> {
    value
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| value.downcast_ref::<i64>().map(ToString::to_string))
}

/// Register state and action adapters for every harness widget.
pub fn install_default_adapters(composer: &mut ViewModelComposer) {
    composer.register_state_adapter::<Label>(state_adapter(|label: &Label, value| {
        match text_of(value) {
            Some(text) => label.display(&text),
            None => warn!(widget = "Label", "unsupported state value"),
        }
    }));
    composer.register_state_adapter::<TextField>(state_adapter(|field: &TextField, value| {
        match value.downcast_ref::<String>() {
            Some(text) => field.display(text),
            None => warn!(widget = "TextField", "unsupported state value"),
        }
    }));
    composer.register_state_adapter::<NumberField>(state_adapter(|field: &NumberField, value| {
        match value.downcast_ref::<i64>() {
            Some(n) => field.display(*n),
            None => warn!(widget = "NumberField", "unsupported state value"),
        }
    }));

    composer.register_action_adapter::<TextField>(action_adapter(
        |field: &TextField, handler, _source| field.on_change(handler),
    ));
    composer.register_action_adapter::<NumberField>(action_adapter(
        |field: &NumberField, handler, _source| field.on_change(handler),
    ));
    composer.register_action_adapter::<Button>(action_adapter(
        |button: &Button, handler, source| {
            button.on(source, handler);
        },
    ));
}

/// A composer with [`install_default_adapters`] applied.
#[must_use]
pub fn composer() -> ViewModelComposer {
    let mut composer = ViewModelComposer::new();
    install_default_adapters(&mut composer);
    composer
}
