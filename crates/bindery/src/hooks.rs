#![forbid(unsafe_code)]

//! Post-binding lifecycle hooks.
//!
//! Views and view-models list hooks that run once their bindings are in
//! place. Hooks are best-effort: a failing hook is logged and recorded as a
//! [`HookFailure`], and the remaining hooks still run.

use std::fmt;

use tracing::warn;

/// Error returned by a fallible hook.
pub type HookError = Box<dyn std::error::Error + 'static>;

type HookFn<'a> = Box<dyn FnOnce() -> Result<(), HookError> + 'a>;

/// Ordered list of post-binding hooks.
#[derive(Default)]
pub struct PostBindingHooks<'a> {
    hooks: Vec<(&'static str, HookFn<'a>)>,
}

impl<'a> PostBindingHooks<'a> {
    /// Create an empty hook list.
    #[must_use]
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Append an infallible hook.
    #[must_use]
    pub fn hook(mut self, name: &'static str, f: impl FnOnce() + 'a) -> Self {
        self.hooks.push((
            name,
            Box::new(move || {
                f();
                Ok(())
            }),
        ));
        self
    }

    /// Append a fallible hook.
    #[must_use]
    pub fn try_hook<E>(mut self, name: &'static str, f: impl FnOnce() -> Result<(), E> + 'a) -> Self
    where
        E: Into<HookError>,
    {
        self.hooks
            .push((name, Box::new(move || f().map_err(Into::into))));
        self
    }

    /// Number of hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether there are no hooks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in order, collecting failures.
    pub(crate) fn run(self, owner: &'static str) -> Vec<HookFailure> {
        let mut failures = Vec::new();
        for (hook, f) in self.hooks {
            if let Err(error) = f() {
                warn!(owner, hook, error = %error, "post-binding hook failed");
                failures.push(HookFailure { owner, hook, error });
            }
        }
        failures
    }
}

impl fmt::Debug for PostBindingHooks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|(name, _)| name))
            .finish()
    }
}

/// A hook that reported an error.
#[derive(Debug)]
pub struct HookFailure {
    /// Type name of the view or view-model owning the hook.
    pub owner: &'static str,
    /// Hook name.
    pub hook: &'static str,
    /// Reported error.
    pub error: HookError,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "post-binding hook `{}` of `{}` failed: {}",
            self.hook, self.owner, self.error
        )
    }
}
