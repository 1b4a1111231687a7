// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::marker::PhantomData;

use super::callbacks::FallbackFn;
use super::{Fallback, FallbackArgs};
use crate::{NotSet, PolicyContext, Set};

/// Builder for [`Fallback`], created by [`Fallback::builder`].
///
/// The builder uses the type-state pattern: [`build`][FallbackBuilder::build] only exists
/// once the substitute has been configured with [`value`][FallbackBuilder::value] or
/// [`with`][FallbackBuilder::with].
///
/// ```compile_fail
/// use bulwark::fallback::Fallback;
///
/// // No fallback action, no `build`.
/// let fallback = Fallback::<u32, String>::builder("missing_action").build();
/// ```
#[derive(Debug)]
pub struct FallbackBuilder<T, E, S = Set> {
    pub(super) name: Cow<'static, str>,
    pub(super) context: PolicyContext,
    pub(super) action: Option<FallbackFn<T, E>>,
    _state: PhantomData<fn() -> S>,
}

impl<T, E> FallbackBuilder<T, E, NotSet> {
    pub(super) fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            context: PolicyContext::default(),
            action: None,
            _state: PhantomData,
        }
    }
}

impl<T, E, S> FallbackBuilder<T, E, S> {
    /// Uses the clock and telemetry settings of `context`.
    #[must_use]
    pub fn context(mut self, context: &PolicyContext) -> Self {
        self.context = context.clone();
        self
    }

    /// Substitutes the result of `action` for a failed operation.
    ///
    /// The function receives the operation's error by value. A panic inside it propagates
    /// to the caller of [`execute`][Fallback::execute]. This call replaces any previous
    /// action.
    #[must_use]
    pub fn with(mut self, action: impl Fn(E, FallbackArgs) -> T + Send + Sync + 'static) -> FallbackBuilder<T, E, Set> {
        self.action = Some(FallbackFn::new(action));
        self.into_state()
    }

    /// Substitutes a clone of `value` for a failed operation, discarding the error.
    ///
    /// This call replaces any previous action.
    #[must_use]
    pub fn value(self, value: T) -> FallbackBuilder<T, E, Set>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.with(move |_, _| value.clone())
    }

    fn into_state<S2>(self) -> FallbackBuilder<T, E, S2> {
        FallbackBuilder {
            name: self.name,
            context: self.context,
            action: self.action,
            _state: PhantomData,
        }
    }
}

impl<T, E> FallbackBuilder<T, E, Set> {
    /// Builds the fallback policy.
    #[must_use]
    pub fn build(self) -> Fallback<T, E> {
        let action = self.action.expect("action must be set in the Set state");

        Fallback::from_parts(self.name, &self.context, action)
    }
}
