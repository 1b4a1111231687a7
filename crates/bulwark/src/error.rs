// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

/// A decision made by a policy instead of, or after, running the operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PolicyError {
    /// The circuit breaker is open, or half-open with every probe slot taken.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen {
        /// Name of the breaker that rejected the call.
        name: Cow<'static, str>,
    },

    /// The bulkhead has no free slot and no room in its wait queue, or the caller was
    /// evicted from the queue to make room for a newer one.
    #[error("bulkhead '{name}' is full")]
    BulkheadFull {
        /// Name of the bulkhead that rejected the call.
        name: Cow<'static, str>,
    },

    /// The caller waited in the bulkhead queue for longer than its maximum wait time.
    #[error("timed out after {waited:?} waiting for a slot in bulkhead '{name}'")]
    WaitTimeout {
        /// Name of the bulkhead.
        name: Cow<'static, str>,
        /// How long the caller waited before giving up.
        waited: Duration,
    },

    /// The operation completed but took longer than its time budget.
    #[error("operation guarded by '{name}' took {elapsed:?}, exceeding its timeout of {timeout:?}")]
    OperationTimeout {
        /// Name of the timeout policy.
        name: Cow<'static, str>,
        /// The configured time budget.
        timeout: Duration,
        /// The time the operation actually took.
        elapsed: Duration,
    },
}

impl PolicyError {
    /// Returns the name of the policy that produced this error.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::CircuitOpen { name }
            | Self::BulkheadFull { name }
            | Self::WaitTimeout { name, .. }
            | Self::OperationTimeout { name, .. } => name,
        }
    }

    /// Returns `true` if the operation was never started because the policy rejected it.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. } | Self::BulkheadFull { .. } | Self::WaitTimeout { .. })
    }
}

/// The error returned by a policy's `execute`: either the policy's own decision or the
/// operation's error, passed through unchanged.
///
/// # Examples
///
/// ```
/// use bulwark::{Error, PolicyError};
///
/// let nested: Error<Error<&str>> = Error::Operation(Error::Operation("boom"));
/// assert_eq!(nested.flatten().into_operation(), Some("boom"));
///
/// let rejected: Error<&str> = PolicyError::CircuitOpen { name: "db".into() }.into();
/// assert!(rejected.is_policy());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    /// The policy refused the call or judged its outcome.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The operation failed.
    #[error(transparent)]
    Operation(E),
}

impl<E> Error<E> {
    /// Returns `true` if this is a policy decision rather than an operation error.
    #[must_use]
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::Policy(_))
    }

    /// Returns the policy decision, if any.
    #[must_use]
    pub fn policy(&self) -> Option<&PolicyError> {
        match self {
            Self::Policy(error) => Some(error),
            Self::Operation(_) => None,
        }
    }

    /// Returns the operation error, if any.
    #[must_use]
    pub fn operation(&self) -> Option<&E> {
        match self {
            Self::Policy(_) => None,
            Self::Operation(error) => Some(error),
        }
    }

    /// Consumes the error and returns the operation error, if any.
    #[must_use]
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Policy(_) => None,
            Self::Operation(error) => Some(error),
        }
    }

    /// Maps the operation error, leaving policy decisions untouched.
    pub fn map_operation<F, M>(self, f: M) -> Error<F>
    where
        M: FnOnce(E) -> F,
    {
        match self {
            Self::Policy(error) => Error::Policy(error),
            Self::Operation(error) => Error::Operation(f(error)),
        }
    }
}

impl<E> Error<Error<E>> {
    /// Collapses the error produced by two nested policies into a single level.
    #[must_use]
    pub fn flatten(self) -> Error<E> {
        match self {
            Self::Policy(error) | Self::Operation(Error::Policy(error)) => Error::Policy(error),
            Self::Operation(Error::Operation(error)) => Error::Operation(error),
        }
    }
}
