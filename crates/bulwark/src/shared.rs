// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Type-state marker for a builder whose required property has been provided.
///
/// Builders such as [`FallbackBuilder`][crate::fallback::FallbackBuilder] only offer
/// `build()` once every required property is in the `Set` state.
#[non_exhaustive]
#[derive(Debug)]
#[doc(hidden)]
pub struct Set;

/// Type-state marker for a builder whose required property is still missing.
#[non_exhaustive]
#[derive(Debug)]
#[doc(hidden)]
pub struct NotSet;
