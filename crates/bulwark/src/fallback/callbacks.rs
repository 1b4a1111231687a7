// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::FallbackArgs;
use crate::utils::define_fn_wrapper;

define_fn_wrapper!(FallbackFn<T, E>(Fn(error: E, args: FallbackArgs) -> T));
