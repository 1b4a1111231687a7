// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{OnRetryArgs, RetryArgs};
use crate::utils::define_fn_wrapper;

define_fn_wrapper!(ShouldRetry<E>(Fn(error: &E, args: RetryArgs) -> bool));
define_fn_wrapper!(OnRetry<E>(Fn(error: &E, args: OnRetryArgs)));
