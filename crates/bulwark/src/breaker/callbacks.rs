// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::TransitionArgs;
use crate::utils::define_fn_wrapper;

define_fn_wrapper!(OnTransition(Fn(args: TransitionArgs)));
