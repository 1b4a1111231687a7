// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Serializes [`Duration`] fields in jiff's friendly format, such as `"250ms"` or `"1m 30s"`.
//!
//! Deserialization also accepts ISO 8601 durations (`"PT5S"`). Negative durations are rejected.

use std::time::Duration;

use jiff::SignedDuration;
use serde::{Deserialize, Deserializer, Serializer, de, ser};

pub(crate) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let signed = SignedDuration::try_from(*value).map_err(ser::Error::custom)?;
    serializer.collect_str(&format_args!("{signed:#}"))
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let signed: SignedDuration = text.parse().map_err(de::Error::custom)?;

    Duration::try_from(signed).map_err(de::Error::custom)
}
