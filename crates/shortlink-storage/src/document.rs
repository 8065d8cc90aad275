//! JSON shapes exchanged with the remote query/mutation service.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use shortlink_core::link::{from_epoch_seconds, to_epoch_seconds};
use shortlink_core::{Link, Result, StorageError};

/// Request body for both the query and the mutation endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct FunctionCall<'a> {
    pub path: &'a str,
    pub args: Map<String, Value>,
    pub format: &'static str,
}

/// Response envelope.
///
/// `value` is only meaningful when `status` is `"success"`, and
/// `error_message` only when it is `"error"`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope {
    pub status: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A link as stored by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LinkDocument {
    pub normalized_id: String,
    pub short: String,
    pub long: String,
    #[serde(deserialize_with = "epoch_seconds")]
    pub created: i64,
    #[serde(deserialize_with = "epoch_seconds")]
    pub last_edit: i64,
    pub owner: String,
}

impl LinkDocument {
    pub fn from_link(link: &Link) -> Self {
        Self {
            normalized_id: link.key(),
            short: link.short.clone(),
            long: link.long.clone(),
            created: to_epoch_seconds(link.created),
            last_edit: to_epoch_seconds(link.last_edit),
            owner: link.owner.clone(),
        }
    }

    pub fn into_link(self) -> Result<Link> {
        let timestamp = |seconds: i64| {
            from_epoch_seconds(seconds).ok_or_else(|| {
                StorageError::Protocol(format!(
                    "timestamp {seconds} of link '{}' is out of range",
                    self.short
                ))
            })
        };

        Ok(Link {
            created: timestamp(self.created)?,
            last_edit: timestamp(self.last_edit)?,
            short: self.short,
            long: self.long,
            owner: self.owner,
        })
    }
}

/// Converts a JSON number to whole epoch seconds.
///
/// Integers are taken exactly. Numbers with a fractional part are floored
/// to the second.
pub(crate) fn seconds_from_number(number: &Number) -> Option<i64> {
    if let Some(seconds) = number.as_i64() {
        return Some(seconds);
    }
    if number.is_u64() {
        return None;
    }

    let seconds = number.as_f64()?.floor();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if seconds.is_finite() && seconds >= i64::MIN as f64 && seconds < i64::MAX as f64 {
        Some(seconds as i64)
    } else {
        None
    }
}

/// Converts a JSON number to a click count.
///
/// Integral floats such as `5.0` are accepted; negative or fractional
/// values are not.
pub(crate) fn count_from_number(number: &Number) -> Option<u64> {
    if let Some(count) = number.as_u64() {
        return Some(count);
    }
    if number.is_i64() {
        return None;
    }

    let count = number.as_f64()?;
    if count.fract() == 0.0 && count >= 0.0 && count < u64::MAX as f64 {
        Some(count as u64)
    } else {
        None
    }
}

fn epoch_seconds<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Number::deserialize(deserializer)?;
    seconds_from_number(&number).ok_or_else(|| {
        serde::de::Error::custom(format!("timestamp {number} is not representable in seconds"))
    })
}
