use chrono::{DateTime, Utc};
use deadman_core::SwitchState;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateSchemaError {
    #[error("state must be a JSON object")]
    NotAnObject,
    #[error("missing state field: {0}")]
    MissingField(&'static str),
    #[error("state field '{field}' must be {expected}")]
    WrongType { field: &'static str, expected: &'static str },
    #[error("state field '{0}' is not a valid timestamp")]
    BadTimestamp(&'static str),
}

/// Strict check of a decoded state record.
///
/// All five keys must be present. Absent instants must be an explicit `null`,
/// never a missing key. A triggered record without `triggered_at` stays
/// triggered; `triggered` never goes back to false.
pub fn validate_state(value: &Value) -> Result<SwitchState, StateSchemaError> {
    let obj = value.as_object().ok_or(StateSchemaError::NotAnObject)?;
    let field = |name: &'static str| obj.get(name).ok_or(StateSchemaError::MissingField(name));

    let last_activity = instant(field("last_activity")?, "last_activity")?;
    let inactivity_days = field("inactivity_days")?
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(StateSchemaError::WrongType { field: "inactivity_days", expected: "a non-negative integer" })?;
    let triggered = field("triggered")?
        .as_bool()
        .ok_or(StateSchemaError::WrongType { field: "triggered", expected: "a boolean" })?;
    let triggered_at = instant(field("triggered_at")?, "triggered_at")?;
    let last_check = instant(field("last_check")?, "last_check")?;

    if triggered && triggered_at.is_none() {
        warn!("state is triggered but has no triggered_at, keeping it triggered");
    }

    Ok(SwitchState { last_activity, inactivity_days, triggered, triggered_at, last_check })
}

fn instant(value: &Value, field: &'static str) -> Result<Option<DateTime<Utc>>, StateSchemaError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| StateSchemaError::BadTimestamp(field)),
        _ => Err(StateSchemaError::WrongType { field, expected: "a timestamp string or null" }),
    }
}
