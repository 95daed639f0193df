// src/core/events.rs

//! Task lifecycle events and their wire format.
//!
//! Workers publish one JSON object per lifecycle transition on the queue's
//! channel. Only the statuses below are recognized; anything else comes back
//! to the caller as a classified parse failure.

use crate::core::names;
use serde_json::{Map, Value};
use thiserror::Error;

/// Wire values of the `status` field.
pub const STATUS_ENQUEUED: &str = "enqueued";
pub const STATUS_STARTED: &str = "started";
pub const STATUS_FINISHED: &str = "finished";
pub const STATUS_ERROR: &str = "error-task";

/// A recognized task lifecycle event, one variant per wire status.
///
/// The queue identity is deliberately absent: it is carried by the channel
/// the payload arrived on, and attached by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Enqueued {
        task: String,
        environment: Option<String>,
    },
    Started {
        task: String,
        environment: Option<String>,
    },
    Finished {
        task: String,
        duration_seconds: f64,
        environment: Option<String>,
    },
    Error {
        task: String,
        environment: Option<String>,
    },
}

/// Why a payload could not become a [`TaskEvent`].
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("undecodable payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing or non-string 'status' field")]
    MissingStatus,

    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for field '{0}'")]
    InvalidField(&'static str),
}

impl TaskEvent {
    /// Parses one raw pub/sub payload.
    ///
    /// The status is classified before any field is extracted, so an unknown
    /// status is reported as such even when the payload is missing fields.
    pub fn parse(payload: &[u8]) -> Result<TaskEvent, EventParseError> {
        let value: Value = serde_json::from_slice(payload)?;
        let object = value.as_object().ok_or(EventParseError::NotAnObject)?;

        let status = object
            .get("status")
            .and_then(Value::as_str)
            .ok_or(EventParseError::MissingStatus)?;

        match status {
            STATUS_ENQUEUED => Ok(TaskEvent::Enqueued {
                task: required_task(object)?,
                environment: environment_of(object),
            }),
            STATUS_STARTED => Ok(TaskEvent::Started {
                task: required_task(object)?,
                environment: environment_of(object),
            }),
            STATUS_FINISHED => Ok(TaskEvent::Finished {
                task: required_task(object)?,
                duration_seconds: required_duration(object)?,
                environment: environment_of(object),
            }),
            STATUS_ERROR => Ok(TaskEvent::Error {
                task: required_task(object)?,
                environment: environment_of(object),
            }),
            other => Err(EventParseError::UnknownStatus(other.to_string())),
        }
    }

    /// The task name carried by any variant.
    pub fn task(&self) -> &str {
        match self {
            TaskEvent::Enqueued { task, .. }
            | TaskEvent::Started { task, .. }
            | TaskEvent::Finished { task, .. }
            | TaskEvent::Error { task, .. } => task,
        }
    }

    /// The deployment environment tag, when the worker sent one.
    pub fn environment(&self) -> Option<&str> {
        match self {
            TaskEvent::Enqueued { environment, .. }
            | TaskEvent::Started { environment, .. }
            | TaskEvent::Finished { environment, .. }
            | TaskEvent::Error { environment, .. } => environment.as_deref(),
        }
    }

    /// The wire status this event was parsed from.
    pub fn status(&self) -> &'static str {
        match self {
            TaskEvent::Enqueued { .. } => STATUS_ENQUEUED,
            TaskEvent::Started { .. } => STATUS_STARTED,
            TaskEvent::Finished { .. } => STATUS_FINISHED,
            TaskEvent::Error { .. } => STATUS_ERROR,
        }
    }
}

fn required_task(object: &Map<String, Value>) -> Result<String, EventParseError> {
    let task = object
        .get("task")
        .and_then(Value::as_str)
        .ok_or(EventParseError::MissingField("task"))?;
    Ok(names::clean_task_name(task).to_string())
}

fn required_duration(object: &Map<String, Value>) -> Result<f64, EventParseError> {
    let duration = object
        .get("duration")
        .ok_or(EventParseError::MissingField("duration"))?
        .as_f64()
        .ok_or(EventParseError::InvalidField("duration"))?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(EventParseError::InvalidField("duration"));
    }
    Ok(duration)
}

fn environment_of(object: &Map<String, Value>) -> Option<String> {
    object
        .get("environment")
        .and_then(Value::as_str)
        .map(str::to_string)
}
