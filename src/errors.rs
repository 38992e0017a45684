//! Errors reported by the backend and their classification into
//! user-facing transition failures.

use crate::model::ModelError;
use std::fmt;
use thiserror::Error;

/// Structured cause attached by the backend to a rejection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReasonCode {
    /// The acting user is not the one who approved the project.
    NotCreator,
    /// The entity is not in a state allowing the transition.
    InvalidState,
    /// A submitted field was rejected.
    InvalidField(String),
}

/// Raw failure of a backend call. `status` is absent when no response was
/// received at all.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{}: {message}", .status.map_or_else(|| "transport error".to_owned(), |s| format!("status {s}")))]
pub struct BackendError {
    pub status: Option<u16>,
    pub reason: Option<ReasonCode>,
    pub message: String,
}

impl BackendError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            reason: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            reason: None,
            message: message.into(),
        }
    }

    pub fn with_reason(self, reason: ReasonCode) -> Self {
        Self {
            reason: Some(reason),
            ..self
        }
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::status(404, format!("{what} not found"))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    Approve,
    Start,
    Rollback,
    UpdateDeadline,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Approve => "approval",
            Operation::Start => "start",
            Operation::Rollback => "rollback",
            Operation::UpdateDeadline => "deadline update",
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Denial {
    NotCreator,
    Other,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum TransitionError {
    #[error("validation failed{}: {message}", .field.as_ref().map(|f| format!(" on {f}")).unwrap_or_default())]
    Validation {
        field: Option<String>,
        message: String,
    },
    #[error("authentication required: {0}")]
    Authentication(String),
    #[error("forbidden ({denial:?}): {message}")]
    Authorization { denial: Denial, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rejected with status {status}: {message}")]
    Conflict { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("{0} already in progress")]
    Busy(Operation),
    #[error("invalid data received: {0}")]
    Model(#[from] ModelError),
}

impl TransitionError {
    pub fn missing_field(field: &str) -> Self {
        TransitionError::Validation {
            field: Some(field.to_owned()),
            message: "this field is required".to_owned(),
        }
    }

    /// Short text suitable for an alert or toast.
    pub fn user_message(&self) -> String {
        match self {
            TransitionError::Validation {
                field: Some(field),
                message,
            } => format!("{field}: {message}"),
            TransitionError::Validation { field: None, message } => message.clone(),
            TransitionError::Authentication(_) => {
                "your session has expired, please sign in again".to_owned()
            }
            TransitionError::Authorization {
                denial: Denial::NotCreator,
                ..
            } => "only the approving professor may roll back".to_owned(),
            TransitionError::Authorization {
                denial: Denial::Other,
                ..
            } => "you are not allowed to perform this action".to_owned(),
            TransitionError::NotFound(_) => {
                "the requested application or project does not exist".to_owned()
            }
            TransitionError::Conflict { message, .. } => message.clone(),
            TransitionError::Network(_) => "the server could not be reached".to_owned(),
            TransitionError::Busy(op) => format!("a {op} is already in progress"),
            TransitionError::Model(e) => e.to_string(),
        }
    }
}

fn denial(op: Option<Operation>, err: &BackendError) -> Denial {
    if op != Some(Operation::Rollback) {
        return Denial::Other;
    }
    match &err.reason {
        Some(ReasonCode::NotCreator) => Denial::NotCreator,
        Some(_) => Denial::Other,
        // Backends which predate reason codes only say so in the message.
        None if err.message.to_lowercase().contains("creator") => Denial::NotCreator,
        None => Denial::Other,
    }
}

fn classify_for(op: Option<Operation>, err: BackendError) -> TransitionError {
    let denial = denial(op, &err);
    let BackendError {
        status,
        reason,
        message,
    } = err;
    match status {
        None => TransitionError::Network(message),
        Some(400 | 422) => TransitionError::Validation {
            field: match reason {
                Some(ReasonCode::InvalidField(field)) => Some(field),
                _ => None,
            },
            message,
        },
        Some(401) => TransitionError::Authentication(message),
        Some(403) => TransitionError::Authorization { denial, message },
        Some(404) => TransitionError::NotFound(message),
        Some(status) => TransitionError::Conflict { status, message },
    }
}

/// Turn a failed transition call into a classified error.
pub fn classify(op: Operation, err: BackendError) -> TransitionError {
    classify_for(Some(op), err)
}

impl From<BackendError> for TransitionError {
    fn from(err: BackendError) -> Self {
        classify_for(None, err)
    }
}
