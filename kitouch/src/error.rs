//! Error types for KITouch
//!
//! All errors use thiserror for structured error handling.
//! `AppError` covers storage and service failures; the delivery and
//! scheduling errors describe the notification side, which is best effort.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    #[error("Interaction not found: {0}")]
    InteractionNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure reported by a delivery port for a single call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Notifications are not authorized")]
    NotAuthorized,

    #[error("Pending notification limit reached ({limit})")]
    CapacityExceeded { limit: usize },

    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("Notification scheduler error: {0}")]
    Scheduler(String),
}

/// One non-fatal problem observed while reconciling a contact's schedule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingIssue {
    #[error("Failed to register {identifier}: {cause}")]
    RegistrationFailed {
        identifier: String,
        cause: DeliveryError,
    },

    #[error("Failed to cancel {identifier}: {cause}")]
    CancellationFailed {
        identifier: String,
        cause: DeliveryError,
    },
}

impl SchedulingIssue {
    pub fn identifier(&self) -> &str {
        match self {
            SchedulingIssue::RegistrationFailed { identifier, .. }
            | SchedulingIssue::CancellationFailed { identifier, .. } => identifier,
        }
    }
}

/// Aggregate outcome of a reconciliation that did not fully succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Notification permission denied")]
    AuthorizationDenied,

    /// Some cancellations or registrations failed; the rest went through
    #[error("{} scheduling problem(s)", .0.len())]
    Partial(Vec<SchedulingIssue>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_serializes_as_message() {
        let error = AppError::ContactNotFound("42".to_string());

        let json = serde_json::to_string(&error).unwrap();

        assert_eq!(json, r#""Contact not found: 42""#);
    }

    #[test]
    fn test_scheduling_error_messages() {
        let issues = vec![
            SchedulingIssue::CancellationFailed {
                identifier: "birthday_x".to_string(),
                cause: DeliveryError::Scheduler("busy".to_string()),
            },
            SchedulingIssue::RegistrationFailed {
                identifier: "keep_in_touch_x".to_string(),
                cause: DeliveryError::CapacityExceeded { limit: 64 },
            },
        ];

        assert_eq!(issues[0].identifier(), "birthday_x");
        assert_eq!(
            issues[1].to_string(),
            "Failed to register keep_in_touch_x: Pending notification limit reached (64)"
        );
        assert_eq!(
            SchedulingError::Partial(issues).to_string(),
            "2 scheduling problem(s)"
        );
    }
}
