//! Error taxonomy for the admin controller and its user-facing notices.

use std::{fmt, time::Duration};

use shared::{RecordId, StoreError, StoreErrorCode};
use thiserror::Error;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("app name is required")]
    MissingName,
    #[error("a launch date is required for date-based launches")]
    MissingLaunchDate,
    #[error("launch weeks must be set to zero or more for week-based launches")]
    InvalidLaunchWeeks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Subscribe,
    Create,
    Update,
    Delete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Subscribe => "subscribe",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// User action guarded by the confirm step and the in-flight flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Save,
    Delete,
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Save => "save",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("{operation} timed out after {}s; the write may still have been applied", .after.as_secs())]
    StoreTimeout {
        operation: StoreOperation,
        after: Duration,
    },
    #[error("{operation} failed: {source}")]
    Store {
        operation: StoreOperation,
        #[source]
        source: StoreError,
    },
    #[error("a {0} is already in progress")]
    Busy(UserAction),
    #[error("{0} must be requested and confirmed first")]
    ConfirmationRequired(UserAction),
    #[error("no delete has been requested")]
    NothingToDelete,
    #[error("record {0} is not in the current list")]
    UnknownRecord(RecordId),
    #[error("controller was torn down")]
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Timeout,
    Permission,
    Transport,
    NotFound,
    Internal,
    Lifecycle,
}

/// Human-readable message surfaced to the admin after a failed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    category: ErrorCategory,
    message: String,
}

impl ErrorNotice {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == ErrorCategory::Permission
    }
}

impl fmt::Display for ErrorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn category_for_store_code(code: StoreErrorCode) -> ErrorCategory {
    match code {
        StoreErrorCode::PermissionDenied => ErrorCategory::Permission,
        StoreErrorCode::Unavailable => ErrorCategory::Transport,
        StoreErrorCode::NotFound => ErrorCategory::NotFound,
        StoreErrorCode::InvalidQuery | StoreErrorCode::Internal => ErrorCategory::Internal,
    }
}

impl ControllerError {
    pub fn notice(&self) -> ErrorNotice {
        match self {
            Self::Validation(_) => ErrorNotice::new(ErrorCategory::Validation, REQUIRED_FIELDS_MESSAGE),
            Self::StoreTimeout { operation, .. } => {
                let message = match operation {
                    StoreOperation::Create => "Database save timed out.",
                    StoreOperation::Update => "Database update timed out.",
                    StoreOperation::Delete => "Database delete timed out.",
                    StoreOperation::Subscribe => "Loading apps timed out.",
                };
                ErrorNotice::new(ErrorCategory::Timeout, message)
            }
            Self::Store { operation, source } => {
                let category = category_for_store_code(source.code);
                let detail = if source.message.trim().is_empty() {
                    "please check your connection"
                } else {
                    source.message.as_str()
                };
                let message = match operation {
                    StoreOperation::Subscribe => format!("Failed to load apps: {detail}"),
                    StoreOperation::Create | StoreOperation::Update => {
                        format!("Failed to save app: {detail}")
                    }
                    StoreOperation::Delete => format!("Failed to delete app: {detail}"),
                };
                ErrorNotice::new(category, message)
            }
            Self::Busy(action) => ErrorNotice::new(
                ErrorCategory::Lifecycle,
                format!("Please wait for the current {action} to finish."),
            ),
            Self::ConfirmationRequired(action) => ErrorNotice::new(
                ErrorCategory::Lifecycle,
                format!("Please confirm the {action} first."),
            ),
            Self::NothingToDelete => {
                ErrorNotice::new(ErrorCategory::Lifecycle, "No app selected for deletion.")
            }
            Self::UnknownRecord(id) => {
                ErrorNotice::new(ErrorCategory::NotFound, format!("App {id} was not found."))
            }
            Self::Detached => ErrorNotice::new(
                ErrorCategory::Lifecycle,
                "The dashboard was closed before the operation finished.",
            ),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::StoreTimeout { .. })
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
