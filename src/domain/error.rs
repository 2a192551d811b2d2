//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors
///
/// These errors represent business rule violations and missing entities.
/// They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Course does not exist or has been soft-deleted
    #[error("Course not found: {0}")]
    CourseNotFound(Uuid),

    /// Module does not exist or has been soft-deleted
    #[error("Module not found: {0}")]
    ModuleNotFound(Uuid),

    /// User does not exist or has been soft-deleted
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// The user already owns an enrollment for the course
    #[error("User is already enrolled in course {course_id}")]
    AlreadyEnrolled { course_id: Uuid, balance: Decimal },

    /// Balance is lower than the course price
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    /// A unique field (username, email) is already taken
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    /// Malformed or out-of-range input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The default admin account cannot be modified or removed
    #[error("Operation on protected user is prohibited: {0}")]
    ProtectedUser(String),
}

impl DomainError {
    /// Create an already-enrolled error carrying the untouched balance
    pub fn already_enrolled(course_id: Uuid, balance: Decimal) -> Self {
        Self::AlreadyEnrolled { course_id, balance }
    }

    /// Create an insufficient balance error
    pub fn insufficient_balance(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientBalance { required, available }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if this is a missing-entity error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CourseNotFound(_) | Self::ModuleNotFound(_) | Self::UserNotFound(_)
        )
    }

    /// Check if this is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. } | Self::InvalidInput(_) | Self::ProtectedUser(_)
        )
    }

    /// Check if this is a conflict with existing state
    pub fn is_conflict_error(&self) -> bool {
        matches!(self, Self::AlreadyEnrolled { .. } | Self::Duplicate(_))
    }
}
