//! Command definitions
//!
//! Commands represent intentions to change enrollment or progress state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CourseProgress, EnrolledCourse};

/// Command to buy a course with the user's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseCommand {
    pub user_id: Uuid,
    pub course_id: Uuid,
}

impl PurchaseCommand {
    pub fn new(user_id: Uuid, course_id: Uuid) -> Self {
        Self { user_id, course_id }
    }
}

/// Command to mark a module as completed or not completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCompletionCommand {
    pub module_id: Uuid,
    pub user_id: Uuid,
    pub is_completed: bool,
}

impl SetCompletionCommand {
    pub fn new(module_id: Uuid, user_id: Uuid) -> Self {
        Self {
            module_id,
            user_id,
            is_completed: true,
        }
    }

    pub fn with_completed(mut self, is_completed: bool) -> Self {
        self.is_completed = is_completed;
        self
    }
}

/// Result of a successful purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseResult {
    /// Balance after the debit
    pub balance: Decimal,
    /// Id of the new enrollment
    pub transaction_id: Uuid,
}

/// Result of a completion toggle, with the recomputed course aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub module_id: Uuid,
    pub is_completed: bool,
    pub course_progress: CourseProgress,
}

/// One row of the "my courses" listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MyCourse {
    #[serde(flatten)]
    pub enrollment: EnrolledCourse,
    pub progress_percentage: f64,
}
