//! Persisted entities
//!
//! Row types for the catalog, enrollment and progress tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Column list shared by every `SELECT` that yields a [`User`].
pub const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, balance, created_at, updated_at";

/// Column list shared by every `SELECT` that yields a [`Course`].
pub const COURSE_COLUMNS: &str =
    "id, title, description, instructor, topics, price, thumbnail_path, created_at, updated_at";

/// Column list shared by every `SELECT` that yields a [`Module`].
pub const MODULE_COLUMNS: &str =
    r#"id, course_id, title, description, "order", pdf_path, video_path, created_at, updated_at"#;

/// Username of the bootstrap administrator.
pub const ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.username == ADMIN_USERNAME
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub topics: Vec<String>,
    pub price: Decimal,
    pub thumbnail_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Module {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub pdf_path: Option<String>,
    pub video_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase record. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub price_paid: Decimal,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ModuleProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub module_id: Uuid,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A course row from the "my courses" listing, joined with its enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EnrolledCourse {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub enrollment_id: Uuid,
    pub purchased_at: DateTime<Utc>,
}
