//! Domain module
//!
//! Core domain types and business rules.

pub mod context;
pub mod error;
pub mod models;
pub mod money;
pub mod patch;
pub mod progress;

pub use context::OperationContext;
pub use error::DomainError;
pub use models::{Course, EnrolledCourse, Enrollment, Module, ModuleProgress, User};
pub use money::{Balance, Credit, MoneyError, Price};
pub use patch::{CoursePatch, ModulePatch, UserPatch};
pub use progress::CourseProgress;
