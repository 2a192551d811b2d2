//! Catalog module
//!
//! Administrative CRUD over users, courses and modules.

mod course_service;
mod module_service;
mod user_service;

pub use course_service::{CourseDetail, CourseService, NewCourse};
pub use module_service::{ModuleContent, ModuleOrder, ModuleService, NewModule};
pub use user_service::{NewUser, UserService};
