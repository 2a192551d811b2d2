//! Projection module
//!
//! Read-side aggregate queries. Progress figures are always recomputed
//! from `modules` and `module_progress`; nothing here is cached.

mod progress;

pub use progress::{completion_flags, count_live_modules, course_progress, progress_by_course};
