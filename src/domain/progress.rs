//! Course progress aggregate
//!
//! Derived on demand from module and progress rows. Never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user completion summary for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub total_modules: i64,
    pub completed_modules: i64,
    pub percentage: f64,
    pub latest_completion: Option<DateTime<Utc>>,
}

impl CourseProgress {
    /// Build the aggregate from raw counts.
    ///
    /// `completed` is clamped to `total`: progress rows are only counted for
    /// live modules, so a larger value means the counts were read from
    /// different snapshots.
    pub fn from_counts(total: i64, completed: i64, latest: Option<DateTime<Utc>>) -> Self {
        let total_modules = total.max(0);
        let completed_modules = completed.clamp(0, total_modules);
        Self {
            total_modules,
            completed_modules,
            percentage: percentage(total_modules, completed_modules),
            latest_completion: if completed_modules == 0 { None } else { latest },
        }
    }
}

/// `completed / total * 100`, or 0 for a course without modules.
pub fn percentage(total: i64, completed: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}
