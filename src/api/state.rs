//! Shared router state

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::catalog::{CourseService, ModuleService, UserService};
use crate::handlers::{EnrollmentLedger, ProgressTracker};
use crate::storage::BlobStore;

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(pool: PgPool, blobs: Arc<dyn BlobStore>) -> Self {
        Self { pool, blobs }
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.pool.clone())
    }

    pub fn courses(&self) -> CourseService {
        CourseService::new(self.pool.clone(), self.blobs.clone())
    }

    pub fn modules(&self) -> ModuleService {
        ModuleService::new(self.pool.clone(), self.blobs.clone())
    }

    pub fn ledger(&self) -> EnrollmentLedger {
        EnrollmentLedger::new(self.pool.clone())
    }

    pub fn tracker(&self) -> ProgressTracker {
        ProgressTracker::new(self.pool.clone())
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
